use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::UserID;

pub type GoalID = i64;
pub type MilestoneID = i64;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalStatus {
    NotStarted,
    InProgress,
    Completed,
    Archived,
}

impl GoalStatus {
    pub fn code(self) -> &'static str {
        match self {
            GoalStatus::NotStarted => "N",
            GoalStatus::InProgress => "I",
            GoalStatus::Completed => "C",
            GoalStatus::Archived => "A",
        }
    }

    pub fn from_code(code: &str) -> Option<GoalStatus> {
        match code {
            "N" => Some(GoalStatus::NotStarted),
            "I" => Some(GoalStatus::InProgress),
            "C" => Some(GoalStatus::Completed),
            "A" => Some(GoalStatus::Archived),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GoalStatus::NotStarted => "Not Started",
            GoalStatus::InProgress => "In Progress",
            GoalStatus::Completed => "Completed",
            GoalStatus::Archived => "Archived",
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct Goal {
    pub id: GoalID,
    pub user_id: UserID,
    pub title: String,
    pub category_id: Option<i64>,
    pub course_id: Option<i64>,
    pub status: GoalStatus,
    pub milestone_count: i64,
    pub milestone_completed_count: i64,
    pub completed_at: Option<DateTime<Utc>>,
    pub version: i64,
}

impl Goal {
    pub fn progress_percentage(&self) -> i64 {
        if self.milestone_count == 0 {
            return 0;
        }
        self.milestone_completed_count * 100 / self.milestone_count
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct Milestone {
    pub id: MilestoneID,
    pub goal_id: GoalID,
    pub title: String,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Debug)]
pub struct CreateGoalRequest {
    pub user_id: UserID,
    pub title: String,
    pub category_id: Option<i64>,
    pub course_id: Option<i64>,
}

#[derive(Serialize, Debug)]
pub struct CreateGoalResult {
    pub goal_id: GoalID,
}

#[derive(Deserialize, Debug)]
pub struct AddMilestoneRequest {
    pub user_id: UserID,
    pub goal_id: GoalID,
    pub title: String,
}

#[derive(Serialize, Debug)]
pub struct AddMilestoneResult {
    pub milestone_id: MilestoneID,
    pub milestone_count: i64,
}

#[derive(Deserialize, Debug)]
pub struct ToggleMilestoneRequest {
    pub user_id: UserID,
    pub milestone_id: MilestoneID,
}

#[derive(Serialize, Debug)]
pub struct ToggleMilestoneResult {
    pub is_completed: bool,
    pub goal_id: GoalID,
    pub progress_percent: i64,
    pub milestone_count: i64,
    pub milestone_completed_count: i64,
    pub goal_status: &'static str,
    pub goal_status_code: &'static str,
}

#[derive(Deserialize, Debug)]
pub struct UpdateGoalStatusRequest {
    pub user_id: UserID,
    pub goal_id: GoalID,
    pub new_status: String,
}

#[derive(Serialize, Debug)]
pub struct UpdateGoalStatusResult {
    pub goal_id: GoalID,
    pub new_status: &'static str,
    pub new_status_code: &'static str,
}

#[derive(Serialize, Debug)]
pub struct GoalWithMilestones {
    #[serde(flatten)]
    pub goal: Goal,
    pub progress_percent: i64,
    pub milestones: Vec<Milestone>,
}

#[derive(Serialize, Debug)]
pub struct GoalBoardStats {
    pub total_goals: i64,
    pub completed_goals: i64,
    pub active_goals: i64,
    pub completion_rate: i64,
}

#[derive(Serialize, Debug)]
pub struct GoalListResponse {
    pub goals: Vec<GoalWithMilestones>,
    pub stats: GoalBoardStats,
}
