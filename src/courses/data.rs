use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::UserID;
use crate::goals::data::GoalID;
use crate::roadmap::RoadmapModule;

pub type CourseID = i64;
pub type CourseProgressID = i64;
pub type ModuleProgressID = i64;

#[derive(Serialize, Debug, Clone)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct Course {
    pub id: CourseID,
    pub title: String,
    pub description: String,
    pub category_id: i64,
    pub total_steps: i64,
}

#[derive(Serialize, Debug, Clone)]
pub struct CourseProgress {
    pub id: CourseProgressID,
    pub user_id: UserID,
    pub course_id: CourseID,
    pub current_step: i64,
    pub completed: bool,
    pub last_accessed: Option<DateTime<Utc>>,
    pub version: i64,
}

#[derive(Serialize, Debug, Clone)]
pub struct ModuleProgress {
    pub id: ModuleProgressID,
    pub course_progress_id: CourseProgressID,
    pub module_id: i64,
    pub is_completed: bool,
    pub time_spent_seconds: i64,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Debug)]
pub struct CreateCourseRequest {
    pub title: String,
    pub description: String,
    pub category: String,
    /// Declared number of modules required to finish the course. Required at
    /// creation; there is no fallback.
    pub total_steps: i64,
}

#[derive(Serialize, Debug)]
pub struct CreateCourseResult {
    pub course_id: CourseID,
    pub category_id: i64,
}

#[derive(Deserialize, Debug)]
pub struct EnrollRequest {
    pub user_id: UserID,
    pub course_id: CourseID,
}

#[derive(Serialize, Debug)]
pub struct EnrollResult {
    pub course_progress_id: CourseProgressID,
    /// Set on first enrollment only; re-enrollment is a no-op.
    pub goal_id: Option<GoalID>,
    pub created: bool,
    pub modules: Vec<RoadmapModule>,
    pub milestones_created: i64,
    pub warning: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct ReportProgressRequest {
    pub user_id: UserID,
    pub course_id: CourseID,
    pub module_id: i64,
    pub seconds_watched: i64,
    pub completed: bool,
    /// Title of the watched video; matched by substring against the course
    /// goal's milestones so the goal board tracks the completion too.
    pub video_title: Option<String>,
    /// Client-supplied idempotency key; a replayed key is answered from
    /// current state without accumulating time again.
    pub request_id: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct ReportProgressResult {
    pub module_id: i64,
    pub is_completed: bool,
    pub time_spent_seconds: i64,
    pub course_completed: bool,
    pub current_streak: i64,
    pub total_hours_learned: f64,
    pub duplicate: bool,
}
