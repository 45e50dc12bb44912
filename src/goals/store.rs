use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::data::{now_rfc3339, parse_rfc3339, UserID};
use crate::error::{ApiError, ApiResult};

use super::data::*;

const GOAL_COLUMNS: &str = "rowid, user_id, title, category_id, course_id, status, \
     milestone_count, milestone_completed_count, completed_at, version";

fn goal_from_row(row: &Row) -> rusqlite::Result<Goal> {
    let status_code: String = row.get(5)?;
    let completed_at: Option<String> = row.get(8)?;

    Ok(Goal {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        category_id: row.get(3)?,
        course_id: row.get(4)?,
        status: GoalStatus::from_code(&status_code).unwrap_or(GoalStatus::NotStarted),
        milestone_count: row.get(6)?,
        milestone_completed_count: row.get(7)?,
        completed_at: completed_at.as_deref().and_then(parse_rfc3339),
        version: row.get(9)?,
    })
}

fn milestone_from_row(row: &Row) -> rusqlite::Result<Milestone> {
    let completed_at: Option<String> = row.get(4)?;

    Ok(Milestone {
        id: row.get(0)?,
        goal_id: row.get(1)?,
        title: row.get(2)?,
        is_completed: row.get::<usize, i64>(3)? != 0,
        completed_at: completed_at.as_deref().and_then(parse_rfc3339),
    })
}

pub fn create_goal(
    db_connection: &Connection,
    user_id: UserID,
    title: &str,
    category_id: Option<i64>,
    course_id: Option<i64>,
    status: GoalStatus,
) -> ApiResult<GoalID> {
    if title.trim().is_empty() {
        return Err(ApiError::Validation("goal title must not be empty".into()));
    }

    db_connection.execute(
        "INSERT INTO goals (user_id, title, category_id, course_id, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![user_id, title, category_id, course_id, status.code(), now_rfc3339()],
    )?;

    Ok(db_connection.last_insert_rowid())
}

/// Ownership check happens here, at the lookup boundary: a goal belonging to
/// another user is indistinguishable from a missing one.
pub fn get_goal(db_connection: &Connection, user_id: UserID, goal_id: GoalID) -> ApiResult<Goal> {
    db_connection
        .query_row(
            &format!("SELECT {} FROM goals WHERE rowid = (?1) AND user_id = (?2)", GOAL_COLUMNS),
            params![goal_id, user_id],
            goal_from_row,
        )
        .optional()?
        .ok_or(ApiError::NotFound("goal"))
}

fn get_goal_by_id(db_connection: &Connection, goal_id: GoalID) -> ApiResult<Goal> {
    db_connection
        .query_row(
            &format!("SELECT {} FROM goals WHERE rowid = (?1)", GOAL_COLUMNS),
            params![goal_id],
            goal_from_row,
        )
        .optional()?
        .ok_or(ApiError::NotFound("goal"))
}

pub fn get_goals(db_connection: &Connection, user_id: UserID) -> ApiResult<GoalListResponse> {
    let mut goals_statement = db_connection.prepare(&format!(
        "SELECT {} FROM goals WHERE user_id = (?1) ORDER BY status, rowid DESC",
        GOAL_COLUMNS
    ))?;

    let mut goals: Vec<GoalWithMilestones> = vec![];

    let goal_rows = goals_statement.query_map(params![user_id], goal_from_row)?;
    for row_result in goal_rows {
        let goal = row_result?;
        let progress_percent = goal.progress_percentage();

        goals.push(GoalWithMilestones {
            goal,
            progress_percent,
            milestones: vec![],
        });
    }

    let mut milestones_statement = db_connection.prepare(
        "SELECT m.rowid, m.goal_id, m.title, m.is_completed, m.completed_at
         FROM milestones m JOIN goals g ON m.goal_id = g.rowid
         WHERE g.user_id = (?1) ORDER BY m.rowid",
    )?;

    let milestone_rows = milestones_statement.query_map(params![user_id], milestone_from_row)?;
    for row_result in milestone_rows {
        let milestone = row_result?;

        if let Some(entry) = goals.iter_mut().find(|g| g.goal.id == milestone.goal_id) {
            entry.milestones.push(milestone);
        }
    }

    let total_goals = goals.len() as i64;
    let completed_goals = goals
        .iter()
        .filter(|g| g.goal.status == GoalStatus::Completed)
        .count() as i64;
    let active_goals = goals
        .iter()
        .filter(|g| {
            matches!(g.goal.status, GoalStatus::NotStarted | GoalStatus::InProgress)
        })
        .count() as i64;
    let completion_rate = if total_goals > 0 {
        completed_goals * 100 / total_goals
    } else {
        0
    };

    Ok(GoalListResponse {
        goals,
        stats: GoalBoardStats {
            total_goals,
            completed_goals,
            active_goals,
            completion_rate,
        },
    })
}

pub fn add_milestone(
    db_connection: &Connection,
    user_id: UserID,
    goal_id: GoalID,
    title: &str,
) -> ApiResult<(MilestoneID, Goal)> {
    if title.trim().is_empty() {
        return Err(ApiError::Validation("milestone title must not be empty".into()));
    }

    let goal = get_goal(db_connection, user_id, goal_id)?;

    db_connection.execute(
        "INSERT INTO milestones (goal_id, title, created_at) VALUES (?1, ?2, ?3)",
        params![goal.id, title, now_rfc3339()],
    )?;
    let milestone_id = db_connection.last_insert_rowid();

    let goal = recompute_goal(db_connection, goal.id)?;

    Ok((milestone_id, goal))
}

/// Flips a milestone's completion flag and synchronously recomputes the
/// parent goal's counters. The goal is consistent when this returns.
pub fn toggle_milestone(
    db_connection: &Connection,
    user_id: UserID,
    milestone_id: MilestoneID,
) -> ApiResult<(Milestone, Goal)> {
    let mut milestone = db_connection
        .query_row(
            "SELECT m.rowid, m.goal_id, m.title, m.is_completed, m.completed_at
             FROM milestones m JOIN goals g ON m.goal_id = g.rowid
             WHERE m.rowid = (?1) AND g.user_id = (?2)",
            params![milestone_id, user_id],
            milestone_from_row,
        )
        .optional()?
        .ok_or(ApiError::NotFound("milestone"))?;

    milestone.is_completed = !milestone.is_completed;
    let completed_at_raw = if milestone.is_completed {
        Some(now_rfc3339())
    } else {
        None
    };
    milestone.completed_at = completed_at_raw.as_deref().and_then(parse_rfc3339);

    db_connection.execute(
        "UPDATE milestones SET is_completed = (?1), completed_at = (?2) WHERE rowid = (?3)",
        params![milestone.is_completed as i64, completed_at_raw, milestone.id],
    )?;

    let goal = recompute_goal(db_connection, milestone.goal_id)?;

    Ok((milestone, goal))
}

/// Goal aggregator: recounts milestones and derives status. Writes only the
/// counter, status and completion-date fields, compare-and-swapped on the
/// goal's version stamp.
pub fn recompute_goal(db_connection: &Connection, goal_id: GoalID) -> ApiResult<Goal> {
    let goal = get_goal_by_id(db_connection, goal_id)?;

    let (milestone_count, milestone_completed_count): (i64, i64) = db_connection.query_row(
        "SELECT COUNT(*), COALESCE(SUM(is_completed), 0) FROM milestones WHERE goal_id = (?1)",
        params![goal_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let mut status = goal.status;
    let mut completed_at = goal.completed_at.map(|dt| dt.to_rfc3339());

    if milestone_count > 0 && milestone_completed_count == milestone_count {
        // A completed goal is never downgraded automatically, so this
        // transition is one-way.
        status = GoalStatus::Completed;
        if completed_at.is_none() {
            completed_at = Some(now_rfc3339());
        }
    } else if milestone_completed_count > 0 && status == GoalStatus::NotStarted {
        status = GoalStatus::InProgress;
    }

    let affected = db_connection.execute(
        "UPDATE goals SET milestone_count = (?1), milestone_completed_count = (?2),
             status = (?3), completed_at = (?4), version = version + 1
         WHERE rowid = (?5) AND version = (?6)",
        params![
            milestone_count,
            milestone_completed_count,
            status.code(),
            completed_at,
            goal_id,
            goal.version
        ],
    )?;

    if affected == 0 {
        return Err(ApiError::Conflict("goal"));
    }

    debug!(goal_id, milestone_count, milestone_completed_count, "goal counters recomputed");

    get_goal_by_id(db_connection, goal_id)
}

/// Manual status change (kanban drag). Validates the code before any
/// mutation; stamps or clears `completed_at` on transitions to or away from
/// Completed.
pub fn update_goal_status(
    db_connection: &Connection,
    user_id: UserID,
    goal_id: GoalID,
    new_status_code: &str,
) -> ApiResult<Goal> {
    let new_status = GoalStatus::from_code(new_status_code).ok_or_else(|| {
        ApiError::Validation(format!("unrecognized status code: {}", new_status_code))
    })?;

    let goal = get_goal(db_connection, user_id, goal_id)?;

    if goal.status == new_status {
        return Ok(goal);
    }

    let completed_at = match new_status {
        GoalStatus::Completed => Some(now_rfc3339()),
        _ => None,
    };

    let affected = db_connection.execute(
        "UPDATE goals SET status = (?1), completed_at = (?2), version = version + 1
         WHERE rowid = (?3) AND version = (?4)",
        params![new_status.code(), completed_at, goal_id, goal.version],
    )?;

    if affected == 0 {
        return Err(ApiError::Conflict("goal"));
    }

    get_goal(db_connection, user_id, goal_id)
}
