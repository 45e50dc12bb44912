use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info, warn};

use crate::config::CompletionScope;
use crate::data::{now_rfc3339, parse_rfc3339, UserID};
use crate::error::{ApiError, ApiResult};
use crate::goals::data::{GoalID, GoalStatus};
use crate::goals::store as goals_store;
use crate::profile::CompletionHook;
use crate::roadmap::{RoadmapModule, RoadmapSource};
use crate::stats;

use super::data::*;

pub struct EnrollOutcome {
    pub course_progress_id: CourseProgressID,
    pub goal_id: Option<GoalID>,
    pub created: bool,
    pub milestones_created: i64,
}

fn course_from_row(row: &Row) -> rusqlite::Result<Course> {
    Ok(Course {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        category_id: row.get(3)?,
        total_steps: row.get(4)?,
    })
}

fn course_progress_from_row(row: &Row) -> rusqlite::Result<CourseProgress> {
    let last_accessed: Option<String> = row.get(5)?;

    Ok(CourseProgress {
        id: row.get(0)?,
        user_id: row.get(1)?,
        course_id: row.get(2)?,
        current_step: row.get(3)?,
        completed: row.get::<usize, i64>(4)? != 0,
        last_accessed: last_accessed.as_deref().and_then(parse_rfc3339),
        version: row.get(6)?,
    })
}

fn module_progress_from_row(row: &Row) -> rusqlite::Result<ModuleProgress> {
    let completed_at: Option<String> = row.get(5)?;

    Ok(ModuleProgress {
        id: row.get(0)?,
        course_progress_id: row.get(1)?,
        module_id: row.get(2)?,
        is_completed: row.get::<usize, i64>(3)? != 0,
        time_spent_seconds: row.get(4)?,
        completed_at: completed_at.as_deref().and_then(parse_rfc3339),
    })
}

pub fn get_or_create_category(db_connection: &Connection, name: &str) -> ApiResult<i64> {
    if name.trim().is_empty() {
        return Err(ApiError::Validation("category name must not be empty".into()));
    }

    db_connection.execute(
        "INSERT INTO categories (name) VALUES (?1) ON CONFLICT (name) DO NOTHING",
        params![name],
    )?;

    let category_id = db_connection.query_row(
        "SELECT rowid FROM categories WHERE name = (?1)",
        params![name],
        |row| row.get(0),
    )?;

    Ok(category_id)
}

pub fn create_course(
    db_connection: &Connection,
    request: &CreateCourseRequest,
) -> ApiResult<CreateCourseResult> {
    if request.title.trim().is_empty() {
        return Err(ApiError::Validation("course title must not be empty".into()));
    }
    if request.total_steps < 1 {
        return Err(ApiError::Validation(
            "total_steps is required and must be at least 1".into(),
        ));
    }

    let category_id = get_or_create_category(db_connection, &request.category)?;

    db_connection.execute(
        "INSERT INTO courses (title, description, category_id, total_steps)
         VALUES (?1, ?2, ?3, ?4)",
        params![request.title, request.description, category_id, request.total_steps],
    )?;

    Ok(CreateCourseResult {
        course_id: db_connection.last_insert_rowid(),
        category_id,
    })
}

pub fn get_course(db_connection: &Connection, course_id: CourseID) -> ApiResult<Course> {
    db_connection
        .query_row(
            "SELECT rowid, title, description, category_id, total_steps
             FROM courses WHERE rowid = (?1)",
            params![course_id],
            course_from_row,
        )
        .optional()?
        .ok_or(ApiError::NotFound("course"))
}

fn find_course_progress(
    db_connection: &Connection,
    user_id: UserID,
    course_id: CourseID,
) -> ApiResult<Option<CourseProgress>> {
    let progress = db_connection
        .query_row(
            "SELECT rowid, user_id, course_id, current_step, completed, last_accessed, version
             FROM course_progress WHERE user_id = (?1) AND course_id = (?2)",
            params![user_id, course_id],
            course_progress_from_row,
        )
        .optional()?;

    Ok(progress)
}

fn get_course_progress_by_id(
    db_connection: &Connection,
    course_progress_id: CourseProgressID,
) -> ApiResult<CourseProgress> {
    db_connection
        .query_row(
            "SELECT rowid, user_id, course_id, current_step, completed, last_accessed, version
             FROM course_progress WHERE rowid = (?1)",
            params![course_progress_id],
            course_progress_from_row,
        )
        .optional()?
        .ok_or(ApiError::NotFound("enrollment"))
}

/// Fetches the course roadmap, degrading to an empty module list plus a
/// user-facing warning when the provider fails. A roadmap outage never fails
/// the enrollment itself.
pub fn roadmap_or_fallback(
    source: &dyn RoadmapSource,
    course: &Course,
) -> (Vec<RoadmapModule>, Option<String>) {
    match source.generate(&course.title, &course.description) {
        Ok(modules) => (modules, None),
        Err(e) => {
            warn!(course_id = course.id, error = %e, "roadmap generation failed");
            (
                vec![],
                Some("Course roadmap is temporarily unavailable.".to_string()),
            )
        }
    }
}

/// Enrollment: get-or-create on the (user, course) progress record. The first
/// enrollment also creates a learning goal with one milestone per roadmap
/// video; re-enrollment returns the existing record untouched.
pub fn enroll(
    db_connection: &Connection,
    user_id: UserID,
    course: &Course,
    modules: &[RoadmapModule],
) -> ApiResult<EnrollOutcome> {
    if let Some(existing) = find_course_progress(db_connection, user_id, course.id)? {
        return Ok(EnrollOutcome {
            course_progress_id: existing.id,
            goal_id: None,
            created: false,
            milestones_created: 0,
        });
    }

    db_connection.execute(
        "INSERT INTO course_progress (user_id, course_id, last_accessed) VALUES (?1, ?2, ?3)",
        params![user_id, course.id, now_rfc3339()],
    )?;
    let course_progress_id = db_connection.last_insert_rowid();

    let goal_id = goals_store::create_goal(
        db_connection,
        user_id,
        &format!("Learning: {}", course.title),
        Some(course.category_id),
        Some(course.id),
        GoalStatus::InProgress,
    )?;

    let mut milestones_created = 0;
    for module in modules {
        for video in &module.videos {
            db_connection.execute(
                "INSERT INTO milestones (goal_id, title, created_at) VALUES (?1, ?2, ?3)",
                params![goal_id, video.title, now_rfc3339()],
            )?;
            milestones_created += 1;
        }
    }

    if milestones_created > 0 {
        goals_store::recompute_goal(db_connection, goal_id)?;
    }

    info!(user_id, course_id = course.id, goal_id, milestones_created, "enrolled in course");

    Ok(EnrollOutcome {
        course_progress_id,
        goal_id: Some(goal_id),
        created: true,
        milestones_created,
    })
}

/// Module progress report: lazily creates the per-module record, accumulates
/// watched time monotonically, accrues learning stats, and hands completed
/// transitions to the reconciler. Runs inside the caller's transaction.
pub fn report_progress(
    db_connection: &Connection,
    course: &Course,
    request: &ReportProgressRequest,
    today: NaiveDate,
    scope: CompletionScope,
    hook: Option<&dyn CompletionHook>,
) -> ApiResult<ReportProgressResult> {
    if request.seconds_watched < 0 {
        return Err(ApiError::Validation("seconds_watched must not be negative".into()));
    }

    let course_progress = find_course_progress(db_connection, request.user_id, course.id)?
        .ok_or(ApiError::NotFound("enrollment"))?;

    if let Some(request_id) = &request.request_id {
        let already_seen: Option<i64> = db_connection
            .query_row(
                "SELECT rowid FROM progress_receipts
                 WHERE course_progress_id = (?1) AND module_id = (?2) AND request_id = (?3)",
                params![course_progress.id, request.module_id, request_id],
                |row| row.get(0),
            )
            .optional()?;

        if already_seen.is_some() {
            debug!(%request_id, module_id = request.module_id, "replayed progress report");
            return replayed_report(db_connection, &course_progress, request);
        }
    }

    db_connection.execute(
        "INSERT INTO module_progress (course_progress_id, module_id) VALUES (?1, ?2)
         ON CONFLICT (course_progress_id, module_id) DO NOTHING",
        params![course_progress.id, request.module_id],
    )?;

    let module = get_module_progress(db_connection, course_progress.id, request.module_id)?;

    db_connection.execute(
        "UPDATE module_progress SET time_spent_seconds = time_spent_seconds + (?1)
         WHERE rowid = (?2)",
        params![request.seconds_watched, module.id],
    )?;

    let newly_completed = request.completed && !module.is_completed;
    if newly_completed {
        db_connection.execute(
            "UPDATE module_progress SET is_completed = 1, completed_at = (?1) WHERE rowid = (?2)",
            params![now_rfc3339(), module.id],
        )?;
    }

    if let Some(request_id) = &request.request_id {
        db_connection.execute(
            "INSERT INTO progress_receipts (course_progress_id, module_id, request_id)
             VALUES (?1, ?2, ?3)",
            params![course_progress.id, request.module_id, request_id],
        )?;
    }

    touch_course_progress(db_connection, &course_progress, request.module_id)?;

    let learning_stats =
        stats::record_learning(db_connection, request.user_id, request.seconds_watched, today)?;

    if newly_completed {
        if let Some(video_title) = &request.video_title {
            complete_matching_milestone(db_connection, request.user_id, course, video_title)?;
        }
        on_module_completed(db_connection, course, course_progress.id, scope, hook)?;
    }

    let module = get_module_progress(db_connection, course_progress.id, request.module_id)?;
    let course_progress = get_course_progress_by_id(db_connection, course_progress.id)?;

    Ok(ReportProgressResult {
        module_id: module.module_id,
        is_completed: module.is_completed,
        time_spent_seconds: module.time_spent_seconds,
        course_completed: course_progress.completed,
        current_streak: learning_stats.current_streak,
        total_hours_learned: learning_stats.total_hours_learned,
        duplicate: false,
    })
}

fn replayed_report(
    db_connection: &Connection,
    course_progress: &CourseProgress,
    request: &ReportProgressRequest,
) -> ApiResult<ReportProgressResult> {
    let module = get_module_progress(db_connection, course_progress.id, request.module_id)?;
    let learning_stats = stats::get_stats(db_connection, request.user_id)?;

    Ok(ReportProgressResult {
        module_id: module.module_id,
        is_completed: module.is_completed,
        time_spent_seconds: module.time_spent_seconds,
        course_completed: course_progress.completed,
        current_streak: learning_stats.current_streak,
        total_hours_learned: learning_stats.total_hours_learned,
        duplicate: true,
    })
}

fn get_module_progress(
    db_connection: &Connection,
    course_progress_id: CourseProgressID,
    module_id: i64,
) -> ApiResult<ModuleProgress> {
    db_connection
        .query_row(
            "SELECT rowid, course_progress_id, module_id, is_completed, time_spent_seconds, completed_at
             FROM module_progress WHERE course_progress_id = (?1) AND module_id = (?2)",
            params![course_progress_id, module_id],
            module_progress_from_row,
        )
        .optional()?
        .ok_or(ApiError::NotFound("module progress"))
}

fn touch_course_progress(
    db_connection: &Connection,
    course_progress: &CourseProgress,
    module_id: i64,
) -> ApiResult<()> {
    let current_step = course_progress.current_step.max(module_id);

    let affected = db_connection.execute(
        "UPDATE course_progress SET current_step = (?1), last_accessed = (?2), version = version + 1
         WHERE rowid = (?3) AND version = (?4)",
        params![current_step, now_rfc3339(), course_progress.id, course_progress.version],
    )?;

    if affected == 0 {
        return Err(ApiError::Conflict("course progress"));
    }

    Ok(())
}

/// Marks the course goal's milestone matching the watched video as completed,
/// then recomputes the goal. Matching is by substring in either direction;
/// a report with no matching milestone is not an error.
fn complete_matching_milestone(
    db_connection: &Connection,
    user_id: UserID,
    course: &Course,
    video_title: &str,
) -> ApiResult<()> {
    let matched: Option<(GoalID, i64)> = db_connection
        .query_row(
            "SELECT m.goal_id, m.rowid FROM milestones m
             JOIN goals g ON m.goal_id = g.rowid
             WHERE g.user_id = (?1) AND g.course_id = (?2) AND m.is_completed = 0
               AND (instr(m.title, ?3) > 0 OR instr(?3, m.title) > 0)
             ORDER BY m.rowid LIMIT 1",
            params![user_id, course.id, video_title],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    if let Some((goal_id, milestone_id)) = matched {
        db_connection.execute(
            "UPDATE milestones SET is_completed = 1, completed_at = (?1) WHERE rowid = (?2)",
            params![now_rfc3339(), milestone_id],
        )?;
        goals_store::recompute_goal(db_connection, goal_id)?;
    }

    Ok(())
}

/// Completion reconciler entry point: re-checks the course's declared step
/// count against the user's completed modules and finalizes when the
/// requirement is met.
fn on_module_completed(
    db_connection: &Connection,
    course: &Course,
    course_progress_id: CourseProgressID,
    scope: CompletionScope,
    hook: Option<&dyn CompletionHook>,
) -> ApiResult<()> {
    let course_progress = get_course_progress_by_id(db_connection, course_progress_id)?;

    let completed_count: i64 = db_connection.query_row(
        "SELECT COUNT(*) FROM module_progress
         WHERE course_progress_id = (?1) AND is_completed = 1",
        params![course_progress.id],
        |row| row.get(0),
    )?;

    if completed_count >= course.total_steps && !course_progress.completed {
        finalize_course_completion(db_connection, course, &course_progress, scope, hook)?;
    }

    Ok(())
}

/// Cascades a finished course into goal and profile state. Idempotent: an
/// already-completed record is a no-op. Must run inside the same transaction
/// as the module update that triggered it so the cascade commits as one unit.
pub fn finalize_course_completion(
    db_connection: &Connection,
    course: &Course,
    course_progress: &CourseProgress,
    scope: CompletionScope,
    hook: Option<&dyn CompletionHook>,
) -> ApiResult<bool> {
    if course_progress.completed {
        return Ok(false);
    }

    let affected = db_connection.execute(
        "UPDATE course_progress SET completed = 1, last_accessed = (?1), version = version + 1
         WHERE rowid = (?2) AND version = (?3)",
        params![now_rfc3339(), course_progress.id, course_progress.version],
    )?;

    if affected == 0 {
        return Err(ApiError::Conflict("course progress"));
    }

    let mut goal_ids_statement = match scope {
        CompletionScope::CategoryWide => db_connection.prepare(
            "SELECT rowid FROM goals
             WHERE user_id = (?1) AND category_id = (?2) AND status IN ('N', 'I')",
        )?,
        CompletionScope::SingleGoal => db_connection.prepare(
            "SELECT rowid FROM goals
             WHERE user_id = (?1) AND course_id = (?2) AND status IN ('N', 'I')",
        )?,
    };

    let scope_key = match scope {
        CompletionScope::CategoryWide => course.category_id,
        CompletionScope::SingleGoal => course.id,
    };

    let goal_ids: Vec<GoalID> = goal_ids_statement
        .query_map(params![course_progress.user_id, scope_key], |row| row.get(0))?
        .collect::<Result<_, _>>()?;

    let now = now_rfc3339();
    for goal_id in &goal_ids {
        // Completing the goal's remaining milestones keeps the counters
        // consistent with the Completed status.
        db_connection.execute(
            "UPDATE milestones SET is_completed = 1, completed_at = COALESCE(completed_at, ?1)
             WHERE goal_id = (?2) AND is_completed = 0",
            params![now, goal_id],
        )?;
        db_connection.execute(
            "UPDATE goals SET status = 'C', completed_at = COALESCE(completed_at, ?1),
                 milestone_completed_count = milestone_count, version = version + 1
             WHERE rowid = (?2)",
            params![now, goal_id],
        )?;
    }

    if let Some(hook) = hook {
        hook.on_course_completed(db_connection, course_progress.user_id)?;
    }

    info!(
        user_id = course_progress.user_id,
        course_id = course.id,
        goals_completed = goal_ids.len(),
        "course completion finalized"
    );

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::create_tables;
    use crate::profile::{get_profile, ProfileCompletionHook};
    use crate::roadmap::{OutlinePlanner, RoadmapError, RoadmapSource};

    struct UnreachablePlanner;

    impl RoadmapSource for UnreachablePlanner {
        fn generate(
            &self,
            _course_title: &str,
            _description: &str,
        ) -> Result<Vec<RoadmapModule>, RoadmapError> {
            Err(RoadmapError::Unavailable("connection refused".to_string()))
        }
    }

    fn test_connection() -> Connection {
        let db_connection = Connection::open_in_memory().unwrap();
        create_tables(&db_connection).unwrap();
        db_connection
    }

    fn make_course(db_connection: &Connection, title: &str, total_steps: i64) -> Course {
        let created = create_course(
            db_connection,
            &CreateCourseRequest {
                title: title.to_string(),
                description: "desc".to_string(),
                category: "Programming".to_string(),
                total_steps,
            },
        )
        .unwrap();
        get_course(db_connection, created.course_id).unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn report(
        db_connection: &Connection,
        course: &Course,
        module_id: i64,
        seconds: i64,
        completed: bool,
        request_id: Option<&str>,
    ) -> ApiResult<ReportProgressResult> {
        let hook = ProfileCompletionHook;
        report_progress(
            db_connection,
            course,
            &ReportProgressRequest {
                user_id: 1,
                course_id: course.id,
                module_id,
                seconds_watched: seconds,
                completed,
                video_title: None,
                request_id: request_id.map(str::to_string),
            },
            date(2024, 3, 1),
            CompletionScope::CategoryWide,
            Some(&hook),
        )
    }

    #[test]
    fn course_creation_requires_total_steps() {
        let db_connection = test_connection();

        let result = create_course(
            &db_connection,
            &CreateCourseRequest {
                title: "Rust".to_string(),
                description: "desc".to_string(),
                category: "Programming".to_string(),
                total_steps: 0,
            },
        );

        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[test]
    fn enrollment_creates_goal_with_video_milestones() {
        let db_connection = test_connection();
        let course = make_course(&db_connection, "Rust", 4);
        let modules = OutlinePlanner.generate(&course.title, &course.description).unwrap();

        let outcome = enroll(&db_connection, 1, &course, &modules).unwrap();

        assert!(outcome.created);
        assert_eq!(outcome.milestones_created, 3);
        let goal = goals_store::get_goal(&db_connection, 1, outcome.goal_id.unwrap()).unwrap();
        assert_eq!(goal.title, "Learning: Rust");
        assert_eq!(goal.status, GoalStatus::InProgress);
        assert_eq!(goal.milestone_count, 3);
        assert_eq!(goal.category_id, Some(course.category_id));
    }

    #[test]
    fn reenrollment_is_a_noop() {
        let db_connection = test_connection();
        let course = make_course(&db_connection, "Rust", 4);
        let modules = OutlinePlanner.generate(&course.title, &course.description).unwrap();

        let first = enroll(&db_connection, 1, &course, &modules).unwrap();
        let second = enroll(&db_connection, 1, &course, &modules).unwrap();

        assert!(!second.created);
        assert_eq!(second.course_progress_id, first.course_progress_id);
        assert!(second.goal_id.is_none());

        let goal_count: i64 = db_connection
            .query_row("SELECT COUNT(*) FROM goals WHERE user_id = 1", [], |row| row.get(0))
            .unwrap();
        assert_eq!(goal_count, 1);
    }

    #[test]
    fn roadmap_outage_degrades_enrollment_to_empty_modules() {
        let db_connection = test_connection();
        let course = make_course(&db_connection, "Rust", 2);

        let (modules, warning) = roadmap_or_fallback(&UnreachablePlanner, &course);
        assert!(modules.is_empty());
        assert!(warning.is_some());

        // Enrollment still goes through, just without milestones.
        let outcome = enroll(&db_connection, 1, &course, &modules).unwrap();
        assert!(outcome.created);
        assert_eq!(outcome.milestones_created, 0);

        let goal = goals_store::get_goal(&db_connection, 1, outcome.goal_id.unwrap()).unwrap();
        assert_eq!(goal.milestone_count, 0);
        assert_eq!(goal.status, GoalStatus::InProgress);

        let (modules, warning) = roadmap_or_fallback(&OutlinePlanner, &course);
        assert_eq!(modules.len(), 4);
        assert!(warning.is_none());
    }

    #[test]
    fn report_requires_enrollment() {
        let db_connection = test_connection();
        let course = make_course(&db_connection, "Rust", 2);

        let result = report(&db_connection, &course, 1, 300, false, None);
        assert!(matches!(result, Err(ApiError::NotFound("enrollment"))));
    }

    #[test]
    fn duplicate_report_without_key_double_counts() {
        let db_connection = test_connection();
        let course = make_course(&db_connection, "Rust", 2);
        enroll(&db_connection, 1, &course, &[]).unwrap();

        report(&db_connection, &course, 1, 300, false, None).unwrap();
        let result = report(&db_connection, &course, 1, 300, false, None).unwrap();

        assert_eq!(result.time_spent_seconds, 600);
        assert!(!result.duplicate);
    }

    #[test]
    fn replayed_request_id_does_not_double_count() {
        let db_connection = test_connection();
        let course = make_course(&db_connection, "Rust", 2);
        enroll(&db_connection, 1, &course, &[]).unwrap();

        report(&db_connection, &course, 1, 300, false, Some("req-1")).unwrap();
        let replay = report(&db_connection, &course, 1, 300, false, Some("req-1")).unwrap();

        assert!(replay.duplicate);
        assert_eq!(replay.time_spent_seconds, 300);

        let fresh = report(&db_connection, &course, 1, 300, false, Some("req-2")).unwrap();
        assert_eq!(fresh.time_spent_seconds, 600);
    }

    #[test]
    fn completing_all_steps_finalizes_course_and_goals() {
        let db_connection = test_connection();
        let course = make_course(&db_connection, "Rust", 2);
        let modules = OutlinePlanner.generate(&course.title, &course.description).unwrap();
        let outcome = enroll(&db_connection, 1, &course, &modules).unwrap();

        let first = report(&db_connection, &course, 1, 600, true, None).unwrap();
        assert!(first.is_completed);
        assert!(!first.course_completed);

        let second = report(&db_connection, &course, 2, 600, true, None).unwrap();
        assert!(second.course_completed);

        // Category-wide scope: the enrollment goal is bulk-completed with
        // consistent counters.
        let goal = goals_store::get_goal(&db_connection, 1, outcome.goal_id.unwrap()).unwrap();
        assert_eq!(goal.status, GoalStatus::Completed);
        assert_eq!(goal.milestone_completed_count, goal.milestone_count);
        assert!(goal.completed_at.is_some());

        assert_eq!(get_profile(&db_connection, 1).unwrap().resource_completed, 1);
    }

    #[test]
    fn category_wide_scope_completes_sibling_goals() {
        let db_connection = test_connection();
        let course = make_course(&db_connection, "Rust", 1);
        enroll(&db_connection, 1, &course, &[]).unwrap();

        let sibling = goals_store::create_goal(
            &db_connection,
            1,
            "Read the book",
            Some(course.category_id),
            None,
            GoalStatus::NotStarted,
        )
        .unwrap();
        let other_user_goal = goals_store::create_goal(
            &db_connection,
            2,
            "Someone else's goal",
            Some(course.category_id),
            None,
            GoalStatus::NotStarted,
        )
        .unwrap();

        report(&db_connection, &course, 1, 60, true, None).unwrap();

        let sibling = goals_store::get_goal(&db_connection, 1, sibling).unwrap();
        assert_eq!(sibling.status, GoalStatus::Completed);

        // The bulk update never crosses user boundaries.
        let other = goals_store::get_goal(&db_connection, 2, other_user_goal).unwrap();
        assert_eq!(other.status, GoalStatus::NotStarted);
    }

    #[test]
    fn single_goal_scope_leaves_sibling_goals_open() {
        let db_connection = test_connection();
        let course = make_course(&db_connection, "Rust", 1);
        let outcome = enroll(&db_connection, 1, &course, &[]).unwrap();

        let sibling = goals_store::create_goal(
            &db_connection,
            1,
            "Read the book",
            Some(course.category_id),
            None,
            GoalStatus::NotStarted,
        )
        .unwrap();

        let hook = ProfileCompletionHook;
        report_progress(
            &db_connection,
            &course,
            &ReportProgressRequest {
                user_id: 1,
                course_id: course.id,
                module_id: 1,
                seconds_watched: 60,
                completed: true,
                video_title: None,
                request_id: None,
            },
            date(2024, 3, 1),
            CompletionScope::SingleGoal,
            Some(&hook),
        )
        .unwrap();

        let course_goal =
            goals_store::get_goal(&db_connection, 1, outcome.goal_id.unwrap()).unwrap();
        assert_eq!(course_goal.status, GoalStatus::Completed);

        let sibling = goals_store::get_goal(&db_connection, 1, sibling).unwrap();
        assert_eq!(sibling.status, GoalStatus::NotStarted);
    }

    #[test]
    fn archived_goals_are_not_resurrected() {
        let db_connection = test_connection();
        let course = make_course(&db_connection, "Rust", 1);
        enroll(&db_connection, 1, &course, &[]).unwrap();

        let archived = goals_store::create_goal(
            &db_connection,
            1,
            "Old plan",
            Some(course.category_id),
            None,
            GoalStatus::Archived,
        )
        .unwrap();

        report(&db_connection, &course, 1, 60, true, None).unwrap();

        let archived = goals_store::get_goal(&db_connection, 1, archived).unwrap();
        assert_eq!(archived.status, GoalStatus::Archived);
    }

    #[test]
    fn finalize_is_idempotent() {
        let db_connection = test_connection();
        let course = make_course(&db_connection, "Rust", 1);
        let outcome = enroll(&db_connection, 1, &course, &[]).unwrap();
        let hook = ProfileCompletionHook;

        let progress = get_course_progress_by_id(&db_connection, outcome.course_progress_id).unwrap();
        let finalized = finalize_course_completion(
            &db_connection,
            &course,
            &progress,
            CompletionScope::CategoryWide,
            Some(&hook),
        )
        .unwrap();
        assert!(finalized);

        let progress = get_course_progress_by_id(&db_connection, outcome.course_progress_id).unwrap();
        assert!(progress.completed);

        let finalized = finalize_course_completion(
            &db_connection,
            &course,
            &progress,
            CompletionScope::CategoryWide,
            Some(&hook),
        )
        .unwrap();
        assert!(!finalized);

        // The profile hook did not double-apply either.
        assert_eq!(get_profile(&db_connection, 1).unwrap().resource_completed, 1);
    }

    #[test]
    fn video_title_completes_matching_milestone() {
        let db_connection = test_connection();
        let course = make_course(&db_connection, "Rust", 5);
        let modules = OutlinePlanner.generate(&course.title, &course.description).unwrap();
        let outcome = enroll(&db_connection, 1, &course, &modules).unwrap();
        let goal_id = outcome.goal_id.unwrap();

        let hook = ProfileCompletionHook;
        report_progress(
            &db_connection,
            &course,
            &ReportProgressRequest {
                user_id: 1,
                course_id: course.id,
                module_id: 1,
                seconds_watched: 600,
                completed: true,
                video_title: Some("Rust basics".to_string()),
                request_id: None,
            },
            date(2024, 3, 1),
            CompletionScope::CategoryWide,
            Some(&hook),
        )
        .unwrap();

        let goal = goals_store::get_goal(&db_connection, 1, goal_id).unwrap();
        assert_eq!(goal.milestone_completed_count, 1);

        let completed_title: String = db_connection
            .query_row(
                "SELECT title FROM milestones WHERE goal_id = (?1) AND is_completed = 1",
                params![goal_id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(completed_title, "Rust basics");
    }

    #[test]
    fn reports_accrue_hours_and_streak() {
        let db_connection = test_connection();
        let course = make_course(&db_connection, "Rust", 5);
        enroll(&db_connection, 1, &course, &[]).unwrap();

        let result = report(&db_connection, &course, 1, 1800, false, None).unwrap();
        assert!((result.total_hours_learned - 0.5).abs() < 1e-9);
        assert_eq!(result.current_streak, 1);

        // Same-day follow-up keeps the streak flat.
        let result = report(&db_connection, &course, 2, 1800, false, None).unwrap();
        assert!((result.total_hours_learned - 1.0).abs() < 1e-9);
        assert_eq!(result.current_streak, 1);
    }

    #[test]
    fn negative_time_is_rejected_before_mutation() {
        let db_connection = test_connection();
        let course = make_course(&db_connection, "Rust", 2);
        enroll(&db_connection, 1, &course, &[]).unwrap();

        let result = report(&db_connection, &course, 1, -10, false, None);
        assert!(matches!(result, Err(ApiError::Validation(_))));

        let count: i64 = db_connection
            .query_row("SELECT COUNT(*) FROM module_progress", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
