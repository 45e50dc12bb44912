use chrono::Utc;
use rocket::serde::json::Json;
use rocket::{get, post, State};

use crate::config::AppConfig;
use crate::data::DBConnection;
use crate::error::ApiResult;
use crate::profile::CompletionHooks;
use crate::roadmap::RoadmapState;
use crate::stats::LearningStats;
use crate::{profile, stats};

use super::data::*;
use super::store;

#[post("/create_course", format = "json", data = "<request>")]
pub fn create_course(
    request: Json<CreateCourseRequest>,
    db_connection: &State<DBConnection>,
) -> ApiResult<Json<CreateCourseResult>> {
    let db_connection = db_connection.lock()?;

    store::create_course(&db_connection, &request).map(Json)
}

#[post("/enroll", format = "json", data = "<request>")]
pub fn enroll(
    request: Json<EnrollRequest>,
    db_connection: &State<DBConnection>,
    roadmap: &State<RoadmapState>,
) -> ApiResult<Json<EnrollResult>> {
    let mut db_connection = db_connection.lock()?;
    let transaction = db_connection.transaction()?;

    let course = store::get_course(&transaction, request.course_id)?;

    let (modules, warning) = store::roadmap_or_fallback(roadmap.0.as_ref(), &course);

    let outcome = store::enroll(&transaction, request.user_id, &course, &modules)?;

    transaction.commit()?;

    Ok(Json(EnrollResult {
        course_progress_id: outcome.course_progress_id,
        goal_id: outcome.goal_id,
        created: outcome.created,
        modules,
        milestones_created: outcome.milestones_created,
        warning,
    }))
}

#[post("/report_progress", format = "json", data = "<request>")]
pub fn report_progress(
    request: Json<ReportProgressRequest>,
    db_connection: &State<DBConnection>,
    config: &State<AppConfig>,
    hooks: &State<CompletionHooks>,
) -> ApiResult<Json<ReportProgressResult>> {
    let mut db_connection = db_connection.lock()?;
    let transaction = db_connection.transaction()?;

    let course = store::get_course(&transaction, request.course_id)?;

    let result = store::report_progress(
        &transaction,
        &course,
        &request,
        Utc::now().date_naive(),
        config.completion_scope,
        hooks.0.as_deref(),
    )?;

    transaction.commit()?;

    Ok(Json(result))
}

#[derive(serde::Serialize, Debug)]
pub struct UserStatsResponse {
    #[serde(flatten)]
    pub stats: LearningStats,
    pub resource_completed: i64,
}

#[get("/get_stats?<user_id>")]
pub fn get_stats(
    user_id: i64,
    db_connection: &State<DBConnection>,
) -> ApiResult<Json<UserStatsResponse>> {
    let db_connection = db_connection.lock()?;

    let stats = stats::get_stats(&db_connection, user_id)?;
    let user_profile = profile::get_profile(&db_connection, user_id)?;

    Ok(Json(UserStatsResponse {
        stats,
        resource_completed: user_profile.resource_completed,
    }))
}
