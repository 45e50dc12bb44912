use rocket::serde::json::Json;
use rocket::{get, post, State};

use crate::data::DBConnection;
use crate::error::ApiResult;

use super::data::*;
use super::store;

#[get("/get_goals?<user_id>")]
pub fn get_goals(
    user_id: i64,
    db_connection: &State<DBConnection>,
) -> ApiResult<Json<GoalListResponse>> {
    let db_connection = db_connection.lock()?;

    store::get_goals(&db_connection, user_id).map(Json)
}

#[post("/create_goal", format = "json", data = "<request>")]
pub fn create_goal(
    request: Json<CreateGoalRequest>,
    db_connection: &State<DBConnection>,
) -> ApiResult<Json<CreateGoalResult>> {
    let db_connection = db_connection.lock()?;

    let goal_id = store::create_goal(
        &db_connection,
        request.user_id,
        &request.title,
        request.category_id,
        request.course_id,
        GoalStatus::NotStarted,
    )?;

    Ok(Json(CreateGoalResult { goal_id }))
}

#[post("/add_milestone", format = "json", data = "<request>")]
pub fn add_milestone(
    request: Json<AddMilestoneRequest>,
    db_connection: &State<DBConnection>,
) -> ApiResult<Json<AddMilestoneResult>> {
    let mut db_connection = db_connection.lock()?;
    let transaction = db_connection.transaction()?;

    let (milestone_id, goal) =
        store::add_milestone(&transaction, request.user_id, request.goal_id, &request.title)?;

    transaction.commit()?;

    Ok(Json(AddMilestoneResult {
        milestone_id,
        milestone_count: goal.milestone_count,
    }))
}

#[post("/toggle_milestone", format = "json", data = "<request>")]
pub fn toggle_milestone(
    request: Json<ToggleMilestoneRequest>,
    db_connection: &State<DBConnection>,
) -> ApiResult<Json<ToggleMilestoneResult>> {
    let mut db_connection = db_connection.lock()?;
    let transaction = db_connection.transaction()?;

    let (milestone, goal) =
        store::toggle_milestone(&transaction, request.user_id, request.milestone_id)?;

    transaction.commit()?;

    Ok(Json(ToggleMilestoneResult {
        is_completed: milestone.is_completed,
        goal_id: goal.id,
        progress_percent: goal.progress_percentage(),
        milestone_count: goal.milestone_count,
        milestone_completed_count: goal.milestone_completed_count,
        goal_status: goal.status.label(),
        goal_status_code: goal.status.code(),
    }))
}

#[post("/update_goal_status", format = "json", data = "<request>")]
pub fn update_goal_status(
    request: Json<UpdateGoalStatusRequest>,
    db_connection: &State<DBConnection>,
) -> ApiResult<Json<UpdateGoalStatusResult>> {
    let mut db_connection = db_connection.lock()?;
    let transaction = db_connection.transaction()?;

    let goal = store::update_goal_status(
        &transaction,
        request.user_id,
        request.goal_id,
        &request.new_status,
    )?;

    transaction.commit()?;

    Ok(Json(UpdateGoalStatusResult {
        goal_id: goal.id,
        new_status: goal.status.label(),
        new_status_code: goal.status.code(),
    }))
}
