use rusqlite::Connection;

use std::error::Error;
use std::sync::{Arc, Mutex};

mod config;
mod courses;
mod data;
mod error;
mod goals;
mod profile;
mod roadmap;
mod stats;

use config::AppConfig;
use profile::{CompletionHooks, ProfileCompletionHook};
use roadmap::{OutlinePlanner, RoadmapState};

#[macro_use]
extern crate rocket;

#[rocket::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let connection = Connection::open("learnhub.db")?;
    data::create_tables(&connection)?;
    let connection = Arc::new(Mutex::new(connection));

    let rocket = rocket::build();
    let app_config: AppConfig = rocket
        .figment()
        .extract_inner("learnhub")
        .unwrap_or_default();

    rocket
        .manage(connection.clone())
        .manage(app_config)
        .manage(RoadmapState(Arc::new(OutlinePlanner)))
        .manage(CompletionHooks(Some(Arc::new(ProfileCompletionHook))))
        .mount(
            "/api",
            routes![
                goals::endpoints::get_goals,
                goals::endpoints::create_goal,
                goals::endpoints::add_milestone,
                goals::endpoints::toggle_milestone,
                goals::endpoints::update_goal_status,
                courses::endpoints::create_course,
                courses::endpoints::enroll,
                courses::endpoints::report_progress,
                courses::endpoints::get_stats,
            ],
        )
        .launch()
        .await?;

    Ok(())
}
