use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use std::sync::{Arc, Mutex};

pub type DBConnection = Arc<Mutex<Connection>>;

pub type UserID = i64;

pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

pub fn parse_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn create_tables(connection: &Connection) -> rusqlite::Result<()> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS categories (name TEXT NOT NULL UNIQUE)",
        params![],
    )?;
    connection.execute(
        "CREATE TABLE IF NOT EXISTS courses (
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            category_id INTEGER NOT NULL,
            total_steps INTEGER NOT NULL)",
        params![],
    )?;
    connection.execute(
        "CREATE TABLE IF NOT EXISTS goals (
            user_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            category_id INTEGER,
            course_id INTEGER,
            status TEXT NOT NULL DEFAULT 'N',
            milestone_count INTEGER NOT NULL DEFAULT 0,
            milestone_completed_count INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            completed_at TEXT,
            version INTEGER NOT NULL DEFAULT 0)",
        params![],
    )?;
    connection.execute(
        "CREATE TABLE IF NOT EXISTS milestones (
            goal_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            is_completed INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            completed_at TEXT)",
        params![],
    )?;
    connection.execute(
        "CREATE TABLE IF NOT EXISTS course_progress (
            user_id INTEGER NOT NULL,
            course_id INTEGER NOT NULL,
            current_step INTEGER NOT NULL DEFAULT 0,
            completed INTEGER NOT NULL DEFAULT 0,
            last_accessed TEXT NOT NULL,
            version INTEGER NOT NULL DEFAULT 0,
            UNIQUE (user_id, course_id))",
        params![],
    )?;
    connection.execute(
        "CREATE TABLE IF NOT EXISTS module_progress (
            course_progress_id INTEGER NOT NULL,
            module_id INTEGER NOT NULL,
            is_completed INTEGER NOT NULL DEFAULT 0,
            time_spent_seconds INTEGER NOT NULL DEFAULT 0,
            completed_at TEXT,
            UNIQUE (course_progress_id, module_id))",
        params![],
    )?;
    connection.execute(
        "CREATE TABLE IF NOT EXISTS progress_receipts (
            course_progress_id INTEGER NOT NULL,
            module_id INTEGER NOT NULL,
            request_id TEXT NOT NULL,
            UNIQUE (course_progress_id, module_id, request_id))",
        params![],
    )?;
    connection.execute(
        "CREATE TABLE IF NOT EXISTS learning_stats (
            user_id INTEGER PRIMARY KEY,
            total_hours_learned REAL NOT NULL DEFAULT 0,
            current_streak INTEGER NOT NULL DEFAULT 0,
            last_learning_date TEXT)",
        params![],
    )?;
    connection.execute(
        "CREATE TABLE IF NOT EXISTS profiles (
            user_id INTEGER PRIMARY KEY,
            resource_completed INTEGER NOT NULL DEFAULT 0)",
        params![],
    )?;

    Ok(())
}
