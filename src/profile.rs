use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use std::sync::Arc;

use crate::data::UserID;
use crate::error::ApiResult;

#[derive(Serialize, Debug, Clone)]
pub struct UserProfile {
    pub user_id: UserID,
    pub resource_completed: i64,
}

/// Optional capability invoked when a user finishes a course. Resolved once
/// at construction; the reconciler never probes for it per call.
pub trait CompletionHook: Send + Sync {
    fn on_course_completed(&self, db_connection: &Connection, user_id: UserID) -> ApiResult<()>;
}

/// Managed-state wrapper; `None` means the capability is declared absent.
pub struct CompletionHooks(pub Option<Arc<dyn CompletionHook>>);

/// Bumps the profile's completed-resource counter, creating the profile row
/// on first completion.
pub struct ProfileCompletionHook;

impl CompletionHook for ProfileCompletionHook {
    fn on_course_completed(&self, db_connection: &Connection, user_id: UserID) -> ApiResult<()> {
        db_connection.execute(
            "INSERT INTO profiles (user_id, resource_completed) VALUES (?1, 1)
             ON CONFLICT (user_id) DO UPDATE SET resource_completed = resource_completed + 1",
            params![user_id],
        )?;
        Ok(())
    }
}

pub fn get_profile(db_connection: &Connection, user_id: UserID) -> ApiResult<UserProfile> {
    let profile = db_connection
        .query_row(
            "SELECT resource_completed FROM profiles WHERE user_id = (?1)",
            params![user_id],
            |row| {
                Ok(UserProfile {
                    user_id,
                    resource_completed: row.get(0)?,
                })
            },
        )
        .optional()?;

    Ok(profile.unwrap_or(UserProfile {
        user_id,
        resource_completed: 0,
    }))
}
