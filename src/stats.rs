use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use crate::data::UserID;
use crate::error::ApiResult;

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct LearningStats {
    pub total_hours_learned: f64,
    pub current_streak: i64,
    pub last_learning_date: Option<NaiveDate>,
}

impl LearningStats {
    fn empty() -> LearningStats {
        LearningStats {
            total_hours_learned: 0.0,
            current_streak: 0,
            last_learning_date: None,
        }
    }
}

/// Advances the consecutive-day streak for activity on `today`.
///
/// Same-day activity is idempotent: the stored date is refreshed but the
/// streak number does not move. A one-day gap extends the streak, anything
/// else resets it to 1.
pub fn update_streak(stats: &mut LearningStats, today: NaiveDate) {
    match stats.last_learning_date {
        Some(last) if last == today => {}
        Some(last) if today.signed_duration_since(last).num_days() == 1 => {
            stats.current_streak += 1;
        }
        _ => {
            stats.current_streak = 1;
        }
    }
    stats.last_learning_date = Some(today);
}

pub fn get_stats(db_connection: &Connection, user_id: UserID) -> ApiResult<LearningStats> {
    let stats = db_connection
        .query_row(
            "SELECT total_hours_learned, current_streak, last_learning_date
             FROM learning_stats WHERE user_id = (?1)",
            params![user_id],
            |row| {
                let raw_date: Option<String> = row.get(2)?;
                Ok(LearningStats {
                    total_hours_learned: row.get(0)?,
                    current_streak: row.get(1)?,
                    last_learning_date: raw_date
                        .and_then(|d| NaiveDate::parse_from_str(&d, "%Y-%m-%d").ok()),
                })
            },
        )
        .optional()?;

    Ok(stats.unwrap_or_else(LearningStats::empty))
}

/// Accrues watched time into the hour total and advances the streak, within
/// the caller's transaction.
pub fn record_learning(
    db_connection: &Connection,
    user_id: UserID,
    seconds_watched: i64,
    today: NaiveDate,
) -> ApiResult<LearningStats> {
    let mut stats = get_stats(db_connection, user_id)?;

    stats.total_hours_learned += seconds_watched as f64 / 3600.0;
    update_streak(&mut stats, today);

    db_connection.execute(
        "INSERT INTO learning_stats (user_id, total_hours_learned, current_streak, last_learning_date)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (user_id) DO UPDATE SET
            total_hours_learned = excluded.total_hours_learned,
            current_streak = excluded.current_streak,
            last_learning_date = excluded.last_learning_date",
        params![
            user_id,
            stats.total_hours_learned,
            stats.current_streak,
            stats
                .last_learning_date
                .map(|d| d.format("%Y-%m-%d").to_string()),
        ],
    )?;

    Ok(stats)
}
