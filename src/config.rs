use serde::Deserialize;

/// Policy for the goal bulk-update performed when a course is finished.
///
/// `CategoryWide` completes every open goal in the finished course's category;
/// `SingleGoal` only completes the goal tied to that specific course.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompletionScope {
    SingleGoal,
    CategoryWide,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppConfig {
    #[serde(default = "default_completion_scope")]
    pub completion_scope: CompletionScope,
}

fn default_completion_scope() -> CompletionScope {
    CompletionScope::CategoryWide
}

impl Default for AppConfig {
    fn default() -> AppConfig {
        AppConfig {
            completion_scope: CompletionScope::CategoryWide,
        }
    }
}
