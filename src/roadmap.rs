use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::sync::Arc;

#[derive(Debug, Error)]
pub enum RoadmapError {
    #[error("roadmap provider unavailable: {0}")]
    Unavailable(String),
    #[error("malformed roadmap payload: {0}")]
    Malformed(String),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RoadmapVideo {
    pub title: String,
    pub url: String,
    pub duration_minutes: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct RoadmapModule {
    pub step_number: usize,
    pub title: String,
    pub videos: Vec<RoadmapVideo>,
    pub total_minutes: u32,
}

/// Boundary to the roadmap generation services (outline model + video search).
/// The core only consumes module titles and video titles; everything behind
/// this trait is an external collaborator.
pub trait RoadmapSource: Send + Sync {
    fn generate(
        &self,
        course_title: &str,
        description: &str,
    ) -> Result<Vec<RoadmapModule>, RoadmapError>;
}

/// Managed-state wrapper so the provider can be swapped at construction.
pub struct RoadmapState(pub Arc<dyn RoadmapSource>);

/// Deterministic outline builder: a fixed four-step course skeleton with
/// search-style video placeholders derived from the course title.
pub struct OutlinePlanner;

const OUTLINE_STEPS: [&str; 4] = [
    "Introduction to the Topic and Core Concepts",
    "Deep Dive into Practical Application",
    "Advanced Techniques and Optimization",
    "Review, Projects, and Next Steps",
];

impl RoadmapSource for OutlinePlanner {
    fn generate(
        &self,
        course_title: &str,
        _description: &str,
    ) -> Result<Vec<RoadmapModule>, RoadmapError> {
        let mut videos = vec![
            RoadmapVideo {
                title: format!("{} basics", course_title),
                url: format!("https://videos.example/search?q={}+basics", course_title),
                duration_minutes: 10,
            },
            RoadmapVideo {
                title: format!("Advanced {}", course_title),
                url: format!("https://videos.example/search?q=advanced+{}", course_title),
                duration_minutes: 15,
            },
            RoadmapVideo {
                title: format!("{} walkthrough", course_title),
                url: format!(
                    "https://videos.example/search?q={}+walkthrough",
                    course_title
                ),
                duration_minutes: 20,
            },
        ];
        videos.reverse();

        let modules = OUTLINE_STEPS
            .iter()
            .enumerate()
            .map(|(i, step_title)| {
                let step_videos: Vec<RoadmapVideo> = videos.pop().into_iter().collect();
                let total_minutes = step_videos.iter().map(|v| v.duration_minutes).sum();

                RoadmapModule {
                    step_number: i + 1,
                    title: step_title.to_string(),
                    videos: step_videos,
                    total_minutes,
                }
            })
            .collect();

        Ok(modules)
    }
}
