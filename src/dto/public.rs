use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::{common::{LeaderboardEntry, QuestionView}, phase::VisibleSessionPhase};

/// Ordered leaderboard of the active quiz.
#[derive(Debug, Serialize, ToSchema)]
pub struct LeaderboardResponse {
    pub entries: Vec<LeaderboardEntry>,
}

/// Read-only view of the live session.
#[derive(Debug, Serialize, ToSchema)]
pub struct SessionResponse {
    pub phase: VisibleSessionPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round: Option<u32>,
    /// Present during question and reveal phases.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionView>,
    /// Time left in the running window, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_secs: Option<f64>,
    pub paused: bool,
}
