use serde::Serialize;
use utoipa::ToSchema;

use crate::state::session::SessionPhase;

/// Session phase exposed to clients (REST/SSE/WebSocket).
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisibleSessionPhase {
    /// No sequencer is running.
    Idle,
    /// Pre-roll before a round.
    Countdown,
    /// A question accepts answers.
    Question,
    /// The answer is being revealed.
    AnswerReveal,
    /// Round summaries were broadcast.
    RoundFinalized,
}

impl From<&SessionPhase> for VisibleSessionPhase {
    fn from(value: &SessionPhase) -> Self {
        match value {
            SessionPhase::Idle => VisibleSessionPhase::Idle,
            SessionPhase::Countdown { .. } => VisibleSessionPhase::Countdown,
            SessionPhase::QuestionActive(_) => VisibleSessionPhase::Question,
            SessionPhase::AnswerReveal(_) => VisibleSessionPhase::AnswerReveal,
            SessionPhase::RoundFinalized { .. } => VisibleSessionPhase::RoundFinalized,
        }
    }
}
