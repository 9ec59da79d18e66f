use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dto::{
        admin::GradingRow,
        common::{AnswerKeyView, LeaderboardEntry, QuestionView},
        phase::VisibleSessionPhase,
    },
    state::quiz::{PresenceStatus, QuestionId},
};

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    pub event: Option<String>,
    pub data: String,
}

impl ServerEvent {
    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Identifier of the SSE stream (`public` or `admin`).
    pub stream: String,
    /// Human-readable message confirming the subscription.
    pub message: String,
    /// Token to send back in the `X-Admin-Token` header; only on the console stream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
/// Pre-roll announced before the first question of a round.
pub struct CountdownEvent {
    pub round: u32,
    pub seconds: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
/// A question opened for answers, or a catch-up copy of it.
pub struct QuestionActiveEvent {
    pub question: QuestionView,
    /// Time left when the event was produced; never more than the unused window.
    pub remaining_secs: f64,
    pub duration_secs: f64,
    /// RFC 3339 start of the answer window.
    pub started_at: String,
    pub paused: bool,
    /// Only sent to the console.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer_key: Option<AnswerKeyView>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
/// Remaining-time tick of the running window.
pub struct TickEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question_id: Option<QuestionId>,
    pub phase: VisibleSessionPhase,
    pub remaining_secs: f64,
    pub total_secs: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
/// Pause flag toggled by the console.
pub struct PauseStateEvent {
    pub paused: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
/// Submission window of a question closed.
pub struct AnswerLockedEvent {
    pub question_id: QuestionId,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
/// Answer reveal for the display and the console.
pub struct AnswerRevealEvent {
    pub question_id: QuestionId,
    pub answer_key: AnswerKeyView,
    pub leaderboard: Vec<LeaderboardEntry>,
    /// Only sent to the console.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grading: Option<Vec<GradingRow>>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(transparent)]
/// Broadcast whenever scores were recomputed.
pub struct LeaderboardEvent(pub Vec<LeaderboardEntry>);

#[derive(Debug, Clone, Serialize, ToSchema)]
/// Aggregate summary shown on the public display once a round ends.
pub struct RoundFinishedEvent {
    pub round: u32,
    /// Answer keys of every question of the round; omitted on the console stream.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answers: Option<Vec<AnswerKeyView>>,
    pub leaderboard: Vec<LeaderboardEntry>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
/// A contestant joined or reconnected.
pub struct PlayerJoinedEvent {
    pub name: String,
    pub score: f64,
    pub reconnected: bool,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
/// Presence of a contestant changed.
pub struct PlayerStatusEvent {
    pub name: String,
    pub status: PresenceStatus,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
/// A contestant was locked out after an activity report.
pub struct PlayerFlaggedEvent {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
/// A contestant answer was recorded.
pub struct AnswerSubmittedEvent {
    pub contestant: String,
    pub question_id: QuestionId,
    pub submission_time: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
/// A console action was refused because a sequence is running.
pub struct LiveGuardBlockedEvent {
    pub action: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
/// Registrations gate changed.
pub struct RegistrationsEvent {
    pub open: bool,
}
