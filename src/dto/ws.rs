use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dto::{
        common::{AnswerKeyView, LeaderboardEntry},
        sse::{
            AnswerLockedEvent, CountdownEvent, PauseStateEvent, QuestionActiveEvent, TickEvent,
        },
        validation::{validate_display_name, validate_pin},
    },
    state::quiz::{FieldPoints, QuestionId, QuestionType},
};

#[derive(Debug, Deserialize, Serialize, ToSchema)]
/// Messages accepted from contestant WebSocket clients.
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContestantInbound {
    /// Register or reclaim a name.
    Join(JoinRequest),
    /// Answer the active question.
    SubmitAnswer(SubmitAnswer),
    /// Page visibility report.
    Activity {
        /// `active` or `away`.
        status: ActivityStatus,
    },
    /// Client-side detection of suspicious behaviour.
    CheatDetected {
        #[serde(default)]
        reason: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

impl ContestantInbound {
    /// Parse a text frame.
    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate)]
/// Identification sent as the first message of a socket.
pub struct JoinRequest {
    #[validate(custom(function = "validate_display_name"))]
    pub name: String,
    #[validate(custom(function = "validate_pin"))]
    pub pin: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Validate, Clone, Default)]
/// Raw answer fields; which ones matter depends on the question type.
///
/// Free-text guesses are capped at 200 characters.
pub struct SubmitAnswer {
    pub question_id: QuestionId,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub artist: String,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub extra: String,
    #[serde(default)]
    pub choice: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
/// Visibility reported by the client.
pub enum ActivityStatus {
    Active,
    Away,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
/// Messages pushed to a contestant socket, tagged by `type`.
#[serde(tag = "type")]
pub enum ContestantMessage {
    #[serde(rename = "joined")]
    Joined { name: String, score: f64 },
    #[serde(rename = "join_error")]
    JoinError { message: String },
    #[serde(rename = "round.countdown")]
    Countdown(CountdownEvent),
    #[serde(rename = "question.active")]
    QuestionActive(QuestionActiveEvent),
    #[serde(rename = "timer.tick")]
    Tick(TickEvent),
    #[serde(rename = "pause.state")]
    PauseState(PauseStateEvent),
    #[serde(rename = "answer.locked")]
    AnswerLocked(AnswerLockedEvent),
    #[serde(rename = "answer.received")]
    AnswerReceived {
        question_id: QuestionId,
        submission_time: f64,
    },
    #[serde(rename = "answer.feedback")]
    AnswerFeedback(AnswerFeedback),
    #[serde(rename = "leaderboard.updated")]
    Leaderboard { entries: Vec<LeaderboardEntry> },
    #[serde(rename = "round.summary")]
    RoundSummary(RoundSummary),
    #[serde(rename = "player.flagged")]
    Flagged,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
/// Individual grading feedback sent after each reveal.
pub struct AnswerFeedback {
    pub question_id: QuestionId,
    pub question_type: QuestionType,
    pub submitted: bool,
    pub answer_key: AnswerKeyView,
    pub points: FieldPoints,
    pub max_points: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
/// One question of a contestant round summary.
pub struct RoundSummaryRow {
    pub question_id: QuestionId,
    pub position: u32,
    pub answer_key: AnswerKeyView,
    pub submitted: bool,
    pub points: f64,
    pub max_points: f64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
/// Per-contestant recap of a finished round.
pub struct RoundSummary {
    pub round: u32,
    pub answers: Vec<RoundSummaryRow>,
    /// Points earned in this round.
    pub round_points: f64,
    /// Overall score after the round.
    pub total: f64,
}
