//! DTO definitions used by the console REST API and documentation layer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    dto::common::{AnswerKeyView, LeaderboardEntry, QuestionView},
    state::quiz::{Answer, AnswerId, FieldPoints, PointSlot, PresenceStatus, QuestionId},
};

/// Start autoplay of a round, optionally from a given question.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct StartAutoplayRequest {
    #[validate(range(min = 1))]
    pub round: u32,
    /// Defaults to the first question of the round.
    #[serde(default)]
    pub question_id: Option<QuestionId>,
}

/// Response emitted when autoplay was scheduled.
#[derive(Debug, Serialize, ToSchema)]
pub struct AutoplayStartedResponse {
    pub round: u32,
    pub question_id: QuestionId,
}

/// Request to finalize a round without playing it.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct FinalizeRoundRequest {
    #[validate(range(min = 1))]
    pub round: u32,
}

/// Leaderboard after a manual finalize.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoundFinalizedResponse {
    pub round: u32,
    pub leaderboard: Vec<LeaderboardEntry>,
}

/// Current pause flag.
#[derive(Debug, Serialize, ToSchema)]
pub struct PauseResponse {
    pub paused: bool,
}

/// Manually set the points of one answer slot.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct OverridePointsRequest {
    pub slot: PointSlot,
    #[validate(range(min = 0.0, max = 1.0))]
    pub value: f64,
}

/// Lock the answer of a single contestant for the active question.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct LockPlayerRequest {
    #[validate(length(min = 1))]
    pub name: String,
}

/// Open or close registrations.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegistrationsRequest {
    pub open: bool,
}

/// Move a question inside its round.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct RepositionRequest {
    #[validate(range(min = 1))]
    pub position: u32,
}

/// Round questions after a reposition.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoundQuestionsResponse {
    pub questions: Vec<QuestionView>,
}

/// Contestant as listed on the console.
#[derive(Debug, Serialize, ToSchema)]
pub struct PlayerSummary {
    pub name: String,
    pub score: f64,
    pub status: PresenceStatus,
    pub flagged: bool,
    /// Number of open sockets.
    pub connections: usize,
}

/// One recorded answer with its current points.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GradingRow {
    pub answer_id: AnswerId,
    pub contestant: String,
    pub artist: String,
    pub title: String,
    pub extra: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choice: Option<usize>,
    pub points: FieldPoints,
    /// Slots set manually; re-grading leaves them untouched.
    pub overridden: Vec<PointSlot>,
    pub submission_time: f64,
    pub locked: bool,
}

impl From<&Answer> for GradingRow {
    fn from(answer: &Answer) -> Self {
        Self {
            answer_id: answer.id,
            contestant: answer.contestant.clone(),
            artist: answer.fields.artist.clone(),
            title: answer.fields.title.clone(),
            extra: answer.fields.extra.clone(),
            choice: answer.fields.choice,
            points: answer.points,
            overridden: answer.overridden.clone(),
            submission_time: answer.submission_time,
            locked: answer.locked,
        }
    }
}

/// Grading data of one question.
#[derive(Debug, Serialize, ToSchema)]
pub struct QuestionGrading {
    pub question: QuestionView,
    pub answer_key: AnswerKeyView,
    pub max_points: f64,
    pub answers: Vec<GradingRow>,
}

/// Grading data of a whole round, for manual override.
#[derive(Debug, Serialize, ToSchema)]
pub struct RoundGradingResponse {
    pub round: u32,
    pub questions: Vec<QuestionGrading>,
}

/// Generic action acknowledgement used by console endpoints.
#[derive(Debug, Serialize, ToSchema)]
pub struct ActionResponse {
    pub message: String,
}
