use futures::future::BoxFuture;
use indexmap::IndexMap;

use crate::{
    dao::storage::StorageResult,
    state::quiz::{
        Answer, AnswerId, Contestant, FieldPoints, PointSlot, PresenceStatus, Question,
        QuestionId, QuizId, SubmittedFields,
    },
};

/// Write request produced by the submission gate.
#[derive(Debug, Clone)]
pub struct AnswerUpsert {
    /// Contestant name.
    pub contestant: String,
    /// Answered question.
    pub question: Question,
    /// Raw fields.
    pub fields: SubmittedFields,
    /// Seconds since the question became active.
    pub submission_time: f64,
}

/// Persistence for contestants and their answers during a session.
pub trait SessionStore: Send + Sync {
    /// Register a new contestant or verify the PIN of an existing one.
    fn join_contestant(
        &self,
        name: String,
        pin: String,
        registrations_open: bool,
    ) -> BoxFuture<'_, StorageResult<Contestant>>;
    /// Lookup by name.
    fn contestant(&self, name: &str) -> BoxFuture<'_, StorageResult<Option<Contestant>>>;
    /// Every contestant ordered by registration.
    fn contestants(&self) -> BoxFuture<'_, StorageResult<Vec<Contestant>>>;
    /// Update presence.
    fn set_status(
        &self,
        name: &str,
        status: PresenceStatus,
    ) -> BoxFuture<'_, StorageResult<Contestant>>;
    /// Permanently lock a contestant out of further submissions.
    fn flag_contestant(&self, name: &str) -> BoxFuture<'_, StorageResult<Contestant>>;
    /// Insert or overwrite the answer of a contestant for a question.
    ///
    /// Returns `None` when the row is locked or the question is closed; the write is dropped.
    fn upsert_answer(&self, upsert: AnswerUpsert) -> BoxFuture<'_, StorageResult<Option<Answer>>>;
    /// Lock every answer of a question and close it to further writes.
    fn lock_answers(&self, question_id: QuestionId) -> BoxFuture<'_, StorageResult<usize>>;
    /// Open a question to writes again before it is played, unlocking its rows.
    fn reopen_answers(&self, question_id: QuestionId) -> BoxFuture<'_, StorageResult<()>>;
    /// Lock (creating an empty row if needed) the answer of one contestant.
    fn lock_contestant_answer(
        &self,
        contestant: &str,
        question: &Question,
    ) -> BoxFuture<'_, StorageResult<Answer>>;
    /// Lookup by primary key.
    fn answer(&self, id: AnswerId) -> BoxFuture<'_, StorageResult<Option<Answer>>>;
    /// Answers of a question.
    fn answers_for_question(
        &self,
        question_id: QuestionId,
    ) -> BoxFuture<'_, StorageResult<Vec<Answer>>>;
    /// Answers of a round of a quiz.
    fn answers_for_round(
        &self,
        quiz_id: QuizId,
        round: u32,
    ) -> BoxFuture<'_, StorageResult<Vec<Answer>>>;
    /// Every answer of a quiz.
    fn answers_for_quiz(&self, quiz_id: QuizId) -> BoxFuture<'_, StorageResult<Vec<Answer>>>;
    /// Store auto-graded points, keeping manually overridden slots untouched.
    fn set_points(
        &self,
        id: AnswerId,
        points: FieldPoints,
    ) -> BoxFuture<'_, StorageResult<Answer>>;
    /// Set a single slot from the console and mark it overridden.
    fn override_points(
        &self,
        id: AnswerId,
        slot: PointSlot,
        value: f64,
    ) -> BoxFuture<'_, StorageResult<Answer>>;
    /// Overwrite every contestant score; names missing from `scores` are reset to zero.
    fn set_scores(&self, scores: IndexMap<String, f64>) -> BoxFuture<'_, StorageResult<()>>;
}
