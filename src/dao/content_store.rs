use futures::future::BoxFuture;

use crate::{
    dao::storage::StorageResult,
    state::quiz::{Question, QuestionId, Quiz, QuizId},
};

/// Content collaborator consumed by the live orchestrator.
///
/// Authoring happens elsewhere; the orchestrator only reads questions, except for
/// [`ContentStore::reposition_question`] which must keep `(quiz, round, position)` unique
/// at every intermediate step.
pub trait ContentStore: Send + Sync {
    /// The single quiz currently marked active, if any.
    fn active_quiz(&self) -> BoxFuture<'_, StorageResult<Option<Quiz>>>;
    /// First question of `round` by position.
    fn first_question(
        &self,
        quiz_id: QuizId,
        round: u32,
    ) -> BoxFuture<'_, StorageResult<Option<Question>>>;
    /// Question following `after_position` in the same round.
    fn next_question(
        &self,
        quiz_id: QuizId,
        round: u32,
        after_position: u32,
    ) -> BoxFuture<'_, StorageResult<Option<Question>>>;
    /// Lookup by primary key.
    fn question_by_id(&self, id: QuestionId) -> BoxFuture<'_, StorageResult<Option<Question>>>;
    /// Every question of a round ordered by position.
    fn questions_in_round(
        &self,
        quiz_id: QuizId,
        round: u32,
    ) -> BoxFuture<'_, StorageResult<Vec<Question>>>;
    /// Move a question to `position` (1-based) inside its round and renumber the others.
    fn reposition_question(
        &self,
        id: QuestionId,
        position: u32,
    ) -> BoxFuture<'_, StorageResult<Vec<Question>>>;
}
