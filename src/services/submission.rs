//! Answer submission gate: one answer per contestant and question, inside the active window.

use thiserror::Error;
use tracing::debug;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::session_store::AnswerUpsert,
    dto::ws::SubmitAnswer,
    error::ServiceError,
    state::{
        SharedState,
        quiz::{Answer, QuestionId, SubmittedFields},
        session::SessionPhase,
    },
};

/// Reasons a submission is dropped. None of them is reported to the contestant.
#[derive(Debug, Error)]
pub enum SubmissionRejected {
    #[error("invalid answer payload: {0}")]
    Invalid(#[from] ValidationErrors),
    #[error("no question is accepting answers")]
    NotAccepting,
    #[error("question {submitted} is not the active question {active}")]
    WrongQuestion {
        submitted: QuestionId,
        active: QuestionId,
    },
    #[error("answer window of question {0} is closed")]
    WindowClosed(QuestionId),
    #[error("contestant `{0}` is flagged")]
    Flagged(String),
    #[error("contestant `{0}` is not registered")]
    UnknownContestant(String),
    #[error("answer of `{0}` is locked or its question is closed")]
    Locked(String),
    #[error(transparent)]
    Storage(#[from] ServiceError),
}

/// Record the answer of `contestant` for the active question.
///
/// The submission time is measured by the server on the pause-aware question clock.
pub async fn submit(
    state: &SharedState,
    contestant: &str,
    request: SubmitAnswer,
) -> Result<Answer, SubmissionRejected> {
    request.validate()?;
    let snapshot = state.session_snapshot();
    let SessionPhase::QuestionActive(active) = &snapshot.phase else {
        return Err(SubmissionRejected::NotAccepting);
    };
    if active.question.id != request.question_id {
        return Err(SubmissionRejected::WrongQuestion {
            submitted: request.question_id,
            active: active.question.id,
        });
    }
    let clock = snapshot
        .window
        .as_ref()
        .ok_or(SubmissionRejected::NotAccepting)?;
    if clock.remaining().is_zero() {
        return Err(SubmissionRejected::WindowClosed(active.question.id));
    }
    let submission_time = clock.elapsed().as_secs_f64();

    let registered = state
        .sessions()
        .contestant(contestant)
        .await
        .map_err(ServiceError::from)?
        .ok_or_else(|| SubmissionRejected::UnknownContestant(contestant.to_string()))?;
    if registered.flagged {
        return Err(SubmissionRejected::Flagged(contestant.to_string()));
    }

    let upsert = AnswerUpsert {
        contestant: contestant.to_string(),
        question: active.question.clone(),
        fields: SubmittedFields {
            artist: request.artist,
            title: request.title,
            extra: request.extra,
            choice: request.choice,
        },
        submission_time,
    };
    let stored = state
        .sessions()
        .upsert_answer(upsert)
        .await
        .map_err(ServiceError::from)?;
    let answer = stored.ok_or_else(|| SubmissionRejected::Locked(contestant.to_string()))?;
    debug!(
        contestant,
        question_id = answer.question_id,
        submission_time,
        "answer recorded"
    );
    Ok(answer)
}
