//! Business logic powering the console REST routes. Sequencer control lives in
//! [`crate::services::sequencer`]; these helpers cover the short-lived console actions
//! that only read the session and write to the stores.

use tracing::{info, warn};

use crate::{
    dto::{
        admin::{
            ActionResponse, GradingRow, OverridePointsRequest, PauseResponse, PlayerSummary,
            QuestionGrading, RoundGradingResponse, RoundQuestionsResponse,
        },
        common::{AnswerKeyView, QuestionView},
        sse::AnswerLockedEvent,
        ws::ContestantMessage,
    },
    error::ServiceError,
    services::{
        leaderboard,
        sse_events::{
            broadcast_guard_blocked, broadcast_leaderboard, broadcast_pause_state,
            broadcast_registrations, send_to_contestant,
        },
    },
    state::{
        SharedState,
        quiz::{AnswerId, QuestionId},
        session::SessionPhase,
    },
};

/// Flip the pause flag of the running sequence and tell every audience.
pub async fn toggle_pause(state: &SharedState) -> Result<PauseResponse, ServiceError> {
    let paused = state.toggle_pause_if_live().ok_or_else(|| {
        ServiceError::InvalidState("pause requires a running question, countdown or reveal".into())
    })?;
    broadcast_pause_state(state, paused);
    info!(paused, "pause toggled");
    Ok(PauseResponse { paused })
}

/// Every answer of `round` with its answer key, for manual override.
pub async fn grading_data(
    state: &SharedState,
    round: u32,
) -> Result<RoundGradingResponse, ServiceError> {
    let quiz = state
        .content()
        .active_quiz()
        .await?
        .ok_or_else(|| ServiceError::NotFound("no active quiz".into()))?;
    let questions = state.content().questions_in_round(quiz.id, round).await?;

    let mut graded = Vec::with_capacity(questions.len());
    for question in &questions {
        let answers = state.sessions().answers_for_question(question.id).await?;
        graded.push(QuestionGrading {
            question: QuestionView::from(question),
            answer_key: AnswerKeyView::from(question),
            max_points: question.kind.max_points(),
            answers: answers.iter().map(GradingRow::from).collect(),
        });
    }
    Ok(RoundGradingResponse {
        round,
        questions: graded,
    })
}

/// Manually set one slot of an answer, then republish the leaderboard.
pub async fn override_points(
    state: &SharedState,
    answer_id: AnswerId,
    request: OverridePointsRequest,
) -> Result<GradingRow, ServiceError> {
    let answer = state
        .sessions()
        .override_points(answer_id, request.slot, request.value)
        .await?;
    info!(
        answer_id,
        contestant = %answer.contestant,
        slot = ?request.slot,
        value = request.value,
        "points overridden"
    );
    let entries = leaderboard::recompute(state).await?;
    broadcast_leaderboard(state, &entries);
    Ok(GradingRow::from(&answer))
}

/// Lock the answer of one contestant for the active question.
pub async fn lock_player(state: &SharedState, name: &str) -> Result<ActionResponse, ServiceError> {
    let SessionPhase::QuestionActive(active) = state.session_snapshot().phase else {
        return Err(ServiceError::InvalidState(
            "no question is accepting answers".into(),
        ));
    };
    state
        .sessions()
        .lock_contestant_answer(name, &active.question)
        .await?;
    if !send_to_contestant(
        state,
        name,
        &ContestantMessage::AnswerLocked(AnswerLockedEvent {
            question_id: active.question.id,
        }),
    ) {
        warn!(contestant = %name, "locked contestant is not connected");
    }
    info!(contestant = %name, question_id = active.question.id, "contestant answer locked");
    Ok(ActionResponse {
        message: format!("answer of `{name}` locked"),
    })
}

/// Open or close the registrations gate.
pub fn set_registrations(state: &SharedState, open: bool) -> ActionResponse {
    state.set_registrations_open(open);
    broadcast_registrations(state, open);
    info!(open, "registrations updated");
    ActionResponse {
        message: if open {
            "registrations open".into()
        } else {
            "registrations closed".into()
        },
    }
}

/// Move a question inside its round. Refused while a sequence is running.
pub async fn reposition(
    state: &SharedState,
    question_id: QuestionId,
    position: u32,
) -> Result<RoundQuestionsResponse, ServiceError> {
    // Holding the writer keeps a sequencer from starting mid-renumbering.
    let Some(writer) = state.claim_session() else {
        broadcast_guard_blocked(state, "reposition_question");
        return Err(ServiceError::SessionBusy);
    };
    let questions = state
        .content()
        .reposition_question(question_id, position)
        .await?;
    drop(writer);
    info!(question_id, position, "question repositioned");
    Ok(RoundQuestionsResponse {
        questions: questions.iter().map(QuestionView::from).collect(),
    })
}

/// Contestants with score, presence and connection count.
pub async fn players(state: &SharedState) -> Result<Vec<PlayerSummary>, ServiceError> {
    let contestants = state.sessions().contestants().await?;
    Ok(contestants
        .into_iter()
        .map(|contestant| {
            let connections = state
                .contestants()
                .get(&contestant.name)
                .map(|entry| entry.len())
                .unwrap_or_default();
            PlayerSummary {
                name: contestant.name,
                score: contestant.score,
                status: contestant.status,
                flagged: contestant.flagged,
                connections,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            memory::MemoryStore,
            models::{ContentFile, QuestionEntity, QuestionKindEntity},
            session_store::AnswerUpsert,
        },
        state::{
            AppState,
            quiz::{FieldPoints, PointSlot, SubmittedFields},
            session::SessionEvent,
        },
    };

    fn entity(position: u32, answer: &str) -> QuestionEntity {
        QuestionEntity {
            round: 1,
            position,
            duration: Duration::from_secs(30),
            kind: QuestionKindEntity::Text {
                question_text: format!("question {position}"),
                answer_text: answer.into(),
            },
        }
    }

    fn state() -> SharedState {
        let store = Arc::new(
            MemoryStore::from_content(ContentFile {
                title: "Pub quiz".into(),
                questions: vec![entity(1, "Lima"), entity(2, "Quito"), entity(3, "Bogota")],
            })
            .unwrap(),
        );
        AppState::new(AppConfig::default(), store.clone(), store)
    }

    #[tokio::test]
    async fn pause_is_refused_while_idle() {
        let state = state();
        let err = toggle_pause(&state).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
        assert!(!state.is_paused());
    }

    #[tokio::test]
    async fn pause_toggles_during_countdown() {
        let state = state();
        let mut public = state.public_sse().subscribe();
        let mut writer = state.claim_session().unwrap();
        writer
            .apply(SessionEvent::StartCountdown { round: 1 })
            .unwrap();

        assert!(toggle_pause(&state).await.unwrap().paused);
        assert!(!toggle_pause(&state).await.unwrap().paused);
        let first = public.recv().await.unwrap();
        assert_eq!(first.event.as_deref(), Some("pause.state"));
        assert_eq!(first.data, r#"{"paused":true}"#);
    }

    #[tokio::test]
    async fn override_survives_and_updates_leaderboard() {
        let state = state();
        state
            .sessions()
            .join_contestant("ana".into(), "1234".into(), true)
            .await
            .unwrap();
        let question = state.content().question_by_id(1).await.unwrap().unwrap();
        let answer = state
            .sessions()
            .upsert_answer(AnswerUpsert {
                contestant: "ana".into(),
                question,
                fields: SubmittedFields {
                    title: "Lma".into(),
                    ..Default::default()
                },
                submission_time: 4.0,
            })
            .await
            .unwrap()
            .unwrap();

        let row = override_points(
            &state,
            answer.id,
            OverridePointsRequest {
                slot: PointSlot::Secondary,
                value: 1.0,
            },
        )
        .await
        .unwrap();
        assert_eq!(row.overridden, [PointSlot::Secondary]);

        state
            .sessions()
            .set_points(answer.id, FieldPoints::default())
            .await
            .unwrap();
        let grading = grading_data(&state, 1).await.unwrap();
        assert_eq!(grading.questions.len(), 3);
        assert_eq!(grading.questions[0].answers[0].points.secondary, 1.0);

        let players = players(&state).await.unwrap();
        assert_eq!(players[0].score, 1.0);
        assert_eq!(players[0].connections, 0);
    }

    #[tokio::test]
    async fn lock_player_requires_active_question() {
        let state = state();
        let err = lock_player(&state, "ana").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidState(_)));
    }

    #[tokio::test]
    async fn reposition_is_refused_while_live() {
        let state = state();
        let moved = reposition(&state, 3, 1).await.unwrap();
        let order: Vec<_> = moved.questions.iter().map(|q| (q.id, q.position)).collect();
        assert_eq!(order, [(3, 1), (1, 2), (2, 3)]);

        let _writer = state.claim_session().unwrap();
        let err = reposition(&state, 1, 1).await.unwrap_err();
        assert!(matches!(err, ServiceError::SessionBusy));
    }
}
