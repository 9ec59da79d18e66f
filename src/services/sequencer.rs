//! Round sequencer: the single background task allowed to advance the live session.

use std::{collections::HashMap, time::SystemTime};

use tracing::{error, info};

use crate::{
    dto::{
        admin::{AutoplayStartedResponse, GradingRow, RoundFinalizedResponse},
        common::{AnswerKeyView, LeaderboardEntry},
        phase::VisibleSessionPhase,
        sse::{AnswerLockedEvent, AnswerRevealEvent, CountdownEvent, RoundFinishedEvent, TickEvent},
        ws::{AnswerFeedback, ContestantMessage, RoundSummary, RoundSummaryRow},
    },
    error::ServiceError,
    services::{
        catch_up::question_active_event,
        grading::grade_batch,
        leaderboard,
        sse_events::{
            broadcast_answer_locked, broadcast_countdown, broadcast_guard_blocked,
            broadcast_leaderboard, broadcast_pause_state, broadcast_question_active,
            broadcast_reveal, broadcast_round_finished, broadcast_tick, connected_contestants,
            send_to_contestant,
        },
    },
    state::{
        SessionWriter, SharedState,
        quiz::{Answer, Question, QuestionId, Quiz, QuizId},
        session::{ActiveQuestion, SessionEvent},
        timer::{ClockEvent, PausableClock, drive},
    },
};

/// Start autoplay of `round`, from `question_id` or from the first question of the round.
///
/// The round runs in a background task; this returns as soon as it is scheduled.
pub async fn start_autoplay(
    state: &SharedState,
    round: u32,
    question_id: Option<QuestionId>,
) -> Result<AutoplayStartedResponse, ServiceError> {
    let writer = claim(state, "start_autoplay")?;
    let quiz = active_quiz(state).await?;
    let first = match question_id {
        Some(id) => {
            let question = find_question(state, id).await?;
            if question.quiz_id != quiz.id || question.round_number != round {
                return Err(ServiceError::InvalidInput(format!(
                    "question {id} does not belong to round {round} of the active quiz"
                )));
            }
            question
        }
        None => state
            .content()
            .first_question(quiz.id, round)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("round {round} has no questions")))?,
    };

    info!(round, question_id = first.id, quiz_id = quiz.id, "autoplay scheduled");
    let response = AutoplayStartedResponse {
        round,
        question_id: first.id,
    };
    let task_state = state.clone();
    tokio::spawn(async move {
        let mut writer = writer;
        if let Err(err) = run_round(&task_state, &mut writer, first).await {
            error!(round, error = %err, "round aborted; restart it from the console");
        }
        wind_down(&task_state, writer);
    });
    Ok(response)
}

/// Play one question without countdown or round finalization.
pub async fn play_single(
    state: &SharedState,
    question_id: QuestionId,
) -> Result<AutoplayStartedResponse, ServiceError> {
    let writer = claim(state, "play_question")?;
    let question = find_question(state, question_id).await?;

    info!(question_id, round = question.round_number, "single question scheduled");
    let response = AutoplayStartedResponse {
        round: question.round_number,
        question_id,
    };
    let task_state = state.clone();
    tokio::spawn(async move {
        let mut writer = writer;
        if let Err(err) = play_question(&task_state, &mut writer, &question).await {
            error!(question_id, error = %err, "single question aborted");
        }
        wind_down(&task_state, writer);
    });
    Ok(response)
}

/// Finalize `round` immediately, without playing it.
pub async fn finalize_round_now(
    state: &SharedState,
    round: u32,
) -> Result<RoundFinalizedResponse, ServiceError> {
    let mut writer = claim(state, "finalize_round")?;
    let quiz = active_quiz(state).await?;
    let leaderboard = finalize_round(state, &mut writer, quiz.id, round).await;
    wind_down(state, writer);
    let leaderboard = leaderboard?;
    Ok(RoundFinalizedResponse { round, leaderboard })
}

fn claim(state: &SharedState, action: &str) -> Result<SessionWriter, ServiceError> {
    state.claim_session().ok_or_else(|| {
        broadcast_guard_blocked(state, action);
        ServiceError::SessionBusy
    })
}

async fn active_quiz(state: &SharedState) -> Result<Quiz, ServiceError> {
    state
        .content()
        .active_quiz()
        .await?
        .ok_or_else(|| ServiceError::NotFound("no active quiz".into()))
}

async fn find_question(state: &SharedState, id: QuestionId) -> Result<Question, ServiceError> {
    state
        .content()
        .question_by_id(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("question {id} not found")))
}

/// Release the session, then clear a leftover pause.
fn wind_down(state: &SharedState, writer: SessionWriter) {
    drop(writer);
    if state.clear_pause() {
        broadcast_pause_state(state, false);
    }
}

async fn run_round(
    state: &SharedState,
    writer: &mut SessionWriter,
    first: Question,
) -> Result<(), ServiceError> {
    let round = first.round_number;
    let quiz_id = first.quiz_id;

    writer.apply(SessionEvent::StartCountdown { round })?;
    let mut clock = PausableClock::start(state.config().countdown(), state.is_paused());
    writer.set_window(Some(clock));
    broadcast_countdown(
        state,
        CountdownEvent {
            round,
            seconds: clock.total().as_secs_f64(),
        },
    );
    info!(round, "round countdown started");
    run_window(state, writer, &mut clock, None, VisibleSessionPhase::Countdown).await;

    let mut next = Some(first);
    while let Some(question) = next {
        play_question(state, writer, &question).await?;
        next = state
            .content()
            .next_question(quiz_id, round, question.position)
            .await?;
    }

    finalize_round(state, writer, quiz_id, round).await?;
    Ok(())
}

async fn play_question(
    state: &SharedState,
    writer: &mut SessionWriter,
    question: &Question,
) -> Result<(), ServiceError> {
    let active = ActiveQuestion {
        question: question.clone(),
        round: question.round_number,
        started_at: SystemTime::now(),
    };
    state.sessions().reopen_answers(question.id).await?;
    writer.apply(SessionEvent::ActivateQuestion(active.clone()))?;
    let paused = state.is_paused();
    let mut clock = PausableClock::start(question.duration, paused);
    writer.set_window(Some(clock));
    broadcast_question_active(
        state,
        question_active_event(&active, clock.remaining(), paused, false),
        &question_active_event(&active, clock.remaining(), paused, true),
    );
    info!(
        question_id = question.id,
        round = question.round_number,
        position = question.position,
        "question active"
    );
    run_window(
        state,
        writer,
        &mut clock,
        Some(question.id),
        VisibleSessionPhase::Question,
    )
    .await;

    writer.apply(SessionEvent::Reveal)?;
    let locked = state.sessions().lock_answers(question.id).await?;
    broadcast_answer_locked(
        state,
        AnswerLockedEvent {
            question_id: question.id,
        },
    );
    let answers = grade_question(state, question).await?;
    let leaderboard = leaderboard::recompute(state).await?;
    info!(question_id = question.id, answers = locked, "answers locked and graded");
    reveal(state, question, &answers, &leaderboard);

    let mut reveal_clock = PausableClock::start(state.config().reveal(), state.is_paused());
    writer.set_window(Some(reveal_clock));
    run_window(
        state,
        writer,
        &mut reveal_clock,
        Some(question.id),
        VisibleSessionPhase::AnswerReveal,
    )
    .await;
    Ok(())
}

/// Drive one timed window, publishing ticks and keeping the snapshot clock current on pauses.
async fn run_window(
    state: &SharedState,
    writer: &mut SessionWriter,
    clock: &mut PausableClock,
    question_id: Option<QuestionId>,
    phase: VisibleSessionPhase,
) {
    let mut pause = state.pause_receiver();
    let tick = state.config().tick();
    drive(clock, tick, &mut pause, |clock, event| match event {
        ClockEvent::Tick(remaining) => broadcast_tick(
            state,
            TickEvent {
                question_id,
                phase,
                remaining_secs: remaining.as_secs_f64(),
                total_secs: clock.total().as_secs_f64(),
            },
        ),
        ClockEvent::Paused | ClockEvent::Resumed => writer.set_window(Some(*clock)),
    })
    .await;
}

/// Grade every answer of `question` and return the stored rows.
async fn grade_question(
    state: &SharedState,
    question: &Question,
) -> Result<Vec<Answer>, ServiceError> {
    let sessions = state.sessions();
    let answers = sessions.answers_for_question(question.id).await?;
    let time_decay = state
        .config()
        .applies_time_decay(question.kind.question_type());
    for (answer_id, points) in grade_batch(question, &answers, time_decay) {
        sessions.set_points(answer_id, points).await?;
    }
    Ok(sessions.answers_for_question(question.id).await?)
}

fn reveal(
    state: &SharedState,
    question: &Question,
    answers: &[Answer],
    leaderboard: &[LeaderboardEntry],
) {
    let answer_key = AnswerKeyView::from(question);
    let public = AnswerRevealEvent {
        question_id: question.id,
        answer_key: answer_key.clone(),
        leaderboard: leaderboard.to_vec(),
        grading: None,
    };
    let console = AnswerRevealEvent {
        grading: Some(answers.iter().map(GradingRow::from).collect()),
        ..public.clone()
    };
    broadcast_reveal(state, &public, &console);

    for name in connected_contestants(state) {
        let answer = answers.iter().find(|answer| answer.contestant == name);
        let feedback = AnswerFeedback {
            question_id: question.id,
            question_type: question.kind.question_type(),
            submitted: answer.is_some(),
            answer_key: answer_key.clone(),
            points: answer.map(|answer| answer.points).unwrap_or_default(),
            max_points: question.kind.max_points(),
        };
        send_to_contestant(state, &name, &ContestantMessage::AnswerFeedback(feedback));
    }
    broadcast_leaderboard(state, leaderboard);
}

/// Re-grade the whole round, recompute scores and broadcast the summaries.
async fn finalize_round(
    state: &SharedState,
    writer: &mut SessionWriter,
    quiz_id: QuizId,
    round: u32,
) -> Result<Vec<LeaderboardEntry>, ServiceError> {
    let questions = state.content().questions_in_round(quiz_id, round).await?;
    for question in &questions {
        grade_question(state, question).await?;
    }
    let leaderboard = leaderboard::recompute(state).await?;
    writer.apply(SessionEvent::FinishRound { round })?;

    let answers = state.sessions().answers_for_round(quiz_id, round).await?;
    let keys: Vec<AnswerKeyView> = questions.iter().map(AnswerKeyView::from).collect();
    let public = RoundFinishedEvent {
        round,
        answers: Some(keys.clone()),
        leaderboard: leaderboard.clone(),
    };
    let console = RoundFinishedEvent {
        answers: None,
        ..public.clone()
    };
    broadcast_round_finished(state, &public, &console);

    let totals: HashMap<&str, f64> = leaderboard
        .iter()
        .map(|entry| (entry.name.as_str(), entry.score))
        .collect();
    for name in connected_contestants(state) {
        let summary = round_summary(
            round,
            &name,
            &questions,
            &keys,
            &answers,
            totals.get(name.as_str()).copied().unwrap_or_default(),
        );
        send_to_contestant(state, &name, &ContestantMessage::RoundSummary(summary));
    }
    broadcast_leaderboard(state, &leaderboard);

    info!(round, questions = questions.len(), answers = answers.len(), "round finalized");
    Ok(leaderboard)
}

fn round_summary(
    round: u32,
    contestant: &str,
    questions: &[Question],
    keys: &[AnswerKeyView],
    answers: &[Answer],
    total: f64,
) -> RoundSummary {
    let rows: Vec<RoundSummaryRow> = questions
        .iter()
        .zip(keys)
        .map(|(question, key)| {
            let answer = answers
                .iter()
                .find(|answer| answer.question_id == question.id && answer.contestant == contestant);
            RoundSummaryRow {
                question_id: question.id,
                position: question.position,
                answer_key: key.clone(),
                submitted: answer.is_some(),
                points: answer.map(|answer| answer.points.total()).unwrap_or_default(),
                max_points: question.kind.max_points(),
            }
        })
        .collect();
    RoundSummary {
        round,
        round_points: rows.iter().map(|row| row.points).sum(),
        answers: rows,
        total,
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use tokio::time::sleep;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::{
            memory::MemoryStore,
            models::{ContentFile, QuestionEntity, QuestionKindEntity},
        },
        state::{AppState, session::SessionPhase},
    };

    fn text(round: u32, position: u32, secs: u64, answer: &str) -> QuestionEntity {
        QuestionEntity {
            round,
            position,
            duration: Duration::from_secs(secs),
            kind: QuestionKindEntity::Text {
                question_text: format!("question {position}"),
                answer_text: answer.into(),
            },
        }
    }

    fn state(questions: Vec<QuestionEntity>) -> SharedState {
        let store = Arc::new(
            MemoryStore::from_content(ContentFile {
                title: "Pub quiz".into(),
                questions,
            })
            .unwrap(),
        );
        let config = AppConfig::default().with_windows(Duration::from_secs(3), Duration::from_secs(5));
        AppState::new(config, store.clone(), store)
    }

    #[tokio::test(start_paused = true)]
    async fn paused_time_is_not_charged_to_the_question() {
        let state = state(vec![text(1, 1, 20, "Lima")]);
        play_single(&state, 1).await.unwrap();

        sleep(Duration::from_secs(5)).await;
        assert_eq!(state.toggle_pause_if_live(), Some(true));
        sleep(Duration::from_secs(10)).await;
        assert_eq!(state.toggle_pause_if_live(), Some(false));

        sleep(Duration::from_millis(14_500)).await;
        assert!(matches!(
            state.session_snapshot().phase,
            SessionPhase::QuestionActive(_)
        ));

        sleep(Duration::from_secs(1)).await;
        assert!(matches!(
            state.session_snapshot().phase,
            SessionPhase::AnswerReveal(_)
        ));

        sleep(Duration::from_secs(6)).await;
        assert_eq!(state.session_snapshot().phase, SessionPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn second_sequencer_is_refused_while_one_runs() {
        let state = state(vec![text(1, 1, 10, "Lima"), text(1, 2, 10, "Quito")]);
        let mut console = state.console_sse().subscribe();

        let started = start_autoplay(&state, 1, None).await.unwrap();
        assert_eq!(started.question_id, 1);

        let err = start_autoplay(&state, 1, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::SessionBusy));
        let err = finalize_round_now(&state, 1).await.unwrap_err();
        assert!(matches!(err, ServiceError::SessionBusy));

        let mut saw_guard = false;
        while let Ok(event) = console.try_recv() {
            saw_guard |= event.event.as_deref() == Some("live.guard_blocked");
        }
        assert!(saw_guard);
    }

    #[tokio::test(start_paused = true)]
    async fn autoplay_walks_round_by_position_then_finalizes() {
        let state = state(vec![
            text(1, 2, 4, "Quito"),
            text(1, 1, 4, "Lima"),
            text(2, 1, 4, "Bogota"),
        ]);
        let mut public = state.public_sse().subscribe();
        start_autoplay(&state, 1, None).await.unwrap();

        // countdown 3s + two questions of 4s + 5s reveal each
        sleep(Duration::from_secs(25)).await;
        assert_eq!(state.session_snapshot().phase, SessionPhase::Idle);

        let mut activated = Vec::new();
        let mut finished = false;
        while let Ok(event) = public.try_recv() {
            match event.event.as_deref() {
                Some("question.active") => {
                    let payload: serde_json::Value = serde_json::from_str(&event.data).unwrap();
                    activated.push(payload["question"]["position"].as_u64().unwrap());
                }
                Some("round.finished") => finished = true,
                _ => {}
            }
        }
        assert_eq!(activated, [1, 2]);
        assert!(finished);
    }

    #[tokio::test]
    async fn start_rejects_question_from_another_round() {
        let state = state(vec![text(1, 1, 4, "Lima"), text(2, 1, 4, "Quito")]);
        let err = start_autoplay(&state, 1, Some(2)).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
        assert!(state.claim_session().is_some());
    }

    #[tokio::test]
    async fn ending_a_paused_sequence_leaves_the_next_one_running() {
        let state = state(vec![text(1, 1, 4, "Lima")]);
        let mut public = state.public_sse().subscribe();
        let mut writer = state.claim_session().unwrap();
        writer
            .apply(SessionEvent::StartCountdown { round: 1 })
            .unwrap();
        assert_eq!(state.toggle_pause_if_live(), Some(true));

        wind_down(&state, writer);
        assert_eq!(state.session_snapshot().phase, SessionPhase::Idle);
        assert!(!state.is_paused());
        let cleared = public.try_recv().unwrap();
        assert_eq!(cleared.event.as_deref(), Some("pause.state"));
        assert_eq!(cleared.data, r#"{"paused":false}"#);

        assert_eq!(state.toggle_pause_if_live(), None);
        assert!(!state.is_paused());
    }
}
