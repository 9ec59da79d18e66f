use std::time::Duration;

use axum::extract::ws::Message;
use quiz_live_back::{
    build_state,
    config::AppConfig,
    dao::{
        memory::MemoryStore,
        models::{ContentFile, QuestionEntity, QuestionKindEntity},
    },
    dto::ws::SubmitAnswer,
    services::{catch_up::current_question_event, leaderboard, sequencer, submission},
    state::{ContestantConnection, SharedState, session::SessionPhase},
};
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

fn content() -> ContentFile {
    ContentFile {
        title: "Friday night".into(),
        questions: vec![
            QuestionEntity {
                round: 1,
                position: 1,
                duration: Duration::from_secs(30),
                kind: QuestionKindEntity::Text {
                    question_text: "Queen's six-minute single?".into(),
                    answer_text: "Bohemian Rhapsody".into(),
                },
            },
            QuestionEntity {
                round: 1,
                position: 2,
                duration: Duration::from_secs(10),
                kind: QuestionKindEntity::MultipleChoice {
                    question_text: "Which year?".into(),
                    choices: vec!["1973".into(), "1974".into(), "1975".into()],
                    correct_index: 2,
                },
            },
            QuestionEntity {
                round: 2,
                position: 1,
                duration: Duration::from_secs(10),
                kind: QuestionKindEntity::Text {
                    question_text: "Not played".into(),
                    answer_text: "Nothing".into(),
                },
            },
        ],
    }
}

async fn sleep_until(start: tokio::time::Instant, secs: f64) {
    tokio::time::sleep_until(start + Duration::from_secs_f64(secs)).await;
}

async fn answer(state: &SharedState, name: &str, question_id: u64, title: &str, choice: Option<usize>) {
    submission::submit(
        state,
        name,
        SubmitAnswer {
            question_id,
            title: title.into(),
            choice,
            ..Default::default()
        },
    )
    .await
    .unwrap();
}

fn drain(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<Value> {
    let mut messages = Vec::new();
    while let Ok(message) = rx.try_recv() {
        if let Message::Text(text) = message {
            messages.push(serde_json::from_str(text.as_str()).unwrap());
        }
    }
    messages
}

#[tokio::test(start_paused = true)]
async fn full_round_grades_reveals_and_summarizes() {
    let config = AppConfig::default().with_windows(Duration::from_secs(2), Duration::from_secs(3));
    let state = build_state(config, MemoryStore::from_content(content()).unwrap());
    for (name, pin) in [("ana", "1111"), ("bo", "2222")] {
        state
            .sessions()
            .join_contestant(name.into(), pin.into(), true)
            .await
            .unwrap();
    }
    let (tx, mut ana_rx) = mpsc::unbounded_channel();
    state.attach_contestant("ana", ContestantConnection { id: Uuid::new_v4(), tx });

    let start = tokio::time::Instant::now();
    let started = sequencer::start_autoplay(&state, 1, None).await.unwrap();
    assert_eq!(started.question_id, 1);

    // Countdown ends at 2s; question 1 runs from 2s to 32s.
    sleep_until(start, 7.5).await;
    answer(&state, "ana", 1, "bohemian rapsody", None).await;

    sleep_until(start, 20.0).await;
    let late = current_question_event(&state.session_snapshot(), false, false).unwrap();
    assert!((late.remaining_secs - 12.0).abs() < 1e-3);

    sleep_until(start, 31.5).await;
    answer(&state, "bo", 1, "Bohemian Rhapsody", None).await;

    // Reveal from 32s to 35s, question 2 from 35s to 45s.
    sleep_until(start, 33.0).await;
    assert!(matches!(
        state.session_snapshot().phase,
        SessionPhase::AnswerReveal(_)
    ));
    sleep_until(start, 36.5).await;
    answer(&state, "ana", 2, "", Some(2)).await;
    answer(&state, "bo", 2, "", Some(1)).await;

    // Reveal from 45s to 48s, then the round is finalized.
    sleep_until(start, 50.0).await;
    assert_eq!(state.session_snapshot().phase, SessionPhase::Idle);

    let board = leaderboard::current(&state).await.unwrap();
    assert_eq!(board[0].name, "ana");
    assert_eq!(board[0].score, 2.0);
    assert_eq!(board[1].name, "bo");
    assert_eq!(board[1].score, 0.2);

    let messages = drain(&mut ana_rx);
    let types: Vec<&str> = messages.iter().filter_map(|m| m["type"].as_str()).collect();
    assert_eq!(types.first(), Some(&"round.countdown"));
    assert_eq!(types.iter().filter(|t| **t == "question.active").count(), 2);
    assert_eq!(types.iter().filter(|t| **t == "answer.feedback").count(), 2);
    assert!(
        messages
            .iter()
            .filter(|m| m["type"] == "question.active")
            .all(|m| m.get("answer_key").is_none())
    );

    let summary = messages
        .iter()
        .find(|m| m["type"] == "round.summary")
        .unwrap();
    assert_eq!(summary["round"], 1);
    assert_eq!(summary["round_points"], 2.0);
    assert_eq!(summary["total"], 2.0);
    assert_eq!(summary["answers"].as_array().unwrap().len(), 2);

    // The next round can start once the previous one released the session.
    assert!(sequencer::start_autoplay(&state, 2, None).await.is_ok());
}
