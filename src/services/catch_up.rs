//! Bring (re)connecting clients up to date without extending their answer window.

use std::time::Duration;

use crate::{
    dto::{
        common::{AnswerKeyView, QuestionView},
        format_system_time,
        sse::QuestionActiveEvent,
    },
    state::session::{ActiveQuestion, SessionPhase, SessionSnapshot},
};

/// Time left for a late joiner, or `None` when the window is already spent.
pub fn remaining_for_catch_up(duration: Duration, elapsed: Duration) -> Option<Duration> {
    duration.checked_sub(elapsed).filter(|left| !left.is_zero())
}

/// Build the `question.active` payload for `active` with the given remaining time.
pub fn question_active_event(
    active: &ActiveQuestion,
    remaining: Duration,
    paused: bool,
    with_key: bool,
) -> QuestionActiveEvent {
    let question = &active.question;
    QuestionActiveEvent {
        question: QuestionView::from(question),
        remaining_secs: remaining.as_secs_f64(),
        duration_secs: question.duration.as_secs_f64(),
        started_at: format_system_time(active.started_at),
        paused,
        answer_key: with_key.then(|| AnswerKeyView::from(question)),
    }
}

/// Catch-up copy of the active question, if answers are currently accepted.
///
/// Remaining time excludes paused spans, so it never exceeds `duration - elapsed`.
pub fn current_question_event(
    snapshot: &SessionSnapshot,
    paused: bool,
    with_key: bool,
) -> Option<QuestionActiveEvent> {
    let SessionPhase::QuestionActive(active) = &snapshot.phase else {
        return None;
    };
    let clock = snapshot.window.as_ref()?;
    let remaining = remaining_for_catch_up(active.question.duration, clock.elapsed())?;
    Some(question_active_event(active, remaining, paused, with_key))
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use tokio::time::sleep;

    use super::*;
    use crate::state::{
        quiz::{Question, QuestionKind},
        timer::PausableClock,
    };

    fn active(secs: u64) -> ActiveQuestion {
        ActiveQuestion {
            question: Question {
                id: 9,
                quiz_id: 1,
                round_number: 1,
                position: 1,
                duration: Duration::from_secs(secs),
                kind: QuestionKind::Text {
                    prompt: "Capital of Peru?".into(),
                    answer: "Lima".into(),
                },
            },
            round: 1,
            started_at: SystemTime::now(),
        }
    }

    #[test]
    fn remaining_never_exceeds_unused_window_and_never_negative() {
        for duration in [1u64, 10, 30] {
            for elapsed_ms in [0u64, 1, 999, 5_000, 29_999, 30_000, 45_000] {
                let duration = Duration::from_secs(duration);
                let elapsed = Duration::from_millis(elapsed_ms);
                match remaining_for_catch_up(duration, elapsed) {
                    Some(left) => {
                        assert!(left <= duration.saturating_sub(elapsed));
                        assert!(!left.is_zero());
                    }
                    None => assert!(elapsed >= duration),
                }
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn late_joiner_gets_adjusted_remaining_time() {
        let active = active(30);
        let clock = PausableClock::start(Duration::from_secs(30), false);
        sleep(Duration::from_secs(12)).await;

        let snapshot = SessionSnapshot {
            phase: SessionPhase::QuestionActive(active),
            version: 4,
            window: Some(clock),
        };
        let event = current_question_event(&snapshot, false, false).unwrap();
        assert_eq!(event.remaining_secs, 18.0);
        assert_eq!(event.duration_secs, 30.0);
        assert!(event.answer_key.is_none());

        let console = current_question_event(&snapshot, false, true).unwrap();
        assert!(console.answer_key.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn spent_window_suppresses_payload() {
        let clock = PausableClock::start(Duration::from_secs(5), false);
        sleep(Duration::from_secs(5)).await;
        let snapshot = SessionSnapshot {
            phase: SessionPhase::QuestionActive(active(5)),
            version: 1,
            window: Some(clock),
        };
        assert!(current_question_event(&snapshot, false, false).is_none());
    }

    #[test]
    fn nothing_to_catch_up_outside_question_phase() {
        let snapshot = SessionSnapshot {
            phase: SessionPhase::AnswerReveal(active(5)),
            version: 1,
            window: None,
        };
        assert!(current_question_event(&snapshot, true, true).is_none());
    }
}
