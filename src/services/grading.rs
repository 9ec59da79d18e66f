//! Pure scoring of submitted answers against per-variant answer keys.

use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use crate::{
    services::similarity::{Thresholds, score_field},
    state::quiz::{Answer, AnswerId, FieldPoints, Question, QuestionKind, SubmittedFields},
};

/// Multipliers for the five equal intervals of the answer window, in submission order.
const DECAY_STEPS: [f64; 5] = [1.0, 0.8, 0.6, 0.4, 0.2];

/// Correct values a submission is compared against.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerKey {
    /// Text fields graded by similarity.
    Fields {
        /// Artist-style key; empty for text questions.
        artist: String,
        /// Title-style key; the answer of text questions.
        title: String,
        /// Additional key of simultaneous questions.
        extra: Option<String>,
    },
    /// Choice graded by exact index.
    Choice {
        /// Correct index.
        index: usize,
        /// Label of the correct choice.
        label: Option<String>,
    },
}

/// Failure to grade one answer.
#[derive(Debug, Error, PartialEq)]
pub enum GradingError {
    /// Answer key points outside the choice list.
    #[error("correct choice {index} is out of range for {len} choices")]
    ChoiceOutOfRange {
        /// Configured correct index.
        index: usize,
        /// Number of choices.
        len: usize,
    },
    /// Submission time is not a finite number.
    #[error("submission time {0} is not a finite number")]
    InvalidSubmissionTime(f64),
}

/// Derive the answer key of a question.
pub fn answer_key(kind: &QuestionKind) -> AnswerKey {
    match kind {
        QuestionKind::Audio(clip) | QuestionKind::Video(clip) => AnswerKey::Fields {
            artist: clip.artist.clone(),
            title: clip.title.clone(),
            extra: None,
        },
        QuestionKind::Text { answer, .. } => AnswerKey::Fields {
            artist: String::new(),
            title: answer.clone(),
            extra: None,
        },
        QuestionKind::MultipleChoice {
            choices,
            correct_index,
            ..
        } => AnswerKey::Choice {
            index: *correct_index,
            label: choices.get(*correct_index).cloned(),
        },
        QuestionKind::Simultaneous {
            clip, extra_answer, ..
        } => AnswerKey::Fields {
            artist: clip.artist.clone(),
            title: clip.title.clone(),
            extra: extra_answer.clone(),
        },
    }
}

/// Time bonus for an answer submitted `submission_time` seconds into a window of `duration`.
///
/// Negative times count as instant; anything at or past the end of the window earns nothing.
pub fn decay_multiplier(duration: Duration, submission_time: f64) -> f64 {
    let window = duration.as_secs_f64();
    let at = submission_time.max(0.0);
    if window <= 0.0 || at >= window {
        return 0.0;
    }
    let interval = ((at * DECAY_STEPS.len() as f64) / window).floor() as usize;
    DECAY_STEPS[interval.min(DECAY_STEPS.len() - 1)]
}

/// Score `fields` for `question`.
///
/// Multiple choice points land in the secondary slot.
pub fn grade(
    question: &Question,
    fields: &SubmittedFields,
    submission_time: f64,
    time_decay: bool,
) -> Result<FieldPoints, GradingError> {
    if !submission_time.is_finite() {
        return Err(GradingError::InvalidSubmissionTime(submission_time));
    }

    let multiplier = if time_decay {
        decay_multiplier(question.duration, submission_time)
    } else {
        1.0
    };

    let base = match &question.kind {
        QuestionKind::MultipleChoice {
            choices,
            correct_index,
            ..
        } => {
            if *correct_index >= choices.len() {
                return Err(GradingError::ChoiceOutOfRange {
                    index: *correct_index,
                    len: choices.len(),
                });
            }
            let hit = fields.choice == Some(*correct_index);
            FieldPoints {
                secondary: if hit { 1.0 } else { 0.0 },
                ..FieldPoints::default()
            }
        }
        kind => match answer_key(kind) {
            AnswerKey::Fields {
                artist,
                title,
                extra,
            } => FieldPoints {
                primary: score_field(&fields.artist, &artist, Thresholds::ARTIST),
                secondary: score_field(&fields.title, &title, Thresholds::TITLE),
                extra: extra
                    .map(|key| score_field(&fields.extra, &key, Thresholds::TITLE))
                    .unwrap_or(0.0),
            },
            AnswerKey::Choice { .. } => FieldPoints::default(),
        },
    };

    Ok(FieldPoints {
        primary: base.primary * multiplier,
        secondary: base.secondary * multiplier,
        extra: base.extra * multiplier,
    })
}

/// Grade every answer of a question, skipping (and logging) the ones that fail.
pub fn grade_batch(
    question: &Question,
    answers: &[Answer],
    time_decay: bool,
) -> Vec<(AnswerId, FieldPoints)> {
    answers
        .iter()
        .filter_map(
            |answer| match grade(question, &answer.fields, answer.submission_time, time_decay) {
                Ok(points) => Some((answer.id, points)),
                Err(err) => {
                    warn!(
                        answer_id = answer.id,
                        question_id = question.id,
                        contestant = %answer.contestant,
                        error = %err,
                        "failed to grade answer; keeping previous points"
                    );
                    None
                }
            },
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::quiz::MediaClip;

    fn question(kind: QuestionKind, secs: u64) -> Question {
        Question {
            id: 7,
            quiz_id: 1,
            round_number: 1,
            position: 1,
            duration: Duration::from_secs(secs),
            kind,
        }
    }

    fn audio() -> QuestionKind {
        QuestionKind::Audio(MediaClip {
            url: "/media/queen.mp3".into(),
            artist: "Queen".into(),
            title: "Bohemian Rhapsody".into(),
            start_offset: 0.0,
        })
    }

    fn choice(correct_index: usize) -> QuestionKind {
        QuestionKind::MultipleChoice {
            prompt: "Pick".into(),
            choices: vec!["a".into(), "b".into(), "c".into()],
            correct_index,
        }
    }

    fn title(guess: &str) -> SubmittedFields {
        SubmittedFields {
            title: guess.into(),
            ..SubmittedFields::default()
        }
    }

    fn answer(id: AnswerId, fields: SubmittedFields) -> Answer {
        Answer {
            id,
            contestant: format!("c{id}"),
            quiz_id: 1,
            round_number: 1,
            question_id: 7,
            fields,
            points: FieldPoints::default(),
            overridden: Vec::new(),
            submission_time: 0.0,
            locked: true,
        }
    }

    #[test]
    fn decay_is_zero_at_or_after_the_deadline() {
        for secs in [1, 7, 30, 600] {
            let duration = Duration::from_secs(secs);
            for late in [secs as f64, secs as f64 + 0.001, secs as f64 * 3.0] {
                assert_eq!(decay_multiplier(duration, late), 0.0);
            }
        }
    }

    #[test]
    fn decay_intervals_partition_the_window() {
        for secs in [5u64, 20, 30, 45] {
            let duration = Duration::from_secs(secs);
            let width = secs as f64 / 5.0;
            let mut previous = f64::INFINITY;
            for (index, expected) in DECAY_STEPS.iter().enumerate() {
                let start = width * index as f64;
                let inside_end = width * (index + 1) as f64 - 1e-6;
                assert_eq!(decay_multiplier(duration, start), *expected);
                assert_eq!(decay_multiplier(duration, inside_end), *expected);
                assert!(*expected < previous);
                previous = *expected;
            }
        }
        assert_eq!(decay_multiplier(Duration::from_secs(10), -3.0), 1.0);
    }

    #[test]
    fn close_title_early_scores_full_point() {
        let q = question(audio(), 30);
        let points = grade(&q, &title("bohemian rapsody"), 5.0, true).unwrap();
        assert_eq!(points.secondary, 1.0);
        assert_eq!(points.primary, 0.0);
    }

    #[test]
    fn late_correct_title_gets_last_interval() {
        let q = question(audio(), 30);
        let points = grade(&q, &title("Bohemian Rhapsody"), 27.0, true).unwrap();
        assert!((points.secondary - 0.2).abs() < 1e-9);
    }

    #[test]
    fn multiple_choice_scores_exact_index_only() {
        let q = question(choice(2), 30);
        let hit = SubmittedFields {
            choice: Some(2),
            ..SubmittedFields::default()
        };
        let miss = SubmittedFields {
            choice: Some(1),
            ..SubmittedFields::default()
        };
        assert_eq!(grade(&q, &hit, 0.0, true).unwrap().total(), 1.0);
        for at in [0.0, 3.0, 29.0] {
            assert_eq!(grade(&q, &miss, at, true).unwrap().total(), 0.0);
        }
    }

    #[test]
    fn text_question_grades_title_slot_only() {
        let q = question(
            QuestionKind::Text {
                prompt: "Capital of France?".into(),
                answer: "Paris".into(),
            },
            20,
        );
        let fields = SubmittedFields {
            artist: "Paris".into(),
            title: "paris".into(),
            ..SubmittedFields::default()
        };
        let points = grade(&q, &fields, 1.0, false).unwrap();
        assert_eq!(points, FieldPoints {
            primary: 0.0,
            secondary: 1.0,
            extra: 0.0
        });
    }

    #[test]
    fn simultaneous_grades_three_slots() {
        let q = question(
            QuestionKind::Simultaneous {
                clip: MediaClip {
                    url: "/media/abba.mp3".into(),
                    artist: "ABBA".into(),
                    title: "Waterloo".into(),
                    start_offset: 0.0,
                },
                extra_question: Some("Year?".into()),
                extra_answer: Some("1974".into()),
            },
            30,
        );
        let fields = SubmittedFields {
            artist: "abba".into(),
            title: "waterloo".into(),
            extra: "1974".into(),
            choice: None,
        };
        assert_eq!(grade(&q, &fields, 10.0, false).unwrap().total(), 3.0);
        assert_eq!(q.kind.max_points(), 3.0);
    }

    #[test]
    fn simultaneous_without_extra_answer_scores_two_slots() {
        let q = question(
            QuestionKind::Simultaneous {
                clip: MediaClip {
                    url: "/media/abba.mp3".into(),
                    artist: "ABBA".into(),
                    title: "Waterloo".into(),
                    start_offset: 0.0,
                },
                extra_question: None,
                extra_answer: None,
            },
            30,
        );
        assert!(matches!(
            answer_key(&q.kind),
            AnswerKey::Fields { extra: None, .. }
        ));
        let fields = SubmittedFields {
            artist: "abba".into(),
            title: "waterloo".into(),
            extra: "anything".into(),
            choice: None,
        };
        let points = grade(&q, &fields, 10.0, false).unwrap();
        assert_eq!(points.extra, 0.0);
        assert_eq!(points.total(), q.kind.max_points());
        assert_eq!(q.kind.max_points(), 2.0);
    }

    #[test]
    fn batch_skips_failures_and_keeps_going() {
        let broken = question(choice(9), 30);
        let answers = vec![answer(1, SubmittedFields::default())];
        assert!(grade_batch(&broken, &answers, true).is_empty());

        let q = question(audio(), 30);
        let mut bad_time = answer(2, title("Bohemian Rhapsody"));
        bad_time.submission_time = f64::NAN;
        let answers = vec![answer(1, title("Bohemian Rhapsody")), bad_time, answer(3, title("nope"))];
        let graded = grade_batch(&q, &answers, false);
        assert_eq!(graded.len(), 2);
        assert_eq!(graded[0], (1, FieldPoints {
            primary: 0.0,
            secondary: 1.0,
            extra: 0.0
        }));
        assert_eq!(graded[1].0, 3);
    }

    #[test]
    fn answer_key_follows_variant() {
        assert_eq!(answer_key(&choice(1)), AnswerKey::Choice {
            index: 1,
            label: Some("b".into())
        });
        match answer_key(&audio()) {
            AnswerKey::Fields { artist, extra, .. } => {
                assert_eq!(artist, "Queen");
                assert!(extra.is_none());
            }
            other => panic!("unexpected key {other:?}"),
        }
    }
}
