//! Runtime representation of quiz content, contestants and recorded answers.

use std::{fmt, time::Duration};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identifier of a quiz in the content store.
pub type QuizId = u64;
/// Identifier of a question in the content store.
pub type QuestionId = u64;
/// Identifier of a recorded answer row.
pub type AnswerId = u64;

/// A quiz groups numbered rounds of ordered questions.
#[derive(Debug, Clone)]
pub struct Quiz {
    /// Primary key of the quiz.
    pub id: QuizId,
    /// Display title.
    pub title: String,
}

/// Media reference shared by the audio/video flavoured question variants.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaClip {
    /// Location of the media resource served by the static file collaborator.
    pub url: String,
    /// Expected artist.
    pub artist: String,
    /// Expected title.
    pub title: String,
    /// Offset (seconds) at which playback should start.
    pub start_offset: f64,
}

/// Closed set of question variants, each carrying its own answer key fields.
#[derive(Debug, Clone, PartialEq)]
pub enum QuestionKind {
    /// Identify the artist and title of an audio clip.
    Audio(MediaClip),
    /// Identify the artist and title of a video clip.
    Video(MediaClip),
    /// Free-text answer to a written prompt.
    Text {
        /// Prompt shown to contestants.
        prompt: String,
        /// Expected answer.
        answer: String,
    },
    /// Pick one entry of an ordered choice list.
    MultipleChoice {
        /// Prompt shown to contestants.
        prompt: String,
        /// Ordered choices.
        choices: Vec<String>,
        /// Index of the correct choice.
        correct_index: usize,
    },
    /// Audio clip plus an additional free-text question.
    Simultaneous {
        /// Clip to identify.
        clip: MediaClip,
        /// Additional question shown to contestants.
        extra_question: Option<String>,
        /// Expected answer for the additional question; without one the extra slot is not scored.
        extra_answer: Option<String>,
    },
}

/// Wire tag for [`QuestionKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    /// [`QuestionKind::Audio`].
    Audio,
    /// [`QuestionKind::Video`].
    Video,
    /// [`QuestionKind::Text`].
    Text,
    /// [`QuestionKind::MultipleChoice`].
    MultipleChoice,
    /// [`QuestionKind::Simultaneous`].
    Simultaneous,
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QuestionType::Audio => "audio",
            QuestionType::Video => "video",
            QuestionType::Text => "text",
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::Simultaneous => "simultaneous",
        };
        f.write_str(name)
    }
}

impl QuestionKind {
    /// Wire tag of this variant.
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionKind::Audio(_) => QuestionType::Audio,
            QuestionKind::Video(_) => QuestionType::Video,
            QuestionKind::Text { .. } => QuestionType::Text,
            QuestionKind::MultipleChoice { .. } => QuestionType::MultipleChoice,
            QuestionKind::Simultaneous { .. } => QuestionType::Simultaneous,
        }
    }

    /// Media played while the question is active, if any.
    pub fn media(&self) -> Option<&MediaClip> {
        match self {
            QuestionKind::Audio(clip) | QuestionKind::Video(clip) => Some(clip),
            QuestionKind::Simultaneous { clip, .. } => Some(clip),
            QuestionKind::Text { .. } | QuestionKind::MultipleChoice { .. } => None,
        }
    }

    /// Highest total a contestant can score on this question.
    pub fn max_points(&self) -> f64 {
        match self {
            QuestionKind::Audio(_) | QuestionKind::Video(_) => 2.0,
            QuestionKind::Text { .. } | QuestionKind::MultipleChoice { .. } => 1.0,
            QuestionKind::Simultaneous {
                extra_answer: Some(_),
                ..
            } => 3.0,
            QuestionKind::Simultaneous {
                extra_answer: None, ..
            } => 2.0,
        }
    }
}

/// A single question of a quiz round.
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    /// Primary key.
    pub id: QuestionId,
    /// Owning quiz.
    pub quiz_id: QuizId,
    /// Round the question belongs to.
    pub round_number: u32,
    /// Position inside the round, unique per quiz and round.
    pub position: u32,
    /// Length of the answer window.
    pub duration: Duration,
    /// Variant specific payload.
    pub kind: QuestionKind,
}

/// Presence of a contestant as last observed through the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    /// Connected and focused.
    Active,
    /// Connected but reported the page as hidden.
    Away,
    /// No open connection.
    Offline,
}

/// A registered contestant.
#[derive(Debug, Clone)]
pub struct Contestant {
    /// Primary key.
    pub id: u64,
    /// Unique display name.
    pub name: String,
    /// Four digit PIN used to reclaim the name on reconnect.
    pub pin: String,
    /// Derived total, overwritten by the leaderboard aggregator.
    pub score: f64,
    /// Set once an activity report flags the contestant; never cleared.
    pub flagged: bool,
    /// Last known presence.
    pub status: PresenceStatus,
}

/// One of the three independently gradable answer slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PointSlot {
    /// Artist-style field.
    Primary,
    /// Title-style field (also used for text and multiple choice).
    Secondary,
    /// Extra field of simultaneous questions.
    Extra,
}

/// Points awarded per slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, ToSchema)]
pub struct FieldPoints {
    /// Artist-style points.
    pub primary: f64,
    /// Title-style points.
    pub secondary: f64,
    /// Extra field points.
    pub extra: f64,
}

impl FieldPoints {
    /// Sum of every slot.
    pub fn total(&self) -> f64 {
        self.primary + self.secondary + self.extra
    }

    /// Read a slot.
    pub fn get(&self, slot: PointSlot) -> f64 {
        match slot {
            PointSlot::Primary => self.primary,
            PointSlot::Secondary => self.secondary,
            PointSlot::Extra => self.extra,
        }
    }

    /// Write a slot.
    pub fn set(&mut self, slot: PointSlot, value: f64) {
        match slot {
            PointSlot::Primary => self.primary = value,
            PointSlot::Secondary => self.secondary = value,
            PointSlot::Extra => self.extra = value,
        }
    }
}

/// Raw fields submitted by a contestant.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmittedFields {
    /// Artist guess (first text field).
    pub artist: String,
    /// Title guess (second text field, also the free-text answer).
    pub title: String,
    /// Extra guess (third text field).
    pub extra: String,
    /// Selected choice for multiple choice questions.
    pub choice: Option<usize>,
}

/// Stored answer, unique per contestant and question.
#[derive(Debug, Clone)]
pub struct Answer {
    /// Primary key.
    pub id: AnswerId,
    /// Owning contestant name.
    pub contestant: String,
    /// Quiz the answered question belongs to.
    pub quiz_id: QuizId,
    /// Round of the answered question.
    pub round_number: u32,
    /// Answered question.
    pub question_id: QuestionId,
    /// Raw submitted fields.
    pub fields: SubmittedFields,
    /// Points per slot.
    pub points: FieldPoints,
    /// Slots whose points were set by the console and must survive re-grading.
    pub overridden: Vec<PointSlot>,
    /// Seconds elapsed since the question became active.
    pub submission_time: f64,
    /// Once set, further submissions for this row are dropped.
    pub locked: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_points_slots_round_trip() {
        let mut points = FieldPoints::default();
        points.set(PointSlot::Primary, 1.0);
        points.set(PointSlot::Extra, 0.5);
        assert_eq!(points.get(PointSlot::Primary), 1.0);
        assert_eq!(points.get(PointSlot::Secondary), 0.0);
        assert_eq!(points.total(), 1.5);
    }

    #[test]
    fn max_points_follow_gradable_fields() {
        let text = QuestionKind::Text {
            prompt: "Capital of France?".into(),
            answer: "Paris".into(),
        };
        assert_eq!(text.max_points(), 1.0);
        assert!(text.media().is_none());
        assert_eq!(text.question_type().to_string(), "text");
    }
}
