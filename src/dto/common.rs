use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    services::grading::{AnswerKey, answer_key},
    state::quiz::{Question, QuestionId, QuestionKind, QuestionType},
};

/// One leaderboard row.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq)]
pub struct LeaderboardEntry {
    pub name: String,
    pub score: f64,
}

/// Media reference played while a question is active.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct MediaView {
    pub url: String,
    /// Playback offset in seconds.
    pub start_offset: f64,
}

/// Public payload of a question; never carries the answer.
#[derive(Debug, Serialize, ToSchema, Clone)]
pub struct QuestionView {
    pub id: QuestionId,
    pub round: u32,
    pub position: u32,
    pub question_type: QuestionType,
    pub duration_secs: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<MediaView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
    /// Additional prompt of simultaneous questions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_question: Option<String>,
}

impl From<&Question> for QuestionView {
    fn from(question: &Question) -> Self {
        let (prompt, choices, extra_question) = match &question.kind {
            QuestionKind::Text { prompt, .. } => (Some(prompt.clone()), None, None),
            QuestionKind::MultipleChoice {
                prompt, choices, ..
            } => (Some(prompt.clone()), Some(choices.clone()), None),
            QuestionKind::Simultaneous { extra_question, .. } => {
                (None, None, extra_question.clone())
            }
            QuestionKind::Audio(_) | QuestionKind::Video(_) => (None, None, None),
        };

        Self {
            id: question.id,
            round: question.round_number,
            position: question.position,
            question_type: question.kind.question_type(),
            duration_secs: question.duration.as_secs_f64(),
            media: question.kind.media().map(|clip| MediaView {
                url: clip.url.clone(),
                start_offset: clip.start_offset,
            }),
            prompt,
            choices,
            extra_question,
        }
    }
}

/// Correct answer of a question as shown after the reveal.
#[derive(Debug, Serialize, ToSchema, Clone, PartialEq)]
pub struct AnswerKeyView {
    pub question_id: QuestionId,
    pub question_type: QuestionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choice_index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choice_label: Option<String>,
}

impl From<&Question> for AnswerKeyView {
    fn from(question: &Question) -> Self {
        let mut view = Self {
            question_id: question.id,
            question_type: question.kind.question_type(),
            artist: None,
            title: None,
            extra: None,
            choice_index: None,
            choice_label: None,
        };
        match answer_key(&question.kind) {
            AnswerKey::Fields {
                artist,
                title,
                extra,
            } => {
                view.artist = Some(artist).filter(|value| !value.is_empty());
                view.title = Some(title);
                view.extra = extra;
            }
            AnswerKey::Choice { index, label } => {
                view.choice_index = Some(index);
                view.choice_label = label;
            }
        }
        view
    }
}
