//! JSON representation of the quiz content file used to seed the content store.

use std::{fs, io::ErrorKind, path::Path, time::Duration};

use serde::Deserialize;
use serde_with::{DurationSecondsWithFrac, serde_as};

use crate::{
    dao::storage::{StorageError, StorageResult},
    state::quiz::{MediaClip, QuestionKind},
};

const DEFAULT_DURATION_SECS: f64 = 30.0;

/// Top-level content document: one active quiz and its questions.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentFile {
    pub title: String,
    #[serde(default)]
    pub questions: Vec<QuestionEntity>,
}

/// A question as stored in the content document.
#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct QuestionEntity {
    #[serde(default = "default_round")]
    pub round: u32,
    pub position: u32,
    #[serde_as(as = "DurationSecondsWithFrac<f64>")]
    #[serde(default = "default_duration")]
    pub duration: Duration,
    #[serde(flatten)]
    pub kind: QuestionKindEntity,
}

/// Variant payloads, tagged by `type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKindEntity {
    Audio(MediaEntity),
    Video(MediaEntity),
    Text {
        question_text: String,
        answer_text: String,
    },
    MultipleChoice {
        question_text: String,
        choices: Vec<String>,
        correct_index: usize,
    },
    Simultaneous {
        #[serde(flatten)]
        media: MediaEntity,
        #[serde(default)]
        extra_question: Option<String>,
        #[serde(default)]
        extra_answer: Option<String>,
    },
}

/// Media fields shared by audio, video and simultaneous questions.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaEntity {
    pub url: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub start_time: f64,
}

fn default_round() -> u32 {
    1
}

fn default_duration() -> Duration {
    Duration::from_secs_f64(DEFAULT_DURATION_SECS)
}

impl From<MediaEntity> for MediaClip {
    fn from(value: MediaEntity) -> Self {
        Self {
            url: value.url,
            artist: value.artist,
            title: value.title,
            start_offset: value.start_time,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}

impl From<QuestionKindEntity> for QuestionKind {
    fn from(value: QuestionKindEntity) -> Self {
        match value {
            QuestionKindEntity::Audio(media) => QuestionKind::Audio(media.into()),
            QuestionKindEntity::Video(media) => QuestionKind::Video(media.into()),
            QuestionKindEntity::Text {
                question_text,
                answer_text,
            } => QuestionKind::Text {
                prompt: question_text,
                answer: answer_text,
            },
            QuestionKindEntity::MultipleChoice {
                question_text,
                choices,
                correct_index,
            } => QuestionKind::MultipleChoice {
                prompt: question_text,
                choices,
                correct_index,
            },
            QuestionKindEntity::Simultaneous {
                media,
                extra_question,
                extra_answer,
            } => QuestionKind::Simultaneous {
                clip: media.into(),
                extra_question: non_blank(extra_question),
                extra_answer: non_blank(extra_answer),
            },
        }
    }
}

/// Read and parse the content document, returning `None` when the file does not exist.
pub fn load_content_file(path: &Path) -> StorageResult<Option<ContentFile>> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(StorageError::unavailable(
                format!("reading content file `{}`", path.display()),
                err,
            ));
        }
    };

    serde_json::from_str(&contents).map(Some).map_err(|err| {
        StorageError::unavailable(format!("parsing content file `{}`", path.display()), err)
    })
}
