//! Application-level configuration loading: session timings, grading policy and content location.

use std::{
    env, fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;
use serde_with::{DurationSecondsWithFrac, serde_as};
use tracing::{info, warn};

use crate::state::quiz::QuestionType;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIZ_CONFIG_PATH";
const DEFAULT_CONTENT_PATH: &str = "config/quiz.json";
const DEFAULT_COUNTDOWN: Duration = Duration::from_secs(30);
const DEFAULT_REVEAL: Duration = Duration::from_secs(15);
const DEFAULT_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    countdown: Duration,
    reveal: Duration,
    tick: Duration,
    time_decay: Vec<QuestionType>,
    registrations_open: bool,
    content_path: PathBuf,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        Self::load_from(&resolve_config_path())
    }

    /// Load the configuration stored at `path`, falling back to defaults on any failure.
    pub fn load_from(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        countdown_secs = app_config.countdown.as_secs_f64(),
                        reveal_secs = app_config.reveal.as_secs_f64(),
                        "loaded session configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Override the countdown and reveal windows.
    pub fn with_windows(mut self, countdown: Duration, reveal: Duration) -> Self {
        self.countdown = countdown;
        self.reveal = reveal;
        self
    }

    /// Pre-roll broadcast before the first question of a round.
    pub fn countdown(&self) -> Duration {
        self.countdown
    }

    /// Length of the reveal window following each question.
    pub fn reveal(&self) -> Duration {
        self.reveal
    }

    /// Interval between remaining-time ticks.
    pub fn tick(&self) -> Duration {
        self.tick
    }

    /// Whether answers to `question_type` receive the decay multiplier.
    pub fn applies_time_decay(&self, question_type: QuestionType) -> bool {
        self.time_decay.contains(&question_type)
    }

    /// Initial state of the registrations gate.
    pub fn registrations_open(&self) -> bool {
        self.registrations_open
    }

    /// Location of the quiz content document.
    pub fn content_path(&self) -> &Path {
        &self.content_path
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            countdown: DEFAULT_COUNTDOWN,
            reveal: DEFAULT_REVEAL,
            tick: DEFAULT_TICK,
            time_decay: default_time_decay(),
            registrations_open: true,
            content_path: PathBuf::from(DEFAULT_CONTENT_PATH),
        }
    }
}

#[serde_as]
#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    #[serde_as(as = "Option<DurationSecondsWithFrac<f64>>")]
    #[serde(default)]
    countdown_secs: Option<Duration>,
    #[serde_as(as = "Option<DurationSecondsWithFrac<f64>>")]
    #[serde(default)]
    reveal_secs: Option<Duration>,
    #[serde_as(as = "Option<DurationSecondsWithFrac<f64>>")]
    #[serde(default)]
    tick_secs: Option<Duration>,
    #[serde(default)]
    time_decay: Option<Vec<QuestionType>>,
    #[serde(default)]
    registrations_open: Option<bool>,
    #[serde(default)]
    content_path: Option<PathBuf>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = Self::default();
        // A zero tick would spin the countdown loop.
        let tick = value
            .tick_secs
            .filter(|tick| !tick.is_zero())
            .unwrap_or(defaults.tick);
        Self {
            countdown: value.countdown_secs.unwrap_or(defaults.countdown),
            reveal: value.reveal_secs.unwrap_or(defaults.reveal),
            tick,
            time_decay: value.time_decay.unwrap_or(defaults.time_decay),
            registrations_open: value
                .registrations_open
                .unwrap_or(defaults.registrations_open),
            content_path: value.content_path.unwrap_or(defaults.content_path),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

fn default_time_decay() -> Vec<QuestionType> {
    vec![QuestionType::Text, QuestionType::MultipleChoice]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults_for_missing_keys() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"countdown_secs": 5.5, "time_decay": ["audio"]}"#).unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.countdown(), Duration::from_secs_f64(5.5));
        assert_eq!(config.reveal(), DEFAULT_REVEAL);
        assert!(config.applies_time_decay(QuestionType::Audio));
        assert!(!config.applies_time_decay(QuestionType::Text));
        assert!(config.registrations_open());
    }

    #[test]
    fn zero_tick_falls_back_to_default() {
        let raw: RawConfig = serde_json::from_str(r#"{"tick_secs": 0}"#).unwrap();
        assert_eq!(AppConfig::from(raw).tick(), DEFAULT_TICK);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let config = AppConfig::load_from(Path::new("/definitely/not/app.json"));
        assert_eq!(config.countdown(), DEFAULT_COUNTDOWN);
        assert!(config.applies_time_decay(QuestionType::MultipleChoice));
        assert_eq!(config.content_path(), Path::new(DEFAULT_CONTENT_PATH));
    }
}
