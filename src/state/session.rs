//! Session state machine driven by the round sequencer.

use std::time::SystemTime;

use thiserror::Error;

use crate::state::{quiz::Question, timer::PausableClock};

/// Question currently owned by the sequencer.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveQuestion {
    /// Question being played.
    pub question: Question,
    /// Round being played; equals the question round.
    pub round: u32,
    /// Wall-clock start of the answer window, exposed to clients.
    pub started_at: SystemTime,
}

/// Phases of a live session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionPhase {
    /// No sequencer is running.
    Idle,
    /// Pre-roll before the first question of a round.
    Countdown {
        /// Round about to start.
        round: u32,
    },
    /// Answers are accepted for the active question.
    QuestionActive(ActiveQuestion),
    /// Submission window is closed and the answer is shown.
    AnswerReveal(ActiveQuestion),
    /// Round summaries have been broadcast.
    RoundFinalized {
        /// Round that was finalized.
        round: u32,
    },
}

impl SessionPhase {
    /// Coarse orchestrator phase as seen by submission and catch-up handlers.
    pub fn orchestrator_phase(&self) -> OrchestratorPhase {
        match self {
            SessionPhase::QuestionActive(_) => OrchestratorPhase::Question,
            SessionPhase::AnswerReveal(_) => OrchestratorPhase::AnswerReveal,
            SessionPhase::Idle | SessionPhase::Countdown { .. } | SessionPhase::RoundFinalized { .. } => {
                OrchestratorPhase::None
            }
        }
    }

    /// Question attached to the phase, if any.
    pub fn active_question(&self) -> Option<&ActiveQuestion> {
        match self {
            SessionPhase::QuestionActive(active) | SessionPhase::AnswerReveal(active) => {
                Some(active)
            }
            _ => None,
        }
    }

    /// Whether a sequencer is currently driving a timed window.
    pub fn is_live(&self) -> bool {
        !matches!(self, SessionPhase::Idle | SessionPhase::RoundFinalized { .. })
    }
}

/// Orchestrator phase: `none`, `question` or `answer-reveal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorPhase {
    /// Nothing accepts answers.
    None,
    /// A question accepts answers.
    Question,
    /// The answer of the last question is being revealed.
    AnswerReveal,
}

/// Events that can be applied to the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Begin the pre-roll of a round.
    StartCountdown {
        /// Round about to start.
        round: u32,
    },
    /// Open the answer window of a question.
    ActivateQuestion(ActiveQuestion),
    /// Close the answer window and reveal the answer.
    Reveal,
    /// Broadcast the round summary.
    FinishRound {
        /// Round being finalized.
        round: u32,
    },
    /// Return to idle.
    Reset,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the state machine was in when the invalid event was received.
    pub from: SessionPhase,
    /// The event that cannot be applied from this phase.
    pub event: SessionEvent,
}

/// Read-only view published after every change.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    /// Current phase.
    pub phase: SessionPhase,
    /// Incremented on every transition.
    pub version: usize,
    /// Clock of the running timed window (countdown, question or reveal).
    pub window: Option<PausableClock>,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Idle,
            version: 0,
            window: None,
        }
    }
}

/// State machine implementing the round progression.
#[derive(Debug, Clone)]
pub struct SessionMachine {
    phase: SessionPhase,
    version: usize,
}

impl SessionMachine {
    /// Resume from the last published version, always starting idle.
    pub fn new(version: usize) -> Self {
        Self {
            phase: SessionPhase::Idle,
            version,
        }
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    /// Current version.
    pub fn version(&self) -> usize {
        self.version
    }

    /// Apply `event`, returning the new phase.
    pub fn apply(&mut self, event: SessionEvent) -> Result<&SessionPhase, InvalidTransition> {
        let next = self.compute_transition(event)?;
        self.phase = next;
        self.version += 1;
        Ok(&self.phase)
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let next = match (self.phase.clone(), event) {
            (SessionPhase::Idle, SessionEvent::StartCountdown { round }) => {
                SessionPhase::Countdown { round }
            }
            (
                SessionPhase::Idle | SessionPhase::Countdown { .. } | SessionPhase::AnswerReveal(_),
                SessionEvent::ActivateQuestion(active),
            ) => SessionPhase::QuestionActive(active),
            (SessionPhase::QuestionActive(active), SessionEvent::Reveal) => {
                SessionPhase::AnswerReveal(active)
            }
            (
                SessionPhase::Idle | SessionPhase::AnswerReveal(_),
                SessionEvent::FinishRound { round },
            ) => SessionPhase::RoundFinalized { round },
            (_, SessionEvent::Reset) => SessionPhase::Idle,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::state::quiz::QuestionKind;

    fn active(id: u64) -> ActiveQuestion {
        ActiveQuestion {
            question: Question {
                id,
                quiz_id: 1,
                round_number: 1,
                position: id as u32,
                duration: Duration::from_secs(30),
                kind: QuestionKind::Text {
                    prompt: "?".into(),
                    answer: "!".into(),
                },
            },
            round: 1,
            started_at: SystemTime::now(),
        }
    }

    #[test]
    fn initial_state_is_idle() {
        let sm = SessionMachine::new(0);
        assert_eq!(sm.phase(), &SessionPhase::Idle);
        assert_eq!(sm.phase().orchestrator_phase(), OrchestratorPhase::None);
    }

    #[test]
    fn full_round_walks_every_phase() {
        let mut sm = SessionMachine::new(3);

        sm.apply(SessionEvent::StartCountdown { round: 1 }).unwrap();
        let phase = sm.apply(SessionEvent::ActivateQuestion(active(1))).unwrap();
        assert_eq!(phase.orchestrator_phase(), OrchestratorPhase::Question);
        let phase = sm.apply(SessionEvent::Reveal).unwrap();
        assert_eq!(phase.orchestrator_phase(), OrchestratorPhase::AnswerReveal);
        sm.apply(SessionEvent::ActivateQuestion(active(2))).unwrap();
        sm.apply(SessionEvent::Reveal).unwrap();
        assert_eq!(
            sm.apply(SessionEvent::FinishRound { round: 1 }).unwrap(),
            &SessionPhase::RoundFinalized { round: 1 }
        );
        assert_eq!(sm.apply(SessionEvent::Reset).unwrap(), &SessionPhase::Idle);
        assert_eq!(sm.version(), 10);
    }

    #[test]
    fn single_play_skips_countdown() {
        let mut sm = SessionMachine::new(0);
        let phase = sm.apply(SessionEvent::ActivateQuestion(active(1))).unwrap();
        assert!(phase.is_live());
        assert_eq!(phase.active_question().map(|a| a.question.id), Some(1));
    }

    #[test]
    fn reveal_requires_an_active_question() {
        let mut sm = SessionMachine::new(0);
        let err = sm.apply(SessionEvent::Reveal).unwrap_err();
        assert_eq!(err.from, SessionPhase::Idle);
        assert_eq!(err.event, SessionEvent::Reveal);
        assert_eq!(sm.version(), 0);
    }

    #[test]
    fn cannot_finish_round_mid_question() {
        let mut sm = SessionMachine::new(0);
        sm.apply(SessionEvent::ActivateQuestion(active(1))).unwrap();
        assert!(sm.apply(SessionEvent::FinishRound { round: 1 }).is_err());
    }
}
