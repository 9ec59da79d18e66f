//! Fan-out of session transitions to the display, the console and each contestant.

use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    dto::{
        common::LeaderboardEntry,
        sse::{
            AnswerLockedEvent, AnswerRevealEvent, AnswerSubmittedEvent, CountdownEvent,
            LeaderboardEvent, LiveGuardBlockedEvent, PauseStateEvent, PlayerFlaggedEvent,
            PlayerJoinedEvent, PlayerStatusEvent, QuestionActiveEvent, RegistrationsEvent,
            RoundFinishedEvent, ServerEvent, TickEvent,
        },
        ws::ContestantMessage,
    },
    services::websocket_service::encode_message,
    state::{SharedState, quiz::PresenceStatus},
};

pub const EVENT_ROUND_COUNTDOWN: &str = "round.countdown";
pub const EVENT_QUESTION_ACTIVE: &str = "question.active";
pub const EVENT_TIMER_TICK: &str = "timer.tick";
pub const EVENT_PAUSE_STATE: &str = "pause.state";
pub const EVENT_ANSWER_LOCKED: &str = "answer.locked";
pub const EVENT_ANSWER_REVEAL: &str = "answer.reveal";
pub const EVENT_LEADERBOARD: &str = "leaderboard.updated";
pub const EVENT_ROUND_FINISHED: &str = "round.finished";
pub const EVENT_PLAYER_JOINED: &str = "player.joined";
pub const EVENT_PLAYER_STATUS: &str = "player.status";
pub const EVENT_PLAYER_FLAGGED: &str = "player.flagged";
pub const EVENT_ANSWER_SUBMITTED: &str = "answer.submitted";
pub const EVENT_LIVE_GUARD_BLOCKED: &str = "live.guard_blocked";
pub const EVENT_REGISTRATIONS: &str = "registrations.state";

/// Announce the pre-roll of a round to every audience.
pub fn broadcast_countdown(state: &SharedState, payload: CountdownEvent) {
    send_public_event(state, EVENT_ROUND_COUNTDOWN, &payload);
    send_console_event(state, EVENT_ROUND_COUNTDOWN, &payload);
    broadcast_to_contestants(state, &ContestantMessage::Countdown(payload));
}

/// Announce a question. `public` must not carry the answer key, `console` may.
pub fn broadcast_question_active(
    state: &SharedState,
    public: QuestionActiveEvent,
    console: &QuestionActiveEvent,
) {
    send_public_event(state, EVENT_QUESTION_ACTIVE, &public);
    send_console_event(state, EVENT_QUESTION_ACTIVE, console);
    broadcast_to_contestants(state, &ContestantMessage::QuestionActive(public));
}

/// Remaining-time tick of the running window.
pub fn broadcast_tick(state: &SharedState, payload: TickEvent) {
    send_public_event(state, EVENT_TIMER_TICK, &payload);
    send_console_event(state, EVENT_TIMER_TICK, &payload);
    broadcast_to_contestants(state, &ContestantMessage::Tick(payload));
}

/// Tell every audience to freeze or unfreeze local countdowns and media.
pub fn broadcast_pause_state(state: &SharedState, paused: bool) {
    let payload = PauseStateEvent { paused };
    send_public_event(state, EVENT_PAUSE_STATE, &payload);
    send_console_event(state, EVENT_PAUSE_STATE, &payload);
    broadcast_to_contestants(state, &ContestantMessage::PauseState(payload));
}

/// The submission window of a question closed.
pub fn broadcast_answer_locked(state: &SharedState, payload: AnswerLockedEvent) {
    send_public_event(state, EVENT_ANSWER_LOCKED, &payload);
    send_console_event(state, EVENT_ANSWER_LOCKED, &payload);
    broadcast_to_contestants(state, &ContestantMessage::AnswerLocked(payload));
}

/// Reveal to the display and the console; contestants get individual feedback instead.
pub fn broadcast_reveal(state: &SharedState, public: &AnswerRevealEvent, console: &AnswerRevealEvent) {
    send_public_event(state, EVENT_ANSWER_REVEAL, public);
    send_console_event(state, EVENT_ANSWER_REVEAL, console);
}

/// Round summary for the display and the console; contestants get their own recap.
pub fn broadcast_round_finished(
    state: &SharedState,
    public: &RoundFinishedEvent,
    console: &RoundFinishedEvent,
) {
    send_public_event(state, EVENT_ROUND_FINISHED, public);
    send_console_event(state, EVENT_ROUND_FINISHED, console);
}

/// Publish recomputed scores.
pub fn broadcast_leaderboard(state: &SharedState, entries: &[LeaderboardEntry]) {
    let payload = LeaderboardEvent(entries.to_vec());
    send_public_event(state, EVENT_LEADERBOARD, &payload);
    send_console_event(state, EVENT_LEADERBOARD, &payload);
    broadcast_to_contestants(
        state,
        &ContestantMessage::Leaderboard {
            entries: entries.to_vec(),
        },
    );
}

/// Console-only: a contestant joined or reconnected.
pub fn broadcast_player_joined(state: &SharedState, name: &str, score: f64, reconnected: bool) {
    let payload = PlayerJoinedEvent {
        name: name.to_string(),
        score,
        reconnected,
    };
    send_console_event(state, EVENT_PLAYER_JOINED, &payload);
}

/// Console-only: presence changed.
pub fn broadcast_player_status(state: &SharedState, name: &str, status: PresenceStatus) {
    let payload = PlayerStatusEvent {
        name: name.to_string(),
        status,
    };
    send_console_event(state, EVENT_PLAYER_STATUS, &payload);
}

/// Console-only: a contestant was locked out.
pub fn broadcast_player_flagged(state: &SharedState, name: &str, reason: Option<String>) {
    let payload = PlayerFlaggedEvent {
        name: name.to_string(),
        reason,
    };
    send_console_event(state, EVENT_PLAYER_FLAGGED, &payload);
}

/// Console-only: an answer was recorded.
pub fn broadcast_answer_submitted(state: &SharedState, payload: AnswerSubmittedEvent) {
    send_console_event(state, EVENT_ANSWER_SUBMITTED, &payload);
}

/// Console-only: an action was refused because a sequence is running.
pub fn broadcast_guard_blocked(state: &SharedState, action: &str) {
    let payload = LiveGuardBlockedEvent {
        action: action.to_string(),
        message: "a live sequence is already running".to_string(),
    };
    send_console_event(state, EVENT_LIVE_GUARD_BLOCKED, &payload);
}

/// Console-only: registrations gate changed.
pub fn broadcast_registrations(state: &SharedState, open: bool) {
    send_console_event(state, EVENT_REGISTRATIONS, &RegistrationsEvent { open });
}

pub fn send_public_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.public_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize public SSE payload"),
    }
}

pub fn send_console_event(state: &SharedState, event: &str, payload: &impl Serialize) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.console_sse().broadcast(event),
        Err(err) => warn!(event, error = %err, "failed to serialize console SSE payload"),
    }
}

/// Push a message to every open socket of `name`, pruning closed ones.
///
/// Returns whether at least one socket accepted the message.
pub fn send_to_contestant(state: &SharedState, name: &str, message: &ContestantMessage) -> bool {
    let Some(frame) = encode_message(message) else {
        return false;
    };
    let Some(mut connections) = state.contestants().get_mut(name) else {
        debug!(contestant = %name, "no open socket; message dropped");
        return false;
    };
    connections.retain(|connection| connection.tx.send(frame.clone()).is_ok());
    !connections.is_empty()
}

/// Names with at least one open socket.
pub fn connected_contestants(state: &SharedState) -> Vec<String> {
    state
        .contestants()
        .iter()
        .filter(|entry| !entry.value().is_empty())
        .map(|entry| entry.key().clone())
        .collect()
}

/// Push a message to every connected contestant, pruning closed sockets.
pub fn broadcast_to_contestants(state: &SharedState, message: &ContestantMessage) {
    let Some(frame) = encode_message(message) else {
        return;
    };
    for mut entry in state.contestants().iter_mut() {
        entry
            .value_mut()
            .retain(|connection| connection.tx.send(frame.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::ws::Message;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    use super::*;
    use crate::{
        config::AppConfig,
        dao::memory::MemoryStore,
        state::{AppState, ContestantConnection},
    };

    fn state() -> SharedState {
        let store = Arc::new(MemoryStore::new());
        AppState::new(AppConfig::default(), store.clone(), store)
    }

    #[tokio::test]
    async fn pause_reaches_every_audience() {
        let state = state();
        let mut public = state.public_sse().subscribe();
        let mut console = state.console_sse().subscribe();
        let (tx, mut rx) = mpsc::unbounded_channel();
        state.attach_contestant("ana", ContestantConnection { id: Uuid::new_v4(), tx });

        broadcast_pause_state(&state, true);

        assert_eq!(public.recv().await.unwrap().event.as_deref(), Some(EVENT_PAUSE_STATE));
        assert_eq!(console.recv().await.unwrap().event.as_deref(), Some(EVENT_PAUSE_STATE));
        match rx.recv().await.unwrap() {
            Message::Text(text) => assert!(text.as_str().contains("pause.state")),
            other => panic!("unexpected frame {other:?}"),
        }
    }

    #[tokio::test]
    async fn closed_sockets_are_pruned_on_send() {
        let state = state();
        let (open_tx, _open_rx) = mpsc::unbounded_channel();
        let (closed_tx, closed_rx) = mpsc::unbounded_channel();
        drop(closed_rx);
        state.attach_contestant("ana", ContestantConnection { id: Uuid::new_v4(), tx: open_tx });
        state.attach_contestant("ana", ContestantConnection { id: Uuid::new_v4(), tx: closed_tx });

        assert!(send_to_contestant(&state, "ana", &ContestantMessage::Flagged));
        assert_eq!(state.contestants().get("ana").unwrap().len(), 1);
        assert!(!send_to_contestant(&state, "bo", &ContestantMessage::Flagged));
    }

    #[tokio::test]
    async fn contestant_only_events_skip_public_stream() {
        let state = state();
        let mut public = state.public_sse().subscribe();
        broadcast_player_status(&state, "ana", PresenceStatus::Away);
        broadcast_pause_state(&state, false);
        // The first public event is the pause, not the presence update.
        assert_eq!(public.recv().await.unwrap().event.as_deref(), Some(EVENT_PAUSE_STATE));
    }
}
