pub mod quiz;
pub mod session;
mod sse;
pub mod timer;

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, mpsc, watch};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::{content_store::ContentStore, session_store::SessionStore},
};

pub use self::sse::SseHub;
use self::{
    session::{InvalidTransition, SessionEvent, SessionMachine, SessionPhase, SessionSnapshot},
    sse::SseState,
    timer::PausableClock,
};

pub type SharedState = Arc<AppState>;

#[derive(Clone)]
/// Handle used to push messages to one open contestant socket.
pub struct ContestantConnection {
    /// Identifier of the socket, unique per connection.
    pub id: Uuid,
    /// Writer channel of the socket.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Central application state shared by every handler and the round sequencer.
pub struct AppState {
    config: AppConfig,
    content: Arc<dyn ContentStore>,
    sessions: Arc<dyn SessionStore>,
    sse: SseState,
    contestants: DashMap<String, Vec<ContestantConnection>>,
    session: watch::Sender<SessionSnapshot>,
    session_gate: Arc<Mutex<()>>,
    pause: watch::Sender<bool>,
    registrations_open: AtomicBool,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(
        config: AppConfig,
        content: Arc<dyn ContentStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> SharedState {
        let (session, _rx) = watch::channel(SessionSnapshot::default());
        let (pause, _rx) = watch::channel(false);
        let registrations_open = AtomicBool::new(config.registrations_open());
        Arc::new(Self {
            config,
            content,
            sessions,
            sse: SseState::new(),
            contestants: DashMap::new(),
            session,
            session_gate: Arc::new(Mutex::new(())),
            pause,
            registrations_open,
        })
    }

    /// Loaded configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Content collaborator.
    pub fn content(&self) -> &Arc<dyn ContentStore> {
        &self.content
    }

    /// Contestant and answer tables.
    pub fn sessions(&self) -> &Arc<dyn SessionStore> {
        &self.sessions
    }

    /// Broadcast hub used for the public SSE stream.
    pub fn public_sse(&self) -> &SseHub {
        self.sse.public()
    }

    /// Broadcast hub used for the console SSE stream.
    pub fn console_sse(&self) -> &SseHub {
        self.sse.console()
    }

    /// Token guard that ensures a single console SSE subscriber at a time.
    pub fn console_token(&self) -> &Mutex<Option<String>> {
        self.sse.console_token()
    }

    /// Registry of open contestant sockets keyed by contestant name.
    pub fn contestants(&self) -> &DashMap<String, Vec<ContestantConnection>> {
        &self.contestants
    }

    /// Add a socket to the registry under `name`.
    pub fn attach_contestant(&self, name: &str, connection: ContestantConnection) {
        self.contestants
            .entry(name.to_string())
            .or_default()
            .push(connection);
    }

    /// Remove a socket, returning `true` when it was the last one for `name`.
    pub fn detach_contestant(&self, name: &str, id: Uuid) -> bool {
        let Some(mut entry) = self.contestants.get_mut(name) else {
            return true;
        };
        entry.retain(|connection| connection.id != id);
        let empty = entry.is_empty();
        drop(entry);
        if empty {
            self.contestants.remove_if(name, |_, connections| connections.is_empty());
        }
        empty
    }

    /// Latest published session snapshot.
    pub fn session_snapshot(&self) -> SessionSnapshot {
        self.session.borrow().clone()
    }

    /// Subscribe to session snapshots.
    pub fn subscribe_session(&self) -> watch::Receiver<SessionSnapshot> {
        self.session.subscribe()
    }

    /// Take exclusive write access to the session, or `None` when a sequencer already holds it.
    pub fn claim_session(self: &Arc<Self>) -> Option<SessionWriter> {
        let gate = self.session_gate.clone().try_lock_owned().ok()?;
        let version = self.session.borrow().version;
        Some(SessionWriter {
            state: Arc::clone(self),
            machine: SessionMachine::new(version),
            window: None,
            _gate: gate,
        })
    }

    /// Subscribe to the pause flag.
    pub fn pause_receiver(&self) -> watch::Receiver<bool> {
        self.pause.subscribe()
    }

    /// Current pause flag.
    pub fn is_paused(&self) -> bool {
        *self.pause.borrow()
    }

    /// Flip the pause flag while a sequence is live and return its new value.
    ///
    /// The phase is read under the flag's lock; sequences release the session before clearing
    /// the flag, so a flip racing the end of a sequence is either cleared or refused.
    pub fn toggle_pause_if_live(&self) -> Option<bool> {
        let mut toggled = None;
        self.pause.send_if_modified(|paused| {
            if !self.session.borrow().phase.is_live() {
                return false;
            }
            *paused = !*paused;
            toggled = Some(*paused);
            true
        });
        toggled
    }

    /// Clear the pause flag, returning whether it was set.
    pub fn clear_pause(&self) -> bool {
        self.pause
            .send_if_modified(|paused| std::mem::replace(paused, false))
    }

    /// Whether unknown names may join.
    pub fn registrations_open(&self) -> bool {
        self.registrations_open.load(Ordering::SeqCst)
    }

    /// Open or close the registrations gate.
    pub fn set_registrations_open(&self, open: bool) {
        self.registrations_open.store(open, Ordering::SeqCst);
    }
}

/// Exclusive writer of the session state, held by the running sequencer.
///
/// Every change is published as a [`SessionSnapshot`]. Dropping the writer resets the session
/// to idle and releases the live guard.
pub struct SessionWriter {
    state: SharedState,
    machine: SessionMachine,
    window: Option<PausableClock>,
    _gate: OwnedMutexGuard<()>,
}

impl SessionWriter {
    /// Current phase.
    pub fn phase(&self) -> &SessionPhase {
        self.machine.phase()
    }

    /// Apply a transition; the timed window is cleared.
    pub fn apply(&mut self, event: SessionEvent) -> Result<SessionPhase, InvalidTransition> {
        let phase = self.machine.apply(event)?.clone();
        self.window = None;
        self.publish();
        Ok(phase)
    }

    /// Publish the clock of the running timed window.
    pub fn set_window(&mut self, window: Option<PausableClock>) {
        self.window = window;
        self.publish();
    }

    fn publish(&self) {
        self.state.session.send_replace(SessionSnapshot {
            phase: self.machine.phase().clone(),
            version: self.machine.version(),
            window: self.window,
        });
    }
}

impl Drop for SessionWriter {
    fn drop(&mut self) {
        if self.machine.phase() != &SessionPhase::Idle {
            let _ = self.machine.apply(SessionEvent::Reset);
        }
        self.window = None;
        self.publish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dao::memory::MemoryStore;

    fn state() -> SharedState {
        let store = Arc::new(MemoryStore::new());
        AppState::new(AppConfig::default(), store.clone(), store)
    }

    #[tokio::test]
    async fn only_one_writer_at_a_time() {
        let state = state();
        let mut writer = state.claim_session().unwrap();
        assert!(state.claim_session().is_none());

        writer
            .apply(SessionEvent::StartCountdown { round: 2 })
            .unwrap();
        assert_eq!(
            state.session_snapshot().phase,
            SessionPhase::Countdown { round: 2 }
        );

        drop(writer);
        assert_eq!(state.session_snapshot().phase, SessionPhase::Idle);
        assert!(state.claim_session().is_some());
    }

    #[tokio::test]
    async fn pause_flips_only_while_live() {
        let state = state();
        assert_eq!(state.toggle_pause_if_live(), None);
        assert!(!state.is_paused());

        let mut writer = state.claim_session().unwrap();
        writer
            .apply(SessionEvent::StartCountdown { round: 1 })
            .unwrap();
        assert_eq!(state.toggle_pause_if_live(), Some(true));
        assert!(state.is_paused());

        drop(writer);
        assert_eq!(state.toggle_pause_if_live(), None);
        assert!(state.clear_pause());
        assert!(!state.clear_pause());
        assert!(!state.is_paused());
    }

    #[tokio::test]
    async fn detaching_last_socket_empties_registry() {
        let state = state();
        let (tx, _rx) = mpsc::unbounded_channel();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();
        state.attach_contestant("ana", ContestantConnection { id: first, tx: tx.clone() });
        state.attach_contestant("ana", ContestantConnection { id: second, tx });

        assert!(!state.detach_contestant("ana", first));
        assert!(state.detach_contestant("ana", second));
        assert!(state.contestants().get("ana").is_none());
    }
}
