use tokio::sync::{Mutex, broadcast};

use crate::dto::sse::ServerEvent;

const PUBLIC_CAPACITY: usize = 64;
const CONSOLE_CAPACITY: usize = 64;

/// Broadcast hubs for the public display and the control console.
pub struct SseState {
    public: SseHub,
    console: SseHub,
    console_token: Mutex<Option<String>>,
}

impl SseState {
    /// Build both hubs with their default capacities.
    pub fn new() -> Self {
        Self {
            public: SseHub::new(PUBLIC_CAPACITY),
            console: SseHub::new(CONSOLE_CAPACITY),
            console_token: Mutex::new(None),
        }
    }

    /// Hub feeding the public display.
    pub fn public(&self) -> &SseHub {
        &self.public
    }

    /// Hub feeding the control console.
    pub fn console(&self) -> &SseHub {
        &self.console
    }

    /// Token issued to the single console stream, if one is connected.
    pub fn console_token(&self) -> &Mutex<Option<String>> {
        &self.console_token
    }
}

/// Simple broadcast hub wrapper used by the SSE services.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Fire-and-forget send; having no subscriber is not an error.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }
}
