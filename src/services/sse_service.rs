use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::sse::{Handshake, PauseStateEvent, ServerEvent},
    error::ServiceError,
    services::{
        catch_up::current_question_event,
        sse_events::{EVENT_PAUSE_STATE, EVENT_QUESTION_ACTIVE},
    },
    state::SharedState,
};

const HANDSHAKE_EVENT: &str = "handshake";

/// A subscription plus the catch-up events to send before live ones.
pub struct Subscription {
    pub receiver: broadcast::Receiver<ServerEvent>,
    pub initial: Vec<ServerEvent>,
}

/// Subscribe to the public display stream.
pub fn subscribe_public(state: &SharedState) -> Subscription {
    // Subscribe before reading the snapshot so no transition falls in between.
    let receiver = state.public_sse().subscribe();
    let handshake = Handshake {
        stream: "public".into(),
        message: "public stream connected".into(),
        token: None,
    };
    Subscription {
        receiver,
        initial: initial_events(state, &handshake, false),
    }
}

/// Subscribe to the console stream, issuing the console token.
pub async fn subscribe_console(state: &SharedState) -> Result<Subscription, ServiceError> {
    let token = claim_console_token(state).await?;
    let receiver = state.console_sse().subscribe();
    let handshake = Handshake {
        stream: "admin".into(),
        message: "console stream connected".into(),
        token: Some(token),
    };
    Ok(Subscription {
        receiver,
        initial: initial_events(state, &handshake, true),
    })
}

/// Handshake, pause flag and, during a question, the adjusted `question.active` payload.
fn initial_events(state: &SharedState, handshake: &Handshake, with_key: bool) -> Vec<ServerEvent> {
    let paused = state.is_paused();
    let mut events = Vec::with_capacity(3);
    push_event(&mut events, HANDSHAKE_EVENT, handshake);
    push_event(&mut events, EVENT_PAUSE_STATE, &PauseStateEvent { paused });
    if let Some(question) = current_question_event(&state.session_snapshot(), paused, with_key) {
        push_event(&mut events, EVENT_QUESTION_ACTIVE, &question);
    }
    events
}

fn push_event(events: &mut Vec<ServerEvent>, name: &str, payload: &impl serde::Serialize) {
    match ServerEvent::json(Some(name.to_string()), payload) {
        Ok(event) => events.push(event),
        Err(err) => warn!(event = name, error = %err, "failed to serialize catch-up event"),
    }
}

/// Identifies the target SSE stream so we can perform stream-specific
/// bookkeeping when the connection is torn down.
#[derive(Clone)]
pub enum StreamKind {
    Public,
    /// Teardown releases the console token.
    Console(SharedState),
}

fn to_event(payload: ServerEvent) -> Event {
    let event = Event::default().data(payload.data);
    match payload.event {
        Some(name) => event.event(name),
        None => event,
    }
}

/// Convert a subscription into an SSE response, forwarding events and
/// cleaning up once the client disconnects.
pub fn to_sse_stream(
    subscription: Subscription,
    kind: StreamKind,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let Subscription {
        mut receiver,
        initial,
    } = subscription;
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        let mut open = true;
        for payload in initial {
            if tx.send(Ok(to_event(payload))).await.is_err() {
                open = false;
                break;
            }
        }

        while open {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => match recv_result {
                    Ok(payload) => {
                        if tx.send(Ok(to_event(payload))).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                    // Skip lagged messages but keep the stream alive.
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "SSE subscriber lagged");
                    }
                },
            }
        }

        match kind {
            StreamKind::Public => info!("public SSE stream disconnected"),
            StreamKind::Console(state) => {
                reset_console_token(&state).await;
                info!("console SSE stream disconnected");
            }
        }
    });

    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Reserve the console token for a new stream, failing if another connection holds it.
async fn claim_console_token(state: &SharedState) -> Result<String, ServiceError> {
    let mut guard = state.console_token().lock().await;
    match &mut *guard {
        slot @ None => {
            let token = Uuid::new_v4().simple().to_string();
            slot.replace(token.clone());
            Ok(token)
        }
        Some(_) => Err(ServiceError::Unauthorized(
            "another console stream is already active".into(),
        )),
    }
}

async fn reset_console_token(state: &SharedState) {
    state.console_token().lock().await.take();
}
