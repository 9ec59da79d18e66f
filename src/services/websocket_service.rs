use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{
        sse::{AnswerSubmittedEvent, PauseStateEvent},
        ws::{ActivityStatus, ContestantInbound, ContestantMessage, JoinRequest},
    },
    error::ServiceError,
    services::{
        catch_up::current_question_event,
        sse_events::{
            broadcast_answer_submitted, broadcast_player_flagged, broadcast_player_joined,
            broadcast_player_status, send_to_contestant,
        },
        submission,
    },
    state::{
        ContestantConnection, SharedState,
        quiz::{Contestant, PresenceStatus},
    },
};

const IDENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Internal error type for contestant socket handling, distinct from `ServiceError`
/// which is used for HTTP responses.
#[derive(Debug, Error)]
enum ContestantError {
    /// Writer channel closed - connection should be terminated immediately.
    #[error("connection closed")]
    ConnectionClosed,
    #[error("service error: {0}")]
    Service(#[from] ServiceError),
}

/// Handle the full lifecycle of a contestant WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let initial_message = match tokio::time::timeout(IDENT_TIMEOUT, receiver.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text,
        Ok(Some(Ok(Message::Close(_)))) => {
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Ok(_))) => {
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(Some(Err(err))) => {
            warn!(error = %err, "websocket receive error");
            finalize(writer_task, outbound_tx).await;
            return;
        }
        Ok(None) | Err(_) => {
            warn!("contestant did not join in time");
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };

    let Ok(ContestantInbound::Join(request)) = ContestantInbound::from_json_str(&initial_message)
    else {
        warn!("first contestant message was not a join");
        let _ = outbound_tx.send(Message::Close(None));
        finalize(writer_task, outbound_tx).await;
        return;
    };

    let (contestant, reconnected) = match join(&state, request).await {
        Ok(joined) => joined,
        Err(err) => {
            info!(error = %err, "contestant join refused");
            let _ = send_message_to_websocket(
                &outbound_tx,
                &ContestantMessage::JoinError {
                    message: err.to_string(),
                },
            );
            let _ = outbound_tx.send(Message::Close(None));
            finalize(writer_task, outbound_tx).await;
            return;
        }
    };
    let name = contestant.name.clone();
    let connection_id = Uuid::new_v4();
    state.attach_contestant(
        &name,
        ContestantConnection {
            id: connection_id,
            tx: outbound_tx.clone(),
        },
    );
    info!(contestant = %name, reconnected, "contestant connected");
    broadcast_player_joined(&state, &name, contestant.score, reconnected);
    broadcast_player_status(&state, &name, PresenceStatus::Active);

    if send_welcome(&state, &contestant, &outbound_tx).is_ok() {
        while let Some(message) = receiver.next().await {
            match message {
                Ok(Message::Text(text)) => match ContestantInbound::from_json_str(&text) {
                    Ok(inbound) => {
                        if let Err(err) = handle_inbound(&state, &name, &outbound_tx, inbound).await
                        {
                            warn!(contestant = %name, error = %err, "failed to handle contestant message");
                            if matches!(err, ContestantError::ConnectionClosed) {
                                break;
                            }
                        }
                    }
                    Err(err) => {
                        debug!(contestant = %name, error = %err, "malformed contestant message dropped");
                    }
                },
                Ok(Message::Ping(payload)) => {
                    let _ = outbound_tx.send(Message::Pong(payload));
                }
                Ok(Message::Close(frame)) => {
                    let _ = outbound_tx.send(Message::Close(frame));
                    break;
                }
                Ok(Message::Binary(_)) | Ok(Message::Pong(_)) => {}
                Err(err) => {
                    warn!(contestant = %name, error = %err, "websocket error");
                    break;
                }
            }
        }
    }

    disconnect(&state, &name, connection_id).await;
    finalize(writer_task, outbound_tx).await;
}

/// Register a new contestant or verify the PIN of a returning one.
///
/// Returns the contestant and whether the name already existed.
async fn join(state: &SharedState, request: JoinRequest) -> Result<(Contestant, bool), ServiceError> {
    request
        .validate()
        .map_err(|err| ServiceError::InvalidInput(err.to_string()))?;
    let name = request.name.trim().to_string();
    let sessions = state.sessions();
    let reconnected = sessions.contestant(&name).await?.is_some();
    let contestant = sessions
        .join_contestant(name, request.pin, state.registrations_open())
        .await?;
    Ok((contestant, reconnected))
}

/// Acknowledge the join and replay the current pause flag and active question.
fn send_welcome(
    state: &SharedState,
    contestant: &Contestant,
    tx: &mpsc::UnboundedSender<Message>,
) -> Result<(), ContestantError> {
    send_message_to_websocket(
        tx,
        &ContestantMessage::Joined {
            name: contestant.name.clone(),
            score: contestant.score,
        },
    )?;
    let paused = state.is_paused();
    send_message_to_websocket(tx, &ContestantMessage::PauseState(PauseStateEvent { paused }))?;
    if let Some(question) = current_question_event(&state.session_snapshot(), paused, false) {
        send_message_to_websocket(tx, &ContestantMessage::QuestionActive(question))?;
    }
    Ok(())
}

async fn handle_inbound(
    state: &SharedState,
    name: &str,
    tx: &mpsc::UnboundedSender<Message>,
    inbound: ContestantInbound,
) -> Result<(), ContestantError> {
    match inbound {
        ContestantInbound::SubmitAnswer(request) => {
            match submission::submit(state, name, request).await {
                Ok(answer) => {
                    broadcast_answer_submitted(
                        state,
                        AnswerSubmittedEvent {
                            contestant: name.to_string(),
                            question_id: answer.question_id,
                            submission_time: answer.submission_time,
                        },
                    );
                    send_message_to_websocket(
                        tx,
                        &ContestantMessage::AnswerReceived {
                            question_id: answer.question_id,
                            submission_time: answer.submission_time,
                        },
                    )?;
                }
                Err(rejected) => {
                    debug!(contestant = %name, reason = %rejected, "answer dropped");
                }
            }
        }
        ContestantInbound::Activity { status } => {
            let status = match status {
                ActivityStatus::Active => PresenceStatus::Active,
                ActivityStatus::Away => PresenceStatus::Away,
            };
            state
                .sessions()
                .set_status(name, status)
                .await
                .map_err(ServiceError::from)?;
            broadcast_player_status(state, name, status);
        }
        ContestantInbound::CheatDetected { reason } => {
            state
                .sessions()
                .flag_contestant(name)
                .await
                .map_err(ServiceError::from)?;
            warn!(contestant = %name, reason = ?reason, "contestant flagged");
            broadcast_player_flagged(state, name, reason);
            send_to_contestant(state, name, &ContestantMessage::Flagged);
        }
        ContestantInbound::Join(_) => {
            warn!(contestant = %name, "ignoring duplicate join message");
        }
        ContestantInbound::Unknown => {
            debug!(contestant = %name, "unknown contestant message type");
        }
    }
    Ok(())
}

/// Drop the socket from the registry; the last socket marks the contestant offline.
async fn disconnect(state: &SharedState, name: &str, connection_id: Uuid) {
    if !state.detach_contestant(name, connection_id) {
        info!(contestant = %name, "contestant socket closed; others remain");
        return;
    }
    match state.sessions().set_status(name, PresenceStatus::Offline).await {
        Ok(_) => broadcast_player_status(state, name, PresenceStatus::Offline),
        Err(err) => warn!(contestant = %name, error = %err, "failed to mark contestant offline"),
    }
    info!(contestant = %name, "contestant disconnected");
}

/// Serialize a message into a text frame; serialization failures are logged and dropped.
pub(crate) fn encode_message<T>(value: &T) -> Option<Message>
where
    T: ?Sized + serde::Serialize + std::fmt::Debug,
{
    match serde_json::to_string(value) {
        Ok(payload) => Some(Message::Text(payload.into())),
        Err(err) => {
            warn!(error = %err, "failed to serialize message `{value:?}`");
            None
        }
    }
}

/// Serialize a payload and push it onto the provided WebSocket sender.
///
/// Returns `Err(ContestantError::ConnectionClosed)` if the writer channel is closed.
fn send_message_to_websocket<T>(
    tx: &mpsc::UnboundedSender<Message>,
    value: &T,
) -> Result<(), ContestantError>
where
    T: ?Sized + serde::Serialize + std::fmt::Debug,
{
    let Some(frame) = encode_message(value) else {
        return Ok(());
    };
    tx.send(frame).map_err(|_| ContestantError::ConnectionClosed)
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
