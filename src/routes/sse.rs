use std::convert::Infallible;

use axum::{
    Router,
    extract::State,
    response::sse::{Event, Sse},
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{
    error::AppError,
    services::sse_service::{self, StreamKind},
    state::SharedState,
};

#[utoipa::path(
    get,
    path = "/sse/public",
    tag = "sse",
    responses((status = 200, description = "Public display SSE stream", content_type = "text/event-stream", body = String))
)]
/// Stream display events; a question in progress is replayed with its remaining time.
pub async fn public_stream(
    State(state): State<SharedState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let subscription = sse_service::subscribe_public(&state);
    info!("new public SSE connection");
    sse_service::to_sse_stream(subscription, StreamKind::Public)
}

#[utoipa::path(
    get,
    path = "/sse/admin",
    tag = "sse",
    responses(
        (status = 200, description = "Console SSE stream; the handshake carries the admin token", content_type = "text/event-stream", body = String),
        (status = 401, description = "Another console stream is connected")
    )
)]
/// Stream console events and issue the admin token.
pub async fn admin_stream(
    State(state): State<SharedState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let subscription = sse_service::subscribe_console(&state).await?;
    info!("new console SSE connection");
    Ok(sse_service::to_sse_stream(
        subscription,
        StreamKind::Console(state),
    ))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/sse/public", get(public_stream))
        .route("/sse/admin", get(admin_stream))
}
