use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Report the session phase, degraded when the content store cannot be read.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    let phase = (&state.session_snapshot().phase).into();
    match state.content().active_quiz().await {
        Ok(Some(_)) => HealthResponse::ok(phase),
        Ok(None) => {
            warn!("no active quiz loaded");
            HealthResponse::degraded(phase)
        }
        Err(err) => {
            warn!(error = %err, "content store health check failed");
            HealthResponse::degraded(phase)
        }
    }
}
