use serde::Serialize;
use utoipa::ToSchema;

use crate::dto::phase::VisibleSessionPhase;

/// Simple health response returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Health status ("ok" or "degraded").
    pub status: String,
    /// Current session phase.
    pub phase: VisibleSessionPhase,
}

impl HealthResponse {
    /// Create a health response indicating the system is operational.
    pub fn ok(phase: VisibleSessionPhase) -> Self {
        Self {
            status: "ok".to_string(),
            phase,
        }
    }

    /// Create a health response indicating the content store cannot be read.
    pub fn degraded(phase: VisibleSessionPhase) -> Self {
        Self {
            status: "degraded".to_string(),
            phase,
        }
    }
}
