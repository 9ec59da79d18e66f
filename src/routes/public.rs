use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::public::{LeaderboardResponse, SessionResponse},
    error::AppError,
    services::public_service,
    state::SharedState,
};

/// Public read-only endpoints that expose the live session.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/public/leaderboard", get(get_leaderboard))
        .route("/public/session", get(get_session))
}

#[utoipa::path(
    get,
    path = "/public/leaderboard",
    tag = "public",
    responses((status = 200, description = "Ordered leaderboard", body = LeaderboardResponse))
)]
/// Return contestants ordered by score.
pub async fn get_leaderboard(
    State(state): State<SharedState>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    Ok(Json(public_service::get_leaderboard(&state).await?))
}

#[utoipa::path(
    get,
    path = "/public/session",
    tag = "public",
    responses((status = 200, description = "Current session phase", body = SessionResponse))
)]
/// Return the visible phase, active question and remaining time.
pub async fn get_session(State(state): State<SharedState>) -> Json<SessionResponse> {
    Json(public_service::get_session(&state))
}
