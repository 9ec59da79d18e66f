use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
};
use axum_valid::Valid;

use crate::{
    dto::admin::{
        ActionResponse, AutoplayStartedResponse, FinalizeRoundRequest, GradingRow,
        LockPlayerRequest, OverridePointsRequest, PauseResponse, PlayerSummary,
        RegistrationsRequest, RepositionRequest, RoundFinalizedResponse, RoundGradingResponse,
        RoundQuestionsResponse, StartAutoplayRequest,
    },
    error::AppError,
    services::{admin_service, sequencer},
    state::{
        SharedState,
        quiz::{AnswerId, QuestionId},
    },
};

const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Console-only endpoints driving the live session.
pub fn router(state: SharedState) -> Router<SharedState> {
    Router::new()
        .route("/admin/rounds/autoplay", post(start_autoplay))
        .route("/admin/rounds/finalize", post(finalize_round))
        .route("/admin/rounds/{round}/grading", get(grading_data))
        .route("/admin/questions/{id}/play", post(play_question))
        .route("/admin/questions/{id}/position", put(reposition_question))
        .route("/admin/pause", post(toggle_pause))
        .route("/admin/answers/{id}/points", put(override_points))
        .route("/admin/players", get(list_players))
        .route("/admin/players/lock", post(lock_player))
        .route("/admin/registrations", put(set_registrations))
        .route_layer(middleware::from_fn_with_state(state, require_admin_token))
}

/// Start autoplay of a round: countdown, every question by position, then finalization.
#[utoipa::path(
    post,
    path = "/admin/rounds/autoplay",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    request_body = StartAutoplayRequest,
    responses(
        (status = 200, description = "Autoplay scheduled", body = AutoplayStartedResponse),
        (status = 409, description = "A live sequence is already running")
    )
)]
pub async fn start_autoplay(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<StartAutoplayRequest>>,
) -> Result<Json<AutoplayStartedResponse>, AppError> {
    Ok(Json(
        sequencer::start_autoplay(&state, payload.round, payload.question_id).await?,
    ))
}

/// Play a single question without countdown or round finalization.
#[utoipa::path(
    post,
    path = "/admin/questions/{id}/play",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream"),
    ("id" = u64, Path, description = "Identifier of the question to play")),
    responses(
        (status = 200, description = "Question scheduled", body = AutoplayStartedResponse),
        (status = 404, description = "Unknown question"),
        (status = 409, description = "A live sequence is already running")
    )
)]
pub async fn play_question(
    State(state): State<SharedState>,
    Path(id): Path<QuestionId>,
) -> Result<Json<AutoplayStartedResponse>, AppError> {
    Ok(Json(sequencer::play_single(&state, id).await?))
}

/// Re-grade a round and broadcast its summaries now.
#[utoipa::path(
    post,
    path = "/admin/rounds/finalize",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    request_body = FinalizeRoundRequest,
    responses(
        (status = 200, description = "Round finalized", body = RoundFinalizedResponse),
        (status = 409, description = "A live sequence is already running")
    )
)]
pub async fn finalize_round(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<FinalizeRoundRequest>>,
) -> Result<Json<RoundFinalizedResponse>, AppError> {
    Ok(Json(
        sequencer::finalize_round_now(&state, payload.round).await?,
    ))
}

/// Toggle the pause flag of the running sequence.
#[utoipa::path(
    post,
    path = "/admin/pause",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    responses(
        (status = 200, description = "New pause flag", body = PauseResponse),
        (status = 409, description = "Nothing is running")
    )
)]
pub async fn toggle_pause(State(state): State<SharedState>) -> Result<Json<PauseResponse>, AppError> {
    Ok(Json(admin_service::toggle_pause(&state).await?))
}

/// Every answer of a round with the derived answer keys.
#[utoipa::path(
    get,
    path = "/admin/rounds/{round}/grading",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream"),
    ("round" = u32, Path, description = "Round number")),
    responses((status = 200, description = "Grading data", body = RoundGradingResponse))
)]
pub async fn grading_data(
    State(state): State<SharedState>,
    Path(round): Path<u32>,
) -> Result<Json<RoundGradingResponse>, AppError> {
    Ok(Json(admin_service::grading_data(&state, round).await?))
}

/// Manually set one point slot of an answer.
#[utoipa::path(
    put,
    path = "/admin/answers/{id}/points",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream"),
    ("id" = u64, Path, description = "Identifier of the answer")),
    request_body = OverridePointsRequest,
    responses(
        (status = 200, description = "Updated answer", body = GradingRow),
        (status = 404, description = "Unknown answer")
    )
)]
pub async fn override_points(
    State(state): State<SharedState>,
    Path(id): Path<AnswerId>,
    Valid(Json(payload)): Valid<Json<OverridePointsRequest>>,
) -> Result<Json<GradingRow>, AppError> {
    Ok(Json(admin_service::override_points(&state, id, payload).await?))
}

/// Lock the answer of one contestant for the active question.
#[utoipa::path(
    post,
    path = "/admin/players/lock",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    request_body = LockPlayerRequest,
    responses(
        (status = 200, description = "Answer locked", body = ActionResponse),
        (status = 409, description = "No question is accepting answers")
    )
)]
pub async fn lock_player(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<LockPlayerRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    Ok(Json(admin_service::lock_player(&state, &payload.name).await?))
}

/// Contestants with score and presence.
#[utoipa::path(
    get,
    path = "/admin/players",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    responses((status = 200, description = "Registered contestants", body = [PlayerSummary]))
)]
pub async fn list_players(
    State(state): State<SharedState>,
) -> Result<Json<Vec<PlayerSummary>>, AppError> {
    Ok(Json(admin_service::players(&state).await?))
}

/// Open or close registrations for unknown names.
#[utoipa::path(
    put,
    path = "/admin/registrations",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream")),
    request_body = RegistrationsRequest,
    responses((status = 200, description = "Registrations updated", body = ActionResponse))
)]
pub async fn set_registrations(
    State(state): State<SharedState>,
    Json(payload): Json<RegistrationsRequest>,
) -> Json<ActionResponse> {
    Json(admin_service::set_registrations(&state, payload.open))
}

/// Move a question inside its round.
#[utoipa::path(
    put,
    path = "/admin/questions/{id}/position",
    tag = "admin",
    params(("X-Admin-Token" = String, Header, description = "Admin token issued by the /sse/admin stream"),
    ("id" = u64, Path, description = "Identifier of the question to move")),
    request_body = RepositionRequest,
    responses(
        (status = 200, description = "Round questions in their new order", body = RoundQuestionsResponse),
        (status = 409, description = "A live sequence is running")
    )
)]
pub async fn reposition_question(
    State(state): State<SharedState>,
    Path(id): Path<QuestionId>,
    Valid(Json(payload)): Valid<Json<RepositionRequest>>,
) -> Result<Json<RoundQuestionsResponse>, AppError> {
    Ok(Json(
        admin_service::reposition(&state, id, payload.position).await?,
    ))
}

async fn require_admin_token(
    State(state): State<SharedState>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let provided = req
        .headers()
        .get(ADMIN_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_owned())
        .ok_or_else(|| {
            AppError::Unauthorized("missing admin token header `X-Admin-Token`".into())
        })?;

    let expected = state.console_token().lock().await.clone();

    match expected {
        Some(token) if token == provided => Ok(next.run(req).await),
        Some(_) => Err(AppError::Unauthorized("invalid admin token".into())),
        None => Err(AppError::Unauthorized(
            "console SSE stream not initialised yet".into(),
        )),
    }
}
