use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the quiz orchestrator.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::sse::public_stream,
        crate::routes::sse::admin_stream,
        crate::routes::websocket::ws_handler,
        crate::routes::public::get_leaderboard,
        crate::routes::public::get_session,
        crate::routes::admin::start_autoplay,
        crate::routes::admin::play_question,
        crate::routes::admin::finalize_round,
        crate::routes::admin::toggle_pause,
        crate::routes::admin::grading_data,
        crate::routes::admin::override_points,
        crate::routes::admin::lock_player,
        crate::routes::admin::list_players,
        crate::routes::admin::set_registrations,
        crate::routes::admin::reposition_question,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::ws::ContestantInbound,
            crate::dto::ws::ContestantMessage,
            crate::dto::sse::Handshake,
            crate::dto::sse::QuestionActiveEvent,
            crate::dto::sse::AnswerRevealEvent,
            crate::dto::sse::RoundFinishedEvent,
            crate::dto::sse::TickEvent,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "sse", description = "Server-sent events streams for the display and the console"),
        (name = "contestants", description = "WebSocket protocol for contestant devices"),
        (name = "public", description = "Read-only projections of the live session"),
        (name = "admin", description = "Console actions driving the live session"),
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_console_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/admin/rounds/autoplay",
            "/admin/rounds/{round}/grading",
            "/admin/questions/{id}/position",
            "/public/session",
            "/sse/admin",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }
    }
}
