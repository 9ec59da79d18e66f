/// Console actions outside the sequencer.
pub mod admin_service;
/// Catch-up payloads for (re)connecting clients.
pub mod catch_up;
/// OpenAPI documentation generation.
pub mod documentation;
/// Per-variant scoring of submitted answers.
pub mod grading;
/// Health check service.
pub mod health_service;
/// Score aggregation and ranking.
pub mod leaderboard;
/// Public service for read-only session information.
pub mod public_service;
/// Round sequencer background task.
pub mod sequencer;
/// Text normalisation and similarity scoring.
pub mod similarity;
/// Fan-out of session events to every audience.
pub mod sse_events;
/// Server-Sent Events subscription service.
pub mod sse_service;
/// Answer submission gate.
pub mod submission;
/// Contestant WebSocket connection handling.
pub mod websocket_service;
