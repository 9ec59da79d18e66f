//! Library crate for the live quiz orchestrator, exposing modules for binaries and integration tests.

use std::{path::Path, sync::Arc};

use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

pub mod config;
pub mod dao;
pub mod dto;
pub mod error;
pub mod routes;
pub mod services;
pub mod state;

use crate::{
    config::AppConfig,
    dao::{
        memory::MemoryStore,
        models::{ContentFile, load_content_file},
        storage::StorageResult,
    },
    state::{AppState, SharedState},
};

/// Build the in-memory store from the content file at `path`.
///
/// A missing file yields an active quiz without questions.
pub fn load_store(path: &Path) -> StorageResult<MemoryStore> {
    let file = match load_content_file(path)? {
        Some(file) => {
            info!(
                path = %path.display(),
                title = %file.title,
                questions = file.questions.len(),
                "loaded quiz content"
            );
            file
        }
        None => {
            info!(path = %path.display(), "no quiz content found; starting with an empty quiz");
            ContentFile {
                title: "Untitled quiz".into(),
                questions: Vec::new(),
            }
        }
    };
    MemoryStore::from_content(file)
}

/// Wire the shared state on top of a single store serving content and session tables.
pub fn build_state(config: AppConfig, store: MemoryStore) -> SharedState {
    let store = Arc::new(store);
    AppState::new(config, store.clone(), store)
}

/// Build the top-level router and attach cross-cutting middleware layers.
pub fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
