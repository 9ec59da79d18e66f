/// Read access to quiz content (questions grouped in rounds).
pub mod content_store;
/// In-memory implementation of every store trait.
pub mod memory;
/// JSON content file models used to seed the content store.
pub mod models;
/// Contestants and answers recorded during the live session.
pub mod session_store;
/// Storage abstraction layer errors.
pub mod storage;
