//! MoodReel: multimodal emotion fusion and emotion-driven movie
//! recommendations.

pub mod analysis;
pub mod catalog_loader;
pub mod catalog_store;
pub mod classifiers;
pub mod config;
pub mod emotion;
pub mod fusion;
pub mod recommendation;
pub mod server;
pub mod session_store;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use catalog_store::{CatalogStore, SqliteCatalogStore};
pub use emotion::{Emotion, EmotionSignal, Modality};
pub use server::{run_server, RequestsLoggingLevel};
pub use session_store::{SessionStore, SqliteSessionStore};
