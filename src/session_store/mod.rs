mod store;

pub use store::SqliteSessionStore;

use crate::emotion::Emotion;
use crate::recommendation::RecommendationSource;
use anyhow::Result;
use serde::Serialize;

/// What one `/analyze_emotion` call concluded.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisSession {
    pub session_id: String,
    pub face_emotion: Emotion,
    pub audio_emotion: Emotion,
    pub text_emotion: Emotion,
    pub final_emotion: Emotion,
    pub final_confidence: f64,
    pub recommendation_source: RecommendationSource,
    pub recommended_movie_ids: Vec<String>,
    /// Unix timestamp, seconds.
    pub created: i64,
}

pub trait SessionStore: Send + Sync {
    /// Persists a finished analysis. Recording the same session id twice is an error.
    fn record_session(&self, session: &AnalysisSession) -> Result<()>;

    /// Returns Ok(None) if the session does not exist.
    fn get_session(&self, session_id: &str) -> Result<Option<AnalysisSession>>;

    /// Deletes sessions created before `cutoff` (unix seconds).
    /// Returns the number of sessions that were deleted.
    fn prune_sessions_older_than(&self, cutoff: i64) -> Result<usize>;

    fn get_sessions_count(&self) -> usize;
}
