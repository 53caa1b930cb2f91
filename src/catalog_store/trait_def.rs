//! CatalogStore trait definition.
//!
//! The recommendation engine and the HTTP layer only see this trait, so the
//! SQLite store can be swapped for an in-memory one in tests.

use super::models::{EmotionTagCount, Movie};
use crate::emotion::Emotion;
use anyhow::Result;

/// Trait for catalog storage backends.
pub trait CatalogStore: Send + Sync {
    // =========================================================================
    // Retrieval
    // =========================================================================

    /// Get a movie by ID.
    fn get_movie(&self, id: &str) -> Result<Option<Movie>>;

    /// Get movies by ID, preserving the order of `ids`. Unknown IDs are skipped.
    fn get_movies_by_ids(&self, ids: &[String]) -> Result<Vec<Movie>>;

    /// List the IDs of every movie in the catalog, in ascending ID order.
    fn list_movie_ids(&self) -> Result<Vec<String>>;

    // =========================================================================
    // Emotion queries
    // =========================================================================

    /// Candidate movies for `emotion` rated at least `min_rating`.
    ///
    /// The tag filter is a coarse substring prefilter: callers must still
    /// check each candidate with [`Movie::has_emotion_tag`]. Candidates come
    /// back ordered by rating desc, votes desc, year desc, id asc, with
    /// missing votes and years treated as 0.
    fn get_emotion_candidates(&self, emotion: Emotion, min_rating: f64) -> Result<Vec<Movie>>;

    /// Number of movies tagged with each vocabulary label.
    fn get_emotion_tag_counts(&self) -> Result<Vec<EmotionTagCount>>;

    // =========================================================================
    // Counts (for metrics)
    // =========================================================================

    /// Get the number of movies in the catalog.
    fn get_movies_count(&self) -> usize;

    // =========================================================================
    // Write Operations
    // =========================================================================

    /// Insert or replace movies keyed by ID, in a single transaction.
    /// Returns the number of rows written.
    fn upsert_movies(&self, movies: &[Movie]) -> Result<usize>;
}
