//! Catalog models for SQLite-backed storage.

use crate::emotion::Emotion;
use serde::{Deserialize, Serialize};

/// A catalog entry.
///
/// `genre` and `emotion_tags` are comma-joined strings as stored in the
/// database; use [`Movie::emotion_tag_tokens`] to read the tags as a list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Movie {
    pub id: String,
    pub title: String,
    pub genre: String,
    pub year: Option<i32>,
    pub rating: Option<f64>,
    pub votes: Option<i64>,
    pub runtime_minutes: Option<i32>,
    pub emotion_tags: String,
    pub file_path: Option<String>,
    pub thumbnail: Option<String>,
    pub description: Option<String>,
}

impl Movie {
    /// Lowercased, trimmed, non-empty tag tokens.
    pub fn emotion_tag_tokens(&self) -> impl Iterator<Item = String> + '_ {
        split_tag_list(&self.emotion_tags)
    }

    /// Exact token match, "sad" does not match "sadness".
    pub fn has_emotion_tag(&self, emotion: Emotion) -> bool {
        self.emotion_tag_tokens().any(|t| t == emotion.as_str())
    }
}

pub(crate) fn split_tag_list(tags: &str) -> impl Iterator<Item = String> + '_ {
    tags.split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
}

/// How many catalog entries carry a given label.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmotionTagCount {
    pub emotion: Emotion,
    pub movie_count: usize,
}
