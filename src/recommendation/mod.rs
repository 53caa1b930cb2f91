//! Emotion-conditioned movie recommendations.
//!
//! Lookup is two-tier: movies tagged with the requested emotion at or above
//! the rating floor first, and a uniform random sample of the whole catalog
//! when that comes back empty. Short of a zero limit, the only way to get an
//! empty list is an empty catalog.

use crate::catalog_store::{CatalogStore, Movie};
use crate::emotion::Emotion;
use anyhow::Result;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecommendationSettings {
    pub min_rating: f64,
    pub max_recommendations: usize,
}

impl Default for RecommendationSettings {
    fn default() -> Self {
        RecommendationSettings {
            min_rating: 6.0,
            max_recommendations: 10,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    EmotionMatch,
    RandomFallback,
}

impl RecommendationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationSource::EmotionMatch => "emotion_match",
            RecommendationSource::RandomFallback => "random_fallback",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Recommendations {
    pub movies: Vec<Movie>,
    pub source: RecommendationSource,
}

#[derive(Clone)]
pub struct RecommendationEngine {
    catalog: Arc<dyn CatalogStore>,
    settings: RecommendationSettings,
}

impl RecommendationEngine {
    pub fn new(catalog: Arc<dyn CatalogStore>, settings: RecommendationSettings) -> Self {
        RecommendationEngine { catalog, settings }
    }

    pub fn settings(&self) -> &RecommendationSettings {
        &self.settings
    }

    fn effective_limit(&self, limit: usize) -> usize {
        limit.min(self.settings.max_recommendations)
    }

    /// Movies tagged with `emotion` and rated at least the configured floor,
    /// best first. At most `limit` (capped at the configured maximum) distinct
    /// movies; empty when nothing matches.
    pub fn get_movies_by_emotion(&self, emotion: Emotion, limit: usize) -> Result<Vec<Movie>> {
        let limit = self.effective_limit(limit);
        if limit == 0 {
            return Ok(vec![]);
        }

        let candidates = self
            .catalog
            .get_emotion_candidates(emotion, self.settings.min_rating)?;

        let mut seen = HashSet::new();
        let movies: Vec<Movie> = candidates
            .into_iter()
            .filter(|movie| movie.has_emotion_tag(emotion))
            .filter(|movie| seen.insert(movie.id.clone()))
            .take(limit)
            .collect();

        debug!("{} movies matched emotion {}", movies.len(), emotion);
        Ok(movies)
    }

    /// Up to `limit` (capped at the configured maximum) distinct movies drawn
    /// uniformly from the whole catalog, ignoring tags and ratings.
    pub fn get_random_movies<R: Rng + ?Sized>(&self, limit: usize, rng: &mut R) -> Result<Vec<Movie>> {
        let limit = self.effective_limit(limit);
        let ids = self.catalog.list_movie_ids()?;
        let amount = limit.min(ids.len());
        if amount == 0 {
            return Ok(vec![]);
        }

        let picked: Vec<String> = rand::seq::index::sample(rng, ids.len(), amount)
            .into_iter()
            .map(|i| ids[i].clone())
            .collect();
        self.catalog.get_movies_by_ids(&picked)
    }

    /// Emotion match first, random sample of the catalog when that is empty.
    pub fn recommend<R: Rng + ?Sized>(
        &self,
        emotion: Emotion,
        limit: usize,
        rng: &mut R,
    ) -> Result<Recommendations> {
        let movies = self.get_movies_by_emotion(emotion, limit)?;
        if !movies.is_empty() {
            return Ok(Recommendations {
                movies,
                source: RecommendationSource::EmotionMatch,
            });
        }

        debug!("No movies for emotion {}, falling back to random picks", emotion);
        Ok(Recommendations {
            movies: self.get_random_movies(limit, rng)?,
            source: RecommendationSource::RandomFallback,
        })
    }
}
