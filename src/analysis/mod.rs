//! One emotion analysis request, end to end: classifiers, fusion,
//! recommendations and session recording.

use crate::classifiers::{analyze_or_default, EmotionClassifier, ModalityInput};
use crate::fusion::{FusionEngine, FusionResult};
use crate::recommendation::{RecommendationEngine, RecommendationSource, Recommendations};
use crate::server::metrics;
use crate::session_store::{AnalysisSession, SessionStore};
use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// One adapter per modality.
#[derive(Clone)]
pub struct ClassifierSet {
    pub face: Arc<dyn EmotionClassifier>,
    pub audio: Arc<dyn EmotionClassifier>,
    pub text: Arc<dyn EmotionClassifier>,
}

/// Raw request inputs. Absent and empty inputs are equivalent.
#[derive(Clone, Debug, Default)]
pub struct AnalysisRequest {
    pub text: Option<String>,
    pub image: Option<Vec<u8>>,
    pub audio: Option<Vec<u8>>,
}

impl AnalysisRequest {
    fn text_input(&self) -> Option<ModalityInput> {
        self.text
            .as_ref()
            .filter(|t| !t.trim().is_empty())
            .map(|t| ModalityInput::Text(t.clone()))
    }

    fn image_input(&self) -> Option<ModalityInput> {
        self.image
            .as_ref()
            .filter(|b| !b.is_empty())
            .map(|b| ModalityInput::Image(b.clone()))
    }

    fn audio_input(&self) -> Option<ModalityInput> {
        self.audio
            .as_ref()
            .filter(|b| !b.is_empty())
            .map(|b| ModalityInput::Audio(b.clone()))
    }
}

/// Hands out the randomness used for fallback picks, one generator per
/// request. Tests swap in a seeded factory to pin the fallback order.
pub type RngFactory = Arc<dyn Fn() -> StdRng + Send + Sync>;

#[derive(Clone, Debug)]
pub struct AnalysisOutcome {
    pub session_id: String,
    pub emotion_analysis: FusionResult,
    pub recommendations: Recommendations,
}

#[derive(Clone)]
pub struct Analyzer {
    classifiers: ClassifierSet,
    fusion: FusionEngine,
    recommender: RecommendationEngine,
    sessions: Arc<dyn SessionStore>,
    rng_factory: RngFactory,
}

impl Analyzer {
    pub fn new(
        classifiers: ClassifierSet,
        fusion: FusionEngine,
        recommender: RecommendationEngine,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Analyzer {
            classifiers,
            fusion,
            recommender,
            sessions,
            rng_factory: Arc::new(StdRng::from_os_rng),
        }
    }

    pub fn with_rng_factory(mut self, rng_factory: RngFactory) -> Self {
        self.rng_factory = rng_factory;
        self
    }

    pub fn recommender(&self) -> &RecommendationEngine {
        &self.recommender
    }

    pub fn rng(&self) -> StdRng {
        (self.rng_factory)()
    }

    /// Runs the three classifiers concurrently, fuses their signals and picks
    /// recommendations for the fused emotion. Fails only on catalog errors;
    /// a session that cannot be recorded is logged and otherwise ignored.
    pub async fn analyze(&self, request: AnalysisRequest) -> Result<AnalysisOutcome> {
        let session_id = Uuid::new_v4().to_string();

        let (face_input, audio_input, text_input) = (
            request.image_input(),
            request.audio_input(),
            request.text_input(),
        );
        let (face, audio, text) = tokio::join!(
            analyze_or_default(self.classifiers.face.as_ref(), face_input.as_ref()),
            analyze_or_default(self.classifiers.audio.as_ref(), audio_input.as_ref()),
            analyze_or_default(self.classifiers.text.as_ref(), text_input.as_ref()),
        );

        let emotion_analysis = self.fusion.fuse(face, audio, text);
        let final_emotion = emotion_analysis.final_emotion;

        let recommendations = self.recommender.recommend(
            final_emotion,
            self.recommender.settings().max_recommendations,
            &mut self.rng(),
        )?;

        info!(
            "Session {}: {} ({:.2}), {} recommendations via {}",
            session_id,
            final_emotion,
            emotion_analysis.confidence,
            recommendations.movies.len(),
            recommendations.source.as_str()
        );
        metrics::record_analysis(final_emotion);
        if recommendations.source == RecommendationSource::RandomFallback {
            metrics::record_recommendation_fallback();
        }

        let session = AnalysisSession {
            session_id: session_id.clone(),
            face_emotion: emotion_analysis.face.label,
            audio_emotion: emotion_analysis.audio.label,
            text_emotion: emotion_analysis.text.label,
            final_emotion,
            final_confidence: emotion_analysis.confidence,
            recommendation_source: recommendations.source,
            recommended_movie_ids: recommendations.movies.iter().map(|m| m.id.clone()).collect(),
            created: chrono::Utc::now().timestamp(),
        };
        if let Err(e) = self.sessions.record_session(&session) {
            warn!("Failed to record session {}: {:#}", session_id, e);
        }

        Ok(AnalysisOutcome {
            session_id,
            emotion_analysis,
            recommendations,
        })
    }
}
