//! Per-modality classifier adapters.
//!
//! Adapters turn raw request inputs into [`EmotionSignal`]s. Every failure is
//! absorbed by [`analyze_or_default`], so nothing past this module ever sees a
//! classifier error.

mod remote;
mod text;

pub use remote::RemoteClassifier;
pub use text::LexiconTextClassifier;

use crate::emotion::{EmotionSignal, Modality, UnknownEmotion};
use crate::server::metrics;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

/// Raw input for one modality, as received from the client.
#[derive(Clone, Debug, PartialEq)]
pub enum ModalityInput {
    Text(String),
    Image(Vec<u8>),
    Audio(Vec<u8>),
}

impl ModalityInput {
    pub fn modality(&self) -> Modality {
        match self {
            ModalityInput::Text(_) => Modality::Text,
            ModalityInput::Image(_) => Modality::Face,
            ModalityInput::Audio(_) => Modality::Audio,
        }
    }
}

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("No {0} classifier configured")]
    NotConfigured(Modality),

    #[error("Unsupported {modality} input: {detail}")]
    UnsupportedInput { modality: Modality, detail: String },

    #[error("Classifier request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Bad classifier response: {0}")]
    BadResponse(String),

    #[error(transparent)]
    UnknownLabel(#[from] UnknownEmotion),
}

#[async_trait]
pub trait EmotionClassifier: Send + Sync {
    fn modality(&self) -> Modality;

    async fn analyze(&self, input: &ModalityInput) -> Result<EmotionSignal, ClassifierError>;
}

/// Always fails with [`ClassifierError::NotConfigured`].
pub struct UnavailableClassifier {
    modality: Modality,
}

impl UnavailableClassifier {
    pub fn new(modality: Modality) -> Self {
        UnavailableClassifier { modality }
    }
}

#[async_trait]
impl EmotionClassifier for UnavailableClassifier {
    fn modality(&self) -> Modality {
        self.modality
    }

    async fn analyze(&self, _input: &ModalityInput) -> Result<EmotionSignal, ClassifierError> {
        Err(ClassifierError::NotConfigured(self.modality))
    }
}

/// Runs `classifier` on `input`, yielding the neutral prior when there is no
/// input or the classifier fails.
pub async fn analyze_or_default(
    classifier: &dyn EmotionClassifier,
    input: Option<&ModalityInput>,
) -> EmotionSignal {
    let modality = classifier.modality();
    let Some(input) = input else {
        return EmotionSignal::unavailable(modality);
    };

    match classifier.analyze(input).await {
        Ok(mut signal) => {
            signal.modality = modality;
            debug!(
                "{} classifier: {} ({:.2})",
                modality, signal.label, signal.confidence
            );
            signal
        }
        Err(ClassifierError::NotConfigured(_)) => {
            debug!("Ignoring {} input, no classifier configured", modality);
            EmotionSignal::unavailable(modality)
        }
        Err(e) => {
            warn!("{} classifier failed, using default signal: {}", modality, e);
            metrics::record_classifier_failure(modality);
            EmotionSignal::unavailable(modality)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emotion::Emotion;

    struct FixedClassifier {
        modality: Modality,
        result: fn() -> Result<EmotionSignal, ClassifierError>,
    }

    #[async_trait]
    impl EmotionClassifier for FixedClassifier {
        fn modality(&self) -> Modality {
            self.modality
        }

        async fn analyze(&self, _input: &ModalityInput) -> Result<EmotionSignal, ClassifierError> {
            (self.result)()
        }
    }

    #[tokio::test]
    async fn missing_input_yields_default() {
        let classifier = LexiconTextClassifier::new();
        let signal = analyze_or_default(&classifier, None).await;
        assert_eq!(signal, EmotionSignal::unavailable(Modality::Text));
    }

    #[tokio::test]
    async fn errors_yield_default() {
        let classifier = FixedClassifier {
            modality: Modality::Face,
            result: || Err(ClassifierError::BadResponse("garbage".to_string())),
        };
        let input = ModalityInput::Image(vec![1, 2, 3]);
        let signal = analyze_or_default(&classifier, Some(&input)).await;
        assert_eq!(signal, EmotionSignal::unavailable(Modality::Face));

        let unavailable = UnavailableClassifier::new(Modality::Audio);
        let input = ModalityInput::Audio(vec![1, 2, 3]);
        let signal = analyze_or_default(&unavailable, Some(&input)).await;
        assert!(!signal.observed);
        assert_eq!(signal.modality, Modality::Audio);
    }

    #[tokio::test]
    async fn signal_modality_is_forced_to_classifier_modality() {
        let classifier = FixedClassifier {
            modality: Modality::Audio,
            result: || Ok(EmotionSignal::observed(Modality::Text, Emotion::Angry, 0.7)),
        };
        let input = ModalityInput::Audio(vec![0]);
        let signal = analyze_or_default(&classifier, Some(&input)).await;
        assert_eq!(signal.modality, Modality::Audio);
        assert_eq!(signal.label, Emotion::Angry);
        assert!(signal.observed);
    }
}
