//! HTTP client for an external face/audio emotion classifier service.

use super::{ClassifierError, EmotionClassifier, ModalityInput};
use crate::emotion::{Emotion, EmotionSignal, Modality};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct ClassificationResponse {
    emotion: String,
    confidence: f64,
}

/// Posts the raw upload to `<base_url>/classify/<modality>` and expects
/// `{"emotion": "...", "confidence": 0.0..1.0}` back.
pub struct RemoteClassifier {
    client: reqwest::Client,
    base_url: String,
    modality: Modality,
}

impl RemoteClassifier {
    /// # Arguments
    /// * `base_url` - Base URL of the classifier service (e.g., "http://localhost:8500")
    /// * `modality` - Face or audio
    /// * `timeout_sec` - Request timeout in seconds
    pub fn new(base_url: &str, modality: Modality, timeout_sec: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            modality,
        })
    }

    fn unsupported(&self, detail: impl Into<String>) -> ClassifierError {
        ClassifierError::UnsupportedInput {
            modality: self.modality,
            detail: detail.into(),
        }
    }

    /// Checks the upload is a media type this modality can handle and
    /// returns its MIME type.
    fn sniff_mime_type(&self, bytes: &[u8]) -> Result<&'static str, ClassifierError> {
        let kind = infer::get(bytes).ok_or_else(|| self.unsupported("unrecognized content"))?;
        let mime_type = kind.mime_type();
        let accepted = match self.modality {
            Modality::Face => mime_type.starts_with("image/"),
            // Browser recorders produce webm, which is sniffed as video.
            Modality::Audio => mime_type.starts_with("audio/") || mime_type == "video/webm",
            Modality::Text => false,
        };
        if accepted {
            Ok(mime_type)
        } else {
            Err(self.unsupported(format!("content type {}", mime_type)))
        }
    }
}

#[async_trait]
impl EmotionClassifier for RemoteClassifier {
    fn modality(&self) -> Modality {
        self.modality
    }

    async fn analyze(&self, input: &ModalityInput) -> Result<EmotionSignal, ClassifierError> {
        let bytes = match (self.modality, input) {
            (Modality::Face, ModalityInput::Image(bytes)) => bytes,
            (Modality::Audio, ModalityInput::Audio(bytes)) => bytes,
            (_, other) => {
                return Err(self.unsupported(format!("got {} input", other.modality())))
            }
        };
        let mime_type = self.sniff_mime_type(bytes)?;

        let url = format!("{}/classify/{}", self.base_url, self.modality);
        let response = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(bytes.clone())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClassifierError::BadResponse(format!(
                "status {} from {}",
                response.status(),
                url
            )));
        }

        let classification: ClassificationResponse = response
            .json()
            .await
            .map_err(|e| ClassifierError::BadResponse(e.to_string()))?;
        if !classification.confidence.is_finite() {
            return Err(ClassifierError::BadResponse(format!(
                "non-finite confidence {}",
                classification.confidence
            )));
        }
        let label: Emotion = classification.emotion.parse()?;

        Ok(EmotionSignal::observed(
            self.modality,
            label,
            classification.confidence,
        ))
    }
}
