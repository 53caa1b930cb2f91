//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per server endpoint. When routes or
//! request formats change, update only this file.

use super::constants::*;
use reqwest::multipart::{Form, Part};
use reqwest::Response;
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    pub base_url: String,
}

/// Optional inputs for `POST /analyze_emotion`.
#[derive(Default)]
pub struct AnalyzeUpload<'a> {
    pub text: Option<&'a str>,
    pub image: Option<&'a [u8]>,
    pub audio: Option<&'a [u8]>,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    pub async fn get_home(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("Home request failed")
    }

    pub async fn analyze(&self, upload: AnalyzeUpload<'_>) -> Response {
        let mut form = Form::new();
        if let Some(text) = upload.text {
            form = form.text("text", text.to_string());
        }
        if let Some(image) = upload.image {
            form = form.part("image", Part::bytes(image.to_vec()).file_name("face.png"));
        }
        if let Some(audio) = upload.audio {
            form = form.part("audio", Part::bytes(audio.to_vec()).file_name("voice.webm"));
        }

        self.client
            .post(format!("{}/analyze_emotion", self.base_url))
            .multipart(form)
            .send()
            .await
            .expect("Analyze request failed")
    }

    pub async fn analyze_text(&self, text: &str) -> Response {
        self.analyze(AnalyzeUpload {
            text: Some(text),
            ..Default::default()
        })
        .await
    }

    pub async fn get_recommendations(&self, emotion: &str, limit: Option<usize>) -> Response {
        let mut request = self
            .client
            .get(format!("{}/v1/recommendations/{}", self.base_url, emotion));
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }
        request.send().await.expect("Recommendations request failed")
    }

    pub async fn get_movie(&self, id: &str) -> Response {
        self.client
            .get(format!("{}/v1/movie/{}", self.base_url, id))
            .send()
            .await
            .expect("Movie request failed")
    }

    pub async fn get_session(&self, session_id: &str) -> Response {
        self.client
            .get(format!("{}/v1/session/{}", self.base_url, session_id))
            .send()
            .await
            .expect("Session request failed")
    }
}
