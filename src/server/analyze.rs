//! `POST /analyze_emotion`: multipart upload in, fused emotion and movie
//! picks out.

use super::server::error_response;
use super::state::GuardedAnalyzer;
use crate::analysis::AnalysisRequest;
use crate::catalog_store::Movie;
use crate::fusion::FusionResult;
use crate::recommendation::RecommendationSource;
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error};

#[derive(Serialize)]
struct AnalyzeResponse {
    success: bool,
    session_id: String,
    emotion_analysis: FusionResult,
    recommendations: Vec<Movie>,
    recommendation_source: RecommendationSource,
}

fn multipart_error(err: MultipartError) -> Response {
    error_response(err.status(), err.body_text())
}

/// Collects the `text`, `image` and `audio` fields. Unknown fields are
/// skipped; a repeated field keeps its last value.
///
/// A body that carries no part at all is read as a request with no inputs,
/// multer reports it as an incomplete stream. Oversized bodies still fail.
async fn read_analysis_request(mut multipart: Multipart) -> Result<AnalysisRequest, Response> {
    let mut request = AnalysisRequest::default();
    let mut fields_read = 0usize;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) if fields_read == 0 && err.status() != StatusCode::PAYLOAD_TOO_LARGE => {
                debug!("Empty multipart body ({}), analyzing with no inputs", err);
                break;
            }
            Err(err) => return Err(multipart_error(err)),
        };
        fields_read += 1;
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "text" => request.text = Some(field.text().await.map_err(multipart_error)?),
            "image" => request.image = Some(field.bytes().await.map_err(multipart_error)?.to_vec()),
            "audio" => request.audio = Some(field.bytes().await.map_err(multipart_error)?.to_vec()),
            other => debug!("Ignoring unexpected multipart field {:?}", other),
        }
    }
    Ok(request)
}

pub(super) async fn analyze_emotion(
    State(analyzer): State<GuardedAnalyzer>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => return error_response(rejection.status(), rejection.body_text()),
    };
    let request = match read_analysis_request(multipart).await {
        Ok(request) => request,
        Err(response) => return response,
    };

    match analyzer.analyze(request).await {
        Ok(outcome) => Json(AnalyzeResponse {
            success: true,
            session_id: outcome.session_id,
            emotion_analysis: outcome.emotion_analysis,
            recommendations: outcome.recommendations.movies,
            recommendation_source: outcome.recommendations.source,
        })
        .into_response(),
        Err(err) => {
            error!("Emotion analysis failed: {:#}", err);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Analysis failed")
        }
    }
}
