use anyhow::{Context, Result};
use std::time::{Duration, Instant};

use tracing::error;

use tower_http::services::ServeDir;

use axum::{
    extract::{rejection::QueryRejection, DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::analyze::analyze_emotion;
use super::{log_requests, metrics::metrics_handler, state::*, ServerConfig};
use crate::analysis::Analyzer;
use crate::catalog_store::Movie;
use crate::emotion::Emotion;
use crate::recommendation::RecommendationSource;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub movies_count: usize,
    pub sessions_count: usize,
}

#[derive(Serialize)]
pub(super) struct ErrorResponse {
    success: bool,
    error: String,
}

pub(super) fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorResponse {
            success: false,
            error: error.into(),
        }),
    )
        .into_response()
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        movies_count: state.catalog_store.get_movies_count(),
        sessions_count: state.session_store.get_sessions_count(),
    };
    Json(stats)
}

#[derive(Deserialize, Debug)]
struct RecommendationsQuery {
    pub limit: Option<usize>,
}

#[derive(Serialize)]
struct RecommendationsResponse {
    success: bool,
    emotion: Emotion,
    recommendations: Vec<Movie>,
    recommendation_source: RecommendationSource,
}

async fn get_recommendations(
    State(analyzer): State<GuardedAnalyzer>,
    Path(emotion): Path<String>,
    query: Result<Query<RecommendationsQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => return error_response(rejection.status(), rejection.body_text()),
    };
    let emotion: Emotion = match emotion.parse() {
        Ok(emotion) => emotion,
        Err(err) => return error_response(StatusCode::BAD_REQUEST, err.to_string()),
    };
    let recommender = analyzer.recommender();
    let limit = query
        .limit
        .unwrap_or(recommender.settings().max_recommendations);

    match recommender.recommend(emotion, limit, &mut analyzer.rng()) {
        Ok(recommendations) => Json(RecommendationsResponse {
            success: true,
            emotion,
            recommendations: recommendations.movies,
            recommendation_source: recommendations.source,
        })
        .into_response(),
        Err(err) => {
            error!("Failed to get recommendations for {}: {:#}", emotion, err);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Catalog unavailable")
        }
    }
}

async fn get_movie(
    State(catalog_store): State<GuardedCatalogStore>,
    Path(id): Path<String>,
) -> Response {
    match catalog_store.get_movie(&id) {
        Ok(Some(movie)) => Json(movie).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, format!("Movie {} not found", id)),
        Err(err) => {
            error!("Failed to load movie {}: {:#}", id, err);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Catalog unavailable")
        }
    }
}

async fn get_session(
    State(session_store): State<GuardedSessionStore>,
    Path(session_id): Path<String>,
) -> Response {
    match session_store.get_session(&session_id) {
        Ok(Some(session)) => Json(session).into_response(),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            format!("Session {} not found", session_id),
        ),
        Err(err) => {
            error!("Failed to load session {}: {:#}", session_id, err);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Session store unavailable")
        }
    }
}

impl ServerState {
    fn new(
        config: ServerConfig,
        catalog_store: GuardedCatalogStore,
        session_store: GuardedSessionStore,
        analyzer: Analyzer,
    ) -> ServerState {
        ServerState {
            config,
            start_time: Instant::now(),
            catalog_store,
            session_store,
            analyzer: std::sync::Arc::new(analyzer),
            hash: env!("GIT_HASH").to_owned(),
        }
    }
}

pub fn make_app(
    config: ServerConfig,
    catalog_store: GuardedCatalogStore,
    session_store: GuardedSessionStore,
    analyzer: Analyzer,
) -> Router {
    let state = ServerState::new(config.clone(), catalog_store, session_store, analyzer);

    let analyze_routes: Router = Router::new()
        .route("/analyze_emotion", post(analyze_emotion))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .with_state(state.clone());

    let v1_routes: Router = Router::new()
        .route("/recommendations/{emotion}", get(get_recommendations))
        .route("/movie/{id}", get(get_movie))
        .route("/session/{session_id}", get(get_session))
        .with_state(state.clone());

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    home_router
        .merge(analyze_routes)
        .nest("/v1", v1_routes)
        .layer(middleware::from_fn_with_state(state, log_requests))
}

fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

pub async fn run_server(
    config: ServerConfig,
    catalog_store: GuardedCatalogStore,
    session_store: GuardedSessionStore,
    analyzer: Analyzer,
) -> Result<()> {
    let port = config.port;
    let metrics_port = config.metrics_port;
    let app = make_app(config, catalog_store, session_store, analyzer);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    let metrics_listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;

    let app_server = async {
        axum::serve(listener, app)
            .await
            .context("HTTP server failed")
    };
    let metrics_server = async {
        axum::serve(metrics_listener, make_metrics_app())
            .await
            .context("Metrics server failed")
    };
    tokio::try_join!(app_server, metrics_server)?;
    Ok(())
}
