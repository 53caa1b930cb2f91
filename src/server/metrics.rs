use crate::emotion::{Emotion, Modality};
use axum::{http::StatusCode, response::IntoResponse};
use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;

/// Metric name prefix for all MoodReel metrics
const PREFIX: &str = "moodreel";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // HTTP Request Metrics
    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "endpoint", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "endpoint"]
    ).expect("Failed to create http_request_duration_seconds metric");

    // Analysis Metrics
    pub static ref ANALYSES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_analyses_total"), "Completed analyses by fused emotion"),
        &["emotion"]
    ).expect("Failed to create analyses_total metric");

    pub static ref RECOMMENDATION_FALLBACKS_TOTAL: Counter = Counter::new(
        format!("{PREFIX}_recommendation_fallbacks_total"),
        "Analyses answered with random picks instead of emotion matches"
    ).expect("Failed to create recommendation_fallbacks_total metric");

    pub static ref CLASSIFIER_FAILURES_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_classifier_failures_total"), "Classifier calls that fell back to the default signal"),
        &["modality"]
    ).expect("Failed to create classifier_failures_total metric");

    // Catalog Metrics
    pub static ref CATALOG_MOVIES_TOTAL: Gauge = Gauge::new(
        format!("{PREFIX}_catalog_movies_total"),
        "Total movies in catalog"
    ).expect("Failed to create catalog_movies_total metric");
}

/// Initialize all metrics and register them with the Prometheus registry
pub fn init_metrics() {
    // Ignore errors if already registered (for tests)
    let _ = REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()));
    let _ = REGISTRY.register(Box::new(ANALYSES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(RECOMMENDATION_FALLBACKS_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(CLASSIFIER_FAILURES_TOTAL.clone()));
    let _ = REGISTRY.register(Box::new(CATALOG_MOVIES_TOTAL.clone()));

    tracing::info!("Metrics system initialized successfully");
}

pub fn init_catalog_metrics(num_movies: usize) {
    CATALOG_MOVIES_TOTAL.set(num_movies as f64);
    tracing::info!("Catalog metrics initialized: {} movies", num_movies);
}

/// Collapses concrete request paths into route names so ids don't explode
/// label cardinality.
pub fn categorize_endpoint(path: &str) -> &'static str {
    if path == "/" {
        "home"
    } else if path.starts_with("/analyze_emotion") {
        "analyze_emotion"
    } else if path.starts_with("/v1/recommendations/") {
        "recommendations"
    } else if path.starts_with("/v1/movie/") {
        "movie"
    } else if path.starts_with("/v1/session/") {
        "session"
    } else {
        "other"
    }
}

/// Record an HTTP request
pub fn record_http_request(method: &str, path: &str, status: u16, duration: Duration) {
    let endpoint = categorize_endpoint(path);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, endpoint, &status.to_string()])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, endpoint])
        .observe(duration.as_secs_f64());
}

pub fn record_analysis(final_emotion: Emotion) {
    ANALYSES_TOTAL
        .with_label_values(&[final_emotion.as_str()])
        .inc();
}

pub fn record_recommendation_fallback() {
    RECOMMENDATION_FALLBACKS_TOTAL.inc();
}

pub fn record_classifier_failure(modality: Modality) {
    CLASSIFIER_FAILURES_TOTAL
        .with_label_values(&[modality.as_str()])
        .inc();
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = vec![];
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => {
            let response = String::from_utf8(buffer).unwrap_or_else(|_| String::from(""));
            (StatusCode::OK, response)
        }
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_metric(name: &str) -> bool {
        REGISTRY.gather().iter().any(|m| m.get_name() == name)
    }

    #[test]
    fn test_metrics_initialization() {
        init_metrics();
        assert!(!REGISTRY.gather().is_empty(), "Metrics should be registered");
    }

    #[test]
    fn test_record_http_request() {
        init_metrics();
        record_http_request("GET", "/v1/movie/tt123", 200, Duration::from_millis(50));
        assert!(has_metric("moodreel_http_requests_total"));
    }

    #[test]
    fn test_record_analysis_and_fallback() {
        init_metrics();
        record_analysis(Emotion::Happy);
        record_recommendation_fallback();
        record_classifier_failure(Modality::Face);

        assert!(has_metric("moodreel_analyses_total"));
        assert!(has_metric("moodreel_recommendation_fallbacks_total"));
        assert!(has_metric("moodreel_classifier_failures_total"));
        assert!(ANALYSES_TOTAL.with_label_values(&["happy"]).get() >= 1.0);
    }

    #[test]
    fn test_categorize_endpoint() {
        assert_eq!(categorize_endpoint("/"), "home");
        assert_eq!(categorize_endpoint("/analyze_emotion"), "analyze_emotion");
        assert_eq!(categorize_endpoint("/v1/recommendations/sad"), "recommendations");
        assert_eq!(categorize_endpoint("/v1/movie/tt1"), "movie");
        assert_eq!(categorize_endpoint("/v1/session/abc"), "session");
        assert_eq!(categorize_endpoint("/favicon.ico"), "other");
    }
}
