//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own catalog and sessions
//! database, bound to a random port.

use super::constants::*;
use super::fixtures::create_test_databases;
use moodreel_server::analysis::{Analyzer, ClassifierSet};
use moodreel_server::catalog_loader::LoadReport;
use moodreel_server::classifiers::{
    EmotionClassifier, LexiconTextClassifier, RemoteClassifier, UnavailableClassifier,
};
use moodreel_server::emotion::Modality;
use moodreel_server::fusion::{FusionEngine, ModalityWeights};
use moodreel_server::recommendation::{RecommendationEngine, RecommendationSettings};
use moodreel_server::server::state::{GuardedCatalogStore, GuardedSessionStore};
use moodreel_server::server::{server::make_app, RequestsLoggingLevel, ServerConfig};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance with isolated databases
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// Session store for direct database access in tests
    pub session_store: GuardedSessionStore,

    /// What the CSV loader reported while building the fixture catalog
    pub load_report: LoadReport,

    // Private fields - keep resources alive until drop
    _temp_db_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Spawns a server with only the text classifier available.
    pub async fn spawn() -> Self {
        Self::spawn_with_face_classifier(None).await
    }

    /// Spawns a server whose face classifier talks to `face_url`.
    ///
    /// # Panics
    ///
    /// Panics if fixture creation, port binding or startup fails.
    pub async fn spawn_with_face_classifier(face_url: Option<&str>) -> Self {
        let databases = create_test_databases().expect("Failed to create test databases");

        let catalog_store: GuardedCatalogStore = Arc::new(databases.catalog_store);
        let session_store: GuardedSessionStore = Arc::new(databases.session_store);

        let face: Arc<dyn EmotionClassifier> = match face_url {
            Some(url) => Arc::new(
                RemoteClassifier::new(url, Modality::Face, 5)
                    .expect("Failed to create face classifier"),
            ),
            None => Arc::new(UnavailableClassifier::new(Modality::Face)),
        };
        let analyzer = Analyzer::new(
            ClassifierSet {
                face,
                audio: Arc::new(UnavailableClassifier::new(Modality::Audio)),
                text: Arc::new(LexiconTextClassifier::new()),
            },
            FusionEngine::new(ModalityWeights::default()),
            RecommendationEngine::new(catalog_store.clone(), RecommendationSettings::default()),
            session_store.clone(),
        );

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            metrics_port: 0,
            requests_logging_level: RequestsLoggingLevel::None,
            frontend_dir_path: None,
            max_upload_bytes: TEST_MAX_UPLOAD_BYTES,
        };
        let app = make_app(config, catalog_store, session_store.clone(), analyzer);

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            session_store,
            load_report: databases.load_report,
            _temp_db_dir: databases.dir,
            _shutdown_tx: Some(shutdown_tx),
        };

        server.wait_for_ready().await;

        server
    }

    /// Waits for the server to become ready by polling `GET /`
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);

        loop {
            if start.elapsed() > timeout {
                panic!(
                    "Server did not become ready within {}ms",
                    SERVER_READY_TIMEOUT_MS
                );
            }

            match client.get(format!("{}/", self.base_url)).send().await {
                Ok(response) if response.status().is_success() => return,
                _ => {
                    tokio::time::sleep(Duration::from_millis(SERVER_READY_POLL_INTERVAL_MS)).await;
                }
            }
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self._shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
