use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use std::{fmt::Debug, path::PathBuf};
use tracing::{error, info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use moodreel_server::analysis::{Analyzer, ClassifierSet};
use moodreel_server::catalog_store::{CatalogStore, SqliteCatalogStore};
use moodreel_server::classifiers::{
    EmotionClassifier, LexiconTextClassifier, RemoteClassifier, UnavailableClassifier,
};
use moodreel_server::config::{AppConfig, CliConfig, ClassifierSettings, FileConfig};
use moodreel_server::emotion::Modality;
use moodreel_server::fusion::FusionEngine;
use moodreel_server::recommendation::RecommendationEngine;
use moodreel_server::server::{self, run_server, RequestsLoggingLevel, ServerConfig};
use moodreel_server::session_store::{SessionStore, SqliteSessionStore};

const CATALOG_READ_POOL_SIZE: usize = 4;

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Directory holding catalog.db and sessions.db.
    #[clap(long, value_parser = parse_path)]
    pub db_dir: Option<PathBuf>,

    /// Optional TOML config file, its values override the CLI ones.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 5000)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Base URL of the facial expression classifier service.
    #[clap(long)]
    pub face_classifier_url: Option<String>,

    /// Base URL of the voice emotion classifier service.
    #[clap(long)]
    pub audio_classifier_url: Option<String>,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            db_dir: self.db_dir.clone(),
            port: self.port,
            metrics_port: self.metrics_port,
            logging_level: self.logging_level.clone(),
            frontend_dir_path: self.frontend_dir_path.clone(),
            face_classifier_url: self.face_classifier_url.clone(),
            audio_classifier_url: self.audio_classifier_url.clone(),
        }
    }
}

fn make_remote_classifier(
    url: Option<&String>,
    modality: Modality,
    settings: &ClassifierSettings,
) -> Result<Arc<dyn EmotionClassifier>> {
    Ok(match url {
        Some(url) => {
            info!("{} classifier service configured at {}", modality, url);
            Arc::new(RemoteClassifier::new(url, modality, settings.timeout_sec)?)
        }
        None => {
            warn!(
                "No {} classifier configured, {} inputs will be ignored",
                modality, modality
            );
            Arc::new(UnavailableClassifier::new(modality))
        }
    })
}

fn spawn_session_pruning(session_store: Arc<dyn SessionStore>, config: &AppConfig) {
    let retention_days = config.sessions.retention_days;
    let interval_hours = config.sessions.prune_interval_hours;
    if retention_days == 0 {
        info!("Session pruning disabled");
        return;
    }

    info!(
        "Session pruning enabled: retaining {} days, pruning every {} hours",
        retention_days, interval_hours
    );

    tokio::spawn(async move {
        let interval = Duration::from_secs(interval_hours * 60 * 60);
        let mut ticker = tokio::time::interval(interval);

        // Skip the first immediate tick, wait for the first interval
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let cutoff =
                chrono::Utc::now().timestamp() - (retention_days as i64 * 24 * 60 * 60);

            match session_store.prune_sessions_older_than(cutoff) {
                Ok(count) => {
                    if count > 0 {
                        info!("Pruned {} old analysis sessions", count);
                    }
                }
                Err(e) => {
                    error!("Failed to prune analysis sessions: {:#}", e);
                }
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config file {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;

    info!(
        "Opening SQLite catalog database at {:?}...",
        config.catalog_db_path()
    );
    let catalog_store: Arc<dyn CatalogStore> = Arc::new(SqliteCatalogStore::new(
        config.catalog_db_path(),
        CATALOG_READ_POOL_SIZE,
    )?);
    let movies_count = catalog_store.get_movies_count();
    if movies_count == 0 {
        warn!("Catalog is empty, load one with catalog-import");
    }

    info!("Initializing metrics...");
    server::metrics::init_metrics();
    server::metrics::init_catalog_metrics(movies_count);

    info!(
        "Opening SQLite sessions database at {:?}...",
        config.sessions_db_path()
    );
    let session_store: Arc<dyn SessionStore> =
        Arc::new(SqliteSessionStore::new(config.sessions_db_path())?);
    spawn_session_pruning(session_store.clone(), &config);

    let classifiers = ClassifierSet {
        face: make_remote_classifier(
            config.classifiers.face_url.as_ref(),
            Modality::Face,
            &config.classifiers,
        )?,
        audio: make_remote_classifier(
            config.classifiers.audio_url.as_ref(),
            Modality::Audio,
            &config.classifiers,
        )?,
        text: Arc::new(LexiconTextClassifier::new()),
    };

    info!(
        "Fusion weights: face {:.2}, audio {:.2}, text {:.2}",
        config.fusion.face, config.fusion.audio, config.fusion.text
    );
    let analyzer = Analyzer::new(
        classifiers,
        FusionEngine::new(config.fusion),
        RecommendationEngine::new(catalog_store.clone(), config.recommendations.clone()),
        session_store.clone(),
    );

    let server_config = ServerConfig {
        requests_logging_level: config.logging_level.clone(),
        port: config.port,
        metrics_port: config.metrics_port,
        frontend_dir_path: config.frontend_dir_path.clone(),
        max_upload_bytes: config.uploads.max_upload_bytes,
    };

    info!("Ready to serve at port {}!", config.port);
    info!("Metrics available at port {}!", config.metrics_port);
    run_server(server_config, catalog_store, session_store, analyzer).await
}
