mod file_config;

pub use file_config::{
    ClassifiersConfig, FileConfig, FusionConfig, RecommendationsConfig, SessionsConfig,
    UploadsConfig,
};

use crate::fusion::ModalityWeights;
use crate::recommendation::RecommendationSettings;
use crate::server::RequestsLoggingLevel;
use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use std::path::PathBuf;

pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub db_dir: Option<PathBuf>,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,
    pub face_classifier_url: Option<String>,
    pub audio_classifier_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Core settings
    pub db_dir: PathBuf,
    pub port: u16,
    pub metrics_port: u16,
    pub logging_level: RequestsLoggingLevel,
    pub frontend_dir_path: Option<String>,

    // Feature configs (with defaults)
    pub fusion: ModalityWeights,
    pub recommendations: RecommendationSettings,
    pub classifiers: ClassifierSettings,
    pub uploads: UploadSettings,
    pub sessions: SessionSettings,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierSettings {
    pub face_url: Option<String>,
    pub audio_url: Option<String>,
    pub timeout_sec: u64,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            face_url: None,
            audio_url: None,
            timeout_sec: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadSettings {
    pub max_upload_bytes: usize,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    /// 0 disables pruning.
    pub retention_days: u64,
    pub prune_interval_hours: u64,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            retention_days: 30,
            prune_interval_hours: 24,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_dir = file
            .db_dir
            .map(PathBuf::from)
            .or_else(|| cli.db_dir.clone())
            .ok_or_else(|| {
                anyhow::anyhow!("db_dir must be specified via --db-dir or in config file")
            })?;

        if !db_dir.exists() {
            bail!("Database directory does not exist: {:?}", db_dir);
        }
        if !db_dir.is_dir() {
            bail!("db_dir is not a directory: {:?}", db_dir);
        }

        let port = file.port.unwrap_or(cli.port);
        let metrics_port = file.metrics_port.unwrap_or(cli.metrics_port);

        let logging_level = match file.logging_level {
            Some(level) => parse_logging_level(&level)
                .with_context(|| format!("Invalid logging_level in config file: {}", level))?,
            None => cli.logging_level.clone(),
        };

        let frontend_dir_path = file
            .frontend_dir_path
            .or_else(|| cli.frontend_dir_path.clone());

        let fusion_file = file.fusion.unwrap_or_default();
        let default_weights = ModalityWeights::default();
        let fusion = ModalityWeights {
            face: fusion_file.face_weight.unwrap_or(default_weights.face),
            audio: fusion_file.audio_weight.unwrap_or(default_weights.audio),
            text: fusion_file.text_weight.unwrap_or(default_weights.text),
        };
        fusion.validate().context("Invalid [fusion] configuration")?;

        let rec_file = file.recommendations.unwrap_or_default();
        let default_recommendations = RecommendationSettings::default();
        let recommendations = RecommendationSettings {
            min_rating: rec_file
                .min_rating
                .unwrap_or(default_recommendations.min_rating),
            max_recommendations: rec_file
                .max_recommendations
                .unwrap_or(default_recommendations.max_recommendations),
        };
        if recommendations.max_recommendations == 0 {
            bail!("max_recommendations must be at least 1");
        }
        if !(0.0..=10.0).contains(&recommendations.min_rating) {
            bail!(
                "min_rating must be between 0 and 10, got {}",
                recommendations.min_rating
            );
        }

        let classifiers_file = file.classifiers.unwrap_or_default();
        let classifiers = ClassifierSettings {
            face_url: classifiers_file
                .face_url
                .or_else(|| cli.face_classifier_url.clone()),
            audio_url: classifiers_file
                .audio_url
                .or_else(|| cli.audio_classifier_url.clone()),
            timeout_sec: classifiers_file
                .timeout_sec
                .unwrap_or(ClassifierSettings::default().timeout_sec),
        };

        let uploads = UploadSettings {
            max_upload_bytes: file
                .uploads
                .and_then(|u| u.max_upload_bytes)
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
        };

        let sessions_file = file.sessions.unwrap_or_default();
        let default_sessions = SessionSettings::default();
        let sessions = SessionSettings {
            retention_days: sessions_file
                .retention_days
                .unwrap_or(default_sessions.retention_days),
            prune_interval_hours: sessions_file
                .prune_interval_hours
                .unwrap_or(default_sessions.prune_interval_hours),
        };
        if sessions.retention_days > 0 && sessions.prune_interval_hours == 0 {
            bail!("prune_interval_hours must be at least 1 when retention is enabled");
        }

        Ok(Self {
            db_dir,
            port,
            metrics_port,
            logging_level,
            frontend_dir_path,
            fusion,
            recommendations,
            classifiers,
            uploads,
            sessions,
        })
    }

    pub fn catalog_db_path(&self) -> PathBuf {
        self.db_dir.join("catalog.db")
    }

    pub fn sessions_db_path(&self) -> PathBuf {
        self.db_dir.join("sessions.db")
    }
}

/// Parses a logging level string into RequestsLoggingLevel.
/// Uses clap's ValueEnum trait for parsing.
fn parse_logging_level(s: &str) -> Option<RequestsLoggingLevel> {
    RequestsLoggingLevel::from_str(s, true).ok()
}
