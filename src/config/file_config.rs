use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_dir: Option<String>,
    pub port: Option<u16>,
    pub metrics_port: Option<u16>,
    pub logging_level: Option<String>,
    pub frontend_dir_path: Option<String>,

    // Feature configs
    pub fusion: Option<FusionConfig>,
    pub recommendations: Option<RecommendationsConfig>,
    pub classifiers: Option<ClassifiersConfig>,
    pub uploads: Option<UploadsConfig>,
    pub sessions: Option<SessionsConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct FusionConfig {
    pub face_weight: Option<f64>,
    pub audio_weight: Option<f64>,
    pub text_weight: Option<f64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct RecommendationsConfig {
    pub min_rating: Option<f64>,
    pub max_recommendations: Option<usize>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct ClassifiersConfig {
    pub face_url: Option<String>,
    pub audio_url: Option<String>,
    pub timeout_sec: Option<u64>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct UploadsConfig {
    pub max_upload_bytes: Option<usize>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct SessionsConfig {
    /// Set to 0 to keep sessions forever.
    pub retention_days: Option<u64>,
    pub prune_interval_hours: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config: FileConfig = toml::from_str(
            r#"
            db_dir = "/var/lib/moodreel"
            port = 8080
            logging_level = "headers"

            [fusion]
            face_weight = 0.5
            audio_weight = 0.3
            text_weight = 0.2

            [recommendations]
            min_rating = 7.0
            max_recommendations = 5

            [classifiers]
            face_url = "http://localhost:8500"
            timeout_sec = 3

            [uploads]
            max_upload_bytes = 1048576

            [sessions]
            retention_days = 7
            "#,
        )
        .unwrap();

        assert_eq!(config.db_dir.as_deref(), Some("/var/lib/moodreel"));
        assert_eq!(config.port, Some(8080));
        let fusion = config.fusion.unwrap();
        assert_eq!(fusion.face_weight, Some(0.5));
        assert_eq!(config.recommendations.unwrap().max_recommendations, Some(5));
        let classifiers = config.classifiers.unwrap();
        assert_eq!(classifiers.face_url.as_deref(), Some("http://localhost:8500"));
        assert!(classifiers.audio_url.is_none());
        assert_eq!(config.uploads.unwrap().max_upload_bytes, Some(1048576));
        assert_eq!(config.sessions.unwrap().prune_interval_hours, None);
    }

    #[test]
    fn test_empty_config_is_all_none() {
        let config: FileConfig = toml::from_str("").unwrap();
        assert!(config.db_dir.is_none());
        assert!(config.fusion.is_none());
    }
}
