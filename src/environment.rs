// src/environment.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::info;

use crate::retry::RetryPolicy;

/// Upload constraints applied to the CV field.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub max_file_size_bytes: u64,
    pub accepted_extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: 5 * 1024 * 1024,
            accepted_extensions: vec!["pdf".to_string(), "doc".to_string(), "docx".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentConfig {
    pub intake_url: String,
    pub request_timeout_seconds: u64,
    pub country_dataset_path: Option<PathBuf>,
    #[serde(default)]
    pub retry: RetryPolicy,
    #[serde(default)]
    pub uploads: UploadConfig,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    local: EnvironmentConfig,
    production: EnvironmentConfig,
}

impl EnvironmentConfig {
    /// Load configuration based on environment
    pub fn load() -> Result<Self> {
        let environment = Self::get_environment();
        info!("Loading configuration for environment: {}", environment);

        let config_path = PathBuf::from("config.yaml");
        if !config_path.exists() {
            anyhow::bail!(
                "config.yaml not found in current directory. The client cannot start without configuration."
            );
        }

        let config_content =
            std::fs::read_to_string(&config_path).context("Failed to read config.yaml")?;

        Self::from_yaml(&config_content, &environment)
    }

    fn get_environment() -> String {
        std::env::var("APLICA_ENV")
            .or_else(|_| std::env::var("ENVIRONMENT"))
            .or_else(|_| std::env::var("ENV"))
            .unwrap_or_else(|_| "local".to_string())
    }

    /// Select the block for `environment` out of the parsed config file.
    pub fn from_yaml(content: &str, environment: &str) -> Result<Self> {
        let config_file: ConfigFile =
            serde_yaml::from_str(content).context("Failed to parse config.yaml")?;

        let mut config = match environment {
            "production" => config_file.production,
            _ => config_file.local,
        };

        config.country_dataset_path = config
            .country_dataset_path
            .map(|path| Self::resolve_path(&path))
            .transpose()?;

        Ok(config)
    }

    fn resolve_path(path: &PathBuf) -> Result<PathBuf> {
        if path.is_absolute() {
            Ok(path.clone())
        } else {
            let current_dir = std::env::current_dir().context("Failed to get current directory")?;
            Ok(current_dir.join(path))
        }
    }
}
