use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub classifier: ClassifierConfig,
    pub pipeline: PipelineConfig,
    pub page: PageConfig,
    pub directories: DirectoryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub endpoint: String,
    pub timeout: Duration,
    /// Download images locally and send the bytes instead of the source URL.
    pub inline_images: bool,
    pub default_mime_type: String,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub min_image_size: u32,
    pub baseline_delay: Duration,
    pub cooldown_delay: Duration,
}

#[derive(Debug, Clone)]
pub struct PageConfig {
    pub poll_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub logs_dir: String,
    pub data_dir: String,
    pub db_filename: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_image_size: 100,
            baseline_delay: Duration::from_millis(2_000),
            cooldown_delay: Duration::from_millis(15_000),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL in {key}: {value}")]
    InvalidUrl { key: &'static str, value: String },
    #[error("baseline delay ({baseline_ms}ms) must not exceed cooldown delay ({cooldown_ms}ms)")]
    InvalidBackoff { baseline_ms: u64, cooldown_ms: u64 },
}
