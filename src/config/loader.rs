use std::{env, time::Duration};

use url::Url;

use super::env::{
    AppConfig, ClassifierConfig, ConfigError, DirectoryConfig, LoggingConfig, PageConfig,
    PipelineConfig,
};

const DEFAULT_CLASSIFIER_URL: &str = "http://localhost:3002/api/analyze-image";

pub fn load_config() -> Result<AppConfig, ConfigError> {
    AppConfig::from_env()
}

impl AppConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let endpoint =
            env::var("CLASSIFIER_URL").unwrap_or_else(|_| DEFAULT_CLASSIFIER_URL.to_string());
        if Url::parse(&endpoint).is_err() {
            return Err(ConfigError::InvalidUrl {
                key: "CLASSIFIER_URL",
                value: endpoint,
            });
        }

        let classifier = ClassifierConfig {
            endpoint,
            timeout: Duration::from_millis(parse_u64("CLASSIFY_TIMEOUT_MS").unwrap_or(30_000)),
            inline_images: parse_bool("INLINE_IMAGES").unwrap_or(false),
            default_mime_type: env::var("DEFAULT_MIME_TYPE")
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| "image/jpeg".to_string()),
        };

        let defaults = PipelineConfig::default();
        let pipeline = PipelineConfig {
            min_image_size: parse_u64("MIN_IMAGE_SIZE")
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(defaults.min_image_size),
            baseline_delay: parse_u64("BASELINE_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.baseline_delay),
            cooldown_delay: parse_u64("COOLDOWN_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.cooldown_delay),
        };
        validate_backoff(&pipeline)?;

        let page = PageConfig {
            poll_interval: Duration::from_millis(
                parse_u64("PAGE_POLL_INTERVAL_MS").unwrap_or(5_000),
            ),
        };

        let directories = DirectoryConfig {
            logs_dir: env::var("LOGS_DIR").unwrap_or_else(|_| "logs".to_string()),
            data_dir: env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string()),
            db_filename: env::var("DB_FILENAME").unwrap_or_else(|_| "safesurf.db".to_string()),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        Ok(Self {
            classifier,
            pipeline,
            page,
            directories,
            logging,
        })
    }
}

fn validate_backoff(pipeline: &PipelineConfig) -> Result<(), ConfigError> {
    if pipeline.baseline_delay > pipeline.cooldown_delay {
        return Err(ConfigError::InvalidBackoff {
            baseline_ms: pipeline.baseline_delay.as_millis() as u64,
            cooldown_ms: pipeline.cooldown_delay.as_millis() as u64,
        });
    }
    Ok(())
}

fn parse_u64(key: &str) -> Option<u64> {
    env::var(key)
        .ok()
        .and_then(|value| value.trim().parse::<u64>().ok())
}

fn parse_bool(key: &str) -> Option<bool> {
    env::var(key).ok().map(|v| {
        let v = v.trim();
        v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes")
    })
}
