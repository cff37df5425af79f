pub mod env;
mod loader;

pub use env::{AppConfig, ClassifierConfig, DirectoryConfig, LoggingConfig, PipelineConfig};
pub use loader::load_config;
