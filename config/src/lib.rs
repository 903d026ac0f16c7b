//! # Configuration System
//!
//! Centralized configuration management for the beats pipeline.
//!
//! This crate provides:
//! - Configuration structures for every pipeline component
//! - Environment variable overrides (`BTV_*`)
//! - Configuration file loading (TOML/YAML)
//! - Configuration precedence (CLI > env > file > defaults)
//! - Configuration validation
//!
//! # Best Practices
//!
//! - Uses `validator` crate for input validation
//! - Follows 12-factor app configuration principles
//! - Provides clear error messages for invalid configuration

pub mod config;
pub mod file_loader;
pub mod loader;
pub mod precedence;

pub use config::{
    BeatsConfig, ClusteringConfig, Config, EmbeddingConfig, ObservabilityConfig, PipelineConfig,
    ReviewConfig
};
pub use file_loader::{
    ConfigFileError, DEFAULT_CONFIG_FILE, load_from_file, load_from_toml, load_from_yaml
};
pub use loader::{EnvError, apply_env_overrides, load_from_env};
pub use precedence::{CliOverrides, ConfigError, resolve_config};
pub use validator::Validate;
