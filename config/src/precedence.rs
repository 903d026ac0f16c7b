//! # Configuration Precedence
//!
//! Merges configuration from multiple sources with precedence rules.
//!
//! # Precedence Order
//! 1. CLI arguments (highest priority)
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values (lowest priority)

use std::path::{Path, PathBuf};

use validator::Validate;

use crate::config::Config;
use crate::file_loader::{ConfigFileError, load_from_file};
use crate::loader::{EnvError, apply_env_overrides};

/// Errors produced while assembling the effective configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error(transparent)]
    File(#[from] ConfigFileError),

    #[error(transparent)]
    Env(#[from] EnvError),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors)
}

/// Values given explicitly on the command line. `None` leaves the lower
/// layers untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    pub root: Option<PathBuf>,
    pub ollama_url: Option<String>,
    pub embedding_model: Option<String>,
    pub preserve_view_stats: Option<bool>,
    pub logging_level: Option<String>
}

impl CliOverrides {
    fn apply(&self, config: &mut Config) -> Vec<String> {
        let mut changes = Vec::new();
        if let Some(root) = &self.root {
            config.beats.root.clone_from(root);
            changes.push("beats.root".to_string());
        }
        if let Some(url) = &self.ollama_url {
            config.embedding.base_url.clone_from(url);
            changes.push("embedding.base_url".to_string());
        }
        if let Some(model) = &self.embedding_model {
            config.embedding.model.clone_from(model);
            changes.push("embedding.model".to_string());
        }
        if let Some(preserve) = self.preserve_view_stats {
            config.pipeline.preserve_view_stats = preserve;
            changes.push("pipeline.preserve_view_stats".to_string());
        }
        if let Some(level) = &self.logging_level {
            config.observability.logging_level = level.to_lowercase();
            changes.push("observability.logging_level".to_string());
        }
        changes
    }
}

/// Build the effective configuration: defaults, then `file` when given,
/// then the environment, then `cli`. The result is validated.
///
/// ## Usage
/// ```rust,no_run
/// use config::{CliOverrides, resolve_config};
/// use std::path::Path;
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = resolve_config(Some(Path::new(".beats/btv.toml")), &CliOverrides::default())?;
///     println!("Model: {}", config.embedding.model);
///     Ok(())
/// }
/// ```
pub fn resolve_config(file: Option<&Path>, cli: &CliOverrides) -> Result<Config, ConfigError> {
    let mut config = match file {
        Some(path) => {
            let loaded = load_from_file(path)?;
            tracing::debug!(path = %path.display(), "Loaded configuration file");
            loaded
        }
        None => Config::default()
    };

    let env_changes = apply_env_overrides(&mut config)?;
    if !env_changes.is_empty() {
        tracing::debug!("Configuration from env: {:?}", env_changes);
    }

    let cli_changes = cli.apply(&mut config);
    if !cli_changes.is_empty() {
        tracing::debug!("Configuration from cli: {:?}", cli_changes);
    }

    config.validate()?;
    Ok(config)
}
