//! Effective configuration and the components built from it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use bt_core::{Cache, EnrichedBeat};
use clustering::{ClusterEngine, ClusterOptions, EmbeddingCache, OllamaClient};
use config::{CliOverrides, Config, DEFAULT_CONFIG_FILE, resolve_config};
use enrichment::{
    BeatsPaths, Pipeline, RebuildOptions, StalePolicy, discover_projects, find_beats_dir
};
use errors::BeatLogError;
use tracing::debug;

use crate::commands::GlobalArgs;
use crate::output::RebuildProgress;

pub struct App {
    pub config: Config,
    beats_dir: Option<PathBuf>,
    quiet: bool
}

impl App {
    /// Resolve configuration and locate the beats directory.
    ///
    /// `--dir` wins, then `--project`, then an upward search from the root.
    /// Without `--config`, a `btv.toml` in the root is applied before the
    /// search, so its `beats.dir_name` drives discovery. A `btv.toml` inside
    /// the beats directory then replaces it, keeping the root and directory
    /// name that located it. A missing beats directory is not an error here;
    /// commands that need one fail through [`App::pipeline`].
    pub fn load(global: &GlobalArgs) -> Result<Self> {
        let overrides = CliOverrides {
            root: global.root.clone(),
            ollama_url: global.ollama_url.clone(),
            embedding_model: global.embedding_model.clone(),
            preserve_view_stats: global.preserve_view_stats.then_some(true),
            logging_level: global.log_level.clone()
        };

        let mut config = resolve_config(global.config.as_deref(), &overrides)
            .context("Failed to resolve configuration")?;
        if global.config.is_none() {
            let root_file = config.beats.root.join(DEFAULT_CONFIG_FILE);
            if root_file.is_file() {
                config = load_local(&root_file, &overrides)?;
            }
        }

        let beats_dir = locate_beats_dir(global, &config)?;

        if global.config.is_none()
            && let Some(dir) = &beats_dir
        {
            let dir_file = dir.join(DEFAULT_CONFIG_FILE);
            if dir_file.is_file() {
                let mut local = load_local(&dir_file, &overrides)?;
                local.beats.root = config.beats.root;
                local.beats.dir_name = config.beats.dir_name;
                config = local;
            }
        }

        Ok(Self {
            config,
            beats_dir,
            quiet: global.quiet
        })
    }

    pub fn beats_paths(&self) -> Result<BeatsPaths, BeatLogError> {
        let dir = match &self.beats_dir {
            Some(dir) => dir.clone(),
            None => find_beats_dir(&self.config.beats.root, &self.config.beats.dir_name)?
        };
        Ok(BeatsPaths::from_config(dir, &self.config.beats))
    }

    pub fn pipeline(&self) -> Result<Pipeline, BeatLogError> {
        Ok(Pipeline::new(
            self.beats_paths()?,
            RebuildOptions::from(&self.config)
        ))
    }

    pub fn progress(&self) -> RebuildProgress {
        RebuildProgress::new(self.quiet)
    }

    /// Enriched beats and the valid cache behind them, rebuilding first if
    /// the log has changed.
    pub fn enriched(&self) -> Result<(Pipeline, Vec<EnrichedBeat>, Cache)> {
        let pipeline = self.pipeline()?;
        let mut progress = self.progress();
        let (beats, cache) =
            pipeline.load_enriched_beats(&mut |step, current, total| {
                progress.update(step, current, total);
            })?;
        progress.finish();
        Ok((pipeline, beats, cache))
    }

    pub fn engine(&self) -> ClusterEngine<OllamaClient> {
        ClusterEngine::new(
            Arc::new(OllamaClient::from_config(&self.config.embedding)),
            Arc::new(EmbeddingCache::new()),
            ClusterOptions::from(&self.config)
        )
    }

    pub fn stale_policy(&self) -> StalePolicy {
        StalePolicy::from(&self.config.review)
    }
}

fn load_local(path: &Path, overrides: &CliOverrides) -> Result<Config> {
    debug!(path = %path.display(), "Applying local configuration");
    resolve_config(Some(path), overrides)
        .with_context(|| format!("Failed to load {}", path.display()))
}

fn locate_beats_dir(global: &GlobalArgs, config: &Config) -> Result<Option<PathBuf>> {
    if let Some(dir) = &global.dir {
        return Ok(Some(dir.clone()));
    }

    if let Some(name) = &global.project {
        let projects = discover_projects(&config.beats.root, &config.beats)?;
        let project = projects
            .into_iter()
            .find(|p| &p.name == name)
            .with_context(|| {
                format!(
                    "No project named {name} under {}",
                    config.beats.root.display()
                )
            })?;
        return Ok(Some(project.path));
    }

    Ok(find_beats_dir(&config.beats.root, &config.beats.dir_name).ok())
}
