use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*, reload};

mod app;
mod commands;
mod error;
mod output;

use app::App;
use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let log_filter = init_tracing(cli.global.log_level.as_deref());

    match run(cli, &log_filter).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(error = ?e, "Command failed");
            error::report(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, log_filter: &LogFilter) -> Result<()> {
    let app = App::load(&cli.global)?;
    log_filter.apply(&app.config.observability.logging_level);

    match cli.command {
        Commands::Rebuild(args) => commands::rebuild::run(args, &app),
        Commands::Projects(args) => commands::projects::run(args, &app),
        Commands::List(args) => commands::beats::list(args, &app),
        Commands::Search(args) => commands::beats::search(args, &app),
        Commands::Show(args) => commands::beats::show(args, &app),
        Commands::View(args) => commands::beats::view(args, &app),
        Commands::TaxonomyStats => commands::taxonomy::stats(&app),
        Commands::Ripeness(args) => commands::ripeness::breakdown(args, &app),
        Commands::Ripe(args) => commands::ripeness::ripe(args, &app),
        Commands::Stale(args) => commands::ripeness::stale(args, &app),
        Commands::Entities(args) => commands::entities::top(args, &app),
        Commands::EntityBeats(args) => commands::entities::beats(args, &app),
        Commands::Timeline(args) => commands::timeline::timeline(args, &app),
        Commands::Gaps(args) => commands::timeline::gaps(args, &app),
        Commands::Cluster(args) => commands::cluster::generate(args, &app).await,
        Commands::Clusters => commands::cluster::list(&app),
        Commands::Similar(args) => commands::cluster::similar(args, &app).await,
        Commands::Chains => commands::chain::list(&app),
        Commands::ChainCreate(args) => commands::chain::create(args, &app),
        Commands::ChainAdd(args) => commands::chain::add(args, &app),
        Commands::ChainRemove(args) => commands::chain::remove(args, &app),
        Commands::ChainRename(args) => commands::chain::rename(args, &app),
        Commands::ChainDelete(args) => commands::chain::delete(args, &app)
    }
}

type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// Level control for a subscriber installed before configuration resolves.
struct LogFilter {
    handle: FilterHandle,
    from_env: bool
}

impl LogFilter {
    /// Switch to the configured level unless `RUST_LOG` chose one.
    fn apply(&self, level: &str) {
        if self.from_env {
            return;
        }
        if let Err(e) = self.handle.reload(EnvFilter::new(level)) {
            tracing::debug!(error = %e, "Keeping startup log level");
        }
    }
}

/// Logs go to stderr; stdout carries only JSON. Until configuration is
/// resolved the level comes from `RUST_LOG`, then `--log-level`, then
/// `BTV_LOG_LEVEL`, then `info`.
fn init_tracing(cli_level: Option<&str>) -> LogFilter {
    let (filter, from_env) = match EnvFilter::try_from_default_env() {
        Ok(filter) => (filter, true),
        Err(_) => {
            let level = cli_level
                .map(str::to_string)
                .or_else(|| std::env::var("BTV_LOG_LEVEL").ok())
                .unwrap_or_else(|| "info".to_string());
            (EnvFilter::new(level), false)
        }
    };
    let (filter, handle) = reload::Layer::new(filter);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
    LogFilter { handle, from_env }
}
