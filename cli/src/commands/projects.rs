use std::path::PathBuf;

use anyhow::Result;
use bt_core::Project;
use clap::Args;
use enrichment::discover_projects;
use serde::Serialize;

use crate::app::App;
use crate::output;

#[derive(Args)]
pub struct ProjectsArgs {
    /// Directory to walk (defaults to the configured root)
    pub path: Option<PathBuf>
}

#[derive(Serialize)]
struct ProjectsOutput {
    projects: Vec<Project>,
    count: usize
}

pub fn run(args: ProjectsArgs, app: &App) -> Result<()> {
    let root = args.path.unwrap_or_else(|| app.config.beats.root.clone());
    let projects = discover_projects(&root, &app.config.beats)?;
    output::print_json(&ProjectsOutput {
        count: projects.len(),
        projects
    })
}
