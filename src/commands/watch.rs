use std::sync::Arc;

use clap::Args;

use builds::config::{BuildsConfig, PipelineConfiguration, DEFAULT_TARGET};
use builds::error::{Error, Result};
use builds::runner::PipelineRunner;
use builds::toolchain::ToolchainRegistry;
use builds::watch::Watcher;

#[derive(Args)]
pub struct WatchArgs {
    /// Project to watch (defaults to the active project)
    pub project: Option<String>,

    /// Target whose arguments are used for incremental compiles
    #[arg(long, default_value = DEFAULT_TARGET)]
    pub target: String,
}

pub fn run(args: WatchArgs) -> Result<i32> {
    let config = BuildsConfig::load()?;
    let (project_id, project) = config.resolve_project(args.project.as_deref())?;

    let pipeline_name = project
        .pipeline
        .as_deref()
        .ok_or_else(|| Error::Config(format!("No pipeline set for project {}", project_id)))?;
    let toolchain = ToolchainRegistry::builtin().get(pipeline_name, project_id)?;

    let pipeline_config = PipelineConfiguration::for_target(project_id, project, &args.target)?;
    let runner = Arc::new(PipelineRunner::new(project_id, toolchain, pipeline_config));

    Watcher::new(&project.files, runner).watch()?;
    Ok(0)
}
