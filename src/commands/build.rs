use std::sync::Arc;

use clap::Args;

use builds::command::run_interactive;
use builds::config::{BuildsConfig, PipelineConfiguration, DEFAULT_TARGET};
use builds::error::{Error, Result};
use builds::runner::PipelineRunner;
use builds::toolchain::ToolchainRegistry;

#[derive(Args)]
pub struct BuildArgs {
    /// Project to build (defaults to the active project)
    pub project: Option<String>,

    /// Select target to build (debug/release)
    #[arg(long, default_value = DEFAULT_TARGET)]
    pub target: String,

    /// Verbose command output
    #[arg(long)]
    pub verbose: bool,

    /// Clean and re-build compiled files
    #[arg(long)]
    pub rebuild: bool,

    /// Run commands in parallel with the given amount of jobs
    #[arg(long)]
    pub jobs: Option<usize>,

    /// Emit machine-readable diagnostics
    #[arg(long)]
    pub machine_readable: bool,

    /// Run the built executable after a fully successful build
    #[arg(long)]
    pub run: bool,
}

pub fn run(args: BuildArgs) -> Result<i32> {
    let config = BuildsConfig::load()?;
    let (project_id, project) = config.resolve_project(args.project.as_deref())?;

    let pipeline_name = project
        .pipeline
        .as_deref()
        .ok_or_else(|| Error::Config(format!("No pipeline set for project {}", project_id)))?;
    let toolchain = ToolchainRegistry::builtin().get(pipeline_name, project_id)?;

    let mut pipeline_config = PipelineConfiguration::for_target(project_id, project, &args.target)?;
    pipeline_config.verbose = args.verbose;
    pipeline_config.rebuild = args.rebuild;
    pipeline_config.machine_readable = args.machine_readable;
    if let Some(jobs) = args.jobs {
        pipeline_config.jobs = jobs;
    }

    let runner = PipelineRunner::new(project_id, Arc::clone(&toolchain), pipeline_config);
    let report = runner.run(&project.files);

    println!("Finished {} steps", report.stages_finished);

    if args.run && report.succeeded() {
        if let Some(artifact) = report.final_artifacts.last() {
            return Ok(run_interactive(&format!("./{}", artifact)));
        }
    }

    Ok(if report.succeeded() { 0 } else { 1 })
}
