use clap::{Args, Subcommand};

use builds::config::BuildsConfig;
use builds::error::{Error, Result};

#[derive(Args)]
pub struct ProjectArgs {
    #[command(subcommand)]
    pub command: ProjectCommand,
}

#[derive(Subcommand)]
pub enum ProjectCommand {
    /// Show the currently active project name
    Show,
    /// Rename the currently active project
    Rename {
        newname: String,

        /// Rename the given project instead of the currently active project
        #[arg(short = 'p', long = "project")]
        target: Option<String>,
    },
}

pub fn run(args: ProjectArgs) -> Result<i32> {
    match args.command {
        ProjectCommand::Show => {
            let config = BuildsConfig::load()?;
            println!("{}", config.default_project);
            Ok(0)
        }
        ProjectCommand::Rename { newname, target } => {
            let mut config = BuildsConfig::load()?;
            let target = target.unwrap_or_else(|| config.default_project.clone());

            let project = config
                .projects
                .remove(&target)
                .ok_or(Error::ProjectNotFound(target.clone()))?;
            config.projects.insert(newname.clone(), project);
            if config.default_project == target {
                config.default_project = newname;
            }

            config.save()?;
            Ok(0)
        }
    }
}
