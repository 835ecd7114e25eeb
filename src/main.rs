use clap::{Parser, Subcommand};

mod commands;

use commands::{build, files, project, settings, watch};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "builds")]
#[command(version = VERSION)]
#[command(about = "Project build management tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a project with the current settings
    Build(build::BuildArgs),
    /// Watch tracked files and rebuild them on change
    Watch(watch::WatchArgs),
    /// Add file(s) to the build
    Add(files::AddArgs),
    /// Remove file(s) from the build
    Remove(files::RemoveArgs),
    /// Add include path(s) to the active project
    AddInclude(files::AddIncludeArgs),
    /// Add libraries (and optionally a library path) to the active project
    AddLibrary(files::AddLibraryArgs),
    /// Settings related commands
    Settings(settings::SettingsArgs),
    /// Project related commands
    Project(project::ProjectArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Build(args) => build::run(args),
        Commands::Watch(args) => watch::run(args),
        Commands::Add(args) => files::add(args),
        Commands::Remove(args) => files::remove(args),
        Commands::AddInclude(args) => files::add_include(args),
        Commands::AddLibrary(args) => files::add_library(args),
        Commands::Settings(args) => settings::run(args),
        Commands::Project(args) => project::run(args),
    };

    let code = match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{}", err);
            err.exit_code()
        }
    };

    std::process::exit(code);
}
