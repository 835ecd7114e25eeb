use clap::{Args, Subcommand};

use builds::config::BuildsConfig;
use builds::error::Result;

#[derive(Args)]
pub struct SettingsArgs {
    #[command(subcommand)]
    pub command: SettingsCommand,
}

#[derive(Subcommand)]
pub enum SettingsCommand {
    /// Display the currently active settings
    Print,
}

pub fn run(args: SettingsArgs) -> Result<i32> {
    match args.command {
        SettingsCommand::Print => {
            let config = BuildsConfig::load()?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(0)
        }
    }
}
