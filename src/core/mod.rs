// Public modules
pub mod command;
pub mod config;
pub mod error;
pub mod output;
pub mod preprocessor;
pub mod runner;
pub mod toolchain;
pub mod watch;

// Re-export common types for convenience
pub use command::{BuildCommand, CommandOutput, StageKind};
pub use config::{BuildsConfig, PipelineConfiguration, Project};
pub use error::{Error, Result};
pub use preprocessor::CommandPreprocessor;
pub use runner::{PipelineRunner, RunReport};
pub use toolchain::{
    GccToolchain, PipelineStageSpec, StageSettings, Toolchain, ToolchainRegistry,
};
pub use watch::Watcher;
