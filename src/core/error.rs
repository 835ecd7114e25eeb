use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No pipeline {name} found for project {project}.")]
    UnknownToolchain { name: String, project: String },

    #[error("No project found with name {0}")]
    ProjectNotFound(String),

    #[error("No target {target} for project {project}")]
    TargetNotFound { target: String, project: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    #[error("Signal error: {0}")]
    Signal(#[from] ctrlc::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::Config(_) => "CONFIG_ERROR",
            Error::UnknownToolchain { .. } => "UNKNOWN_TOOLCHAIN",
            Error::ProjectNotFound(_) => "PROJECT_NOT_FOUND",
            Error::TargetNotFound { .. } => "TARGET_NOT_FOUND",
            Error::Io(_) => "IO_ERROR",
            Error::Json(_) => "JSON_ERROR",
            Error::Watch(_) => "WATCH_ERROR",
            Error::Signal(_) => "SIGNAL_ERROR",
        }
    }

    /// Process exit code for this error.
    ///
    /// Configuration problems exit with EX_CONFIG (78) so callers can tell
    /// a bad setup apart from a failed build (which exits 1).
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_)
            | Error::UnknownToolchain { .. }
            | Error::ProjectNotFound(_)
            | Error::TargetNotFound { .. } => 78,
            Error::Io(_) | Error::Json(_) | Error::Watch(_) | Error::Signal(_) => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_exit_with_ex_config() {
        let err = Error::UnknownToolchain {
            name: "RUSTC".to_string(),
            project: "default".to_string(),
        };
        assert_eq!(err.exit_code(), 78);
        assert_eq!(err.code(), "UNKNOWN_TOOLCHAIN");
        assert_eq!(
            err.to_string(),
            "No pipeline RUSTC found for project default."
        );
    }

    #[test]
    fn io_errors_exit_with_one() {
        let err = Error::Io(std::io::Error::new(std::io::ErrorKind::Other, "boom"));
        assert_eq!(err.exit_code(), 1);
    }
}
