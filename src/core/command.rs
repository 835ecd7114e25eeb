//! One schedulable shell invocation with its staleness inputs and outcome.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::core::config::PipelineConfiguration;
use crate::core::output;

/// Which pipeline stage a command belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageKind {
    Compile,
    Build,
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageKind::Compile => write!(f, "compile"),
            StageKind::Build => write!(f, "build"),
        }
    }
}

/// A single shell invocation plus the input/output pair used for the
/// freshness check.
///
/// A command whose input equals its output is always considered stale; the
/// link stage uses that to force a run, since it has no single meaningful
/// "newer than" comparison.
#[derive(Debug, Clone)]
pub struct BuildCommand {
    command: String,
    kind: StageKind,
    display_name: String,
    input: PathBuf,
    output: PathBuf,
    success: bool,
}

impl BuildCommand {
    pub fn new(
        command: impl Into<String>,
        kind: StageKind,
        display_name: impl Into<String>,
        input: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        BuildCommand {
            command: command.into(),
            kind,
            display_name: display_name.into(),
            input: input.into(),
            output: output.into(),
            success: false,
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn succeeded(&self) -> bool {
        self.success
    }

    /// Freshness test: output exists, input exists, output mtime strictly
    /// newer than input mtime, rebuild not forced, and input != output.
    /// A failed stat counts as "not fresh" so the command runs instead of
    /// erroring out.
    fn is_fresh(&self, config: &PipelineConfiguration) -> bool {
        if config.rebuild || self.input == self.output {
            return false;
        }
        match (modified_time(&self.input), modified_time(&self.output)) {
            (Some(input), Some(output)) => output > input,
            _ => false,
        }
    }

    /// Execute the command, skipping it entirely when the output is fresh.
    ///
    /// The returned flag is the only externally observed result. Captured
    /// output is shaped through the classifier before printing; nothing is
    /// buffered across commands, so interleaving between concurrent commands
    /// happens at whole-message granularity.
    pub fn execute(&mut self, config: &PipelineConfiguration) -> bool {
        if self.is_fresh(config) {
            self.success = true;
            return true;
        }

        println!("{} {}", self.kind, self.display_name);
        if config.verbose {
            println!("{}", self.command);
        }

        let output = execute_shell(&self.command);

        let message = if output.success {
            self.success = true;
            output.stdout
        } else {
            if config.machine_readable {
                println!("{}-failed", self.kind);
            } else {
                println!("{} failed", self.kind);
            }
            output.stderr
        };

        if !message.is_empty() {
            println!("{}", output::process_message(&message, config));
        }

        self.success
    }
}

fn modified_time(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).ok()?.modified().ok()
}

/// Captured output from one shell invocation.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub exit_code: i32,
}

/// Run a command line through the platform shell, capturing stdout and
/// stderr separately. Spawn failures surface as a failed output rather
/// than an error.
pub fn execute_shell(command: &str) -> CommandOutput {
    #[cfg(windows)]
    let mut cmd = {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    };

    #[cfg(not(windows))]
    let mut cmd = {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    };

    match cmd.output() {
        Ok(out) => CommandOutput {
            stdout: String::from_utf8_lossy(&out.stdout).to_string(),
            stderr: String::from_utf8_lossy(&out.stderr).to_string(),
            success: out.status.success(),
            exit_code: out.status.code().unwrap_or(-1),
        },
        Err(e) => CommandOutput {
            stdout: String::new(),
            stderr: format!("Command error: {}", e),
            success: false,
            exit_code: -1,
        },
    }
}

/// Run a command line with inherited stdio (e.g. launching the built
/// executable). Returns the exit code.
pub fn run_interactive(command: &str) -> i32 {
    #[cfg(windows)]
    let mut cmd = {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command]);
        cmd
    };

    #[cfg(not(windows))]
    let mut cmd = {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command]);
        cmd
    };

    let status = cmd
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status();

    match status {
        Ok(s) => s.code().unwrap_or(-1),
        Err(_) => -1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    fn write(path: &Path, contents: &str) {
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn fresh_output_skips_execution() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.cpp");
        let output = dir.path().join("a.cpp.o");
        write(&input, "int main() {}");
        thread::sleep(Duration::from_millis(20));
        write(&output, "obj");

        // The command would fail if it actually ran.
        let mut command =
            BuildCommand::new("exit 1", StageKind::Compile, "a.cpp", &input, &output);
        assert!(command.execute(&PipelineConfiguration::default()));
        assert!(command.succeeded());
    }

    #[test]
    fn rebuild_flag_forces_execution() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.cpp");
        let output = dir.path().join("a.cpp.o");
        write(&input, "int main() {}");
        thread::sleep(Duration::from_millis(20));
        write(&output, "obj");

        let mut config = PipelineConfiguration::default();
        config.rebuild = true;

        let mut command =
            BuildCommand::new("exit 1", StageKind::Compile, "a.cpp", &input, &output);
        assert!(!command.execute(&config));
    }

    #[test]
    fn self_pair_is_always_stale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo");
        write(&path, "bin");

        let marker = dir.path().join("ran");
        let mut command = BuildCommand::new(
            format!("touch {}", marker.display()),
            StageKind::Build,
            "demo",
            &path,
            &path,
        );
        assert!(command.execute(&PipelineConfiguration::default()));
        assert!(marker.is_file());
    }

    #[test]
    fn missing_output_forces_execution() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.cpp");
        write(&input, "int main() {}");

        let marker = dir.path().join("ran");
        let mut command = BuildCommand::new(
            format!("touch {}", marker.display()),
            StageKind::Compile,
            "a.cpp",
            &input,
            dir.path().join("a.cpp.o"),
        );
        assert!(command.execute(&PipelineConfiguration::default()));
        assert!(marker.is_file());
    }

    #[test]
    fn stale_output_forces_execution() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("a.cpp");
        let output = dir.path().join("a.cpp.o");
        write(&output, "obj");
        thread::sleep(Duration::from_millis(20));
        write(&input, "int main() { return 1; }");

        let marker = dir.path().join("ran");
        let mut command = BuildCommand::new(
            format!("touch {}", marker.display()),
            StageKind::Compile,
            "a.cpp",
            &input,
            &output,
        );
        assert!(command.execute(&PipelineConfiguration::default()));
        assert!(marker.is_file());
    }

    #[test]
    fn failed_command_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut command = BuildCommand::new(
            "exit 3",
            StageKind::Compile,
            "a.cpp",
            dir.path().join("missing.cpp"),
            dir.path().join("missing.cpp.o"),
        );
        assert!(!command.execute(&PipelineConfiguration::default()));
        assert!(!command.succeeded());
    }

    #[test]
    fn execute_shell_captures_streams_separately() {
        let out = execute_shell("echo visible; echo hidden 1>&2");
        assert!(out.success);
        assert_eq!(out.stdout.trim(), "visible");
        assert_eq!(out.stderr.trim(), "hidden");
    }

    #[test]
    fn execute_shell_reports_exit_code() {
        let out = execute_shell("exit 7");
        assert!(!out.success);
        assert_eq!(out.exit_code, 7);
    }
}
