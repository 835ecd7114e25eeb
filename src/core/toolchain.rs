//! Toolchain pipelines: the recipes that turn project files into commands.
//!
//! A toolchain implements the compile/build capability set over merged stage
//! settings. The two built-in variants (native `g++` and the MinGW cross
//! compiler) differ only in tool binary and object suffix, so both are
//! expressed through [`GccToolchain`]. New toolchains are resolved by name
//! through [`ToolchainRegistry`]; the runner never enumerates variants.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::core::command::{BuildCommand, StageKind};
use crate::core::error::{Error, Result};
use crate::core::preprocessor::CommandPreprocessor;

/// One stage of a pipeline recipe. Declaration order is execution order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStageSpec {
    #[serde(rename = "type")]
    pub kind: StageKind,
    pub tool: String,
    pub arguments: Vec<String>,
    pub input: String,
    pub output: String,
}

/// Merged settings for one stage: the stage spec's tool and arguments plus
/// the run-wide paths, libraries and target arguments.
#[derive(Debug, Clone, Default)]
pub struct StageSettings {
    pub tool: String,
    pub arguments: Vec<String>,
    pub include_paths: Vec<String>,
    pub library_paths: Vec<String>,
    pub shared_library_paths: Vec<String>,
    pub libraries: Vec<String>,
}

/// Capability set every toolchain variant satisfies.
///
/// Stage methods must build each command independently; commands within a
/// stage are executed concurrently with no mutual visibility.
pub trait Toolchain: Send + Sync + std::fmt::Debug {
    /// Registry name, e.g. `CPP`.
    fn name(&self) -> &str;

    /// Suffix appended to a source file to name its compiled artifact.
    /// Variants use distinct suffixes so their outputs never collide.
    fn object_suffix(&self) -> &str;

    /// The toolchain's built-in recipe, used when a project defines none.
    fn default_stages(&self) -> Vec<PipelineStageSpec>;

    /// One command per input file; deduplicated by output path, first wins.
    /// Returns the commands and the output file set they produce.
    fn compile(
        &self,
        preprocessor: &CommandPreprocessor,
        settings: &StageSettings,
        files: &[String],
    ) -> (Vec<BuildCommand>, Vec<String>);

    /// One link command collapsing the compiled artifacts into the project
    /// binary. The staleness input is the newest artifact so the freshness
    /// check stays meaningful despite the many-input shape.
    fn build(
        &self,
        preprocessor: &CommandPreprocessor,
        settings: &StageSettings,
        files: &[String],
    ) -> (Vec<BuildCommand>, Vec<String>);
}

/// Shared implementation for gcc-flavored toolchains.
#[derive(Debug)]
pub struct GccToolchain {
    name: String,
    tool: String,
    object_suffix: String,
}

impl GccToolchain {
    pub fn new(
        name: impl Into<String>,
        tool: impl Into<String>,
        object_suffix: impl Into<String>,
    ) -> Self {
        GccToolchain {
            name: name.into(),
            tool: tool.into(),
            object_suffix: object_suffix.into(),
        }
    }

    /// Native C++ toolchain.
    pub fn cpp() -> Self {
        Self::new("CPP", "g++", ".o")
    }

    /// Windows cross-compile toolchain.
    pub fn mingw() -> Self {
        Self::new("MINGW", "x86_64-w64-mingw32-g++", ".w64.o")
    }

    fn compile_step(
        &self,
        preprocessor: &CommandPreprocessor,
        settings: &StageSettings,
        file: &str,
    ) -> (String, String) {
        let mut parts = vec![settings.tool.clone()];
        parts.extend(settings.arguments.iter().cloned());
        parts.extend(settings.include_paths.iter().map(|p| format!("-I{}", p)));

        let command = preprocessor.process(&parts.join(" "), file);
        let outfile = format!("{}{}", file, self.object_suffix);
        (command, outfile)
    }
}

impl Toolchain for GccToolchain {
    fn name(&self) -> &str {
        &self.name
    }

    fn object_suffix(&self) -> &str {
        &self.object_suffix
    }

    fn default_stages(&self) -> Vec<PipelineStageSpec> {
        vec![
            PipelineStageSpec {
                kind: StageKind::Compile,
                tool: self.tool.clone(),
                arguments: vec![
                    "-Wall".to_string(),
                    format!("-c $FILE -o $FILE{}", self.object_suffix),
                ],
                input: "files".to_string(),
                output: "compiled-files".to_string(),
            },
            PipelineStageSpec {
                kind: StageKind::Build,
                tool: self.tool.clone(),
                arguments: vec!["-o $PROJECTNAME".to_string()],
                input: "compiled-files".to_string(),
                output: "$PROJECTNAME-files".to_string(),
            },
        ]
    }

    fn compile(
        &self,
        preprocessor: &CommandPreprocessor,
        settings: &StageSettings,
        files: &[String],
    ) -> (Vec<BuildCommand>, Vec<String>) {
        let mut commands = Vec::new();
        let mut step_files: Vec<String> = Vec::new();

        for file in files {
            let (command, outfile) = self.compile_step(preprocessor, settings, file);
            if step_files.contains(&outfile) {
                continue;
            }
            commands.push(BuildCommand::new(
                command,
                StageKind::Compile,
                file.clone(),
                PathBuf::from(file),
                PathBuf::from(&outfile),
            ));
            step_files.push(outfile);
        }

        (commands, step_files)
    }

    fn build(
        &self,
        preprocessor: &CommandPreprocessor,
        settings: &StageSettings,
        files: &[String],
    ) -> (Vec<BuildCommand>, Vec<String>) {
        let mut objects: Vec<String> = Vec::new();
        let mut newest: Option<(String, SystemTime)> = None;

        for file in files {
            let object = format!("{}{}", file, self.object_suffix);
            if objects.contains(&object) {
                continue;
            }
            if let Some(mtime) = fs::metadata(&object).ok().and_then(|m| m.modified().ok()) {
                if newest.as_ref().map_or(true, |(_, t)| mtime > *t) {
                    newest = Some((object.clone(), mtime));
                }
            }
            objects.push(object);
        }

        let mut parts = vec![settings.tool.clone()];
        parts.extend(settings.library_paths.iter().map(|p| format!("-L{}", p)));
        parts.extend(
            settings
                .shared_library_paths
                .iter()
                .map(|p| format!("-Wl,-rpath,{}", p)),
        );
        parts.extend(settings.libraries.iter().map(|l| format!("-l{}", l)));
        parts.extend(settings.arguments.iter().cloned());
        parts.extend(objects.iter().cloned());

        let project = preprocessor.project().to_string();
        let command = preprocessor.process(&parts.join(" "), &project);

        let input = newest
            .map(|(object, _)| PathBuf::from(object))
            .unwrap_or_default();

        let commands = vec![BuildCommand::new(
            command,
            StageKind::Build,
            project.clone(),
            input,
            PathBuf::from(&project),
        )];

        (commands, vec![project])
    }
}

/// Static name-to-toolchain registry, populated at process start.
///
/// Unknown names fail lookup explicitly as a fatal configuration error;
/// adding a toolchain never requires touching the runner.
pub struct ToolchainRegistry {
    toolchains: HashMap<String, Arc<dyn Toolchain>>,
}

impl ToolchainRegistry {
    pub fn new() -> Self {
        ToolchainRegistry {
            toolchains: HashMap::new(),
        }
    }

    /// Registry with the built-in variants.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(GccToolchain::cpp()));
        registry.register(Arc::new(GccToolchain::mingw()));
        registry
    }

    pub fn register(&mut self, toolchain: Arc<dyn Toolchain>) {
        self.toolchains
            .insert(toolchain.name().to_string(), toolchain);
    }

    pub fn get(&self, name: &str, project: &str) -> Result<Arc<dyn Toolchain>> {
        self.toolchains
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownToolchain {
                name: name.to_string(),
                project: project.to_string(),
            })
    }
}

impl Default for ToolchainRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(tool: &str) -> StageSettings {
        StageSettings {
            tool: tool.to_string(),
            arguments: vec!["-Wall".to_string(), "-c $FILE -o $FILE.o".to_string()],
            include_paths: vec!["inc".to_string()],
            ..StageSettings::default()
        }
    }

    #[test]
    fn compile_builds_one_command_per_file() {
        let toolchain = GccToolchain::cpp();
        let preprocessor = CommandPreprocessor::new("demo");
        let files = vec!["a.cpp".to_string(), "b.cpp".to_string()];

        let (commands, outputs) = toolchain.compile(&preprocessor, &settings("g++"), &files);

        assert_eq!(commands.len(), 2);
        assert_eq!(outputs, vec!["a.cpp.o".to_string(), "b.cpp.o".to_string()]);
        assert_eq!(commands[0].command(), "g++ -Wall -c a.cpp -o a.cpp.o -Iinc");
        assert_eq!(commands[0].display_name(), "a.cpp");
    }

    #[test]
    fn compile_deduplicates_by_output_path() {
        let toolchain = GccToolchain::cpp();
        let preprocessor = CommandPreprocessor::new("demo");
        let files = vec!["a.cpp".to_string(), "a.cpp".to_string()];

        let (commands, outputs) = toolchain.compile(&preprocessor, &settings("g++"), &files);

        assert_eq!(commands.len(), 1);
        assert_eq!(outputs, vec!["a.cpp.o".to_string()]);
    }

    #[test]
    fn cross_toolchain_uses_distinct_suffix() {
        let toolchain = GccToolchain::mingw();
        assert_eq!(toolchain.object_suffix(), ".w64.o");

        let stages = toolchain.default_stages();
        assert_eq!(stages[0].tool, "x86_64-w64-mingw32-g++");
        assert!(stages[0].arguments[1].ends_with("$FILE.w64.o"));

        let preprocessor = CommandPreprocessor::new("demo");
        let files = vec!["a.cpp".to_string()];
        let (_, outputs) = toolchain.compile(&preprocessor, &settings("g++"), &files);
        assert_eq!(outputs, vec!["a.cpp.w64.o".to_string()]);
    }

    #[test]
    fn build_collapses_artifacts_into_one_command() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.cpp").display().to_string();
        let b = dir.path().join("b.cpp").display().to_string();
        std::fs::write(format!("{}.o", a), "obj").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        std::fs::write(format!("{}.o", b), "obj").unwrap();

        let toolchain = GccToolchain::cpp();
        let preprocessor = CommandPreprocessor::new("demo");
        let link_settings = StageSettings {
            tool: "g++".to_string(),
            arguments: vec!["-o $PROJECTNAME".to_string()],
            library_paths: vec!["lib".to_string()],
            shared_library_paths: vec!["shared".to_string()],
            libraries: vec!["m".to_string()],
            ..StageSettings::default()
        };

        let files = vec![a.clone(), b.clone(), a.clone()];
        let (commands, outputs) = toolchain.build(&preprocessor, &link_settings, &files);

        assert_eq!(commands.len(), 1);
        assert_eq!(outputs, vec!["demo".to_string()]);

        let command = commands[0].command();
        assert!(command.starts_with("g++ -Llib -Wl,-rpath,shared -lm -o demo"));
        assert!(command.contains(&format!("{}.o", a)));
        assert!(command.contains(&format!("{}.o", b)));
        // Duplicate artifact listed once.
        assert_eq!(command.matches(&format!("{}.o", a)).count(), 1);
    }

    #[test]
    fn build_staleness_input_is_newest_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.cpp").display().to_string();
        let b = dir.path().join("b.cpp").display().to_string();
        std::fs::write(format!("{}.o", a), "obj").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(20));
        std::fs::write(format!("{}.o", b), "obj").unwrap();

        let toolchain = GccToolchain::cpp();
        let preprocessor = CommandPreprocessor::new("demo");
        let files = vec![a, b.clone()];
        let (commands, _) = toolchain.build(&preprocessor, &StageSettings::default(), &files);

        // Link commands compare freshness against the newest object.
        assert_eq!(commands[0].output(), PathBuf::from("demo").as_path());
        assert_eq!(
            commands[0].input(),
            PathBuf::from(format!("{}.o", b)).as_path()
        );
    }

    #[test]
    fn registry_resolves_builtin_names() {
        let registry = ToolchainRegistry::builtin();
        assert_eq!(registry.get("CPP", "demo").unwrap().name(), "CPP");
        assert_eq!(registry.get("MINGW", "demo").unwrap().name(), "MINGW");
    }

    #[test]
    fn registry_rejects_unknown_names() {
        let registry = ToolchainRegistry::builtin();
        let err = registry.get("RUSTC", "demo").unwrap_err();
        assert_eq!(err.exit_code(), 78);
        assert_eq!(
            err.to_string(),
            "No pipeline RUSTC found for project demo."
        );
    }
}
