//! Persisted build configuration and the per-run pipeline configuration.
//!
//! The on-disk format is a JSON object under `.builds/builds.json`, searched
//! for upward from the current directory. Projects carry a pipeline name, a
//! file list, build settings (paths and libraries) and named targets with
//! extra compiler arguments.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};

pub const CONFIG_DIR: &str = ".builds";
pub const CONFIG_FILE: &str = "builds.json";

pub const DEFAULT_PROJECT: &str = "default";
pub const DEFAULT_TARGET: &str = "debug";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildsConfig {
    #[serde(default = "default_project_id")]
    pub default_project: String,

    #[serde(default)]
    pub projects: BTreeMap<String, Project>,
}

fn default_project_id() -> String {
    DEFAULT_PROJECT.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Project {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,

    #[serde(rename = "build-settings", default)]
    pub build_settings: BuildSettings,

    #[serde(default)]
    pub targets: BTreeMap<String, Target>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BuildSettings {
    #[serde(rename = "include-paths", default)]
    pub include_paths: Vec<String>,

    #[serde(rename = "library-paths", default)]
    pub library_paths: Vec<String>,

    #[serde(rename = "shared-library-paths", default)]
    pub shared_library_paths: Vec<String>,

    #[serde(default)]
    pub libraries: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Target {
    #[serde(default)]
    pub arguments: Vec<String>,

    #[serde(default)]
    pub debug: bool,
}

impl Default for BuildsConfig {
    fn default() -> Self {
        let mut targets = BTreeMap::new();
        targets.insert(
            "debug".to_string(),
            Target {
                arguments: vec!["-g".to_string(), "-std=c++11".to_string()],
                debug: true,
            },
        );
        targets.insert(
            "release".to_string(),
            Target {
                arguments: vec!["-std=c++11".to_string()],
                debug: false,
            },
        );

        let mut projects = BTreeMap::new();
        projects.insert(
            DEFAULT_PROJECT.to_string(),
            Project {
                pipeline: Some("CPP".to_string()),
                files: Vec::new(),
                build_settings: BuildSettings::default(),
                targets,
            },
        );

        BuildsConfig {
            default_project: default_project_id(),
            projects,
        }
    }
}

impl BuildsConfig {
    /// Locate the configuration file, walking up from the current directory.
    ///
    /// Falls back to `.builds/builds.json` relative to the current directory
    /// when no ancestor carries one.
    pub fn config_path() -> PathBuf {
        let mut dir = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        loop {
            let candidate = dir.join(CONFIG_DIR).join(CONFIG_FILE);
            if candidate.is_file() {
                return candidate;
            }
            if !dir.pop() {
                break;
            }
        }
        Path::new(CONFIG_DIR).join(CONFIG_FILE)
    }

    /// Load the active configuration, or the built-in defaults when no
    /// configuration file exists yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Resolve a project by name, defaulting to the active project.
    pub fn resolve_project(&self, name: Option<&str>) -> Result<(&str, &Project)> {
        let id = name.unwrap_or(&self.default_project);
        match self.projects.get_key_value(id) {
            Some((id, project)) => Ok((id.as_str(), project)),
            None => Err(Error::ProjectNotFound(id.to_string())),
        }
    }

    pub fn resolve_project_mut(&mut self, name: Option<&str>) -> Result<&mut Project> {
        let id = name.unwrap_or(&self.default_project).to_string();
        self.projects.get_mut(&id).ok_or(Error::ProjectNotFound(id))
    }
}

/// Run-wide configuration handed to every component for one build run.
///
/// Constructed once per invocation and never mutated afterwards; components
/// receive it by reference.
#[derive(Debug, Clone)]
pub struct PipelineConfiguration {
    pub jobs: usize,
    pub verbose: bool,
    pub rebuild: bool,
    pub machine_readable: bool,
    pub libraries: Vec<String>,
    pub library_paths: Vec<String>,
    pub shared_library_paths: Vec<String>,
    pub include_paths: Vec<String>,
    pub arguments: Vec<String>,
}

impl Default for PipelineConfiguration {
    fn default() -> Self {
        PipelineConfiguration {
            jobs: default_jobs(),
            verbose: false,
            rebuild: false,
            machine_readable: false,
            libraries: Vec::new(),
            library_paths: Vec::new(),
            shared_library_paths: Vec::new(),
            include_paths: Vec::new(),
            arguments: Vec::new(),
        }
    }
}

impl PipelineConfiguration {
    /// Build the run configuration for a project and one of its named targets.
    pub fn for_target(project_id: &str, project: &Project, target: &str) -> Result<Self> {
        let target_config = project
            .targets
            .get(target)
            .ok_or_else(|| Error::TargetNotFound {
                target: target.to_string(),
                project: project_id.to_string(),
            })?;

        Ok(PipelineConfiguration {
            libraries: project.build_settings.libraries.clone(),
            library_paths: project.build_settings.library_paths.clone(),
            shared_library_paths: project.build_settings.shared_library_paths.clone(),
            include_paths: project.build_settings.include_paths.clone(),
            arguments: target_config.arguments.clone(),
            ..Self::default()
        })
    }
}

/// Default job count: host logical core count, falling back to 1.
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_cpp_pipeline_and_targets() {
        let config = BuildsConfig::default();
        let project = &config.projects[DEFAULT_PROJECT];
        assert_eq!(project.pipeline.as_deref(), Some("CPP"));
        assert_eq!(
            project.targets["debug"].arguments,
            vec!["-g".to_string(), "-std=c++11".to_string()]
        );
        assert!(project.targets["debug"].debug);
        assert!(!project.targets["release"].debug);
    }

    #[test]
    fn config_roundtrips_with_kebab_case_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_DIR).join(CONFIG_FILE);

        let mut config = BuildsConfig::default();
        {
            let project = config.resolve_project_mut(None).unwrap();
            project.files.push("a.cpp".to_string());
            project.build_settings.include_paths.push("inc".to_string());
        }
        config.save_to(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("build-settings"));
        assert!(raw.contains("include-paths"));

        let loaded = BuildsConfig::load_from(&path).unwrap();
        let (_, project) = loaded.resolve_project(None).unwrap();
        assert_eq!(project.files, vec!["a.cpp".to_string()]);
        assert_eq!(
            project.build_settings.include_paths,
            vec!["inc".to_string()]
        );
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = BuildsConfig::load_from(&dir.path().join("nope.json")).unwrap();
        assert!(loaded.projects.contains_key(DEFAULT_PROJECT));
    }

    #[test]
    fn unknown_project_is_a_config_error() {
        let config = BuildsConfig::default();
        let err = config.resolve_project(Some("ghost")).unwrap_err();
        assert_eq!(err.exit_code(), 78);
    }

    #[test]
    fn for_target_requires_a_known_target() {
        let config = BuildsConfig::default();
        let (id, project) = config.resolve_project(None).unwrap();
        assert!(PipelineConfiguration::for_target(id, project, "debug").is_ok());
        let err = PipelineConfiguration::for_target(id, project, "profile").unwrap_err();
        assert!(matches!(err, Error::TargetNotFound { .. }));
    }
}
