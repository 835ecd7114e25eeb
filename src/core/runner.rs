//! Stage orchestration: resolves each stage's commands from the toolchain
//! and executes them on a bounded worker pool.
//!
//! Failure semantics: per-command outcomes are collected through a channel
//! and AND-reduced after the pool drains, so the stage result never depends
//! on scheduling order. Dispatched commands always run to completion; the
//! only cancellation point is "do not start the next stage".

use std::collections::{HashMap, VecDeque};
use std::sync::{mpsc, Arc, Mutex, MutexGuard};
use std::thread;

use crate::core::command::{BuildCommand, StageKind};
use crate::core::config::PipelineConfiguration;
use crate::core::preprocessor::CommandPreprocessor;
use crate::core::toolchain::{PipelineStageSpec, StageSettings, Toolchain};

/// Lock a mutex, recovering the guard if a worker panicked while holding it.
pub(crate) fn lock_or_recover<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Result of one pipeline run.
#[derive(Debug)]
pub struct RunReport {
    /// Stages that completed with zero failing commands.
    pub stages_finished: usize,
    pub total_stages: usize,
    /// Accumulated output file sets, keyed by each stage's resolved output
    /// name. Append-only; written between stages.
    pub outputs: HashMap<String, Vec<String>>,
    /// Files produced by the last stage that completed cleanly.
    pub final_artifacts: Vec<String>,
}

impl RunReport {
    pub fn succeeded(&self) -> bool {
        self.stages_finished == self.total_stages
    }
}

/// Runs a project's pipeline stages in declared order.
///
/// Owns the list of commands for the stage currently executing; nothing else
/// shares mutable state across stages.
pub struct PipelineRunner {
    toolchain: Arc<dyn Toolchain>,
    stages: Vec<PipelineStageSpec>,
    config: PipelineConfiguration,
    preprocessor: CommandPreprocessor,
}

impl PipelineRunner {
    pub fn new(
        project: &str,
        toolchain: Arc<dyn Toolchain>,
        config: PipelineConfiguration,
    ) -> Self {
        let stages = toolchain.default_stages();
        PipelineRunner {
            toolchain,
            stages,
            config,
            preprocessor: CommandPreprocessor::new(project),
        }
    }

    /// Replace the toolchain's default recipe with explicit stage specs.
    pub fn with_stages(mut self, stages: Vec<PipelineStageSpec>) -> Self {
        self.stages = stages;
        self
    }

    pub fn config(&self) -> &PipelineConfiguration {
        &self.config
    }

    /// Merge the run-wide configuration into one stage's settings.
    fn stage_settings(&self, spec: &PipelineStageSpec) -> StageSettings {
        let mut arguments = spec.arguments.clone();
        arguments.extend(self.config.arguments.iter().cloned());

        StageSettings {
            tool: spec.tool.clone(),
            arguments,
            include_paths: self.config.include_paths.clone(),
            library_paths: self.config.library_paths.clone(),
            shared_library_paths: self.config.shared_library_paths.clone(),
            libraries: self.config.libraries.clone(),
        }
    }

    /// Resolve one stage into its commands and produced output file set.
    pub fn generate_stage(
        &self,
        spec: &PipelineStageSpec,
        files: &[String],
    ) -> (Vec<BuildCommand>, Vec<String>) {
        let settings = self.stage_settings(spec);
        match spec.kind {
            StageKind::Compile => self.toolchain.compile(&self.preprocessor, &settings, files),
            StageKind::Build => self.toolchain.build(&self.preprocessor, &settings, files),
        }
    }

    /// Execute a stage's commands on a fixed-size worker pool and AND-reduce
    /// their outcomes. Workers pull from a shared queue; outcomes flow back
    /// over a channel and are folded after every worker is done.
    pub fn run_commands(&self, commands: Vec<BuildCommand>) -> bool {
        if commands.is_empty() {
            return true;
        }

        let workers = self.config.jobs.max(1).min(commands.len());
        let queue: Mutex<VecDeque<BuildCommand>> = Mutex::new(commands.into());
        let queue = &queue;
        let config = &self.config;

        let (outcome_tx, outcome_rx) = mpsc::channel::<bool>();

        thread::scope(|scope| {
            for _ in 0..workers {
                let outcome_tx = outcome_tx.clone();
                scope.spawn(move || loop {
                    let next = lock_or_recover(queue).pop_front();
                    let Some(mut command) = next else {
                        break;
                    };
                    let ok = command.execute(config);
                    if outcome_tx.send(ok).is_err() {
                        break;
                    }
                });
            }
            drop(outcome_tx);

            outcome_rx.iter().fold(true, |all, ok| all && ok)
        })
    }

    /// Run every declared stage in order, halting before the next stage once
    /// any stage reports a failing command. Returns the per-stage outputs and
    /// the count of stages that completed cleanly.
    pub fn run(&self, files: &[String]) -> RunReport {
        let mut outputs: HashMap<String, Vec<String>> = HashMap::new();
        outputs.insert("files".to_string(), files.to_vec());

        let mut stages_finished = 0;
        let mut final_artifacts = Vec::new();

        for spec in &self.stages {
            let (commands, produced) = self.generate_stage(spec, files);
            let success = self.run_commands(commands);

            let output_name = self
                .preprocessor
                .process(&spec.output, self.preprocessor.project());
            outputs
                .entry(output_name)
                .or_default()
                .extend(produced.iter().cloned());

            if !success {
                break;
            }
            final_artifacts = produced;
            stages_finished += 1;
        }

        RunReport {
            stages_finished,
            total_stages: self.stages.len(),
            outputs,
            final_artifacts,
        }
    }

    /// Compile a single file through the pipeline's compile stage. Used by
    /// the watch loop for incremental rebuilds.
    pub fn run_file(&self, file: &str) -> bool {
        let Some(spec) = self
            .stages
            .iter()
            .find(|spec| spec.kind == StageKind::Compile)
        else {
            return true;
        };

        let files = [file.to_string()];
        let (commands, _) = self.generate_stage(spec, &files);
        self.run_commands(commands)
    }
}
