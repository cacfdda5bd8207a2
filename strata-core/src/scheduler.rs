//! Layered script scheduling.
//!
//! Builds run layer by layer so a package never builds before its
//! dependencies. Lint and test runs for a package start as soon as its build
//! succeeds and are not awaited between layers, only at the end of the run.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::error::Result;
use crate::executor::ProcessExecutor;
use crate::graph::DependencyGraph;
use crate::package::ScriptKind;
use crate::report::{ScriptStatus, StatusUpdate};
use crate::workspace::Workspace;

const BIN_DIR: &str = "node_modules/.bin";

/// What happens to a package's build when one of its dependencies failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DepFailurePolicy {
    /// Mark the dependent's build as skipped and propagate the skip to its
    /// own dependents.
    #[default]
    SkipDependents,
    /// Attempt the dependent's build anyway.
    Proceed,
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub build: bool,
    pub lint: bool,
    pub test: bool,
    pub dep_failure: DepFailurePolicy,
    /// Extra arguments appended to every test script invocation.
    pub test_args: Vec<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            build: true,
            lint: true,
            test: true,
            dep_failure: DepFailurePolicy::default(),
            test_args: Vec::new(),
        }
    }
}

impl RunOptions {
    /// Maps CLI selection flags onto a run plan. Selecting nothing selects
    /// everything.
    pub fn from_flags(build: bool, lint: bool, test: bool) -> Self {
        if !build && !lint && !test {
            return Self::default();
        }
        Self {
            build,
            lint,
            test,
            ..Self::default()
        }
    }
}

/// Shared per-run state for the spawned script tasks.
struct ScriptRunner {
    workspace: Arc<Workspace>,
    executor: ProcessExecutor,
    test_args: Vec<String>,
    updates: mpsc::UnboundedSender<StatusUpdate>,
}

impl ScriptRunner {
    fn emit(
        &self,
        package: &str,
        script: ScriptKind,
        status: ScriptStatus,
        output: Option<String>,
    ) {
        // A closed receiver means the consumer stopped listening; the run
        // itself carries on.
        let _ = self.updates.send(StatusUpdate {
            package: package.to_string(),
            script,
            status,
            output,
        });
    }

    fn path_prefix(&self, package_dir: &std::path::Path) -> Vec<PathBuf> {
        vec![
            package_dir.join(BIN_DIR),
            self.workspace.root_dir.join(BIN_DIR),
        ]
    }

    /// Runs one script of one package. A package that does not declare the
    /// script succeeds without spawning anything.
    async fn run_script(&self, name: &str, kind: ScriptKind) -> bool {
        let Some(package) = self.workspace.packages.get(name) else {
            return true;
        };
        if package.script(kind).is_none() {
            debug!(package = name, script = %kind, "script not declared, treating as success");
            self.emit(name, kind, ScriptStatus::Success, None);
            return true;
        }
        self.emit(name, kind, ScriptStatus::Running, None);
        let extra_args: &[String] = match kind {
            ScriptKind::Test => &self.test_args,
            _ => &[],
        };
        let outcome = self
            .executor
            .run_script(
                kind.as_str(),
                extra_args,
                &package.path,
                &self.path_prefix(&package.path),
            )
            .await;
        let status = if outcome.success {
            ScriptStatus::Success
        } else {
            ScriptStatus::Error
        };
        self.emit(name, kind, status, Some(outcome.output));
        outcome.success
    }

    /// Runs a package's lint and test scripts concurrently.
    async fn verify(&self, name: &str, lint: bool, test: bool) {
        match (lint, test) {
            (true, true) => {
                tokio::join!(
                    self.run_script(name, ScriptKind::Lint),
                    self.run_script(name, ScriptKind::Test),
                );
            }
            (true, false) => {
                self.run_script(name, ScriptKind::Lint).await;
            }
            (false, true) => {
                self.run_script(name, ScriptKind::Test).await;
            }
            (false, false) => {}
        }
    }
}

pub struct Scheduler {
    workspace: Arc<Workspace>,
    runner: Arc<ScriptRunner>,
    options: RunOptions,
}

impl Scheduler {
    pub fn new(
        workspace: Workspace,
        executor: ProcessExecutor,
        options: RunOptions,
        updates: mpsc::UnboundedSender<StatusUpdate>,
    ) -> Self {
        let workspace = Arc::new(workspace);
        let runner = Arc::new(ScriptRunner {
            workspace: Arc::clone(&workspace),
            executor,
            test_args: options.test_args.clone(),
            updates,
        });
        Self {
            workspace,
            runner,
            options,
        }
    }

    /// Runs the selected scripts across the workspace. Returns once every
    /// spawned script has settled; per-script failures are reported on the
    /// status channel, not as errors here.
    pub async fn run(&self) -> Result<()> {
        let mut verification = JoinSet::new();
        let wants_verify = self.options.lint || self.options.test;

        if self.options.build {
            let graph = DependencyGraph::build(&self.workspace);
            let layers = graph.layers()?;
            let mut failed: HashSet<String> = HashSet::new();

            for layer in layers {
                let mut builds = JoinSet::new();
                for name in layer {
                    if self.options.dep_failure == DepFailurePolicy::SkipDependents
                        && graph
                            .dependencies_of(&name)
                            .iter()
                            .any(|dep| failed.contains(dep))
                    {
                        debug!(package = %name, "skipping build, dependency failed");
                        self.runner
                            .emit(&name, ScriptKind::Build, ScriptStatus::Skip, None);
                        failed.insert(name);
                        continue;
                    }
                    let runner = Arc::clone(&self.runner);
                    builds.spawn(async move {
                        let ok = runner.run_script(&name, ScriptKind::Build).await;
                        (name, ok)
                    });
                }
                while let Some(joined) = builds.join_next().await {
                    match joined {
                        Ok((name, true)) => {
                            if wants_verify {
                                self.spawn_verify(&mut verification, name);
                            }
                        }
                        Ok((name, false)) => {
                            failed.insert(name);
                        }
                        Err(err) => warn!(%err, "build task failed to join"),
                    }
                }
            }
        } else if wants_verify {
            for name in self.workspace.packages.keys() {
                self.spawn_verify(&mut verification, name.clone());
            }
        }

        while let Some(joined) = verification.join_next().await {
            if let Err(err) = joined {
                warn!(%err, "verification task failed to join");
            }
        }
        Ok(())
    }

    fn spawn_verify(&self, verification: &mut JoinSet<()>, name: String) {
        let runner = Arc::clone(&self.runner);
        let lint = self.options.lint;
        let test = self.options.test;
        verification.spawn(async move {
            runner.verify(&name, lint, test).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_flag_selection_selects_everything() {
        let options = RunOptions::from_flags(false, false, false);
        assert!(options.build && options.lint && options.test);
    }

    #[test]
    fn explicit_flag_selection_is_preserved() {
        let options = RunOptions::from_flags(false, true, false);
        assert!(!options.build);
        assert!(options.lint);
        assert!(!options.test);
    }
}
