//! Process execution for package scripts.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

/// Outcome of one script process. `output` interleaves nothing: it is the
/// full stderr followed by the full stdout, so diagnostics read first.
#[derive(Debug, Clone)]
pub struct ScriptOutcome {
    pub success: bool,
    pub output: String,
}

/// Spawns `<program> <run_args>.. <script> <extra_args>..` in a package
/// directory with local binary directories prefixed onto PATH.
#[derive(Debug, Clone)]
pub struct ProcessExecutor {
    program: String,
    run_args: Vec<String>,
}

impl Default for ProcessExecutor {
    fn default() -> Self {
        Self {
            program: "yarn".to_string(),
            run_args: vec!["run".to_string()],
        }
    }
}

impl ProcessExecutor {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            run_args: Vec::new(),
        }
    }

    pub fn with_run_args(mut self, run_args: Vec<String>) -> Self {
        self.run_args = run_args;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Runs `script` in `cwd`. `path_prefix` directories are prepended to the
    /// ambient PATH in order. A non-zero exit code fails the outcome; a
    /// signal-terminated child (no exit code) counts as success.
    pub async fn run_script(
        &self,
        script: &str,
        extra_args: &[String],
        cwd: &Path,
        path_prefix: &[PathBuf],
    ) -> ScriptOutcome {
        let path = search_path(path_prefix);
        let mut args: Vec<&str> = self.run_args.iter().map(String::as_str).collect();
        args.push(script);
        args.extend(extra_args.iter().map(String::as_str));

        debug!(
            program = %self.program,
            script,
            cwd = %cwd.display(),
            "spawning script process"
        );

        let spawned = Command::new(&self.program)
            .args(&args)
            .current_dir(cwd)
            .env("PATH", &path)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();

        let child = match spawned {
            Ok(child) => child,
            Err(err) => {
                return ScriptOutcome {
                    success: false,
                    output: spawn_failure(script, &self.program, &args, &path, &err),
                };
            }
        };

        match child.wait_with_output().await {
            Ok(output) => {
                let mut combined = String::from_utf8_lossy(&output.stderr).into_owned();
                combined.push_str(&String::from_utf8_lossy(&output.stdout));
                ScriptOutcome {
                    success: output.status.code().unwrap_or(0) == 0,
                    output: combined,
                }
            }
            Err(err) => ScriptOutcome {
                success: false,
                output: spawn_failure(script, &self.program, &args, &path, &err),
            },
        }
    }
}

fn search_path(prefix: &[PathBuf]) -> OsString {
    let ambient = env::var_os("PATH").unwrap_or_default();
    let entries = prefix
        .iter()
        .cloned()
        .chain(env::split_paths(&ambient));
    // join_paths only fails on entries containing the separator, which
    // cannot occur for the node_modules/.bin dirs we construct.
    env::join_paths(entries).unwrap_or(ambient)
}

fn spawn_failure(
    script: &str,
    program: &str,
    args: &[&str],
    path: &OsString,
    err: &std::io::Error,
) -> String {
    format!(
        "{script} {program} {}\nPATH = {}\n{err}",
        args.join(" "),
        path.to_string_lossy(),
    )
}
