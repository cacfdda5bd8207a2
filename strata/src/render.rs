//! Terminal presentation: status drain, progress bar, run summary.

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use strata_core::{DependencyGraph, RunOptions, RunReport, ScriptStatus, StatusUpdate, Workspace};
use tokio::sync::mpsc;

/// Creates a styled progress bar with enhanced visual appearance.
pub fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/.blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");
    pb.set_style(style);
    pb
}

/// Upper bound on terminal status events for the progress bar. Scripts of
/// skipped packages never start, so the bar may finish short of its length.
pub fn expected_script_count(workspace: &Workspace, options: &RunOptions) -> u64 {
    let kinds = options.build as u64 + options.lint as u64 + options.test as u64;
    workspace.packages.len() as u64 * kinds
}

/// Consumes status events until the scheduler drops its sender, folding them
/// into the report while keeping the progress bar current.
pub async fn drain(
    mut rx: mpsc::UnboundedReceiver<StatusUpdate>,
    mut report: RunReport,
    total: u64,
    quiet: bool,
) -> RunReport {
    let progress = if quiet {
        ProgressBar::hidden()
    } else {
        create_progress_bar(total)
    };
    while let Some(update) = rx.recv().await {
        match update.status {
            ScriptStatus::Running => {
                progress.set_message(format!("{} {}", update.package, update.script));
            }
            _ => progress.inc(1),
        }
        report.apply(update);
    }
    progress.finish_and_clear();
    report
}

/// Prints the per-package result table and the output of every failed
/// script.
pub fn print_summary(report: &RunReport) {
    println!();
    for name in report.packages.keys() {
        match report.package_status(name) {
            Some(ScriptStatus::Success) => {
                println!("  {} {}", "✓".green(), name.green());
            }
            Some(ScriptStatus::Error) => {
                println!("  {} {}", "✗".red(), name.red().bold());
            }
            Some(ScriptStatus::Skip) => {
                println!("  {} {}", "↓".yellow(), name.yellow());
            }
            Some(ScriptStatus::Running) | None => {
                println!("  {} {}", "-".dimmed(), name.dimmed());
            }
        }
    }

    let failures = report.failures();
    if !failures.is_empty() {
        println!();
        for (package, script, output) in failures {
            println!("  {} {} {}", "✗".red(), package.red().bold(), script.red());
            for line in output.lines() {
                println!("    {line}");
            }
        }
    }
}

/// Dumps the discovered workspace and its dependency layers as JSON.
pub fn print_workspace_json(workspace: &Workspace) -> Result<()> {
    let graph = DependencyGraph::build(workspace);
    let layers = graph.layers()?;
    let dump = serde_json::json!({
        "root": workspace.root_dir,
        "packages": workspace.packages,
        "layers": layers,
    });
    println!("{}", serde_json::to_string_pretty(&dump)?);
    Ok(())
}
