mod render;

use std::env;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use strata_core::{
    discover, DepFailurePolicy, DiscoveryOptions, ProcessExecutor, RunOptions, RunReport,
    Scheduler,
};
use tokio::sync::mpsc;
use tracing::Level;

#[derive(Parser)]
#[command(name = "strata")]
#[command(about = "Dependency-aware workspace script orchestrator")]
struct Cli {
    /// Run build scripts in dependency order.
    #[arg(short, long, action)]
    build: bool,

    /// Run lint scripts.
    #[arg(short, long, action)]
    lint: bool,

    /// Run test scripts.
    #[arg(short, long, action)]
    test: bool,

    /// Attempt dependent builds even when a dependency's build failed.
    #[arg(long, action)]
    proceed_on_dep_failure: bool,

    /// Script runner program, invoked as `<runner> run <script>`.
    #[arg(long, default_value = "yarn")]
    runner: String,

    /// Extra argument appended to every test script. Repeatable.
    #[arg(long = "test-arg", value_name = "ARG")]
    test_args: Vec<String>,

    /// Print the discovered workspace and its dependency layers as JSON,
    /// then exit without running anything.
    #[arg(long, action)]
    workspace_json: bool,

    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(short, long, action)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let log_level = if cli.quiet {
        Level::ERROR
    } else {
        match cli.verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    };

    tracing_subscriber::fmt().with_max_level(log_level).init();

    let cwd = env::current_dir().context("cannot determine working directory")?;
    let workspace = discover(&cwd, &DiscoveryOptions::default())?;

    if cli.workspace_json {
        render::print_workspace_json(&workspace)?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut options = RunOptions::from_flags(cli.build, cli.lint, cli.test);
    if cli.proceed_on_dep_failure {
        options.dep_failure = DepFailurePolicy::Proceed;
    }
    options.test_args = cli.test_args;

    let executor = ProcessExecutor::new(cli.runner).with_run_args(vec!["run".to_string()]);
    let report = RunReport::with_packages(workspace.packages.keys().cloned());
    let total = render::expected_script_count(&workspace, &options);

    let (tx, rx) = mpsc::unbounded_channel();
    let scheduler = Scheduler::new(workspace, executor, options, tx);
    let drain = tokio::spawn(render::drain(rx, report, total, cli.quiet));

    let run_result = scheduler.run().await;
    drop(scheduler);
    let report = drain.await.context("status drain task failed")?;
    run_result?;

    if !cli.quiet {
        render::print_summary(&report);
    }

    if report.has_failures() {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
