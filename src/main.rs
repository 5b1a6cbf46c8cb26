use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod annotations;
mod cli;
mod config;
mod golden;
mod reconcile;
mod replace;
mod resolver;
mod util;

use cli::RunArgs;
use config::{RunConfig, RunEnv};
use reconcile::{explain, write_report, Reconciler, RunReport};
use replace::CopyReplace;
use resolver::ProcessResolver;

/// Filter directive variable for diagnostics, e.g. `REQLOCK_LOG=debug`.
const LOG_ENV: &str = "REQLOCK_LOG";

fn main() -> ExitCode {
    init_tracing();

    let args = match RunArgs::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };

    match run(args) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(args: RunArgs) -> Result<u8> {
    let env = RunEnv::from_process();
    let config = RunConfig::from_args(args, &env)?;
    let resolver = ProcessResolver::from_command(&config.resolver_command)?;
    let formatter = annotations::default_formatter();

    let summary = Reconciler::new(&config, &resolver, &formatter, &CopyReplace).run()?;
    explain(&summary, &config, &mut std::io::stderr())?;
    if let Some(path) = &config.report {
        write_report(path, &RunReport::new(&summary, &config))?;
        tracing::info!(
            path = %util::display_path(path, config.workspace_dir.as_deref()),
            "wrote run report"
        );
    }
    Ok(summary.outcome.exit_code())
}
