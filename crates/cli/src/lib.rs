//! Drives a cortexast MCP server over stdio and checks every tool it exposes.

use anyhow::{Context as AnyhowContext, Result};
use clap::Parser;
use std::io::{self, Write};
use std::process::ExitCode;

pub mod channel;
pub mod config;
pub mod error;
pub mod invoker;
pub mod report;
pub mod scenario;

#[cfg(test)]
mod test_support;

pub use channel::{ProcessChannel, Transport};
pub use config::{Cli, SweepConfig};
pub use error::ChannelError;
pub use invoker::ToolInvoker;
pub use report::{Console, StepRecord, SweepReport};
pub use scenario::{CheckpointTags, ScenarioRunner, SweepExit, SweepOutcome, SweepTarget};

fn print_stdout(text: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

fn init_logging(cli: &Cli) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if let Some(level) = cli.log_level() {
        builder.filter_level(level);
    }
    builder.target(env_logger::Target::Stderr).init();
}

/// Runs one sweep and reports it. Transport failures surface as `Err`.
pub async fn run_sweep(cfg: &SweepConfig) -> Result<ExitCode> {
    let mut console = if cfg.json {
        Console::stderr()
    } else {
        Console::stdout()
    };

    if !cfg.bin.is_file() {
        console.line(&format!(
            "ERROR: cortexast binary not found at: {}",
            cfg.bin.display()
        ));
        console.line("Build it with: cargo build --release");
        if cfg.json {
            let mut report = SweepReport::default();
            report.record(StepRecord::check(
                "binary check",
                false,
                true,
                format!("not found: {}", cfg.bin.display()),
            ));
            report.exit_code = SweepExit::BinaryNotFound.code();
            print_stdout(&report.to_json()?)?;
        }
        return Ok(SweepExit::BinaryNotFound.into());
    }

    log::info!(
        "sweeping {} (repo {}, target {})",
        cfg.bin.display(),
        cfg.target.repo,
        cfg.target.target_dir
    );
    let channel = ProcessChannel::new(&cfg.bin).with_timeout(cfg.timeout);
    let runner = ScenarioRunner::new(ToolInvoker::new(channel), cfg.target.clone(), console);
    let outcome = runner
        .run()
        .await
        .with_context(|| format!("QC sweep against {} aborted", cfg.bin.display()))?;

    if cfg.json {
        print_stdout(&outcome.report.to_json()?)?;
    }
    Ok(outcome.exit.into())
}

pub async fn main_entry() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(&cli);
    run_sweep(&SweepConfig::from(&cli)).await
}
