use crate::channel::DEFAULT_TIMEOUT;
use crate::scenario::SweepTarget;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BIN: &str = "target/release/cortexast";
pub const DEFAULT_TARGET_DIR: &str = "apps/desktop/src";

#[derive(Parser, Debug)]
#[command(name = "cortex-qc")]
#[command(about = "QC sweep over every cortexast MCP tool", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Server binary, spawned as `<bin> mcp` once per request
    #[arg(long, env = "CORTEXAST_BIN", default_value = DEFAULT_BIN)]
    pub bin: PathBuf,

    /// Repository path handed to every tool as `repoPath`
    #[arg(long, env = "CORTEXAST_REPO", default_value = ".")]
    pub repo: String,

    /// Directory to map and pick a symbol from
    #[arg(long, default_value = DEFAULT_TARGET_DIR)]
    pub target_dir: String,

    /// Per-request budget, from spawn to server exit
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub timeout_secs: u64,

    /// Print the sweep report as JSON on stdout; progress moves to stderr
    #[arg(long)]
    pub json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long)]
    pub quiet: bool,
}

/// Resolved settings for one sweep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepConfig {
    pub bin: PathBuf,
    pub target: SweepTarget,
    pub timeout: Duration,
    pub json: bool,
}

impl From<&Cli> for SweepConfig {
    fn from(cli: &Cli) -> Self {
        Self {
            bin: cli.bin.clone(),
            target: SweepTarget {
                repo: cli.repo.clone(),
                target_dir: cli.target_dir.clone(),
            },
            timeout: Duration::from_secs(cli.timeout_secs.max(1)),
            json: cli.json,
        }
    }
}

impl Cli {
    /// `--json` keeps stdout clean, so it implies `--quiet`.
    pub fn log_level(&self) -> Option<log::LevelFilter> {
        if self.quiet || self.json {
            Some(log::LevelFilter::Warn)
        } else if self.verbose {
            Some(log::LevelFilter::Debug)
        } else {
            None
        }
    }
}
