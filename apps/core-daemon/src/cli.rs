//! [apps/core-daemon/src/cli.rs]
//! CLI surface (§6): a single long-running program, `--config` / `--log-level`
//! / `--shutdown-deadline` and nothing interactive.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "core-daemon", about = "Predictive Orchestration Core daemon")]
pub struct Cli {
    /// Overrides the layered config file path (else `$CORE_CONFIG_PATH`, else `./core.toml`).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Overrides the `RUST_LOG`-style filter derived by `fabric_shared_telemetry::init_tracing`.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Seconds the router and tasks are given to drain on shutdown before a forced exit (§5).
    #[arg(long, default_value_t = 5)]
    pub shutdown_deadline: u64,
}
