use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cycle::{CycleArgs, run_cycle};
use crate::error::Result;

/// Environment variable holding the tracing filter directive.
pub const LOG_ENV: &str = "XRANDR_CYCLE_LOG";

#[derive(Debug, Parser)]
#[command(
    name = "xrandr_cycle",
    about = "Cycle each connected output through its best mode per aspect ratio and screenshot it",
    version
)]
pub struct Cli {
    #[command(flatten)]
    pub cycle: CycleArgs,
}

/// Installs the stderr log subscriber; later calls are no-ops.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run_from_env() -> Result<()> {
    let cli = Cli::parse();
    run(cli)
}

pub fn run(cli: Cli) -> Result<()> {
    run_cycle(cli.cycle)
}
