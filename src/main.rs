//! rolling_log_helper - timestamp stdin lines into daily rolling log files
//!
//! # Usage
//!
//! ```bash
//! my-service 2>&1 | rolling_log_helper /var/log/my-service/service.log
//! my-service | rolling_log_helper --debug --link=false ./logs/service.log
//! ```

use {
    anyhow::{Context, Result},
    clap::{ArgAction, Parser},
    rolling_log_helper::{HelperConfig, LineSink},
    std::{io, path::PathBuf},
    tracing::{Level, debug},
};

/// Augment stdin with per line timestamps and append to rolling dated log files
#[derive(Parser, Debug)]
#[command(name = "rolling_log_helper")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log file to write, e.g. /var/log/app/app.log
    output: PathBuf,

    /// Log to console as well as file
    #[arg(short, long)]
    debug: bool,

    /// Keep a symbolic link at the output path pointing to the active file
    #[arg(
        short,
        long,
        action = ArgAction::Set,
        default_value_t = true,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_name = "BOOL"
    )]
    link: bool,
}

impl From<Cli> for HelperConfig {
    fn from(cli: Cli) -> Self {
        HelperConfig::new(cli.output, cli.debug, cli.link)
    }
}

fn main() -> Result<()> {
    let config = HelperConfig::from(Cli::parse());
    init_logging(config.console())?;

    let mut writer = config
        .build_writer()
        .with_context(|| format!("failed to set up logging to {}", config.output().display()))?;
    debug!(?config, "writing stdin");

    let lines = LineSink::new(io::stdin().lock())
        .console(config.console())
        .run(&mut writer)
        .with_context(|| format!("failed to log to {}", config.output().display()))?;
    debug!(lines, "end of input");

    Ok(())
}

/// Initialize the diagnostic console on stderr.
fn init_logging(console: bool) -> Result<()> {
    let level = if console { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_max_level(level)
        .with_ansi(false)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))
}
