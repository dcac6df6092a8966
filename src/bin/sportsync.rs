// ABOUTME: Command-line entry point running the activity and measurement syncs once
// ABOUTME: Exits non-zero only when every requested sync kind failed
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

//! Usage:
//! ```bash
//! # Sync everything new since the last run
//! sportsync
//!
//! # Re-send the whole look-back window
//! sportsync --force
//!
//! # Only the scale measurements, with a custom state file
//! sportsync --only measurements --state-file ~/.config/sportsync.yml
//! ```

use anyhow::Result;
use clap::{Parser, ValueEnum};
use sportsync::bootstrap::build_orchestrator;
use sportsync::logging::LoggingConfig;
use sportsync::models::SyncKind;
use sportsync::{RunOptions, SyncConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(
    name = "sportsync",
    version,
    about = "Sync scale measurements and tracker activities",
    long_about = "Push new scale measurements to Garmin Connect and Strava, and new Garmin activities to Strava. Tokens and watermarks live in the state file."
)]
struct Args {
    /// Ignore the stored watermark within the look-back window and sync even
    /// when nothing new was found
    #[arg(long)]
    force: bool,

    /// State file override (default: SPORTSYNC_STATE_FILE or sportsync.yml)
    #[arg(long, value_name = "PATH")]
    state_file: Option<PathBuf>,

    /// Run a single sync kind
    #[arg(long, value_enum)]
    only: Option<KindArg>,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Activities,
    Measurements,
}

impl From<KindArg> for SyncKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Activities => Self::Activities,
            KindArg::Measurements => Self::Measurements,
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let logging = LoggingConfig::from_env();
    let logging = if args.verbose { logging.verbose() } else { logging };
    logging.init()?;

    let mut config = SyncConfig::from_env()?;
    if let Some(path) = args.state_file {
        config = config.with_state_file(path);
    }

    let orchestrator = match build_orchestrator(&config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            error!(error = %e, "Failed to start sync");
            return Ok(ExitCode::FAILURE);
        }
    };

    let options = RunOptions {
        force: args.force,
        kinds: args
            .only
            .map_or_else(|| SyncKind::ALL.to_vec(), |kind| vec![kind.into()]),
    };
    let report = orchestrator.run(&options).await;

    info!(
        force = options.force,
        all_failed = report.all_failed(),
        "Run complete"
    );
    Ok(ExitCode::from(report.exit_code()))
}
