use clap::Parser;
use std::path::PathBuf;

use crate::core::scripted::StallScript;

// Build version with engine info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Engine: scripted (deterministic timing double)\n",
    "Target: ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Video transport controller with stall recovery
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    /// Path to the bundled video file (extension-validated; content is simulated)
    #[arg(value_name = "FILE")]
    pub file_path: Option<PathBuf>,

    /// Simulated media duration in seconds
    #[arg(short = 'd', long = "duration", value_name = "SECS", default_value_t = 30.0)]
    pub duration: f64,

    /// Scripted stall: AT STARVE (position in seconds, starvation in seconds).
    /// Repeat the flag for multiple stalls.
    #[arg(long = "stall", value_names = ["AT", "STARVE"], num_args = 2, action = clap::ArgAction::Append)]
    pub stall: Vec<f64>,

    /// Scrub to POSITION (seconds) mid-run, exercising manual-control cancellation
    #[arg(long = "scrub-to", value_name = "SECS")]
    pub scrub_to: Option<f64>,

    /// Enable debug logging to file (default: playhead.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}

impl Args {
    /// Pair up the flattened `--stall AT STARVE` values.
    pub fn stall_scripts(&self) -> Vec<StallScript> {
        self.stall
            .chunks(2)
            .filter(|pair| pair.len() == 2)
            .map(|pair| StallScript { at: pair[0], starve_for: pair[1] })
            .collect()
    }
}
