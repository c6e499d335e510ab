//! Command-line parsing and validation helpers.

mod defaults;
mod validation;

use crate::audio::DecodeStrategy;
use crate::output::KeyCode;
use crate::session::RunMode;
use clap::Parser;
use std::time::Duration;

pub use defaults::{
    DEFAULT_INTERVAL_MS, DEFAULT_KEY, DEFAULT_THRESHOLD, MAX_INTERVAL_MS, MAX_THRESHOLD,
    MIN_INTERVAL_MS, MIN_THRESHOLD,
};

/// CLI options for VoxGate.
#[derive(Debug, Parser, Clone)]
#[command(
    about = "VoxGate: hold a key down while the microphone is louder than a threshold",
    author,
    version
)]
pub struct AppConfig {
    /// Polling interval and device buffer length (milliseconds, 1-10000)
    #[arg(long = "interval-ms", env = "VOXGATE_INTERVAL_MS", default_value_t = DEFAULT_INTERVAL_MS)]
    pub interval_ms: u64,

    /// Peak amplitude (0-100) at or above which the key is held
    #[arg(long, env = "VOXGATE_THRESHOLD", default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: u32,

    /// Key to hold: a name (space, enter, f13, a), or a virtual-key code (0x20)
    #[arg(long, default_value = DEFAULT_KEY)]
    pub key: KeyCode,

    /// Which channels contribute to the peak
    #[arg(long, value_enum, default_value_t = DecodeStrategy::FirstChannel)]
    pub decode: DecodeStrategy,

    /// Run a single polling cycle and exit
    #[arg(long, default_value_t = false)]
    pub once: bool,

    /// Stop after this many cycles
    #[arg(long = "max-cycles")]
    pub max_cycles: Option<u64>,

    /// Preferred audio input device name
    #[arg(long)]
    pub input_device: Option<String>,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// Print gate decisions instead of sending key events
    #[arg(long = "dry-run", default_value_t = false)]
    pub dry_run: bool,

    /// Print one JSON object per cycle (implies --dry-run output)
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Enable JSON trace logging to a file
    #[arg(long = "logs", env = "VOXGATE_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all logging (overrides --logs)
    #[arg(long = "no-logs", env = "VOXGATE_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Verbose stderr diagnostics
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

/// Parameters a capture session runs with. Checked by
/// [`SessionConfig::validate`] before any device is opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub interval_ms: u64,
    pub threshold: u32,
    pub key: KeyCode,
    pub strategy: DecodeStrategy,
    pub mode: RunMode,
}

impl SessionConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            threshold: DEFAULT_THRESHOLD,
            key: KeyCode::default(),
            strategy: DecodeStrategy::default(),
            mode: RunMode::default(),
        }
    }
}
