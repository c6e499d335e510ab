use super::defaults::MAX_DEVICE_NAME_LEN;
use super::{
    AppConfig, SessionConfig, MAX_INTERVAL_MS, MAX_THRESHOLD, MIN_INTERVAL_MS, MIN_THRESHOLD,
};
use crate::error::CaptureError;
use crate::gate::Threshold;
use crate::session::RunMode;
use anyhow::{bail, Result};
use clap::Parser;

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values before any audio device is opened.
    pub fn validate(&self) -> Result<()> {
        if self.once && self.max_cycles.is_some() {
            bail!("--once cannot be combined with --max-cycles");
        }
        if self.max_cycles == Some(0) {
            bail!("--max-cycles must be at least 1");
        }
        if let Some(device) = &self.input_device {
            if device.trim().is_empty() {
                bail!("--input-device cannot be empty");
            }
            if device.len() > MAX_DEVICE_NAME_LEN || device.chars().any(char::is_control) {
                bail!(
                    "--input-device must be <={MAX_DEVICE_NAME_LEN} characters with no control characters"
                );
            }
        }
        self.session_config().validate()?;
        Ok(())
    }

    pub fn run_mode(&self) -> RunMode {
        if self.once {
            RunMode::Single
        } else {
            RunMode::Continuous {
                max_cycles: self.max_cycles,
            }
        }
    }

    /// Snapshot the CLI-controlled session settings.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            interval_ms: self.interval_ms,
            threshold: self.threshold,
            key: self.key,
            strategy: self.decode,
            mode: self.run_mode(),
        }
    }

    /// Whether anything should be logged at all.
    pub fn logging_enabled(&self) -> bool {
        !self.no_logs
    }
}

impl SessionConfig {
    /// Bounds-check the session parameters and return the gate threshold.
    pub fn validate(&self) -> Result<Threshold, CaptureError> {
        if !(MIN_INTERVAL_MS..=MAX_INTERVAL_MS).contains(&self.interval_ms) {
            return Err(CaptureError::config(format!(
                "--interval-ms must be between {MIN_INTERVAL_MS} and {MAX_INTERVAL_MS}, got {}",
                self.interval_ms
            )));
        }
        if !(MIN_THRESHOLD..=MAX_THRESHOLD).contains(&self.threshold) {
            return Err(CaptureError::config(format!(
                "--threshold must be between {MIN_THRESHOLD} and {MAX_THRESHOLD}, got {}",
                self.threshold
            )));
        }
        if self.mode == (RunMode::Continuous { max_cycles: Some(0) }) {
            return Err(CaptureError::config("--max-cycles must be at least 1"));
        }
        Threshold::new(self.threshold as u8)
    }
}
