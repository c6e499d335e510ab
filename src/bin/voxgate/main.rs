//! VoxGate entrypoint: holds a key down while the microphone is loud.
//!
//! Parses and validates the CLI, wires Ctrl-C into the session stop signal,
//! runs one capture session against the default (or selected) input device,
//! and makes sure an injected key is not left held down on exit.

mod cli_utils;
mod signal;

use anyhow::{Context, Result};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use voxgate::audio::CpalHost;
use voxgate::config::AppConfig;
use voxgate::output::release_held_key;
use voxgate::telemetry::{init_tracing, tracing_log_path};
use voxgate::{CaptureSession, StopSignal};

use crate::cli_utils::{build_emitter, list_input_devices, prints_decisions};

fn main() -> Result<()> {
    let config = AppConfig::parse_args()?;
    if config.list_input_devices {
        list_input_devices()?;
        return Ok(());
    }

    init_tracing(&config);
    if config.logs && config.logging_enabled() {
        tracing::info!(path = %tracing_log_path().display(), "=== VoxGate started ===");
    }

    let flag = Arc::new(AtomicBool::new(false));
    if let Err(err) = signal::install_stop_handler(flag.clone()) {
        tracing::warn!(error = %err, "Ctrl-C will not stop the session cleanly");
    }
    let stop = StopSignal::from_flag(flag);

    let session_config = config.session_config();
    let threshold = session_config.validate()?;
    let host = CpalHost::new(config.input_device.clone());
    let mut session = CaptureSession::new(session_config, build_emitter(&config));
    let outcome = session.run(&host, &stop);

    let report = session.report().clone();
    let key = session.config().key;
    let mut emitter = session.into_emitter();
    if !prints_decisions(&config) {
        if let Err(err) = release_held_key(emitter.as_mut(), key, threshold, &report) {
            tracing::warn!(error = %err, "failed to release held key on exit");
        }
    }

    let report = outcome.context("capture session failed")?;
    if config.verbose {
        eprintln!(
            "voxgate: {} cycles, {} active, {} packets ({} silent)",
            report.cycles, report.active_cycles, report.packets, report.silent_packets
        );
    }
    Ok(())
}
