//! Capture session lifecycle.
//!
//! A session validates its configuration, opens the capture device, checks the
//! negotiated format, starts the stream and then repeats the cycle
//! (sleep, drain, gate, emit) until told to stop. The stream is stopped exactly
//! once on every exit path after it started, and the device handle is dropped
//! (releasing everything it holds) before `run` returns.

mod stream;
#[cfg(test)]
mod tests;

use crate::audio::{drain_packets, Amplitude, AudioFormat, CaptureDevice, CaptureHost, DrainOutcome};
use crate::config::SessionConfig;
use crate::error::CaptureError;
use crate::gate::{gate, GateState, Threshold};
use crate::output::{CycleReport, KeyEmitter};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stream::ActiveStream;

/// Lifecycle states. `Stopped` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Initializing,
    Recording,
    Stopping,
    Stopped,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Stopped | SessionState::Failed)
    }
}

/// How many cycles a session runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// One cycle, then stop.
    Single,
    /// Until the stop signal is raised, or `max_cycles` cycles complete.
    Continuous { max_cycles: Option<u64> },
}

impl RunMode {
    fn is_complete(self, cycles: u64) -> bool {
        match self {
            RunMode::Single => cycles >= 1,
            RunMode::Continuous { max_cycles } => max_cycles.is_some_and(|max| cycles >= max),
        }
    }
}

impl Default for RunMode {
    fn default() -> Self {
        RunMode::Continuous { max_cycles: None }
    }
}

/// Cooperative stop request, checked once per cycle.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_flag(flag: Arc<AtomicBool>) -> Self {
        Self { flag }
    }

    pub fn raise(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Totals for a finished session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    pub cycles: u64,
    pub active_cycles: u64,
    pub packets: u64,
    pub silent_packets: u64,
    pub last_peak: Amplitude,
    pub last_state: Option<GateState>,
}

impl SessionReport {
    fn record(&mut self, cycle: &CycleReport, drained: &DrainOutcome) {
        self.cycles = cycle.cycle;
        if cycle.state.is_active() {
            self.active_cycles += 1;
        }
        self.packets += u64::from(drained.packets);
        self.silent_packets += u64::from(drained.silent_packets);
        self.last_peak = cycle.peak;
        self.last_state = Some(cycle.state);
    }
}

/// Half the nominal fill time of a `buffer_frames` ring at `sample_rate`.
pub fn pacing_interval(buffer_frames: u32, sample_rate: u32) -> Result<Duration, CaptureError> {
    if sample_rate == 0 {
        return Err(CaptureError::device(
            "get_buffer_size",
            "cannot pace a zero sample rate",
        ));
    }
    let fill_micros = u64::from(buffer_frames) * 1_000_000 / u64::from(sample_rate);
    Ok(Duration::from_micros(fill_micros / 2))
}

/// One capture run against a host, driving `emitter` once per cycle.
pub struct CaptureSession<E: KeyEmitter> {
    config: SessionConfig,
    emitter: E,
    state: SessionState,
    report: SessionReport,
}

impl<E: KeyEmitter> CaptureSession<E> {
    pub fn new(config: SessionConfig, emitter: E) -> Self {
        Self {
            config,
            emitter,
            state: SessionState::Idle,
            report: SessionReport::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn report(&self) -> &SessionReport {
        &self.report
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn emitter(&self) -> &E {
        &self.emitter
    }

    pub fn into_emitter(self) -> E {
        self.emitter
    }

    /// Run the session to completion.
    ///
    /// Configuration errors return before the host is touched. Every other
    /// error returns after the stream has been stopped (if it started) and the
    /// device released.
    pub fn run<H: CaptureHost>(
        &mut self,
        host: &H,
        stop: &StopSignal,
    ) -> Result<SessionReport, CaptureError> {
        if self.state != SessionState::Idle {
            return Err(CaptureError::config(format!(
                "session already used (state {:?})",
                self.state
            )));
        }
        self.transition(SessionState::Initializing);
        let threshold = match self.config.validate() {
            Ok(threshold) => threshold,
            Err(err) => {
                self.transition(SessionState::Failed);
                return Err(err);
            }
        };

        match self.capture(host, threshold, stop) {
            Ok(()) => {
                self.transition(SessionState::Stopped);
                tracing::info!(
                    cycles = self.report.cycles,
                    active = self.report.active_cycles,
                    packets = self.report.packets,
                    "capture session stopped"
                );
                Ok(self.report.clone())
            }
            Err(err) => {
                tracing::error!(kind = err.label(), error = %err, "capture session failed");
                self.transition(SessionState::Failed);
                Err(err)
            }
        }
    }

    fn capture<H: CaptureHost>(
        &mut self,
        host: &H,
        threshold: Threshold,
        stop: &StopSignal,
    ) -> Result<(), CaptureError> {
        // Dropped on every return path below, releasing all device handles.
        let mut device = host.default_capture_device()?;
        let format = device.negotiate_format()?;
        format.ensure_supported()?;
        device.initialize(&format, self.config.interval())?;
        let buffer_frames = device.buffer_frame_count()?;
        let pacing = pacing_interval(buffer_frames, format.sample_rate)?;
        tracing::info!(
            device = %device.name(),
            %format,
            buffer_frames,
            pacing_us = pacing.as_micros() as u64,
            decode = self.config.strategy.label(),
            "capture device ready"
        );

        let mut stream = ActiveStream::start(&mut device)?;
        self.transition(SessionState::Recording);
        let recorded = self.record_cycles(stream.device(), &format, threshold, pacing, stop);
        self.transition(SessionState::Stopping);
        let stopped = stream.stop();
        recorded.and(stopped)
    }

    fn record_cycles<D: CaptureDevice>(
        &mut self,
        device: &mut D,
        format: &AudioFormat,
        threshold: Threshold,
        pacing: Duration,
        stop: &StopSignal,
    ) -> Result<(), CaptureError> {
        let mut cycle = 0u64;
        loop {
            if stop.is_raised() {
                tracing::info!(cycle, "stop requested");
                return Ok(());
            }
            std::thread::sleep(pacing);

            let drained = drain_packets(device, format, self.config.strategy)?;
            cycle += 1;
            let report = CycleReport {
                cycle,
                peak: drained.peak,
                threshold,
                state: gate(drained.peak, threshold),
                packets: drained.packets,
            };
            self.emitter.emit(self.config.key, &report)?;
            self.report.record(&report, &drained);

            if self.config.mode.is_complete(cycle) {
                return Ok(());
            }
        }
    }

    fn transition(&mut self, next: SessionState) {
        tracing::debug!(from = ?self.state, to = ?next, "session state");
        self.state = next;
    }
}
