//! Output side: turns each cycle's gate decision into a key state.

mod keys;
#[cfg(windows)]
mod send_input;

pub use keys::KeyCode;
#[cfg(windows)]
pub use send_input::SendInputEmitter;

use crate::audio::Amplitude;
use crate::error::CaptureError;
use crate::gate::{GateState, Threshold};
use crate::session::SessionReport;
use serde::Serialize;
use std::io::Write;

/// Everything decided in one completed cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub peak: Amplitude,
    pub threshold: Threshold,
    pub state: GateState,
    pub packets: u32,
}

/// Sink that asserts or releases the bound key once per cycle.
pub trait KeyEmitter {
    fn emit(&mut self, key: KeyCode, report: &CycleReport) -> Result<(), CaptureError>;
}

impl<E: KeyEmitter + ?Sized> KeyEmitter for Box<E> {
    fn emit(&mut self, key: KeyCode, report: &CycleReport) -> Result<(), CaptureError> {
        (**self).emit(key, report)
    }
}

/// Send a key-up if the session's last cycle left `key` held down.
///
/// Returns whether a release was emitted.
pub fn release_held_key<E: KeyEmitter + ?Sized>(
    emitter: &mut E,
    key: KeyCode,
    threshold: Threshold,
    report: &SessionReport,
) -> Result<bool, CaptureError> {
    if report.last_state != Some(GateState::Active) {
        return Ok(false);
    }
    let release = CycleReport {
        cycle: report.cycles,
        peak: report.last_peak,
        threshold,
        state: GateState::Inactive,
        packets: 0,
    };
    emitter.emit(key, &release)?;
    Ok(true)
}

/// How [`ConsoleEmitter`] renders each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleStyle {
    /// `Y` for active, `N` for inactive.
    #[default]
    Plain,
    /// One JSON object per line.
    Json,
}

#[derive(Serialize)]
struct JsonLine<'a> {
    key: String,
    active: bool,
    #[serde(flatten)]
    report: &'a CycleReport,
}

/// Prints gate decisions instead of synthesizing key events.
pub struct ConsoleEmitter<W: Write> {
    out: W,
    style: ConsoleStyle,
}

impl ConsoleEmitter<std::io::Stdout> {
    pub fn stdout(style: ConsoleStyle) -> Self {
        Self::new(std::io::stdout(), style)
    }
}

impl<W: Write> ConsoleEmitter<W> {
    pub fn new(out: W, style: ConsoleStyle) -> Self {
        Self { out, style }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> KeyEmitter for ConsoleEmitter<W> {
    fn emit(&mut self, key: KeyCode, report: &CycleReport) -> Result<(), CaptureError> {
        let written = match self.style {
            ConsoleStyle::Plain => {
                let flag = if report.state.is_active() { "Y" } else { "N" };
                writeln!(self.out, "{flag}")
            }
            ConsoleStyle::Json => {
                let line = JsonLine {
                    key: key.to_string(),
                    active: report.state.is_active(),
                    report,
                };
                let json = serde_json::to_string(&line)
                    .map_err(|err| CaptureError::Output(err.to_string()))?;
                writeln!(self.out, "{json}")
            }
        };
        written
            .and_then(|_| self.out.flush())
            .map_err(|err| CaptureError::Output(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingEmitter;

    fn report(cycle: u64, peak: u8, state: GateState) -> CycleReport {
        CycleReport {
            cycle,
            peak: Amplitude::new(peak),
            threshold: Threshold::new(50).unwrap(),
            state,
            packets: 3,
        }
    }

    #[test]
    fn plain_console_prints_y_and_n() {
        let mut emitter = ConsoleEmitter::new(Vec::new(), ConsoleStyle::Plain);
        emitter
            .emit(KeyCode::SPACE, &report(1, 60, GateState::Active))
            .unwrap();
        emitter
            .emit(KeyCode::SPACE, &report(2, 10, GateState::Inactive))
            .unwrap();
        let out = String::from_utf8(emitter.into_inner()).unwrap();
        assert_eq!(out, "Y\nN\n");
    }

    #[test]
    fn json_console_prints_one_object_per_cycle() {
        let mut emitter = ConsoleEmitter::new(Vec::new(), ConsoleStyle::Json);
        emitter
            .emit(KeyCode::SPACE, &report(7, 60, GateState::Active))
            .unwrap();
        let out = String::from_utf8(emitter.into_inner()).unwrap();
        let value: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(value["cycle"], 7);
        assert_eq!(value["peak"], 60);
        assert_eq!(value["threshold"], 50);
        assert_eq!(value["active"], true);
        assert_eq!(value["state"], "active");
        assert_eq!(value["key"], "space");
    }

    fn finished(last_state: Option<GateState>) -> SessionReport {
        SessionReport {
            cycles: 12,
            active_cycles: 4,
            packets: 40,
            silent_packets: 2,
            last_peak: Amplitude::new(72),
            last_state,
        }
    }

    #[test]
    fn held_key_is_released_once() {
        let mut emitter = RecordingEmitter::default();
        let threshold = Threshold::new(50).unwrap();
        let released = release_held_key(
            &mut emitter,
            KeyCode::SPACE,
            threshold,
            &finished(Some(GateState::Active)),
        )
        .unwrap();
        assert!(released);
        assert_eq!(emitter.emitted.len(), 1);
        let (key, cycle) = emitter.emitted[0];
        assert_eq!(key, KeyCode::SPACE);
        assert_eq!(cycle.state, GateState::Inactive);
        assert_eq!(cycle.cycle, 12);
        assert_eq!(cycle.peak.value(), 72);
    }

    #[test]
    fn released_or_idle_key_needs_no_release() {
        let threshold = Threshold::new(50).unwrap();
        for last_state in [Some(GateState::Inactive), None] {
            let mut emitter = RecordingEmitter::default();
            let released =
                release_held_key(&mut emitter, KeyCode::SPACE, threshold, &finished(last_state))
                    .unwrap();
            assert!(!released);
            assert!(emitter.emitted.is_empty());
        }
    }

    #[test]
    fn release_failure_is_reported() {
        let mut emitter = RecordingEmitter {
            fail_on_call: Some(1),
            ..RecordingEmitter::default()
        };
        let threshold = Threshold::new(50).unwrap();
        let err = release_held_key(
            &mut emitter,
            KeyCode::SPACE,
            threshold,
            &finished(Some(GateState::Active)),
        )
        .unwrap_err();
        assert!(matches!(err, CaptureError::Output(_)));
    }

    #[test]
    fn boxed_emitter_releases_through_trait_object() {
        let mut emitter: Box<dyn KeyEmitter> =
            Box::new(ConsoleEmitter::new(Vec::new(), ConsoleStyle::Plain));
        let threshold = Threshold::new(50).unwrap();
        assert!(release_held_key(
            emitter.as_mut(),
            KeyCode::SPACE,
            threshold,
            &finished(Some(GateState::Active)),
        )
        .unwrap());
    }
}
