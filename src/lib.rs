//! Sound-activated key switch.
//!
//! Samples a live input device, reduces each polling cycle to one 0-100 peak
//! amplitude, and holds a key down for every cycle whose peak reaches the
//! configured threshold.

pub mod audio;
pub mod config;
pub mod error;
pub mod gate;
mod lock;
pub mod output;
pub mod session;
pub mod telemetry;
#[cfg(test)]
mod test_support;

pub(crate) use lock::lock_or_recover;

pub use error::CaptureError;
pub use gate::{gate, GateState, Threshold};
pub use session::{CaptureSession, RunMode, SessionReport, SessionState, StopSignal};
