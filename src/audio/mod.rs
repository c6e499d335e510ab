//! Capture side of the pipeline.
//!
//! Packets are pulled from a capture device, leased one at a time, decoded to a
//! 0-100 peak amplitude, and folded into a per-cycle peak. The CPAL backend
//! adapts a live microphone to that pull model.

mod decode;
mod device;
mod dispatch;
mod drain;
mod format;
mod lease;
mod recorder;

pub use decode::{decode_peak, Amplitude, DecodeStrategy, MAX_AMPLITUDE};
pub use device::{CaptureDevice, CaptureHost, PacketInfo};
pub use drain::{drain_packets, DrainOutcome};
pub use format::{AudioFormat, SampleEncoding, SUPPORTED_BITS_PER_SAMPLE};
pub use lease::BufferLease;
pub use recorder::{CpalDevice, CpalHost};
