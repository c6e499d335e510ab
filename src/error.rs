//! Error kinds surfaced by the capture pipeline.

use crate::audio::SampleEncoding;
use std::fmt::Display;

/// Every failure a capture session can report to its caller.
///
/// Configuration and format errors are raised before the stream starts. All
/// other variants are fatal to a running session and are returned only after
/// the stream has been stopped and every device handle released.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error(
        "unsupported capture format: {bits_per_sample}-bit {encoding} \
         (need 32-bit float PCM)"
    )]
    UnsupportedFormat {
        encoding: SampleEncoding,
        bits_per_sample: u16,
    },

    #[error("audio device call '{op}' failed: {message}")]
    Device { op: &'static str, message: String },

    #[error("capture buffer acquired while a previous lease is still outstanding")]
    LeaseOutstanding,

    #[error("invalid buffer release: expected {expected} frames, got {released}")]
    InvalidRelease { expected: u32, released: u32 },

    #[error("packet of {len} bytes is not a whole number of {block_align}-byte frames")]
    MalformedPacket { len: usize, block_align: u16 },

    #[error("key output failed: {0}")]
    Output(String),
}

impl CaptureError {
    pub fn device(op: &'static str, err: impl Display) -> Self {
        CaptureError::Device {
            op,
            message: err.to_string(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        CaptureError::Configuration(msg.into())
    }

    /// True for errors raised by the audio device itself.
    pub fn is_device_error(&self) -> bool {
        matches!(
            self,
            CaptureError::Device { .. }
                | CaptureError::LeaseOutstanding
                | CaptureError::InvalidRelease { .. }
        )
    }

    /// Short stable label for logs.
    pub fn label(&self) -> &'static str {
        match self {
            CaptureError::Configuration(_) => "configuration",
            CaptureError::UnsupportedFormat { .. } => "unsupported_format",
            CaptureError::Device { .. } => "device",
            CaptureError::LeaseOutstanding => "lease_outstanding",
            CaptureError::InvalidRelease { .. } => "invalid_release",
            CaptureError::MalformedPacket { .. } => "malformed_packet",
            CaptureError::Output(_) => "output",
        }
    }
}
