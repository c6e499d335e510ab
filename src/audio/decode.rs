//! Peak amplitude decoding for packed 32-bit float frames.

use super::format::AudioFormat;
use crate::error::CaptureError;
use clap::ValueEnum;
use serde::Serialize;

/// Largest amplitude on the 0-100 scale.
pub const MAX_AMPLITUDE: u8 = 100;

const FLOAT_BYTES: usize = 4;

/// Peak sample magnitude scaled to 0..=100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Amplitude(u8);

impl Amplitude {
    pub const SILENT: Amplitude = Amplitude(0);

    /// Clamps to [`MAX_AMPLITUDE`].
    pub fn new(value: u8) -> Self {
        Self(value.min(MAX_AMPLITUDE))
    }

    /// Scale a normalized sample magnitude with `round(|x| * 100)`.
    pub fn from_normalized(sample: f32) -> Self {
        let scaled = (sample.abs() * 100.0).round();
        if scaled.is_nan() {
            return Self::SILENT;
        }
        Self(scaled.clamp(0.0, f32::from(MAX_AMPLITUDE)) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

/// Which channel slots of each frame contribute to the peak.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum DecodeStrategy {
    /// Read channel 0 of every frame only.
    #[default]
    FirstChannel,
    /// Loudest channel of every frame.
    PeakChannel,
    /// Average all channels of a frame, then take the magnitude.
    Downmix,
}

impl DecodeStrategy {
    pub fn label(self) -> &'static str {
        match self {
            DecodeStrategy::FirstChannel => "first-channel",
            DecodeStrategy::PeakChannel => "peak-channel",
            DecodeStrategy::Downmix => "downmix",
        }
    }
}

/// Decode one packet's bytes into its peak amplitude.
///
/// `None` is the silence marker and short-circuits to zero without touching
/// memory. The byte run must hold whole frames of `format.block_align` bytes.
/// Callers are expected to have passed `format` through
/// [`AudioFormat::ensure_supported`].
pub fn decode_peak(
    format: &AudioFormat,
    data: Option<&[u8]>,
    strategy: DecodeStrategy,
) -> Result<Amplitude, CaptureError> {
    let Some(bytes) = data else {
        return Ok(Amplitude::SILENT);
    };
    let block_align = usize::from(format.block_align);
    let channels = usize::from(format.channels);
    if block_align < FLOAT_BYTES || bytes.len() % block_align != 0 {
        return Err(CaptureError::MalformedPacket {
            len: bytes.len(),
            block_align: format.block_align,
        });
    }
    // Channel slots that actually fit inside a frame.
    let channels = channels.clamp(1, block_align / FLOAT_BYTES);

    let mut peak = 0.0f32;
    for frame in bytes.chunks_exact(block_align) {
        let magnitude = match strategy {
            DecodeStrategy::FirstChannel => read_sample(frame, 0).abs(),
            DecodeStrategy::PeakChannel => (0..channels)
                .map(|ch| read_sample(frame, ch).abs())
                .fold(0.0f32, f32::max),
            DecodeStrategy::Downmix => {
                let sum: f32 = (0..channels).map(|ch| read_sample(frame, ch)).sum();
                (sum / channels as f32).abs()
            }
        };
        // NaN never compares greater, so corrupt samples cannot poison the peak.
        if magnitude > peak {
            peak = magnitude;
        }
    }
    Ok(Amplitude::from_normalized(peak))
}

fn read_sample(frame: &[u8], channel: usize) -> f32 {
    let offset = channel * FLOAT_BYTES;
    let mut raw = [0u8; FLOAT_BYTES];
    raw.copy_from_slice(&frame[offset..offset + FLOAT_BYTES]);
    f32::from_le_bytes(raw)
}
