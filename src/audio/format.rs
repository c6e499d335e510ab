use crate::error::CaptureError;
use std::fmt;

/// Bits per sample the decoder understands.
pub const SUPPORTED_BITS_PER_SAMPLE: u16 = 32;

/// How samples are encoded inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleEncoding {
    /// IEEE-754 float linear PCM (extensible-format float subtype).
    FloatPcm,
    /// Signed or unsigned integer linear PCM.
    IntegerPcm,
    /// Anything the device reports that is not linear PCM.
    Other,
}

impl fmt::Display for SampleEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SampleEncoding::FloatPcm => "float PCM",
            SampleEncoding::IntegerPcm => "integer PCM",
            SampleEncoding::Other => "non-PCM",
        };
        write!(f, "{label}")
    }
}

/// Wire format negotiated with the capture device. Fixed for a whole session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub channels: u16,
    pub bits_per_sample: u16,
    /// Bytes per frame across all channels.
    pub block_align: u16,
    pub sample_rate: u32,
    pub encoding: SampleEncoding,
}

impl AudioFormat {
    /// Packed 32-bit float layout with `channels` interleaved samples per frame.
    pub fn float32(channels: u16, sample_rate: u32) -> Self {
        Self {
            channels,
            bits_per_sample: 32,
            block_align: channels.saturating_mul(4),
            sample_rate,
            encoding: SampleEncoding::FloatPcm,
        }
    }

    pub fn bytes_per_sample(&self) -> usize {
        usize::from(self.bits_per_sample / 8)
    }

    /// Reject anything other than 32-bit float PCM with a coherent frame layout.
    pub fn ensure_supported(&self) -> Result<(), CaptureError> {
        if self.encoding != SampleEncoding::FloatPcm
            || self.bits_per_sample != SUPPORTED_BITS_PER_SAMPLE
        {
            return Err(CaptureError::UnsupportedFormat {
                encoding: self.encoding,
                bits_per_sample: self.bits_per_sample,
            });
        }
        if self.channels == 0 {
            return Err(CaptureError::device(
                "negotiate_format",
                "device reported zero channels",
            ));
        }
        if self.sample_rate == 0 {
            return Err(CaptureError::device(
                "negotiate_format",
                "device reported a zero sample rate",
            ));
        }
        let min_align = u32::from(self.channels) * 4;
        if u32::from(self.block_align) < min_align {
            return Err(CaptureError::device(
                "negotiate_format",
                format!(
                    "block alignment {} too small for {} float channels",
                    self.block_align, self.channels
                ),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}ch {}Hz {}-bit {} (block_align={})",
            self.channels, self.sample_rate, self.bits_per_sample, self.encoding, self.block_align
        )
    }
}
