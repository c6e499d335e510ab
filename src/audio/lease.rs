use super::decode::{decode_peak, Amplitude, DecodeStrategy};
use super::device::{CaptureDevice, PacketInfo};
use super::format::AudioFormat;
use crate::error::CaptureError;

/// Scoped ownership of one device packet.
///
/// The packet goes back to the device exactly once: through [`release`] on
/// the happy path, or from `Drop` when processing bails out early. The lease
/// borrows the device mutably, so no other device call can run while it lives.
///
/// [`release`]: BufferLease::release
pub struct BufferLease<'a, D: CaptureDevice> {
    device: &'a mut D,
    info: PacketInfo,
    released: bool,
}

impl<'a, D: CaptureDevice> BufferLease<'a, D> {
    pub fn acquire(device: &'a mut D) -> Result<Self, CaptureError> {
        let info = device.get_buffer()?;
        Ok(Self {
            device,
            info,
            released: false,
        })
    }

    pub fn frames(&self) -> u32 {
        self.info.frames
    }

    pub fn is_silent(&self) -> bool {
        self.info.silent
    }

    /// Packet bytes, or `None` when the device flagged the packet silent.
    pub fn bytes(&self) -> Option<&[u8]> {
        if self.info.silent {
            None
        } else {
            Some(self.device.leased_bytes())
        }
    }

    pub fn decode(
        &self,
        format: &AudioFormat,
        strategy: DecodeStrategy,
    ) -> Result<Amplitude, CaptureError> {
        decode_peak(format, self.bytes(), strategy)
    }

    /// Hand the packet back, surfacing any device error.
    pub fn release(mut self) -> Result<(), CaptureError> {
        self.released = true;
        self.device.release_buffer(self.info.frames)
    }
}

impl<D: CaptureDevice> Drop for BufferLease<'_, D> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(err) = self.device.release_buffer(self.info.frames) {
            tracing::warn!(error = %err, frames = self.info.frames, "buffer release on unwind failed");
        }
    }
}
