//! Pull-model capture device interface consumed by the session.
//!
//! Mirrors a shared-mode capture client: the device owns a ring of packets, the
//! caller polls for pending data, leases one packet at a time, and hands it
//! back before asking for the next.

use super::format::AudioFormat;
use crate::error::CaptureError;
use std::time::Duration;

/// Frame count and flags for the packet currently leased from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketInfo {
    pub frames: u32,
    /// Device declined to fill the packet; its bytes must not be read.
    pub silent: bool,
}

/// Entry point that hands out capture devices.
pub trait CaptureHost {
    type Device: CaptureDevice;

    /// Open the default (or preconfigured) input device.
    fn default_capture_device(&self) -> Result<Self::Device, CaptureError>;
}

/// One open input device. Dropping it releases every handle it holds.
pub trait CaptureDevice {
    /// Human-readable device name for logs.
    fn name(&self) -> String {
        "capture device".to_string()
    }

    /// Native shared-mode format of the device.
    fn negotiate_format(&mut self) -> Result<AudioFormat, CaptureError>;

    /// Allocate the shared ring sized for roughly `buffer_duration`.
    fn initialize(
        &mut self,
        format: &AudioFormat,
        buffer_duration: Duration,
    ) -> Result<(), CaptureError>;

    /// Ring capacity in frames, valid after `initialize`.
    fn buffer_frame_count(&self) -> Result<u32, CaptureError>;

    fn start(&mut self) -> Result<(), CaptureError>;

    fn stop(&mut self) -> Result<(), CaptureError>;

    /// Frames in the next pending packet; zero when nothing is queued.
    fn next_packet_size(&mut self) -> Result<u32, CaptureError>;

    /// Lease the next packet. Fails with [`CaptureError::LeaseOutstanding`]
    /// if the previous lease was not released.
    fn get_buffer(&mut self) -> Result<PacketInfo, CaptureError>;

    /// Bytes of the leased packet (`frames * block_align` long).
    fn leased_bytes(&self) -> &[u8];

    /// Return the leased packet to the ring.
    fn release_buffer(&mut self, frames: u32) -> Result<(), CaptureError>;
}
