use super::decode::{Amplitude, DecodeStrategy};
use super::device::CaptureDevice;
use super::format::AudioFormat;
use super::lease::BufferLease;
use crate::error::CaptureError;

/// What one drain pass pulled out of the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainOutcome {
    pub peak: Amplitude,
    pub packets: u32,
    pub silent_packets: u32,
    pub frames: u64,
}

/// Consume every pending packet and fold their peaks.
///
/// Each packet is leased, decoded and released before the next pending-size
/// query. The loop never waits for new data: it ends as soon as the device
/// reports nothing pending. Any device error aborts the pass.
pub fn drain_packets<D: CaptureDevice>(
    device: &mut D,
    format: &AudioFormat,
    strategy: DecodeStrategy,
) -> Result<DrainOutcome, CaptureError> {
    let mut outcome = DrainOutcome::default();
    while device.next_packet_size()? != 0 {
        let lease = BufferLease::acquire(device)?;
        let amplitude = lease.decode(format, strategy)?;
        let frames = lease.frames();
        let silent = lease.is_silent();
        lease.release()?;

        outcome.peak = outcome.peak.max(amplitude);
        outcome.packets += 1;
        outcome.frames += u64::from(frames);
        if silent {
            outcome.silent_packets += 1;
        }
    }
    tracing::debug!(
        packets = outcome.packets,
        silent = outcome.silent_packets,
        peak = outcome.peak.value(),
        "drain complete"
    );
    Ok(outcome)
}
