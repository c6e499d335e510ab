//! Packet ring shared between a push-style audio callback and the polling
//! session.
//!
//! A fixed pool of byte buffers circulates through two bounded channels: the
//! callback takes a free buffer, fills it with one packet and queues it; the
//! session leases queued packets and recycles them on release. Nothing is
//! allocated once the pool exists.

use super::device::PacketInfo;
use crate::error::CaptureError;
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError, TrySendError};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

pub(super) struct RingPacket {
    bytes: Vec<u8>,
    frames: u32,
    silent: bool,
}

/// Build a ring of `slots` packets, each holding up to `packet_frames` frames.
pub(super) fn packet_ring(
    slots: usize,
    packet_frames: usize,
    channels: usize,
    bytes_per_sample: usize,
) -> (PacketDispatcher, PacketRing) {
    let slots = slots.max(1);
    let channels = channels.max(1);
    let packet_frames = packet_frames.max(1);
    let packet_bytes = packet_frames * channels * bytes_per_sample;
    let (free_tx, free_rx) = bounded::<Vec<u8>>(slots);
    let (filled_tx, filled_rx) = bounded::<RingPacket>(slots);
    for _ in 0..slots {
        // Channel has room for exactly `slots` buffers.
        let _ = free_tx.try_send(Vec::with_capacity(packet_bytes));
    }
    let dropped = Arc::new(AtomicUsize::new(0));
    let dispatcher = PacketDispatcher {
        frame_samples: packet_frames * channels,
        channels,
        free: free_rx,
        recycle: free_tx.clone(),
        filled: filled_tx,
        dropped: dropped.clone(),
    };
    let ring = PacketRing {
        filled: filled_rx,
        free: free_tx,
        pending: None,
        leased: None,
        dropped,
    };
    (dispatcher, ring)
}

/// Callback-side writer.
pub(super) struct PacketDispatcher {
    frame_samples: usize,
    channels: usize,
    free: Receiver<Vec<u8>>,
    recycle: Sender<Vec<u8>>,
    filled: Sender<RingPacket>,
    dropped: Arc<AtomicUsize>,
}

impl PacketDispatcher {
    /// Split interleaved samples into packets, encoding each sample with
    /// `encode`. Packets that find no free buffer are counted as dropped.
    pub(super) fn push<T, F, const N: usize>(&mut self, data: &[T], mut encode: F)
    where
        T: Copy,
        F: FnMut(T) -> [u8; N],
    {
        for chunk in data.chunks(self.frame_samples) {
            let frames = chunk.len() / self.channels;
            if frames == 0 {
                continue;
            }
            let mut bytes = match self.free.try_recv() {
                Ok(bytes) => bytes,
                Err(_) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    continue;
                }
            };
            bytes.clear();
            for sample in &chunk[..frames * self.channels] {
                bytes.extend_from_slice(&encode(*sample));
            }
            let silent = bytes.iter().all(|byte| *byte == 0);
            let packet = RingPacket {
                bytes,
                frames: frames as u32,
                silent,
            };
            match self.filled.try_send(packet) {
                Ok(()) => {}
                Err(TrySendError::Full(packet)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    let _ = self.recycle.try_send(packet.bytes);
                }
                Err(TrySendError::Disconnected(_)) => break,
            }
        }
    }
}

/// Session-side view of the ring.
pub(super) struct PacketRing {
    filled: Receiver<RingPacket>,
    free: Sender<Vec<u8>>,
    pending: Option<RingPacket>,
    leased: Option<RingPacket>,
    dropped: Arc<AtomicUsize>,
}

impl PacketRing {
    pub(super) fn next_packet_frames(&mut self) -> Result<u32, CaptureError> {
        if self.pending.is_none() {
            match self.filled.try_recv() {
                Ok(packet) => self.pending = Some(packet),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    return Err(CaptureError::device(
                        "get_next_packet_size",
                        "capture stream disconnected",
                    ));
                }
            }
        }
        Ok(self.pending.as_ref().map_or(0, |packet| packet.frames))
    }

    pub(super) fn lease(&mut self) -> Result<PacketInfo, CaptureError> {
        if self.leased.is_some() {
            return Err(CaptureError::LeaseOutstanding);
        }
        let packet = match self.pending.take() {
            Some(packet) => packet,
            None => self
                .filled
                .try_recv()
                .map_err(|_| CaptureError::device("get_buffer", "no packet pending"))?,
        };
        let info = PacketInfo {
            frames: packet.frames,
            silent: packet.silent,
        };
        self.leased = Some(packet);
        Ok(info)
    }

    pub(super) fn leased_bytes(&self) -> &[u8] {
        self.leased
            .as_ref()
            .map_or(&[][..], |packet| packet.bytes.as_slice())
    }

    /// Recycle the leased buffer. A frame-count mismatch is reported but the
    /// buffer still goes back to the pool.
    pub(super) fn release(&mut self, frames: u32) -> Result<(), CaptureError> {
        let Some(mut packet) = self.leased.take() else {
            return Err(CaptureError::InvalidRelease {
                expected: 0,
                released: frames,
            });
        };
        let expected = packet.frames;
        packet.bytes.clear();
        let _ = self.free.try_send(packet.bytes);
        if expected != frames {
            return Err(CaptureError::InvalidRelease {
                expected,
                released: frames,
            });
        }
        Ok(())
    }

    pub(super) fn dropped_packets(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    #[cfg(test)]
    pub(super) fn free_slots(&self) -> usize {
        self.free.len()
    }
}
