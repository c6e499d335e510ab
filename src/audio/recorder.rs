//! System microphone capture via CPAL.
//!
//! CPAL pushes samples from its own callback thread, so this backend rebuilds a
//! shared-mode pull interface on top: callbacks feed a fixed packet ring and the
//! session drains it with the usual pending-size / lease / release calls.

use super::device::{CaptureDevice, CaptureHost, PacketInfo};
use super::dispatch::{packet_ring, PacketRing};
use super::format::{AudioFormat, SampleEncoding};
use crate::error::CaptureError;
use crate::lock_or_recover;
use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, SampleFormat, StreamConfig, SupportedBufferSize, SupportedStreamConfig};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Longest packet the ring hands out, in milliseconds of audio.
const PACKET_MS: u32 = 10;

/// Opens CPAL input devices, optionally pinned to one device name.
#[derive(Debug, Clone, Default)]
pub struct CpalHost {
    preferred_device: Option<String>,
}

impl CpalHost {
    pub fn new(preferred_device: Option<String>) -> Self {
        Self { preferred_device }
    }

    /// List microphone names so the CLI can expose a human-friendly selector.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();
        let devices = host.input_devices().context("no input devices available")?;
        let mut names = Vec::new();
        for device in devices {
            if let Ok(name) = device.name() {
                names.push(name);
            }
        }
        Ok(names)
    }
}

impl CaptureHost for CpalHost {
    type Device = CpalDevice;

    fn default_capture_device(&self) -> Result<CpalDevice, CaptureError> {
        let host = cpal::default_host();
        let device = match self.preferred_device.as_deref() {
            Some(name) => {
                let mut devices = host
                    .input_devices()
                    .map_err(|err| CaptureError::device("enumerate_devices", err))?;
                devices
                    .find(|d| d.name().map(|n| n == name).unwrap_or(false))
                    .ok_or_else(|| {
                        CaptureError::device(
                            "get_default_device",
                            format!("input device '{name}' not found"),
                        )
                    })?
            }
            None => host.default_input_device().ok_or_else(|| {
                CaptureError::device(
                    "get_default_device",
                    format!(
                        "no default input device available. {}",
                        mic_permission_hint()
                    ),
                )
            })?,
        };
        Ok(CpalDevice::new(device))
    }
}

/// One opened CPAL input device.
///
/// Field order is teardown order: the stream goes first, then the packet ring,
/// then the device handle itself.
pub struct CpalDevice {
    stream: Option<cpal::Stream>,
    ring: Option<PacketRing>,
    negotiated: Option<SupportedStreamConfig>,
    buffer_frames: u32,
    stream_error: Arc<Mutex<Option<String>>>,
    reported_dropped: usize,
    name: String,
    device: cpal::Device,
}

impl CpalDevice {
    fn new(device: cpal::Device) -> Self {
        let name = device
            .name()
            .unwrap_or_else(|_| "Unknown Device".to_string());
        Self {
            stream: None,
            ring: None,
            negotiated: None,
            buffer_frames: 0,
            stream_error: Arc::new(Mutex::new(None)),
            reported_dropped: 0,
            name,
            device,
        }
    }

    fn ring_mut(&mut self, op: &'static str) -> Result<&mut PacketRing, CaptureError> {
        self.ring
            .as_mut()
            .ok_or_else(|| CaptureError::device(op, "device not initialized"))
    }

    /// Build an f32 input stream feeding a fresh packet ring.
    fn build_stream(
        &self,
        config: &StreamConfig,
        format: &AudioFormat,
        slots: usize,
        packet_frames: u32,
    ) -> Result<(cpal::Stream, PacketRing), cpal::BuildStreamError> {
        let (mut dispatcher, ring) = packet_ring(
            slots,
            packet_frames as usize,
            usize::from(format.channels),
            format.bytes_per_sample(),
        );
        let error_slot = self.stream_error.clone();
        let stream = self.device.build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                dispatcher.push(data, f32::to_le_bytes)
            },
            move |err: cpal::StreamError| {
                tracing::warn!(error = %err, "audio stream error");
                *lock_or_recover(&error_slot, "stream error slot") = Some(err.to_string());
            },
            None,
        )?;
        Ok((stream, ring))
    }

    fn active_stream(&self, op: &'static str) -> Result<&cpal::Stream, CaptureError> {
        self.stream
            .as_ref()
            .ok_or_else(|| CaptureError::device(op, "device not initialized"))
    }
}

impl CaptureDevice for CpalDevice {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn negotiate_format(&mut self) -> Result<AudioFormat, CaptureError> {
        let default_config = self
            .device
            .default_input_config()
            .map_err(|err| CaptureError::device("get_mix_format", err))?;
        let chosen = prefer_float_config(&self.device, &default_config).unwrap_or(default_config);
        let format = audio_format_from(&chosen);
        tracing::debug!(device = %self.name, %format, "negotiated capture format");
        self.negotiated = Some(chosen);
        Ok(format)
    }

    fn initialize(
        &mut self,
        format: &AudioFormat,
        buffer_duration: Duration,
    ) -> Result<(), CaptureError> {
        let negotiated = self
            .negotiated
            .clone()
            .ok_or_else(|| CaptureError::device("initialize", "format not negotiated"))?;
        if negotiated.sample_format() != SampleFormat::F32 {
            return Err(CaptureError::UnsupportedFormat {
                encoding: format.encoding,
                bits_per_sample: format.bits_per_sample,
            });
        }
        let sample_rate = format.sample_rate.max(1);
        let buffer_frames =
            ((u128::from(sample_rate) * buffer_duration.as_millis()) / 1000).max(1) as u32;
        let packet_frames = packet_frames_for(sample_rate, buffer_frames);
        let callback_size = callback_buffer_size(packet_frames, negotiated.buffer_size());
        let callback_frames = match callback_size {
            BufferSize::Fixed(frames) => frames,
            BufferSize::Default => packet_frames,
        };
        let slots = buffer_frames.max(callback_frames).div_ceil(packet_frames) as usize + 1;

        let mut stream_config = negotiated.config();
        stream_config.buffer_size = callback_size;
        let built = self.build_stream(&stream_config, format, slots, packet_frames);
        let (stream, ring) = match built {
            Ok(built) => built,
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    callback_frames,
                    "fixed callback size rejected; using host default"
                );
                stream_config.buffer_size = BufferSize::Default;
                self.build_stream(&stream_config, format, slots, packet_frames)
                    .map_err(|err| CaptureError::device("initialize", err))?
            }
        };

        // Some hosts start streams on creation; hold it until start().
        pause_or_log(&stream, "initialize");

        tracing::info!(
            buffer_frames,
            packet_frames,
            callback = ?stream_config.buffer_size,
            slots,
            "capture ring allocated"
        );
        self.buffer_frames = buffer_frames;
        self.ring = Some(ring);
        self.stream = Some(stream);
        Ok(())
    }

    fn buffer_frame_count(&self) -> Result<u32, CaptureError> {
        if self.ring.is_none() {
            return Err(CaptureError::device(
                "get_buffer_size",
                "device not initialized",
            ));
        }
        Ok(self.buffer_frames)
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        self.active_stream("start")?
            .play()
            .map_err(|err| CaptureError::device("start", err))
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        halt_stream(self.stream.take(), "stop")
    }

    fn next_packet_size(&mut self) -> Result<u32, CaptureError> {
        if let Some(message) = lock_or_recover(&self.stream_error, "stream error slot").take() {
            return Err(CaptureError::device("get_next_packet_size", message));
        }
        let ring = self.ring_mut("get_next_packet_size")?;
        let frames = ring.next_packet_frames()?;
        let dropped = ring.dropped_packets();
        if dropped > self.reported_dropped {
            tracing::warn!(
                dropped,
                new = dropped - self.reported_dropped,
                "capture ring full; packets dropped"
            );
            self.reported_dropped = dropped;
        }
        Ok(frames)
    }

    fn get_buffer(&mut self) -> Result<PacketInfo, CaptureError> {
        self.ring_mut("get_buffer")?.lease()
    }

    fn leased_bytes(&self) -> &[u8] {
        self.ring.as_ref().map_or(&[][..], |ring| ring.leased_bytes())
    }

    fn release_buffer(&mut self, frames: u32) -> Result<(), CaptureError> {
        self.ring_mut("release_buffer")?.release(frames)
    }
}

/// Frames per packet: at most 10 ms of audio, and no more than half the
/// buffer so at least one callback lands inside every pacing sleep.
fn packet_frames_for(sample_rate: u32, buffer_frames: u32) -> u32 {
    (sample_rate * PACKET_MS / 1000).min(buffer_frames / 2).max(1)
}

/// Callback period to request: `packet_frames`, clamped into the range the
/// device advertises.
fn callback_buffer_size(packet_frames: u32, supported: &SupportedBufferSize) -> BufferSize {
    match *supported {
        SupportedBufferSize::Range { min, max } => {
            BufferSize::Fixed(packet_frames.clamp(min, max.max(min)))
        }
        SupportedBufferSize::Unknown => BufferSize::Fixed(packet_frames),
    }
}

/// Pause `stream`, logging hosts that cannot pause.
fn pause_or_log<S: StreamTrait>(stream: &S, op: &'static str) {
    if let Err(err) = stream.pause() {
        tracing::debug!(op, error = %err, "stream pause not supported");
    }
}

/// Pause and drop the stream. Dropping ends the callbacks even where pausing
/// is unsupported.
fn halt_stream<S: StreamTrait>(stream: Option<S>, op: &'static str) -> Result<(), CaptureError> {
    let stream = stream.ok_or_else(|| CaptureError::device(op, "stream not running"))?;
    pause_or_log(&stream, op);
    drop(stream);
    Ok(())
}

/// Pick a float32 configuration at the device's default rate and channel
/// count when the default itself is not float.
fn prefer_float_config(
    device: &cpal::Device,
    default_config: &SupportedStreamConfig,
) -> Option<SupportedStreamConfig> {
    if default_config.sample_format() == SampleFormat::F32 {
        return Some(default_config.clone());
    }
    let rate = default_config.sample_rate();
    device
        .supported_input_configs()
        .ok()?
        .find(|range| {
            range.sample_format() == SampleFormat::F32
                && range.channels() == default_config.channels()
                && range.min_sample_rate() <= rate
                && rate <= range.max_sample_rate()
        })
        .map(|range| range.with_sample_rate(rate))
}

fn audio_format_from(config: &SupportedStreamConfig) -> AudioFormat {
    let sample_format = config.sample_format();
    let bytes = sample_format.sample_size() as u16;
    let encoding = if sample_format.is_float() {
        SampleEncoding::FloatPcm
    } else if sample_format.is_int() || sample_format.is_uint() {
        SampleEncoding::IntegerPcm
    } else {
        SampleEncoding::Other
    };
    AudioFormat {
        channels: config.channels(),
        bits_per_sample: bytes * 8,
        block_align: config.channels().saturating_mul(bytes),
        sample_rate: config.sample_rate().0,
        encoding,
    }
}

fn mic_permission_hint() -> &'static str {
    #[cfg(target_os = "macos")]
    {
        "macOS: System Settings > Privacy & Security > Microphone (enable your terminal)."
    }
    #[cfg(target_os = "linux")]
    {
        "Linux: check PipeWire/PulseAudio permissions and ensure the device is not muted."
    }
    #[cfg(target_os = "windows")]
    {
        "Windows: Settings > Privacy & Security > Microphone (allow access for your terminal)."
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    {
        "Check OS microphone permissions."
    }
}
