//! Scripted capture device and recording emitter shared by unit tests.

use crate::audio::{AudioFormat, CaptureDevice, CaptureHost, PacketInfo};
use crate::error::CaptureError;
use crate::output::{CycleReport, KeyCode, KeyEmitter};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Op {
    Open,
    Negotiate,
    Initialize,
    BufferSize,
    Start,
    Stop,
    NextPacketSize,
    GetBuffer,
    Release,
}

#[derive(Debug, Default)]
pub(crate) struct DeviceLog {
    pub(crate) calls: Vec<Op>,
    pub(crate) violations: Vec<String>,
    pub(crate) dropped: bool,
}

impl DeviceLog {
    pub(crate) fn count(&self, op: Op) -> usize {
        self.calls.iter().filter(|call| **call == op).count()
    }
}

pub(crate) type SharedLog = Arc<Mutex<DeviceLog>>;

#[derive(Debug, Clone)]
pub(crate) struct ScriptedPacket {
    pub(crate) bytes: Vec<u8>,
    pub(crate) frames: u32,
    pub(crate) silent: bool,
}

impl ScriptedPacket {
    /// Mono float packet whose loudest sample is `peak / 100`.
    pub(crate) fn mono_peak(peak: u8) -> Self {
        let samples = [0.0f32, peak as f32 / 100.0, -0.001];
        Self::from_samples(&samples, false)
    }

    pub(crate) fn from_samples(samples: &[f32], silent: bool) -> Self {
        Self {
            bytes: samples.iter().flat_map(|s| s.to_le_bytes()).collect(),
            frames: samples.len() as u32,
            silent,
        }
    }
}

/// What the scripted device reports and where it fails.
#[derive(Debug, Clone)]
pub(crate) struct Script {
    pub(crate) format: AudioFormat,
    pub(crate) buffer_frames: u32,
    /// One batch of packets becomes pending at the start of each drain.
    pub(crate) batches: VecDeque<Vec<ScriptedPacket>>,
    /// Fail the n-th (1-based) call of an operation.
    pub(crate) fail_on: Option<(Op, usize)>,
}

impl Script {
    pub(crate) fn new(batches: Vec<Vec<ScriptedPacket>>) -> Self {
        Self {
            format: AudioFormat::float32(1, 48_000),
            buffer_frames: 96,
            batches: batches.into(),
            fail_on: None,
        }
    }

    pub(crate) fn failing(mut self, op: Op, nth: usize) -> Self {
        self.fail_on = Some((op, nth));
        self
    }

    pub(crate) fn with_format(mut self, format: AudioFormat) -> Self {
        self.format = format;
        self
    }
}

pub(crate) struct ScriptedHost {
    script: Script,
    log: SharedLog,
}

impl ScriptedHost {
    pub(crate) fn new(script: Script) -> Self {
        Self {
            script,
            log: SharedLog::default(),
        }
    }

    pub(crate) fn log(&self) -> SharedLog {
        self.log.clone()
    }
}

impl CaptureHost for ScriptedHost {
    type Device = ScriptedDevice;

    fn default_capture_device(&self) -> Result<ScriptedDevice, CaptureError> {
        let mut device = ScriptedDevice::new(self.script.clone(), self.log.clone());
        device.record(Op::Open)?;
        Ok(device)
    }
}

pub(crate) struct ScriptedDevice {
    script: Script,
    log: SharedLog,
    pending: VecDeque<ScriptedPacket>,
    leased: Option<ScriptedPacket>,
    need_batch: bool,
    started: bool,
}

impl ScriptedDevice {
    pub(crate) fn new(script: Script, log: SharedLog) -> Self {
        Self {
            script,
            log,
            pending: VecDeque::new(),
            leased: None,
            need_batch: true,
            started: false,
        }
    }

    fn record(&mut self, op: Op) -> Result<(), CaptureError> {
        let mut log = self.log.lock().unwrap();
        log.calls.push(op);
        if let Some((fail_op, nth)) = self.script.fail_on {
            if fail_op == op && log.count(op) == nth {
                return Err(CaptureError::device("scripted", format!("{op:?} failed")));
            }
        }
        Ok(())
    }

    fn violation(&self, msg: &str) {
        self.log.lock().unwrap().violations.push(msg.to_string());
    }
}

impl CaptureDevice for ScriptedDevice {
    fn negotiate_format(&mut self) -> Result<AudioFormat, CaptureError> {
        self.record(Op::Negotiate)?;
        Ok(self.script.format)
    }

    fn initialize(&mut self, _: &AudioFormat, _: Duration) -> Result<(), CaptureError> {
        self.record(Op::Initialize)
    }

    fn buffer_frame_count(&self) -> Result<u32, CaptureError> {
        self.log.lock().unwrap().calls.push(Op::BufferSize);
        Ok(self.script.buffer_frames)
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        self.record(Op::Start)?;
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        if !self.started {
            self.violation("stop without start");
        }
        self.started = false;
        self.record(Op::Stop)
    }

    fn next_packet_size(&mut self) -> Result<u32, CaptureError> {
        if self.leased.is_some() {
            self.violation("pending-size query while a lease is outstanding");
        }
        self.record(Op::NextPacketSize)?;
        if self.need_batch {
            self.need_batch = false;
            if let Some(batch) = self.script.batches.pop_front() {
                self.pending.extend(batch);
            }
        }
        match self.pending.front() {
            Some(packet) => Ok(packet.frames),
            None => {
                self.need_batch = true;
                Ok(0)
            }
        }
    }

    fn get_buffer(&mut self) -> Result<PacketInfo, CaptureError> {
        if self.leased.is_some() {
            self.violation("get_buffer while a lease is outstanding");
            return Err(CaptureError::LeaseOutstanding);
        }
        self.record(Op::GetBuffer)?;
        let packet = self
            .pending
            .pop_front()
            .ok_or_else(|| CaptureError::device("get_buffer", "no packet pending"))?;
        let info = PacketInfo {
            frames: packet.frames,
            silent: packet.silent,
        };
        self.leased = Some(packet);
        Ok(info)
    }

    fn leased_bytes(&self) -> &[u8] {
        if self.leased.is_none() {
            self.violation("bytes read without a lease");
        }
        self.leased
            .as_ref()
            .map_or(&[][..], |packet| packet.bytes.as_slice())
    }

    fn release_buffer(&mut self, frames: u32) -> Result<(), CaptureError> {
        let Some(packet) = self.leased.take() else {
            self.violation("release without a lease");
            return Err(CaptureError::InvalidRelease {
                expected: 0,
                released: frames,
            });
        };
        if packet.frames != frames {
            self.violation("release frame count mismatch");
        }
        self.record(Op::Release)
    }
}

impl Drop for ScriptedDevice {
    fn drop(&mut self) {
        let mut log = self.log.lock().unwrap();
        if self.leased.is_some() {
            log.violations.push("device dropped with a lease outstanding".to_string());
        }
        log.dropped = true;
    }
}

/// Emitter that records every call and can be told to fail.
#[derive(Default)]
pub(crate) struct RecordingEmitter {
    pub(crate) emitted: Vec<(KeyCode, CycleReport)>,
    pub(crate) fail_on_call: Option<usize>,
}

impl KeyEmitter for RecordingEmitter {
    fn emit(&mut self, key: KeyCode, report: &CycleReport) -> Result<(), CaptureError> {
        self.emitted.push((key, *report));
        if self.fail_on_call == Some(self.emitted.len()) {
            return Err(CaptureError::Output("scripted emitter failure".to_string()));
        }
        Ok(())
    }
}
