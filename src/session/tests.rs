use super::{pacing_interval, CaptureSession, RunMode, SessionState, StopSignal};
use crate::audio::{AudioFormat, DecodeStrategy, SampleEncoding};
use crate::config::SessionConfig;
use crate::error::CaptureError;
use crate::gate::GateState;
use crate::output::KeyCode;
use crate::test_support::{Op, RecordingEmitter, Script, ScriptedHost, ScriptedPacket};
use std::time::Duration;

fn config(mode: RunMode) -> SessionConfig {
    SessionConfig {
        interval_ms: 2,
        threshold: 50,
        key: KeyCode::SPACE,
        strategy: DecodeStrategy::FirstChannel,
        mode,
    }
}

fn session(mode: RunMode) -> CaptureSession<RecordingEmitter> {
    CaptureSession::new(config(mode), RecordingEmitter::default())
}

#[test]
fn single_cycle_gates_on_cycle_peak() {
    let host = ScriptedHost::new(Script::new(vec![vec![
        ScriptedPacket::mono_peak(10),
        ScriptedPacket::mono_peak(20),
        ScriptedPacket::mono_peak(60),
    ]]));
    let mut session = session(RunMode::Single);
    let report = session.run(&host, &StopSignal::new()).unwrap();

    assert_eq!(session.state(), SessionState::Stopped);
    assert_eq!(report.cycles, 1);
    assert_eq!(report.packets, 3);
    assert_eq!(report.last_peak.value(), 60);
    assert_eq!(report.last_state, Some(GateState::Active));

    let emitted = &session.emitter().emitted;
    assert_eq!(emitted.len(), 1);
    assert_eq!(emitted[0].0, KeyCode::SPACE);
    assert_eq!(emitted[0].1.state, GateState::Active);
    assert_eq!(emitted[0].1.peak.value(), 60);

    let log = host.log();
    let log = log.lock().unwrap();
    assert_eq!(log.count(Op::Start), 1);
    assert_eq!(log.count(Op::Stop), 1);
    assert!(log.dropped);
    assert!(log.violations.is_empty(), "{:?}", log.violations);
}

#[test]
fn quiet_cycle_releases_key() {
    let host = ScriptedHost::new(Script::new(vec![vec![ScriptedPacket::mono_peak(49)]]));
    let mut session = session(RunMode::Single);
    session.run(&host, &StopSignal::new()).unwrap();
    assert_eq!(session.emitter().emitted[0].1.state, GateState::Inactive);
}

#[test]
fn cycles_are_gated_independently() {
    let host = ScriptedHost::new(Script::new(vec![
        vec![ScriptedPacket::mono_peak(50)],
        vec![ScriptedPacket::mono_peak(49)],
        vec![],
        vec![ScriptedPacket::mono_peak(80), ScriptedPacket::mono_peak(3)],
    ]));
    let mut session = session(RunMode::Continuous {
        max_cycles: Some(4),
    });
    let report = session.run(&host, &StopSignal::new()).unwrap();
    let states: Vec<GateState> = session
        .emitter()
        .emitted
        .iter()
        .map(|(_, cycle)| cycle.state)
        .collect();
    assert_eq!(
        states,
        vec![
            GateState::Active,
            GateState::Inactive,
            GateState::Inactive,
            GateState::Active
        ]
    );
    assert_eq!(report.cycles, 4);
    assert_eq!(report.active_cycles, 2);
    assert_eq!(report.packets, 4);
    let cycles: Vec<u64> = session
        .emitter()
        .emitted
        .iter()
        .map(|(_, cycle)| cycle.cycle)
        .collect();
    assert_eq!(cycles, vec![1, 2, 3, 4]);
}

#[test]
fn unsupported_format_is_rejected_before_start() {
    let pcm16 = AudioFormat {
        channels: 2,
        bits_per_sample: 16,
        block_align: 4,
        sample_rate: 44_100,
        encoding: SampleEncoding::IntegerPcm,
    };
    let host = ScriptedHost::new(Script::new(vec![]).with_format(pcm16));
    let mut session = session(RunMode::Single);
    let err = session.run(&host, &StopSignal::new()).unwrap_err();

    assert!(matches!(
        err,
        CaptureError::UnsupportedFormat {
            encoding: SampleEncoding::IntegerPcm,
            bits_per_sample: 16
        }
    ));
    assert_eq!(session.state(), SessionState::Failed);
    assert!(session.emitter().emitted.is_empty());
    let log = host.log();
    let log = log.lock().unwrap();
    assert_eq!(log.count(Op::Start), 0);
    assert_eq!(log.count(Op::Initialize), 0);
    assert_eq!(log.count(Op::Stop), 0);
    assert!(log.dropped);
}

#[test]
fn zero_interval_fails_without_device_calls() {
    let host = ScriptedHost::new(Script::new(vec![vec![ScriptedPacket::mono_peak(90)]]));
    let mut cfg = config(RunMode::Single);
    cfg.interval_ms = 0;
    let mut session = CaptureSession::new(cfg, RecordingEmitter::default());
    let err = session.run(&host, &StopSignal::new()).unwrap_err();

    assert!(matches!(err, CaptureError::Configuration(_)));
    assert_eq!(session.state(), SessionState::Failed);
    assert!(host.log().lock().unwrap().calls.is_empty());
}

#[test]
fn out_of_range_threshold_fails_without_device_calls() {
    let host = ScriptedHost::new(Script::new(vec![]));
    let mut cfg = config(RunMode::Single);
    cfg.threshold = 101;
    let mut session = CaptureSession::new(cfg, RecordingEmitter::default());
    assert!(matches!(
        session.run(&host, &StopSignal::new()),
        Err(CaptureError::Configuration(_))
    ));
    assert!(host.log().lock().unwrap().calls.is_empty());
}

#[test]
fn device_error_while_recording_stops_once_and_releases() {
    let script = Script::new(vec![
        vec![ScriptedPacket::mono_peak(70)],
        vec![ScriptedPacket::mono_peak(70)],
    ])
    .failing(Op::NextPacketSize, 3);
    let host = ScriptedHost::new(script);
    let mut session = session(RunMode::Continuous { max_cycles: None });
    let err = session.run(&host, &StopSignal::new()).unwrap_err();

    assert!(err.is_device_error());
    assert_eq!(session.state(), SessionState::Failed);
    assert_eq!(session.emitter().emitted.len(), 1);
    let log = host.log();
    let log = log.lock().unwrap();
    assert_eq!(log.count(Op::Stop), 1);
    assert!(log.dropped);
    assert!(log.violations.is_empty(), "{:?}", log.violations);
}

#[test]
fn release_error_fails_session_after_teardown() {
    let script = Script::new(vec![vec![
        ScriptedPacket::mono_peak(70),
        ScriptedPacket::mono_peak(20),
    ]])
    .failing(Op::Release, 1);
    let host = ScriptedHost::new(script);
    let mut session = session(RunMode::Single);
    let err = session.run(&host, &StopSignal::new()).unwrap_err();
    assert!(err.is_device_error());
    assert!(session.emitter().emitted.is_empty());
    let log = host.log();
    let log = log.lock().unwrap();
    assert_eq!(log.count(Op::Stop), 1);
    assert!(log.dropped);
}

#[test]
fn start_failure_never_stops() {
    let host = ScriptedHost::new(Script::new(vec![]).failing(Op::Start, 1));
    let mut session = session(RunMode::Single);
    let err = session.run(&host, &StopSignal::new()).unwrap_err();
    assert!(err.is_device_error());
    let log = host.log();
    let log = log.lock().unwrap();
    assert_eq!(log.count(Op::Stop), 0);
    assert!(log.dropped);
}

#[test]
fn stop_failure_is_reported_after_normal_exit() {
    let host = ScriptedHost::new(
        Script::new(vec![vec![ScriptedPacket::mono_peak(5)]]).failing(Op::Stop, 1),
    );
    let mut session = session(RunMode::Single);
    let err = session.run(&host, &StopSignal::new()).unwrap_err();
    assert!(err.is_device_error());
    assert_eq!(session.emitter().emitted.len(), 1);
    assert_eq!(host.log().lock().unwrap().count(Op::Stop), 1);
}

#[test]
fn emitter_failure_is_fatal() {
    let host = ScriptedHost::new(Script::new(vec![vec![ScriptedPacket::mono_peak(5)]]));
    let emitter = RecordingEmitter {
        fail_on_call: Some(1),
        ..RecordingEmitter::default()
    };
    let mut session = CaptureSession::new(config(RunMode::Single), emitter);
    let err = session.run(&host, &StopSignal::new()).unwrap_err();
    assert!(matches!(err, CaptureError::Output(_)));
    assert_eq!(session.state(), SessionState::Failed);
    assert_eq!(host.log().lock().unwrap().count(Op::Stop), 1);
}

#[test]
fn raised_stop_signal_ends_before_next_cycle() {
    let host = ScriptedHost::new(Script::new(vec![vec![ScriptedPacket::mono_peak(90)]]));
    let stop = StopSignal::new();
    stop.raise();
    let mut session = session(RunMode::Continuous { max_cycles: None });
    let report = session.run(&host, &stop).unwrap();
    assert_eq!(report.cycles, 0);
    assert_eq!(session.state(), SessionState::Stopped);
    let log = host.log();
    let log = log.lock().unwrap();
    assert_eq!(log.count(Op::Start), 1);
    assert_eq!(log.count(Op::Stop), 1);
    assert_eq!(log.count(Op::NextPacketSize), 0);
}

#[test]
fn session_cannot_run_twice() {
    let host = ScriptedHost::new(Script::new(vec![vec![]]));
    let mut session = session(RunMode::Single);
    session.run(&host, &StopSignal::new()).unwrap();
    assert!(matches!(
        session.run(&host, &StopSignal::new()),
        Err(CaptureError::Configuration(_))
    ));
    assert_eq!(session.state(), SessionState::Stopped);
}

#[test]
fn pacing_is_half_the_buffer_duration() {
    assert_eq!(
        pacing_interval(4_800, 48_000).unwrap(),
        Duration::from_millis(50)
    );
    assert_eq!(
        pacing_interval(441, 44_100).unwrap(),
        Duration::from_millis(5)
    );
    assert!(pacing_interval(100, 0).is_err());
}

#[test]
fn state_labels_terminal_states() {
    assert!(SessionState::Stopped.is_terminal());
    assert!(SessionState::Failed.is_terminal());
    assert!(!SessionState::Recording.is_terminal());
}
