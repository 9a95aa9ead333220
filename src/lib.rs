//! imu2sd - IMU-to-SD data logger core.
//!
//! This library carries every piece of the device logic that does not touch
//! hardware: the system state machine, the sampling & logging engine, the
//! storage session manager, button debouncing, the command console and the
//! status-panel projection. It builds and tests on the host with default
//! features (`cargo test`).
//!
//! Hardware collaborators (motion sensor, SD filesystem, panel, console
//! transport, clock) are traits in [`hal`]; the embedded binary
//! (`src/main.rs`, behind the `embedded` feature) wires real RP2040 drivers
//! to them and [`sim`] provides in-memory stand-ins for tests.

#![cfg_attr(not(test), no_std)]

pub mod capture;
pub mod config;
pub mod console;
pub mod debounce;
pub mod display;
pub mod error;
pub mod hal;
pub mod sim;
pub mod state;
pub mod storage;
pub mod system;

pub use error::{DeviceErrorKind, Error};
pub use hal::RawImuSample;
pub use state::{Chime, Lamp, SystemState};
pub use system::{Snapshot, System};

// ═══════════════════════════════════════════════════════════════════════════
// Unit Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use crate::capture::{convert, CaptureEngine};
    use crate::config::{CSV_HEADER, LOG_FILENAME, SYNC_EVERY_SAMPLES};
    use crate::console::{parse_line, Command, CommandParser, LineOutcome};
    use crate::debounce::{ControlBank, ControlId};
    use crate::display::{render, Screen};
    use crate::error::{DeviceErrorKind, Error};
    use crate::hal::{RawImuSample, VolumeDriver};
    use crate::sim::{SimConsole, SimPanel, SimRtc, SimVolume};
    use crate::state::{indicators_for, Chime, Lamp, SystemState};
    use crate::storage::StorageManager;
    use crate::system::{Snapshot, System};

    fn level_sample() -> RawImuSample {
        RawImuSample {
            accel: [0, 0, 16384],
            gyro: [0, 0, 0],
            temp: 0,
        }
    }

    fn tilted_sample() -> RawImuSample {
        RawImuSample {
            accel: [16384, 0, 16384],
            gyro: [0, 0, 0],
            temp: 0,
        }
    }

    fn mounted_volume() -> SimVolume {
        let mut volume = SimVolume::new();
        volume.mount().unwrap();
        volume
    }

    fn manager(volume: SimVolume) -> StorageManager<SimVolume> {
        let mut m = StorageManager::new();
        assert!(m.add_volume("sd0", volume).is_ok());
        m
    }

    fn system(
        controls: &ControlBank,
        volume: SimVolume,
    ) -> System<'_, SimVolume, SimConsole, SimRtc> {
        System::new(controls, manager(volume), SimConsole::new(), SimRtc::new())
    }

    /// Feed a full console line followed by CR, advancing time per byte.
    fn feed_line(
        sys: &mut System<'_, SimVolume, SimConsole, SimRtc>,
        line: &str,
        t: &mut u64,
    ) {
        let sample = level_sample();
        for b in line.bytes() {
            sys.poll(*t, &sample, Some(b));
            *t += 1;
        }
        sys.poll(*t, &sample, Some(b'\r'));
        *t += 1;
    }

    // ════════════════════════════════════════════════════════════════════════
    // Debounce
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn debounce_two_edges_inside_window_toggle_once() {
        let bank = ControlBank::new();
        bank.on_edge(ControlId::Capture, 1000);
        assert!(bank.read(ControlId::Capture));
        bank.on_edge(ControlId::Capture, 1100);
        assert!(bank.read(ControlId::Capture));
    }

    #[test]
    fn debounce_spaced_edges_toggle_twice() {
        let bank = ControlBank::new();
        bank.on_edge(ControlId::Capture, 1000);
        bank.on_edge(ControlId::Capture, 1300);
        assert!(!bank.read(ControlId::Capture));
    }

    #[test]
    fn debounce_windows_are_independent_per_control() {
        let bank = ControlBank::new();
        bank.on_edge(ControlId::Capture, 1000);
        bank.on_edge(ControlId::Mount, 1050);
        assert!(bank.read(ControlId::Capture));
        assert!(bank.read(ControlId::Mount));
    }

    #[test]
    fn debounce_reads_false_before_any_edge() {
        let bank = ControlBank::new();
        assert!(!bank.read(ControlId::Capture));
        assert!(!bank.read(ControlId::Mount));
    }

    // ════════════════════════════════════════════════════════════════════════
    // Unit conversion & attitude
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn convert_scales_raw_counts() {
        let sample = convert(&RawImuSample {
            accel: [16384, -16384, 0],
            gyro: [131, -262, 0],
            temp: 0,
        });
        assert!((sample.accel_g[0] - 1.0).abs() < 1e-6);
        assert!((sample.accel_g[1] + 1.0).abs() < 1e-6);
        assert!((sample.gyro_dps[0] - 1.0).abs() < 1e-4);
        assert!((sample.gyro_dps[1] + 2.0).abs() < 1e-4);
    }

    #[test]
    fn convert_level_attitude_is_flat() {
        let sample = convert(&level_sample());
        assert!(sample.roll_deg.abs() < 1e-3);
        assert!(sample.pitch_deg.abs() < 1e-3);
    }

    #[test]
    fn convert_tilted_attitude_matches_reference() {
        let sample = convert(&tilted_sample());
        assert!(sample.roll_deg.abs() < 1e-3);
        assert!((sample.pitch_deg + 45.0).abs() < 1e-3);
    }

    // ════════════════════════════════════════════════════════════════════════
    // Capture engine
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn engine_counter_matches_accepted_ticks() {
        let mut volume = mounted_volume();
        let mut engine: CaptureEngine<SimVolume> = CaptureEngine::new();
        engine.start(&mut volume, 0).unwrap();
        assert!(engine.is_active());
        assert_eq!(engine.count(), 0);

        let sample = convert(&level_sample());
        for i in 0..5u64 {
            let t = 100 * (i + 1);
            assert!(engine.due(t));
            engine.tick(&mut volume, t, &sample).unwrap();
        }
        assert_eq!(engine.count(), 5);
        assert_eq!(engine.stop(&mut volume).unwrap(), 5);
        assert!(!engine.is_active());
    }

    #[test]
    fn engine_due_follows_fixed_cadence() {
        let mut volume = mounted_volume();
        let mut engine: CaptureEngine<SimVolume> = CaptureEngine::new();
        engine.start(&mut volume, 0).unwrap();
        assert!(!engine.due(99));
        assert!(engine.due(100));

        let sample = convert(&level_sample());
        engine.tick(&mut volume, 237, &sample).unwrap();
        assert!(!engine.due(336));
        assert!(engine.due(337));
    }

    #[test]
    fn engine_start_while_active_is_rejected() {
        let mut volume = mounted_volume();
        let mut engine: CaptureEngine<SimVolume> = CaptureEngine::new();
        engine.start(&mut volume, 0).unwrap();
        let sample = convert(&level_sample());
        engine.tick(&mut volume, 100, &sample).unwrap();
        engine.tick(&mut volume, 200, &sample).unwrap();

        let before = volume.file_contents(LOG_FILENAME).unwrap().len();
        assert_eq!(engine.start(&mut volume, 300), Err(Error::AlreadyActive));
        assert_eq!(engine.count(), 2);
        assert_eq!(volume.file_contents(LOG_FILENAME).unwrap().len(), before);
    }

    #[test]
    fn engine_stop_while_idle_is_rejected() {
        let mut volume = mounted_volume();
        let mut engine: CaptureEngine<SimVolume> = CaptureEngine::new();
        assert_eq!(engine.stop(&mut volume), Err(Error::NotActive));
        assert_eq!(engine.count(), 0);
    }

    #[test]
    fn engine_restart_resets_counter_and_truncates() {
        let mut volume = mounted_volume();
        let mut engine: CaptureEngine<SimVolume> = CaptureEngine::new();
        let sample = convert(&level_sample());

        engine.start(&mut volume, 0).unwrap();
        for i in 0..3u64 {
            engine.tick(&mut volume, 100 * (i + 1), &sample).unwrap();
        }
        engine.stop(&mut volume).unwrap();

        engine.start(&mut volume, 1000).unwrap();
        assert_eq!(engine.count(), 0);
        assert_eq!(
            volume.file_contents(LOG_FILENAME).unwrap(),
            CSV_HEADER.as_bytes()
        );
    }

    #[test]
    fn engine_csv_roundtrip() {
        let mut volume = mounted_volume();
        let mut engine: CaptureEngine<SimVolume> = CaptureEngine::new();
        let sample = convert(&tilted_sample());

        engine.start(&mut volume, 0).unwrap();
        for i in 0..5u64 {
            engine.tick(&mut volume, 100 * (i + 1), &sample).unwrap();
        }
        engine.stop(&mut volume).unwrap();

        let text = std::str::from_utf8(volume.file_contents(LOG_FILENAME).unwrap()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next().unwrap(), CSV_HEADER.trim_end());

        let mut expected_index = 0u32;
        for line in lines {
            let mut fields = line.split(',');
            let index: u32 = fields.next().unwrap().parse().unwrap();
            assert_eq!(index, expected_index);
            expected_index += 1;
            assert_eq!(fields.clone().count(), 8);
            assert_eq!(fields.nth(6).unwrap(), "0.00"); // roll
        }
        assert_eq!(expected_index, 5);
        assert!(text.contains(",-45.00\n"));
    }

    #[test]
    fn engine_syncs_every_fifty_samples() {
        let mut volume = mounted_volume();
        let mut engine: CaptureEngine<SimVolume> = CaptureEngine::new();
        let sample = convert(&level_sample());

        engine.start(&mut volume, 0).unwrap();
        for i in 0..(SYNC_EVERY_SAMPLES as u64 * 2) {
            let report = engine.tick(&mut volume, 100 * (i + 1), &sample).unwrap();
            let last_of_batch = (i + 1) % SYNC_EVERY_SAMPLES as u64 == 0;
            assert_eq!(report.synced, last_of_batch);
        }
        assert_eq!(volume.sync_count, 2);
    }

    #[test]
    fn engine_write_failure_forces_stop() {
        let mut volume = mounted_volume();
        let mut engine: CaptureEngine<SimVolume> = CaptureEngine::new();
        let sample = convert(&level_sample());

        engine.start(&mut volume, 0).unwrap();
        // Header already written; the fifth row write fails.
        volume.fail_write_after = Some(5);
        for i in 0..4u64 {
            engine.tick(&mut volume, 100 * (i + 1), &sample).unwrap();
        }
        assert_eq!(
            engine.tick(&mut volume, 500, &sample),
            Err(Error::Device(DeviceErrorKind::DiskError))
        );
        assert!(!engine.is_active());
        assert_eq!(engine.stop(&mut volume), Err(Error::NotActive));
    }

    #[test]
    fn engine_header_failure_aborts_start() {
        let mut volume = mounted_volume();
        let mut engine: CaptureEngine<SimVolume> = CaptureEngine::new();
        volume.fail_write_after = Some(1);
        assert_eq!(
            engine.start(&mut volume, 0),
            Err(Error::Device(DeviceErrorKind::DiskError))
        );
        assert!(!engine.is_active());
        // The injected failure is consumed; a retry succeeds.
        engine.start(&mut volume, 100).unwrap();
        assert!(engine.is_active());
    }

    #[test]
    fn engine_start_requires_mounted_volume() {
        let mut volume = SimVolume::new();
        let mut engine: CaptureEngine<SimVolume> = CaptureEngine::new();
        assert_eq!(
            engine.start(&mut volume, 0),
            Err(Error::Device(DeviceErrorKind::NotMounted))
        );
    }

    // ════════════════════════════════════════════════════════════════════════
    // Command parsing
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn parse_mount_with_and_without_volume() {
        assert_eq!(
            parse_line("mount"),
            LineOutcome::Dispatch(Command::Mount { volume: None })
        );
        match parse_line("mount sd0") {
            LineOutcome::Dispatch(Command::Mount { volume: Some(v) }) => {
                assert_eq!(v.as_str(), "sd0")
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn parse_setrtc_builds_datetime() {
        match parse_line("setrtc 1 2 24 13 14 15") {
            LineOutcome::Dispatch(Command::SetRtc(dt)) => {
                assert_eq!(dt.day, 1);
                assert_eq!(dt.month, 2);
                assert_eq!(dt.year, 2024);
                assert_eq!(dt.hour, 13);
                assert_eq!(dt.minute, 14);
                assert_eq!(dt.second, 15);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn parse_setrtc_missing_arguments() {
        assert_eq!(
            parse_line("setrtc 1 2 3"),
            LineOutcome::Invalid(Error::MissingArgument)
        );
    }

    #[test]
    fn parse_setrtc_garbage_fields_read_as_zero() {
        match parse_line("setrtc x y z p q r") {
            LineOutcome::Dispatch(Command::SetRtc(dt)) => {
                assert_eq!(dt.day, 0);
                assert_eq!(dt.year, 2000);
                assert_eq!(dt.second, 0);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn parse_cat_requires_path() {
        assert_eq!(
            parse_line("cat"),
            LineOutcome::Invalid(Error::MissingArgument)
        );
        match parse_line("cat data.csv") {
            LineOutcome::Dispatch(Command::Cat { path }) => {
                assert_eq!(path.as_str(), "data.csv")
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn parse_unknown_and_blank_lines() {
        match parse_line("bogus arg") {
            LineOutcome::Unknown(token) => assert_eq!(token.as_str(), "bogus"),
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(parse_line(""), LineOutcome::Blank);
        assert_eq!(parse_line("   "), LineOutcome::Blank);
    }

    #[test]
    fn parser_echoes_and_dispatches_on_cr() {
        let mut parser = CommandParser::new();
        let mut console = SimConsole::new();
        assert!(parser.feed_byte(b'l', &mut console).is_none());
        assert!(parser.feed_byte(b's', &mut console).is_none());
        let outcome = parser.feed_byte(b'\r', &mut console).unwrap();
        assert_eq!(
            outcome,
            LineOutcome::Dispatch(Command::List { path: None })
        );
        assert_eq!(console.output_str(), "ls\r\n");
    }

    #[test]
    fn parser_backspace_trims_one_character() {
        let mut parser = CommandParser::new();
        let mut console = SimConsole::new();
        for b in b"lsx" {
            parser.feed_byte(*b, &mut console);
        }
        parser.feed_byte(0x08, &mut console);
        let outcome = parser.feed_byte(b'\r', &mut console).unwrap();
        assert_eq!(
            outcome,
            LineOutcome::Dispatch(Command::List { path: None })
        );
    }

    #[test]
    fn parser_drops_input_past_capacity() {
        let mut parser = CommandParser::new();
        let mut console = SimConsole::new();
        for _ in 0..300 {
            parser.feed_byte(b'x', &mut console);
        }
        match parser.feed_byte(b'\r', &mut console).unwrap() {
            LineOutcome::Unknown(token) => {
                // The token itself is bounded; no panic, no overflow.
                assert_eq!(token.len(), token.capacity());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn parser_ignores_unprintable_bytes() {
        let mut parser = CommandParser::new();
        let mut console = SimConsole::new();
        parser.feed_byte(0x01, &mut console);
        parser.feed_byte(0x1b, &mut console);
        assert_eq!(console.output_str(), "");
        assert_eq!(
            parser.feed_byte(b'\r', &mut console).unwrap(),
            LineOutcome::Blank
        );
    }

    // ════════════════════════════════════════════════════════════════════════
    // Storage session manager
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn manager_mount_flips_session_flag() {
        let mut m = manager(SimVolume::new());
        assert!(!m.default_mounted());
        m.mount(None).unwrap();
        assert!(m.default_mounted());
        assert!(m.session(None).unwrap().mounted);
    }

    #[test]
    fn manager_repeated_mount_is_noop() {
        let mut m = manager(SimVolume::new());
        m.mount(None).unwrap();
        m.mount(None).unwrap();
        assert_eq!(m.volume_driver(None).unwrap().probe_count, 1);
    }

    #[test]
    fn manager_unmount_forces_reprobe_on_next_mount() {
        let mut m = manager(SimVolume::new());
        m.mount(None).unwrap();
        m.unmount(None).unwrap();
        assert!(!m.default_mounted());
        m.mount(None).unwrap();
        assert_eq!(m.volume_driver(None).unwrap().probe_count, 2);
    }

    #[test]
    fn manager_unknown_volume_name() {
        let mut m = manager(SimVolume::new());
        assert_eq!(m.mount(Some("sd9")), Err(Error::UnknownVolume));
        assert_eq!(m.free_space(Some("sd9")), Err(Error::UnknownVolume));
    }

    #[test]
    fn manager_mount_failure_records_cause() {
        let mut volume = SimVolume::new();
        volume.fail_mount = Some(DeviceErrorKind::NoFilesystem);
        let mut m = manager(volume);
        assert_eq!(
            m.mount(None),
            Err(Error::Device(DeviceErrorKind::NoFilesystem))
        );
        assert!(!m.default_mounted());
        assert_eq!(
            m.session(None).unwrap().last_error,
            Some(DeviceErrorKind::NoFilesystem)
        );
    }

    #[test]
    fn manager_free_space_arithmetic() {
        let mut m = manager(mounted_volume());
        let (total, free) = m.free_space(None).unwrap();
        assert_eq!(total, (1026 - 2) * 8 / 2);
        assert_eq!(free, 1000 * 8 / 2);
    }

    // ════════════════════════════════════════════════════════════════════════
    // Indicators
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn indicator_table_matches_states() {
        let init = indicators_for(SystemState::Init).unwrap();
        assert_eq!(init.lamp, Some(Lamp::rgb(true, true, false)));
        assert_eq!(init.chime, Some(Chime::UnmountDone));

        let normal = indicators_for(SystemState::Normal).unwrap();
        assert_eq!(normal.lamp, Some(Lamp::rgb(true, true, true)));
        assert_eq!(normal.chime, None);

        let error = indicators_for(SystemState::Error).unwrap();
        assert_eq!(error.lamp, Some(Lamp::rgb(true, false, false)));
        assert_eq!(error.chime, Some(Chime::Fault));

        let reading = indicators_for(SystemState::Reading).unwrap();
        assert_eq!(reading.lamp, Some(Lamp::rgb(false, false, true)));
        assert_eq!(reading.chime, Some(Chime::Read));

        assert!(indicators_for(SystemState::Help).is_none());
        assert!(indicators_for(SystemState::FreeSpace).is_none());
        assert!(indicators_for(SystemState::Format).is_none());
    }

    #[test]
    fn chime_patterns_have_expected_shapes() {
        assert_eq!(Chime::CaptureStart.pattern(), &[300]);
        assert_eq!(Chime::CaptureStop.pattern(), &[100, 300]);
        assert_eq!(Chime::Read.pattern().len(), 3);
        assert_eq!(Chime::Fault.pattern(), &[300, 300, 300]);
        assert_eq!(Chime::MountDone.pattern().len(), 2);
        assert_eq!(Chime::UnmountDone.pattern(), &[200, 200]);
    }

    // ════════════════════════════════════════════════════════════════════════
    // System dispatcher
    // ════════════════════════════════════════════════════════════════════════

    #[test]
    fn system_mount_command_reaches_normal() {
        let controls = ControlBank::new();
        let mut sys = system(&controls, SimVolume::new());
        sys.finish_init();

        let mut t = 0u64;
        feed_line(&mut sys, "mount sd0", &mut t);

        assert!(sys.storage().session(None).unwrap().mounted);
        assert_eq!(sys.state(), SystemState::Normal);
        assert!(sys.console().output_contains("volume sd0 mounted"));
    }

    #[test]
    fn system_shortcut_letters_fire_inside_typed_lines() {
        let controls = ControlBank::new();
        let mut sys = system(&controls, SimVolume::new());
        sys.finish_init();

        let mut t = 0u64;
        feed_line(&mut sys, "mount sd0", &mut t);
        // The 'd' inside "sd0" hit the show-file shortcut while the volume
        // was still unmounted; the completed line then mounted it anyway.
        assert!(sys.console().output_contains("read error"));
        assert!(sys.storage().default_mounted());
        assert_eq!(sys.state(), SystemState::Normal);
    }

    #[test]
    fn system_mount_unknown_volume_reports_error() {
        let controls = ControlBank::new();
        let mut sys = system(&controls, SimVolume::new());
        sys.finish_init();

        let mut t = 0u64;
        feed_line(&mut sys, "mount sd9", &mut t);

        assert_eq!(sys.state(), SystemState::Error);
        assert!(!sys.storage().default_mounted());
        assert!(sys.console().output_contains("mount error: unknown volume"));
    }

    #[test]
    fn system_button_toggle_mounts_and_unmounts() {
        let controls = ControlBank::new();
        let mut sys = system(&controls, SimVolume::new());
        sys.finish_init();

        controls.on_edge(ControlId::Mount, 1000);
        let snap = sys.poll(1000, &level_sample(), None);
        assert!(snap.mounted);
        assert_eq!(sys.state(), SystemState::Normal);

        controls.on_edge(ControlId::Mount, 1400);
        let snap = sys.poll(1400, &level_sample(), None);
        assert!(!snap.mounted);
    }

    #[test]
    fn system_mount_applies_before_capture_in_same_cycle() {
        let controls = ControlBank::new();
        let mut sys = system(&controls, SimVolume::new());
        sys.finish_init();

        controls.on_edge(ControlId::Mount, 1000);
        controls.on_edge(ControlId::Capture, 1000);
        let snap = sys.poll(1000, &level_sample(), None);

        assert!(snap.mounted);
        assert!(snap.capture_active);
        assert_eq!(sys.state(), SystemState::CaptureStarting);
        assert!(sys
            .storage()
            .volume_driver(None)
            .unwrap()
            .has_file(LOG_FILENAME));
    }

    #[test]
    fn system_capture_without_mount_fails_once() {
        let controls = ControlBank::new();
        let mut sys = system(&controls, SimVolume::new());
        sys.finish_init();

        controls.on_edge(ControlId::Capture, 1000);
        let snap = sys.poll(1000, &level_sample(), None);
        assert!(!snap.capture_active);
        assert_eq!(sys.state(), SystemState::Error);
        assert!(sys.console().output_contains("volume not mounted"));

        // The failed intent is not retried on the next iteration.
        let len = sys.console().output_str().len();
        sys.poll(1010, &level_sample(), None);
        assert_eq!(sys.console().output_str().len(), len);
    }

    #[test]
    fn system_shortcut_capture_lifecycle() {
        let controls = ControlBank::new();
        let mut sys = system(&controls, SimVolume::new());
        sys.finish_init();

        sys.poll(0, &level_sample(), Some(b'a'));
        sys.poll(10, &level_sample(), Some(b'h'));
        assert_eq!(sys.state(), SystemState::CaptureStarting);

        sys.poll(110, &tilted_sample(), None);
        sys.poll(220, &tilted_sample(), None);
        let snap = sys.poll(330, &tilted_sample(), None);
        assert_eq!(snap.sample_count, 3);
        assert!((snap.pitch_deg + 45.0).abs() < 1e-3);

        sys.poll(340, &level_sample(), Some(b'i'));
        assert_eq!(sys.state(), SystemState::CaptureStopping);
        assert!(sys
            .console()
            .output_contains("capture finished: 3 samples"));

        let contents = sys
            .storage()
            .volume_driver(None)
            .unwrap()
            .file_contents(LOG_FILENAME)
            .unwrap();
        let text = std::str::from_utf8(contents).unwrap();
        assert_eq!(text.lines().count(), 4); // header + 3 rows
        assert!(text.contains("\n0,"));
        assert!(text.contains("\n2,"));
    }

    #[test]
    fn system_write_failure_recovers_to_idle() {
        let controls = ControlBank::new();
        let mut volume = SimVolume::new();
        // Header is write 1; the fifth row (tick index 4) is write 6.
        volume.fail_write_after = Some(6);
        let mut sys = system(&controls, volume);
        sys.finish_init();

        sys.poll(0, &level_sample(), Some(b'a'));
        sys.poll(10, &level_sample(), Some(b'h'));
        for i in 0..4u64 {
            let snap = sys.poll(110 + 100 * i, &level_sample(), None);
            assert!(snap.capture_active);
        }
        let snap = sys.poll(510, &level_sample(), None);
        assert!(!snap.capture_active);
        assert_eq!(sys.state(), SystemState::Error);
        assert!(sys.console().output_contains("log write error: disk I/O error"));

        // The implicit stop already ran; an explicit stop reports NotActive.
        sys.poll(520, &level_sample(), Some(b'i'));
        assert!(sys.console().output_contains("no capture running"));
    }

    #[test]
    fn system_show_file_shortcut_numbers_small_files() {
        let controls = ControlBank::new();
        let mut volume = SimVolume::new();
        volume.add_file(LOG_FILENAME, b"Sample,AccelX\n0,1.000\n");
        let mut sys = system(&controls, volume);
        sys.finish_init();

        sys.poll(0, &level_sample(), Some(b'a'));
        sys.poll(10, &level_sample(), Some(b'd'));

        assert_eq!(sys.state(), SystemState::Reading);
        assert!(sys.console().output_contains("name: imu_data.csv"));
        assert!(sys.console().output_contains("  1: Sample,AccelX"));
        assert!(sys.console().output_contains("  2: 0,1.000"));
    }

    #[test]
    fn system_show_file_suggests_listing_when_missing() {
        let controls = ControlBank::new();
        let mut sys = system(&controls, SimVolume::new());
        sys.finish_init();

        sys.poll(0, &level_sample(), Some(b'a'));
        sys.poll(10, &level_sample(), Some(b'd'));

        assert_eq!(sys.state(), SystemState::Error);
        assert!(sys.console().output_contains("read error: not found"));
        assert!(sys
            .console()
            .output_contains("use 'c' to list available files."));
    }

    #[test]
    fn system_show_file_suggests_mount_when_unmounted() {
        let controls = ControlBank::new();
        let mut sys = system(&controls, SimVolume::new());
        sys.finish_init();

        sys.poll(0, &level_sample(), Some(b'd'));
        assert!(sys.console().output_contains("use 'a' to mount the card."));
    }

    #[test]
    fn system_listing_classifies_entries() {
        let controls = ControlBank::new();
        let mut volume = SimVolume::new();
        volume.add_dir("logs");
        volume.add_file("a.txt", b"aa");
        volume.add_file("b.txt", b"bbb");
        volume.set_read_only("b.txt");
        let mut sys = system(&controls, volume);
        sys.finish_init();

        sys.poll(0, &level_sample(), Some(b'a'));
        sys.poll(10, &level_sample(), Some(b'c'));

        assert_eq!(sys.state(), SystemState::Listing);
        assert!(sys.console().output_contains("logs [directory] [size=0]"));
        assert!(sys
            .console()
            .output_contains("a.txt [writable file] [size=2]"));
        assert!(sys
            .console()
            .output_contains("b.txt [read only file] [size=3]"));
    }

    #[test]
    fn system_free_space_shortcut_reports_kib() {
        let controls = ControlBank::new();
        let mut sys = system(&controls, SimVolume::new());
        sys.finish_init();

        sys.poll(0, &level_sample(), Some(b'a'));
        sys.poll(10, &level_sample(), Some(b'e'));

        assert_eq!(sys.state(), SystemState::FreeSpace);
        assert!(sys.console().output_contains("4096 KiB total drive space."));
        assert!(sys.console().output_contains("4000 KiB available."));
    }

    #[test]
    fn system_help_lists_shortcuts_and_command_table() {
        let controls = ControlBank::new();
        let mut sys = system(&controls, SimVolume::new());
        sys.finish_init();

        sys.poll(0, &level_sample(), Some(b'g'));
        assert_eq!(sys.state(), SystemState::Help);
        assert!(sys
            .console()
            .output_contains("press 'h' to START continuous capture"));
        assert!(sys.console().output_contains("setrtc <DD> <MM> <YY>"));
        assert!(sys.console().output_contains("choose a command (g = help):"));
    }

    #[test]
    fn system_unknown_command_is_reported() {
        let controls = ControlBank::new();
        let mut sys = system(&controls, SimVolume::new());
        sys.finish_init();

        let mut t = 0u64;
        feed_line(&mut sys, "zzz", &mut t);
        assert!(sys.console().output_contains("Command \"zzz\" not found"));
    }

    #[test]
    fn system_setrtc_passes_fields_through() {
        let controls = ControlBank::new();
        let mut sys = system(&controls, SimVolume::new());
        sys.finish_init();

        let mut t = 0u64;
        feed_line(&mut sys, "setrtc 7 8 25 1 2 3", &mut t);

        let dt = sys.rtc().last_set.expect("clock should have been set");
        assert_eq!(dt.day, 7);
        assert_eq!(dt.month, 8);
        assert_eq!(dt.year, 2025);
        assert_eq!(dt.hour, 1);
        assert_eq!(dt.minute, 2);
        assert_eq!(dt.second, 3);
    }

    #[test]
    fn system_boot_chime_then_quiet() {
        let controls = ControlBank::new();
        let mut sys = system(&controls, SimVolume::new());
        sys.finish_init();

        let snap = sys.poll(0, &level_sample(), None);
        assert_eq!(snap.chime, Some(Chime::UnmountDone));
        assert_eq!(snap.lamp, Lamp::rgb(true, true, true));

        let snap = sys.poll(10, &level_sample(), None);
        assert_eq!(snap.chime, None);
    }

    #[test]
    fn system_error_lamp_is_red() {
        let controls = ControlBank::new();
        let mut sys = system(&controls, SimVolume::new());
        sys.finish_init();

        // Stop with nothing running: reported and reflected as Error.
        let snap = sys.poll(0, &level_sample(), Some(b'i'));
        assert_eq!(sys.state(), SystemState::Error);
        assert_eq!(snap.lamp, Lamp::rgb(true, false, false));
        assert_eq!(snap.chime, Some(Chime::Fault));
    }

    #[test]
    fn system_attitude_feeds_snapshot_without_capture() {
        let controls = ControlBank::new();
        let mut sys = system(&controls, SimVolume::new());
        sys.finish_init();

        let snap = sys.poll(0, &tilted_sample(), None);
        assert!(!snap.capture_active);
        assert!((snap.pitch_deg + 45.0).abs() < 1e-3);
        assert!(snap.roll_deg.abs() < 1e-3);
    }

    // ════════════════════════════════════════════════════════════════════════
    // Presentation adapter
    // ════════════════════════════════════════════════════════════════════════

    fn snapshot_for(state: SystemState) -> Snapshot {
        Snapshot {
            state,
            lamp: Lamp::OFF,
            chime: None,
            roll_deg: 12.3,
            pitch_deg: -4.5,
            sample_count: 42,
            capture_active: false,
            mounted: false,
        }
    }

    #[test]
    fn screen_template_selection() {
        assert_eq!(
            Screen::for_state(SystemState::CaptureStarting),
            Screen::Capturing
        );
        assert_eq!(Screen::for_state(SystemState::Normal), Screen::Status);
        assert_eq!(Screen::for_state(SystemState::Mounting), Screen::Status);
        assert_eq!(Screen::for_state(SystemState::Unmounting), Screen::Status);
        assert_eq!(Screen::for_state(SystemState::Listing), Screen::Listing);
        assert_eq!(Screen::for_state(SystemState::Reading), Screen::Reading);
        assert_eq!(
            Screen::for_state(SystemState::CaptureStopping),
            Screen::Stopped
        );
        assert_eq!(Screen::for_state(SystemState::Error), Screen::Error);
        assert_eq!(Screen::for_state(SystemState::Help), Screen::Help);
        assert_eq!(Screen::for_state(SystemState::Init), Screen::Blank);
        assert_eq!(Screen::for_state(SystemState::FreeSpace), Screen::Blank);
        assert_eq!(Screen::for_state(SystemState::Format), Screen::Blank);
    }

    #[test]
    fn render_capturing_shows_angles() {
        let mut panel = SimPanel::new();
        render(&snapshot_for(SystemState::CaptureStarting), &mut panel);
        assert_eq!(panel.flushes, 1);
        assert!(panel.has_text("LOGGING"));
        assert!(panel.has_text(" 12.3"));
        assert!(panel.has_text(" -4.5"));
    }

    #[test]
    fn render_status_shows_mount_flag() {
        let mut panel = SimPanel::new();
        render(&snapshot_for(SystemState::Normal), &mut panel);
        assert!(panel.has_text("SD: UNMOUNTED"));

        let mut snap = snapshot_for(SystemState::Normal);
        snap.mounted = true;
        let mut panel = SimPanel::new();
        render(&snap, &mut panel);
        assert!(panel.has_text("SD: MOUNTED"));
    }

    #[test]
    fn render_stopped_shows_final_count() {
        let mut panel = SimPanel::new();
        render(&snapshot_for(SystemState::CaptureStopping), &mut panel);
        assert!(panel.has_text("SAMPLES:"));
        assert!(panel.has_text("42"));
    }

    #[test]
    fn render_blank_states_draw_nothing() {
        let mut panel = SimPanel::new();
        render(&snapshot_for(SystemState::FreeSpace), &mut panel);
        assert_eq!(panel.flushes, 1);
        assert!(panel.texts.is_empty());
        assert_eq!(panel.rects, 0);
    }
}
