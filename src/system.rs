//! Central dispatcher.
//!
//! [`System`] is the single owned context struct: it holds the current
//! state, its own copies of the two desired flags, the storage manager, the
//! capture engine, the command parser and the console/clock collaborators.
//! Every loop iteration calls [`System::poll`] exactly once; the interrupt
//! path only ever touches the shared [`ControlBank`].

use core::fmt;
use core::fmt::Write as _;

use heapless::String;

use crate::capture::{convert, CaptureEngine, PhysicalSample};
use crate::config::{LOG_FILENAME, NAME_CAP, NUMBERED_VIEW_LIMIT};
use crate::console::{bounded, Command, CommandParser, FmtPort, LineOutcome, COMMANDS};
use crate::debounce::{ControlBank, ControlId};
use crate::error::Error;
use crate::hal::{ConsolePort, EntryKind, RawImuSample, RtcDriver, VolumeDriver};
use crate::state::{indicators_for, Chime, Lamp, SystemState};
use crate::storage::StorageManager;

/// Projection of one loop iteration, consumed by the presentation adapter
/// and the outer loop's lamp/buzzer driving.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Snapshot {
    pub state: SystemState,
    pub lamp: Lamp,
    /// Chime to play now, if a transition requested one this iteration.
    pub chime: Option<Chime>,
    pub roll_deg: f32,
    pub pitch_deg: f32,
    pub sample_count: u32,
    pub capture_active: bool,
    /// Mounted flag of the default volume.
    pub mounted: bool,
}

pub struct System<'c, V: VolumeDriver, C: ConsolePort, R: RtcDriver> {
    state: SystemState,
    /// Last state the indicators were derived for; avoids redundant
    /// recomputation while the state holds.
    last_indicated: SystemState,
    lamp: Lamp,
    pending_chime: Option<Chime>,
    controls: &'c ControlBank,
    capture_toggle_seen: bool,
    mount_toggle_seen: bool,
    capture_desired: bool,
    mount_desired: bool,
    storage: StorageManager<V>,
    engine: CaptureEngine<V>,
    parser: CommandParser,
    console: C,
    rtc: R,
}

impl<'c, V: VolumeDriver, C: ConsolePort, R: RtcDriver> System<'c, V, C, R> {
    pub fn new(
        controls: &'c ControlBank,
        storage: StorageManager<V>,
        console: C,
        rtc: R,
    ) -> Self {
        let mut system = Self {
            state: SystemState::Init,
            last_indicated: SystemState::Init,
            lamp: Lamp::OFF,
            pending_chime: None,
            controls,
            capture_toggle_seen: false,
            mount_toggle_seen: false,
            capture_desired: false,
            mount_desired: false,
            storage,
            engine: CaptureEngine::new(),
            parser: CommandParser::new(),
            console,
            rtc,
        };
        if let Some(update) = indicators_for(SystemState::Init) {
            if let Some(lamp) = update.lamp {
                system.lamp = lamp;
            }
            system.pending_chime = update.chime;
        }
        system
    }

    pub fn state(&self) -> SystemState {
        self.state
    }

    pub fn storage(&self) -> &StorageManager<V> {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut StorageManager<V> {
        &mut self.storage
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }

    pub fn rtc(&self) -> &R {
        &self.rtc
    }

    /// Print the startup banner, the shortcut list and the first prompt.
    pub fn greet(&mut self) {
        self.print(format_args!("imu2sd data logger\n"));
        self.print_help();
        self.print(format_args!("\n> "));
    }

    /// Leave Init once the outer loop's boot splash is done.
    pub fn finish_init(&mut self) {
        self.set_state(SystemState::Normal);
    }

    /// One loop iteration, evaluated in fixed order: button toggles, mount
    /// reconciliation, capture reconciliation, console input, engine tick,
    /// snapshot.
    pub fn poll(&mut self, now_ms: u64, raw: &RawImuSample, rx: Option<u8>) -> Snapshot {
        let mount_toggle = self.controls.read(ControlId::Mount);
        if mount_toggle != self.mount_toggle_seen {
            self.mount_toggle_seen = mount_toggle;
            self.mount_desired = mount_toggle;
        }
        let capture_toggle = self.controls.read(ControlId::Capture);
        if capture_toggle != self.capture_toggle_seen {
            self.capture_toggle_seen = capture_toggle;
            self.capture_desired = capture_toggle;
        }

        // Mount reconciliation strictly precedes capture reconciliation, so
        // a capture start requested in the same tick as a mount observes
        // the post-mount state.
        self.reconcile_mount();
        self.reconcile_capture(now_ms);

        // Both input paths observe every received byte: the line parser
        // accumulates it and the single-key shortcut table matches it.
        if let Some(byte) = rx {
            if let Some(outcome) = self.parser.feed_byte(byte, &mut self.console) {
                self.handle_line(outcome);
            }
            self.handle_shortcut(byte, now_ms);
        }

        // The conversion runs every cycle; the angles also feed the display.
        let sample = convert(raw);
        if self.engine.due(now_ms) {
            self.handle_tick(now_ms, &sample);
        }

        Snapshot {
            state: self.state,
            lamp: self.lamp,
            chime: self.pending_chime.take(),
            roll_deg: sample.roll_deg,
            pitch_deg: sample.pitch_deg,
            sample_count: self.engine.count(),
            capture_active: self.engine.is_active(),
            mounted: self.storage.default_mounted(),
        }
    }

    /// Transition to `next`, re-deriving the indicators exactly once per
    /// state change.
    fn set_state(&mut self, next: SystemState) {
        self.state = next;
        if self.last_indicated == next {
            return;
        }
        self.last_indicated = next;
        if let Some(update) = indicators_for(next) {
            if let Some(lamp) = update.lamp {
                self.lamp = lamp;
            }
            if update.chime.is_some() {
                self.pending_chime = update.chime;
            }
        }
    }

    fn print(&mut self, args: fmt::Arguments<'_>) {
        let _ = FmtPort(&mut self.console).write_fmt(args);
    }

    /// Report an error on the console and reflect it in the system state.
    fn report_failure(&mut self, operation: &str, err: Error) {
        {
            let mut out = FmtPort(&mut self.console);
            let _ = write!(out, "{} error: {}\n", operation, err.describe());
            if let Error::Device(kind) = err {
                if let Some(hint) = kind.suggestion() {
                    let _ = write!(out, "{}\n", hint);
                }
            }
        }
        self.set_state(SystemState::Error);
    }

    fn reconcile_mount(&mut self) {
        let mounted = self.storage.default_mounted();
        if self.mount_desired == mounted {
            return;
        }
        if self.mount_desired {
            self.do_mount(None);
        } else {
            self.do_unmount(None);
        }
        self.print(format_args!("\nchoose a command (g = help): "));
    }

    fn reconcile_capture(&mut self, now_ms: u64) {
        if self.capture_desired == self.engine.is_active() {
            return;
        }
        if self.capture_desired {
            self.start_capture(now_ms);
        } else {
            self.stop_capture();
        }
        self.print(format_args!("\nchoose a command (g = help): "));
    }

    fn do_mount(&mut self, volume: Option<&str>) {
        self.set_state(SystemState::Mounting);
        let label = self.volume_label(volume);
        self.print(format_args!("\nmounting volume {}...\n", label));
        match self.storage.mount(volume) {
            Ok(()) => {
                self.print(format_args!("volume {} mounted\n", label));
                self.set_state(SystemState::Normal);
            }
            Err(e) => self.report_failure("mount", e),
        }
        // Keep the desired flag in line with whichever input path ran last.
        self.mount_desired = self.storage.default_mounted();
    }

    fn do_unmount(&mut self, volume: Option<&str>) {
        self.set_state(SystemState::Unmounting);
        let label = self.volume_label(volume);
        self.print(format_args!("\nunmounting volume {}...\n", label));
        match self.storage.unmount(volume) {
            Ok(()) => {
                self.print(format_args!("volume {} unmounted\n", label));
                self.set_state(SystemState::Normal);
            }
            Err(e) => self.report_failure("unmount", e),
        }
        self.mount_desired = self.storage.default_mounted();
    }

    fn do_format(&mut self, volume: Option<&str>) {
        self.set_state(SystemState::Format);
        self.print(format_args!("\nformatting the volume. please wait...\n"));
        match self.storage.format(volume) {
            Ok(()) => self.print(format_args!("format complete\n")),
            Err(e) => self.report_failure("format", e),
        }
    }

    fn do_getfree(&mut self, volume: Option<&str>) {
        self.set_state(SystemState::FreeSpace);
        match self.storage.free_space(volume) {
            Ok((total_kib, free_kib)) => self.print(format_args!(
                "{:>10} KiB total drive space.\n{:>10} KiB available.\n",
                total_kib, free_kib
            )),
            Err(e) => self.report_failure("getfree", e),
        }
    }

    fn do_list(&mut self, path: &str) {
        self.print(format_args!(
            "Directory listing: {}\n",
            if path.is_empty() { "/" } else { path }
        ));
        let storage = &mut self.storage;
        let console = &mut self.console;
        let result = storage.list(path, &mut |entry| {
            let kind = match entry.kind {
                EntryKind::Directory => "directory",
                EntryKind::ReadOnlyFile => "read only file",
                EntryKind::File => "writable file",
            };
            let _ = write!(
                FmtPort(&mut *console),
                "{} [{}] [size={}]\n",
                entry.name, kind, entry.size
            );
        });
        if let Err(e) = result {
            self.report_failure("ls", e);
        }
    }

    fn do_cat(&mut self, path: &str) {
        if let Err(e) = self.stream_file(path) {
            self.report_failure("cat", e);
        }
    }

    /// Stream `path` from the default volume to the console.
    fn stream_file(&mut self, path: &str) -> Result<(), Error> {
        let volume = self.storage.default_volume()?;
        let mut file = volume.open(path).map_err(Error::Device)?;
        let mut buf = [0u8; 128];
        loop {
            match volume.read(&mut file, &mut buf) {
                Ok(0) => break,
                Ok(n) => self.console.write(&buf[..n]),
                Err(e) => {
                    volume.close(file);
                    return Err(Error::Device(e));
                }
            }
        }
        volume.close(file);
        Ok(())
    }

    /// The 'd' shortcut: show the fixed capture file with a size header,
    /// numbering lines for small files.
    fn show_capture_file(&mut self) {
        if let Err(e) = self.stream_capture_file() {
            self.report_failure("read", e);
        }
    }

    fn stream_capture_file(&mut self) -> Result<(), Error> {
        let storage = &mut self.storage;
        let console = &mut self.console;
        let volume = storage.default_volume()?;
        let mut file = volume.open(LOG_FILENAME).map_err(Error::Device)?;
        let size = volume.file_size(&file).unwrap_or(0);
        let _ = write!(
            FmtPort(&mut *console),
            "\n=== file view ===\nname: {}\nsize: {} bytes\n",
            LOG_FILENAME, size
        );

        let number_lines = size < NUMBERED_VIEW_LIMIT;
        let mut line_no: u32 = 1;
        let mut at_line_start = true;
        let mut buf = [0u8; 128];
        loop {
            let n = match volume.read(&mut file, &mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    volume.close(file);
                    return Err(Error::Device(e));
                }
            };
            for &byte in &buf[..n] {
                if number_lines && at_line_start {
                    let _ = write!(FmtPort(&mut *console), "{:3}: ", line_no);
                    line_no += 1;
                    at_line_start = false;
                }
                console.write(&[byte]);
                if byte == b'\n' {
                    at_line_start = true;
                }
            }
        }
        volume.close(file);
        let _ = write!(FmtPort(&mut *console), "\nfile read complete\n");
        Ok(())
    }

    fn start_capture(&mut self, now_ms: u64) {
        self.set_state(SystemState::CaptureStarting);
        let result = match self.storage.default_volume() {
            Ok(volume) => self.engine.start(volume, now_ms),
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => self.print(format_args!(
                "capture started at 10 Hz, writing {}\npress 'i' to stop\n",
                LOG_FILENAME
            )),
            Err(e) => self.report_failure("capture start", e),
        }
        self.capture_desired = self.engine.is_active();
    }

    fn stop_capture(&mut self) {
        self.set_state(SystemState::CaptureStopping);
        let result = match self.storage.default_volume() {
            Ok(volume) => self.engine.stop(volume),
            Err(e) => Err(e),
        };
        match result {
            Ok(count) => self.print(format_args!(
                "capture finished: {} samples written to {}\n",
                count, LOG_FILENAME
            )),
            Err(e) => self.report_failure("capture stop", e),
        }
        self.capture_desired = self.engine.is_active();
    }

    fn handle_tick(&mut self, now_ms: u64, sample: &PhysicalSample) {
        let result = match self.storage.default_volume() {
            Ok(volume) => self.engine.tick(volume, now_ms, sample),
            Err(e) => Err(e),
        };
        match result {
            Ok(report) if report.synced => {
                self.print(format_args!("saved {} samples...\n", report.index + 1));
            }
            Ok(_) => {}
            Err(e) => {
                // The engine already closed the file and returned to Idle.
                self.report_failure("log write", e);
                self.capture_desired = false;
            }
        }
    }

    fn handle_line(&mut self, outcome: LineOutcome) {
        match outcome {
            LineOutcome::Dispatch(command) => self.dispatch(command),
            LineOutcome::Unknown(token) => {
                self.print(format_args!("Command \"{}\" not found\n", token));
            }
            LineOutcome::Invalid(e) => {
                self.print(format_args!("{}\n", e.describe()));
            }
            LineOutcome::Blank => {}
        }
        self.print(format_args!("\n> "));
    }

    fn dispatch(&mut self, command: Command) {
        match command {
            Command::SetRtc(dt) => {
                if let Err(e) = self.rtc.set_datetime(&dt) {
                    self.report_failure("setrtc", Error::Device(e));
                }
            }
            Command::Format { volume } => self.do_format(volume.as_deref()),
            Command::Mount { volume } => self.do_mount(volume.as_deref()),
            Command::Unmount { volume } => self.do_unmount(volume.as_deref()),
            Command::GetFree { volume } => self.do_getfree(volume.as_deref()),
            Command::List { path } => {
                self.set_state(SystemState::Listing);
                self.do_list(path.as_deref().unwrap_or(""));
            }
            Command::Cat { path } => {
                self.set_state(SystemState::Reading);
                self.do_cat(path.as_str());
            }
            Command::Help => {
                self.set_state(SystemState::Help);
                self.print_help();
            }
        }
    }

    fn handle_shortcut(&mut self, byte: u8, now_ms: u64) {
        match byte {
            b'a' => self.do_mount(None),
            b'b' => self.do_unmount(None),
            b'c' => {
                self.set_state(SystemState::Listing);
                self.print(format_args!("\nlisting files on the volume\n"));
                self.do_list("");
            }
            b'd' => {
                self.set_state(SystemState::Reading);
                self.show_capture_file();
            }
            b'e' => {
                self.print(format_args!("\nquerying free space\n\n"));
                self.do_getfree(None);
            }
            b'f' => self.do_format(None),
            b'g' => {
                self.set_state(SystemState::Help);
                self.print_help();
            }
            b'h' => self.start_capture(now_ms),
            b'i' => self.stop_capture(),
            _ => return,
        }
        self.print(format_args!("\nchoose a command (g = help): "));
    }

    fn print_help(&mut self) {
        let mut out = FmtPort(&mut self.console);
        let _ = write!(out, "\navailable commands:\n\n");
        let _ = write!(out, "press 'a' to mount the volume\n");
        let _ = write!(out, "press 'b' to unmount the volume\n");
        let _ = write!(out, "press 'c' to list files\n");
        let _ = write!(out, "press 'd' to show the capture file\n");
        let _ = write!(out, "press 'e' to report free space\n");
        let _ = write!(out, "press 'f' to format the volume\n");
        let _ = write!(out, "press 'g' to show this help\n");
        let _ = write!(out, "press 'h' to START continuous capture\n");
        let _ = write!(out, "press 'i' to STOP continuous capture\n");
        let _ = write!(out, "\nconsole commands:\n");
        for record in COMMANDS {
            let _ = write!(out, "  {}\n", record.help);
        }
    }

    fn volume_label(&self, name: Option<&str>) -> String<NAME_CAP> {
        match self.storage.session(name) {
            Ok(session) => session.name.clone(),
            Err(_) => bounded(name.unwrap_or("?")),
        }
    }
}
