//! Presentation adapter: projects a [`Snapshot`] onto the status panel.
//!
//! Layouts are fixed templates keyed by system state. The adapter holds no
//! state of its own and is driven at the outer loop's display cadence.

use core::fmt::Write as _;

use heapless::String;

use crate::hal::Panel;
use crate::state::SystemState;
use crate::system::Snapshot;

/// Template selected for a given state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    Capturing,
    Status,
    Listing,
    Reading,
    Stopped,
    Error,
    Help,
    Blank,
}

impl Screen {
    pub fn for_state(state: SystemState) -> Screen {
        use SystemState::*;
        match state {
            CaptureStarting => Screen::Capturing,
            Normal | Mounting | Unmounting => Screen::Status,
            Listing => Screen::Listing,
            Reading => Screen::Reading,
            CaptureStopping => Screen::Stopped,
            Error => Screen::Error,
            Help => Screen::Help,
            Init | FreeSpace | Format => Screen::Blank,
        }
    }
}

/// Render one frame.
pub fn render<P: Panel>(snapshot: &Snapshot, panel: &mut P) {
    panel.clear();
    match Screen::for_state(snapshot.state) {
        Screen::Capturing => draw_capturing(snapshot, panel),
        Screen::Status => draw_status(snapshot, panel),
        Screen::Listing => draw_listing(panel),
        Screen::Reading => draw_reading(panel),
        Screen::Stopped => draw_stopped(snapshot, panel),
        Screen::Error => draw_error(snapshot, panel),
        Screen::Help => draw_help(panel),
        Screen::Blank => {}
    }
    panel.flush();
}

fn mounted_label(snapshot: &Snapshot) -> (&'static str, i32) {
    if snapshot.mounted {
        ("SD: MOUNTED", 18)
    } else {
        ("SD: UNMOUNTED", 8)
    }
}

fn draw_capturing<P: Panel>(snapshot: &Snapshot, panel: &mut P) {
    let mut roll: String<16> = String::new();
    let _ = write!(roll, "{:5.1}", snapshot.roll_deg);
    let mut pitch: String<16> = String::new();
    let _ = write!(pitch, "{:5.1}", snapshot.pitch_deg);

    panel.rect(3, 3, 122, 60);
    panel.line(3, 25, 123, 25);
    panel.line(3, 37, 123, 37);
    panel.text("LOGGING", 22, 6);
    panel.text("IMU DATA", 33, 16);
    panel.text("MPU6050   10HZ", 10, 28);
    panel.line(63, 35, 63, 60);
    panel.text("roll", 14, 41);
    panel.text(roll.as_str(), 14, 52);
    panel.text("pitch", 73, 41);
    panel.text(pitch.as_str(), 73, 52);
}

fn draw_status<P: Panel>(snapshot: &Snapshot, panel: &mut P) {
    panel.rect(3, 3, 122, 60);
    panel.line(3, 30, 123, 30);
    panel.line(3, 47, 123, 47);
    panel.text("SYSTEM", 35, 8);
    panel.text("READY", 40, 20);
    let (label, x) = mounted_label(snapshot);
    panel.text(label, x, 36);
    panel.text("g=HELP", 35, 52);
}

fn draw_listing<P: Panel>(panel: &mut P) {
    panel.rect(3, 3, 122, 60);
    panel.line(3, 18, 123, 18);
    panel.line(3, 30, 123, 30);
    panel.text("SD CONTENTS", 22, 8);
    panel.text("FILE LISTING", 15, 20);
    panel.text("SEE THE", 30, 32);
    panel.text("TERMINAL", 30, 42);
    panel.text("FOR OUTPUT", 22, 52);
}

fn draw_reading<P: Panel>(panel: &mut P) {
    panel.rect(3, 3, 122, 60);
    panel.line(3, 18, 123, 18);
    panel.line(3, 30, 123, 30);
    panel.text("SD CONTENTS", 22, 8);
    panel.text("FILE VIEW", 26, 20);
    panel.text("SEE THE", 30, 32);
    panel.text("TERMINAL", 30, 42);
    panel.text("FOR OUTPUT", 22, 52);
}

fn draw_stopped<P: Panel>(snapshot: &Snapshot, panel: &mut P) {
    let mut count: String<12> = String::new();
    let _ = write!(count, "{}", snapshot.sample_count);

    panel.rect(3, 3, 122, 60);
    panel.line(3, 30, 123, 30);
    panel.line(3, 47, 123, 47);
    panel.text("DATA SAVED", 22, 8);
    panel.text("TO SD CARD", 22, 20);
    panel.text("SAMPLES:", 8, 35);
    panel.text(count.as_str(), 80, 35);
    panel.text("FILE: imu_data", 5, 50);
}

fn draw_error<P: Panel>(snapshot: &Snapshot, panel: &mut P) {
    panel.rect(3, 3, 122, 60);
    panel.line(3, 30, 123, 30);
    panel.line(3, 47, 123, 47);
    panel.text("COMMAND ERROR", 3, 8);
    panel.text("CHECK TERMINAL", 8, 20);
    let (label, x) = mounted_label(snapshot);
    panel.text(label, x, 36);
    panel.text("g=HELP", 35, 52);
}

fn draw_help<P: Panel>(panel: &mut P) {
    panel.rect(3, 3, 122, 60);
    panel.line(3, 18, 123, 18);
    panel.text("IMU2SD", 24, 8);
    panel.text("BTN A=CAPTURE", 6, 22);
    panel.text("BTN B=MOUNT", 6, 32);
    panel.text("KEYS a-i ON", 6, 42);
    panel.text("THE TERMINAL", 6, 52);
}
