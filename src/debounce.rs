//! Debounced toggle controls fed from the button interrupt path.
//!
//! The edge handler is the only writer; the main loop only reads. All
//! mutation is load/store on atomics - no read-modify-write - so the bank is
//! usable from interrupt context on cores without atomic RMW (thumbv6-m).

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::config::DEBOUNCE_WINDOW_MS;

/// The two physical controls the firmware knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlId {
    /// Button A - start/stop capture.
    Capture = 0,
    /// Button B - mount/unmount the storage volume.
    Mount = 1,
}

/// One debounced toggle: logical value plus last accepted edge time.
struct DebouncedControl {
    toggle: AtomicBool,
    last_edge_ms: AtomicU32,
}

impl DebouncedControl {
    const fn new() -> Self {
        Self {
            toggle: AtomicBool::new(false),
            last_edge_ms: AtomicU32::new(0),
        }
    }
}

/// Both controls. Lives in a `static` so the interrupt path can reach it.
pub struct ControlBank {
    controls: [DebouncedControl; 2],
}

impl ControlBank {
    pub const fn new() -> Self {
        Self {
            controls: [DebouncedControl::new(), DebouncedControl::new()],
        }
    }

    /// Edge report from interrupt context. Applies the per-control
    /// refractory window and flips the toggle on an accepted edge.
    ///
    /// Single writer per control: must not be called for the same control
    /// from more than one execution context.
    pub fn on_edge(&self, id: ControlId, now_ms: u32) {
        let control = &self.controls[id as usize];
        let last = control.last_edge_ms.load(Ordering::Relaxed);
        if now_ms.wrapping_sub(last) >= DEBOUNCE_WINDOW_MS {
            control.last_edge_ms.store(now_ms, Ordering::Relaxed);
            let value = control.toggle.load(Ordering::Relaxed);
            control.toggle.store(!value, Ordering::Relaxed);
        }
    }

    /// Current logical toggle value, read by the main loop.
    pub fn read(&self, id: ControlId) -> bool {
        self.controls[id as usize].toggle.load(Ordering::Relaxed)
    }
}

impl Default for ControlBank {
    fn default() -> Self {
        Self::new()
    }
}
