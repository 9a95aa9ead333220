//! Interfaces the core expects from its hardware collaborators.
//!
//! The core never touches hardware directly: the embedded binary provides
//! implementations backed by real drivers (`src/hw/`) and the test suite
//! uses the simulations in [`crate::sim`].

use heapless::String;

use crate::config::NAME_CAP;
use crate::error::DeviceErrorKind;

/// One raw register read from the motion sensor.
///
/// Values are left in sensor units; conversion to physical units happens in
/// [`crate::capture::convert`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawImuSample {
    pub accel: [i16; 3],
    pub gyro: [i16; 3],
    pub temp: i16,
}

/// Motion sensor collaborator: one raw register read per call.
pub trait ImuSensor {
    type Error;

    fn read_raw(&mut self) -> Result<RawImuSample, Self::Error>;
}

/// Wall-clock date and time, passed to the clock collaborator without range
/// validation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DateTime {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// Real-time clock collaborator.
pub trait RtcDriver {
    fn set_datetime(&mut self, dt: &DateTime) -> Result<(), DeviceErrorKind>;
}

/// Filesystem geometry counters used for the free-space report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct VolumeStats {
    pub cluster_count: u32,
    pub sectors_per_cluster: u32,
    pub free_clusters: u32,
}

/// Three-way classification of a directory entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EntryKind {
    Directory,
    ReadOnlyFile,
    File,
}

/// One directory entry reported by [`VolumeDriver::list`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String<NAME_CAP>,
    pub kind: EntryKind,
    pub size: u32,
}

/// Filesystem driver for one logical volume.
///
/// File handles are opaque tokens and all I/O goes through the driver, so a
/// component can own a handle without borrowing the driver. Handles must be
/// returned through [`VolumeDriver::close`]; dropping one leaks driver
/// resources until the next unmount.
pub trait VolumeDriver {
    type File;

    fn mount(&mut self) -> Result<(), DeviceErrorKind>;
    fn unmount(&mut self) -> Result<(), DeviceErrorKind>;

    /// Mark the underlying device uninitialized so the next mount re-probes
    /// the hardware. Media may have been swapped while unmounted.
    fn invalidate(&mut self);

    fn format(&mut self) -> Result<(), DeviceErrorKind>;
    fn stats(&self) -> Result<VolumeStats, DeviceErrorKind>;

    /// Create `name` for writing, truncating any existing content.
    fn create(&mut self, name: &str) -> Result<Self::File, DeviceErrorKind>;

    /// Open `name` for reading.
    fn open(&mut self, name: &str) -> Result<Self::File, DeviceErrorKind>;

    fn write(&mut self, file: &mut Self::File, data: &[u8]) -> Result<(), DeviceErrorKind>;

    /// Read up to `buf.len()` bytes; `Ok(0)` signals end of file.
    fn read(&mut self, file: &mut Self::File, buf: &mut [u8]) -> Result<usize, DeviceErrorKind>;

    /// Push buffered writes to the medium.
    fn sync(&mut self, file: &mut Self::File) -> Result<(), DeviceErrorKind>;

    fn close(&mut self, file: Self::File);

    fn file_size(&mut self, file: &Self::File) -> Result<u32, DeviceErrorKind>;

    /// Visit every entry in `path` ("" selects the current directory).
    fn list(
        &mut self,
        path: &str,
        visit: &mut dyn FnMut(&DirEntry),
    ) -> Result<(), DeviceErrorKind>;
}

/// Byte sink of the raw console transport. Writes are infallible from the
/// core's perspective; a transport that cannot accept a byte drops it.
pub trait ConsolePort {
    fn write(&mut self, bytes: &[u8]);
}

/// Fixed-size monochrome status panel primitives.
pub trait Panel {
    fn clear(&mut self);

    /// Outline rectangle with top-left corner at (x, y).
    fn rect(&mut self, x: i32, y: i32, w: u32, h: u32);

    fn line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32);

    /// Draw `s` with its top-left corner at (x, y).
    fn text(&mut self, s: &str, x: i32, y: i32);

    /// Push the frame buffer to the panel.
    fn flush(&mut self);
}
