//! Sampling & logging engine.
//!
//! Owns the open log file, the sample counter and the 10 Hz cadence of an
//! active capture session. The file handle exists if and only if a session
//! is active; a failed write closes the file and drops the engine back to
//! Idle on its own, so callers never see a half-open resource.

use core::f32::consts::PI;
use core::fmt::Write as _;

use heapless::String;
use libm::{atan2f, sqrtf};

use crate::config::{
    ACCEL_LSB_PER_G, CSV_HEADER, GYRO_LSB_PER_DPS, LOG_FILENAME, SAMPLE_PERIOD_MS,
    SYNC_EVERY_SAMPLES,
};
use crate::error::Error;
use crate::hal::{RawImuSample, VolumeDriver};

/// One sensor reading converted to physical units plus derived angles.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PhysicalSample {
    pub accel_g: [f32; 3],
    pub gyro_dps: [f32; 3],
    pub roll_deg: f32,
    pub pitch_deg: f32,
}

/// Convert a raw register read to physical units and attitude angles.
///
/// Runs every loop iteration whether or not a capture is active - the
/// angles also feed the live display.
pub fn convert(raw: &RawImuSample) -> PhysicalSample {
    let ax = raw.accel[0] as f32 / ACCEL_LSB_PER_G;
    let ay = raw.accel[1] as f32 / ACCEL_LSB_PER_G;
    let az = raw.accel[2] as f32 / ACCEL_LSB_PER_G;

    let gx = raw.gyro[0] as f32 / GYRO_LSB_PER_DPS;
    let gy = raw.gyro[1] as f32 / GYRO_LSB_PER_DPS;
    let gz = raw.gyro[2] as f32 / GYRO_LSB_PER_DPS;

    let roll_deg = atan2f(ay, az) * 180.0 / PI;
    let pitch_deg = atan2f(-ax, sqrtf(ay * ay + az * az)) * 180.0 / PI;

    PhysicalSample {
        accel_g: [ax, ay, az],
        gyro_dps: [gx, gy, gz],
        roll_deg,
        pitch_deg,
    }
}

/// What a successful tick did, beyond appending one row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickReport {
    /// Index the row was tagged with.
    pub index: u32,
    /// Whether this tick hit the periodic durability sync.
    pub synced: bool,
}

/// Append-only CSV logging engine.
pub struct CaptureEngine<V: VolumeDriver> {
    file: Option<V::File>,
    counter: u32,
    next_due_ms: u64,
}

impl<V: VolumeDriver> CaptureEngine<V> {
    pub const fn new() -> Self {
        Self {
            file: None,
            counter: 0,
            next_due_ms: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.file.is_some()
    }

    /// Samples written in the current session, or the final count of the
    /// previous session while Idle.
    pub fn count(&self) -> u32 {
        self.counter
    }

    /// True when a session is active and the next sample is due.
    pub fn due(&self, now_ms: u64) -> bool {
        self.is_active() && now_ms >= self.next_due_ms
    }

    /// Idle → Active: create the log file, write the CSV header, reset the
    /// counter and arm the sample clock.
    pub fn start(&mut self, volume: &mut V, now_ms: u64) -> Result<(), Error> {
        if self.is_active() {
            return Err(Error::AlreadyActive);
        }

        let mut file = volume.create(LOG_FILENAME).map_err(Error::Device)?;
        if let Err(e) = volume.write(&mut file, CSV_HEADER.as_bytes()) {
            volume.close(file);
            return Err(Error::Device(e));
        }

        self.counter = 0;
        self.next_due_ms = now_ms + SAMPLE_PERIOD_MS;
        self.file = Some(file);
        Ok(())
    }

    /// Active → Idle: close the file and report the final sample count.
    pub fn stop(&mut self, volume: &mut V) -> Result<u32, Error> {
        match self.file.take() {
            Some(file) => {
                volume.close(file);
                Ok(self.counter)
            }
            None => Err(Error::NotActive),
        }
    }

    /// Append one CSV row for `sample` and reschedule the next due time.
    ///
    /// A write or sync failure closes the file and returns the engine to
    /// Idle before the error is reported.
    pub fn tick(
        &mut self,
        volume: &mut V,
        now_ms: u64,
        sample: &PhysicalSample,
    ) -> Result<TickReport, Error> {
        let mut file = match self.file.take() {
            Some(file) => file,
            None => return Err(Error::NotActive),
        };

        // The row format fits the buffer with room to spare; a formatting
        // error can only mean capacity overflow and is ignored like any
        // other truncation of bounded buffers.
        let mut row: String<96> = String::new();
        let _ = write!(
            row,
            "{},{:.3},{:.3},{:.3},{:.3},{:.3},{:.3},{:.2},{:.2}\n",
            self.counter,
            sample.accel_g[0],
            sample.accel_g[1],
            sample.accel_g[2],
            sample.gyro_dps[0],
            sample.gyro_dps[1],
            sample.gyro_dps[2],
            sample.roll_deg,
            sample.pitch_deg,
        );

        if let Err(e) = volume.write(&mut file, row.as_bytes()) {
            volume.close(file);
            return Err(Error::Device(e));
        }

        let index = self.counter;
        self.counter += 1;
        self.next_due_ms = now_ms + SAMPLE_PERIOD_MS;

        let synced = self.counter % SYNC_EVERY_SAMPLES == 0;
        if synced {
            if let Err(e) = volume.sync(&mut file) {
                volume.close(file);
                return Err(Error::Device(e));
            }
        }

        self.file = Some(file);
        Ok(TickReport { index, synced })
    }
}

impl<V: VolumeDriver> Default for CaptureEngine<V> {
    fn default() -> Self {
        Self::new()
    }
}
