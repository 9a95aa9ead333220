//! Application-wide constants and compile-time configuration.
//!
//! All timing parameters, buffer capacities and the hardware pin map live
//! here so they can be tuned in one place.

// Sampling & logging

/// Sensor sampling period while a capture session is active (ms). 10 Hz.
pub const SAMPLE_PERIOD_MS: u64 = 100;

/// Force a durability sync of the log file every this many samples
/// (roughly every 5 s at the nominal rate).
pub const SYNC_EVERY_SAMPLES: u32 = 50;

/// Target filename for capture sessions. Truncated on every start.
pub const LOG_FILENAME: &str = "imu_data.csv";

/// Fixed CSV header written at the start of every capture session.
pub const CSV_HEADER: &str = "Sample,AccelX,AccelY,AccelZ,GyroX,GyroY,GyroZ,Roll,Pitch\n";

/// Raw accelerometer LSB per g (±2 g full scale).
pub const ACCEL_LSB_PER_G: f32 = 16384.0;

/// Raw gyroscope LSB per degree/second (±250 °/s full scale).
pub const GYRO_LSB_PER_DPS: f32 = 131.0;

// Buttons

/// Refractory window after an accepted button edge (ms). Edges arriving
/// inside the window are ignored.
pub const DEBOUNCE_WINDOW_MS: u32 = 300;

// Console

/// Command line buffer capacity. Input beyond this is silently dropped.
pub const CMD_LINE_CAP: usize = 256;

/// Maximum length of a volume name or file path in console arguments.
pub const NAME_CAP: usize = 32;

/// Files smaller than this are shown with line numbers by the show-file
/// shortcut.
pub const NUMBERED_VIEW_LIMIT: u32 = 2048;

// Volumes

/// Logical name of the default (first) volume.
pub const DEFAULT_VOLUME: &str = "sd0";

/// Maximum number of configured volumes.
pub const MAX_VOLUMES: usize = 2;

// Timing (outer loop)

/// Status panel refresh period (ms). ~2 Hz.
pub const DISPLAY_PERIOD_MS: u64 = 500;

/// Main loop quantum (ms). Must stay well under [`SAMPLE_PERIOD_MS`].
pub const MAIN_LOOP_PERIOD_MS: u64 = 10;

/// Boot splash duration before the system enters Normal (ms).
pub const BOOT_SPLASH_MS: u64 = 5000;

/// Gap between buzzer beeps within one chime pattern (ms).
pub const CHIME_GAP_MS: u64 = 100;

// GPIO pin assignments (Raspberry Pi Pico)
//
// These are logical names; the actual `embassy_rp::peripherals::*` pins are
// selected in `main.rs`. Adjust for your carrier board.
//
//   IMU I²C0 SDA     → GP0
//   IMU I²C0 SCL     → GP1
//   Button A (capture) → GP5
//   Button B (mount)   → GP6
//   Console UART1 TX → GP8
//   Console UART1 RX → GP9
//   Lamp green       → GP11
//   Lamp blue        → GP12
//   Lamp red         → GP13
//   OLED I²C1 SDA    → GP14
//   OLED I²C1 SCL    → GP15
//   SD SPI0 MISO     → GP16
//   SD SPI0 CS       → GP17
//   SD SPI0 SCK      → GP18
//   SD SPI0 MOSI     → GP19
//   Buzzer           → GP21
