//! Hardware adapters for the embedded binary: real drivers behind the
//! core's collaborator traits.

pub mod console;
pub mod imu;
pub mod panel;
pub mod rtc;
pub mod sdcard;
