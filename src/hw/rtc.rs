//! RP2040 hardware RTC adapter.

use embassy_rp::peripherals::RTC;
use embassy_rp::rtc::{DateTime as RpDateTime, DayOfWeek, Rtc};

use imu2sd::error::DeviceErrorKind;
use imu2sd::hal::{DateTime, RtcDriver};

pub struct PicoRtc {
    rtc: Rtc<'static, RTC>,
}

impl PicoRtc {
    pub fn new(rtc: Rtc<'static, RTC>) -> Self {
        Self { rtc }
    }
}

impl RtcDriver for PicoRtc {
    /// Permissive pass-through; field validation is left to the hardware.
    fn set_datetime(&mut self, dt: &DateTime) -> Result<(), DeviceErrorKind> {
        let dt = RpDateTime {
            year: dt.year,
            month: dt.month,
            day: dt.day,
            day_of_week: DayOfWeek::Sunday,
            hour: dt.hour,
            minute: dt.minute,
            second: dt.second,
        };
        let _ = self.rtc.set_datetime(dt);
        Ok(())
    }
}
