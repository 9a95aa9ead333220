//! SSD1306 OLED adapter implementing the core's panel primitives.

use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::{MonoTextStyle, MonoTextStyleBuilder};
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{Line, PrimitiveStyle, Rectangle};
use embedded_graphics::text::{Baseline, Text};
use ssd1306::mode::BufferedGraphicsMode;
use ssd1306::prelude::*;
use ssd1306::{I2CDisplayInterface, Ssd1306};

use imu2sd::hal::Panel;

type Display<I2C> =
    Ssd1306<I2CInterface<I2C>, DisplaySize128x64, BufferedGraphicsMode<DisplaySize128x64>>;

pub struct OledPanel<I2C>
where
    I2C: embedded_hal::i2c::I2c,
{
    display: Display<I2C>,
}

impl<I2C: embedded_hal::i2c::I2c> OledPanel<I2C> {
    /// Initialise the SSD1306 and clear the screen.
    pub fn new(i2c: I2C) -> Self {
        let interface = I2CDisplayInterface::new(i2c);
        let mut display = Ssd1306::new(interface, DisplaySize128x64, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        let _ = display.init();
        display.clear_buffer();
        let _ = display.flush();
        Self { display }
    }

    fn style() -> MonoTextStyle<'static, BinaryColor> {
        MonoTextStyleBuilder::new()
            .font(&FONT_6X10)
            .text_color(BinaryColor::On)
            .build()
    }

    fn stroke() -> PrimitiveStyle<BinaryColor> {
        PrimitiveStyle::with_stroke(BinaryColor::On, 1)
    }
}

impl<I2C: embedded_hal::i2c::I2c> Panel for OledPanel<I2C> {
    fn clear(&mut self) {
        self.display.clear_buffer();
    }

    fn rect(&mut self, x: i32, y: i32, w: u32, h: u32) {
        let _ = Rectangle::new(Point::new(x, y), Size::new(w, h))
            .into_styled(Self::stroke())
            .draw(&mut self.display);
    }

    fn line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32) {
        let _ = Line::new(Point::new(x0, y0), Point::new(x1, y1))
            .into_styled(Self::stroke())
            .draw(&mut self.display);
    }

    fn text(&mut self, s: &str, x: i32, y: i32) {
        let _ = Text::with_baseline(s, Point::new(x, y), Self::style(), Baseline::Top)
            .draw(&mut self.display);
    }

    fn flush(&mut self) {
        let _ = self.display.flush();
    }
}
