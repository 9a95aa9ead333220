//! imu2sd firmware entry point for the Raspberry Pi Pico (RP2040).
//!
//! Wires the hardware drivers to the core's collaborator traits and runs
//! the cooperative main loop: poll the sensor, drain one console byte, let
//! the [`System`] reconcile, then drive lamp, buzzer and panel from the
//! returned snapshot.

#![no_std]
#![no_main]

mod hw;

use defmt::{info, unwrap};
use defmt_rtt as _;
use panic_probe as _;

use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::i2c::{self, I2c};
use embassy_rp::peripherals::UART1;
use embassy_rp::rtc::Rtc;
use embassy_rp::spi::{self, Spi};
use embassy_rp::uart::{self, Async, Uart, UartRx};
use embassy_time::{Delay, Duration, Instant, Timer};
use embedded_hal_bus::spi::ExclusiveDevice;
use embedded_sdmmc::SdCard;

use imu2sd::config::{
    BOOT_SPLASH_MS, CHIME_GAP_MS, DEFAULT_VOLUME, DISPLAY_PERIOD_MS, MAIN_LOOP_PERIOD_MS,
};
use imu2sd::debounce::{ControlBank, ControlId};
use imu2sd::display;
use imu2sd::hal::{ImuSensor, RawImuSample};
use imu2sd::state::{Chime, Lamp};
use imu2sd::storage::StorageManager;
use imu2sd::system::System;

use hw::console::{UartConsole, CONSOLE_RX};
use hw::imu::Mpu6050;
use hw::panel::OledPanel;
use hw::rtc::PicoRtc;
use hw::sdcard::SdVolume;

/// Shared with the button tasks; the only state the edge path may touch.
static CONTROLS: ControlBank = ControlBank::new();

bind_interrupts!(struct Irqs {
    UART1_IRQ => uart::InterruptHandler<UART1>;
});

/// Wait for a press (active-low), report the edge, wait for release.
/// The bank enforces the refractory window.
#[embassy_executor::task(pool_size = 2)]
async fn button_task(mut button: Input<'static>, id: ControlId) {
    loop {
        button.wait_for_falling_edge().await;
        CONTROLS.on_edge(id, Instant::now().as_millis() as u32);
        button.wait_for_rising_edge().await;
    }
}

/// Forward received console bytes into the main loop's mailbox.
#[embassy_executor::task]
async fn console_rx_task(mut rx: UartRx<'static, Async>) {
    let mut byte = [0u8; 1];
    loop {
        if rx.read(&mut byte).await.is_ok() {
            CONSOLE_RX.send(byte[0]).await;
        }
    }
}

fn apply_lamp(
    lamp: Lamp,
    red: &mut Output<'static>,
    green: &mut Output<'static>,
    blue: &mut Output<'static>,
) {
    red.set_level(if lamp.red { Level::High } else { Level::Low });
    green.set_level(if lamp.green { Level::High } else { Level::Low });
    blue.set_level(if lamp.blue { Level::High } else { Level::Low });
}

async fn play_chime(buzzer: &mut Output<'static>, chime: Chime) {
    for &beep_ms in chime.pattern() {
        buzzer.set_high();
        Timer::after(Duration::from_millis(beep_ms as u64)).await;
        buzzer.set_low();
        Timer::after(Duration::from_millis(CHIME_GAP_MS)).await;
    }
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());
    info!("imu2sd starting");

    let mut lamp_green = Output::new(p.PIN_11, Level::Low);
    let mut lamp_blue = Output::new(p.PIN_12, Level::Low);
    let mut lamp_red = Output::new(p.PIN_13, Level::Low);
    let mut buzzer = Output::new(p.PIN_21, Level::Low);

    unwrap!(spawner.spawn(button_task(
        Input::new(p.PIN_5, Pull::Up),
        ControlId::Capture
    )));
    unwrap!(spawner.spawn(button_task(
        Input::new(p.PIN_6, Pull::Up),
        ControlId::Mount
    )));

    let uart = Uart::new(
        p.UART1,
        p.PIN_8,
        p.PIN_9,
        Irqs,
        p.DMA_CH0,
        p.DMA_CH1,
        uart::Config::default(),
    );
    let (tx, rx) = uart.split();
    unwrap!(spawner.spawn(console_rx_task(rx)));
    let console = UartConsole::new(tx);

    let mut delay = Delay;
    let imu_i2c = I2c::new_blocking(p.I2C0, p.PIN_1, p.PIN_0, i2c::Config::default());
    let mut imu = unwrap!(Mpu6050::new(imu_i2c, &mut delay));

    let panel_i2c = I2c::new_blocking(p.I2C1, p.PIN_15, p.PIN_14, i2c::Config::default());
    let mut panel = OledPanel::new(panel_i2c);

    let mut spi_config = spi::Config::default();
    // Conservative bus speed shared by the card's init and data phases.
    spi_config.frequency = 400_000;
    let spi = Spi::new_blocking(p.SPI0, p.PIN_18, p.PIN_19, p.PIN_16, spi_config);
    let sd_cs = Output::new(p.PIN_17, Level::High);
    let sd_spi = ExclusiveDevice::new(spi, sd_cs, Delay).unwrap();
    let card = SdCard::new(sd_spi, Delay);

    let mut storage = StorageManager::new();
    let _ = storage.add_volume(DEFAULT_VOLUME, SdVolume::new(card));

    let rtc = PicoRtc::new(Rtc::new(p.RTC));

    let mut system = System::new(&CONTROLS, storage, console, rtc);

    // Boot splash: amber lamp while peripherals settle, then Normal.
    lamp_red.set_high();
    lamp_green.set_high();
    Timer::after(Duration::from_millis(BOOT_SPLASH_MS)).await;
    system.finish_init();
    system.greet();

    let mut last_raw = RawImuSample::default();
    let mut next_render = Instant::now();
    loop {
        let raw = imu.read_raw().unwrap_or(last_raw);
        last_raw = raw;

        let rx_byte = CONSOLE_RX.try_receive().ok();
        let snapshot = system.poll(Instant::now().as_millis(), &raw, rx_byte);

        apply_lamp(snapshot.lamp, &mut lamp_red, &mut lamp_green, &mut lamp_blue);
        if let Some(chime) = snapshot.chime {
            play_chime(&mut buzzer, chime).await;
        }

        if Instant::now() >= next_render {
            display::render(&snapshot, &mut panel);
            next_render = Instant::now() + Duration::from_millis(DISPLAY_PERIOD_MS);
        }

        Timer::after(Duration::from_millis(MAIN_LOOP_PERIOD_MS)).await;
    }
}
