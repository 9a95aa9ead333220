//! Console transport glue: RX mailbox filled by the reader task, TX adapter
//! implementing the core's byte sink.

use embassy_rp::uart::{Async, UartTx};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use imu2sd::hal::ConsolePort;

/// Received console bytes; filled by the RX task and drained by the main
/// loop one byte per iteration.
pub static CONSOLE_RX: Channel<CriticalSectionRawMutex, u8, 64> = Channel::new();

/// Byte sink backed by the UART TX half. Writes block the main loop; the
/// console is not reentrant and must only be driven from there.
pub struct UartConsole {
    tx: UartTx<'static, Async>,
}

impl UartConsole {
    pub fn new(tx: UartTx<'static, Async>) -> Self {
        Self { tx }
    }
}

impl ConsolePort for UartConsole {
    fn write(&mut self, bytes: &[u8]) {
        let _ = self.tx.blocking_write(bytes);
    }
}
