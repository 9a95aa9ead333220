//! SD card adapter: an embedded-sdmmc `VolumeManager` behind the core's
//! [`VolumeDriver`] trait, using the raw handle API so file tokens can be
//! owned by the capture engine.

use core::fmt::Write as _;

use embassy_rp::gpio::Output;
use embassy_rp::peripherals::SPI0;
use embassy_rp::spi::{Blocking, Spi};
use embassy_time::Delay;
use embedded_hal_bus::spi::ExclusiveDevice;
use embedded_sdmmc::{
    Mode, RawDirectory, RawFile, RawVolume, SdCard, TimeSource, Timestamp, VolumeIdx,
    VolumeManager,
};
use heapless::String;

use imu2sd::config::NAME_CAP;
use imu2sd::error::DeviceErrorKind;
use imu2sd::hal::{DirEntry, EntryKind, VolumeDriver, VolumeStats};

/// Fixed timestamp source; file times are not meaningful on this device.
pub struct FixedTime;

impl TimeSource for FixedTime {
    fn get_timestamp(&self) -> Timestamp {
        Timestamp {
            year_since_1970: 0,
            zero_indexed_month: 0,
            zero_indexed_day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }
}

pub type SdSpi = ExclusiveDevice<Spi<'static, SPI0, Blocking>, Output<'static>, Delay>;
pub type Card = SdCard<SdSpi, Delay>;

fn map_err<E: core::fmt::Debug>(e: embedded_sdmmc::Error<E>) -> DeviceErrorKind {
    use embedded_sdmmc::Error;
    match e {
        Error::DeviceError(_) => DeviceErrorKind::DiskError,
        Error::FormatError(_) | Error::NoSuchVolume => DeviceErrorKind::NoFilesystem,
        Error::NotFound => DeviceErrorKind::NotFound,
        Error::DiskFull => DeviceErrorKind::Full,
        _ => DeviceErrorKind::DiskError,
    }
}

/// One FAT volume on the SPI SD card.
pub struct SdVolume {
    manager: VolumeManager<Card, FixedTime>,
    volume: Option<RawVolume>,
    root: Option<RawDirectory>,
}

impl SdVolume {
    pub fn new(card: Card) -> Self {
        Self {
            manager: VolumeManager::new(card, FixedTime),
            volume: None,
            root: None,
        }
    }

    fn root(&self) -> Result<RawDirectory, DeviceErrorKind> {
        self.root.ok_or(DeviceErrorKind::NotMounted)
    }
}

impl VolumeDriver for SdVolume {
    type File = RawFile;

    fn mount(&mut self) -> Result<(), DeviceErrorKind> {
        let volume = self
            .manager
            .open_raw_volume(VolumeIdx(0))
            .map_err(map_err)?;
        match self.manager.open_root_dir(volume) {
            Ok(root) => {
                self.volume = Some(volume);
                self.root = Some(root);
                Ok(())
            }
            Err(e) => {
                let _ = self.manager.close_volume(volume);
                Err(map_err(e))
            }
        }
    }

    fn unmount(&mut self) -> Result<(), DeviceErrorKind> {
        let root = self.root.take().ok_or(DeviceErrorKind::NotMounted)?;
        let volume = self.volume.take().ok_or(DeviceErrorKind::NotMounted)?;
        self.manager.close_dir(root).map_err(map_err)?;
        self.manager.close_volume(volume).map_err(map_err)
    }

    fn invalidate(&mut self) {
        self.manager.device().mark_card_uninit();
    }

    fn format(&mut self) -> Result<(), DeviceErrorKind> {
        // TODO: implement once embedded-sdmmc grows mkfs support.
        Err(DeviceErrorKind::Unsupported)
    }

    fn stats(&self) -> Result<VolumeStats, DeviceErrorKind> {
        // Free-cluster accounting needs a FAT scan the driver does not
        // expose.
        Err(DeviceErrorKind::Unsupported)
    }

    fn create(&mut self, name: &str) -> Result<RawFile, DeviceErrorKind> {
        let root = self.root()?;
        self.manager
            .open_file_in_dir(root, name, Mode::ReadWriteCreateOrTruncate)
            .map_err(map_err)
    }

    fn open(&mut self, name: &str) -> Result<RawFile, DeviceErrorKind> {
        let root = self.root()?;
        self.manager
            .open_file_in_dir(root, name, Mode::ReadOnly)
            .map_err(map_err)
    }

    fn write(&mut self, file: &mut RawFile, data: &[u8]) -> Result<(), DeviceErrorKind> {
        self.manager.write(*file, data).map_err(map_err)
    }

    fn read(&mut self, file: &mut RawFile, buf: &mut [u8]) -> Result<usize, DeviceErrorKind> {
        match self.manager.read(*file, buf) {
            Ok(n) => Ok(n),
            Err(embedded_sdmmc::Error::EndOfFile) => Ok(0),
            Err(e) => Err(map_err(e)),
        }
    }

    fn sync(&mut self, file: &mut RawFile) -> Result<(), DeviceErrorKind> {
        self.manager.flush_file(*file).map_err(map_err)
    }

    fn close(&mut self, file: RawFile) {
        let _ = self.manager.close_file(file);
    }

    fn file_size(&mut self, file: &RawFile) -> Result<u32, DeviceErrorKind> {
        self.manager.file_length(*file).map_err(map_err)
    }

    fn list(
        &mut self,
        path: &str,
        visit: &mut dyn FnMut(&DirEntry),
    ) -> Result<(), DeviceErrorKind> {
        let root = self.root()?;
        let in_subdir = !(path.is_empty() || path == "/");
        let dir = if in_subdir {
            self.manager.open_dir(root, path).map_err(map_err)?
        } else {
            root
        };

        let result = self.manager.iterate_dir(dir, |entry| {
            let mut name: String<NAME_CAP> = String::new();
            let _ = write!(name, "{}", entry.name);
            let kind = if entry.attributes.is_directory() {
                EntryKind::Directory
            } else if entry.attributes.is_read_only() {
                EntryKind::ReadOnlyFile
            } else {
                EntryKind::File
            };
            visit(&DirEntry {
                name,
                kind,
                size: entry.size,
            });
        });

        if in_subdir {
            let _ = self.manager.close_dir(dir);
        }
        result.map_err(map_err)
    }
}
