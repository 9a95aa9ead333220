//! Storage session manager.
//!
//! Owns the mount/unmount lifecycle and the space/listing queries for every
//! configured volume. The mounted flag is mutated here and nowhere else.

use heapless::{String, Vec};

use crate::config::{MAX_VOLUMES, NAME_CAP};
use crate::console::bounded;
use crate::error::{DeviceErrorKind, Error};
use crate::hal::{DirEntry, VolumeDriver};

/// Mount-state record for one logical volume. Created at init, never
/// destroyed while the system runs.
pub struct VolumeSession<V> {
    pub name: String<NAME_CAP>,
    pub mounted: bool,
    pub last_error: Option<DeviceErrorKind>,
    driver: V,
}

/// Owns every configured volume session.
pub struct StorageManager<V> {
    volumes: Vec<VolumeSession<V>, MAX_VOLUMES>,
}

impl<V: VolumeDriver> StorageManager<V> {
    pub fn new() -> Self {
        Self { volumes: Vec::new() }
    }

    /// Register a volume at init time. Returns the driver back if the
    /// volume table is full.
    pub fn add_volume(&mut self, name: &str, driver: V) -> Result<(), V> {
        self.volumes
            .push(VolumeSession {
                name: bounded(name),
                mounted: false,
                last_error: None,
                driver,
            })
            .map_err(|session| session.driver)
    }

    /// Resolve an optional volume name; `None` selects the first configured
    /// volume.
    fn resolve(&self, name: Option<&str>) -> Result<usize, Error> {
        match name {
            None if self.volumes.is_empty() => Err(Error::UnknownVolume),
            None => Ok(0),
            Some(n) => self
                .volumes
                .iter()
                .position(|v| v.name.as_str() == n)
                .ok_or(Error::UnknownVolume),
        }
    }

    pub fn session(&self, name: Option<&str>) -> Result<&VolumeSession<V>, Error> {
        Ok(&self.volumes[self.resolve(name)?])
    }

    /// Mounted flag of the default volume; false with no volumes configured.
    pub fn default_mounted(&self) -> bool {
        self.volumes.first().map(|v| v.mounted).unwrap_or(false)
    }

    /// Driver of the default volume, used by the capture engine and the
    /// file-view paths.
    pub fn default_volume(&mut self) -> Result<&mut V, Error> {
        self.volumes
            .first_mut()
            .map(|v| &mut v.driver)
            .ok_or(Error::UnknownVolume)
    }

    /// Driver access by name, for diagnostics and tests.
    pub fn volume_driver(&self, name: Option<&str>) -> Result<&V, Error> {
        Ok(&self.volumes[self.resolve(name)?].driver)
    }

    pub fn volume_driver_mut(&mut self, name: Option<&str>) -> Result<&mut V, Error> {
        let idx = self.resolve(name)?;
        Ok(&mut self.volumes[idx].driver)
    }

    /// Mount a volume. Mounting an already-mounted volume is a no-op.
    pub fn mount(&mut self, name: Option<&str>) -> Result<(), Error> {
        let idx = self.resolve(name)?;
        let vol = &mut self.volumes[idx];
        if vol.mounted {
            return Ok(());
        }
        match vol.driver.mount() {
            Ok(()) => {
                vol.mounted = true;
                vol.last_error = None;
                Ok(())
            }
            Err(e) => {
                vol.last_error = Some(e);
                Err(Error::Device(e))
            }
        }
    }

    /// Unmount a volume and mark the device uninitialized so the next mount
    /// re-probes the hardware.
    pub fn unmount(&mut self, name: Option<&str>) -> Result<(), Error> {
        let idx = self.resolve(name)?;
        let vol = &mut self.volumes[idx];
        match vol.driver.unmount() {
            Ok(()) => {
                vol.mounted = false;
                vol.driver.invalidate();
                vol.last_error = None;
                Ok(())
            }
            Err(e) => {
                vol.last_error = Some(e);
                Err(Error::Device(e))
            }
        }
    }

    /// Format a volume. The mounted flag is untouched; the caller is
    /// expected to mount afterwards.
    pub fn format(&mut self, name: Option<&str>) -> Result<(), Error> {
        let idx = self.resolve(name)?;
        let vol = &mut self.volumes[idx];
        vol.driver.format().map_err(|e| {
            vol.last_error = Some(e);
            Error::Device(e)
        })
    }

    /// Total and free space of a volume in KiB.
    pub fn free_space(&mut self, name: Option<&str>) -> Result<(u32, u32), Error> {
        let idx = self.resolve(name)?;
        let vol = &mut self.volumes[idx];
        let stats = vol.driver.stats().map_err(|e| {
            vol.last_error = Some(e);
            Error::Device(e)
        })?;
        let total_kib = (stats.cluster_count - 2) * stats.sectors_per_cluster / 2;
        let free_kib = stats.free_clusters * stats.sectors_per_cluster / 2;
        Ok((total_kib, free_kib))
    }

    /// Enumerate `path` on the default volume.
    pub fn list(
        &mut self,
        path: &str,
        visit: &mut dyn FnMut(&DirEntry),
    ) -> Result<(), Error> {
        let volume = self.default_volume()?;
        volume.list(path, visit).map_err(Error::Device)
    }
}

impl<V: VolumeDriver> Default for StorageManager<V> {
    fn default() -> Self {
        Self::new()
    }
}
