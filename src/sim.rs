//! Simulation collaborators for host-side tests.
//!
//! `SimVolume` is an in-memory volume with failure-injection knobs so tests
//! can script mount and write errors; the other types record what the core
//! asked them to do.

use heapless::{FnvIndexMap, String, Vec};

use crate::config::NAME_CAP;
use crate::console::bounded;
use crate::error::DeviceErrorKind;
use crate::hal::{
    ConsolePort, DateTime, DirEntry, EntryKind, Panel, RtcDriver, VolumeDriver, VolumeStats,
};

const FILE_CAP: usize = 16384;
const MAX_FILES: usize = 4;
const CONSOLE_CAP: usize = 8192;

struct StoredFile {
    data: Vec<u8, FILE_CAP>,
    read_only: bool,
}

/// Opaque file token handed out by [`SimVolume`].
pub struct SimFile {
    name: String<NAME_CAP>,
    pos: usize,
}

/// In-memory volume driver.
pub struct SimVolume {
    files: FnvIndexMap<String<NAME_CAP>, StoredFile, MAX_FILES>,
    dirs: Vec<String<NAME_CAP>, 2>,
    formatted: bool,
    mounted: bool,
    initialized: bool,
    pub stats: VolumeStats,
    /// Fail the next mount with this error.
    pub fail_mount: Option<DeviceErrorKind>,
    /// Fail the Nth write from now (1 = the very next write).
    pub fail_write_after: Option<u32>,
    /// Times the device was (re-)probed by a mount.
    pub probe_count: u32,
    /// Durability syncs requested so far.
    pub sync_count: u32,
}

impl SimVolume {
    pub fn new() -> Self {
        Self {
            files: FnvIndexMap::new(),
            dirs: Vec::new(),
            formatted: true,
            mounted: false,
            initialized: false,
            stats: VolumeStats {
                cluster_count: 1026,
                sectors_per_cluster: 8,
                free_clusters: 1000,
            },
            fail_mount: None,
            fail_write_after: None,
            probe_count: 0,
            sync_count: 0,
        }
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn has_file(&self, name: &str) -> bool {
        self.files.contains_key(&bounded(name))
    }

    pub fn file_contents(&self, name: &str) -> Option<&[u8]> {
        self.files.get(&bounded(name)).map(|f| f.data.as_slice())
    }

    /// Preload a file, e.g. to test the read paths.
    pub fn add_file(&mut self, name: &str, content: &[u8]) {
        let mut data = Vec::new();
        let _ = data.extend_from_slice(content);
        let _ = self.files.insert(
            bounded(name),
            StoredFile {
                data,
                read_only: false,
            },
        );
    }

    pub fn set_read_only(&mut self, name: &str) {
        if let Some(file) = self.files.get_mut(&bounded(name)) {
            file.read_only = true;
        }
    }

    pub fn add_dir(&mut self, name: &str) {
        let _ = self.dirs.push(bounded(name));
    }

    fn consume_write_budget(&mut self) -> Result<(), DeviceErrorKind> {
        if let Some(n) = self.fail_write_after {
            if n <= 1 {
                self.fail_write_after = None;
                return Err(DeviceErrorKind::DiskError);
            }
            self.fail_write_after = Some(n - 1);
        }
        Ok(())
    }
}

impl Default for SimVolume {
    fn default() -> Self {
        Self::new()
    }
}

impl VolumeDriver for SimVolume {
    type File = SimFile;

    fn mount(&mut self) -> Result<(), DeviceErrorKind> {
        if let Some(e) = self.fail_mount.take() {
            return Err(e);
        }
        if !self.formatted {
            return Err(DeviceErrorKind::NoFilesystem);
        }
        if !self.initialized {
            self.initialized = true;
            self.probe_count += 1;
        }
        self.mounted = true;
        Ok(())
    }

    fn unmount(&mut self) -> Result<(), DeviceErrorKind> {
        if !self.mounted {
            return Err(DeviceErrorKind::NotMounted);
        }
        self.mounted = false;
        Ok(())
    }

    fn invalidate(&mut self) {
        self.initialized = false;
    }

    fn format(&mut self) -> Result<(), DeviceErrorKind> {
        self.files.clear();
        self.dirs.clear();
        self.formatted = true;
        Ok(())
    }

    fn stats(&self) -> Result<VolumeStats, DeviceErrorKind> {
        if !self.mounted {
            return Err(DeviceErrorKind::NotMounted);
        }
        Ok(self.stats)
    }

    fn create(&mut self, name: &str) -> Result<SimFile, DeviceErrorKind> {
        if !self.mounted {
            return Err(DeviceErrorKind::NotMounted);
        }
        let key = bounded(name);
        match self.files.get_mut(&key) {
            Some(existing) => existing.data.clear(),
            None => {
                let _ = self
                    .files
                    .insert(
                        key.clone(),
                        StoredFile {
                            data: Vec::new(),
                            read_only: false,
                        },
                    )
                    .map_err(|_| DeviceErrorKind::Full)?;
            }
        }
        Ok(SimFile { name: key, pos: 0 })
    }

    fn open(&mut self, name: &str) -> Result<SimFile, DeviceErrorKind> {
        if !self.mounted {
            return Err(DeviceErrorKind::NotMounted);
        }
        let key = bounded(name);
        if !self.files.contains_key(&key) {
            return Err(DeviceErrorKind::NotFound);
        }
        Ok(SimFile { name: key, pos: 0 })
    }

    fn write(&mut self, file: &mut SimFile, data: &[u8]) -> Result<(), DeviceErrorKind> {
        self.consume_write_budget()?;
        let stored = self
            .files
            .get_mut(&file.name)
            .ok_or(DeviceErrorKind::NotFound)?;
        stored
            .data
            .extend_from_slice(data)
            .map_err(|_| DeviceErrorKind::Full)
    }

    fn read(&mut self, file: &mut SimFile, buf: &mut [u8]) -> Result<usize, DeviceErrorKind> {
        let stored = self
            .files
            .get(&file.name)
            .ok_or(DeviceErrorKind::NotFound)?;
        let remaining = &stored.data[file.pos.min(stored.data.len())..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        file.pos += n;
        Ok(n)
    }

    fn sync(&mut self, _file: &mut SimFile) -> Result<(), DeviceErrorKind> {
        self.sync_count += 1;
        Ok(())
    }

    fn close(&mut self, _file: SimFile) {}

    fn file_size(&mut self, file: &SimFile) -> Result<u32, DeviceErrorKind> {
        self.files
            .get(&file.name)
            .map(|f| f.data.len() as u32)
            .ok_or(DeviceErrorKind::NotFound)
    }

    fn list(
        &mut self,
        path: &str,
        visit: &mut dyn FnMut(&DirEntry),
    ) -> Result<(), DeviceErrorKind> {
        if !self.mounted {
            return Err(DeviceErrorKind::NotMounted);
        }
        if !path.is_empty() && path != "/" {
            if self.dirs.iter().any(|d| d.as_str() == path) {
                return Ok(());
            }
            return Err(DeviceErrorKind::NotFound);
        }
        for dir in &self.dirs {
            visit(&DirEntry {
                name: dir.clone(),
                kind: EntryKind::Directory,
                size: 0,
            });
        }
        for (name, file) in &self.files {
            visit(&DirEntry {
                name: name.clone(),
                kind: if file.read_only {
                    EntryKind::ReadOnlyFile
                } else {
                    EntryKind::File
                },
                size: file.data.len() as u32,
            });
        }
        Ok(())
    }
}

/// Console transport that records everything written to it.
pub struct SimConsole {
    output: Vec<u8, CONSOLE_CAP>,
}

impl SimConsole {
    pub fn new() -> Self {
        Self { output: Vec::new() }
    }

    pub fn output_str(&self) -> &str {
        core::str::from_utf8(&self.output).unwrap_or("")
    }

    pub fn output_contains(&self, needle: &str) -> bool {
        self.output_str().contains(needle)
    }

    pub fn clear(&mut self) {
        self.output.clear();
    }
}

impl Default for SimConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsolePort for SimConsole {
    fn write(&mut self, bytes: &[u8]) {
        let _ = self.output.extend_from_slice(bytes);
    }
}

/// Clock collaborator that records the last value it was given.
pub struct SimRtc {
    pub last_set: Option<DateTime>,
}

impl SimRtc {
    pub fn new() -> Self {
        Self { last_set: None }
    }
}

impl Default for SimRtc {
    fn default() -> Self {
        Self::new()
    }
}

impl RtcDriver for SimRtc {
    fn set_datetime(&mut self, dt: &DateTime) -> Result<(), DeviceErrorKind> {
        self.last_set = Some(*dt);
        Ok(())
    }
}

/// Panel that records draw calls instead of rendering them.
pub struct SimPanel {
    pub texts: Vec<(String<NAME_CAP>, i32, i32), 32>,
    pub rects: u32,
    pub lines: u32,
    pub clears: u32,
    pub flushes: u32,
}

impl SimPanel {
    pub fn new() -> Self {
        Self {
            texts: Vec::new(),
            rects: 0,
            lines: 0,
            clears: 0,
            flushes: 0,
        }
    }

    pub fn has_text(&self, needle: &str) -> bool {
        self.texts.iter().any(|(text, _, _)| text.as_str() == needle)
    }
}

impl Default for SimPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl Panel for SimPanel {
    fn clear(&mut self) {
        self.clears += 1;
        self.texts.clear();
        self.rects = 0;
        self.lines = 0;
    }

    fn rect(&mut self, _x: i32, _y: i32, _w: u32, _h: u32) {
        self.rects += 1;
    }

    fn line(&mut self, _x0: i32, _y0: i32, _x1: i32, _y1: i32) {
        self.lines += 1;
    }

    fn text(&mut self, s: &str, x: i32, y: i32) {
        let _ = self.texts.push((bounded(s), x, y));
    }

    fn flush(&mut self) {
        self.flushes += 1;
    }
}
