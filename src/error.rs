//! Unified error type for imu2sd.
//!
//! We avoid `alloc` - all error variants carry only fixed-size data.
//! `defmt::Format` is derived when the `defmt` feature is enabled so the
//! same types serve host tests and on-target logging.

/// Top-level error type used across the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A console command was given fewer arguments than it requires.
    MissingArgument,

    /// The storage collaborator reported a failure.
    Device(DeviceErrorKind),

    /// `start` was called while a capture session is already running.
    AlreadyActive,

    /// `stop` was called with no capture session running.
    NotActive,

    /// A console command named a volume that is not configured.
    UnknownVolume,
}

/// Secondary cause reported by the storage collaborator.
/// (Keeps the top-level enum `Copy`-friendly.)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DeviceErrorKind {
    /// Low-level block device I/O failed.
    DiskError,

    /// The medium carries no recognizable filesystem.
    NoFilesystem,

    /// File or directory does not exist.
    NotFound,

    /// The operation requires a mounted volume.
    NotMounted,

    /// The medium is out of space.
    Full,

    /// The underlying driver cannot perform this operation.
    Unsupported,
}

impl From<DeviceErrorKind> for Error {
    fn from(e: DeviceErrorKind) -> Self {
        Error::Device(e)
    }
}

impl Error {
    /// Short human-readable description for console messages.
    pub fn describe(&self) -> &'static str {
        match self {
            Error::MissingArgument => "Missing argument",
            Error::Device(kind) => kind.describe(),
            Error::AlreadyActive => "capture already running",
            Error::NotActive => "no capture running",
            Error::UnknownVolume => "unknown volume",
        }
    }
}

impl DeviceErrorKind {
    /// Short human-readable description for console messages.
    pub fn describe(&self) -> &'static str {
        match self {
            DeviceErrorKind::DiskError => "disk I/O error",
            DeviceErrorKind::NoFilesystem => "no filesystem",
            DeviceErrorKind::NotFound => "not found",
            DeviceErrorKind::NotMounted => "volume not mounted",
            DeviceErrorKind::Full => "no space left on volume",
            DeviceErrorKind::Unsupported => "not supported by this driver",
        }
    }

    /// Suggested corrective command, printed after the description.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            DeviceErrorKind::DiskError => Some("check the card connection."),
            DeviceErrorKind::NoFilesystem => Some("use 'a' to mount the card."),
            DeviceErrorKind::NotFound => Some("use 'c' to list available files."),
            DeviceErrorKind::NotMounted => Some("use 'a' to mount the card."),
            DeviceErrorKind::Full | DeviceErrorKind::Unsupported => None,
        }
    }
}
