//! Local storage volume
//!
//! Open failures carry a coarse classification so the caller can decide
//! how to degrade without knowing which filesystem produced the error.
//! The classification follows the same shape as `embedded_io::Error::kind`.

use core::future::Future;

/// Why a storage target could not be opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageErrorKind {
    /// Medium absent, read-only or otherwise refusing writes
    NotWritable,
    /// Medium has no free space left
    Full,
    /// Anything else
    Other,
}

impl core::fmt::Display for StorageErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotWritable => write!(f, "Storage not writable"),
            Self::Full => write!(f, "Storage full"),
            Self::Other => write!(f, "Storage error"),
        }
    }
}

impl core::error::Error for StorageErrorKind {}

/// Storage error with a [`StorageErrorKind`] classification
pub trait StorageError: core::fmt::Debug {
    fn kind(&self) -> StorageErrorKind;
}

impl StorageError for StorageErrorKind {
    fn kind(&self) -> StorageErrorKind {
        *self
    }
}

/// A writable storage volume (flash filesystem, SD card, ...)
pub trait StorageVolume {
    /// Open failure
    type Error: StorageError;

    /// Open file handle, written with `embedded-io-async`
    type File: embedded_io_async::Write;

    /// Open `path` for writing, truncating any previous contents
    ///
    /// The returned handle is exclusive: no other writer exists for as
    /// long as it is alive.
    fn create_truncated(
        &mut self,
        path: &str,
    ) -> impl Future<Output = Result<Self::File, Self::Error>>;
}
