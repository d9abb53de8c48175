//! Storage sink
//!
//! Opening is the only recoverable step: its error is classified and the
//! caller falls back to the radio. Once a handle exists, every write is
//! encode + write + flush with no retry, and any failure is final.

use datalogger_hal::StorageVolume;
use embedded_io_async::Write;

use crate::frame::{FrameError, SensorFrame};

/// Storage write errors (always fatal for the acquisition loop)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageWriteError<E> {
    /// Frame could not be encoded
    Encode(FrameError),
    /// Write or flush failed
    Io(E),
}

impl<E> From<FrameError> for StorageWriteError<E> {
    fn from(e: FrameError) -> Self {
        Self::Encode(e)
    }
}

impl<E: core::fmt::Debug> core::fmt::Display for StorageWriteError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Encode(e) => write!(f, "Record encoding failed: {}", e),
            Self::Io(e) => write!(f, "Storage write failed: {:?}", e),
        }
    }
}

impl<E: core::fmt::Debug> core::error::Error for StorageWriteError<E> {}

/// Open the storage target at `path`, truncating it
pub async fn open<V: StorageVolume>(
    volume: &mut V,
    path: &str,
) -> Result<StorageHandle<V::File>, V::Error> {
    let file = volume.create_truncated(path).await?;
    Ok(StorageHandle { file })
}

/// Exclusive write channel to the open storage target
///
/// The file is released when the handle is dropped.
pub struct StorageHandle<F> {
    file: F,
}

impl<F: Write> StorageHandle<F> {
    /// Append one record and force it to the medium
    pub async fn write(&mut self, frame: &SensorFrame) -> Result<(), StorageWriteError<F::Error>> {
        let record = frame.encode()?;
        self.file
            .write_all(record.as_bytes())
            .await
            .map_err(StorageWriteError::Io)?;
        self.file.flush().await.map_err(StorageWriteError::Io)
    }

    /// Access the underlying file
    pub fn file_mut(&mut self) -> &mut F {
        &mut self.file
    }
}
