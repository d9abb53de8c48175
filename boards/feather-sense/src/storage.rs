#![deny(unsafe_code)]
#![deny(warnings)]
//! SD card storage (Adalogger FeatherWing on SPI)
//!
//! FAT volume 0 via `embedded-sdmmc`. The card is only probed on the first
//! open, so a missing or unformatted card shows up as an open failure and
//! sends the logger to the radio.

use datalogger_hal::{StorageError, StorageErrorKind, StorageVolume};
use defmt::Format;
use embassy_nrf::gpio::Output;
use embassy_nrf::spim::Spim;
use embassy_time::Delay;
use embedded_hal_bus::spi::ExclusiveDevice;
use embedded_sdmmc::{
    Mode, RawFile, SdCard, SdCardError, TimeSource, Timestamp, VolumeIdx, VolumeManager,
};

pub type SdSpi = ExclusiveDevice<Spim<'static>, Output<'static>, Delay>;
pub type SdVolumeManager = VolumeManager<SdCard<SdSpi, Delay>, FixedClock>;

/// There is no RTC on this board; every file gets the same timestamp
pub struct FixedClock;

impl TimeSource for FixedClock {
    fn get_timestamp(&self) -> Timestamp {
        Timestamp {
            year_since_1970: 56, // 2026-01-01
            zero_indexed_month: 0,
            zero_indexed_day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }
}

/// SD card / filesystem error
#[derive(Debug)]
pub struct SdError(pub embedded_sdmmc::Error<SdCardError>);

impl From<embedded_sdmmc::Error<SdCardError>> for SdError {
    fn from(e: embedded_sdmmc::Error<SdCardError>) -> Self {
        Self(e)
    }
}

impl Format for SdError {
    fn format(&self, f: defmt::Formatter<'_>) {
        defmt::write!(f, "SdError({})", defmt::Debug2Format(&self.0));
    }
}

impl core::fmt::Display for SdError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "SD card error: {:?}", self.0)
    }
}

impl core::error::Error for SdError {}

impl StorageError for SdError {
    fn kind(&self) -> StorageErrorKind {
        use embedded_sdmmc::Error;
        match self.0 {
            Error::DiskFull | Error::NotEnoughSpace => StorageErrorKind::Full,
            Error::ReadOnly | Error::DeviceError(_) | Error::NoSuchVolume | Error::FormatError(_) => {
                StorageErrorKind::NotWritable
            }
            _ => StorageErrorKind::Other,
        }
    }
}

impl embedded_io_async::Error for SdError {
    fn kind(&self) -> embedded_io_async::ErrorKind {
        use embedded_sdmmc::Error;
        match self.0 {
            Error::DiskFull | Error::NotEnoughSpace => embedded_io_async::ErrorKind::OutOfMemory,
            Error::ReadOnly => embedded_io_async::ErrorKind::PermissionDenied,
            _ => embedded_io_async::ErrorKind::Other,
        }
    }
}

/// Volume 0 of the SD card
pub struct SdVolume {
    manager: &'static SdVolumeManager,
}

impl SdVolume {
    pub fn new(manager: &'static SdVolumeManager) -> Self {
        Self { manager }
    }
}

impl StorageVolume for SdVolume {
    type Error = SdError;
    type File = SdFile;

    async fn create_truncated(&mut self, path: &str) -> Result<SdFile, SdError> {
        let volume = self.manager.open_raw_volume(VolumeIdx(0))?;
        let root = self.manager.open_root_dir(volume)?;
        let file = self
            .manager
            .open_file_in_dir(root, path, Mode::ReadWriteCreateOrTruncate)?;
        Ok(SdFile {
            manager: self.manager,
            file,
        })
    }
}

/// Open file on the SD card
pub struct SdFile {
    manager: &'static SdVolumeManager,
    file: RawFile,
}

impl embedded_io_async::ErrorType for SdFile {
    type Error = SdError;
}

impl embedded_io_async::Write for SdFile {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, SdError> {
        self.manager.write(self.file, buf)?;
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), SdError> {
        self.manager.flush_file(self.file)?;
        Ok(())
    }
}
