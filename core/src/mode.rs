//! Startup mode selection
//!
//! Storage is tried exactly once. If it cannot be opened the logger moves to
//! the radio for the rest of the process lifetime; nothing ever switches it
//! back.

use datalogger_hal::{StorageError, StorageErrorKind, StorageVolume};

use crate::config::LoggerConfig;
use crate::storage::{self, StorageHandle};

/// Where samples go
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperatingMode {
    Storage,
    Radio,
}

/// Outcome of the one-shot startup decision
pub enum Startup<F> {
    /// Storage opened; samples go to the file
    Storage(StorageHandle<F>),
    /// Storage failed; samples go to the radio at this cadence
    Radio {
        /// Why storage was unavailable
        cause: StorageErrorKind,
        /// Full sample period in milliseconds
        interval_ms: u32,
    },
}

impl<F> Startup<F> {
    pub fn mode(&self) -> OperatingMode {
        match self {
            Self::Storage(_) => OperatingMode::Storage,
            Self::Radio { .. } => OperatingMode::Radio,
        }
    }
}

/// Radio sample period for a storage open failure of `kind`
///
/// A full medium gets the faster degraded cadence; anything else keeps the
/// base interval.
pub fn radio_interval(kind: StorageErrorKind, config: &LoggerConfig) -> u32 {
    match kind {
        StorageErrorKind::Full => config.full_storage_interval_ms,
        StorageErrorKind::NotWritable | StorageErrorKind::Other => config.sample_interval_ms,
    }
}

/// Try the storage target once and decide the operating mode
pub async fn select_mode<V: StorageVolume>(volume: &mut V, config: &LoggerConfig) -> Startup<V::File> {
    match storage::open(volume, config.storage_path).await {
        Ok(handle) => {
            info!("Storage opened, logging to {}", config.storage_path);
            Startup::Storage(handle)
        }
        Err(e) => {
            let cause = e.kind();
            let interval_ms = radio_interval(cause, config);
            warn!(
                "Storage unavailable ({}), streaming over radio every {} ms",
                cause, interval_ms
            );
            Startup::Radio { cause, interval_ms }
        }
    }
}
