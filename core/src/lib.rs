//! Platform-agnostic core logic for the sensor data logger
//!
//! This crate decides where samples go (local storage or a streaming radio
//! link), frames them as text records, and handles the failures that move
//! the logger from one mode to the other. It has NO hardware dependencies:
//! boards hand in implementations of the `datalogger-hal` traits.
//!
//! ## Modules
//! - **`acquisition`**: the orchestrating loop
//! - **`mode`**: one-shot startup choice between storage and radio
//! - **`storage`** / **`radio`**: the two sinks
//! - **`frame`**: sensor frames and record encoding
//! - **`config`**: compiled-in constants
//! - **`altitude`**, **`checksum`**, **`sound`**: helpers for board sensor
//!   drivers

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![deny(warnings)]

#[macro_use]
mod fmt;

pub mod acquisition;
pub mod altitude;
pub mod checksum;
pub mod config;
pub mod frame;
pub mod mode;
pub mod radio;
pub mod sound;
pub mod storage;

#[cfg(test)]
mod testing;

pub use acquisition::Acquisition;
pub use config::{LoggerConfig, MicrophoneConfig};
pub use frame::{FrameBuilder, FrameError, Record, SensorFrame};
pub use mode::{OperatingMode, Startup};
pub use radio::{RadioSink, RadioSinkError, RadioState};
pub use sound::{MicrophoneError, PdmTiming};
pub use storage::{StorageHandle, StorageWriteError};
