//! Hardware abstraction traits for the sensor data logger
//!
//! This crate defines the capabilities the acquisition loop needs from a
//! board: a status pixel, the sensor set, a storage volume and a streaming
//! radio. BSPs implement these traits; `datalogger-core` only ever sees
//! the traits, which is what lets its tests swap in doubles.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]
#![deny(warnings)]

pub mod indicator;
pub mod radio;
pub mod sensors;
pub mod storage;

pub use indicator::{IndicatorState, Rgb, StatusIndicator};
pub use radio::StreamingRadio;
pub use sensors::{Accelerometer, Altimeter, Barometer, Hygrometer, SensorSuite, Thermometer};
pub use storage::{StorageError, StorageErrorKind, StorageVolume};
