//! Test doubles for every board capability
//!
//! All doubles record into one shared [`Journal`] so tests can assert the
//! exact interleaving of pixel changes, file I/O, sleeps and radio steps.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use datalogger_hal::{
    Accelerometer, Altimeter, Barometer, Hygrometer, IndicatorState, StatusIndicator,
    StorageErrorKind, StorageVolume, StreamingRadio, Thermometer,
};
use embedded_hal_async::delay::DelayNs;
use embedded_io_async::{ErrorKind, ErrorType, Write};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Indicator(IndicatorState),
    Sleep(u32),
    CreateTruncated(String),
    Write(String),
    WriteFailed,
    Flush,
    StartAdvertising,
    PeerConnected,
    StopAdvertising,
    Send(String),
    SendFailed,
}

#[derive(Debug, Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<Event>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: Event) {
        self.0.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }

    pub fn count(&self, pred: impl Fn(&Event) -> bool) -> usize {
        self.0.borrow().iter().filter(|e| pred(e)).count()
    }
}

/// Sensors returning the same readings every time
pub struct FixedSensors {
    temperature: f32,
    pressure: f32,
    altitude: f32,
    humidity: f32,
    acceleration: [f32; 3],
    pub reads: usize,
}

impl FixedSensors {
    pub fn new(
        temperature: f32,
        pressure: f32,
        altitude: f32,
        humidity: f32,
        acceleration: [f32; 3],
    ) -> Self {
        Self {
            temperature,
            pressure,
            altitude,
            humidity,
            acceleration,
            reads: 0,
        }
    }
}

impl Thermometer for FixedSensors {
    fn temperature(&mut self) -> f32 {
        self.reads += 1;
        self.temperature
    }
}

impl Barometer for FixedSensors {
    fn pressure(&mut self) -> f32 {
        self.reads += 1;
        self.pressure
    }
}

impl Altimeter for FixedSensors {
    fn altitude(&mut self) -> f32 {
        self.reads += 1;
        self.altitude
    }
}

impl Hygrometer for FixedSensors {
    fn relative_humidity(&mut self) -> f32 {
        self.reads += 1;
        self.humidity
    }
}

impl Accelerometer for FixedSensors {
    fn acceleration(&mut self) -> [f32; 3] {
        self.reads += 1;
        self.acceleration
    }
}

pub struct MockIndicator {
    journal: Journal,
}

impl MockIndicator {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
        }
    }
}

impl StatusIndicator for MockIndicator {
    fn set_state(&mut self, state: IndicatorState) {
        self.journal.push(Event::Indicator(state));
    }
}

/// Records sleeps in milliseconds instead of waiting
pub struct MockDelay {
    journal: Journal,
}

impl MockDelay {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
        }
    }
}

impl DelayNs for MockDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.journal.push(Event::Sleep(ns / 1_000_000));
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.journal.push(Event::Sleep(ms));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockIoError;

impl core::fmt::Display for MockIoError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Mock I/O error")
    }
}

impl core::error::Error for MockIoError {}

impl embedded_io_async::Error for MockIoError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// In-memory volume; opening either succeeds or fails with a fixed kind
pub struct MockVolume {
    journal: Journal,
    open_error: Option<StorageErrorKind>,
    writes_before_failure: Option<usize>,
    contents: Rc<RefCell<String>>,
}

impl MockVolume {
    pub fn writable(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            open_error: None,
            writes_before_failure: None,
            contents: Rc::default(),
        }
    }

    pub fn failing(journal: &Journal, kind: StorageErrorKind) -> Self {
        Self {
            open_error: Some(kind),
            ..Self::writable(journal)
        }
    }

    /// Files opened from this volume fail on write number `n + 1`
    pub fn fail_writes_after(mut self, n: usize) -> Self {
        self.writes_before_failure = Some(n);
        self
    }

    pub fn contents(&self) -> String {
        self.contents.borrow().clone()
    }
}

impl StorageVolume for MockVolume {
    type Error = StorageErrorKind;
    type File = MockFile;

    async fn create_truncated(&mut self, path: &str) -> Result<MockFile, StorageErrorKind> {
        self.journal.push(Event::CreateTruncated(path.into()));
        if let Some(kind) = self.open_error {
            return Err(kind);
        }
        self.contents.borrow_mut().clear();
        Ok(MockFile {
            journal: self.journal.clone(),
            writes_left: self.writes_before_failure,
            contents: self.contents.clone(),
        })
    }
}

pub struct MockFile {
    journal: Journal,
    writes_left: Option<usize>,
    contents: Rc<RefCell<String>>,
}

impl MockFile {
    pub fn contents(&self) -> String {
        self.contents.borrow().clone()
    }
}

impl ErrorType for MockFile {
    type Error = MockIoError;
}

impl Write for MockFile {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, MockIoError> {
        match self.writes_left {
            Some(0) => {
                self.journal.push(Event::WriteFailed);
                return Err(MockIoError);
            }
            Some(ref mut n) => *n -= 1,
            None => {}
        }
        let text = String::from_utf8_lossy(buf).into_owned();
        self.contents.borrow_mut().push_str(&text);
        self.journal.push(Event::Write(text));
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), MockIoError> {
        self.journal.push(Event::Flush);
        Ok(())
    }
}

/// Scripted radio: each entry in `sessions` is one peer, connected for
/// that many messages before it disconnects
pub struct MockRadio {
    journal: Journal,
    sessions: VecDeque<usize>,
    messages_left: usize,
    connected: bool,
    fail_sends: bool,
}

impl MockRadio {
    pub fn new(journal: &Journal, sessions: &[usize]) -> Self {
        Self {
            journal: journal.clone(),
            sessions: sessions.iter().copied().collect(),
            messages_left: 0,
            connected: false,
            fail_sends: false,
        }
    }

    /// Every send is rejected by the link (the peer still counts it)
    pub fn fail_sends(mut self) -> Self {
        self.fail_sends = true;
        self
    }
}

impl StreamingRadio for MockRadio {
    type Error = MockIoError;

    async fn start_advertising(&mut self) {
        self.journal.push(Event::StartAdvertising);
    }

    async fn wait_for_connection(&mut self) {
        let messages = self
            .sessions
            .pop_front()
            .expect("no scripted peer left; the real radio would wait forever");
        self.messages_left = messages;
        self.connected = messages > 0;
        self.journal.push(Event::PeerConnected);
    }

    async fn stop_advertising(&mut self) {
        self.journal.push(Event::StopAdvertising);
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn send(&mut self, message: &[u8]) -> Result<(), MockIoError> {
        assert!(self.connected, "send attempted while disconnected");
        self.messages_left -= 1;
        if self.messages_left == 0 {
            self.connected = false;
        }
        if self.fail_sends {
            self.journal.push(Event::SendFailed);
            return Err(MockIoError);
        }
        self.journal
            .push(Event::Send(String::from_utf8_lossy(message).into_owned()));
        Ok(())
    }
}
