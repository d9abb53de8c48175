//! Radio sink state machine
//!
//! ```text
//!   Idle --start_advertising--> Advertising --peer connects--> Connected
//!    ^                                                            |
//!    +--------------------------- peer disconnects ---------------+
//! ```
//!
//! Advertising stops on entering Connected, so no second peer can join an
//! active session. After a disconnect the cycle restarts from Idle.

use datalogger_hal::StreamingRadio;

use crate::frame::{FrameError, SensorFrame};

/// Radio link state as seen by the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioState {
    Idle,
    Advertising,
    Connected,
}

/// Radio sink errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioSinkError<E> {
    /// Write attempted while not connected; nothing was sent
    NotConnected,
    /// Frame could not be encoded
    Encode(FrameError),
    /// Link rejected the message
    Link(E),
}

impl<E: core::fmt::Debug> core::fmt::Display for RadioSinkError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotConnected => write!(f, "Radio not connected"),
            Self::Encode(e) => write!(f, "Record encoding failed: {}", e),
            Self::Link(e) => write!(f, "Radio send failed: {:?}", e),
        }
    }
}

impl<E: core::fmt::Debug> core::error::Error for RadioSinkError<E> {}

/// Streams records to a single connected peer
pub struct RadioSink<R> {
    radio: R,
    state: RadioState,
}

impl<R: StreamingRadio> RadioSink<R> {
    pub fn new(radio: R) -> Self {
        Self {
            radio,
            state: RadioState::Idle,
        }
    }

    pub fn state(&self) -> RadioState {
        self.state
    }

    /// Advertise and wait for a peer, then stop advertising
    ///
    /// **Blocks with no timeout** until a peer connects. Returns immediately
    /// if a peer is already connected.
    pub async fn connect(&mut self) {
        if self.is_connected() {
            return;
        }
        self.radio.start_advertising().await;
        self.state = RadioState::Advertising;
        info!("Advertising streaming service");

        self.radio.wait_for_connection().await;
        self.radio.stop_advertising().await;
        self.state = RadioState::Connected;
        info!("Peer connected, advertising stopped");
    }

    /// Whether the peer is still connected
    ///
    /// Detects disconnection: a Connected sink whose peer has gone drops
    /// back to Idle.
    pub fn is_connected(&mut self) -> bool {
        if self.state == RadioState::Connected && !self.radio.is_connected() {
            self.state = RadioState::Idle;
            info!("Peer disconnected");
        }
        self.state == RadioState::Connected
    }

    /// Send one frame as a single message
    ///
    /// Refused with [`RadioSinkError::NotConnected`] unless the sink is in
    /// Connected state; the link is not touched in that case.
    pub async fn write(&mut self, frame: &SensorFrame) -> Result<(), RadioSinkError<R::Error>> {
        if self.state != RadioState::Connected {
            return Err(RadioSinkError::NotConnected);
        }
        let record = frame.encode().map_err(RadioSinkError::Encode)?;
        self.radio
            .send(record.as_bytes())
            .await
            .map_err(RadioSinkError::Link)
    }
}
