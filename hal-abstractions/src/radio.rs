//! Streaming radio link (serial-over-wireless service)
//!
//! Models only what sits above the wireless stack: advertise a streaming
//! service, wait for one peer, push messages while it stays connected.

use core::future::Future;

/// Single-peer streaming radio
///
/// At most one peer is connected at any time. Advertising and an active
/// connection are mutually exclusive; the caller stops advertising once
/// a peer has connected.
pub trait StreamingRadio {
    /// Transmit failure
    type Error: core::fmt::Debug;

    /// Start broadcasting the streaming service (best effort, cannot fail)
    fn start_advertising(&mut self) -> impl Future<Output = ()>;

    /// Wait until a peer has completed the connection handshake
    ///
    /// **Blocks the calling flow of control with no timeout.** There is no
    /// cancellation: the future only completes once a peer is connected.
    fn wait_for_connection(&mut self) -> impl Future<Output = ()>;

    /// Stop broadcasting the streaming service
    fn stop_advertising(&mut self) -> impl Future<Output = ()>;

    /// Whether a peer is currently connected
    fn is_connected(&self) -> bool;

    /// Send one discrete message to the connected peer
    ///
    /// Only meaningful while connected; callers check
    /// [`is_connected`](Self::is_connected) first.
    fn send(&mut self, message: &[u8]) -> impl Future<Output = Result<(), Self::Error>>;
}
