//! The transport seam between the bus and a connected observer.

use std::io;
use std::time::Duration;

/// Result of a liveness probe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Probe {
    /// Nothing arrived within the timeout; the peer is still there.
    Idle,
    /// The peer sent something. Watchers are receive-only, so the bus
    /// ends the subscription.
    Inbound,
    /// The peer is gone.
    Closed,
}

/// One observer's connection, e.g. an accepted WebSocket.
///
/// The bus owns the connection only for the duration of
/// [`subscribe`](crate::NotificationBus::subscribe), and only ever calls
/// it from the subscribing thread.
pub trait Connection: Send {
    /// Send one text frame.
    fn send_text(&mut self, text: &str) -> io::Result<()>;

    /// Wait at most `timeout` for inbound traffic or a disconnect.
    fn probe(&mut self, timeout: Duration) -> Probe;

    /// Close the connection. Must tolerate an already-closed peer.
    fn close(&mut self);
}
