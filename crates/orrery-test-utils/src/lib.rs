//! Test utilities and mock types for Orrery development.
//!
//! Provides an in-process [`Connection`] ([`ChannelConnection`]) driven
//! from the test thread through a [`ClientHandle`], plus scripted
//! simulations in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{CounterSim, CounterState, FailingSim, Gate, GatedSim};

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use orrery_bus::{Connection, Probe};

enum ClientSignal {
    Message(String),
    Pause,
    Resume,
}

/// Create a connected mock connection and the handle that drives it.
pub fn channel_connection() -> (ChannelConnection, ClientHandle) {
    let (out_tx, out_rx) = crossbeam_channel::unbounded();
    let (ctl_tx, ctl_rx) = crossbeam_channel::unbounded();
    let closed = Arc::new(AtomicBool::new(false));
    (
        ChannelConnection {
            outbound: out_tx,
            control: ctl_rx,
            closed: Arc::clone(&closed),
        },
        ClientHandle {
            received: out_rx,
            control: Some(ctl_tx),
            closed,
        },
    )
}

/// Mock [`Connection`] backed by crossbeam channels.
///
/// Sent text lands in the paired [`ClientHandle`]. The handle can also
/// send inbound messages, pause the next probe until resumed, or drop
/// its side to simulate a disconnect.
pub struct ChannelConnection {
    outbound: Sender<String>,
    control: Receiver<ClientSignal>,
    closed: Arc<AtomicBool>,
}

impl Connection for ChannelConnection {
    fn send_text(&mut self, text: &str) -> io::Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(io::Error::new(io::ErrorKind::NotConnected, "closed"));
        }
        self.outbound
            .send(text.to_string())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "client dropped"))
    }

    fn probe(&mut self, timeout: Duration) -> Probe {
        if self.closed.load(Ordering::Acquire) {
            return Probe::Closed;
        }
        match self.control.recv_timeout(timeout) {
            Ok(ClientSignal::Message(_)) => Probe::Inbound,
            Ok(ClientSignal::Resume) => Probe::Idle,
            Ok(ClientSignal::Pause) => loop {
                match self.control.recv() {
                    Ok(ClientSignal::Resume) => return Probe::Idle,
                    Ok(ClientSignal::Message(_)) => return Probe::Inbound,
                    Ok(ClientSignal::Pause) => continue,
                    Err(_) => return Probe::Closed,
                }
            },
            Err(RecvTimeoutError::Timeout) => Probe::Idle,
            Err(RecvTimeoutError::Disconnected) => Probe::Closed,
        }
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Test-side end of a [`ChannelConnection`].
pub struct ClientHandle {
    received: Receiver<String>,
    control: Option<Sender<ClientSignal>>,
    closed: Arc<AtomicBool>,
}

impl ClientHandle {
    fn signal(&self, signal: ClientSignal) {
        if let Some(tx) = &self.control {
            let _ = tx.send(signal);
        }
    }

    /// Send an inbound message to the server side.
    pub fn send(&self, text: impl Into<String>) {
        self.signal(ClientSignal::Message(text.into()));
    }

    /// Make the connection's next probe block until [`resume`](Self::resume).
    pub fn pause(&self) {
        self.signal(ClientSignal::Pause);
    }

    /// Release a paused probe.
    pub fn resume(&self) {
        self.signal(ClientSignal::Resume);
    }

    /// Drop the client side; the next probe reports `Closed`.
    pub fn disconnect(&mut self) {
        self.control = None;
    }

    /// Wait up to `timeout` for the next message sent to this client.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<String> {
        self.received.recv_timeout(timeout).ok()
    }

    /// All messages received so far that have not been read yet.
    pub fn drain(&self) -> Vec<String> {
        self.received.try_iter().collect()
    }

    /// Whether the server side called `close()`.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

/// Poll `cond` every couple of milliseconds until it holds.
///
/// # Panics
///
/// Panics if `cond` is still false after `timeout`.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + timeout;
    while !cond() {
        assert!(Instant::now() < deadline, "condition not reached within {timeout:?}");
        std::thread::sleep(Duration::from_millis(2));
    }
}
