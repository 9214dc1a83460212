//! Transport Boundary
//!
//! The session only needs to push bytes out; inbound chunks are handed to
//! [`AdapterSession::on_chunk`](crate::AdapterSession::on_chunk) by whoever
//! owns the receive side.

use crate::error::ObdError;
use tokio::sync::mpsc;

/// Outbound half of a byte-stream link to the adapter
pub trait Transport: Send {
    /// Write one encoded command.
    ///
    /// Returns [`ObdError::TransportUnavailable`] when the link cannot take
    /// writes right now and [`ObdError::TransportClosed`] when it never will.
    fn send(&mut self, bytes: &[u8]) -> Result<(), ObdError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, bytes: &[u8]) -> Result<(), ObdError> {
        (**self).send(bytes)
    }
}

/// Transport forwarding writes to a writer task over an unbounded channel.
///
/// Sends never wait; whatever the writer has not consumed when it goes away
/// is abandoned.
#[derive(Debug, Clone)]
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<Vec<u8>>,
}

impl ChannelTransport {
    /// Create a transport and the receiver the writer task drains
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Vec<u8>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Transport for ChannelTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<(), ObdError> {
        self.tx
            .send(bytes.to_vec())
            .map_err(|_| ObdError::TransportClosed("writer task gone".to_string()))
    }
}
