//! Wire protocol abstraction
//!
//! Everything protocol-specific lives behind [`WireTransport`]: the scheme
//! name, the service delimiter, the local base address and the actual frame
//! I/O. The generic core never opens sockets itself; it hands fully encoded
//! frames to the wire and frames arriving from the wire back to
//! [`MalTransport::receive_frame`](crate::transport::MalTransport::receive_frame).

use crate::error::TransportResult;
use async_trait::async_trait;
use std::fmt::Debug;
use tokio::sync::oneshot;

/// One encoded frame waiting in the outgoing queue
#[derive(Debug)]
pub struct PendingSend {
    /// Full target URI handed to the wire
    pub destination: String,
    /// `protocol://address` prefix of the destination; the quarantine key,
    /// shared by every endpoint behind that address
    pub address: String,
    pub frame: Vec<u8>,
    /// Set on the final frame of a batch so buffering wires know when to
    /// flush
    pub is_last_in_batch: bool,
    /// Completion signal back to the caller that queued this frame
    pub done: Option<oneshot::Sender<TransportResult<()>>>,
}

/// Protocol-specific half of a transport
#[async_trait]
pub trait WireTransport: Send + Sync + Debug {
    /// URI scheme this wire answers to, e.g. `maltcp`
    fn protocol(&self) -> &str;

    /// Character separating address, endpoint and routing parts in URIs
    fn service_delimiter(&self) -> char {
        '/'
    }

    /// The `protocol://address` prefix under which local endpoints live
    fn local_base_uri(&self) -> String;

    /// Deliver one encoded frame to `destination`
    async fn send_frame(&self, destination: &str, frame: &[u8]) -> TransportResult<()>;

    /// Called after the last frame of a batch; buffering wires flush here
    async fn flush(&self) -> TransportResult<()> {
        Ok(())
    }
}
