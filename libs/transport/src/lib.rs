//! # MAL Generic Transport Core - Endpoints, Queueing and Delivery
//!
//! ## Purpose
//!
//! This crate contains the delivery layer of the transport stack:
//! - `MalTransport` - endpoint registry, outgoing FIFO queue with a single
//!   pump, one-shot bad-URL quarantine, inbound routing
//! - `Endpoint` - message construction, single and best-effort batch sends,
//!   gated delivery to listeners
//! - `WireTransport` - the seam where concrete protocols (TCP, SPP, local
//!   loopback) plug in
//! - Error reflection - a received message that cannot be routed is
//!   answered with the error message its interaction pattern owes, sent
//!   back over the wire to the originator
//!
//! ## Architecture Role
//!
//! ```text
//! mal-types → mal-codec → [transport]
//!     ↑           ↓            ↓
//! Pure Data   Codec Rules   Delivery
//! Elements    Header/Body   Endpoints
//! ```
//!
//! The transport never inspects message bodies: it routes on headers and
//! forwards body bytes as-is, which is what makes the codec's lazy bodies
//! pay off for relay traffic.

pub mod config;
pub mod endpoint;
pub mod error;
pub mod transport;
pub mod uri;
pub mod wire;

pub mod test_utils;

pub use config::TransportConfig;
pub use endpoint::{Endpoint, MessageBuilder, MessageListener};
pub use error::{TransportError, TransportResult};
pub use transport::{MalTransport, TransportBuilder};
pub use uri::{endpoint_uri, UriParts};
pub use wire::{PendingSend, WireTransport};
