//! Generic transport core
//!
//! Owns the endpoint registry, the outgoing FIFO queue with its single
//! pump, the one-shot bad-URL quarantine and inbound routing. The core is
//! protocol-agnostic: frame I/O is delegated to the [`WireTransport`] it
//! was built around, and message layout to the codec objects it carries.
//!
//! ## Queue pump
//!
//! Senders append to the queue; whichever sender finds the pump idle drives
//! it until the queue is empty. The `pump_running` flag is claimed with a
//! compare-exchange so two senders can never drain concurrently, and the
//! pump re-checks the queue after releasing the flag so a frame enqueued in
//! the release window is never stranded.
//!
//! ## Quarantine
//!
//! A transport address whose send fails is quarantined, whichever endpoint
//! behind it was the target. Exactly the next frame bound for that address
//! is refused without touching the wire, and the refusal lifts the
//! quarantine, so the frame after that reaches the wire again.

use crate::config::TransportConfig;
use crate::endpoint::Endpoint;
use crate::error::{TransportError, TransportResult};
use crate::uri::{self, UriParts};
use crate::wire::{PendingSend, WireTransport};
use mal_codec::{BinaryStreamFactory, HeaderCodec, MalMessage, StreamHeaderCodec};
use mal_types::{
    register_core_types, Attribute, ElementRegistry, MapOperationLookup, OperationLookup,
    StreamFactory,
};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Builder for [`MalTransport`]
///
/// Only the wire is mandatory; codec objects, registry and operation lookup
/// default to the reference binary format, the core MAL types and an empty
/// lookup.
pub struct TransportBuilder {
    wire: Arc<dyn WireTransport>,
    config: TransportConfig,
    header_codec: Arc<dyn HeaderCodec>,
    stream_factory: Arc<dyn StreamFactory>,
    registry: Option<Arc<ElementRegistry>>,
    operations: Arc<dyn OperationLookup>,
}

impl TransportBuilder {
    pub fn new(wire: Arc<dyn WireTransport>) -> Self {
        Self {
            wire,
            config: TransportConfig::default(),
            header_codec: Arc::new(StreamHeaderCodec),
            stream_factory: Arc::new(BinaryStreamFactory),
            registry: None,
            operations: Arc::new(MapOperationLookup::new()),
        }
    }

    pub fn config(mut self, config: TransportConfig) -> Self {
        self.config = config;
        self
    }

    pub fn header_codec(mut self, codec: Arc<dyn HeaderCodec>) -> Self {
        self.header_codec = codec;
        self
    }

    pub fn stream_factory(mut self, factory: Arc<dyn StreamFactory>) -> Self {
        self.stream_factory = factory;
        self
    }

    pub fn registry(mut self, registry: Arc<ElementRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn operations(mut self, operations: Arc<dyn OperationLookup>) -> Self {
        self.operations = operations;
        self
    }

    pub fn build(self) -> MalTransport {
        let registry = self.registry.unwrap_or_else(|| {
            let registry = Arc::new(ElementRegistry::new());
            register_core_types(&registry);
            registry
        });
        MalTransport {
            core: Arc::new(TransportCore {
                config: self.config,
                wire: self.wire,
                header_codec: self.header_codec,
                stream_factory: self.stream_factory,
                registry,
                operations: self.operations,
                endpoints: Mutex::new(HashMap::new()),
                bad_urls: Mutex::new(HashSet::new()),
                outgoing: Mutex::new(VecDeque::new()),
                pump_running: AtomicBool::new(false),
                next_transaction: AtomicI64::new(1),
                closed: AtomicBool::new(false),
            }),
        }
    }
}

/// Protocol-agnostic message transport
#[derive(Clone)]
pub struct MalTransport {
    core: Arc<TransportCore>,
}

impl MalTransport {
    pub fn builder(wire: Arc<dyn WireTransport>) -> TransportBuilder {
        TransportBuilder::new(wire)
    }

    /// Create a named endpoint, or return the existing one
    ///
    /// Idempotent: calling again with a name already registered hands back
    /// the registered endpoint untouched.
    pub fn create_endpoint(&self, name: &str) -> TransportResult<Arc<Endpoint>> {
        if self.core.is_closed() {
            return Err(TransportError::Closed);
        }
        let delimiter = self.core.wire.service_delimiter();
        if name.is_empty() || name.contains(delimiter) {
            return Err(TransportError::invalid_uri(
                name,
                format!("endpoint name must be non-empty and free of '{delimiter}'"),
            ));
        }

        let mut endpoints = self.core.endpoints.lock();
        if let Some(existing) = endpoints.get(name) {
            return Ok(Arc::clone(existing));
        }

        let uri = uri::endpoint_uri(&self.core.wire.local_base_uri(), delimiter, name);
        let endpoint = Arc::new(Endpoint::new(
            name.to_string(),
            uri,
            Arc::downgrade(&self.core),
        ));
        endpoints.insert(name.to_string(), Arc::clone(&endpoint));
        debug!(name, uri = %endpoint.uri(), "endpoint created");
        Ok(endpoint)
    }

    /// Drop an endpoint registration
    ///
    /// Returns whether the name was registered; repeat calls are no-ops.
    /// Inbound messages addressed to a deleted endpoint take the
    /// unknown-destination path from then on.
    pub fn delete_endpoint(&self, name: &str) -> bool {
        let removed = self.core.endpoints.lock().remove(name).is_some();
        if removed {
            debug!(name, "endpoint deleted");
        }
        removed
    }

    pub fn endpoint(&self, name: &str) -> Option<Arc<Endpoint>> {
        self.core.endpoints.lock().get(name).cloned()
    }

    pub fn endpoint_by_uri(&self, uri: &str) -> Option<Arc<Endpoint>> {
        self.core.endpoint_by_uri(uri)
    }

    pub fn config(&self) -> &TransportConfig {
        &self.core.config
    }

    pub fn registry(&self) -> Arc<ElementRegistry> {
        Arc::clone(&self.core.registry)
    }

    /// Hand a frame received from the wire to the transport
    ///
    /// Decoding and routing run on a spawned task so the wire's read loop is
    /// never blocked behind a slow listener.
    pub fn receive_frame(&self, frame: Vec<u8>) {
        let core = Arc::clone(&self.core);
        tokio::spawn(async move {
            if let Err(error) = core.deliver_frame(frame).await {
                warn!(%error, "inbound frame dropped");
            }
        });
    }

    /// Decode and route a frame inline
    ///
    /// Same path as [`receive_frame`](Self::receive_frame) without the
    /// spawn; wires with their own task structure (and tests) call this
    /// directly.
    pub async fn deliver_frame(&self, frame: Vec<u8>) -> TransportResult<()> {
        self.core.deliver_frame(frame).await
    }

    /// Close the transport: refuse new work and fail everything queued
    pub fn close(&self) {
        self.core.closed.store(true, Ordering::SeqCst);
        let drained: Vec<PendingSend> = {
            let mut outgoing = self.core.outgoing.lock();
            outgoing.drain(..).collect()
        };
        for pending in drained {
            if let Some(done) = pending.done {
                let _ = done.send(Err(TransportError::Closed));
            }
        }
        self.core.endpoints.lock().clear();
        debug!("transport closed");
    }
}

impl std::fmt::Debug for MalTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MalTransport")
            .field("protocol", &self.core.wire.protocol())
            .field("endpoints", &self.core.endpoints.lock().len())
            .field("queued", &self.core.outgoing.lock().len())
            .finish()
    }
}

pub(crate) struct TransportCore {
    pub(crate) config: TransportConfig,
    pub(crate) wire: Arc<dyn WireTransport>,
    pub(crate) header_codec: Arc<dyn HeaderCodec>,
    pub(crate) stream_factory: Arc<dyn StreamFactory>,
    pub(crate) registry: Arc<ElementRegistry>,
    pub(crate) operations: Arc<dyn OperationLookup>,
    endpoints: Mutex<HashMap<String, Arc<Endpoint>>>,
    bad_urls: Mutex<HashSet<String>>,
    outgoing: Mutex<VecDeque<PendingSend>>,
    pump_running: AtomicBool,
    pub(crate) next_transaction: AtomicI64,
    closed: AtomicBool,
}

impl TransportCore {
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub(crate) fn endpoint_by_uri(&self, uri: &str) -> Option<Arc<Endpoint>> {
        self.endpoints
            .lock()
            .values()
            .find(|e| e.uri() == uri)
            .cloned()
    }

    /// Append frames to the outgoing queue and drive the pump
    pub(crate) async fn submit(self: &Arc<Self>, pendings: Vec<PendingSend>) {
        {
            let mut outgoing = self.outgoing.lock();
            outgoing.extend(pendings);
            if outgoing.len() > self.config.queue_warn_depth {
                warn!(depth = outgoing.len(), "outgoing queue backlog");
            }
        }
        self.run_pump().await;
    }

    /// Drain the queue if no other task is already doing so
    async fn run_pump(self: &Arc<Self>) {
        loop {
            if self
                .pump_running
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_err()
            {
                // Another sender is pumping; it will pick our frames up
                return;
            }

            loop {
                let next = self.outgoing.lock().pop_front();
                match next {
                    Some(pending) => self.dispatch(pending).await,
                    None => break,
                }
            }

            self.pump_running.store(false, Ordering::Release);
            // A producer may have enqueued between the last pop and the flag
            // release; re-check so that frame is not stranded
            if self.outgoing.lock().is_empty() {
                return;
            }
        }
    }

    async fn dispatch(&self, pending: PendingSend) {
        let quarantined = self.bad_urls.lock().remove(&pending.address);
        let result = if quarantined {
            Err(TransportError::Quarantined {
                destination: pending.address.clone(),
            })
        } else {
            self.send_on_wire(&pending).await
        };

        if let Err(error) = &result {
            if !quarantined {
                self.bad_urls.lock().insert(pending.address.clone());
            }
            warn!(destination = %pending.destination, %error, "frame delivery failed");
        }

        if let Some(done) = pending.done {
            let _ = done.send(result);
        }
    }

    async fn send_on_wire(&self, pending: &PendingSend) -> TransportResult<()> {
        if self.config.verbose_packets {
            let preview_len = pending.frame.len().min(64);
            debug!(
                destination = %pending.destination,
                bytes = pending.frame.len(),
                head = ?&pending.frame[..preview_len],
                "frame out"
            );
        }
        self.wire
            .send_frame(&pending.destination, &pending.frame)
            .await?;
        if pending.is_last_in_batch {
            self.wire.flush().await?;
        }
        Ok(())
    }

    /// Decode an inbound frame and route it to its endpoint
    ///
    /// Routing is by the endpoint name extracted from the destination URI;
    /// anything after the endpoint name is routing detail below this core's
    /// granularity and is left to the listener.
    pub(crate) async fn deliver_frame(self: &Arc<Self>, frame: Vec<u8>) -> TransportResult<()> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let message = MalMessage::decode(
            &frame,
            self.header_codec.as_ref(),
            Arc::clone(&self.stream_factory),
            Arc::clone(&self.registry),
            self.operations.as_ref(),
            self.config.wrap_body_parts,
        )?;

        let target = UriParts::parse(&message.header.uri_to, self.wire.service_delimiter())
            .ok()
            .and_then(|parts| parts.endpoint)
            .and_then(|name| self.endpoints.lock().get(&name).cloned());
        match target {
            Some(endpoint) => {
                endpoint.deliver(message);
                Ok(())
            }
            None => {
                self.reject_unknown_destination(message).await;
                Ok(())
            }
        }
    }

    /// Send DESTINATION_UNKNOWN back to the originator of an unroutable
    /// message
    async fn reject_unknown_destination(self: &Arc<Self>, message: MalMessage) {
        let uri_to = message.header.uri_to.clone();
        warn!(%uri_to, "inbound message for unknown endpoint");

        let error = TransportError::DestinationUnknown { uri: uri_to };
        let Some(reply) = message.error_reply(
            error.error_number(),
            Some(Box::new(Attribute::String(error.to_string()))),
        ) else {
            return;
        };

        let frame = match reply.encode(
            self.header_codec.as_ref(),
            self.stream_factory.as_ref(),
            self.config.wrap_body_parts,
        ) {
            Ok(frame) => frame,
            Err(error) => {
                warn!(%error, "failed to encode DESTINATION_UNKNOWN reply");
                return;
            }
        };

        let destination = reply.header.uri_to.clone();
        let address = UriParts::parse(&destination, self.wire.service_delimiter())
            .map(|parts| parts.base())
            .unwrap_or_else(|_| destination.clone());
        self.submit(vec![PendingSend {
            destination,
            address,
            frame,
            is_last_in_batch: true,
            done: None,
        }])
        .await;
    }
}

impl std::fmt::Debug for TransportCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportCore")
            .field("protocol", &self.wire.protocol())
            .finish_non_exhaustive()
    }
}
