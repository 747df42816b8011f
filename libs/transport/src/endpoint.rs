//! Endpoints: the application-facing face of a transport
//!
//! An endpoint owns a URI under the transport's base address, builds
//! outgoing messages, and hands inbound ones to its listener. Delivery is
//! gated: a message arriving before `start_delivery` (or after
//! `stop_delivery`), or while no listener is set, is discarded with a
//! warning. An inactive endpoint is a deliberate sink, not an error.

use crate::error::{TransportError, TransportResult};
use crate::transport::TransportCore;
use crate::uri::UriParts;
use crate::wire::PendingSend;
use mal_codec::{schema_for, BodyKind, MalMessage, MessageBody, MessageHeader};
use mal_types::{Element, InteractionType, OperationKey, QosLevel, SessionType};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::oneshot;
use tracing::warn;

/// Receiver of messages addressed to an endpoint
pub trait MessageListener: Send + Sync {
    fn on_message(&self, endpoint: &Endpoint, message: MalMessage);
}

/// A named message source/sink on a transport
pub struct Endpoint {
    name: String,
    uri: String,
    core: Weak<TransportCore>,
    listener: Mutex<Option<Arc<dyn MessageListener>>>,
    delivering: AtomicBool,
}

impl Endpoint {
    pub(crate) fn new(name: String, uri: String, core: Weak<TransportCore>) -> Self {
        Self {
            name,
            uri,
            core,
            listener: Mutex::new(None),
            delivering: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    fn core(&self) -> TransportResult<Arc<TransportCore>> {
        self.core.upgrade().ok_or(TransportError::Closed)
    }

    /// Start building a message originating from this endpoint
    pub fn message(
        &self,
        uri_to: impl Into<String>,
        interaction: InteractionType,
        stage: u8,
        operation: OperationKey,
    ) -> MessageBuilder<'_> {
        MessageBuilder {
            endpoint: self,
            uri_to: uri_to.into(),
            interaction,
            stage,
            operation,
            qos_level: QosLevel::BestEffort,
            priority: 0,
            domain: Vec::new(),
            network_zone: String::new(),
            session_type: SessionType::Live,
            session_name: "LIVE".to_string(),
            transaction_id: None,
            authentication_id: Vec::new(),
            body: None,
        }
    }

    /// Queue one message and wait for its delivery outcome
    pub async fn send(&self, message: MalMessage) -> TransportResult<()> {
        let core = self.core()?;
        if core.is_closed() {
            return Err(TransportError::Closed);
        }
        let pending = self.encode_pending(&core, &message, true)?;
        let rx = pending.1;
        core.submit(vec![pending.0]).await;
        rx.await.unwrap_or(Err(TransportError::Closed))
    }

    /// Queue a batch best-effort
    ///
    /// Every message is attempted regardless of earlier failures; the result
    /// is `Ok(count)` when all went out, or `MultiTransmit` carrying each
    /// failure with its position in the batch.
    pub async fn send_multiple(&self, messages: Vec<MalMessage>) -> TransportResult<usize> {
        let core = self.core()?;
        if core.is_closed() {
            return Err(TransportError::Closed);
        }

        let total = messages.len();
        let mut failures: Vec<(usize, TransportError)> = Vec::new();
        let mut queued: Vec<(usize, PendingSend, oneshot::Receiver<TransportResult<()>>)> =
            Vec::new();

        for (index, message) in messages.iter().enumerate() {
            match self.encode_pending(&core, message, false) {
                Ok((pending, rx)) => queued.push((index, pending, rx)),
                Err(error) => failures.push((index, error)),
            }
        }
        if let Some((_, pending, _)) = queued.last_mut() {
            pending.is_last_in_batch = true;
        }

        let (pendings, receivers): (Vec<_>, Vec<_>) = queued
            .into_iter()
            .map(|(index, pending, rx)| (pending, (index, rx)))
            .unzip();
        core.submit(pendings).await;

        for (index, rx) in receivers {
            if let Err(error) = rx.await.unwrap_or(Err(TransportError::Closed)) {
                failures.push((index, error));
            }
        }

        if failures.is_empty() {
            Ok(total)
        } else {
            failures.sort_by_key(|(index, _)| *index);
            Err(TransportError::MultiTransmit {
                sent: total - failures.len(),
                failures,
            })
        }
    }

    fn encode_pending(
        &self,
        core: &Arc<TransportCore>,
        message: &MalMessage,
        is_last_in_batch: bool,
    ) -> TransportResult<(PendingSend, oneshot::Receiver<TransportResult<()>>)> {
        message.header.validate()?;
        let destination = &message.header.uri_to;
        let parts = UriParts::parse(destination, core.wire.service_delimiter())?;
        if parts.protocol != core.wire.protocol() {
            return Err(TransportError::invalid_uri(
                destination,
                format!(
                    "protocol '{}' not spoken by this transport ('{}')",
                    parts.protocol,
                    core.wire.protocol()
                ),
            ));
        }

        let frame = message.encode(
            core.header_codec.as_ref(),
            core.stream_factory.as_ref(),
            core.config.wrap_body_parts,
        )?;
        let (done, rx) = oneshot::channel();
        Ok((
            PendingSend {
                destination: destination.clone(),
                address: parts.base(),
                frame,
                is_last_in_batch,
                done: Some(done),
            },
            rx,
        ))
    }

    pub fn set_listener(&self, listener: Arc<dyn MessageListener>) {
        *self.listener.lock() = Some(listener);
    }

    /// Open the delivery gate
    pub fn start_delivery(&self) {
        self.delivering.store(true, Ordering::SeqCst);
    }

    /// Close the delivery gate; subsequent inbound messages are discarded
    pub fn stop_delivery(&self) {
        self.delivering.store(false, Ordering::SeqCst);
    }

    pub fn is_delivering(&self) -> bool {
        self.delivering.load(Ordering::SeqCst)
    }

    /// Hand an inbound message to the listener
    ///
    /// A closed gate or a missing listener discards the message.
    pub(crate) fn deliver(&self, message: MalMessage) {
        if !self.delivering.load(Ordering::SeqCst) {
            warn!(endpoint = %self.name, operation = message.header.operation,
                "message discarded: delivery not started");
            return;
        }
        let listener = self.listener.lock().clone();
        match listener {
            Some(listener) => listener.on_message(self, message),
            None => warn!(endpoint = %self.name, operation = message.header.operation,
                "message discarded: no listener registered"),
        }
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("uri", &self.uri)
            .field("delivering", &self.delivering.load(Ordering::SeqCst))
            .finish()
    }
}

/// Builder for messages originating from an endpoint
///
/// Unset fields take protocol-neutral defaults; the transaction id is drawn
/// from the transport's counter when not supplied.
pub struct MessageBuilder<'a> {
    endpoint: &'a Endpoint,
    uri_to: String,
    interaction: InteractionType,
    stage: u8,
    operation: OperationKey,
    qos_level: QosLevel,
    priority: u32,
    domain: Vec<String>,
    network_zone: String,
    session_type: SessionType,
    session_name: String,
    transaction_id: Option<i64>,
    authentication_id: Vec<u8>,
    body: Option<MessageBody>,
}

impl MessageBuilder<'_> {
    pub fn qos(mut self, qos_level: QosLevel) -> Self {
        self.qos_level = qos_level;
        self
    }

    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn domain(mut self, domain: Vec<String>) -> Self {
        self.domain = domain;
        self
    }

    pub fn network_zone(mut self, zone: impl Into<String>) -> Self {
        self.network_zone = zone.into();
        self
    }

    pub fn session(mut self, session_type: SessionType, name: impl Into<String>) -> Self {
        self.session_type = session_type;
        self.session_name = name.into();
        self
    }

    pub fn transaction_id(mut self, id: i64) -> Self {
        self.transaction_id = Some(id);
        self
    }

    pub fn authentication(mut self, id: Vec<u8>) -> Self {
        self.authentication_id = id;
        self
    }

    /// Supply the body elements; the schema is resolved from the operation
    /// lookup (or the fixed PUBSUB shapes)
    pub fn elements(mut self, elements: Vec<Option<Box<dyn Element>>>) -> TransportResult<Self> {
        let core = self.endpoint.core()?;
        let kind = BodyKind::classify(self.interaction, self.stage, false);
        let spec = core.operations.lookup(
            self.operation.area,
            self.operation.service,
            self.operation.operation,
            self.operation.version,
        );
        let schema = schema_for(kind, self.stage, spec.as_deref());
        self.body = Some(MessageBody::from_elements(kind, schema, elements));
        Ok(self)
    }

    /// Supply a pre-built body (pass-through blobs, error bodies)
    pub fn body(mut self, body: MessageBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn build(self) -> TransportResult<MalMessage> {
        let core = self.endpoint.core()?;
        let transaction_id = self.transaction_id.unwrap_or_else(|| {
            core.next_transaction
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed)
        });
        let is_error_message = matches!(
            self.body,
            Some(ref body) if body.kind() == BodyKind::Error
        );

        let header = MessageHeader {
            uri_from: self.endpoint.uri.clone(),
            authentication_id: self.authentication_id,
            uri_to: self.uri_to,
            timestamp: now_nanos(),
            qos_level: self.qos_level,
            priority: self.priority,
            domain: self.domain,
            network_zone: self.network_zone,
            session_type: self.session_type,
            session_name: self.session_name,
            interaction_type: self.interaction,
            interaction_stage: self.stage,
            transaction_id,
            service_area: self.operation.area,
            service: self.operation.service,
            operation: self.operation.operation,
            area_version: self.operation.version,
            is_error_message,
        };
        header.validate()?;

        let body = match self.body {
            Some(body) => body,
            None => {
                let kind = BodyKind::classify(self.interaction, self.stage, false);
                MessageBody::from_elements(
                    kind,
                    schema_for(kind, self.stage, None),
                    Vec::new(),
                )
            }
        };
        Ok(MalMessage::new(header, body))
    }
}

fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}
