//! Whole-message assembly and disassembly
//!
//! A frame is the header followed immediately by the body bytes. Decoding
//! splits the two: the header is parsed eagerly (routing needs it), the body
//! bytes are captured as-is and handed to [`MessageBody`] for deferred
//! decoding. Encoding is the mirror image.

use crate::body::{schema_for, BodyKind, DecodeContext, MessageBody};
use crate::error::{CodecError, CodecResult};
use crate::header::{HeaderCodec, MessageHeader};
use mal_types::stream::StreamFactory;
use mal_types::{ElementRegistry, OperationLookup};
use std::sync::Arc;

/// One complete message: routing header plus (possibly still-encoded) body
#[derive(Debug)]
pub struct MalMessage {
    pub header: MessageHeader,
    pub body: MessageBody,
}

impl MalMessage {
    pub fn new(header: MessageHeader, body: MessageBody) -> Self {
        Self { header, body }
    }

    /// Build the automatic error reply to this message
    ///
    /// `None` when the header's (pattern, stage) pair does not open an
    /// exchange and therefore owes no reply.
    pub fn error_reply(
        &self,
        error_number: u32,
        extra_information: Option<Box<dyn mal_types::Element>>,
    ) -> Option<MalMessage> {
        let header = self.header.error_reply()?;
        Some(MalMessage {
            header,
            body: MessageBody::error(error_number, extra_information),
        })
    }

    /// Encode header and body into one wire frame
    pub fn encode(
        &self,
        header_codec: &dyn HeaderCodec,
        factory: &dyn StreamFactory,
        wrap_parts: bool,
    ) -> CodecResult<Vec<u8>> {
        let mut frame = Vec::new();
        {
            let mut encoder = factory.encoder(&mut frame);
            header_codec.encode(&self.header, encoder.as_mut())?;
        }
        self.body.encode(factory, wrap_parts, &mut frame)?;
        Ok(frame)
    }

    /// Parse the header of a frame and capture the body bytes for deferred
    /// decoding
    ///
    /// Header failures surface immediately; body failures surface on first
    /// element access. Operation metadata is resolved now so the eventual
    /// decode has its schema even if the lookup is dropped meanwhile.
    pub fn decode(
        frame: &[u8],
        header_codec: &dyn HeaderCodec,
        factory: Arc<dyn StreamFactory>,
        registry: Arc<ElementRegistry>,
        operations: &dyn OperationLookup,
        wrap_parts: bool,
    ) -> CodecResult<MalMessage> {
        let (header, body_bytes) = {
            let mut decoder = factory.decoder(frame);
            let header = header_codec.decode(decoder.as_mut())?;
            (header, decoder.take_remaining())
        };

        let kind = BodyKind::classify(
            header.interaction_type,
            header.interaction_stage,
            header.is_error_message,
        );
        let operation = operations.lookup(
            header.service_area,
            header.service,
            header.operation,
            header.area_version,
        );
        let schema = schema_for(kind, header.interaction_stage, operation.as_deref());

        let body = MessageBody::encoded(
            kind,
            schema,
            body_bytes,
            DecodeContext {
                factory,
                registry,
                wrap_parts,
            },
        );
        Ok(MalMessage { header, body })
    }

    /// Like [`decode`](Self::decode) but failing fast when the operation is
    /// not known to the lookup
    ///
    /// Endpoints that refuse traffic for unregistered operations use this
    /// instead of deferring to a body-decode failure much later.
    pub fn decode_strict(
        frame: &[u8],
        header_codec: &dyn HeaderCodec,
        factory: Arc<dyn StreamFactory>,
        registry: Arc<ElementRegistry>,
        operations: &dyn OperationLookup,
        wrap_parts: bool,
    ) -> CodecResult<MalMessage> {
        let message = Self::decode(
            frame,
            header_codec,
            factory,
            registry,
            operations,
            wrap_parts,
        )?;
        let h = &message.header;
        if !h.is_error_message
            && h.interaction_type != mal_types::InteractionType::PubSub
            && operations
                .lookup(h.service_area, h.service, h.operation, h.area_version)
                .is_none()
        {
            return Err(CodecError::UnknownOperation {
                area: h.service_area,
                service: h.service,
                operation: h.operation,
                version: h.area_version,
            });
        }
        Ok(message)
    }
}
