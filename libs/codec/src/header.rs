//! Message header schema and codecs
//!
//! One header struct covers every protocol; what varies per wire format is
//! the [`HeaderCodec`] implementation, not the type. The byte-stream codec
//! here writes the header element-by-element; compact mappings (e.g. a
//! space-packet preamble packing fields into bit-fields) implement the same
//! trait against their own layout.

use crate::error::{CodecError, CodecResult};
use crate::stage_code::{decode_stage_code, encode_stage_code};
use mal_types::stream::{ElementDecoder, ElementEncoder};
use mal_types::{InteractionType, QosLevel, SessionType};
use std::fmt::Debug;

/// Fixed addressing and interaction metadata of every message
///
/// Headers are built whole and never mutated after the message is handed to
/// the transport; every constructor path ends in [`validate`](Self::validate).
#[derive(Debug, Clone, PartialEq)]
pub struct MessageHeader {
    pub uri_from: String,
    pub authentication_id: Vec<u8>,
    pub uri_to: String,
    /// Nanoseconds since the MAL epoch
    pub timestamp: u64,
    pub qos_level: QosLevel,
    pub priority: u32,
    pub domain: Vec<String>,
    pub network_zone: String,
    pub session_type: SessionType,
    pub session_name: String,
    pub interaction_type: InteractionType,
    pub interaction_stage: u8,
    pub transaction_id: i64,
    pub service_area: u16,
    pub service: u16,
    pub operation: u16,
    pub area_version: u8,
    pub is_error_message: bool,
}

impl MessageHeader {
    /// Check the stage against the interaction pattern's stage table
    pub fn validate(&self) -> CodecResult<()> {
        if !self
            .interaction_type
            .is_valid_stage(self.interaction_stage)
        {
            return Err(CodecError::invalid_stage(
                interaction_label(self.interaction_type),
                self.interaction_stage,
            ));
        }
        Ok(())
    }

    /// Header of the automatic error reply to this message, if one is due
    ///
    /// Swaps the addressing, bumps the stage to the pattern's ack stage and
    /// raises the error flag. `None` when the (pattern, stage) pair does not
    /// open an exchange.
    pub fn error_reply(&self) -> Option<MessageHeader> {
        let reply_stage = self
            .interaction_type
            .error_stage_for(self.interaction_stage)?;
        Some(MessageHeader {
            uri_from: self.uri_to.clone(),
            uri_to: self.uri_from.clone(),
            interaction_stage: reply_stage,
            is_error_message: true,
            ..self.clone()
        })
    }
}

/// Per-protocol header wire mapping
pub trait HeaderCodec: Send + Sync + Debug {
    fn encode(
        &self,
        header: &MessageHeader,
        encoder: &mut dyn ElementEncoder,
    ) -> CodecResult<()>;

    fn decode(&self, decoder: &mut dyn ElementDecoder) -> CodecResult<MessageHeader>;
}

/// Element-by-element header mapping for byte-stream protocols
///
/// Interaction type and stage travel as the compact one-byte stage code.
#[derive(Debug, Default, Clone, Copy)]
pub struct StreamHeaderCodec;

impl HeaderCodec for StreamHeaderCodec {
    fn encode(
        &self,
        header: &MessageHeader,
        encoder: &mut dyn ElementEncoder,
    ) -> CodecResult<()> {
        header.validate()?;

        encoder.write_uri(&header.uri_from)?;
        encoder.write_blob(&header.authentication_id)?;
        encoder.write_uri(&header.uri_to)?;
        encoder.write_time(header.timestamp)?;
        encoder.write_u8(header.qos_level as u8)?;
        encoder.write_u32(header.priority)?;
        encoder.write_u32(header.domain.len() as u32)?;
        for part in &header.domain {
            encoder.write_identifier(part)?;
        }
        encoder.write_identifier(&header.network_zone)?;
        encoder.write_u8(header.session_type as u8)?;
        encoder.write_identifier(&header.session_name)?;
        let code = encode_stage_code(header.interaction_type, header.interaction_stage)?;
        encoder.write_u8(code)?;
        encoder.write_i64(header.transaction_id)?;
        encoder.write_u16(header.service_area)?;
        encoder.write_u16(header.service)?;
        encoder.write_u16(header.operation)?;
        encoder.write_u8(header.area_version)?;
        encoder.write_bool(header.is_error_message)?;
        Ok(())
    }

    fn decode(&self, decoder: &mut dyn ElementDecoder) -> CodecResult<MessageHeader> {
        let uri_from = decoder.read_uri()?;
        let authentication_id = decoder.read_blob()?;
        let uri_to = decoder.read_uri()?;
        let timestamp = decoder.read_time()?;
        let qos_level = QosLevel::from_ordinal(decoder.read_u8()?)
            .map_err(|e| CodecError::from(e).in_field("qos_level", None))?;
        let priority = decoder.read_u32()?;
        let domain_len = decoder.read_u32()? as usize;
        let mut domain = Vec::with_capacity(domain_len.min(64));
        for _ in 0..domain_len {
            domain.push(decoder.read_identifier()?);
        }
        let network_zone = decoder.read_identifier()?;
        let session_type = SessionType::from_ordinal(decoder.read_u8()?)
            .map_err(|e| CodecError::from(e).in_field("session_type", None))?;
        let session_name = decoder.read_identifier()?;
        let (interaction_type, interaction_stage) = decode_stage_code(decoder.read_u8()?);
        let transaction_id = decoder.read_i64()?;
        let service_area = decoder.read_u16()?;
        let service = decoder.read_u16()?;
        let operation = decoder.read_u16()?;
        let area_version = decoder.read_u8()?;
        let is_error_message = decoder.read_bool()?;

        let header = MessageHeader {
            uri_from,
            authentication_id,
            uri_to,
            timestamp,
            qos_level,
            priority,
            domain,
            network_zone,
            session_type,
            session_name,
            interaction_type,
            interaction_stage,
            transaction_id,
            service_area,
            service,
            operation,
            area_version,
            is_error_message,
        };
        header.validate()?;
        Ok(header)
    }
}

fn interaction_label(interaction: InteractionType) -> &'static str {
    match interaction {
        InteractionType::Send => "SEND",
        InteractionType::Submit => "SUBMIT",
        InteractionType::Request => "REQUEST",
        InteractionType::Invoke => "INVOKE",
        InteractionType::Progress => "PROGRESS",
        InteractionType::PubSub => "PUBSUB",
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::binary::BinaryStreamFactory;
    use mal_types::interaction::stage;
    use mal_types::StreamFactory;

    pub(crate) fn sample_header() -> MessageHeader {
        MessageHeader {
            uri_from: "malref://host-a/consumer".to_string(),
            authentication_id: vec![0xDE, 0xAD],
            uri_to: "malref://host-b/provider".to_string(),
            timestamp: 1_234_567_890,
            qos_level: QosLevel::Assured,
            priority: 7,
            domain: vec!["esa".to_string(), "mission".to_string()],
            network_zone: "ops".to_string(),
            session_type: SessionType::Live,
            session_name: "LIVE".to_string(),
            interaction_type: InteractionType::Request,
            interaction_stage: stage::REQUEST,
            transaction_id: 42,
            service_area: 7,
            service: 2,
            operation: 100,
            area_version: 1,
            is_error_message: false,
        }
    }

    #[test]
    fn test_header_roundtrip() {
        let codec = StreamHeaderCodec;
        let factory = BinaryStreamFactory;
        let header = sample_header();

        let mut bytes = Vec::new();
        codec
            .encode(&header, factory.encoder(&mut bytes).as_mut())
            .unwrap();
        let decoded = codec.decode(factory.decoder(&bytes).as_mut()).unwrap();

        assert_eq!(decoded, header);
    }

    #[test]
    fn test_truncated_header_is_error_not_panic() {
        let codec = StreamHeaderCodec;
        let factory = BinaryStreamFactory;
        let mut bytes = Vec::new();
        codec
            .encode(&sample_header(), factory.encoder(&mut bytes).as_mut())
            .unwrap();

        for cut in [0, 1, bytes.len() / 2, bytes.len() - 1] {
            let result = codec.decode(factory.decoder(&bytes[..cut]).as_mut());
            assert!(result.is_err(), "cut at {cut} decoded successfully");
        }
    }

    #[test]
    fn test_invalid_stage_rejected() {
        let mut header = sample_header();
        header.interaction_stage = 9;
        assert!(header.validate().is_err());

        let codec = StreamHeaderCodec;
        let factory = BinaryStreamFactory;
        let mut bytes = Vec::new();
        let result = codec.encode(&header, factory.encoder(&mut bytes).as_mut());
        assert!(result.is_err());
    }

    #[test]
    fn test_error_reply_swaps_addressing_and_bumps_stage() {
        let mut header = sample_header();
        header.interaction_type = InteractionType::Submit;
        header.interaction_stage = stage::SUBMIT;

        let reply = header.error_reply().unwrap();
        assert_eq!(reply.uri_from, header.uri_to);
        assert_eq!(reply.uri_to, header.uri_from);
        assert_eq!(reply.interaction_stage, stage::SUBMIT_ACK);
        assert!(reply.is_error_message);
        assert_eq!(reply.transaction_id, header.transaction_id);
    }

    #[test]
    fn test_no_error_reply_for_send() {
        let mut header = sample_header();
        header.interaction_type = InteractionType::Send;
        header.interaction_stage = stage::SEND;
        assert!(header.error_reply().is_none());
    }
}
