//! Lazy message bodies
//!
//! A body is decoded at most once, and only when somebody actually looks at
//! it. Until then it holds the still-encoded bytes plus everything needed to
//! decode them later (stream factory, registry, stage schema). A relay that
//! never touches the elements re-emits the original bytes verbatim, so
//! pass-through never pays a parse/re-encode cycle.
//!
//! One struct covers every body shape; the [`BodyKind`] discriminant selects
//! the kind-specific accessors (PUBLISH/NOTIFY update extraction, REGISTER
//! subscriptions, error number/extra pairs) via pattern matching.

use crate::error::{CodecError, CodecResult};
use mal_types::interaction::stage;
use mal_types::stream::StreamFactory;
use mal_types::{
    Attribute, Element, ElementList, ElementRegistry, FieldSpec, FieldType, InteractionType,
    OperationSpec, Subscription, UpdateHeader,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shape discriminant of a message body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Plain stage body following the operation's field schema
    Standard,
    /// Error body: `{error_number, extra_information}`; ignores any schema
    Error,
    Register,
    PublishRegister,
    Publish,
    Notify,
    Deregister,
    PublishDeregister,
}

impl BodyKind {
    /// Classify the body shape of a message from its header facts
    pub fn classify(interaction: InteractionType, msg_stage: u8, is_error: bool) -> BodyKind {
        if is_error {
            return BodyKind::Error;
        }
        if interaction == InteractionType::PubSub {
            return match msg_stage {
                stage::REGISTER => BodyKind::Register,
                stage::PUBLISH_REGISTER => BodyKind::PublishRegister,
                stage::PUBLISH => BodyKind::Publish,
                stage::NOTIFY => BodyKind::Notify,
                stage::DEREGISTER => BodyKind::Deregister,
                stage::PUBLISH_DEREGISTER => BodyKind::PublishDeregister,
                _ => BodyKind::Standard,
            };
        }
        BodyKind::Standard
    }

    /// Offset of the update-header element within PUBLISH/NOTIFY bodies
    fn update_header_offset(self) -> Option<usize> {
        match self {
            BodyKind::Publish => Some(0),
            // NOTIFY bodies lead with the subscription id
            BodyKind::Notify => Some(1),
            _ => None,
        }
    }
}

/// Everything needed to decode a deferred body later
#[derive(Clone)]
pub struct DecodeContext {
    pub factory: Arc<dyn StreamFactory>,
    pub registry: Arc<ElementRegistry>,
    pub wrap_parts: bool,
}

impl std::fmt::Debug for DecodeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeContext")
            .field("wrap_parts", &self.wrap_parts)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
enum BodyState {
    /// Materialized elements, in schema order; entries are nullable
    Decoded(Vec<Option<Box<dyn Element>>>),
    /// Still-encoded bytes plus the context to decode them on first access
    Encoded { bytes: Vec<u8>, ctx: DecodeContext },
    /// One opaque pre-encoded blob, re-emitted verbatim (relay pass-through)
    Raw(Vec<u8>),
}

/// Message body with decode-on-first-access semantics
#[derive(Debug)]
pub struct MessageBody {
    kind: BodyKind,
    schema: Arc<[FieldSpec]>,
    state: Mutex<BodyState>,
    decode_passes: AtomicUsize,
}

impl MessageBody {
    /// Build a body from already-materialized elements (send side)
    pub fn from_elements(
        kind: BodyKind,
        schema: Arc<[FieldSpec]>,
        elements: Vec<Option<Box<dyn Element>>>,
    ) -> Self {
        Self {
            kind,
            schema,
            state: Mutex::new(BodyState::Decoded(elements)),
            decode_passes: AtomicUsize::new(0),
        }
    }

    /// Build an error body: `{error_number, extra_information}`
    pub fn error(error_number: u32, extra_information: Option<Box<dyn Element>>) -> Self {
        Self {
            kind: BodyKind::Error,
            schema: Arc::from([] as [FieldSpec; 0]),
            state: Mutex::new(BodyState::Decoded(vec![
                Some(Box::new(Attribute::UInteger(error_number))),
                extra_information,
            ])),
            decode_passes: AtomicUsize::new(0),
        }
    }

    /// Build a deferred body from its still-encoded bytes (receive side)
    pub fn encoded(
        kind: BodyKind,
        schema: Arc<[FieldSpec]>,
        bytes: Vec<u8>,
        ctx: DecodeContext,
    ) -> Self {
        Self {
            kind,
            schema,
            state: Mutex::new(BodyState::Encoded { bytes, ctx }),
            decode_passes: AtomicUsize::new(0),
        }
    }

    /// Build a pass-through body holding one opaque pre-encoded blob
    pub fn raw(bytes: Vec<u8>) -> Self {
        Self {
            kind: BodyKind::Standard,
            schema: Arc::from([] as [FieldSpec; 0]),
            state: Mutex::new(BodyState::Raw(bytes)),
            decode_passes: AtomicUsize::new(0),
        }
    }

    pub fn kind(&self) -> BodyKind {
        self.kind
    }

    /// Whether the elements have been materialized yet
    pub fn is_decoded(&self) -> bool {
        matches!(&*self.state.lock(), BodyState::Decoded(_))
    }

    /// How many underlying decode passes have run (0 or 1)
    pub fn decode_passes(&self) -> usize {
        self.decode_passes.load(Ordering::Relaxed)
    }

    /// Number of body elements, decoding on demand
    ///
    /// Two for error bodies, schema length otherwise.
    pub fn element_count(&self) -> CodecResult<usize> {
        let mut state = self.state.lock();
        self.ensure_decoded(&mut state)?;
        match &*state {
            BodyState::Decoded(elements) => Ok(elements.len()),
            _ => unreachable!("ensure_decoded leaves body decoded"),
        }
    }

    /// Clone of the element at `index`, decoding on demand
    pub fn element(&self, index: usize) -> CodecResult<Option<Box<dyn Element>>> {
        let mut state = self.state.lock();
        self.ensure_decoded(&mut state)?;
        match &*state {
            BodyState::Decoded(elements) => match elements.get(index) {
                Some(slot) => Ok(slot.clone()),
                None => Err(CodecError::index_out_of_range(index, elements.len())),
            },
            _ => unreachable!("ensure_decoded leaves body decoded"),
        }
    }

    /// Up-cast copy: copy the entries of the list at `index` into the
    /// caller-supplied concrete container
    ///
    /// The stored value is left untouched; this is how a caller narrows a
    /// heterogeneous container to a typed list without mutating the body.
    pub fn element_into(&self, index: usize, target: &mut ElementList) -> CodecResult<()> {
        let element = self
            .element(index)?
            .ok_or_else(|| CodecError::malformed(format!("body element {index} is null")))?;
        let source = element
            .as_any()
            .downcast_ref::<ElementList>()
            .ok_or_else(|| {
                CodecError::Unsupported(format!(
                    "body element {index} is not a list, cannot copy into target container"
                ))
            })?;
        target.extend_from(source);
        Ok(())
    }

    /// PUBLISH/NOTIFY: the update-header element at the kind's fixed offset
    pub fn update_header(&self) -> CodecResult<Option<Box<dyn Element>>> {
        let offset = self
            .kind
            .update_header_offset()
            .ok_or(CodecError::WrongBodyKind("update_header"))?;
        self.element(offset)
    }

    /// PUBLISH/NOTIFY: every element after the update header
    pub fn update_objects(&self) -> CodecResult<Vec<Option<Box<dyn Element>>>> {
        let offset = self
            .kind
            .update_header_offset()
            .ok_or(CodecError::WrongBodyKind("update_objects"))?;
        let count = self.element_count()?;
        let mut objects = Vec::with_capacity(count.saturating_sub(offset + 1));
        for index in offset + 1..count {
            objects.push(self.element(index)?);
        }
        Ok(objects)
    }

    /// REGISTER: the subscription element
    pub fn subscription(&self) -> CodecResult<Subscription> {
        if self.kind != BodyKind::Register {
            return Err(CodecError::WrongBodyKind("subscription"));
        }
        let element = self
            .element(0)?
            .ok_or_else(|| CodecError::malformed("REGISTER body carries a null subscription"))?;
        element
            .as_any()
            .downcast_ref::<Subscription>()
            .cloned()
            .ok_or_else(|| {
                CodecError::malformed("REGISTER body element 0 is not a Subscription")
            })
    }

    /// DEREGISTER: the identifier list naming the subscriptions to drop
    pub fn identifier_list(&self) -> CodecResult<ElementList> {
        if self.kind != BodyKind::Deregister {
            return Err(CodecError::WrongBodyKind("identifier_list"));
        }
        let element = self
            .element(0)?
            .ok_or_else(|| CodecError::malformed("DEREGISTER body carries a null id list"))?;
        element
            .as_any()
            .downcast_ref::<ElementList>()
            .cloned()
            .ok_or_else(|| CodecError::malformed("DEREGISTER body element 0 is not a list"))
    }

    /// ERROR: the wire error number
    pub fn error_number(&self) -> CodecResult<u32> {
        if self.kind != BodyKind::Error {
            return Err(CodecError::WrongBodyKind("error_number"));
        }
        let element = self
            .element(0)?
            .ok_or_else(|| CodecError::malformed("error body carries a null error number"))?;
        element
            .as_any()
            .downcast_ref::<Attribute>()
            .and_then(Attribute::as_uinteger)
            .ok_or_else(|| CodecError::malformed("error body element 0 is not a UInteger"))
    }

    /// ERROR: the optional extra-information element
    pub fn extra_information(&self) -> CodecResult<Option<Box<dyn Element>>> {
        if self.kind != BodyKind::Error {
            return Err(CodecError::WrongBodyKind("extra_information"));
        }
        self.element(1)
    }

    /// Encode the body to `out`
    ///
    /// Three mutually exclusive cases, checked in order: a raw pass-through
    /// blob is copied verbatim; a still-encoded body is copied verbatim; a
    /// materialized body is encoded element by element against the schema.
    pub fn encode(
        &self,
        factory: &dyn StreamFactory,
        wrap_parts: bool,
        out: &mut Vec<u8>,
    ) -> CodecResult<()> {
        let state = self.state.lock();
        match &*state {
            BodyState::Raw(bytes) => {
                out.extend_from_slice(bytes);
                Ok(())
            }
            BodyState::Encoded { bytes, .. } => {
                out.extend_from_slice(bytes);
                Ok(())
            }
            BodyState::Decoded(elements) => {
                self.encode_elements(elements, factory, wrap_parts, out)
            }
        }
    }

    fn encode_elements(
        &self,
        elements: &[Option<Box<dyn Element>>],
        factory: &dyn StreamFactory,
        wrap_parts: bool,
        out: &mut Vec<u8>,
    ) -> CodecResult<()> {
        let mut encoder = factory.encoder(out);

        if self.kind == BodyKind::Error {
            let number = elements
                .first()
                .and_then(|e| e.as_deref())
                .and_then(|e| e.as_any().downcast_ref::<Attribute>())
                .and_then(Attribute::as_uinteger)
                .ok_or_else(|| CodecError::malformed("error body lost its error number"))?;
            encoder.write_u32(number)?;
            match elements.get(1).and_then(|e| e.as_deref()) {
                Some(extra) => {
                    encoder.write_presence(true)?;
                    encoder.write_i64(extra.type_id().to_raw())?;
                    encoder.write_element(extra)?;
                }
                None => encoder.write_presence(false)?,
            }
            return Ok(());
        }

        if elements.len() != self.schema.len() {
            return Err(CodecError::malformed(format!(
                "body has {} elements but the stage schema defines {}",
                elements.len(),
                self.schema.len()
            )));
        }

        for (field, slot) in self.schema.iter().zip(elements.iter()) {
            match slot.as_deref() {
                None => {
                    if !field.nullable {
                        return Err(CodecError::malformed(format!(
                            "non-nullable body field '{}' is null",
                            field.name
                        )));
                    }
                    encoder.write_presence(false)?;
                }
                Some(element) => {
                    if field.nullable {
                        encoder.write_presence(true)?;
                    }
                    if wrap_parts {
                        // Each part becomes a standalone length-delimited
                        // encoded unit that relays can extract untouched
                        let mut part = Vec::new();
                        {
                            let mut part_encoder = factory.encoder(&mut part);
                            write_part(part_encoder.as_mut(), field, element)?;
                        }
                        encoder.write_blob(&part)?;
                    } else {
                        write_part(encoder.as_mut(), field, element)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Run the deferred decode, exactly once
    ///
    /// A decode failure leaves the encoded bytes in place, so the body can
    /// still be forwarded verbatim and a retried access reports the same
    /// error against the original bytes.
    fn ensure_decoded(&self, state: &mut BodyState) -> CodecResult<()> {
        let elements = match &*state {
            BodyState::Decoded(_) => return Ok(()),
            BodyState::Raw(_) => {
                return Err(CodecError::Unsupported(
                    "raw pass-through body has no element view".to_string(),
                ))
            }
            BodyState::Encoded { bytes, ctx } => {
                tracing::trace!(kind = ?self.kind, bytes = bytes.len(), "deferred body decode");
                self.decode_elements(bytes, ctx)?
            }
        };

        self.decode_passes.fetch_add(1, Ordering::Relaxed);
        *state = BodyState::Decoded(elements);
        Ok(())
    }

    fn decode_elements(
        &self,
        bytes: &[u8],
        ctx: &DecodeContext,
    ) -> CodecResult<Vec<Option<Box<dyn Element>>>> {
        let mut decoder = ctx.factory.decoder(bytes);

        if self.kind == BodyKind::Error {
            let number = decoder
                .read_u32()
                .map_err(|e| CodecError::from(e).in_field("error_number", None))?;
            let extra = if decoder
                .read_presence()
                .map_err(|e| CodecError::from(e).in_field("extra_information", None))?
            {
                let raw = decoder
                    .read_i64()
                    .map_err(|e| CodecError::from(e).in_field("extra_information", None))?;
                let mut element = ctx.registry.create(raw)?;
                decoder
                    .read_element_into(element.as_mut())
                    .map_err(|e| CodecError::from(e).in_field("extra_information", None))?;
                Some(element)
            } else {
                None
            };
            return Ok(vec![Some(Box::new(Attribute::UInteger(number))), extra]);
        }

        let mut elements = Vec::with_capacity(self.schema.len());
        for field in self.schema.iter() {
            if field.nullable {
                let present = decoder
                    .read_presence()
                    .map_err(|e| CodecError::from(e).in_field(field.name, None))?;
                if !present {
                    elements.push(None);
                    continue;
                }
            }

            let element = if ctx.wrap_parts {
                let part = decoder
                    .read_blob()
                    .map_err(|e| CodecError::from(e).in_field(field.name, None))?;
                let mut part_decoder = ctx.factory.decoder(&part);
                read_part(part_decoder.as_mut(), field, &ctx.registry)?
            } else {
                read_part(decoder.as_mut(), field, &ctx.registry)?
            };
            elements.push(Some(element));
        }
        Ok(elements)
    }
}

fn write_part(
    encoder: &mut dyn mal_types::stream::ElementEncoder,
    field: &FieldSpec,
    element: &dyn Element,
) -> CodecResult<()> {
    if field.field_type == FieldType::Abstract {
        // The concrete type travels ahead of the value
        encoder.write_i64(element.type_id().to_raw())?;
    }
    encoder
        .write_element(element)
        .map_err(|e| CodecError::from(e).in_field(field.name, Some(element.type_id())))
}

fn read_part(
    decoder: &mut dyn mal_types::stream::ElementDecoder,
    field: &FieldSpec,
    registry: &ElementRegistry,
) -> CodecResult<Box<dyn Element>> {
    let type_id = match field.field_type {
        FieldType::Concrete(type_id) => type_id,
        FieldType::Abstract => {
            let raw = decoder
                .read_i64()
                .map_err(|e| CodecError::from(e).in_field(field.name, None))?;
            mal_types::TypeId::from_raw(raw)
        }
    };
    let mut element = registry
        .create(type_id.to_raw())
        .map_err(|e| CodecError::from(e).in_field(field.name, Some(type_id)))?;
    decoder
        .read_element_into(element.as_mut())
        .map_err(|e| CodecError::from(e).in_field(field.name, Some(type_id)))?;
    Ok(element)
}

/// Resolve the effective stage schema of a message body
///
/// The operation's own schema wins when it defines the stage; the fixed
/// PUBSUB shapes cover messages whose operation metadata is silent. Ack
/// stages and SEND-style empty bodies resolve to the empty schema.
pub fn schema_for(
    kind: BodyKind,
    msg_stage: u8,
    operation: Option<&OperationSpec>,
) -> Arc<[FieldSpec]> {
    if kind == BodyKind::Error {
        return Arc::from([] as [FieldSpec; 0]);
    }
    if let Some(op) = operation {
        let schema = op.stage_schema(msg_stage);
        if !schema.is_empty() {
            return Arc::from(schema.to_vec());
        }
    }
    match kind {
        BodyKind::Register => Arc::from(vec![FieldSpec::concrete(
            "subscription",
            false,
            Subscription::TYPE_ID,
        )]),
        BodyKind::PublishRegister => Arc::from(vec![FieldSpec::concrete(
            "entity_keys",
            false,
            mal_types::EntityKey::TYPE_ID.list_form(),
        )]),
        BodyKind::Deregister => Arc::from(vec![FieldSpec::concrete(
            "subscription_ids",
            false,
            Attribute::IDENTIFIER_TYPE_ID.list_form(),
        )]),
        BodyKind::Publish => Arc::from(vec![
            FieldSpec::concrete(
                "update_headers",
                false,
                UpdateHeader::TYPE_ID.list_form(),
            ),
            FieldSpec::abstract_field("updates", true),
        ]),
        BodyKind::Notify => Arc::from(vec![
            FieldSpec::concrete("subscription_id", false, Attribute::IDENTIFIER_TYPE_ID),
            FieldSpec::concrete(
                "update_headers",
                false,
                UpdateHeader::TYPE_ID.list_form(),
            ),
            FieldSpec::abstract_field("updates", true),
        ]),
        _ => Arc::from([] as [FieldSpec; 0]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::BinaryStreamFactory;
    use mal_types::{register_core_types, EntityKey};

    fn test_ctx(wrap_parts: bool) -> DecodeContext {
        let registry = Arc::new(ElementRegistry::new());
        register_core_types(&registry);
        DecodeContext {
            factory: Arc::new(BinaryStreamFactory),
            registry,
            wrap_parts,
        }
    }

    fn two_field_schema() -> Arc<[FieldSpec]> {
        Arc::from(vec![
            FieldSpec::concrete("name", false, Attribute::IDENTIFIER_TYPE_ID),
            FieldSpec::concrete("count", true, Attribute::UINTEGER_TYPE_ID),
        ])
    }

    fn encode_standard(wrap_parts: bool) -> (Vec<u8>, Arc<[FieldSpec]>) {
        let schema = two_field_schema();
        let body = MessageBody::from_elements(
            BodyKind::Standard,
            schema.clone(),
            vec![
                Some(Box::new(Attribute::Identifier("node-a".into()))),
                Some(Box::new(Attribute::UInteger(9))),
            ],
        );
        let mut bytes = Vec::new();
        body.encode(&BinaryStreamFactory, wrap_parts, &mut bytes)
            .unwrap();
        (bytes, schema)
    }

    #[test]
    fn test_lazy_decode_runs_exactly_once() {
        let (bytes, schema) = encode_standard(false);
        let body = MessageBody::encoded(BodyKind::Standard, schema, bytes, test_ctx(false));

        assert!(!body.is_decoded());
        assert_eq!(body.decode_passes(), 0);

        assert_eq!(body.element_count().unwrap(), 2);
        assert!(body.is_decoded());
        assert_eq!(body.decode_passes(), 1);

        // Repeated access never re-decodes
        body.element(0).unwrap();
        body.element(1).unwrap();
        assert_eq!(body.element_count().unwrap(), 2);
        assert_eq!(body.decode_passes(), 1);
    }

    #[test]
    fn test_failed_decode_keeps_bytes_for_forwarding() {
        let (bytes, schema) = encode_standard(false);
        let truncated = bytes[..bytes.len() - 2].to_vec();
        let body =
            MessageBody::encoded(BodyKind::Standard, schema, truncated.clone(), test_ctx(false));

        assert!(body.element_count().is_err());
        assert!(!body.is_decoded());
        assert_eq!(body.decode_passes(), 0);

        // The encoded bytes survive, so relaying still forwards them verbatim
        let mut out = Vec::new();
        body.encode(&BinaryStreamFactory, false, &mut out).unwrap();
        assert_eq!(out, truncated);

        // A retried access decodes the original bytes, not an emptied buffer
        let first = body.element(0).unwrap_err().to_string();
        let second = body.element(0).unwrap_err().to_string();
        assert_eq!(first, second);
        assert!(first.contains("count"), "error should name the short field: {first}");
    }

    #[test]
    fn test_standard_roundtrip_with_and_without_wrapping() {
        for wrap in [false, true] {
            let (bytes, schema) = encode_standard(wrap);
            let body = MessageBody::encoded(BodyKind::Standard, schema, bytes, test_ctx(wrap));

            let name = body.element(0).unwrap().unwrap();
            assert!(name.eq_element(&Attribute::Identifier("node-a".into())));
            let count = body.element(1).unwrap().unwrap();
            assert!(count.eq_element(&Attribute::UInteger(9)));
        }
    }

    #[test]
    fn test_nullable_field_absent() {
        let schema = two_field_schema();
        let body = MessageBody::from_elements(
            BodyKind::Standard,
            schema.clone(),
            vec![Some(Box::new(Attribute::Identifier("n".into()))), None],
        );
        let mut bytes = Vec::new();
        body.encode(&BinaryStreamFactory, false, &mut bytes).unwrap();

        let decoded = MessageBody::encoded(BodyKind::Standard, schema, bytes, test_ctx(false));
        assert_eq!(decoded.element_count().unwrap(), 2);
        assert!(decoded.element(1).unwrap().is_none());
    }

    #[test]
    fn test_non_nullable_null_rejected_on_encode() {
        let body = MessageBody::from_elements(
            BodyKind::Standard,
            two_field_schema(),
            vec![None, None],
        );
        let mut bytes = Vec::new();
        let err = body
            .encode(&BinaryStreamFactory, false, &mut bytes)
            .unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_index_out_of_range() {
        let (bytes, schema) = encode_standard(false);
        let body = MessageBody::encoded(BodyKind::Standard, schema, bytes, test_ctx(false));
        assert!(matches!(
            body.element(5).unwrap_err(),
            CodecError::IndexOutOfRange { index: 5, count: 2 }
        ));
    }

    #[test]
    fn test_decode_failure_names_field_and_stops() {
        let (bytes, schema) = encode_standard(false);
        // Cut into the second field's value
        let truncated = &bytes[..bytes.len() - 2];
        let body = MessageBody::encoded(
            BodyKind::Standard,
            schema,
            truncated.to_vec(),
            test_ctx(false),
        );

        let err = body.element_count().unwrap_err();
        assert!(err.to_string().contains("count"));
        assert!(err.is_truncation());
    }

    #[test]
    fn test_error_body_bypasses_schema() {
        let body = MessageBody::error(
            mal_types::error_number::DESTINATION_UNKNOWN,
            Some(Box::new(Attribute::String("no such endpoint".into()))),
        );
        assert_eq!(body.element_count().unwrap(), 2);
        assert_eq!(
            body.error_number().unwrap(),
            mal_types::error_number::DESTINATION_UNKNOWN
        );

        let mut bytes = Vec::new();
        body.encode(&BinaryStreamFactory, false, &mut bytes).unwrap();

        let decoded = MessageBody::encoded(
            BodyKind::Error,
            Arc::from([] as [FieldSpec; 0]),
            bytes,
            test_ctx(false),
        );
        assert_eq!(
            decoded.error_number().unwrap(),
            mal_types::error_number::DESTINATION_UNKNOWN
        );
        let extra = decoded.extra_information().unwrap().unwrap();
        assert!(extra.eq_element(&Attribute::String("no such endpoint".into())));
    }

    #[test]
    fn test_raw_body_reemits_verbatim() {
        let original = vec![0xCA, 0xFE, 0xBA, 0xBE];
        let body = MessageBody::raw(original.clone());

        let mut out = Vec::new();
        body.encode(&BinaryStreamFactory, true, &mut out).unwrap();
        assert_eq!(out, original);

        // A raw blob has no element view
        assert!(body.element_count().is_err());
    }

    #[test]
    fn test_encoded_body_forwards_without_reparse() {
        let (bytes, schema) = encode_standard(false);
        let body = MessageBody::encoded(
            BodyKind::Standard,
            schema,
            bytes.clone(),
            test_ctx(false),
        );

        let mut out = Vec::new();
        body.encode(&BinaryStreamFactory, false, &mut out).unwrap();
        assert_eq!(out, bytes);
        // Forwarding never triggered a decode
        assert_eq!(body.decode_passes(), 0);
    }

    #[test]
    fn test_register_body_accessors() {
        let subscription = Subscription::new("sub-1", vec![EntityKey::default()]);
        let schema = schema_for(BodyKind::Register, stage::REGISTER, None);
        let body = MessageBody::from_elements(
            BodyKind::Register,
            schema.clone(),
            vec![Some(Box::new(subscription.clone()))],
        );

        let mut bytes = Vec::new();
        body.encode(&BinaryStreamFactory, false, &mut bytes).unwrap();
        let decoded = MessageBody::encoded(BodyKind::Register, schema, bytes, test_ctx(false));

        assert_eq!(decoded.subscription().unwrap(), subscription);
        assert!(decoded.update_header().is_err());
        assert!(decoded.error_number().is_err());
    }

    #[test]
    fn test_notify_update_accessors() {
        let schema = schema_for(BodyKind::Notify, stage::NOTIFY, None);
        let mut headers = ElementList::typed(
            UpdateHeader::TYPE_ID.list_form(),
            UpdateHeader::factory,
        );
        headers.push(Box::new(UpdateHeader::default()));

        let mut updates = ElementList::heterogeneous();
        updates.push(Box::new(Attribute::Long(5)));

        let body = MessageBody::from_elements(
            BodyKind::Notify,
            schema,
            vec![
                Some(Box::new(Attribute::Identifier("sub-1".into()))),
                Some(Box::new(headers.clone())),
                Some(Box::new(updates)),
            ],
        );

        let header = body.update_header().unwrap().unwrap();
        assert!(header.eq_element(&headers));
        assert_eq!(body.update_objects().unwrap().len(), 1);
    }

    #[test]
    fn test_element_into_upcast_copy() {
        let mut source = ElementList::heterogeneous();
        source.push(Box::new(Attribute::UShort(3)));

        let schema: Arc<[FieldSpec]> =
            Arc::from(vec![FieldSpec::abstract_field("values", false)]);
        let body = MessageBody::from_elements(
            BodyKind::Standard,
            schema,
            vec![Some(Box::new(source))],
        );

        let mut target = ElementList::typed(
            Attribute::USHORT_TYPE_ID.list_form(),
            Attribute::ushort_factory,
        );
        body.element_into(0, &mut target).unwrap();
        assert_eq!(target.len(), 1);

        // Stored value unchanged: copying again doubles the target only
        body.element_into(0, &mut target).unwrap();
        assert_eq!(target.len(), 2);
    }

    #[test]
    fn test_schema_for_prefers_operation_schema() {
        use mal_types::{OperationKey, OperationSpec};
        let op = OperationSpec::new(
            OperationKey {
                area: 1,
                service: 1,
                operation: 1,
                version: 1,
            },
            InteractionType::PubSub,
        )
        .with_stage(
            stage::PUBLISH,
            vec![
                FieldSpec::concrete(
                    "update_headers",
                    false,
                    UpdateHeader::TYPE_ID.list_form(),
                ),
                FieldSpec::concrete(
                    "positions",
                    false,
                    Attribute::DOUBLE_TYPE_ID.list_form(),
                ),
            ],
        );

        let schema = schema_for(BodyKind::Publish, stage::PUBLISH, Some(&op));
        assert_eq!(schema.len(), 2);
        assert_eq!(schema[1].name, "positions");

        // Fallback shape when the operation is silent
        let fallback = schema_for(BodyKind::Publish, stage::PUBLISH, None);
        assert_eq!(fallback[0].name, "update_headers");
    }
}
