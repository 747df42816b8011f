//! Object-safe data element contract and the generic list container
//!
//! Every value that can travel in a message body implements [`Element`].
//! The trait is object-safe on purpose: bodies, registries and decoders all
//! work in terms of `Box<dyn Element>` so that new areas can contribute
//! types without the core knowing about them.

use crate::stream::{ElementDecoder, ElementEncoder};
use crate::type_id::TypeId;
use std::any::Any;
use std::fmt::Debug;

/// Errors raised while encoding or decoding individual elements
#[derive(Debug, Clone, thiserror::Error)]
pub enum ElementError {
    #[error("Stream truncated: needed {needed} more bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("Malformed stream: {0}")]
    Malformed(String),

    #[error("Unknown type {type_id} (area {area}, version {version}, service {service}, part {part})",
            area = type_id.area(),
            version = type_id.version(),
            service = type_id.service(),
            part = type_id.short_form_part())]
    UnknownType { type_id: TypeId },

    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

impl ElementError {
    pub fn truncated(needed: usize, available: usize) -> Self {
        ElementError::Truncated { needed, available }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        ElementError::Malformed(msg.into())
    }

    pub fn unknown_type(type_id: TypeId) -> Self {
        ElementError::UnknownType { type_id }
    }
}

/// Nullary factory producing a fresh, default-valued element instance
///
/// Plain function pointers keep the registry map cheap to clone and free of
/// lifetime entanglements; non-capturing closures coerce to this type.
pub type ElementFactory = fn() -> Box<dyn Element>;

/// A typed MAL data element
///
/// Decoding is two-phase: a factory (from the registry or a field schema)
/// produces a default instance, then `decode` fills it from the stream.
pub trait Element: Debug + Send + Sync {
    /// The packed type identifier of this element
    fn type_id(&self) -> TypeId;

    /// Write this element's value to the stream
    fn encode(&self, encoder: &mut dyn ElementEncoder) -> Result<(), ElementError>;

    /// Fill this element's value from the stream
    fn decode(&mut self, decoder: &mut dyn ElementDecoder) -> Result<(), ElementError>;

    /// Clone behind the trait object
    fn boxed_clone(&self) -> Box<dyn Element>;

    /// Downcast support
    fn as_any(&self) -> &dyn Any;

    /// Mutable downcast support
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Equality over trait objects (same concrete type and value)
    fn eq_element(&self, other: &dyn Element) -> bool;
}

impl Clone for Box<dyn Element> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}

impl PartialEq for Box<dyn Element> {
    fn eq(&self, other: &Self) -> bool {
        self.eq_element(other.as_ref())
    }
}

/// Ordered element container, typed or heterogeneous
///
/// A typed list carries the list-form TypeId of its scalar element type and
/// a factory for fresh scalars, so it can decode itself. The heterogeneous
/// container (TypeId raw 0) holds arbitrary elements and can only be decoded
/// by a registry-aware caller, since each entry's type travels on the wire.
/// Entries are individually nullable.
#[derive(Debug, Clone)]
pub struct ElementList {
    type_id: TypeId,
    scalar_factory: Option<ElementFactory>,
    items: Vec<Option<Box<dyn Element>>>,
}

impl ElementList {
    /// Create an empty typed list
    pub fn typed(list_type_id: TypeId, scalar_factory: ElementFactory) -> Self {
        Self {
            type_id: list_type_id,
            scalar_factory: Some(scalar_factory),
            items: Vec::new(),
        }
    }

    /// Create an empty untyped heterogeneous container
    pub fn heterogeneous() -> Self {
        Self {
            type_id: TypeId::NULL,
            scalar_factory: None,
            items: Vec::new(),
        }
    }

    /// Whether this is the untyped heterogeneous container
    pub fn is_heterogeneous(&self) -> bool {
        self.type_id.is_null()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn push(&mut self, element: Box<dyn Element>) {
        self.items.push(Some(element));
    }

    pub fn push_null(&mut self) {
        self.items.push(None);
    }

    pub fn get(&self, index: usize) -> Option<&dyn Element> {
        self.items.get(index).and_then(|e| e.as_deref())
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<&dyn Element>> {
        self.items.iter().map(|e| e.as_deref())
    }

    pub fn items(&self) -> &[Option<Box<dyn Element>>] {
        &self.items
    }

    /// Copy every entry of `source` into this list (up-cast copy)
    ///
    /// Used when a caller supplies a concrete target container for elements
    /// currently held in a heterogeneous list; the stored list is left
    /// untouched.
    pub fn extend_from(&mut self, source: &ElementList) {
        for item in &source.items {
            self.items.push(item.clone());
        }
    }
}

impl Element for ElementList {
    fn type_id(&self) -> TypeId {
        self.type_id
    }

    fn encode(&self, encoder: &mut dyn ElementEncoder) -> Result<(), ElementError> {
        encoder.write_u32(self.items.len() as u32)?;
        for item in &self.items {
            match item.as_deref() {
                Some(element) => {
                    encoder.write_presence(true)?;
                    if self.is_heterogeneous() {
                        // Entry type travels with the entry
                        encoder.write_i64(element.type_id().to_raw())?;
                    }
                    element.encode(encoder)?;
                }
                None => encoder.write_presence(false)?,
            }
        }
        Ok(())
    }

    fn decode(&mut self, decoder: &mut dyn ElementDecoder) -> Result<(), ElementError> {
        let factory = self.scalar_factory.ok_or_else(|| {
            ElementError::Unsupported(
                "heterogeneous list decoding requires a registry-aware decoder".to_string(),
            )
        })?;

        let count = decoder.read_u32()? as usize;
        self.items.clear();
        for _ in 0..count {
            if decoder.read_presence()? {
                let mut element = factory();
                element.decode(decoder)?;
                self.items.push(Some(element));
            } else {
                self.items.push(None);
            }
        }
        Ok(())
    }

    fn boxed_clone(&self) -> Box<dyn Element> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn eq_element(&self, other: &dyn Element) -> bool {
        match other.as_any().downcast_ref::<ElementList>() {
            Some(other) => {
                self.type_id == other.type_id
                    && self.items.len() == other.items.len()
                    && self
                        .items
                        .iter()
                        .zip(other.items.iter())
                        .all(|(a, b)| match (a, b) {
                            (Some(a), Some(b)) => a.eq_element(b.as_ref()),
                            (None, None) => true,
                            _ => false,
                        })
            }
            None => false,
        }
    }
}
