//! Explicit TypeId-to-factory element registry
//!
//! The registry is a constructed object shared by `Arc`, not process-global
//! state: every component that resolves types holds a reference, and
//! initialization order is explicit (core MAL types first, then area types,
//! then service types, driven by the caller). Registration is idempotent per
//! key and entries live until the registry is dropped.

use crate::attribute::Attribute;
use crate::composite::{EntityKey, Subscription, UpdateHeader};
use crate::element::{Element, ElementFactory, ElementList};
use crate::type_id::TypeId;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

/// Errors from registry resolution
#[derive(Debug, Clone, thiserror::Error)]
pub enum RegistryError {
    #[error("No element registered for type {type_id} (area {area}, version {version}, service {service}, part {part})",
            area = type_id.area(),
            version = type_id.version(),
            service = type_id.service(),
            part = type_id.short_form_part())]
    NotFound { type_id: TypeId },
}

impl RegistryError {
    pub fn not_found(type_id: TypeId) -> Self {
        RegistryError::NotFound { type_id }
    }

    /// The identifier the failed lookup was keyed on
    pub fn type_id(&self) -> TypeId {
        match self {
            RegistryError::NotFound { type_id } => *type_id,
        }
    }
}

/// TypeId-keyed factory map for element decoding
#[derive(Debug, Default)]
pub struct ElementRegistry {
    factories: RwLock<HashMap<i64, ElementFactory>>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a factory for `type_id`
    ///
    /// Returns whether a prior mapping existed. Collisions are not fatal:
    /// last write wins, and the overwrite is logged.
    pub fn register(&self, type_id: TypeId, factory: ElementFactory) -> bool {
        let prior = self.factories.write().insert(type_id.to_raw(), factory);
        if prior.is_some() {
            debug!(%type_id, "element factory re-registered, last write wins");
        }
        prior.is_some()
    }

    /// Number of registered factories
    pub fn len(&self) -> usize {
        self.factories.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.read().is_empty()
    }

    /// Whether a factory exists for `type_id`
    pub fn contains(&self, type_id: TypeId) -> bool {
        self.factories.read().contains_key(&type_id.to_raw())
    }

    /// Create a fresh element for a raw packed identifier
    ///
    /// Raw 0 yields an empty heterogeneous container rather than failing;
    /// any other unregistered identifier is a hard error carrying the
    /// decomposed TypeId for diagnostics.
    pub fn create(&self, raw: i64) -> Result<Box<dyn Element>, RegistryError> {
        if raw == 0 {
            return Ok(Box::new(ElementList::heterogeneous()));
        }
        let factory = self
            .factories
            .read()
            .get(&raw)
            .copied()
            .ok_or_else(|| RegistryError::not_found(TypeId::from_raw(raw)))?;
        Ok(factory())
    }

    /// Create the list container for a scalar element's type
    ///
    /// Flips the sign convention on the short-form part and re-resolves.
    /// NotFound here usually means a service helper was never initialized.
    pub fn list_type_of(&self, element: &dyn Element) -> Result<Box<dyn Element>, RegistryError> {
        let list_id = element.type_id().list_form();
        self.create(list_id.to_raw())
    }
}

/// Register the MAL core types: all attribute scalars, their list forms, and
/// the PUBSUB composites
///
/// Idempotent; call once before any area/service helper registration.
pub fn register_core_types(registry: &ElementRegistry) {
    for (type_id, factory) in Attribute::all_factories() {
        registry.register(*type_id, *factory);
    }
    // List forms, one per scalar
    registry.register(Attribute::BLOB_TYPE_ID.list_form(), || {
        Box::new(ElementList::typed(
            Attribute::BLOB_TYPE_ID.list_form(),
            Attribute::blob_factory,
        ))
    });
    registry.register(Attribute::BOOLEAN_TYPE_ID.list_form(), || {
        Box::new(ElementList::typed(
            Attribute::BOOLEAN_TYPE_ID.list_form(),
            Attribute::boolean_factory,
        ))
    });
    registry.register(Attribute::DURATION_TYPE_ID.list_form(), || {
        Box::new(ElementList::typed(
            Attribute::DURATION_TYPE_ID.list_form(),
            Attribute::duration_factory,
        ))
    });
    registry.register(Attribute::FLOAT_TYPE_ID.list_form(), || {
        Box::new(ElementList::typed(
            Attribute::FLOAT_TYPE_ID.list_form(),
            Attribute::float_factory,
        ))
    });
    registry.register(Attribute::DOUBLE_TYPE_ID.list_form(), || {
        Box::new(ElementList::typed(
            Attribute::DOUBLE_TYPE_ID.list_form(),
            Attribute::double_factory,
        ))
    });
    registry.register(Attribute::IDENTIFIER_TYPE_ID.list_form(), || {
        Box::new(ElementList::typed(
            Attribute::IDENTIFIER_TYPE_ID.list_form(),
            Attribute::identifier_factory,
        ))
    });
    registry.register(Attribute::OCTET_TYPE_ID.list_form(), || {
        Box::new(ElementList::typed(
            Attribute::OCTET_TYPE_ID.list_form(),
            Attribute::octet_factory,
        ))
    });
    registry.register(Attribute::UOCTET_TYPE_ID.list_form(), || {
        Box::new(ElementList::typed(
            Attribute::UOCTET_TYPE_ID.list_form(),
            Attribute::uoctet_factory,
        ))
    });
    registry.register(Attribute::SHORT_TYPE_ID.list_form(), || {
        Box::new(ElementList::typed(
            Attribute::SHORT_TYPE_ID.list_form(),
            Attribute::short_factory,
        ))
    });
    registry.register(Attribute::USHORT_TYPE_ID.list_form(), || {
        Box::new(ElementList::typed(
            Attribute::USHORT_TYPE_ID.list_form(),
            Attribute::ushort_factory,
        ))
    });
    registry.register(Attribute::INTEGER_TYPE_ID.list_form(), || {
        Box::new(ElementList::typed(
            Attribute::INTEGER_TYPE_ID.list_form(),
            Attribute::integer_factory,
        ))
    });
    registry.register(Attribute::UINTEGER_TYPE_ID.list_form(), || {
        Box::new(ElementList::typed(
            Attribute::UINTEGER_TYPE_ID.list_form(),
            Attribute::uinteger_factory,
        ))
    });
    registry.register(Attribute::LONG_TYPE_ID.list_form(), || {
        Box::new(ElementList::typed(
            Attribute::LONG_TYPE_ID.list_form(),
            Attribute::long_factory,
        ))
    });
    registry.register(Attribute::ULONG_TYPE_ID.list_form(), || {
        Box::new(ElementList::typed(
            Attribute::ULONG_TYPE_ID.list_form(),
            Attribute::ulong_factory,
        ))
    });
    registry.register(Attribute::STRING_TYPE_ID.list_form(), || {
        Box::new(ElementList::typed(
            Attribute::STRING_TYPE_ID.list_form(),
            Attribute::string_factory,
        ))
    });
    registry.register(Attribute::TIME_TYPE_ID.list_form(), || {
        Box::new(ElementList::typed(
            Attribute::TIME_TYPE_ID.list_form(),
            Attribute::time_factory,
        ))
    });
    registry.register(Attribute::FINE_TIME_TYPE_ID.list_form(), || {
        Box::new(ElementList::typed(
            Attribute::FINE_TIME_TYPE_ID.list_form(),
            Attribute::fine_time_factory,
        ))
    });
    registry.register(Attribute::URI_TYPE_ID.list_form(), || {
        Box::new(ElementList::typed(
            Attribute::URI_TYPE_ID.list_form(),
            Attribute::uri_factory,
        ))
    });

    registry.register(Subscription::TYPE_ID, Subscription::factory);
    registry.register(Subscription::TYPE_ID.list_form(), || {
        Box::new(ElementList::typed(
            Subscription::TYPE_ID.list_form(),
            Subscription::factory,
        ))
    });
    registry.register(EntityKey::TYPE_ID, EntityKey::factory);
    registry.register(EntityKey::TYPE_ID.list_form(), || {
        Box::new(ElementList::typed(
            EntityKey::TYPE_ID.list_form(),
            EntityKey::factory,
        ))
    });
    registry.register(UpdateHeader::TYPE_ID, UpdateHeader::factory);
    registry.register(UpdateHeader::TYPE_ID.list_form(), || {
        Box::new(ElementList::typed(
            UpdateHeader::TYPE_ID.list_form(),
            UpdateHeader::factory,
        ))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_reports_prior_mapping() {
        let registry = ElementRegistry::new();
        assert!(!registry.register(Attribute::BOOLEAN_TYPE_ID, Attribute::boolean_factory));
        // Second registration of the same key: prior mapping existed
        assert!(registry.register(Attribute::BOOLEAN_TYPE_ID, Attribute::boolean_factory));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_create_unknown_is_hard_error() {
        let registry = ElementRegistry::new();
        let missing = TypeId::new(99, 1, 0, 5);

        let err = registry.create(missing.to_raw()).unwrap_err();
        assert_eq!(err.type_id(), missing);
        let msg = err.to_string();
        assert!(msg.contains("area 99"));
        assert!(msg.contains("part 5"));
    }

    #[test]
    fn test_create_zero_yields_heterogeneous_container() {
        let registry = ElementRegistry::new();
        let element = registry.create(0).unwrap();
        let list = element.as_any().downcast_ref::<ElementList>().unwrap();
        assert!(list.is_heterogeneous());
        assert!(list.is_empty());
    }

    #[test]
    fn test_core_types_registration_and_list_derivation() {
        let registry = ElementRegistry::new();
        register_core_types(&registry);

        // 18 scalars + 18 lists + 3 composites + 3 composite lists
        assert_eq!(registry.len(), 42);

        let scalar = Attribute::Identifier("node-a".into());
        let list = registry.list_type_of(&scalar).unwrap();
        assert_eq!(
            list.type_id(),
            Attribute::IDENTIFIER_TYPE_ID.list_form()
        );
    }

    #[test]
    fn test_list_type_of_unregistered_scalar() {
        let registry = ElementRegistry::new();
        // Scalar registered but its list form deliberately not
        registry.register(Attribute::TIME_TYPE_ID, Attribute::time_factory);

        let err = registry.list_type_of(&Attribute::Time(0)).unwrap_err();
        assert_eq!(err.type_id(), Attribute::TIME_TYPE_ID.list_form());
    }
}
