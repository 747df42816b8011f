//! Minimal per-operation metadata contract
//!
//! Body decoding needs to know, for a given (area, service, operation,
//! version) and interaction stage, which fields the body carries and what
//! their types are. That schema normally comes from generated service
//! helpers; this module defines the lookup contract the transport consumes
//! plus a map-backed implementation for programmatic registration.

use crate::interaction::InteractionType;
use crate::type_id::TypeId;
use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

/// Type constraint of one body field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// The field always carries this exact type
    Concrete(TypeId),
    /// The field carries any element; its TypeId travels on the wire ahead
    /// of the value
    Abstract,
}

/// One entry of a stage's ordered body schema
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub nullable: bool,
    pub field_type: FieldType,
}

impl FieldSpec {
    pub const fn concrete(name: &'static str, nullable: bool, type_id: TypeId) -> Self {
        Self {
            name,
            nullable,
            field_type: FieldType::Concrete(type_id),
        }
    }

    pub const fn abstract_field(name: &'static str, nullable: bool) -> Self {
        Self {
            name,
            nullable,
            field_type: FieldType::Abstract,
        }
    }
}

/// Numeric identity of an operation within the area/service/operation
/// namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationKey {
    pub area: u16,
    pub service: u16,
    pub operation: u16,
    pub version: u8,
}

/// Static description of one operation: its pattern and per-stage schemas
#[derive(Debug, Clone)]
pub struct OperationSpec {
    pub key: OperationKey,
    pub interaction: InteractionType,
    /// Stage number to ordered field schema
    stage_schemas: HashMap<u8, Vec<FieldSpec>>,
}

impl OperationSpec {
    pub fn new(key: OperationKey, interaction: InteractionType) -> Self {
        Self {
            key,
            interaction,
            stage_schemas: HashMap::new(),
        }
    }

    /// Attach the body schema of one stage (builder style)
    pub fn with_stage(mut self, stage: u8, fields: Vec<FieldSpec>) -> Self {
        debug_assert!(self.interaction.is_valid_stage(stage));
        self.stage_schemas.insert(stage, fields);
        self
    }

    /// The ordered field schema of `stage`, empty when the stage carries no
    /// body
    pub fn stage_schema(&self, stage: u8) -> &[FieldSpec] {
        self.stage_schemas
            .get(&stage)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Resolution of operation metadata at decode time
pub trait OperationLookup: Send + Sync + Debug {
    fn lookup(
        &self,
        area: u16,
        service: u16,
        operation: u16,
        version: u8,
    ) -> Option<Arc<OperationSpec>>;
}

/// Map-backed [`OperationLookup`] for programmatic registration
#[derive(Debug, Default)]
pub struct MapOperationLookup {
    operations: HashMap<OperationKey, Arc<OperationSpec>>,
}

impl MapOperationLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, spec: OperationSpec) {
        self.operations.insert(spec.key, Arc::new(spec));
    }

    pub fn with(mut self, spec: OperationSpec) -> Self {
        self.insert(spec);
        self
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

impl OperationLookup for MapOperationLookup {
    fn lookup(
        &self,
        area: u16,
        service: u16,
        operation: u16,
        version: u8,
    ) -> Option<Arc<OperationSpec>> {
        self.operations
            .get(&OperationKey {
                area,
                service,
                operation,
                version,
            })
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::Attribute;
    use crate::interaction::stage;

    fn sample_spec() -> OperationSpec {
        OperationSpec::new(
            OperationKey {
                area: 7,
                service: 2,
                operation: 100,
                version: 1,
            },
            InteractionType::Request,
        )
        .with_stage(
            stage::REQUEST,
            vec![FieldSpec::concrete(
                "query",
                false,
                Attribute::STRING_TYPE_ID,
            )],
        )
        .with_stage(
            stage::REQUEST_RESPONSE,
            vec![
                FieldSpec::concrete("result", false, Attribute::LONG_TYPE_ID),
                FieldSpec::abstract_field("detail", true),
            ],
        )
    }

    #[test]
    fn test_stage_schema_lookup() {
        let spec = sample_spec();
        assert_eq!(spec.stage_schema(stage::REQUEST).len(), 1);
        assert_eq!(spec.stage_schema(stage::REQUEST_RESPONSE).len(), 2);
        // Unknown stage: empty schema, not a panic
        assert!(spec.stage_schema(9).is_empty());
    }

    #[test]
    fn test_map_lookup() {
        let lookup = MapOperationLookup::new().with(sample_spec());

        let spec = lookup.lookup(7, 2, 100, 1).unwrap();
        assert_eq!(spec.interaction, InteractionType::Request);

        assert!(lookup.lookup(7, 2, 100, 2).is_none());
        assert!(lookup.lookup(8, 2, 100, 1).is_none());
    }
}
