//! Composite MAL-area elements consumed by the PUBSUB body specializations
//!
//! Only the composites the transport core itself needs are modelled here;
//! the full service-definition composite hierarchy is area/service material
//! and out of scope. Composites encode field-by-field in declaration order,
//! with nullable fields behind a presence flag.

use crate::attribute::{MAL_AREA, MAL_AREA_VERSION, MAL_NULL_SERVICE};
use crate::element::{Element, ElementError};
use crate::stream::{ElementDecoder, ElementEncoder};
use crate::type_id::TypeId;
use std::any::Any;

/// Kind of update carried by a PUBLISH/NOTIFY entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdateType {
    Creation = 1,
    #[default]
    Update = 2,
    Modification = 3,
    Deletion = 4,
}

impl UpdateType {
    pub fn from_ordinal(v: u8) -> Result<Self, ElementError> {
        match v {
            1 => Ok(UpdateType::Creation),
            2 => Ok(UpdateType::Update),
            3 => Ok(UpdateType::Modification),
            4 => Ok(UpdateType::Deletion),
            other => Err(ElementError::malformed(format!(
                "invalid UpdateType ordinal {other}"
            ))),
        }
    }
}

/// Key identifying an entity within a PUBSUB update
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntityKey {
    pub first_sub_key: Option<String>,
    pub second_sub_key: Option<i64>,
    pub third_sub_key: Option<i64>,
    pub fourth_sub_key: Option<i64>,
}

impl EntityKey {
    pub const TYPE_ID: TypeId = TypeId::new(MAL_AREA, MAL_AREA_VERSION, MAL_NULL_SERVICE, 25);

    pub fn factory() -> Box<dyn Element> {
        Box::new(EntityKey::default())
    }
}

impl Element for EntityKey {
    fn type_id(&self) -> TypeId {
        Self::TYPE_ID
    }

    fn encode(&self, encoder: &mut dyn ElementEncoder) -> Result<(), ElementError> {
        match &self.first_sub_key {
            Some(key) => {
                encoder.write_presence(true)?;
                encoder.write_identifier(key)?;
            }
            None => encoder.write_presence(false)?,
        }
        for sub_key in [self.second_sub_key, self.third_sub_key, self.fourth_sub_key] {
            match sub_key {
                Some(v) => {
                    encoder.write_presence(true)?;
                    encoder.write_i64(v)?;
                }
                None => encoder.write_presence(false)?,
            }
        }
        Ok(())
    }

    fn decode(&mut self, decoder: &mut dyn ElementDecoder) -> Result<(), ElementError> {
        self.first_sub_key = if decoder.read_presence()? {
            Some(decoder.read_identifier()?)
        } else {
            None
        };
        for slot in [
            &mut self.second_sub_key,
            &mut self.third_sub_key,
            &mut self.fourth_sub_key,
        ] {
            *slot = if decoder.read_presence()? {
                Some(decoder.read_i64()?)
            } else {
                None
            };
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
        other
            .as_any()
            .downcast_ref::<EntityKey>()
            .map(|other| self == other)
            .unwrap_or(false)
    }
}

/// Consumer subscription carried by a REGISTER body
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Subscription {
    pub subscription_id: String,
    pub entities: Vec<EntityKey>,
}

impl Subscription {
    pub const TYPE_ID: TypeId = TypeId::new(MAL_AREA, MAL_AREA_VERSION, MAL_NULL_SERVICE, 23);

    pub fn factory() -> Box<dyn Element> {
        Box::new(Subscription::default())
    }

    pub fn new(subscription_id: impl Into<String>, entities: Vec<EntityKey>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            entities,
        }
    }
}

impl Element for Subscription {
    fn type_id(&self) -> TypeId {
        Self::TYPE_ID
    }

    fn encode(&self, encoder: &mut dyn ElementEncoder) -> Result<(), ElementError> {
        encoder.write_identifier(&self.subscription_id)?;
        encoder.write_u32(self.entities.len() as u32)?;
        for entity in &self.entities {
            entity.encode(encoder)?;
        }
        Ok(())
    }

    fn decode(&mut self, decoder: &mut dyn ElementDecoder) -> Result<(), ElementError> {
        self.subscription_id = decoder.read_identifier()?;
        let count = decoder.read_u32()? as usize;
        self.entities.clear();
        for _ in 0..count {
            let mut entity = EntityKey::default();
            entity.decode(decoder)?;
            self.entities.push(entity);
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
        other
            .as_any()
            .downcast_ref::<Subscription>()
            .map(|other| self == other)
            .unwrap_or(false)
    }
}

/// Leading element of every PUBLISH/NOTIFY body
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateHeader {
    pub timestamp: u64,
    pub source_uri: String,
    pub update_type: UpdateType,
    pub key: EntityKey,
}

impl UpdateHeader {
    pub const TYPE_ID: TypeId = TypeId::new(MAL_AREA, MAL_AREA_VERSION, MAL_NULL_SERVICE, 26);

    pub fn factory() -> Box<dyn Element> {
        Box::new(UpdateHeader::default())
    }
}

impl Element for UpdateHeader {
    fn type_id(&self) -> TypeId {
        Self::TYPE_ID
    }

    fn encode(&self, encoder: &mut dyn ElementEncoder) -> Result<(), ElementError> {
        encoder.write_time(self.timestamp)?;
        encoder.write_uri(&self.source_uri)?;
        encoder.write_u8(self.update_type as u8)?;
        self.key.encode(encoder)
    }

    fn decode(&mut self, decoder: &mut dyn ElementDecoder) -> Result<(), ElementError> {
        self.timestamp = decoder.read_time()?;
        self.source_uri = decoder.read_uri()?;
        self.update_type = UpdateType::from_ordinal(decoder.read_u8()?)?;
        self.key.decode(decoder)
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
        other
            .as_any()
            .downcast_ref::<UpdateHeader>()
            .map(|other| self == other)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_type_ordinals() {
        assert_eq!(UpdateType::from_ordinal(1).unwrap(), UpdateType::Creation);
        assert_eq!(UpdateType::from_ordinal(4).unwrap(), UpdateType::Deletion);
        assert!(UpdateType::from_ordinal(0).is_err());
        assert!(UpdateType::from_ordinal(5).is_err());
    }

    #[test]
    fn test_composite_type_ids_are_scalar() {
        assert!(!Subscription::TYPE_ID.is_list());
        assert!(!EntityKey::TYPE_ID.is_list());
        assert!(!UpdateHeader::TYPE_ID.is_list());
        assert_eq!(Subscription::TYPE_ID.area(), MAL_AREA);
    }

    #[test]
    fn test_subscription_equality_over_trait_objects() {
        let a = Subscription::new("sub-1", vec![EntityKey::default()]);
        let b = Subscription::new("sub-1", vec![EntityKey::default()]);
        let c = Subscription::new("sub-2", vec![]);

        assert!(a.eq_element(&b));
        assert!(!a.eq_element(&c));
        assert!(!a.eq_element(&EntityKey::default()));
    }
}
