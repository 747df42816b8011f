//! Standard MAL attribute types
//!
//! The eighteen attribute types of the MAL area are modelled as one enum
//! rather than eighteen wrapper structs; kind-specific behavior is pattern
//! matching over the discriminant. Each variant maps to a fixed TypeId in
//! area 1 (MAL), version 1, service 0.

use crate::element::{Element, ElementError};
use crate::stream::{ElementDecoder, ElementEncoder};
use crate::type_id::TypeId;
use std::any::Any;

/// Area number of the MAL area itself
pub const MAL_AREA: u16 = 1;
/// Version of the MAL area
pub const MAL_AREA_VERSION: u8 = 1;
/// Service number used by area-level (service-less) types
pub const MAL_NULL_SERVICE: u16 = 0;

const fn mal_type(part: i32) -> TypeId {
    TypeId::new(MAL_AREA, MAL_AREA_VERSION, MAL_NULL_SERVICE, part)
}

/// One value of any standard MAL attribute type
#[derive(Debug, Clone, PartialEq)]
pub enum Attribute {
    Blob(Vec<u8>),
    Boolean(bool),
    /// Signed duration in nanoseconds
    Duration(i64),
    Float(f32),
    Double(f64),
    Identifier(String),
    Octet(i8),
    UOctet(u8),
    Short(i16),
    UShort(u16),
    Integer(i32),
    UInteger(u32),
    Long(i64),
    ULong(u64),
    String(String),
    /// Nanoseconds since the MAL epoch
    Time(u64),
    /// Picoseconds since the MAL epoch
    FineTime(u64),
    Uri(String),
}

macro_rules! attribute_table {
    ($(($variant:ident, $const_id:ident, $factory:ident, $number:expr, $default:expr)),+ $(,)?) => {
        impl Attribute {
            $(
                pub const $const_id: TypeId = mal_type($number);

                /// Nullary factory for the default-valued variant
                pub fn $factory() -> Box<dyn Element> {
                    Box::new(Attribute::$variant($default))
                }
            )+

            /// All scalar attribute (TypeId, factory) pairs, in type-number order
            pub fn all_factories() -> &'static [(TypeId, fn() -> Box<dyn Element>)] {
                &[
                    $((Attribute::$const_id, Attribute::$factory as fn() -> Box<dyn Element>),)+
                ]
            }
        }
    };
}

attribute_table! {
    (Blob,       BLOB_TYPE_ID,       blob_factory,       1,  Vec::new()),
    (Boolean,    BOOLEAN_TYPE_ID,    boolean_factory,    2,  false),
    (Duration,   DURATION_TYPE_ID,   duration_factory,   3,  0),
    (Float,      FLOAT_TYPE_ID,      float_factory,      4,  0.0),
    (Double,     DOUBLE_TYPE_ID,     double_factory,     5,  0.0),
    (Identifier, IDENTIFIER_TYPE_ID, identifier_factory, 6,  String::new()),
    (Octet,      OCTET_TYPE_ID,      octet_factory,      7,  0),
    (UOctet,     UOCTET_TYPE_ID,     uoctet_factory,     8,  0),
    (Short,      SHORT_TYPE_ID,      short_factory,      9,  0),
    (UShort,     USHORT_TYPE_ID,     ushort_factory,     10, 0),
    (Integer,    INTEGER_TYPE_ID,    integer_factory,    11, 0),
    (UInteger,   UINTEGER_TYPE_ID,   uinteger_factory,   12, 0),
    (Long,       LONG_TYPE_ID,       long_factory,       13, 0),
    (ULong,      ULONG_TYPE_ID,      ulong_factory,      14, 0),
    (String,     STRING_TYPE_ID,     string_factory,     15, String::new()),
    (Time,       TIME_TYPE_ID,       time_factory,       16, 0),
    (FineTime,   FINE_TIME_TYPE_ID,  fine_time_factory,  17, 0),
    (Uri,        URI_TYPE_ID,        uri_factory,        18, String::new()),
}

impl Attribute {
    /// Convenience accessors used at the pattern-matching seams
    pub fn as_identifier(&self) -> Option<&str> {
        match self {
            Attribute::Identifier(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_uinteger(&self) -> Option<u32> {
        match self {
            Attribute::UInteger(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            Attribute::String(v) => Some(v),
            _ => None,
        }
    }
}

impl Element for Attribute {
    fn type_id(&self) -> TypeId {
        match self {
            Attribute::Blob(_) => Self::BLOB_TYPE_ID,
            Attribute::Boolean(_) => Self::BOOLEAN_TYPE_ID,
            Attribute::Duration(_) => Self::DURATION_TYPE_ID,
            Attribute::Float(_) => Self::FLOAT_TYPE_ID,
            Attribute::Double(_) => Self::DOUBLE_TYPE_ID,
            Attribute::Identifier(_) => Self::IDENTIFIER_TYPE_ID,
            Attribute::Octet(_) => Self::OCTET_TYPE_ID,
            Attribute::UOctet(_) => Self::UOCTET_TYPE_ID,
            Attribute::Short(_) => Self::SHORT_TYPE_ID,
            Attribute::UShort(_) => Self::USHORT_TYPE_ID,
            Attribute::Integer(_) => Self::INTEGER_TYPE_ID,
            Attribute::UInteger(_) => Self::UINTEGER_TYPE_ID,
            Attribute::Long(_) => Self::LONG_TYPE_ID,
            Attribute::ULong(_) => Self::ULONG_TYPE_ID,
            Attribute::String(_) => Self::STRING_TYPE_ID,
            Attribute::Time(_) => Self::TIME_TYPE_ID,
            Attribute::FineTime(_) => Self::FINE_TIME_TYPE_ID,
            Attribute::Uri(_) => Self::URI_TYPE_ID,
        }
    }

    fn encode(&self, encoder: &mut dyn ElementEncoder) -> Result<(), ElementError> {
        match self {
            Attribute::Blob(v) => encoder.write_blob(v),
            Attribute::Boolean(v) => encoder.write_bool(*v),
            Attribute::Duration(v) => encoder.write_duration(*v),
            Attribute::Float(v) => encoder.write_f32(*v),
            Attribute::Double(v) => encoder.write_f64(*v),
            Attribute::Identifier(v) => encoder.write_identifier(v),
            Attribute::Octet(v) => encoder.write_i8(*v),
            Attribute::UOctet(v) => encoder.write_u8(*v),
            Attribute::Short(v) => encoder.write_i16(*v),
            Attribute::UShort(v) => encoder.write_u16(*v),
            Attribute::Integer(v) => encoder.write_i32(*v),
            Attribute::UInteger(v) => encoder.write_u32(*v),
            Attribute::Long(v) => encoder.write_i64(*v),
            Attribute::ULong(v) => encoder.write_u64(*v),
            Attribute::String(v) => encoder.write_string(v),
            Attribute::Time(v) => encoder.write_time(*v),
            Attribute::FineTime(v) => encoder.write_fine_time(*v),
            Attribute::Uri(v) => encoder.write_uri(v),
        }
    }

    fn decode(&mut self, decoder: &mut dyn ElementDecoder) -> Result<(), ElementError> {
        match self {
            Attribute::Blob(v) => *v = decoder.read_blob()?,
            Attribute::Boolean(v) => *v = decoder.read_bool()?,
            Attribute::Duration(v) => *v = decoder.read_duration()?,
            Attribute::Float(v) => *v = decoder.read_f32()?,
            Attribute::Double(v) => *v = decoder.read_f64()?,
            Attribute::Identifier(v) => *v = decoder.read_identifier()?,
            Attribute::Octet(v) => *v = decoder.read_i8()?,
            Attribute::UOctet(v) => *v = decoder.read_u8()?,
            Attribute::Short(v) => *v = decoder.read_i16()?,
            Attribute::UShort(v) => *v = decoder.read_u16()?,
            Attribute::Integer(v) => *v = decoder.read_i32()?,
            Attribute::UInteger(v) => *v = decoder.read_u32()?,
            Attribute::Long(v) => *v = decoder.read_i64()?,
            Attribute::ULong(v) => *v = decoder.read_u64()?,
            Attribute::String(v) => *v = decoder.read_string()?,
            Attribute::Time(v) => *v = decoder.read_time()?,
            Attribute::FineTime(v) => *v = decoder.read_fine_time()?,
            Attribute::Uri(v) => *v = decoder.read_uri()?,
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
            .downcast_ref::<Attribute>()
            .map(|other| self == other)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_numbers_follow_mal_table() {
        assert_eq!(Attribute::BLOB_TYPE_ID.short_form_part(), 1);
        assert_eq!(Attribute::URI_TYPE_ID.short_form_part(), 18);
        assert_eq!(Attribute::BOOLEAN_TYPE_ID.area(), MAL_AREA);
        assert_eq!(Attribute::BOOLEAN_TYPE_ID.version(), MAL_AREA_VERSION);
        assert_eq!(Attribute::all_factories().len(), 18);
    }

    #[test]
    fn test_factories_produce_matching_type_ids() {
        for (type_id, factory) in Attribute::all_factories() {
            let element = factory();
            assert_eq!(Element::type_id(&*element), *type_id);
            assert!(!type_id.is_list());
        }
    }

    #[test]
    fn test_trait_object_equality() {
        let a = Attribute::Time(1_000);
        let b = Attribute::Time(1_000);
        let c = Attribute::FineTime(1_000);

        assert!(a.eq_element(&b));
        // Same payload, different variant: not equal
        assert!(!a.eq_element(&c));
    }
}
