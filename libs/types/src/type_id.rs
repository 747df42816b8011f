//! Bijective 64-bit type identifiers
//!
//! Every MAL data element is identified by a packed 64-bit value combining
//! the area number, area version, service number and a signed 24-bit
//! short-form part. The packing is bijective: `TypeId::from_raw(id.to_raw())`
//! always reproduces the original identifier, which lets headers and bodies
//! carry the raw value on the wire and reconstruct the full identity on
//! decode without any registry round-trip.
//!
//! The sign of the short-form part distinguishes scalar from list types: a
//! positive part is a scalar, the negated part is the list of that scalar,
//! and zero is reserved for the untyped heterogeneous container.

use std::fmt;

/// Bit layout of the packed identifier:
/// area (16) | area version (8) | service (16) | short-form part (24, signed)
const AREA_SHIFT: u32 = 48;
const VERSION_SHIFT: u32 = 40;
const SERVICE_SHIFT: u32 = 24;
const PART_MASK: i64 = 0x00FF_FFFF;
const PART_SIGN_BIT: i64 = 0x0080_0000;

/// Packed 64-bit type identifier for a MAL data element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId {
    area: u16,
    version: u8,
    service: u16,
    short_form_part: i32,
}

impl TypeId {
    /// The reserved identifier of the untyped heterogeneous element list
    pub const NULL: TypeId = TypeId {
        area: 0,
        version: 0,
        service: 0,
        short_form_part: 0,
    };

    /// Create an identifier from its four numeric fields
    ///
    /// The short-form part is truncated to the signed 24-bit range used on
    /// the wire.
    pub const fn new(area: u16, version: u8, service: u16, short_form_part: i32) -> Self {
        Self {
            area,
            version,
            service,
            short_form_part,
        }
    }

    /// Reconstruct an identifier from its raw packed form
    pub fn from_raw(raw: i64) -> Self {
        let mut part = raw & PART_MASK;
        // Sign-extend the 24-bit field
        if part & PART_SIGN_BIT != 0 {
            part |= !PART_MASK;
        }

        Self {
            area: ((raw >> AREA_SHIFT) & 0xFFFF) as u16,
            version: ((raw >> VERSION_SHIFT) & 0xFF) as u8,
            service: ((raw >> SERVICE_SHIFT) & 0xFFFF) as u16,
            short_form_part: part as i32,
        }
    }

    /// Pack the identifier into its raw 64-bit wire form
    pub fn to_raw(self) -> i64 {
        ((self.area as i64) << AREA_SHIFT)
            | ((self.version as i64) << VERSION_SHIFT)
            | ((self.service as i64) << SERVICE_SHIFT)
            | (self.short_form_part as i64 & PART_MASK)
    }

    /// Area number (top-level namespace)
    pub fn area(self) -> u16 {
        self.area
    }

    /// Area version
    pub fn version(self) -> u8 {
        self.version
    }

    /// Service number within the area
    pub fn service(self) -> u16 {
        self.service
    }

    /// Signed short-form part; negative values denote list types
    pub fn short_form_part(self) -> i32 {
        self.short_form_part
    }

    /// Whether this identifier denotes a list-of-element type
    ///
    /// Zero is the untyped heterogeneous container, which is itself a list.
    pub fn is_list(self) -> bool {
        self.short_form_part <= 0
    }

    /// Whether this is the reserved untyped-container identifier
    pub fn is_null(self) -> bool {
        self == Self::NULL
    }

    /// The list type corresponding to this scalar type
    ///
    /// Flips the sign convention on the short-form part. Calling this on an
    /// identifier that is already a list returns it unchanged.
    pub fn list_form(self) -> Self {
        if self.is_list() {
            self
        } else {
            Self {
                short_form_part: -self.short_form_part,
                ..self
            }
        }
    }

    /// The scalar type corresponding to this list type
    pub fn scalar_form(self) -> Self {
        if self.short_form_part < 0 {
            Self {
                short_form_part: -self.short_form_part,
                ..self
            }
        } else {
            self
        }
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.area, self.version, self.service, self.short_form_part
        )
    }
}

impl From<TypeId> for i64 {
    fn from(id: TypeId) -> i64 {
        id.to_raw()
    }
}

impl From<i64> for TypeId {
    fn from(raw: i64) -> TypeId {
        TypeId::from_raw(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_packing_roundtrip() {
        let id = TypeId::new(1, 1, 0, 18);
        let unpacked = TypeId::from_raw(id.to_raw());
        assert_eq!(id, unpacked);
    }

    #[test]
    fn test_list_sign_convention() {
        let scalar = TypeId::new(4, 2, 1, 7);
        assert!(!scalar.is_list());

        let list = scalar.list_form();
        assert!(list.is_list());
        assert_eq!(list.short_form_part(), -7);
        assert_eq!(list.scalar_form(), scalar);

        // Already a list: unchanged
        assert_eq!(list.list_form(), list);
    }

    #[test]
    fn test_negative_part_survives_packing() {
        let list = TypeId::new(1, 1, 0, -18);
        let raw = list.to_raw();
        let unpacked = TypeId::from_raw(raw);
        assert_eq!(unpacked.short_form_part(), -18);
        assert!(unpacked.is_list());
    }

    #[test]
    fn test_null_identifier() {
        assert_eq!(TypeId::NULL.to_raw(), 0);
        assert!(TypeId::NULL.is_list());
        assert!(TypeId::from_raw(0).is_null());
    }

    #[test]
    fn test_display() {
        let id = TypeId::new(1, 2, 3, -4);
        assert_eq!(id.to_string(), "1:2:3:-4");
    }

    proptest! {
        #[test]
        fn prop_raw_roundtrip(
            area in any::<u16>(),
            version in any::<u8>(),
            service in any::<u16>(),
            part in -0x80_0000i32..0x80_0000i32,
        ) {
            let id = TypeId::new(area, version, service, part);
            prop_assert_eq!(TypeId::from_raw(id.to_raw()), id);
        }

        #[test]
        fn prop_list_scalar_inverse(part in 1i32..0x80_0000i32) {
            let scalar = TypeId::new(9, 1, 2, part);
            prop_assert_eq!(scalar.list_form().scalar_form(), scalar);
        }
    }
}
