//! Reference fixed-width binary stream format
//!
//! Big-endian fixed-width integers, IEEE floats, length-prefixed strings
//! and blobs, one presence byte per nullable field. This is the default
//! byte-stream mapping used when no protocol-specific format is plugged in,
//! and the format the codec test-suite round-trips against. Every read is
//! bounds-checked; truncated input yields an error, never a panic.

use byteorder::{BigEndian, ByteOrder};
use mal_types::stream::{ElementDecoder, ElementEncoder, StreamFactory};
use mal_types::{Element, ElementError};

/// [`StreamFactory`] for the reference binary format
#[derive(Debug, Default, Clone, Copy)]
pub struct BinaryStreamFactory;

impl StreamFactory for BinaryStreamFactory {
    fn encoder<'a>(&self, sink: &'a mut Vec<u8>) -> Box<dyn ElementEncoder + 'a> {
        Box::new(BinaryEncoder { sink })
    }

    fn decoder<'a>(&self, bytes: &'a [u8]) -> Box<dyn ElementDecoder + 'a> {
        Box::new(BinaryDecoder { bytes, pos: 0 })
    }
}

/// Encoder half of the reference binary format
pub struct BinaryEncoder<'a> {
    sink: &'a mut Vec<u8>,
}

impl BinaryEncoder<'_> {
    fn write_len_prefixed(&mut self, bytes: &[u8]) -> Result<(), ElementError> {
        let mut len = [0u8; 4];
        BigEndian::write_u32(&mut len, bytes.len() as u32);
        self.sink.extend_from_slice(&len);
        self.sink.extend_from_slice(bytes);
        Ok(())
    }
}

impl ElementEncoder for BinaryEncoder<'_> {
    fn write_bool(&mut self, v: bool) -> Result<(), ElementError> {
        self.sink.push(v as u8);
        Ok(())
    }

    fn write_i8(&mut self, v: i8) -> Result<(), ElementError> {
        self.sink.push(v as u8);
        Ok(())
    }

    fn write_u8(&mut self, v: u8) -> Result<(), ElementError> {
        self.sink.push(v);
        Ok(())
    }

    fn write_i16(&mut self, v: i16) -> Result<(), ElementError> {
        let mut buf = [0u8; 2];
        BigEndian::write_i16(&mut buf, v);
        self.sink.extend_from_slice(&buf);
        Ok(())
    }

    fn write_u16(&mut self, v: u16) -> Result<(), ElementError> {
        let mut buf = [0u8; 2];
        BigEndian::write_u16(&mut buf, v);
        self.sink.extend_from_slice(&buf);
        Ok(())
    }

    fn write_i32(&mut self, v: i32) -> Result<(), ElementError> {
        let mut buf = [0u8; 4];
        BigEndian::write_i32(&mut buf, v);
        self.sink.extend_from_slice(&buf);
        Ok(())
    }

    fn write_u32(&mut self, v: u32) -> Result<(), ElementError> {
        let mut buf = [0u8; 4];
        BigEndian::write_u32(&mut buf, v);
        self.sink.extend_from_slice(&buf);
        Ok(())
    }

    fn write_i64(&mut self, v: i64) -> Result<(), ElementError> {
        let mut buf = [0u8; 8];
        BigEndian::write_i64(&mut buf, v);
        self.sink.extend_from_slice(&buf);
        Ok(())
    }

    fn write_u64(&mut self, v: u64) -> Result<(), ElementError> {
        let mut buf = [0u8; 8];
        BigEndian::write_u64(&mut buf, v);
        self.sink.extend_from_slice(&buf);
        Ok(())
    }

    fn write_f32(&mut self, v: f32) -> Result<(), ElementError> {
        self.write_u32(v.to_bits())
    }

    fn write_f64(&mut self, v: f64) -> Result<(), ElementError> {
        self.write_u64(v.to_bits())
    }

    fn write_string(&mut self, v: &str) -> Result<(), ElementError> {
        self.write_len_prefixed(v.as_bytes())
    }

    fn write_identifier(&mut self, v: &str) -> Result<(), ElementError> {
        self.write_len_prefixed(v.as_bytes())
    }

    fn write_uri(&mut self, v: &str) -> Result<(), ElementError> {
        self.write_len_prefixed(v.as_bytes())
    }

    fn write_blob(&mut self, v: &[u8]) -> Result<(), ElementError> {
        self.write_len_prefixed(v)
    }

    fn write_time(&mut self, v: u64) -> Result<(), ElementError> {
        self.write_u64(v)
    }

    fn write_fine_time(&mut self, v: u64) -> Result<(), ElementError> {
        self.write_u64(v)
    }

    fn write_duration(&mut self, v: i64) -> Result<(), ElementError> {
        self.write_i64(v)
    }

    fn write_presence(&mut self, present: bool) -> Result<(), ElementError> {
        self.sink.push(present as u8);
        Ok(())
    }

    fn write_element(&mut self, element: &dyn Element) -> Result<(), ElementError> {
        element.encode(self)
    }
}

/// Decoder half of the reference binary format
pub struct BinaryDecoder<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> BinaryDecoder<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], ElementError> {
        let available = self.bytes.len() - self.pos;
        if available < n {
            return Err(ElementError::truncated(n - available, available));
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_len_prefixed(&mut self) -> Result<&'a [u8], ElementError> {
        let len = BigEndian::read_u32(self.take(4)?) as usize;
        self.take(len)
    }

    fn read_utf8(&mut self) -> Result<String, ElementError> {
        let bytes = self.read_len_prefixed()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| ElementError::malformed(format!("invalid UTF-8 string: {e}")))
    }
}

impl ElementDecoder for BinaryDecoder<'_> {
    fn read_bool(&mut self) -> Result<bool, ElementError> {
        match self.take(1)?[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(ElementError::malformed(format!(
                "invalid boolean byte {other:#04x}"
            ))),
        }
    }

    fn read_i8(&mut self) -> Result<i8, ElementError> {
        Ok(self.take(1)?[0] as i8)
    }

    fn read_u8(&mut self) -> Result<u8, ElementError> {
        Ok(self.take(1)?[0])
    }

    fn read_i16(&mut self) -> Result<i16, ElementError> {
        Ok(BigEndian::read_i16(self.take(2)?))
    }

    fn read_u16(&mut self) -> Result<u16, ElementError> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }

    fn read_i32(&mut self) -> Result<i32, ElementError> {
        Ok(BigEndian::read_i32(self.take(4)?))
    }

    fn read_u32(&mut self) -> Result<u32, ElementError> {
        Ok(BigEndian::read_u32(self.take(4)?))
    }

    fn read_i64(&mut self) -> Result<i64, ElementError> {
        Ok(BigEndian::read_i64(self.take(8)?))
    }

    fn read_u64(&mut self) -> Result<u64, ElementError> {
        Ok(BigEndian::read_u64(self.take(8)?))
    }

    fn read_f32(&mut self) -> Result<f32, ElementError> {
        Ok(f32::from_bits(self.read_u32()?))
    }

    fn read_f64(&mut self) -> Result<f64, ElementError> {
        Ok(f64::from_bits(self.read_u64()?))
    }

    fn read_string(&mut self) -> Result<String, ElementError> {
        self.read_utf8()
    }

    fn read_identifier(&mut self) -> Result<String, ElementError> {
        self.read_utf8()
    }

    fn read_uri(&mut self) -> Result<String, ElementError> {
        self.read_utf8()
    }

    fn read_blob(&mut self) -> Result<Vec<u8>, ElementError> {
        Ok(self.read_len_prefixed()?.to_vec())
    }

    fn read_time(&mut self) -> Result<u64, ElementError> {
        self.read_u64()
    }

    fn read_fine_time(&mut self) -> Result<u64, ElementError> {
        self.read_u64()
    }

    fn read_duration(&mut self) -> Result<i64, ElementError> {
        self.read_i64()
    }

    fn read_presence(&mut self) -> Result<bool, ElementError> {
        self.read_bool()
    }

    fn read_element_into(&mut self, element: &mut dyn Element) -> Result<(), ElementError> {
        element.decode(self)
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take_remaining(&mut self) -> Vec<u8> {
        let tail = self.bytes[self.pos..].to_vec();
        self.pos = self.bytes.len();
        tail
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mal_types::{Attribute, Element, ElementList};
    use proptest::prelude::*;

    fn roundtrip(attribute: Attribute) -> Attribute {
        let factory = BinaryStreamFactory;
        let mut bytes = Vec::new();
        {
            let mut encoder = factory.encoder(&mut bytes);
            attribute.encode(encoder.as_mut()).unwrap();
        }
        let mut decoder = factory.decoder(&bytes);
        // Fresh default of the same variant, filled from the stream
        let mut decoded = attribute.clone();
        match &mut decoded {
            Attribute::Blob(v) => v.clear(),
            Attribute::String(v) | Attribute::Identifier(v) | Attribute::Uri(v) => v.clear(),
            _ => {}
        }
        decoded.decode(decoder.as_mut()).unwrap();
        assert_eq!(decoder.remaining(), 0);
        decoded
    }

    #[test]
    fn test_truncated_read_is_an_error() {
        let factory = BinaryStreamFactory;
        let mut decoder = factory.decoder(&[0x01, 0x02]);
        let err = decoder.read_u64().unwrap_err();
        match err {
            ElementError::Truncated { needed, available } => {
                assert_eq!(needed, 6);
                assert_eq!(available, 2);
            }
            other => panic!("expected Truncated, got {other:?}"),
        }
    }

    #[test]
    fn test_bogus_length_prefix_is_truncation_not_panic() {
        let factory = BinaryStreamFactory;
        // Claims a 4 GiB string with 3 bytes of payload
        let mut bytes = vec![0xFF, 0xFF, 0xFF, 0xFF];
        bytes.extend_from_slice(b"abc");
        let mut decoder = factory.decoder(&bytes);
        assert!(decoder.read_string().is_err());
    }

    #[test]
    fn test_invalid_boolean_byte() {
        let factory = BinaryStreamFactory;
        let mut decoder = factory.decoder(&[0x02]);
        assert!(matches!(
            decoder.read_bool().unwrap_err(),
            ElementError::Malformed(_)
        ));
    }

    #[test]
    fn test_heterogeneous_list_tags_entries_with_mal_type_id() {
        let mut list = ElementList::heterogeneous();
        list.push(Box::new(Attribute::UInteger(7)));

        let mut bytes = Vec::new();
        {
            let mut encoder = BinaryStreamFactory.encoder(&mut bytes);
            list.encode(encoder.as_mut()).unwrap();
        }

        // count, presence, then the entry's MAL type id ahead of its value
        let mut expected = vec![0, 0, 0, 1, 1];
        expected.extend_from_slice(&Attribute::UINTEGER_TYPE_ID.to_raw().to_be_bytes());
        expected.extend_from_slice(&7u32.to_be_bytes());
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_take_remaining_captures_tail() {
        let factory = BinaryStreamFactory;
        let bytes = [1u8, 2, 3, 4, 5];
        let mut decoder = factory.decoder(&bytes);
        decoder.read_u16().unwrap();
        assert_eq!(decoder.remaining(), 3);
        assert_eq!(decoder.take_remaining(), vec![3, 4, 5]);
        assert_eq!(decoder.remaining(), 0);
    }

    proptest! {
        #[test]
        fn prop_integer_attributes_roundtrip(
            octet in any::<i8>(),
            ushort in any::<u16>(),
            long in any::<i64>(),
            ulong in any::<u64>(),
        ) {
            prop_assert_eq!(roundtrip(Attribute::Octet(octet)), Attribute::Octet(octet));
            prop_assert_eq!(roundtrip(Attribute::UShort(ushort)), Attribute::UShort(ushort));
            prop_assert_eq!(roundtrip(Attribute::Long(long)), Attribute::Long(long));
            prop_assert_eq!(roundtrip(Attribute::ULong(ulong)), Attribute::ULong(ulong));
        }

        #[test]
        fn prop_float_attributes_roundtrip(f in any::<f32>(), d in any::<f64>()) {
            // Bit-exact round-trip, NaN payloads included
            let f2 = roundtrip(Attribute::Float(f));
            let d2 = roundtrip(Attribute::Double(d));
            match (f2, d2) {
                (Attribute::Float(f2), Attribute::Double(d2)) => {
                    prop_assert_eq!(f.to_bits(), f2.to_bits());
                    prop_assert_eq!(d.to_bits(), d2.to_bits());
                }
                other => prop_assert!(false, "wrong variants {:?}", other),
            }
        }

        #[test]
        fn prop_string_and_blob_roundtrip(s in ".*", b in proptest::collection::vec(any::<u8>(), 0..256)) {
            prop_assert_eq!(roundtrip(Attribute::String(s.clone())), Attribute::String(s));
            prop_assert_eq!(roundtrip(Attribute::Blob(b.clone())), Attribute::Blob(b));
        }

        #[test]
        fn prop_time_attributes_roundtrip(t in any::<u64>(), d in any::<i64>()) {
            prop_assert_eq!(roundtrip(Attribute::Time(t)), Attribute::Time(t));
            prop_assert_eq!(roundtrip(Attribute::Duration(d)), Attribute::Duration(d));
        }
    }
}
