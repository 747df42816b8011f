//! Wire encoding plug-in contract
//!
//! The transport core never commits to a specific wire format. Concrete
//! protocols supply a [`StreamFactory`] whose encoder/decoder pair exposes
//! per-primitive read/write operations; headers, bodies and elements are all
//! expressed against this contract. The reference binary implementation
//! lives in mal-codec.

use crate::element::{Element, ElementError};

/// Per-primitive write operations over an output stream
///
/// Nullable fields use the presence-flag convention: the writer emits a
/// presence marker via [`write_presence`](ElementEncoder::write_presence)
/// and, when present, the value itself. Nested elements recurse through
/// [`write_element`](ElementEncoder::write_element).
pub trait ElementEncoder {
    fn write_bool(&mut self, v: bool) -> Result<(), ElementError>;
    fn write_i8(&mut self, v: i8) -> Result<(), ElementError>;
    fn write_u8(&mut self, v: u8) -> Result<(), ElementError>;
    fn write_i16(&mut self, v: i16) -> Result<(), ElementError>;
    fn write_u16(&mut self, v: u16) -> Result<(), ElementError>;
    fn write_i32(&mut self, v: i32) -> Result<(), ElementError>;
    fn write_u32(&mut self, v: u32) -> Result<(), ElementError>;
    fn write_i64(&mut self, v: i64) -> Result<(), ElementError>;
    fn write_u64(&mut self, v: u64) -> Result<(), ElementError>;
    fn write_f32(&mut self, v: f32) -> Result<(), ElementError>;
    fn write_f64(&mut self, v: f64) -> Result<(), ElementError>;

    /// Arbitrary UTF-8 string
    fn write_string(&mut self, v: &str) -> Result<(), ElementError>;

    /// MAL Identifier (a restricted string; formats may pack it differently)
    fn write_identifier(&mut self, v: &str) -> Result<(), ElementError>;

    /// MAL URI
    fn write_uri(&mut self, v: &str) -> Result<(), ElementError>;

    /// Opaque byte blob
    fn write_blob(&mut self, v: &[u8]) -> Result<(), ElementError>;

    /// Coarse timestamp, nanoseconds since the MAL epoch
    fn write_time(&mut self, v: u64) -> Result<(), ElementError>;

    /// High-resolution timestamp, picoseconds since the MAL epoch
    fn write_fine_time(&mut self, v: u64) -> Result<(), ElementError>;

    /// Signed duration in nanoseconds
    fn write_duration(&mut self, v: i64) -> Result<(), ElementError>;

    /// Presence marker for a nullable field
    fn write_presence(&mut self, present: bool) -> Result<(), ElementError>;

    /// Nested element, encoded in place
    fn write_element(&mut self, element: &dyn Element) -> Result<(), ElementError>;
}

/// Per-primitive read operations over an input stream, mirror of
/// [`ElementEncoder`]
pub trait ElementDecoder {
    fn read_bool(&mut self) -> Result<bool, ElementError>;
    fn read_i8(&mut self) -> Result<i8, ElementError>;
    fn read_u8(&mut self) -> Result<u8, ElementError>;
    fn read_i16(&mut self) -> Result<i16, ElementError>;
    fn read_u16(&mut self) -> Result<u16, ElementError>;
    fn read_i32(&mut self) -> Result<i32, ElementError>;
    fn read_u32(&mut self) -> Result<u32, ElementError>;
    fn read_i64(&mut self) -> Result<i64, ElementError>;
    fn read_u64(&mut self) -> Result<u64, ElementError>;
    fn read_f32(&mut self) -> Result<f32, ElementError>;
    fn read_f64(&mut self) -> Result<f64, ElementError>;

    fn read_string(&mut self) -> Result<String, ElementError>;
    fn read_identifier(&mut self) -> Result<String, ElementError>;
    fn read_uri(&mut self) -> Result<String, ElementError>;
    fn read_blob(&mut self) -> Result<Vec<u8>, ElementError>;
    fn read_time(&mut self) -> Result<u64, ElementError>;
    fn read_fine_time(&mut self) -> Result<u64, ElementError>;
    fn read_duration(&mut self) -> Result<i64, ElementError>;

    fn read_presence(&mut self) -> Result<bool, ElementError>;

    /// Fill a pre-constructed element from the stream
    fn read_element_into(&mut self, element: &mut dyn Element) -> Result<(), ElementError>;

    /// Bytes not yet consumed
    fn remaining(&self) -> usize;

    /// Consume and return all bytes not yet read
    ///
    /// Used to capture a message body in its still-encoded form for lazy
    /// decoding or verbatim relay.
    fn take_remaining(&mut self) -> Vec<u8>;
}

/// Factory producing encoder/decoder pairs for one wire format
pub trait StreamFactory: Send + Sync + std::fmt::Debug {
    /// Create an encoder writing to the supplied sink
    fn encoder<'a>(&self, sink: &'a mut Vec<u8>) -> Box<dyn ElementEncoder + 'a>;

    /// Create a decoder reading from the supplied bytes
    fn decoder<'a>(&self, bytes: &'a [u8]) -> Box<dyn ElementDecoder + 'a>;
}
