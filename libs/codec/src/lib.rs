//! # MAL Protocol Codec - Message Encoding Rules
//!
//! ## Purpose
//!
//! This crate contains the "Rules" layer of the transport core:
//! - Header schema and per-protocol header codecs
//! - Compact one-byte stage codes for the interaction patterns
//! - Lazy message bodies with decode-on-first-access semantics
//! - Whole-frame assembly and the automatic error-reply builder
//! - The concrete big-endian byte-stream encoding
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → [codec] → libs/transport
//!     ↑           ↓            ↓
//! Pure Data   Protocol     Endpoints,
//! Elements    Rules        Delivery
//! ```
//!
//! Types defines WHAT travels (elements, type identifiers, stage tables);
//! codec defines HOW it is laid out on the wire; transport moves the
//! resulting frames without ever looking inside a body.
//!
//! ## Lazy Bodies
//!
//! Bodies decode at most once, on first element access. A relay that only
//! reads the header forwards the original body bytes verbatim, so
//! pass-through traffic never pays a parse/re-encode cycle. See
//! [`body::MessageBody`].

pub mod binary;
pub mod body;
pub mod error;
pub mod header;
pub mod message;
pub mod stage_code;

pub use binary::{BinaryDecoder, BinaryEncoder, BinaryStreamFactory};
pub use body::{schema_for, BodyKind, DecodeContext, MessageBody};
pub use error::{CodecError, CodecResult};
pub use header::{HeaderCodec, MessageHeader, StreamHeaderCodec};
pub use message::MalMessage;
pub use stage_code::{decode_stage_code, encode_stage_code, STAGE_CODE_COUNT};
