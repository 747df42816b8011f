//! Codec error taxonomy
//!
//! Decode failures carry enough context to diagnose which field of which
//! operation failed without a debugger: truncation errors report byte
//! counts, field errors carry the field name and the decomposed TypeId of
//! the element being decoded. None of these are panics; a malformed stream
//! must never take the process down.

use mal_types::{ElementError, RegistryError, TypeId};

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum CodecError {
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

    #[error("Unknown operation {area}/{service}/{operation} v{version}")]
    UnknownOperation {
        area: u16,
        service: u16,
        operation: u16,
        version: u8,
    },

    #[error("Stage {stage} is not valid for interaction type {interaction}")]
    InvalidStage { interaction: &'static str, stage: u8 },

    #[error("Body field '{field}' (type {type_id}) failed to decode: {source}",
            type_id = type_id.map(|t| t.to_string()).unwrap_or_else(|| "abstract".to_string()))]
    Field {
        field: &'static str,
        type_id: Option<TypeId>,
        #[source]
        source: Box<CodecError>,
    },

    #[error("Body element index {index} out of range, body has {count} elements")]
    IndexOutOfRange { index: usize, count: usize },

    #[error("Body access not supported for this body kind: {0}")]
    WrongBodyKind(&'static str),

    #[error("Unsupported codec operation: {0}")]
    Unsupported(String),
}

impl CodecError {
    pub fn truncated(needed: usize, available: usize) -> Self {
        CodecError::Truncated { needed, available }
    }

    pub fn malformed(msg: impl Into<String>) -> Self {
        CodecError::Malformed(msg.into())
    }

    pub fn invalid_stage(interaction: &'static str, stage: u8) -> Self {
        CodecError::InvalidStage { interaction, stage }
    }

    pub fn index_out_of_range(index: usize, count: usize) -> Self {
        CodecError::IndexOutOfRange { index, count }
    }

    /// Augment a decode failure with the field it happened in
    ///
    /// Attached exactly once, at the body-decode loop; nested element
    /// failures keep their innermost field attribution.
    pub fn in_field(self, field: &'static str, type_id: Option<TypeId>) -> Self {
        match self {
            already @ CodecError::Field { .. } => already,
            other => CodecError::Field {
                field,
                type_id,
                source: Box::new(other),
            },
        }
    }

    /// Whether this failure came from running out of bytes
    pub fn is_truncation(&self) -> bool {
        match self {
            CodecError::Truncated { .. } => true,
            CodecError::Field { source, .. } => source.is_truncation(),
            _ => false,
        }
    }
}

impl From<ElementError> for CodecError {
    fn from(err: ElementError) -> Self {
        match err {
            ElementError::Truncated { needed, available } => {
                CodecError::Truncated { needed, available }
            }
            ElementError::Malformed(msg) => CodecError::Malformed(msg),
            ElementError::UnknownType { type_id } => CodecError::UnknownType { type_id },
            ElementError::Unsupported(msg) => CodecError::Unsupported(msg),
        }
    }
}

impl From<RegistryError> for CodecError {
    fn from(err: RegistryError) -> Self {
        CodecError::UnknownType {
            type_id: err.type_id(),
        }
    }
}
