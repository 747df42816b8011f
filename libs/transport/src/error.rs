//! Transport error taxonomy and the wire error-number mapping
//!
//! Every variant is cloneable so a failure can be aggregated into a batch
//! result and still be logged or inspected independently.

use mal_codec::CodecError;
use mal_types::error_number;

pub type TransportResult<T> = Result<T, TransportError>;

/// Main transport error type
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// Encoding or decoding failed somewhere between header and body
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    /// The wire rejected or lost the frame
    #[error("Delivery to {destination} failed: {reason}")]
    DeliveryFailed { destination: String, reason: String },

    /// The destination failed recently and this attempt was refused without
    /// touching the wire
    #[error("Destination {destination} quarantined after an earlier delivery failure")]
    Quarantined { destination: String },

    /// No endpoint answers to this URI
    #[error("Unknown destination URI: {uri}")]
    DestinationUnknown { uri: String },

    /// The URI does not parse or names a protocol this transport does not
    /// speak
    #[error("Invalid URI {uri}: {reason}")]
    InvalidUri { uri: String, reason: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// The transport has been closed
    #[error("Transport closed")]
    Closed,

    /// Best-effort batch outcome: some messages were delivered, some were
    /// not; each failure keeps its position in the submitted batch
    #[error("Batch send: {sent} delivered, {count} failed", count = failures.len())]
    MultiTransmit {
        sent: usize,
        failures: Vec<(usize, TransportError)>,
    },

    #[error("Internal transport error: {0}")]
    Internal(String),
}

impl TransportError {
    pub fn delivery_failed(destination: impl Into<String>, reason: impl Into<String>) -> Self {
        TransportError::DeliveryFailed {
            destination: destination.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_uri(uri: impl Into<String>, reason: impl Into<String>) -> Self {
        TransportError::InvalidUri {
            uri: uri.into(),
            reason: reason.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        TransportError::Configuration {
            message: message.into(),
        }
    }

    /// The MAL error number carried by the reflected error body for this
    /// failure
    pub fn error_number(&self) -> u32 {
        match self {
            TransportError::DeliveryFailed { .. } => error_number::DELIVERY_FAILED,
            TransportError::Quarantined { .. }
            | TransportError::DestinationUnknown { .. }
            | TransportError::InvalidUri { .. } => error_number::DESTINATION_UNKNOWN,
            TransportError::Codec(_) => error_number::BAD_ENCODING,
            TransportError::Closed => error_number::SHUTDOWN,
            TransportError::Configuration { .. }
            | TransportError::MultiTransmit { .. }
            | TransportError::Internal(_) => error_number::INTERNAL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_number_mapping() {
        assert_eq!(
            TransportError::delivery_failed("malref://x/y", "refused").error_number(),
            error_number::DELIVERY_FAILED
        );
        assert_eq!(
            TransportError::Quarantined {
                destination: "malref://x/y".into()
            }
            .error_number(),
            error_number::DESTINATION_UNKNOWN
        );
        assert_eq!(
            TransportError::DestinationUnknown {
                uri: "malref://x/gone".into()
            }
            .error_number(),
            error_number::DESTINATION_UNKNOWN
        );
        assert_eq!(
            TransportError::Codec(CodecError::truncated(4, 0)).error_number(),
            error_number::BAD_ENCODING
        );
        assert_eq!(TransportError::Closed.error_number(), error_number::SHUTDOWN);
        assert_eq!(
            TransportError::Internal("queue poisoned".into()).error_number(),
            error_number::INTERNAL
        );
    }

    #[test]
    fn test_multi_transmit_reports_counts() {
        let err = TransportError::MultiTransmit {
            sent: 2,
            failures: vec![(1, TransportError::delivery_failed("malref://x/y", "down"))],
        };
        let msg = err.to_string();
        assert!(msg.contains("2 delivered"));
        assert!(msg.contains("1 failed"));
    }
}
