//! MAL URI handling
//!
//! URIs take the shape `protocol://address[<delim>endpoint[<delim>routing]]`
//! where the service delimiter is chosen by the wire protocol (most use
//! `/`). The transport only ever needs three questions answered: which
//! protocol, which transport address, and which local endpoint (plus any
//! routing remainder a packet-oriented wire wants to interpret itself).

use crate::error::{TransportError, TransportResult};

/// Decomposed MAL URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriParts {
    pub protocol: String,
    /// Transport-level address (host:port, APID, bus id...)
    pub address: String,
    /// Endpoint name within the address, when present
    pub endpoint: Option<String>,
    /// Remainder after the endpoint, for wires that route below endpoint
    /// granularity
    pub routing: Option<String>,
}

impl UriParts {
    /// Parse `uri`, splitting endpoint and routing on `delimiter`
    pub fn parse(uri: &str, delimiter: char) -> TransportResult<UriParts> {
        let (protocol, rest) = uri
            .split_once("://")
            .ok_or_else(|| TransportError::invalid_uri(uri, "missing '://'"))?;
        if protocol.is_empty() {
            return Err(TransportError::invalid_uri(uri, "empty protocol"));
        }
        if rest.is_empty() {
            return Err(TransportError::invalid_uri(uri, "empty address"));
        }

        let (address, tail) = match rest.split_once(delimiter) {
            None => (rest.to_string(), None),
            Some((address, tail)) => (address.to_string(), Some(tail)),
        };
        if address.is_empty() {
            return Err(TransportError::invalid_uri(uri, "empty address"));
        }

        let (endpoint, routing) = match tail {
            None | Some("") => (None, None),
            Some(tail) => match tail.split_once(delimiter) {
                None => (Some(tail.to_string()), None),
                Some((endpoint, routing)) => {
                    (Some(endpoint.to_string()), Some(routing.to_string()))
                }
            },
        };

        Ok(UriParts {
            protocol: protocol.to_string(),
            address,
            endpoint,
            routing,
        })
    }

    /// The `protocol://address` prefix without endpoint or routing
    pub fn base(&self) -> String {
        format!("{}://{}", self.protocol, self.address)
    }
}

/// Compose the URI of a named endpoint under a base URI
pub fn endpoint_uri(base: &str, delimiter: char, name: &str) -> String {
    format!("{base}{delimiter}{name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_uri_decomposition() {
        let parts = UriParts::parse("malref://host-a:6100/provider/chan-3", '/').unwrap();
        assert_eq!(parts.protocol, "malref");
        assert_eq!(parts.address, "host-a:6100");
        assert_eq!(parts.endpoint.as_deref(), Some("provider"));
        assert_eq!(parts.routing.as_deref(), Some("chan-3"));
        assert_eq!(parts.base(), "malref://host-a:6100");
    }

    #[test]
    fn test_address_only_uri() {
        let parts = UriParts::parse("malref://host-a:6100", '/').unwrap();
        assert!(parts.endpoint.is_none());
        assert!(parts.routing.is_none());
    }

    #[test]
    fn test_trailing_delimiter_means_no_endpoint() {
        let parts = UriParts::parse("malref://host-a:6100/", '/').unwrap();
        assert!(parts.endpoint.is_none());
    }

    #[test]
    fn test_alternate_delimiter() {
        let parts = UriParts::parse("malspp://247:0:1.provider", '.').unwrap();
        assert_eq!(parts.address, "247:0:1");
        assert_eq!(parts.endpoint.as_deref(), Some("provider"));
    }

    #[test]
    fn test_malformed_uris_rejected() {
        assert!(UriParts::parse("no-scheme-here", '/').is_err());
        assert!(UriParts::parse("://host/ep", '/').is_err());
        assert!(UriParts::parse("malref://", '/').is_err());
        assert!(UriParts::parse("malref:///ep", '/').is_err());
    }

    #[test]
    fn test_endpoint_uri_composition() {
        assert_eq!(
            endpoint_uri("malref://host-a:6100", '/', "consumer"),
            "malref://host-a:6100/consumer"
        );
        let parts = UriParts::parse(&endpoint_uri("malref://h", '/', "e"), '/').unwrap();
        assert_eq!(parts.endpoint.as_deref(), Some("e"));
    }
}
