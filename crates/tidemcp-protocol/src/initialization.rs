//! Types exchanged during the `initialize` handshake.

use serde::{Deserialize, Serialize};

use crate::capabilities::{ClientCapabilities, ServerCapabilities};

/// Highest protocol version this crate speaks; lowered on negotiation when
/// the peer only supports an older one.
pub const LATEST_PROTOCOL_VERSION: &str = "2025-06-18";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Implementation {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitializeRequest {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ClientCapabilities,
    #[serde(rename = "clientInfo")]
    pub client_info: Implementation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: Implementation,
}

/// Either side may reject a mismatched version; otherwise the lower one
/// that both speak is selected.
pub fn negotiate_protocol_version(requested: &str, supported: &[&str]) -> Option<String> {
    if supported.contains(&requested) {
        return Some(requested.to_string());
    }
    supported.first().map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negotiation_accepts_matching_version() {
        assert_eq!(
            negotiate_protocol_version(LATEST_PROTOCOL_VERSION, &[LATEST_PROTOCOL_VERSION]),
            Some(LATEST_PROTOCOL_VERSION.to_string())
        );
    }

    #[test]
    fn negotiation_falls_back_to_supported_when_mismatched() {
        assert_eq!(
            negotiate_protocol_version("2099-01-01", &["2025-06-18"]),
            Some("2025-06-18".to_string())
        );
    }
}
