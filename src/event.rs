//! Captured webhook types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One inbound HTTP request captured by the server
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapturedEvent {
    /// Store-assigned identifier, `wh_<sequence>`; empty until appended
    pub id: String,

    /// Capture time (server-local wall clock)
    pub timestamp: DateTime<Utc>,

    /// HTTP method, verbatim from the request
    pub method: String,

    /// Request path plus query string, verbatim
    pub url: String,

    /// Header name/value pairs; first value wins when a header repeats
    pub headers: HashMap<String, String>,

    /// Raw request body, unparsed
    #[serde(with = "base64_bytes")]
    pub body: Vec<u8>,

    /// Verbatim signature header value, empty if absent
    pub signature: String,

    /// Whether signature validation passed (or was not configured)
    pub verified: bool,
}

impl CapturedEvent {
    /// Create an event from the parts of an inbound request
    pub fn new(
        method: impl Into<String>,
        url: impl Into<String>,
        headers: HashMap<String, String>,
        body: Vec<u8>,
    ) -> Self {
        Self {
            id: String::new(),
            timestamp: Utc::now(),
            method: method.into(),
            url: url.into(),
            headers,
            body,
            signature: String::new(),
            verified: false,
        }
    }

    /// Set the signature header value
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = signature.into();
        self
    }

    /// Set the verification outcome
    pub fn with_verified(mut self, verified: bool) -> Self {
        self.verified = verified;
        self
    }
}

/// Byte-safe serde representation for request bodies
mod base64_bytes {
    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
