//! Transport-facing request and response shapes.
//!
//! Transports own the I/O; the runtime only sees an id-tagged input and
//! answers with an id-correlated output.

use crate::tool::Metadata;
use serde::{Deserialize, Serialize};

/// Inbound request handed to the runtime by a transport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportRequest {
    pub id: String,
    pub input: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl TransportRequest {
    pub fn new(id: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            input: input.into(),
            metadata: Metadata::new(),
        }
    }

    /// Attach one metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Structured failure returned to a transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl TransportError {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code.into()),
            details: None,
        }
    }

    /// Attach a structured payload, such as the tool failures of the request.
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// Outbound answer, correlated to the request by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportResponse {
    pub id: String,
    pub output: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TransportError>,
}

impl TransportResponse {
    pub fn ok(id: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            output: output.into(),
            success: true,
            error: None,
        }
    }

    pub fn failed(id: impl Into<String>, error: TransportError) -> Self {
        Self {
            id: id.into(),
            output: String::new(),
            success: false,
            error: Some(error),
        }
    }
}
