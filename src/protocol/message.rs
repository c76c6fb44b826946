// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON-RPC 2.0 message framing.
//!
//! OpenEMS speaks plain JSON-RPC 2.0 over a persistent WebSocket. Three
//! message shapes travel on the wire:
//!
//! - Request: `{"jsonrpc":"2.0","id":"…","method":"…","params":{…}}`
//! - Response: `{"jsonrpc":"2.0","id":"…","result":{…}}` or
//!   `{"jsonrpc":"2.0","id":"…","error":{…}}`
//! - Notification (no id): `{"jsonrpc":"2.0","method":"…","params":{…}}`
//!
//! Classification order matters and mirrors the backend's framing: a frame
//! carrying an `error` member is an error response even if other members
//! are present, then success responses, then notifications. Anything else
//! is a protocol violation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::ProtocolError;

/// The JSON-RPC protocol version sent with every frame.
pub const JSONRPC_VERSION: &str = "2.0";

/// An outgoing JSON-RPC request frame.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// Protocol version, always `"2.0"`.
    pub jsonrpc: &'static str,
    /// Process-unique correlation id.
    pub id: String,
    /// Method name.
    pub method: String,
    /// Method parameters.
    pub params: Value,
}

impl Request {
    /// Creates a request with a fresh correlation id.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: Uuid::new_v4().to_string(),
            method: method.into(),
            params,
        }
    }
}

/// The JSON-RPC error object carried by error responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    /// Numeric error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)
    }
}

/// A classified inbound frame.
///
/// The variant order is the classification order; see the module docs.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Inbound {
    /// An error response for a pending request.
    ErrorResponse {
        /// Correlation id of the request this answers.
        id: String,
        /// The error payload.
        error: RpcError,
    },
    /// A success response for a pending request.
    SuccessResponse {
        /// Correlation id of the request this answers.
        id: String,
        /// The result payload.
        result: Value,
    },
    /// An unsolicited notification.
    Notification {
        /// Method name identifying the notification kind.
        method: String,
        /// Notification parameters.
        #[serde(default)]
        params: Value,
    },
}

impl Inbound {
    /// Classifies a raw text frame.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnrecognizedMessage`] if the frame is not
    /// valid JSON or matches none of the three message shapes.
    pub fn classify(frame: &str) -> Result<Self, ProtocolError> {
        serde_json::from_str(frame)
            .map_err(|_| ProtocolError::UnrecognizedMessage(frame.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serializes_with_version_and_id() {
        let request = Request::new("authenticateWithPassword", json!({"password": "user"}));
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["method"], "authenticateWithPassword");
        assert_eq!(value["params"]["password"], "user");
        assert!(!value["id"].as_str().unwrap().is_empty());
    }

    #[test]
    fn request_ids_are_unique() {
        let a = Request::new("m", Value::Null);
        let b = Request::new("m", Value::Null);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn classify_success_response() {
        let frame = r#"{"jsonrpc":"2.0","id":"42","result":{"token":"t"}}"#;
        let inbound = Inbound::classify(frame).unwrap();
        assert!(matches!(
            inbound,
            Inbound::SuccessResponse { id, .. } if id == "42"
        ));
    }

    #[test]
    fn classify_error_response() {
        let frame = r#"{"jsonrpc":"2.0","id":"42","error":{"code":1001,"message":"wrong password"}}"#;
        let inbound = Inbound::classify(frame).unwrap();
        match inbound {
            Inbound::ErrorResponse { id, error } => {
                assert_eq!(id, "42");
                assert_eq!(error.code, 1001);
                assert_eq!(error.message, "wrong password");
            }
            other => panic!("expected error response, got {other:?}"),
        }
    }

    #[test]
    fn classify_notification() {
        let frame = r#"{"jsonrpc":"2.0","method":"edgeRpc","params":{"edgeId":"0"}}"#;
        let inbound = Inbound::classify(frame).unwrap();
        assert!(matches!(
            inbound,
            Inbound::Notification { method, .. } if method == "edgeRpc"
        ));
    }

    #[test]
    fn classify_rejects_unknown_shape() {
        let result = Inbound::classify(r#"{"jsonrpc":"2.0","id":"42"}"#);
        assert!(matches!(
            result,
            Err(ProtocolError::UnrecognizedMessage(_))
        ));
    }

    #[test]
    fn classify_rejects_invalid_json() {
        assert!(Inbound::classify("not json").is_err());
    }

    #[test]
    fn rpc_error_display() {
        let error = RpcError {
            code: 1003,
            message: "authentication failed".to_string(),
            data: None,
        };
        assert_eq!(error.to_string(), "authentication failed (code 1003)");
    }
}
