// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error types for the `EmsoR` library.
//!
//! This module provides the error hierarchy for failures across the library:
//! transport and protocol faults, catalog parsing, authentication, and
//! errors reported by the remote device for individual requests.

use thiserror::Error;

use crate::protocol::RpcError;

/// The main error type for this library.
///
/// This enum encompasses all possible errors that can occur when talking to
/// an OpenEMS installation.
#[derive(Debug, Error)]
pub enum Error {
    /// Error occurred on the WebSocket connection or in the JSON-RPC
    /// protocol machinery.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Error occurred while parsing a message or the channel catalog.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Authentication was rejected by the backend.
    #[error("authentication rejected: {0}")]
    Auth(RpcError),

    /// The remote device answered a specific request with an error payload.
    ///
    /// This rejects only the one request it belongs to; the connection
    /// stays up.
    #[error("remote error: {0}")]
    Remote(RpcError),
}

/// Errors related to the WebSocket transport and JSON-RPC framing.
///
/// Everything in here is fatal to the owning `Subscriber` instance; recovery
/// happens only by discarding it and reconnecting from scratch.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The WebSocket handshake or a socket operation failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// The connection closed while a request was still in flight.
    #[error("connection closed")]
    ConnectionClosed,

    /// A response arrived whose id matches no pending request.
    #[error("response with unknown request id: {id}")]
    UnmatchedResponse {
        /// The correlation id the remote sent.
        id: String,
    },

    /// An inbound frame matched none of the JSON-RPC message shapes.
    #[error("unrecognized message: {0}")]
    UnrecognizedMessage(String),

    /// The configured endpoint is not a valid WebSocket URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Errors related to parsing responses and the channel catalog.
#[derive(Debug, Error)]
pub enum ParseError {
    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A channel address did not split into exactly `component/channel`.
    #[error("illegal channel address format: {0}")]
    InvalidChannelAddress(String),

    /// Expected field is missing from a response payload.
    #[error("missing field in response: {0}")]
    MissingField(String),
}

/// A specialized Result type for this library.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_error_display() {
        let err = ProtocolError::UnmatchedResponse {
            id: "abc-123".to_string(),
        };
        assert_eq!(err.to_string(), "response with unknown request id: abc-123");
    }

    #[test]
    fn error_from_parse_error() {
        let parse_err = ParseError::InvalidChannelAddress("a/b/c".to_string());
        let err: Error = parse_err.into();
        assert!(matches!(
            err,
            Error::Parse(ParseError::InvalidChannelAddress(_))
        ));
    }

    #[test]
    fn parse_error_display() {
        let err = ParseError::MissingField("edges".to_string());
        assert_eq!(err.to_string(), "missing field in response: edges");
    }

    #[test]
    fn remote_error_display() {
        let err = Error::Remote(RpcError {
            code: -32000,
            message: "edge offline".to_string(),
            data: None,
        });
        assert_eq!(err.to_string(), "remote error: edge offline (code -32000)");
    }
}
