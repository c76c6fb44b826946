// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Domain request and notification payloads.
//!
//! The OpenEMS backend exposes a small set of top-level JSON-RPC methods.
//! Edge-scoped traffic is tunneled through the `edgeRpc` envelope: its
//! `params` carry `{edgeId, payload}` where the payload is itself a complete
//! JSON-RPC request (with its own id), and the matching response arrives as
//! `result = {payload: <inner response>}`. Current-data pushes use the same
//! envelope as a notification.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{Error, ParseError};
use crate::model::ChannelAddress;
use crate::protocol::message::{Request, RpcError};

/// Method name of the password authentication request.
pub const AUTHENTICATE_WITH_PASSWORD: &str = "authenticateWithPassword";

/// Method name of the edge-scoped RPC envelope (requests and notifications).
pub const EDGE_RPC: &str = "edgeRpc";

/// Method name of the catalog fetch request, sent inside `edgeRpc`.
pub const GET_EDGE_CONFIG: &str = "getEdgeConfig";

/// Method name of the subscription replace request, sent inside `edgeRpc`.
pub const SUBSCRIBE_CHANNELS: &str = "subscribeChannels";

/// Method name of the current-data notification, delivered inside `edgeRpc`.
pub const CURRENT_DATA: &str = "currentData";

/// Method name of the benign session-resume failure notification.
///
/// The backend emits this when a stale session id races a fresh password
/// login; it carries no actionable information for this client.
pub const AUTHENTICATED_WITH_SESSION_ID_FAILED: &str = "authenticatedWithSessionIdFailed";

/// Builds the password authentication request.
#[must_use]
pub fn authenticate_with_password(password: &str) -> Request {
    Request::new(AUTHENTICATE_WITH_PASSWORD, json!({ "password": password }))
}

/// Builds an `edgeRpc` envelope around an inner request.
///
/// The inner request gets its own correlation id as the wire format
/// requires, but correlation happens solely on the envelope id.
#[must_use]
pub fn edge_rpc(edge_id: &str, inner: Request) -> Request {
    Request::new(
        EDGE_RPC,
        json!({
            "edgeId": edge_id,
            "payload": inner,
        }),
    )
}

/// Builds the inner catalog fetch request.
#[must_use]
pub fn get_edge_config() -> Request {
    Request::new(GET_EDGE_CONFIG, json!({}))
}

/// Builds the inner subscription replace request.
///
/// `channels` is the full desired membership, not a delta; `count` is a
/// monotonically increasing sequence number per registry.
#[must_use]
pub fn subscribe_channels(count: u32, channels: &[ChannelAddress]) -> Request {
    Request::new(
        SUBSCRIBE_CHANNELS,
        json!({
            "count": count,
            "channels": channels,
        }),
    )
}

/// The device list entry returned by authentication.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeMetadata {
    /// Edge id, e.g. `"0"`.
    pub id: String,
    /// Free-text description configured on the backend.
    #[serde(default)]
    pub comment: Option<String>,
    /// Hardware product type.
    #[serde(default)]
    pub producttype: Option<String>,
    /// Whether the edge is currently online.
    #[serde(default)]
    pub online: Option<bool>,
}

/// The result payload of `authenticateWithPassword`.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticateResponse {
    /// Session token; unused by this client but always present.
    #[serde(default)]
    pub token: String,
    /// Devices reachable through this backend.
    pub edges: Vec<EdgeMetadata>,
}

impl AuthenticateResponse {
    /// Parses the raw result payload of the authentication request.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the payload lacks the device list.
    pub fn from_result(result: Value) -> Result<Self, ParseError> {
        serde_json::from_value(result).map_err(ParseError::Json)
    }
}

/// Unwraps the inner response from an `edgeRpc` envelope result.
///
/// # Errors
///
/// - [`ParseError::MissingField`] if the envelope has no `payload`.
/// - [`Error::Remote`] if the inner payload is an error response.
pub fn unwrap_edge_rpc_result(result: Value) -> Result<Value, Error> {
    let mut payload = match result {
        Value::Object(mut map) => map
            .remove("payload")
            .ok_or_else(|| ParseError::MissingField("payload".to_string()))?,
        _ => return Err(ParseError::MissingField("payload".to_string()).into()),
    };

    let object = payload
        .as_object_mut()
        .ok_or_else(|| ParseError::MissingField("result".to_string()))?;

    if let Some(error) = object.remove("error") {
        let error: RpcError = serde_json::from_value(error).map_err(ParseError::Json)?;
        return Err(Error::Remote(error));
    }

    object
        .remove("result")
        .ok_or_else(|| ParseError::MissingField("result".to_string()).into())
}

/// An `edgeRpc` notification: edge id plus the tunneled inner notification.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeRpcNotification {
    /// Edge the notification belongs to.
    pub edge_id: String,
    /// Inner notification, e.g. `currentData`.
    pub payload: InnerNotification,
}

/// The tunneled notification inside an `edgeRpc` envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct InnerNotification {
    /// Inner method name.
    pub method: String,
    /// Inner parameters.
    #[serde(default)]
    pub params: Value,
}
