// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON-RPC protocol layer for the OpenEMS backend.
//!
//! This module provides the wire model and the transport:
//!
//! - [`message`]: JSON-RPC 2.0 frames and inbound classification
//! - [`requests`]: the domain request/notification payloads
//! - [`JsonRpcTransport`]: request correlation and notification dispatch
//!   over one persistent WebSocket connection

pub mod message;
pub mod requests;
mod transport;

pub use message::{Inbound, Request, RpcError};
pub use transport::JsonRpcTransport;
