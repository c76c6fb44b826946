// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Static catalog model: which channels exist on which components of which
//! edge device, plus component and factory metadata. Lookup and iteration
//! only; all mutation happens at construction time.

mod channel_address;
mod edge;
mod edge_config;

pub use channel_address::ChannelAddress;
pub use edge::Edge;
pub use edge_config::{ChannelDetail, Component, EdgeConfig, Factory};
