// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Channel subscription management.
//!
//! [`ChannelFilter`] selects catalog entries; [`SubscriptionRegistry`]
//! keeps the per-edge refcounted membership in sync with the remote via
//! full-replace requests.

mod filter;
mod registry;

pub use filter::ChannelFilter;
pub use registry::SubscriptionRegistry;
