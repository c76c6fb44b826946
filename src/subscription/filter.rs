// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Channel filters.
//!
//! A [`ChannelFilter`] decides which catalog entries a subscription covers.
//! It sees the fully-qualified edge id (`"edge0"`), the component id, the
//! channel id and the channel metadata. Metadata is only consulted when the
//! filter is evaluated against the catalog at subscribe time, never per
//! update.

use std::fmt;
use std::sync::Arc;

use crate::model::ChannelDetail;

type FilterFn = dyn Fn(&str, &str, &str, &ChannelDetail) -> bool + Send + Sync;

/// A predicate over `(edge, component, channel, metadata)` catalog entries.
///
/// Cheaply cloneable; clones share the same closure.
///
/// # Examples
///
/// ```
/// use emsor_lib::subscription::ChannelFilter;
///
/// // Everything on the aggregating "_sum" component of any edge:
/// let sum = ChannelFilter::sum();
///
/// // One specific channel:
/// let soc = ChannelFilter::exactly("edge0", "_sum", "EssSoc");
///
/// // Arbitrary predicates:
/// let meters = ChannelFilter::new(|_edge, component, _channel, _detail| {
///     component.starts_with("meter")
/// });
/// ```
#[derive(Clone)]
pub struct ChannelFilter(Arc<FilterFn>);

impl ChannelFilter {
    /// Wraps an arbitrary predicate.
    pub fn new<F>(filter: F) -> Self
    where
        F: Fn(&str, &str, &str, &ChannelDetail) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(filter))
    }

    /// Matches every channel on the aggregating `_sum` component.
    #[must_use]
    pub fn sum() -> Self {
        Self::new(|_edge, component, _channel, _detail| component == "_sum")
    }

    /// Matches exactly one channel on one component of one edge.
    ///
    /// `edge` is the fully-qualified id, e.g. `"edge0"`.
    #[must_use]
    pub fn exactly(
        edge: impl Into<String>,
        component: impl Into<String>,
        channel: impl Into<String>,
    ) -> Self {
        let edge = edge.into();
        let component = component.into();
        let channel = channel.into();
        Self::new(move |e, co, ch, _detail| e == edge && co == component && ch == channel)
    }

    /// Evaluates the filter against one catalog entry.
    #[must_use]
    pub fn matches(&self, edge: &str, component: &str, channel: &str, detail: &ChannelDetail) -> bool {
        (self.0)(edge, component, channel, detail)
    }
}

impl fmt::Debug for ChannelFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelFilter").finish_non_exhaustive()
    }
}
