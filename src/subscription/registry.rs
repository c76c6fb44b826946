// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Reference-counted channel subscription registry.
//!
//! The wire protocol has no incremental subscribe/unsubscribe: the only
//! operation is "replace the subscribed set". The registry therefore keeps
//! a refcount per channel address and republishes the full membership on
//! every change. Refcounts accumulate under the lock before the replace
//! request is built, so concurrent callers compose; the remote's authority
//! is always the last acknowledged replace.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::error::Result;
use crate::model::ChannelAddress;
use crate::protocol::requests::{edge_rpc, subscribe_channels, unwrap_edge_rpc_result};
use crate::protocol::JsonRpcTransport;

/// Per-edge registry of desired channel subscriptions.
///
/// Membership is the union of every channel any active `subscribe` call
/// still holds open. An entry whose refcount reaches zero is deleted, never
/// stored at zero.
pub struct SubscriptionRegistry {
    /// Raw wire id of the edge, e.g. `"0"`.
    edge_id: String,
    transport: JsonRpcTransport,
    counts: Mutex<BTreeMap<ChannelAddress, usize>>,
    /// Sequence number sent with every replace request.
    replace_count: AtomicU32,
}

impl SubscriptionRegistry {
    /// Creates an empty registry for one edge.
    #[must_use]
    pub fn new(edge_id: impl Into<String>, transport: JsonRpcTransport) -> Self {
        Self {
            edge_id: edge_id.into(),
            transport,
            counts: Mutex::new(BTreeMap::new()),
            replace_count: AtomicU32::new(0),
        }
    }

    /// Increments the refcount of every address and republishes the full
    /// membership, waiting for the acknowledgement.
    ///
    /// # Errors
    ///
    /// Propagates transport and remote errors from the replace request.
    /// The refcounts keep the new state either way; the remote converges on
    /// the next acknowledged replace.
    pub async fn add(&self, addresses: &BTreeSet<ChannelAddress>) -> Result<()> {
        let membership = {
            let mut counts = self.counts.lock();
            apply_add(&mut counts, addresses);
            snapshot(&counts)
        };

        tracing::debug!(
            edge = %self.edge_id,
            added = addresses.len(),
            total = membership.len(),
            "subscription add"
        );
        self.replace(&membership).await
    }

    /// Decrements refcounts, deletes addresses that reach zero, and
    /// republishes if the membership actually changed.
    ///
    /// Removing an address that was never added is a no-op and sends
    /// nothing on the wire.
    ///
    /// # Errors
    ///
    /// Propagates transport and remote errors from the replace request.
    pub async fn remove(&self, addresses: &BTreeSet<ChannelAddress>) -> Result<()> {
        let membership = {
            let mut counts = self.counts.lock();
            let changed = apply_remove(&mut counts, addresses);
            changed.then(|| snapshot(&counts))
        };

        let Some(membership) = membership else {
            tracing::debug!(edge = %self.edge_id, "subscription remove left membership unchanged");
            return Ok(());
        };

        tracing::debug!(
            edge = %self.edge_id,
            removed = addresses.len(),
            total = membership.len(),
            "subscription remove"
        );
        self.replace(&membership).await
    }

    /// Returns the current membership, in address order.
    #[must_use]
    pub fn membership(&self) -> Vec<ChannelAddress> {
        snapshot(&self.counts.lock())
    }

    /// Sends one full-membership replace request and awaits the ack.
    async fn replace(&self, membership: &[ChannelAddress]) -> Result<()> {
        let count = self.replace_count.fetch_add(1, Ordering::Relaxed);
        let envelope = edge_rpc(&self.edge_id, subscribe_channels(count, membership));
        let result = self.transport.request(envelope).await?;
        unwrap_edge_rpc_result(result)?;
        Ok(())
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("edge_id", &self.edge_id)
            .field("channels", &self.counts.lock().len())
            .finish()
    }
}

/// Increments the refcount of every address, creating entries at 1.
fn apply_add(counts: &mut BTreeMap<ChannelAddress, usize>, addresses: &BTreeSet<ChannelAddress>) {
    for address in addresses {
        *counts.entry(address.clone()).or_insert(0) += 1;
    }
}

/// Decrements refcounts and deletes entries that reach zero.
///
/// Returns `true` if the key set changed. Unknown addresses are skipped;
/// refcounts never go negative.
fn apply_remove(
    counts: &mut BTreeMap<ChannelAddress, usize>,
    addresses: &BTreeSet<ChannelAddress>,
) -> bool {
    let mut changed = false;
    for address in addresses {
        if let Some(count) = counts.get_mut(address) {
            *count -= 1;
            if *count == 0 {
                counts.remove(address);
                changed = true;
            }
        }
    }
    changed
}

fn snapshot(counts: &BTreeMap<ChannelAddress, usize>) -> Vec<ChannelAddress> {
    counts.keys().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> ChannelAddress {
        s.parse().unwrap()
    }

    fn set(addresses: &[&str]) -> BTreeSet<ChannelAddress> {
        addresses.iter().map(|s| addr(s)).collect()
    }

    #[test]
    fn add_creates_entries_at_one() {
        let mut counts = BTreeMap::new();
        apply_add(&mut counts, &set(&["_sum/EssSoc", "meter0/ActivePower"]));

        assert_eq!(counts.len(), 2);
        assert!(counts.values().all(|&c| c == 1));
    }

    #[test]
    fn shared_channels_survive_one_removal() {
        let mut counts = BTreeMap::new();
        let s1 = set(&["_sum/EssSoc", "_sum/EssActivePower"]);
        let s2 = set(&["_sum/EssSoc", "meter0/ActivePower"]);

        apply_add(&mut counts, &s1);
        apply_add(&mut counts, &s2);
        apply_remove(&mut counts, &s1);

        // S1-only channels are gone, the shared channel and S2-only remain.
        assert!(!counts.contains_key(&addr("_sum/EssActivePower")));
        assert_eq!(counts[&addr("_sum/EssSoc")], 1);
        assert_eq!(counts[&addr("meter0/ActivePower")], 1);
    }

    #[test]
    fn remove_never_added_is_a_noop() {
        let mut counts = BTreeMap::new();
        apply_add(&mut counts, &set(&["_sum/EssSoc"]));

        let changed = apply_remove(&mut counts, &set(&["meter0/ActivePower"]));

        assert!(!changed);
        assert_eq!(counts.len(), 1);
    }

    #[test]
    fn remove_deletes_at_zero_never_stores_zero() {
        let mut counts = BTreeMap::new();
        apply_add(&mut counts, &set(&["_sum/EssSoc"]));
        apply_add(&mut counts, &set(&["_sum/EssSoc"]));

        assert!(!apply_remove(&mut counts, &set(&["_sum/EssSoc"])));
        assert_eq!(counts[&addr("_sum/EssSoc")], 1);

        assert!(apply_remove(&mut counts, &set(&["_sum/EssSoc"])));
        assert!(counts.is_empty());
    }

    #[test]
    fn remove_reports_change_only_on_membership_change() {
        let mut counts = BTreeMap::new();
        apply_add(&mut counts, &set(&["_sum/EssSoc"]));
        apply_add(&mut counts, &set(&["_sum/EssSoc"]));

        // refcount 2 -> 1: key set unchanged
        assert!(!apply_remove(&mut counts, &set(&["_sum/EssSoc"])));
        // refcount 1 -> 0: key disappears
        assert!(apply_remove(&mut counts, &set(&["_sum/EssSoc"])));
    }
}
