// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The subscription façade.
//!
//! A [`Subscriber`] owns one [`JsonRpcTransport`] and the per-edge catalog
//! and registry state. [`Subscriber::connect`] runs the whole startup
//! sequence — open, authenticate, fetch every edge's catalog sequentially —
//! and only ever returns a ready instance, so every method on a
//! `Subscriber` may be called at any time.
//!
//! Failure of the transport is fatal to the instance. Nothing here retries;
//! the [`runner`](crate::runner) module rebuilds the whole stack from
//! scratch.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::watch;

use crate::config::SubscriberConfig;
use crate::error::{Error, ParseError, ProtocolError, Result};
use crate::model::{ChannelAddress, Edge, EdgeConfig};
use crate::protocol::requests::{
    AUTHENTICATED_WITH_SESSION_ID_FAILED, CURRENT_DATA, EDGE_RPC, AuthenticateResponse,
    EdgeRpcNotification, authenticate_with_password, edge_rpc, get_edge_config,
    unwrap_edge_rpc_result,
};
use crate::protocol::JsonRpcTransport;
use crate::subscription::{ChannelFilter, SubscriptionRegistry};

/// Callback invoked with `(fully-qualified path, value)` for every matching
/// channel update, e.g. `("edge0/_sum/EssSoc", 42)`.
pub type ConsumeFn = dyn Fn(&str, &Value) + Send + Sync;

struct EdgeEntry {
    edge: Edge,
    registry: SubscriptionRegistry,
}

/// Client for one OpenEMS installation.
///
/// Cheaply cloneable; all clones share the connection and registries.
///
/// # Examples
///
/// ```no_run
/// use emsor_lib::{Subscriber, SubscriberConfig};
/// use emsor_lib::subscription::ChannelFilter;
///
/// # async fn example() -> emsor_lib::Result<()> {
/// let config = SubscriberConfig::builder()
///     .url("ws://192.168.1.20:8085/websocket")
///     .password("user")
///     .build()?;
///
/// let subscriber = Subscriber::connect(&config).await?;
///
/// subscriber
///     .subscribe(&ChannelFilter::sum(), |path, value| {
///         println!("{path} = {value}");
///     })
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Subscriber {
    inner: Arc<SubscriberInner>,
}

struct SubscriberInner {
    transport: JsonRpcTransport,
    /// Edges keyed by qualified id (`"edge0"`), in discovery order.
    /// Populated once during connect, never mutated afterwards.
    edges: IndexMap<String, EdgeEntry>,
}

impl Subscriber {
    /// Connects, authenticates and fetches every edge's channel catalog.
    ///
    /// The configurations are requested sequentially, one edge at a time,
    /// in the order the backend listed them.
    ///
    /// # Errors
    ///
    /// - [`Error::Auth`] if the backend rejects the password.
    /// - [`Error::Protocol`] / [`Error::Parse`] for connection faults and
    ///   malformed catalogs; any configuration fetch failure is fatal.
    pub async fn connect(config: &SubscriberConfig) -> Result<Self> {
        let transport = JsonRpcTransport::connect(config.url()).await?;

        // Benign race: the backend may reject a stale session id while the
        // password login is in flight. Must not be treated as an error.
        transport.register(AUTHENTICATED_WITH_SESSION_ID_FAILED, |_params| Ok(()));

        tracing::info!("authenticating");
        let result = match transport
            .request(authenticate_with_password(config.password()))
            .await
        {
            Ok(result) => result,
            Err(Error::Remote(error)) => return Err(Error::Auth(error)),
            Err(e) => return Err(e),
        };
        let response = AuthenticateResponse::from_result(result).map_err(Error::Parse)?;

        tracing::info!(
            edges = response.edges.len(),
            ids = ?response.edges.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(),
            "authenticated"
        );

        let mut edges = IndexMap::new();
        for metadata in response.edges {
            let edge_id = metadata.id.clone();
            tracing::info!(edge = %edge_id, "requesting edge configuration");

            let result = transport
                .request(edge_rpc(&edge_id, get_edge_config()))
                .await?;
            let payload = unwrap_edge_rpc_result(result)?;
            let edge_config = EdgeConfig::from_value(payload).map_err(Error::Parse)?;

            tracing::info!(
                edge = %edge_id,
                components = edge_config.component_count(),
                "received edge configuration"
            );

            let edge = Edge::new(metadata, edge_config);
            let registry = SubscriptionRegistry::new(&edge_id, transport.clone());
            edges.insert(edge.qualified_prefix(), EdgeEntry { edge, registry });
        }

        Ok(Self {
            inner: Arc::new(SubscriberInner { transport, edges }),
        })
    }

    // =========================================================================
    // Catalog introspection
    // =========================================================================

    /// Returns the qualified edge ids (`"edge0"`, …) in discovery order.
    #[must_use]
    pub fn edges(&self) -> Vec<String> {
        self.inner.edges.keys().cloned().collect()
    }

    /// Returns the component ids of an edge, in configuration order.
    ///
    /// Unknown edges yield an empty list, never an error.
    #[must_use]
    pub fn edge_components(&self, edge: &str) -> Vec<String> {
        self.inner
            .edges
            .get(edge)
            .map(|entry| {
                entry
                    .edge
                    .config()
                    .component_ids()
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the channel ids of a component, in configuration order.
    ///
    /// Unknown edges or components yield an empty list, never an error.
    #[must_use]
    pub fn component_channels(&self, edge: &str, component: &str) -> Vec<String> {
        self.inner
            .edges
            .get(edge)
            .and_then(|entry| entry.edge.config().component(component))
            .map(|component| component.channels.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Returns the channel catalog of an edge.
    #[must_use]
    pub fn edge_config(&self, edge: &str) -> Option<&EdgeConfig> {
        self.inner.edges.get(edge).map(|entry| entry.edge.config())
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// Subscribes to every catalog entry the filter matches.
    ///
    /// The filter is evaluated over the full catalog once, here; per update
    /// only the resulting match set is consulted, so metadata-inspecting
    /// filters cost nothing on the hot path. For every matching update the
    /// consumer receives the fully-qualified path and the raw value, in
    /// arrival order.
    ///
    /// Returns the fully-qualified paths of all matched channels.
    ///
    /// # Errors
    ///
    /// Propagates transport and remote errors from the subscription
    /// replace requests.
    pub async fn subscribe<F>(&self, filter: &ChannelFilter, consume: F) -> Result<Vec<String>>
    where
        F: Fn(&str, &Value) + Send + Sync + 'static,
    {
        let consume: Arc<ConsumeFn> = Arc::new(consume);
        let mut all_paths = Vec::new();

        for (qualified, entry) in &self.inner.edges {
            let matched = match_catalog(qualified, entry.edge.config(), filter);

            tracing::info!(
                edge = %qualified,
                channels = matched.len(),
                "requesting subscriptions"
            );

            // The forwarder goes in first: the backend may start pushing
            // the moment it acknowledges the replace request.
            all_paths.extend(matched.iter().map(|a| format!("{qualified}/{a}")));
            self.register_current_data_handler(entry, matched.clone(), Arc::clone(&consume));

            entry.registry.add(&matched).await?;
        }

        Ok(all_paths)
    }

    /// Releases the filter's hold on every matching channel.
    ///
    /// Mirrors [`subscribe`](Self::subscribe) with a registry removal. The
    /// notification handlers registered by `subscribe` stay in place for
    /// the transport's lifetime; a channel that left the registry stops
    /// being pushed by the remote, so its updates are simply never
    /// forwarded again.
    ///
    /// Returns the fully-qualified paths of all matched channels.
    ///
    /// # Errors
    ///
    /// Propagates transport and remote errors from the subscription
    /// replace requests.
    pub async fn unsubscribe(&self, filter: &ChannelFilter) -> Result<Vec<String>> {
        let mut all_paths = Vec::new();

        for (qualified, entry) in &self.inner.edges {
            let matched = match_catalog(qualified, entry.edge.config(), filter);
            entry.registry.remove(&matched).await?;
            all_paths.extend(matched.iter().map(|a| format!("{qualified}/{a}")));
        }

        Ok(all_paths)
    }

    /// One-shot read of every channel the filter matches.
    ///
    /// Subscribes, waits until each matched channel reported at least one
    /// value, unsubscribes, and returns the accumulated map keyed by
    /// fully-qualified path. Each entry holds the last value observed
    /// before completion. A filter matching nothing resolves immediately
    /// with an empty map.
    ///
    /// # Errors
    ///
    /// Propagates subscription errors, and fails with
    /// [`ProtocolError::ConnectionClosed`] if the connection dies before
    /// all values arrived.
    pub async fn get(&self, filter: &ChannelFilter) -> Result<HashMap<String, Value>> {
        let collected = Arc::new(Mutex::new(HashMap::new()));
        let (progress_tx, mut progress_rx) = watch::channel(());

        let matched = {
            let collected = Arc::clone(&collected);
            self.subscribe(filter, move |path, value| {
                collected.lock().insert(path.to_string(), value.clone());
                let _ = progress_tx.send(());
            })
            .await?
        };

        let expected = matched.len();
        if expected > 0 {
            loop {
                if collected.lock().len() >= expected {
                    break;
                }
                tokio::select! {
                    changed = progress_rx.changed() => {
                        if changed.is_err() {
                            return Err(ProtocolError::ConnectionClosed.into());
                        }
                    }
                    () = self.inner.transport.closed() => {
                        return Err(ProtocolError::ConnectionClosed.into());
                    }
                }
            }
        }

        self.unsubscribe(filter).await?;

        let values = collected.lock().clone();
        Ok(values)
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Returns `true` while the connection is up.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.transport.is_open()
    }

    /// Closes the connection. Best-effort and idempotent.
    pub async fn close(&self) {
        self.inner.transport.close().await;
    }

    /// Resolves once the connection has been torn down, for any reason.
    pub async fn closed(&self) {
        self.inner.transport.closed().await;
    }

    /// Registers the current-data forwarder for one subscribe call.
    fn register_current_data_handler(
        &self,
        entry: &EdgeEntry,
        matched: BTreeSet<ChannelAddress>,
        consume: Arc<ConsumeFn>,
    ) {
        let edge_id = entry.edge.id().to_string();
        let prefix = entry.edge.qualified_prefix();

        let predicate = {
            let edge_id = edge_id.clone();
            move |params: &Value| {
                params["edgeId"] == edge_id.as_str()
                    && params["payload"]["method"] == CURRENT_DATA
            }
        };

        let handler = move |params: &Value| -> Result<()> {
            let notification: EdgeRpcNotification =
                serde_json::from_value(params.clone()).map_err(ParseError::Json)?;

            let Value::Object(channels) = notification.payload.params else {
                return Err(ParseError::MissingField("params".to_string()).into());
            };

            for (path, value) in &channels {
                let address: ChannelAddress = path.parse().map_err(Error::Parse)?;
                if matched.contains(&address) {
                    consume(&format!("{prefix}/{path}"), value);
                }
            }
            Ok(())
        };

        self.inner
            .transport
            .register_filtered(EDGE_RPC, predicate, handler);
    }
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("edges", &self.inner.edges.len())
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Evaluates a filter over one edge's catalog and returns the match set.
fn match_catalog(
    qualified: &str,
    config: &EdgeConfig,
    filter: &ChannelFilter,
) -> BTreeSet<ChannelAddress> {
    config
        .channels()
        .filter(|(address, detail)| {
            filter.matches(
                qualified,
                address.component_id(),
                address.channel_id(),
                detail,
            )
        })
        .map(|(address, _)| address)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_config() -> EdgeConfig {
        EdgeConfig::from_value(json!({
            "components": {
                "_sum": {
                    "channels": {
                        "EssSoc": {"type": "INTEGER"},
                        "EssActivePower": {"type": "INTEGER"},
                    },
                },
                "meter0": {
                    "channels": {
                        "ActivePower": {"type": "INTEGER"},
                    },
                },
            },
        }))
        .unwrap()
    }

    #[test]
    fn match_catalog_applies_filter_per_entry() {
        let config = sample_config();
        let matched = match_catalog("edge0", &config, &ChannelFilter::sum());

        assert_eq!(matched.len(), 2);
        assert!(matched.contains(&ChannelAddress::new("_sum", "EssSoc")));
        assert!(matched.contains(&ChannelAddress::new("_sum", "EssActivePower")));
    }

    #[test]
    fn match_catalog_sees_qualified_edge_id() {
        let config = sample_config();

        let matched = match_catalog(
            "edge0",
            &config,
            &ChannelFilter::exactly("edge0", "meter0", "ActivePower"),
        );
        assert_eq!(matched.len(), 1);

        let other_edge = match_catalog(
            "edge1",
            &config,
            &ChannelFilter::exactly("edge0", "meter0", "ActivePower"),
        );
        assert!(other_edge.is_empty());
    }
}
