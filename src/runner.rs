// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The reconnect driver.
//!
//! Nothing inside the core retries: a transport fault is fatal to the whole
//! [`Subscriber`] instance. [`ReconnectRunner`] is the outer loop that
//! restores service — build the stack from scratch, hand it to the setup
//! callback, run until the connection dies, wait a fixed delay, repeat.
//! Retries are unbounded; every failure is logged and swallowed.

use std::future::Future;

use crate::config::SubscriberConfig;
use crate::error::Result;
use crate::subscriber::Subscriber;

/// Fixed-delay, unbounded reconnection loop around a [`Subscriber`].
///
/// # Examples
///
/// ```no_run
/// use emsor_lib::{ReconnectRunner, SubscriberConfig};
/// use emsor_lib::subscription::ChannelFilter;
///
/// # async fn example() -> emsor_lib::Result<()> {
/// let config = SubscriberConfig::builder()
///     .url("ws://192.168.1.20:8085/websocket")
///     .build()?;
///
/// ReconnectRunner::new(config)
///     .run(|subscriber| async move {
///         subscriber
///             .subscribe(&ChannelFilter::sum(), |path, value| {
///                 println!("{path} = {value}");
///             })
///             .await?;
///         Ok(())
///     })
///     .await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ReconnectRunner {
    config: SubscriberConfig,
}

impl ReconnectRunner {
    /// Creates a runner for the given configuration.
    #[must_use]
    pub fn new(config: SubscriberConfig) -> Self {
        Self { config }
    }

    /// Runs the connect → setup → wait-for-failure loop forever.
    ///
    /// `setup` is invoked once per successful connection with a fresh
    /// [`Subscriber`]; consumers place their subscriptions there. All state
    /// from the previous connection is discarded before each attempt.
    pub async fn run<F, Fut>(&self, setup: F) -> std::convert::Infallible
    where
        F: Fn(Subscriber) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        loop {
            match Subscriber::connect(&self.config).await {
                Ok(subscriber) => match setup(subscriber.clone()).await {
                    Ok(()) => {
                        subscriber.closed().await;
                        tracing::warn!("connection lost, rebuilding");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "subscription setup failed");
                        subscriber.close().await;
                    }
                },
                Err(e) => {
                    tracing::error!(error = %e, "connection attempt failed");
                }
            }

            tokio::time::sleep(self.config.reconnect_delay()).await;
        }
    }
}
