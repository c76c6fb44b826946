// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `EmsoR` Lib - A Rust library to subscribe to OpenEMS devices.
//!
//! This library connects to an OpenEMS energy-management installation over
//! a persistent JSON-RPC-on-WebSocket connection, authenticates, fetches
//! each edge device's channel catalog, and exposes named, deduplicated
//! value updates to consumers.
//!
//! # Supported Features
//!
//! - **Channel subscriptions**: filter the catalog, receive pushed updates
//!   per channel with reference-counted membership
//! - **Catalog introspection**: enumerate edges, components and channels
//!   with their metadata
//! - **One-shot reads**: collect the current value of a channel set
//! - **Derived values**: change-detecting bindings for mapped and combined
//!   outputs (battery level, consumption, fault state, …)
//! - **Reconnection**: fixed-delay driver that rebuilds the whole stack on
//!   any transport failure
//!
//! # Quick Start
//!
//! ```no_run
//! use emsor_lib::{Subscriber, SubscriberConfig};
//! use emsor_lib::subscription::ChannelFilter;
//!
//! #[tokio::main]
//! async fn main() -> emsor_lib::Result<()> {
//!     let config = SubscriberConfig::builder()
//!         .url("ws://192.168.1.20:8085/websocket")
//!         .password("user")
//!         .build()?;
//!
//!     let subscriber = Subscriber::connect(&config).await?;
//!
//!     // Everything the aggregating "_sum" component reports:
//!     subscriber
//!         .subscribe(&ChannelFilter::sum(), |path, value| {
//!             println!("{path} = {value}");
//!         })
//!         .await?;
//!
//!     subscriber.closed().await;
//!     Ok(())
//! }
//! ```
//!
//! # One-Shot Reads
//!
//! ```no_run
//! use emsor_lib::{Subscriber, SubscriberConfig};
//! use emsor_lib::subscription::ChannelFilter;
//!
//! # async fn example(subscriber: Subscriber) -> emsor_lib::Result<()> {
//! let soc = subscriber
//!     .get(&ChannelFilter::exactly("edge0", "_sum", "EssSoc"))
//!     .await?;
//!
//! println!("state of charge: {:?}", soc.get("edge0/_sum/EssSoc"));
//! # Ok(())
//! # }
//! ```
//!
//! # Reconnection
//!
//! A transport fault is fatal to a `Subscriber`; recovery means building a
//! new one. [`ReconnectRunner`] does this in a fixed-delay loop:
//!
//! ```no_run
//! use emsor_lib::{ReconnectRunner, SubscriberConfig};
//! use emsor_lib::subscription::ChannelFilter;
//!
//! # async fn example(config: SubscriberConfig) {
//! ReconnectRunner::new(config)
//!     .run(|subscriber| async move {
//!         subscriber
//!             .subscribe(&ChannelFilter::sum(), |path, value| {
//!                 println!("{path} = {value}");
//!             })
//!             .await?;
//!         Ok(())
//!     })
//!     .await;
//! # }
//! ```

mod binding;
mod config;
pub mod error;
pub mod model;
pub mod protocol;
mod runner;
mod subscriber;
pub mod subscription;

pub use binding::{Binding, CombinedBinding, MappedBinding};
pub use config::{SubscriberConfig, SubscriberConfigBuilder};
pub use error::{Error, ParseError, ProtocolError, Result};
pub use model::{ChannelAddress, ChannelDetail, Edge, EdgeConfig};
pub use protocol::{JsonRpcTransport, RpcError};
pub use runner::ReconnectRunner;
pub use subscriber::Subscriber;
pub use subscription::{ChannelFilter, SubscriptionRegistry};
