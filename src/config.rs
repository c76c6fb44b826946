// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection configuration for a [`Subscriber`](crate::Subscriber).

use std::time::Duration;

use url::Url;

use crate::error::{ProtocolError, Result};

/// Default password of the local OpenEMS frontend.
const DEFAULT_PASSWORD: &str = "user";

/// Default delay between reconnection attempts.
const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Configuration for connecting to an OpenEMS installation.
///
/// # Examples
///
/// ```
/// use emsor_lib::SubscriberConfig;
/// use std::time::Duration;
///
/// let config = SubscriberConfig::builder()
///     .url("ws://192.168.1.20:8085/websocket")
///     .password("owner")
///     .reconnect_delay(Duration::from_secs(10))
///     .build()
///     .unwrap();
///
/// assert_eq!(config.url().scheme(), "ws");
/// ```
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    url: Url,
    password: String,
    reconnect_delay: Duration,
}

impl SubscriberConfig {
    /// Creates a new builder.
    #[must_use]
    pub fn builder() -> SubscriberConfigBuilder {
        SubscriberConfigBuilder::default()
    }

    /// Returns the WebSocket endpoint.
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the frontend password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Returns the delay between reconnection attempts.
    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }
}

/// Builder for [`SubscriberConfig`].
#[derive(Debug, Default)]
pub struct SubscriberConfigBuilder {
    url: Option<String>,
    password: Option<String>,
    reconnect_delay: Option<Duration>,
}

impl SubscriberConfigBuilder {
    /// Sets the WebSocket endpoint, e.g. `ws://192.168.1.20:8085/websocket`.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Sets the frontend password (default: `"user"`).
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets the delay between reconnection attempts (default: 5 seconds).
    #[must_use]
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = Some(delay);
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidEndpoint`] if the URL is missing,
    /// unparseable, or not a `ws`/`wss` endpoint.
    pub fn build(self) -> Result<SubscriberConfig> {
        let raw = self
            .url
            .ok_or_else(|| ProtocolError::InvalidEndpoint("url is required".to_string()))?;
        let url =
            Url::parse(&raw).map_err(|e| ProtocolError::InvalidEndpoint(format!("{raw}: {e}")))?;
        if url.scheme() != "ws" && url.scheme() != "wss" {
            return Err(ProtocolError::InvalidEndpoint(raw).into());
        }

        Ok(SubscriberConfig {
            url,
            password: self.password.unwrap_or_else(|| DEFAULT_PASSWORD.to_string()),
            reconnect_delay: self.reconnect_delay.unwrap_or(DEFAULT_RECONNECT_DELAY),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let config = SubscriberConfig::builder()
            .url("ws://localhost:8085/websocket")
            .build()
            .unwrap();

        assert_eq!(config.password(), "user");
        assert_eq!(config.reconnect_delay(), Duration::from_secs(5));
    }

    #[test]
    fn builder_missing_url_fails() {
        let result = SubscriberConfig::builder().build();
        assert!(result.is_err());
    }

    #[test]
    fn builder_rejects_http_scheme() {
        let result = SubscriberConfig::builder()
            .url("http://localhost:8085/websocket")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn builder_accepts_wss() {
        let config = SubscriberConfig::builder()
            .url("wss://ems.example.net/websocket")
            .password("owner")
            .build()
            .unwrap();
        assert_eq!(config.url().scheme(), "wss");
        assert_eq!(config.password(), "owner");
    }
}
