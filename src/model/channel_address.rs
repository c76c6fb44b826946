// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Channel addressing.
//!
//! A channel lives on a component of an edge device. On the wire and in the
//! catalog its canonical string form is `componentId/channelId`; the
//! `subscribeChannels` request serializes it as a
//! `{componentId, channelId}` object.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Address of a single data point: a channel on a component.
///
/// Immutable once constructed. Equality, hashing and ordering all follow
/// the canonical `componentId/channelId` form, so sets and maps keyed by
/// addresses behave like sets of canonical strings.
///
/// # Examples
///
/// ```
/// use emsor_lib::model::ChannelAddress;
///
/// let address = ChannelAddress::new("meter0", "ActivePower");
/// assert_eq!(address.to_string(), "meter0/ActivePower");
///
/// let parsed: ChannelAddress = "meter0/ActivePower".parse().unwrap();
/// assert_eq!(parsed, address);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelAddress {
    component_id: String,
    channel_id: String,
}

impl ChannelAddress {
    /// Creates an address from its two parts.
    #[must_use]
    pub fn new(component_id: impl Into<String>, channel_id: impl Into<String>) -> Self {
        Self {
            component_id: component_id.into(),
            channel_id: channel_id.into(),
        }
    }

    /// Returns the component id, e.g. `"meter0"`.
    #[must_use]
    pub fn component_id(&self) -> &str {
        &self.component_id
    }

    /// Returns the channel id, e.g. `"ActivePower"`.
    #[must_use]
    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }
}

impl fmt::Display for ChannelAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.component_id, self.channel_id)
    }
}

impl FromStr for ChannelAddress {
    type Err = ParseError;

    /// Parses the canonical `componentId/channelId` form.
    ///
    /// Anything that does not split into exactly two non-empty segments is
    /// a data-contract violation and fails fast.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split('/').collect::<Vec<_>>().as_slice() {
            [component, channel] if !component.is_empty() && !channel.is_empty() => {
                Ok(Self::new(*component, *channel))
            }
            _ => Err(ParseError::InvalidChannelAddress(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_canonical_form() {
        let address = ChannelAddress::new("_sum", "EssSoc");
        assert_eq!(address.to_string(), "_sum/EssSoc");
    }

    #[test]
    fn parse_roundtrip() {
        let address: ChannelAddress = "meter0/ActivePower".parse().unwrap();
        assert_eq!(address.component_id(), "meter0");
        assert_eq!(address.channel_id(), "ActivePower");
        assert_eq!(address.to_string(), "meter0/ActivePower");
    }

    #[test]
    fn parse_rejects_missing_separator() {
        let result = "ActivePower".parse::<ChannelAddress>();
        assert!(matches!(
            result,
            Err(ParseError::InvalidChannelAddress(_))
        ));
    }

    #[test]
    fn parse_rejects_extra_segments() {
        assert!("a/b/c".parse::<ChannelAddress>().is_err());
    }

    #[test]
    fn parse_rejects_empty_segments() {
        assert!("/ActivePower".parse::<ChannelAddress>().is_err());
        assert!("meter0/".parse::<ChannelAddress>().is_err());
    }

    #[test]
    fn serializes_as_object() {
        let address = ChannelAddress::new("meter0", "ActivePower");
        let value = serde_json::to_value(&address).unwrap();
        assert_eq!(value["componentId"], "meter0");
        assert_eq!(value["channelId"], "ActivePower");
    }

    #[test]
    fn ordering_follows_canonical_form() {
        let mut addresses = vec![
            ChannelAddress::new("meter1", "ActivePower"),
            ChannelAddress::new("_sum", "EssSoc"),
            ChannelAddress::new("meter0", "Voltage"),
        ];
        addresses.sort();
        assert_eq!(addresses[0].component_id(), "_sum");
        assert_eq!(addresses[1].component_id(), "meter0");
        assert_eq!(addresses[2].component_id(), "meter1");
    }
}
