// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The per-device channel catalog.
//!
//! A [`EdgeConfig`] is built once from the raw `getEdgeConfig` result and
//! never mutated afterwards. It answers two questions: does a given channel
//! exist on a given component, and what does the full channel enumeration
//! look like. Iteration order is the configuration order the backend
//! reported, which is why the maps are `IndexMap`s.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::error::ParseError;
use crate::model::ChannelAddress;

/// Metadata of a single channel, as reported by the backend.
///
/// Every field is optional on the wire; absent metadata is represented as
/// `None` rather than failing the catalog parse.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelDetail {
    /// Value type, e.g. `"INTEGER"` or `"STRING"`.
    #[serde(rename = "type", default)]
    pub channel_type: Option<String>,
    /// Access mode, e.g. `"RO"` or `"RW"`.
    #[serde(default)]
    pub access_mode: Option<String>,
    /// Human-readable description.
    #[serde(default)]
    pub text: Option<String>,
    /// Physical unit, e.g. `"W"` or `"%"`.
    #[serde(default)]
    pub unit: Option<String>,
    /// Channel category, e.g. `"STATE_CHANNEL"`.
    #[serde(default)]
    pub category: Option<String>,
}

/// A component of an edge device and its channels.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    /// Id of the factory this component was instantiated from.
    #[serde(default)]
    pub factory_id: Option<String>,
    /// Display alias configured on the backend.
    #[serde(default)]
    pub alias: Option<String>,
    /// Raw component properties.
    #[serde(default)]
    pub properties: IndexMap<String, Value>,
    /// Channels keyed by channel id, in configuration order.
    #[serde(default)]
    pub channels: IndexMap<String, ChannelDetail>,
}

/// Factory metadata from the catalog.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Factory {
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Description text.
    #[serde(default)]
    pub description: Option<String>,
    /// Nature ids the factory implements.
    #[serde(default)]
    pub natures: Vec<String>,
}

/// The full channel catalog of one edge device.
///
/// Immutable after construction; owned by the edge entry that requested it.
#[derive(Debug, Clone, Default)]
pub struct EdgeConfig {
    components: IndexMap<String, Component>,
    factories: IndexMap<String, Factory>,
}

#[derive(Debug, Deserialize)]
struct RawEdgeConfig {
    #[serde(default)]
    components: IndexMap<String, Component>,
    #[serde(default)]
    factories: IndexMap<String, Factory>,
}

impl EdgeConfig {
    /// Parses the raw `getEdgeConfig` result into a catalog.
    ///
    /// # Errors
    ///
    /// - [`ParseError::Json`] if the payload does not match the catalog
    ///   shape.
    /// - [`ParseError::InvalidChannelAddress`] if a component or channel id
    ///   contains a `/`; such an id could never round-trip through the
    ///   `componentId/channelId` wire form, so it is rejected up front.
    pub fn from_value(raw: Value) -> Result<Self, ParseError> {
        let raw: RawEdgeConfig = serde_json::from_value(raw)?;

        for (component_id, component) in &raw.components {
            if component_id.contains('/') {
                return Err(ParseError::InvalidChannelAddress(component_id.clone()));
            }
            for channel_id in component.channels.keys() {
                if channel_id.contains('/') {
                    return Err(ParseError::InvalidChannelAddress(format!(
                        "{component_id}/{channel_id}"
                    )));
                }
            }
        }

        Ok(Self {
            components: raw.components,
            factories: raw.factories,
        })
    }

    /// Looks up a component by id.
    #[must_use]
    pub fn component(&self, component_id: &str) -> Option<&Component> {
        self.components.get(component_id)
    }

    /// Looks up a factory by id.
    #[must_use]
    pub fn factory(&self, factory_id: &str) -> Option<&Factory> {
        self.factories.get(factory_id)
    }

    /// Returns the component ids in configuration order.
    pub fn component_ids(&self) -> impl Iterator<Item = &str> {
        self.components.keys().map(String::as_str)
    }

    /// Enumerates every channel of every component, in configuration order.
    ///
    /// The iterator is cheap to reconstruct; calling this repeatedly has no
    /// side effects.
    pub fn channels(&self) -> impl Iterator<Item = (ChannelAddress, &ChannelDetail)> {
        self.components.iter().flat_map(|(component_id, component)| {
            component.channels.iter().map(move |(channel_id, detail)| {
                (ChannelAddress::new(component_id, channel_id), detail)
            })
        })
    }

    /// Returns the number of components.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.components.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_config() -> Value {
        json!({
            "components": {
                "_sum": {
                    "factoryId": "Core.Sum",
                    "properties": {"enabled": true},
                    "channels": {
                        "EssSoc": {"type": "INTEGER", "accessMode": "RO", "unit": "%"},
                        "EssActivePower": {"type": "INTEGER", "unit": "W"},
                    },
                },
                "meter0": {
                    "factoryId": "Meter.Socomec",
                    "channels": {
                        "ActivePower": {"type": "INTEGER", "unit": "W"},
                    },
                },
            },
            "factories": {
                "Meter.Socomec": {
                    "name": "Socomec meter",
                    "natures": ["io.openems.edge.meter.api.SymmetricMeter"],
                },
            },
        })
    }

    #[test]
    fn parses_components_and_factories() {
        let config = EdgeConfig::from_value(sample_config()).unwrap();

        assert_eq!(config.component_count(), 2);
        let sum = config.component("_sum").unwrap();
        assert_eq!(sum.factory_id.as_deref(), Some("Core.Sum"));
        assert_eq!(sum.channels.len(), 2);

        let factory = config.factory("Meter.Socomec").unwrap();
        assert_eq!(factory.name.as_deref(), Some("Socomec meter"));
    }

    #[test]
    fn channels_iterate_in_configuration_order() {
        let config = EdgeConfig::from_value(sample_config()).unwrap();

        let paths: Vec<String> = config
            .channels()
            .map(|(address, _)| address.to_string())
            .collect();
        assert_eq!(
            paths,
            vec!["_sum/EssSoc", "_sum/EssActivePower", "meter0/ActivePower"]
        );
    }

    #[test]
    fn channels_is_restartable() {
        let config = EdgeConfig::from_value(sample_config()).unwrap();

        let first: Vec<_> = config.channels().map(|(a, _)| a).collect();
        let second: Vec<_> = config.channels().map(|(a, _)| a).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn channel_metadata_is_preserved() {
        let config = EdgeConfig::from_value(sample_config()).unwrap();

        let (_, detail) = config
            .channels()
            .find(|(address, _)| address.to_string() == "_sum/EssSoc")
            .unwrap();
        assert_eq!(detail.channel_type.as_deref(), Some("INTEGER"));
        assert_eq!(detail.access_mode.as_deref(), Some("RO"));
        assert_eq!(detail.unit.as_deref(), Some("%"));
    }

    #[test]
    fn rejects_component_id_with_slash() {
        let raw = json!({
            "components": {"bad/id": {"channels": {}}},
        });
        let result = EdgeConfig::from_value(raw);
        assert!(matches!(
            result,
            Err(ParseError::InvalidChannelAddress(_))
        ));
    }

    #[test]
    fn rejects_channel_id_with_slash() {
        let raw = json!({
            "components": {"meter0": {"channels": {"Active/Power": {}}}},
        });
        assert!(EdgeConfig::from_value(raw).is_err());
    }

    #[test]
    fn empty_payload_is_an_empty_catalog() {
        let config = EdgeConfig::from_value(json!({})).unwrap();
        assert_eq!(config.component_count(), 0);
        assert_eq!(config.channels().count(), 0);
    }
}
