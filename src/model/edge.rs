// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Edge device records.

use crate::model::EdgeConfig;
use crate::protocol::requests::EdgeMetadata;

/// A remote energy-management device together with its channel catalog.
///
/// Edges are discovered during authentication; the catalog is attached
/// exactly once, after the per-device configuration fetch, and neither is
/// mutated afterwards.
#[derive(Debug, Clone)]
pub struct Edge {
    metadata: EdgeMetadata,
    config: EdgeConfig,
}

impl Edge {
    /// Pairs the discovery metadata with the fetched catalog.
    #[must_use]
    pub fn new(metadata: EdgeMetadata, config: EdgeConfig) -> Self {
        Self { metadata, config }
    }

    /// Returns the edge id, e.g. `"0"`.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    /// Returns the discovery metadata.
    #[must_use]
    pub fn metadata(&self) -> &EdgeMetadata {
        &self.metadata
    }

    /// Returns the channel catalog.
    #[must_use]
    pub fn config(&self) -> &EdgeConfig {
        &self.config
    }

    /// Returns the externally visible channel path prefix, e.g. `"edge0"`.
    #[must_use]
    pub fn qualified_prefix(&self) -> String {
        format!("edge{}", self.metadata.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualified_prefix_includes_id() {
        let metadata = EdgeMetadata {
            id: "0".to_string(),
            comment: None,
            producttype: None,
            online: Some(true),
        };
        let edge = Edge::new(metadata, EdgeConfig::default());
        assert_eq!(edge.qualified_prefix(), "edge0");
        assert_eq!(edge.id(), "0");
    }
}
