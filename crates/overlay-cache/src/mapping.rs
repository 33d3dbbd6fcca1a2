use std::collections::BTreeMap;

use overlay_types::ResourceKey;
use serde::{Deserialize, Serialize};

/// Default model used for categories that have no entry of their own.
pub const DEFAULT_MODEL: &str = "default.glb";

/// Immutable mapping from detection category labels to model keys.
///
/// Lookups never fail: labels without an entry resolve to the designated
/// default key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryMapping {
    default: ResourceKey,
    entries: BTreeMap<String, ResourceKey>,
}

impl CategoryMapping {
    /// A mapping with no entries; every label resolves to `default`.
    pub fn new(default: impl Into<ResourceKey>) -> Self {
        Self {
            default: default.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, category: impl Into<String>, key: impl Into<ResourceKey>) -> Self {
        self.entries.insert(category.into(), key.into());
        self
    }

    /// Resolve a category label to its model key, falling back to the default.
    pub fn resolve(&self, category: &str) -> &ResourceKey {
        self.entries.get(category).unwrap_or(&self.default)
    }

    /// Returns `true` if the label has an explicit entry.
    pub fn is_mapped(&self, category: &str) -> bool {
        self.entries.contains_key(category)
    }

    pub fn default_key(&self) -> &ResourceKey {
        &self.default
    }

    /// Explicit entries in label order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &ResourceKey)> {
        self.entries.iter().map(|(label, key)| (label.as_str(), key))
    }

    /// Every distinct key this mapping can resolve to, default included.
    pub fn keys(&self) -> Vec<ResourceKey> {
        let mut keys: Vec<ResourceKey> = self.entries.values().cloned().collect();
        keys.push(self.default.clone());
        keys.sort();
        keys.dedup();
        keys
    }
}

impl Default for CategoryMapping {
    /// Household furniture detected by COCO-style object models.
    fn default() -> Self {
        Self::new(DEFAULT_MODEL)
            .with("chair", "chair.glb")
            .with("couch", "sofa.glb")
            .with("bed", "bed.glb")
            .with("dining table", "table.glb")
            .with("tv", "tv.glb")
            .with("potted plant", "plant.glb")
    }
}
