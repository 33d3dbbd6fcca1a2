use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Scale applied to models whose category has no entry of its own.
pub const DEFAULT_SCALE: f32 = 0.5;

/// Immutable per-category uniform scale factors with a default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScaleTable {
    default: f32,
    entries: BTreeMap<String, f32>,
}

impl ScaleTable {
    pub fn new(default: f32) -> Self {
        Self {
            default,
            entries: BTreeMap::new(),
        }
    }

    /// Builder-style insert.
    pub fn with(mut self, category: impl Into<String>, scale: f32) -> Self {
        self.entries.insert(category.into(), scale);
        self
    }

    /// Scale for a category, falling back to the default.
    pub fn scale_for(&self, category: &str) -> f32 {
        self.entries.get(category).copied().unwrap_or(self.default)
    }

    pub fn default_scale(&self) -> f32 {
        self.default
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, f32)> {
        self.entries.iter().map(|(label, scale)| (label.as_str(), *scale))
    }
}

impl Default for ScaleTable {
    fn default() -> Self {
        Self::new(DEFAULT_SCALE)
            .with("chair", 0.5)
            .with("couch", 0.7)
            .with("bed", 0.8)
            .with("dining table", 0.6)
            .with("tv", 0.4)
            .with("potted plant", 0.3)
    }
}
