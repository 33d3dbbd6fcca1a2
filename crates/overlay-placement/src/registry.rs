use std::collections::HashMap;

use overlay_types::{Anchor, NodeHandle, PlacementId};
use serde::Serialize;

/// A live placement: one attached model and the handle that releases it.
#[derive(Debug)]
pub(crate) struct Placement {
    pub(crate) id: PlacementId,
    pub(crate) category: String,
    pub(crate) anchor: Anchor,
    pub(crate) scale: f32,
    pub(crate) handle: NodeHandle,
}

impl Placement {
    pub(crate) fn summary(&self) -> PlacementSummary {
        PlacementSummary {
            id: self.id.clone(),
            category: self.category.clone(),
            anchor: self.anchor,
            scale: self.scale,
            node: self.handle.raw(),
        }
    }
}

/// Read-only snapshot of a placement.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PlacementSummary {
    pub id: PlacementId,
    pub category: String,
    pub anchor: Anchor,
    pub scale: f32,
    pub node: u64,
}

/// Placements keyed by id. Holds handles only; releasing them is the
/// coordinator's job.
#[derive(Debug, Default)]
pub(crate) struct PlacementRegistry {
    entries: HashMap<PlacementId, Placement>,
}

impl PlacementRegistry {
    /// Insert a placement whose id is known to be vacant.
    pub(crate) fn insert(&mut self, placement: Placement) {
        let previous = self.entries.insert(placement.id.clone(), placement);
        debug_assert!(previous.is_none(), "placement inserted over a live entry");
    }

    pub(crate) fn remove(&mut self, id: &PlacementId) -> Option<Placement> {
        self.entries.remove(id)
    }

    pub(crate) fn drain(&mut self) -> Vec<Placement> {
        self.entries.drain().map(|(_, placement)| placement).collect()
    }

    pub(crate) fn contains(&self, id: &PlacementId) -> bool {
        self.entries.contains_key(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Summaries sorted by id.
    pub(crate) fn summaries(&self) -> Vec<PlacementSummary> {
        let mut summaries: Vec<PlacementSummary> =
            self.entries.values().map(Placement::summary).collect();
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }
}
