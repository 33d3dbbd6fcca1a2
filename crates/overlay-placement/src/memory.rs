use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use overlay_types::{Anchor, NodeHandle, NormalizedPoint};

use crate::error::SceneError;
use crate::traits::{SceneAttacher, SurfaceHitTester};

/// Hit tester that answers every query the same way and records the
/// points it was asked about.
#[derive(Debug)]
pub struct FixedHitTester {
    anchor: Mutex<Option<Anchor>>,
    queries: Mutex<Vec<NormalizedPoint>>,
}

impl FixedHitTester {
    /// Every query hits `anchor`.
    pub fn hit(anchor: Anchor) -> Self {
        Self {
            anchor: Mutex::new(Some(anchor)),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Every query misses.
    pub fn miss() -> Self {
        Self {
            anchor: Mutex::new(None),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Change the answer for subsequent queries.
    pub fn set(&self, anchor: Option<Anchor>) {
        *self.anchor.lock().expect("lock poisoned") = anchor;
    }

    /// Points queried so far, in order.
    pub fn queries(&self) -> Vec<NormalizedPoint> {
        self.queries.lock().expect("lock poisoned").clone()
    }
}

impl SurfaceHitTester for FixedHitTester {
    fn hit_test(&self, point: NormalizedPoint) -> Option<Anchor> {
        self.queries.lock().expect("lock poisoned").push(point);
        *self.anchor.lock().expect("lock poisoned")
    }
}

/// One call observed by a [`RecordingScene`].
#[derive(Clone, Debug, PartialEq)]
pub enum SceneEvent {
    Attached { node: u64, anchor: Anchor, scale: f32 },
    Detached { node: u64 },
}

/// Scene attacher that records every attach/detach in call order.
///
/// Node handles are numbered from 1. Attachments can be made to fail with
/// [`RecordingScene::reject_attachments`].
pub struct RecordingScene<A> {
    events: Mutex<Vec<SceneEvent>>,
    live: Mutex<BTreeSet<u64>>,
    attached_assets: Mutex<Vec<Arc<A>>>,
    next_node: AtomicU64,
    reject: AtomicBool,
}

impl<A> RecordingScene<A> {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            live: Mutex::new(BTreeSet::new()),
            attached_assets: Mutex::new(Vec::new()),
            next_node: AtomicU64::new(1),
            reject: AtomicBool::new(false),
        }
    }

    /// Make subsequent attachments fail (`true`) or succeed (`false`).
    pub fn reject_attachments(&self, reject: bool) {
        self.reject.store(reject, Ordering::SeqCst);
    }

    pub fn events(&self) -> Vec<SceneEvent> {
        self.events.lock().expect("lock poisoned").clone()
    }

    /// Nodes attached and not yet detached.
    pub fn live_nodes(&self) -> Vec<u64> {
        self.live.lock().expect("lock poisoned").iter().copied().collect()
    }

    pub fn attach_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, SceneEvent::Attached { .. }))
            .count()
    }

    pub fn detach_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, SceneEvent::Detached { .. }))
            .count()
    }

    /// Assets passed to `attach`, in call order.
    pub fn attached_assets(&self) -> Vec<Arc<A>> {
        self.attached_assets.lock().expect("lock poisoned").clone()
    }
}

impl<A> Default for RecordingScene<A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Send + Sync> SceneAttacher<A> for RecordingScene<A> {
    fn attach(
        &self,
        asset: &Arc<A>,
        anchor: &Anchor,
        scale: f32,
    ) -> Result<NodeHandle, SceneError> {
        if self.reject.load(Ordering::SeqCst) {
            return Err(SceneError::Rejected("attachments disabled".into()));
        }
        let node = self.next_node.fetch_add(1, Ordering::SeqCst);
        self.events.lock().expect("lock poisoned").push(SceneEvent::Attached {
            node,
            anchor: *anchor,
            scale,
        });
        self.live.lock().expect("lock poisoned").insert(node);
        self.attached_assets
            .lock()
            .expect("lock poisoned")
            .push(Arc::clone(asset));
        Ok(NodeHandle::from_raw(node))
    }

    fn detach(&self, handle: NodeHandle) {
        let node = handle.raw();
        self.events
            .lock()
            .expect("lock poisoned")
            .push(SceneEvent::Detached { node });
        self.live.lock().expect("lock poisoned").remove(&node);
    }
}

impl<A> std::fmt::Debug for RecordingScene<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let live = self.live.lock().map(|l| l.len()).unwrap_or(0);
        f.debug_struct("RecordingScene")
            .field("live_nodes", &live)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_hit_tester_records_queries() {
        let tester = FixedHitTester::hit(Anchor::from_raw(3));
        assert_eq!(tester.hit_test(NormalizedPoint::center()), Some(Anchor::from_raw(3)));
        tester.set(None);
        assert_eq!(tester.hit_test(NormalizedPoint::clamped(0.1, 0.9)), None);
        assert_eq!(tester.queries().len(), 2);
        assert!(FixedHitTester::miss().hit_test(NormalizedPoint::center()).is_none());
    }

    #[test]
    fn recording_scene_tracks_live_nodes() {
        let scene = RecordingScene::<u8>::new();
        let asset = Arc::new(1u8);
        let a = scene.attach(&asset, &Anchor::from_raw(1), 0.5).unwrap();
        let b = scene.attach(&asset, &Anchor::from_raw(2), 0.5).unwrap();
        assert_eq!(scene.live_nodes(), vec![1, 2]);

        scene.detach(a);
        assert_eq!(scene.live_nodes(), vec![2]);
        assert_eq!(scene.events().last(), Some(&SceneEvent::Detached { node: 1 }));

        scene.reject_attachments(true);
        assert!(scene.attach(&asset, &Anchor::from_raw(3), 0.5).is_err());
        scene.detach(b);
        assert!(scene.live_nodes().is_empty());
        assert_eq!(scene.attach_count(), 2);
        assert_eq!(scene.detach_count(), 2);
    }
}
