use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::stream::{FuturesUnordered, StreamExt};
use overlay_cache::{AssetLoader, ResourceLoader};
use overlay_types::{Anchor, Detection, PlacementId, TokenClock};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{OverlayConfig, MANUAL_CATEGORY};
use crate::error::{PlacementError, PlacementResult};
use crate::registry::{Placement, PlacementRegistry, PlacementSummary};
use crate::scale::ScaleTable;
use crate::traits::{SceneAttacher, SurfaceHitTester};

/// Outcome of one [`PlacementCoordinator::on_detections`] batch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DetectionReport {
    /// Detections in the batch.
    pub detections: usize,
    /// Placements created, in completion order.
    pub placed: Vec<PlacementId>,
    /// Detections whose center had no surface under it.
    pub no_surface: usize,
    /// Detections skipped for an unusable box, frame, or category list.
    pub invalid: usize,
    /// Placements abandoned because the model failed to load.
    pub abandoned: usize,
    /// Placements abandoned because the scene refused the model.
    pub attach_failed: usize,
}

/// Turns detections and taps into anchored models.
///
/// Keeps at most one live placement per [`PlacementId`]. Replacing an id
/// detaches the old node before the new one is attached, and the whole
/// replace runs under the registry lock. Scene callbacks are invoked while
/// that lock is held and must not call back into the coordinator.
///
/// Dropping the coordinator detaches every remaining placement.
pub struct PlacementCoordinator<A> {
    resources: Arc<ResourceLoader<A>>,
    hit_tester: Arc<dyn SurfaceHitTester>,
    scene: Arc<dyn SceneAttacher<A>>,
    scales: ScaleTable,
    manual_category: String,
    clock: TokenClock,
    registry: Mutex<PlacementRegistry>,
}

impl<A> PlacementCoordinator<A>
where
    A: Send + Sync + 'static,
{
    pub fn new(
        resources: Arc<ResourceLoader<A>>,
        hit_tester: Arc<dyn SurfaceHitTester>,
        scene: Arc<dyn SceneAttacher<A>>,
        scales: ScaleTable,
    ) -> Self {
        Self {
            resources,
            hit_tester,
            scene,
            scales,
            manual_category: MANUAL_CATEGORY.to_string(),
            clock: TokenClock::new(),
            registry: Mutex::new(PlacementRegistry::default()),
        }
    }

    /// Build a coordinator and its resource cache from configuration.
    pub fn from_config(
        config: &OverlayConfig,
        loader: Arc<dyn AssetLoader<A>>,
        hit_tester: Arc<dyn SurfaceHitTester>,
        scene: Arc<dyn SceneAttacher<A>>,
    ) -> Self {
        let resources = Arc::new(ResourceLoader::new(loader, config.category_mapping()));
        Self::new(resources, hit_tester, scene, config.scale_table())
            .with_manual_category(config.manual_category.clone())
    }

    /// Category label used by [`Self::on_manual_placement`].
    pub fn with_manual_category(mut self, category: impl Into<String>) -> Self {
        self.manual_category = category.into();
        self
    }

    /// Place a model for every detection that lands on a surface.
    ///
    /// Model loads run concurrently; placements happen in the order the
    /// loads finish. Individual failures are logged and counted in the
    /// report, never returned.
    pub async fn on_detections(
        &self,
        detections: &[Detection],
        frame_width: u32,
        frame_height: u32,
    ) -> DetectionReport {
        let mut report = DetectionReport {
            detections: detections.len(),
            ..DetectionReport::default()
        };
        if frame_width == 0 || frame_height == 0 {
            warn!(
                frame_width,
                frame_height,
                count = detections.len(),
                "skipping detections for an empty frame"
            );
            report.invalid = detections.len();
            return report;
        }

        let mut pending = FuturesUnordered::new();
        for detection in detections {
            let Some(point) = detection
                .bounding_box
                .normalized_center(frame_width, frame_height)
            else {
                debug!(
                    bounding_box = ?detection.bounding_box,
                    "skipping detection with invalid box"
                );
                report.invalid += 1;
                continue;
            };
            let Some(anchor) = self.hit_tester.hit_test(point) else {
                debug!(x = point.x, y = point.y, "no surface under detection");
                report.no_surface += 1;
                continue;
            };
            let Some(top) = detection.top_category() else {
                debug!(anchor = anchor.raw(), "skipping detection without a category");
                report.invalid += 1;
                continue;
            };

            let category = top.label.clone();
            let key = self.resources.resolve_category(&category).clone();
            let request = self.resources.request(key.clone());
            pending.push(async move { (category, anchor, key, request.await) });
        }

        while let Some((category, anchor, key, result)) = pending.next().await {
            let asset = match result {
                Ok(asset) => asset,
                Err(err) => {
                    warn!(category = %category, key = %key, error = %err, "abandoning placement");
                    report.abandoned += 1;
                    continue;
                }
            };
            let id = self.next_id(&category);
            match self.place(asset, anchor, &category, id.clone()) {
                Ok(()) => report.placed.push(id),
                Err(err) => {
                    warn!(category = %category, error = %err, "abandoning placement");
                    report.attach_failed += 1;
                }
            }
        }

        debug!(
            detections = report.detections,
            placed = report.placed.len(),
            no_surface = report.no_surface,
            invalid = report.invalid,
            abandoned = report.abandoned,
            attach_failed = report.attach_failed,
            "processed detection batch"
        );
        report
    }

    /// Place the manual-category model at a user-chosen anchor.
    pub async fn on_manual_placement(&self, anchor: Anchor) -> Option<PlacementId> {
        let category = self.manual_category.clone();
        let key = self.resources.resolve_category(&category).clone();
        let asset = match self.resources.request(key.clone()).await {
            Ok(asset) => asset,
            Err(err) => {
                warn!(
                    category = %category,
                    key = %key,
                    error = %err,
                    "abandoning manual placement"
                );
                return None;
            }
        };
        let id = self.next_id(&category);
        match self.place(asset, anchor, &category, id.clone()) {
            Ok(()) => Some(id),
            Err(err) => {
                warn!(category = %category, error = %err, "abandoning manual placement");
                None
            }
        }
    }

    /// Attach `asset` at `anchor` under `id`, replacing any live placement
    /// with the same id.
    ///
    /// If attaching fails the previous placement stays removed.
    pub fn place(
        &self,
        asset: Arc<A>,
        anchor: Anchor,
        category: &str,
        id: PlacementId,
    ) -> PlacementResult<()> {
        let scale = self.scales.scale_for(category);
        let mut registry = self.registry();

        if let Some(previous) = registry.remove(&id) {
            debug!(id = %id, node = previous.handle.raw(), "replacing placement");
            self.scene.detach(previous.handle);
        }

        let handle = self
            .scene
            .attach(&asset, &anchor, scale)
            .map_err(|source| PlacementError::Scene {
                id: id.clone(),
                source,
            })?;

        info!(
            id = %id,
            category,
            anchor = anchor.raw(),
            scale,
            node = handle.raw(),
            "placed model"
        );
        registry.insert(Placement {
            id,
            category: category.to_string(),
            anchor,
            scale,
            handle,
        });
        Ok(())
    }

    fn next_id(&self, category: &str) -> PlacementId {
        PlacementId::derive(category, self.clock.next())
    }
}

impl<A> PlacementCoordinator<A> {
    /// Detach every placement. Returns how many were removed.
    pub fn clear_all(&self) -> usize {
        let mut registry = self.registry();
        let removed = registry.drain();
        let count = removed.len();
        for placement in removed {
            self.scene.detach(placement.handle);
        }
        if count > 0 {
            info!(count, "cleared placements");
        }
        count
    }

    /// Release every placement. Safe to call more than once.
    pub fn teardown(&self) {
        self.clear_all();
    }

    /// Detach a single placement. Returns `false` if `id` was not live.
    pub fn remove(&self, id: &PlacementId) -> bool {
        let mut registry = self.registry();
        match registry.remove(id) {
            Some(placement) => {
                self.scene.detach(placement.handle);
                debug!(id = %id, "removed placement");
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &PlacementId) -> bool {
        self.registry().contains(id)
    }

    pub fn active_count(&self) -> usize {
        self.registry().len()
    }

    /// Snapshot of live placements, sorted by id.
    pub fn placements(&self) -> Vec<PlacementSummary> {
        self.registry().summaries()
    }

    /// The resource cache models are requested from.
    pub fn resources(&self) -> &Arc<ResourceLoader<A>> {
        &self.resources
    }

    pub fn manual_category(&self) -> &str {
        &self.manual_category
    }

    fn registry(&self) -> MutexGuard<'_, PlacementRegistry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<A> Drop for PlacementCoordinator<A> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<A> std::fmt::Debug for PlacementCoordinator<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlacementCoordinator")
            .field("manual_category", &self.manual_category)
            .field("active", &self.active_count())
            .finish()
    }
}
