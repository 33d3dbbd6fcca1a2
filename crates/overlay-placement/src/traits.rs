use std::sync::Arc;

use overlay_types::{Anchor, NodeHandle, NormalizedPoint};

use crate::error::SceneError;

/// Hit-test boundary into the AR layer.
///
/// Returns an anchor on a detected surface under the given frame-relative
/// point, or `None` when there is no surface there. A miss is an expected,
/// frequent outcome, not an error.
pub trait SurfaceHitTester: Send + Sync {
    fn hit_test(&self, point: NormalizedPoint) -> Option<Anchor>;
}

/// Scene-graph boundary: attaches and removes rendered models.
pub trait SceneAttacher<A>: Send + Sync {
    /// Attach `asset` at `anchor`, uniformly scaled by `scale`.
    fn attach(&self, asset: &Arc<A>, anchor: &Anchor, scale: f32) -> Result<NodeHandle, SceneError>;

    /// Remove a previously attached node and release its anchor.
    fn detach(&self, handle: NodeHandle);
}
