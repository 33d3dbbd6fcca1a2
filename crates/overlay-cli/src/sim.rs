use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use overlay_cache::{AssetLoader, LoadError};
use overlay_placement::{SceneAttacher, SceneError, SurfaceHitTester};
use overlay_types::{Anchor, NodeHandle, NormalizedPoint, ResourceKey};
use tracing::{debug, info};

/// Raw model file contents. Decoding is left to a real renderer.
#[derive(Debug)]
pub struct ModelBlob {
    pub key: ResourceKey,
    pub bytes: Vec<u8>,
}

/// Reads model files from `<root>/<key>`.
#[derive(Debug)]
pub struct FsAssetLoader {
    root: PathBuf,
}

impl FsAssetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &ResourceKey) -> Result<PathBuf, LoadError> {
        let relative = Path::new(key.as_str());
        if !relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
        {
            return Err(LoadError::Other(format!(
                "model key '{key}' escapes the asset directory"
            )));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl AssetLoader<ModelBlob> for FsAssetLoader {
    async fn load(&self, key: &ResourceKey) -> Result<ModelBlob, LoadError> {
        let path = self.path_for(key)?;
        let bytes = tokio::fs::read(&path).await?;
        if bytes.is_empty() {
            return Err(LoadError::Decode(format!("{} is empty", path.display())));
        }
        debug!(key = %key, bytes = bytes.len(), "read model file");
        Ok(ModelBlob {
            key: key.clone(),
            bytes,
        })
    }

    fn release(&self, asset: &ModelBlob) {
        debug!(key = %asset.key, "released model");
    }
}

/// Stands in for AR surface detection: every query hits a fresh anchor,
/// except every `miss_every`-th query, which finds no surface.
#[derive(Debug)]
pub struct SimulatedHitTester {
    miss_every: u64,
    queries: AtomicU64,
}

impl SimulatedHitTester {
    pub fn new(miss_every: u64) -> Self {
        Self {
            miss_every,
            queries: AtomicU64::new(0),
        }
    }
}

impl SurfaceHitTester for SimulatedHitTester {
    fn hit_test(&self, point: NormalizedPoint) -> Option<Anchor> {
        let n = self.queries.fetch_add(1, Ordering::SeqCst) + 1;
        if self.miss_every > 0 && n % self.miss_every == 0 {
            debug!(x = point.x, y = point.y, "simulated miss");
            return None;
        }
        Some(Anchor::from_raw(n))
    }
}

/// Scene that only logs what a renderer would be asked to do.
#[derive(Debug, Default)]
pub struct LoggingScene {
    next_node: AtomicU64,
    live: AtomicUsize,
}

impl LoggingScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nodes attached and not yet detached.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }
}

impl SceneAttacher<ModelBlob> for LoggingScene {
    fn attach(
        &self,
        asset: &Arc<ModelBlob>,
        anchor: &Anchor,
        scale: f32,
    ) -> Result<NodeHandle, SceneError> {
        let node = self.next_node.fetch_add(1, Ordering::SeqCst) + 1;
        self.live.fetch_add(1, Ordering::SeqCst);
        info!(
            node,
            key = %asset.key,
            anchor = anchor.raw(),
            scale,
            "attached model node"
        );
        Ok(NodeHandle::from_raw(node))
    }

    fn detach(&self, handle: NodeHandle) {
        self.live.fetch_sub(1, Ordering::SeqCst);
        info!(node = handle.raw(), "detached model node");
    }
}
