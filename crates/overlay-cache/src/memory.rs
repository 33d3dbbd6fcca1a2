use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;
use overlay_types::ResourceKey;
use tokio::sync::watch;

use crate::error::LoadError;
use crate::traits::AssetLoader;

/// In-memory, HashMap-based asset loader.
///
/// Intended for tests, demos, and embedding. Besides serving registered
/// assets it counts calls per key, can inject failures for chosen keys,
/// and can hold every load at a gate until the gate is opened.
pub struct InMemoryAssetLoader<A> {
    assets: RwLock<HashMap<ResourceKey, A>>,
    failures: RwLock<HashMap<ResourceKey, LoadError>>,
    calls: Mutex<HashMap<ResourceKey, usize>>,
    released: AtomicUsize,
    gate: watch::Sender<bool>,
}

impl<A: Clone> InMemoryAssetLoader<A> {
    /// Create an empty loader with an open gate.
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            assets: RwLock::new(HashMap::new()),
            failures: RwLock::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            released: AtomicUsize::new(0),
            gate,
        }
    }

    /// Builder-style registration.
    pub fn with_asset(self, key: impl Into<ResourceKey>, asset: A) -> Self {
        self.insert(key, asset);
        self
    }

    pub fn insert(&self, key: impl Into<ResourceKey>, asset: A) {
        self.assets
            .write()
            .expect("lock poisoned")
            .insert(key.into(), asset);
    }

    /// Make every load of `key` fail with `error` until [`Self::heal`].
    pub fn fail(&self, key: impl Into<ResourceKey>, error: LoadError) {
        self.failures
            .write()
            .expect("lock poisoned")
            .insert(key.into(), error);
    }

    /// Stop injecting failures for `key`.
    pub fn heal(&self, key: &str) {
        self.failures.write().expect("lock poisoned").remove(key);
    }

    /// Hold new and pending loads until [`Self::open_gate`].
    pub fn close_gate(&self) {
        self.gate.send_replace(false);
    }

    /// Let held loads proceed.
    pub fn open_gate(&self) {
        self.gate.send_replace(true);
    }

    /// Number of times `load` was called for `key`.
    pub fn load_count(&self, key: &str) -> usize {
        self.calls
            .lock()
            .expect("lock poisoned")
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    /// Total `load` calls across all keys.
    pub fn total_loads(&self) -> usize {
        self.calls.lock().expect("lock poisoned").values().sum()
    }

    /// Number of assets handed back through `release`.
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }
}

impl<A: Clone> Default for InMemoryAssetLoader<A> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<A> AssetLoader<A> for InMemoryAssetLoader<A>
where
    A: Clone + Send + Sync + 'static,
{
    async fn load(&self, key: &ResourceKey) -> Result<A, LoadError> {
        *self
            .calls
            .lock()
            .expect("lock poisoned")
            .entry(key.clone())
            .or_default() += 1;

        let mut gate = self.gate.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = gate.wait_for(|open| *open).await;

        if let Some(error) = self.failures.read().expect("lock poisoned").get(key) {
            return Err(error.clone());
        }
        self.assets
            .read()
            .expect("lock poisoned")
            .get(key)
            .cloned()
            .ok_or(LoadError::NotFound)
    }

    fn release(&self, _asset: &A) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

impl<A> std::fmt::Debug for InMemoryAssetLoader<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.assets.read().map(|m| m.len()).unwrap_or(0);
        f.debug_struct("InMemoryAssetLoader")
            .field("asset_count", &count)
            .field("released", &self.released.load(Ordering::SeqCst))
            .finish()
    }
}
