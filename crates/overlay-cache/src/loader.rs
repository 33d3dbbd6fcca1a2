use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use futures::future::{self, BoxFuture, FutureExt, Shared};
use overlay_types::ResourceKey;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{CacheError, CacheResult, LoadError};
use crate::mapping::CategoryMapping;
use crate::traits::AssetLoader;

/// Future handed out by [`ResourceLoader::request`].
///
/// Every caller asking for the same unresolved key receives a clone of the
/// same shared future, so they all observe one load and one result.
pub type AssetFuture<A> = Shared<BoxFuture<'static, CacheResult<Arc<A>>>>;

/// Counters describing how requests were served.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Requests answered from the ready cache.
    pub hits: u64,
    /// Requests that joined a load already in flight.
    pub coalesced: u64,
    /// Requests that started a new load; equals the number of loads issued.
    pub misses: u64,
    /// Loads that completed with an error.
    pub failures: u64,
}

struct InFlight<A> {
    load_id: u64,
    future: AssetFuture<A>,
}

struct CacheState<A> {
    ready: HashMap<ResourceKey, Arc<A>>,
    in_flight: HashMap<ResourceKey, InFlight<A>>,
    next_load_id: u64,
    stats: CacheStats,
}

impl<A> CacheState<A> {
    fn new() -> Self {
        Self {
            ready: HashMap::new(),
            in_flight: HashMap::new(),
            next_load_id: 0,
            stats: CacheStats::default(),
        }
    }
}

/// Asynchronous keyed asset cache with load coalescing.
///
/// # Guarantees
///
/// 1. While a key is loading, concurrent [`request`](Self::request) calls
///    share one in-flight future; the [`AssetLoader`] is invoked once.
/// 2. A successful load is cached until [`clear`](Self::clear) or
///    [`dispose`](Self::dispose).
/// 3. A failed load is never cached; the next request retries.
///
/// All mutation of the cache and in-flight tables happens under a single
/// mutex, whichever thread the underlying load completes on. When a tokio
/// runtime is available the load is spawned onto it immediately, so it
/// completes even if every caller drops its future.
pub struct ResourceLoader<A> {
    loader: Arc<dyn AssetLoader<A>>,
    mapping: CategoryMapping,
    state: Arc<Mutex<CacheState<A>>>,
}

impl<A> ResourceLoader<A>
where
    A: Send + Sync + 'static,
{
    /// Create a loader backed by `loader`, resolving categories via `mapping`.
    pub fn new(loader: Arc<dyn AssetLoader<A>>, mapping: CategoryMapping) -> Self {
        Self {
            loader,
            mapping,
            state: Arc::new(Mutex::new(CacheState::new())),
        }
    }

    /// Request the asset stored under `key`.
    ///
    /// Returns immediately. The future is already resolved when the key is
    /// cached, is the existing in-flight future when the key is loading,
    /// and otherwise drives a fresh load.
    pub fn request(&self, key: impl Into<ResourceKey>) -> AssetFuture<A> {
        let key = key.into();
        let mut state = lock(&self.state);

        if let Some(asset) = state.ready.get(&key).cloned() {
            state.stats.hits += 1;
            debug!(key = %key, "resource cache hit");
            return future::ready(Ok(asset)).boxed().shared();
        }

        let joined = state
            .in_flight
            .get(&key)
            .map(|in_flight| (in_flight.load_id, in_flight.future.clone()));
        if let Some((load_id, future)) = joined {
            state.stats.coalesced += 1;
            debug!(key = %key, load_id, "joined in-flight load");
            return future;
        }

        let load_id = state.next_load_id;
        state.next_load_id += 1;
        state.stats.misses += 1;

        let future = load_future(
            Arc::clone(&self.loader),
            Arc::clone(&self.state),
            key.clone(),
            load_id,
        );
        state.in_flight.insert(
            key.clone(),
            InFlight {
                load_id,
                future: future.clone(),
            },
        );
        drop(state);

        debug!(key = %key, load_id, "started resource load");
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            runtime.spawn(future.clone());
        }
        future
    }

    /// Resolve a category label to the key of the model shown for it.
    pub fn resolve_category(&self, category: &str) -> &ResourceKey {
        self.mapping.resolve(category)
    }

    /// Request the model for a category label.
    pub fn request_category(&self, category: &str) -> AssetFuture<A> {
        let key = self.resolve_category(category).clone();
        self.request(key)
    }

    /// Request every key up front and wait for all of them.
    ///
    /// Results are returned in input order. Failures are reported per key
    /// and do not stop the remaining loads.
    pub async fn preload<I, K>(&self, keys: I) -> Vec<(ResourceKey, CacheResult<Arc<A>>)>
    where
        I: IntoIterator<Item = K>,
        K: Into<ResourceKey>,
    {
        let pending: Vec<(ResourceKey, AssetFuture<A>)> = keys
            .into_iter()
            .map(|key| {
                let key = key.into();
                let future = self.request(key.clone());
                (key, future)
            })
            .collect();

        let (keys, loads): (Vec<_>, Vec<_>) = pending.into_iter().unzip();
        keys.into_iter()
            .zip(future::join_all(loads).await)
            .collect()
    }

    /// Drop every cached asset and all in-flight bookkeeping.
    ///
    /// Loads already issued are not cancelled; if one completes for a key
    /// that is still absent its asset is cached as a fresh result.
    pub fn clear(&self) {
        let mut state = lock(&self.state);
        let ready = state.ready.len();
        let in_flight = state.in_flight.len();
        state.ready.clear();
        state.in_flight.clear();
        debug!(ready, in_flight, "resource cache cleared");
    }

    /// Release every cached asset through the [`AssetLoader`], then clear.
    pub fn dispose(&self) {
        let released = {
            let mut state = lock(&self.state);
            state.in_flight.clear();
            std::mem::take(&mut state.ready)
        };
        for asset in released.values() {
            self.loader.release(asset.as_ref());
        }
        debug!(released = released.len(), "resource cache disposed");
    }

    /// Returns `true` if `key` is cached.
    pub fn is_ready(&self, key: &str) -> bool {
        lock(&self.state).ready.contains_key(key)
    }

    /// Returns `true` if a load for `key` is in flight.
    pub fn is_loading(&self, key: &str) -> bool {
        lock(&self.state).in_flight.contains_key(key)
    }

    /// Sorted list of cached keys.
    pub fn cached_keys(&self) -> Vec<ResourceKey> {
        let mut keys: Vec<ResourceKey> = lock(&self.state).ready.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn stats(&self) -> CacheStats {
        lock(&self.state).stats
    }
}

impl<A> std::fmt::Debug for ResourceLoader<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.state);
        f.debug_struct("ResourceLoader")
            .field("ready", &state.ready.len())
            .field("in_flight", &state.in_flight.len())
            .field("stats", &state.stats)
            .finish()
    }
}

/// Lock the shared state. The tables stay structurally valid even if a
/// holder panicked, so poisoning is ignored.
fn lock<A>(state: &Mutex<CacheState<A>>) -> MutexGuard<'_, CacheState<A>> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// Build the shared future for one load. It holds the cache state weakly
/// so that a load outliving its `ResourceLoader` still resolves.
fn load_future<A>(
    loader: Arc<dyn AssetLoader<A>>,
    state: Arc<Mutex<CacheState<A>>>,
    key: ResourceKey,
    load_id: u64,
) -> AssetFuture<A>
where
    A: Send + Sync + 'static,
{
    let state: Weak<Mutex<CacheState<A>>> = Arc::downgrade(&state);
    async move {
        let result = loader.load(&key).await;
        match state.upgrade() {
            Some(state) => complete_load(loader.as_ref(), &state, key, load_id, result),
            None => result
                .map(Arc::new)
                .map_err(|cause| CacheError::LoadFailure { key, cause }),
        }
    }
    .boxed()
    .shared()
}

/// Record the outcome of load `load_id` for `key`.
fn complete_load<A>(
    loader: &dyn AssetLoader<A>,
    state: &Mutex<CacheState<A>>,
    key: ResourceKey,
    load_id: u64,
    result: Result<A, LoadError>,
) -> CacheResult<Arc<A>> {
    let mut guard = lock(state);

    // After a clear, a newer load may own the in-flight slot for this key.
    if guard
        .in_flight
        .get(&key)
        .is_some_and(|in_flight| in_flight.load_id == load_id)
    {
        guard.in_flight.remove(&key);
    }

    match result {
        Ok(asset) => {
            if let Some(existing) = guard.ready.get(&key).cloned() {
                drop(guard);
                debug!(key = %key, load_id, "discarding duplicate load result");
                loader.release(&asset);
                return Ok(existing);
            }
            let asset = Arc::new(asset);
            guard.ready.insert(key.clone(), Arc::clone(&asset));
            drop(guard);
            debug!(key = %key, load_id, "resource loaded");
            Ok(asset)
        }
        Err(cause) => {
            guard.stats.failures += 1;
            drop(guard);
            warn!(key = %key, cause = %cause, "failed to load resource");
            Err(CacheError::LoadFailure { key, cause })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryAssetLoader;
    use tokio::task::yield_now;

    #[derive(Clone, Debug, PartialEq)]
    struct Model(&'static str);

    fn backend() -> Arc<InMemoryAssetLoader<Model>> {
        Arc::new(
            InMemoryAssetLoader::new()
                .with_asset("sofa.glb", Model("sofa"))
                .with_asset("chair.glb", Model("chair"))
                .with_asset("default.glb", Model("default")),
        )
    }

    fn cache(backend: &Arc<InMemoryAssetLoader<Model>>) -> ResourceLoader<Model> {
        ResourceLoader::new(backend.clone(), CategoryMapping::default())
    }

    async fn settle() {
        for _ in 0..8 {
            yield_now().await;
        }
    }

    #[tokio::test]
    async fn concurrent_requests_share_one_load() {
        let backend = backend();
        backend.close_gate();
        let cache = cache(&backend);

        let futures: Vec<_> = (0..10).map(|_| cache.request("sofa.glb")).collect();
        settle().await;
        assert_eq!(backend.load_count("sofa.glb"), 1);
        assert!(cache.is_loading("sofa.glb"));

        backend.open_gate();
        let results = future::join_all(futures).await;
        let first = results[0].as_ref().unwrap();
        for result in &results {
            assert!(Arc::ptr_eq(first, result.as_ref().unwrap()));
        }
        assert_eq!(backend.load_count("sofa.glb"), 1);
        assert_eq!(cache.stats().coalesced, 9);
        assert!(!cache.is_loading("sofa.glb"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn coalescing_holds_across_threads() {
        let backend = backend();
        backend.close_gate();
        let cache = Arc::new(cache(&backend));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let cache = Arc::clone(&cache);
                tokio::spawn(async move { cache.request("chair.glb").await })
            })
            .collect();

        while cache.stats().misses + cache.stats().coalesced < 16 {
            yield_now().await;
        }
        backend.open_gate();

        let mut assets = Vec::new();
        for task in tasks {
            assets.push(task.await.unwrap().unwrap());
        }
        assert_eq!(backend.load_count("chair.glb"), 1);
        assert!(assets.iter().all(|a| Arc::ptr_eq(a, &assets[0])));
    }

    #[tokio::test]
    async fn cached_request_is_already_resolved() {
        let backend = backend();
        let cache = cache(&backend);

        let first = cache.request("chair.glb").await.unwrap();
        let second = cache
            .request("chair.glb")
            .now_or_never()
            .expect("cached request should be resolved")
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(backend.load_count("chair.glb"), 1);
        assert_eq!(cache.stats().hits, 1);
    }

    #[tokio::test]
    async fn failure_is_not_cached() {
        let backend = backend();
        backend.fail("sofa.glb", LoadError::Decode("bad header".into()));
        let cache = cache(&backend);

        let err = cache.request("sofa.glb").await.unwrap_err();
        assert_eq!(
            err,
            CacheError::LoadFailure {
                key: "sofa.glb".into(),
                cause: LoadError::Decode("bad header".into()),
            }
        );
        assert!(!cache.is_ready("sofa.glb"));
        assert!(!cache.is_loading("sofa.glb"));

        backend.heal("sofa.glb");
        let asset = cache.request("sofa.glb").await.unwrap();
        assert_eq!(*asset, Model("sofa"));
        assert_eq!(backend.load_count("sofa.glb"), 2);
        assert_eq!(cache.stats().failures, 1);
    }

    #[tokio::test]
    async fn missing_asset_reports_not_found() {
        let backend = backend();
        let cache = cache(&backend);
        let err = cache.request("ghost.glb").await.unwrap_err();
        assert_eq!(err.key().as_str(), "ghost.glb");
        assert!(matches!(
            err,
            CacheError::LoadFailure {
                cause: LoadError::NotFound,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn concurrent_failures_share_one_load() {
        let backend = backend();
        backend.close_gate();
        backend.fail("chair.glb", LoadError::Io("disk gone".into()));
        let cache = cache(&backend);

        let futures: Vec<_> = (0..3).map(|_| cache.request("chair.glb")).collect();
        settle().await;
        backend.open_gate();

        for result in future::join_all(futures).await {
            assert!(result.is_err());
        }
        assert_eq!(backend.load_count("chair.glb"), 1);
    }

    #[tokio::test]
    async fn load_completes_when_callers_drop_their_futures() {
        let backend = backend();
        let cache = cache(&backend);

        drop(cache.request("sofa.glb"));
        settle().await;

        assert!(cache.is_ready("sofa.glb"));
        assert!(!cache.is_loading("sofa.glb"));
    }

    #[tokio::test]
    async fn clear_during_load_keeps_later_requests_coalesced() {
        let backend = backend();
        backend.close_gate();
        let cache = cache(&backend);

        let stale = cache.request("sofa.glb");
        settle().await;
        cache.clear();
        assert!(!cache.is_loading("sofa.glb"));

        let fresh = cache.request("sofa.glb");
        let joined = cache.request("sofa.glb");
        settle().await;
        assert_eq!(backend.load_count("sofa.glb"), 2);

        backend.open_gate();
        let (stale, fresh, joined) = futures::join!(stale, fresh, joined);
        let (stale, fresh, joined) = (stale.unwrap(), fresh.unwrap(), joined.unwrap());

        // Whichever load lands second hands back the instance already cached.
        assert!(Arc::ptr_eq(&stale, &fresh));
        assert!(Arc::ptr_eq(&fresh, &joined));
        assert_eq!(backend.released(), 1);
        assert!(cache.is_ready("sofa.glb"));
        assert!(!cache.is_loading("sofa.glb"));
    }

    #[tokio::test]
    async fn clear_forces_reload() {
        let backend = backend();
        let cache = cache(&backend);

        cache.request("chair.glb").await.unwrap();
        cache.clear();
        assert!(cache.cached_keys().is_empty());

        cache.request("chair.glb").await.unwrap();
        assert_eq!(backend.load_count("chair.glb"), 2);
    }

    #[tokio::test]
    async fn dispose_releases_each_cached_asset() {
        let backend = backend();
        let cache = cache(&backend);

        let loaded = cache.preload(["sofa.glb", "chair.glb", "default.glb"]).await;
        assert!(loaded.iter().all(|(_, result)| result.is_ok()));
        assert_eq!(cache.cached_keys().len(), 3);

        cache.dispose();
        assert_eq!(backend.released(), 3);
        assert!(cache.cached_keys().is_empty());

        cache.dispose();
        assert_eq!(backend.released(), 3);
    }

    #[tokio::test]
    async fn preload_reports_per_key_results_in_order() {
        let backend = backend();
        let cache = cache(&backend);

        let results = cache.preload(["chair.glb", "missing.glb", "sofa.glb"]).await;
        let keys: Vec<&str> = results.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["chair.glb", "missing.glb", "sofa.glb"]);
        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_err());
        assert!(results[2].1.is_ok());
    }

    #[tokio::test]
    async fn category_requests_use_the_mapping() {
        let backend = backend();
        let cache = cache(&backend);

        assert_eq!(cache.resolve_category("chair").as_str(), "chair.glb");
        assert_eq!(cache.resolve_category("unknown-xyz").as_str(), "default.glb");

        let couch = cache.request_category("couch").await.unwrap();
        assert_eq!(*couch, Model("sofa"));
        let lamp = cache.request_category("lamp").await.unwrap();
        assert_eq!(*lamp, Model("default"));
    }

    #[test]
    fn request_outside_a_runtime_is_lazy() {
        let backend = backend();
        let cache = cache(&backend);

        let future = cache.request("sofa.glb");
        assert_eq!(backend.load_count("sofa.glb"), 0);

        let asset = futures::executor::block_on(future).unwrap();
        assert_eq!(*asset, Model("sofa"));
        assert!(cache.is_ready("sofa.glb"));
    }
}
