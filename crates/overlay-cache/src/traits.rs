use async_trait::async_trait;
use overlay_types::ResourceKey;

use crate::error::LoadError;

/// Fetch-and-decode boundary for named assets.
///
/// The resource loader calls [`AssetLoader::load`] at most once per key
/// while no cached or in-flight entry exists for it. Implementations may
/// complete on any thread.
#[async_trait]
pub trait AssetLoader<A>: Send + Sync {
    async fn load(&self, key: &ResourceKey) -> Result<A, LoadError>;

    /// Release native resources held by a cached asset. Called once per
    /// cached asset on dispose, and for duplicates discarded after a clear.
    fn release(&self, _asset: &A) {}
}
