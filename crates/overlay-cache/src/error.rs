use overlay_types::ResourceKey;
use thiserror::Error;

/// Cause reported by an [`crate::AssetLoader`] when a fetch or decode fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("asset not found")]
    NotFound,

    #[error("I/O error: {0}")]
    Io(String),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for LoadError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound,
            _ => Self::Io(err.to_string()),
        }
    }
}

/// Errors surfaced by the resource loader.
///
/// Cloneable because one failure is delivered to every caller sharing the
/// same in-flight load.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CacheError {
    /// The underlying load failed. Failures are never cached.
    #[error("failed to load resource '{key}': {cause}")]
    LoadFailure { key: ResourceKey, cause: LoadError },
}

impl CacheError {
    /// The key whose load failed.
    pub fn key(&self) -> &ResourceKey {
        match self {
            Self::LoadFailure { key, .. } => key,
        }
    }
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
