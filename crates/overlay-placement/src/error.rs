use overlay_types::PlacementId;
use thiserror::Error;

/// Failure reported by a [`crate::SceneAttacher`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    /// The scene refused the attachment.
    #[error("scene rejected attachment: {0}")]
    Rejected(String),
}

/// Errors produced by placement operations and configuration loading.
#[derive(Debug, Error)]
pub enum PlacementError {
    /// Attaching the model for a placement failed.
    #[error("failed to attach placement {id}: {source}")]
    Scene {
        id: PlacementId,
        #[source]
        source: SceneError,
    },

    /// The overlay configuration is malformed or inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// Reading or writing a configuration file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for placement operations.
pub type PlacementResult<T> = Result<T, PlacementError>;
