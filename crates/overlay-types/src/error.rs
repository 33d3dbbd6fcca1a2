use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypeError {
    #[error("invalid bounding box: left={left}, top={top}, right={right}, bottom={bottom}")]
    InvalidBoundingBox {
        left: f32,
        top: f32,
        right: f32,
        bottom: f32,
    },

    #[error("invalid placement id: {0}")]
    InvalidPlacementId(String),

    #[error("resource key must not be empty")]
    EmptyKey,
}
