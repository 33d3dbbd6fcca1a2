//! Foundation types for the model overlay core.
//!
//! This crate provides the identifiers and value types shared by the
//! resource cache and the placement coordinator. Every other overlay crate
//! depends on `overlay-types`.
//!
//! # Key Types
//!
//! - [`ResourceKey`]: Name of a loadable 3D asset (e.g. `"sofa.glb"`)
//! - [`PlacementId`]: Category-scoped, collision-free placement identifier
//! - [`Anchor`] / [`NodeHandle`]: Opaque tokens owned by the AR/scene layer
//! - [`Detection`]: One vision-model detection with its bounding box and scores
//! - [`NormalizedPoint`]: Frame-relative position in `[0, 1]²`
//! - [`TokenClock`]: Strictly increasing millisecond tokens for id derivation

pub mod clock;
pub mod detection;
pub mod error;
pub mod key;
pub mod placement;

pub use clock::TokenClock;
pub use detection::{BoundingBox, CategoryScore, Detection, NormalizedPoint};
pub use error::TypeError;
pub use key::ResourceKey;
pub use placement::{Anchor, NodeHandle, PlacementId};
