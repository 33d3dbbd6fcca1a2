//! Placement coordination for the model overlay core.
//!
//! The [`PlacementCoordinator`] turns per-frame object detections into
//! anchored 3D models:
//! - Hit-tests the center of each detection against real-world surfaces
//! - Resolves the detection's top category to a model and a scale
//! - Loads models through a shared [`overlay_cache::ResourceLoader`]
//! - Keeps at most one live placement per [`overlay_types::PlacementId`]
//!
//! Rendering and AR tracking stay behind the [`SurfaceHitTester`] and
//! [`SceneAttacher`] traits. [`FixedHitTester`] and [`RecordingScene`] are
//! in-memory implementations for tests and demos.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use overlay_cache::InMemoryAssetLoader;
//! use overlay_placement::{FixedHitTester, OverlayConfig, PlacementCoordinator, RecordingScene};
//! use overlay_types::{Anchor, BoundingBox, Detection};
//!
//! let loader = Arc::new(InMemoryAssetLoader::<&str>::new().with_asset("sofa.glb", "sofa mesh"));
//! let scene = Arc::new(RecordingScene::<&str>::new());
//! let coordinator = PlacementCoordinator::<&str>::from_config(
//!     &OverlayConfig::default(),
//!     loader,
//!     Arc::new(FixedHitTester::hit(Anchor::from_raw(1))),
//!     scene.clone(),
//! );
//!
//! let couch = Detection::single(BoundingBox::new(40.0, 40.0, 60.0, 60.0).unwrap(), "couch", 0.9);
//! let report = futures::executor::block_on(coordinator.on_detections(&[couch], 100, 100));
//! assert_eq!(report.placed.len(), 1);
//! assert_eq!(coordinator.placements()[0].scale, 0.7);
//! ```

pub mod config;
pub mod coordinator;
pub mod error;
pub mod memory;
mod registry;
pub mod scale;
pub mod traits;

pub use config::{OverlayConfig, MANUAL_CATEGORY};
pub use coordinator::{DetectionReport, PlacementCoordinator};
pub use error::{PlacementError, PlacementResult, SceneError};
pub use memory::{FixedHitTester, RecordingScene, SceneEvent};
pub use registry::PlacementSummary;
pub use scale::{ScaleTable, DEFAULT_SCALE};
pub use traits::{SceneAttacher, SurfaceHitTester};
