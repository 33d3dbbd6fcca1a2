//! Asynchronous keyed asset cache for the model overlay core.
//!
//! The [`ResourceLoader`] sits between the placement logic and whatever
//! actually fetches and decodes 3D models. It provides:
//! - Load coalescing: concurrent requests for one key share a single load
//! - Caching of successful loads until cleared or disposed
//! - No caching of failures, so a later request retries
//! - [`CategoryMapping`] from detection labels to model keys, with a default
//! - [`InMemoryAssetLoader`] for tests and embedding
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use overlay_cache::{CategoryMapping, InMemoryAssetLoader, ResourceLoader};
//!
//! let backend = Arc::new(InMemoryAssetLoader::new().with_asset("sofa.glb", "sofa mesh"));
//! let cache = ResourceLoader::new(backend, CategoryMapping::default());
//! assert_eq!(cache.resolve_category("couch").as_str(), "sofa.glb");
//!
//! let asset = futures::executor::block_on(cache.request_category("couch")).unwrap();
//! assert_eq!(*asset, "sofa mesh");
//! ```

pub mod error;
pub mod loader;
pub mod mapping;
pub mod memory;
pub mod traits;

pub use error::{CacheError, CacheResult, LoadError};
pub use loader::{AssetFuture, CacheStats, ResourceLoader};
pub use mapping::{CategoryMapping, DEFAULT_MODEL};
pub use memory::InMemoryAssetLoader;
pub use traits::AssetLoader;
