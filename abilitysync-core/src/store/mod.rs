//! Content stores
//!
//! The reconciler talks to content through [`AssetStore`]. Assets are keyed
//! by long package name; dirty state lives next to each entry and is only
//! cleared when the owner persists it.

mod file;
mod memory;

pub use file::{FileAssetStore, ASSET_FILE_SUFFIX};
pub use memory::MemoryAssetStore;

use std::path::PathBuf;

use crate::path_utils::{is_valid_long_package_name, AssetPath};
use crate::types::{Asset, AssetKind};

/// Errors produced by a store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Cannot create an asset in package {0}")]
    InvalidContainer(String),

    #[error("No asset at {0}")]
    NotFound(String),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode asset: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Storage for generated assets
pub trait AssetStore {
    /// Asset at `path`, if any
    fn load(&self, path: &AssetPath) -> Result<Option<Asset>, StoreError>;

    /// Register a new asset, replacing any entry at the same package
    fn create(&mut self, path: &AssetPath, asset: Asset) -> Result<(), StoreError>;

    /// Write back the state of an existing asset
    fn update(&mut self, path: &AssetPath, asset: Asset) -> Result<(), StoreError>;

    /// Delete the asset at `path`; returns whether one existed
    fn delete(&mut self, path: &AssetPath) -> Result<bool, StoreError>;

    fn mark_dirty(&mut self, path: &AssetPath);

    fn is_dirty(&self, path: &AssetPath) -> bool;

    /// Assets of `kind` at or below the package directory `base`, sorted
    fn list(&self, base: &str, kind: AssetKind) -> Vec<AssetPath>;

    /// Paths with unsaved changes, sorted
    fn dirty_paths(&self) -> Vec<AssetPath>;

    /// Whether a new asset may be created in `package`
    fn can_host(&self, package: &str) -> bool {
        is_valid_long_package_name(package)
    }
}
