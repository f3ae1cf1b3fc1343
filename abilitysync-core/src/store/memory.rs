//! In-memory asset store

use std::collections::BTreeMap;

use super::{AssetStore, StoreError};
use crate::path_utils::AssetPath;
use crate::types::{Asset, AssetKind};

#[derive(Debug, Clone)]
struct Entry {
    path: AssetPath,
    asset: Asset,
    dirty: bool,
}

/// Asset store held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryAssetStore {
    entries: BTreeMap<String, Entry>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a clean entry, as if loaded from disk
    pub(crate) fn insert_clean(&mut self, path: AssetPath, asset: Asset) {
        self.entries.insert(
            path.package.clone(),
            Entry {
                path,
                asset,
                dirty: false,
            },
        );
    }

    /// Forget unsaved changes of one asset, as if it had been persisted
    pub fn clear_dirty(&mut self, path: &AssetPath) {
        if let Some(entry) = self.entries.get_mut(&path.package) {
            entry.dirty = false;
        }
    }

    pub(crate) fn get(&self, path: &AssetPath) -> Option<&Asset> {
        self.entries.get(&path.package).map(|entry| &entry.asset)
    }
}

impl AssetStore for MemoryAssetStore {
    fn load(&self, path: &AssetPath) -> Result<Option<Asset>, StoreError> {
        Ok(self.get(path).cloned())
    }

    fn create(&mut self, path: &AssetPath, asset: Asset) -> Result<(), StoreError> {
        if !self.can_host(&path.package) {
            return Err(StoreError::InvalidContainer(path.package.clone()));
        }
        self.insert_clean(path.clone(), asset);
        Ok(())
    }

    fn update(&mut self, path: &AssetPath, asset: Asset) -> Result<(), StoreError> {
        match self.entries.get_mut(&path.package) {
            Some(entry) => {
                entry.asset = asset;
                Ok(())
            }
            None => Err(StoreError::NotFound(path.to_string())),
        }
    }

    fn delete(&mut self, path: &AssetPath) -> Result<bool, StoreError> {
        Ok(self.entries.remove(&path.package).is_some())
    }

    fn mark_dirty(&mut self, path: &AssetPath) {
        if let Some(entry) = self.entries.get_mut(&path.package) {
            entry.dirty = true;
        }
    }

    fn is_dirty(&self, path: &AssetPath) -> bool {
        self.entries
            .get(&path.package)
            .map(|entry| entry.dirty)
            .unwrap_or(false)
    }

    fn list(&self, base: &str, kind: AssetKind) -> Vec<AssetPath> {
        self.entries
            .values()
            .filter(|entry| entry.asset.kind() == kind && entry.path.is_under(base))
            .map(|entry| entry.path.clone())
            .collect()
    }

    fn dirty_paths(&self) -> Vec<AssetPath> {
        self.entries
            .values()
            .filter(|entry| entry.dirty)
            .map(|entry| entry.path.clone())
            .collect()
    }
}
