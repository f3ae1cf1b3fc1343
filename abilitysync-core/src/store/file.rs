//! File-backed asset store
//!
//! `/Game/A/B/GE_X` lives at `<content_root>/A/B/GE_X.asset.json`. The whole
//! tree is read when the store is opened. Changes stay in memory until
//! [`FileAssetStore::save_dirty`]; deletions hit the disk immediately.

use std::fs;
use std::path::{Path, PathBuf};

use super::{AssetStore, MemoryAssetStore, StoreError};
use crate::path_utils::{is_valid_long_package_name, normalize_path, resolve, AssetPath, DEFAULT_ROOT};
use crate::types::{Asset, AssetKind};

pub const ASSET_FILE_SUFFIX: &str = ".asset.json";

/// Asset store rooted at a content directory
#[derive(Debug)]
pub struct FileAssetStore {
    content_root: PathBuf,
    entries: MemoryAssetStore,
}

impl FileAssetStore {
    /// Open a content directory, loading every asset file below it
    pub fn open<P: AsRef<Path>>(content_root: P) -> Result<Self, StoreError> {
        let content_root = content_root.as_ref().to_path_buf();
        let mut store = Self {
            content_root,
            entries: MemoryAssetStore::new(),
        };

        if store.content_root.exists() {
            let root = store.content_root.clone();
            store.scan_dir(&root)?;
        }

        tracing::info!(
            "Opened content root {} ({} assets)",
            store.content_root.display(),
            store.entries.len()
        );
        Ok(store)
    }

    pub fn content_root(&self) -> &Path {
        &self.content_root
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn scan_dir(&mut self, dir: &Path) -> Result<(), StoreError> {
        let read_dir = fs::read_dir(dir).map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        for entry in read_dir.flatten() {
            let path = entry.path();
            if path.is_dir() {
                self.scan_dir(&path)?;
                continue;
            }
            let Some(package) = self.package_for_file(&path) else {
                continue;
            };
            let asset = read_asset(&path)?;
            match resolve(&package) {
                Ok(asset_path) => self.entries.insert_clean(asset_path, asset),
                Err(e) => tracing::warn!("Skipping {}: {}", path.display(), e),
            }
        }
        Ok(())
    }

    /// Package name for an asset file under the content root
    fn package_for_file(&self, file: &Path) -> Option<String> {
        let relative = file.strip_prefix(&self.content_root).ok()?;
        let relative = normalize_path(&relative.to_string_lossy());
        let stem = relative.strip_suffix(ASSET_FILE_SUFFIX)?;
        Some(format!("{}{}", DEFAULT_ROOT, stem))
    }

    /// File an asset package is persisted to, when it is under `/Game/`
    pub fn file_for_package(&self, package: &str) -> Option<PathBuf> {
        let relative = package.strip_prefix(DEFAULT_ROOT)?;
        if relative.is_empty() {
            return None;
        }
        Some(self.content_root.join(format!("{}{}", relative, ASSET_FILE_SUFFIX)))
    }

    /// Write every dirty asset to disk; returns how many were written.
    ///
    /// Stops at the first failure; assets written before it stay clean.
    pub fn save_dirty(&mut self) -> Result<usize, StoreError> {
        let mut saved = 0;
        for path in self.entries.dirty_paths() {
            let Some(file) = self.file_for_package(&path.package) else {
                return Err(StoreError::InvalidContainer(path.package.clone()));
            };
            let Some(asset) = self.entries.get(&path) else {
                continue;
            };
            write_asset(&file, asset)?;
            self.entries.clear_dirty(&path);
            tracing::info!("Saved {}", path);
            saved += 1;
        }
        Ok(saved)
    }
}

fn read_asset(file: &Path) -> Result<Asset, StoreError> {
    let content = fs::read_to_string(file).map_err(|source| StoreError::Io {
        path: file.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| StoreError::Decode {
        path: file.to_path_buf(),
        source,
    })
}

fn write_asset(file: &Path, asset: &Asset) -> Result<(), StoreError> {
    if let Some(dir) = file.parent() {
        fs::create_dir_all(dir).map_err(|source| StoreError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    let json = serde_json::to_string_pretty(asset)?;
    fs::write(file, json).map_err(|source| StoreError::Io {
        path: file.to_path_buf(),
        source,
    })
}

impl AssetStore for FileAssetStore {
    fn load(&self, path: &AssetPath) -> Result<Option<Asset>, StoreError> {
        self.entries.load(path)
    }

    fn create(&mut self, path: &AssetPath, asset: Asset) -> Result<(), StoreError> {
        if !self.can_host(&path.package) {
            return Err(StoreError::InvalidContainer(path.package.clone()));
        }
        self.entries.create(path, asset)
    }

    fn update(&mut self, path: &AssetPath, asset: Asset) -> Result<(), StoreError> {
        self.entries.update(path, asset)
    }

    fn delete(&mut self, path: &AssetPath) -> Result<bool, StoreError> {
        if let Some(file) = self.file_for_package(&path.package) {
            if file.exists() {
                fs::remove_file(&file).map_err(|source| StoreError::Io {
                    path: file.clone(),
                    source,
                })?;
            }
        }
        self.entries.delete(path)
    }

    fn mark_dirty(&mut self, path: &AssetPath) {
        self.entries.mark_dirty(path);
    }

    fn is_dirty(&self, path: &AssetPath) -> bool {
        self.entries.is_dirty(path)
    }

    fn list(&self, base: &str, kind: AssetKind) -> Vec<AssetPath> {
        self.entries.list(base, kind)
    }

    fn dirty_paths(&self) -> Vec<AssetPath> {
        self.entries.dirty_paths()
    }

    fn can_host(&self, package: &str) -> bool {
        is_valid_long_package_name(package) && package.starts_with(DEFAULT_ROOT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EffectAsset;

    fn effect(name: &str) -> Asset {
        Asset::Effect(EffectAsset::new(name, "/Script/GameplayAbilities.GameplayEffect"))
    }

    #[test]
    fn test_save_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = resolve("GameplayEffects/Fire/GE_Burn").unwrap();

        let mut store = FileAssetStore::open(dir.path()).unwrap();
        assert!(store.is_empty());
        store.create(&path, effect("GE_Burn")).unwrap();
        store.mark_dirty(&path);
        assert_eq!(store.save_dirty().unwrap(), 1);
        assert!(!store.is_dirty(&path));
        assert_eq!(store.save_dirty().unwrap(), 0);

        let file = dir.path().join("GameplayEffects/Fire/GE_Burn.asset.json");
        assert!(file.exists());

        let reopened = FileAssetStore::open(dir.path()).unwrap();
        assert_eq!(reopened.len(), 1);
        let loaded = reopened.load(&path).unwrap().unwrap();
        assert_eq!(loaded.name(), "GE_Burn");
        assert_eq!(reopened.list("/Game/GameplayEffects", AssetKind::Effect), vec![path]);
    }

    #[test]
    fn test_unsaved_assets_are_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = resolve("Fx/GE_Clean").unwrap();
        let mut store = FileAssetStore::open(dir.path()).unwrap();
        store.create(&path, effect("GE_Clean")).unwrap();
        assert_eq!(store.save_dirty().unwrap(), 0);
        assert!(!dir.path().join("Fx/GE_Clean.asset.json").exists());
    }

    #[test]
    fn test_delete_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = resolve("Fx/GE_Gone").unwrap();
        let mut store = FileAssetStore::open(dir.path()).unwrap();
        store.create(&path, effect("GE_Gone")).unwrap();
        store.mark_dirty(&path);
        store.save_dirty().unwrap();

        assert!(store.delete(&path).unwrap());
        assert!(!dir.path().join("Fx/GE_Gone.asset.json").exists());
        assert!(FileAssetStore::open(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_only_game_packages_are_hosted() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileAssetStore::open(dir.path()).unwrap();
        let path = resolve("/Engine/Fx/GE_Engine").unwrap();
        assert!(matches!(
            store.create(&path, effect("GE_Engine")),
            Err(StoreError::InvalidContainer(_))
        ));
    }

    #[test]
    fn test_corrupt_asset_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("Fx")).unwrap();
        fs::write(dir.path().join("Fx/GE_Bad.asset.json"), "{not json").unwrap();
        fs::write(dir.path().join("Fx/readme.txt"), "ignored").unwrap();
        assert!(matches!(FileAssetStore::open(dir.path()), Err(StoreError::Decode { .. })));
    }
}
