//! Content path utilities
//!
//! Content packages live under mount roots such as `/Game/`. Users type paths
//! in several shapes (`Effects/GE_Burn`, `/Game/Effects/GE_Burn`,
//! `/Game/Effects/GE_Burn.GE_Burn`, Windows separators); everything is
//! normalized into an [`AssetPath`] before it reaches a store.

use std::fmt;

/// Root that relative package paths are placed under
pub const DEFAULT_ROOT: &str = "/Game/";

/// Characters that may not appear inside a long package name
const INVALID_PACKAGE_CHARS: &[char] = &['\\', ':', '*', '?', '"', '<', '>', '|', '\'', ' ', ',', '.'];

/// Errors produced while resolving a path
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("Invalid path: {0:?}")]
    InvalidPath(String),
}

/// Canonical form of a content reference
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AssetPath {
    /// Long package name, e.g. `/Game/GameplayEffects/GE_Burn`
    pub package: String,
    /// Object name inside the package, e.g. `GE_Burn`
    pub asset_name: String,
    /// Full object reference, e.g. `/Game/GameplayEffects/GE_Burn.GE_Burn`
    pub object_path: String,
}

impl AssetPath {
    /// Directory part of the package (`/Game/GameplayEffects`)
    pub fn container(&self) -> &str {
        self.package
            .rsplit_once('/')
            .map(|(dir, _)| dir)
            .filter(|dir| !dir.is_empty())
            .unwrap_or("/")
    }

    /// Whether the package lives at or below `base` (a package directory)
    pub fn is_under(&self, base: &str) -> bool {
        let base = base.trim_end_matches('/');
        self.package
            .strip_prefix(base)
            .map(|rest| rest.starts_with('/'))
            .unwrap_or(false)
    }
}

impl fmt::Display for AssetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.object_path)
    }
}

/// Normalize path to forward slashes
#[inline]
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

fn root_package(package: &str) -> String {
    let trimmed = package.trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("{}{}", DEFAULT_ROOT, trimmed)
    }
}

/// Resolve a user-supplied string into a canonical [`AssetPath`].
///
/// Accepts either a package path (`Effects/GE_Burn`, `/Game/Effects/GE_Burn`)
/// or an object reference (`/Game/Effects/GE_Burn.GE_Burn`). Relative
/// packages are rooted at [`DEFAULT_ROOT`].
pub fn resolve(path: &str) -> Result<AssetPath, PathError> {
    let normalized = normalize_path(path.trim());
    if normalized.is_empty() {
        return Err(PathError::InvalidPath(path.to_string()));
    }

    let (package, asset_name) = match normalized.rsplit_once('.') {
        // A dot inside the last segment separates package from object name
        Some((package, object)) if !object.contains('/') => {
            (root_package(package), object.to_string())
        }
        _ => {
            let package = root_package(&normalized);
            let asset_name = package.rsplit('/').next().unwrap_or_default().to_string();
            (package, asset_name)
        }
    };

    if asset_name.is_empty() || package == "/" {
        return Err(PathError::InvalidPath(path.to_string()));
    }

    let object_path = format!("{}.{}", package, asset_name);
    Ok(AssetPath {
        package,
        asset_name,
        object_path,
    })
}

/// Check that a package name can host a new asset: rooted, at least two
/// segments, no empty segments and no reserved characters.
pub fn is_valid_long_package_name(package: &str) -> bool {
    let Some(rest) = package.strip_prefix('/') else {
        return false;
    };
    let segments: Vec<&str> = rest.split('/').collect();
    segments.len() >= 2
        && segments.iter().all(|s| !s.is_empty())
        && !rest.contains(INVALID_PACKAGE_CHARS)
}

/// Normalize a configured base directory: empty falls back to `default`,
/// relative paths go under [`DEFAULT_ROOT`], trailing slashes are removed.
pub fn normalize_base_path(configured: &str, default: &str) -> String {
    let configured = normalize_path(configured.trim());
    let base = if configured.is_empty() {
        default.to_string()
    } else {
        configured
    };
    root_package(&base)
}

/// Asset name generated for a table row (`Burn` -> `GE_Burn`).
/// Rows whose name already carries the prefix keep it.
pub fn asset_name_for_row(prefix: &str, row_name: &str) -> String {
    if row_name.contains(prefix) {
        row_name.to_string()
    } else {
        format!("{}{}", prefix, row_name)
    }
}

/// Package path for a table row under `base_path`
pub fn asset_package_for_row(base_path: &str, prefix: &str, row_name: &str) -> String {
    format!(
        "{}/{}",
        base_path.trim_end_matches('/'),
        asset_name_for_row(prefix, row_name)
    )
}
