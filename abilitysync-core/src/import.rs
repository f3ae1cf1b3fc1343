//! Table import and incremental update
//!
//! A snapshot is a JSON array of `{ "Name": ..., <row fields> }` objects.
//! Each incoming row is compared with the row already in the table by its
//! serialized form; only new or different rows are written back to the
//! table and reconciled. Failures are counted per row and never undo
//! earlier successes.

use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::path_utils::{asset_name_for_row, asset_package_for_row, AssetPath};
use crate::reconcile::{ReconcileRow, Reconciler, UnresolvedReference};
use crate::store::{AssetStore, StoreError};
use crate::types::{AssetKind, ConfigRow, ProjectSettings};

/// Errors that abort a whole import
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot decode snapshot: {0}")]
    SerializationFailure(String),

    #[error("Failed to serialize table: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Named rows of one config type
#[derive(Debug, Clone, PartialEq)]
pub struct DataTable<R> {
    rows: BTreeMap<String, R>,
}

impl<R> Default for DataTable<R> {
    fn default() -> Self {
        Self { rows: BTreeMap::new() }
    }
}

impl<R: ConfigRow> DataTable<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a table file; a missing file is an empty table
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ImportError> {
        let mut table = Self::new();
        if path.as_ref().exists() {
            fill_from_json_file(&mut table, path, false)?;
        }
        Ok(table)
    }

    /// Write the table as a JSON array of `{Name, ...}` objects
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ImportError> {
        let path = path.as_ref();
        let mut entries = Vec::with_capacity(self.rows.len());
        for (name, row) in &self.rows {
            let mut object = Map::new();
            object.insert("Name".to_string(), Value::String(name.clone()));
            if let Value::Object(fields) = serde_json::to_value(row)? {
                object.extend(fields);
            }
            entries.push(Value::Object(object));
        }

        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| ImportError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(&Value::Array(entries))?;
        fs::write(path, json).map_err(|source| ImportError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&R> {
        self.rows.get(name)
    }

    /// Add or replace a row
    pub fn upsert(&mut self, name: &str, row: R) {
        self.rows.insert(name.to_string(), row);
    }

    pub fn remove(&mut self, name: &str) -> Option<R> {
        self.rows.remove(name)
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rows.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &R)> {
        self.rows.iter().map(|(name, row)| (name.as_str(), row))
    }
}

/// Fill `table` from a JSON file; returns how many rows were read
pub fn fill_from_json_file<R: ConfigRow, P: AsRef<Path>>(
    table: &mut DataTable<R>,
    file: P,
    clear_first: bool,
) -> Result<usize, ImportError> {
    let rows = read_snapshot_file::<R>(file.as_ref())?;
    if clear_first {
        table.clear();
    }
    let count = rows.len();
    for (name, row) in rows {
        table.upsert(&name, row);
    }
    Ok(count)
}

fn read_snapshot_file<R: ConfigRow>(file: &Path) -> Result<BTreeMap<String, R>, ImportError> {
    let content = fs::read_to_string(file).map_err(|source| ImportError::Io {
        path: file.to_path_buf(),
        source,
    })?;
    parse_snapshot(&content)
}

/// Serialized form of every row, keyed by name
pub fn snapshot_table<R: ConfigRow>(table: &DataTable<R>) -> BTreeMap<String, String> {
    table
        .iter()
        .filter_map(|(name, row)| match serde_json::to_string(row) {
            Ok(json) => Some((name.to_string(), json)),
            Err(e) => {
                tracing::warn!("Failed to serialize row {}: {}", name, e);
                None
            }
        })
        .collect()
}

/// Decode a snapshot document.
///
/// Entries that are not objects, have no `Name`, or do not decode are
/// skipped with a warning. Only a document that is not a JSON array fails.
pub fn parse_snapshot<R: ConfigRow>(json: &str) -> Result<BTreeMap<String, R>, ImportError> {
    let document: Value =
        serde_json::from_str(json).map_err(|e| ImportError::SerializationFailure(e.to_string()))?;
    let Value::Array(entries) = document else {
        return Err(ImportError::SerializationFailure(
            "expected a JSON array of rows".to_string(),
        ));
    };

    let mut rows = BTreeMap::new();
    for (index, entry) in entries.into_iter().enumerate() {
        let Value::Object(mut object) = entry else {
            tracing::warn!("Snapshot entry {} is not an object, skipped", index);
            continue;
        };

        let name = match object.remove("Name") {
            Some(Value::String(name)) if !name.trim().is_empty() => name.trim().to_string(),
            _ => {
                tracing::warn!("Snapshot entry {} has no Name, skipped", index);
                continue;
            }
        };

        match serde_json::from_value::<R>(Value::Object(object)) {
            Ok(row) => {
                if rows.insert(name.clone(), row).is_some() {
                    tracing::warn!("Duplicate row {} in snapshot, the later entry wins", name);
                }
            }
            Err(e) => tracing::warn!("Failed to decode row {}, skipped: {}", name, e),
        }
    }
    Ok(rows)
}

/// Names that are new in `incoming` or serialize differently than in `prior`
pub fn changed_rows(prior: &BTreeMap<String, String>, incoming: &BTreeMap<String, String>) -> Vec<String> {
    incoming
        .iter()
        .filter(|(name, json)| prior.get(*name) != Some(*json))
        .map(|(name, _)| name.clone())
        .collect()
}

/// Where generated assets go and whether stale ones are removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOptions {
    /// Normalized base package directory
    pub base_path: String,
    /// Delete generated assets whose row is not in the table
    pub collect_garbage: bool,
}

impl ImportOptions {
    pub fn new(base_path: &str) -> Self {
        Self {
            base_path: base_path.to_string(),
            collect_garbage: false,
        }
    }

    /// Base path configured for rows of type `R`
    pub fn for_rows<R: ConfigRow>(settings: &ProjectSettings) -> Self {
        match R::KIND {
            AssetKind::Effect => Self::new(&settings.effect_base_path()),
            AssetKind::Ability => Self::new(&settings.ability_base_path()),
        }
    }

    pub fn with_garbage_collection(mut self, enabled: bool) -> Self {
        self.collect_garbage = enabled;
        self
    }
}

/// Aggregate outcome of an import or a full reconcile
#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    /// Rows that were reconciled
    pub changed: Vec<String>,
    pub succeeded: usize,
    pub failed: usize,
    pub errors: Vec<String>,
    /// Assets deleted by garbage collection
    pub collected: usize,
    /// Assets left dirty by this run
    pub dirty: Vec<AssetPath>,
    pub warnings: Vec<UnresolvedReference>,
}

impl ImportReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    /// Newline-joined error list
    pub fn error_text(&self) -> String {
        self.errors.join("\n")
    }
}

/// Delete every asset of `kind` under `base_path` whose row name is not in
/// `names`; returns how many were deleted
pub fn collect_garbage<'n>(
    store: &mut dyn AssetStore,
    base_path: &str,
    kind: AssetKind,
    prefix: &str,
    names: impl IntoIterator<Item = &'n str>,
) -> Result<usize, StoreError> {
    let desired: BTreeSet<String> = names
        .into_iter()
        .map(|name| asset_name_for_row(prefix, name))
        .collect();

    let stale: Vec<AssetPath> = store
        .list(base_path, kind)
        .into_iter()
        .filter(|path| !desired.contains(&path.asset_name))
        .collect();

    let mut deleted = 0;
    for path in &stale {
        if store.delete(path)? {
            tracing::info!("Deleted {} (no matching row)", path);
            deleted += 1;
        }
    }

    if deleted > 0 {
        tracing::info!("Garbage collection removed {} {} asset(s) under {}", deleted, kind.label(), base_path);
    }
    Ok(deleted)
}

fn collect_for_table<R: ConfigRow>(
    table: &DataTable<R>,
    store: &mut dyn AssetStore,
    options: &ImportOptions,
) -> Result<usize, StoreError> {
    collect_garbage(store, &options.base_path, R::KIND, R::KIND.prefix(), table.names())
}

fn reconcile_rows<R: ReconcileRow>(
    table: &DataTable<R>,
    names: &[String],
    store: &mut dyn AssetStore,
    reconciler: &Reconciler<'_>,
    options: &ImportOptions,
    report: &mut ImportReport,
) {
    for name in names {
        let Some(row) = table.get(name) else {
            continue;
        };
        let target = asset_package_for_row(&options.base_path, R::KIND.prefix(), name);

        match row.reconcile_into(reconciler, store, &target) {
            Ok(result) => {
                report.succeeded += 1;
                if result.changed {
                    report.dirty.push(result.path);
                }
                report.warnings.extend(result.warnings);
            }
            Err(e) => {
                tracing::error!("Failed to reconcile {}: {}", target, e);
                report.failed += 1;
                report.errors.push(format!("{}: {}", target, e));
            }
        }
    }

    tracing::info!(
        "Reconciled {} {} row(s): {} succeeded, {} failed",
        names.len(),
        R::KIND.label(),
        report.succeeded,
        report.failed
    );
}

/// Merge decoded snapshot rows into `table` and reconcile what changed.
///
/// When nothing differs the table and store are left untouched.
pub fn import_and_reconcile<R: ReconcileRow>(
    table: &mut DataTable<R>,
    store: &mut dyn AssetStore,
    reconciler: &Reconciler<'_>,
    mut rows: BTreeMap<String, R>,
    options: &ImportOptions,
) -> Result<ImportReport, ImportError> {
    let mut report = ImportReport::default();

    let prior = snapshot_table(table);
    let incoming: BTreeMap<String, String> = rows
        .iter()
        .filter_map(|(name, row)| serde_json::to_string(row).ok().map(|json| (name.clone(), json)))
        .collect();

    let changed = changed_rows(&prior, &incoming);
    if changed.is_empty() {
        tracing::info!("No {} rows changed", R::KIND.label());
        return Ok(report);
    }
    tracing::info!("{} {} row(s) changed", changed.len(), R::KIND.label());

    for name in &changed {
        if let Some(row) = rows.remove(name) {
            tracing::debug!("Row {} changed", name);
            table.upsert(name, row);
        }
    }

    if options.collect_garbage {
        report.collected = collect_for_table(table, store, options)?;
    }

    reconcile_rows(table, &changed, store, reconciler, options, &mut report);
    report.changed = changed;
    Ok(report)
}

/// Read a snapshot file and import it
pub fn import_snapshot_file<R: ReconcileRow, P: AsRef<Path>>(
    file: P,
    table: &mut DataTable<R>,
    store: &mut dyn AssetStore,
    reconciler: &Reconciler<'_>,
    options: &ImportOptions,
) -> Result<ImportReport, ImportError> {
    let rows = read_snapshot_file::<R>(file.as_ref())?;
    tracing::info!("Read {} row(s) from {}", rows.len(), file.as_ref().display());
    import_and_reconcile(table, store, reconciler, rows, options)
}

/// Reconcile every row of the table
pub fn reconcile_all<R: ReconcileRow>(
    table: &DataTable<R>,
    store: &mut dyn AssetStore,
    reconciler: &Reconciler<'_>,
    options: &ImportOptions,
) -> Result<ImportReport, ImportError> {
    let mut report = ImportReport::default();
    if options.collect_garbage {
        report.collected = collect_for_table(table, store, options)?;
    }

    let names: Vec<String> = table.names().map(str::to_string).collect();
    reconcile_rows(table, &names, store, reconciler, options, &mut report);
    report.changed = names;
    Ok(report)
}
