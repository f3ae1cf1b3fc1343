//! AbilitySync Core Library
//!
//! This crate keeps generated gameplay content in step with designer
//! config tables:
//! - Config row and generated asset definitions
//! - Path resolution for packages and object references
//! - Reconciliation of rows against an asset store, with dirty tracking
//! - Incremental snapshot import and garbage collection
//! - Schema export for spreadsheet tooling

pub mod fingerprint;
pub mod hooks;
pub mod import;
pub mod path_utils;
pub mod reconcile;
pub mod registry;
pub mod schema;
pub mod store;
pub mod types;

// Re-export commonly used types
pub use fingerprint::{fingerprint, ObjectState, StateWriter, SubObject};
pub use hooks::{ExtensionHooks, HookList};
pub use import::{
    changed_rows, collect_garbage, fill_from_json_file, import_and_reconcile, import_snapshot_file, parse_snapshot,
    reconcile_all, snapshot_table, DataTable, ImportError, ImportOptions, ImportReport,
};
pub use path_utils::{
    asset_name_for_row, asset_package_for_row, is_valid_long_package_name, normalize_base_path, normalize_path,
    resolve, AssetPath, PathError,
};
pub use reconcile::{Mode, ReconcileError, ReconcileRow, Reconciled, Reconciler, UnresolvedReference};
pub use registry::{ClassInfo, ClassKind, ClassRegistry, RegistryError};
pub use schema::{
    describe, generate_all_schemas, generate_schema_to_dir, signature_hash, write_schema_json, FieldDef, FieldType,
    Reflect, Schema, SchemaError, SchemaExportReport, StructCatalog, StructDef,
};
pub use store::{AssetStore, FileAssetStore, MemoryAssetStore, StoreError};
pub use types::{
    AbilityAsset, AbilityConfig, Asset, AssetKind, ConfigRow, EffectAsset, EffectConfig, ProjectSettings,
    SettingsError, TagContainer,
};
