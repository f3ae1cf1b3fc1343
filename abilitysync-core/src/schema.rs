//! Schema export for spreadsheet tooling
//!
//! Row types describe themselves through [`Reflect`], a static field table
//! built once per type. [`describe`] walks that table (parent fields first)
//! and produces a [`Schema`] document that the spreadsheet tooling uses to
//! lay out sheets and to detect when cached templates are out of date via
//! the structural signature hash.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::ProjectSettings;

/// Suffix used by generated sentinel entries at the end of engine enums
const ENUM_SENTINEL_SUFFIX: &str = "_MAX";

/// File name suffix of exported schema documents
pub const SCHEMA_FILE_SUFFIX: &str = ".schema.json";

/// Errors produced while exporting schemas
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Output path is empty")]
    EmptyOutputPath,

    #[error("Failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize schema: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Unknown struct type: {0}")]
    UnknownStruct(String),
}

/// Static description of an enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumDef {
    pub path: &'static str,
    pub names: &'static [&'static str],
}

impl EnumDef {
    /// Value names without the trailing sentinel entry
    pub fn value_names(&self) -> Vec<String> {
        self.names
            .iter()
            .filter(|name| !name.ends_with(ENUM_SENTINEL_SUFFIX))
            .map(|name| name.to_string())
            .collect()
    }
}

/// Enums that can describe themselves
pub trait ReflectEnum {
    const DEF: EnumDef;
}

/// Primitive shape of a field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    Bool,
    Int,
    Int64,
    Float,
    Double,
    Str,
    Name,
    Text,
    Enum(EnumDef),
    /// Nested struct, referenced by its path
    Struct(String),
    Array(Box<FieldType>),
    /// Anything else, carrying the engine property class name
    Unknown(String),
}

impl FieldType {
    pub fn enumeration<E: ReflectEnum>() -> Self {
        FieldType::Enum(E::DEF)
    }

    pub fn structure<S: Reflect>() -> Self {
        FieldType::Struct(S::STRUCT_PATH.to_string())
    }

    pub fn array(inner: FieldType) -> Self {
        FieldType::Array(Box::new(inner))
    }

    pub fn tag_container() -> Self {
        FieldType::Struct("/Script/GameplayTags.GameplayTagContainer".to_string())
    }

    pub fn tag() -> Self {
        FieldType::Struct("/Script/GameplayTags.GameplayTag".to_string())
    }

    /// Kind name written to schema documents
    pub fn kind(&self) -> &'static str {
        match self {
            FieldType::Bool => "bool",
            FieldType::Int | FieldType::Int64 => "int",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::Str => "string",
            FieldType::Name => "name",
            FieldType::Text => "text",
            FieldType::Enum(_) => "enum",
            FieldType::Struct(_) => "struct",
            FieldType::Array(_) => "array",
            FieldType::Unknown(_) => "unknown",
        }
    }

    /// Engine property class name, used for the structural signature
    pub fn property_class(&self) -> &str {
        match self {
            FieldType::Bool => "BoolProperty",
            FieldType::Int => "IntProperty",
            FieldType::Int64 => "Int64Property",
            FieldType::Float => "FloatProperty",
            FieldType::Double => "DoubleProperty",
            FieldType::Str => "StrProperty",
            FieldType::Name => "NameProperty",
            FieldType::Text => "TextProperty",
            FieldType::Enum(_) => "EnumProperty",
            FieldType::Struct(_) => "StructProperty",
            FieldType::Array(_) => "ArrayProperty",
            FieldType::Unknown(class) => class.as_str(),
        }
    }
}

/// Optional per-field hints for spreadsheet tooling
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMeta {
    pub ignore: bool,
    pub display_name: String,
    pub hint: String,
    pub sheet: String,
    pub separator: String,
}

/// One declared field of a struct
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub category: String,
    pub ty: FieldType,
    pub meta: FieldMeta,
}

impl FieldDef {
    pub fn new(name: &str, category: &str, ty: FieldType) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            ty,
            meta: FieldMeta::default(),
        }
    }

    pub fn hint(mut self, hint: &str) -> Self {
        self.meta.hint = hint.to_string();
        self
    }

    pub fn sheet(mut self, sheet: &str) -> Self {
        self.meta.sheet = sheet.to_string();
        self
    }

    pub fn separator(mut self, separator: &str) -> Self {
        self.meta.separator = separator.to_string();
        self
    }

    pub fn display_name(mut self, name: &str) -> Self {
        self.meta.display_name = name.to_string();
        self
    }

    pub fn ignored(mut self) -> Self {
        self.meta.ignore = true;
        self
    }
}

/// Static description of a struct and its parent chain
#[derive(Debug, Clone, PartialEq)]
pub struct StructDef {
    /// Full path, e.g. `/Script/AbilitySync.GameplayEffectConfig`
    pub path: String,
    pub parent: Option<Box<StructDef>>,
    pub fields: Vec<FieldDef>,
}

impl StructDef {
    pub fn new(path: &str, fields: Vec<FieldDef>) -> Self {
        Self {
            path: path.to_string(),
            parent: None,
            fields,
        }
    }

    /// Derive a subtype that adds `fields` after everything in `parent`
    pub fn extending(path: &str, parent: StructDef, fields: Vec<FieldDef>) -> Self {
        Self {
            path: path.to_string(),
            parent: Some(Box::new(parent)),
            fields,
        }
    }

    /// Short name (`GameplayEffectConfig`)
    pub fn name(&self) -> &str {
        self.path
            .rsplit(['.', '/'])
            .next()
            .unwrap_or(&self.path)
    }

    /// All fields, inherited ones first, each in declaration order
    pub fn all_fields(&self) -> Vec<&FieldDef> {
        let mut fields = self
            .parent
            .as_ref()
            .map(|parent| parent.all_fields())
            .unwrap_or_default();
        fields.extend(self.fields.iter());
        fields
    }

    /// Whether this struct is `path` or derives from it
    pub fn is_child_of(&self, path: &str) -> bool {
        self.path == path
            || self
                .parent
                .as_ref()
                .map(|parent| parent.is_child_of(path))
                .unwrap_or(false)
    }
}

/// Types with a static field table
pub trait Reflect {
    const STRUCT_PATH: &'static str;

    fn struct_def() -> StructDef;
}

/// Schema document for one field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaField {
    pub name: String,
    pub category: String,
    pub kind: String,
    pub enum_path: String,
    pub enum_values: Vec<String>,
    pub struct_path: String,
    pub inner_kind: String,
    pub inner_struct_path: String,
    pub inner_enum_path: String,
    pub inner_enum_values: Vec<String>,
    pub excel_ignore: bool,
    pub excel_name: String,
    pub excel_hint: String,
    pub excel_sheet: String,
    pub excel_separator: String,
}

/// Schema document for one struct
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub struct_path: String,
    pub hash: String,
    pub fields: Vec<SchemaField>,
    pub special_rules: BTreeMap<String, String>,
}

/// Type names the tooling serializes with dedicated rules
fn special_rules() -> BTreeMap<String, String> {
    [
        ("GameplayTagContainer", "tag_container_rule"),
        ("GameplayAttribute", "attribute_rule"),
        ("TagRequirementsConfig", "tag_requirements_rule"),
        ("SoftClassPath", "asset_path_rule"),
        ("SoftObjectPath", "asset_path_rule"),
    ]
    .iter()
    .map(|(name, rule)| (name.to_string(), rule.to_string()))
    .collect()
}

/// Structural signature: SHA-256 over `name:PropertyClass;` in walk order.
/// Changes whenever a field is added, removed, renamed, reordered or
/// changes primitive shape.
pub fn signature_hash(def: &StructDef) -> String {
    let mut hasher = Sha256::new();
    for field in def.all_fields() {
        hasher.update(field.name.as_bytes());
        hasher.update(b":");
        hasher.update(field.ty.property_class().as_bytes());
        hasher.update(b";");
    }
    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

fn describe_field(field: &FieldDef) -> SchemaField {
    let mut out = SchemaField {
        name: field.name.clone(),
        category: field.category.clone(),
        kind: field.ty.kind().to_string(),
        excel_ignore: field.meta.ignore,
        excel_name: field.meta.display_name.clone(),
        excel_hint: field.meta.hint.clone(),
        excel_sheet: field.meta.sheet.clone(),
        excel_separator: field.meta.separator.clone(),
        ..Default::default()
    };

    match &field.ty {
        FieldType::Enum(def) => {
            out.enum_path = def.path.to_string();
            out.enum_values = def.value_names();
        }
        FieldType::Struct(path) => out.struct_path = path.clone(),
        FieldType::Array(inner) => {
            out.inner_kind = inner.kind().to_string();
            match inner.as_ref() {
                FieldType::Struct(path) => out.inner_struct_path = path.clone(),
                FieldType::Enum(def) => {
                    out.inner_enum_path = def.path.to_string();
                    out.inner_enum_values = def.value_names();
                }
                _ => {}
            }
        }
        _ => {}
    }

    out
}

/// Build the schema document for a struct
pub fn describe(def: &StructDef) -> Schema {
    Schema {
        struct_path: def.path.clone(),
        hash: signature_hash(def),
        fields: def.all_fields().into_iter().map(describe_field).collect(),
        special_rules: special_rules(),
    }
}

/// Write the schema of `def` to `out_file`, creating parent directories
pub fn write_schema_json(def: &StructDef, out_file: &Path) -> Result<(), SchemaError> {
    if out_file.as_os_str().is_empty() {
        return Err(SchemaError::EmptyOutputPath);
    }

    let json = serde_json::to_string_pretty(&describe(def))?;

    if let Some(dir) = out_file.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|source| SchemaError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    fs::write(out_file, json).map_err(|source| SchemaError::Write {
        path: out_file.to_path_buf(),
        source,
    })
}

/// Write `<StructName>.schema.json` into `dir`
pub fn generate_schema_to_dir(def: &StructDef, dir: &Path) -> Result<PathBuf, SchemaError> {
    fs::create_dir_all(dir).map_err(|source| SchemaError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let out_file = dir.join(format!("{}{}", def.name(), SCHEMA_FILE_SUFFIX));
    write_schema_json(def, &out_file)?;
    Ok(out_file)
}

/// Known struct definitions, looked up by path
#[derive(Debug, Clone, Default)]
pub struct StructCatalog {
    structs: BTreeMap<String, StructDef>,
}

impl StructCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog with every row and nested config type of this crate
    pub fn builtin() -> Self {
        use crate::types::*;

        let mut catalog = Self::new();
        catalog.register(EffectConfig::struct_def());
        catalog.register(AbilityConfig::struct_def());
        catalog.register(ModifierConfig::struct_def());
        catalog.register(AttributeBasedModifierConfig::struct_def());
        catalog.register(SetByCallerModifierConfig::struct_def());
        catalog.register(TagRequirementsConfig::struct_def());
        catalog.register(GameplayCueConfig::struct_def());
        catalog.register(EffectQueryConfig::struct_def());
        catalog.register(ExecutionConfig::struct_def());
        catalog.register(AbilityTriggerConfig::struct_def());
        catalog
    }

    pub fn register(&mut self, def: StructDef) {
        self.structs.insert(def.path.clone(), def);
    }

    pub fn find(&self, path: &str) -> Option<&StructDef> {
        self.structs.get(path.trim())
    }

    pub fn len(&self) -> usize {
        self.structs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structs.is_empty()
    }
}

/// Outcome of a batch schema export
#[derive(Debug, Clone, Default)]
pub struct SchemaExportReport {
    pub success_count: usize,
    pub failure_count: usize,
    pub written: Vec<PathBuf>,
    pub errors: Vec<String>,
}

impl SchemaExportReport {
    pub fn all_succeeded(&self) -> bool {
        self.failure_count == 0
    }

    /// Newline-joined error list
    pub fn error_text(&self) -> String {
        self.errors.join("\n")
    }
}

/// Remove previously exported `*.schema.json` files from `dir`
fn clear_schema_dir(dir: &Path) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let is_schema = path
            .file_name()
            .and_then(|name| name.to_str())
            .map(|name| name.ends_with(SCHEMA_FILE_SUFFIX))
            .unwrap_or(false);
        if is_schema {
            match fs::remove_file(&path) {
                Ok(()) => tracing::info!("Removed stale schema {}", path.display()),
                Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
    }
}

/// Export every struct listed in the settings to the schema directory.
///
/// One failing struct never stops the others; each failure is counted and
/// described in the report.
pub fn generate_all_schemas(
    settings: &ProjectSettings,
    project_dir: &Path,
    catalog: &StructCatalog,
    clear_first: bool,
) -> SchemaExportReport {
    let mut report = SchemaExportReport::default();
    let paths = &settings.struct_types_to_export;

    if paths.is_empty() {
        tracing::info!("No struct types configured for schema export");
        return report;
    }

    let schema_dir = project_dir.join(&settings.schema_path);
    if clear_first {
        clear_schema_dir(&schema_dir);
    }

    tracing::info!("Exporting {} schema(s) to {}", paths.len(), schema_dir.display());

    for path in paths {
        if path.trim().is_empty() {
            report.failure_count += 1;
            report.errors.push("Encountered an empty struct path".to_string());
            continue;
        }

        let Some(def) = catalog.find(path) else {
            let error = SchemaError::UnknownStruct(path.clone());
            tracing::error!("{}", error);
            report.failure_count += 1;
            report.errors.push(error.to_string());
            continue;
        };

        match generate_schema_to_dir(def, &schema_dir) {
            Ok(file) => {
                tracing::info!("Wrote schema for {}", def.name());
                report.success_count += 1;
                report.written.push(file);
            }
            Err(e) => {
                let error = format!("[{}] {}", def.name(), e);
                tracing::error!("Schema export failed: {}", error);
                report.failure_count += 1;
                report.errors.push(error);
            }
        }
    }

    tracing::info!(
        "Schema export finished: {} succeeded, {} failed",
        report.success_count,
        report.failure_count
    );
    report
}
