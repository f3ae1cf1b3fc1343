//! AbilitySync CLI
//!
//! Command-line interface for generating gameplay effect and ability assets
//! from designer config tables.

use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use abilitysync_core::types::{find_settings_file, SETTINGS_FILE};
use abilitysync_core::{
    collect_garbage, fill_from_json_file, generate_all_schemas, import_snapshot_file, reconcile_all, AbilityConfig,
    AssetKind, ClassRegistry, ConfigRow, DataTable, EffectConfig, ExtensionHooks, FileAssetStore, ImportOptions,
    ImportReport, ProjectSettings, ReconcileRow, Reconciler, StructCatalog,
};
use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

#[derive(Parser)]
#[command(name = "abilitysync")]
#[command(about = "Generate gameplay effect and ability assets from config tables")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Which tables a command works on
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Kind {
    Effect,
    Ability,
    All,
}

impl Kind {
    fn effects(self) -> bool {
        matches!(self, Kind::Effect | Kind::All)
    }

    fn abilities(self) -> bool {
        matches!(self, Kind::Ability | Kind::All)
    }

    fn asset_kind(self) -> Option<AssetKind> {
        match self {
            Kind::Effect => Some(AssetKind::Effect),
            Kind::Ability => Some(AssetKind::Ability),
            Kind::All => None,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new AbilitySync project
    Init {
        /// Directory to initialize (default: current directory)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Overwrite an existing abilitysync.json
        #[arg(long)]
        force: bool,
    },

    /// Create or update an asset for every table row
    Reconcile {
        #[arg(short, long, value_enum, default_value = "all")]
        kind: Kind,

        /// Delete generated assets that have no row
        #[arg(long)]
        clean: bool,
    },

    /// Import a JSON snapshot and update only the rows that changed
    Import {
        #[arg(short, long, value_enum, default_value = "effect")]
        kind: Kind,

        /// Snapshot file (default: jsonPath or abilityJsonPath from abilitysync.json)
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Delete generated assets that have no row
        #[arg(long)]
        clean: bool,
    },

    /// Load rows from a JSON file into a table without touching assets
    FillTable {
        #[arg(short, long, value_enum)]
        kind: Kind,

        /// JSON file with an array of rows
        file: PathBuf,

        /// Remove existing rows first
        #[arg(long)]
        clear: bool,
    },

    /// Export schema documents for the spreadsheet tooling
    Schema {
        /// Remove previously exported schemas first
        #[arg(long)]
        clear: bool,
    },

    /// Delete generated assets whose row no longer exists
    Gc {
        #[arg(short, long, value_enum, default_value = "all")]
        kind: Kind,
    },

    /// Re-import the snapshot whenever it changes
    Watch {
        #[arg(short, long, value_enum, default_value = "effect")]
        kind: Kind,

        /// Snapshot file (default: jsonPath or abilityJsonPath from abilitysync.json)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("abilitysync=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { path, force } => cmd_init(path, force),
        Commands::Reconcile { kind, clean } => cmd_reconcile(kind, clean),
        Commands::Import { kind, file, clean } => cmd_import(kind, file, clean),
        Commands::FillTable { kind, file, clear } => cmd_fill_table(kind, &file, clear),
        Commands::Schema { clear } => cmd_schema(clear),
        Commands::Gc { kind } => cmd_gc(kind),
        Commands::Watch { kind, file } => cmd_watch(kind, file),
    }
}

/// Settings, registry and directory of the project around the working directory
struct Project {
    dir: PathBuf,
    settings: ProjectSettings,
    registry: ClassRegistry,
}

impl Project {
    fn load() -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        let Some(settings_file) = find_settings_file(&cwd) else {
            bail!("No {} found. Run: abilitysync init", SETTINGS_FILE);
        };
        let dir = settings_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or(cwd);

        let settings = ProjectSettings::from_file(&settings_file)
            .with_context(|| format!("Failed to load {}", settings_file.display()))?;

        let registry = match &settings.class_registry {
            Some(file) => {
                let file = dir.join(file);
                ClassRegistry::from_file(&file)
                    .with_context(|| format!("Failed to load class registry {}", file.display()))?
            }
            None => ClassRegistry::builtin(),
        };

        tracing::debug!("Loaded project at {} ({} classes)", dir.display(), registry.len());
        Ok(Self { dir, settings, registry })
    }

    fn open_store(&self) -> Result<FileAssetStore> {
        let root = self.dir.join(&self.settings.content_root);
        FileAssetStore::open(&root).with_context(|| format!("Failed to open content root {}", root.display()))
    }

    fn table_file<R: ConfigRow>(&self) -> PathBuf {
        match R::KIND {
            AssetKind::Effect => self.dir.join(&self.settings.effect_table),
            AssetKind::Ability => self.dir.join(&self.settings.ability_table),
        }
    }

    fn load_table<R: ConfigRow>(&self) -> Result<DataTable<R>> {
        let file = self.table_file::<R>();
        DataTable::load(&file).with_context(|| format!("Failed to load table {}", file.display()))
    }

    fn snapshot_file(&self, kind: Kind, file: Option<PathBuf>) -> Result<PathBuf> {
        if let Some(file) = file {
            return Ok(file);
        }
        match kind.asset_kind() {
            Some(kind) => Ok(self.dir.join(self.settings.snapshot_path(kind))),
            None => bail!("A snapshot holds one kind of row; pass --kind effect or --kind ability"),
        }
    }
}

/// Print the outcome of one batch; returns the failure count
fn print_report(label: &str, report: &ImportReport) -> usize {
    println!(
        "{}: {} reconciled, {} failed, {} dirty, {} collected",
        label,
        report.succeeded,
        report.failed,
        report.dirty.len(),
        report.collected
    );
    for warning in &report.warnings {
        println!("  warning: {}", warning);
    }
    if !report.all_succeeded() {
        println!("Errors:\n{}", report.error_text());
    }
    report.failed
}

fn save_store(store: &mut FileAssetStore) -> Result<()> {
    let saved = store.save_dirty().context("Failed to save assets")?;
    println!("Saved {} asset(s)", saved);
    Ok(())
}

fn finish(failed: usize) -> Result<()> {
    if failed > 0 {
        bail!("{} row(s) failed", failed);
    }
    Ok(())
}

/// Initialize a new project
fn cmd_init(path: Option<PathBuf>, force: bool) -> Result<()> {
    let project_dir = match path {
        Some(path) => path,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let settings_path = project_dir.join(SETTINGS_FILE);
    if settings_path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", settings_path.display());
    }

    tracing::info!("Initializing AbilitySync project at {}", project_dir.display());

    let settings = ProjectSettings::default();
    for dir in [&settings.content_root, &settings.schema_path] {
        std::fs::create_dir_all(project_dir.join(dir))
            .with_context(|| format!("Failed to create {} directory", dir.display()))?;
    }

    let effect_table = project_dir.join(&settings.effect_table);
    if !effect_table.exists() {
        DataTable::<EffectConfig>::new()
            .save(&effect_table)
            .context("Failed to write effect table")?;
    }
    let ability_table = project_dir.join(&settings.ability_table);
    if !ability_table.exists() {
        DataTable::<AbilityConfig>::new()
            .save(&ability_table)
            .context("Failed to write ability table")?;
    }

    settings
        .save(&settings_path)
        .with_context(|| format!("Failed to write {}", SETTINGS_FILE))?;

    println!("Initialized AbilitySync project at {}", project_dir.display());
    println!("\nProject structure:");
    println!("  {:<24} - Project settings", SETTINGS_FILE);
    println!("  {:<24} - Effect rows", settings.effect_table.display());
    println!("  {:<24} - Ability rows", settings.ability_table.display());
    println!("  {:<24} - Generated assets", format!("{}/", settings.content_root.display()));
    println!("  {:<24} - Exported schemas", format!("{}/", settings.schema_path.display()));
    println!("\nNext steps:");
    println!("  1. Run: abilitysync schema");
    println!(
        "  2. Export rows to {} or {}",
        settings.json_path.display(),
        settings.ability_json_path.display()
    );
    println!("  3. Run: abilitysync import");

    Ok(())
}

fn reconcile_table<R: ReconcileRow>(
    project: &Project,
    store: &mut FileAssetStore,
    reconciler: &Reconciler<'_>,
    clean: bool,
) -> Result<ImportReport> {
    let table = project.load_table::<R>()?;
    let options = ImportOptions::for_rows::<R>(&project.settings).with_garbage_collection(clean);
    Ok(reconcile_all(&table, store, reconciler, &options)?)
}

/// Reconcile every row of the selected tables
fn cmd_reconcile(kind: Kind, clean: bool) -> Result<()> {
    let project = Project::load()?;
    let hooks = ExtensionHooks::new();
    let reconciler = Reconciler::new(&project.registry, &hooks, &project.settings);
    let mut store = project.open_store()?;

    let mut failed = 0;
    if kind.effects() {
        let report = reconcile_table::<EffectConfig>(&project, &mut store, &reconciler, clean)?;
        failed += print_report("Effects", &report);
    }
    if kind.abilities() {
        let report = reconcile_table::<AbilityConfig>(&project, &mut store, &reconciler, clean)?;
        failed += print_report("Abilities", &report);
    }

    save_store(&mut store)?;
    finish(failed)
}

fn import_table<R: ReconcileRow>(
    project: &Project,
    store: &mut FileAssetStore,
    reconciler: &Reconciler<'_>,
    file: &Path,
    clean: bool,
) -> Result<ImportReport> {
    let mut table = project.load_table::<R>()?;
    let options = ImportOptions::for_rows::<R>(&project.settings).with_garbage_collection(clean);
    let report = import_snapshot_file(file, &mut table, store, reconciler, &options)
        .with_context(|| format!("Failed to import {}", file.display()))?;

    if !report.changed.is_empty() {
        let table_file = project.table_file::<R>();
        table
            .save(&table_file)
            .with_context(|| format!("Failed to save table {}", table_file.display()))?;
    }
    Ok(report)
}

/// Import one snapshot and save the assets it changed
fn run_import(project: &Project, kind: Kind, file: &Path, clean: bool) -> Result<usize> {
    let hooks = ExtensionHooks::new();
    let reconciler = Reconciler::new(&project.registry, &hooks, &project.settings);
    let mut store = project.open_store()?;

    let report = match kind {
        Kind::Effect => import_table::<EffectConfig>(project, &mut store, &reconciler, file, clean)?,
        Kind::Ability => import_table::<AbilityConfig>(project, &mut store, &reconciler, file, clean)?,
        Kind::All => bail!("A snapshot holds one kind of row; pass --kind effect or --kind ability"),
    };

    if report.changed.is_empty() {
        println!("No rows changed in {}", file.display());
        return Ok(0);
    }
    println!("{} row(s) changed: {}", report.changed.len(), report.changed.join(", "));
    let failed = print_report("Import", &report);
    save_store(&mut store)?;
    Ok(failed)
}

/// Import a snapshot file
fn cmd_import(kind: Kind, file: Option<PathBuf>, clean: bool) -> Result<()> {
    let project = Project::load()?;
    let file = project.snapshot_file(kind, file)?;
    let failed = run_import(&project, kind, &file, clean)?;
    finish(failed)
}

fn fill_table<R: ConfigRow>(project: &Project, file: &Path, clear: bool) -> Result<()> {
    let mut table = project.load_table::<R>()?;
    let count = fill_from_json_file(&mut table, file, clear)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let table_file = project.table_file::<R>();
    table
        .save(&table_file)
        .with_context(|| format!("Failed to save table {}", table_file.display()))?;
    println!("Imported {} row(s) into {} ({} total)", count, table_file.display(), table.len());
    Ok(())
}

/// Load rows into a table
fn cmd_fill_table(kind: Kind, file: &Path, clear: bool) -> Result<()> {
    let project = Project::load()?;
    match kind {
        Kind::Effect => fill_table::<EffectConfig>(&project, file, clear),
        Kind::Ability => fill_table::<AbilityConfig>(&project, file, clear),
        Kind::All => bail!("Pass --kind effect or --kind ability"),
    }
}

/// Export every configured schema
fn cmd_schema(clear: bool) -> Result<()> {
    let project = Project::load()?;
    let catalog = StructCatalog::builtin();
    let report = generate_all_schemas(&project.settings, &project.dir, &catalog, clear);

    println!(
        "Schema export: {} succeeded, {} failed",
        report.success_count, report.failure_count
    );
    for file in &report.written {
        println!("  {}", file.display());
    }
    if !report.all_succeeded() {
        println!("Errors:\n{}", report.error_text());
        bail!("{} schema(s) failed", report.failure_count);
    }
    Ok(())
}

fn gc_table<R: ConfigRow>(project: &Project, store: &mut FileAssetStore) -> Result<usize> {
    let table = project.load_table::<R>()?;
    let options = ImportOptions::for_rows::<R>(&project.settings);
    let deleted = collect_garbage(store, &options.base_path, R::KIND, R::KIND.prefix(), table.names())
        .context("Garbage collection failed")?;
    println!("Deleted {} {} asset(s) under {}", deleted, R::KIND.label(), options.base_path);
    Ok(deleted)
}

/// Remove assets without a row
fn cmd_gc(kind: Kind) -> Result<()> {
    let project = Project::load()?;
    let mut store = project.open_store()?;
    if kind.effects() {
        gc_table::<EffectConfig>(&project, &mut store)?;
    }
    if kind.abilities() {
        gc_table::<AbilityConfig>(&project, &mut store)?;
    }
    Ok(())
}

/// Directory watched for changes to `file`
fn watch_dir(file: &Path) -> PathBuf {
    file.parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Watch the snapshot file and import on every change
fn cmd_watch(kind: Kind, file: Option<PathBuf>) -> Result<()> {
    let project = Project::load()?;
    let file = project.snapshot_file(kind, file)?;
    let dir = watch_dir(&file);
    let file_name = file.file_name().map(|name| name.to_os_string());

    let (tx, rx) = mpsc::channel();
    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| {
            if let Ok(event) = res {
                let _ = tx.send(event);
            }
        },
        Config::default().with_poll_interval(Duration::from_millis(500)),
    )
    .context("Failed to create watcher")?;
    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch {}", dir.display()))?;

    println!("Watching {} (Ctrl+C to stop)", file.display());
    if file.exists() {
        if let Err(e) = run_import(&project, kind, &file, false) {
            tracing::error!("Import failed: {:#}", e);
        }
    }

    loop {
        let event = match rx.recv() {
            Ok(event) => event,
            Err(_) => bail!("File watcher stopped"),
        };
        let touches_snapshot = matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
            && event.paths.iter().any(|path| path.file_name() == file_name.as_deref());
        if !touches_snapshot {
            continue;
        }

        // Editors save in bursts; wait for the writes to settle
        while rx.recv_timeout(Duration::from_millis(300)).is_ok() {}

        tracing::info!("{} changed, importing", file.display());
        match run_import(&project, kind, &file, false) {
            Ok(0) => {}
            Ok(failed) => tracing::warn!("{} row(s) failed", failed),
            Err(e) => tracing::error!("Import failed: {:#}", e),
        }
    }
}
