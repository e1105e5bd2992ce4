// Launchboard CLI - weekly client/product incorporation board

mod exit_codes;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Utc;
use clap::{Parser, Subcommand};

use launchboard_config::{ConfigError, Settings};
use launchboard_io::{export_sellers, import_file, write_dashboard, write_manifest, SqliteStore};
use launchboard_recon::{
    build_dashboard, Dashboard, ImportError, ImportStatus, ImportSummary, Importer, Kpi, KpiBands,
    ReportSource, YearWeek,
};

use exit_codes::{
    EXIT_CONFIG, EXIT_ERROR, EXIT_EXPORT, EXIT_STORE, EXIT_SUCCESS, EXIT_USAGE, EXIT_WORKBOOK,
};

#[derive(Parser)]
#[command(name = "lboard")]
#[command(about = "Reconcile weekly sales workbooks into a client/product incorporation board")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// SQLite store (overrides the `database` setting)
    #[arg(long, global = true, env = "LAUNCHBOARD_DB", value_name = "PATH")]
    db: Option<PathBuf>,

    /// Settings file (default: <config dir>/launchboard/settings.toml)
    #[arg(long, global = true, env = "LAUNCHBOARD_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a workbook and recompute the incorporation matrix
    #[command(after_help = "\
Examples:
  lboard import ventas.xlsx
  lboard import ventas.xlsx --json
  lboard --db /tmp/board.db import ventas.xlsx")]
    Import {
        /// Workbook to import (xlsx, xls, xlsb, ods)
        file: PathBuf,

        /// Print the import summary as JSON
        #[arg(long)]
        json: bool,

        /// Extract sheets on a single thread
        #[arg(long)]
        sequential: bool,
    },

    /// Show incorporation KPIs: total, per seller, per product
    Report {
        /// Emit the dashboard as JSON
        #[arg(long)]
        json: bool,

        /// Also write the dashboard to an xlsx workbook
        #[arg(long, value_name = "PATH")]
        xlsx: Option<PathBuf>,
    },

    /// Write per-seller JSON/CSV exports and a manifest from a workbook
    #[command(after_help = "\
Examples:
  lboard export ventas.xlsx
  lboard export ventas.xlsx --output out --version 2025-W07")]
    Export {
        /// Workbook with vendor sheets
        workbook: PathBuf,

        /// Output directory (default: `export_dir` setting)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        /// Version tag (default: current ISO week, e.g. 2025-W07)
        #[arg(long, value_name = "TAG")]
        version: Option<String>,
    },

    /// List recent import batches, latest first
    Batches {
        /// Maximum number of batches
        #[arg(long, default_value_t = 10)]
        limit: usize,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect settings
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the settings file path
    Path,
    /// Print the effective settings as TOML
    Show,
    /// Write a settings file with default values
    Init {
        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  launchboard-engine ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\ntarget:  ", env!("TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("GIT_COMMIT_HASH"), ")",
            "\nengine:  launchboard-engine ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\ntarget:  ", env!("TARGET"),
        )
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Settings::config_path);
    let loaded = Settings::load_from(&config_path);
    let fallback_level = loaded.as_ref().map(|s| s.log_level.as_str()).unwrap_or("warn");
    init_logging(cli.verbose, fallback_level);

    let result = loaded.map_err(CliError::config).and_then(|mut settings| {
        log::debug!("settings: {}", config_path.display());
        if let Some(db) = cli.db {
            settings.database = db;
        }
        log::debug!("store: {}", settings.database.display());
        match cli.command {
            Commands::Import { file, json, sequential } => cmd_import(&settings, &file, json, sequential),
            Commands::Report { json, xlsx } => cmd_report(&settings, json, xlsx.as_deref()),
            Commands::Export { workbook, output, version } => {
                cmd_export(&settings, &workbook, output, version)
            }
            Commands::Batches { limit, json } => cmd_batches(&settings, limit, json),
            Commands::Config(ConfigCommands::Path) => cmd_config_path(&config_path),
            Commands::Config(ConfigCommands::Show) => cmd_config_show(&settings),
            Commands::Config(ConfigCommands::Init { force }) => cmd_config_init(&config_path, force),
        }
    });

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

/// RUST_LOG wins over the settings file; `--verbose` wins over both.
fn init_logging(verbose: bool, fallback: &str) {
    let mut builder = env_logger::Builder::new();
    if verbose {
        builder.parse_filters("debug");
    } else if let Ok(filter) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filter);
    } else {
        builder.parse_filters(fallback);
    }
    builder.format_timestamp(None).target(env_logger::Target::Stderr);
    let _ = builder.try_init();
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self { code: EXIT_STORE, message: msg.into(), hint: None }
    }

    pub fn workbook(msg: impl Into<String>) -> Self {
        Self { code: EXIT_WORKBOOK, message: msg.into(), hint: None }
    }

    pub fn export(msg: impl Into<String>) -> Self {
        Self { code: EXIT_EXPORT, message: msg.into(), hint: None }
    }

    pub fn config(err: ConfigError) -> Self {
        Self {
            code: EXIT_CONFIG,
            message: err.to_string(),
            hint: Some("fix or remove the settings file; `lboard config path` shows where it is".to_string()),
        }
    }

    /// Map a failed import to its exit code.
    pub fn import(err: ImportError) -> Self {
        match err {
            ImportError::Workbook(msg) => Self::workbook(msg),
            ImportError::Store(e) => Self::store(e.to_string())
                .with_hint("nothing from this import was committed"),
        }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

fn open_store(settings: &Settings) -> Result<SqliteStore, CliError> {
    SqliteStore::open(&settings.database).map_err(|e| {
        CliError::store(format!("cannot open store {}: {}", settings.database.display(), e))
            .with_hint("check the `database` setting or pass --db")
    })
}

fn kpi_bands(settings: &Settings) -> KpiBands {
    KpiBands {
        green_at: settings.kpi.green_at,
        yellow_at: settings.kpi.yellow_at,
    }
}

fn require_file(path: &Path) -> Result<(), CliError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(CliError::usage(format!("file not found: {}", path.display())))
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| CliError::io(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

// ============================================================================
// import
// ============================================================================

fn cmd_import(settings: &Settings, file: &Path, json: bool, sequential: bool) -> Result<(), CliError> {
    require_file(file)?;
    let store = open_store(settings)?;
    let importer = Importer::new(store).parallel(settings.parallel_sheets && !sequential);

    eprintln!("{}", ImportStatus::InProgress);
    let result = import_file(&importer, file);
    eprintln!("{}", ImportStatus::from_result(&result));

    let summary = result.map_err(CliError::import)?;
    if json {
        print_json(&summary)
    } else {
        print_summary(&summary).map_err(|e| CliError::io(e.to_string()))
    }
}

fn print_summary(s: &ImportSummary) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    writeln!(out, "imported {} (batch {}, week {})", s.filename, s.batch_id, s.year_week)?;
    writeln!(
        out,
        "  sheets:   {} ({} vendor, {} single-product, {} skipped)",
        s.sheet_count, s.vendor_sheets, s.single_product_sheets, s.skipped_sheets
    )?;
    writeln!(out, "  clients:  {} ({} new)", s.client_count, s.new_clients)?;
    writeln!(out, "  products: {} ({} new)", s.product_count, s.new_products)?;
    writeln!(
        out,
        "  pairs:    {} ({} incorporated, {} pending)",
        s.pair_count, s.incorporated, s.pending
    )?;
    Ok(())
}

// ============================================================================
// report
// ============================================================================

fn cmd_report(settings: &Settings, json: bool, xlsx: Option<&Path>) -> Result<(), CliError> {
    let store = open_store(settings)?;
    let dashboard = build_dashboard(&store, &kpi_bands(settings)).map_err(|e| CliError::store(e.to_string()))?;

    if let Some(path) = xlsx {
        write_dashboard(&dashboard, path).map_err(|e| CliError::export(e.to_string()))?;
        eprintln!("wrote {}", path.display());
    }

    if json {
        print_json(&dashboard)
    } else {
        print_dashboard(&dashboard).map_err(|e| CliError::io(e.to_string()))
    }
}

fn print_dashboard(d: &Dashboard) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    write_kpi_line(&mut out, &d.total, "")?;
    writeln!(out)?;
    writeln!(out, "Sellers")?;
    for kpi in &d.sellers {
        write_kpi_line(&mut out, kpi, "  ")?;
    }
    writeln!(out)?;
    writeln!(out, "Products")?;
    for kpi in &d.products {
        write_kpi_line(&mut out, kpi, "  ")?;
    }
    writeln!(out)?;
    match d.last_update_line() {
        Some(line) => writeln!(out, "{}", line),
        None => writeln!(out, "no imports yet"),
    }
}

fn write_kpi_line(out: &mut impl Write, kpi: &Kpi, indent: &str) -> io::Result<()> {
    writeln!(
        out,
        "{}{:<28} {:>7}  {} [{}]",
        indent,
        kpi.label,
        kpi.percent_label(),
        kpi.detail(),
        kpi.band
    )
}

// ============================================================================
// export
// ============================================================================

fn cmd_export(
    settings: &Settings,
    workbook: &Path,
    output: Option<PathBuf>,
    version: Option<String>,
) -> Result<(), CliError> {
    require_file(workbook)?;
    let output = output.unwrap_or_else(|| settings.export_dir.clone());
    let now = Utc::now();
    let version = version.unwrap_or_else(|| YearWeek::at(now).to_string());

    let book = launchboard_io::load(workbook).map_err(|e| CliError::workbook(e.to_string()))?;
    std::fs::create_dir_all(&output)
        .map_err(|e| CliError::export(format!("cannot create {}: {}", output.display(), e)))?;

    let exports = export_sellers(&book, &output, &version, now).map_err(|e| CliError::export(e.to_string()))?;
    if exports.is_empty() {
        println!("no vendor sheets were detected");
        return Ok(());
    }

    let manifest = write_manifest(&output, &version, now, &exports).map_err(|e| CliError::export(e.to_string()))?;
    println!("generated exports for {} seller(s) under {}", exports.len(), output.display());
    for e in &exports {
        println!("  - {}: {} clients, {} products", e.seller, e.client_count, e.product_count);
    }
    println!("manifest saved to {}", manifest.display());
    Ok(())
}

// ============================================================================
// batches
// ============================================================================

fn cmd_batches(settings: &Settings, limit: usize, json: bool) -> Result<(), CliError> {
    let store = open_store(settings)?;
    let batches = store.batches(limit).map_err(|e| CliError::store(e.to_string()))?;
    if json {
        return print_json(&batches);
    }
    if batches.is_empty() {
        println!("no imports yet");
        return Ok(());
    }
    for b in &batches {
        println!(
            "{}  {}  {}  sheets={} clients={} products={}",
            b.imported_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M"),
            b.id,
            b.filename,
            b.sheet_count,
            b.client_count,
            b.product_count
        );
    }
    Ok(())
}

// ============================================================================
// config
// ============================================================================

fn cmd_config_path(path: &Path) -> Result<(), CliError> {
    println!("{}", path.display());
    Ok(())
}

fn cmd_config_show(settings: &Settings) -> Result<(), CliError> {
    let text = settings.to_toml().map_err(CliError::config)?;
    print!("{}", text);
    Ok(())
}

fn cmd_config_init(path: &Path, force: bool) -> Result<(), CliError> {
    if path.exists() && !force {
        return Err(CliError::usage(format!("{} already exists", path.display()))
            .with_hint("use --force to replace it with defaults"));
    }
    Settings::default().save_to(path).map_err(CliError::config)?;
    println!("wrote {}", path.display());
    Ok(())
}
