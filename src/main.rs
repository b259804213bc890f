// Tariff Watch CLI
// Weekly snapshot → diff → history pipeline, plus overlay / lookup queries

use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};

use tariff_watch::config::parse_level;
use tariff_watch::{
    all_orders, compliance_report, compute_overlay, diff, insert_changes, load_snapshot_csv,
    open_database, orders_by_chapter, upsert_snapshot_rows, AppConfig, ChangeRecord, DiffSummary,
    NormalizedCode, Origin, Snapshot, SnapshotStore, TrackingMode,
};

const EXIT_SUCCESS: u8 = 0;
const EXIT_NO_MATCH: u8 = 1;
const EXIT_CONFIG: u8 = 2;
const EXIT_INPUT: u8 = 3;
const EXIT_STORAGE: u8 = 4;

#[derive(Parser)]
#[command(name = "tariff-watch")]
#[command(about = "HTS change detection and country-of-origin tariff overlay")]
#[command(version)]
struct Cli {
    /// Path to config.toml
    #[arg(long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Override runtime.log_level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import the current table, diff against the previous snapshot, record history
    Run {
        /// tracked_only or full_table (overrides config)
        #[arg(long)]
        mode: Option<String>,

        /// Producer CSV (overrides sources.hts_export_path)
        #[arg(long)]
        current: Option<PathBuf>,
    },

    /// Diff two snapshot CSV files
    Diff { previous: PathBuf, current: PathBuf },

    /// Effective tariff for one code and origin
    Overlay {
        #[arg(long)]
        hts: String,

        #[arg(long, default_value = "CN")]
        origin: String,

        /// Base MFN rate in percent
        #[arg(long)]
        base: Option<f64>,

        /// Take the base rate from this snapshot when --base is absent
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// Prefix-match rows of a snapshot (comma-separated codes)
    Lookup {
        #[arg(long)]
        hts: String,

        /// Snapshot CSV; defaults to the newest stored snapshot
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },

    /// List AD/CVD orders
    Orders {
        #[arg(long, default_value = "CN")]
        origin: String,

        #[arg(long)]
        chapter: Option<String>,
    },

    /// Regulatory, UFLPA and marking report for one code
    Compliance {
        #[arg(long)]
        hts: String,

        #[arg(long, default_value = "CN")]
        origin: String,
    },
}

struct CliError {
    code: u8,
    message: String,
}

impl CliError {
    fn no_match(msg: impl Into<String>) -> Self {
        Self { code: EXIT_NO_MATCH, message: msg.into() }
    }

    fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_CONFIG, message: msg.into() }
    }

    fn input(err: anyhow::Error) -> Self {
        Self { code: EXIT_INPUT, message: format!("{:#}", err) }
    }

    fn storage(err: anyhow::Error) -> Self {
        Self { code: EXIT_STORAGE, message: format!("{:#}", err) }
    }
}

type CliResult = Result<(), CliError>;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = cli
        .log_level
        .as_deref()
        .map(parse_level)
        .or_else(|| AppConfig::load(&cli.config).ok().map(|c| c.log_level()))
        .unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Run { mode, current } => cmd_run(&cli.config, mode, current),
        Commands::Diff { previous, current } => cmd_diff(&previous, &current),
        Commands::Overlay { hts, origin, base, snapshot } => {
            cmd_overlay(&hts, &origin, base, snapshot.as_deref())
        }
        Commands::Lookup { hts, snapshot } => cmd_lookup(&cli.config, &hts, snapshot.as_deref()),
        Commands::Orders { origin, chapter } => cmd_orders(&origin, chapter.as_deref()),
        Commands::Compliance { hts, origin } => cmd_compliance(&hts, &origin),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            ExitCode::from(code)
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> CliResult {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::storage(anyhow::Error::new(e)))?;
    println!("{}", text);
    Ok(())
}

fn load_config(path: &Path) -> Result<AppConfig, CliError> {
    AppConfig::load(path).map_err(|e| CliError::config(e.to_string()))
}

// ============================================================================
// RUN
// ============================================================================

fn cmd_run(config_path: &Path, mode: Option<String>, current: Option<PathBuf>) -> CliResult {
    let config = load_config(config_path)?;

    let mode = match mode {
        Some(m) => TrackingMode::parse(&m)
            .ok_or_else(|| CliError::config(format!("unknown mode: {}", m)))?,
        None => config.mode,
    };
    if mode == TrackingMode::TrackedOnly && config.tracked_hts.is_empty() {
        return Err(CliError::config("tracked_only mode needs at least one tracked_hts entry"));
    }

    let export_path = current.unwrap_or_else(|| config.sources.hts_export_path.clone());
    let table =
        load_snapshot_csv(&export_path, config.sources.name.clone()).map_err(CliError::input)?;

    let snapshot = match mode {
        TrackingMode::TrackedOnly => table.filter_prefixes(&config.tracked_hts),
        TrackingMode::FullTable => table,
    };
    info!(mode = %mode, rows = snapshot.len(), "current snapshot ready");

    let today = Utc::now().date_naive();
    let store = SnapshotStore::new(&config.storage.snapshots_dir);
    store.save(&snapshot, today).map_err(CliError::storage)?;
    store
        .apply_retention(config.storage.retain_weeks)
        .map_err(CliError::storage)?;

    let previous = match store.find_previous(Some(today)).map_err(CliError::storage)? {
        Some(path) => store.load(&path).map_err(CliError::input)?,
        None => {
            warn!("no previous snapshot; first run records a baseline only");
            Snapshot::empty()
        }
    };

    let changes: Vec<ChangeRecord> = diff(&previous, &snapshot, Utc::now());

    let conn = open_database(&config.storage.database_path).map_err(CliError::storage)?;
    upsert_snapshot_rows(&conn, &snapshot, today).map_err(CliError::storage)?;
    insert_changes(&conn, &changes).map_err(CliError::storage)?;

    print_json(&changes)?;
    println!("{}", DiffSummary::from_changes(&changes).summary());
    Ok(())
}

// ============================================================================
// QUERIES
// ============================================================================

fn cmd_diff(previous: &Path, current: &Path) -> CliResult {
    let prev = load_snapshot_csv(previous, None).map_err(CliError::input)?;
    let curr = load_snapshot_csv(current, None).map_err(CliError::input)?;
    let changes = diff(&prev, &curr, Utc::now());
    print_json(&changes)
}

fn cmd_overlay(hts: &str, origin: &str, base: Option<f64>, snapshot: Option<&Path>) -> CliResult {
    let (base_rate, missing_note) = match (base, snapshot) {
        (Some(pct), _) => (pct, None),
        (None, Some(path)) => {
            let snap = load_snapshot_csv(path, None).map_err(CliError::input)?;
            let rate = NormalizedCode::parse(hts)
                .and_then(|code| snap.get(&code).and_then(|row| row.rate_general_value));
            match rate {
                Some(pct) => (pct, None),
                None => (0.0, Some("Base MFN rate not found in snapshot; using 0%".to_string())),
            }
        }
        (None, None) => (0.0, None),
    };

    let mut overlay = compute_overlay(hts, origin, base_rate);
    if let Some(note) = missing_note {
        overlay.notes.insert(0, note);
    }
    print_json(&overlay)
}

fn parse_code_list(raw: &str) -> Result<Vec<NormalizedCode>, CliError> {
    let codes: Vec<NormalizedCode> = raw
        .split(',')
        .map(|part| {
            NormalizedCode::parse(part)
                .ok_or_else(|| CliError::config(format!("invalid HTS code: {:?}", part)))
        })
        .collect::<Result<_, _>>()?;
    if codes.is_empty() {
        return Err(CliError::config("no HTS codes given"));
    }
    Ok(codes)
}

fn cmd_lookup(config_path: &Path, hts: &str, snapshot: Option<&Path>) -> CliResult {
    let codes = parse_code_list(hts)?;

    let path = match snapshot {
        Some(p) => p.to_path_buf(),
        None => {
            let config = load_config(config_path)?;
            let store = SnapshotStore::new(&config.storage.snapshots_dir);
            store
                .list()
                .map_err(CliError::storage)?
                .pop()
                .ok_or_else(|| {
                    CliError::input(anyhow::anyhow!("no stored snapshots; run `tariff-watch run` first"))
                })?
        }
    };

    let snap = load_snapshot_csv(&path, None).map_err(CliError::input)?;
    let rows: Vec<_> = snap.matching(&codes).collect();
    if rows.is_empty() {
        return Err(CliError::no_match(format!("no rows match {}", hts)));
    }
    print_json(&rows)
}

fn cmd_orders(origin: &str, chapter: Option<&str>) -> CliResult {
    let origin = Origin::new(origin);
    let orders = match chapter {
        Some(ch) => orders_by_chapter(ch, &origin),
        None => all_orders(&origin),
    };
    print_json(&orders)
}

fn cmd_compliance(hts: &str, origin: &str) -> CliResult {
    print_json(&compliance_report(hts, &Origin::new(origin)))
}
