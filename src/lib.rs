// Tariff Watch - Core Library
// Snapshot diffing and duty-regime overlay, shared by the CLI and API server

pub mod normalize;  // HTS code / rate normalization
pub mod snapshot;   // Immutable tariff table snapshots
pub mod diff;       // Week-over-week change detection
pub mod origin;     // Country-of-origin alias matching
pub mod risk;       // AD/CVD risk tiers
pub mod regimes;    // Section 232/301, AD/CVD, compliance, advisories
pub mod overlay;    // Effective tariff aggregation
pub mod import;     // CSV → Snapshot
pub mod store;      // Dated snapshot files
pub mod db;         // SQLite change history
pub mod config;     // config.toml

// Re-export commonly used types
pub use normalize::{normalize_code, parse_rate, NormalizedCode};
pub use snapshot::{RawRow, Snapshot, SnapshotRow};
pub use diff::{diff, ChangeRecord, ChangeType, ChangeValue, DiffSummary};
pub use origin::Origin;
pub use risk::RiskTier;
pub use regimes::{
    all_orders, compliance_flags, compliance_report, lookup_adcvd, orders_by_chapter,
    AdcvdExposure, AdcvdOrder, ComplianceReport,
};
pub use overlay::{compute_overlay, AdcvdSection, TariffOverlay};
pub use import::{load_snapshot_csv, read_snapshot};
pub use store::SnapshotStore;
pub use db::{
    current_rates, insert_changes, open_database, rate_history, recent_changes,
    setup_database, upsert_snapshot_rows, StoredRate,
};
pub use config::{AppConfig, ConfigError, TrackingMode};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
