//! # Migrastat - foreign migration statistics for charting
//!
//! Migrastat reads the municipal "Aussenwanderung" CSV export (one row per
//! year and direction, one column per country) and derives the series a
//! chart front end needs.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   CSV File  │────▶│   Parser    │────▶│  Classifier │────▶│  Aggregator │
//! │  (ISO/UTF8) │     │  (auto-enc) │     │ rows + cols │     │ chart series│
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use migrastat::{analyze_csv, AnalysisOptions};
//! use std::path::Path;
//!
//! let output = analyze_csv(Path::new("wanderung.csv"), &AnalysisOptions::default())?;
//! for point in &output.report.totals {
//!     println!("{}: {:+}", point.year, point.balance);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`config`] - Engine and server configuration
//! - [`logs`] - Log broadcaster (stdout + SSE)
//! - [`models`] - Table and chart series types
//! - [`parser`] - CSV parsing with auto-detection
//! - [`analysis`] - Row classification, column filtering, aggregation
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod logs;
pub mod models;

// Parsing
pub mod parser;

// Analysis
pub mod analysis;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{ConfigError, CsvError, PipelineError, ServerError};

// =============================================================================
// Re-exports - Configuration
// =============================================================================

pub use config::{EngineConfig, ServerConfig, TotalsScope};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    BalancePoint,
    Direction,
    EntitySeries,
    PeakBalance,
    RankedEntity,
    RawTable,
    RowRole,
    TotalPoint,
    YearFact,
    YearRankings,
};

// =============================================================================
// Re-exports - CSV Parsing
// =============================================================================

pub use parser::{
    decode_content,
    detect_delimiter,
    detect_encoding,
    parse_bytes_auto,
    parse_file,
    parse_file_auto,
    parse_table,
    ParseResult,
};

// =============================================================================
// Re-exports - Analysis
// =============================================================================

pub use analysis::{
    balance_series,
    classify,
    display_name,
    top_by_peak_balance,
    top_by_year,
    total_series,
    MigrationView,
};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use analysis::{
    analyze_bytes,
    analyze_csv,
    analyze_table,
    AnalysisOptions,
    AnalysisReport,
    CsvInfo,
    DatasetShape,
    Dynamics,
    PipelineOutput,
};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
