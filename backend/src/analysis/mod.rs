//! Migration table analysis.
//!
//! ```text
//! RawTable ──▶ classifier ──▶ RowIndex ───┐
//!        │                                ├──▶ aggregator ──▶ totals / rankings / series
//!        └───▶ columns ────▶ EntityMask ──┘
//! ```
//!
//! - [`classifier`]: year/direction role of every row
//! - [`columns`]: which columns are countable entities, display names
//! - [`numeric`]: lenient cell parsing
//! - [`aggregator`]: the four chart queries
//! - [`pipeline`]: CSV in, [`AnalysisReport`] out
//!
//! Malformed input never fails an aggregation: unreadable rows are skipped
//! and reported, unreadable cells count as absent.

pub mod aggregator;
pub mod classifier;
pub mod columns;
pub mod numeric;
pub mod pipeline;

pub use aggregator::{balance_series, top_by_peak_balance, top_by_year, total_series, MigrationView};
pub use classifier::{classify, row_role, RowIndex, SkippedRow, YearRows};
pub use columns::{display_name, is_entity_column, EntityMask};
pub use numeric::parse_number;
pub use pipeline::{
    analyze_bytes, analyze_csv, analyze_parsed, analyze_table, AnalysisOptions, AnalysisReport,
    CsvInfo, DatasetShape, Dynamics, PipelineOutput,
};
