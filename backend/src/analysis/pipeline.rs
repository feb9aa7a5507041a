//! High-level pipeline: CSV input to a chart-ready [`AnalysisReport`].
//!
//! # Example
//!
//! ```rust,ignore
//! use migrastat::analysis::pipeline::{analyze_csv, AnalysisOptions};
//! use std::path::Path;
//!
//! let output = analyze_csv(
//!     Path::new("data/raw/Aussenwanderung_nach_Herkunfts_Ziel-Staat_2010-2023_0_0.csv"),
//!     &AnalysisOptions::default(),
//! )?;
//! for point in &output.report.totals {
//!     println!("{}: {:+}", point.year, point.balance);
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::PipelineError;
use crate::logs::{log_info, log_info_indent, log_success, log_warning, log_warning_indent};
use crate::models::{EntitySeries, PeakBalance, RawTable, TotalPoint, YearRankings};
use crate::parser::{parse_bytes_auto, parse_file_auto, ParseResult};

use super::aggregator::MigrationView;
use super::classifier::SkippedRow;

/// Skipped rows listed individually in the log before summarizing.
const MAX_LOGGED_SKIPS: usize = 5;

/// Options for one analysis run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOptions {
    /// Year for the top-N rankings; the latest available year when `None`.
    pub selected_year: Option<i32>,
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Whether the table could be read as migration data at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetShape {
    Migration,
    /// The key column is absent; no aggregation was attempted.
    MissingKeyColumn,
}

/// Peak-balance leaders and their yearly series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dynamics {
    pub leaders: Vec<PeakBalance>,
    pub series: Vec<EntitySeries>,
}

/// Everything a chart front end needs for one dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub shape: DatasetShape,
    /// Year axis of `totals`, ascending.
    pub available_years: Vec<i32>,
    pub totals: Vec<TotalPoint>,
    pub selected_year: Option<i32>,
    pub top_by_year: Option<YearRankings>,
    /// Only present when more than one year is available.
    pub dynamics: Option<Dynamics>,
    pub entity_columns: Vec<String>,
    pub excluded_columns: Vec<String>,
    pub skipped_rows: Vec<SkippedRow>,
}

impl AnalysisReport {
    fn not_migration() -> Self {
        Self {
            shape: DatasetShape::MissingKeyColumn,
            available_years: Vec::new(),
            totals: Vec::new(),
            selected_year: None,
            top_by_year: None,
            dynamics: None,
            entity_columns: Vec::new(),
            excluded_columns: Vec::new(),
            skipped_rows: Vec::new(),
        }
    }

    /// Migration-shaped and at least one year row found.
    pub fn has_year_data(&self) -> bool {
        !self.available_years.is_empty()
    }
}

/// CSV file information
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvInfo {
    pub encoding: String,
    pub delimiter: char,
    pub headers: Vec<String>,
    pub row_count: usize,
}

impl From<&ParseResult> for CsvInfo {
    fn from(parsed: &ParseResult) -> Self {
        Self {
            encoding: parsed.encoding.clone(),
            delimiter: parsed.delimiter,
            headers: parsed.headers.clone(),
            row_count: parsed.table.len(),
        }
    }
}

/// Result of a complete parse + analyze run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutput {
    pub report: AnalysisReport,
    pub csv_info: CsvInfo,
}

/// Run every aggregation on an already materialized table.
///
/// Pure: no logging, no I/O. Non-migration tables produce an empty report
/// with [`DatasetShape::MissingKeyColumn`].
pub fn analyze_table(table: &RawTable, options: &AnalysisOptions) -> AnalysisReport {
    let engine = &options.engine;
    let Some(view) = MigrationView::prepare(table, engine) else {
        return AnalysisReport::not_migration();
    };

    let totals = view.total_series();
    let available_years: Vec<i32> = totals.iter().map(|p| p.year).collect();

    let selected_year = options.selected_year.or_else(|| available_years.last().copied());
    let top_by_year = selected_year.map(|year| view.top_by_year(year, engine.top_n));

    let dynamics = (available_years.len() > 1).then(|| {
        let leaders = view.top_by_peak_balance(engine.top_k);
        let series = view.balance_series(&leaders);
        Dynamics { leaders, series }
    });

    AnalysisReport {
        shape: DatasetShape::Migration,
        available_years,
        totals,
        selected_year,
        top_by_year,
        dynamics,
        entity_columns: view.entity_columns().into_iter().map(String::from).collect(),
        excluded_columns: view.excluded_columns().into_iter().map(String::from).collect(),
        skipped_rows: view.index().skipped.clone(),
    }
}

/// Parse a CSV file and analyze it.
pub fn analyze_csv(path: &Path, options: &AnalysisOptions) -> Result<PipelineOutput, PipelineError> {
    log_info(format!("📖 Reading {}...", path.display()));
    let parsed = parse_file_auto(path)?;
    analyze_parsed(&parsed, options)
}

/// Parse CSV bytes (e.g. an upload) and analyze them.
pub fn analyze_bytes(bytes: &[u8], options: &AnalysisOptions) -> Result<PipelineOutput, PipelineError> {
    log_info(format!("📖 Reading {} bytes of CSV...", bytes.len()));
    let parsed = parse_bytes_auto(bytes)?;
    analyze_parsed(&parsed, options)
}

/// Analyze already-parsed CSV data, logging each step.
pub fn analyze_parsed(
    parsed: &ParseResult,
    options: &AnalysisOptions,
) -> Result<PipelineOutput, PipelineError> {
    log_success(format!("Detected encoding: {}", parsed.encoding));
    log_success(format!("Detected separator: '{}'", format_delimiter(parsed.delimiter)));
    log_success(format!(
        "Read {} rows, {} columns",
        parsed.table.len(),
        parsed.headers.len()
    ));

    log_info("🔎 Classifying rows and columns...");
    let report = analyze_table(&parsed.table, options);
    log_report(&report, &options.engine);

    Ok(PipelineOutput {
        report,
        csv_info: CsvInfo::from(parsed),
    })
}

/// Format delimiter for display
pub fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "TAB".to_string(),
        c => c.to_string(),
    }
}

fn log_report(report: &AnalysisReport, engine: &EngineConfig) {
    if report.shape == DatasetShape::MissingKeyColumn {
        log_warning(format!(
            "No migration data detected (column '{}' missing)",
            engine.key_column
        ));
        return;
    }

    if !report.skipped_rows.is_empty() {
        log_warning(format!("{} rows skipped (no readable year)", report.skipped_rows.len()));
        for skip in report.skipped_rows.iter().take(MAX_LOGGED_SKIPS) {
            log_warning_indent(format!("row {}: '{}' ({})", skip.row, skip.key, skip.reason), 1);
        }
    }

    log_success(format!(
        "{} entity columns, {} excluded",
        report.entity_columns.len(),
        report.excluded_columns.len()
    ));

    match (report.available_years.first(), report.available_years.last()) {
        (Some(first), Some(last)) => log_success(format!(
            "{} years of data ({}–{})",
            report.available_years.len(),
            first,
            last
        )),
        _ => {
            log_warning("No year data found");
            return;
        }
    }

    if let Some(rankings) = &report.top_by_year {
        if rankings.arrivals.is_none() {
            log_warning_indent(format!("No arrivals data for {}", rankings.year), 1);
        }
        if rankings.departures.is_none() {
            log_warning_indent(format!("No departures data for {}", rankings.year), 1);
        }
    }

    if let Some(dynamics) = &report.dynamics {
        log_info("📈 Largest yearly balances:");
        for leader in &dynamics.leaders {
            log_info_indent(format!("{}: {:.0}", leader.name, leader.peak_abs_balance), 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CsvError;

    const CSV: &str = "herkunftsgebiet_wegzugsgebiet;europa;italien;ukraine;schweiz;quelle
Kontinent;Europa;Europa;.;;
2021_ Zuzug;900;40;30;500;Statistik
2021_ Wegzug;800;35;20;700;Statistik
Summe_ Zuzug;1;1;1;1;
2022_ Zuzug;950;45;1478;520;Statistik
2022_ Wegzug;820;30;225;799;Statistik
";

    #[test]
    fn test_default_options() {
        let opts = AnalysisOptions::default();
        assert_eq!(opts.selected_year, None);
        assert_eq!(opts.engine.top_n, 10);
    }

    #[test]
    fn test_analyze_bytes_end_to_end() {
        let output = analyze_bytes(CSV.as_bytes(), &AnalysisOptions::default()).unwrap();
        let report = output.report;

        assert_eq!(output.csv_info.delimiter, ';');
        assert_eq!(output.csv_info.row_count, 6);
        assert_eq!(report.shape, DatasetShape::Migration);
        assert_eq!(report.available_years, vec![2021, 2022]);
        // ukraine is tagged "." in the continent row, so only schweiz counts
        assert_eq!(report.entity_columns, vec!["schweiz"]);
        assert_eq!(report.totals[1].arrivals, 520.0);
        assert_eq!(report.skipped_rows.len(), 1);
        assert_eq!(report.skipped_rows[0].key, "Summe_ Zuzug");
    }

    #[test]
    fn test_latest_year_selected_by_default() {
        let parsed = crate::parser::parse_table(CSV, ';').unwrap();
        let report = analyze_table(&parsed, &AnalysisOptions::default());

        assert_eq!(report.selected_year, Some(2022));
        let rankings = report.top_by_year.unwrap();
        assert_eq!(rankings.arrivals.unwrap()[0].column, "schweiz");
    }

    #[test]
    fn test_explicit_year_without_rows() {
        let table = crate::parser::parse_table(CSV, ';').unwrap();
        let options = AnalysisOptions {
            selected_year: Some(2015),
            ..AnalysisOptions::default()
        };
        let report = analyze_table(&table, &options);

        let rankings = report.top_by_year.unwrap();
        assert_eq!(rankings.year, 2015);
        assert!(rankings.arrivals.is_none());
        assert!(rankings.departures.is_none());
    }

    #[test]
    fn test_dynamics_need_more_than_one_year() {
        let table = RawTable::from_strs(
            &["herkunftsgebiet_wegzugsgebiet", "ukraine"],
            &[&["2022_ Zuzug", "1478"], &["2022_ Wegzug", "225"]],
        );
        let report = analyze_table(&table, &AnalysisOptions::default());
        assert!(report.dynamics.is_none());

        let full = crate::parser::parse_table(CSV, ';').unwrap();
        let dynamics = analyze_table(&full, &AnalysisOptions::default()).dynamics.unwrap();
        assert_eq!(dynamics.leaders[0].column, "schweiz");
        assert_eq!(dynamics.series[0].points.len(), 2);
    }

    #[test]
    fn test_not_migration_report() {
        let table = RawTable::from_strs(&["stadtteil", "einwohner"], &[&["Altstadt", "5000"]]);
        let report = analyze_table(&table, &AnalysisOptions::default());

        assert_eq!(report.shape, DatasetShape::MissingKeyColumn);
        assert!(!report.has_year_data());
        assert!(report.top_by_year.is_none());
    }

    #[test]
    fn test_header_only_input_is_an_empty_report() {
        let output =
            analyze_bytes(b"herkunftsgebiet_wegzugsgebiet;ukraine\n", &AnalysisOptions::default())
                .unwrap();
        let report = output.report;

        assert_eq!(output.csv_info.row_count, 0);
        assert_eq!(report.shape, DatasetShape::Migration);
        assert!(report.totals.is_empty());
        assert!(report.selected_year.is_none());
        assert!(report.top_by_year.is_none());
        assert!(report.dynamics.is_none());
    }

    #[test]
    fn test_header_only_other_table() {
        let output = analyze_bytes(b"stadtteil;einwohner\n", &AnalysisOptions::default()).unwrap();
        assert_eq!(output.report.shape, DatasetShape::MissingKeyColumn);
    }

    #[test]
    fn test_empty_input() {
        let result = analyze_bytes(b"", &AnalysisOptions::default());
        assert!(matches!(result, Err(PipelineError::Csv(CsvError::EmptyFile))));
    }

    #[test]
    fn test_analyze_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("aussenwanderung.csv");
        std::fs::write(&path, CSV).unwrap();

        let output = analyze_csv(&path, &AnalysisOptions::default()).unwrap();
        assert_eq!(output.report.totals.len(), 2);
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let table = crate::parser::parse_table(CSV, ';').unwrap();
        let json = serde_json::to_value(analyze_table(&table, &AnalysisOptions::default())).unwrap();

        assert_eq!(json["shape"], "migration");
        assert_eq!(json["availableYears"][0], 2021);
        assert_eq!(json["topByYear"]["year"], 2022);
        assert!(json["dynamics"]["leaders"].is_array());
    }
}
