//! Domain models for migration statistics.
//!
//! - [`RawTable`] - the untyped, wide-format table as read from CSV
//! - [`RowRole`] / [`Direction`] - what a row of the table stands for
//! - [`YearFact`] - one (year, entity) pair of arrivals and departures
//! - [`TotalPoint`], [`YearRankings`], [`PeakBalance`], [`EntitySeries`] -
//!   chart-ready outputs of the aggregation operations

use serde::{Deserialize, Serialize};

// =============================================================================
// Raw Table
// =============================================================================

/// An immutable, untyped table: named columns in file order, rows of raw cells.
///
/// A cell is `None` when the row was shorter than the header, otherwise the
/// untouched field text (which may be empty or whitespace).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<Option<String>>>,
}

impl RawTable {
    /// Create an empty table with the given column names.
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    /// Build a table from string literals, mostly useful for fixtures.
    ///
    /// Rows shorter than the header are padded with null cells.
    pub fn from_strs(headers: &[&str], rows: &[&[&str]]) -> Self {
        let mut table = Self::new(headers.iter().map(|h| h.to_string()).collect());
        for row in rows {
            table.push_row(row.iter().map(|c| Some(c.to_string())).collect());
        }
        table
    }

    /// Append a row, padding or truncating it to the header width.
    pub fn push_row(&mut self, mut cells: Vec<Option<String>>) {
        cells.resize(self.headers.len(), None);
        self.rows.push(cells);
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    /// Number of data rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by exact name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Raw cell text; `None` for null cells and out-of-range positions.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows.get(row)?.get(column)?.as_deref()
    }
}

// =============================================================================
// Row roles
// =============================================================================

/// Migration direction encoded in a row key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// "Zuzug": persons moving into the region.
    Arrivals,
    /// "Wegzug": persons moving out of the region.
    Departures,
}

impl Direction {
    /// Marker that follows the year in a row key, e.g. `2022_ Zuzug`.
    pub fn marker(self) -> &'static str {
        match self {
            Direction::Arrivals => "_ Zuzug",
            Direction::Departures => "_ Wegzug",
        }
    }
}

/// Derived role of a table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "year")]
pub enum RowRole {
    ArrivalsForYear(i32),
    DeparturesForYear(i32),
    ContinentMetadata,
    Unclassified,
}

impl RowRole {
    /// Year and direction for data rows.
    pub fn year_direction(self) -> Option<(i32, Direction)> {
        match self {
            RowRole::ArrivalsForYear(y) => Some((y, Direction::Arrivals)),
            RowRole::DeparturesForYear(y) => Some((y, Direction::Departures)),
            RowRole::ContinentMetadata | RowRole::Unclassified => None,
        }
    }
}

// =============================================================================
// Facts and outputs
// =============================================================================

/// Arrivals and departures of one entity in one year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearFact {
    pub year: i32,
    /// Raw column name.
    pub entity: String,
    pub arrivals: f64,
    pub departures: f64,
}

impl YearFact {
    pub fn balance(&self) -> f64 {
        self.arrivals - self.departures
    }
}

/// One point of the total time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TotalPoint {
    pub year: i32,
    pub arrivals: f64,
    pub departures: f64,
    /// `arrivals - departures`
    pub balance: f64,
}

/// An entity with the value it is ranked by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntity {
    /// Raw column name (identity).
    pub column: String,
    /// Human readable label.
    pub name: String,
    pub value: f64,
}

/// Top arrivals / departures for one year.
///
/// A side is `None` when there is no data for it ("no data" for the chart).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearRankings {
    pub year: i32,
    pub arrivals: Option<Vec<RankedEntity>>,
    pub departures: Option<Vec<RankedEntity>>,
}

/// Peak absolute balance of an entity across all complete years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeakBalance {
    pub column: String,
    /// Position of `column` in the table, which tells repeated names apart.
    #[serde(default)]
    pub column_index: Option<usize>,
    pub name: String,
    pub peak_abs_balance: f64,
}

/// One year of an entity's balance series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalancePoint {
    pub year: i32,
    pub arrivals: f64,
    pub departures: f64,
    pub balance: f64,
}

/// Balance series of one entity over the full year axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySeries {
    pub column: String,
    pub name: String,
    pub points: Vec<BalancePoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_rows_are_padded_with_nulls() {
        let mut table = RawTable::new(vec!["a".into(), "b".into(), "c".into()]);
        table.push_row(vec![Some("1".into())]);

        assert_eq!(table.cell(0, 0), Some("1"));
        assert_eq!(table.cell(0, 1), None);
        assert_eq!(table.cell(0, 2), None);
        assert_eq!(table.cell(3, 0), None);
    }

    #[test]
    fn test_column_index() {
        let table = RawTable::from_strs(&["key", "ukraine"], &[]);
        assert_eq!(table.column_index("ukraine"), Some(1));
        assert_eq!(table.column_index("italien"), None);
        assert!(table.is_empty());
    }

    #[test]
    fn test_row_role_serialization() {
        let role = serde_json::to_value(RowRole::ArrivalsForYear(2022)).unwrap();
        assert_eq!(role["type"], "ArrivalsForYear");
        assert_eq!(role["year"], 2022);
    }

    #[test]
    fn test_fact_balance() {
        let fact = YearFact {
            year: 2022,
            entity: "ukraine".into(),
            arrivals: 1478.0,
            departures: 225.0,
        };
        assert_eq!(fact.balance(), 1253.0);
    }
}
