//! Row classification.
//!
//! One top-to-bottom pass over the key column assigns every row a
//! [`RowRole`] and builds the year index the aggregations look rows up in.
//!
//! ```text
//! key column               role
//! ───────────────────────  ─────────────────────────
//! Kontinent                ContinentMetadata (first match only)
//! 2021_ Zuzug              ArrivalsForYear(2021)
//! 2021_ Wegzug             DeparturesForYear(2021)
//! Summe_ Zuzug             skipped (no year prefix)
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{Direction, RawTable, RowRole};

/// Substring identifying the continent lookup row.
const CONTINENT_MARKER: &str = "Kontinent";

/// Rows bound to one year.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct YearRows {
    pub arrivals: Option<usize>,
    pub departures: Option<usize>,
}

impl YearRows {
    /// Both directions resolved.
    pub fn is_complete(&self) -> bool {
        self.arrivals.is_some() && self.departures.is_some()
    }

    /// Both row indices when the year is complete.
    pub fn pair(&self) -> Option<(usize, usize)> {
        Some((self.arrivals?, self.departures?))
    }

    pub fn get(&self, direction: Direction) -> Option<usize> {
        match direction {
            Direction::Arrivals => self.arrivals,
            Direction::Departures => self.departures,
        }
    }

    fn set(&mut self, direction: Direction, row: usize) {
        match direction {
            Direction::Arrivals => self.arrivals = Some(row),
            Direction::Departures => self.departures = Some(row),
        }
    }
}

/// A row carrying a direction marker whose year could not be read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub row: usize,
    pub key: String,
    pub reason: String,
}

/// Result of classifying a table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowIndex {
    /// Year -> row positions, ascending by year.
    pub years: BTreeMap<i32, YearRows>,
    pub continent_row: Option<usize>,
    pub skipped: Vec<SkippedRow>,
}

impl RowIndex {
    /// Every year with at least one direction resolved, ascending.
    pub fn all_years(&self) -> Vec<i32> {
        self.years.keys().copied().collect()
    }

    /// Years with both directions resolved, ascending.
    pub fn complete_years(&self) -> Vec<i32> {
        self.years
            .iter()
            .filter(|(_, rows)| rows.is_complete())
            .map(|(year, _)| *year)
            .collect()
    }

    pub fn rows_for(&self, year: i32) -> YearRows {
        self.years.get(&year).copied().unwrap_or_default()
    }
}

/// Role of a single key value.
///
/// A key is a data row for year `Y` when the text before its first underscore
/// is the integer `Y` and the key contains `"<Y>_ Zuzug"` (arrivals) or
/// `"<Y>_ Wegzug"` (departures). Arrivals are checked first. Returns `Err`
/// with a reason when a direction marker is present but no year can be read.
pub fn row_role(key: &str) -> Result<RowRole, String> {
    let key = key.trim();

    for direction in [Direction::Arrivals, Direction::Departures] {
        if !key.contains(direction.marker()) {
            continue;
        }
        let prefix = key.split('_').next().unwrap_or_default().trim();
        let year: i32 = prefix
            .parse()
            .map_err(|_| format!("'{}' is not a year", prefix))?;
        if !key.contains(&format!("{}{}", year, direction.marker())) {
            return Err(format!("marker does not follow year {}", year));
        }
        return Ok(match direction {
            Direction::Arrivals => RowRole::ArrivalsForYear(year),
            Direction::Departures => RowRole::DeparturesForYear(year),
        });
    }

    if key.contains(CONTINENT_MARKER) {
        Ok(RowRole::ContinentMetadata)
    } else {
        Ok(RowRole::Unclassified)
    }
}

/// Classify every row of `table` by its value in column `key_column`.
///
/// - the first row containing `"Kontinent"` becomes the continent row; later
///   ones are ignored
/// - when several rows claim the same year and direction, the last one wins
/// - null keys are unclassified; unreadable years are recorded in `skipped`
pub fn classify(table: &RawTable, key_column: usize) -> RowIndex {
    let mut index = RowIndex::default();

    for row in 0..table.len() {
        let Some(key) = table.cell(row, key_column) else {
            continue;
        };

        if index.continent_row.is_none() && key.contains(CONTINENT_MARKER) {
            index.continent_row = Some(row);
        }

        match row_role(key) {
            Ok(role) => {
                if let Some((year, direction)) = role.year_direction() {
                    index.years.entry(year).or_default().set(direction, row);
                }
            }
            Err(reason) => index.skipped.push(SkippedRow {
                row,
                key: key.trim().to_string(),
                reason,
            }),
        }
    }

    index
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(keys: &[&str]) -> RawTable {
        let rows: Vec<Vec<&str>> = keys.iter().map(|k| vec![*k, "1"]).collect();
        let row_refs: Vec<&[&str]> = rows.iter().map(|r| r.as_slice()).collect();
        RawTable::from_strs(&["herkunftsgebiet_wegzugsgebiet", "ukraine"], &row_refs)
    }

    #[test]
    fn test_row_roles() {
        assert_eq!(row_role("2022_ Zuzug"), Ok(RowRole::ArrivalsForYear(2022)));
        assert_eq!(row_role(" 2010_ Wegzug "), Ok(RowRole::DeparturesForYear(2010)));
        assert_eq!(row_role("Kontinent"), Ok(RowRole::ContinentMetadata));
        assert_eq!(row_role("Staat"), Ok(RowRole::Unclassified));
        assert_eq!(row_role(""), Ok(RowRole::Unclassified));
    }

    #[test]
    fn test_bad_year_prefix_is_an_error() {
        assert!(row_role("Summe_ Zuzug").is_err());
        assert!(row_role("2022 gesamt_x_ Wegzug").is_err());
    }

    #[test]
    fn test_classify_builds_year_index() {
        let index = classify(
            &table(&["Kontinent", "2021_ Zuzug", "2021_ Wegzug", "2022_ Zuzug"]),
            0,
        );

        assert_eq!(index.continent_row, Some(0));
        assert_eq!(index.all_years(), vec![2021, 2022]);
        assert_eq!(index.complete_years(), vec![2021]);
        assert_eq!(index.rows_for(2021).pair(), Some((1, 2)));
        assert_eq!(index.rows_for(2022).arrivals, Some(3));
        assert_eq!(index.rows_for(2022).departures, None);
        assert_eq!(index.rows_for(1999), YearRows::default());
    }

    #[test]
    fn test_first_continent_row_wins() {
        let index = classify(&table(&["Land", "Kontinent", "Kontinent (alt)"]), 0);
        assert_eq!(index.continent_row, Some(1));
    }

    #[test]
    fn test_last_year_row_wins() {
        let index = classify(&table(&["2022_ Zuzug", "2022_ Wegzug", "2022_ Zuzug"]), 0);
        assert_eq!(index.rows_for(2022).arrivals, Some(2));
        assert_eq!(index.rows_for(2022).departures, Some(1));
    }

    #[test]
    fn test_unreadable_years_are_skipped_not_fatal() {
        let index = classify(&table(&["Summe_ Zuzug", "2023_ Zuzug"]), 0);

        assert_eq!(index.all_years(), vec![2023]);
        assert_eq!(index.skipped.len(), 1);
        assert_eq!(index.skipped[0].row, 0);
        assert_eq!(index.skipped[0].key, "Summe_ Zuzug");
    }

    #[test]
    fn test_null_keys_ignored() {
        let mut t = RawTable::new(vec!["herkunftsgebiet_wegzugsgebiet".into()]);
        t.push_row(vec![None]);
        t.push_row(vec![Some("2020_ Wegzug".into())]);

        let index = classify(&t, 0);
        assert_eq!(index.rows_for(2020).departures, Some(1));
        assert!(index.skipped.is_empty());
    }
}
