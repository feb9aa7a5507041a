//! Column filter and display names.
//!
//! A column is an *entity* (a country or region) unless it is structural
//! (key / source), one of the "other states" / "unknown" buckets, or tagged
//! as a continent aggregate by the continent row.

use crate::config::EngineConfig;
use crate::models::RawTable;

/// Whether `column` counts as an entity.
///
/// `continent_label` is the continent row's value for this column, `None`
/// when the table has no continent row (or the cell is null).
pub fn is_entity_column(column: &str, continent_label: Option<&str>, config: &EngineConfig) -> bool {
    if config.is_structural_column(column) || config.is_bucket_column(column) {
        return false;
    }
    !continent_label.is_some_and(|label| config.is_continent_label(label.trim()))
}

/// Per-column entity flags, decided once per table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMask {
    flags: Vec<bool>,
}

impl EntityMask {
    pub fn build(table: &RawTable, continent_row: Option<usize>, config: &EngineConfig) -> Self {
        let flags = table
            .headers()
            .iter()
            .enumerate()
            .map(|(col, name)| {
                let label = continent_row.and_then(|row| table.cell(row, col));
                is_entity_column(name, label, config)
            })
            .collect();
        Self { flags }
    }

    pub fn is_entity(&self, column: usize) -> bool {
        self.flags.get(column).copied().unwrap_or(false)
    }

    /// Entity column positions in table order.
    pub fn entities(&self) -> impl Iterator<Item = usize> + '_ {
        self.flags
            .iter()
            .enumerate()
            .filter(|(_, is_entity)| **is_entity)
            .map(|(col, _)| col)
    }

    /// Positions of columns that are not entities.
    pub fn excluded(&self) -> impl Iterator<Item = usize> + '_ {
        self.flags
            .iter()
            .enumerate()
            .filter(|(_, is_entity)| !**is_entity)
            .map(|(col, _)| col)
    }
}

/// Human readable label for a raw column name.
///
/// `121_vereinigte_staaten` becomes `Vereinigte Staaten`: a purely numeric
/// prefix before the first underscore is dropped, underscores become spaces
/// and every word is title-cased.
pub fn display_name(column: &str) -> String {
    let name = match column.split_once('_') {
        Some((prefix, rest)) if !prefix.is_empty() && prefix.chars().all(|c| c.is_ascii_digit()) => rest,
        _ => column,
    };
    title_case(&name.replace('_', " "))
}

/// Upper-case the first letter of every run of letters, lower-case the rest.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for c in text.chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}
