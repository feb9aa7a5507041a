//! Runtime configuration.
//!
//! [`EngineConfig`] carries the dataset conventions of the Konstanz
//! "Außenwanderung" export; its `Default` is what every caller uses unless a
//! different export layout has to be read. [`ServerConfig`] is loaded from
//! the environment (and `.env`) for the HTTP API.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Column whose values encode year + direction of a row.
pub const DEFAULT_KEY_COLUMN: &str = "herkunftsgebiet_wegzugsgebiet";

/// Provenance column, never aggregated.
pub const DEFAULT_SOURCE_COLUMN: &str = "quelle";

/// "Other states" / "unknown" buckets.
pub const DEFAULT_BUCKET_COLUMNS: [&str; 2] = ["sonstige_staaten", "unbekannt_ohne_angaben"];

/// Continent-row values marking a column as a continent aggregate or placeholder.
pub const DEFAULT_CONTINENT_LABELS: [&str; 6] = [
    "Europa",
    "Afrika",
    "Amerika",
    "Asien",
    "Australien Ozeanien",
    ".",
];

/// Default port of the HTTP API.
pub const DEFAULT_PORT: u16 = 3000;

/// Which columns contribute to the yearly totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TotalsScope {
    /// Only entity columns (those passing the column filter).
    #[default]
    Entities,
    /// Every column except key and source, continent aggregates included.
    AllColumns,
}

/// Dataset conventions and ranking sizes for the aggregation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub key_column: String,
    pub source_column: Option<String>,
    pub bucket_columns: Vec<String>,
    pub continent_labels: Vec<String>,
    /// Entries per yearly ranking.
    pub top_n: usize,
    /// Entities selected by peak balance.
    pub top_k: usize,
    pub totals_scope: TotalsScope,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            key_column: DEFAULT_KEY_COLUMN.to_string(),
            source_column: Some(DEFAULT_SOURCE_COLUMN.to_string()),
            bucket_columns: DEFAULT_BUCKET_COLUMNS.iter().map(|s| s.to_string()).collect(),
            continent_labels: DEFAULT_CONTINENT_LABELS.iter().map(|s| s.to_string()).collect(),
            top_n: 10,
            top_k: 5,
            totals_scope: TotalsScope::Entities,
        }
    }
}

impl EngineConfig {
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_totals_scope(mut self, scope: TotalsScope) -> Self {
        self.totals_scope = scope;
        self
    }

    /// Key or source column.
    pub fn is_structural_column(&self, column: &str) -> bool {
        column == self.key_column || self.source_column.as_deref() == Some(column)
    }

    pub fn is_bucket_column(&self, column: &str) -> bool {
        self.bucket_columns.iter().any(|b| b == column)
    }

    pub fn is_continent_label(&self, value: &str) -> bool {
        self.continent_labels.iter().any(|l| l == value)
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    /// Dataset loaded at startup, if any.
    pub data_file: Option<PathBuf>,
    /// Directory with a static charting front end, served as fallback.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            data_file: None,
            static_dir: None,
        }
    }
}

impl ServerConfig {
    /// Read `MIGRASTAT_PORT`, `MIGRASTAT_DATA_FILE` and `MIGRASTAT_STATIC_DIR`,
    /// loading a `.env` file first if present.
    pub fn from_env() -> ConfigResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup("MIGRASTAT_PORT") {
            config.port = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                name: "MIGRASTAT_PORT",
                value: raw.clone(),
            })?;
        }
        config.data_file = lookup("MIGRASTAT_DATA_FILE")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        config.static_dir = lookup("MIGRASTAT_STATIC_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Ok(config)
    }

    /// CLI flags take precedence over the environment.
    pub fn with_overrides(
        mut self,
        port: Option<u16>,
        data_file: Option<PathBuf>,
        static_dir: Option<PathBuf>,
    ) -> Self {
        if let Some(p) = port {
            self.port = p;
        }
        if data_file.is_some() {
            self.data_file = data_file;
        }
        if static_dir.is_some() {
            self.static_dir = static_dir;
        }
        self
    }

    /// Fail early when the configured startup dataset is missing.
    pub fn validate(&self) -> ConfigResult<()> {
        match &self.data_file {
            Some(path) if !path.exists() => Err(ConfigError::MissingDataFile(path.clone())),
            _ => Ok(()),
        }
    }
}
