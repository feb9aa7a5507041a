//! Shared server state: the currently loaded dataset.
//!
//! The table is parsed once per upload and then shared read-only; every
//! request runs the (stateless) aggregations against its own `Arc` clone.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::analysis::{analyze_parsed, AnalysisOptions, CsvInfo, PipelineOutput};
use crate::config::EngineConfig;
use crate::error::{PipelineError, ServerError, ServerResult};
use crate::models::RawTable;
use crate::parser::{parse_bytes_auto, parse_file_auto, ParseResult};

/// A parsed CSV export ready for analysis.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    pub table: Arc<RawTable>,
    pub csv_info: CsvInfo,
    pub loaded_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct AppState {
    dataset: Arc<RwLock<Option<Dataset>>>,
    engine: Arc<EngineConfig>,
}

impl AppState {
    pub fn new(engine: EngineConfig) -> Self {
        Self {
            dataset: Arc::new(RwLock::new(None)),
            engine: Arc::new(engine),
        }
    }

    pub fn engine(&self) -> Arc<EngineConfig> {
        Arc::clone(&self.engine)
    }

    /// The current dataset, or [`ServerError::NoDataset`].
    pub async fn current(&self) -> ServerResult<Dataset> {
        self.dataset.read().await.clone().ok_or(ServerError::NoDataset)
    }

    pub async fn is_loaded(&self) -> bool {
        self.dataset.read().await.is_some()
    }

    /// Parse and analyze CSV bytes, then make them the current dataset.
    pub async fn load_bytes(
        &self,
        name: String,
        bytes: Vec<u8>,
        selected_year: Option<i32>,
    ) -> ServerResult<(Dataset, PipelineOutput)> {
        let options = self.options(selected_year);
        let (parsed, output) = tokio::task::spawn_blocking(move || {
            let parsed = parse_bytes_auto(&bytes)?;
            let output = analyze_parsed(&parsed, &options)?;
            Ok::<_, PipelineError>((parsed, output))
        })
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))??;

        Ok((self.install(name, parsed).await, output))
    }

    /// Parse and analyze a CSV file, then make it the current dataset.
    pub async fn load_file(&self, path: &Path) -> ServerResult<(Dataset, PipelineOutput)> {
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("dataset.csv")
            .to_string();
        let owned = path.to_path_buf();
        let options = self.options(None);

        let (parsed, output) = tokio::task::spawn_blocking(move || {
            let parsed = parse_file_auto(&owned)?;
            let output = analyze_parsed(&parsed, &options)?;
            Ok::<_, PipelineError>((parsed, output))
        })
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))??;

        Ok((self.install(name, parsed).await, output))
    }

    fn options(&self, selected_year: Option<i32>) -> AnalysisOptions {
        AnalysisOptions {
            selected_year,
            engine: self.engine.as_ref().clone(),
        }
    }

    async fn install(&self, name: String, parsed: ParseResult) -> Dataset {
        let csv_info = CsvInfo::from(&parsed);
        let dataset = Dataset {
            name,
            table: Arc::new(parsed.table),
            csv_info,
            loaded_at: Utc::now(),
        };
        *self.dataset.write().await = Some(dataset.clone());
        dataset
    }
}
