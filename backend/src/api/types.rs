//! REST API types for chart front ends.
//!
//! Every data endpoint wraps its payload in [`ApiResponse`] so clients can
//! tell which dataset a series was computed from.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::state::Dataset;
use crate::analysis::CsvInfo;
use crate::error::{PipelineError, ServerError};

/// Envelope of every successful data response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    /// Unique identifier of this computation
    pub analysis_id: String,
    /// RFC 3339 timestamp
    pub generated_at: String,
    pub dataset: DatasetMetadata,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn new(dataset: &Dataset, data: T) -> Self {
        Self {
            analysis_id: Uuid::new_v4().to_string(),
            generated_at: chrono::Utc::now().to_rfc3339(),
            dataset: DatasetMetadata::from(dataset),
            data,
        }
    }
}

/// Which dataset a response was computed from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetMetadata {
    pub name: String,
    pub loaded_at: String,
    pub csv_info: CsvMetadata,
}

impl From<&Dataset> for DatasetMetadata {
    fn from(dataset: &Dataset) -> Self {
        Self {
            name: dataset.name.clone(),
            loaded_at: dataset.loaded_at.to_rfc3339(),
            csv_info: CsvMetadata::from(&dataset.csv_info),
        }
    }
}

/// CSV file metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CsvMetadata {
    pub encoding: String,
    pub delimiter: String,
    pub row_count: usize,
    pub columns: Vec<String>,
}

impl From<&CsvInfo> for CsvMetadata {
    fn from(info: &CsvInfo) -> Self {
        Self {
            encoding: info.encoding.clone(),
            delimiter: info.delimiter.to_string(),
            row_count: info.row_count,
            columns: info.headers.clone(),
        }
    }
}

/// `POST /api/upload?year=2022`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadQuery {
    pub year: Option<i32>,
}

/// `GET /api/top/{year}?n=10`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopQuery {
    pub n: Option<usize>,
}

/// `GET /api/dynamics?k=5`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DynamicsQuery {
    pub k: Option<usize>,
}

/// Create an error response body
pub fn error_response(error: &str) -> Value {
    json!({
        "analysisId": Uuid::new_v4().to_string(),
        "status": "error",
        "error": error,
        "data": null
    })
}

impl ServerError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Pipeline(PipelineError::Csv(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::NoDataset => StatusCode::NOT_FOUND,
            ServerError::Config(_) | ServerError::Io(_) | ServerError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(error_response(&self.to_string()))).into_response()
    }
}
