//! HTTP API module.
//!
//! Serves the chart queries over the currently loaded dataset.

pub mod server;
pub mod state;
pub mod types;

pub use server::start_server;
pub use state::{AppState, Dataset};
pub use types::*;
