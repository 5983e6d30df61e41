//! Sheetwise API Server module
//!
//! Provides the HTTP REST API over the lookup, pivot and concatenation jobs.
//! Run with `sheetwise serve` or `sheetwise-server`.

pub mod handlers;
pub mod server;

pub use server::{build_router, run_api_server, ApiConfig, AppState};
