//! CLI command handlers

pub mod commands;

pub use commands::{columns, concat, pivot, sheets, vlookup};
