//! Gas-network survey backend: address catalog, status history, current-status
//! resolution and spreadsheet exports.

pub mod config;
pub mod error;
pub mod survey;
pub mod telemetry;
