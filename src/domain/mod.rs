//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the label enums (`BankType`, `AssetClass`) and the classifier that derives them
//! - the atomic `Observation` and the ingestion audit types
//! - query filters shared by the store and the analytics layer

pub mod classify;
pub mod types;

pub use classify::classify;
pub use types::*;
