//! `bankpulse` library crate.
//!
//! The binary (`bankpulse`) is a thin wrapper around this library so that:
//!
//! - ingestion and analytics are testable without spawning processes
//! - the store and analytics can be reused by other front-ends
//! - code stays easy to navigate as the project grows

pub mod analytics;
pub mod app;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod math;
pub mod report;
pub mod store;
