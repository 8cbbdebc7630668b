//! Input/output helpers.
//!
//! - release archive + XML parsing (`archive`, `xml`)
//! - growth-rate CSV export (`export`)

pub mod archive;
pub mod export;
pub mod xml;

pub use archive::{ParsedArchive, parse_archive, parse_document};
pub use export::write_growth_csv;
