//! Archive sources: the live H.8 download and a synthetic release generator.

pub mod h8;
pub mod synthetic;

pub use h8::{ArchiveFetcher, DEFAULT_H8_URL, H8Client, InMemoryArchive};
pub use synthetic::{SyntheticConfig, SyntheticSeries, build_release, generate_series};
