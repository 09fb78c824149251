//! Leaderboard page scraping: fetching, row extraction, and rich-text
//! transcoding of styled player and map names.

pub mod client;
pub mod error;
pub mod extract;
mod rate_limit;
pub mod richtext;
pub mod transcode;

pub use client::{BoardClient, PageFetcher};
pub use error::{ExtractError, ScraperError, TranscodeError};
pub use extract::{extract_maps, extract_results, extract_table, ExtractOptions, TableRows};
pub use richtext::{FormattedName, StyleRun};
pub use transcode::{transcode_cell, transcode_html};
