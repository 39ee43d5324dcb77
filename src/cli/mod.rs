//! Command-line front ends for the two programs.
//!
//! - `sheet`: the `ddb-sheet` reader (views and `list`).
//! - `scraper`: the `ddb-scraper` downloader.

pub mod scraper;
pub mod sheet;

pub use scraper::ScraperCli;
pub use sheet::SheetCli;

#[cfg(test)]
mod tests;
