// Library root
// -----------
// This crate backs two small binaries: `ddb-scraper`, which downloads
// character JSON from D&D Beyond, and `ddb-sheet`, which answers questions
// about the downloaded files.
//
// Module responsibilities:
// - `api`: blocking HTTP client for the D&D Beyond endpoints.
// - `scrape`: per-campaign download loop and on-disk layout.
// - `library`: discovery of character files, name lookup, listing.
// - `character`: absent-safe character model and derived stats.
// - `views`: text rendering of the named views.
// - `cli`: argument parsing and command dispatch for both binaries.
// - `config`, `error`, `logging`: environment, error types, tracing setup.
pub mod api;
pub mod character;
pub mod cli;
pub mod config;
pub mod error;
pub mod library;
pub mod logging;
pub mod scrape;
pub mod views;
