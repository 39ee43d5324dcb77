//! Error types shared by the scraper and the sheet reader.

use std::path::PathBuf;
use thiserror::Error;

/// Problems with the environment the programs run in.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The session cookie variable is unset or empty.
    #[error(
        "{var} is not set. Log in to dndbeyond.com, copy the CobaltSession cookie \
         from your browser's dev tools and run: export {var}='<cookie>'"
    )]
    MissingSession { var: &'static str },

    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Errors talking to D&D Beyond.
#[derive(Error, Debug)]
pub enum ApiError {
    /// The session cookie was rejected or no bearer token came back.
    #[error("authentication failed: {message}. Your session cookie may have expired.")]
    Unauthorized { message: String },

    /// Non-success HTTP status.
    #[error("HTTP {status} from {url}")]
    Status {
        status: reqwest::StatusCode,
        url: String,
    },

    /// The service answered but its envelope reported a failure.
    #[error("API error from {url}: {message}")]
    Envelope { url: String, message: String },

    /// Transport-level failure (DNS, TLS, connection reset, bad body).
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Outcome of resolving a name fragment to a single character file.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("campaigns directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    #[error("no character found matching '{query}'{}", format_candidates("Available characters", .available))]
    NotFound {
        query: String,
        available: Vec<String>,
    },

    #[error("multiple characters match '{query}'{}", format_candidates("Candidates", .candidates))]
    Ambiguous {
        query: String,
        candidates: Vec<String>,
    },
}

/// Failure to read a character file from disk.
#[derive(Error, Debug)]
pub enum SheetError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn format_candidates(label: &str, names: &[String]) -> String {
    if names.is_empty() {
        return String::new();
    }
    let mut out = format!("\n\n{label}:");
    for name in names {
        out.push_str("\n  - ");
        out.push_str(name);
    }
    out
}
