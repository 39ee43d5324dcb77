// Entrypoint for the scraper.
// - Reads DNDBEYOND_SESSION once, then lists or downloads campaigns.
// - Exit status: 0 on success, 1 on a terminal error, 2 when some
//   characters in the batch could not be downloaded.

use clap::Parser;
use ddb_sheets::cli::{scraper, ScraperCli};
use ddb_sheets::logging;
use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(err) = logging::init_logging("ddb-scraper") {
        eprintln!("warning: logging disabled: {:#}", err);
    }

    let cli = ScraperCli::parse();
    match scraper::run(cli) {
        Ok(status) => status.exit_code(),
        Err(err) => {
            eprintln!("ddb-scraper error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
