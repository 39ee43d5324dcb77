// Entrypoint for the sheet reader.
// - Keeps `main` small: parse arguments, run the command, print the result.
// - Any failure (no match, ambiguous match, unreadable file, missing
//   directory) is printed to stderr with a non-zero exit status.

use clap::Parser;
use ddb_sheets::cli::{sheet, SheetCli};
use ddb_sheets::logging;
use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(err) = logging::init_logging("ddb-sheet") {
        eprintln!("warning: logging disabled: {:#}", err);
    }

    let cli = SheetCli::parse();
    match sheet::execute(cli) {
        Ok(text) => {
            print!("{}", text);
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
