//! groom binary entry point.

use std::process::ExitCode;

fn main() -> ExitCode {
    match groom::cli::run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
