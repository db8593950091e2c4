use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match wardend::run_daemon() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            writeln!(io::stderr(), "wardend: {error}").ok();
            ExitCode::FAILURE
        }
    }
}
