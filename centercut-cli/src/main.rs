//! # Centercut
//!
//! Command-line center-channel separation and mixing for WAV files.

use log::error;

mod cli;
mod error;
mod info;
mod logging;
mod mix;
mod runner;
mod separate;
mod wav;

/// Log lines replayed on failure when `--quiet` hid them.
const FAILURE_TAIL_LINES: usize = 20;

fn main() {
    let args = cli::args::build_cli().get_matches();
    let quiet = args.get_flag("quiet");
    let log_buffer = logging::init(!quiet);

    let code = match runner::run(&args) {
        Ok(code) => code,
        Err(err) => {
            error!("{}", err.to_string().to_lowercase());
            if quiet {
                for line in logging::tail(&log_buffer, FAILURE_TAIL_LINES) {
                    eprintln!("{}", line);
                }
            }
            -1
        }
    };

    std::process::exit(code)
}
