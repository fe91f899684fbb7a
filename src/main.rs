//! Entry point: wires `qmid::Config`/`qmid::run` to an exit code.

use std::process::ExitCode;

fn main() -> ExitCode {
    let config = qmid::Config::from_env();
    qmid::logging::init(config.verbosity);

    match qmid::run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
