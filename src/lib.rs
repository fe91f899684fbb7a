//! `qmid`: a user-space dialer that brings a QMI/QMUX cellular modem up to
//! an active packet-data session (see `qmi_dialer.c` in the reference
//! implementation this was rebuilt from).

pub mod device;
pub mod error;
pub mod eventloop;
pub mod logging;
pub mod orchestrator;
pub mod qmux;
pub mod service;
pub mod session;
pub mod signals;
pub mod teardown;

use device::Device;
use error::DialerError;
use logging::Verbosity;
use service::Engines;
use session::Session;

/// Everything `main` reads from the outside world (spec §11): the device
/// path positional argument plus the two optional environment variables.
/// Deliberately small — flag parsing beyond this is out of scope.
pub struct Config {
    pub device_path: String,
    pub pin_code: Option<String>,
    pub verbosity: Verbosity,
}

impl Config {
    pub fn from_env() -> Self {
        let device_path = std::env::args().nth(1).unwrap_or_else(|| {
            eprintln!("usage: qmid <device-path>");
            std::process::exit(2);
        });
        let pin_code = std::env::var("QMID_PIN").ok().filter(|s| !s.is_empty());
        let verbosity = Verbosity::from_env();
        Self {
            device_path,
            pin_code,
            verbosity,
        }
    }
}

/// Opens the device and runs the dialer to completion (clean shutdown or a
/// fatal error).
pub fn run(config: Config) -> Result<(), DialerError> {
    signals::install()?;

    log::info!("opening {}", config.device_path);
    let mut device = Device::open(&config.device_path)?;

    let mut session = Session::new(config.pin_code, config.verbosity);
    let mut engines = Engines::new();

    eventloop::run(&mut device, &mut session, &mut engines)
}
