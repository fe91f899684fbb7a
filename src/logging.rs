//! Verbosity-level logging front end.
//!
//! Mirrors the teacher kernel's `LogLevel`/`KernelLogger` split (a small
//! ordered enum gating output) but fronts the ordinary [`log`] facade instead
//! of a bespoke `printlog!` macro, so the rest of the crate logs through
//! `log::{error,warn,info,debug}!` like any other idiomatic Rust binary.

use log::{Level, LevelFilter, Log, Metadata, Record};

/// The three verbosity levels the core contract (spec §6) exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Verbosity {
    /// Level 1: fatal conditions and the high-level protocol milestones.
    Quiet = 1,
    /// Level 2: per-message send/transition narration.
    Info = 2,
    /// Level 3: full frame dumps on every send/receive.
    Debug = 3,
}

impl Verbosity {
    /// Parses the `QMID_VERBOSITY` environment variable, falling back to
    /// [`Verbosity::Info`] (and logging a warning) on anything else.
    pub fn from_env() -> Self {
        match std::env::var("QMID_VERBOSITY").as_deref() {
            Ok("1") => Verbosity::Quiet,
            Ok("2") => Verbosity::Info,
            Ok("3") => Verbosity::Debug,
            Ok(other) => {
                eprintln!("[qmid][WARN] ignoring unrecognised QMID_VERBOSITY={other:?}, using 2");
                Verbosity::Info
            }
            Err(_) => Verbosity::Info,
        }
    }

    fn level_filter(self) -> LevelFilter {
        match self {
            Verbosity::Quiet => LevelFilter::Error,
            Verbosity::Info => LevelFilter::Info,
            Verbosity::Debug => LevelFilter::Debug,
        }
    }
}

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            let tag = match record.level() {
                Level::Error => "ERROR",
                Level::Warn => "WARN",
                Level::Info => "INFO",
                Level::Debug => "DEBUG",
                Level::Trace => "TRACE",
            };
            eprintln!("[qmid][{tag}] {}", record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

/// Installs the process-wide logger at the given verbosity. Idempotent:
/// a second call is a no-op (matches `log::set_logger`'s one-shot contract).
pub fn init(verbosity: Verbosity) {
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(verbosity.level_filter());
    }
}

/// Renders a frame buffer as a compact hex dump for level-3 tracing, in the
/// spirit of the original dialer's `parse_qmi()` debug helper.
pub fn hex_dump(buf: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(buf.len() * 3);
    for (i, byte) in buf.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        let _ = write!(out, "{byte:02x}");
    }
    out
}
