//! SIGINT/SIGTERM handling (spec §4.7, §9): the handler only sets an atomic
//! flag — no I/O happens inside it, since `write`/`printf` are not
//! async-signal-safe. The event loop observes the flag after `poll` returns
//! `EINTR` and runs teardown synchronously from normal context.

use std::sync::atomic::{AtomicBool, Ordering};

pub static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_terminate(_signum: libc::c_int) {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

/// Installs `handle_terminate` for SIGINT and SIGTERM via `sigaction`,
/// matching the reference dialer's handler registration rather than the
/// deprecated `signal(2)`.
pub fn install() -> std::io::Result<()> {
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = handle_terminate as usize;
        libc::sigemptyset(&mut action.sa_mask);
        action.sa_flags = 0;

        if libc::sigaction(libc::SIGINT, &action, std::ptr::null_mut()) != 0 {
            return Err(std::io::Error::last_os_error());
        }
        if libc::sigaction(libc::SIGTERM, &action, std::ptr::null_mut()) != 0 {
            return Err(std::io::Error::last_os_error());
        }
    }
    Ok(())
}

pub fn shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}
