//! The single-threaded event loop (spec §4.6): a level-triggered readiness
//! wait, two-phase frame reassembly (header first, then the rest once the
//! declared length is known), and dispatch through [`Engines`].
//!
//! Each readiness event reads only as many bytes as the current reassembly
//! phase still needs, never past it — this is what lets the loop resume
//! correctly no matter how the kernel chooses to chunk a `read(2)` (spec §8,
//! "partial read resumption").

use std::io::{Read, Write};
use std::os::unix::io::AsRawFd;

use crate::device::Device;
use crate::error::DialerError;
use crate::orchestrator;
use crate::qmux::{self, wire};
use crate::service::Engines;
use crate::session::{CtlState, Session};
use crate::signals;
use crate::teardown;

/// Runs until a shutdown signal is observed or a fatal error occurs, then
/// tears down gracefully either way (spec §7: a fatal protocol or I/O
/// failure still runs teardown before the process exits nonzero).
pub fn run(device: &mut Device, session: &mut Session, engines: &mut Engines) -> Result<(), DialerError> {
    let fatal = run_inner(device, session, engines);
    teardown::run(device, session, engines);
    fatal
}

fn run_inner(device: &mut Device, session: &mut Session, engines: &mut Engines) -> Result<(), DialerError> {
    let sync = engines.ctl.send_sync(session);
    write_frame(device, session, &sync)?;

    loop {
        if signals::shutdown_requested() {
            return Ok(());
        }

        match wait_readable(device.as_raw_fd()) {
            Ok(true) => {}
            Ok(false) => continue, // EINTR, loop back around to check the flag
            Err(err) => return Err(DialerError::Io(err)),
        }

        let needed = reassembly_target(session);
        let buf = session.rx.as_mut_slice();
        let start = session.rx.progress;
        let n = match device.read(&mut buf[start..needed]) {
            Ok(0) => {
                log::warn!("eventloop: device closed");
                return Err(DialerError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "device closed",
                )));
            }
            Ok(n) => n,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(DialerError::Io(err)),
        };

        if advance_reassembly(session, n) {
            process_frame(session, engines, device)?;
            session.rx.reset();
        }
    }
}

/// Records `n` freshly read bytes and reports whether a complete frame is
/// now sitting in `session.rx` (spec §4.6, §8 Property 2: correct no matter
/// how the read is chunked). Pulled out of the main loop so it can be
/// exercised directly against synthetic chunk sizes in tests.
fn advance_reassembly(session: &mut Session, n: usize) -> bool {
    session.rx.progress += n;

    if session.rx.progress == qmux::QMUX_PREFIX_LEN && session.rx.target_len == 0 {
        let declared = declared_frame_len(session);
        if declared > wire::MAX_FRAME_LEN {
            log::warn!("eventloop: dropping oversized frame ({declared} bytes), resyncing");
            session.rx.reset();
            return false;
        }
        session.rx.target_len = declared;
    }

    session.rx.target_len != 0 && session.rx.progress >= session.rx.target_len
}

fn reassembly_target(session: &Session) -> usize {
    if session.rx.target_len == 0 {
        qmux::QMUX_PREFIX_LEN
    } else {
        session.rx.target_len
    }
}

fn declared_frame_len(session: &Session) -> usize {
    let buf = session.rx.complete_frame();
    u16::from_le_bytes([buf[1], buf[2]]) as usize + 1
}

fn process_frame(
    session: &mut Session,
    engines: &mut Engines,
    device: &mut Device,
) -> Result<(), DialerError> {
    let frame_bytes = session.rx.complete_frame().to_vec();
    if session.verbosity == crate::logging::Verbosity::Debug {
        log::debug!("recv: {}", crate::logging::hex_dump(&frame_bytes));
    }

    let parsed = match qmux::parse_frame(&frame_bytes) {
        Ok(p) => p,
        Err(err) => {
            log::warn!("eventloop: malformed frame dropped: {err}");
            return Ok(());
        }
    };

    // Spec §4.6: frames for any service other than CTL are dropped until
    // CTL has completed its SYNC handshake.
    if !parsed.is_ctl() && session.ctl_state != CtlState::Synced {
        log::debug!("eventloop: dropping {:#04x} frame before sync", parsed.service);
        return Ok(());
    }

    let outcome = engines.dispatch(session, &parsed);

    if let Some(err) = outcome.failure {
        return Err(DialerError::Protocol(err));
    }

    for frame in &outcome.outbound {
        write_frame(device, session, frame)?;
    }

    if outcome.startup_ready {
        for frame in orchestrator::run_startup_fanout(session, engines) {
            write_frame(device, session, &frame)?;
        }
    }

    if outcome.service_edge {
        if let Some(frame) = orchestrator::run_service_edge(session, engines) {
            write_frame(device, session, &frame)?;
        }
    }

    Ok(())
}

fn write_frame(device: &mut Device, session: &Session, frame: &[u8]) -> Result<(), DialerError> {
    if session.verbosity == crate::logging::Verbosity::Debug {
        log::debug!("send: {}", crate::logging::hex_dump(frame));
    }
    device.write_all(frame).map_err(DialerError::Io)
}

/// Waits for the device fd to become readable. Returns `Ok(false)` on
/// `EINTR` so the caller can re-check the shutdown flag (spec §9: signal
/// handlers only set a flag, the loop observes it here).
fn wait_readable(fd: std::os::unix::io::RawFd) -> std::io::Result<bool> {
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let rc = unsafe { libc::poll(&mut pfd, 1, -1) };
    if rc < 0 {
        let err = std::io::Error::last_os_error();
        if err.kind() == std::io::ErrorKind::Interrupted {
            return Ok(false);
        }
        return Err(err);
    }
    Ok(rc > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::Verbosity;
    use crate::qmux::wire;

    /// Feeds `frame` into a fresh session in arbitrarily sized chunks and
    /// returns the number of times a complete frame was assembled, plus the
    /// last one assembled (spec §8 Property 2 / Scenario 4).
    fn feed_in_chunks(frame: &[u8], chunk_sizes: &[usize]) -> (usize, Vec<u8>) {
        let mut session = Session::new(None, Verbosity::Quiet);
        let mut completions = 0;
        let mut last = Vec::new();
        let mut offset = 0;
        for &size in chunk_sizes {
            let end = (offset + size).min(frame.len());
            let chunk = &frame[offset..end];
            session.rx.as_mut_slice()[session.rx.progress..session.rx.progress + chunk.len()]
                .copy_from_slice(chunk);
            offset = end;
            if advance_reassembly(&mut session, chunk.len()) {
                completions += 1;
                last = session.rx.complete_frame().to_vec();
                session.rx.reset();
            }
        }
        (completions, last)
    }

    #[test]
    fn partial_read_in_3_4_57_byte_chunks_dispatches_exactly_once() {
        let tlvs: &[(u8, &[u8])] = &[(0x01, &[0u8; 48])];
        let frame = crate::qmux::build_request(wire::service::NAS, 1, 1, 0x002d, tlvs).unwrap();
        assert_eq!(frame.len(), 64);

        let (completions, last) = feed_in_chunks(&frame, &[3, 4, 57]);
        assert_eq!(completions, 1);
        assert_eq!(last, frame);
    }

    #[test]
    fn byte_at_a_time_also_dispatches_exactly_once() {
        let frame = crate::qmux::build_request(wire::service::CTL, 0, 1, wire::ctl::MSG_SYNC, &[])
            .unwrap();
        let chunks = vec![1usize; frame.len()];
        let (completions, last) = feed_in_chunks(&frame, &chunks);
        assert_eq!(completions, 1);
        assert_eq!(last, frame);
    }

    #[test]
    fn oversized_declared_length_is_dropped_and_resyncs() {
        let mut session = Session::new(None, Verbosity::Quiet);
        // A header claiming a frame far larger than MAX_FRAME_LEN.
        let mut header = vec![wire::QMUX_MARKER];
        header.extend_from_slice(&(u16::MAX - 1).to_le_bytes());
        header.extend_from_slice(&[0, 0, 0]);
        assert_eq!(header.len(), qmux::QMUX_PREFIX_LEN);

        session.rx.as_mut_slice()[..header.len()].copy_from_slice(&header);
        let completed = advance_reassembly(&mut session, header.len());
        assert!(!completed);
        assert_eq!(session.rx.progress, 0);
        assert_eq!(session.rx.target_len, 0);
    }
}
