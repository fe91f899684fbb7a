//! Graceful shutdown (spec §4.7): disable WDS autoconnect, disconnect if a
//! packet-data session is up, release every allocated CID, flush the
//! device. Best-effort — a write failure partway through does not abort the
//! remaining steps, since the process is exiting regardless.

use crate::device::Device;
use crate::qmux::wire::service;
use crate::service::Engines;
use crate::session::Session;
use std::io::Write;

/// Builds the full teardown sequence as a list of frames to write, in
/// order. Does not itself touch the device — the caller drives the actual
/// `write`s so it can log and swallow per-frame I/O errors uniformly.
pub fn build_sequence(session: &mut Session, engines: &mut Engines) -> Vec<Vec<u8>> {
    let mut frames = Vec::with_capacity(5);

    frames.push(engines.wds.build_teardown_disable_autoconnect(session));
    if session.pkt_data_handle != 0 {
        frames.push(engines.wds.build_teardown_disconnect(session));
    }

    if session.nas_cid != 0 {
        frames.push(
            engines
                .ctl
                .build_release_cid(session, service::NAS, session.nas_cid),
        );
    }
    if session.wds_cid != 0 {
        frames.push(
            engines
                .ctl
                .build_release_cid(session, service::WDS, session.wds_cid),
        );
    }
    if session.dms_cid != 0 {
        frames.push(
            engines
                .ctl
                .build_release_cid(session, service::DMS, session.dms_cid),
        );
    }

    frames
}

/// Writes the teardown sequence to the device, logging and continuing past
/// any single frame's failure, then syncs (spec §4.7's final `syncfs`
/// before exit).
pub fn run(device: &mut Device, session: &mut Session, engines: &mut Engines) {
    log::info!("teardown: starting graceful shutdown");
    for frame in build_sequence(session, engines) {
        if let Err(err) = device.write_all(&frame) {
            log::warn!("teardown: failed to send frame: {err}");
        }
    }
    if let Err(err) = device.sync() {
        log::warn!("teardown: failed to sync device: {err}");
    }
    log::info!("teardown: complete");
}
