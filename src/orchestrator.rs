//! The startup orchestrator (spec §2 component 4, §4.5): the hand-offs
//! between service engines that don't fit a single uniform `handle_message`
//! call — CID-allocation fan-out and NAS's service-edge trigger into WDS.
//!
//! Kept as plain functions over [`Engines`] rather than forced through
//! [`ServiceEngine`] because each hand-off has its own shape; see the module
//! doc on `service` for why.

use crate::service::Engines;
use crate::session::Session;

/// Runs once, when CTL's `record_cid` reports the third and last CID has
/// landed (spec §4.5): DMS verifies the PIN (or skips straight to done),
/// WDS disables the modem's own autoconnect, and NAS starts its own
/// `SET_SYSTEM_SELECTION_PREFERENCE` sequence.
pub fn run_startup_fanout(session: &mut Session, engines: &mut Engines) -> Vec<Vec<u8>> {
    log::info!("orchestrator: all client ids allocated, starting service fan-out");
    let mut outbound = Vec::with_capacity(2);
    if let Some(verify_pin) = engines.dms.enter(session) {
        outbound.push(verify_pin);
    }
    outbound.push(engines.wds.enter(session));
    outbound.push(engines.nas.enter(session));
    outbound
}

/// Runs whenever NAS reports a service-edge transition (spec §4.3, §4.4):
/// asks WDS whether that edge should start or stop the packet-data session.
pub fn run_service_edge(session: &mut Session, engines: &mut Engines) -> Option<Vec<u8>> {
    let in_service = session.cur_service.is_in_service();
    engines.wds.update_connect(session, in_service)
}
