//! The CTL service (spec §4.2): SYNC handshake, SET_DATA_FORMAT, and CID
//! allocation/release on behalf of the other three services. Grounded on
//! `qmi_ctl.c`'s `ctl_process_message` dispatch and its `NOT_SYNCED ->
//! SYNCED` state machine.

use super::{EngineOutcome, ServiceEngine};
use crate::error::{FramingError, ProtocolError};
use crate::qmux::wire::{self, service};
use crate::qmux::{build_request, ParsedFrame};
use crate::session::{CtlState, Session};

/// Finds the first TLV of the given type in a parsed frame's payload.
fn find_tlv<'a>(frame: &ParsedFrame<'a>, typ: u8) -> Result<Option<&'a [u8]>, FramingError> {
    for t in frame.tlvs() {
        let t = t?;
        if t.typ == typ {
            return Ok(Some(t.value));
        }
    }
    Ok(None)
}

/// Every CTL reply leads with a 16-bit result TLV (spec §4.2).
fn result_code(frame: &ParsedFrame<'_>) -> Option<u16> {
    match find_tlv(frame, wire::TLV_RESULT_CODE) {
        Ok(Some(v)) if v.len() >= 2 => Some(u16::from_le_bytes([v[0], v[1]])),
        _ => None,
    }
}

pub struct CtlEngine {
    sync_sent: bool,
}

impl CtlEngine {
    pub fn new() -> Self {
        Self { sync_sent: false }
    }

    /// Builds the initial SYNC request (spec §4.2, "on startup").
    pub fn send_sync(&mut self, session: &mut Session) -> Vec<u8> {
        self.sync_sent = true;
        build_request(
            service::CTL,
            0,
            session.ctl_tid.next() as u16,
            wire::ctl::MSG_SYNC,
            &[],
        )
        .expect("SYNC request always fits the frame buffer")
    }

    fn build_set_data_format(&self, session: &mut Session) -> Vec<u8> {
        build_request(
            service::CTL,
            0,
            session.ctl_tid.next() as u16,
            wire::ctl::MSG_SET_DATA_FORMAT,
            &[
                (wire::ctl::TLV_DATA_FORMAT, &[wire::ctl::DATA_FORMAT_NO_QOS_HEADER]),
                (
                    wire::ctl::TLV_DATA_PROTO,
                    &wire::ctl::DATA_PROTO_RAW_IP.to_le_bytes(),
                ),
            ],
        )
        .expect("SET_DATA_FORMAT request always fits the frame buffer")
    }

    fn build_get_cid(&self, session: &mut Session, target: u8) -> Vec<u8> {
        build_request(
            service::CTL,
            0,
            session.ctl_tid.next() as u16,
            wire::ctl::MSG_GET_CLIENT_ID,
            &[(wire::ctl::TLV_ALLOC_INFO, &[target])],
        )
        .expect("GET_CLIENT_ID request always fits the frame buffer")
    }

    /// Builds a RELEASE_CLIENT_ID request for the given service/cid pair
    /// (spec §4.2, used by teardown).
    pub fn build_release_cid(&self, session: &mut Session, target: u8, cid: u8) -> Vec<u8> {
        build_request(
            service::CTL,
            0,
            session.ctl_tid.next() as u16,
            wire::ctl::MSG_RELEASE_CLIENT_ID,
            &[(wire::ctl::TLV_ALLOC_INFO, &[target, cid])],
        )
        .expect("RELEASE_CLIENT_ID request always fits the frame buffer")
    }

    fn handle_sync_response(&mut self, session: &mut Session, frame: &ParsedFrame<'_>) -> EngineOutcome {
        let Some(result) = result_code(frame) else {
            return EngineOutcome::fail(ProtocolError::new("SYNC response missing result-code TLV"));
        };
        if result != wire::result::SUCCESS {
            return EngineOutcome::fail(ProtocolError::new("modem rejected SYNC"));
        }
        session.ctl_state = CtlState::Synced;
        log::info!("ctl: synced");
        EngineOutcome::send(self.build_set_data_format(session))
    }

    fn handle_set_data_format_response(&self, session: &mut Session, frame: &ParsedFrame<'_>) -> EngineOutcome {
        let Some(result) = result_code(frame) else {
            return EngineOutcome::fail(ProtocolError::new(
                "SET_DATA_FORMAT response missing result-code TLV",
            ));
        };
        if result != wire::result::SUCCESS {
            return EngineOutcome::fail(ProtocolError::new("modem rejected SET_DATA_FORMAT"));
        }
        log::info!("ctl: data format negotiated, requesting client ids");
        EngineOutcome::send_all(vec![
            self.build_get_cid(session, service::DMS),
            self.build_get_cid(session, service::WDS),
            self.build_get_cid(session, service::NAS),
        ])
    }

    fn handle_get_cid_response(&self, session: &mut Session, frame: &ParsedFrame<'_>) -> EngineOutcome {
        let Some(result) = result_code(frame) else {
            return EngineOutcome::fail(ProtocolError::new(
                "GET_CLIENT_ID response missing result-code TLV",
            ));
        };
        if result != wire::result::SUCCESS {
            return EngineOutcome::fail(ProtocolError::new("modem rejected GET_CLIENT_ID"));
        }
        let alloc = match find_tlv(frame, wire::ctl::TLV_ALLOC_INFO) {
            Ok(Some(v)) if v.len() >= 2 => v,
            _ => {
                return EngineOutcome::fail(ProtocolError::new(
                    "GET_CLIENT_ID response missing allocation-info TLV",
                ))
            }
        };
        let target = alloc[0];
        let cid = alloc[1];
        let reached_three = session.record_cid(target, cid);
        log::info!("ctl: allocated cid {cid} for service {target:#04x}");
        EngineOutcome {
            startup_ready: reached_three,
            ..EngineOutcome::ignored()
        }
    }
}

impl Default for CtlEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceEngine for CtlEngine {
    fn handle_message(&mut self, session: &mut Session, frame: &ParsedFrame<'_>) -> EngineOutcome {
        match frame.message_id {
            // Spec §4.2: any inbound SYNC whose transaction id isn't 1, or
            // arriving after SYNCED, is a spontaneous SYNC and is ignored.
            wire::ctl::MSG_SYNC
                if self.sync_sent
                    && session.ctl_state != CtlState::Synced
                    && frame.transaction_id == 1 =>
            {
                self.handle_sync_response(session, frame)
            }
            wire::ctl::MSG_SYNC => {
                log::debug!("ctl: ignoring spontaneous sync");
                EngineOutcome::ignored()
            }
            wire::ctl::MSG_SET_DATA_FORMAT => self.handle_set_data_format_response(session, frame),
            // Spec §4.2, mirroring qmi_ctl_handle_msg's NOT_SYNCED guard: a
            // CID reply/release arriving before SYNC completes is spurious
            // and must be ignored, not processed as a real allocation.
            wire::ctl::MSG_GET_CLIENT_ID if session.ctl_state == CtlState::Synced => {
                self.handle_get_cid_response(session, frame)
            }
            wire::ctl::MSG_GET_CLIENT_ID => {
                log::debug!("ctl: ignoring get_client_id reply before sync");
                EngineOutcome::ignored()
            }
            wire::ctl::MSG_RELEASE_CLIENT_ID if session.ctl_state == CtlState::Synced => {
                log::debug!("ctl: release_cid acknowledged");
                EngineOutcome::ignored()
            }
            wire::ctl::MSG_RELEASE_CLIENT_ID => {
                log::debug!("ctl: ignoring release_client_id reply before sync");
                EngineOutcome::ignored()
            }
            other => {
                log::debug!("ctl: ignoring unexpected message {other:#06x}");
                EngineOutcome::ignored()
            }
        }
    }
}
