//! The NAS service (spec §4.3): the `IDLE -> GOT_CID -> SET_SYSTEM ->
//! IND_REQ -> SYS_INFO_QUERY -> IDLE` startup sequence, then steady-state
//! system-info indications. Grounded on `qmi_nas.c`'s `nas_process_message`
//! and its TLV scan for GSM/WCDMA/LTE service-domain status.

use super::{EngineOutcome, ServiceEngine};
use crate::error::ProtocolError;
use crate::qmux::wire::{self, service};
use crate::qmux::{build_request, ParsedFrame};
use crate::session::{NasState, RadioService, Session};

fn result_code(frame: &ParsedFrame<'_>) -> Option<u16> {
    for t in frame.tlvs() {
        let t = t.ok()?;
        if t.typ == wire::TLV_RESULT_CODE && t.value.len() >= 2 {
            return Some(u16::from_le_bytes([t.value[0], t.value[1]]));
        }
    }
    None
}

/// Scans the three per-RAT service-status TLVs in wire order (GSM, WCDMA,
/// LTE) and returns the first one reporting in-service, matching the
/// original dialer's "take the first RAT that answers" priority (spec Open
/// Question, resolved in DESIGN.md: wire order is the priority order).
fn scan_service_status(frame: &ParsedFrame<'_>) -> RadioService {
    const CANDIDATES: [(u8, RadioService); 3] = [
        (wire::nas::TLV_SI_GSM_SS, RadioService::Gsm),
        (wire::nas::TLV_SI_WCDMA_SS, RadioService::Umts),
        (wire::nas::TLV_SI_LTE_SS, RadioService::Lte),
    ];
    for t in frame.tlvs() {
        let Ok(t) = t else { break };
        for (typ, rat) in CANDIDATES {
            if t.typ == typ && !t.value.is_empty() && t.value[0] == wire::nas::SRV_STATUS_SRV {
                return rat;
            }
        }
    }
    RadioService::None
}

pub struct NasEngine;

impl NasEngine {
    pub fn new() -> Self {
        Self
    }

    /// Called once NAS has a CID (startup fan-out, spec §4.5): sets the RAT
    /// selection preference to "no restriction" so the modem picks whatever
    /// it can register on.
    pub fn enter(&mut self, session: &mut Session) -> Vec<u8> {
        session.nas_state = NasState::SetSystem;
        build_request(
            service::NAS,
            session.nas_cid,
            session.nas_tid.next(),
            wire::nas::MSG_SET_SYSTEM_SELECTION_PREFERENCE,
            &[(
                wire::nas::TLV_SS_MODE_PREF,
                &wire::nas::MODE_PREF_NO_RESTRICTION.to_le_bytes(),
            )],
        )
        .expect("SET_SYSTEM_SELECTION_PREFERENCE request always fits the frame buffer")
    }

    fn build_register_indications(&self, session: &mut Session) -> Vec<u8> {
        build_request(
            service::NAS,
            session.nas_cid,
            session.nas_tid.next(),
            wire::nas::MSG_REGISTER_INDICATIONS,
            &[],
        )
        .expect("REGISTER_INDICATIONS request always fits the frame buffer")
    }

    fn build_get_system_info(&self, session: &mut Session) -> Vec<u8> {
        build_request(
            service::NAS,
            session.nas_cid,
            session.nas_tid.next(),
            wire::nas::MSG_GET_SYSTEM_INFO,
            &[],
        )
        .expect("GET_SYSTEM_INFO request always fits the frame buffer")
    }

    /// Applies a freshly observed radio service, recording whether this
    /// crossed the in-service/out-of-service edge (spec §4.3, "edge
    /// transition only").
    fn apply_service(&self, session: &mut Session, observed: RadioService) -> bool {
        let was_in_service = session.cur_service.is_in_service();
        let now_in_service = observed.is_in_service();
        session.cur_service = observed;
        was_in_service != now_in_service
    }
}

impl Default for NasEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceEngine for NasEngine {
    fn handle_message(&mut self, session: &mut Session, frame: &ParsedFrame<'_>) -> EngineOutcome {
        match frame.message_id {
            wire::nas::MSG_SET_SYSTEM_SELECTION_PREFERENCE => {
                let Some(result) = result_code(frame) else {
                    return EngineOutcome::fail(ProtocolError::new(
                        "SET_SYSTEM_SELECTION_PREFERENCE response missing result-code TLV",
                    ));
                };
                if result != wire::result::SUCCESS {
                    return EngineOutcome::fail(ProtocolError::new(
                        "modem rejected system selection preference",
                    ));
                }
                session.nas_state = NasState::IndReq;
                EngineOutcome::send(self.build_register_indications(session))
            }
            wire::nas::MSG_REGISTER_INDICATIONS => {
                let Some(result) = result_code(frame) else {
                    return EngineOutcome::fail(ProtocolError::new(
                        "REGISTER_INDICATIONS response missing result-code TLV",
                    ));
                };
                if result != wire::result::SUCCESS {
                    return EngineOutcome::fail(ProtocolError::new(
                        "modem rejected REGISTER_INDICATIONS",
                    ));
                }
                session.nas_state = NasState::SysInfoQuery;
                EngineOutcome::send(self.build_get_system_info(session))
            }
            wire::nas::MSG_GET_SYSTEM_INFO => {
                let Some(result) = result_code(frame) else {
                    return EngineOutcome::fail(ProtocolError::new(
                        "GET_SYSTEM_INFO response missing result-code TLV",
                    ));
                };
                if result != wire::result::SUCCESS {
                    return EngineOutcome::fail(ProtocolError::new(
                        "modem rejected initial GET_SYSTEM_INFO",
                    ));
                }
                session.nas_state = NasState::Running;
                let observed = scan_service_status(frame);
                let edge = self.apply_service(session, observed);
                log::info!("nas: system info, service = {observed:?}");
                EngineOutcome {
                    service_edge: edge,
                    ..EngineOutcome::ignored()
                }
            }
            wire::nas::MSG_SYSTEM_INFO_IND if frame.is_indication() => {
                let observed = scan_service_status(frame);
                let edge = self.apply_service(session, observed);
                log::info!("nas: system info indication, service = {observed:?}");
                EngineOutcome {
                    service_edge: edge,
                    ..EngineOutcome::ignored()
                }
            }
            other => {
                log::debug!("nas: ignoring unexpected message {other:#06x}");
                EngineOutcome::ignored()
            }
        }
    }
}
