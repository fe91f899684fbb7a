//! The DMS service (spec §4.5): SIM PIN verification only. Everything else
//! DMS can do on a real modem is out of scope (spec Non-goals).

use super::{EngineOutcome, ServiceEngine};
use crate::error::ProtocolError;
use crate::qmux::wire::{self, service};
use crate::qmux::{build_request, ParsedFrame};
use crate::session::{DmsState, Session};

fn result_code(frame: &ParsedFrame<'_>) -> Option<u16> {
    for t in frame.tlvs() {
        let t = t.ok()?;
        if t.typ == wire::TLV_RESULT_CODE && t.value.len() >= 2 {
            return Some(u16::from_le_bytes([t.value[0], t.value[1]]));
        }
    }
    None
}

pub struct DmsEngine;

impl DmsEngine {
    pub fn new() -> Self {
        Self
    }

    /// Called once DMS has a CID (startup fan-out, spec §4.5). Returns
    /// `None` when no PIN was configured — DMS is then simply done, matching
    /// the reference dialer skipping VERIFY_PIN entirely when no PIN is set.
    pub fn enter(&mut self, session: &mut Session) -> Option<Vec<u8>> {
        let Some(pin) = session.pin_code.clone() else {
            log::info!("dms: no pin configured, skipping verification");
            session.dms_state = DmsState::Done;
            session.pin_unlocked = true;
            return None;
        };

        session.dms_state = DmsState::PinSent;
        Some(
            build_request(
                service::DMS,
                session.dms_cid,
                session.dms_tid.next(),
                wire::dms::MSG_VERIFY_PIN,
                &[
                    (wire::dms::TLV_PIN_ID, &[wire::dms::PIN_ID_PIN1]),
                    (wire::dms::TLV_PIN_VALUE, pin.as_bytes()),
                ],
            )
            .expect("VERIFY_PIN request always fits the frame buffer"),
        )
    }
}

impl Default for DmsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceEngine for DmsEngine {
    fn handle_message(&mut self, session: &mut Session, frame: &ParsedFrame<'_>) -> EngineOutcome {
        if frame.message_id != wire::dms::MSG_VERIFY_PIN {
            log::debug!("dms: ignoring unexpected message {:#06x}", frame.message_id);
            return EngineOutcome::ignored();
        }

        let Some(result) = result_code(frame) else {
            return EngineOutcome::fail(ProtocolError::new(
                "VERIFY_PIN response missing result-code TLV",
            ));
        };

        session.dms_state = DmsState::Done;
        if result == wire::result::SUCCESS {
            session.pin_unlocked = true;
            log::info!("dms: pin unlocked");
        } else {
            // Spec §4.5 / §9: wrong PIN is logged and treated as non-fatal —
            // the dialer proceeds without network access rather than
            // crashing on a SIM error the user must fix out of band.
            log::warn!("dms: pin verification failed (result {result:#06x})");
        }
        EngineOutcome::ignored()
    }
}
