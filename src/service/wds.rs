//! The WDS service (spec §4.4): autoconnect configuration and starting or
//! stopping the packet-data session, driven by NAS's view of radio service.

use super::{EngineOutcome, ServiceEngine};
use crate::error::ProtocolError;
use crate::qmux::wire::{self, service};
use crate::qmux::{build_request, ParsedFrame};
use crate::session::{Session, WdsState};

fn result_code(frame: &ParsedFrame<'_>) -> Option<u16> {
    for t in frame.tlvs() {
        let t = t.ok()?;
        if t.typ == wire::TLV_RESULT_CODE && t.value.len() >= 2 {
            return Some(u16::from_le_bytes([t.value[0], t.value[1]]));
        }
    }
    None
}

fn packet_data_handle(frame: &ParsedFrame<'_>) -> Option<u32> {
    for t in frame.tlvs() {
        let t = t.ok()?;
        if t.typ == wire::wds::TLV_PACKET_DATA_HANDLE && t.value.len() >= 4 {
            return Some(u32::from_le_bytes([
                t.value[0], t.value[1], t.value[2], t.value[3],
            ]));
        }
    }
    None
}

pub struct WdsEngine;

impl WdsEngine {
    pub fn new() -> Self {
        Self
    }

    /// Called once WDS has a CID (startup fan-out, spec §4.5): enables
    /// autoconnect so the modem re-establishes the session across RAT
    /// transitions while this dialer owns the client.
    pub fn enter(&mut self, session: &mut Session) -> Vec<u8> {
        session.wds_state = WdsState::AutoconnectSet;
        self.build_set_autoconnect(session, true)
    }

    fn build_set_autoconnect(&self, session: &mut Session, enable: bool) -> Vec<u8> {
        build_request(
            service::WDS,
            session.wds_cid,
            session.wds_tid.next(),
            wire::wds::MSG_SET_AUTOCONNECT_SETTINGS,
            &[(wire::wds::TLV_AUTOCONNECT_SETTING, &[enable as u8])],
        )
        .expect("SET_AUTOCONNECT_SETTINGS request always fits the frame buffer")
    }

    fn build_start_network(&self, session: &mut Session) -> Vec<u8> {
        build_request(
            service::WDS,
            session.wds_cid,
            session.wds_tid.next(),
            wire::wds::MSG_START_NETWORK_INTERFACE,
            &[],
        )
        .expect("START_NETWORK_INTERFACE request always fits the frame buffer")
    }

    fn build_stop_network(&self, session: &mut Session) -> Vec<u8> {
        build_request(
            service::WDS,
            session.wds_cid,
            session.wds_tid.next(),
            wire::wds::MSG_STOP_NETWORK_INTERFACE,
            &[(
                wire::wds::TLV_PACKET_DATA_HANDLE,
                &session.pkt_data_handle.to_le_bytes(),
            )],
        )
        .expect("STOP_NETWORK_INTERFACE request always fits the frame buffer")
    }

    /// Reacts to a NAS service-edge transition (spec §4.3, §4.4): issue
    /// START whenever service is present and WDS isn't already `Connected`
    /// (covers a service-regained edge arriving while a prior STOP is still
    /// in flight), issue STOP whenever service is absent and a session
    /// handle is live. Returns `None` when neither condition holds (e.g. WDS
    /// hasn't finished its own setup yet).
    pub fn update_connect(&mut self, session: &mut Session, in_service: bool) -> Option<Vec<u8>> {
        match (in_service, session.wds_state) {
            // A STOP is in flight (Disconnecting) when service reappears: the
            // session isn't CONNECTED, so reconnect rather than dropping the
            // edge (a prior narrower match missed exactly this case).
            (true, WdsState::AutoconnectSet | WdsState::Disconnecting) => {
                session.wds_state = WdsState::Connecting;
                log::info!("wds: service acquired, starting network interface");
                Some(self.build_start_network(session))
            }
            (false, WdsState::Connected | WdsState::Connecting) if session.pkt_data_handle != 0 => {
                session.wds_state = WdsState::Disconnecting;
                log::info!("wds: service lost, stopping network interface");
                Some(self.build_stop_network(session))
            }
            _ => None,
        }
    }

    /// Builds the disconnect request unconditionally, for teardown (spec
    /// §4.7): sends it whenever `pkt_data_handle != 0`, regardless of the
    /// state machine's current phase.
    pub fn build_teardown_disconnect(&self, session: &mut Session) -> Vec<u8> {
        self.build_stop_network(session)
    }

    pub fn build_teardown_disable_autoconnect(&self, session: &mut Session) -> Vec<u8> {
        self.build_set_autoconnect(session, false)
    }
}

impl Default for WdsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceEngine for WdsEngine {
    fn handle_message(&mut self, session: &mut Session, frame: &ParsedFrame<'_>) -> EngineOutcome {
        match frame.message_id {
            wire::wds::MSG_SET_AUTOCONNECT_SETTINGS => {
                log::debug!("wds: autoconnect settings acknowledged");
                EngineOutcome::ignored()
            }
            wire::wds::MSG_START_NETWORK_INTERFACE => {
                let Some(result) = result_code(frame) else {
                    return EngineOutcome::fail(ProtocolError::new(
                        "START_NETWORK_INTERFACE response missing result-code TLV",
                    ));
                };
                if result != wire::result::SUCCESS {
                    log::warn!("wds: start_network_interface failed (result {result:#06x})");
                    return EngineOutcome::fail(ProtocolError::new(
                        "modem rejected START_NETWORK_INTERFACE",
                    ));
                }
                session.pkt_data_handle = packet_data_handle(frame).unwrap_or(0);
                session.wds_state = WdsState::Connected;
                log::info!("wds: connected, handle {:#010x}", session.pkt_data_handle);
                EngineOutcome::ignored()
            }
            wire::wds::MSG_STOP_NETWORK_INTERFACE => {
                let result = result_code(frame);
                if !matches!(result, Some(wire::result::SUCCESS) | Some(wire::wds::RESULT_NO_EFFECT))
                {
                    log::warn!("wds: stop_network_interface reported {result:?}");
                }
                session.pkt_data_handle = 0;
                session.wds_state = WdsState::AutoconnectSet;
                log::info!("wds: disconnected");
                EngineOutcome::ignored()
            }
            other => {
                log::debug!("wds: ignoring unexpected message {other:#06x}");
                EngineOutcome::ignored()
            }
        }
    }
}
