//! Scripted-conversation scenario tests: each one drives the engines through
//! a sequence of synthetic modem replies and checks the frames the dialer
//! would have sent back, matching the conversations laid out in the
//! walkthrough this crate's startup/teardown logic was built against.

use qmid::logging::Verbosity;
use qmid::orchestrator;
use qmid::qmux::{wire, FrameBuilder, ParsedFrame};
use qmid::service::Engines;
use qmid::session::{CtlState, Session, WdsState};

fn response_frame(service: u8, cid: u8, tid: u16, msg_id: u16, tlvs: &[(u8, &[u8])]) -> Vec<u8> {
    let mut builder = FrameBuilder::new(service, cid, wire::FLAGS_RESPONSE, tid, msg_id);
    for (typ, value) in tlvs {
        builder.append_tlv(*typ, value).unwrap();
    }
    builder.finish()
}

fn success_tlv() -> (u8, &'static [u8]) {
    (wire::TLV_RESULT_CODE, &[0x00, 0x00])
}

fn failure_tlv() -> (u8, &'static [u8]) {
    (wire::TLV_RESULT_CODE, &[0x01, 0x00])
}

fn alloc_info(target: u8, cid: u8) -> Vec<u8> {
    vec![target, cid]
}

fn parsed<'a>(buf: &'a [u8]) -> ParsedFrame<'a> {
    qmid::qmux::parse_frame(buf).unwrap()
}

/// Scenario 1: cold start, no PIN configured, LTE available.
#[test]
fn cold_start_no_pin_lte_available() {
    let mut session = Session::new(None, Verbosity::Quiet);
    let mut engines = Engines::new();

    let sync_req = engines.ctl.send_sync(&mut session);
    assert_eq!(parsed(&sync_req).transaction_id, 1);

    let sync_reply = response_frame(wire::service::CTL, 0, 1, wire::ctl::MSG_SYNC, &[success_tlv()]);
    let outcome = engines.dispatch(&mut session, &parsed(&sync_reply));
    assert!(outcome.failure.is_none());
    assert_eq!(session.ctl_state, CtlState::Synced);
    assert_eq!(outcome.outbound.len(), 1);
    assert_eq!(parsed(&outcome.outbound[0]).message_id, wire::ctl::MSG_SET_DATA_FORMAT);

    let sdf_reply = response_frame(
        wire::service::CTL,
        0,
        2,
        wire::ctl::MSG_SET_DATA_FORMAT,
        &[success_tlv()],
    );
    let outcome = engines.dispatch(&mut session, &parsed(&sdf_reply));
    assert_eq!(outcome.outbound.len(), 3);
    for frame in &outcome.outbound {
        assert_eq!(parsed(frame).message_id, wire::ctl::MSG_GET_CLIENT_ID);
    }

    let cid_targets = [
        (wire::service::DMS, 3u8),
        (wire::service::WDS, 2u8),
        (wire::service::NAS, 1u8),
    ];
    let mut startup_ready = false;
    for (idx, (target, cid)) in cid_targets.iter().enumerate() {
        let value = alloc_info(*target, *cid);
        let reply = response_frame(
            wire::service::CTL,
            0,
            3 + idx as u16,
            wire::ctl::MSG_GET_CLIENT_ID,
            &[(wire::ctl::TLV_ALLOC_INFO, &value)],
        );
        let outcome = engines.dispatch(&mut session, &parsed(&reply));
        assert!(outcome.failure.is_none());
        if outcome.startup_ready {
            startup_ready = true;
        }
    }
    assert!(startup_ready, "third GET_CLIENT_ID reply must trigger the fan-out");
    assert_eq!(session.dms_cid, 3);
    assert_eq!(session.wds_cid, 2);
    assert_eq!(session.nas_cid, 1);

    let fanout = orchestrator::run_startup_fanout(&mut session, &mut engines);
    // No PIN configured: DMS contributes nothing, leaving WDS autoconnect-on
    // followed by NAS's system-selection-preference request.
    assert_eq!(fanout.len(), 2);
    let wds_frame = parsed(&fanout[0]);
    assert_eq!(wds_frame.message_id, wire::wds::MSG_SET_AUTOCONNECT_SETTINGS);
    let autoconnect_tlv = wds_frame.tlvs().next().unwrap().unwrap();
    assert_eq!(autoconnect_tlv.value, &[1]);
    assert_eq!(parsed(&fanout[1]).message_id, wire::nas::MSG_SET_SYSTEM_SELECTION_PREFERENCE);
    assert_eq!(session.wds_state, WdsState::AutoconnectSet);
    assert!(session.pin_unlocked);

    let ssp_reply = response_frame(
        wire::service::NAS,
        1,
        1,
        wire::nas::MSG_SET_SYSTEM_SELECTION_PREFERENCE,
        &[success_tlv()],
    );
    let outcome = engines.dispatch(&mut session, &parsed(&ssp_reply));
    assert_eq!(outcome.outbound.len(), 1);
    assert_eq!(parsed(&outcome.outbound[0]).message_id, wire::nas::MSG_REGISTER_INDICATIONS);

    let reg_reply = response_frame(
        wire::service::NAS,
        1,
        2,
        wire::nas::MSG_REGISTER_INDICATIONS,
        &[success_tlv()],
    );
    let outcome = engines.dispatch(&mut session, &parsed(&reg_reply));
    assert_eq!(outcome.outbound.len(), 1);
    assert_eq!(parsed(&outcome.outbound[0]).message_id, wire::nas::MSG_GET_SYSTEM_INFO);

    let sysinfo_reply = response_frame(
        wire::service::NAS,
        1,
        3,
        wire::nas::MSG_GET_SYSTEM_INFO,
        &[success_tlv(), (wire::nas::TLV_SI_LTE_SS, &[wire::nas::SRV_STATUS_SRV])],
    );
    let outcome = engines.dispatch(&mut session, &parsed(&sysinfo_reply));
    assert!(outcome.service_edge);
    assert!(session.cur_service.is_in_service());

    let start_net = orchestrator::run_service_edge(&mut session, &mut engines);
    let start_net = start_net.expect("service acquired must trigger start_network_interface");
    assert_eq!(parsed(&start_net).message_id, wire::wds::MSG_START_NETWORK_INTERFACE);
    assert_eq!(session.wds_state, WdsState::Connecting);
}

/// Scenario 2: SYNC fails outright. Startup must abort fatally and teardown
/// must not attempt to release any client ids, since none were allocated.
#[test]
fn sync_failure_aborts_and_teardown_releases_nothing() {
    let mut session = Session::new(None, Verbosity::Quiet);
    let mut engines = Engines::new();

    engines.ctl.send_sync(&mut session);
    let sync_reply = response_frame(wire::service::CTL, 0, 1, wire::ctl::MSG_SYNC, &[failure_tlv()]);
    let outcome = engines.dispatch(&mut session, &parsed(&sync_reply));
    assert!(outcome.failure.is_some());
    assert_eq!(session.ctl_state, CtlState::NotSynced);

    let teardown = qmid::teardown::build_sequence(&mut session, &mut engines);
    assert_eq!(teardown.len(), 1, "only the autoconnect-disable frame, no cids to release");
    assert_eq!(
        parsed(&teardown[0]).message_id,
        wire::wds::MSG_SET_AUTOCONNECT_SETTINGS
    );
    for frame in &teardown {
        assert_ne!(parsed(frame).message_id, wire::ctl::MSG_RELEASE_CLIENT_ID);
    }
}

/// Scenario 3: a spontaneous SYNC arrives after the handshake already
/// completed. It must be ignored outright.
#[test]
fn spontaneous_sync_after_already_synced_is_ignored() {
    let mut session = Session::new(None, Verbosity::Quiet);
    let mut engines = Engines::new();

    engines.ctl.send_sync(&mut session);
    let sync_reply = response_frame(wire::service::CTL, 0, 1, wire::ctl::MSG_SYNC, &[success_tlv()]);
    engines.dispatch(&mut session, &parsed(&sync_reply));
    assert_eq!(session.ctl_state, CtlState::Synced);

    let spontaneous = response_frame(wire::service::CTL, 0, 7, wire::ctl::MSG_SYNC, &[success_tlv()]);
    let outcome = engines.dispatch(&mut session, &parsed(&spontaneous));
    assert!(outcome.outbound.is_empty());
    assert!(outcome.failure.is_none());
    assert_eq!(session.ctl_state, CtlState::Synced);
}

/// Scenario 5: teardown ordering with an active packet-data session and all
/// three CIDs allocated — autoconnect disable, then disconnect (carrying the
/// live handle), then CID release in NAS, WDS, DMS order.
#[test]
fn teardown_with_live_session_disconnects_then_releases_in_order() {
    let mut session = Session::new(None, Verbosity::Quiet);
    let mut engines = Engines::new();

    session.nas_cid = 1;
    session.wds_cid = 2;
    session.dms_cid = 3;
    session.pkt_data_handle = 0x1122_3344;
    session.wds_state = WdsState::Connected;

    let frames = qmid::teardown::build_sequence(&mut session, &mut engines);
    assert_eq!(frames.len(), 5);

    let autoconnect = parsed(&frames[0]);
    assert_eq!(autoconnect.message_id, wire::wds::MSG_SET_AUTOCONNECT_SETTINGS);
    assert_eq!(autoconnect.tlvs().next().unwrap().unwrap().value, &[0]);

    let disconnect = parsed(&frames[1]);
    assert_eq!(disconnect.message_id, wire::wds::MSG_STOP_NETWORK_INTERFACE);
    let handle_tlv = disconnect.tlvs().next().unwrap().unwrap();
    assert_eq!(handle_tlv.value, &0x1122_3344u32.to_le_bytes());

    let release_nas = parsed(&frames[2]);
    assert_eq!(release_nas.message_id, wire::ctl::MSG_RELEASE_CLIENT_ID);
    assert_eq!(release_nas.tlvs().next().unwrap().unwrap().value, &[wire::service::NAS, 1]);

    let release_wds = parsed(&frames[3]);
    assert_eq!(release_wds.tlvs().next().unwrap().unwrap().value, &[wire::service::WDS, 2]);

    let release_dms = parsed(&frames[4]);
    assert_eq!(release_dms.tlvs().next().unwrap().unwrap().value, &[wire::service::DMS, 3]);
}

/// Scenario 6: service is lost (no RAT reports in-service) while a
/// packet-data session is up. WDS must be told to stop; teardown-only
/// actions like releasing CIDs must not happen here.
#[test]
fn service_loss_stops_network_interface_without_releasing_cids() {
    let mut session = Session::new(None, Verbosity::Quiet);
    let mut engines = Engines::new();

    session.nas_cid = 1;
    session.wds_cid = 2;
    session.cur_service = qmid::session::RadioService::Lte;
    session.wds_state = WdsState::Connected;
    session.pkt_data_handle = 0x99;

    let ind = response_frame(
        wire::service::NAS,
        0,
        0,
        wire::nas::MSG_SYSTEM_INFO_IND,
        &[(wire::nas::TLV_SI_LTE_SS, &[0x00])],
    );
    assert!(parsed(&ind).is_indication());
    let outcome = engines.dispatch(&mut session, &parsed(&ind));
    assert!(outcome.service_edge);
    assert!(!session.cur_service.is_in_service());

    let action = orchestrator::run_service_edge(&mut session, &mut engines);
    let action = action.expect("service loss while connected must stop the network interface");
    assert_eq!(parsed(&action).message_id, wire::wds::MSG_STOP_NETWORK_INTERFACE);
    assert_eq!(session.wds_state, WdsState::Disconnecting);
}
