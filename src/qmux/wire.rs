//! Named wire constants: QMUX framing bytes, per-service message ids and TLV
//! types. Grouped by service the way the original dialer's `qmi_hdrs.h`
//! grouped them, but collected in one module instead of scattered headers.

/// Byte that prefixes every QMUX frame on the wire.
pub const QMUX_MARKER: u8 = 0x01;

/// Maximum frame size the reassembly buffer can hold (spec §3, §9).
pub const MAX_FRAME_LEN: usize = 4096;

/// Control-flags bit set on a host-to-modem request.
pub const FLAGS_REQUEST: u8 = 0x00;
/// Control-flags bit set on a modem-to-host reply or indication.
pub const FLAGS_RESPONSE: u8 = 0x80;

bitflags::bitflags! {
    /// The service header's control-flags byte (spec §4.1, GLOSSARY).
    ///
    /// `RESPONSE` marks a reply to a request; its absence together with a
    /// nonzero transaction id marks a request, and its absence together with
    /// transaction id zero marks an indication (see
    /// [`crate::qmux::ParsedFrame::is_indication`]).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ControlFlags: u8 {
        const RESPONSE = 0x01;
        const INDICATION = 0x02;
        const COMPOUND = 0x04;
    }
}

/// QMUX service type bytes.
pub mod service {
    pub const CTL: u8 = 0x00;
    pub const WDS: u8 = 0x01;
    pub const DMS: u8 = 0x02;
    pub const NAS: u8 = 0x03;
}

/// The 16-bit result code carried as the first TLV of almost every reply.
pub mod result {
    pub const SUCCESS: u16 = 0x0000;
    pub const FAILURE: u16 = 0x0001;
}

/// The TLV type every service header-format response uses for its leading
/// result-code TLV.
pub const TLV_RESULT_CODE: u8 = 0x02;

pub mod ctl {
    pub const MSG_SET_DATA_FORMAT: u16 = 0x0026;
    pub const MSG_SYNC: u16 = 0x0027;
    pub const MSG_GET_CLIENT_ID: u16 = 0x0022;
    pub const MSG_RELEASE_CLIENT_ID: u16 = 0x0023;

    /// Request TLV: single byte naming the service to allocate/release a CID for.
    pub const TLV_ALLOC_INFO: u8 = 0x01;
    /// Request/response TLV for SET_DATA_FORMAT: QoS header format (0 = none).
    pub const TLV_DATA_FORMAT: u8 = 0x10;
    /// Request/response TLV for SET_DATA_FORMAT: link-layer protocol (1 = raw IP).
    pub const TLV_DATA_PROTO: u8 = 0x11;

    pub const DATA_FORMAT_NO_QOS_HEADER: u8 = 0x00;
    pub const DATA_PROTO_RAW_IP: u16 = 0x0001;
}

pub mod dms {
    pub const MSG_VERIFY_PIN: u16 = 0x0028;

    /// PIN identifier: PIN1 (the SIM PIN).
    pub const TLV_PIN_ID: u8 = 0x01;
    pub const TLV_PIN_VALUE: u8 = 0x02;
    pub const PIN_ID_PIN1: u8 = 0x01;
}

pub mod wds {
    pub const MSG_START_NETWORK_INTERFACE: u16 = 0x0020;
    pub const MSG_STOP_NETWORK_INTERFACE: u16 = 0x0021;
    pub const MSG_SET_AUTOCONNECT_SETTINGS: u16 = 0x0034;

    pub const TLV_AUTOCONNECT_SETTING: u8 = 0x01;
    /// Packet-data handle, carried in both STOP requests and START replies.
    pub const TLV_PACKET_DATA_HANDLE: u8 = 0x01;

    /// Some modems report this instead of SUCCESS when stopping a session
    /// that is already down; spec §4.4 treats it as success.
    pub const RESULT_NO_EFFECT: u16 = 0x0003;
}

pub mod nas {
    pub const MSG_SET_SYSTEM_SELECTION_PREFERENCE: u16 = 0x0033;
    pub const MSG_REGISTER_INDICATIONS: u16 = 0x0003;
    pub const MSG_GET_SYSTEM_INFO: u16 = 0x002d;
    pub const MSG_SYSTEM_INFO_IND: u16 = 0x002e;

    pub const TLV_SS_MODE_PREF: u8 = 0x11;
    pub const MODE_PREF_NO_RESTRICTION: u16 = 0xffff;

    pub const TLV_IND_SYS_INFO: u8 = 0x10;

    pub const TLV_SI_GSM_SS: u8 = 0x24;
    pub const TLV_SI_WCDMA_SS: u8 = 0x25;
    pub const TLV_SI_LTE_SS: u8 = 0x29;

    /// `service_info.srv_status` value meaning "registered, in service".
    pub const SRV_STATUS_SRV: u8 = 0x02;
}
