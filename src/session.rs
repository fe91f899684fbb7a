//! Device session state (spec §3): the single mutable struct owned by the
//! event loop — transaction counters, CIDs, per-service state machines, and
//! the reassembly buffer bookkeeping.

use crate::logging::Verbosity;
use crate::qmux::wire;

/// Last observed radio technology (spec §3 `cur_service`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioService {
    None,
    Gsm,
    Umts,
    Lte,
}

impl RadioService {
    pub fn is_in_service(self) -> bool {
        !matches!(self, RadioService::None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CtlState {
    NotSynced,
    Synced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmsState {
    Idle,
    GotCid,
    PinSent,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WdsState {
    Idle,
    GotCid,
    AutoconnectSet,
    Connecting,
    Connected,
    Disconnecting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NasState {
    Idle,
    GotCid,
    SetSystem,
    IndReq,
    SysInfoQuery,
    Running,
}

/// One 8-bit (CTL) or 16-bit (DMS/WDS/NAS) transaction-id counter.
///
/// Increments on send and skips zero (spec §3 invariant: "Transaction ids
/// are nonzero and monotonically increasing modulo their width").
#[derive(Debug, Clone, Copy)]
pub struct TidCounter8(u8);

impl TidCounter8 {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn next(&mut self) -> u8 {
        self.0 = self.0.wrapping_add(1);
        if self.0 == 0 {
            self.0 = 1;
        }
        self.0
    }
}

impl Default for TidCounter8 {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TidCounter16(u16);

impl TidCounter16 {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn next(&mut self) -> u16 {
        self.0 = self.0.wrapping_add(1);
        if self.0 == 0 {
            self.0 = 1;
        }
        self.0
    }
}

impl Default for TidCounter16 {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-capacity frame reassembly buffer (spec §3, §4.6, §9: must be capped
/// against the buffer's capacity, not trusted from the wire unconditionally).
pub struct ReassemblyBuffer {
    buf: Vec<u8>,
    pub progress: usize,
    pub target_len: usize,
}

impl ReassemblyBuffer {
    pub fn new() -> Self {
        Self {
            buf: vec![0u8; wire::MAX_FRAME_LEN],
            progress: 0,
            target_len: 0,
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buf
    }

    pub fn complete_frame(&self) -> &[u8] {
        &self.buf[..self.progress]
    }

    pub fn reset(&mut self) {
        self.progress = 0;
        self.target_len = 0;
    }
}

impl Default for ReassemblyBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// The single mutable session instance (spec §3).
pub struct Session {
    pub verbosity: Verbosity,
    pub pin_code: Option<String>,
    pub pin_unlocked: bool,

    pub ctl_state: CtlState,
    pub dms_state: DmsState,
    pub wds_state: WdsState,
    pub nas_state: NasState,

    pub ctl_tid: TidCounter8,
    pub dms_tid: TidCounter16,
    pub wds_tid: TidCounter16,
    pub nas_tid: TidCounter16,

    pub dms_cid: u8,
    pub wds_cid: u8,
    pub nas_cid: u8,
    pub ctl_num_cids: u8,

    pub cur_service: RadioService,
    pub pkt_data_handle: u32,

    pub rx: ReassemblyBuffer,
}

impl Session {
    pub fn new(pin_code: Option<String>, verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            pin_code,
            pin_unlocked: false,
            ctl_state: CtlState::NotSynced,
            dms_state: DmsState::Idle,
            wds_state: WdsState::Idle,
            nas_state: NasState::Idle,
            ctl_tid: TidCounter8::new(),
            dms_tid: TidCounter16::new(),
            wds_tid: TidCounter16::new(),
            nas_tid: TidCounter16::new(),
            dms_cid: 0,
            wds_cid: 0,
            nas_cid: 0,
            ctl_num_cids: 0,
            cur_service: RadioService::None,
            pkt_data_handle: 0,
            rx: ReassemblyBuffer::new(),
        }
    }

    /// Records a newly allocated CID for the given service, advancing that
    /// service's state to `GotCid` and bumping `ctl_num_cids`.
    ///
    /// Returns `true` once all three required CIDs (DMS, WDS, NAS) have been
    /// allocated, signalling the orchestrator fan-out (spec §4.2, §4.5).
    pub fn record_cid(&mut self, service: u8, cid: u8) -> bool {
        match service {
            wire::service::DMS => {
                self.dms_cid = cid;
                self.dms_state = DmsState::GotCid;
            }
            wire::service::WDS => {
                self.wds_cid = cid;
                self.wds_state = WdsState::GotCid;
            }
            wire::service::NAS => {
                self.nas_cid = cid;
                self.nas_state = NasState::GotCid;
            }
            _ => return false,
        }
        self.ctl_num_cids += 1;
        self.ctl_num_cids == 3
    }
}
