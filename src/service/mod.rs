//! Service engines: one per QMUX service, each owning its slice of protocol
//! logic (spec §4.2–§4.5).
//!
//! The re-architecture notes ask for polymorphism over a capability set
//! instead of the original's per-service `if` chains; `handle_message` is
//! that capability, dispatched uniformly via [`enum_dispatch`] the same way
//! the teacher kernel dispatches `Read`/`Write` over its device variants.
//! Lifecycle hooks (`enter`, `update_connect`, teardown sends) stay as
//! inherent methods on each engine because their signatures genuinely
//! differ per service — CTL's orchestration and NAS's service-edge trigger
//! are stitched together by the orchestrator and event loop instead of
//! forced through one shared shape.

pub mod ctl;
pub mod dms;
pub mod nas;
pub mod wds;

use crate::error::ProtocolError;
use crate::qmux::ParsedFrame;
use crate::session::Session;
use enum_dispatch::enum_dispatch;

pub use ctl::CtlEngine;
pub use dms::DmsEngine;
pub use nas::NasEngine;
pub use wds::WdsEngine;

/// What a single call into an engine produced.
#[derive(Debug, Default)]
pub struct EngineOutcome {
    /// Frames the engine wants sent immediately, in order (e.g. CTL fans out
    /// three GET_CID requests once SYNC succeeds).
    pub outbound: Vec<Vec<u8>>,
    /// CTL only: `ctl_num_cids` just reached 3 — orchestrator should run the
    /// DMS/WDS/NAS startup fan-out (spec §4.5).
    pub startup_ready: bool,
    /// NAS only: `cur_service` crossed the in-service/out-of-service boundary
    /// — WDS's `update_connect` should be invoked (spec §4.3, §4.4).
    pub service_edge: bool,
    /// Set when the message indicated a fatal protocol failure.
    pub failure: Option<ProtocolError>,
}

impl EngineOutcome {
    pub fn ignored() -> Self {
        Self::default()
    }

    pub fn send(frame: Vec<u8>) -> Self {
        Self {
            outbound: vec![frame],
            ..Self::default()
        }
    }

    pub fn send_all(frames: Vec<Vec<u8>>) -> Self {
        Self {
            outbound: frames,
            ..Self::default()
        }
    }

    pub fn fail(err: ProtocolError) -> Self {
        Self {
            failure: Some(err),
            ..Self::default()
        }
    }
}

/// The uniform capability every service engine implements: react to one
/// inbound frame already known to belong to this service.
#[enum_dispatch]
pub trait ServiceEngine {
    fn handle_message(&mut self, session: &mut Session, frame: &ParsedFrame<'_>) -> EngineOutcome;
}

/// A service engine, closed over the four services this dialer speaks.
#[enum_dispatch(ServiceEngine)]
pub enum AnyEngine {
    Ctl(CtlEngine),
    Dms(DmsEngine),
    Wds(WdsEngine),
    Nas(NasEngine),
}

/// The full set of engines the event loop dispatches across, one instance
/// per service for the lifetime of the session.
pub struct Engines {
    pub ctl: CtlEngine,
    pub dms: DmsEngine,
    pub wds: WdsEngine,
    pub nas: NasEngine,
}

impl Engines {
    pub fn new() -> Self {
        Self {
            ctl: CtlEngine::new(),
            dms: DmsEngine::new(),
            wds: WdsEngine::new(),
            nas: NasEngine::new(),
        }
    }

    /// Routes a parsed frame to the engine that owns its service byte.
    pub fn dispatch(&mut self, session: &mut Session, frame: &ParsedFrame<'_>) -> EngineOutcome {
        use crate::qmux::wire::service;
        match frame.service {
            service::CTL => self.ctl.handle_message(session, frame),
            service::DMS => self.dms.handle_message(session, frame),
            service::WDS => self.wds.handle_message(session, frame),
            service::NAS => self.nas.handle_message(session, frame),
            other => {
                log::warn!("dropping frame for unknown service {other:#04x}");
                EngineOutcome::ignored()
            }
        }
    }
}

impl Default for Engines {
    fn default() -> Self {
        Self::new()
    }
}
