//! The QMUX framing codec (spec §4.1): pure functions over byte buffers,
//! with no knowledge of sessions, services, or I/O.

pub mod frame;
pub mod tlv;
pub mod wire;

pub use frame::{build_request, parse_frame, FrameBuilder, ParsedFrame, QMUX_PREFIX_LEN};
pub use tlv::{Tlv, TlvIter};
