//! Error types for the framing codec, service engines and the dialer as a whole.

/// Errors produced while decoding or building a QMUX frame.
///
/// These are never fatal on their own: a malformed inbound frame is logged
/// and dropped (spec §7); `TooLarge` guards frame construction against the
/// reassembly buffer's fixed capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum FramingError {
    /// Buffer is shorter than the fixed-layout header it claims to contain.
    #[error("frame truncated: need at least {need} bytes, got {got}")]
    Truncated { need: usize, got: usize },

    /// First byte of the buffer is not the QMUX marker (`0x01`).
    #[error("frame does not start with the qmux marker byte")]
    BadMarker,

    /// The QMUX length field does not match the size of the buffer handed in.
    #[error("qmux length field ({declared}) inconsistent with buffer size ({actual})")]
    LengthMismatch { declared: usize, actual: usize },

    /// Announced frame length exceeds the reassembly buffer's capacity.
    #[error("announced frame length {0} exceeds the {1}-byte reassembly buffer")]
    TooLarge(usize, usize),

    /// A TLV's declared length runs past the end of the payload.
    #[error("tlv of type {0:#04x} overruns its payload")]
    TlvOverrun(u8),

    /// Encoding would not fit in the destination buffer.
    #[error("encoded frame does not fit in the {0}-byte buffer")]
    BufferTooSmall(usize),
}

/// A fatal failure of the startup/steady-state protocol sequence (spec §7).
///
/// Any engine returning this from `handle_message` causes the event loop to
/// run teardown and exit non-zero.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct ProtocolError(pub &'static str);

impl ProtocolError {
    pub const fn new(msg: &'static str) -> Self {
        Self(msg)
    }
}

/// Top-level error returned from the dialer's fallible entry point.
#[derive(Debug, thiserror::Error)]
pub enum DialerError {
    #[error("device I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol failure: {0}")]
    Protocol(#[from] ProtocolError),
}
