//! The QMUX framing codec: building requests and parsing frames.
//!
//! Deliberately byte-slice-driven rather than pointer-cast-over-a-buffer: the
//! teacher's driver code reinterprets device memory through `#[repr(C)]`
//! structs because it talks to MMIO registers, but the re-architecture notes
//! for this dialer call that pattern out specifically for a buffer that comes
//! from `read(2)` on an untrusted peer. `parse_frame` returns an owned-index
//! view over the slice instead of aliasing it as a struct.

use super::tlv::TlvIter;
use super::wire::{self, ControlFlags, QMUX_MARKER};
use crate::error::FramingError;

/// Size of the fixed-layout QMUX prefix: marker + length + flags + service + cid.
pub const QMUX_PREFIX_LEN: usize = 6;

const CTL_HEADER_LEN: usize = 6;
const GENERIC_HEADER_LEN: usize = 7;

/// A parsed view over a complete QMUX frame. Borrows from the original
/// buffer; does not copy the TLV payload.
#[derive(Debug, Clone, Copy)]
pub struct ParsedFrame<'a> {
    pub qmux_flags: u8,
    pub service: u8,
    pub cid: u8,
    pub control_flags: ControlFlags,
    /// Normalized to `u16` regardless of whether the wire header used CTL's
    /// 8-bit or the generic 16-bit width.
    pub transaction_id: u16,
    pub message_id: u16,
    tlv_payload: &'a [u8],
}

impl<'a> ParsedFrame<'a> {
    pub fn is_ctl(&self) -> bool {
        self.service == wire::service::CTL
    }

    /// An indication is distinguished by transaction id zero on non-CTL
    /// services (CTL's transaction id is always nonzero — spec GLOSSARY).
    pub fn is_indication(&self) -> bool {
        !self.is_ctl() && self.transaction_id == 0
    }

    pub fn tlvs(&self) -> TlvIter<'a> {
        TlvIter::new(self.tlv_payload)
    }
}

fn header_len(service: u8) -> usize {
    if service == wire::service::CTL {
        CTL_HEADER_LEN
    } else {
        GENERIC_HEADER_LEN
    }
}

/// Parses a complete frame buffer (as handed over by the event loop once a
/// full frame has been reassembled).
pub fn parse_frame(buf: &[u8]) -> Result<ParsedFrame<'_>, FramingError> {
    if buf.len() < QMUX_PREFIX_LEN {
        return Err(FramingError::Truncated {
            need: QMUX_PREFIX_LEN,
            got: buf.len(),
        });
    }
    if buf[0] != QMUX_MARKER {
        return Err(FramingError::BadMarker);
    }

    let declared_len = u16::from_le_bytes([buf[1], buf[2]]) as usize + 1;
    if declared_len != buf.len() {
        return Err(FramingError::LengthMismatch {
            declared: declared_len,
            actual: buf.len(),
        });
    }

    let qmux_flags = buf[3];
    let service = buf[4];
    let cid = buf[5];

    let hlen = header_len(service);
    if buf.len() < QMUX_PREFIX_LEN + hlen {
        return Err(FramingError::Truncated {
            need: QMUX_PREFIX_LEN + hlen,
            got: buf.len(),
        });
    }
    let hdr = &buf[QMUX_PREFIX_LEN..QMUX_PREFIX_LEN + hlen];

    let (control_flags, transaction_id, message_id, payload_len) = if service == wire::service::CTL
    {
        (
            hdr[0],
            hdr[1] as u16,
            u16::from_le_bytes([hdr[2], hdr[3]]),
            u16::from_le_bytes([hdr[4], hdr[5]]) as usize,
        )
    } else {
        (
            hdr[0],
            u16::from_le_bytes([hdr[1], hdr[2]]),
            u16::from_le_bytes([hdr[3], hdr[4]]),
            u16::from_le_bytes([hdr[5], hdr[6]]) as usize,
        )
    };

    let tlv_start = QMUX_PREFIX_LEN + hlen;
    let available = buf.len() - tlv_start;
    if payload_len != available {
        return Err(FramingError::LengthMismatch {
            declared: payload_len,
            actual: available,
        });
    }

    Ok(ParsedFrame {
        qmux_flags,
        service,
        cid,
        control_flags: ControlFlags::from_bits_truncate(control_flags),
        transaction_id,
        message_id,
        tlv_payload: &buf[tlv_start..],
    })
}

/// Builds a frame incrementally, keeping the QMUX length and service-header
/// payload-length fields in sync as TLVs are appended (spec §4.1, "Append
/// TLV").
pub struct FrameBuilder {
    buf: Vec<u8>,
    is_ctl: bool,
}

impl FrameBuilder {
    pub fn new(service: u8, cid: u8, qmux_flags: u8, transaction_id: u16, message_id: u16) -> Self {
        let is_ctl = service == wire::service::CTL;
        let hlen = header_len(service);
        let mut buf = Vec::with_capacity(QMUX_PREFIX_LEN + hlen);

        buf.push(QMUX_MARKER);
        let initial_len = (QMUX_PREFIX_LEN - 1 + hlen) as u16; // everything after the marker, before TLVs
        buf.extend_from_slice(&initial_len.to_le_bytes());
        buf.push(qmux_flags);
        buf.push(service);
        buf.push(cid);

        if is_ctl {
            buf.push(0); // control-flags
            buf.push(transaction_id as u8);
            buf.extend_from_slice(&message_id.to_le_bytes());
            buf.extend_from_slice(&0u16.to_le_bytes()); // payload length placeholder
        } else {
            buf.push(0); // control-flags
            buf.extend_from_slice(&transaction_id.to_le_bytes());
            buf.extend_from_slice(&message_id.to_le_bytes());
            buf.extend_from_slice(&0u16.to_le_bytes());
        }

        Self { buf, is_ctl }
    }

    /// Appends one TLV, updating both the QMUX length and the service-header
    /// payload length.
    pub fn append_tlv(&mut self, typ: u8, value: &[u8]) -> Result<(), FramingError> {
        let added = 3 + value.len();
        if self.buf.len() + added > wire::MAX_FRAME_LEN {
            return Err(FramingError::TooLarge(
                self.buf.len() + added,
                wire::MAX_FRAME_LEN,
            ));
        }

        self.buf.push(typ);
        self.buf.extend_from_slice(&(value.len() as u16).to_le_bytes());
        self.buf.extend_from_slice(value);

        let qmux_len = u16::from_le_bytes([self.buf[1], self.buf[2]]) + added as u16;
        self.buf[1..3].copy_from_slice(&qmux_len.to_le_bytes());

        let payload_len_offset = if self.is_ctl { 10 } else { 11 };
        let payload_len =
            u16::from_le_bytes([self.buf[payload_len_offset], self.buf[payload_len_offset + 1]])
                + added as u16;
        self.buf[payload_len_offset..payload_len_offset + 2]
            .copy_from_slice(&payload_len.to_le_bytes());

        Ok(())
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Builds a complete request in one call: service, CID, transaction id,
/// message id, and a sequence of `(type, value)` TLVs (spec §4.1, "Build
/// request"). CID `0` and `qmux_flags = FLAGS_REQUEST` are the caller's
/// responsibility to pass correctly; the codec treats them as opaque.
pub fn build_request(
    service: u8,
    cid: u8,
    transaction_id: u16,
    message_id: u16,
    tlvs: &[(u8, &[u8])],
) -> Result<Vec<u8>, FramingError> {
    let mut builder = FrameBuilder::new(
        service,
        cid,
        wire::FLAGS_REQUEST,
        transaction_id,
        message_id,
    );
    for (typ, value) in tlvs {
        builder.append_tlv(*typ, value)?;
    }
    Ok(builder.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_ctl_frame() {
        let tlvs: &[(u8, &[u8])] = &[(0x01, &[0x02]), (0x02, &[0xaa, 0xbb])];
        let frame = build_request(wire::service::CTL, 0, 1, wire::ctl::MSG_SYNC, tlvs).unwrap();

        let expected_len = QMUX_PREFIX_LEN
            + CTL_HEADER_LEN
            + tlvs.iter().map(|(_, v)| 3 + v.len()).sum::<usize>();
        assert_eq!(frame.len(), expected_len);

        let parsed = parse_frame(&frame).unwrap();
        assert_eq!(parsed.service, wire::service::CTL);
        assert_eq!(parsed.cid, 0);
        assert_eq!(parsed.transaction_id, 1);
        assert_eq!(parsed.message_id, wire::ctl::MSG_SYNC);
        assert!(parsed.is_ctl());

        let got: Vec<_> = parsed.tlvs().collect::<Result<_, _>>().unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].typ, 0x01);
        assert_eq!(got[0].value, &[0x02]);
        assert_eq!(got[1].value, &[0xaa, 0xbb]);
    }

    #[test]
    fn round_trip_generic_frame_with_16_bit_transaction_id() {
        let tlvs: &[(u8, &[u8])] = &[(0x11, &[0xff, 0xff])];
        let frame = build_request(wire::service::NAS, 5, 300, 0x0033, tlvs).unwrap();
        let parsed = parse_frame(&frame).unwrap();
        assert_eq!(parsed.service, wire::service::NAS);
        assert_eq!(parsed.cid, 5);
        assert_eq!(parsed.transaction_id, 300);
        assert!(!parsed.is_ctl());
        assert!(!parsed.is_indication());
    }

    #[test]
    fn indication_has_zero_transaction_id_on_non_ctl_service() {
        let frame = build_request(wire::service::NAS, 5, 0, 0x002e, &[]).unwrap();
        // transaction id 0 cannot be produced by the session's tid counter
        // (it skips zero); only the peer sends it, so we build it by hand
        // here to exercise the indication classifier.
        let parsed = parse_frame(&frame).unwrap();
        assert!(parsed.is_indication());
    }

    #[test]
    fn rejects_length_mismatch() {
        let mut frame = build_request(wire::service::CTL, 0, 1, wire::ctl::MSG_SYNC, &[]).unwrap();
        frame.push(0xff); // trailing garbage byte not accounted for in the length field
        assert!(matches!(
            parse_frame(&frame),
            Err(FramingError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn rejects_bad_marker() {
        let mut frame = build_request(wire::service::CTL, 0, 1, wire::ctl::MSG_SYNC, &[]).unwrap();
        frame[0] = 0x02;
        assert!(matches!(parse_frame(&frame), Err(FramingError::BadMarker)));
    }

    #[test]
    fn rejects_truncated_header() {
        let frame = build_request(wire::service::CTL, 0, 1, wire::ctl::MSG_SYNC, &[]).unwrap();
        assert!(matches!(
            parse_frame(&frame[..3]),
            Err(FramingError::Truncated { .. })
        ));
    }
}
