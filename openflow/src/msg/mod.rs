// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! Outbound message builders.
//!
//! One `create_*` per OpenFlow 1.3 message kind; each returns an owned
//! [`Buffer`] whose header carries version 0x04 and whose `length` field
//! equals the buffer size. The two fatal aborts of the original C
//! (`die()` on a frameless unbuffered packet-out and on 16-bit length
//! overflow) surface as [`CodecError`] values instead.

mod config;
mod control;
mod flow_table;
mod multipart;
mod packet_events;
mod port;

pub use config::*;
pub use control::*;
pub use flow_table::*;
pub use multipart::*;
pub use packet_events::*;
pub use port::*;

use tracing::debug;

use crate::OFP_VERSION;
use crate::actions::LengthOverflow;
use crate::buffer::Buffer;

/// Builder-level failures. These are contract violations by the caller,
/// not wire errors; the analogous inbound forms are rejected by the
/// validators.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error(transparent)]
    LengthOverflow(#[from] LengthOverflow),
    #[error("a frame is required when buffer_id is OFP_NO_BUFFER")]
    PacketOutWithoutFrame,
    #[error("frame of {0} bytes is below the 64-byte ethernet minimum")]
    PacketOutFrameTooShort(usize),
}

/// Start a message: write the fixed header with the final `length` when
/// it is known up front, or a placeholder the caller fixes up with
/// [`finish_header`].
pub(crate) fn create_header(transaction_id: u32, msg_type: u8, length: u16) -> Buffer {
    debug!(
        "creating an openflow header ( version = {OFP_VERSION:#x}, type = {msg_type:#x}, length = {length}, xid = {transaction_id:#x} )"
    );
    let mut buf = Buffer::with_capacity(length as usize);
    buf.put_u8(OFP_VERSION);
    buf.put_u8(msg_type);
    buf.put_u16(length);
    buf.put_u32(transaction_id);
    buf
}

/// Rewrite `ofp_header.length` with the buffer's final size.
pub(crate) fn finish_header(buf: &mut Buffer) {
    let len = buf.len() as u16;
    buf.set_u16(2, len);
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::OFP_HEADER_LEN;
    use crate::consts::msg_type::OFPT_HELLO;

    #[test]
    fn header_invariants() {
        let buf = create_header(0xcafe_f00d, OFPT_HELLO, OFP_HEADER_LEN as u16);
        assert_eq!(buf.len(), OFP_HEADER_LEN);
        assert_eq!(buf.u8_at(0), 0x04);
        assert_eq!(buf.u8_at(1), OFPT_HELLO);
        assert_eq!(buf.u16_at(2), 8);
        assert_eq!(buf.u32_at(4), 0xcafe_f00d);
    }
}
