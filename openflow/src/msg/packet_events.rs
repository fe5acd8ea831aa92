// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! Packet-path messages: packet-in, packet-out, flow-removed.

use tracing::debug;

use crate::buffer::Buffer;
use crate::actions::ActionList;
use crate::consts::msg_type::{OFPT_FLOW_REMOVED, OFPT_PACKET_IN, OFPT_PACKET_OUT};
use crate::consts::{ETH_FCS_LENGTH, ETH_MINIMUM_LENGTH, OFP_NO_BUFFER};
use crate::msg::{CodecError, create_header};
use crate::oxm::OxmMatch;

/// `offsetof(struct ofp_packet_in, match)`.
const PACKET_IN_FIXED_LEN: usize = 24;
/// `offsetof(struct ofp_packet_out, actions)`.
const PACKET_OUT_FIXED_LEN: usize = 24;
/// `offsetof(struct ofp_flow_removed, match)`.
const FLOW_REMOVED_FIXED_LEN: usize = 48;

/// Build a packet-in. The match is 64-bit padded, then a 2-byte pad
/// separates it from the frame bytes.
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn create_packet_in(
    transaction_id: u32,
    buffer_id: u32,
    total_len: u16,
    reason: u8,
    table_id: u8,
    cookie: u64,
    oxm_match: &OxmMatch,
    data: Option<&[u8]>,
) -> Buffer {
    let data_length = data.map_or(0, <[u8]>::len);
    debug!(
        "creating a packet-in ( xid = {transaction_id:#x}, buffer_id = {buffer_id:#x}, total_len = {total_len:#x}, reason = {reason:#x}, table_id = {table_id:#x}, cookie = {cookie:#x}, data length = {data_length} )"
    );

    let match_len = oxm_match.padded_length();
    let length = PACKET_IN_FIXED_LEN + match_len + 2 + data_length;
    let mut buf = create_header(transaction_id, OFPT_PACKET_IN, length as u16);
    buf.put_u32(buffer_id);
    buf.put_u16(total_len);
    buf.put_u8(reason);
    buf.put_u8(table_id);
    buf.put_u64(cookie);
    oxm_match.pack(&mut buf);
    buf.put_zeros(2);
    if let Some(data) = data {
        buf.put_bytes(data);
    }
    buf
}

/// Build a packet-out.
///
/// When `buffer_id` is `OFP_NO_BUFFER` a frame must be supplied and,
/// with the FCS added back, reach the 64-byte Ethernet minimum; those
/// contract violations are errors here rather than the aborts of the
/// original.
pub fn create_packet_out(
    transaction_id: u32,
    buffer_id: u32,
    in_port: u32,
    actions: &ActionList,
    data: Option<&[u8]>,
) -> Result<Buffer, CodecError> {
    let data_length = data.map_or(0, <[u8]>::len);
    debug!(
        "creating a packet-out ( xid = {transaction_id:#x}, buffer_id = {buffer_id:#x}, in_port = {in_port:#x}, data length = {data_length} )"
    );

    if buffer_id == OFP_NO_BUFFER {
        if data.is_none() {
            return Err(CodecError::PacketOutWithoutFrame);
        }
        if data_length + ETH_FCS_LENGTH < ETH_MINIMUM_LENGTH {
            return Err(CodecError::PacketOutFrameTooShort(data_length));
        }
    }

    let actions_length = actions.length()?;
    let length = PACKET_OUT_FIXED_LEN + actions_length as usize + data_length;
    let mut buf = create_header(transaction_id, OFPT_PACKET_OUT, length as u16);
    buf.put_u32(buffer_id);
    buf.put_u32(in_port);
    buf.put_u16(actions_length);
    buf.put_zeros(6);
    actions.pack(&mut buf);
    if let Some(data) = data {
        buf.put_bytes(data);
    }
    Ok(buf)
}

/// Build a flow-removed notification.
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn create_flow_removed(
    transaction_id: u32,
    cookie: u64,
    priority: u16,
    reason: u8,
    table_id: u8,
    duration_sec: u32,
    duration_nsec: u32,
    idle_timeout: u16,
    hard_timeout: u16,
    packet_count: u64,
    byte_count: u64,
    oxm_match: &OxmMatch,
) -> Buffer {
    let length = FLOW_REMOVED_FIXED_LEN + oxm_match.padded_length();
    let mut buf = create_header(transaction_id, OFPT_FLOW_REMOVED, length as u16);
    buf.put_u64(cookie);
    buf.put_u16(priority);
    buf.put_u8(reason);
    buf.put_u8(table_id);
    buf.put_u32(duration_sec);
    buf.put_u32(duration_nsec);
    buf.put_u16(idle_timeout);
    buf.put_u16(hard_timeout);
    buf.put_u64(packet_count);
    buf.put_u64(byte_count);
    oxm_match.pack(&mut buf);
    buf
}
