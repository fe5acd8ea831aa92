// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! Handshake and configuration messages: features, switch config, role,
//! async config, queue config.

use tracing::{debug, warn};

use crate::OFP_HEADER_LEN;
use crate::buffer::Buffer;
use crate::consts::msg_type::*;
use crate::consts::{OFPCML_MAX, OFPCML_NO_BUFFER};
use crate::msg::{create_header, finish_header};

#[must_use]
pub fn create_features_request(transaction_id: u32) -> Buffer {
    create_header(transaction_id, OFPT_FEATURES_REQUEST, OFP_HEADER_LEN as u16)
}

#[must_use]
pub fn create_features_reply(
    transaction_id: u32,
    datapath_id: u64,
    n_buffers: u32,
    n_tables: u8,
    auxiliary_id: u8,
    capabilities: u32,
) -> Buffer {
    debug!(
        "creating a features reply ( xid = {transaction_id:#x}, datapath_id = {datapath_id:#x}, n_buffers = {n_buffers:#x}, n_tables = {n_tables:#x}, auxiliary_id = {auxiliary_id:#x}, capabilities = {capabilities:#x} )"
    );

    let mut buf = create_header(transaction_id, OFPT_FEATURES_REPLY, 32);
    buf.put_u64(datapath_id);
    buf.put_u32(n_buffers);
    buf.put_u8(n_tables);
    buf.put_u8(auxiliary_id);
    buf.put_zeros(2);
    buf.put_u32(capabilities);
    buf.put_u32(0); // reserved
    buf
}

#[must_use]
pub fn create_get_config_request(transaction_id: u32) -> Buffer {
    create_header(transaction_id, OFPT_GET_CONFIG_REQUEST, OFP_HEADER_LEN as u16)
}

#[must_use]
pub fn create_get_config_reply(transaction_id: u32, flags: u16, miss_send_len: u16) -> Buffer {
    let mut buf = create_header(transaction_id, OFPT_GET_CONFIG_REPLY, 12);
    buf.put_u16(flags);
    buf.put_u16(miss_send_len);
    buf
}

/// `miss_send_len` above `OFPCML_MAX` (and not the sentinel) is silently
/// clamped with a warning; the wire never carries an illegal value.
#[must_use]
pub fn create_set_config(transaction_id: u32, flags: u16, miss_send_len: u16) -> Buffer {
    let mut miss_send_len = miss_send_len;
    if miss_send_len > OFPCML_MAX && miss_send_len != OFPCML_NO_BUFFER {
        warn!("invalid miss_send_len ( change {miss_send_len:#x} to {OFPCML_MAX:#x} )");
        miss_send_len = OFPCML_MAX;
    }

    let mut buf = create_header(transaction_id, OFPT_SET_CONFIG, 12);
    buf.put_u16(flags);
    buf.put_u16(miss_send_len);
    buf
}

fn create_role(transaction_id: u32, msg_type: u8, role: u32, generation_id: u64) -> Buffer {
    let mut buf = create_header(transaction_id, msg_type, 24);
    buf.put_u32(role);
    buf.put_zeros(4);
    buf.put_u64(generation_id);
    buf
}

#[must_use]
pub fn create_role_request(transaction_id: u32, role: u32, generation_id: u64) -> Buffer {
    create_role(transaction_id, OFPT_ROLE_REQUEST, role, generation_id)
}

#[must_use]
pub fn create_role_reply(transaction_id: u32, role: u32, generation_id: u64) -> Buffer {
    create_role(transaction_id, OFPT_ROLE_REPLY, role, generation_id)
}

#[must_use]
pub fn create_get_async_request(transaction_id: u32) -> Buffer {
    create_header(transaction_id, OFPT_GET_ASYNC_REQUEST, OFP_HEADER_LEN as u16)
}

fn create_async_config(
    transaction_id: u32,
    msg_type: u8,
    packet_in_mask: [u32; 2],
    port_status_mask: [u32; 2],
    flow_removed_mask: [u32; 2],
) -> Buffer {
    let mut buf = create_header(transaction_id, msg_type, 32);
    buf.put_u32(packet_in_mask[0]);
    buf.put_u32(packet_in_mask[1]);
    buf.put_u32(port_status_mask[0]);
    buf.put_u32(port_status_mask[1]);
    buf.put_u32(flow_removed_mask[0]);
    buf.put_u32(flow_removed_mask[1]);
    buf
}

#[must_use]
pub fn create_get_async_reply(
    transaction_id: u32,
    packet_in_mask: [u32; 2],
    port_status_mask: [u32; 2],
    flow_removed_mask: [u32; 2],
) -> Buffer {
    create_async_config(
        transaction_id,
        OFPT_GET_ASYNC_REPLY,
        packet_in_mask,
        port_status_mask,
        flow_removed_mask,
    )
}

#[must_use]
pub fn create_set_async(
    transaction_id: u32,
    packet_in_mask: [u32; 2],
    port_status_mask: [u32; 2],
    flow_removed_mask: [u32; 2],
) -> Buffer {
    create_async_config(
        transaction_id,
        OFPT_SET_ASYNC,
        packet_in_mask,
        port_status_mask,
        flow_removed_mask,
    )
}

/// A queue property inside a packet queue description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueProperty {
    MinRate { rate: u16 },
    MaxRate { rate: u16 },
    Experimenter { experimenter: u32, data: Vec<u8> },
}

impl QueueProperty {
    #[must_use]
    pub fn wire_len(&self) -> usize {
        match self {
            QueueProperty::MinRate { .. } | QueueProperty::MaxRate { .. } => 16,
            QueueProperty::Experimenter { data, .. } => 16 + data.len(),
        }
    }

    fn pack(&self, buf: &mut Buffer) {
        use crate::consts::{OFPQT_EXPERIMENTER, OFPQT_MAX_RATE, OFPQT_MIN_RATE};

        match self {
            QueueProperty::MinRate { rate } | QueueProperty::MaxRate { rate } => {
                let property = if matches!(self, QueueProperty::MinRate { .. }) {
                    OFPQT_MIN_RATE
                } else {
                    OFPQT_MAX_RATE
                };
                buf.put_u16(property);
                buf.put_u16(16);
                buf.put_zeros(4);
                buf.put_u16(*rate);
                buf.put_zeros(6);
            }
            QueueProperty::Experimenter { experimenter, data } => {
                buf.put_u16(OFPQT_EXPERIMENTER);
                buf.put_u16(self.wire_len() as u16);
                buf.put_zeros(4);
                buf.put_u32(*experimenter);
                buf.put_zeros(4);
                buf.put_bytes(data);
            }
        }
    }
}

/// One `ofp_packet_queue` description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketQueue {
    pub queue_id: u32,
    pub port: u32,
    pub properties: Vec<QueueProperty>,
}

impl PacketQueue {
    #[must_use]
    pub fn wire_len(&self) -> usize {
        16 + self.properties.iter().map(QueueProperty::wire_len).sum::<usize>()
    }

    fn pack(&self, buf: &mut Buffer) {
        buf.put_u32(self.queue_id);
        buf.put_u32(self.port);
        buf.put_u16(self.wire_len() as u16);
        buf.put_zeros(6);
        for property in &self.properties {
            property.pack(buf);
        }
    }
}

#[must_use]
pub fn create_queue_get_config_request(transaction_id: u32, port: u32) -> Buffer {
    let mut buf = create_header(transaction_id, OFPT_QUEUE_GET_CONFIG_REQUEST, 16);
    buf.put_u32(port);
    buf.put_zeros(4);
    buf
}

#[must_use]
pub fn create_queue_get_config_reply(
    transaction_id: u32,
    port: u32,
    queues: &[PacketQueue],
) -> Buffer {
    let mut buf = create_header(transaction_id, OFPT_QUEUE_GET_CONFIG_REPLY, 0);
    buf.put_u32(port);
    buf.put_zeros(4);
    for queue in queues {
        queue.pack(&mut buf);
    }
    finish_header(&mut buf);
    buf
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn set_config_normal_is_twelve_bytes() {
        let buf = create_set_config(0x10, crate::consts::OFPC_FRAG_NORMAL, 128);
        assert_eq!(buf.len(), 12);
        assert_eq!(buf.u16_at(2), 12);
        assert_eq!(buf.u16_at(8), 0);
        assert_eq!(buf.u16_at(10), 128);
    }

    #[test]
    fn set_config_clamps_oversized_miss_send_len() {
        let buf = create_set_config(0x10, 0, 0xfff0);
        assert_eq!(buf.u16_at(10), OFPCML_MAX);
    }

    #[test]
    fn set_config_keeps_the_no_buffer_sentinel() {
        let buf = create_set_config(0x10, 0, OFPCML_NO_BUFFER);
        assert_eq!(buf.u16_at(10), OFPCML_NO_BUFFER);
    }

    #[test]
    fn features_reply_layout() {
        let buf = create_features_reply(7, 0xabcd, 256, 254, 0, 0x4f);
        assert_eq!(buf.len(), 32);
        assert_eq!(buf.u64_at(8), 0xabcd);
        assert_eq!(buf.u32_at(16), 256);
        assert_eq!(buf.u8_at(20), 254);
        assert_eq!(buf.u32_at(24), 0x4f);
        assert_eq!(buf.u32_at(28), 0);
    }

    #[test]
    fn queue_reply_packs_queues_and_fixes_length() {
        let queues = vec![PacketQueue {
            queue_id: 1,
            port: 2,
            properties: vec![QueueProperty::MinRate { rate: 100 }],
        }];
        let buf = create_queue_get_config_reply(3, 2, &queues);
        assert_eq!(buf.len(), 16 + 32);
        assert_eq!(buf.u16_at(2), 48);
        assert_eq!(buf.u32_at(16), 1);
        assert_eq!(buf.u16_at(24), 32); // queue len
        assert_eq!(buf.u16_at(32), crate::consts::OFPQT_MIN_RATE);
    }
}
