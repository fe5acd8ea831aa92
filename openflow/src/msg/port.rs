// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! Port descriptions and port-level messages.

use crate::buffer::Buffer;
use crate::consts::msg_type::{OFPT_PORT_MOD, OFPT_PORT_STATUS, OFPT_TABLE_MOD};
use crate::consts::{ETH_ADDRLEN, OFP_MAX_PORT_NAME_LEN};
use crate::msg::create_header;

/// Wire size of `struct ofp_port`.
pub const PORT_DESC_LEN: usize = 64;

/// A full `ofp_port` description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortDesc {
    pub port_no: u32,
    pub hw_addr: [u8; ETH_ADDRLEN],
    pub name: String,
    pub config: u32,
    pub state: u32,
    pub curr: u32,
    pub advertised: u32,
    pub supported: u32,
    pub peer: u32,
    pub curr_speed: u32,
    pub max_speed: u32,
}

impl PortDesc {
    pub fn pack(&self, buf: &mut Buffer) {
        buf.put_u32(self.port_no);
        buf.put_zeros(4);
        buf.put_bytes(&self.hw_addr);
        buf.put_zeros(2);

        let mut name = [0u8; OFP_MAX_PORT_NAME_LEN];
        let raw = self.name.as_bytes();
        let copy = raw.len().min(OFP_MAX_PORT_NAME_LEN - 1);
        name[..copy].copy_from_slice(&raw[..copy]);
        buf.put_bytes(&name);

        buf.put_u32(self.config);
        buf.put_u32(self.state);
        buf.put_u32(self.curr);
        buf.put_u32(self.advertised);
        buf.put_u32(self.supported);
        buf.put_u32(self.peer);
        buf.put_u32(self.curr_speed);
        buf.put_u32(self.max_speed);
    }
}

#[must_use]
pub fn create_port_status(transaction_id: u32, reason: u8, desc: &PortDesc) -> Buffer {
    let length = 16 + PORT_DESC_LEN;
    let mut buf = create_header(transaction_id, OFPT_PORT_STATUS, length as u16);
    buf.put_u8(reason);
    buf.put_zeros(7);
    desc.pack(&mut buf);
    buf
}

#[must_use]
pub fn create_port_mod(
    transaction_id: u32,
    port_no: u32,
    hw_addr: [u8; ETH_ADDRLEN],
    config: u32,
    mask: u32,
    advertise: u32,
) -> Buffer {
    let mut buf = create_header(transaction_id, OFPT_PORT_MOD, 40);
    buf.put_u32(port_no);
    buf.put_zeros(4);
    buf.put_bytes(&hw_addr);
    buf.put_zeros(2);
    buf.put_u32(config);
    buf.put_u32(mask);
    buf.put_u32(advertise);
    buf.put_zeros(4);
    buf
}

#[must_use]
pub fn create_table_mod(transaction_id: u32, table_id: u8, config: u32) -> Buffer {
    let mut buf = create_header(transaction_id, OFPT_TABLE_MOD, 16);
    buf.put_u8(table_id);
    buf.put_zeros(3);
    buf.put_u32(config);
    buf
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn port(no: u32, name: &str) -> PortDesc {
        PortDesc {
            port_no: no,
            hw_addr: [2, 0, 0, 0, 0, no as u8],
            name: name.to_owned(),
            state: crate::consts::PortState::LIVE.bits(),
            ..PortDesc::default()
        }
    }

    #[test]
    fn port_desc_is_sixty_four_bytes() {
        let mut buf = Buffer::new();
        port(1, "veth0").pack(&mut buf);
        assert_eq!(buf.len(), PORT_DESC_LEN);
        assert_eq!(buf.u32_at(0), 1);
        assert_eq!(&buf.as_slice()[16..21], b"veth0");
        assert_eq!(buf.u8_at(31), 0); // name is nul padded
        assert_eq!(buf.u32_at(36), crate::consts::PortState::LIVE.bits());
    }

    #[test]
    fn port_status_layout() {
        let buf = create_port_status(5, crate::consts::OFPPR_ADD, &port(9, "p9"));
        assert_eq!(buf.len(), 80);
        assert_eq!(buf.u16_at(2), 80);
        assert_eq!(buf.u8_at(8), crate::consts::OFPPR_ADD);
        assert_eq!(buf.u32_at(16), 9);
    }

    #[test]
    fn port_mod_layout() {
        let buf = create_port_mod(1, 2, [0xaa; 6], 0x1, 0x1, 0);
        assert_eq!(buf.len(), 40);
        assert_eq!(buf.u32_at(8), 2);
        assert_eq!(&buf.as_slice()[16..22], &[0xaa; 6]);
        assert_eq!(buf.u32_at(24), 1);
        assert_eq!(buf.u32_at(28), 1);
    }

    #[test]
    fn table_mod_layout() {
        let buf = create_table_mod(1, 0xff, 3);
        assert_eq!(buf.len(), 16);
        assert_eq!(buf.u8_at(8), 0xff);
        assert_eq!(buf.u32_at(12), 3);
    }
}
