// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! Table-programming messages: flow-mod, group-mod, meter-mod.

use crate::buckets::BucketList;
use crate::buffer::Buffer;
use crate::consts::msg_type::{OFPT_FLOW_MOD, OFPT_GROUP_MOD, OFPT_METER_MOD};
use crate::instructions::InstructionList;
use crate::msg::{CodecError, create_header};
use crate::oxm::OxmMatch;

/// `offsetof(struct ofp_flow_mod, match)`.
const FLOW_MOD_FIXED_LEN: usize = 48;

/// Build a flow-mod: fixed fields, 64-bit padded match, then the
/// instruction list in order.
#[allow(clippy::too_many_arguments)]
pub fn create_flow_mod(
    transaction_id: u32,
    cookie: u64,
    cookie_mask: u64,
    table_id: u8,
    command: u8,
    idle_timeout: u16,
    hard_timeout: u16,
    priority: u16,
    buffer_id: u32,
    out_port: u32,
    out_group: u32,
    flags: u16,
    oxm_match: &OxmMatch,
    instructions: &InstructionList,
) -> Result<Buffer, CodecError> {
    let instructions_length = instructions.length()?;
    let length = FLOW_MOD_FIXED_LEN + oxm_match.padded_length() + instructions_length as usize;

    let mut buf = create_header(transaction_id, OFPT_FLOW_MOD, length as u16);
    buf.put_u64(cookie);
    buf.put_u64(cookie_mask);
    buf.put_u8(table_id);
    buf.put_u8(command);
    buf.put_u16(idle_timeout);
    buf.put_u16(hard_timeout);
    buf.put_u16(priority);
    buf.put_u32(buffer_id);
    buf.put_u32(out_port);
    buf.put_u32(out_group);
    buf.put_u16(flags);
    buf.put_zeros(2);
    oxm_match.pack(&mut buf);
    instructions.pack(&mut buf);
    Ok(buf)
}

/// Build a group-mod carrying the bucket list.
pub fn create_group_mod(
    transaction_id: u32,
    command: u16,
    group_type: u8,
    group_id: u32,
    buckets: &BucketList,
) -> Result<Buffer, CodecError> {
    let buckets_length = buckets.length()?;
    let length = 16 + buckets_length as usize;

    let mut buf = create_header(transaction_id, OFPT_GROUP_MOD, length as u16);
    buf.put_u16(command);
    buf.put_u8(group_type);
    buf.put_zeros(1);
    buf.put_u32(group_id);
    buckets.pack(&mut buf)?;
    Ok(buf)
}

/// A meter band. Every kind is 16 bytes on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeterBand {
    Drop { rate: u32, burst_size: u32 },
    DscpRemark { rate: u32, burst_size: u32, prec_level: u8 },
    Experimenter { rate: u32, burst_size: u32, experimenter: u32 },
}

/// Wire size of every meter band kind.
pub const METER_BAND_LEN: usize = 16;

impl MeterBand {
    #[must_use]
    pub fn rate(&self) -> u32 {
        match self {
            MeterBand::Drop { rate, .. }
            | MeterBand::DscpRemark { rate, .. }
            | MeterBand::Experimenter { rate, .. } => *rate,
        }
    }

    #[must_use]
    pub fn burst_size(&self) -> u32 {
        match self {
            MeterBand::Drop { burst_size, .. }
            | MeterBand::DscpRemark { burst_size, .. }
            | MeterBand::Experimenter { burst_size, .. } => *burst_size,
        }
    }

    pub fn pack(&self, buf: &mut Buffer) {
        use crate::consts::{OFPMBT_DROP, OFPMBT_DSCP_REMARK, OFPMBT_EXPERIMENTER};

        match self {
            MeterBand::Drop { rate, burst_size } => {
                buf.put_u16(OFPMBT_DROP);
                buf.put_u16(METER_BAND_LEN as u16);
                buf.put_u32(*rate);
                buf.put_u32(*burst_size);
                buf.put_zeros(4);
            }
            MeterBand::DscpRemark { rate, burst_size, prec_level } => {
                buf.put_u16(OFPMBT_DSCP_REMARK);
                buf.put_u16(METER_BAND_LEN as u16);
                buf.put_u32(*rate);
                buf.put_u32(*burst_size);
                buf.put_u8(*prec_level);
                buf.put_zeros(3);
            }
            MeterBand::Experimenter { rate, burst_size, experimenter } => {
                buf.put_u16(OFPMBT_EXPERIMENTER);
                buf.put_u16(METER_BAND_LEN as u16);
                buf.put_u32(*rate);
                buf.put_u32(*burst_size);
                buf.put_u32(*experimenter);
            }
        }
    }

    /// Decode one band from validated bytes.
    pub fn unpack(raw: &[u8]) -> Result<(MeterBand, usize), crate::error::ErrorKind> {
        use crate::consts::{OFPMBT_DROP, OFPMBT_DSCP_REMARK, OFPMBT_EXPERIMENTER};
        use crate::error::ErrorKind;

        if raw.len() < METER_BAND_LEN {
            return Err(ErrorKind::TooShortMessage);
        }
        let kind = u16::from_be_bytes([raw[0], raw[1]]);
        let len = u16::from_be_bytes([raw[2], raw[3]]) as usize;
        if len < METER_BAND_LEN || raw.len() < len {
            return Err(ErrorKind::TooShortMessage);
        }
        let rate = u32::from_be_bytes([raw[4], raw[5], raw[6], raw[7]]);
        let burst_size = u32::from_be_bytes([raw[8], raw[9], raw[10], raw[11]]);
        let band = match kind {
            OFPMBT_DROP => MeterBand::Drop { rate, burst_size },
            OFPMBT_DSCP_REMARK => MeterBand::DscpRemark { rate, burst_size, prec_level: raw[12] },
            OFPMBT_EXPERIMENTER => MeterBand::Experimenter {
                rate,
                burst_size,
                experimenter: u32::from_be_bytes([raw[12], raw[13], raw[14], raw[15]]),
            },
            _ => return Err(ErrorKind::InvalidMeterBandType),
        };
        Ok((band, len))
    }
}

/// Build a meter-mod carrying the band list.
#[must_use]
pub fn create_meter_mod(
    transaction_id: u32,
    command: u16,
    flags: u16,
    meter_id: u32,
    bands: &[MeterBand],
) -> Buffer {
    let length = 16 + bands.len() * METER_BAND_LEN;
    let mut buf = create_header(transaction_id, OFPT_METER_MOD, length as u16);
    buf.put_u16(command);
    buf.put_u16(flags);
    buf.put_u32(meter_id);
    for band in bands {
        band.pack(&mut buf);
    }
    buf
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::actions::{Action, ActionList};
    use crate::buckets::Bucket;
    use crate::consts::{OFP_NO_BUFFER, OFPFC_ADD, OFPGC_ADD, OFPGT_ALL, OFPMC_ADD};
    use crate::instructions::Instruction;
    use pretty_assertions::assert_eq;

    #[test]
    fn flow_mod_lays_out_match_then_instructions() {
        let mut m = OxmMatch::new();
        m.append_in_port(1);
        m.append_eth_type(0x0800);
        let actions: ActionList =
            [Action::Output { port: 2, max_len: 0xffff }].into_iter().collect();
        let instructions: InstructionList =
            [Instruction::ApplyActions { actions }].into_iter().collect();

        let buf = create_flow_mod(
            1,
            0xc,
            0,
            0,
            OFPFC_ADD,
            0,
            0,
            100,
            OFP_NO_BUFFER,
            crate::consts::port_no::OFPP_ANY,
            crate::consts::group_no::OFPG_ANY,
            0,
            &m,
            &instructions,
        )
        .unwrap();

        // match: 4 + 8 + 6 = 18 -> padded 24; instructions: 8 + 16
        assert_eq!(buf.len(), 48 + 24 + 24);
        assert_eq!(buf.u16_at(2), 96);
        assert_eq!(buf.u64_at(8), 0xc);
        assert_eq!(buf.u8_at(25), OFPFC_ADD);
        assert_eq!(buf.u16_at(30), 100);
        assert_eq!(buf.u32_at(32), OFP_NO_BUFFER);
        // match header at offset 48
        assert_eq!(buf.u16_at(48), crate::oxm::OFPMT_OXM);
        assert_eq!(buf.u16_at(50), 18);
        // first instruction after the padded match
        assert_eq!(buf.u16_at(72), crate::consts::instruction_type::OFPIT_APPLY_ACTIONS);
    }

    #[test]
    fn group_mod_packs_buckets() {
        let actions: ActionList =
            [Action::Output { port: 1, max_len: 0 }].into_iter().collect();
        let buckets: BucketList =
            [Bucket::new(1, 0xffff_ffff, 0xffff_ffff, actions)].into_iter().collect();
        let buf = create_group_mod(2, OFPGC_ADD, OFPGT_ALL, 7, &buckets).unwrap();
        assert_eq!(buf.len(), 16 + 32);
        assert_eq!(buf.u16_at(8), OFPGC_ADD);
        assert_eq!(buf.u8_at(10), OFPGT_ALL);
        assert_eq!(buf.u32_at(12), 7);
        assert_eq!(buf.u16_at(16), 32); // bucket len
    }

    #[test]
    fn meter_mod_packs_bands() {
        let bands = vec![
            MeterBand::Drop { rate: 1000, burst_size: 100 },
            MeterBand::DscpRemark { rate: 2000, burst_size: 200, prec_level: 2 },
        ];
        let buf = create_meter_mod(3, OFPMC_ADD, 1, 9, &bands);
        assert_eq!(buf.len(), 16 + 32);
        assert_eq!(buf.u16_at(8), OFPMC_ADD);
        assert_eq!(buf.u32_at(12), 9);
        assert_eq!(buf.u16_at(16), crate::consts::OFPMBT_DROP);
        assert_eq!(buf.u32_at(20), 1000);
        assert_eq!(buf.u16_at(32), crate::consts::OFPMBT_DSCP_REMARK);
        assert_eq!(buf.u8_at(44), 2);
    }
}
