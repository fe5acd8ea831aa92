// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! End-to-end codec checks: everything a builder emits must satisfy the
//! corresponding validator, carry version 0x04, and keep 8-byte
//! structure alignment.

use openflow::actions::{Action, ActionList};
use openflow::consts::{OFP_NO_BUFFER, OFPFC_ADD, OFPR_NO_MATCH};
use openflow::instructions::{Instruction, InstructionList};
use openflow::msg::{
    MultipartCursor, create_flow_mod, create_flow_multipart_reply, create_packet_in,
    FlowStatsEntry,
};
use openflow::oxm::{OxmMatch, OxmTlv, field};
use openflow::validate::{validate_flow_mod, validate_multipart_reply, validate_packet_in};

fn sample_match() -> OxmMatch {
    let mut m = OxmMatch::new();
    m.append_in_port(3);
    m.append_eth_type(0x0800);
    m.append_ipv4_src("10.0.0.1".parse().unwrap(), Some("255.255.0.0".parse().unwrap()));
    m.append_ip_proto(17);
    m.append_udp_src(53);
    m
}

#[test]
fn flow_mod_structures_stay_eight_byte_aligned() {
    let set_field = OxmTlv::new(field::VLAN_PCP, vec![5], None).unwrap();
    let actions: ActionList = [
        Action::SetField { field: set_field },
        Action::Output { port: 1, max_len: 0xffff },
    ]
    .into_iter()
    .collect();
    let instructions: InstructionList =
        [Instruction::ApplyActions { actions }].into_iter().collect();

    let buf = create_flow_mod(
        0x10,
        1,
        0,
        0,
        OFPFC_ADD,
        0,
        0,
        10,
        OFP_NO_BUFFER,
        openflow::consts::port_no::OFPP_ANY,
        openflow::consts::group_no::OFPG_ANY,
        0,
        &sample_match(),
        &instructions,
    )
    .unwrap();

    assert_eq!(buf.u8_at(0), 0x04);
    assert_eq!(buf.u16_at(2) as usize, buf.len());
    assert!(validate_flow_mod(buf.as_slice()).is_ok());

    // the instruction region starts 8-byte aligned after the match
    let match_declared = buf.u16_at(50) as usize;
    let padded = match_declared + openflow::pad_to_64(match_declared);
    assert_eq!((48 + padded) % 8, 0);
    // total message stays aligned because set-field actions carry pad
    assert_eq!(buf.len() % 8, 0);
}

#[test]
fn packet_in_match_round_trips_through_bytes() {
    let frame = vec![0x5a; 72];
    let m = sample_match();
    let buf = create_packet_in(0x11, OFP_NO_BUFFER, 72, OFPR_NO_MATCH, 0, 7, &m, Some(&frame));
    assert!(validate_packet_in(buf.as_slice()).is_ok());

    let decoded = OxmMatch::unpack(&buf.as_slice()[24..]).unwrap();
    assert!(m.strict_eq(&decoded));

    // frame bytes land after the padded match plus the two-byte pad
    let data_offset = 24 + m.padded_length() + 2;
    assert_eq!(&buf.as_slice()[data_offset..], &frame[..]);
}

#[test]
fn chunked_flow_reply_concatenation_preserves_records() {
    let entries: Vec<FlowStatsEntry> = (0..900)
        .map(|i| FlowStatsEntry {
            table_id: 0,
            duration_sec: i,
            duration_nsec: 0,
            priority: 1,
            idle_timeout: 0,
            hard_timeout: 0,
            flags: 0,
            cookie: u64::from(i),
            packet_count: 0,
            byte_count: 0,
            oxm_match: sample_match(),
            instructions: InstructionList::new(),
        })
        .collect();

    let mut cursor = MultipartCursor::new();
    let mut body = Vec::new();
    let mut frames = 0;
    loop {
        let buf = create_flow_multipart_reply(0x12, 0, &entries, &mut cursor);
        assert!(validate_multipart_reply(buf.as_slice()).is_ok());
        body.extend_from_slice(&buf.as_slice()[16..]);
        frames += 1;
        if !cursor.more {
            break;
        }
    }
    assert!(frames >= 2);

    // the concatenated body decodes back into every record, in order
    let mut offset = 0usize;
    let mut n = 0usize;
    while offset < body.len() {
        let len = u16::from_be_bytes([body[offset], body[offset + 1]]) as usize;
        let cookie = u64::from_be_bytes(body[offset + 24..offset + 32].try_into().unwrap());
        assert_eq!(cookie, n as u64);
        offset += len;
        n += 1;
    }
    assert_eq!(n, entries.len());
}
