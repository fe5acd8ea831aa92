// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

use pretty_assertions::assert_eq;

use super::*;
use crate::actions::{Action, ActionList};
use crate::buckets::{Bucket, BucketList};
use crate::buffer::Buffer;
use crate::consts::{
    OFP_NO_BUFFER, OFPC_FRAG_NORMAL, OFPCR_ROLE_MASTER, OFPFC_ADD, OFPGC_ADD, OFPGT_SELECT,
    OFPMC_ADD, OFPPR_MODIFY, OFPR_ACTION, OFPRR_HARD_TIMEOUT,
};
use crate::instructions::{Instruction, InstructionList};
use crate::msg::*;
use crate::oxm::OxmMatch;

fn ip_tcp_match() -> OxmMatch {
    let mut m = OxmMatch::new();
    m.append_in_port(1);
    m.append_eth_type(0x0800);
    m.append_ip_proto(6);
    m.append_tcp_dst(80);
    m
}

fn assert_header(buf: &Buffer, xid: u32) {
    assert_eq!(buf.u8_at(0), 0x04);
    assert_eq!(buf.u16_at(2) as usize, buf.len());
    assert_eq!(buf.u32_at(4), xid);
}

#[test]
fn validate_header_check_order() {
    // short buffer
    assert_eq!(
        validate_header(&[4, 0, 0], OFPT_HELLO, 8, 8),
        Err(ErrorKind::TooShortMessage)
    );
    // wrong version
    let msg = [1u8, 0, 0, 8, 0, 0, 0, 0];
    assert_eq!(
        validate_header(&msg, OFPT_HELLO, 8, 8),
        Err(ErrorKind::UnsupportedVersion)
    );
    // undefined type wins over mismatched type
    let msg = [4u8, 99, 0, 8, 0, 0, 0, 0];
    assert_eq!(
        validate_header(&msg, OFPT_HELLO, 8, 8),
        Err(ErrorKind::UndefinedType)
    );
    // defined but unexpected type
    let msg = [4u8, OFPT_ERROR, 0, 12, 0, 0, 0, 0, 0, 0, 0, 0];
    assert_eq!(
        validate_header(&msg, OFPT_HELLO, 8, 128),
        Err(ErrorKind::InvalidType)
    );
    // declared length disagrees with the byte count
    let msg = [4u8, OFPT_HELLO, 0, 12, 0, 0, 0, 0];
    assert_eq!(
        validate_header(&msg, OFPT_HELLO, 8, 128),
        Err(ErrorKind::TooShortMessage)
    );
    let msg = [4u8, OFPT_HELLO, 0, 8, 0, 0, 0, 0, 1, 2];
    assert_eq!(
        validate_header(&msg, OFPT_HELLO, 8, 128),
        Err(ErrorKind::TooLongMessage)
    );
}

#[test]
fn hello_with_of13_bitmap_round_trips() {
    let element = create_hello_elem_versionbitmap(&[0x04]);
    let hello = create_hello(1, Some(&element));
    assert_header(&hello, 1);
    assert_eq!(validate_hello(hello.as_slice()), Ok(()));
}

#[test]
fn hello_with_foreign_bitmap_is_incompatible() {
    let element = create_hello_elem_versionbitmap(&[0x01]);
    let hello = create_hello(1, Some(&element));
    assert_eq!(
        validate_hello(hello.as_slice()),
        Err(ErrorKind::UnsupportedVersion)
    );
}

#[test]
fn bare_hello_is_accepted() {
    let hello = create_hello(1, None);
    assert_eq!(validate_hello(hello.as_slice()), Ok(()));
}

#[test]
fn echo_round_trip() {
    let request = create_echo_request(2, Some(b"abc"));
    assert_eq!(validate_echo_request(request.as_slice()), Ok(()));
    let reply = create_echo_reply(2, Some(b"abc"));
    assert_eq!(validate_echo_reply(reply.as_slice()), Ok(()));
}

#[test]
fn set_config_scenario_s1() {
    let buf = create_set_config(3, OFPC_FRAG_NORMAL, 128);
    assert_eq!(buf.len(), 12);
    assert_header(&buf, 3);
    assert_eq!(validate_set_config(buf.as_slice()), Ok(()));
}

#[test]
fn switch_config_with_bad_flags_is_rejected() {
    let mut raw = create_set_config(3, 0, 128).into_vec();
    raw[8] = 0;
    raw[9] = 0x7; // above OFPC_FRAG_MASK
    assert_eq!(
        validate_set_config(&raw),
        Err(ErrorKind::InvalidSwitchConfig)
    );
}

#[test]
fn features_reply_round_trip() {
    let buf = create_features_reply(4, 0x00e0_4c00_1122_3344, 256, 254, 0, 0x47);
    assert_header(&buf, 4);
    assert_eq!(validate_features_reply(buf.as_slice()), Ok(()));
}

#[test]
fn features_reply_without_tables_is_rejected() {
    let buf = create_features_reply(4, 1, 256, 0, 0, 0);
    assert_eq!(
        validate_features_reply(buf.as_slice()),
        Err(ErrorKind::NoTableAvailable)
    );
}

#[test]
fn packet_in_round_trip() {
    let frame = [0xabu8; 64];
    let buf = create_packet_in(5, OFP_NO_BUFFER, 64, OFPR_ACTION, 2, 0x99, &ip_tcp_match(), Some(&frame));
    assert_header(&buf, 5);
    assert_eq!(validate_packet_in(buf.as_slice()), Ok(()));
}

#[test]
fn packet_in_with_bad_reason_is_rejected() {
    let mut raw =
        create_packet_in(5, OFP_NO_BUFFER, 0, OFPR_ACTION, 0, 0, &OxmMatch::new(), None)
            .into_vec();
    raw[14] = 9;
    assert_eq!(validate_packet_in(&raw), Err(ErrorKind::InvalidPacketInReason));
}

#[test]
fn flow_removed_round_trip() {
    let buf = create_flow_removed(
        6, 0x1, 10, OFPRR_HARD_TIMEOUT, 1, 100, 0, 30, 60, 5, 500, &ip_tcp_match(),
    );
    assert_header(&buf, 6);
    assert_eq!(validate_flow_removed(buf.as_slice()), Ok(()));
}

#[test]
fn packet_out_scenario_s3() {
    let actions: ActionList =
        [Action::Output { port: 2, max_len: 128 }].into_iter().collect();
    let frame = [0u8; 64];
    let buf = create_packet_out(7, OFP_NO_BUFFER, 1, &actions, Some(&frame)).unwrap();
    assert_eq!(buf.len(), 24 + 16 + 64);
    assert_header(&buf, 7);
    assert_eq!(validate_packet_out(buf.as_slice()), Ok(()));
}

#[test]
fn flow_mod_round_trip() {
    let actions: ActionList =
        [Action::Output { port: 3, max_len: 0xffff }].into_iter().collect();
    let instructions: InstructionList = [
        Instruction::GotoTable { table_id: 1 },
        Instruction::ApplyActions { actions },
    ]
    .into_iter()
    .collect();
    let buf = create_flow_mod(
        8,
        0,
        0,
        0,
        OFPFC_ADD,
        30,
        300,
        1000,
        OFP_NO_BUFFER,
        crate::consts::port_no::OFPP_ANY,
        crate::consts::group_no::OFPG_ANY,
        crate::consts::FlowModFlags::SEND_FLOW_REM.bits(),
        &ip_tcp_match(),
        &instructions,
    )
    .unwrap();
    assert_header(&buf, 8);
    assert_eq!(validate_flow_mod(buf.as_slice()), Ok(()));
}

#[test]
fn flow_mod_scenario_s4_bad_command() {
    let buf = create_flow_mod(
        8,
        0,
        0,
        0,
        0xff,
        0,
        0,
        0,
        OFP_NO_BUFFER,
        crate::consts::port_no::OFPP_ANY,
        crate::consts::group_no::OFPG_ANY,
        0,
        &OxmMatch::new(),
        &InstructionList::new(),
    )
    .unwrap();
    let kind = validate_flow_mod(buf.as_slice()).unwrap_err();
    assert_eq!(kind, ErrorKind::UndefinedFlowModCommand);
    assert_eq!(
        crate::error::error_type_and_code(OFPT_FLOW_MOD, kind),
        Some((
            crate::consts::error_type::OFPET_FLOW_MOD_FAILED,
            crate::consts::error_code::OFPFMFC_BAD_COMMAND
        ))
    );
}

#[test]
fn flow_mod_with_unknown_flag_is_rejected() {
    let buf = create_flow_mod(
        8,
        0,
        0,
        0,
        OFPFC_ADD,
        0,
        0,
        0,
        OFP_NO_BUFFER,
        crate::consts::port_no::OFPP_ANY,
        crate::consts::group_no::OFPG_ANY,
        0x100,
        &OxmMatch::new(),
        &InstructionList::new(),
    )
    .unwrap();
    assert_eq!(
        validate_flow_mod(buf.as_slice()),
        Err(ErrorKind::InvalidFlowModFlags)
    );
}

#[test]
fn group_mod_round_trip() {
    let actions: ActionList =
        [Action::Output { port: 1, max_len: 0 }].into_iter().collect();
    let buckets: BucketList =
        [Bucket::new(10, 0xffff_ffff, 0xffff_ffff, actions)].into_iter().collect();
    let buf = create_group_mod(9, OFPGC_ADD, OFPGT_SELECT, 3, &buckets).unwrap();
    assert_header(&buf, 9);
    assert_eq!(validate_group_mod(buf.as_slice()), Ok(()));
}

#[test]
fn group_mod_with_bad_type_is_rejected() {
    let buf = create_group_mod(9, OFPGC_ADD, 9, 3, &BucketList::new()).unwrap();
    assert_eq!(
        validate_group_mod(buf.as_slice()),
        Err(ErrorKind::InvalidGroupType)
    );
}

#[test]
fn port_mod_round_trip() {
    let buf = create_port_mod(
        10,
        1,
        [0, 1, 2, 3, 4, 5],
        crate::consts::PortConfig::PORT_DOWN.bits(),
        crate::consts::PortConfig::PORT_DOWN.bits(),
        0,
    );
    assert_eq!(validate_port_mod(buf.as_slice()), Ok(()));
}

#[test]
fn table_mod_round_trip() {
    let buf = create_table_mod(11, 0xff, 0);
    assert_eq!(validate_table_mod(buf.as_slice()), Ok(()));
}

#[test]
fn meter_mod_round_trip() {
    let bands = vec![MeterBand::Drop { rate: 100, burst_size: 10 }];
    let buf = create_meter_mod(12, OFPMC_ADD, crate::consts::MeterFlags::KBPS.bits(), 1, &bands);
    assert_eq!(validate_meter_mod(buf.as_slice()), Ok(()));
}

#[test]
fn meter_mod_with_bad_band_is_rejected() {
    let bands = vec![MeterBand::Drop { rate: 100, burst_size: 10 }];
    let mut raw =
        create_meter_mod(12, OFPMC_ADD, 0, 1, &bands).into_vec();
    raw[16] = 0;
    raw[17] = 9; // undefined band type
    assert_eq!(validate_meter_mod(&raw), Err(ErrorKind::InvalidMeterBandType));
}

#[test]
fn multipart_request_round_trips() {
    let flow = create_flow_multipart_request(
        13,
        0,
        0xff,
        crate::consts::port_no::OFPP_ANY,
        crate::consts::group_no::OFPG_ANY,
        0,
        0,
        &ip_tcp_match(),
    );
    assert_eq!(validate_multipart_request(flow.as_slice()), Ok(()));

    for buf in [
        create_desc_multipart_request(13, 0),
        create_table_multipart_request(13, 0),
        create_port_multipart_request(13, 0, crate::consts::port_no::OFPP_ANY),
        create_queue_multipart_request(13, 0, 1, crate::consts::OFPQ_ALL),
        create_group_multipart_request(13, 0, 1),
        create_group_desc_multipart_request(13, 0),
        create_group_features_multipart_request(13, 0),
        create_meter_multipart_request(13, 0, 1),
        create_meter_config_multipart_request(13, 0, 1),
        create_meter_features_multipart_request(13, 0),
        create_port_desc_multipart_request(13, 0),
    ] {
        assert_eq!(validate_multipart_request(buf.as_slice()), Ok(()), "{buf:?}");
    }
}

#[test]
fn desc_request_rejects_nonzero_flags() {
    let buf = create_desc_multipart_request(13, 1);
    assert_eq!(
        validate_multipart_request(buf.as_slice()),
        Err(ErrorKind::InvalidStatsRequestFlags)
    );
}

#[test]
fn flow_multipart_reply_round_trips() {
    let entry = FlowStatsEntry {
        table_id: 0,
        duration_sec: 10,
        duration_nsec: 0,
        priority: 1,
        idle_timeout: 0,
        hard_timeout: 0,
        flags: 0,
        cookie: 0,
        packet_count: 3,
        byte_count: 180,
        oxm_match: ip_tcp_match(),
        instructions: [Instruction::ClearActions].into_iter().collect(),
    };
    let mut cursor = MultipartCursor::new();
    let buf = create_flow_multipart_reply(14, 0, &[entry], &mut cursor);
    assert_eq!(validate_multipart_reply(buf.as_slice()), Ok(()));
}

#[test]
fn other_multipart_replies_round_trip() {
    let mut cursor = MultipartCursor::new();
    let table = create_table_multipart_reply(
        15,
        0,
        &[TableStatsEntry { table_id: 0, active_count: 1, lookup_count: 2, matched_count: 1 }],
        &mut cursor,
    );
    assert_eq!(validate_multipart_reply(table.as_slice()), Ok(()));

    let mut cursor = MultipartCursor::new();
    let port = create_port_multipart_reply(
        15,
        0,
        &[PortStatsEntry { port_no: 1, ..PortStatsEntry::default() }],
        &mut cursor,
    );
    assert_eq!(validate_multipart_reply(port.as_slice()), Ok(()));

    let aggregate = create_aggregate_multipart_reply(15, 0, 1, 2, 3);
    assert_eq!(validate_multipart_reply(aggregate.as_slice()), Ok(()));

    let features = create_group_features_multipart_reply(
        15,
        0,
        crate::consts::GROUP_TYPE_BITS,
        0,
        [16, 16, 16, 16],
        [0, 0, 0, 0],
    );
    assert_eq!(validate_multipart_reply(features.as_slice()), Ok(()));

    let desc = create_desc_multipart_reply(15, 0, "softflow", "soft", "0.0.1", "0", "dp");
    assert_eq!(validate_multipart_reply(desc.as_slice()), Ok(()));
}

#[test]
fn barrier_round_trip() {
    assert_eq!(validate_barrier_request(create_barrier_request(16).as_slice()), Ok(()));
    assert_eq!(validate_barrier_reply(create_barrier_reply(16).as_slice()), Ok(()));
}

#[test]
fn role_round_trip() {
    let buf = create_role_request(17, OFPCR_ROLE_MASTER, 7);
    assert_eq!(validate_role_request(buf.as_slice()), Ok(()));
    let mut raw = buf.into_vec();
    raw[11] = 9;
    assert_eq!(validate_role_request(&raw), Err(ErrorKind::InvalidControllerRole));
}

#[test]
fn async_config_round_trip() {
    let buf = create_set_async(
        18,
        [crate::consts::PACKET_IN_MASK_BITS, 0],
        [crate::consts::PORT_STATUS_MASK_BITS, 0],
        [crate::consts::FLOW_REMOVED_MASK_BITS, 0],
    );
    assert_eq!(validate_set_async(buf.as_slice()), Ok(()));

    let mut raw = buf.into_vec();
    raw[16] = 0xff; // port status mask high bits
    assert_eq!(validate_set_async(&raw), Err(ErrorKind::InvalidPortStatusMask));
}

#[test]
fn queue_get_config_round_trip() {
    let request = create_queue_get_config_request(19, 1);
    assert_eq!(validate_queue_get_config_request(request.as_slice()), Ok(()));

    let queues = vec![PacketQueue {
        queue_id: 1,
        port: 1,
        properties: vec![QueueProperty::MinRate { rate: 10 }, QueueProperty::MaxRate { rate: 500 }],
    }];
    let reply = create_queue_get_config_reply(19, 1, &queues);
    assert_eq!(validate_queue_get_config_reply(reply.as_slice()), Ok(()));
}

#[test]
fn port_status_round_trip() {
    let desc = PortDesc {
        port_no: 4,
        state: crate::consts::PortState::LIVE.bits(),
        ..PortDesc::default()
    };
    let buf = create_port_status(20, OFPPR_MODIFY, &desc);
    assert_eq!(validate_port_status(buf.as_slice()), Ok(()));
}

#[test]
fn dispatcher_rejects_unknown_types() {
    let raw = [4u8, 77, 0, 8, 0, 0, 0, 0];
    assert_eq!(
        validate_openflow_message(&raw),
        Err(ErrorKind::UndefinedType)
    );
}

#[test]
fn dispatcher_accepts_every_builder_output() {
    let bufs = vec![
        create_hello(1, None),
        create_echo_request(1, None),
        create_features_request(1),
        create_get_config_request(1),
        create_set_config(1, 0, 128),
        create_barrier_request(1),
        create_get_async_request(1),
        create_role_request(1, OFPCR_ROLE_MASTER, 0),
        create_desc_multipart_request(1, 0),
    ];
    for buf in bufs {
        assert_eq!(validate_openflow_message(buf.as_slice()), Ok(()), "{buf:?}");
    }
}
