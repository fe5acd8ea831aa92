// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! Inbound message validators.
//!
//! Every message first passes [`validate_header`]; a kind-specific
//! validator then enforces enum ranges, flag masks and the embedded
//! match / action / instruction regions. Validators never mutate and
//! return the dense [`ErrorKind`] that the error map resolves.

use tracing::debug;

use crate::actions::{validate_actions, validate_port_no};
use crate::buckets::BUCKET_HEADER_LEN;
use crate::consts::msg_type::*;
use crate::consts::multipart_type::*;
use crate::consts::{
    CONTROLLER_ROLE_MAX, FLOW_REMOVED_MASK_BITS, FLOW_REMOVED_REASON_MAX, FlowModFlags,
    GROUP_COMMAND_MAX, GROUP_TYPE_BITS, GROUP_TYPE_MAX, METER_BAND_MAX, MeterFlags,
    OFPC_FRAG_MASK, OFPFC_DELETE, OFPFC_DELETE_STRICT, OFPHET_VERSIONBITMAP, OFPMBT_EXPERIMENTER,
    OFPMPF_REQ_MORE, OFPMPF_REPLY_MORE, OFPQT_EXPERIMENTER, OFPQT_MAX_RATE, OFPQT_MIN_RATE,
    PACKET_IN_MASK_BITS, PACKET_IN_REASON_MAX, PORT_STATUS_MASK_BITS, PORT_STATUS_REASON_MAX,
    PortConfig, PortFeatures, PortState, METER_COMMAND_MAX,
};
use crate::consts::port_no::{OFPP_ANY, OFPP_LOCAL, OFPP_MAX};
use crate::error::ErrorKind;
use crate::instructions::validate_instructions;
use crate::oxm::validate::validate_oxms;
use crate::{OFP_HEADER_LEN, OFP_VERSION, pad_to_64};

/// Fixed sizes the validators compare against.
const SWITCH_CONFIG_LEN: usize = 12;
const SWITCH_FEATURES_LEN: usize = 32;
const PACKET_IN_MIN_LEN: usize = 32;
const FLOW_REMOVED_MIN_LEN: usize = 56;
const PORT_STATUS_LEN: usize = 80;
const PACKET_OUT_MIN_LEN: usize = 24;
const FLOW_MOD_MIN_LEN: usize = 56;
const GROUP_MOD_MIN_LEN: usize = 16;
const PORT_MOD_LEN: usize = 40;
const TABLE_MOD_LEN: usize = 16;
const METER_MOD_MIN_LEN: usize = 16;
const METER_BAND_HEADER_LEN: usize = 12;
const MULTIPART_HEADER_LEN: usize = 16;
const ROLE_LEN: usize = 24;
const ASYNC_CONFIG_LEN: usize = 32;
const QUEUE_GET_CONFIG_REQUEST_LEN: usize = 16;
const QUEUE_GET_CONFIG_REPLY_MIN_LEN: usize = 16;
const PACKET_QUEUE_HEADER_LEN: usize = 16;
const QUEUE_PROP_HEADER_LEN: usize = 8;
const QUEUE_PROP_RATE_LEN: usize = 16;
const PORT_LEN: usize = 64;
const ERROR_MSG_MIN_LEN: usize = 12;
const EXPERIMENTER_MIN_LEN: usize = 16;
const FLOW_STATS_REQUEST_LEN: usize = 40;
const PORT_STATS_REQUEST_LEN: usize = 8;
const QUEUE_STATS_REQUEST_LEN: usize = 8;
const GROUP_STATS_REQUEST_LEN: usize = 8;
const METER_STATS_REQUEST_LEN: usize = 8;
const EXPERIMENTER_MP_HEADER_LEN: usize = 8;
const FLOW_STATS_FIXED_LEN: usize = 48;
const TABLE_STATS_LEN: usize = 24;
const PORT_STATS_LEN: usize = 112;
const QUEUE_STATS_LEN: usize = 40;
const GROUP_STATS_HEADER_LEN: usize = 40;
const GROUP_DESC_HEADER_LEN: usize = 8;
const GROUP_FEATURES_LEN: usize = 40;
const METER_STATS_HEADER_LEN: usize = 40;
const METER_CONFIG_HEADER_LEN: usize = 8;
const AGGREGATE_STATS_REPLY_LEN: usize = 24;
const DESC_LEN: usize = 1056;

fn u8_at(msg: &[u8], offset: usize) -> u8 {
    msg[offset]
}

fn u16_at(msg: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([msg[offset], msg[offset + 1]])
}

fn u32_at(msg: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([msg[offset], msg[offset + 1], msg[offset + 2], msg[offset + 3]])
}

/// Header-level checks shared by every validator, in the original order.
pub fn validate_header(
    msg: &[u8],
    expected_type: u8,
    min_length: usize,
    max_length: usize,
) -> Result<(), ErrorKind> {
    if msg.len() < OFP_HEADER_LEN {
        return Err(ErrorKind::TooShortMessage);
    }
    if u8_at(msg, 0) != OFP_VERSION {
        return Err(ErrorKind::UnsupportedVersion);
    }
    let msg_type = u8_at(msg, 1);
    if msg_type > OFPT_MAX {
        return Err(ErrorKind::UndefinedType);
    }
    if msg_type != expected_type {
        return Err(ErrorKind::InvalidType);
    }
    let declared = u16_at(msg, 2) as usize;
    if declared > max_length {
        return Err(ErrorKind::TooLongMessage);
    }
    if declared < min_length {
        return Err(ErrorKind::TooShortMessage);
    }
    if declared < msg.len() {
        return Err(ErrorKind::TooLongMessage);
    }
    if declared > msg.len() {
        return Err(ErrorKind::TooShortMessage);
    }
    if msg.len() > max_length {
        return Err(ErrorKind::TooLongMessage);
    }
    Ok(())
}

/// Validate an embedded `ofp_match` at `offset`; returns the padded
/// region length.
fn validate_match_at(msg: &[u8], offset: usize) -> Result<usize, ErrorKind> {
    if msg.len() < offset + 4 {
        return Err(ErrorKind::InvalidLength);
    }
    let declared = u16_at(msg, offset + 2) as usize;
    if declared < 4 {
        return Err(ErrorKind::InvalidLength);
    }
    let padded = declared + pad_to_64(declared);
    if msg.len() < offset + padded {
        return Err(ErrorKind::InvalidLength);
    }
    validate_oxms(&msg[offset + 4..offset + declared])?;
    Ok(padded)
}

fn validate_hello_elem_versionbitmap(element: &[u8]) -> Result<(), ErrorKind> {
    let declared = u16_at(element, 2) as usize;
    if declared < 4 {
        return Err(ErrorKind::TooShortHelloElement);
    }
    let bitmaps_length = declared - 4;
    if bitmaps_length % 4 != 0 {
        return Err(ErrorKind::InvalidHelloElementLength);
    }
    if bitmaps_length > 0 {
        // Version negotiation is not implemented; the peer must offer 1.3.
        let bitmap = u32_at(element, 4);
        if bitmap & (1 << u32::from(OFP_VERSION)) == 0 {
            return Err(ErrorKind::UnsupportedVersion);
        }
    }
    Ok(())
}

pub fn validate_hello(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(msg, OFPT_HELLO, OFP_HEADER_LEN, u16::MAX as usize)?;

    let elements = &msg[OFP_HEADER_LEN..];
    if !elements.is_empty() && elements.len() < 4 {
        return Err(ErrorKind::InvalidLength);
    }

    let mut version_bitmap_found = false;
    let mut offset = 0usize;
    while offset < elements.len() {
        if elements.len() < offset + 4 {
            return Err(ErrorKind::TooShortHelloElement);
        }
        let element = &elements[offset..];
        let elem_type = u16_at(element, 0);
        let elem_len = u16_at(element, 2) as usize;
        if elem_len < 4 || element.len() < elem_len {
            return Err(ErrorKind::TooShortHelloElement);
        }
        match elem_type {
            OFPHET_VERSIONBITMAP => {
                validate_hello_elem_versionbitmap(element)?;
                version_bitmap_found = true;
            }
            _ => return Err(ErrorKind::UndefinedHelloElementType),
        }
        offset += elem_len + pad_to_64(elem_len);
    }

    if !version_bitmap_found && u8_at(msg, 0) != OFP_VERSION {
        return Err(ErrorKind::UnsupportedVersion);
    }
    Ok(())
}

pub fn validate_error(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(msg, OFPT_ERROR, ERROR_MSG_MIN_LEN, u16::MAX as usize)
}

pub fn validate_echo_request(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(msg, OFPT_ECHO_REQUEST, OFP_HEADER_LEN, u16::MAX as usize)
}

pub fn validate_echo_reply(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(msg, OFPT_ECHO_REPLY, OFP_HEADER_LEN, u16::MAX as usize)
}

pub fn validate_experimenter(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(msg, OFPT_EXPERIMENTER, EXPERIMENTER_MIN_LEN, u16::MAX as usize)
}

pub fn validate_features_request(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(msg, OFPT_FEATURES_REQUEST, OFP_HEADER_LEN, OFP_HEADER_LEN)
}

fn validate_port_at(msg: &[u8], offset: usize) -> Result<(), ErrorKind> {
    validate_port_no(u32_at(msg, offset))?;
    if u32_at(msg, offset + 32) & !PortConfig::all().bits() != 0 {
        return Err(ErrorKind::InvalidPortConfig);
    }
    if u32_at(msg, offset + 36) & !PortState::all().bits() != 0 {
        return Err(ErrorKind::InvalidPortState);
    }
    for field in [40, 44, 48, 52] {
        if u32_at(msg, offset + field) & !PortFeatures::all().bits() != 0 {
            return Err(ErrorKind::InvalidPortFeatures);
        }
    }
    Ok(())
}

pub fn validate_features_reply(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(msg, OFPT_FEATURES_REPLY, SWITCH_FEATURES_LEN, u16::MAX as usize)?;
    if u8_at(msg, 20) == 0 {
        return Err(ErrorKind::NoTableAvailable);
    }
    Ok(())
}

pub fn validate_get_config_request(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(msg, OFPT_GET_CONFIG_REQUEST, OFP_HEADER_LEN, OFP_HEADER_LEN)
}

fn validate_switch_config(msg: &[u8], expected_type: u8) -> Result<(), ErrorKind> {
    validate_header(msg, expected_type, SWITCH_CONFIG_LEN, SWITCH_CONFIG_LEN)?;
    if u16_at(msg, 8) > OFPC_FRAG_MASK {
        return Err(ErrorKind::InvalidSwitchConfig);
    }
    Ok(())
}

pub fn validate_get_config_reply(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_switch_config(msg, OFPT_GET_CONFIG_REPLY)
}

pub fn validate_set_config(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_switch_config(msg, OFPT_SET_CONFIG)
}

pub fn validate_packet_in(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(msg, OFPT_PACKET_IN, PACKET_IN_MIN_LEN, u16::MAX as usize)?;
    if u8_at(msg, 14) > PACKET_IN_REASON_MAX {
        return Err(ErrorKind::InvalidPacketInReason);
    }
    validate_match_at(msg, 24)?;
    Ok(())
}

pub fn validate_flow_removed(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(msg, OFPT_FLOW_REMOVED, FLOW_REMOVED_MIN_LEN, u16::MAX as usize)?;
    if u8_at(msg, 18) > FLOW_REMOVED_REASON_MAX {
        return Err(ErrorKind::InvalidFlowRemovedReason);
    }
    validate_match_at(msg, 48)?;
    Ok(())
}

pub fn validate_port_status(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(msg, OFPT_PORT_STATUS, PORT_STATUS_LEN, PORT_STATUS_LEN)?;
    if u8_at(msg, 8) > PORT_STATUS_REASON_MAX {
        return Err(ErrorKind::InvalidPortStatusReason);
    }
    validate_port_at(msg, 16)
}

pub fn validate_packet_out(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(msg, OFPT_PACKET_OUT, PACKET_OUT_MIN_LEN, u16::MAX as usize)?;
    validate_port_no(u32_at(msg, 12))?;
    let actions_len = u16_at(msg, 16) as usize;
    if msg.len() < PACKET_OUT_MIN_LEN + actions_len {
        return Err(ErrorKind::InvalidLength);
    }
    if actions_len > 0 {
        validate_actions(&msg[PACKET_OUT_MIN_LEN..PACKET_OUT_MIN_LEN + actions_len])?;
    }
    Ok(())
}

pub fn validate_flow_mod(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(msg, OFPT_FLOW_MOD, FLOW_MOD_MIN_LEN, u16::MAX as usize)?;

    let command = u8_at(msg, 25);
    if command > OFPFC_DELETE_STRICT {
        return Err(ErrorKind::UndefinedFlowModCommand);
    }
    if command == OFPFC_DELETE || command == OFPFC_DELETE_STRICT {
        let out_port = u32_at(msg, 36);
        if out_port != OFPP_ANY {
            validate_port_no(out_port)?;
        }
    }
    if u16_at(msg, 44) & !FlowModFlags::all().bits() != 0 {
        return Err(ErrorKind::InvalidFlowModFlags);
    }

    let match_len = validate_match_at(msg, 48)?;
    let instructions_offset = 48 + match_len;
    if msg.len() > instructions_offset {
        validate_instructions(&msg[instructions_offset..])?;
    }
    Ok(())
}

fn validate_bucket_region(mut region: &[u8]) -> Result<(), ErrorKind> {
    while region.len() >= BUCKET_HEADER_LEN {
        let len = u16::from_be_bytes([region[0], region[1]]) as usize;
        if len < BUCKET_HEADER_LEN || region.len() < len {
            return Err(ErrorKind::InvalidLength);
        }
        validate_actions(&region[BUCKET_HEADER_LEN..len])?;
        region = &region[len..];
    }
    if region.is_empty() {
        Ok(())
    } else {
        Err(ErrorKind::InvalidLength)
    }
}

pub fn validate_group_mod(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(msg, OFPT_GROUP_MOD, GROUP_MOD_MIN_LEN, u16::MAX as usize)?;
    if u16_at(msg, 8) > GROUP_COMMAND_MAX {
        return Err(ErrorKind::InvalidGroupCommand);
    }
    if u8_at(msg, 10) > GROUP_TYPE_MAX {
        return Err(ErrorKind::InvalidGroupType);
    }
    validate_bucket_region(&msg[GROUP_MOD_MIN_LEN..])
}

pub fn validate_port_mod(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(msg, OFPT_PORT_MOD, PORT_MOD_LEN, PORT_MOD_LEN)?;
    let port_no = u32_at(msg, 8);
    validate_port_no(port_no)?;
    if port_no > OFPP_MAX && port_no != OFPP_LOCAL {
        return Err(ErrorKind::InvalidPortNo);
    }
    if u32_at(msg, 24) & !PortConfig::all().bits() != 0 {
        return Err(ErrorKind::InvalidPortConfig);
    }
    if u32_at(msg, 28) & !PortConfig::all().bits() != 0 {
        return Err(ErrorKind::InvalidPortMask);
    }
    if u32_at(msg, 32) & !PortFeatures::all().bits() != 0 {
        return Err(ErrorKind::InvalidPortFeatures);
    }
    Ok(())
}

pub fn validate_table_mod(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(msg, OFPT_TABLE_MOD, TABLE_MOD_LEN, TABLE_MOD_LEN)
}

fn multipart_type_of(msg: &[u8]) -> u16 {
    u16_at(msg, 8)
}

fn multipart_flags_of(msg: &[u8]) -> u16 {
    u16_at(msg, 10)
}

fn validate_fixed_multipart_request(msg: &[u8], mp_type: u16, body: usize) -> Result<(), ErrorKind> {
    validate_header(
        msg,
        OFPT_MULTIPART_REQUEST,
        MULTIPART_HEADER_LEN + body,
        MULTIPART_HEADER_LEN + body,
    )?;
    if multipart_type_of(msg) != mp_type {
        return Err(ErrorKind::InvalidStatsType);
    }
    if multipart_flags_of(msg) != 0 {
        return Err(ErrorKind::InvalidStatsRequestFlags);
    }
    Ok(())
}

fn validate_flow_shaped_request(msg: &[u8], mp_type: u16) -> Result<(), ErrorKind> {
    validate_header(
        msg,
        OFPT_MULTIPART_REQUEST,
        MULTIPART_HEADER_LEN + FLOW_STATS_REQUEST_LEN,
        u16::MAX as usize,
    )?;
    if multipart_type_of(msg) != mp_type {
        return Err(ErrorKind::InvalidStatsType);
    }
    if multipart_flags_of(msg) & !OFPMPF_REQ_MORE != 0 {
        return Err(ErrorKind::InvalidStatsRequestFlags);
    }
    validate_port_no(u32_at(msg, 20))?;
    validate_match_at(msg, MULTIPART_HEADER_LEN + 32)?;
    Ok(())
}

pub fn validate_flow_multipart_request(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_flow_shaped_request(msg, OFPMP_FLOW)
}

pub fn validate_aggregate_multipart_request(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_flow_shaped_request(msg, OFPMP_AGGREGATE)
}

pub fn validate_desc_multipart_request(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_fixed_multipart_request(msg, OFPMP_DESC, 0)
}

pub fn validate_table_multipart_request(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_fixed_multipart_request(msg, OFPMP_TABLE, 0)
}

pub fn validate_port_multipart_request(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_fixed_multipart_request(msg, OFPMP_PORT_STATS, PORT_STATS_REQUEST_LEN)?;
    let port_no = u32_at(msg, 16);
    validate_port_no(port_no)?;
    if port_no > OFPP_MAX && port_no != OFPP_ANY && port_no != OFPP_LOCAL {
        return Err(ErrorKind::InvalidPortNo);
    }
    Ok(())
}

pub fn validate_queue_multipart_request(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_fixed_multipart_request(msg, OFPMP_QUEUE, QUEUE_STATS_REQUEST_LEN)?;
    validate_port_no(u32_at(msg, 16))
}

pub fn validate_group_multipart_request(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_fixed_multipart_request(msg, OFPMP_GROUP, GROUP_STATS_REQUEST_LEN)
}

pub fn validate_group_desc_multipart_request(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_fixed_multipart_request(msg, OFPMP_GROUP_DESC, 0)
}

pub fn validate_group_features_multipart_request(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_fixed_multipart_request(msg, OFPMP_GROUP_FEATURES, 0)
}

pub fn validate_meter_multipart_request(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_fixed_multipart_request(msg, OFPMP_METER, METER_STATS_REQUEST_LEN)
}

pub fn validate_meter_config_multipart_request(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_fixed_multipart_request(msg, OFPMP_METER_CONFIG, METER_STATS_REQUEST_LEN)
}

pub fn validate_meter_features_multipart_request(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_fixed_multipart_request(msg, OFPMP_METER_FEATURES, 0)
}

pub fn validate_table_features_multipart_request(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(msg, OFPT_MULTIPART_REQUEST, MULTIPART_HEADER_LEN, u16::MAX as usize)?;
    if multipart_type_of(msg) != OFPMP_TABLE_FEATURES {
        return Err(ErrorKind::InvalidStatsType);
    }
    if multipart_flags_of(msg) & !OFPMPF_REQ_MORE != 0 {
        return Err(ErrorKind::InvalidStatsReplyFlags);
    }
    let mut region = &msg[MULTIPART_HEADER_LEN..];
    while !region.is_empty() {
        if region.len() < 2 {
            return Err(ErrorKind::InvalidLength);
        }
        let len = u16::from_be_bytes([region[0], region[1]]) as usize;
        if len < 2 || region.len() < len {
            return Err(ErrorKind::InvalidLength);
        }
        region = &region[len..];
    }
    Ok(())
}

pub fn validate_port_desc_multipart_request(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_fixed_multipart_request(msg, OFPMP_PORT_DESC, 0)
}

pub fn validate_experimenter_multipart_request(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(
        msg,
        OFPT_MULTIPART_REQUEST,
        MULTIPART_HEADER_LEN + EXPERIMENTER_MP_HEADER_LEN,
        u16::MAX as usize,
    )?;
    if multipart_type_of(msg) != OFPMP_EXPERIMENTER {
        return Err(ErrorKind::InvalidStatsType);
    }
    if multipart_flags_of(msg) & !OFPMPF_REQ_MORE != 0 {
        return Err(ErrorKind::InvalidStatsRequestFlags);
    }
    Ok(())
}

pub fn validate_multipart_request(msg: &[u8]) -> Result<(), ErrorKind> {
    if msg.len() < MULTIPART_HEADER_LEN {
        return Err(ErrorKind::TooShortMessage);
    }
    match multipart_type_of(msg) {
        OFPMP_DESC => validate_desc_multipart_request(msg),
        OFPMP_FLOW => validate_flow_multipart_request(msg),
        OFPMP_AGGREGATE => validate_aggregate_multipart_request(msg),
        OFPMP_TABLE => validate_table_multipart_request(msg),
        OFPMP_PORT_STATS => validate_port_multipart_request(msg),
        OFPMP_QUEUE => validate_queue_multipart_request(msg),
        OFPMP_GROUP => validate_group_multipart_request(msg),
        OFPMP_GROUP_DESC => validate_group_desc_multipart_request(msg),
        OFPMP_GROUP_FEATURES => validate_group_features_multipart_request(msg),
        OFPMP_METER => validate_meter_multipart_request(msg),
        OFPMP_METER_CONFIG => validate_meter_config_multipart_request(msg),
        OFPMP_METER_FEATURES => validate_meter_features_multipart_request(msg),
        OFPMP_TABLE_FEATURES => validate_table_features_multipart_request(msg),
        OFPMP_PORT_DESC => validate_port_desc_multipart_request(msg),
        OFPMP_EXPERIMENTER => validate_experimenter_multipart_request(msg),
        _ => Err(ErrorKind::UnsupportedStatsType),
    }
}

fn reply_flags_ok(msg: &[u8]) -> Result<(), ErrorKind> {
    if multipart_flags_of(msg) & !OFPMPF_REPLY_MORE != 0 {
        return Err(ErrorKind::InvalidStatsReplyFlags);
    }
    Ok(())
}

pub fn validate_desc_multipart_reply(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(
        msg,
        OFPT_MULTIPART_REPLY,
        MULTIPART_HEADER_LEN + DESC_LEN,
        MULTIPART_HEADER_LEN + DESC_LEN,
    )?;
    if multipart_flags_of(msg) != 0 {
        return Err(ErrorKind::InvalidStatsReplyFlags);
    }
    Ok(())
}

pub fn validate_flow_multipart_reply(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(msg, OFPT_MULTIPART_REPLY, MULTIPART_HEADER_LEN, u16::MAX as usize)?;
    reply_flags_ok(msg)?;

    let mut offset = MULTIPART_HEADER_LEN;
    while offset < msg.len() {
        if msg.len() < offset + FLOW_STATS_FIXED_LEN {
            return Err(ErrorKind::InvalidLength);
        }
        let record_len = u16_at(msg, offset) as usize;
        if record_len < FLOW_STATS_FIXED_LEN || msg.len() < offset + record_len {
            return Err(ErrorKind::InvalidLength);
        }
        if u16_at(msg, offset + 18) & !FlowModFlags::all().bits() != 0 {
            return Err(ErrorKind::InvalidFlowModFlags);
        }
        let match_len = validate_match_at(msg, offset + FLOW_STATS_FIXED_LEN)?;
        let instructions_offset = FLOW_STATS_FIXED_LEN + match_len;
        if record_len < instructions_offset {
            return Err(ErrorKind::InvalidLength);
        }
        if record_len > instructions_offset {
            validate_instructions(&msg[offset + instructions_offset..offset + record_len])?;
        }
        offset += record_len;
    }
    Ok(())
}

pub fn validate_aggregate_multipart_reply(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(
        msg,
        OFPT_MULTIPART_REPLY,
        MULTIPART_HEADER_LEN + AGGREGATE_STATS_REPLY_LEN,
        MULTIPART_HEADER_LEN + AGGREGATE_STATS_REPLY_LEN,
    )?;
    if multipart_flags_of(msg) != 0 {
        return Err(ErrorKind::InvalidStatsReplyFlags);
    }
    Ok(())
}

fn validate_array_reply(msg: &[u8], record_len: usize) -> Result<(), ErrorKind> {
    reply_flags_ok(msg)?;
    if (msg.len() - MULTIPART_HEADER_LEN) % record_len != 0 {
        return Err(ErrorKind::InvalidLength);
    }
    Ok(())
}

pub fn validate_table_multipart_reply(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(
        msg,
        OFPT_MULTIPART_REPLY,
        MULTIPART_HEADER_LEN + TABLE_STATS_LEN,
        u16::MAX as usize,
    )?;
    validate_array_reply(msg, TABLE_STATS_LEN)
}

pub fn validate_port_multipart_reply(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(
        msg,
        OFPT_MULTIPART_REPLY,
        MULTIPART_HEADER_LEN + PORT_STATS_LEN,
        u16::MAX as usize,
    )?;
    validate_array_reply(msg, PORT_STATS_LEN)?;
    let mut offset = MULTIPART_HEADER_LEN;
    while offset < msg.len() {
        validate_port_no(u32_at(msg, offset))?;
        offset += PORT_STATS_LEN;
    }
    Ok(())
}

pub fn validate_queue_multipart_reply(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(msg, OFPT_MULTIPART_REPLY, MULTIPART_HEADER_LEN, u16::MAX as usize)?;
    validate_array_reply(msg, QUEUE_STATS_LEN)?;
    let mut offset = MULTIPART_HEADER_LEN;
    while offset < msg.len() {
        validate_port_no(u32_at(msg, offset))?;
        offset += QUEUE_STATS_LEN;
    }
    Ok(())
}

pub fn validate_group_multipart_reply(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(msg, OFPT_MULTIPART_REPLY, MULTIPART_HEADER_LEN, u16::MAX as usize)?;
    reply_flags_ok(msg)?;
    let mut offset = MULTIPART_HEADER_LEN;
    while offset < msg.len() {
        if msg.len() < offset + GROUP_STATS_HEADER_LEN {
            return Err(ErrorKind::InvalidLength);
        }
        let record_len = u16_at(msg, offset) as usize;
        if record_len < GROUP_STATS_HEADER_LEN || msg.len() < offset + record_len {
            return Err(ErrorKind::InvalidLength);
        }
        offset += record_len;
    }
    Ok(())
}

pub fn validate_group_desc_multipart_reply(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(msg, OFPT_MULTIPART_REPLY, MULTIPART_HEADER_LEN, u16::MAX as usize)?;
    reply_flags_ok(msg)?;
    let mut offset = MULTIPART_HEADER_LEN;
    while offset < msg.len() {
        if msg.len() < offset + GROUP_DESC_HEADER_LEN {
            return Err(ErrorKind::InvalidLength);
        }
        let record_len = u16_at(msg, offset) as usize;
        if record_len < GROUP_DESC_HEADER_LEN || msg.len() < offset + record_len {
            return Err(ErrorKind::InvalidLength);
        }
        if u8_at(msg, offset + 2) > GROUP_TYPE_MAX {
            return Err(ErrorKind::InvalidGroupType);
        }
        validate_bucket_region(&msg[offset + GROUP_DESC_HEADER_LEN..offset + record_len])?;
        offset += record_len;
    }
    Ok(())
}

pub fn validate_group_features_multipart_reply(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(
        msg,
        OFPT_MULTIPART_REPLY,
        MULTIPART_HEADER_LEN + GROUP_FEATURES_LEN,
        MULTIPART_HEADER_LEN + GROUP_FEATURES_LEN,
    )?;
    reply_flags_ok(msg)?;
    if u32_at(msg, 16) & !GROUP_TYPE_BITS != 0 {
        return Err(ErrorKind::InvalidGroupType);
    }
    Ok(())
}

pub fn validate_meter_multipart_reply(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(msg, OFPT_MULTIPART_REPLY, MULTIPART_HEADER_LEN, u16::MAX as usize)?;
    reply_flags_ok(msg)?;
    let mut offset = MULTIPART_HEADER_LEN;
    while offset < msg.len() {
        if msg.len() < offset + METER_STATS_HEADER_LEN {
            return Err(ErrorKind::InvalidLength);
        }
        let record_len = u16_at(msg, offset + 4) as usize;
        if record_len < METER_STATS_HEADER_LEN || msg.len() < offset + record_len {
            return Err(ErrorKind::InvalidLength);
        }
        offset += record_len;
    }
    Ok(())
}

pub fn validate_meter_config_multipart_reply(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(msg, OFPT_MULTIPART_REPLY, MULTIPART_HEADER_LEN, u16::MAX as usize)?;
    reply_flags_ok(msg)?;
    let mut offset = MULTIPART_HEADER_LEN;
    while offset < msg.len() {
        if msg.len() < offset + METER_CONFIG_HEADER_LEN {
            return Err(ErrorKind::InvalidLength);
        }
        let record_len = u16_at(msg, offset) as usize;
        if record_len < METER_CONFIG_HEADER_LEN || msg.len() < offset + record_len {
            return Err(ErrorKind::InvalidLength);
        }
        offset += record_len;
    }
    Ok(())
}

pub fn validate_meter_features_multipart_reply(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(
        msg,
        OFPT_MULTIPART_REPLY,
        MULTIPART_HEADER_LEN + 16,
        MULTIPART_HEADER_LEN + 16,
    )?;
    reply_flags_ok(msg)
}

pub fn validate_table_features_multipart_reply(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(msg, OFPT_MULTIPART_REPLY, MULTIPART_HEADER_LEN, u16::MAX as usize)?;
    reply_flags_ok(msg)?;
    let mut region = &msg[MULTIPART_HEADER_LEN..];
    while !region.is_empty() {
        if region.len() < 2 {
            return Err(ErrorKind::InvalidLength);
        }
        let len = u16::from_be_bytes([region[0], region[1]]) as usize;
        if len < 2 || region.len() < len {
            return Err(ErrorKind::InvalidLength);
        }
        region = &region[len..];
    }
    Ok(())
}

pub fn validate_port_desc_multipart_reply(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(msg, OFPT_MULTIPART_REPLY, MULTIPART_HEADER_LEN, u16::MAX as usize)?;
    validate_array_reply(msg, PORT_LEN)?;
    let mut offset = MULTIPART_HEADER_LEN;
    while offset < msg.len() {
        validate_port_at(msg, offset)?;
        offset += PORT_LEN;
    }
    Ok(())
}

pub fn validate_experimenter_multipart_reply(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(
        msg,
        OFPT_MULTIPART_REPLY,
        MULTIPART_HEADER_LEN + EXPERIMENTER_MP_HEADER_LEN,
        u16::MAX as usize,
    )?;
    if multipart_type_of(msg) != OFPMP_EXPERIMENTER {
        return Err(ErrorKind::InvalidStatsType);
    }
    reply_flags_ok(msg)
}

pub fn validate_multipart_reply(msg: &[u8]) -> Result<(), ErrorKind> {
    if msg.len() < MULTIPART_HEADER_LEN {
        return Err(ErrorKind::TooShortMessage);
    }
    match multipart_type_of(msg) {
        OFPMP_DESC => validate_desc_multipart_reply(msg),
        OFPMP_FLOW => validate_flow_multipart_reply(msg),
        OFPMP_AGGREGATE => validate_aggregate_multipart_reply(msg),
        OFPMP_TABLE => validate_table_multipart_reply(msg),
        OFPMP_PORT_STATS => validate_port_multipart_reply(msg),
        OFPMP_QUEUE => validate_queue_multipart_reply(msg),
        OFPMP_GROUP => validate_group_multipart_reply(msg),
        OFPMP_GROUP_DESC => validate_group_desc_multipart_reply(msg),
        OFPMP_GROUP_FEATURES => validate_group_features_multipart_reply(msg),
        OFPMP_METER => validate_meter_multipart_reply(msg),
        OFPMP_METER_CONFIG => validate_meter_config_multipart_reply(msg),
        OFPMP_METER_FEATURES => validate_meter_features_multipart_reply(msg),
        OFPMP_TABLE_FEATURES => validate_table_features_multipart_reply(msg),
        OFPMP_PORT_DESC => validate_port_desc_multipart_reply(msg),
        OFPMP_EXPERIMENTER => validate_experimenter_multipart_reply(msg),
        _ => Err(ErrorKind::UnsupportedStatsType),
    }
}

pub fn validate_barrier_request(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(msg, OFPT_BARRIER_REQUEST, OFP_HEADER_LEN, OFP_HEADER_LEN)
}

pub fn validate_barrier_reply(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(msg, OFPT_BARRIER_REPLY, OFP_HEADER_LEN, OFP_HEADER_LEN)
}

pub fn validate_queue_get_config_request(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(
        msg,
        OFPT_QUEUE_GET_CONFIG_REQUEST,
        QUEUE_GET_CONFIG_REQUEST_LEN,
        QUEUE_GET_CONFIG_REQUEST_LEN,
    )?;
    validate_port_no(u32_at(msg, 8))
}

fn validate_queue_property(property: &[u8]) -> Result<usize, ErrorKind> {
    if property.len() < QUEUE_PROP_HEADER_LEN {
        return Err(ErrorKind::TooShortQueueProperty);
    }
    let prop_type = u16::from_be_bytes([property[0], property[1]]);
    let prop_len = u16::from_be_bytes([property[2], property[3]]) as usize;
    if prop_len < QUEUE_PROP_HEADER_LEN || property.len() < prop_len {
        return Err(ErrorKind::TooShortQueueProperty);
    }
    match prop_type {
        OFPQT_MIN_RATE | OFPQT_MAX_RATE => {
            if prop_len < QUEUE_PROP_RATE_LEN {
                return Err(ErrorKind::TooShortQueueProperty);
            }
            if prop_len > QUEUE_PROP_RATE_LEN {
                return Err(ErrorKind::TooLongQueueProperty);
            }
        }
        OFPQT_EXPERIMENTER => {}
        _ => return Err(ErrorKind::UndefinedQueueProperty),
    }
    Ok(prop_len)
}

fn validate_packet_queue(queue: &[u8]) -> Result<usize, ErrorKind> {
    if queue.len() < PACKET_QUEUE_HEADER_LEN {
        return Err(ErrorKind::TooShortQueueDescription);
    }
    let queue_len = u16::from_be_bytes([queue[8], queue[9]]) as usize;
    if queue_len < PACKET_QUEUE_HEADER_LEN + QUEUE_PROP_HEADER_LEN || queue.len() < queue_len {
        return Err(ErrorKind::TooShortQueueDescription);
    }
    let mut properties = &queue[PACKET_QUEUE_HEADER_LEN..queue_len];
    while !properties.is_empty() {
        let consumed = validate_queue_property(properties)?;
        properties = &properties[consumed..];
    }
    Ok(queue_len)
}

pub fn validate_queue_get_config_reply(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(
        msg,
        OFPT_QUEUE_GET_CONFIG_REPLY,
        QUEUE_GET_CONFIG_REPLY_MIN_LEN + PACKET_QUEUE_HEADER_LEN,
        u16::MAX as usize,
    )?;
    validate_port_no(u32_at(msg, 8))?;
    let mut queues = &msg[16..];
    while !queues.is_empty() {
        let consumed = validate_packet_queue(queues)?;
        queues = &queues[consumed..];
    }
    Ok(())
}

fn validate_role(msg: &[u8], expected_type: u8) -> Result<(), ErrorKind> {
    validate_header(msg, expected_type, ROLE_LEN, ROLE_LEN)?;
    if u32_at(msg, 8) > CONTROLLER_ROLE_MAX {
        return Err(ErrorKind::InvalidControllerRole);
    }
    Ok(())
}

pub fn validate_role_request(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_role(msg, OFPT_ROLE_REQUEST)
}

pub fn validate_role_reply(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_role(msg, OFPT_ROLE_REPLY)
}

pub fn validate_get_async_request(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(msg, OFPT_GET_ASYNC_REQUEST, OFP_HEADER_LEN, OFP_HEADER_LEN)
}

fn validate_async_config(msg: &[u8], expected_type: u8) -> Result<(), ErrorKind> {
    validate_header(msg, expected_type, ASYNC_CONFIG_LEN, ASYNC_CONFIG_LEN)?;
    for offset in [8usize, 12] {
        if u32_at(msg, offset) & !PACKET_IN_MASK_BITS != 0 {
            return Err(ErrorKind::InvalidPacketInMask);
        }
    }
    for offset in [16usize, 20] {
        if u32_at(msg, offset) & !PORT_STATUS_MASK_BITS != 0 {
            return Err(ErrorKind::InvalidPortStatusMask);
        }
    }
    for offset in [24usize, 28] {
        if u32_at(msg, offset) & !FLOW_REMOVED_MASK_BITS != 0 {
            return Err(ErrorKind::InvalidFlowRemovedMask);
        }
    }
    Ok(())
}

pub fn validate_get_async_reply(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_async_config(msg, OFPT_GET_ASYNC_REPLY)
}

pub fn validate_set_async(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_async_config(msg, OFPT_SET_ASYNC)
}

pub fn validate_meter_mod(msg: &[u8]) -> Result<(), ErrorKind> {
    validate_header(msg, OFPT_METER_MOD, METER_MOD_MIN_LEN, u16::MAX as usize)?;
    if u16_at(msg, 8) > METER_COMMAND_MAX {
        return Err(ErrorKind::InvalidMeterCommand);
    }
    if u16_at(msg, 10) & !MeterFlags::all().bits() != 0 {
        return Err(ErrorKind::InvalidMeterFlags);
    }

    let mut bands = &msg[METER_MOD_MIN_LEN..];
    while bands.len() > METER_BAND_HEADER_LEN {
        let band_len = u16::from_be_bytes([bands[2], bands[3]]) as usize;
        if bands.len() < band_len || band_len == 0 {
            return Err(ErrorKind::TooShortMessage);
        }
        let band_type = u16::from_be_bytes([bands[0], bands[1]]);
        if band_type > METER_BAND_MAX && band_type != OFPMBT_EXPERIMENTER {
            return Err(ErrorKind::InvalidMeterBandType);
        }
        bands = &bands[band_len..];
    }
    if bands.is_empty() {
        Ok(())
    } else {
        Err(ErrorKind::TooLongMessage)
    }
}

/// Dispatch a message to its kind-specific validator by the header type.
pub fn validate_openflow_message(msg: &[u8]) -> Result<(), ErrorKind> {
    if msg.len() < OFP_HEADER_LEN {
        return Err(ErrorKind::TooShortMessage);
    }
    let msg_type = u8_at(msg, 1);
    debug!(
        "validating an openflow message ( version = {:#x}, type = {:#x}, length = {}, xid = {:#x} )",
        u8_at(msg, 0),
        msg_type,
        u16_at(msg, 2),
        u32_at(msg, 4)
    );

    match msg_type {
        OFPT_HELLO => validate_hello(msg),
        OFPT_ERROR => validate_error(msg),
        OFPT_ECHO_REQUEST => validate_echo_request(msg),
        OFPT_ECHO_REPLY => validate_echo_reply(msg),
        OFPT_EXPERIMENTER => validate_experimenter(msg),
        OFPT_FEATURES_REQUEST => validate_features_request(msg),
        OFPT_FEATURES_REPLY => validate_features_reply(msg),
        OFPT_GET_CONFIG_REQUEST => validate_get_config_request(msg),
        OFPT_GET_CONFIG_REPLY => validate_get_config_reply(msg),
        OFPT_SET_CONFIG => validate_set_config(msg),
        OFPT_PACKET_IN => validate_packet_in(msg),
        OFPT_FLOW_REMOVED => validate_flow_removed(msg),
        OFPT_PORT_STATUS => validate_port_status(msg),
        OFPT_PACKET_OUT => validate_packet_out(msg),
        OFPT_FLOW_MOD => validate_flow_mod(msg),
        OFPT_GROUP_MOD => validate_group_mod(msg),
        OFPT_PORT_MOD => validate_port_mod(msg),
        OFPT_TABLE_MOD => validate_table_mod(msg),
        OFPT_MULTIPART_REQUEST => validate_multipart_request(msg),
        OFPT_MULTIPART_REPLY => validate_multipart_reply(msg),
        OFPT_BARRIER_REQUEST => validate_barrier_request(msg),
        OFPT_BARRIER_REPLY => validate_barrier_reply(msg),
        OFPT_QUEUE_GET_CONFIG_REQUEST => validate_queue_get_config_request(msg),
        OFPT_QUEUE_GET_CONFIG_REPLY => validate_queue_get_config_reply(msg),
        OFPT_ROLE_REQUEST => validate_role_request(msg),
        OFPT_ROLE_REPLY => validate_role_reply(msg),
        OFPT_GET_ASYNC_REQUEST => validate_get_async_request(msg),
        OFPT_GET_ASYNC_REPLY => validate_get_async_reply(msg),
        OFPT_SET_ASYNC => validate_set_async(msg),
        OFPT_METER_MOD => validate_meter_mod(msg),
        _ => Err(ErrorKind::UndefinedType),
    }
}

#[cfg(test)]
mod test;
