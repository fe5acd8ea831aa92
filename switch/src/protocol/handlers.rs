// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! Per-message handlers. All run on the protocol thread after the
//! message validated; wire decoding here can therefore index freely.

use tracing::{debug, warn};

use ofdp::{
    FlowEntry, FlowModOptions, FlowRemovedNotice, GroupEntry, MeterEntry, PacketInNotice,
    PendingExecution,
};
use openflow::OFP_VERSION;
use openflow::actions::ActionList;
use openflow::buckets::BucketList;
use openflow::consts::error_code::{OFPFMFC_BAD_FLAGS, OFPFMFC_BAD_TABLE_ID};
use openflow::consts::error_type::OFPET_FLOW_MOD_FAILED;
use openflow::consts::port_no::OFPP_TABLE;
use openflow::consts::{
    FLOW_REMOVED_MASK_BITS, FlowModFlags, OFP_NO_BUFFER, OFPCR_ROLE_EQUAL, OFPCR_ROLE_NOCHANGE,
    OFPFC_ADD, OFPFC_DELETE, OFPFC_DELETE_STRICT, OFPFC_MODIFY, OFPFC_MODIFY_STRICT, OFPGC_ADD,
    OFPGC_DELETE, OFPGC_MODIFY, OFPMC_ADD, OFPMC_DELETE, OFPMC_MODIFY, PACKET_IN_MASK_BITS,
    PORT_STATUS_MASK_BITS,
};
use openflow::msg::{
    MeterBand, PortDesc, create_barrier_reply, create_echo_reply, create_features_reply,
    create_flow_removed, create_get_async_reply, create_get_config_reply, create_hello,
    create_hello_elem_versionbitmap, create_packet_in, create_port_status,
    create_queue_get_config_reply, create_role_reply,
};
use openflow::oxm::OxmMatch;
use openflow::pad_to_64;

use super::ProtocolWorker;

fn u16_at(frame: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([frame[at], frame[at + 1]])
}

fn u32_at(frame: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([frame[at], frame[at + 1], frame[at + 2], frame[at + 3]])
}

fn u64_at(frame: &[u8], at: usize) -> u64 {
    u64::from_be_bytes([
        frame[at],
        frame[at + 1],
        frame[at + 2],
        frame[at + 3],
        frame[at + 4],
        frame[at + 5],
        frame[at + 6],
        frame[at + 7],
    ])
}

/// Forward an engine error as an OFPT_ERROR.
fn send_engine_error(worker: &mut ProtocolWorker, transaction_id: u32, err: ofdp::Ofdpe) {
    let (error_type, error_code) = err.ofp_error();
    worker.send_error_message(transaction_id, error_type, error_code);
}

pub fn handle_hello(worker: &mut ProtocolWorker, transaction_id: u32) {
    debug!("hello received ( transaction_id = {transaction_id:#x} )");

    let element = create_hello_elem_versionbitmap(&[OFP_VERSION]);
    let hello = create_hello(transaction_id, Some(&element));
    if worker.send_message(hello) {
        let features = worker.datapath().features();
        worker.ctrl.controller_connected = true;
        worker.ctrl.capabilities = features.capabilities;
    }
}

pub fn handle_echo_request(worker: &mut ProtocolWorker, transaction_id: u32, body: &[u8]) {
    let body = (!body.is_empty()).then_some(body);
    let reply = create_echo_reply(transaction_id, body);
    worker.send_message(reply);
}

pub fn handle_features_request(worker: &mut ProtocolWorker, transaction_id: u32) {
    let features = worker.datapath().features();
    let reply = create_features_reply(
        transaction_id,
        features.datapath_id,
        features.n_buffers,
        features.n_tables,
        features.auxiliary_id,
        features.capabilities.bits(),
    );
    worker.send_message(reply);
}

pub fn handle_get_config_request(worker: &mut ProtocolWorker, transaction_id: u32) {
    let config = worker.datapath().config();
    let reply = create_get_config_reply(transaction_id, config.flags, config.miss_send_len);
    worker.send_message(reply);
}

pub fn handle_set_config(worker: &mut ProtocolWorker, transaction_id: u32, frame: &[u8]) {
    let config = ofdp::SwitchConfig {
        flags: u16_at(frame, 8),
        miss_send_len: u16_at(frame, 10),
    };
    if let Err(err) = worker.datapath().set_config(config) {
        send_engine_error(worker, transaction_id, err);
    }
}

pub fn handle_barrier_request(worker: &mut ProtocolWorker, transaction_id: u32) {
    // ordering is the engine's concern; the reply is immediate
    let reply = create_barrier_reply(transaction_id);
    worker.send_message(reply);
}

/// Decode the match + instruction tail of a flow-mod.
fn flow_mod_tail(frame: &[u8]) -> Option<(OxmMatch, openflow::instructions::InstructionList)> {
    let match_declared = usize::from(u16_at(frame, 50));
    let padded = match_declared + pad_to_64(match_declared);
    let oxm_match = OxmMatch::unpack(&frame[48..]).ok()?;
    let instructions =
        openflow::instructions::InstructionList::unpack(&frame[48 + padded..]).ok()?;
    Some((oxm_match, instructions))
}

pub fn handle_flow_mod(worker: &mut ProtocolWorker, transaction_id: u32, frame: &[u8]) {
    let cookie = u64_at(frame, 8);
    let cookie_mask = u64_at(frame, 16);
    let table_id = frame[24];
    let command = frame[25];
    let idle_timeout = u16_at(frame, 26);
    let hard_timeout = u16_at(frame, 28);
    let priority = u16_at(frame, 30);
    let buffer_id = u32_at(frame, 32);
    let out_port = u32_at(frame, 36);
    let out_group = u32_at(frame, 40);
    let flags = FlowModFlags::from_bits_truncate(u16_at(frame, 44));

    let Some((oxm_match, instructions)) = flow_mod_tail(frame) else {
        warn!("flow-mod tail failed to decode after validation");
        return;
    };

    let options = FlowModOptions {
        cookie,
        cookie_mask,
        priority,
        out_port,
        out_group,
        strict: matches!(command, OFPFC_MODIFY_STRICT | OFPFC_DELETE_STRICT),
    };

    match command {
        OFPFC_ADD => {
            // only these two flags are supported on the add path
            if flags
                .intersects(!(FlowModFlags::SEND_FLOW_REM | FlowModFlags::RESET_COUNTS))
            {
                worker.send_error_message(
                    transaction_id,
                    OFPET_FLOW_MOD_FAILED,
                    OFPFMFC_BAD_FLAGS,
                );
                return;
            }
            if table_id == openflow::consts::OFPTT_ALL {
                worker.send_error_message(
                    transaction_id,
                    OFPET_FLOW_MOD_FAILED,
                    OFPFMFC_BAD_TABLE_ID,
                );
                return;
            }
            let entry = FlowEntry::new(
                oxm_match,
                instructions,
                priority,
                idle_timeout,
                hard_timeout,
                flags,
                cookie,
            );
            if let Err(err) = worker.datapath().add_flow_entry(table_id, entry) {
                send_engine_error(worker, transaction_id, err);
                return;
            }
            flush_buffered_packet(worker, transaction_id, buffer_id);
        }
        OFPFC_MODIFY | OFPFC_MODIFY_STRICT => {
            if let Err(err) = worker.datapath().update_or_add_flow_entry(
                table_id,
                &oxm_match,
                options,
                idle_timeout,
                hard_timeout,
                flags,
                &instructions,
            ) {
                send_engine_error(worker, transaction_id, err);
                return;
            }
            flush_buffered_packet(worker, transaction_id, buffer_id);
        }
        OFPFC_DELETE | OFPFC_DELETE_STRICT => {
            if let Err(err) =
                worker.datapath().delete_flow_entries(table_id, &oxm_match, options)
            {
                send_engine_error(worker, transaction_id, err);
            }
        }
        other => {
            warn!("undefined flow mod command {other}");
            worker.send_error_message(
                transaction_id,
                OFPET_FLOW_MOD_FAILED,
                openflow::consts::error_code::OFPFMFC_BAD_COMMAND,
            );
        }
    }
}

/// A flow-mod with a buffered packet also runs that packet through the
/// tables: a synthetic packet-out whose single action outputs to
/// OFPP_TABLE, posted to the datapath.
fn flush_buffered_packet(worker: &mut ProtocolWorker, transaction_id: u32, buffer_id: u32) {
    if buffer_id == OFP_NO_BUFFER {
        return;
    }
    let frame = match worker.datapath().resolve_packet_out(buffer_id, None) {
        Ok(frame) => frame,
        Err(err) => {
            send_engine_error(worker, transaction_id, err);
            return;
        }
    };
    let mut actions = ActionList::new();
    actions.append_output(OFPP_TABLE, u16::MAX);
    worker.wakeup_datapath(PendingExecution { in_port: 0, actions, frame });
}

pub fn handle_packet_out(worker: &mut ProtocolWorker, transaction_id: u32, frame: &[u8]) {
    let buffer_id = u32_at(frame, 8);
    let in_port = u32_at(frame, 12);
    let actions_len = usize::from(u16_at(frame, 16));

    let Ok(actions) = ActionList::unpack(&frame[24..24 + actions_len]) else {
        warn!("packet-out actions failed to decode after validation");
        return;
    };
    let data = &frame[24 + actions_len..];
    let data = (!data.is_empty()).then(|| data.to_vec());

    let resolved = match worker.datapath().resolve_packet_out(buffer_id, data) {
        Ok(frame) => frame,
        Err(err) => {
            send_engine_error(worker, transaction_id, err);
            return;
        }
    };
    worker.wakeup_datapath(PendingExecution { in_port, actions, frame: resolved });
}

pub fn handle_port_mod(worker: &mut ProtocolWorker, transaction_id: u32, frame: &[u8]) {
    let port_no = u32_at(frame, 8);
    let config = u32_at(frame, 24);
    let mask = u32_at(frame, 28);
    // hw_addr and advertise are accepted but not applied to logical ports
    if let Err(err) = worker.datapath().update_port(port_no, config, mask) {
        send_engine_error(worker, transaction_id, err);
    }
}

pub fn handle_table_mod(worker: &mut ProtocolWorker, transaction_id: u32, frame: &[u8]) {
    let table_id = frame[8];
    let config = u32_at(frame, 12);
    if let Err(err) = worker.datapath().set_flow_table_config(table_id, config) {
        send_engine_error(worker, transaction_id, err);
    }
}

pub fn handle_group_mod(worker: &mut ProtocolWorker, transaction_id: u32, frame: &[u8]) {
    let command = u16_at(frame, 8);
    let group_type = frame[10];
    let group_id = u32_at(frame, 12);
    let Ok(buckets) = BucketList::unpack(&frame[16..]) else {
        warn!("group-mod buckets failed to decode after validation");
        return;
    };

    let result = match command {
        OFPGC_ADD => worker.datapath().add_group(GroupEntry::new(group_id, group_type, buckets)),
        OFPGC_MODIFY => {
            worker.datapath().modify_group(GroupEntry::new(group_id, group_type, buckets))
        }
        OFPGC_DELETE => worker.datapath().delete_group(group_id),
        _ => {
            worker.send_error_message(
                transaction_id,
                openflow::consts::error_type::OFPET_GROUP_MOD_FAILED,
                openflow::consts::error_code::OFPGMFC_BAD_COMMAND,
            );
            return;
        }
    };
    if let Err(err) = result {
        send_engine_error(worker, transaction_id, err);
    }
}

pub fn handle_meter_mod(worker: &mut ProtocolWorker, transaction_id: u32, frame: &[u8]) {
    let command = u16_at(frame, 8);
    let flags = u16_at(frame, 10);
    let meter_id = u32_at(frame, 12);

    let mut bands = Vec::new();
    let mut at = 16usize;
    while at < frame.len() {
        match MeterBand::unpack(&frame[at..]) {
            Ok((band, consumed)) => {
                bands.push(band);
                at += consumed;
            }
            Err(_) => break,
        }
    }

    let result = match command {
        OFPMC_ADD => worker.datapath().add_meter(MeterEntry::new(meter_id, flags, bands)),
        OFPMC_MODIFY => worker.datapath().modify_meter(MeterEntry::new(meter_id, flags, bands)),
        OFPMC_DELETE => worker.datapath().delete_meter(meter_id),
        _ => {
            worker.send_error_message(
                transaction_id,
                openflow::consts::error_type::OFPET_METER_MOD_FAILED,
                openflow::consts::error_code::OFPMMFC_BAD_COMMAND,
            );
            return;
        }
    };
    if let Err(err) = result {
        send_engine_error(worker, transaction_id, err);
    }
}

pub fn handle_role_request(worker: &mut ProtocolWorker, transaction_id: u32, frame: &[u8]) {
    let requested = u32_at(frame, 8);
    let generation_id = u64_at(frame, 16);
    // no multi-controller arbitration: a no-change probe reports equal
    let role = if requested == OFPCR_ROLE_NOCHANGE { OFPCR_ROLE_EQUAL } else { requested };
    let reply = create_role_reply(transaction_id, role, generation_id);
    worker.send_message(reply);
}

pub fn handle_get_async_request(worker: &mut ProtocolWorker, transaction_id: u32) {
    // every reason is reported on the master channel; nothing on slaves
    let reply = create_get_async_reply(
        transaction_id,
        [PACKET_IN_MASK_BITS, 0],
        [PORT_STATUS_MASK_BITS, 0],
        [FLOW_REMOVED_MASK_BITS, 0],
    );
    worker.send_message(reply);
}

pub fn handle_set_async(worker: &mut ProtocolWorker, transaction_id: u32) {
    // accepted and discarded, like table features
    debug!("set-async accepted ( transaction_id = {transaction_id:#x} )");
    let _ = worker;
}

pub fn handle_queue_get_config_request(
    worker: &mut ProtocolWorker,
    transaction_id: u32,
    frame: &[u8],
) {
    // no queues are configured on the logical ports
    let port = u32_at(frame, 8);
    let reply = create_queue_get_config_reply(transaction_id, port, &[]);
    worker.send_message(reply);
}

pub fn send_packet_in(worker: &mut ProtocolWorker, notice: &PacketInNotice) {
    let clamp = usize::from(notice.max_len).min(notice.packet.len());
    let data = &notice.packet[..clamp];
    let message = create_packet_in(
        0,
        notice.buffer_id,
        notice.total_len,
        notice.reason,
        notice.table_id,
        notice.cookie,
        &notice.oxm_match,
        (!data.is_empty()).then_some(data),
    );
    worker.send_message(message);
}

pub fn send_flow_removed(worker: &mut ProtocolWorker, notice: &FlowRemovedNotice) {
    let message = create_flow_removed(
        0,
        notice.cookie,
        notice.priority,
        notice.reason,
        notice.table_id,
        notice.duration_sec,
        notice.duration_nsec,
        notice.idle_timeout,
        notice.hard_timeout,
        notice.packet_count,
        notice.byte_count,
        &notice.oxm_match,
    );
    worker.send_message(message);
}

pub fn send_port_status(worker: &mut ProtocolWorker, reason: u8, desc: &PortDesc) {
    let message = create_port_status(0, reason, desc);
    worker.send_message(message);
}
