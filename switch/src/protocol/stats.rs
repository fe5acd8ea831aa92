// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! Multipart request handling: capability gating, stats retrieval, and
//! the chunked reply loop.
//!
//! Replies that carry lists run the cursor-based builders until the
//! more-flag clears, so no single callback builds more than one frame's
//! worth of records at a time.

use tracing::debug;

use ofdp::FlowModOptions;
use openflow::Buffer;
use openflow::consts::error_code::{OFPBRC_BAD_EXPERIMENTER, OFPBRC_BAD_MULTIPART};
use openflow::consts::error_type::OFPET_BAD_REQUEST;
use openflow::consts::multipart_type::*;
use openflow::consts::Capabilities;
use openflow::msg::{
    MultipartCursor, create_aggregate_multipart_reply, create_desc_multipart_reply,
    create_flow_multipart_reply, create_group_desc_multipart_reply,
    create_group_features_multipart_reply, create_group_multipart_reply,
    create_meter_config_multipart_reply, create_meter_features_multipart_reply,
    create_meter_multipart_reply, create_port_desc_multipart_reply, create_port_multipart_reply,
    create_queue_multipart_reply, create_table_features_multipart_reply,
    create_table_multipart_reply,
};
use openflow::oxm::OxmMatch;

use super::ProtocolWorker;

const MFR_DESC: &str = "SoftFlow project";
const HW_DESC: &str = "softflow logical switch";
const SERIAL_NUM: &str = "0";

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

/// Gate a stats family on a switch capability bit.
fn check_capability(
    worker: &mut ProtocolWorker,
    transaction_id: u32,
    wanted: Capabilities,
) -> bool {
    if worker.ctrl.capabilities.contains(wanted) {
        return true;
    }
    worker.send_error_message(transaction_id, OFPET_BAD_REQUEST, OFPBRC_BAD_MULTIPART);
    false
}

/// Run a cursor-chunked builder until the more-flag clears.
fn send_chunked(
    worker: &mut ProtocolWorker,
    mut build: impl FnMut(&mut MultipartCursor) -> Buffer,
) {
    let mut cursor = MultipartCursor::new();
    loop {
        let frame = build(&mut cursor);
        worker.send_message(frame);
        if !cursor.more {
            break;
        }
    }
}

/// The flow-shaped request body: selection fields plus a match.
fn flow_selection(frame: &[u8]) -> Option<(u8, FlowModOptions, OxmMatch)> {
    let table_id = frame[16];
    let options = FlowModOptions {
        cookie: u64_at(frame, 32),
        cookie_mask: u64_at(frame, 40),
        priority: 0,
        out_port: u32_at(frame, 20),
        out_group: u32_at(frame, 24),
        strict: false,
    };
    let oxm_match = OxmMatch::unpack(&frame[48..]).ok()?;
    Some((table_id, options, oxm_match))
}

pub fn handle_multipart_request(
    worker: &mut ProtocolWorker,
    transaction_id: u32,
    mp_type: u16,
    frame: &[u8],
) {
    match mp_type {
        OFPMP_DESC => handle_desc(worker, transaction_id),
        OFPMP_FLOW => handle_flow_stats(worker, transaction_id, frame),
        OFPMP_AGGREGATE => handle_aggregate_stats(worker, transaction_id, frame),
        OFPMP_TABLE => handle_table_stats(worker, transaction_id),
        OFPMP_PORT_STATS => handle_port_stats(worker, transaction_id, frame),
        OFPMP_PORT_DESC => handle_port_desc(worker, transaction_id),
        OFPMP_QUEUE => handle_queue_stats(worker, transaction_id),
        OFPMP_GROUP => handle_group_stats(worker, transaction_id, frame),
        OFPMP_GROUP_DESC => handle_group_desc(worker, transaction_id),
        OFPMP_GROUP_FEATURES => handle_group_features(worker, transaction_id),
        OFPMP_METER => handle_meter_stats(worker, transaction_id, frame),
        OFPMP_METER_CONFIG => handle_meter_config(worker, transaction_id, frame),
        OFPMP_METER_FEATURES => handle_meter_features(worker, transaction_id),
        OFPMP_TABLE_FEATURES => handle_table_features(worker, transaction_id),
        OFPMP_EXPERIMENTER => {
            worker.send_error_message(transaction_id, OFPET_BAD_REQUEST, OFPBRC_BAD_EXPERIMENTER);
        }
        _ => {
            worker.send_error_message(transaction_id, OFPET_BAD_REQUEST, OFPBRC_BAD_MULTIPART);
        }
    }
}

fn handle_desc(worker: &mut ProtocolWorker, transaction_id: u32) {
    let dp_desc = worker.progname().to_owned();
    let reply = create_desc_multipart_reply(
        transaction_id,
        0,
        MFR_DESC,
        HW_DESC,
        env!("CARGO_PKG_VERSION"),
        SERIAL_NUM,
        &dp_desc,
    );
    worker.send_message(reply);
}

fn handle_flow_stats(worker: &mut ProtocolWorker, transaction_id: u32, frame: &[u8]) {
    if !check_capability(worker, transaction_id, Capabilities::FLOW_STATS) {
        return;
    }
    let Some((table_id, options, oxm_match)) = flow_selection(frame) else {
        debug!("flow stats selection failed to decode after validation");
        return;
    };
    let entries = worker.datapath().flow_stats(table_id, &oxm_match, options);
    send_chunked(worker, |cursor| {
        create_flow_multipart_reply(transaction_id, 0, &entries, cursor)
    });
}

fn handle_aggregate_stats(worker: &mut ProtocolWorker, transaction_id: u32, frame: &[u8]) {
    if !check_capability(worker, transaction_id, Capabilities::FLOW_STATS) {
        return;
    }
    let Some((table_id, options, oxm_match)) = flow_selection(frame) else {
        return;
    };
    let (packet_count, byte_count, flow_count) =
        worker.datapath().aggregate_stats(table_id, &oxm_match, options);
    let reply = create_aggregate_multipart_reply(
        transaction_id,
        0,
        packet_count,
        byte_count,
        flow_count,
    );
    worker.send_message(reply);
}

fn handle_table_stats(worker: &mut ProtocolWorker, transaction_id: u32) {
    if !check_capability(worker, transaction_id, Capabilities::TABLE_STATS) {
        return;
    }
    let entries = worker.datapath().table_stats();
    send_chunked(worker, |cursor| {
        create_table_multipart_reply(transaction_id, 0, &entries, cursor)
    });
}

fn handle_port_stats(worker: &mut ProtocolWorker, transaction_id: u32, frame: &[u8]) {
    if !check_capability(worker, transaction_id, Capabilities::PORT_STATS) {
        return;
    }
    let port_no = u32_at(frame, 16);
    let entries = worker.datapath().port_stats(port_no);
    send_chunked(worker, |cursor| {
        create_port_multipart_reply(transaction_id, 0, &entries, cursor)
    });
}

fn handle_port_desc(worker: &mut ProtocolWorker, transaction_id: u32) {
    let ports = worker.datapath().port_descriptions();
    send_chunked(worker, |cursor| {
        create_port_desc_multipart_reply(transaction_id, 0, &ports, cursor)
    });
}

fn handle_queue_stats(worker: &mut ProtocolWorker, transaction_id: u32) {
    if !check_capability(worker, transaction_id, Capabilities::QUEUE_STATS) {
        return;
    }
    // no queues exist on the logical ports; the reply is an empty list
    send_chunked(worker, |cursor| {
        create_queue_multipart_reply(transaction_id, 0, &[], cursor)
    });
}

fn handle_group_stats(worker: &mut ProtocolWorker, transaction_id: u32, frame: &[u8]) {
    if !check_capability(worker, transaction_id, Capabilities::GROUP_STATS) {
        return;
    }
    let group_id = u32_at(frame, 16);
    let entries = worker.datapath().group_stats(group_id);
    send_chunked(worker, |cursor| {
        create_group_multipart_reply(transaction_id, 0, &entries, cursor)
    });
}

fn handle_group_desc(worker: &mut ProtocolWorker, transaction_id: u32) {
    if !check_capability(worker, transaction_id, Capabilities::GROUP_STATS) {
        return;
    }
    let entries = worker.datapath().group_descriptions();
    send_chunked(worker, |cursor| {
        create_group_desc_multipart_reply(transaction_id, 0, &entries, cursor)
    });
}

fn handle_group_features(worker: &mut ProtocolWorker, transaction_id: u32) {
    if !check_capability(worker, transaction_id, Capabilities::GROUP_STATS) {
        return;
    }
    let (types, capabilities, max_groups, actions) = worker.datapath().group_features();
    let reply = create_group_features_multipart_reply(
        transaction_id,
        0,
        types,
        capabilities,
        max_groups,
        actions,
    );
    worker.send_message(reply);
}

fn handle_meter_stats(worker: &mut ProtocolWorker, transaction_id: u32, frame: &[u8]) {
    let meter_id = u32_at(frame, 16);
    let entries = worker.datapath().meter_stats(meter_id);
    send_chunked(worker, |cursor| {
        create_meter_multipart_reply(transaction_id, 0, &entries, cursor)
    });
}

fn handle_meter_config(worker: &mut ProtocolWorker, transaction_id: u32, frame: &[u8]) {
    let meter_id = u32_at(frame, 16);
    let entries = worker.datapath().meter_configs(meter_id);
    send_chunked(worker, |cursor| {
        create_meter_config_multipart_reply(transaction_id, 0, &entries, cursor)
    });
}

fn handle_meter_features(worker: &mut ProtocolWorker, transaction_id: u32) {
    let (max_meter, band_types, capabilities, max_bands, max_color) =
        worker.datapath().meter_features();
    let reply = create_meter_features_multipart_reply(
        transaction_id,
        0,
        max_meter,
        band_types,
        capabilities,
        max_bands,
        max_color,
    );
    worker.send_message(reply);
}

fn handle_table_features(worker: &mut ProtocolWorker, transaction_id: u32) {
    // requested features are accepted and discarded; report nothing back
    debug!("table features accepted and discarded");
    send_chunked(worker, |cursor| {
        create_table_features_multipart_reply(transaction_id, 0, &[], cursor)
    });
}
