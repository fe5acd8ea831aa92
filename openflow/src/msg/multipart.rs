// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! Multipart (stats) requests and replies.
//!
//! Reply builders for list-shaped bodies take a caller-maintained
//! [`MultipartCursor`]: each call emits as many records as fit a 16-bit
//! message length, sets `OFPMPF_REPLY_MORE` when it stops early and
//! advances the cursor. The dispatcher loops until `more` clears, which
//! keeps each callback iteration short.

use crate::actions::LengthOverflow;
use crate::buckets::BucketList;
use crate::buffer::Buffer;
use crate::consts::msg_type::{OFPT_MULTIPART_REPLY, OFPT_MULTIPART_REQUEST};
use crate::consts::multipart_type::*;
use crate::consts::{DESC_STR_LEN, OFPMPF_REPLY_MORE, SERIAL_NUM_LEN};
use crate::instructions::InstructionList;
use crate::msg::flow_table::{METER_BAND_LEN, MeterBand};
use crate::msg::port::{PORT_DESC_LEN, PortDesc};
use crate::msg::create_header;
use crate::oxm::OxmMatch;

/// `offsetof(struct ofp_multipart_request/reply, body)`.
pub const MULTIPART_HEADER_LEN: usize = 16;

fn create_multipart_request(
    transaction_id: u32,
    mp_type: u16,
    flags: u16,
    body_len: usize,
) -> Buffer {
    let length = MULTIPART_HEADER_LEN + body_len;
    let mut buf = create_header(transaction_id, OFPT_MULTIPART_REQUEST, length as u16);
    buf.put_u16(mp_type);
    buf.put_u16(flags);
    buf.put_zeros(4);
    buf
}

fn create_multipart_reply(transaction_id: u32, mp_type: u16, flags: u16, length: u16) -> Buffer {
    let mut buf = create_header(transaction_id, OFPT_MULTIPART_REPLY, length);
    buf.put_u16(mp_type);
    buf.put_u16(flags);
    buf.put_zeros(4);
    buf
}

#[must_use]
pub fn create_desc_multipart_request(transaction_id: u32, flags: u16) -> Buffer {
    create_multipart_request(transaction_id, OFPMP_DESC, flags, 0)
}

#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn create_flow_multipart_request(
    transaction_id: u32,
    flags: u16,
    table_id: u8,
    out_port: u32,
    out_group: u32,
    cookie: u64,
    cookie_mask: u64,
    oxm_match: &OxmMatch,
) -> Buffer {
    let body_len = 32 + oxm_match.padded_length();
    let mut buf = create_multipart_request(transaction_id, OFPMP_FLOW, flags, body_len);
    buf.put_u8(table_id);
    buf.put_zeros(3);
    buf.put_u32(out_port);
    buf.put_u32(out_group);
    buf.put_zeros(4);
    buf.put_u64(cookie);
    buf.put_u64(cookie_mask);
    oxm_match.pack(&mut buf);
    buf
}

#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn create_aggregate_multipart_request(
    transaction_id: u32,
    flags: u16,
    table_id: u8,
    out_port: u32,
    out_group: u32,
    cookie: u64,
    cookie_mask: u64,
    oxm_match: &OxmMatch,
) -> Buffer {
    let body_len = 32 + oxm_match.padded_length();
    let mut buf = create_multipart_request(transaction_id, OFPMP_AGGREGATE, flags, body_len);
    buf.put_u8(table_id);
    buf.put_zeros(3);
    buf.put_u32(out_port);
    buf.put_u32(out_group);
    buf.put_zeros(4);
    buf.put_u64(cookie);
    buf.put_u64(cookie_mask);
    oxm_match.pack(&mut buf);
    buf
}

#[must_use]
pub fn create_table_multipart_request(transaction_id: u32, flags: u16) -> Buffer {
    create_multipart_request(transaction_id, OFPMP_TABLE, flags, 0)
}

#[must_use]
pub fn create_port_multipart_request(transaction_id: u32, flags: u16, port_no: u32) -> Buffer {
    let mut buf = create_multipart_request(transaction_id, OFPMP_PORT_STATS, flags, 8);
    buf.put_u32(port_no);
    buf.put_zeros(4);
    buf
}

#[must_use]
pub fn create_queue_multipart_request(
    transaction_id: u32,
    flags: u16,
    port_no: u32,
    queue_id: u32,
) -> Buffer {
    let mut buf = create_multipart_request(transaction_id, OFPMP_QUEUE, flags, 8);
    buf.put_u32(port_no);
    buf.put_u32(queue_id);
    buf
}

#[must_use]
pub fn create_group_multipart_request(transaction_id: u32, flags: u16, group_id: u32) -> Buffer {
    let mut buf = create_multipart_request(transaction_id, OFPMP_GROUP, flags, 8);
    buf.put_u32(group_id);
    buf.put_zeros(4);
    buf
}

#[must_use]
pub fn create_group_desc_multipart_request(transaction_id: u32, flags: u16) -> Buffer {
    create_multipart_request(transaction_id, OFPMP_GROUP_DESC, flags, 0)
}

#[must_use]
pub fn create_group_features_multipart_request(transaction_id: u32, flags: u16) -> Buffer {
    create_multipart_request(transaction_id, OFPMP_GROUP_FEATURES, flags, 0)
}

#[must_use]
pub fn create_meter_multipart_request(transaction_id: u32, flags: u16, meter_id: u32) -> Buffer {
    let mut buf = create_multipart_request(transaction_id, OFPMP_METER, flags, 8);
    buf.put_u32(meter_id);
    buf.put_zeros(4);
    buf
}

#[must_use]
pub fn create_meter_config_multipart_request(
    transaction_id: u32,
    flags: u16,
    meter_id: u32,
) -> Buffer {
    let mut buf = create_multipart_request(transaction_id, OFPMP_METER_CONFIG, flags, 8);
    buf.put_u32(meter_id);
    buf.put_zeros(4);
    buf
}

#[must_use]
pub fn create_meter_features_multipart_request(transaction_id: u32, flags: u16) -> Buffer {
    create_multipart_request(transaction_id, OFPMP_METER_FEATURES, flags, 0)
}

#[must_use]
pub fn create_port_desc_multipart_request(transaction_id: u32, flags: u16) -> Buffer {
    create_multipart_request(transaction_id, OFPMP_PORT_DESC, flags, 0)
}

#[must_use]
pub fn create_experimenter_multipart_request(
    transaction_id: u32,
    flags: u16,
    experimenter: u32,
    exp_type: u32,
    data: Option<&[u8]>,
) -> Buffer {
    let data_len = data.map_or(0, <[u8]>::len);
    let mut buf =
        create_multipart_request(transaction_id, OFPMP_EXPERIMENTER, flags, 8 + data_len);
    buf.put_u32(experimenter);
    buf.put_u32(exp_type);
    if let Some(data) = data {
        buf.put_bytes(data);
    }
    buf
}

/// Table-features entries are echoed opaquely (the datapath accepts and
/// discards requested features), so the request builder carries packed
/// entry bytes as-is.
#[must_use]
pub fn create_table_features_multipart_request(
    transaction_id: u32,
    flags: u16,
    entries: &[TableFeaturesEntry],
) -> Buffer {
    let body_len: usize = entries.iter().map(TableFeaturesEntry::wire_len).sum();
    let mut buf = create_multipart_request(transaction_id, OFPMP_TABLE_FEATURES, flags, body_len);
    for entry in entries {
        entry.pack(&mut buf);
    }
    buf
}

/// Caller-held chunking state for list-shaped multipart replies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MultipartCursor {
    /// Index of the first record the next call will emit.
    pub offset: usize,
    /// Whether another frame is needed after the one just built.
    pub more: bool,
}

impl MultipartCursor {
    #[must_use]
    pub fn new() -> MultipartCursor {
        MultipartCursor::default()
    }
}

/// Emit one reply frame from `records[cursor.offset..]`, stopping before
/// the 16-bit length field would overflow.
fn chunked_reply<R>(
    transaction_id: u32,
    mp_type: u16,
    flags: u16,
    records: &[R],
    cursor: &mut MultipartCursor,
    record_len: impl Fn(&R) -> usize,
    pack_record: impl Fn(&R, &mut Buffer),
) -> Buffer {
    let mut body_len = 0usize;
    let mut taken = 0usize;
    cursor.more = false;

    for record in &records[cursor.offset.min(records.len())..] {
        let len = record_len(record);
        if MULTIPART_HEADER_LEN + body_len + len > u16::MAX as usize {
            cursor.more = true;
            break;
        }
        body_len += len;
        taken += 1;
    }

    let mut flags = flags;
    if cursor.more {
        flags |= OFPMPF_REPLY_MORE;
    }

    let length = (MULTIPART_HEADER_LEN + body_len) as u16;
    let mut buf = create_multipart_reply(transaction_id, mp_type, flags, length);
    for record in &records[cursor.offset.min(records.len())..][..taken] {
        pack_record(record, &mut buf);
    }
    cursor.offset += taken;
    buf
}

fn put_desc_string(buf: &mut Buffer, s: &str, width: usize) {
    let mut field = vec![0u8; width];
    let raw = s.as_bytes();
    let copy = raw.len().min(width - 1);
    field[..copy].copy_from_slice(&raw[..copy]);
    buf.put_bytes(&field);
}

#[must_use]
pub fn create_desc_multipart_reply(
    transaction_id: u32,
    flags: u16,
    mfr_desc: &str,
    hw_desc: &str,
    sw_desc: &str,
    serial_num: &str,
    dp_desc: &str,
) -> Buffer {
    let length = MULTIPART_HEADER_LEN + 4 * DESC_STR_LEN + SERIAL_NUM_LEN;
    let mut buf = create_multipart_reply(transaction_id, OFPMP_DESC, flags, length as u16);
    put_desc_string(&mut buf, mfr_desc, DESC_STR_LEN);
    put_desc_string(&mut buf, hw_desc, DESC_STR_LEN);
    put_desc_string(&mut buf, sw_desc, DESC_STR_LEN);
    put_desc_string(&mut buf, serial_num, SERIAL_NUM_LEN);
    put_desc_string(&mut buf, dp_desc, DESC_STR_LEN);
    buf
}

/// One `ofp_flow_stats` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowStatsEntry {
    pub table_id: u8,
    pub duration_sec: u32,
    pub duration_nsec: u32,
    pub priority: u16,
    pub idle_timeout: u16,
    pub hard_timeout: u16,
    pub flags: u16,
    pub cookie: u64,
    pub packet_count: u64,
    pub byte_count: u64,
    pub oxm_match: OxmMatch,
    pub instructions: InstructionList,
}

/// `offsetof(struct ofp_flow_stats, match)`.
const FLOW_STATS_FIXED_LEN: usize = 48;

impl FlowStatsEntry {
    /// Record length; instruction overflow cannot happen for records the
    /// engine produced, but the error is still surfaced.
    pub fn checked_wire_len(&self) -> Result<usize, LengthOverflow> {
        Ok(FLOW_STATS_FIXED_LEN
            + self.oxm_match.padded_length()
            + self.instructions.length()? as usize)
    }

    #[must_use]
    pub fn wire_len(&self) -> usize {
        self.checked_wire_len().map_or(usize::MAX, |len| len)
    }

    pub fn pack(&self, buf: &mut Buffer) {
        buf.put_u16(self.wire_len() as u16);
        buf.put_u8(self.table_id);
        buf.put_zeros(1);
        buf.put_u32(self.duration_sec);
        buf.put_u32(self.duration_nsec);
        buf.put_u16(self.priority);
        buf.put_u16(self.idle_timeout);
        buf.put_u16(self.hard_timeout);
        buf.put_u16(self.flags);
        buf.put_zeros(4);
        buf.put_u64(self.cookie);
        buf.put_u64(self.packet_count);
        buf.put_u64(self.byte_count);
        self.oxm_match.pack(buf);
        self.instructions.pack(buf);
    }
}

#[must_use]
pub fn create_flow_multipart_reply(
    transaction_id: u32,
    flags: u16,
    entries: &[FlowStatsEntry],
    cursor: &mut MultipartCursor,
) -> Buffer {
    chunked_reply(
        transaction_id,
        OFPMP_FLOW,
        flags,
        entries,
        cursor,
        FlowStatsEntry::wire_len,
        FlowStatsEntry::pack,
    )
}

#[must_use]
pub fn create_aggregate_multipart_reply(
    transaction_id: u32,
    flags: u16,
    packet_count: u64,
    byte_count: u64,
    flow_count: u32,
) -> Buffer {
    let length = (MULTIPART_HEADER_LEN + 24) as u16;
    let mut buf = create_multipart_reply(transaction_id, OFPMP_AGGREGATE, flags, length);
    buf.put_u64(packet_count);
    buf.put_u64(byte_count);
    buf.put_u32(flow_count);
    buf.put_zeros(4);
    buf
}

/// One `ofp_table_stats` record (24 bytes).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableStatsEntry {
    pub table_id: u8,
    pub active_count: u32,
    pub lookup_count: u64,
    pub matched_count: u64,
}

pub const TABLE_STATS_LEN: usize = 24;

impl TableStatsEntry {
    pub fn pack(&self, buf: &mut Buffer) {
        buf.put_u8(self.table_id);
        buf.put_zeros(3);
        buf.put_u32(self.active_count);
        buf.put_u64(self.lookup_count);
        buf.put_u64(self.matched_count);
    }
}

#[must_use]
pub fn create_table_multipart_reply(
    transaction_id: u32,
    flags: u16,
    entries: &[TableStatsEntry],
    cursor: &mut MultipartCursor,
) -> Buffer {
    chunked_reply(
        transaction_id,
        OFPMP_TABLE,
        flags,
        entries,
        cursor,
        |_| TABLE_STATS_LEN,
        |entry, buf| entry.pack(buf),
    )
}

/// One `ofp_port_stats` record (112 bytes).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PortStatsEntry {
    pub port_no: u32,
    pub rx_packets: u64,
    pub tx_packets: u64,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_dropped: u64,
    pub tx_dropped: u64,
    pub rx_errors: u64,
    pub tx_errors: u64,
    pub rx_frame_err: u64,
    pub rx_over_err: u64,
    pub rx_crc_err: u64,
    pub collisions: u64,
    pub duration_sec: u32,
    pub duration_nsec: u32,
}

pub const PORT_STATS_LEN: usize = 112;

impl PortStatsEntry {
    pub fn pack(&self, buf: &mut Buffer) {
        buf.put_u32(self.port_no);
        buf.put_zeros(4);
        buf.put_u64(self.rx_packets);
        buf.put_u64(self.tx_packets);
        buf.put_u64(self.rx_bytes);
        buf.put_u64(self.tx_bytes);
        buf.put_u64(self.rx_dropped);
        buf.put_u64(self.tx_dropped);
        buf.put_u64(self.rx_errors);
        buf.put_u64(self.tx_errors);
        buf.put_u64(self.rx_frame_err);
        buf.put_u64(self.rx_over_err);
        buf.put_u64(self.rx_crc_err);
        buf.put_u64(self.collisions);
        buf.put_u32(self.duration_sec);
        buf.put_u32(self.duration_nsec);
    }
}

#[must_use]
pub fn create_port_multipart_reply(
    transaction_id: u32,
    flags: u16,
    entries: &[PortStatsEntry],
    cursor: &mut MultipartCursor,
) -> Buffer {
    chunked_reply(
        transaction_id,
        OFPMP_PORT_STATS,
        flags,
        entries,
        cursor,
        |_| PORT_STATS_LEN,
        |entry, buf| entry.pack(buf),
    )
}

/// One `ofp_queue_stats` record (40 bytes).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStatsEntry {
    pub port_no: u32,
    pub queue_id: u32,
    pub tx_bytes: u64,
    pub tx_packets: u64,
    pub tx_errors: u64,
    pub duration_sec: u32,
    pub duration_nsec: u32,
}

pub const QUEUE_STATS_LEN: usize = 40;

impl QueueStatsEntry {
    pub fn pack(&self, buf: &mut Buffer) {
        buf.put_u32(self.port_no);
        buf.put_u32(self.queue_id);
        buf.put_u64(self.tx_bytes);
        buf.put_u64(self.tx_packets);
        buf.put_u64(self.tx_errors);
        buf.put_u32(self.duration_sec);
        buf.put_u32(self.duration_nsec);
    }
}

#[must_use]
pub fn create_queue_multipart_reply(
    transaction_id: u32,
    flags: u16,
    entries: &[QueueStatsEntry],
    cursor: &mut MultipartCursor,
) -> Buffer {
    chunked_reply(
        transaction_id,
        OFPMP_QUEUE,
        flags,
        entries,
        cursor,
        |_| QUEUE_STATS_LEN,
        |entry, buf| entry.pack(buf),
    )
}

/// Per-bucket counters inside a group-stats record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BucketCounter {
    pub packet_count: u64,
    pub byte_count: u64,
}

/// One `ofp_group_stats` record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupStatsEntry {
    pub group_id: u32,
    pub ref_count: u32,
    pub packet_count: u64,
    pub byte_count: u64,
    pub duration_sec: u32,
    pub duration_nsec: u32,
    pub bucket_stats: Vec<BucketCounter>,
}

const GROUP_STATS_FIXED_LEN: usize = 40;

impl GroupStatsEntry {
    #[must_use]
    pub fn wire_len(&self) -> usize {
        GROUP_STATS_FIXED_LEN + self.bucket_stats.len() * 16
    }

    pub fn pack(&self, buf: &mut Buffer) {
        buf.put_u16(self.wire_len() as u16);
        buf.put_zeros(2);
        buf.put_u32(self.group_id);
        buf.put_u32(self.ref_count);
        buf.put_zeros(4);
        buf.put_u64(self.packet_count);
        buf.put_u64(self.byte_count);
        buf.put_u32(self.duration_sec);
        buf.put_u32(self.duration_nsec);
        for counter in &self.bucket_stats {
            buf.put_u64(counter.packet_count);
            buf.put_u64(counter.byte_count);
        }
    }
}

#[must_use]
pub fn create_group_multipart_reply(
    transaction_id: u32,
    flags: u16,
    entries: &[GroupStatsEntry],
    cursor: &mut MultipartCursor,
) -> Buffer {
    chunked_reply(
        transaction_id,
        OFPMP_GROUP,
        flags,
        entries,
        cursor,
        GroupStatsEntry::wire_len,
        GroupStatsEntry::pack,
    )
}

/// One `ofp_group_desc` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDescEntry {
    pub group_type: u8,
    pub group_id: u32,
    pub buckets: BucketList,
}

impl GroupDescEntry {
    #[must_use]
    pub fn wire_len(&self) -> usize {
        8 + self.buckets.length().map_or(usize::MAX, usize::from)
    }

    pub fn pack(&self, buf: &mut Buffer) {
        buf.put_u16(self.wire_len() as u16);
        buf.put_u8(self.group_type);
        buf.put_zeros(1);
        buf.put_u32(self.group_id);
        let _ = self.buckets.pack(buf);
    }
}

#[must_use]
pub fn create_group_desc_multipart_reply(
    transaction_id: u32,
    flags: u16,
    entries: &[GroupDescEntry],
    cursor: &mut MultipartCursor,
) -> Buffer {
    chunked_reply(
        transaction_id,
        OFPMP_GROUP_DESC,
        flags,
        entries,
        cursor,
        GroupDescEntry::wire_len,
        GroupDescEntry::pack,
    )
}

#[must_use]
pub fn create_group_features_multipart_reply(
    transaction_id: u32,
    flags: u16,
    types: u32,
    capabilities: u32,
    max_groups: [u32; 4],
    actions: [u32; 4],
) -> Buffer {
    let length = (MULTIPART_HEADER_LEN + 40) as u16;
    let mut buf = create_multipart_reply(transaction_id, OFPMP_GROUP_FEATURES, flags, length);
    buf.put_u32(types);
    buf.put_u32(capabilities);
    for group in max_groups {
        buf.put_u32(group);
    }
    for action in actions {
        buf.put_u32(action);
    }
    buf
}

/// Per-band counters inside a meter-stats record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BandStats {
    pub packet_band_count: u64,
    pub byte_band_count: u64,
}

/// One `ofp_meter_stats` record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeterStatsEntry {
    pub meter_id: u32,
    pub flow_count: u32,
    pub packet_in_count: u64,
    pub byte_in_count: u64,
    pub duration_sec: u32,
    pub duration_nsec: u32,
    pub band_stats: Vec<BandStats>,
}

const METER_STATS_FIXED_LEN: usize = 40;

impl MeterStatsEntry {
    #[must_use]
    pub fn wire_len(&self) -> usize {
        METER_STATS_FIXED_LEN + self.band_stats.len() * 16
    }

    pub fn pack(&self, buf: &mut Buffer) {
        buf.put_u32(self.meter_id);
        buf.put_u16(self.wire_len() as u16);
        buf.put_zeros(6);
        buf.put_u32(self.flow_count);
        buf.put_u64(self.packet_in_count);
        buf.put_u64(self.byte_in_count);
        buf.put_u32(self.duration_sec);
        buf.put_u32(self.duration_nsec);
        for band in &self.band_stats {
            buf.put_u64(band.packet_band_count);
            buf.put_u64(band.byte_band_count);
        }
    }
}

#[must_use]
pub fn create_meter_multipart_reply(
    transaction_id: u32,
    flags: u16,
    entries: &[MeterStatsEntry],
    cursor: &mut MultipartCursor,
) -> Buffer {
    chunked_reply(
        transaction_id,
        OFPMP_METER,
        flags,
        entries,
        cursor,
        MeterStatsEntry::wire_len,
        MeterStatsEntry::pack,
    )
}

/// One `ofp_meter_config` record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MeterConfigEntry {
    pub flags: u16,
    pub meter_id: u32,
    pub bands: Vec<MeterBand>,
}

impl MeterConfigEntry {
    #[must_use]
    pub fn wire_len(&self) -> usize {
        8 + self.bands.len() * METER_BAND_LEN
    }

    pub fn pack(&self, buf: &mut Buffer) {
        buf.put_u16(self.wire_len() as u16);
        buf.put_u16(self.flags);
        buf.put_u32(self.meter_id);
        for band in &self.bands {
            band.pack(buf);
        }
    }
}

#[must_use]
pub fn create_meter_config_multipart_reply(
    transaction_id: u32,
    flags: u16,
    entries: &[MeterConfigEntry],
    cursor: &mut MultipartCursor,
) -> Buffer {
    chunked_reply(
        transaction_id,
        OFPMP_METER_CONFIG,
        flags,
        entries,
        cursor,
        MeterConfigEntry::wire_len,
        MeterConfigEntry::pack,
    )
}

#[must_use]
pub fn create_meter_features_multipart_reply(
    transaction_id: u32,
    flags: u16,
    max_meter: u32,
    band_types: u32,
    capabilities: u32,
    max_bands: u8,
    max_color: u8,
) -> Buffer {
    let length = (MULTIPART_HEADER_LEN + 16) as u16;
    let mut buf = create_multipart_reply(transaction_id, OFPMP_METER_FEATURES, flags, length);
    buf.put_u32(max_meter);
    buf.put_u32(band_types);
    buf.put_u32(capabilities);
    buf.put_u8(max_bands);
    buf.put_u8(max_color);
    buf.put_zeros(2);
    buf
}

/// One `ofp_table_features` entry; properties are carried as packed
/// bytes because the switch accepts and discards them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableFeaturesEntry {
    pub table_id: u8,
    pub name: String,
    pub metadata_match: u64,
    pub metadata_write: u64,
    pub config: u32,
    pub max_entries: u32,
    pub properties: Vec<u8>,
}

const TABLE_FEATURES_FIXED_LEN: usize = 64;
const TABLE_FEATURES_NAME_LEN: usize = 32;

impl TableFeaturesEntry {
    #[must_use]
    pub fn wire_len(&self) -> usize {
        TABLE_FEATURES_FIXED_LEN + self.properties.len()
    }

    pub fn pack(&self, buf: &mut Buffer) {
        buf.put_u16(self.wire_len() as u16);
        buf.put_u8(self.table_id);
        buf.put_zeros(5);
        put_desc_string(buf, &self.name, TABLE_FEATURES_NAME_LEN);
        buf.put_u64(self.metadata_match);
        buf.put_u64(self.metadata_write);
        buf.put_u32(self.config);
        buf.put_u32(self.max_entries);
        buf.put_bytes(&self.properties);
    }
}

#[must_use]
pub fn create_table_features_multipart_reply(
    transaction_id: u32,
    flags: u16,
    entries: &[TableFeaturesEntry],
    cursor: &mut MultipartCursor,
) -> Buffer {
    chunked_reply(
        transaction_id,
        OFPMP_TABLE_FEATURES,
        flags,
        entries,
        cursor,
        TableFeaturesEntry::wire_len,
        TableFeaturesEntry::pack,
    )
}

#[must_use]
pub fn create_port_desc_multipart_reply(
    transaction_id: u32,
    flags: u16,
    ports: &[PortDesc],
    cursor: &mut MultipartCursor,
) -> Buffer {
    chunked_reply(
        transaction_id,
        OFPMP_PORT_DESC,
        flags,
        ports,
        cursor,
        |_| PORT_DESC_LEN,
        |port, buf| port.pack(buf),
    )
}

#[must_use]
pub fn create_experimenter_multipart_reply(
    transaction_id: u32,
    flags: u16,
    experimenter: u32,
    exp_type: u32,
    data: Option<&[u8]>,
) -> Buffer {
    let data_len = data.map_or(0, <[u8]>::len);
    let length = (MULTIPART_HEADER_LEN + 8 + data_len) as u16;
    let mut buf = create_multipart_reply(transaction_id, OFPMP_EXPERIMENTER, flags, length);
    buf.put_u32(experimenter);
    buf.put_u32(exp_type);
    if let Some(data) = data {
        buf.put_bytes(data);
    }
    buf
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn flow_entry(priority: u16) -> FlowStatsEntry {
        let mut oxm_match = OxmMatch::new();
        oxm_match.append_in_port(u32::from(priority));
        FlowStatsEntry {
            table_id: 0,
            duration_sec: 1,
            duration_nsec: 2,
            priority,
            idle_timeout: 0,
            hard_timeout: 0,
            flags: 0,
            cookie: 0xdead,
            packet_count: 10,
            byte_count: 1000,
            oxm_match,
            instructions: InstructionList::new(),
        }
    }

    #[test]
    fn flow_reply_single_frame() {
        let entries = vec![flow_entry(1), flow_entry(2)];
        let mut cursor = MultipartCursor::new();
        let buf = create_flow_multipart_reply(9, 0, &entries, &mut cursor);
        assert!(!cursor.more);
        assert_eq!(cursor.offset, 2);
        // each record: 48 fixed + 16 padded match
        assert_eq!(buf.len(), 16 + 2 * 64);
        assert_eq!(buf.u16_at(8), OFPMP_FLOW);
        assert_eq!(buf.u16_at(10), 0);
        assert_eq!(buf.u16_at(16), 64);
    }

    #[test]
    fn flow_reply_chunks_past_u16_max() {
        // 64 bytes per record; ~1200 records exceed 65535
        let entries: Vec<FlowStatsEntry> = (0..1200).map(|i| flow_entry(i as u16)).collect();
        let mut cursor = MultipartCursor::new();
        let mut frames = Vec::new();
        loop {
            let buf = create_flow_multipart_reply(1, 0, &entries, &mut cursor);
            frames.push(buf);
            if !cursor.more {
                break;
            }
        }
        assert!(frames.len() >= 2);
        let mut total_records = 0usize;
        for (i, frame) in frames.iter().enumerate() {
            assert!(frame.len() <= u16::MAX as usize);
            assert_eq!(frame.u16_at(2) as usize, frame.len());
            let more = frame.u16_at(10) & OFPMPF_REPLY_MORE != 0;
            assert_eq!(more, i + 1 < frames.len());
            total_records += (frame.len() - 16) / 64;
        }
        assert_eq!(total_records, entries.len());
        assert_eq!(cursor.offset, entries.len());
    }

    #[test]
    fn empty_flow_reply_is_header_only() {
        let mut cursor = MultipartCursor::new();
        let buf = create_flow_multipart_reply(1, 0, &[], &mut cursor);
        assert_eq!(buf.len(), 16);
        assert!(!cursor.more);
    }

    #[test]
    fn desc_reply_is_fixed_width() {
        let buf = create_desc_multipart_reply(1, 0, "softflow", "", "0.0.1", "1", "test dp");
        assert_eq!(buf.len(), 16 + 1056);
        assert_eq!(&buf.as_slice()[16..24], b"softflow");
    }

    #[test]
    fn group_stats_wire_len_counts_buckets() {
        let entry = GroupStatsEntry {
            group_id: 1,
            bucket_stats: vec![BucketCounter::default(); 3],
            ..GroupStatsEntry::default()
        };
        assert_eq!(entry.wire_len(), 40 + 48);
        let mut buf = Buffer::new();
        entry.pack(&mut buf);
        assert_eq!(buf.len(), 88);
        assert_eq!(buf.u16_at(0), 88);
    }

    #[test]
    fn meter_stats_layout() {
        let entry = MeterStatsEntry {
            meter_id: 5,
            flow_count: 1,
            band_stats: vec![BandStats { packet_band_count: 7, byte_band_count: 70 }],
            ..MeterStatsEntry::default()
        };
        let mut buf = Buffer::new();
        entry.pack(&mut buf);
        assert_eq!(buf.len(), 56);
        assert_eq!(buf.u32_at(0), 5);
        assert_eq!(buf.u16_at(4), 56);
        assert_eq!(buf.u64_at(40), 7);
    }

    #[test]
    fn flow_request_carries_the_match() {
        let mut m = OxmMatch::new();
        m.append_eth_type(0x0800);
        let buf = create_flow_multipart_request(
            1,
            0,
            0xff,
            crate::consts::port_no::OFPP_ANY,
            crate::consts::group_no::OFPG_ANY,
            0,
            0,
            &m,
        );
        assert_eq!(buf.len(), 16 + 32 + m.padded_length());
        assert_eq!(buf.u16_at(8), OFPMP_FLOW);
        assert_eq!(buf.u8_at(16), 0xff);
        assert_eq!(buf.u16_at(48), crate::oxm::OFPMT_OXM);
    }
}
