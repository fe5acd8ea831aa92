// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! The engine facade.
//!
//! Tables live behind one `RwLock`; every public method locks
//! internally, so a `Datapath` can be shared through an `Arc` and
//! mutated from the protocol thread while the datapath thread runs
//! executions, expiry and event draining.

use std::collections::{BTreeMap, VecDeque};
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use net::parse_packet;
use openflow::actions::{Action, ActionList};
use openflow::consts::port_no::{
    OFPP_ALL, OFPP_CONTROLLER, OFPP_FLOOD, OFPP_IN_PORT, OFPP_MAX, OFPP_TABLE,
};
use openflow::consts::{
    Capabilities, FlowModFlags, GROUP_TYPE_BITS, MeterFlags, OFP_NO_BUFFER, OFPC_FRAG_MASK,
    OFPR_ACTION, OFPR_NO_MATCH, OFPTT_ALL, OFPTT_MAX, PortConfig,
};
use openflow::instructions::Instruction;
use openflow::msg::{
    FlowStatsEntry, GroupDescEntry, GroupStatsEntry, MeterConfigEntry, MeterStatsEntry,
    PortDesc, PortStatsEntry, TableStatsEntry,
};
use openflow::oxm::OxmMatch;

use crate::error::Ofdpe;
use crate::flow_table::{FlowEntry, FlowModOptions, FlowTable, Removal};
use crate::group_table::{GroupEntry, GroupTable};
use crate::match_builder::match_from_packet;
use crate::meter_table::{MeterEntry, MeterTable};
use crate::port::SwitchPort;

const N_TABLES: usize = 254;
const N_PACKET_BUFFERS: u32 = 256;
const MISS_COOKIE: u64 = u64::MAX;
const MAX_PIPELINE_DEPTH: usize = 8;

/// What `OFPT_FEATURES_REQUEST` reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchFeatures {
    pub datapath_id: u64,
    pub n_buffers: u32,
    pub n_tables: u8,
    pub auxiliary_id: u8,
    pub capabilities: Capabilities,
}

/// Mutable switch configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchConfig {
    pub flags: u16,
    pub miss_send_len: u16,
}

impl Default for SwitchConfig {
    fn default() -> SwitchConfig {
        SwitchConfig { flags: 0, miss_send_len: 128 }
    }
}

/// Payload of a PACKET_IN upcall.
#[derive(Debug, Clone)]
pub struct PacketInNotice {
    pub buffer_id: u32,
    pub total_len: u16,
    pub reason: u8,
    pub table_id: u8,
    pub cookie: u64,
    /// Clamp applied by the protocol worker when building the message.
    pub max_len: u16,
    pub oxm_match: OxmMatch,
    pub packet: Vec<u8>,
}

/// Payload of a FLOW_REMOVED upcall.
#[derive(Debug, Clone)]
pub struct FlowRemovedNotice {
    pub cookie: u64,
    pub priority: u16,
    pub reason: u8,
    pub table_id: u8,
    pub duration_sec: u32,
    pub duration_nsec: u32,
    pub idle_timeout: u16,
    pub hard_timeout: u16,
    pub packet_count: u64,
    pub byte_count: u64,
    pub oxm_match: OxmMatch,
}

/// Engine-to-protocol upcalls.
#[derive(Debug, Clone)]
pub enum AsyncEvent {
    PacketIn(PacketInNotice),
    FlowRemoved(FlowRemovedNotice),
    PortStatus { reason: u8, desc: PortDesc },
}

/// A packet-out waiting for the datapath thread.
#[derive(Debug, Clone)]
pub struct PendingExecution {
    pub in_port: u32,
    pub actions: ActionList,
    pub frame: Vec<u8>,
}

struct Inner {
    config: SwitchConfig,
    tables: Vec<FlowTable>,
    table_configs: Vec<u32>,
    groups: GroupTable,
    meters: MeterTable,
    ports: BTreeMap<u32, SwitchPort>,
    next_port_no: u32,
    buffers: BTreeMap<u32, Option<Vec<u8>>>,
    next_buffer_id: u32,
    pending: VecDeque<PendingExecution>,
    events: VecDeque<AsyncEvent>,
    max_flow_entries: usize,
}

/// The flow engine.
pub struct Datapath {
    datapath_id: u64,
    inner: RwLock<Inner>,
}

impl Datapath {
    #[must_use]
    pub fn new(datapath_id: u64, max_flow_entries: usize) -> Datapath {
        let mut tables = Vec::with_capacity(N_TABLES);
        tables.resize_with(N_TABLES, FlowTable::default);
        Datapath {
            datapath_id,
            inner: RwLock::new(Inner {
                config: SwitchConfig::default(),
                tables,
                table_configs: vec![0; N_TABLES],
                groups: GroupTable::default(),
                meters: MeterTable::default(),
                ports: BTreeMap::new(),
                next_port_no: 1,
                buffers: BTreeMap::new(),
                next_buffer_id: 1,
                pending: VecDeque::new(),
                events: VecDeque::new(),
                max_flow_entries,
            }),
        }
    }

    #[must_use]
    pub fn features(&self) -> SwitchFeatures {
        SwitchFeatures {
            datapath_id: self.datapath_id,
            n_buffers: N_PACKET_BUFFERS,
            n_tables: N_TABLES as u8,
            auxiliary_id: 0,
            capabilities: Capabilities::FLOW_STATS
                | Capabilities::TABLE_STATS
                | Capabilities::PORT_STATS
                | Capabilities::GROUP_STATS
                | Capabilities::QUEUE_STATS,
        }
    }

    #[must_use]
    pub fn config(&self) -> SwitchConfig {
        self.inner.read().config
    }

    pub fn set_config(&self, config: SwitchConfig) -> Result<(), Ofdpe> {
        if config.flags > OFPC_FRAG_MASK {
            return Err(Ofdpe::InvalidSwitchConfig);
        }
        self.inner.write().config = config;
        Ok(())
    }

    pub fn set_flow_table_config(&self, table_id: u8, config: u32) -> Result<(), Ofdpe> {
        let mut inner = self.inner.write();
        if table_id == OFPTT_ALL {
            for slot in &mut inner.table_configs {
                *slot = config;
            }
            return Ok(());
        }
        if table_id > OFPTT_MAX {
            return Err(Ofdpe::InvalidTableId);
        }
        inner.table_configs[usize::from(table_id)] = config;
        Ok(())
    }

    pub fn add_flow_entry(&self, table_id: u8, entry: FlowEntry) -> Result<(), Ofdpe> {
        if table_id > OFPTT_MAX {
            return Err(Ofdpe::InvalidTableId);
        }
        let mut inner = self.inner.write();
        let max = inner.max_flow_entries;
        inner.tables[usize::from(table_id)].add(entry, max)
    }

    /// Modify matching entries' instructions; add the entry when nothing
    /// matched, the way the original's update-or-add path behaves.
    pub fn update_or_add_flow_entry(
        &self,
        table_id: u8,
        oxm_match: &OxmMatch,
        options: FlowModOptions,
        idle_timeout: u16,
        hard_timeout: u16,
        flags: FlowModFlags,
        instructions: &openflow::instructions::InstructionList,
    ) -> Result<(), Ofdpe> {
        if table_id > OFPTT_MAX {
            return Err(Ofdpe::InvalidTableId);
        }
        let mut inner = self.inner.write();
        let updated =
            inner.tables[usize::from(table_id)].update(oxm_match, options, instructions);
        if updated == 0 {
            let entry = FlowEntry::new(
                oxm_match.clone(),
                instructions.clone(),
                options.priority,
                idle_timeout,
                hard_timeout,
                flags,
                options.cookie,
            );
            let max = inner.max_flow_entries;
            return inner.tables[usize::from(table_id)].add(entry, max);
        }
        Ok(())
    }

    pub fn delete_flow_entries(
        &self,
        table_id: u8,
        oxm_match: &OxmMatch,
        options: FlowModOptions,
    ) -> Result<(), Ofdpe> {
        let mut inner = self.inner.write();
        let mut removals: Vec<(u8, Removal)> = Vec::new();
        if table_id == OFPTT_ALL {
            for (id, table) in inner.tables.iter_mut().enumerate() {
                for removal in table.delete(oxm_match, options) {
                    removals.push((id as u8, removal));
                }
            }
        } else {
            if table_id > OFPTT_MAX {
                return Err(Ofdpe::InvalidTableId);
            }
            for removal in inner.tables[usize::from(table_id)].delete(oxm_match, options) {
                removals.push((table_id, removal));
            }
        }
        for (id, removal) in removals {
            inner.notify_removed(id, removal);
        }
        Ok(())
    }

    pub fn flow_stats(
        &self,
        table_id: u8,
        oxm_match: &OxmMatch,
        options: FlowModOptions,
    ) -> Vec<FlowStatsEntry> {
        let inner = self.inner.read();
        if table_id == OFPTT_ALL {
            inner
                .tables
                .iter()
                .enumerate()
                .flat_map(|(id, table)| table.stats(id as u8, oxm_match, options))
                .collect()
        } else if table_id > OFPTT_MAX {
            Vec::new()
        } else {
            inner.tables[usize::from(table_id)].stats(table_id, oxm_match, options)
        }
    }

    /// `(packet_count, byte_count, flow_count)` over the matching flows.
    pub fn aggregate_stats(
        &self,
        table_id: u8,
        oxm_match: &OxmMatch,
        options: FlowModOptions,
    ) -> (u64, u64, u32) {
        let stats = self.flow_stats(table_id, oxm_match, options);
        let packets = stats.iter().map(|s| s.packet_count).sum();
        let bytes = stats.iter().map(|s| s.byte_count).sum();
        (packets, bytes, stats.len() as u32)
    }

    pub fn table_stats(&self) -> Vec<TableStatsEntry> {
        let inner = self.inner.read();
        inner
            .tables
            .iter()
            .enumerate()
            .map(|(id, table)| TableStatsEntry {
                table_id: id as u8,
                active_count: table.active_count() as u32,
                lookup_count: table.lookup_count,
                matched_count: table.matched_count,
            })
            .collect()
    }

    pub fn add_group(&self, entry: GroupEntry) -> Result<(), Ofdpe> {
        self.inner.write().groups.add(entry)
    }

    pub fn modify_group(&self, entry: GroupEntry) -> Result<(), Ofdpe> {
        self.inner.write().groups.modify(entry)
    }

    pub fn delete_group(&self, group_id: u32) -> Result<(), Ofdpe> {
        self.inner.write().groups.delete(group_id)
    }

    pub fn group_stats(&self, group_id: u32) -> Vec<GroupStatsEntry> {
        self.inner.read().groups.stats(group_id)
    }

    pub fn group_descriptions(&self) -> Vec<GroupDescEntry> {
        self.inner.read().groups.descriptions()
    }

    /// `(types, capabilities, max_groups, actions)` for group features.
    #[must_use]
    pub fn group_features(&self) -> (u32, u32, [u32; 4], [u32; 4]) {
        (GROUP_TYPE_BITS, 0, [4096; 4], [0; 4])
    }

    pub fn add_meter(&self, entry: MeterEntry) -> Result<(), Ofdpe> {
        self.inner.write().meters.add(entry)
    }

    pub fn modify_meter(&self, entry: MeterEntry) -> Result<(), Ofdpe> {
        self.inner.write().meters.modify(entry)
    }

    pub fn delete_meter(&self, meter_id: u32) -> Result<(), Ofdpe> {
        self.inner.write().meters.delete(meter_id)
    }

    pub fn meter_stats(&self, meter_id: u32) -> Vec<MeterStatsEntry> {
        self.inner.read().meters.stats(meter_id)
    }

    pub fn meter_configs(&self, meter_id: u32) -> Vec<MeterConfigEntry> {
        self.inner.read().meters.configs(meter_id)
    }

    /// `(max_meter, band_types, capabilities, max_bands, max_color)`.
    #[must_use]
    pub fn meter_features(&self) -> (u32, u32, u32, u8, u8) {
        let band_types = (1 << openflow::consts::OFPMBT_DROP)
            | (1 << openflow::consts::OFPMBT_DSCP_REMARK);
        (1024, band_types, MeterFlags::all().bits() as u32, 16, 0)
    }

    /// Attach a logical port; 0 picks the next free number.
    pub fn add_port(&self, port_no: u32, device_name: &str) -> Result<u32, Ofdpe> {
        let mut inner = self.inner.write();
        let port_no = if port_no == 0 {
            let assigned = inner.next_port_no;
            inner.next_port_no += 1;
            assigned
        } else {
            if port_no > OFPP_MAX {
                return Err(Ofdpe::PortNotFound);
            }
            if inner.ports.contains_key(&port_no) {
                return Err(Ofdpe::PortExists);
            }
            inner.next_port_no = inner.next_port_no.max(port_no + 1);
            port_no
        };

        let port = SwitchPort::new(port_no, device_name);
        let desc = port.description();
        inner.ports.insert(port_no, port);
        inner.events.push_back(AsyncEvent::PortStatus {
            reason: openflow::consts::OFPPR_ADD,
            desc,
        });
        info!("attached port {port_no} ( device = {device_name} )");
        Ok(port_no)
    }

    pub fn update_port(&self, port_no: u32, config: u32, mask: u32) -> Result<(), Ofdpe> {
        let mut inner = self.inner.write();
        let port = inner.ports.get_mut(&port_no).ok_or(Ofdpe::PortNotFound)?;
        let mask = PortConfig::from_bits_truncate(mask);
        let config = PortConfig::from_bits_truncate(config);
        port.config = (port.config & !mask) | (config & mask);
        let desc = port.description();
        inner.events.push_back(AsyncEvent::PortStatus {
            reason: openflow::consts::OFPPR_MODIFY,
            desc,
        });
        Ok(())
    }

    pub fn port_stats(&self, port_no: u32) -> Vec<PortStatsEntry> {
        let inner = self.inner.read();
        match port_no {
            openflow::consts::port_no::OFPP_ANY | OFPP_ALL => {
                inner.ports.values().map(SwitchPort::stats).collect()
            }
            no => inner.ports.get(&no).map(SwitchPort::stats).into_iter().collect(),
        }
    }

    pub fn port_descriptions(&self) -> Vec<PortDesc> {
        self.inner.read().ports.values().map(SwitchPort::description).collect()
    }

    /// Stash a frame for a later packet-out; `None` when the pool is
    /// exhausted.
    pub fn buffer_packet(&self, frame: Vec<u8>) -> Option<u32> {
        let mut inner = self.inner.write();
        if inner.buffers.len() as u32 >= N_PACKET_BUFFERS {
            return None;
        }
        let id = inner.next_buffer_id;
        inner.next_buffer_id = inner.next_buffer_id.wrapping_add(1).max(1);
        inner.buffers.insert(id, Some(frame));
        Some(id)
    }

    /// Resolve the frame of a packet-out: the buffer pool (consuming the
    /// buffer) or the caller-supplied bytes.
    pub fn resolve_packet_out(
        &self,
        buffer_id: u32,
        frame: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, Ofdpe> {
        if buffer_id == OFP_NO_BUFFER {
            return frame.ok_or(Ofdpe::Failed);
        }
        let mut inner = self.inner.write();
        match inner.buffers.get_mut(&buffer_id) {
            None => Err(Ofdpe::BufferUnknown),
            Some(slot) => slot.take().ok_or(Ofdpe::BufferEmpty),
        }
    }

    /// Queue a packet execution for [`Datapath::run_pending_executions`].
    pub fn execute_packet_out(
        &self,
        buffer_id: u32,
        in_port: u32,
        actions: ActionList,
        frame: Option<Vec<u8>>,
    ) -> Result<(), Ofdpe> {
        let frame = self.resolve_packet_out(buffer_id, frame)?;
        let mut inner = self.inner.write();
        inner.pending.push_back(PendingExecution { in_port, actions, frame });
        Ok(())
    }

    /// Datapath-thread entry point: drain and run queued executions.
    pub fn run_pending_executions(&self) {
        loop {
            let execution = {
                let mut inner = self.inner.write();
                inner.pending.pop_front()
            };
            match execution {
                None => break,
                Some(execution) => self.run_execution(&execution),
            }
        }
    }

    /// Datapath-thread entry point: run one packet execution.
    pub fn run_execution(&self, execution: &PendingExecution) {
        let mut inner = self.inner.write();
        for action in execution.actions.iter() {
            if let Action::Output { port, max_len } = action {
                inner.output(*port, *max_len, execution.in_port, &execution.frame, 0);
            }
            // packet rewrites are out of scope for the logical ports
        }
    }

    /// Datapath-thread entry point: expire flows on a timer tick.
    pub fn expire_flow_entries(&self) {
        let now = Instant::now();
        let mut inner = self.inner.write();
        let mut removals: Vec<(u8, Removal)> = Vec::new();
        for (id, table) in inner.tables.iter_mut().enumerate() {
            for removal in table.expire(now) {
                removals.push((id as u8, removal));
            }
        }
        for (id, removal) in removals {
            inner.notify_removed(id, removal);
        }
    }

    /// Drain queued upcalls.
    pub fn take_events(&self) -> Vec<AsyncEvent> {
        self.inner.write().events.drain(..).collect()
    }

    #[must_use]
    pub fn has_events(&self) -> bool {
        !self.inner.read().events.is_empty()
    }

    /// SIGUSR1 target: log the active flow entries.
    pub fn dump_flow_tables(&self) {
        let inner = self.inner.read();
        for (id, table) in inner.tables.iter().enumerate() {
            for entry in table.entries() {
                info!(
                    "table {id}: priority = {}, cookie = {:#x}, packets = {}, bytes = {}, match = {:?}",
                    entry.priority, entry.cookie, entry.packet_count, entry.byte_count,
                    entry.oxm_match
                );
            }
        }
    }

    /// SIGUSR2 target: log the group table.
    pub fn dump_group_table(&self) {
        let inner = self.inner.read();
        for group in inner.groups.entries() {
            info!(
                "group {}: type = {}, buckets = {}, ref_count = {}",
                group.group_id,
                group.group_type,
                group.buckets.n_buckets(),
                group.ref_count
            );
        }
    }

    #[must_use]
    pub fn group_exists(&self, group_id: u32) -> bool {
        self.inner.read().groups.contains(group_id)
    }
}

impl Inner {
    fn notify_removed(&mut self, table_id: u8, removal: Removal) {
        if !removal.entry.flags.contains(FlowModFlags::SEND_FLOW_REM) {
            return;
        }
        let duration = removal.entry.duration();
        self.events.push_back(AsyncEvent::FlowRemoved(FlowRemovedNotice {
            cookie: removal.entry.cookie,
            priority: removal.entry.priority,
            reason: removal.reason,
            table_id,
            duration_sec: duration.as_secs() as u32,
            duration_nsec: duration.subsec_nanos(),
            idle_timeout: removal.entry.idle_timeout,
            hard_timeout: removal.entry.hard_timeout,
            packet_count: removal.entry.packet_count,
            byte_count: removal.entry.byte_count,
            oxm_match: removal.entry.oxm_match,
        }));
    }

    fn output(&mut self, port: u32, max_len: u16, in_port: u32, frame: &[u8], depth: usize) {
        match port {
            OFPP_TABLE => self.run_pipeline(in_port, frame, depth),
            OFPP_CONTROLLER => self.packet_in(OFPR_ACTION, 0, MISS_COOKIE, max_len, in_port, frame),
            OFPP_ALL | OFPP_FLOOD => {
                let targets: Vec<u32> =
                    self.ports.keys().copied().filter(|no| *no != in_port).collect();
                for no in targets {
                    self.transmit(no, frame);
                }
            }
            OFPP_IN_PORT => self.transmit(in_port, frame),
            no if no <= OFPP_MAX => self.transmit(no, frame),
            no => debug!("unsupported output port {no:#x}"),
        }
    }

    fn transmit(&mut self, port_no: u32, frame: &[u8]) {
        match self.ports.get_mut(&port_no) {
            None => debug!("output to unknown port {port_no}"),
            Some(port) => port.transmit(frame.len()),
        }
    }

    /// Route a frame through the tables starting at table 0.
    fn run_pipeline(&mut self, in_port: u32, frame: &[u8], depth: usize) {
        if depth >= MAX_PIPELINE_DEPTH {
            warn!("pipeline recursion limit reached");
            return;
        }

        let info = parse_packet(frame);
        let packet_match = match_from_packet(in_port, None, &info);

        let mut table_id = 0u8;
        loop {
            let hit = {
                let table = &mut self.tables[usize::from(table_id)];
                table.lookup(&packet_match).map(|entry| {
                    entry.touch(frame.len());
                    (entry.instructions.clone(), entry.cookie)
                })
            };
            let Some((instructions, cookie)) = hit else {
                let miss_len = self.config.miss_send_len;
                if miss_len > 0 {
                    self.packet_in(OFPR_NO_MATCH, table_id, MISS_COOKIE, miss_len, in_port, frame);
                }
                return;
            };

            let mut next_table = None;
            for instruction in instructions.iter() {
                match instruction {
                    Instruction::ApplyActions { actions }
                    | Instruction::WriteActions { actions } => {
                        for action in actions.iter() {
                            match action {
                                Action::Output { port, max_len } if *port == OFPP_CONTROLLER => {
                                    self.packet_in(
                                        OFPR_ACTION, table_id, cookie, *max_len, in_port, frame,
                                    );
                                }
                                Action::Output { port, max_len } => {
                                    self.output(*port, *max_len, in_port, frame, depth + 1);
                                }
                                _ => {}
                            }
                        }
                    }
                    Instruction::GotoTable { table_id: next } => next_table = Some(*next),
                    _ => {}
                }
            }

            match next_table {
                Some(next) if next > table_id && next <= OFPTT_MAX => table_id = next,
                Some(next) => {
                    warn!("goto-table to a non-forward table {next}");
                    return;
                }
                None => return,
            }
        }
    }

    fn packet_in(
        &mut self,
        reason: u8,
        table_id: u8,
        cookie: u64,
        max_len: u16,
        in_port: u32,
        frame: &[u8],
    ) {
        if let Some(port) = self.ports.get(&in_port) {
            if port.config.contains(PortConfig::NO_PACKET_IN) {
                return;
            }
        }

        let buffer_id = if self.buffers.len() as u32 >= N_PACKET_BUFFERS {
            OFP_NO_BUFFER
        } else {
            let id = self.next_buffer_id;
            self.next_buffer_id = self.next_buffer_id.wrapping_add(1).max(1);
            self.buffers.insert(id, Some(frame.to_vec()));
            id
        };

        let info = parse_packet(frame);
        let oxm_match = match_from_packet(in_port, None, &info);
        self.events.push_back(AsyncEvent::PacketIn(PacketInNotice {
            buffer_id,
            total_len: frame.len() as u16,
            reason,
            table_id,
            cookie,
            max_len,
            oxm_match,
            packet: frame.to_vec(),
        }));
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use openflow::consts::port_no::OFPP_ANY;
    use openflow::consts::group_no::OFPG_ANY;
    use openflow::instructions::InstructionList;

    fn any() -> FlowModOptions {
        FlowModOptions {
            cookie: 0,
            cookie_mask: 0,
            priority: 0,
            out_port: OFPP_ANY,
            out_group: OFPG_ANY,
            strict: false,
        }
    }

    fn udp_frame() -> Vec<u8> {
        let mut frame = vec![0u8; 60];
        frame[12..14].copy_from_slice(&0x0800u16.to_be_bytes());
        frame[14] = 0x45;
        frame[23] = 17;
        frame[26..30].copy_from_slice(&[10, 0, 0, 1]);
        frame[30..34].copy_from_slice(&[10, 0, 0, 2]);
        frame[34..36].copy_from_slice(&1000u16.to_be_bytes());
        frame[36..38].copy_from_slice(&2000u16.to_be_bytes());
        frame
    }

    #[test]
    fn table_miss_raises_a_packet_in() {
        let dp = Datapath::new(0x1, 16);
        dp.add_port(1, "p1").unwrap();
        dp.add_port(2, "p2").unwrap();
        let _ = dp.take_events(); // drop the port-status noise

        let mut actions = ActionList::new();
        actions.append_output(OFPP_TABLE, 0xffff);
        dp.execute_packet_out(OFP_NO_BUFFER, 1, actions, Some(udp_frame())).unwrap();
        dp.run_pending_executions();

        let events = dp.take_events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            AsyncEvent::PacketIn(notice) => {
                assert_eq!(notice.reason, OFPR_NO_MATCH);
                assert_eq!(notice.table_id, 0);
                assert_eq!(notice.cookie, MISS_COOKIE);
                assert_eq!(notice.packet.len(), 60);
                assert!(notice.buffer_id != OFP_NO_BUFFER);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn matching_flow_forwards_and_counts() {
        let dp = Datapath::new(0x1, 16);
        dp.add_port(1, "p1").unwrap();
        dp.add_port(2, "p2").unwrap();
        let _ = dp.take_events();

        let mut m = OxmMatch::new();
        m.append_eth_type(0x0800);
        m.append_ip_proto(17);
        let mut out = ActionList::new();
        out.append_output(2, 0xffff);
        let instructions: InstructionList =
            [Instruction::ApplyActions { actions: out }].into_iter().collect();
        dp.add_flow_entry(
            0,
            FlowEntry::new(m.clone(), instructions, 10, 0, 0, FlowModFlags::empty(), 0xc),
        )
        .unwrap();

        let mut actions = ActionList::new();
        actions.append_output(OFPP_TABLE, 0xffff);
        dp.execute_packet_out(OFP_NO_BUFFER, 1, actions, Some(udp_frame())).unwrap();
        dp.run_pending_executions();

        assert!(dp.take_events().is_empty());
        let stats = dp.flow_stats(0, &OxmMatch::new(), any());
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].packet_count, 1);
        assert_eq!(stats[0].byte_count, 60);
        let port_stats = dp.port_stats(2);
        assert_eq!(port_stats[0].tx_packets, 1);
    }

    #[test]
    fn delete_with_send_flow_rem_raises_the_upcall() {
        let dp = Datapath::new(0x1, 16);
        let mut m = OxmMatch::new();
        m.append_eth_type(0x0806);
        dp.add_flow_entry(
            3,
            FlowEntry::new(
                m.clone(),
                InstructionList::new(),
                7,
                0,
                0,
                FlowModFlags::SEND_FLOW_REM,
                0xfeed,
            ),
        )
        .unwrap();

        dp.delete_flow_entries(OFPTT_ALL, &OxmMatch::new(), any()).unwrap();
        let events = dp.take_events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            AsyncEvent::FlowRemoved(notice) => {
                assert_eq!(notice.cookie, 0xfeed);
                assert_eq!(notice.table_id, 3);
                assert_eq!(notice.reason, openflow::consts::OFPRR_DELETE);
                assert!(notice.oxm_match.strict_eq(&m));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn buffered_packet_out_consumes_the_buffer() {
        let dp = Datapath::new(0x1, 16);
        let id = dp.buffer_packet(udp_frame()).unwrap();
        let mut actions = ActionList::new();
        actions.append_output(OFPP_TABLE, 0xffff);
        dp.execute_packet_out(id, 1, actions.clone(), None).unwrap();
        assert_eq!(
            dp.execute_packet_out(id, 1, actions.clone(), None),
            Err(Ofdpe::BufferEmpty)
        );
        assert_eq!(
            dp.execute_packet_out(0xdead, 1, actions, None),
            Err(Ofdpe::BufferUnknown)
        );
    }

    #[test]
    fn port_updates_raise_port_status() {
        let dp = Datapath::new(0x1, 16);
        dp.add_port(1, "p1").unwrap();
        let _ = dp.take_events();
        dp.update_port(1, PortConfig::PORT_DOWN.bits(), PortConfig::PORT_DOWN.bits())
            .unwrap();
        let events = dp.take_events();
        assert_eq!(events.len(), 1);
        match &events[0] {
            AsyncEvent::PortStatus { reason, desc } => {
                assert_eq!(*reason, openflow::consts::OFPPR_MODIFY);
                assert_eq!(desc.config, PortConfig::PORT_DOWN.bits());
            }
            other => panic!("unexpected event {other:?}"),
        }
        assert_eq!(dp.update_port(9, 0, 0), Err(Ofdpe::PortNotFound));
    }
}
