// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! A single flow table: ordered entries, lifecycle, stats.

use std::time::{Duration, Instant};

use openflow::consts::{FlowModFlags, OFPRR_DELETE, OFPRR_HARD_TIMEOUT, OFPRR_IDLE_TIMEOUT};
use openflow::consts::group_no::OFPG_ANY;
use openflow::consts::port_no::OFPP_ANY;
use openflow::actions::Action;
use openflow::instructions::{Instruction, InstructionList};
use openflow::msg::FlowStatsEntry;
use openflow::oxm::OxmMatch;
use tracing::debug;

use crate::error::Ofdpe;

/// One installed flow entry.
#[derive(Debug, Clone)]
pub struct FlowEntry {
    pub oxm_match: OxmMatch,
    pub priority: u16,
    pub idle_timeout: u16,
    pub hard_timeout: u16,
    pub flags: FlowModFlags,
    pub cookie: u64,
    pub instructions: InstructionList,
    pub packet_count: u64,
    pub byte_count: u64,
    created_at: Instant,
    last_used: Instant,
}

impl FlowEntry {
    #[must_use]
    pub fn new(
        oxm_match: OxmMatch,
        instructions: InstructionList,
        priority: u16,
        idle_timeout: u16,
        hard_timeout: u16,
        flags: FlowModFlags,
        cookie: u64,
    ) -> FlowEntry {
        let now = Instant::now();
        FlowEntry {
            oxm_match,
            priority,
            idle_timeout,
            hard_timeout,
            flags,
            cookie,
            instructions,
            packet_count: 0,
            byte_count: 0,
            created_at: now,
            last_used: now,
        }
    }

    #[must_use]
    pub fn duration(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn touch(&mut self, bytes: usize) {
        self.last_used = Instant::now();
        self.packet_count += 1;
        self.byte_count += bytes as u64;
    }

    fn expired(&self, now: Instant) -> Option<u8> {
        if self.hard_timeout != 0
            && now.duration_since(self.created_at) >= Duration::from_secs(self.hard_timeout.into())
        {
            return Some(OFPRR_HARD_TIMEOUT);
        }
        if self.idle_timeout != 0
            && now.duration_since(self.last_used) >= Duration::from_secs(self.idle_timeout.into())
        {
            return Some(OFPRR_IDLE_TIMEOUT);
        }
        None
    }

    /// Whether the entry's actions reference the given output port.
    fn outputs_to(&self, port: u32) -> bool {
        if port == OFPP_ANY {
            return true;
        }
        self.instructions.iter().any(|instruction| match instruction {
            Instruction::WriteActions { actions } | Instruction::ApplyActions { actions } => {
                actions.iter().any(
                    |action| matches!(action, Action::Output { port: p, .. } if *p == port),
                )
            }
            _ => false,
        })
    }

    /// Whether the entry's actions reference the given group.
    fn points_to_group(&self, group: u32) -> bool {
        if group == OFPG_ANY {
            return true;
        }
        self.instructions.iter().any(|instruction| match instruction {
            Instruction::WriteActions { actions } | Instruction::ApplyActions { actions } => {
                actions
                    .iter()
                    .any(|action| matches!(action, Action::Group { group_id } if *group_id == group))
            }
            _ => false,
        })
    }

    fn cookie_matches(&self, cookie: u64, cookie_mask: u64) -> bool {
        cookie_mask == 0 || (self.cookie & cookie_mask) == (cookie & cookie_mask)
    }

    fn stats(&self, table_id: u8) -> FlowStatsEntry {
        let duration = self.duration();
        FlowStatsEntry {
            table_id,
            duration_sec: duration.as_secs() as u32,
            duration_nsec: duration.subsec_nanos(),
            priority: self.priority,
            idle_timeout: self.idle_timeout,
            hard_timeout: self.hard_timeout,
            flags: self.flags.bits(),
            cookie: self.cookie,
            packet_count: self.packet_count,
            byte_count: self.byte_count,
            oxm_match: self.oxm_match.clone(),
            instructions: self.instructions.clone(),
        }
    }
}

/// Selection options shared by the modify and delete paths.
#[derive(Debug, Clone, Copy)]
pub struct FlowModOptions {
    pub cookie: u64,
    pub cookie_mask: u64,
    pub priority: u16,
    pub out_port: u32,
    pub out_group: u32,
    pub strict: bool,
}

/// A removal produced by delete or expiry, before it is turned into a
/// FLOW_REMOVED message.
#[derive(Debug, Clone)]
pub(crate) struct Removal {
    pub entry: FlowEntry,
    pub reason: u8,
}

/// One flow table; the datapath owns an array of these.
#[derive(Debug, Default)]
pub(crate) struct FlowTable {
    entries: Vec<FlowEntry>,
    pub lookup_count: u64,
    pub matched_count: u64,
}

impl FlowTable {
    pub fn active_count(&self) -> usize {
        self.entries.len()
    }

    pub fn add(&mut self, entry: FlowEntry, max_entries: usize) -> Result<(), Ofdpe> {
        if self.entries.len() >= max_entries {
            return Err(Ofdpe::TableFull);
        }
        if entry.flags.contains(FlowModFlags::CHECK_OVERLAP)
            && self.entries.iter().any(|existing| {
                existing.priority == entry.priority
                    && (existing.oxm_match.subsumes(&entry.oxm_match)
                        || entry.oxm_match.subsumes(&existing.oxm_match))
            })
        {
            return Err(Ofdpe::Overlap);
        }

        // identical match and priority replaces the old entry, counters
        // reset unless told otherwise
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|e| e.priority == entry.priority && e.oxm_match.strict_eq(&entry.oxm_match))
        {
            let keep_counts = !entry.flags.contains(FlowModFlags::RESET_COUNTS);
            let (packets, bytes) = (existing.packet_count, existing.byte_count);
            *existing = entry;
            if keep_counts {
                existing.packet_count = packets;
                existing.byte_count = bytes;
            }
            return Ok(());
        }

        debug!(
            "adding a flow entry ( priority = {}, cookie = {:#x} )",
            entry.priority, entry.cookie
        );
        self.entries.push(entry);
        self.entries.sort_by(|a, b| b.priority.cmp(&a.priority));
        Ok(())
    }

    /// Update instructions of matching entries; returns how many matched.
    pub fn update(
        &mut self,
        oxm_match: &OxmMatch,
        options: FlowModOptions,
        instructions: &InstructionList,
    ) -> usize {
        let mut updated = 0;
        for entry in &mut self.entries {
            if !entry.cookie_matches(options.cookie, options.cookie_mask) {
                continue;
            }
            let selected = if options.strict {
                entry.priority == options.priority && entry.oxm_match.strict_eq(oxm_match)
            } else {
                oxm_match.subsumes(&entry.oxm_match)
            };
            if selected {
                entry.instructions = instructions.clone();
                updated += 1;
            }
        }
        updated
    }

    pub fn delete(&mut self, oxm_match: &OxmMatch, options: FlowModOptions) -> Vec<Removal> {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            let selected = entry.cookie_matches(options.cookie, options.cookie_mask)
                && entry.outputs_to(options.out_port)
                && entry.points_to_group(options.out_group)
                && if options.strict {
                    entry.priority == options.priority && entry.oxm_match.strict_eq(oxm_match)
                } else {
                    oxm_match.subsumes(&entry.oxm_match)
                };
            if selected {
                removed.push(Removal { entry, reason: OFPRR_DELETE });
            } else {
                kept.push(entry);
            }
        }
        self.entries = kept;
        removed
    }

    pub fn expire(&mut self, now: Instant) -> Vec<Removal> {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            match entry.expired(now) {
                Some(reason) => removed.push(Removal { entry, reason }),
                None => kept.push(entry),
            }
        }
        self.entries = kept;
        removed
    }

    /// Highest-priority entry matching the concrete packet match.
    pub fn lookup(&mut self, packet_match: &OxmMatch) -> Option<&mut FlowEntry> {
        self.lookup_count += 1;
        let hit = self
            .entries
            .iter_mut()
            .find(|entry| entry.oxm_match.subsumes(packet_match));
        if hit.is_some() {
            self.matched_count += 1;
        }
        hit
    }

    pub fn stats(
        &self,
        table_id: u8,
        oxm_match: &OxmMatch,
        options: FlowModOptions,
    ) -> Vec<FlowStatsEntry> {
        self.entries
            .iter()
            .filter(|entry| {
                entry.cookie_matches(options.cookie, options.cookie_mask)
                    && entry.outputs_to(options.out_port)
                    && entry.points_to_group(options.out_group)
                    && oxm_match.subsumes(&entry.oxm_match)
            })
            .map(|entry| entry.stats(table_id))
            .collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &FlowEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn entry(priority: u16, port: u16) -> FlowEntry {
        let mut m = OxmMatch::new();
        m.append_eth_type(0x0800);
        m.append_ip_proto(6);
        m.append_tcp_dst(port);
        FlowEntry::new(
            m,
            InstructionList::new(),
            priority,
            0,
            0,
            FlowModFlags::empty(),
            0,
        )
    }

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

    #[test]
    fn add_is_bounded_by_max_entries() {
        let mut table = FlowTable::default();
        table.add(entry(1, 80), 2).unwrap();
        table.add(entry(1, 81), 2).unwrap();
        assert_eq!(table.add(entry(1, 82), 2), Err(Ofdpe::TableFull));
        assert_eq!(table.active_count(), 2);
    }

    #[test]
    fn lookup_prefers_higher_priority() {
        let mut table = FlowTable::default();
        let mut wide = OxmMatch::new();
        wide.append_eth_type(0x0800);
        table
            .add(
                FlowEntry::new(
                    wide, InstructionList::new(), 1, 0, 0, FlowModFlags::empty(), 0xaa,
                ),
                16,
            )
            .unwrap();
        table.add(entry(100, 80), 16).unwrap();

        let mut concrete = OxmMatch::new();
        concrete.append_eth_type(0x0800);
        concrete.append_ip_proto(6);
        concrete.append_tcp_dst(80);
        let hit = table.lookup(&concrete).unwrap();
        assert_eq!(hit.priority, 100);
        assert_eq!(table.lookup_count, 1);
        assert_eq!(table.matched_count, 1);
    }

    #[test]
    fn strict_delete_requires_exact_match_and_priority() {
        let mut table = FlowTable::default();
        table.add(entry(10, 80), 16).unwrap();
        table.add(entry(20, 80), 16).unwrap();

        let target = entry(10, 80);
        let removed = table.delete(
            &target.oxm_match,
            FlowModOptions { priority: 10, strict: true, ..any() },
        );
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].entry.priority, 10);
        assert_eq!(table.active_count(), 1);
    }

    #[test]
    fn loose_delete_uses_subsumption() {
        let mut table = FlowTable::default();
        table.add(entry(10, 80), 16).unwrap();
        table.add(entry(20, 443), 16).unwrap();

        let mut wide = OxmMatch::new();
        wide.append_eth_type(0x0800);
        let removed = table.delete(&wide, any());
        assert_eq!(removed.len(), 2);
        assert_eq!(table.active_count(), 0);
    }

    #[test]
    fn overlap_check_rejects_conflicting_adds() {
        let mut table = FlowTable::default();
        table.add(entry(5, 80), 16).unwrap();
        let mut overlapping = entry(5, 80);
        overlapping.flags = FlowModFlags::CHECK_OVERLAP;
        assert_eq!(table.add(overlapping, 16), Err(Ofdpe::Overlap));
    }

    #[test]
    fn hard_timeout_expires_entries() {
        let mut table = FlowTable::default();
        let mut short_lived = entry(1, 80);
        short_lived.hard_timeout = 1;
        table.add(short_lived, 16).unwrap();
        table.add(entry(2, 443), 16).unwrap();

        let removed = table.expire(Instant::now() + Duration::from_secs(2));
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].reason, OFPRR_HARD_TIMEOUT);
        assert_eq!(table.active_count(), 1);
    }
}
