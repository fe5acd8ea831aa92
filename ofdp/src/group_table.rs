// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! Group table.

use std::collections::BTreeMap;
use std::time::Instant;

use openflow::buckets::BucketList;
use openflow::consts::group_no::{OFPG_ALL, OFPG_MAX};
use openflow::msg::{BucketCounter, GroupDescEntry, GroupStatsEntry};

use crate::error::Ofdpe;

const MAX_GROUPS: usize = 4096;

/// One installed group.
#[derive(Debug, Clone)]
pub struct GroupEntry {
    pub group_id: u32,
    pub group_type: u8,
    pub buckets: BucketList,
    pub ref_count: u32,
    pub packet_count: u64,
    pub byte_count: u64,
    created_at: Instant,
}

impl GroupEntry {
    #[must_use]
    pub fn new(group_id: u32, group_type: u8, buckets: BucketList) -> GroupEntry {
        GroupEntry {
            group_id,
            group_type,
            buckets,
            ref_count: 0,
            packet_count: 0,
            byte_count: 0,
            created_at: Instant::now(),
        }
    }

    fn stats(&self) -> GroupStatsEntry {
        let duration = self.created_at.elapsed();
        GroupStatsEntry {
            group_id: self.group_id,
            ref_count: self.ref_count,
            packet_count: self.packet_count,
            byte_count: self.byte_count,
            duration_sec: duration.as_secs() as u32,
            duration_nsec: duration.subsec_nanos(),
            bucket_stats: vec![BucketCounter::default(); self.buckets.n_buckets()],
        }
    }

    fn desc(&self) -> GroupDescEntry {
        GroupDescEntry {
            group_type: self.group_type,
            group_id: self.group_id,
            buckets: self.buckets.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct GroupTable {
    groups: BTreeMap<u32, GroupEntry>,
}

impl GroupTable {
    pub fn add(&mut self, entry: GroupEntry) -> Result<(), Ofdpe> {
        if entry.group_id > OFPG_MAX {
            return Err(Ofdpe::InvalidGroup);
        }
        if self.groups.len() >= MAX_GROUPS {
            return Err(Ofdpe::OutOfGroups);
        }
        if self.groups.contains_key(&entry.group_id) {
            return Err(Ofdpe::GroupExists);
        }
        self.groups.insert(entry.group_id, entry);
        Ok(())
    }

    pub fn modify(&mut self, entry: GroupEntry) -> Result<(), Ofdpe> {
        if entry.group_id > OFPG_MAX {
            return Err(Ofdpe::InvalidGroup);
        }
        match self.groups.get_mut(&entry.group_id) {
            None => Err(Ofdpe::UnknownGroup),
            Some(existing) => {
                existing.group_type = entry.group_type;
                existing.buckets = entry.buckets;
                Ok(())
            }
        }
    }

    /// `OFPG_ALL` clears the whole table; a missing specific id is not an
    /// error per 1.3.
    pub fn delete(&mut self, group_id: u32) -> Result<(), Ofdpe> {
        if group_id == OFPG_ALL {
            self.groups.clear();
            return Ok(());
        }
        self.groups.remove(&group_id);
        Ok(())
    }

    pub fn contains(&self, group_id: u32) -> bool {
        self.groups.contains_key(&group_id)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn stats(&self, group_id: u32) -> Vec<GroupStatsEntry> {
        match group_id {
            OFPG_ALL | openflow::consts::group_no::OFPG_ANY => {
                self.groups.values().map(GroupEntry::stats).collect()
            }
            id => self.groups.get(&id).map(GroupEntry::stats).into_iter().collect(),
        }
    }

    pub fn descriptions(&self) -> Vec<GroupDescEntry> {
        self.groups.values().map(GroupEntry::desc).collect()
    }

    pub fn entries(&self) -> impl Iterator<Item = &GroupEntry> {
        self.groups.values()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn group(id: u32) -> GroupEntry {
        GroupEntry::new(id, openflow::consts::OFPGT_ALL, BucketList::new())
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let mut table = GroupTable::default();
        table.add(group(1)).unwrap();
        assert_eq!(table.add(group(1)), Err(Ofdpe::GroupExists));
    }

    #[test]
    fn modify_requires_existence() {
        let mut table = GroupTable::default();
        assert_eq!(table.modify(group(9)), Err(Ofdpe::UnknownGroup));
        table.add(group(9)).unwrap();
        assert!(table.modify(group(9)).is_ok());
    }

    #[test]
    fn reserved_ids_are_invalid() {
        let mut table = GroupTable::default();
        assert_eq!(table.add(group(OFPG_MAX + 1)), Err(Ofdpe::InvalidGroup));
    }

    #[test]
    fn delete_all_clears_the_table() {
        let mut table = GroupTable::default();
        table.add(group(1)).unwrap();
        table.add(group(2)).unwrap();
        table.delete(OFPG_ALL).unwrap();
        assert_eq!(table.len(), 0);
    }
}
