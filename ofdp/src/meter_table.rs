// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! Meter table.

use std::collections::BTreeMap;
use std::time::Instant;

use openflow::consts::meter_no::{OFPM_ALL, OFPM_MAX};
use openflow::msg::{BandStats, MeterBand, MeterConfigEntry, MeterStatsEntry};

use crate::error::Ofdpe;

const MAX_METERS: usize = 1024;

/// One installed meter.
#[derive(Debug, Clone)]
pub struct MeterEntry {
    pub meter_id: u32,
    pub flags: u16,
    pub bands: Vec<MeterBand>,
    pub flow_count: u32,
    pub packet_in_count: u64,
    pub byte_in_count: u64,
    created_at: Instant,
}

impl MeterEntry {
    #[must_use]
    pub fn new(meter_id: u32, flags: u16, bands: Vec<MeterBand>) -> MeterEntry {
        MeterEntry {
            meter_id,
            flags,
            bands,
            flow_count: 0,
            packet_in_count: 0,
            byte_in_count: 0,
            created_at: Instant::now(),
        }
    }

    fn stats(&self) -> MeterStatsEntry {
        let duration = self.created_at.elapsed();
        MeterStatsEntry {
            meter_id: self.meter_id,
            flow_count: self.flow_count,
            packet_in_count: self.packet_in_count,
            byte_in_count: self.byte_in_count,
            duration_sec: duration.as_secs() as u32,
            duration_nsec: duration.subsec_nanos(),
            band_stats: vec![BandStats::default(); self.bands.len()],
        }
    }

    fn config(&self) -> MeterConfigEntry {
        MeterConfigEntry {
            flags: self.flags,
            meter_id: self.meter_id,
            bands: self.bands.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct MeterTable {
    meters: BTreeMap<u32, MeterEntry>,
}

impl MeterTable {
    pub fn add(&mut self, entry: MeterEntry) -> Result<(), Ofdpe> {
        if entry.meter_id == 0 || entry.meter_id > OFPM_MAX {
            return Err(Ofdpe::InvalidMeter);
        }
        if self.meters.len() >= MAX_METERS {
            return Err(Ofdpe::OutOfMeters);
        }
        if self.meters.contains_key(&entry.meter_id) {
            return Err(Ofdpe::MeterExists);
        }
        self.meters.insert(entry.meter_id, entry);
        Ok(())
    }

    pub fn modify(&mut self, entry: MeterEntry) -> Result<(), Ofdpe> {
        match self.meters.get_mut(&entry.meter_id) {
            None => Err(Ofdpe::UnknownMeter),
            Some(existing) => {
                existing.flags = entry.flags;
                existing.bands = entry.bands;
                Ok(())
            }
        }
    }

    pub fn delete(&mut self, meter_id: u32) -> Result<(), Ofdpe> {
        if meter_id == OFPM_ALL {
            self.meters.clear();
            return Ok(());
        }
        self.meters.remove(&meter_id);
        Ok(())
    }

    pub fn stats(&self, meter_id: u32) -> Vec<MeterStatsEntry> {
        match meter_id {
            OFPM_ALL => self.meters.values().map(MeterEntry::stats).collect(),
            id => self.meters.get(&id).map(MeterEntry::stats).into_iter().collect(),
        }
    }

    pub fn configs(&self, meter_id: u32) -> Vec<MeterConfigEntry> {
        match meter_id {
            OFPM_ALL => self.meters.values().map(MeterEntry::config).collect(),
            id => self.meters.get(&id).map(MeterEntry::config).into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn meter_zero_is_invalid() {
        let mut table = MeterTable::default();
        assert_eq!(
            table.add(MeterEntry::new(0, 0, Vec::new())),
            Err(Ofdpe::InvalidMeter)
        );
    }

    #[test]
    fn add_modify_delete_cycle() {
        let mut table = MeterTable::default();
        table.add(MeterEntry::new(7, 1, Vec::new())).unwrap();
        assert_eq!(
            table.add(MeterEntry::new(7, 1, Vec::new())),
            Err(Ofdpe::MeterExists)
        );
        assert!(table.modify(MeterEntry::new(7, 3, Vec::new())).is_ok());
        assert_eq!(table.configs(7)[0].flags, 3);
        table.delete(7).unwrap();
        assert!(table.stats(7).is_empty());
    }
}
