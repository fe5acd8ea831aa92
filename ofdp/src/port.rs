// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! Logical switch ports.
//!
//! Ports here are logical attachment points named after network
//! devices; real device I/O lives outside the engine, so transmit just
//! counts.

use std::time::Instant;

use openflow::consts::{PortConfig, PortFeatures, PortState};
use openflow::msg::{PortDesc, PortStatsEntry};

/// One switch port.
#[derive(Debug, Clone)]
pub struct SwitchPort {
    pub port_no: u32,
    pub device_name: String,
    pub hw_addr: [u8; 6],
    pub config: PortConfig,
    pub state: PortState,
    pub rx_packets: u64,
    pub tx_packets: u64,
    pub rx_bytes: u64,
    pub tx_bytes: u64,
    pub rx_dropped: u64,
    pub tx_dropped: u64,
    created_at: Instant,
}

impl SwitchPort {
    #[must_use]
    pub fn new(port_no: u32, device_name: &str) -> SwitchPort {
        // locally administered address derived from the port number
        let hw_addr = [
            0x02,
            0x00,
            (port_no >> 24) as u8,
            (port_no >> 16) as u8,
            (port_no >> 8) as u8,
            port_no as u8,
        ];
        SwitchPort {
            port_no,
            device_name: device_name.to_owned(),
            hw_addr,
            config: PortConfig::empty(),
            state: PortState::LIVE,
            rx_packets: 0,
            tx_packets: 0,
            rx_bytes: 0,
            tx_bytes: 0,
            rx_dropped: 0,
            tx_dropped: 0,
            created_at: Instant::now(),
        }
    }

    #[must_use]
    pub fn description(&self) -> PortDesc {
        PortDesc {
            port_no: self.port_no,
            hw_addr: self.hw_addr,
            name: self.device_name.clone(),
            config: self.config.bits(),
            state: self.state.bits(),
            curr: (PortFeatures::SPEED_1GB_FD | PortFeatures::COPPER).bits(),
            advertised: (PortFeatures::SPEED_1GB_FD | PortFeatures::COPPER).bits(),
            supported: (PortFeatures::SPEED_1GB_FD | PortFeatures::COPPER).bits(),
            peer: 0,
            curr_speed: 1_000_000,
            max_speed: 1_000_000,
        }
    }

    #[must_use]
    pub fn stats(&self) -> PortStatsEntry {
        let duration = self.created_at.elapsed();
        PortStatsEntry {
            port_no: self.port_no,
            rx_packets: self.rx_packets,
            tx_packets: self.tx_packets,
            rx_bytes: self.rx_bytes,
            tx_bytes: self.tx_bytes,
            rx_dropped: self.rx_dropped,
            tx_dropped: self.tx_dropped,
            duration_sec: duration.as_secs() as u32,
            duration_nsec: duration.subsec_nanos(),
            ..PortStatsEntry::default()
        }
    }

    /// Count a transmission; drops instead when the port is down or
    /// forwarding is disabled.
    pub fn transmit(&mut self, bytes: usize) {
        if self
            .config
            .intersects(PortConfig::PORT_DOWN | PortConfig::NO_FWD)
        {
            self.tx_dropped += 1;
            return;
        }
        self.tx_packets += 1;
        self.tx_bytes += bytes as u64;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn transmit_counts_unless_disabled() {
        let mut port = SwitchPort::new(3, "veth3");
        port.transmit(100);
        assert_eq!(port.tx_packets, 1);
        assert_eq!(port.tx_bytes, 100);

        port.config = PortConfig::NO_FWD;
        port.transmit(100);
        assert_eq!(port.tx_packets, 1);
        assert_eq!(port.tx_dropped, 1);
    }

    #[test]
    fn description_carries_the_device_name() {
        let port = SwitchPort::new(9, "eth9");
        let desc = port.description();
        assert_eq!(desc.port_no, 9);
        assert_eq!(desc.name, "eth9");
        assert_eq!(desc.hw_addr[5], 9);
    }
}
