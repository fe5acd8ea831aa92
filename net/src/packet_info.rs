// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! The flat, typed view of a dissected frame.

use std::net::{Ipv4Addr, Ipv6Addr};

use bitflags::bitflags;

bitflags! {
    /// Layers recognised in a frame. A field in [`PacketInfo`] is only
    /// meaningful when the layer that carries it is present here.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Format: u32 {
        const ETH_DIX = 1 << 0;
        const ETH_8023_RAW = 1 << 1;
        const ETH_8023_LLC = 1 << 2;
        const ETH_8023_SNAP = 1 << 3;
        const ETH_8021Q = 1 << 4;
        const MPLS = 1 << 5;
        const PBB = 1 << 6;
        const NW_IPV4 = 1 << 8;
        const NW_ICMPV4 = 1 << 9;
        const NW_IPV6 = 1 << 10;
        const NW_ICMPV6 = 1 << 11;
        const NW_ARP = 1 << 12;
        const NW_IGMP = 1 << 13;
        const NW_LLDP = 1 << 14;
        const TP_TCP = 1 << 16;
        const TP_UDP = 1 << 17;
        const TP_ETHERIP = 1 << 18;
        const TP_SCTP = 1 << 19;
    }
}

/// Byte range of a layer inside the frame: header start, payload start,
/// payload length. Offsets index into the original frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerSpan {
    pub header: usize,
    pub payload: usize,
    pub payload_length: usize,
}

/// Parsed view of a frame. Produced by [`crate::parse_packet`]; the
/// frame itself is never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketInfo {
    pub format: Format,

    pub eth_macda: [u8; 6],
    pub eth_macsa: [u8; 6],
    pub eth_type: u16,

    /// Outermost VLAN tag only; nested tags are skipped over.
    pub vlan_tci: u16,
    pub vlan_tpid: u16,
    pub vlan_prio: u8,
    pub vlan_cfi: u8,
    pub vlan_vid: u16,

    pub snap_llc: [u8; 3],
    pub snap_oui: [u8; 3],
    pub snap_type: u16,

    pub arp_ar_hrd: u16,
    pub arp_ar_pro: u16,
    pub arp_ar_hln: u8,
    pub arp_ar_pln: u8,
    pub arp_ar_op: u16,
    pub arp_sha: [u8; 6],
    pub arp_spa: Ipv4Addr,
    pub arp_tha: [u8; 6],
    pub arp_tpa: Ipv4Addr,

    /// L3-agnostic copies filled from whichever IP version was seen.
    pub ip_proto: u8,
    pub ip_dscp: u8,
    pub ip_ecn: u8,

    pub ipv4_version: u8,
    pub ipv4_ihl: u8,
    pub ipv4_tos: u8,
    pub ipv4_dscp: u8,
    pub ipv4_ecn: u8,
    pub ipv4_tot_len: u16,
    pub ipv4_id: u16,
    pub ipv4_frag_off: u16,
    pub ipv4_ttl: u8,
    pub ipv4_protocol: u8,
    pub ipv4_checksum: u16,
    pub ipv4_saddr: Ipv4Addr,
    pub ipv4_daddr: Ipv4Addr,

    pub ipv6_version: u8,
    pub ipv6_tc: u8,
    pub ipv6_dscp: u8,
    pub ipv6_ecn: u8,
    pub ipv6_flowlabel: u32,
    pub ipv6_plen: u16,
    pub ipv6_nexthdr: u8,
    pub ipv6_hoplimit: u8,
    pub ipv6_saddr: Ipv6Addr,
    pub ipv6_daddr: Ipv6Addr,
    /// Protocol after the extension chain.
    pub ipv6_protocol: u8,
    /// `OFPIEH_*` summary accumulated over the extension walk.
    pub ipv6_exthdr: u16,

    pub icmpv4_type: u8,
    pub icmpv4_code: u8,
    pub icmpv4_checksum: u16,
    pub icmpv4_id: u16,
    pub icmpv4_seq: u16,
    pub icmpv4_gateway: Ipv4Addr,

    pub igmp_type: u8,
    pub igmp_code: u8,
    pub igmp_checksum: u16,
    pub igmp_group: Ipv4Addr,

    pub tcp_src_port: u16,
    pub tcp_dst_port: u16,
    pub tcp_seq_no: u32,
    pub tcp_ack_no: u32,
    pub tcp_offset: u8,
    pub tcp_flags: u8,
    pub tcp_window: u16,
    pub tcp_checksum: u16,
    pub tcp_urgent: u16,

    pub udp_src_port: u16,
    pub udp_dst_port: u16,
    pub udp_len: u16,
    pub udp_checksum: u16,

    pub sctp_src_port: u16,
    pub sctp_dst_port: u16,

    pub etherip_version: u16,
    pub etherip_offset: u16,

    pub icmpv6_type: u8,
    pub icmpv6_code: u8,
    pub icmpv6_nd_target: Ipv6Addr,
    pub icmpv6_nd_ll_type: u8,
    pub icmpv6_nd_ll_length: u8,
    pub icmpv6_nd_sll: [u8; 6],
    pub icmpv6_nd_tll: [u8; 6],

    /// Outermost MPLS label word, already split.
    pub mpls_label: u32,
    pub mpls_tc: u8,
    pub mpls_bos: u8,

    pub pbb_isid: u32,

    pub l2: LayerSpan,
    pub l3: LayerSpan,
    pub l4: LayerSpan,
    pub l2_vlan_header: Option<usize>,
    pub l2_mpls_header: Option<usize>,
    pub l2_pbb_header: Option<usize>,
}

impl Default for PacketInfo {
    fn default() -> PacketInfo {
        PacketInfo {
            format: Format::empty(),
            eth_macda: [0; 6],
            eth_macsa: [0; 6],
            eth_type: 0,
            vlan_tci: 0,
            vlan_tpid: 0,
            vlan_prio: 0,
            vlan_cfi: 0,
            vlan_vid: 0,
            snap_llc: [0; 3],
            snap_oui: [0; 3],
            snap_type: 0,
            arp_ar_hrd: 0,
            arp_ar_pro: 0,
            arp_ar_hln: 0,
            arp_ar_pln: 0,
            arp_ar_op: 0,
            arp_sha: [0; 6],
            arp_spa: Ipv4Addr::UNSPECIFIED,
            arp_tha: [0; 6],
            arp_tpa: Ipv4Addr::UNSPECIFIED,
            ip_proto: 0,
            ip_dscp: 0,
            ip_ecn: 0,
            ipv4_version: 0,
            ipv4_ihl: 0,
            ipv4_tos: 0,
            ipv4_dscp: 0,
            ipv4_ecn: 0,
            ipv4_tot_len: 0,
            ipv4_id: 0,
            ipv4_frag_off: 0,
            ipv4_ttl: 0,
            ipv4_protocol: 0,
            ipv4_checksum: 0,
            ipv4_saddr: Ipv4Addr::UNSPECIFIED,
            ipv4_daddr: Ipv4Addr::UNSPECIFIED,
            ipv6_version: 0,
            ipv6_tc: 0,
            ipv6_dscp: 0,
            ipv6_ecn: 0,
            ipv6_flowlabel: 0,
            ipv6_plen: 0,
            ipv6_nexthdr: 0,
            ipv6_hoplimit: 0,
            ipv6_saddr: Ipv6Addr::UNSPECIFIED,
            ipv6_daddr: Ipv6Addr::UNSPECIFIED,
            ipv6_protocol: 0,
            ipv6_exthdr: 0,
            icmpv4_type: 0,
            icmpv4_code: 0,
            icmpv4_checksum: 0,
            icmpv4_id: 0,
            icmpv4_seq: 0,
            icmpv4_gateway: Ipv4Addr::UNSPECIFIED,
            igmp_type: 0,
            igmp_code: 0,
            igmp_checksum: 0,
            igmp_group: Ipv4Addr::UNSPECIFIED,
            tcp_src_port: 0,
            tcp_dst_port: 0,
            tcp_seq_no: 0,
            tcp_ack_no: 0,
            tcp_offset: 0,
            tcp_flags: 0,
            tcp_window: 0,
            tcp_checksum: 0,
            tcp_urgent: 0,
            udp_src_port: 0,
            udp_dst_port: 0,
            udp_len: 0,
            udp_checksum: 0,
            sctp_src_port: 0,
            sctp_dst_port: 0,
            etherip_version: 0,
            etherip_offset: 0,
            icmpv6_type: 0,
            icmpv6_code: 0,
            icmpv6_nd_target: Ipv6Addr::UNSPECIFIED,
            icmpv6_nd_ll_type: 0,
            icmpv6_nd_ll_length: 0,
            icmpv6_nd_sll: [0; 6],
            icmpv6_nd_tll: [0; 6],
            mpls_label: 0,
            mpls_tc: 0,
            mpls_bos: 0,
            pbb_isid: 0,
            l2: LayerSpan::default(),
            l3: LayerSpan::default(),
            l4: LayerSpan::default(),
            l2_vlan_header: None,
            l2_mpls_header: None,
            l2_pbb_header: None,
        }
    }
}

impl PacketInfo {
    #[must_use]
    pub fn has(&self, layers: Format) -> bool {
        self.format.contains(layers)
    }

    /// Whether the frame carried (at least one) 802.1Q tag.
    #[must_use]
    pub fn is_vlan_tagged(&self) -> bool {
        self.has(Format::ETH_8021Q)
    }

    #[must_use]
    pub fn is_pbb(&self) -> bool {
        self.has(Format::PBB)
    }

    #[must_use]
    pub fn is_ip(&self) -> bool {
        self.format.intersects(Format::NW_IPV4 | Format::NW_IPV6)
    }
}
