// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! The single-pass frame walker.
//!
//! Stage order: L2 (SNAP / VLAN loop), L3 selector on the resolved
//! ethertype, IPv6 extension walk, then L4 on the resolved protocol.
//! Each stage bails out quietly on truncation; the caller sees whatever
//! layers were completed in `format`.

use std::net::{Ipv4Addr, Ipv6Addr};

use tracing::debug;

use crate::packet_info::{Format, PacketInfo};
use crate::{ethtype, ipproto, ipv6_exthdr_bits, ipv6_nexthdr};

const ETH_HEADER_LEN: usize = 14;
const VLAN_TAG_LEN: usize = 4;
const SNAP_HEADER_LEN: usize = 8;
const ARP_HEADER_LEN: usize = 28;
const IPV4_MIN_HEADER_LEN: usize = 20;
const IPV6_HEADER_LEN: usize = 40;
const MPLS_HEADER_LEN: usize = 4;
const PBB_HEADER_LEN: usize = 18;
const ICMPV4_HEADER_LEN: usize = 8;
const ICMPV6_HEADER_LEN: usize = 4;
const ICMPV6_NDP_DATA_LEN: usize = 28;
const TCP_MIN_HEADER_LEN: usize = 20;
const UDP_HEADER_LEN: usize = 8;
const IGMP_HEADER_LEN: usize = 8;
const SCTP_HEADER_LEN: usize = 12;
const ETHERIP_HEADER_LEN: usize = 2;

const IPV4_OFFSET_MASK: u16 = 0x1fff;

fn be16(frame: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([frame[at], frame[at + 1]])
}

fn be32(frame: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([frame[at], frame[at + 1], frame[at + 2], frame[at + 3]])
}

fn mac(frame: &[u8], at: usize) -> [u8; 6] {
    [frame[at], frame[at + 1], frame[at + 2], frame[at + 3], frame[at + 4], frame[at + 5]]
}

fn v6(frame: &[u8], at: usize) -> Ipv6Addr {
    let mut octets = [0u8; 16];
    octets.copy_from_slice(&frame[at..at + 16]);
    Ipv6Addr::from(octets)
}

/// Dissect `frame` into a fresh [`PacketInfo`]. Never fails.
#[must_use]
pub fn parse_packet(frame: &[u8]) -> PacketInfo {
    let mut info = PacketInfo::default();
    info.l2.header = 0;
    parse_ether(frame, &mut info);

    match info.eth_type {
        ethtype::ARP => {
            info.l3.header = info.l2.payload;
            parse_arp(frame, &mut info);
        }
        ethtype::IPV4 => {
            info.l3.header = info.l2.payload;
            parse_ipv4(frame, &mut info);
        }
        ethtype::IPV6 => {
            info.l3.header = info.l2.payload;
            parse_ipv6(frame, &mut info);
        }
        ethtype::LLDP => {
            info.l3.header = info.l2.payload;
            parse_lldp(frame, &mut info);
        }
        ethtype::MPLS_UNI | ethtype::MPLS_MLT => {
            parse_mpls(frame, &mut info);
            return info;
        }
        ethtype::PBB => {
            parse_pbb(frame, &mut info);
            return info;
        }
        _ => return info,
    }

    if info.has(Format::NW_IPV4) {
        if info.ipv4_frag_off & IPV4_OFFSET_MASK != 0 {
            // a later fragment has no transport header to parse
            return info;
        }
        info.ip_proto = info.ipv4_protocol;
        info.ip_dscp = info.ipv4_dscp;
        info.ip_ecn = info.ipv4_ecn;
    } else if info.has(Format::NW_IPV6) {
        info.ip_proto = info.ipv6_protocol;
        info.ip_dscp = info.ipv6_dscp;
        info.ip_ecn = info.ipv6_ecn;
    } else {
        return info;
    }

    if info.l3.payload_length == 0 {
        // header consumed the whole frame; nothing left for a transport
        return info;
    }
    info.l4.header = info.l3.payload;
    match info.ip_proto {
        ipproto::ICMP => parse_icmp(frame, &mut info),
        ipproto::ICMPV6 => parse_icmpv6(frame, &mut info),
        ipproto::TCP => parse_tcp(frame, &mut info),
        ipproto::UDP => parse_udp(frame, &mut info),
        ipproto::IGMP => parse_igmp(frame, &mut info),
        ipproto::SCTP => parse_sctp(frame, &mut info),
        ipproto::ETHERIP => parse_etherip(frame, &mut info),
        _ => {}
    }

    info
}

fn parse_ether(frame: &[u8], info: &mut PacketInfo) {
    if frame.len() < ETH_HEADER_LEN {
        debug!("incomplete ethernet header");
        return;
    }

    info.eth_macda = mac(frame, 0);
    info.eth_macsa = mac(frame, 6);
    let mut eth_type = be16(frame, 12);
    let mut at = ETH_HEADER_LEN;

    loop {
        let remaining = frame.len() - at;
        if eth_type <= ethtype::ETH_MTU {
            // 802.3: a SNAP header must follow for the type to resolve
            if remaining > SNAP_HEADER_LEN
                && frame[at] == 0xaa
                && frame[at + 1] == 0xaa
                && frame[at + 3] == 0
                && frame[at + 4] == 0
                && frame[at + 5] == 0
            {
                info.snap_llc = [frame[at], frame[at + 1], frame[at + 2]];
                info.snap_oui = [frame[at + 3], frame[at + 4], frame[at + 5]];
                info.snap_type = be16(frame, at + 6);
                info.format |= Format::ETH_8023_SNAP;
                eth_type = info.snap_type;
                at += SNAP_HEADER_LEN;
                continue;
            }
            eth_type = ethtype::BEACON;
            break;
        }

        info.format |= Format::ETH_DIX;
        match eth_type {
            ethtype::TPID | ethtype::TPID1 | ethtype::TPID2 | ethtype::TPID3
            | ethtype::TPID4 => {
                if remaining < VLAN_TAG_LEN {
                    debug!("incomplete vlan tag");
                    return;
                }
                if info.l2_vlan_header.is_none() {
                    // capture the outermost tag only
                    let tci = be16(frame, at);
                    info.vlan_tci = tci;
                    info.vlan_tpid = eth_type;
                    info.vlan_prio = ((tci >> 13) & 0x7) as u8;
                    info.vlan_cfi = ((tci >> 12) & 0x1) as u8;
                    info.vlan_vid = tci & 0x0fff;
                    info.format |= Format::ETH_8021Q;
                    info.l2_vlan_header = Some(at);
                }
                eth_type = be16(frame, at + 2);
                at += VLAN_TAG_LEN;
            }
            _ => break,
        }
    }

    info.eth_type = eth_type;
    if frame.len() > at {
        info.l2.payload = at;
        info.l2.payload_length = frame.len() - at;
    }
}

fn parse_arp(frame: &[u8], info: &mut PacketInfo) {
    let at = info.l3.header;
    if frame.len() < at + ARP_HEADER_LEN {
        return;
    }

    info.arp_ar_hrd = be16(frame, at);
    info.arp_ar_pro = be16(frame, at + 2);
    info.arp_ar_hln = frame[at + 4];
    info.arp_ar_pln = frame[at + 5];
    info.arp_ar_op = be16(frame, at + 6);
    info.arp_sha = mac(frame, at + 8);
    info.arp_spa = Ipv4Addr::from(be32(frame, at + 14));
    info.arp_tha = mac(frame, at + 18);
    info.arp_tpa = Ipv4Addr::from(be32(frame, at + 24));
    info.format |= Format::NW_ARP;
}

fn parse_ipv4(frame: &[u8], info: &mut PacketInfo) {
    let at = info.l3.header;
    if frame.len() < at + IPV4_MIN_HEADER_LEN {
        return;
    }

    let ihl = frame[at] & 0x0f;
    if ihl < 5 {
        return;
    }
    let header_len = usize::from(ihl) * 4;
    if frame.len() < at + header_len {
        return;
    }

    info.ipv4_version = frame[at] >> 4;
    info.ipv4_ihl = ihl;
    info.ipv4_tos = frame[at + 1];
    info.ipv4_dscp = (frame[at + 1] & 0xfc) >> 2;
    info.ipv4_ecn = frame[at + 1] & 0x03;
    info.ipv4_tot_len = be16(frame, at + 2);
    info.ipv4_id = be16(frame, at + 4);
    info.ipv4_frag_off = be16(frame, at + 6);
    info.ipv4_ttl = frame[at + 8];
    info.ipv4_protocol = frame[at + 9];
    info.ipv4_checksum = be16(frame, at + 10);
    info.ipv4_saddr = Ipv4Addr::from(be32(frame, at + 12));
    info.ipv4_daddr = Ipv4Addr::from(be32(frame, at + 16));

    if frame.len() > at + header_len {
        info.l3.payload = at + header_len;
        info.l3.payload_length = frame.len() - (at + header_len);
    }
    info.format |= Format::NW_IPV4;
}

fn parse_ipv6(frame: &[u8], info: &mut PacketInfo) {
    let at = info.l3.header;
    if frame.len() < at + IPV6_HEADER_LEN {
        return;
    }

    let hdrctl = be32(frame, at);
    info.ipv6_version = (hdrctl >> 28) as u8;
    info.ipv6_tc = ((hdrctl >> 20) & 0xff) as u8;
    info.ipv6_dscp = (info.ipv6_tc & 0xfc) >> 2;
    info.ipv6_ecn = info.ipv6_tc & 0x03;
    info.ipv6_flowlabel = hdrctl & 0x000f_ffff;
    info.ipv6_plen = be16(frame, at + 4);
    info.ipv6_nexthdr = frame[at + 6];
    info.ipv6_hoplimit = frame[at + 7];
    info.ipv6_saddr = v6(frame, at + 8);
    info.ipv6_daddr = v6(frame, at + 24);

    // extension walk: accumulate the OFPIEH bitmap until a terminal or
    // unrecognised next-header
    let mut nexthdr = info.ipv6_nexthdr;
    info.ipv6_protocol = nexthdr;
    let mut ext = at + IPV6_HEADER_LEN;
    loop {
        match nexthdr {
            ipv6_nexthdr::HOPOPT => info.ipv6_exthdr |= ipv6_exthdr_bits::HOP,
            ipv6_nexthdr::OPTS => info.ipv6_exthdr |= ipv6_exthdr_bits::DEST,
            ipv6_nexthdr::ROUTE => info.ipv6_exthdr |= ipv6_exthdr_bits::ROUTER,
            ipv6_nexthdr::FRAG => info.ipv6_exthdr |= ipv6_exthdr_bits::FRAG,
            ipv6_nexthdr::AH => info.ipv6_exthdr |= ipv6_exthdr_bits::AUTH,
            ipv6_nexthdr::ESP => {
                info.ipv6_exthdr |= ipv6_exthdr_bits::ESP;
                info.ipv6_protocol = nexthdr;
                break;
            }
            ipv6_nexthdr::NONEXT => {
                info.ipv6_exthdr |= ipv6_exthdr_bits::NONEXT;
                info.ipv6_protocol = nexthdr;
                break;
            }
            _ => {
                info.ipv6_protocol = nexthdr;
                break;
            }
        }

        if frame.len() < ext + 2 {
            debug!("truncated ipv6 extension chain");
            break;
        }
        let ext_len = usize::from(frame[ext + 1]);
        let advance = match nexthdr {
            ipv6_nexthdr::FRAG => 8,
            ipv6_nexthdr::AH => (ext_len + 2) * 4,
            _ => (ext_len + 1) * 8,
        };
        nexthdr = frame[ext];
        ext += advance;
        if ext > frame.len() {
            debug!("ipv6 extension header runs past the frame");
            ext = frame.len();
            info.ipv6_protocol = nexthdr;
            break;
        }
    }

    if frame.len() > ext {
        info.l3.payload = ext;
        info.l3.payload_length = frame.len() - ext;
    }
    info.format |= Format::NW_IPV6;
}

fn parse_lldp(frame: &[u8], info: &mut PacketInfo) {
    let at = info.l3.header;
    if frame.len() > at {
        info.l3.payload = at;
        info.l3.payload_length = frame.len() - at;
    }
    info.format |= Format::NW_LLDP;
}

fn parse_mpls(frame: &[u8], info: &mut PacketInfo) {
    let at = info.l2.payload;
    if info.l2.payload_length < MPLS_HEADER_LEN {
        debug!("incomplete mpls header");
        return;
    }

    // only the outermost label is decoded
    let word = be32(frame, at);
    info.mpls_label = (word & 0xffff_f000) >> 12;
    info.mpls_tc = ((word & 0x0000_0e00) >> 9) as u8;
    info.mpls_bos = ((word & 0x0000_0100) >> 8) as u8;
    info.format |= Format::MPLS;
    info.l2_mpls_header = Some(at);
}

fn parse_pbb(frame: &[u8], info: &mut PacketInfo) {
    let at = info.l2.payload;
    if info.l2.payload_length < PBB_HEADER_LEN {
        debug!("incomplete pbb header");
        return;
    }

    info.pbb_isid = be32(frame, at) & 0x00ff_ffff;
    info.l2_pbb_header = Some(at);
    info.format |= Format::PBB;
}

fn parse_icmp(frame: &[u8], info: &mut PacketInfo) {
    let at = info.l4.header;
    if frame.len() < at + ICMPV4_HEADER_LEN {
        return;
    }

    info.icmpv4_type = frame[at];
    info.icmpv4_code = frame[at + 1];
    info.icmpv4_checksum = be16(frame, at + 2);
    match info.icmpv4_type {
        // echo reply / echo request
        0 | 8 => {
            info.icmpv4_id = be16(frame, at + 4);
            info.icmpv4_seq = be16(frame, at + 6);
        }
        // redirect
        5 => info.icmpv4_gateway = Ipv4Addr::from(be32(frame, at + 4)),
        _ => {}
    }

    if frame.len() > at + ICMPV4_HEADER_LEN {
        info.l4.payload = at + ICMPV4_HEADER_LEN;
        info.l4.payload_length = frame.len() - (at + ICMPV4_HEADER_LEN);
    }
    info.format |= Format::NW_ICMPV4;
}

fn parse_icmpv6(frame: &[u8], info: &mut PacketInfo) {
    let at = info.l4.header;
    let remaining = frame.len() - at.min(frame.len());
    if remaining < ICMPV6_HEADER_LEN {
        return;
    }

    info.icmpv6_type = frame[at];
    info.icmpv6_code = frame[at + 1];

    // neighbour solicitation / advertisement
    if info.icmpv6_type == 135 || info.icmpv6_type == 136 {
        // reserved word, then the target address
        if remaining >= ICMPV6_HEADER_LEN + 20 {
            info.icmpv6_nd_target = v6(frame, at + 8);
        }
        // link-layer option only when present and shaped exactly right
        if remaining >= ICMPV6_HEADER_LEN + ICMPV6_NDP_DATA_LEN {
            let ll_type = frame[at + 24];
            let ll_length = frame[at + 25];
            let want = if info.icmpv6_type == 135 { 1 } else { 2 };
            if ll_type == want && ll_length == 1 {
                info.icmpv6_nd_ll_type = ll_type;
                info.icmpv6_nd_ll_length = ll_length;
                if info.icmpv6_type == 135 {
                    info.icmpv6_nd_sll = mac(frame, at + 26);
                } else {
                    info.icmpv6_nd_tll = mac(frame, at + 26);
                }
            }
        }
    }

    if frame.len() > at + ICMPV6_HEADER_LEN {
        info.l4.payload = at + ICMPV6_HEADER_LEN;
        info.l4.payload_length = frame.len() - (at + ICMPV6_HEADER_LEN);
    }
    info.format |= Format::NW_ICMPV6;
}

fn parse_tcp(frame: &[u8], info: &mut PacketInfo) {
    let at = info.l4.header;
    if frame.len() < at + TCP_MIN_HEADER_LEN {
        return;
    }

    let offset = frame[at + 12] >> 4;
    if offset < 5 {
        return;
    }
    let header_len = usize::from(offset) * 4;
    if frame.len() < at + header_len {
        return;
    }

    info.tcp_src_port = be16(frame, at);
    info.tcp_dst_port = be16(frame, at + 2);
    info.tcp_seq_no = be32(frame, at + 4);
    info.tcp_ack_no = be32(frame, at + 8);
    info.tcp_offset = offset;
    info.tcp_flags = frame[at + 13];
    info.tcp_window = be16(frame, at + 14);
    info.tcp_checksum = be16(frame, at + 16);
    info.tcp_urgent = be16(frame, at + 18);

    if frame.len() > at + header_len {
        info.l4.payload = at + header_len;
        info.l4.payload_length = frame.len() - (at + header_len);
    }
    info.format |= Format::TP_TCP;
}

fn parse_udp(frame: &[u8], info: &mut PacketInfo) {
    let at = info.l4.header;
    if frame.len() < at + UDP_HEADER_LEN {
        return;
    }

    info.udp_src_port = be16(frame, at);
    info.udp_dst_port = be16(frame, at + 2);
    info.udp_len = be16(frame, at + 4);
    info.udp_checksum = be16(frame, at + 6);

    if frame.len() > at + UDP_HEADER_LEN {
        info.l4.payload = at + UDP_HEADER_LEN;
        info.l4.payload_length = frame.len() - (at + UDP_HEADER_LEN);
    }
    info.format |= Format::TP_UDP;
}

fn parse_igmp(frame: &[u8], info: &mut PacketInfo) {
    let at = info.l4.header;
    if frame.len() < at + IGMP_HEADER_LEN {
        return;
    }

    info.igmp_type = frame[at];
    info.igmp_code = frame[at + 1];
    info.igmp_checksum = be16(frame, at + 2);
    info.igmp_group = Ipv4Addr::from(be32(frame, at + 4));
    info.format |= Format::NW_IGMP;
}

fn parse_sctp(frame: &[u8], info: &mut PacketInfo) {
    let at = info.l4.header;
    if frame.len() < at + SCTP_HEADER_LEN {
        return;
    }

    info.sctp_src_port = be16(frame, at);
    info.sctp_dst_port = be16(frame, at + 2);

    if frame.len() > at + SCTP_HEADER_LEN {
        info.l4.payload = at + SCTP_HEADER_LEN;
        info.l4.payload_length = frame.len() - (at + SCTP_HEADER_LEN);
    }
    info.format |= Format::TP_SCTP;
}

fn parse_etherip(frame: &[u8], info: &mut PacketInfo) {
    let at = info.l4.header;
    if frame.len() < at + ETHERIP_HEADER_LEN {
        return;
    }

    info.etherip_version = be16(frame, at);
    info.etherip_offset = 0;
    if frame.len() > at + ETHERIP_HEADER_LEN {
        info.l4.payload = at + ETHERIP_HEADER_LEN;
        info.l4.payload_length = frame.len() - (at + ETHERIP_HEADER_LEN);
        info.etherip_offset = (at + ETHERIP_HEADER_LEN) as u16;
    }
    info.format |= Format::TP_ETHERIP;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_and_runt_frames_parse_to_nothing() {
        let info = parse_packet(&[]);
        assert_eq!(info.format, Format::empty());
        let info = parse_packet(&[0u8; 10]);
        assert_eq!(info.format, Format::empty());
    }

    #[test]
    fn unknown_ethertype_leaves_l3_unset() {
        let mut frame = vec![0u8; 20];
        frame[12] = 0x88;
        frame[13] = 0xb5; // local experimental
        let info = parse_packet(&frame);
        assert_eq!(info.format, Format::ETH_DIX);
        assert_eq!(info.eth_type, 0x88b5);
        assert_eq!(info.l2.payload, 14);
        assert_eq!(info.l2.payload_length, 6);
    }

    #[test]
    fn short_8023_payload_becomes_beacon() {
        let mut frame = vec![0u8; 16];
        frame[12] = 0x00;
        frame[13] = 0x40; // 802.3 length, no valid snap follows
        let info = parse_packet(&frame);
        assert_eq!(info.eth_type, ethtype::BEACON);
        assert!(!info.has(Format::ETH_8023_SNAP));
    }
}
