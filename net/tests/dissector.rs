// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! Dissector behaviour against hand-built frames. Byte layouts are
//! written out longhand so every offset the parser consumes is visible
//! in the test itself; one cross-check leans on etherparse to be sure
//! the hand-built baseline agrees with an independent encoder.

use net::{Format, ethtype, ipproto, ipv6_exthdr_bits, parse_packet};
use pretty_assertions::assert_eq;

const DST: [u8; 6] = [0x02, 0, 0, 0, 0, 0x01];
const SRC: [u8; 6] = [0x02, 0, 0, 0, 0, 0x02];

fn eth(eth_type: u16, payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::new();
    frame.extend_from_slice(&DST);
    frame.extend_from_slice(&SRC);
    frame.extend_from_slice(&eth_type.to_be_bytes());
    frame.extend_from_slice(payload);
    frame
}

fn ipv4_header(protocol: u8, ihl: u8, payload_len: usize) -> Vec<u8> {
    let header_len = usize::from(ihl) * 4;
    let mut header = vec![0u8; header_len];
    header[0] = 0x40 | ihl;
    header[1] = 0b1010_1101; // dscp 0x2b, ecn 1
    let total = (header_len + payload_len) as u16;
    header[2..4].copy_from_slice(&total.to_be_bytes());
    header[8] = 64;
    header[9] = protocol;
    header[12..16].copy_from_slice(&[10, 0, 0, 1]);
    header[16..20].copy_from_slice(&[10, 0, 0, 2]);
    header
}

fn tcp_header(offset_words: u8) -> Vec<u8> {
    let mut header = vec![0u8; usize::from(offset_words) * 4];
    header[0..2].copy_from_slice(&49152u16.to_be_bytes());
    header[2..4].copy_from_slice(&80u16.to_be_bytes());
    header[4..8].copy_from_slice(&0x1111_2222u32.to_be_bytes());
    header[8..12].copy_from_slice(&0x3333_4444u32.to_be_bytes());
    header[12] = offset_words << 4;
    header[13] = 0x18; // psh|ack
    header[14..16].copy_from_slice(&1024u16.to_be_bytes());
    header
}

#[test]
fn plain_ipv4_tcp() {
    let mut payload = ipv4_header(ipproto::TCP, 5, 24);
    payload.extend_from_slice(&tcp_header(5));
    payload.extend_from_slice(b"data");
    let info = parse_packet(&eth(ethtype::IPV4, &payload));

    assert!(info.has(Format::ETH_DIX | Format::NW_IPV4 | Format::TP_TCP));
    assert_eq!(info.eth_macda, DST);
    assert_eq!(info.eth_macsa, SRC);
    assert_eq!(info.eth_type, ethtype::IPV4);
    assert_eq!(info.ipv4_dscp, 0x2b);
    assert_eq!(info.ipv4_ecn, 1);
    assert_eq!(info.ip_proto, ipproto::TCP);
    assert_eq!(info.tcp_src_port, 49152);
    assert_eq!(info.tcp_dst_port, 80);
    assert_eq!(info.tcp_flags, 0x18);
    assert_eq!(info.l4.payload_length, 4);
}

#[test]
fn ipv4_with_options_respects_ihl() {
    // scenario: ihl = 6 pushes the transport header four bytes deeper
    let mut payload = ipv4_header(ipproto::TCP, 6, 20);
    payload.extend_from_slice(&tcp_header(5));
    let frame = eth(ethtype::IPV4, &payload);
    let info = parse_packet(&frame);

    assert_eq!(info.ipv4_ihl, 6);
    assert_eq!(info.l3.payload, 14 + 24);
    assert_eq!(info.l4.header, 14 + 24);
    assert!(info.has(Format::TP_TCP));
    assert_eq!(info.tcp_dst_port, 80);
}

#[test]
fn truncated_tcp_leaves_transport_unset() {
    let mut payload = ipv4_header(ipproto::TCP, 5, 10);
    payload.extend_from_slice(&tcp_header(5)[..10]);
    let info = parse_packet(&eth(ethtype::IPV4, &payload));
    assert!(info.has(Format::NW_IPV4));
    assert!(!info.has(Format::TP_TCP));
    assert_eq!(info.tcp_dst_port, 0);
}

#[test]
fn tcp_data_offset_below_five_is_ignored() {
    let mut payload = ipv4_header(ipproto::TCP, 5, 20);
    let mut tcp = tcp_header(5);
    tcp[12] = 4 << 4;
    payload.extend_from_slice(&tcp);
    let info = parse_packet(&eth(ethtype::IPV4, &payload));
    assert!(!info.has(Format::TP_TCP));
}

#[test]
fn ipv4_fragment_skips_transport_parsing() {
    let mut payload = ipv4_header(ipproto::UDP, 5, 16);
    payload[6..8].copy_from_slice(&0x0010u16.to_be_bytes()); // offset 16
    payload.extend_from_slice(&[0u8; 16]);
    let info = parse_packet(&eth(ethtype::IPV4, &payload));
    assert!(info.has(Format::NW_IPV4));
    assert!(!info.has(Format::TP_UDP));
}

#[test]
fn qinq_records_only_the_outer_tag() {
    // outer 0x8100 vid 10 pcp 5, inner 0x8100 vid 20, then ipv4/udp
    let mut payload = Vec::new();
    payload.extend_from_slice(&((5u16 << 13) | 10).to_be_bytes());
    payload.extend_from_slice(&ethtype::TPID.to_be_bytes());
    payload.extend_from_slice(&20u16.to_be_bytes());
    payload.extend_from_slice(&ethtype::IPV4.to_be_bytes());
    let mut inner = ipv4_header(ipproto::UDP, 5, 8);
    inner.extend_from_slice(&[0, 53, 0, 53, 0, 8, 0, 0]);
    payload.extend_from_slice(&inner);

    let info = parse_packet(&eth(ethtype::TPID, &payload));
    assert!(info.has(Format::ETH_8021Q | Format::NW_IPV4 | Format::TP_UDP));
    assert_eq!(info.vlan_vid, 10);
    assert_eq!(info.vlan_prio, 5);
    assert_eq!(info.vlan_tpid, ethtype::TPID);
    assert_eq!(info.eth_type, ethtype::IPV4);
}

#[test]
fn provider_tag_is_recognised() {
    let mut payload = Vec::new();
    payload.extend_from_slice(&100u16.to_be_bytes());
    payload.extend_from_slice(&ethtype::ARP.to_be_bytes());
    payload.extend_from_slice(&[0u8; 28]);
    let info = parse_packet(&eth(ethtype::TPID1, &payload));
    assert!(info.has(Format::ETH_8021Q | Format::NW_ARP));
    assert_eq!(info.vlan_tpid, ethtype::TPID1);
    assert_eq!(info.vlan_vid, 100);
}

#[test]
fn snap_resolves_the_inner_ethertype() {
    // 802.3 length, LLC aa aa 03, OUI zero, type ipv4
    let mut payload = Vec::new();
    payload.extend_from_slice(&[0xaa, 0xaa, 0x03, 0x00, 0x00, 0x00]);
    payload.extend_from_slice(&ethtype::IPV4.to_be_bytes());
    let mut inner = ipv4_header(ipproto::UDP, 5, 8);
    inner.extend_from_slice(&[0, 7, 0, 7, 0, 8, 0, 0]);
    payload.extend_from_slice(&inner);

    let info = parse_packet(&eth(payload.len() as u16, &payload));
    assert!(info.has(Format::ETH_8023_SNAP | Format::NW_IPV4 | Format::TP_UDP));
    assert_eq!(info.snap_llc, [0xaa, 0xaa, 0x03]);
    assert_eq!(info.snap_type, ethtype::IPV4);
    assert_eq!(info.eth_type, ethtype::IPV4);
}

#[test]
fn arp_fields() {
    let mut arp = Vec::new();
    arp.extend_from_slice(&1u16.to_be_bytes());
    arp.extend_from_slice(&0x0800u16.to_be_bytes());
    arp.push(6);
    arp.push(4);
    arp.extend_from_slice(&2u16.to_be_bytes()); // reply
    arp.extend_from_slice(&SRC);
    arp.extend_from_slice(&[192, 168, 0, 1]);
    arp.extend_from_slice(&DST);
    arp.extend_from_slice(&[192, 168, 0, 2]);

    let info = parse_packet(&eth(ethtype::ARP, &arp));
    assert!(info.has(Format::NW_ARP));
    assert_eq!(info.arp_ar_op, 2);
    assert_eq!(info.arp_sha, SRC);
    assert_eq!(info.arp_spa, "192.168.0.1".parse::<std::net::Ipv4Addr>().unwrap());
    assert_eq!(info.arp_tha, DST);
    assert_eq!(info.arp_tpa, "192.168.0.2".parse::<std::net::Ipv4Addr>().unwrap());
}

fn ipv6_header(nexthdr: u8, payload_len: u16) -> Vec<u8> {
    let mut header = vec![0u8; 40];
    // version 6, tc 0x0c (dscp 3), flow label 0xbeef
    header[0] = 0x60;
    header[1] = 0xc0;
    header[2..4].copy_from_slice(&0xbeefu16.to_be_bytes());
    header[4..6].copy_from_slice(&payload_len.to_be_bytes());
    header[6] = nexthdr;
    header[7] = 64;
    header[8] = 0xfe;
    header[9] = 0x80;
    header[23] = 0x01;
    header[24] = 0xfe;
    header[25] = 0x80;
    header[39] = 0x02;
    header
}

#[test]
fn ipv6_extension_walk_accumulates_the_bitmap() {
    // hop-by-hop -> routing -> fragment -> udp
    let mut payload = Vec::new();
    let mut hop = vec![0u8; 8];
    hop[0] = net::ipv6_nexthdr::ROUTE;
    hop[1] = 0;
    payload.extend_from_slice(&hop);
    let mut route = vec![0u8; 8];
    route[0] = net::ipv6_nexthdr::FRAG;
    route[1] = 0;
    payload.extend_from_slice(&route);
    let mut frag = vec![0u8; 8];
    frag[0] = ipproto::UDP;
    payload.extend_from_slice(&frag);
    payload.extend_from_slice(&[0, 53, 0, 53, 0, 8, 0, 0]);

    let mut frame = eth(ethtype::IPV6, &[]);
    frame.extend_from_slice(&ipv6_header(net::ipv6_nexthdr::HOPOPT, payload.len() as u16));
    frame.extend_from_slice(&payload);

    let info = parse_packet(&frame);
    assert!(info.has(Format::NW_IPV6 | Format::TP_UDP));
    assert_eq!(
        info.ipv6_exthdr,
        ipv6_exthdr_bits::HOP | ipv6_exthdr_bits::ROUTER | ipv6_exthdr_bits::FRAG
    );
    assert_eq!(info.ipv6_protocol, ipproto::UDP);
    assert_eq!(info.ip_proto, ipproto::UDP);
    assert_eq!(info.udp_dst_port, 53);
}

#[test]
fn ipv6_esp_terminates_the_walk() {
    let mut frame = eth(ethtype::IPV6, &[]);
    frame.extend_from_slice(&ipv6_header(net::ipv6_nexthdr::ESP, 16));
    frame.extend_from_slice(&[0u8; 16]);
    let info = parse_packet(&frame);
    assert_eq!(info.ipv6_exthdr, ipv6_exthdr_bits::ESP);
    assert_eq!(info.ipv6_protocol, net::ipv6_nexthdr::ESP);
}

fn icmpv6_ns(with_sll: bool) -> Vec<u8> {
    let mut body = Vec::new();
    body.push(135);
    body.push(0);
    body.extend_from_slice(&[0, 0]); // checksum
    body.extend_from_slice(&[0, 0, 0, 0]); // reserved
    let target: std::net::Ipv6Addr = "fe80::99".parse().unwrap();
    body.extend_from_slice(&target.octets());
    if with_sll {
        body.push(1); // source link-layer option
        body.push(1); // length in 8-byte units
        body.extend_from_slice(&SRC);
    }
    body
}

#[test]
fn neighbour_solicitation_with_source_link_layer() {
    let body = icmpv6_ns(true);
    let mut frame = eth(ethtype::IPV6, &[]);
    frame.extend_from_slice(&ipv6_header(ipproto::ICMPV6, body.len() as u16));
    frame.extend_from_slice(&body);

    let info = parse_packet(&frame);
    assert!(info.has(Format::NW_ICMPV6));
    assert_eq!(info.icmpv6_type, 135);
    assert_eq!(info.icmpv6_nd_target, "fe80::99".parse::<std::net::Ipv6Addr>().unwrap());
    assert_eq!(info.icmpv6_nd_ll_type, 1);
    assert_eq!(info.icmpv6_nd_sll, SRC);
    assert_eq!(info.icmpv6_nd_tll, [0; 6]);
}

#[test]
fn neighbour_solicitation_without_option() {
    let body = icmpv6_ns(false);
    let mut frame = eth(ethtype::IPV6, &[]);
    frame.extend_from_slice(&ipv6_header(ipproto::ICMPV6, body.len() as u16));
    frame.extend_from_slice(&body);

    let info = parse_packet(&frame);
    assert_eq!(info.icmpv6_nd_target, "fe80::99".parse::<std::net::Ipv6Addr>().unwrap());
    assert_eq!(info.icmpv6_nd_ll_type, 0);
    assert_eq!(info.icmpv6_nd_sll, [0; 6]);
}

#[test]
fn mpls_outermost_label_only() {
    // label 0xabcde, tc 5, bos 0, then a second label that is ignored
    let outer: u32 = (0xabcde << 12) | (5 << 9) | 64;
    let inner: u32 = (0x11111 << 12) | (1 << 8) | 64;
    let mut payload = Vec::new();
    payload.extend_from_slice(&outer.to_be_bytes());
    payload.extend_from_slice(&inner.to_be_bytes());
    let info = parse_packet(&eth(ethtype::MPLS_UNI, &payload));

    assert!(info.has(Format::MPLS));
    assert_eq!(info.mpls_label, 0xabcde);
    assert_eq!(info.mpls_tc, 5);
    assert_eq!(info.mpls_bos, 0);
    assert!(!info.is_ip());
}

#[test]
fn pbb_isid() {
    let mut payload = Vec::new();
    payload.extend_from_slice(&0x00ab_cdefu32.to_be_bytes());
    payload.extend_from_slice(&[0u8; 14]); // backbone c-da/c-sa/type
    let info = parse_packet(&eth(ethtype::PBB, &payload));
    assert!(info.has(Format::PBB));
    assert_eq!(info.pbb_isid, 0x00ab_cdef);
}

#[test]
fn igmp_membership_report() {
    let mut payload = ipv4_header(ipproto::IGMP, 5, 8);
    payload.push(0x16); // v2 membership report
    payload.push(0);
    payload.extend_from_slice(&[0, 0]);
    payload.extend_from_slice(&[224, 0, 0, 251]);
    let info = parse_packet(&eth(ethtype::IPV4, &payload));
    assert!(info.has(Format::NW_IGMP));
    assert_eq!(info.igmp_type, 0x16);
    assert_eq!(info.igmp_group, "224.0.0.251".parse::<std::net::Ipv4Addr>().unwrap());
}

#[test]
fn sctp_ports() {
    let mut payload = ipv4_header(ipproto::SCTP, 5, 12);
    payload.extend_from_slice(&9999u16.to_be_bytes());
    payload.extend_from_slice(&80u16.to_be_bytes());
    payload.extend_from_slice(&[0u8; 8]);
    let info = parse_packet(&eth(ethtype::IPV4, &payload));
    assert!(info.has(Format::TP_SCTP));
    assert_eq!(info.sctp_src_port, 9999);
    assert_eq!(info.sctp_dst_port, 80);
}

#[test]
fn etherip_version() {
    let mut payload = ipv4_header(ipproto::ETHERIP, 5, 16);
    payload.extend_from_slice(&0x3000u16.to_be_bytes());
    payload.extend_from_slice(&[0u8; 14]);
    let info = parse_packet(&eth(ethtype::IPV4, &payload));
    assert!(info.has(Format::TP_ETHERIP));
    assert_eq!(info.etherip_version, 0x3000);
    assert_eq!(info.etherip_offset, 14 + 20 + 2);
}

#[test]
fn agrees_with_etherparse_on_a_udp_frame() {
    let builder = etherparse::PacketBuilder::ethernet2(SRC, DST)
        .ipv4([10, 0, 0, 1], [10, 0, 0, 2], 64)
        .udp(1234, 5353);
    let payload = [1u8, 2, 3, 4];
    let mut frame = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut frame, &payload).unwrap();

    let info = parse_packet(&frame);
    assert!(info.has(Format::ETH_DIX | Format::NW_IPV4 | Format::TP_UDP));
    assert_eq!(info.eth_macsa, SRC);
    assert_eq!(info.udp_src_port, 1234);
    assert_eq!(info.udp_dst_port, 5353);
    assert_eq!(info.l4.payload_length, payload.len());
}
