// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! Build an OXM match that describes a dissected frame.
//!
//! Emission order follows the prerequisite chain so the produced match
//! always re-validates: in_port, L2 fields, eth_type, then the L3 and L4
//! fields the resolved types call for. A caller-supplied [`MaskFields`]
//! can wildcard individual fields away and attach bit masks to the
//! maskable ones; with no mask every field the frame carries is emitted.

use std::net::{Ipv4Addr, Ipv6Addr};

use net::{Format, PacketInfo, ethtype, ipproto};
use openflow::oxm::{OxmMatch, field};

/// Per-field wildcarding plus the masks applied to maskable fields.
#[derive(Debug, Clone)]
pub struct MaskFields {
    /// Bit `n` set = wildcard OXM field id `n` away.
    pub wildcards: u64,
    pub eth_src: [u8; 6],
    pub eth_dst: [u8; 6],
    pub vlan_vid: u16,
    pub ipv4_src: Ipv4Addr,
    pub ipv4_dst: Ipv4Addr,
    pub ipv6_src: Ipv6Addr,
    pub ipv6_dst: Ipv6Addr,
    pub ipv6_flabel: u32,
    pub ipv6_exthdr: u16,
    pub arp_spa: Ipv4Addr,
    pub arp_tpa: Ipv4Addr,
    pub arp_sha: [u8; 6],
    pub arp_tha: [u8; 6],
    pub pbb_isid: u32,
}

impl Default for MaskFields {
    fn default() -> MaskFields {
        MaskFields {
            wildcards: 0,
            eth_src: [0xff; 6],
            eth_dst: [0xff; 6],
            vlan_vid: 0xffff,
            ipv4_src: Ipv4Addr::BROADCAST,
            ipv4_dst: Ipv4Addr::BROADCAST,
            ipv6_src: Ipv6Addr::from(u128::MAX),
            ipv6_dst: Ipv6Addr::from(u128::MAX),
            ipv6_flabel: 0xffff_ffff,
            ipv6_exthdr: 0xffff,
            arp_spa: Ipv4Addr::BROADCAST,
            arp_tpa: Ipv4Addr::BROADCAST,
            arp_sha: [0xff; 6],
            arp_tha: [0xff; 6],
            pbb_isid: 0xffff_ffff,
        }
    }
}

impl MaskFields {
    fn wants(&self, field_id: u8) -> bool {
        self.wildcards & (1 << field_id) == 0
    }
}

fn wants(mask: Option<&MaskFields>, field_id: u8) -> bool {
    mask.is_none_or(|m| m.wants(field_id))
}

/// Emit the match for `info` as received on `in_port`.
#[must_use]
pub fn match_from_packet(
    in_port: u32,
    mask: Option<&MaskFields>,
    info: &PacketInfo,
) -> OxmMatch {
    let mut oxm = OxmMatch::new();

    if wants(mask, field::IN_PORT) {
        oxm.append_in_port(in_port);
    }

    // layer 2
    if wants(mask, field::ETH_SRC) {
        oxm.append_eth_src(info.eth_macsa, mask.map(|m| m.eth_src));
    }
    if wants(mask, field::ETH_DST) {
        oxm.append_eth_dst(info.eth_macda, mask.map(|m| m.eth_dst));
    }
    if wants(mask, field::PBB_ISID) && info.is_pbb() {
        oxm.append_pbb_isid(info.pbb_isid, mask.map(|m| m.pbb_isid));
    }
    if wants(mask, field::VLAN_VID) {
        if info.is_vlan_tagged() {
            oxm.append_vlan_vid(info.vlan_vid, mask.map(|m| m.vlan_vid));
        } else {
            oxm.append_vlan_vid(openflow::consts::OFPVID_NONE, mask.map(|m| m.vlan_vid));
        }
    }
    if wants(mask, field::VLAN_PCP) && info.is_vlan_tagged() {
        oxm.append_vlan_pcp(info.vlan_prio);
    }
    if wants(mask, field::ETH_TYPE) {
        oxm.append_eth_type(info.eth_type);
    }

    // layer 3
    match info.eth_type {
        ethtype::IPV4 => {
            if wants(mask, field::IP_DSCP) {
                oxm.append_ip_dscp(info.ipv4_dscp);
            }
            if wants(mask, field::IP_ECN) {
                oxm.append_ip_ecn(info.ipv4_ecn);
            }
            if wants(mask, field::IP_PROTO) {
                oxm.append_ip_proto(info.ipv4_protocol);
            }
            if wants(mask, field::IPV4_SRC) {
                oxm.append_ipv4_src(info.ipv4_saddr, mask.map(|m| m.ipv4_src));
            }
            if wants(mask, field::IPV4_DST) {
                oxm.append_ipv4_dst(info.ipv4_daddr, mask.map(|m| m.ipv4_dst));
            }
        }
        ethtype::IPV6 => {
            if wants(mask, field::IP_DSCP) {
                oxm.append_ip_dscp(info.ipv6_dscp);
            }
            if wants(mask, field::IP_ECN) {
                oxm.append_ip_ecn(info.ipv6_ecn);
            }
            if wants(mask, field::IP_PROTO) {
                oxm.append_ip_proto(info.ipv6_protocol);
            }
            if wants(mask, field::IPV6_SRC) {
                oxm.append_ipv6_src(info.ipv6_saddr, mask.map(|m| m.ipv6_src));
            }
            if wants(mask, field::IPV6_DST) {
                oxm.append_ipv6_dst(info.ipv6_daddr, mask.map(|m| m.ipv6_dst));
            }
            if wants(mask, field::IPV6_FLABEL) {
                oxm.append_ipv6_flabel(info.ipv6_flowlabel, mask.map(|m| m.ipv6_flabel));
            }
            if wants(mask, field::IPV6_EXTHDR) {
                oxm.append_ipv6_exthdr(info.ipv6_exthdr, mask.map(|m| m.ipv6_exthdr));
            }
        }
        ethtype::ARP => {
            if wants(mask, field::ARP_OP) {
                oxm.append_arp_op(info.arp_ar_op);
            }
            if wants(mask, field::ARP_SPA) {
                oxm.append_arp_spa(info.arp_spa, mask.map(|m| m.arp_spa));
            }
            if wants(mask, field::ARP_TPA) {
                oxm.append_arp_tpa(info.arp_tpa, mask.map(|m| m.arp_tpa));
            }
            if wants(mask, field::ARP_SHA) {
                oxm.append_arp_sha(info.arp_sha, mask.map(|m| m.arp_sha));
            }
            if wants(mask, field::ARP_THA) {
                oxm.append_arp_tha(info.arp_tha, mask.map(|m| m.arp_tha));
            }
        }
        ethtype::MPLS_UNI | ethtype::MPLS_MLT => {
            if wants(mask, field::MPLS_LABEL) {
                oxm.append_mpls_label(info.mpls_label);
            }
            if wants(mask, field::MPLS_TC) {
                oxm.append_mpls_tc(info.mpls_tc);
            }
            if wants(mask, field::MPLS_BOS) {
                oxm.append_mpls_bos(info.mpls_bos);
            }
        }
        _ => {}
    }

    // layer 4
    if info.eth_type == ethtype::IPV4 || info.eth_type == ethtype::IPV6 {
        match info.ip_proto {
            ipproto::ICMP if info.has(Format::NW_ICMPV4) => {
                if wants(mask, field::ICMPV4_TYPE) {
                    oxm.append_icmpv4_type(info.icmpv4_type);
                }
                if wants(mask, field::ICMPV4_CODE) {
                    oxm.append_icmpv4_code(info.icmpv4_code);
                }
            }
            ipproto::TCP if info.has(Format::TP_TCP) => {
                if wants(mask, field::TCP_SRC) {
                    oxm.append_tcp_src(info.tcp_src_port);
                }
                if wants(mask, field::TCP_DST) {
                    oxm.append_tcp_dst(info.tcp_dst_port);
                }
            }
            ipproto::UDP if info.has(Format::TP_UDP) => {
                if wants(mask, field::UDP_SRC) {
                    oxm.append_udp_src(info.udp_src_port);
                }
                if wants(mask, field::UDP_DST) {
                    oxm.append_udp_dst(info.udp_dst_port);
                }
            }
            ipproto::SCTP if info.has(Format::TP_SCTP) => {
                if wants(mask, field::SCTP_SRC) {
                    oxm.append_sctp_src(info.sctp_src_port);
                }
                if wants(mask, field::SCTP_DST) {
                    oxm.append_sctp_dst(info.sctp_dst_port);
                }
            }
            ipproto::ICMPV6 if info.has(Format::NW_ICMPV6) => {
                if wants(mask, field::ICMPV6_TYPE) {
                    oxm.append_icmpv6_type(info.icmpv6_type);
                }
                if wants(mask, field::ICMPV6_CODE) {
                    oxm.append_icmpv6_code(info.icmpv6_code);
                }
                if info.icmpv6_type == 135 {
                    if wants(mask, field::IPV6_ND_TARGET) {
                        oxm.append_ipv6_nd_target(info.icmpv6_nd_target);
                    }
                    if info.icmpv6_nd_ll_type == 1
                        && info.icmpv6_nd_ll_length == 1
                        && wants(mask, field::IPV6_ND_SLL)
                    {
                        oxm.append_ipv6_nd_sll(info.icmpv6_nd_sll);
                    }
                } else if info.icmpv6_type == 136 {
                    if wants(mask, field::IPV6_ND_TARGET) {
                        oxm.append_ipv6_nd_target(info.icmpv6_nd_target);
                    }
                    if info.icmpv6_nd_ll_type == 2
                        && info.icmpv6_nd_ll_length == 1
                        && wants(mask, field::IPV6_ND_TLL)
                    {
                        oxm.append_ipv6_nd_tll(info.icmpv6_nd_tll);
                    }
                }
            }
            _ => {}
        }
    }

    oxm
}

#[cfg(test)]
mod test {
    use super::*;
    use openflow::oxm::validate::validate_match;
    use openflow::Buffer;

    fn validate(oxm: &OxmMatch) {
        let mut buf = Buffer::new();
        oxm.pack(&mut buf);
        assert!(validate_match(buf.as_slice()).is_ok(), "{oxm:?}");
    }

    fn tcp_frame() -> Vec<u8> {
        let mut frame = vec![0u8; 54];
        frame[12] = 0x08; // ipv4
        frame[14] = 0x45;
        frame[23] = 6; // tcp
        frame[26..30].copy_from_slice(&[10, 0, 0, 1]);
        frame[30..34].copy_from_slice(&[10, 0, 0, 2]);
        frame[34..36].copy_from_slice(&4321u16.to_be_bytes());
        frame[36..38].copy_from_slice(&80u16.to_be_bytes());
        frame[46] = 5 << 4;
        frame
    }

    #[test]
    fn untagged_frame_gets_vid_none() {
        let info = net::parse_packet(&tcp_frame());
        let oxm = match_from_packet(7, None, &info);
        validate(&oxm);

        let vid = oxm.find(field::VLAN_VID).unwrap();
        assert_eq!(vid.value(), &openflow::consts::OFPVID_NONE.to_be_bytes());
        assert!(oxm.find(field::VLAN_PCP).is_none());
        assert!(oxm.find(field::IN_PORT).is_some());
        assert_eq!(oxm.find(field::TCP_DST).unwrap().value(), &80u16.to_be_bytes());
    }

    #[test]
    fn wildcards_suppress_fields() {
        let info = net::parse_packet(&tcp_frame());
        let mask = MaskFields {
            wildcards: (1 << field::IN_PORT) | (1 << field::TCP_SRC),
            ..MaskFields::default()
        };
        let oxm = match_from_packet(7, Some(&mask), &info);
        validate(&oxm);
        assert!(oxm.find(field::IN_PORT).is_none());
        assert!(oxm.find(field::TCP_SRC).is_none());
        assert!(oxm.find(field::TCP_DST).is_some());
    }

    #[test]
    fn per_field_masks_are_applied() {
        let info = net::parse_packet(&tcp_frame());
        let mask = MaskFields {
            ipv4_src: "255.255.0.0".parse().unwrap(),
            ..MaskFields::default()
        };
        let oxm = match_from_packet(7, Some(&mask), &info);
        validate(&oxm);
        let src = oxm.find(field::IPV4_SRC).unwrap();
        assert_eq!(src.mask(), Some(&[0xff, 0xff, 0, 0][..]));
    }

    #[test]
    fn neighbour_solicitation_emits_target_and_sll_only() {
        let mut frame = vec![0u8; 14 + 40 + 32];
        frame[12..14].copy_from_slice(&0x86ddu16.to_be_bytes());
        frame[14] = 0x60;
        frame[18..20].copy_from_slice(&32u16.to_be_bytes());
        frame[20] = 58; // icmpv6
        frame[54] = 135;
        frame[62..78].copy_from_slice(&"fe80::1".parse::<Ipv6Addr>().unwrap().octets());
        frame[78] = 1; // sll option
        frame[79] = 1;
        frame[80..86].copy_from_slice(&[2, 0, 0, 0, 0, 9]);

        let info = net::parse_packet(&frame);
        let oxm = match_from_packet(1, None, &info);
        validate(&oxm);
        assert!(oxm.find(field::IPV6_ND_TARGET).is_some());
        assert!(oxm.find(field::IPV6_ND_SLL).is_some());
        assert!(oxm.find(field::IPV6_ND_TLL).is_none());
    }
}
