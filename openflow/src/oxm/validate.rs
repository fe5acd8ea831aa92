// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! Single-sweep validation of a packed `ofp_match`.
//!
//! The sweep tracks the prerequisite state (last-seen eth_type, ip_proto,
//! icmpv6_type, whether in_port / a present vlan vid appeared) and
//! enforces the value-range invariants for the narrow fields. It walks
//! the raw TLV bytes so it can run before anything is decoded.

use tracing::debug;

use crate::consts::{
    IP_DSCP_MASK, IP_ECN_MASK, IPV6_EXTHDR_MASK, IPV6_FLABEL_MASK, MPLS_BOS_MASK, MPLS_LABEL_MASK,
    MPLS_TC_MASK, OFPVID_PRESENT, PBB_ISID_MASK, VLAN_PCP_MASK, VLAN_VID_MASK,
};
use crate::error::ErrorKind;
use crate::oxm::{
    OFPXMC_OPENFLOW_BASIC, OXM_HEADER_LEN, field, oxm_class, oxm_field, oxm_length,
};

const ETH_TYPE_IPV4: u16 = 0x0800;
const ETH_TYPE_ARP: u16 = 0x0806;
const ETH_TYPE_IPV6: u16 = 0x86dd;
const ETH_TYPE_MPLS_UNI: u16 = 0x8847;
const ETH_TYPE_MPLS_MLT: u16 = 0x8848;
const ETH_TYPE_PBB: u16 = 0x88e7;

const IPPROTO_ICMP: u8 = 1;
const IPPROTO_TCP: u8 = 6;
const IPPROTO_UDP: u8 = 17;
const IPPROTO_ICMPV6: u8 = 58;
const IPPROTO_SCTP: u8 = 132;

const ND_SOLICIT: u8 = 135;
const ND_ADVERT: u8 = 136;

/// Validate the raw TLV region of a match (the bytes after the 4-byte
/// `ofp_match` header, `length - 4` of them, pad excluded).
pub fn validate_oxms(mut oxms: &[u8]) -> Result<(), ErrorKind> {
    let mut in_port_present = false;
    let mut vid_present = false;
    let mut eth_type_val: u16 = 0;
    let mut ip_proto_val: u8 = 0;
    let mut icmpv6_type_val: u8 = 0;

    while oxms.len() > OXM_HEADER_LEN {
        let header = u32::from_be_bytes([oxms[0], oxms[1], oxms[2], oxms[3]]);
        let tlv_len = OXM_HEADER_LEN + oxm_length(header) as usize;
        if oxms.len() < tlv_len {
            return Err(ErrorKind::InvalidLength);
        }
        if oxm_class(header) != OFPXMC_OPENFLOW_BASIC {
            return Err(ErrorKind::InvalidMatchType);
        }

        let payload = &oxms[OXM_HEADER_LEN..tlv_len];
        let field_id = oxm_field(header);
        match field_id {
            field::IN_PORT => in_port_present = true,
            field::IN_PHY_PORT => {
                if !in_port_present {
                    debug!("in_phy_port without in_port");
                    return Err(ErrorKind::BadMatchPrereq);
                }
            }
            field::METADATA | field::ETH_DST | field::ETH_SRC | field::TUNNEL_ID => {}
            field::ETH_TYPE => {
                eth_type_val = be_u16(payload)?;
            }
            field::VLAN_VID => {
                let vid = be_u16(payload)?;
                if vid & !VLAN_VID_MASK != 0 {
                    return Err(ErrorKind::InvalidVlanVid);
                }
                let mask = if payload.len() >= 4 {
                    be_u16(&payload[2..])?
                } else {
                    0xffff
                };
                if mask & OFPVID_PRESENT != 0 && vid & OFPVID_PRESENT != 0 {
                    vid_present = true;
                }
            }
            field::VLAN_PCP => {
                if !vid_present {
                    debug!("vlan_pcp without a present vlan_vid");
                    return Err(ErrorKind::BadMatchPrereq);
                }
                if first(payload)? & !VLAN_PCP_MASK != 0 {
                    return Err(ErrorKind::InvalidVlanPcp);
                }
            }
            field::IP_DSCP => {
                require_ip(eth_type_val, field_id)?;
                if first(payload)? & !IP_DSCP_MASK != 0 {
                    return Err(ErrorKind::InvalidIpDscp);
                }
            }
            field::IP_ECN => {
                require_ip(eth_type_val, field_id)?;
                if first(payload)? & !IP_ECN_MASK != 0 {
                    return Err(ErrorKind::InvalidIpEcn);
                }
            }
            field::IP_PROTO => {
                require_ip(eth_type_val, field_id)?;
                ip_proto_val = first(payload)?;
            }
            field::IPV4_SRC | field::IPV4_DST => {
                require_eth_type(eth_type_val, ETH_TYPE_IPV4, field_id)?;
            }
            field::TCP_SRC | field::TCP_DST => {
                require_ip_proto(ip_proto_val, IPPROTO_TCP, field_id)?;
            }
            field::UDP_SRC | field::UDP_DST => {
                require_ip_proto(ip_proto_val, IPPROTO_UDP, field_id)?;
            }
            field::SCTP_SRC | field::SCTP_DST => {
                require_ip_proto(ip_proto_val, IPPROTO_SCTP, field_id)?;
            }
            field::ICMPV4_TYPE | field::ICMPV4_CODE => {
                require_ip_proto(ip_proto_val, IPPROTO_ICMP, field_id)?;
            }
            field::ARP_OP | field::ARP_SPA | field::ARP_TPA | field::ARP_SHA | field::ARP_THA => {
                require_eth_type(eth_type_val, ETH_TYPE_ARP, field_id)?;
            }
            field::IPV6_SRC | field::IPV6_DST => {
                require_eth_type(eth_type_val, ETH_TYPE_IPV6, field_id)?;
            }
            field::IPV6_FLABEL => {
                require_eth_type(eth_type_val, ETH_TYPE_IPV6, field_id)?;
                if be_u32(payload)? & !IPV6_FLABEL_MASK != 0 {
                    return Err(ErrorKind::InvalidIpv6Flabel);
                }
            }
            field::ICMPV6_TYPE => {
                require_ip_proto(ip_proto_val, IPPROTO_ICMPV6, field_id)?;
                icmpv6_type_val = first(payload)?;
            }
            field::ICMPV6_CODE => {
                require_ip_proto(ip_proto_val, IPPROTO_ICMPV6, field_id)?;
            }
            field::IPV6_ND_TARGET => {
                if icmpv6_type_val != ND_SOLICIT && icmpv6_type_val != ND_ADVERT {
                    debug!("ipv6_nd_target with icmpv6 type {icmpv6_type_val}");
                    return Err(ErrorKind::BadMatchPrereq);
                }
            }
            field::IPV6_ND_SLL => {
                if icmpv6_type_val != ND_SOLICIT {
                    debug!("ipv6_nd_sll with icmpv6 type {icmpv6_type_val}");
                    return Err(ErrorKind::BadMatchPrereq);
                }
            }
            field::IPV6_ND_TLL => {
                if icmpv6_type_val != ND_ADVERT {
                    debug!("ipv6_nd_tll with icmpv6 type {icmpv6_type_val}");
                    return Err(ErrorKind::BadMatchPrereq);
                }
            }
            field::MPLS_LABEL => {
                require_mpls(eth_type_val, field_id)?;
                if be_u32(payload)? & !MPLS_LABEL_MASK != 0 {
                    return Err(ErrorKind::InvalidMplsLabel);
                }
            }
            field::MPLS_TC => {
                require_mpls(eth_type_val, field_id)?;
                if first(payload)? & !MPLS_TC_MASK != 0 {
                    return Err(ErrorKind::InvalidMplsTc);
                }
            }
            field::MPLS_BOS => {
                require_mpls(eth_type_val, field_id)?;
                if first(payload)? & !MPLS_BOS_MASK != 0 {
                    return Err(ErrorKind::InvalidMplsBos);
                }
            }
            field::PBB_ISID => {
                require_eth_type(eth_type_val, ETH_TYPE_PBB, field_id)?;
                if be_u32(payload)? & !PBB_ISID_MASK != 0 {
                    return Err(ErrorKind::InvalidPbbIsid);
                }
            }
            field::IPV6_EXTHDR => {
                require_eth_type(eth_type_val, ETH_TYPE_IPV6, field_id)?;
                if be_u16(payload)? & !IPV6_EXTHDR_MASK != 0 {
                    return Err(ErrorKind::InvalidIpv6Exthdr);
                }
            }
            _ => {
                debug!("undefined oxm field ( field = {field_id:#x} )");
                return Err(ErrorKind::InvalidMatchType);
            }
        }

        oxms = &oxms[tlv_len..];
    }

    if oxms.is_empty() {
        Ok(())
    } else {
        Err(ErrorKind::InvalidLength)
    }
}

fn first(payload: &[u8]) -> Result<u8, ErrorKind> {
    payload.first().copied().ok_or(ErrorKind::InvalidLength)
}

fn be_u16(payload: &[u8]) -> Result<u16, ErrorKind> {
    if payload.len() < 2 {
        return Err(ErrorKind::InvalidLength);
    }
    Ok(u16::from_be_bytes([payload[0], payload[1]]))
}

fn be_u32(payload: &[u8]) -> Result<u32, ErrorKind> {
    if payload.len() < 4 {
        return Err(ErrorKind::InvalidLength);
    }
    Ok(u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]))
}

fn require_eth_type(seen: u16, want: u16, field_id: u8) -> Result<(), ErrorKind> {
    if seen != want {
        debug!("field {field_id} requires eth_type {want:#x}, saw {seen:#x}");
        return Err(ErrorKind::BadMatchPrereq);
    }
    Ok(())
}

fn require_ip(seen: u16, field_id: u8) -> Result<(), ErrorKind> {
    if seen != ETH_TYPE_IPV4 && seen != ETH_TYPE_IPV6 {
        debug!("field {field_id} requires an ip eth_type, saw {seen:#x}");
        return Err(ErrorKind::BadMatchPrereq);
    }
    Ok(())
}

fn require_ip_proto(seen: u8, want: u8, field_id: u8) -> Result<(), ErrorKind> {
    if seen != want {
        debug!("field {field_id} requires ip_proto {want:#x}, saw {seen:#x}");
        return Err(ErrorKind::BadMatchPrereq);
    }
    Ok(())
}

fn require_mpls(seen: u16, field_id: u8) -> Result<(), ErrorKind> {
    if seen != ETH_TYPE_MPLS_UNI && seen != ETH_TYPE_MPLS_MLT {
        debug!("field {field_id} requires an mpls eth_type, saw {seen:#x}");
        return Err(ErrorKind::BadMatchPrereq);
    }
    Ok(())
}

/// Validate a packed `ofp_match` starting at `raw` (header included).
/// Returns the declared match length on success.
pub fn validate_match(raw: &[u8]) -> Result<u16, ErrorKind> {
    if raw.len() < 4 {
        return Err(ErrorKind::InvalidLength);
    }
    let declared = u16::from_be_bytes([raw[2], raw[3]]);
    if (declared as usize) < 4 || raw.len() < declared as usize {
        return Err(ErrorKind::InvalidLength);
    }
    validate_oxms(&raw[4..declared as usize])?;
    Ok(declared)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::buffer::Buffer;
    use crate::oxm::OxmMatch;

    fn packed(m: &OxmMatch) -> Vec<u8> {
        let mut buf = Buffer::new();
        m.pack(&mut buf);
        buf.into_vec()
    }

    #[test]
    fn ip_proto_alone_fails_prereq() {
        let mut m = OxmMatch::new();
        m.append_ip_proto(6);
        assert_eq!(validate_match(&packed(&m)), Err(ErrorKind::BadMatchPrereq));
    }

    #[test]
    fn eth_type_before_ip_proto_passes() {
        let mut m = OxmMatch::new();
        m.append_eth_type(0x0800);
        m.append_ip_proto(6);
        m.append_tcp_dst(80);
        assert!(validate_match(&packed(&m)).is_ok());
    }

    #[test]
    fn vlan_pcp_needs_a_present_vid() {
        let mut bad = OxmMatch::new();
        bad.append_vlan_pcp(3);
        assert_eq!(validate_match(&packed(&bad)), Err(ErrorKind::BadMatchPrereq));

        let mut good = OxmMatch::new();
        good.append_vlan_vid(10, None);
        good.append_vlan_pcp(3);
        assert!(validate_match(&packed(&good)).is_ok());
    }

    #[test]
    fn in_phy_port_needs_in_port() {
        let mut bad = OxmMatch::new();
        bad.append_in_phy_port(1);
        assert_eq!(validate_match(&packed(&bad)), Err(ErrorKind::BadMatchPrereq));

        let mut good = OxmMatch::new();
        good.append_in_port(1);
        good.append_in_phy_port(1);
        assert!(validate_match(&packed(&good)).is_ok());
    }

    #[test]
    fn nd_fields_are_keyed_on_icmpv6_type() {
        let mut sll = OxmMatch::new();
        sll.append_eth_type(0x86dd);
        sll.append_ip_proto(58);
        sll.append_icmpv6_type(135);
        sll.append_ipv6_nd_sll([0; 6]);
        assert!(validate_match(&packed(&sll)).is_ok());

        let mut tll = OxmMatch::new();
        tll.append_eth_type(0x86dd);
        tll.append_ip_proto(58);
        tll.append_icmpv6_type(135);
        tll.append_ipv6_nd_tll([0; 6]);
        assert_eq!(validate_match(&packed(&tll)), Err(ErrorKind::BadMatchPrereq));
    }

    #[test]
    fn bad_class_is_invalid_match_type() {
        // 0xffff class, field 0, length 4
        let raw: [u8; 16] = [
            0x00, 0x01, 0x00, 0x0c, 0xff, 0xff, 0x00, 0x04, 0, 0, 0, 1, 0, 0, 0, 0,
        ];
        assert_eq!(validate_match(&raw), Err(ErrorKind::InvalidMatchType));
    }

    #[test]
    fn out_of_range_wire_value_is_rejected() {
        // eth_type ipv6 + flabel with high bits set
        let mut raw = vec![0x00, 0x01, 0x00, 0x12];
        raw.extend_from_slice(&0x8000_0a02u32.to_be_bytes());
        raw.extend_from_slice(&0x86ddu16.to_be_bytes());
        raw.extend_from_slice(&0x8000_3804u32.to_be_bytes());
        raw.extend_from_slice(&0xfff0_0000u32.to_be_bytes());
        raw.resize(24, 0);
        assert_eq!(validate_match(&raw), Err(ErrorKind::InvalidIpv6Flabel));
    }

    #[test]
    fn trailing_garbage_is_invalid_length() {
        let mut m = OxmMatch::new();
        m.append_in_port(1);
        let mut raw = packed(&m);
        // declare three extra bytes that are not a whole tlv
        raw[3] = raw[3].wrapping_add(3);
        raw.extend_from_slice(&[0, 0, 0]);
        assert_eq!(validate_match(&raw), Err(ErrorKind::InvalidLength));
    }
}
