// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! OXM (OpenFlow eXtensible Match) TLVs.
//!
//! An OXM header is a packed 32-bit tag `(class:16, field:7, has_mask:1,
//! length:8)`. Only the `OFPXMC_OPENFLOW_BASIC` class is spoken here; the
//! legacy Nicira classes are rejected at validation.

mod matches;
pub mod validate;

pub use matches::{MatchField, OxmMatch, OxmTlv};

/// OXM classes (`OFPXMC_*`).
pub const OFPXMC_OPENFLOW_BASIC: u16 = 0x8000;
pub const OFPXMC_EXPERIMENTER: u16 = 0xffff;

/// `OFPXMT_OFB_*` field ids.
pub mod field {
    pub const IN_PORT: u8 = 0;
    pub const IN_PHY_PORT: u8 = 1;
    pub const METADATA: u8 = 2;
    pub const ETH_DST: u8 = 3;
    pub const ETH_SRC: u8 = 4;
    pub const ETH_TYPE: u8 = 5;
    pub const VLAN_VID: u8 = 6;
    pub const VLAN_PCP: u8 = 7;
    pub const IP_DSCP: u8 = 8;
    pub const IP_ECN: u8 = 9;
    pub const IP_PROTO: u8 = 10;
    pub const IPV4_SRC: u8 = 11;
    pub const IPV4_DST: u8 = 12;
    pub const TCP_SRC: u8 = 13;
    pub const TCP_DST: u8 = 14;
    pub const UDP_SRC: u8 = 15;
    pub const UDP_DST: u8 = 16;
    pub const SCTP_SRC: u8 = 17;
    pub const SCTP_DST: u8 = 18;
    pub const ICMPV4_TYPE: u8 = 19;
    pub const ICMPV4_CODE: u8 = 20;
    pub const ARP_OP: u8 = 21;
    pub const ARP_SPA: u8 = 22;
    pub const ARP_TPA: u8 = 23;
    pub const ARP_SHA: u8 = 24;
    pub const ARP_THA: u8 = 25;
    pub const IPV6_SRC: u8 = 26;
    pub const IPV6_DST: u8 = 27;
    pub const IPV6_FLABEL: u8 = 28;
    pub const ICMPV6_TYPE: u8 = 29;
    pub const ICMPV6_CODE: u8 = 30;
    pub const IPV6_ND_TARGET: u8 = 31;
    pub const IPV6_ND_SLL: u8 = 32;
    pub const IPV6_ND_TLL: u8 = 33;
    pub const MPLS_LABEL: u8 = 34;
    pub const MPLS_TC: u8 = 35;
    pub const MPLS_BOS: u8 = 36;
    pub const PBB_ISID: u8 = 37;
    pub const TUNNEL_ID: u8 = 38;
    pub const IPV6_EXTHDR: u8 = 39;

    pub const MAX: u8 = IPV6_EXTHDR;
}

/// `ofp_match.type` values.
pub const OFPMT_STANDARD: u16 = 0;
pub const OFPMT_OXM: u16 = 1;

/// Byte size of the packed OXM header.
pub const OXM_HEADER_LEN: usize = 4;

/// Pack an openflow-basic OXM header.
#[must_use]
pub const fn oxm_header(field: u8, has_mask: bool, payload_len: u8) -> u32 {
    ((OFPXMC_OPENFLOW_BASIC as u32) << 16)
        | ((field as u32) << 9)
        | ((has_mask as u32) << 8)
        | payload_len as u32
}

#[must_use]
pub const fn oxm_class(header: u32) -> u16 {
    (header >> 16) as u16
}

#[must_use]
pub const fn oxm_field(header: u32) -> u8 {
    ((header >> 9) & 0x7f) as u8
}

#[must_use]
pub const fn oxm_has_mask(header: u32) -> bool {
    (header >> 8) & 1 == 1
}

/// Payload length carried in the header (value plus mask, in bytes).
#[must_use]
pub const fn oxm_length(header: u32) -> u8 {
    (header & 0xff) as u8
}

/// Value length in bytes for an openflow-basic field, ignoring the mask.
/// `None` for field ids outside the defined set.
#[must_use]
pub const fn value_length(field_id: u8) -> Option<u8> {
    Some(match field_id {
        field::IN_PORT | field::IN_PHY_PORT => 4,
        field::METADATA | field::TUNNEL_ID => 8,
        field::ETH_DST | field::ETH_SRC => 6,
        field::ETH_TYPE | field::VLAN_VID => 2,
        field::VLAN_PCP | field::IP_DSCP | field::IP_ECN | field::IP_PROTO => 1,
        field::IPV4_SRC | field::IPV4_DST => 4,
        field::TCP_SRC | field::TCP_DST | field::UDP_SRC | field::UDP_DST | field::SCTP_SRC
        | field::SCTP_DST => 2,
        field::ICMPV4_TYPE | field::ICMPV4_CODE => 1,
        field::ARP_OP => 2,
        field::ARP_SPA | field::ARP_TPA => 4,
        field::ARP_SHA | field::ARP_THA => 6,
        field::IPV6_SRC | field::IPV6_DST | field::IPV6_ND_TARGET => 16,
        field::IPV6_FLABEL => 4,
        field::ICMPV6_TYPE | field::ICMPV6_CODE => 1,
        field::IPV6_ND_SLL | field::IPV6_ND_TLL => 6,
        field::MPLS_LABEL => 4,
        field::MPLS_TC | field::MPLS_BOS => 1,
        field::PBB_ISID => 4,
        field::IPV6_EXTHDR => 2,
        _ => return None,
    })
}

/// Whether 1.3 defines a masked variant for the field.
#[must_use]
pub const fn maskable(field_id: u8) -> bool {
    matches!(
        field_id,
        field::METADATA
            | field::ETH_DST
            | field::ETH_SRC
            | field::VLAN_VID
            | field::IPV4_SRC
            | field::IPV4_DST
            | field::ARP_SPA
            | field::ARP_TPA
            | field::ARP_SHA
            | field::ARP_THA
            | field::IPV6_SRC
            | field::IPV6_DST
            | field::IPV6_FLABEL
            | field::PBB_ISID
            | field::TUNNEL_ID
            | field::IPV6_EXTHDR
    )
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn header_packs_and_unpacks() {
        let hdr = oxm_header(field::IPV4_SRC, true, 8);
        assert_eq!(hdr, 0x8000_1708);
        assert_eq!(oxm_class(hdr), OFPXMC_OPENFLOW_BASIC);
        assert_eq!(oxm_field(hdr), field::IPV4_SRC);
        assert!(oxm_has_mask(hdr));
        assert_eq!(oxm_length(hdr), 8);
    }

    #[test]
    fn well_known_headers() {
        assert_eq!(oxm_header(field::IN_PORT, false, 4), 0x8000_0004);
        assert_eq!(oxm_header(field::ETH_TYPE, false, 2), 0x8000_0a02);
        assert_eq!(oxm_header(field::VLAN_VID, false, 2), 0x8000_0c02);
        assert_eq!(oxm_header(field::IPV6_EXTHDR, false, 2), 0x8000_4e02);
    }

    #[test]
    fn value_lengths_cover_all_fields() {
        for id in 0..=field::MAX {
            assert!(value_length(id).is_some(), "field {id}");
        }
        assert!(value_length(field::MAX + 1).is_none());
    }
}
