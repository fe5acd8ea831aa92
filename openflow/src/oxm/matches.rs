// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! Ordered OXM match lists and their wire form.

use std::net::{Ipv4Addr, Ipv6Addr};

use tracing::warn;

use crate::buffer::Buffer;
use crate::consts::{
    ETH_ADDRLEN, IP_DSCP_MASK, IP_ECN_MASK, IPV6_EXTHDR_MASK, IPV6_FLABEL_MASK, MPLS_BOS_MASK,
    MPLS_LABEL_MASK, MPLS_TC_MASK, OFPVID_NONE, OFPVID_PRESENT, PBB_ISID_MASK, VLAN_PCP_MASK,
    VLAN_VID_MASK,
};
use crate::error::ErrorKind;
use crate::oxm::{
    OFPMT_OXM, OXM_HEADER_LEN, field, oxm_field, oxm_has_mask, oxm_header, oxm_length,
    value_length,
};
use crate::pad_to_64;

/// A single OXM TLV: packed header plus value (plus mask when the header
/// carries the has-mask bit).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OxmTlv {
    header: u32,
    value: Vec<u8>,
    mask: Option<Vec<u8>>,
}

impl OxmTlv {
    /// Build a TLV for an openflow-basic field. The value must be exactly
    /// the field's defined width; the mask, when given, likewise.
    #[must_use]
    pub fn new(field_id: u8, value: Vec<u8>, mask: Option<Vec<u8>>) -> Option<OxmTlv> {
        let want = value_length(field_id)? as usize;
        if value.len() != want {
            return None;
        }
        if let Some(mask) = &mask {
            if mask.len() != want {
                return None;
            }
        }
        let payload = value.len() + mask.as_ref().map_or(0, Vec::len);
        Some(OxmTlv {
            header: oxm_header(field_id, mask.is_some(), payload as u8),
            value,
            mask,
        })
    }

    /// Decode one TLV from the front of `raw`. Returns the TLV and the
    /// number of bytes consumed. Assumes the bytes already validated.
    pub fn parse(raw: &[u8]) -> Result<(OxmTlv, usize), ErrorKind> {
        if raw.len() < OXM_HEADER_LEN {
            return Err(ErrorKind::InvalidLength);
        }
        let header = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
        let payload = oxm_length(header) as usize;
        if raw.len() < OXM_HEADER_LEN + payload {
            return Err(ErrorKind::InvalidLength);
        }
        let field_id = oxm_field(header);
        let value_len = value_length(field_id).ok_or(ErrorKind::InvalidMatchType)? as usize;
        let has_mask = oxm_has_mask(header);
        let want = if has_mask { value_len * 2 } else { value_len };
        if payload != want {
            return Err(ErrorKind::InvalidLength);
        }
        let value = raw[OXM_HEADER_LEN..OXM_HEADER_LEN + value_len].to_vec();
        let mask = has_mask
            .then(|| raw[OXM_HEADER_LEN + value_len..OXM_HEADER_LEN + payload].to_vec());
        Ok((OxmTlv { header, value, mask }, OXM_HEADER_LEN + payload))
    }

    #[must_use]
    pub fn header(&self) -> u32 {
        self.header
    }

    #[must_use]
    pub fn field_id(&self) -> u8 {
        oxm_field(self.header)
    }

    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    #[must_use]
    pub fn mask(&self) -> Option<&[u8]> {
        self.mask.as_deref()
    }

    /// Bytes this TLV occupies on the wire.
    #[must_use]
    pub fn wire_len(&self) -> usize {
        OXM_HEADER_LEN + oxm_length(self.header) as usize
    }

    pub fn pack(&self, buf: &mut Buffer) {
        buf.put_u32(self.header);
        buf.put_bytes(&self.value);
        if let Some(mask) = &self.mask {
            buf.put_bytes(mask);
        }
    }

    /// The value with the mask applied (all-ones when unmasked).
    fn masked_value(&self) -> Vec<u8> {
        match &self.mask {
            None => self.value.clone(),
            Some(mask) => self.value.iter().zip(mask).map(|(v, m)| v & m).collect(),
        }
    }
}

/// Alias kept for call sites that deal in single decoded fields.
pub type MatchField = OxmTlv;

/// An ordered list of OXM TLVs with a cached total wire length.
///
/// Insertion order is the on-wire order. Equality of two matches is
/// order-independent; see [`OxmMatch::strict_eq`] and
/// [`OxmMatch::subsumes`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OxmMatch {
    fields: Vec<OxmTlv>,
    tlv_len: usize,
}

impl OxmMatch {
    #[must_use]
    pub fn new() -> OxmMatch {
        OxmMatch::default()
    }

    #[must_use]
    pub fn n_matches(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Total bytes of the TLVs, excluding the `ofp_match` header and pad.
    #[must_use]
    pub fn tlv_length(&self) -> usize {
        self.tlv_len
    }

    /// `ofp_match.length`: header plus TLVs, excluding the trailing pad.
    #[must_use]
    pub fn match_length(&self) -> usize {
        4 + self.tlv_len
    }

    /// Bytes the packed match occupies including the 64-bit pad.
    #[must_use]
    pub fn padded_length(&self) -> usize {
        let len = self.match_length();
        len + pad_to_64(len)
    }

    pub fn iter(&self) -> impl Iterator<Item = &OxmTlv> {
        self.fields.iter()
    }

    #[must_use]
    pub fn find(&self, field_id: u8) -> Option<&OxmTlv> {
        self.fields.iter().find(|tlv| tlv.field_id() == field_id)
    }

    /// Append a pre-built TLV at the tail.
    pub fn push(&mut self, tlv: OxmTlv) {
        self.tlv_len += tlv.wire_len();
        self.fields.push(tlv);
    }

    /// Write the whole `ofp_match` (type, length, TLVs, zero pad).
    pub fn pack(&self, buf: &mut Buffer) {
        let length = self.match_length();
        buf.put_u16(OFPMT_OXM);
        buf.put_u16(length as u16);
        for tlv in &self.fields {
            tlv.pack(buf);
        }
        buf.put_zeros(pad_to_64(length));
    }

    /// Decode a packed `ofp_match` region (header plus `length` bytes of
    /// TLVs). The caller is responsible for having validated the bytes;
    /// this only refuses structurally impossible input.
    pub fn unpack(raw: &[u8]) -> Result<OxmMatch, ErrorKind> {
        if raw.len() < 4 {
            return Err(ErrorKind::InvalidLength);
        }
        let declared = u16::from_be_bytes([raw[2], raw[3]]) as usize;
        if declared < 4 || raw.len() < declared {
            return Err(ErrorKind::InvalidLength);
        }
        let mut oxms = &raw[4..declared];
        let mut parsed = OxmMatch::new();
        while !oxms.is_empty() {
            let (tlv, consumed) = OxmTlv::parse(oxms)?;
            parsed.push(tlv);
            oxms = &oxms[consumed..];
        }
        Ok(parsed)
    }

    /// Order-independent strict equality: same field set, same values,
    /// same masks.
    #[must_use]
    pub fn strict_eq(&self, other: &OxmMatch) -> bool {
        if self.fields.len() != other.fields.len() {
            return false;
        }
        self.fields.iter().all(|tlv| {
            other
                .find(tlv.field_id())
                .is_some_and(|peer| peer.value == tlv.value && peer.mask == tlv.mask)
        })
    }

    /// Permissive comparison: does `concrete` satisfy every field of this
    /// (possibly wildcarded) match? Fields absent from `self` are
    /// wildcards; this match's masks are applied to both sides.
    #[must_use]
    pub fn subsumes(&self, concrete: &OxmMatch) -> bool {
        self.fields.iter().all(|tlv| {
            concrete.find(tlv.field_id()).is_some_and(|peer| {
                match &tlv.mask {
                    None => tlv.value == peer.value,
                    Some(mask) => {
                        tlv.masked_value()
                            == peer
                                .value
                                .iter()
                                .zip(mask)
                                .map(|(v, m)| v & m)
                                .collect::<Vec<u8>>()
                    }
                }
            })
        })
    }

    fn push_plain(&mut self, field_id: u8, value: &[u8]) {
        if let Some(tlv) = OxmTlv::new(field_id, value.to_vec(), None) {
            self.push(tlv);
        }
    }

    /// Masked append; the masked variant is chosen only when the mask is
    /// present and not wholly ones.
    fn push_masked(&mut self, field_id: u8, value: &[u8], mask: Option<&[u8]>) {
        let mask = mask.filter(|m| !m.iter().all(|b| *b == 0xff));
        if let Some(tlv) = OxmTlv::new(field_id, value.to_vec(), mask.map(<[u8]>::to_vec)) {
            self.push(tlv);
        }
    }

    pub fn append_in_port(&mut self, port: u32) {
        self.push_plain(field::IN_PORT, &port.to_be_bytes());
    }

    pub fn append_in_phy_port(&mut self, port: u32) {
        self.push_plain(field::IN_PHY_PORT, &port.to_be_bytes());
    }

    pub fn append_metadata(&mut self, metadata: u64, mask: Option<u64>) {
        self.push_masked(
            field::METADATA,
            &metadata.to_be_bytes(),
            mask.map(u64::to_be_bytes).as_ref().map(<[u8; 8]>::as_slice),
        );
    }

    pub fn append_eth_dst(&mut self, addr: [u8; ETH_ADDRLEN], mask: Option<[u8; ETH_ADDRLEN]>) {
        self.push_masked(field::ETH_DST, &addr, mask.as_ref().map(<[u8; 6]>::as_slice));
    }

    pub fn append_eth_src(&mut self, addr: [u8; ETH_ADDRLEN], mask: Option<[u8; ETH_ADDRLEN]>) {
        self.push_masked(field::ETH_SRC, &addr, mask.as_ref().map(<[u8; 6]>::as_slice));
    }

    pub fn append_eth_type(&mut self, eth_type: u16) {
        self.push_plain(field::ETH_TYPE, &eth_type.to_be_bytes());
    }

    /// Appends the VID with the `OFPVID_PRESENT` bit set whenever the
    /// value is not `OFPVID_NONE`.
    pub fn append_vlan_vid(&mut self, vid: u16, mask: Option<u16>) {
        let mut vid = vid;
        if vid & !VLAN_VID_MASK != 0 {
            warn!("invalid vlan vid ( change {vid:#x} to {:#x} )", vid & VLAN_VID_MASK);
            vid &= VLAN_VID_MASK;
        }
        if vid != OFPVID_NONE {
            vid |= OFPVID_PRESENT;
        }
        self.push_masked(
            field::VLAN_VID,
            &vid.to_be_bytes(),
            mask.map(u16::to_be_bytes).as_ref().map(<[u8; 2]>::as_slice),
        );
    }

    pub fn append_vlan_pcp(&mut self, pcp: u8) {
        let mut pcp = pcp;
        if pcp & !VLAN_PCP_MASK != 0 {
            warn!("invalid vlan pcp ( change {pcp:#x} to {:#x} )", pcp & VLAN_PCP_MASK);
            pcp &= VLAN_PCP_MASK;
        }
        self.push_plain(field::VLAN_PCP, &[pcp]);
    }

    pub fn append_ip_dscp(&mut self, dscp: u8) {
        let mut dscp = dscp;
        if dscp & !IP_DSCP_MASK != 0 {
            warn!("invalid ip dscp ( change {dscp:#x} to {:#x} )", dscp & IP_DSCP_MASK);
            dscp &= IP_DSCP_MASK;
        }
        self.push_plain(field::IP_DSCP, &[dscp]);
    }

    pub fn append_ip_ecn(&mut self, ecn: u8) {
        let mut ecn = ecn;
        if ecn & !IP_ECN_MASK != 0 {
            warn!("invalid ip ecn ( change {ecn:#x} to {:#x} )", ecn & IP_ECN_MASK);
            ecn &= IP_ECN_MASK;
        }
        self.push_plain(field::IP_ECN, &[ecn]);
    }

    pub fn append_ip_proto(&mut self, proto: u8) {
        self.push_plain(field::IP_PROTO, &[proto]);
    }

    pub fn append_ipv4_src(&mut self, addr: Ipv4Addr, mask: Option<Ipv4Addr>) {
        self.push_masked(
            field::IPV4_SRC,
            &addr.octets(),
            mask.map(|m| m.octets()).as_ref().map(<[u8; 4]>::as_slice),
        );
    }

    pub fn append_ipv4_dst(&mut self, addr: Ipv4Addr, mask: Option<Ipv4Addr>) {
        self.push_masked(
            field::IPV4_DST,
            &addr.octets(),
            mask.map(|m| m.octets()).as_ref().map(<[u8; 4]>::as_slice),
        );
    }

    pub fn append_tcp_src(&mut self, port: u16) {
        self.push_plain(field::TCP_SRC, &port.to_be_bytes());
    }

    pub fn append_tcp_dst(&mut self, port: u16) {
        self.push_plain(field::TCP_DST, &port.to_be_bytes());
    }

    pub fn append_udp_src(&mut self, port: u16) {
        self.push_plain(field::UDP_SRC, &port.to_be_bytes());
    }

    pub fn append_udp_dst(&mut self, port: u16) {
        self.push_plain(field::UDP_DST, &port.to_be_bytes());
    }

    pub fn append_sctp_src(&mut self, port: u16) {
        self.push_plain(field::SCTP_SRC, &port.to_be_bytes());
    }

    pub fn append_sctp_dst(&mut self, port: u16) {
        self.push_plain(field::SCTP_DST, &port.to_be_bytes());
    }

    pub fn append_icmpv4_type(&mut self, icmp_type: u8) {
        self.push_plain(field::ICMPV4_TYPE, &[icmp_type]);
    }

    pub fn append_icmpv4_code(&mut self, code: u8) {
        self.push_plain(field::ICMPV4_CODE, &[code]);
    }

    pub fn append_arp_op(&mut self, op: u16) {
        self.push_plain(field::ARP_OP, &op.to_be_bytes());
    }

    pub fn append_arp_spa(&mut self, addr: Ipv4Addr, mask: Option<Ipv4Addr>) {
        self.push_masked(
            field::ARP_SPA,
            &addr.octets(),
            mask.map(|m| m.octets()).as_ref().map(<[u8; 4]>::as_slice),
        );
    }

    pub fn append_arp_tpa(&mut self, addr: Ipv4Addr, mask: Option<Ipv4Addr>) {
        self.push_masked(
            field::ARP_TPA,
            &addr.octets(),
            mask.map(|m| m.octets()).as_ref().map(<[u8; 4]>::as_slice),
        );
    }

    pub fn append_arp_sha(&mut self, addr: [u8; ETH_ADDRLEN], mask: Option<[u8; ETH_ADDRLEN]>) {
        self.push_masked(field::ARP_SHA, &addr, mask.as_ref().map(<[u8; 6]>::as_slice));
    }

    pub fn append_arp_tha(&mut self, addr: [u8; ETH_ADDRLEN], mask: Option<[u8; ETH_ADDRLEN]>) {
        self.push_masked(field::ARP_THA, &addr, mask.as_ref().map(<[u8; 6]>::as_slice));
    }

    pub fn append_ipv6_src(&mut self, addr: Ipv6Addr, mask: Option<Ipv6Addr>) {
        self.push_masked(
            field::IPV6_SRC,
            &addr.octets(),
            mask.map(|m| m.octets()).as_ref().map(<[u8; 16]>::as_slice),
        );
    }

    pub fn append_ipv6_dst(&mut self, addr: Ipv6Addr, mask: Option<Ipv6Addr>) {
        self.push_masked(
            field::IPV6_DST,
            &addr.octets(),
            mask.map(|m| m.octets()).as_ref().map(<[u8; 16]>::as_slice),
        );
    }

    pub fn append_ipv6_flabel(&mut self, flabel: u32, mask: Option<u32>) {
        let mut flabel = flabel;
        if flabel & !IPV6_FLABEL_MASK != 0 {
            warn!(
                "invalid ipv6 flow label ( change {flabel:#x} to {:#x} )",
                flabel & IPV6_FLABEL_MASK
            );
            flabel &= IPV6_FLABEL_MASK;
        }
        self.push_masked(
            field::IPV6_FLABEL,
            &flabel.to_be_bytes(),
            mask.map(u32::to_be_bytes).as_ref().map(<[u8; 4]>::as_slice),
        );
    }

    pub fn append_icmpv6_type(&mut self, icmp_type: u8) {
        self.push_plain(field::ICMPV6_TYPE, &[icmp_type]);
    }

    pub fn append_icmpv6_code(&mut self, code: u8) {
        self.push_plain(field::ICMPV6_CODE, &[code]);
    }

    pub fn append_ipv6_nd_target(&mut self, addr: Ipv6Addr) {
        self.push_plain(field::IPV6_ND_TARGET, &addr.octets());
    }

    pub fn append_ipv6_nd_sll(&mut self, addr: [u8; ETH_ADDRLEN]) {
        self.push_plain(field::IPV6_ND_SLL, &addr);
    }

    pub fn append_ipv6_nd_tll(&mut self, addr: [u8; ETH_ADDRLEN]) {
        self.push_plain(field::IPV6_ND_TLL, &addr);
    }

    pub fn append_mpls_label(&mut self, label: u32) {
        let mut label = label;
        if label & !MPLS_LABEL_MASK != 0 {
            warn!(
                "invalid mpls label ( change {label:#x} to {:#x} )",
                label & MPLS_LABEL_MASK
            );
            label &= MPLS_LABEL_MASK;
        }
        self.push_plain(field::MPLS_LABEL, &label.to_be_bytes());
    }

    pub fn append_mpls_tc(&mut self, tc: u8) {
        let mut tc = tc;
        if tc & !MPLS_TC_MASK != 0 {
            warn!("invalid mpls tc ( change {tc:#x} to {:#x} )", tc & MPLS_TC_MASK);
            tc &= MPLS_TC_MASK;
        }
        self.push_plain(field::MPLS_TC, &[tc]);
    }

    pub fn append_mpls_bos(&mut self, bos: u8) {
        let mut bos = bos;
        if bos & !MPLS_BOS_MASK != 0 {
            warn!("invalid mpls bos ( change {bos:#x} to {:#x} )", bos & MPLS_BOS_MASK);
            bos &= MPLS_BOS_MASK;
        }
        self.push_plain(field::MPLS_BOS, &[bos]);
    }

    pub fn append_pbb_isid(&mut self, isid: u32, mask: Option<u32>) {
        let mut isid = isid;
        if isid & !PBB_ISID_MASK != 0 {
            warn!("invalid pbb i-sid ( change {isid:#x} to {:#x} )", isid & PBB_ISID_MASK);
            isid &= PBB_ISID_MASK;
        }
        self.push_masked(
            field::PBB_ISID,
            &isid.to_be_bytes(),
            mask.map(u32::to_be_bytes).as_ref().map(<[u8; 4]>::as_slice),
        );
    }

    pub fn append_tunnel_id(&mut self, tunnel_id: u64, mask: Option<u64>) {
        self.push_masked(
            field::TUNNEL_ID,
            &tunnel_id.to_be_bytes(),
            mask.map(u64::to_be_bytes).as_ref().map(<[u8; 8]>::as_slice),
        );
    }

    pub fn append_ipv6_exthdr(&mut self, exthdr: u16, mask: Option<u16>) {
        let mut exthdr = exthdr;
        if exthdr & !IPV6_EXTHDR_MASK != 0 {
            warn!(
                "invalid ipv6 exthdr bitmap ( change {exthdr:#x} to {:#x} )",
                exthdr & IPV6_EXTHDR_MASK
            );
            exthdr &= IPV6_EXTHDR_MASK;
        }
        self.push_masked(
            field::IPV6_EXTHDR,
            &exthdr.to_be_bytes(),
            mask.map(u16::to_be_bytes).as_ref().map(<[u8; 2]>::as_slice),
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn vlan_vid_gets_present_bit() {
        let mut m = OxmMatch::new();
        m.append_vlan_vid(10, None);
        let tlv = m.find(field::VLAN_VID).unwrap();
        assert_eq!(tlv.value(), &(10u16 | OFPVID_PRESENT).to_be_bytes());
    }

    #[test]
    fn vlan_vid_none_stays_none() {
        let mut m = OxmMatch::new();
        m.append_vlan_vid(OFPVID_NONE, None);
        let tlv = m.find(field::VLAN_VID).unwrap();
        assert_eq!(tlv.value(), &OFPVID_NONE.to_be_bytes());
    }

    #[test]
    fn out_of_range_values_are_clamped_not_rejected() {
        let mut m = OxmMatch::new();
        m.append_vlan_pcp(0xff);
        m.append_ip_dscp(0xff);
        m.append_mpls_label(0xffff_ffff);
        assert_eq!(m.find(field::VLAN_PCP).unwrap().value(), &[0x07]);
        assert_eq!(m.find(field::IP_DSCP).unwrap().value(), &[0x3f]);
        assert_eq!(
            m.find(field::MPLS_LABEL).unwrap().value(),
            &0x000f_ffffu32.to_be_bytes()
        );
    }

    #[test]
    fn all_ones_mask_selects_the_plain_tag() {
        let mut m = OxmMatch::new();
        m.append_ipv4_src("10.0.0.1".parse().unwrap(), Some(Ipv4Addr::BROADCAST));
        m.append_ipv4_dst("10.0.0.2".parse().unwrap(), Some("255.255.255.0".parse().unwrap()));
        assert!(m.find(field::IPV4_SRC).unwrap().mask().is_none());
        assert_eq!(
            m.find(field::IPV4_DST).unwrap().mask(),
            Some(&[0xff, 0xff, 0xff, 0x00][..])
        );
    }

    #[test]
    fn pack_pads_to_eight_bytes() {
        let mut m = OxmMatch::new();
        m.append_in_port(1);
        // 4 (match header) + 8 (tlv) = 12 -> padded to 16
        assert_eq!(m.match_length(), 12);
        assert_eq!(m.padded_length(), 16);
        let mut buf = Buffer::new();
        m.pack(&mut buf);
        assert_eq!(buf.len(), 16);
        assert_eq!(buf.u16_at(0), OFPMT_OXM);
        assert_eq!(buf.u16_at(2), 12);
        assert_eq!(buf.u32_at(4), 0x8000_0004);
        assert_eq!(buf.u32_at(8), 1);
        assert_eq!(&buf.as_slice()[12..], &[0, 0, 0, 0]);
    }

    #[test]
    fn unpack_round_trips() {
        let mut m = OxmMatch::new();
        m.append_in_port(7);
        m.append_eth_type(0x0800);
        m.append_ip_proto(6);
        m.append_tcp_dst(80);
        let mut buf = Buffer::new();
        m.pack(&mut buf);
        let back = OxmMatch::unpack(buf.as_slice()).unwrap();
        assert_eq!(m, back);
        assert!(m.strict_eq(&back));
    }

    #[test]
    fn equality_ignores_order_but_not_masks() {
        let mut a = OxmMatch::new();
        a.append_eth_type(0x0800);
        a.append_in_port(1);
        let mut b = OxmMatch::new();
        b.append_in_port(1);
        b.append_eth_type(0x0800);
        assert!(a.strict_eq(&b));

        let mut c = OxmMatch::new();
        c.append_in_port(1);
        c.append_ipv4_src("10.0.0.1".parse().unwrap(), Some("255.0.0.0".parse().unwrap()));
        let mut d = OxmMatch::new();
        d.append_in_port(1);
        d.append_ipv4_src("10.0.0.1".parse().unwrap(), None);
        assert!(!c.strict_eq(&d));
    }

    #[test]
    fn wildcard_subsumes_concrete() {
        let mut wild = OxmMatch::new();
        wild.append_eth_type(0x0800);
        wild.append_ipv4_src("10.0.0.0".parse().unwrap(), Some("255.0.0.0".parse().unwrap()));

        let mut concrete = OxmMatch::new();
        concrete.append_in_port(3);
        concrete.append_eth_type(0x0800);
        concrete.append_ipv4_src("10.1.2.3".parse().unwrap(), None);

        assert!(wild.subsumes(&concrete));
        assert!(!concrete.subsumes(&wild));

        let mut other = OxmMatch::new();
        other.append_eth_type(0x0800);
        other.append_ipv4_src("11.1.2.3".parse().unwrap(), None);
        assert!(!wild.subsumes(&other));
    }
}
