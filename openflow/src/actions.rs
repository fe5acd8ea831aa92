// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! Typed OpenFlow actions, their list form, and the wire codec.
//!
//! Actions are a closed set, so they are a plain tagged enum. The list
//! keeps insertion order; that order is observable on the wire.

use crate::buffer::Buffer;
use crate::consts::action_type::*;
use crate::consts::port_no::{OFPP_IN_PORT, OFPP_MAX};
use crate::error::ErrorKind;
use crate::oxm::{OXM_HEADER_LEN, OxmTlv, oxm_length};
use crate::pad_to_64;

/// Fixed wire sizes.
pub const ACTION_HEADER_LEN: usize = 8;
pub const ACTION_OUTPUT_LEN: usize = 16;
pub const ACTION_EXPERIMENTER_HEADER_LEN: usize = 8;

/// A list's total wire length does not fit the 16-bit field that carries
/// it. Callers are expected to pre-chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("tlv list length {0} exceeds the 16-bit wire field")]
pub struct LengthOverflow(pub usize);

/// One OpenFlow 1.3 action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Output { port: u32, max_len: u16 },
    CopyTtlOut,
    CopyTtlIn,
    SetMplsTtl { mpls_ttl: u8 },
    DecMplsTtl,
    PushVlan { ethertype: u16 },
    PopVlan,
    PushMpls { ethertype: u16 },
    PopMpls { ethertype: u16 },
    SetQueue { queue_id: u32 },
    Group { group_id: u32 },
    SetNwTtl { nw_ttl: u8 },
    DecNwTtl,
    SetField { field: OxmTlv },
    PushPbb { ethertype: u16 },
    PopPbb,
    Experimenter { experimenter: u32, data: Vec<u8> },
}

impl Action {
    #[must_use]
    pub fn wire_type(&self) -> u16 {
        match self {
            Action::Output { .. } => OFPAT_OUTPUT,
            Action::CopyTtlOut => OFPAT_COPY_TTL_OUT,
            Action::CopyTtlIn => OFPAT_COPY_TTL_IN,
            Action::SetMplsTtl { .. } => OFPAT_SET_MPLS_TTL,
            Action::DecMplsTtl => OFPAT_DEC_MPLS_TTL,
            Action::PushVlan { .. } => OFPAT_PUSH_VLAN,
            Action::PopVlan => OFPAT_POP_VLAN,
            Action::PushMpls { .. } => OFPAT_PUSH_MPLS,
            Action::PopMpls { .. } => OFPAT_POP_MPLS,
            Action::SetQueue { .. } => OFPAT_SET_QUEUE,
            Action::Group { .. } => OFPAT_GROUP,
            Action::SetNwTtl { .. } => OFPAT_SET_NW_TTL,
            Action::DecNwTtl => OFPAT_DEC_NW_TTL,
            Action::SetField { .. } => OFPAT_SET_FIELD,
            Action::PushPbb { .. } => OFPAT_PUSH_PBB,
            Action::PopPbb => OFPAT_POP_PBB,
            Action::Experimenter { .. } => OFPAT_EXPERIMENTER,
        }
    }

    /// Wire length, pad included. Fixed per kind except SET_FIELD
    /// (header + OXM TLV, padded out to 64 bits) and EXPERIMENTER
    /// (header + opaque payload).
    #[must_use]
    pub fn wire_len(&self) -> usize {
        match self {
            Action::Output { .. } => ACTION_OUTPUT_LEN,
            Action::SetField { field } => {
                let unpadded = 4 + field.wire_len();
                unpadded + pad_to_64(unpadded)
            }
            Action::Experimenter { data, .. } => ACTION_EXPERIMENTER_HEADER_LEN + data.len(),
            _ => ACTION_HEADER_LEN,
        }
    }

    pub fn pack(&self, buf: &mut Buffer) {
        let len = self.wire_len() as u16;
        buf.put_u16(self.wire_type());
        buf.put_u16(len);
        match self {
            Action::Output { port, max_len } => {
                buf.put_u32(*port);
                buf.put_u16(*max_len);
                buf.put_zeros(6);
            }
            Action::CopyTtlOut
            | Action::CopyTtlIn
            | Action::DecMplsTtl
            | Action::PopVlan
            | Action::DecNwTtl
            | Action::PopPbb => buf.put_zeros(4),
            Action::SetMplsTtl { mpls_ttl } => {
                buf.put_u8(*mpls_ttl);
                buf.put_zeros(3);
            }
            Action::SetNwTtl { nw_ttl } => {
                buf.put_u8(*nw_ttl);
                buf.put_zeros(3);
            }
            Action::PushVlan { ethertype }
            | Action::PushMpls { ethertype }
            | Action::PopMpls { ethertype }
            | Action::PushPbb { ethertype } => {
                buf.put_u16(*ethertype);
                buf.put_zeros(2);
            }
            Action::SetQueue { queue_id } => buf.put_u32(*queue_id),
            Action::Group { group_id } => buf.put_u32(*group_id),
            Action::SetField { field } => {
                field.pack(buf);
                buf.put_zeros(pad_to_64(4 + field.wire_len()));
            }
            Action::Experimenter { experimenter, data } => {
                buf.put_u32(*experimenter);
                buf.put_bytes(data);
            }
        }
    }

    /// Decode one action from the front of validated bytes. Returns the
    /// action and bytes consumed.
    pub fn unpack(raw: &[u8]) -> Result<(Action, usize), ErrorKind> {
        if raw.len() < ACTION_HEADER_LEN {
            return Err(ErrorKind::TooShortAction);
        }
        let kind = u16::from_be_bytes([raw[0], raw[1]]);
        let len = u16::from_be_bytes([raw[2], raw[3]]) as usize;
        if len < ACTION_HEADER_LEN || raw.len() < len {
            return Err(ErrorKind::TooShortAction);
        }
        let body = &raw[4..len];
        let action = match kind {
            OFPAT_OUTPUT => Action::Output {
                port: u32::from_be_bytes([body[0], body[1], body[2], body[3]]),
                max_len: u16::from_be_bytes([body[4], body[5]]),
            },
            OFPAT_COPY_TTL_OUT => Action::CopyTtlOut,
            OFPAT_COPY_TTL_IN => Action::CopyTtlIn,
            OFPAT_SET_MPLS_TTL => Action::SetMplsTtl { mpls_ttl: body[0] },
            OFPAT_DEC_MPLS_TTL => Action::DecMplsTtl,
            OFPAT_PUSH_VLAN => Action::PushVlan {
                ethertype: u16::from_be_bytes([body[0], body[1]]),
            },
            OFPAT_POP_VLAN => Action::PopVlan,
            OFPAT_PUSH_MPLS => Action::PushMpls {
                ethertype: u16::from_be_bytes([body[0], body[1]]),
            },
            OFPAT_POP_MPLS => Action::PopMpls {
                ethertype: u16::from_be_bytes([body[0], body[1]]),
            },
            OFPAT_SET_QUEUE => Action::SetQueue {
                queue_id: u32::from_be_bytes([body[0], body[1], body[2], body[3]]),
            },
            OFPAT_GROUP => Action::Group {
                group_id: u32::from_be_bytes([body[0], body[1], body[2], body[3]]),
            },
            OFPAT_SET_NW_TTL => Action::SetNwTtl { nw_ttl: body[0] },
            OFPAT_DEC_NW_TTL => Action::DecNwTtl,
            OFPAT_SET_FIELD => {
                let (field, _) = OxmTlv::parse(body)?;
                Action::SetField { field }
            }
            OFPAT_PUSH_PBB => Action::PushPbb {
                ethertype: u16::from_be_bytes([body[0], body[1]]),
            },
            OFPAT_POP_PBB => Action::PopPbb,
            OFPAT_EXPERIMENTER => Action::Experimenter {
                experimenter: u32::from_be_bytes([body[0], body[1], body[2], body[3]]),
                data: body[4..].to_vec(),
            },
            _ => return Err(ErrorKind::UndefinedActionType),
        };
        Ok((action, len))
    }
}

/// An ordered action list with a cached count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionList {
    actions: Vec<Action>,
}

impl ActionList {
    #[must_use]
    pub fn new() -> ActionList {
        ActionList::default()
    }

    #[must_use]
    pub fn n_actions(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter()
    }

    pub fn append(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn append_output(&mut self, port: u32, max_len: u16) {
        self.append(Action::Output { port, max_len });
    }

    pub fn append_group(&mut self, group_id: u32) {
        self.append(Action::Group { group_id });
    }

    pub fn append_set_field(&mut self, field: OxmTlv) {
        self.append(Action::SetField { field });
    }

    /// Total wire length. Errors instead of aborting when the sum cannot
    /// be carried by a 16-bit length field.
    pub fn length(&self) -> Result<u16, LengthOverflow> {
        let total: usize = self.actions.iter().map(Action::wire_len).sum();
        u16::try_from(total).map_err(|_| LengthOverflow(total))
    }

    /// Write the list in insertion order.
    pub fn pack(&self, buf: &mut Buffer) {
        for action in &self.actions {
            action.pack(buf);
        }
    }

    /// Decode a validated action region.
    pub fn unpack(mut raw: &[u8]) -> Result<ActionList, ErrorKind> {
        let mut list = ActionList::new();
        while !raw.is_empty() {
            let (action, consumed) = Action::unpack(raw)?;
            list.append(action);
            raw = &raw[consumed..];
        }
        Ok(list)
    }
}

impl FromIterator<Action> for ActionList {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> ActionList {
        ActionList {
            actions: iter.into_iter().collect(),
        }
    }
}

/// Port numbers accepted where an action or request names a port:
/// physical ports plus the reserved ones.
pub fn validate_port_no(port_no: u32) -> Result<(), ErrorKind> {
    if port_no == 0 || (port_no > OFPP_MAX && port_no < OFPP_IN_PORT) {
        return Err(ErrorKind::InvalidPortNo);
    }
    Ok(())
}

fn exact_len(
    len: usize,
    want: usize,
    too_short: ErrorKind,
    too_long: ErrorKind,
) -> Result<(), ErrorKind> {
    if len < want {
        Err(too_short)
    } else if len > want {
        Err(too_long)
    } else {
        Ok(())
    }
}

/// Validate one action TLV at the front of `raw`, returning its declared
/// length. Shared with the instruction walker for embedded action lists.
pub(crate) fn validate_one_action(raw: &[u8]) -> Result<usize, ErrorKind> {
    use ErrorKind::*;

    if raw.len() < ACTION_HEADER_LEN {
        return Err(TooShortAction);
    }
    let kind = u16::from_be_bytes([raw[0], raw[1]]);
    let len = u16::from_be_bytes([raw[2], raw[3]]) as usize;
    if len < ACTION_HEADER_LEN {
        return Err(TooShortAction);
    }
    if raw.len() < len {
        return Err(TooShortAction);
    }

    match kind {
        OFPAT_OUTPUT => {
            exact_len(len, ACTION_OUTPUT_LEN, TooShortActionOutput, TooLongActionOutput)?;
            validate_port_no(u32::from_be_bytes([raw[4], raw[5], raw[6], raw[7]]))?;
        }
        OFPAT_COPY_TTL_OUT => {
            exact_len(len, ACTION_HEADER_LEN, TooShortActionCopyTtlOut, TooLongActionCopyTtlOut)?;
        }
        OFPAT_COPY_TTL_IN => {
            exact_len(len, ACTION_HEADER_LEN, TooShortActionCopyTtlIn, TooLongActionCopyTtlIn)?;
        }
        OFPAT_SET_MPLS_TTL => {
            exact_len(len, ACTION_HEADER_LEN, TooShortActionSetMplsTtl, TooLongActionSetMplsTtl)?;
        }
        OFPAT_DEC_MPLS_TTL => {
            exact_len(len, ACTION_HEADER_LEN, TooShortActionDecMplsTtl, TooLongActionDecMplsTtl)?;
        }
        OFPAT_PUSH_VLAN => {
            exact_len(len, ACTION_HEADER_LEN, TooShortActionPushVlan, TooLongActionPushVlan)?;
        }
        OFPAT_POP_VLAN => {
            exact_len(len, ACTION_HEADER_LEN, TooShortActionPopVlan, TooLongActionPopVlan)?;
        }
        OFPAT_PUSH_MPLS => {
            exact_len(len, ACTION_HEADER_LEN, TooShortActionPushMpls, TooLongActionPushMpls)?;
        }
        OFPAT_POP_MPLS => {
            exact_len(len, ACTION_HEADER_LEN, TooShortActionPopMpls, TooLongActionPopMpls)?;
        }
        OFPAT_SET_QUEUE => {
            exact_len(len, ACTION_HEADER_LEN, TooShortActionSetQueue, TooLongActionSetQueue)?;
        }
        OFPAT_GROUP => {
            exact_len(len, ACTION_HEADER_LEN, TooShortActionGroup, TooLongActionGroup)?;
        }
        OFPAT_SET_NW_TTL => {
            exact_len(len, ACTION_HEADER_LEN, TooShortActionSetNwTtl, TooLongActionSetNwTtl)?;
        }
        OFPAT_DEC_NW_TTL => {
            exact_len(len, ACTION_HEADER_LEN, TooShortActionDecNwTtl, TooLongActionDecNwTtl)?;
        }
        OFPAT_SET_FIELD => {
            if len < ACTION_HEADER_LEN {
                return Err(TooShortActionSetField);
            }
            if len % 8 != 0 {
                return Err(TooLongActionSetField);
            }
            let oxm = &raw[4..len];
            if oxm.len() < OXM_HEADER_LEN {
                return Err(TooShortActionSetField);
            }
            let header = u32::from_be_bytes([oxm[0], oxm[1], oxm[2], oxm[3]]);
            if oxm.len() < OXM_HEADER_LEN + oxm_length(header) as usize {
                return Err(TooShortActionSetField);
            }
        }
        OFPAT_PUSH_PBB => {
            exact_len(len, ACTION_HEADER_LEN, TooShortActionPushPbb, TooLongActionPushPbb)?;
        }
        OFPAT_POP_PBB => {
            exact_len(len, ACTION_HEADER_LEN, TooShortActionPopPbb, TooLongActionPopPbb)?;
        }
        OFPAT_EXPERIMENTER => {
            if len < ACTION_EXPERIMENTER_HEADER_LEN {
                return Err(TooShortActionExperimenter);
            }
        }
        _ => return Err(UndefinedActionType),
    }

    Ok(len)
}

/// Validate a packed action region of exactly `raw.len()` bytes.
pub fn validate_actions(mut raw: &[u8]) -> Result<(), ErrorKind> {
    while !raw.is_empty() {
        let consumed = validate_one_action(raw)?;
        raw = &raw[consumed..];
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::oxm::field;
    use pretty_assertions::assert_eq;

    #[test]
    fn output_packs_to_sixteen_bytes() {
        let mut buf = Buffer::new();
        Action::Output { port: 2, max_len: 128 }.pack(&mut buf);
        assert_eq!(
            buf.as_slice(),
            &[0, 0, 0, 16, 0, 0, 0, 2, 0, 128, 0, 0, 0, 0, 0, 0]
        );
    }

    #[test]
    fn set_field_is_padded_to_eight() {
        let field = OxmTlv::new(field::VLAN_PCP, vec![3], None).unwrap();
        let action = Action::SetField { field };
        // 4 header + 5 tlv = 9 -> 16
        assert_eq!(action.wire_len(), 16);
        let mut buf = Buffer::new();
        action.pack(&mut buf);
        assert_eq!(buf.len(), 16);
        assert_eq!(buf.u16_at(2), 16);
        assert_eq!(&buf.as_slice()[9..], &[0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn list_round_trips_through_the_wire() {
        let mut list = ActionList::new();
        list.append_output(1, 0xffff);
        list.append(Action::PushVlan { ethertype: 0x8100 });
        list.append(Action::SetQueue { queue_id: 9 });
        list.append(Action::DecNwTtl);
        let mut buf = Buffer::new();
        list.pack(&mut buf);
        assert_eq!(buf.len() as u16, list.length().unwrap());
        assert!(validate_actions(buf.as_slice()).is_ok());
        assert_eq!(ActionList::unpack(buf.as_slice()).unwrap(), list);
    }

    #[test]
    fn output_with_port_zero_is_rejected() {
        let mut buf = Buffer::new();
        Action::Output { port: 0, max_len: 0 }.pack(&mut buf);
        assert_eq!(validate_actions(buf.as_slice()), Err(ErrorKind::InvalidPortNo));
    }

    #[test]
    fn reserved_ports_are_accepted() {
        for port in [
            crate::consts::port_no::OFPP_MAX,
            crate::consts::port_no::OFPP_TABLE,
            crate::consts::port_no::OFPP_CONTROLLER,
            crate::consts::port_no::OFPP_ANY,
        ] {
            let mut buf = Buffer::new();
            Action::Output { port, max_len: 0 }.pack(&mut buf);
            assert!(validate_actions(buf.as_slice()).is_ok(), "port {port:#x}");
        }
    }

    #[test]
    fn wrong_fixed_length_is_flagged_per_kind() {
        // pop-vlan with a declared length of 16
        let raw = [0u8, 18, 0, 16, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(
            validate_actions(&raw),
            Err(ErrorKind::TooLongActionPopVlan)
        );
    }

    #[test]
    fn undefined_type_is_flagged() {
        let raw = [0u8, 99, 0, 8, 0, 0, 0, 0];
        assert_eq!(validate_actions(&raw), Err(ErrorKind::UndefinedActionType));
    }
}
