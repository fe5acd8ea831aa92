// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! Typed OpenFlow instructions, their list form, and the wire codec.

use crate::actions::{ACTION_HEADER_LEN, ActionList, LengthOverflow, validate_one_action};
use crate::buffer::Buffer;
use crate::consts::instruction_type::*;
use crate::error::ErrorKind;

/// Fixed wire sizes.
pub const INSTRUCTION_HEADER_LEN: usize = 8;
pub const INSTRUCTION_GOTO_TABLE_LEN: usize = 8;
pub const INSTRUCTION_WRITE_METADATA_LEN: usize = 24;
pub const INSTRUCTION_ACTIONS_HEADER_LEN: usize = 8;
pub const INSTRUCTION_METER_LEN: usize = 8;
pub const INSTRUCTION_EXPERIMENTER_HEADER_LEN: usize = 8;

/// One OpenFlow 1.3 instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    GotoTable { table_id: u8 },
    WriteMetadata { metadata: u64, metadata_mask: u64 },
    WriteActions { actions: ActionList },
    ApplyActions { actions: ActionList },
    ClearActions,
    Meter { meter_id: u32 },
    Experimenter { experimenter: u32, data: Vec<u8> },
}

impl Instruction {
    #[must_use]
    pub fn wire_type(&self) -> u16 {
        match self {
            Instruction::GotoTable { .. } => OFPIT_GOTO_TABLE,
            Instruction::WriteMetadata { .. } => OFPIT_WRITE_METADATA,
            Instruction::WriteActions { .. } => OFPIT_WRITE_ACTIONS,
            Instruction::ApplyActions { .. } => OFPIT_APPLY_ACTIONS,
            Instruction::ClearActions => OFPIT_CLEAR_ACTIONS,
            Instruction::Meter { .. } => OFPIT_METER,
            Instruction::Experimenter { .. } => OFPIT_EXPERIMENTER,
        }
    }

    /// Wire length; fixed per kind except the two action carriers.
    #[must_use]
    pub fn wire_len(&self) -> usize {
        match self {
            Instruction::GotoTable { .. } => INSTRUCTION_GOTO_TABLE_LEN,
            Instruction::WriteMetadata { .. } => INSTRUCTION_WRITE_METADATA_LEN,
            Instruction::WriteActions { actions } | Instruction::ApplyActions { actions } => {
                INSTRUCTION_ACTIONS_HEADER_LEN
                    + actions.iter().map(crate::actions::Action::wire_len).sum::<usize>()
            }
            Instruction::ClearActions => INSTRUCTION_ACTIONS_HEADER_LEN,
            Instruction::Meter { .. } => INSTRUCTION_METER_LEN,
            Instruction::Experimenter { data, .. } => {
                INSTRUCTION_EXPERIMENTER_HEADER_LEN + data.len()
            }
        }
    }

    pub fn pack(&self, buf: &mut Buffer) {
        buf.put_u16(self.wire_type());
        buf.put_u16(self.wire_len() as u16);
        match self {
            Instruction::GotoTable { table_id } => {
                buf.put_u8(*table_id);
                buf.put_zeros(3);
            }
            Instruction::WriteMetadata { metadata, metadata_mask } => {
                buf.put_zeros(4);
                buf.put_u64(*metadata);
                buf.put_u64(*metadata_mask);
            }
            Instruction::WriteActions { actions } | Instruction::ApplyActions { actions } => {
                buf.put_zeros(4);
                actions.pack(buf);
            }
            Instruction::ClearActions => buf.put_zeros(4),
            Instruction::Meter { meter_id } => buf.put_u32(*meter_id),
            Instruction::Experimenter { experimenter, data } => {
                buf.put_u32(*experimenter);
                buf.put_bytes(data);
            }
        }
    }

    /// Decode one instruction from validated bytes.
    pub fn unpack(raw: &[u8]) -> Result<(Instruction, usize), ErrorKind> {
        if raw.len() < INSTRUCTION_HEADER_LEN {
            return Err(ErrorKind::TooShortInstruction);
        }
        let kind = u16::from_be_bytes([raw[0], raw[1]]);
        let len = u16::from_be_bytes([raw[2], raw[3]]) as usize;
        if len < INSTRUCTION_HEADER_LEN || raw.len() < len {
            return Err(ErrorKind::TooShortInstruction);
        }
        let body = &raw[4..len];
        let instruction = match kind {
            OFPIT_GOTO_TABLE => Instruction::GotoTable { table_id: body[0] },
            OFPIT_WRITE_METADATA => {
                if body.len() < 20 {
                    return Err(ErrorKind::TooShortInstructionWriteMetadata);
                }
                Instruction::WriteMetadata {
                    metadata: u64::from_be_bytes([
                        body[4], body[5], body[6], body[7], body[8], body[9], body[10], body[11],
                    ]),
                    metadata_mask: u64::from_be_bytes([
                        body[12], body[13], body[14], body[15], body[16], body[17], body[18],
                        body[19],
                    ]),
                }
            }
            OFPIT_WRITE_ACTIONS => Instruction::WriteActions {
                actions: ActionList::unpack(&body[4..])?,
            },
            OFPIT_APPLY_ACTIONS => Instruction::ApplyActions {
                actions: ActionList::unpack(&body[4..])?,
            },
            OFPIT_CLEAR_ACTIONS => Instruction::ClearActions,
            OFPIT_METER => Instruction::Meter {
                meter_id: u32::from_be_bytes([body[0], body[1], body[2], body[3]]),
            },
            OFPIT_EXPERIMENTER => Instruction::Experimenter {
                experimenter: u32::from_be_bytes([body[0], body[1], body[2], body[3]]),
                data: body[4..].to_vec(),
            },
            _ => return Err(ErrorKind::UndefinedInstructionType),
        };
        Ok((instruction, len))
    }
}

/// An ordered instruction list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstructionList {
    instructions: Vec<Instruction>,
}

impl InstructionList {
    #[must_use]
    pub fn new() -> InstructionList {
        InstructionList::default()
    }

    #[must_use]
    pub fn n_instructions(&self) -> usize {
        self.instructions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.instructions.iter()
    }

    pub fn append(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Total wire length, or an error where the C code would abort.
    pub fn length(&self) -> Result<u16, LengthOverflow> {
        let total: usize = self.instructions.iter().map(Instruction::wire_len).sum();
        u16::try_from(total).map_err(|_| LengthOverflow(total))
    }

    pub fn pack(&self, buf: &mut Buffer) {
        for instruction in &self.instructions {
            instruction.pack(buf);
        }
    }

    pub fn unpack(mut raw: &[u8]) -> Result<InstructionList, ErrorKind> {
        let mut list = InstructionList::new();
        while !raw.is_empty() {
            let (instruction, consumed) = Instruction::unpack(raw)?;
            list.append(instruction);
            raw = &raw[consumed..];
        }
        Ok(list)
    }
}

impl FromIterator<Instruction> for InstructionList {
    fn from_iter<I: IntoIterator<Item = Instruction>>(iter: I) -> InstructionList {
        InstructionList {
            instructions: iter.into_iter().collect(),
        }
    }
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

/// Validate the embedded action region of WRITE/APPLY actions. A partial
/// trailing action surfaces as the instruction's too-long error, the way
/// the original walker reported it.
fn validate_embedded_actions(mut region: &[u8], too_long: ErrorKind) -> Result<(), ErrorKind> {
    while region.len() >= ACTION_HEADER_LEN {
        let declared = u16::from_be_bytes([region[2], region[3]]) as usize;
        if region.len() < declared {
            break;
        }
        let consumed = validate_one_action(region)?;
        region = &region[consumed..];
    }
    if region.is_empty() { Ok(()) } else { Err(too_long) }
}

/// Validate one instruction TLV at the front of `raw`.
fn validate_instruction(raw: &[u8]) -> Result<usize, ErrorKind> {
    use ErrorKind::*;

    if raw.len() < INSTRUCTION_HEADER_LEN {
        return Err(TooShortInstruction);
    }
    let kind = u16::from_be_bytes([raw[0], raw[1]]);
    let len = u16::from_be_bytes([raw[2], raw[3]]) as usize;
    if len < INSTRUCTION_HEADER_LEN {
        return Err(TooShortInstruction);
    }
    if raw.len() < len {
        return Err(TooShortInstruction);
    }

    match kind {
        OFPIT_GOTO_TABLE => exact_len(
            len,
            INSTRUCTION_GOTO_TABLE_LEN,
            TooShortInstructionGotoTable,
            TooLongInstructionGotoTable,
        )?,
        OFPIT_WRITE_METADATA => exact_len(
            len,
            INSTRUCTION_WRITE_METADATA_LEN,
            TooShortInstructionWriteMetadata,
            TooLongInstructionWriteMetadata,
        )?,
        OFPIT_WRITE_ACTIONS => {
            validate_embedded_actions(&raw[8..len], TooLongInstructionWriteActions)?;
        }
        OFPIT_APPLY_ACTIONS => {
            validate_embedded_actions(&raw[8..len], TooLongInstructionApplyActions)?;
        }
        OFPIT_CLEAR_ACTIONS => exact_len(
            len,
            INSTRUCTION_ACTIONS_HEADER_LEN,
            TooShortInstructionClearActions,
            TooLongInstructionClearActions,
        )?,
        OFPIT_METER => exact_len(
            len,
            INSTRUCTION_METER_LEN,
            TooShortInstructionMeter,
            TooLongInstructionMeter,
        )?,
        OFPIT_EXPERIMENTER => {
            if len < INSTRUCTION_EXPERIMENTER_HEADER_LEN {
                return Err(TooShortInstructionExperimenter);
            }
        }
        _ => return Err(UndefinedInstructionType),
    }

    Ok(len)
}

/// Validate a packed instruction region of exactly `raw.len()` bytes.
pub fn validate_instructions(mut raw: &[u8]) -> Result<(), ErrorKind> {
    while !raw.is_empty() {
        let consumed = validate_instruction(raw)?;
        raw = &raw[consumed..];
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::actions::Action;
    use pretty_assertions::assert_eq;

    #[test]
    fn goto_table_layout() {
        let mut buf = Buffer::new();
        Instruction::GotoTable { table_id: 5 }.pack(&mut buf);
        assert_eq!(buf.as_slice(), &[0, 1, 0, 8, 5, 0, 0, 0]);
    }

    #[test]
    fn write_metadata_layout() {
        let mut buf = Buffer::new();
        Instruction::WriteMetadata { metadata: 0x11, metadata_mask: 0xff }.pack(&mut buf);
        assert_eq!(buf.len(), 24);
        assert_eq!(buf.u16_at(2), 24);
        assert_eq!(buf.u64_at(8), 0x11);
        assert_eq!(buf.u64_at(16), 0xff);
    }

    #[test]
    fn apply_actions_nests_the_action_list() {
        let actions: ActionList =
            [Action::Output { port: 1, max_len: 64 }, Action::DecNwTtl].into_iter().collect();
        let instruction = Instruction::ApplyActions { actions };
        assert_eq!(instruction.wire_len(), 8 + 16 + 8);
        let mut buf = Buffer::new();
        instruction.pack(&mut buf);
        assert!(validate_instructions(buf.as_slice()).is_ok());
        let back = InstructionList::unpack(buf.as_slice()).unwrap();
        assert_eq!(back.n_instructions(), 1);
        assert_eq!(back.iter().next().unwrap(), &instruction);
    }

    #[test]
    fn bad_embedded_action_surfaces_the_action_error() {
        // write-actions carrying an output action with port 0
        let mut buf = Buffer::new();
        let actions: ActionList =
            [Action::Output { port: 0, max_len: 0 }].into_iter().collect();
        Instruction::WriteActions { actions }.pack(&mut buf);
        assert_eq!(
            validate_instructions(buf.as_slice()),
            Err(ErrorKind::InvalidPortNo)
        );
    }

    #[test]
    fn clear_actions_must_be_exactly_eight() {
        let raw = [0u8, 5, 0, 16, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(
            validate_instructions(&raw),
            Err(ErrorKind::TooLongInstructionClearActions)
        );
    }

    #[test]
    fn undefined_instruction_type() {
        let raw = [0u8, 9, 0, 8, 0, 0, 0, 0];
        assert_eq!(
            validate_instructions(&raw),
            Err(ErrorKind::UndefinedInstructionType)
        );
    }
}
