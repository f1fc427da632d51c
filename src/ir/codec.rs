// This module implements the wire codec for the IR instruction stream. An instruction is
// a two-byte header (opcode, flags) followed by an opcode-specific number of operands; an
// operand is a three-byte header (kind, value type, modifier) optionally followed by a
// little-endian value payload whose width is determined solely by the declared value type.
// Decoding takes an immutable section and an explicit cursor position and returns the
// decoded record together with the advanced position, so callers thread positions through
// without any hidden state. The symmetric encode side appends the identical grammar to a
// growable section and exists for fixture construction and round-trip tests. All reads are
// bounds checked against the section's declared size; a truncated payload or an
// unrecognized tag aborts decoding with the offset of the operand that failed.

//! Instruction and operand wire codec.
//!
//! ```text
//! instruction : [opcode u8][flags u8] operand*
//! operand     : [kind u8][value_type u8][modifier u8] value?
//! value       : little endian, width fixed by value_type
//! ```

use crate::error::{Error, Result};
use crate::ir::IrSection;

/// What an operand refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OperandKind {
    /// No operand present.
    None = 0x00,
    /// A register reference.
    Reg = 0x01,
    /// An immediate constant.
    Imm = 0x02,
}

impl OperandKind {
    #[must_use]
    pub const fn byte(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(Self::None),
            0x01 => Some(Self::Reg),
            0x02 => Some(Self::Imm),
            _ => None,
        }
    }
}

/// Declared type of an operand's value.
///
/// The on-wire payload width is a function of this tag alone. Register
/// references travel as a 4-byte register id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ValueType {
    Void = 0x00,
    I8 = 0x01,
    U8 = 0x02,
    I16 = 0x03,
    U16 = 0x04,
    I32 = 0x05,
    U32 = 0x06,
    I64 = 0x07,
    U64 = 0x08,
    Reg = 0x10,
}

impl ValueType {
    #[must_use]
    pub const fn byte(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(Self::Void),
            0x01 => Some(Self::I8),
            0x02 => Some(Self::U8),
            0x03 => Some(Self::I16),
            0x04 => Some(Self::U16),
            0x05 => Some(Self::I32),
            0x06 => Some(Self::U32),
            0x07 => Some(Self::I64),
            0x08 => Some(Self::U64),
            0x10 => Some(Self::Reg),
            _ => None,
        }
    }

    /// Payload width in bytes.
    #[must_use]
    pub const fn width(self) -> usize {
        match self {
            Self::Void => 0,
            Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::Reg => 4,
            Self::I64 | Self::U64 => 8,
        }
    }

    /// True for the one-byte immediate types that select short encodings.
    #[must_use]
    pub const fn is_byte_sized(self) -> bool {
        matches!(self, Self::I8 | Self::U8)
    }

    /// True for the four-byte integer immediate types.
    #[must_use]
    pub const fn is_dword_sized(self) -> bool {
        matches!(self, Self::I32 | Self::U32)
    }
}

/// The fixed three-byte operand header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperandHeader {
    pub kind: OperandKind,
    pub value_type: ValueType,
    /// Modifier bits; unknown bits are carried through undisturbed.
    pub modifier: u8,
}

impl OperandHeader {
    pub const MOD_NONE: u8 = 0;
    pub const MOD_CONST: u8 = 1 << 0;
    pub const MOD_VOLATILE: u8 = 1 << 1;

    /// Decode a header at `pos`, returning it and the advanced position.
    pub fn decode(sec: &IrSection, pos: usize) -> Result<(Self, usize)> {
        let bytes = sec.bytes_at(pos, 3)?;
        let kind = OperandKind::from_byte(bytes[0]).ok_or(Error::UnknownOperandKind {
            tag: bytes[0],
            offset: pos,
        })?;
        let value_type = ValueType::from_byte(bytes[1]).ok_or(Error::UnknownValueType {
            tag: bytes[1],
            offset: pos,
        })?;
        let header = Self {
            kind,
            value_type,
            modifier: bytes[2],
        };
        Ok((header, pos + 3))
    }

    /// Append this header to a section.
    pub fn encode(&self, sec: &mut IrSection) {
        sec.push(self.kind.byte());
        sec.push(self.value_type.byte());
        sec.push(self.modifier);
    }
}

/// Decode an operand's value payload at `pos` per the header's declared type.
///
/// The value is the raw little-endian payload zero-extended to 64 bits;
/// interpretation (sign, register id) is the consumer's. `None`-kind operands
/// have no payload and decode as zero without advancing.
pub fn decode_value(sec: &IrSection, pos: usize, header: &OperandHeader) -> Result<(u64, usize)> {
    if header.kind == OperandKind::None {
        return Ok((0, pos));
    }
    let width = header.value_type.width();
    let bytes = sec.bytes_at(pos, width)?;
    let mut buf = [0u8; 8];
    buf[..width].copy_from_slice(bytes);
    Ok((u64::from_le_bytes(buf), pos + width))
}

/// A fully decoded operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operand {
    pub header: OperandHeader,
    /// Raw little-endian payload, zero-extended.
    pub value: u64,
}

impl Operand {
    /// Decode header and value in one step.
    pub fn decode(sec: &IrSection, pos: usize) -> Result<(Self, usize)> {
        let (header, pos) = OperandHeader::decode(sec, pos)?;
        let (value, pos) = decode_value(sec, pos, &header)?;
        Ok((Self { header, value }, pos))
    }

    /// Append header and value to a section.
    pub fn encode(&self, sec: &mut IrSection) {
        self.header.encode(sec);
        if self.header.kind != OperandKind::None {
            let width = self.header.value_type.width();
            sec.extend(&self.value.to_le_bytes()[..width]);
        }
    }

    /// A register-reference operand.
    #[must_use]
    pub fn reg(id: u32) -> Self {
        Self {
            header: OperandHeader {
                kind: OperandKind::Reg,
                value_type: ValueType::Reg,
                modifier: OperandHeader::MOD_NONE,
            },
            value: u64::from(id),
        }
    }

    /// An immediate operand of the given declared type.
    #[must_use]
    pub fn imm(value_type: ValueType, value: u64) -> Self {
        Self {
            header: OperandHeader {
                kind: OperandKind::Imm,
                value_type,
                modifier: OperandHeader::MOD_CONST,
            },
            value,
        }
    }

    /// A 32-bit signed immediate.
    #[must_use]
    pub fn imm_i32(v: i32) -> Self {
        Self::imm(ValueType::I32, u64::from(v as u32))
    }

    /// An 8-bit signed immediate.
    #[must_use]
    pub fn imm_i8(v: i8) -> Self {
        Self::imm(ValueType::I8, u64::from(v as u8))
    }

    #[must_use]
    pub fn kind(&self) -> OperandKind {
        self.header.kind
    }

    #[must_use]
    pub fn value_type(&self) -> ValueType {
        self.header.value_type
    }

    /// The value as a register id.
    ///
    /// Narrows to the wire width of the `Reg` value type; meaningful only
    /// for operands declared with it.
    #[must_use]
    pub fn reg_id(&self) -> u32 {
        self.value as u32
    }
}

/// The two-byte instruction header.
///
/// The opcode stays a raw byte here; mapping it into the opcode space is the
/// dispatcher's job so that an unknown byte fails with the instruction's
/// offset attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstrHeader {
    pub opcode: u8,
    pub flags: u8,
}

impl InstrHeader {
    /// Decode a header at `pos`, returning it and the advanced position.
    pub fn decode(sec: &IrSection, pos: usize) -> Result<(Self, usize)> {
        let bytes = sec.bytes_at(pos, 2)?;
        Ok((
            Self {
                opcode: bytes[0],
                flags: bytes[1],
            },
            pos + 2,
        ))
    }

    /// Append this header to a section.
    pub fn encode(&self, sec: &mut IrSection) {
        sec.push(self.opcode);
        sec.push(self.flags);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::opcode::Opcode;

    #[test]
    fn test_value_type_widths() {
        assert_eq!(ValueType::Void.width(), 0);
        assert_eq!(ValueType::I8.width(), 1);
        assert_eq!(ValueType::U16.width(), 2);
        assert_eq!(ValueType::I32.width(), 4);
        assert_eq!(ValueType::Reg.width(), 4);
        assert_eq!(ValueType::U64.width(), 8);
    }

    #[test]
    fn test_operand_round_trip() {
        let mut sec = IrSection::new(0, IrSection::CODE);
        Operand::reg(3).encode(&mut sec);
        Operand::imm_i32(-2).encode(&mut sec);
        Operand::imm_i8(5).encode(&mut sec);

        let (op, pos) = Operand::decode(&sec, 0).unwrap();
        assert_eq!(op.kind(), OperandKind::Reg);
        assert_eq!(op.value_type(), ValueType::Reg);
        assert_eq!(op.reg_id(), 3);
        assert_eq!(pos, 7);

        let (op, pos) = Operand::decode(&sec, pos).unwrap();
        assert_eq!(op.kind(), OperandKind::Imm);
        assert_eq!(op.value as u32, (-2i32) as u32);
        assert_eq!(pos, 14);

        let (op, pos) = Operand::decode(&sec, pos).unwrap();
        assert_eq!(op.value_type(), ValueType::I8);
        assert_eq!(op.value, 5);
        assert_eq!(pos, sec.size());
    }

    #[test]
    fn test_none_operand_has_no_payload() {
        let mut sec = IrSection::new(0, IrSection::CODE);
        let none = Operand {
            header: OperandHeader {
                kind: OperandKind::None,
                value_type: ValueType::Void,
                modifier: OperandHeader::MOD_NONE,
            },
            value: 0,
        };
        none.encode(&mut sec);
        assert_eq!(sec.size(), 3);

        let (op, pos) = Operand::decode(&sec, 0).unwrap();
        assert_eq!(op.kind(), OperandKind::None);
        assert_eq!(pos, 3);
    }

    #[test]
    fn test_truncated_payload_reports_offset() {
        let mut sec = IrSection::new(0, IrSection::CODE);
        // Header claims a 4-byte I32 payload but only 2 bytes follow.
        sec.push(OperandKind::Imm.byte());
        sec.push(ValueType::I32.byte());
        sec.push(OperandHeader::MOD_CONST);
        sec.extend(&[0xAA, 0xBB]);

        let err = Operand::decode(&sec, 0).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::TruncatedInput { offset: 3, need: 4, size: 5 }
        ));
    }

    #[test]
    fn test_unknown_tags_rejected() {
        let mut sec = IrSection::new(0, IrSection::CODE);
        sec.extend(&[0x02, 0x7F, 0x00]);
        let err = OperandHeader::decode(&sec, 0).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::UnknownValueType { tag: 0x7F, offset: 0 }
        ));

        let mut sec = IrSection::new(0, IrSection::CODE);
        sec.extend(&[0x09, 0x05, 0x00]);
        let err = OperandHeader::decode(&sec, 0).unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::UnknownOperandKind { tag: 0x09, offset: 0 }
        ));
    }

    #[test]
    fn test_instr_header_round_trip() {
        let mut sec = IrSection::new(0, IrSection::CODE);
        InstrHeader {
            opcode: Opcode::Add.byte(),
            flags: 0,
        }
        .encode(&mut sec);
        Operand::reg(0).encode(&mut sec);

        let (hdr, pos) = InstrHeader::decode(&sec, 0).unwrap();
        assert_eq!(hdr.opcode, 0x20);
        assert_eq!(hdr.flags, 0);
        assert_eq!(pos, 2);
    }

    #[test]
    fn test_instr_header_truncated() {
        let mut sec = IrSection::new(0, IrSection::CODE);
        sec.push(Opcode::Ret.byte());
        assert!(InstrHeader::decode(&sec, 0).is_err());
    }
}
