//! Opcode byte values for the IR instruction set.
//!
//! Discriminants are grouped by instruction family: control flow in 0x0x,
//! memory in 0x1x, arithmetic in 0x2x, bitwise in 0x3x, type conversion in
//! 0x4x. The gaps inside each group are reserved for future operations.

/// An IR operation, identified on the wire by a single byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    // Control flow
    Nop = 0x00,
    Br = 0x01,
    Jmp = 0x02,
    Call = 0x03,
    Ret = 0x04,
    Cmp = 0x05,
    Test = 0x06,

    // Memory
    Mov = 0x10,
    Push = 0x11,
    Pop = 0x12,
    Lea = 0x13,

    // Arithmetic
    Add = 0x20,
    Sub = 0x21,
    Mul = 0x22,
    Div = 0x23,
    Mod = 0x24,
    Inc = 0x25,
    Dec = 0x26,
    Neg = 0x27,

    // Bitwise
    And = 0x30,
    Or = 0x31,
    Xor = 0x32,
    Not = 0x33,
    Shl = 0x34,
    Shr = 0x35,
    Sar = 0x36,

    // Type conversion
    Cvt = 0x40,
}

impl Opcode {
    /// Returns the opcode byte value.
    #[must_use]
    pub const fn byte(self) -> u8 {
        self as u8
    }

    /// Parses an opcode from its byte value.
    #[must_use]
    pub fn from_byte(b: u8) -> Option<Self> {
        Some(match b {
            0x00 => Self::Nop,
            0x01 => Self::Br,
            0x02 => Self::Jmp,
            0x03 => Self::Call,
            0x04 => Self::Ret,
            0x05 => Self::Cmp,
            0x06 => Self::Test,
            0x10 => Self::Mov,
            0x11 => Self::Push,
            0x12 => Self::Pop,
            0x13 => Self::Lea,
            0x20 => Self::Add,
            0x21 => Self::Sub,
            0x22 => Self::Mul,
            0x23 => Self::Div,
            0x24 => Self::Mod,
            0x25 => Self::Inc,
            0x26 => Self::Dec,
            0x27 => Self::Neg,
            0x30 => Self::And,
            0x31 => Self::Or,
            0x32 => Self::Xor,
            0x33 => Self::Not,
            0x34 => Self::Shl,
            0x35 => Self::Shr,
            0x36 => Self::Sar,
            0x40 => Self::Cvt,
            _ => return None,
        })
    }

    /// Lower-case mnemonic for diagnostics and trace output.
    #[must_use]
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Nop => "nop",
            Self::Br => "br",
            Self::Jmp => "jmp",
            Self::Call => "call",
            Self::Ret => "ret",
            Self::Cmp => "cmp",
            Self::Test => "test",
            Self::Mov => "mov",
            Self::Push => "push",
            Self::Pop => "pop",
            Self::Lea => "lea",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Mod => "mod",
            Self::Inc => "inc",
            Self::Dec => "dec",
            Self::Neg => "neg",
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::Not => "not",
            Self::Shl => "shl",
            Self::Shr => "shr",
            Self::Sar => "sar",
            Self::Cvt => "cvt",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Opcode;

    #[test]
    fn opcode_values_are_stable() {
        assert_eq!(Opcode::Nop as u8, 0x00);
        assert_eq!(Opcode::Ret as u8, 0x04);
        assert_eq!(Opcode::Mov as u8, 0x10);
        assert_eq!(Opcode::Add as u8, 0x20);
        assert_eq!(Opcode::Neg as u8, 0x27);
        assert_eq!(Opcode::And as u8, 0x30);
        assert_eq!(Opcode::Cvt as u8, 0x40);
    }

    #[test]
    fn from_byte_round_trips_known_values() {
        for b in 0..=u8::MAX {
            if let Some(op) = Opcode::from_byte(b) {
                assert_eq!(op.byte(), b);
            }
        }
        assert_eq!(Opcode::from_byte(0x10), Some(Opcode::Mov));
        assert_eq!(Opcode::from_byte(0x07), None);
        assert_eq!(Opcode::from_byte(0xFF), None);
    }
}
