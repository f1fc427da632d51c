//! x86-32 register definitions.
//!
//! The eight general-purpose 32-bit registers with their ModR/M encoding
//! values. IR register ids map directly onto these: id 0 is EAX, the
//! primary accumulator, through id 7, EDI.

use std::fmt;

/// x86 32-bit general purpose register
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Reg {
    EAX = 0,
    ECX = 1,
    EDX = 2,
    EBX = 3,
    ESP = 4,
    EBP = 5,
    ESI = 6,
    EDI = 7,
}

impl Reg {
    /// Number of general purpose registers on this target.
    pub const COUNT: u32 = 8;

    /// Map an IR register id onto a register.
    ///
    /// Returns `None` for ids outside the register set; the encoder turns
    /// that into an `InvalidRegister` error carrying the stream offset.
    #[must_use]
    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            0 => Some(Reg::EAX),
            1 => Some(Reg::ECX),
            2 => Some(Reg::EDX),
            3 => Some(Reg::EBX),
            4 => Some(Reg::ESP),
            5 => Some(Reg::EBP),
            6 => Some(Reg::ESI),
            7 => Some(Reg::EDI),
            _ => None,
        }
    }

    /// Get the 3-bit encoding for ModR/M bytes and +r opcode forms.
    #[inline]
    #[must_use]
    pub fn encoding(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Reg::EAX => "eax",
            Reg::ECX => "ecx",
            Reg::EDX => "edx",
            Reg::EBX => "ebx",
            Reg::ESP => "esp",
            Reg::EBP => "ebp",
            Reg::ESI => "esi",
            Reg::EDI => "edi",
        };
        write!(f, "{}", name)
    }
}
