//! x86 (32-bit) architecture-specific components.
//!
//! This module contains all x86-32 specific code:
//! - Instruction encoding by direct byte emission
//! - Register definitions and id mapping
//!
//! A future wider variant would compose this one for the operand widths it
//! shares; this module never reaches upward.

pub mod encoder;
pub mod registers;

pub use encoder::{InstrBuf, ModRM, X86Codegen, MAX_INSTR_LEN};
pub use registers::Reg;
