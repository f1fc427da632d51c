//! The IR side of the backend: container, sections, and wire codec.
//!
//! - `object` - IRO container load/save and string table lookup
//! - `section` - named, flagged byte buffers with bounds-checked reads
//! - `codec` - instruction/operand wire grammar
//! - `opcode` - the opcode byte space

pub mod codec;
pub mod object;
pub mod opcode;
pub mod section;

pub use codec::{decode_value, InstrHeader, Operand, OperandHeader, OperandKind, ValueType};
pub use opcode::Opcode;
pub use section::IrSection;
pub use self::object::{build_strtab, IrObject};
