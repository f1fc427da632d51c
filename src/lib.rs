//! objlower - IR to native x86-32 object lowering.
//!
//! objlower consumes IRO (intermediate representation object) files, encodes
//! their instruction streams into x86-32 machine code by direct byte
//! emission, and assembles the result into an ELF relocatable object with
//! data sections copied through verbatim.
//!
//! # Primary Usage
//!
//! ```
//! use objlower::ir::{InstrHeader, IrObject, IrSection, Opcode};
//! use objlower::{process_object, Target};
//!
//! // A code section holding a single `ret`.
//! let mut code = IrSection::new(0, IrSection::CODE);
//! InstrHeader { opcode: Opcode::Ret.byte(), flags: 0 }.encode(&mut code);
//!
//! let mut obj = IrObject::new();
//! obj.add_section(code);
//!
//! let mut codegen = Target::X86.build();
//! let native = process_object(&obj, codegen.as_mut())?;
//! let elf_bytes = native.emit()?;
//! # assert!(!elf_bytes.is_empty());
//! # Ok::<(), objlower::Error>(())
//! ```
//!
//! # Architecture
//!
//! - [`ir`] - IRO container, sections, and the instruction/operand wire codec
//! - [`codegen`] - target selection and the code generation seam
//! - [`x86`] - x86-32 specific code (registers, hand-rolled encoder)
//! - [`native`] - output object assembly over the `object` crate
//! - [`processor`] - the per-section classify/encode/copy pipeline

pub mod codegen;
pub mod error;
pub mod ir;
pub mod native;
pub mod processor;
pub mod x86;

// Re-export the types most callers need.
pub use codegen::{CodeGen, Target};
pub use error::{Error, Result};
pub use ir::{IrObject, IrSection, Opcode};
pub use native::{NativeObject, SectionClass};
pub use processor::{process_file, process_object};
