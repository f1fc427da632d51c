//! Target selection and the code generation seam.
//!
//! A [`CodeGen`] turns one code section's instruction stream into machine
//! bytes. The section processor drives it without knowing anything about the
//! target's encoding rules. Targets may layer by operand width: a wider
//! target may reuse a narrower target's routines, never the reverse.

use std::fmt;

use crate::error::Result;
use crate::ir::IrSection;
use crate::x86::X86Codegen;

/// A supported output architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// 32-bit x86.
    X86,
}

impl Target {
    /// Construct the encoder context for this target.
    #[must_use]
    pub fn build(self) -> Box<dyn CodeGen> {
        match self {
            Target::X86 => Box::new(X86Codegen::new()),
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Target::X86 => "x86_32",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Machine code generation for one target.
pub trait CodeGen {
    /// The target this context encodes for.
    fn target(&self) -> Target;

    /// Encode a code section's entire instruction stream.
    ///
    /// Returns the machine bytes for the whole section. On error nothing is
    /// handed to the caller, so a failed section contributes no output.
    fn encode_section(&mut self, code: &IrSection) -> Result<Vec<u8>>;
}
