// This module defines error types for the objlower backend using the thiserror crate for
// idiomatic Rust error handling. Error is the single crate-wide enum covering the failure
// scenarios of the pipeline: truncated IR input, unknown operand value types, opcodes with
// no registered encoder, operand combinations an encoder does not support, out-of-range
// register references, instruction buffer overflow, malformed IRO containers, and the I/O
// and object-writing boundary errors. Each variant carries the context needed for an
// actionable diagnostic (byte offsets, opcode bytes, register ids, section indices). The
// Section variant wraps any inner error with the index of the failing section so that a
// whole-object failure names where it happened. Result<T> is the crate-wide alias.

//! Error types for the objlower backend.
//!
//! Using thiserror for more idiomatic error handling.

use thiserror::Error;

/// Main error type for IR lowering.
#[derive(Error, Debug)]
pub enum Error {
    /// Decoding ran past the end of the section's declared size.
    #[error("truncated input: need {need} byte(s) at offset {offset}, section size {size}")]
    TruncatedInput { offset: usize, need: usize, size: usize },

    /// An operand declared a value type this decoder does not know.
    #[error("unknown value type 0x{tag:02X} at offset {offset}")]
    UnknownValueType { tag: u8, offset: usize },

    /// An operand header carried a kind tag outside the defined set.
    #[error("unknown operand kind 0x{tag:02X} at offset {offset}")]
    UnknownOperandKind { tag: u8, offset: usize },

    /// The opcode byte has no registered encoder routine.
    #[error("unregistered opcode 0x{opcode:02X} at offset {offset}")]
    UnregisteredOpcode { opcode: u8, offset: usize },

    /// The operand kinds/widths are not a combination the encoder implements.
    #[error("unsupported operand combination for {opcode} at offset {offset}")]
    UnsupportedOperands { opcode: &'static str, offset: usize },

    /// A register reference is outside the target's register set.
    #[error("invalid register {id} at offset {offset}, target has {count} register(s)")]
    InvalidRegister { id: u32, count: u32, offset: usize },

    /// An assembled instruction would exceed the maximum encoded length.
    #[error("encoded instruction length {len} exceeds maximum {max}")]
    EncodeOverflow { len: usize, max: usize },

    /// The IRO container is structurally malformed.
    #[error("invalid object: {reason}")]
    InvalidObject { reason: String },

    /// Wraps a failure with the index of the section being processed.
    #[error("section {index}: {source}")]
    Section {
        index: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("object write error: {0}")]
    Object(#[from] object::write::Error),
}

impl Error {
    /// Attach the index of the section a failure occurred in.
    pub fn in_section(self, index: usize) -> Self {
        Error::Section {
            index,
            source: Box::new(self),
        }
    }
}

/// Result type alias for lowering operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = Error::TruncatedInput {
            offset: 7,
            need: 4,
            size: 9,
        };
        assert_eq!(
            err.to_string(),
            "truncated input: need 4 byte(s) at offset 7, section size 9"
        );

        let err = Error::UnregisteredOpcode {
            opcode: 0x41,
            offset: 2,
        };
        assert_eq!(err.to_string(), "unregistered opcode 0x41 at offset 2");

        let err = Error::InvalidRegister {
            id: 8,
            count: 8,
            offset: 4,
        };
        assert_eq!(
            err.to_string(),
            "invalid register 8 at offset 4, target has 8 register(s)"
        );
    }

    #[test]
    fn test_section_wrapping_keeps_source() {
        let inner = Error::UnknownValueType { tag: 0x7F, offset: 3 };
        let err = inner.in_section(2);
        assert_eq!(
            err.to_string(),
            "section 2: unknown value type 0x7F at offset 3"
        );
        match err {
            Error::Section { index, source } => {
                assert_eq!(index, 2);
                assert!(matches!(*source, Error::UnknownValueType { tag: 0x7F, .. }));
            }
            other => panic!("expected Section wrapper, got {other}"),
        }
    }
}
