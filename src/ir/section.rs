//! IR sections: named, flagged byte buffers.
//!
//! A section is the unit the backend consumes. Code sections hold the
//! variable-length instruction stream, everything else is raw bytes. Read
//! positions are explicit `usize` cursors owned by the caller; the buffer is
//! never mutated while it is being decoded.

use crate::error::{Error, Result};

/// One section of an IR object.
#[derive(Debug, Clone, Default)]
pub struct IrSection {
    /// Offset of the section's name in the string table, 0 for unnamed.
    name: u32,
    /// Flag word, see the associated constants.
    flags: u32,
    data: Vec<u8>,
}

impl IrSection {
    /// Section holds executable instructions.
    pub const CODE: u32 = 1 << 0;
    /// Section occupies memory at run time.
    pub const ALLOC: u32 = 1 << 1;
    /// Section is the string table.
    pub const STRTAB: u32 = 1 << 2;

    /// Create an empty section.
    #[must_use]
    pub fn new(name: u32, flags: u32) -> Self {
        Self {
            name,
            flags,
            data: Vec::new(),
        }
    }

    /// Create a section over existing bytes.
    #[must_use]
    pub fn with_data(name: u32, flags: u32, data: Vec<u8>) -> Self {
        Self { name, flags, data }
    }

    #[must_use]
    pub fn name(&self) -> u32 {
        self.name
    }

    #[must_use]
    pub fn flags(&self) -> u32 {
        self.flags
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    #[must_use]
    pub fn is_code(&self) -> bool {
        self.flags & Self::CODE != 0
    }

    #[must_use]
    pub fn is_strtab(&self) -> bool {
        self.flags & Self::STRTAB != 0
    }

    /// Borrow `len` bytes starting at `pos`, bounds checked.
    pub fn bytes_at(&self, pos: usize, len: usize) -> Result<&[u8]> {
        let end = pos.checked_add(len).ok_or(Error::TruncatedInput {
            offset: pos,
            need: len,
            size: self.data.len(),
        })?;
        self.data.get(pos..end).ok_or(Error::TruncatedInput {
            offset: pos,
            need: len,
            size: self.data.len(),
        })
    }

    /// Read one byte at `pos`.
    pub fn byte_at(&self, pos: usize) -> Result<u8> {
        Ok(self.bytes_at(pos, 1)?[0])
    }

    /// Append a byte. Used by the encode side when building sections.
    pub fn push(&mut self, byte: u8) {
        self.data.push(byte);
    }

    /// Append a byte slice.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_classification() {
        let code = IrSection::new(0, IrSection::CODE | IrSection::ALLOC);
        assert!(code.is_code());
        assert!(!code.is_strtab());

        let data = IrSection::new(0, IrSection::ALLOC);
        assert!(!data.is_code());

        let strtab = IrSection::new(0, IrSection::STRTAB);
        assert!(strtab.is_strtab());
    }

    #[test]
    fn test_bytes_at_bounds() {
        let sec = IrSection::with_data(0, 0, vec![1, 2, 3]);
        assert_eq!(sec.bytes_at(0, 3).unwrap(), &[1, 2, 3]);
        assert_eq!(sec.bytes_at(2, 1).unwrap(), &[3]);
        assert!(sec.bytes_at(3, 0).unwrap().is_empty());

        let err = sec.bytes_at(2, 2).unwrap_err();
        match err {
            Error::TruncatedInput { offset, need, size } => {
                assert_eq!((offset, need, size), (2, 2, 3));
            }
            other => panic!("expected TruncatedInput, got {other}"),
        }
    }

    #[test]
    fn test_bytes_at_overflowing_position() {
        let sec = IrSection::with_data(0, 0, vec![0; 4]);
        assert!(sec.bytes_at(usize::MAX, 2).is_err());
    }
}
