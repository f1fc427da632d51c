// This module implements the IRO container: the on-disk IR object that the backend
// consumes. The layout is deliberately small: an 8-byte object header (magic, format
// version, section count), a table of 16-byte section headers (name offset into the
// string table, flag word, payload offset, payload size), then the raw payloads. All
// fields are little endian. The string table is the first section flagged STRTAB and
// holds NUL-terminated strings; name offset 0 conventionally points at an empty string
// so 0 means unnamed. Loading validates magic, version, and that every payload extent
// lies inside the file, and rejects anything else as InvalidObject. Saving is the exact
// inverse and exists for fixture tooling and the round-trip tests.

//! IRO container load/save.
//!
//! ```text
//! header   : "IRO\0" | version u16 | section_count u16
//! sections : section_count x { name u32 | flags u32 | offset u32 | size u32 }
//! payload  : raw bytes per header extent
//! ```

use std::fs;
use std::path::Path;

use log::debug;

use crate::error::{Error, Result};
use crate::ir::IrSection;

const MAGIC: [u8; 4] = *b"IRO\0";
const VERSION: u16 = 1;
const HEADER_LEN: usize = 8;
const SECTION_HEADER_LEN: usize = 16;

/// An in-memory IR object: an ordered list of sections.
#[derive(Debug, Clone, Default)]
pub struct IrObject {
    sections: Vec<IrSection>,
}

impl IrObject {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a section, returning its index.
    pub fn add_section(&mut self, section: IrSection) -> usize {
        self.sections.push(section);
        self.sections.len() - 1
    }

    #[must_use]
    pub fn sections(&self) -> &[IrSection] {
        &self.sections
    }

    /// The string table, if the object carries one.
    #[must_use]
    pub fn strtab(&self) -> Option<&IrSection> {
        self.sections.iter().find(|s| s.is_strtab())
    }

    /// Resolve a name offset into the string table.
    ///
    /// Returns `None` when there is no string table, the offset is out of
    /// range, the bytes are not NUL-terminated UTF-8, or the string is empty.
    /// Callers fall back to a placeholder name in those cases.
    #[must_use]
    pub fn lookup_name(&self, offset: u32) -> Option<&str> {
        let strtab = self.strtab()?;
        let bytes = strtab.data().get(offset as usize..)?;
        let end = bytes.iter().position(|&b| b == 0)?;
        let s = std::str::from_utf8(&bytes[..end]).ok()?;
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    }

    /// Parse an object from raw bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let header = take(bytes, 0, HEADER_LEN)?;
        if header[0..4] != MAGIC {
            return Err(Error::InvalidObject {
                reason: "bad magic".into(),
            });
        }
        let version = u16::from_le_bytes([header[4], header[5]]);
        if version != VERSION {
            return Err(Error::InvalidObject {
                reason: format!("unsupported version {version}"),
            });
        }
        let count = u16::from_le_bytes([header[6], header[7]]) as usize;

        let mut sections = Vec::with_capacity(count);
        for i in 0..count {
            let hdr = take(bytes, HEADER_LEN + i * SECTION_HEADER_LEN, SECTION_HEADER_LEN)?;
            let name = u32::from_le_bytes([hdr[0], hdr[1], hdr[2], hdr[3]]);
            let flags = u32::from_le_bytes([hdr[4], hdr[5], hdr[6], hdr[7]]);
            let offset = u32::from_le_bytes([hdr[8], hdr[9], hdr[10], hdr[11]]) as usize;
            let size = u32::from_le_bytes([hdr[12], hdr[13], hdr[14], hdr[15]]) as usize;

            let payload = take(bytes, offset, size).map_err(|_| Error::InvalidObject {
                reason: format!("section {i} extent {offset}+{size} outside file"),
            })?;
            sections.push(IrSection::with_data(name, flags, payload.to_vec()));
        }

        Ok(Self { sections })
    }

    /// Serialize the object to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let count = u16::try_from(self.sections.len()).map_err(|_| Error::InvalidObject {
            reason: format!("too many sections: {}", self.sections.len()),
        })?;

        let table_end = HEADER_LEN + self.sections.len() * SECTION_HEADER_LEN;
        let total: usize = table_end + self.sections.iter().map(IrSection::size).sum::<usize>();
        let mut out = Vec::with_capacity(total);

        out.extend_from_slice(&MAGIC);
        out.extend_from_slice(&VERSION.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());

        let mut offset = table_end;
        for sec in &self.sections {
            let off = u32::try_from(offset).map_err(|_| Error::InvalidObject {
                reason: "object too large".into(),
            })?;
            let size = u32::try_from(sec.size()).map_err(|_| Error::InvalidObject {
                reason: "section too large".into(),
            })?;
            out.extend_from_slice(&sec.name().to_le_bytes());
            out.extend_from_slice(&sec.flags().to_le_bytes());
            out.extend_from_slice(&off.to_le_bytes());
            out.extend_from_slice(&size.to_le_bytes());
            offset += sec.size();
        }
        for sec in &self.sections {
            out.extend_from_slice(sec.data());
        }

        Ok(out)
    }

    /// Load an object from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path.as_ref())?;
        debug!(
            "loaded {} ({} bytes)",
            path.as_ref().display(),
            bytes.len()
        );
        Self::parse(&bytes)
    }

    /// Save the object to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        fs::write(path.as_ref(), &bytes)?;
        debug!("wrote {} ({} bytes)", path.as_ref().display(), bytes.len());
        Ok(())
    }
}

fn take(bytes: &[u8], pos: usize, len: usize) -> Result<&[u8]> {
    pos.checked_add(len)
        .and_then(|end| bytes.get(pos..end))
        .ok_or_else(|| Error::InvalidObject {
            reason: format!("truncated at byte {pos}"),
        })
}

/// Build a string table section from a list of names.
///
/// Index 0 is the conventional empty string. Returns the section and the
/// offset of each name, in input order.
#[must_use]
pub fn build_strtab(names: &[&str]) -> (IrSection, Vec<u32>) {
    let mut sec = IrSection::new(0, IrSection::STRTAB);
    sec.push(0);
    let mut offsets = Vec::with_capacity(names.len());
    for name in names {
        offsets.push(sec.size() as u32);
        sec.extend(name.as_bytes());
        sec.push(0);
    }
    (sec, offsets)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_object() -> IrObject {
        let mut obj = IrObject::new();
        let (strtab, offsets) = build_strtab(&[".text", ".data"]);
        obj.add_section(strtab);
        obj.add_section(IrSection::with_data(
            offsets[0],
            IrSection::CODE | IrSection::ALLOC,
            vec![0x04, 0x00],
        ));
        obj.add_section(IrSection::with_data(
            offsets[1],
            IrSection::ALLOC,
            vec![1, 2, 3],
        ));
        obj
    }

    #[test]
    fn test_round_trip() {
        let obj = sample_object();
        let bytes = obj.to_bytes().unwrap();
        let parsed = IrObject::parse(&bytes).unwrap();

        assert_eq!(parsed.sections().len(), 3);
        for (a, b) in obj.sections().iter().zip(parsed.sections()) {
            assert_eq!(a.name(), b.name());
            assert_eq!(a.flags(), b.flags());
            assert_eq!(a.data(), b.data());
        }
    }

    #[test]
    fn test_name_lookup() {
        let obj = sample_object();
        assert_eq!(obj.lookup_name(obj.sections()[1].name()), Some(".text"));
        assert_eq!(obj.lookup_name(obj.sections()[2].name()), Some(".data"));
        // Offset 0 is the empty string, treated as unnamed.
        assert_eq!(obj.lookup_name(0), None);
        assert_eq!(obj.lookup_name(0xFFFF), None);
    }

    #[test]
    fn test_lookup_without_strtab() {
        let mut obj = IrObject::new();
        obj.add_section(IrSection::with_data(0, IrSection::CODE, vec![]));
        assert_eq!(obj.lookup_name(0), None);
    }

    #[test]
    fn test_bad_magic() {
        let obj = sample_object();
        let mut bytes = obj.to_bytes().unwrap();
        bytes[0] = b'X';
        let err = IrObject::parse(&bytes).unwrap_err();
        assert!(err.to_string().contains("bad magic"));
    }

    #[test]
    fn test_unsupported_version() {
        let obj = sample_object();
        let mut bytes = obj.to_bytes().unwrap();
        bytes[4] = 9;
        let err = IrObject::parse(&bytes).unwrap_err();
        assert!(err.to_string().contains("unsupported version 9"));
    }

    #[test]
    fn test_extent_outside_file() {
        let obj = sample_object();
        let mut bytes = obj.to_bytes().unwrap();
        // Inflate the first section's size field past the end of the file.
        let size_field = 8 + 12;
        bytes[size_field..size_field + 4].copy_from_slice(&0xFFFFu32.to_le_bytes());
        let err = IrObject::parse(&bytes).unwrap_err();
        assert!(err.to_string().contains("outside file"));
    }

    #[test]
    fn test_truncated_header() {
        assert!(IrObject::parse(b"IRO").is_err());
        assert!(IrObject::parse(&[]).is_err());
    }
}
