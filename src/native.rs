// This module wraps the object crate's write API as the backend's output container. A
// NativeObject owns an ELF relocatable object for 32-bit x86 (little endian, I386) and
// exposes the three operations the pipeline needs: create a named section classified as
// code or data, append bytes to a section through its SectionId handle, and produce the
// finished file (to bytes for tests, to disk for the driver). Sections keep their creation
// order and are owned by the object for their whole lifetime; the SectionId is the only
// handle that leaves this module, so there is exactly one writer per section.

//! Native object emission over the `object` crate.

use std::fmt;
use std::fs;
use std::path::Path;

use log::debug;
use object::write::{Object, SectionId};
use object::{Architecture, BinaryFormat, Endianness, SectionKind};

use crate::error::Result;

/// Whether a native section holds machine code or raw data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionClass {
    Code,
    Data,
}

/// The output object file being assembled.
pub struct NativeObject {
    obj: Object<'static>,
}

impl NativeObject {
    /// Create an empty ELF object for the 32-bit x86 target.
    #[must_use]
    pub fn new() -> Self {
        Self {
            obj: Object::new(BinaryFormat::Elf, Architecture::I386, Endianness::Little),
        }
    }

    /// Create a section, returning the handle used to append to it.
    pub fn create_section(&mut self, name: &str, class: SectionClass) -> SectionId {
        let (segment, kind) = match class {
            SectionClass::Code => (object::write::StandardSegment::Text, SectionKind::Text),
            SectionClass::Data => (object::write::StandardSegment::Data, SectionKind::Data),
        };
        debug!("native section {name} ({class:?})");
        let segment = self.obj.segment_name(segment).to_vec();
        self.obj.add_section(segment, name.as_bytes().to_vec(), kind)
    }

    /// Append bytes to a section, returning their offset within it.
    ///
    /// Appending an empty slice is a no-op.
    pub fn append(&mut self, section: SectionId, bytes: &[u8]) -> u64 {
        self.obj.append_section_data(section, bytes, 1)
    }

    /// Produce the finished object file as bytes.
    pub fn emit(&self) -> Result<Vec<u8>> {
        Ok(self.obj.write()?)
    }

    /// Write the finished object file to disk.
    pub fn persist<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.emit()?;
        fs::write(path.as_ref(), &bytes)?;
        debug!("wrote {} ({} bytes)", path.as_ref().display(), bytes.len());
        Ok(())
    }
}

impl Default for NativeObject {
    fn default() -> Self {
        Self::new()
    }
}

// object::write::Object has no Debug impl, so derive is not an option here.
impl fmt::Debug for NativeObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeObject")
            .field("format", &self.obj.format())
            .field("architecture", &self.obj.architecture())
            .finish_non_exhaustive()
    }
}
