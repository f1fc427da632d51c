// This module drives the lowering pipeline. process_object walks the IR object's sections
// in order and gives each one a native counterpart: code-flagged sections run through the
// target's encoder, everything else is copied byte for byte. Section names come from the
// IR string table when a lookup succeeds and otherwise fall back to a placeholder derived
// from the numeric name field, so unnamed input still yields addressable output sections.
// Processing is all or nothing: the first failing section aborts the whole object with the
// section index wrapped around the underlying error, and the partial native object never
// leaves this module. process_file is the thin orchestration layer on top: load the IR
// object, build the target's encoder context, process, persist.

//! Section processing: classify, encode or copy, assemble.

use std::path::Path;

use log::{debug, info};

use crate::codegen::{CodeGen, Target};
use crate::error::Result;
use crate::ir::{IrObject, IrSection};
use crate::native::{NativeObject, SectionClass};

/// Lower every section of an IR object into a fresh native object.
///
/// One native section is created per IR section, in the same order. Any
/// section failure aborts the whole object; the error names the section.
pub fn process_object(obj: &IrObject, codegen: &mut dyn CodeGen) -> Result<NativeObject> {
    let mut native = NativeObject::new();
    for (index, sec) in obj.sections().iter().enumerate() {
        process_section(obj, sec, codegen, &mut native).map_err(|e| e.in_section(index))?;
    }
    Ok(native)
}

fn process_section(
    obj: &IrObject,
    sec: &IrSection,
    codegen: &mut dyn CodeGen,
    native: &mut NativeObject,
) -> Result<()> {
    let name = section_name(obj, sec);
    if sec.is_code() {
        debug!("encoding {name}: {} IR byte(s)", sec.size());
        let id = native.create_section(&name, SectionClass::Code);
        let bytes = codegen.encode_section(sec)?;
        native.append(id, &bytes);
    } else {
        debug!("copying {name}: {} byte(s)", sec.size());
        let id = native.create_section(&name, SectionClass::Data);
        native.append(id, sec.data());
    }
    Ok(())
}

/// Resolve a section's display name, falling back to a placeholder built
/// from the numeric name field when the string table has nothing usable.
fn section_name(obj: &IrObject, sec: &IrSection) -> String {
    match obj.lookup_name(sec.name()) {
        Some(name) => name.to_owned(),
        None => format!(".iro{}", sec.name()),
    }
}

/// Lower an IR object file into a native object file.
pub fn process_file<P, Q>(input: P, output: Q, target: Target) -> Result<()>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let input = input.as_ref();
    let output = output.as_ref();
    info!("lowering {} for {}", input.display(), target);

    let obj = IrObject::load(input)?;
    let mut codegen = target.build();
    let native = process_object(&obj, codegen.as_mut())?;
    native.persist(output)?;

    info!(
        "{}: {} section(s) -> {}",
        input.display(),
        obj.sections().len(),
        output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::ir::{build_strtab, InstrHeader, Opcode, Operand};
    use crate::x86::X86Codegen;
    use object::{File, Object as _, ObjectSection};

    fn ret_section(name: u32) -> IrSection {
        let mut sec = IrSection::new(name, IrSection::CODE | IrSection::ALLOC);
        InstrHeader {
            opcode: Opcode::Ret.byte(),
            flags: 0,
        }
        .encode(&mut sec);
        sec
    }

    fn elf_bytes(native: &NativeObject) -> Vec<u8> {
        native.emit().unwrap()
    }

    #[test]
    fn test_named_code_and_data_sections() {
        let mut obj = IrObject::new();
        let (strtab, offsets) = build_strtab(&[".text", ".data"]);
        obj.add_section(strtab);
        obj.add_section(ret_section(offsets[0]));
        obj.add_section(IrSection::with_data(
            offsets[1],
            IrSection::ALLOC,
            vec![0xDE, 0xAD, 0xBE, 0xEF],
        ));

        let mut cg = X86Codegen::new();
        let native = process_object(&obj, &mut cg).unwrap();
        let bytes = elf_bytes(&native);
        let file = File::parse(&*bytes).unwrap();

        let text = file.section_by_name(".text").unwrap();
        assert_eq!(text.data().unwrap(), &[0xC3]);

        let data = file.section_by_name(".data").unwrap();
        assert_eq!(data.data().unwrap(), &[0xDE, 0xAD, 0xBE, 0xEF]);
    }

    #[test]
    fn test_placeholder_names_without_strtab() {
        let mut obj = IrObject::new();
        obj.add_section(ret_section(0));
        obj.add_section(IrSection::with_data(7, IrSection::ALLOC, vec![1]));

        let mut cg = X86Codegen::new();
        let native = process_object(&obj, &mut cg).unwrap();
        let bytes = elf_bytes(&native);
        let file = File::parse(&*bytes).unwrap();

        assert!(file.section_by_name(".iro0").is_some());
        assert!(file.section_by_name(".iro7").is_some());
    }

    #[test]
    fn test_data_copied_verbatim_even_if_it_looks_like_code() {
        // Opcode-shaped bytes in a data section must not be interpreted.
        let payload = vec![0x04, 0x00, 0x7F, 0xFF, 0x10, 0x01, 0x02, 0x03, 0x04, 0x05];
        let mut obj = IrObject::new();
        obj.add_section(IrSection::with_data(0, IrSection::ALLOC, payload.clone()));

        let mut cg = X86Codegen::new();
        let native = process_object(&obj, &mut cg).unwrap();
        let bytes = elf_bytes(&native);
        let file = File::parse(&*bytes).unwrap();
        assert_eq!(
            file.section_by_name(".iro0").unwrap().data().unwrap(),
            payload.as_slice()
        );
    }

    #[test]
    fn test_failure_names_section_and_aborts() {
        let mut obj = IrObject::new();
        obj.add_section(ret_section(0));

        // Second section carries an opcode with no encoder routine.
        let mut bad = IrSection::new(0, IrSection::CODE);
        InstrHeader {
            opcode: Opcode::Cvt.byte(),
            flags: 0,
        }
        .encode(&mut bad);
        obj.add_section(bad);

        obj.add_section(ret_section(0));

        let mut cg = X86Codegen::new();
        let err = process_object(&obj, &mut cg).unwrap_err();
        match err {
            Error::Section { index, source } => {
                assert_eq!(index, 1);
                assert!(matches!(
                    *source,
                    Error::UnregisteredOpcode { opcode: 0x40, offset: 0 }
                ));
            }
            other => panic!("expected Section wrapper, got {other}"),
        }
    }

    #[test]
    fn test_invalid_register_aborts_object() {
        let mut sec = IrSection::new(0, IrSection::CODE);
        InstrHeader {
            opcode: Opcode::Mov.byte(),
            flags: 0,
        }
        .encode(&mut sec);
        Operand::reg(8).encode(&mut sec);
        Operand::imm_i32(1).encode(&mut sec);

        let mut obj = IrObject::new();
        obj.add_section(sec);

        let mut cg = X86Codegen::new();
        let err = process_object(&obj, &mut cg).unwrap_err();
        assert!(err
            .to_string()
            .contains("invalid register 8 at offset 0, target has 8 register(s)"));
    }

    #[test]
    fn test_processing_is_idempotent() {
        let mut obj = IrObject::new();
        let (strtab, offsets) = build_strtab(&[".text"]);
        obj.add_section(strtab);
        let mut code = ret_section(offsets[0]);
        // Make the section non-trivial.
        InstrHeader {
            opcode: Opcode::Nop.byte(),
            flags: 0,
        }
        .encode(&mut code);
        obj.add_section(code);

        let mut cg = X86Codegen::new();
        let first = elf_bytes(&process_object(&obj, &mut cg).unwrap());
        let second = elf_bytes(&process_object(&obj, &mut cg).unwrap());
        assert_eq!(first, second);
    }
}
