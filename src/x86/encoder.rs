// This module is the hand-rolled x86-32 instruction encoder at the heart of the backend.
// X86Codegen walks a code section's instruction stream instruction by instruction: it maps
// the opcode byte into the opcode space, decodes the operands the opcode requires, checks
// registers against the target's register set, picks an encoding template from the operand
// kinds and declared value widths, and emits opcode byte, ModRM byte, and immediate into a
// bounded per-instruction scratch buffer before appending to the section's output. Byte-
// typed immediates select the sign-extended short forms (83 /ext ib, 6A ib, EB cb) where
// the architecture offers them; dword-typed immediates select the full forms. The six
// group-1 ALU operations share one routine parameterized by ModR/M extension and reg-reg
// opcode, as do the four F7 unary operations. Dispatch is an exhaustive match over the
// Opcode sum type, so an opcode without a routine is a hard error rather than a table gap,
// and a decoded instruction never partially reaches the output: bytes are handed over only
// after the whole instruction encoded successfully.

//! x86-32 instruction encoding by direct byte emission.
//!
//! Addressing is register-direct only (`mod = 11`). Memory operands are an
//! extension point, not part of the instruction set handled here.

use log::trace;

use crate::codegen::{CodeGen, Target};
use crate::error::{Error, Result};
use crate::ir::{InstrHeader, IrSection, Opcode, Operand, OperandKind, ValueType};
use super::registers::Reg;

/// Maximum encoded length of one x86 instruction.
pub const MAX_INSTR_LEN: usize = 15;

/// Bounded scratch buffer for one instruction's bytes.
///
/// Lives inside the encoder context and is reset per instruction. Writes past
/// the architectural maximum latch an overflow flag instead of growing, and
/// [`InstrBuf::bytes`] reports the overflow when the instruction is read back.
#[derive(Debug)]
pub struct InstrBuf {
    bytes: [u8; MAX_INSTR_LEN],
    len: usize,
    overflowed: bool,
}

impl InstrBuf {
    #[must_use]
    pub fn new() -> Self {
        Self {
            bytes: [0; MAX_INSTR_LEN],
            len: 0,
            overflowed: false,
        }
    }

    /// Forget the previous instruction.
    pub fn reset(&mut self) {
        self.len = 0;
        self.overflowed = false;
    }

    /// Emit a single byte.
    pub fn push(&mut self, byte: u8) {
        if self.len < MAX_INSTR_LEN {
            self.bytes[self.len] = byte;
            self.len += 1;
        } else {
            self.len += 1;
            self.overflowed = true;
        }
    }

    /// Emit a slice of bytes.
    pub fn extend(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.push(b);
        }
    }

    /// Emit a 32-bit little-endian immediate.
    pub fn push_u32(&mut self, value: u32) {
        self.extend(&value.to_le_bytes());
    }

    /// The assembled instruction, or the overflow error.
    pub fn bytes(&self) -> Result<&[u8]> {
        if self.overflowed {
            return Err(Error::EncodeOverflow {
                len: self.len,
                max: MAX_INSTR_LEN,
            });
        }
        Ok(&self.bytes[..self.len])
    }
}

impl Default for InstrBuf {
    fn default() -> Self {
        Self::new()
    }
}

/// ModR/M byte builder, register-direct addressing only.
#[derive(Debug, Clone, Copy)]
pub struct ModRM {
    mod_: u8, // 2 bits: addressing mode
    reg: u8,  // 3 bits: register or opcode extension
    rm: u8,   // 3 bits: register operand
}

impl ModRM {
    /// Create ModR/M for register-to-register (mod=11)
    #[must_use]
    pub fn reg_reg(reg: u8, rm: u8) -> Self {
        Self {
            mod_: 0b11,
            reg: reg & 0x07,
            rm: rm & 0x07,
        }
    }

    /// Create ModR/M for register with opcode extension (mod=11)
    #[must_use]
    pub fn reg_opext(opext: u8, rm: u8) -> Self {
        Self {
            mod_: 0b11,
            reg: opext & 0x07,
            rm: rm & 0x07,
        }
    }

    /// Encode to byte
    #[must_use]
    pub fn encode(self) -> u8 {
        (self.mod_ << 6) | (self.reg << 3) | self.rm
    }
}

/// The x86-32 encoder context.
///
/// Owns the per-instruction scratch buffer. One context is built per run and
/// driven by the section processor through the [`CodeGen`] trait.
#[derive(Debug, Default)]
pub struct X86Codegen {
    buf: InstrBuf,
}

impl X86Codegen {
    #[must_use]
    pub fn new() -> Self {
        Self {
            buf: InstrBuf::new(),
        }
    }

    /// Dispatch one instruction to its encoder routine.
    ///
    /// `pos` sits just past the instruction header, `at` is where the
    /// instruction started; routines decode their own operands and return the
    /// advanced position.
    fn encode_instr(
        &mut self,
        op: Opcode,
        code: &IrSection,
        pos: usize,
        at: usize,
    ) -> Result<usize> {
        match op {
            Opcode::Nop => {
                self.buf.push(0x90);
                Ok(pos)
            }
            Opcode::Ret => {
                self.buf.push(0xC3);
                Ok(pos)
            }
            Opcode::Mov => self.encode_mov(code, pos, at),
            Opcode::Push => self.encode_push(code, pos, at),
            Opcode::Pop => self.encode_pop(code, pos, at),
            Opcode::Jmp => self.encode_jmp(code, pos, at),
            Opcode::Call => self.encode_call(code, pos, at),
            Opcode::Test => self.encode_test(code, pos, at),
            Opcode::Inc => self.encode_incdec(code, pos, at, op, 0x40),
            Opcode::Dec => self.encode_incdec(code, pos, at, op, 0x48),

            // Group-1 ALU: 81/83 /ext for immediates, dedicated /r opcode
            // for register sources.
            Opcode::Add => self.encode_group1(code, pos, at, op, 0, 0x01),
            Opcode::Or => self.encode_group1(code, pos, at, op, 1, 0x09),
            Opcode::And => self.encode_group1(code, pos, at, op, 4, 0x21),
            Opcode::Sub => self.encode_group1(code, pos, at, op, 5, 0x29),
            Opcode::Xor => self.encode_group1(code, pos, at, op, 6, 0x31),
            Opcode::Cmp => self.encode_group1(code, pos, at, op, 7, 0x39),

            // Group-3 unary: F7 /ext.
            Opcode::Not => self.encode_group3(code, pos, at, op, 2),
            Opcode::Neg => self.encode_group3(code, pos, at, op, 3),
            Opcode::Mul => self.encode_group3(code, pos, at, op, 4),
            Opcode::Div => self.encode_group3(code, pos, at, op, 6),

            // Known opcodes without an encoder routine on this target.
            Opcode::Br
            | Opcode::Lea
            | Opcode::Mod
            | Opcode::Shl
            | Opcode::Shr
            | Opcode::Sar
            | Opcode::Cvt => Err(Error::UnregisteredOpcode {
                opcode: op.byte(),
                offset: at,
            }),
        }
    }

    /// mov reg, imm32 (B8+r id) and mov reg, reg (89 /r).
    fn encode_mov(&mut self, code: &IrSection, pos: usize, at: usize) -> Result<usize> {
        let (dst, pos) = Operand::decode(code, pos)?;
        let (src, pos) = Operand::decode(code, pos)?;
        let dst_reg = expect_reg(&dst, Opcode::Mov, at)?;

        match src.kind() {
            OperandKind::Imm if src.value_type().is_dword_sized() => {
                self.buf.push(0xB8 + dst_reg.encoding());
                self.buf.push_u32(src.value as u32);
            }
            OperandKind::Reg => {
                let src_reg = expect_reg(&src, Opcode::Mov, at)?;
                self.buf.push(0x89);
                self.buf
                    .push(ModRM::reg_reg(src_reg.encoding(), dst_reg.encoding()).encode());
            }
            _ => return Err(unsupported(Opcode::Mov, at)),
        }
        Ok(pos)
    }

    /// push reg (50+r), push imm8 (6A ib), push imm32 (68 id).
    fn encode_push(&mut self, code: &IrSection, pos: usize, at: usize) -> Result<usize> {
        let (op, pos) = Operand::decode(code, pos)?;
        match op.kind() {
            OperandKind::Reg => {
                let reg = expect_reg(&op, Opcode::Push, at)?;
                self.buf.push(0x50 + reg.encoding());
            }
            OperandKind::Imm if op.value_type().is_byte_sized() => {
                self.buf.push(0x6A);
                self.buf.push(op.value as u8);
            }
            OperandKind::Imm if op.value_type().is_dword_sized() => {
                self.buf.push(0x68);
                self.buf.push_u32(op.value as u32);
            }
            _ => return Err(unsupported(Opcode::Push, at)),
        }
        Ok(pos)
    }

    /// pop reg (58+r).
    fn encode_pop(&mut self, code: &IrSection, pos: usize, at: usize) -> Result<usize> {
        let (op, pos) = Operand::decode(code, pos)?;
        match op.kind() {
            OperandKind::Reg => {
                let reg = expect_reg(&op, Opcode::Pop, at)?;
                self.buf.push(0x58 + reg.encoding());
            }
            _ => return Err(unsupported(Opcode::Pop, at)),
        }
        Ok(pos)
    }

    /// jmp reg (FF /4), jmp rel8 (EB cb), jmp rel32 (E9 cd).
    ///
    /// Relative targets are emitted exactly as the IR carries them; resolving
    /// them against final addresses is a later linking concern.
    fn encode_jmp(&mut self, code: &IrSection, pos: usize, at: usize) -> Result<usize> {
        let (op, pos) = Operand::decode(code, pos)?;
        match op.kind() {
            OperandKind::Reg => {
                let reg = expect_reg(&op, Opcode::Jmp, at)?;
                self.buf.push(0xFF);
                self.buf.push(ModRM::reg_opext(4, reg.encoding()).encode());
            }
            OperandKind::Imm if op.value_type().is_byte_sized() => {
                self.buf.push(0xEB);
                self.buf.push(op.value as u8);
            }
            OperandKind::Imm if op.value_type().is_dword_sized() => {
                self.buf.push(0xE9);
                self.buf.push_u32(op.value as u32);
            }
            _ => return Err(unsupported(Opcode::Jmp, at)),
        }
        Ok(pos)
    }

    /// call reg (FF /2), call rel32 (E8 cd). There is no call rel8 form.
    fn encode_call(&mut self, code: &IrSection, pos: usize, at: usize) -> Result<usize> {
        let (op, pos) = Operand::decode(code, pos)?;
        match op.kind() {
            OperandKind::Reg => {
                let reg = expect_reg(&op, Opcode::Call, at)?;
                self.buf.push(0xFF);
                self.buf.push(ModRM::reg_opext(2, reg.encoding()).encode());
            }
            OperandKind::Imm if op.value_type().is_dword_sized() => {
                self.buf.push(0xE8);
                self.buf.push_u32(op.value as u32);
            }
            _ => return Err(unsupported(Opcode::Call, at)),
        }
        Ok(pos)
    }

    /// test reg, reg (85 /r) and test reg, imm32 (F7 /0 id).
    fn encode_test(&mut self, code: &IrSection, pos: usize, at: usize) -> Result<usize> {
        let (dst, pos) = Operand::decode(code, pos)?;
        let (src, pos) = Operand::decode(code, pos)?;
        let dst_reg = expect_reg(&dst, Opcode::Test, at)?;

        match src.kind() {
            OperandKind::Reg => {
                let src_reg = expect_reg(&src, Opcode::Test, at)?;
                self.buf.push(0x85);
                self.buf
                    .push(ModRM::reg_reg(src_reg.encoding(), dst_reg.encoding()).encode());
            }
            // No imm8 form exists for test r/m32.
            OperandKind::Imm if src.value_type().is_dword_sized() => {
                self.buf.push(0xF7);
                self.buf.push(ModRM::reg_opext(0, dst_reg.encoding()).encode());
                self.buf.push_u32(src.value as u32);
            }
            _ => return Err(unsupported(Opcode::Test, at)),
        }
        Ok(pos)
    }

    /// inc reg (40+r), dec reg (48+r).
    fn encode_incdec(
        &mut self,
        code: &IrSection,
        pos: usize,
        at: usize,
        op: Opcode,
        base: u8,
    ) -> Result<usize> {
        let (operand, pos) = Operand::decode(code, pos)?;
        let reg = expect_reg(&operand, op, at)?;
        self.buf.push(base + reg.encoding());
        Ok(pos)
    }

    /// The shared group-1 ALU template.
    ///
    /// `ext` is the ModR/M opcode extension for the 81/83 immediate forms,
    /// `mr_opcode` the dedicated reg,reg opcode. Byte-typed immediates take
    /// the sign-extended 83 short form.
    fn encode_group1(
        &mut self,
        code: &IrSection,
        pos: usize,
        at: usize,
        op: Opcode,
        ext: u8,
        mr_opcode: u8,
    ) -> Result<usize> {
        let (dst, pos) = Operand::decode(code, pos)?;
        let (src, pos) = Operand::decode(code, pos)?;
        let dst_reg = expect_reg(&dst, op, at)?;

        match src.kind() {
            OperandKind::Imm if src.value_type().is_byte_sized() => {
                self.buf.push(0x83);
                self.buf.push(ModRM::reg_opext(ext, dst_reg.encoding()).encode());
                self.buf.push(src.value as u8);
            }
            OperandKind::Imm if src.value_type().is_dword_sized() => {
                self.buf.push(0x81);
                self.buf.push(ModRM::reg_opext(ext, dst_reg.encoding()).encode());
                self.buf.push_u32(src.value as u32);
            }
            OperandKind::Reg => {
                let src_reg = expect_reg(&src, op, at)?;
                self.buf.push(mr_opcode);
                self.buf
                    .push(ModRM::reg_reg(src_reg.encoding(), dst_reg.encoding()).encode());
            }
            _ => return Err(unsupported(op, at)),
        }
        Ok(pos)
    }

    /// The shared group-3 unary template, F7 /ext on a single register.
    fn encode_group3(
        &mut self,
        code: &IrSection,
        pos: usize,
        at: usize,
        op: Opcode,
        ext: u8,
    ) -> Result<usize> {
        let (operand, pos) = Operand::decode(code, pos)?;
        let reg = expect_reg(&operand, op, at)?;
        self.buf.push(0xF7);
        self.buf.push(ModRM::reg_opext(ext, reg.encoding()).encode());
        Ok(pos)
    }
}

impl CodeGen for X86Codegen {
    fn target(&self) -> Target {
        Target::X86
    }

    fn encode_section(&mut self, code: &IrSection) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(code.size());
        let mut pos = 0;
        while pos < code.size() {
            let at = pos;
            let (hdr, next) = InstrHeader::decode(code, pos)?;
            let op = Opcode::from_byte(hdr.opcode).ok_or(Error::UnregisteredOpcode {
                opcode: hdr.opcode,
                offset: at,
            })?;

            self.buf.reset();
            pos = self.encode_instr(op, code, next, at)?;
            let bytes = self.buf.bytes()?;
            trace!("{} at {}: {} byte(s)", op.mnemonic(), at, bytes.len());
            out.extend_from_slice(bytes);
        }
        Ok(out)
    }
}

/// Resolve a register operand, or fail with the instruction's offset.
///
/// A register reference travels as kind `Reg` with a 4-byte `Reg`-typed
/// id; any other kind/type pairing is rejected before the id is narrowed.
fn expect_reg(op: &Operand, opcode: Opcode, at: usize) -> Result<Reg> {
    if op.kind() != OperandKind::Reg || op.value_type() != ValueType::Reg {
        return Err(unsupported(opcode, at));
    }
    let id = op.reg_id();
    Reg::from_id(id).ok_or(Error::InvalidRegister {
        id,
        count: Reg::COUNT,
        offset: at,
    })
}

fn unsupported(opcode: Opcode, at: usize) -> Error {
    Error::UnsupportedOperands {
        opcode: opcode.mnemonic(),
        offset: at,
    }
}
