//! # Addressing Modes
//!
//! Most 8086 instructions name one operand with a ModRM byte:
//!
//! ```text
//!   7 6   5 4 3   2 1 0
//! [ mod ][ reg  ][ r/m ]
//! ```
//!
//! - `mod == 3`: the operand is the register selected by `r/m`
//! - `mod == 0`: memory at a base/index combination, except `r/m == 6` which
//!   is a direct 16-bit address
//! - `mod == 1`: base/index plus a sign-extended 8-bit displacement
//! - `mod == 2`: base/index plus a 16-bit displacement
//!
//! | r/m | base/index | default segment |
//! |-----|------------|-----------------|
//! | 0   | BX + SI    | DS |
//! | 1   | BX + DI    | DS |
//! | 2   | BP + SI    | SS |
//! | 3   | BP + DI    | SS |
//! | 4   | SI         | DS |
//! | 5   | DI         | DS |
//! | 6   | BP         | SS |
//! | 7   | BX         | DS |
//!
//! A segment override prefix replaces the default segment.
//!
//! Displacement bytes are consumed from the instruction stream exactly once,
//! when [`CPU::decode_operand`] builds an [`Operand`]. The descriptor is then
//! used for both halves of a read-modify-write, so no instruction ever has to
//! rewind IP to read its operand a second time.

use crate::bits::{get_bits, sign_extend, Width};
use crate::registers::{Reg16, Reg8, SegReg};
use crate::{ExecutionError, MemoryBus, CPU};

/// Fields of a ModRM byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModRm {
    /// Addressing mode (0-3)
    pub mode: u8,
    /// Register operand, or sub-opcode for group instructions (0-7)
    pub reg: u8,
    /// Register or memory selector (0-7)
    pub rm: u8,
}

impl From<u8> for ModRm {
    fn from(byte: u8) -> Self {
        Self {
            mode: get_bits(byte, 6, 2),
            reg: get_bits(byte, 3, 3),
            rm: get_bits(byte, 0, 3),
        }
    }
}

/// A decoded operand location.
///
/// # Examples
///
/// ```
/// use lib8086::{ModRm, Operand, SegReg};
///
/// // mod=3 names a register and consumes no displacement
/// let modrm = ModRm::from(0b11_000_011);
/// assert_eq!(modrm.rm, 3);
///
/// let operand = Operand::Memory { segment: SegReg::SS, offset: 0x0FFE };
/// assert_ne!(operand, Operand::Register(modrm.rm));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// Register number (byte or word register depending on width)
    Register(u8),
    /// Memory at `segment:offset`
    Memory {
        /// Segment register supplying the base
        segment: SegReg,
        /// Effective address within the segment
        offset: u16,
    },
}

impl<M: MemoryBus> CPU<M> {
    /// Fetches a ModRM byte from the instruction stream.
    pub(crate) fn fetch_modrm(&mut self) -> ModRm {
        ModRm::from(self.fetch8())
    }

    /// Resolves the `mod`/`r/m` half of a ModRM byte, consuming any displacement.
    pub(crate) fn decode_operand(&mut self, modrm: ModRm) -> Result<Operand, ExecutionError> {
        let displacement = match modrm.mode {
            3 => return Ok(Operand::Register(modrm.rm)),
            0 if modrm.rm == 6 => {
                // Direct address
                let offset = self.fetch16();
                return Ok(Operand::Memory {
                    segment: self.data_segment(SegReg::DS),
                    offset,
                });
            }
            0 => 0,
            1 => sign_extend(self.fetch8()),
            2 => self.fetch16(),
            mode => return Err(ExecutionError::InvalidAddressingMode(mode)),
        };

        let (base, default_segment) = self.base_offset(modrm.rm)?;
        Ok(Operand::Memory {
            segment: self.data_segment(default_segment),
            offset: base.wrapping_add(displacement),
        })
    }

    /// Fetches a ModRM byte and resolves its operand.
    pub(crate) fn fetch_operand(&mut self) -> Result<(ModRm, Operand), ExecutionError> {
        let modrm = self.fetch_modrm();
        let operand = self.decode_operand(modrm)?;
        Ok((modrm, operand))
    }

    fn base_offset(&self, rm: u8) -> Result<(u16, SegReg), ExecutionError> {
        let r = |reg| self.regs.get(reg);
        Ok(match rm {
            0 => (r(Reg16::BX).wrapping_add(r(Reg16::SI)), SegReg::DS),
            1 => (r(Reg16::BX).wrapping_add(r(Reg16::DI)), SegReg::DS),
            2 => (r(Reg16::BP).wrapping_add(r(Reg16::SI)), SegReg::SS),
            3 => (r(Reg16::BP).wrapping_add(r(Reg16::DI)), SegReg::SS),
            4 => (r(Reg16::SI), SegReg::DS),
            5 => (r(Reg16::DI), SegReg::DS),
            6 => (r(Reg16::BP), SegReg::SS),
            7 => (r(Reg16::BX), SegReg::DS),
            rm => return Err(ExecutionError::InvalidRegister(rm)),
        })
    }

    /// Offset of a memory operand, for LEA/LES/LDS and far indirect transfers.
    ///
    /// `opcode` is reported if the operand is a register.
    pub(crate) fn memory_operand(
        &self,
        operand: Operand,
        opcode: u8,
    ) -> Result<(SegReg, u16), ExecutionError> {
        match operand {
            Operand::Memory { segment, offset } => Ok((segment, offset)),
            Operand::Register(_) => Err(ExecutionError::MemoryOperandRequired(opcode)),
        }
    }

    /// Reads a decoded operand.
    pub(crate) fn read_operand(&self, operand: Operand, width: Width) -> Result<u16, ExecutionError> {
        match operand {
            Operand::Register(index) => self.read_register(index, width),
            Operand::Memory { segment, offset } => {
                let base = self.regs.segment(segment);
                Ok(match width {
                    Width::Byte => self.read8(base, offset) as u16,
                    Width::Word => self.read16(base, offset),
                })
            }
        }
    }

    /// Writes a decoded operand. Byte writes use the low 8 bits of `value`.
    pub(crate) fn write_operand(
        &mut self,
        operand: Operand,
        width: Width,
        value: u16,
    ) -> Result<(), ExecutionError> {
        match operand {
            Operand::Register(index) => self.write_register(index, width, value),
            Operand::Memory { segment, offset } => {
                let base = self.regs.segment(segment);
                match width {
                    Width::Byte => self.write8(base, offset, value as u8),
                    Width::Word => self.write16(base, offset, value),
                }
                Ok(())
            }
        }
    }

    /// Reads the register encoded as `index` at the given width.
    pub(crate) fn read_register(&self, index: u8, width: Width) -> Result<u16, ExecutionError> {
        Ok(match width {
            Width::Byte => self.regs.get8(Reg8::try_from(index)?) as u16,
            Width::Word => self.regs.get(Reg16::try_from(index)?),
        })
    }

    /// Writes the register encoded as `index` at the given width.
    pub(crate) fn write_register(
        &mut self,
        index: u8,
        width: Width,
        value: u16,
    ) -> Result<(), ExecutionError> {
        match width {
            Width::Byte => self.regs.set8(Reg8::try_from(index)?, value as u8),
            Width::Word => self.regs.set(Reg16::try_from(index)?, value),
        }
        Ok(())
    }
}
