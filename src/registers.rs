//! # Register File
//!
//! General-purpose, segment and instruction-pointer registers of the 8086.
//!
//! Register numbers are part of the instruction encoding: the `reg` and `r/m`
//! fields of a ModRM byte and the low three bits of the register-number
//! opcode family index into the tables below, so the discriminants must not
//! change.
//!
//! | #  | 16-bit | 8-bit | segment |
//! |----|--------|-------|---------|
//! | 0  | AX     | AL    | ES      |
//! | 1  | CX     | CL    | CS      |
//! | 2  | DX     | DL    | SS      |
//! | 3  | BX     | BL    | DS      |
//! | 4  | SP     | AH    |         |
//! | 5  | BP     | CH    |         |
//! | 6  | SI     | DH    |         |
//! | 7  | DI     | BH    |         |

use std::fmt;

use crate::bits::set_bits;
use crate::ExecutionError;

/// 16-bit general-purpose register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg16 {
    AX = 0,
    CX = 1,
    DX = 2,
    BX = 3,
    SP = 4,
    BP = 5,
    SI = 6,
    DI = 7,
}

/// 8-bit half of AX, CX, DX or BX.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reg8 {
    AL = 0,
    CL = 1,
    DL = 2,
    BL = 3,
    AH = 4,
    CH = 5,
    DH = 6,
    BH = 7,
}

/// Segment register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegReg {
    ES = 0,
    CS = 1,
    SS = 2,
    DS = 3,
}

impl Reg16 {
    /// All registers in encoding order.
    pub const ALL: [Reg16; 8] = [
        Reg16::AX,
        Reg16::CX,
        Reg16::DX,
        Reg16::BX,
        Reg16::SP,
        Reg16::BP,
        Reg16::SI,
        Reg16::DI,
    ];
}

impl Reg8 {
    /// All byte registers in encoding order.
    pub const ALL: [Reg8; 8] = [
        Reg8::AL,
        Reg8::CL,
        Reg8::DL,
        Reg8::BL,
        Reg8::AH,
        Reg8::CH,
        Reg8::DH,
        Reg8::BH,
    ];

    /// The word register this half belongs to.
    pub fn parent(self) -> Reg16 {
        Reg16::ALL[(self as usize) & 0b11]
    }

    /// True for AH, CH, DH and BH.
    pub fn is_high(self) -> bool {
        (self as u8) >= 4
    }
}

impl SegReg {
    /// All segment registers in encoding order.
    pub const ALL: [SegReg; 4] = [SegReg::ES, SegReg::CS, SegReg::SS, SegReg::DS];
}

impl TryFrom<u8> for Reg16 {
    type Error = ExecutionError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Reg16::ALL
            .get(index as usize)
            .copied()
            .ok_or(ExecutionError::InvalidRegister(index))
    }
}

impl TryFrom<u8> for Reg8 {
    type Error = ExecutionError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Reg8::ALL
            .get(index as usize)
            .copied()
            .ok_or(ExecutionError::InvalidRegister(index))
    }
}

impl TryFrom<u8> for SegReg {
    type Error = ExecutionError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        SegReg::ALL
            .get(index as usize)
            .copied()
            .ok_or(ExecutionError::InvalidRegister(index))
    }
}

/// Register file.
///
/// # Examples
///
/// ```
/// use lib8086::{Reg16, Reg8, Registers};
///
/// let mut regs = Registers::default();
/// regs.set(Reg16::AX, 0x1234);
/// assert_eq!(regs.get8(Reg8::AH), 0x12);
/// assert_eq!(regs.get8(Reg8::AL), 0x34);
///
/// regs.set8(Reg8::AL, 0xFF);
/// assert_eq!(regs.get(Reg16::AX), 0x12FF);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
    general: [u16; 8],
    segments: [u16; 4],
    ip: u16,
}

impl Registers {
    /// Reads a 16-bit general-purpose register.
    pub fn get(&self, reg: Reg16) -> u16 {
        self.general[reg as usize]
    }

    /// Writes a 16-bit general-purpose register.
    pub fn set(&mut self, reg: Reg16, value: u16) {
        self.general[reg as usize] = value;
    }

    /// Reads an 8-bit half register.
    pub fn get8(&self, reg: Reg8) -> u8 {
        let word = self.get(reg.parent());
        if reg.is_high() {
            (word >> 8) as u8
        } else {
            word as u8
        }
    }

    /// Writes an 8-bit half register, leaving the other half untouched.
    pub fn set8(&mut self, reg: Reg8, value: u8) {
        let parent = reg.parent();
        let start = if reg.is_high() { 8 } else { 0 };
        self.set(parent, set_bits(self.get(parent), start, value as u16, 8));
    }

    /// Reads a segment register.
    pub fn segment(&self, reg: SegReg) -> u16 {
        self.segments[reg as usize]
    }

    /// Writes a segment register.
    pub fn set_segment(&mut self, reg: SegReg, value: u16) {
        self.segments[reg as usize] = value;
    }

    /// Instruction pointer.
    pub fn ip(&self) -> u16 {
        self.ip
    }

    /// Sets the instruction pointer.
    pub fn set_ip(&mut self, value: u16) {
        self.ip = value;
    }
}

impl fmt::Display for Reg16 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl fmt::Display for Reg8 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl fmt::Display for SegReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_order() {
        assert_eq!(Reg16::try_from(4).unwrap(), Reg16::SP);
        assert_eq!(Reg8::try_from(4).unwrap(), Reg8::AH);
        assert_eq!(Reg8::try_from(7).unwrap(), Reg8::BH);
        assert_eq!(SegReg::try_from(3).unwrap(), SegReg::DS);
    }

    #[test]
    fn test_invalid_index() {
        assert_eq!(Reg16::try_from(8), Err(ExecutionError::InvalidRegister(8)));
        assert_eq!(SegReg::try_from(4), Err(ExecutionError::InvalidRegister(4)));
    }

    #[test]
    fn test_half_registers() {
        let mut regs = Registers::default();
        regs.set(Reg16::BX, 0xBEEF);
        regs.set8(Reg8::BH, 0x12);
        assert_eq!(regs.get(Reg16::BX), 0x12EF);
        regs.set8(Reg8::BL, 0x34);
        assert_eq!(regs.get(Reg16::BX), 0x1234);
        assert_eq!(regs.get8(Reg8::BH), 0x12);
        assert_eq!(Reg8::DH.parent(), Reg16::DX);
    }
}
