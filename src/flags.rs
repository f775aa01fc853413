//! # Status Flags
//!
//! The 8086 FLAGS register modeled as nine named booleans plus an explicit
//! pack/unpack pair for the instructions that move FLAGS as a word
//! (PUSHF, POPF, LAHF, SAHF, INT, IRET).
//!
//! ## Packed layout
//!
//! | Bit | Flag |
//! |-----|------|
//! | 0   | CF (carry) |
//! | 2   | PF (parity) |
//! | 4   | AF (auxiliary carry) |
//! | 6   | ZF (zero) |
//! | 7   | SF (sign) |
//! | 8   | TF (trap) |
//! | 9   | IF (interrupt enable) |
//! | 10  | DF (direction) |
//! | 11  | OF (overflow) |
//!
//! The remaining bits are not modeled. Whatever was last packed into them is
//! read back unchanged.

use crate::bits::{bit, parity, Width};

const CARRY: u16 = 1 << 0;
const PARITY: u16 = 1 << 2;
const AUXILIARY: u16 = 1 << 4;
const ZERO: u16 = 1 << 6;
const SIGN: u16 = 1 << 7;
const TRAP: u16 = 1 << 8;
const INTERRUPT: u16 = 1 << 9;
const DIRECTION: u16 = 1 << 10;
const OVERFLOW: u16 = 1 << 11;

/// Mask of every bit that maps to a named flag.
pub const DEFINED_FLAGS: u16 =
    CARRY | PARITY | AUXILIARY | ZERO | SIGN | TRAP | INTERRUPT | DIRECTION | OVERFLOW;

/// Processor status flags.
///
/// # Examples
///
/// ```
/// use lib8086::Flags;
///
/// let mut flags = Flags::default();
/// flags.carry = true;
/// flags.zero = true;
/// assert_eq!(flags.bits(), 0x0041);
///
/// let restored = Flags::from_bits(flags.bits());
/// assert_eq!(restored, flags);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Flags {
    /// CF: unsigned carry out of / borrow into the most significant bit
    pub carry: bool,
    /// PF: low byte of the result has an even number of set bits
    pub parity: bool,
    /// AF: carry out of / borrow into bit 3
    pub auxiliary: bool,
    /// ZF: result is zero
    pub zero: bool,
    /// SF: most significant bit of the result
    pub sign: bool,
    /// TF: single-step trap
    pub trap: bool,
    /// IF: maskable interrupts enabled
    pub interrupt: bool,
    /// DF: string operations decrement their index registers
    pub direction: bool,
    /// OF: signed overflow
    pub overflow: bool,
    pub(crate) reserved: u16,
}

impl Flags {
    /// Unpacks a FLAGS word.
    pub fn from_bits(value: u16) -> Self {
        let mut flags = Flags::default();
        flags.set_bits(value);
        flags
    }

    /// Packs the flags into a FLAGS word.
    pub fn bits(&self) -> u16 {
        let mut value = self.reserved;
        for (set, mask) in [
            (self.carry, CARRY),
            (self.parity, PARITY),
            (self.auxiliary, AUXILIARY),
            (self.zero, ZERO),
            (self.sign, SIGN),
            (self.trap, TRAP),
            (self.interrupt, INTERRUPT),
            (self.direction, DIRECTION),
            (self.overflow, OVERFLOW),
        ] {
            if set {
                value |= mask;
            }
        }
        value
    }

    /// Overwrites every flag from a FLAGS word.
    pub fn set_bits(&mut self, value: u16) {
        self.carry = bit(value, 0);
        self.parity = bit(value, 2);
        self.auxiliary = bit(value, 4);
        self.zero = bit(value, 6);
        self.sign = bit(value, 7);
        self.trap = bit(value, 8);
        self.interrupt = bit(value, 9);
        self.direction = bit(value, 10);
        self.overflow = bit(value, 11);
        self.reserved = value & !DEFINED_FLAGS;
    }

    /// Sets SF, ZF and PF from a result of the given width.
    pub fn set_szp(&mut self, result: u16, width: Width) {
        let result = result & width.mask();
        self.sign = result & width.sign_bit() != 0;
        self.zero = result == 0;
        self.parity = parity(result);
    }
}

impl From<u16> for Flags {
    fn from(value: u16) -> Self {
        Flags::from_bits(value)
    }
}

impl From<Flags> for u16 {
    fn from(flags: Flags) -> Self {
        flags.bits()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_flag_bit_position() {
        let cases: [(fn(&mut Flags), u16); 9] = [
            (|f| f.carry = true, 0x0001),
            (|f| f.parity = true, 0x0004),
            (|f| f.auxiliary = true, 0x0010),
            (|f| f.zero = true, 0x0040),
            (|f| f.sign = true, 0x0080),
            (|f| f.trap = true, 0x0100),
            (|f| f.interrupt = true, 0x0200),
            (|f| f.direction = true, 0x0400),
            (|f| f.overflow = true, 0x0800),
        ];

        for (set, expected) in cases {
            let mut flags = Flags::default();
            set(&mut flags);
            assert_eq!(flags.bits(), expected);
        }
    }

    #[test]
    fn test_unmapped_bits_are_stable() {
        let flags = Flags::from_bits(0xF002);
        assert!(!flags.carry);
        assert_eq!(flags.bits(), 0xF002);
    }

    #[test]
    fn test_set_szp() {
        let mut flags = Flags::default();
        flags.set_szp(0x0180, Width::Byte);
        assert!(flags.sign);
        assert!(!flags.zero);
        assert!(!flags.parity);

        flags.set_szp(0x0100, Width::Byte);
        assert!(!flags.sign);
        assert!(flags.zero);
        assert!(flags.parity);
    }

    #[test]
    fn test_set_bits_overwrites_all_named_flags() {
        let mut flags = Flags::from_bits(DEFINED_FLAGS);
        flags.set_bits(0);
        assert_eq!(flags, Flags::default());
    }
}
