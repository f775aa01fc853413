//! # Bit Primitives
//!
//! Small helpers for pulling fields out of instruction bytes and for the
//! byte/word operand width used throughout the execution unit.

/// Operand width of an instruction.
///
/// Most 8086 opcodes carry a `w` bit (bit 0) that selects between an 8-bit
/// and a 16-bit operation. Values are always carried around as `u16` and
/// truncated with [`Width::mask`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    /// 8-bit operand
    Byte,
    /// 16-bit operand
    Word,
}

impl Width {
    /// Decodes the `w` bit (bit 0) of an opcode.
    pub fn from_opcode(opcode: u8) -> Self {
        if bit(opcode as u16, 0) {
            Width::Word
        } else {
            Width::Byte
        }
    }

    /// Mask covering every bit of a value of this width.
    pub fn mask(self) -> u16 {
        ((1u32 << self.bits()) - 1) as u16
    }

    /// Mask of the sign (most significant) bit.
    pub fn sign_bit(self) -> u16 {
        1 << (self.bits() - 1)
    }

    /// Number of bits in a value of this width.
    pub fn bits(self) -> u32 {
        match self {
            Width::Byte => 8,
            Width::Word => 16,
        }
    }

    /// Number of bytes in a value of this width.
    pub fn bytes(self) -> u16 {
        match self {
            Width::Byte => 1,
            Width::Word => 2,
        }
    }
}

/// Extracts `count` bits of `value` starting at bit `start`.
///
/// # Examples
///
/// ```
/// use lib8086::bits::get_bits;
///
/// // ModRM 0b10_011_101: mode=2, reg=3, rm=5
/// assert_eq!(get_bits(0b1001_1101, 6, 2), 2);
/// assert_eq!(get_bits(0b1001_1101, 3, 3), 3);
/// assert_eq!(get_bits(0b1001_1101, 0, 3), 5);
/// ```
pub fn get_bits(value: u8, start: u32, count: u32) -> u8 {
    ((value as u16 >> start) & ((1u16 << count) - 1)) as u8
}

/// Replaces `count` bits of `value` starting at bit `start` with `bits`.
pub fn set_bits(value: u16, start: u32, bits: u16, count: u32) -> u16 {
    let field = ((1u32 << count) - 1) as u16;
    (value & !(field << start)) | ((bits & field) << start)
}

/// Returns true if bit `n` of `value` is set.
pub fn bit(value: u16, n: u32) -> bool {
    (value >> n) & 1 != 0
}

/// Sign-extends the low byte of `value` to 16 bits.
pub fn sign_extend(value: u8) -> u16 {
    value as i8 as i16 as u16
}

/// Swaps the two bytes of a word.
pub fn byte_swap(value: u16) -> u16 {
    value.swap_bytes()
}

/// Even parity of the low byte, as reported by the parity flag.
pub fn parity(value: u16) -> bool {
    (value as u8).count_ones() % 2 == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_set_bits() {
        assert_eq!(get_bits(0xC7, 6, 2), 3);
        assert_eq!(get_bits(0xC7, 3, 3), 0);
        assert_eq!(set_bits(0x1234, 8, 0xAB, 8), 0xAB34);
        assert_eq!(set_bits(0x1234, 0, 0xCD, 8), 0x12CD);
        assert_eq!(set_bits(0xFFFF, 4, 0, 4), 0xFF0F);
    }

    #[test]
    fn test_sign_extend() {
        assert_eq!(sign_extend(0x7F), 0x007F);
        assert_eq!(sign_extend(0x80), 0xFF80);
        assert_eq!(sign_extend(0xFF), 0xFFFF);
    }

    #[test]
    fn test_parity_uses_low_byte_only() {
        assert!(parity(0x00));
        assert!(parity(0x03));
        assert!(!parity(0x01));
        assert!(parity(0x0100)); // high byte ignored
        assert_eq!(byte_swap(0x1234), 0x3412);
    }

    #[test]
    fn test_width() {
        assert_eq!(Width::from_opcode(0x88), Width::Byte);
        assert_eq!(Width::from_opcode(0x89), Width::Word);
        assert_eq!(Width::Byte.bits(), 8);
        assert_eq!(Width::Byte.mask(), 0x00FF);
        assert_eq!(Width::Word.mask(), 0xFFFF);
        assert_eq!(Width::Byte.sign_bit(), 0x0080);
        assert_eq!(Width::Word.sign_bit(), 0x8000);
        assert_eq!(Width::Word.bytes(), 2);
    }
}
