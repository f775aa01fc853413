//! Property-based tests for CPU invariants.
//!
//! These tests use proptest to verify that register aliasing, flag packing,
//! operand decoding and the arithmetic group hold across the whole input space.

use lib8086::flags::DEFINED_FLAGS;
use lib8086::{FlatMemory, Flags, MemoryBus, Reg16, Reg8, Registers, SegReg, CPU};
use proptest::prelude::*;

/// Helper function to create a CPU executing `program` at 0100:0000
fn setup_cpu(program: &[u8]) -> CPU<FlatMemory> {
    let mut cpu = CPU::new(FlatMemory::new());
    cpu.set_segment(SegReg::CS, 0x0100);
    cpu.set_ip(0x0000);
    cpu.set_segment(SegReg::DS, 0x2000);
    cpu.load(0x0100, 0x0000, program);
    cpu
}

/// Reference model of the eight-bit and sixteen-bit add/subtract flags,
/// computed with plain integer arithmetic
#[derive(Debug, PartialEq, Eq)]
struct Expected {
    result: u16,
    carry: bool,
    overflow: bool,
    auxiliary: bool,
    zero: bool,
    sign: bool,
}

fn reference(a: u16, b: u16, carry_in: bool, subtract: bool, bits: u32) -> Expected {
    let mask = ((1u32 << bits) - 1) as i64;
    let c = carry_in as i64;
    let (ua, ub) = (a as i64 & mask, b as i64 & mask);
    let signed = |v: i64| if v >> (bits - 1) & 1 == 1 { v - (mask + 1) } else { v };
    let (sa, sb) = (signed(ua), signed(ub));
    let min = -(1i64 << (bits - 1));
    let max = (1i64 << (bits - 1)) - 1;

    let (unsigned, signed_result, auxiliary) = if subtract {
        (ua - ub - c, sa - sb - c, (ua & 0xF) - (ub & 0xF) - c < 0)
    } else {
        (ua + ub + c, sa + sb + c, (ua & 0xF) + (ub & 0xF) + c > 0xF)
    };
    let result = (unsigned & mask) as u16;

    Expected {
        result,
        carry: unsigned < 0 || unsigned > mask,
        overflow: signed_result < min || signed_result > max,
        auxiliary,
        zero: result == 0,
        sign: (result as i64) >> (bits - 1) & 1 == 1,
    }
}

fn observed<M: MemoryBus>(cpu: &CPU<M>, result: u16) -> Expected {
    let flags = cpu.flags();
    Expected {
        result,
        carry: flags.carry,
        overflow: flags.overflow,
        auxiliary: flags.auxiliary,
        zero: flags.zero,
        sign: flags.sign,
    }
}

// ========== Flags and Registers ==========

proptest! {
    /// Property: packing then unpacking reproduces every named flag
    #[test]
    fn prop_flags_round_trip(
        carry in any::<bool>(),
        parity in any::<bool>(),
        auxiliary in any::<bool>(),
        zero in any::<bool>(),
        sign in any::<bool>(),
        trap in any::<bool>(),
        interrupt in any::<bool>(),
        direction in any::<bool>(),
        overflow in any::<bool>(),
    ) {
        let mut flags = Flags::default();
        flags.carry = carry;
        flags.parity = parity;
        flags.auxiliary = auxiliary;
        flags.zero = zero;
        flags.sign = sign;
        flags.trap = trap;
        flags.interrupt = interrupt;
        flags.direction = direction;
        flags.overflow = overflow;

        let restored = Flags::from_bits(flags.bits());
        prop_assert_eq!(restored, flags);
    }

    /// Property: unpacking then packing preserves every defined bit
    #[test]
    fn prop_flags_word_round_trip(bits in any::<u16>()) {
        let flags = Flags::from_bits(bits);
        prop_assert_eq!(flags.bits() & DEFINED_FLAGS, bits & DEFINED_FLAGS);
    }

    /// Property: writing a half register never perturbs the other half
    #[test]
    fn prop_half_register_isolation(
        index in 0u8..8,
        word in any::<u16>(),
        byte in any::<u8>(),
    ) {
        let half = Reg8::try_from(index).unwrap();
        let parent = half.parent();
        let mut regs = Registers::default();
        regs.set(parent, word);

        regs.set8(half, byte);

        let expected = if half.is_high() {
            (word & 0x00FF) | (byte as u16) << 8
        } else {
            (word & 0xFF00) | byte as u16
        };
        prop_assert_eq!(regs.get(parent), expected);
        prop_assert_eq!(regs.get8(half), byte);
    }

    /// Property: a word write is visible through both halves, low byte in the L half
    #[test]
    fn prop_word_write_visible_in_halves(index in 0u8..4, word in any::<u16>()) {
        let reg = Reg16::try_from(index).unwrap();
        let low = Reg8::try_from(index).unwrap();
        let high = Reg8::try_from(index + 4).unwrap();
        let mut regs = Registers::default();

        regs.set(reg, word);

        prop_assert_eq!(regs.get8(low), word as u8);
        prop_assert_eq!(regs.get8(high), (word >> 8) as u8);
    }
}

// ========== Operand Decoding ==========

proptest! {
    /// Property: a read-modify-write memory operand with a 16-bit displacement
    /// addresses the same location on read and write and consumes each
    /// displacement and immediate byte exactly once
    #[test]
    fn prop_read_modify_write_addresses_once(
        bx in any::<u16>(),
        si in any::<u16>(),
        disp in any::<u16>(),
        imm in any::<u16>(),
        initial in any::<u16>(),
    ) {
        // ADD WORD [BX+SI+disp16], imm16 ; NOP
        let [d0, d1] = disp.to_le_bytes();
        let [i0, i1] = imm.to_le_bytes();
        let mut cpu = setup_cpu(&[0x81, 0x80, d0, d1, i0, i1, 0x90]);
        cpu.set_reg16(Reg16::BX, bx);
        cpu.set_reg16(Reg16::SI, si);

        let offset = bx.wrapping_add(si).wrapping_add(disp);
        let low = 0x20000 + offset as u32;
        let high = low + 1;
        cpu.memory_mut().write(low, initial as u8);
        cpu.memory_mut().write(high, (initial >> 8) as u8);

        cpu.step().unwrap();

        let stored = cpu.memory().read(low) as u16 | (cpu.memory().read(high) as u16) << 8;
        prop_assert_eq!(stored, initial.wrapping_add(imm));
        prop_assert_eq!(cpu.ip(), 6);
    }

    /// Property: the same holds for an 8-bit sign-extended displacement
    #[test]
    fn prop_disp8_is_sign_extended(bp in any::<u16>(), disp in any::<u8>(), value in any::<u8>()) {
        // INC BYTE [BP+disp8] ; NOP
        let mut cpu = setup_cpu(&[0xFE, 0x46, disp, 0x90]);
        cpu.set_segment(SegReg::SS, 0x3000);
        cpu.set_reg16(Reg16::BP, bp);

        let offset = bp.wrapping_add(disp as i8 as u16);
        let address = 0x30000 + offset as u32;
        cpu.memory_mut().write(address, value);

        cpu.step().unwrap();

        prop_assert_eq!(cpu.memory().read(address), value.wrapping_add(1));
        prop_assert_eq!(cpu.ip(), 3);
    }
}

// ========== Arithmetic Against a Reference Model ==========

proptest! {
    /// Property: ADD/ADC/SUB/SBB AL, imm8 match the reference model
    #[test]
    fn prop_byte_arithmetic(
        op in prop::sample::select(vec![0u8, 2, 3, 5]),
        a in any::<u8>(),
        b in any::<u8>(),
        carry_in in any::<bool>(),
    ) {
        let mut cpu = setup_cpu(&[(op << 3) | 0x04, b]);
        cpu.set_reg8(Reg8::AL, a);
        cpu.flags_mut().carry = carry_in;

        cpu.step().unwrap();

        let uses_carry = op == 2 || op == 3;
        let expected = reference(a as u16, b as u16, carry_in && uses_carry, op >= 3, 8);
        prop_assert_eq!(observed(&cpu, cpu.reg8(Reg8::AL) as u16), expected);
    }

    /// Property: ADD/ADC/SUB/SBB AX, imm16 match the reference model
    #[test]
    fn prop_word_arithmetic(
        op in prop::sample::select(vec![0u8, 2, 3, 5]),
        a in any::<u16>(),
        b in any::<u16>(),
        carry_in in any::<bool>(),
    ) {
        let [b0, b1] = b.to_le_bytes();
        let mut cpu = setup_cpu(&[(op << 3) | 0x05, b0, b1]);
        cpu.set_reg16(Reg16::AX, a);
        cpu.flags_mut().carry = carry_in;

        cpu.step().unwrap();

        let uses_carry = op == 2 || op == 3;
        let expected = reference(a, b, carry_in && uses_carry, op >= 3, 16);
        prop_assert_eq!(observed(&cpu, cpu.reg16(Reg16::AX)), expected);
    }

    /// Property: CMP sets the same flags as SUB and leaves the operand alone
    #[test]
    fn prop_cmp_matches_sub(a in any::<u8>(), b in any::<u8>()) {
        let mut cpu = setup_cpu(&[0x3C, b]);
        cpu.set_reg8(Reg8::AL, a);

        cpu.step().unwrap();

        let expected = reference(a as u16, b as u16, false, true, 8);
        prop_assert_eq!(cpu.reg8(Reg8::AL), a);
        prop_assert_eq!(cpu.flags().carry, expected.carry);
        prop_assert_eq!(cpu.flags().zero, expected.zero);
        prop_assert_eq!(cpu.flags().overflow, expected.overflow);
    }

    /// Property: AND/OR/XOR always clear CF and OF, and PF tracks the low byte
    #[test]
    fn prop_logic_clears_carry_and_overflow(
        op in prop::sample::select(vec![1u8, 4, 6]),
        a in any::<u8>(),
        b in any::<u8>(),
    ) {
        let mut cpu = setup_cpu(&[(op << 3) | 0x04, b]);
        cpu.set_reg8(Reg8::AL, a);
        cpu.flags_mut().carry = true;
        cpu.flags_mut().overflow = true;

        cpu.step().unwrap();

        let result = cpu.reg8(Reg8::AL);
        let expected = match op {
            1 => a | b,
            4 => a & b,
            _ => a ^ b,
        };
        prop_assert_eq!(result, expected);
        prop_assert!(!cpu.flags().carry);
        prop_assert!(!cpu.flags().overflow);
        prop_assert_eq!(cpu.flags().parity, result.count_ones() % 2 == 0);
    }
}

// ========== Control Flow Round Trips ==========

proptest! {
    /// Property: INT n followed by IRET restores CS, IP, SP and FLAGS
    #[test]
    fn prop_interrupt_round_trip(vector in any::<u8>(), flags in any::<u16>()) {
        let mut cpu = setup_cpu(&[0xCD, vector, 0x90]);
        cpu.set_segment(SegReg::SS, 0x0900);
        cpu.set_reg16(Reg16::SP, 0x1000);
        cpu.flags_mut().set_bits(flags);
        cpu.memory_mut().write_word(vector as u32 * 4, 0x0000);
        cpu.memory_mut().write_word(vector as u32 * 4 + 2, 0x0200);
        cpu.load(0x0200, 0x0000, &[0xCF]);
        let before = cpu.flags().bits();

        cpu.run(2).unwrap();

        prop_assert_eq!(cpu.segment(SegReg::CS), 0x0100);
        prop_assert_eq!(cpu.ip(), 0x0002);
        prop_assert_eq!(cpu.reg16(Reg16::SP), 0x1000);
        prop_assert_eq!(cpu.flags().bits(), before);
    }

    /// Property: REP MOVSB with a non-zero CX copies exactly CX bytes and
    /// leaves CX at zero
    #[test]
    fn prop_rep_movsb(data in prop::collection::vec(any::<u8>(), 1..64)) {
        let mut cpu = setup_cpu(&[0xF3, 0xA4]);
        cpu.set_segment(SegReg::ES, 0x3000);
        cpu.set_reg16(Reg16::CX, data.len() as u16);
        cpu.memory_mut().load(0x20000, &data);
        cpu.memory_mut().write(0x20000 + data.len() as u32, 0xEE);

        cpu.step().unwrap();

        for (i, &byte) in data.iter().enumerate() {
            prop_assert_eq!(cpu.memory().read(0x30000 + i as u32), byte);
        }
        prop_assert_eq!(cpu.memory().read(0x30000 + data.len() as u32), 0x00);
        prop_assert_eq!(cpu.reg16(Reg16::CX), 0);
        prop_assert_eq!(cpu.reg16(Reg16::SI), data.len() as u16);
        prop_assert_eq!(cpu.reg16(Reg16::DI), data.len() as u16);
    }
}
