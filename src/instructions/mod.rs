//! # 8086 Instruction Implementations
//!
//! This module contains the implementations of the 8086 instruction set, organized
//! by category. Each instruction is implemented as a standalone function that takes
//! a mutable reference to the CPU and the opcode byte. Prefixes have already been
//! consumed by the time an instruction runs.
//!
//! ## Categories
//!
//! - **alu**: Group 1 (ADD OR ADC SBB AND SUB XOR CMP) and TEST
//! - **bcd**: Decimal adjusts (DAA DAS AAA AAS AAM AAD)
//! - **control**: Jumps, calls, returns, loops and Group 5
//! - **flags**: Flag manipulation (CLC STC CLI STI CLD STD CMC)
//! - **inc_dec**: INC/DEC on registers and Group 4
//! - **interrupts**: INT, INT 3, INTO, IRET
//! - **io**: IN and OUT
//! - **muldiv**: Group 3 (TEST NOT NEG MUL IMUL DIV IDIV)
//! - **shifts**: Group 2 (ROL ROR RCL RCR SHL SHR SAR)
//! - **stack**: PUSH, POP, PUSHF, POPF
//! - **string**: MOVS CMPS STOS LODS SCAS with repeat prefixes
//! - **transfer**: MOV, XCHG, LEA, LES, LDS, XLAT, LAHF, SAHF, CBW, CWD

pub mod alu;
pub mod bcd;
pub mod control;
pub mod flags;
pub mod inc_dec;
pub mod interrupts;
pub mod io;
pub mod muldiv;
pub mod shifts;
pub mod stack;
pub mod string;
pub mod transfer;

use crate::{ExecutionError, MemoryBus, CPU};

/// Executes the instruction identified by `opcode`.
///
/// Opcodes whose low bits encode a register, a condition or an ALU operation are
/// classified by bit pattern first; everything else goes through the case table.
pub(crate) fn execute<M: MemoryBus>(cpu: &mut CPU<M>, opcode: u8) -> Result<(), ExecutionError> {
    // Register-number family: 0100 0rrr INC, 0100 1rrr DEC, 0101 0rrr PUSH,
    // 0101 1rrr POP, 1001 0rrr XCHG AX
    match opcode >> 3 {
        0b01000 => return inc_dec::execute_inc_reg16(cpu, opcode),
        0b01001 => return inc_dec::execute_dec_reg16(cpu, opcode),
        0b01010 => return stack::execute_push_reg16(cpu, opcode),
        0b01011 => return stack::execute_pop_reg16(cpu, opcode),
        0b10010 => return transfer::execute_xchg_ax(cpu, opcode),
        0b10110 => return transfer::execute_mov_reg8_imm(cpu, opcode),
        0b10111 => return transfer::execute_mov_reg16_imm(cpu, opcode),
        _ => {}
    }

    // Jcc short
    if opcode & 0xF0 == 0x70 {
        return control::execute_jcc(cpu, opcode);
    }

    // Group 1 with predefined operand shapes: 00ooo0dw, 00ooo10w
    if opcode < 0x40 && opcode & 0x07 < 6 {
        return alu::execute_alu(cpu, opcode);
    }

    match opcode {
        // Segment register stack operations
        0x06 | 0x0E | 0x16 | 0x1E => stack::execute_push_segment(cpu, opcode),
        0x07 | 0x0F | 0x17 | 0x1F => stack::execute_pop_segment(cpu, opcode),

        // Decimal adjust
        0x27 => bcd::execute_daa(cpu, opcode),
        0x2F => bcd::execute_das(cpu, opcode),
        0x37 => bcd::execute_aaa(cpu, opcode),
        0x3F => bcd::execute_aas(cpu, opcode),
        0xD4 => bcd::execute_aam(cpu, opcode),
        0xD5 => bcd::execute_aad(cpu, opcode),

        // Group 1 with immediate
        0x80..=0x83 => alu::execute_alu_immediate(cpu, opcode),
        0x84 | 0x85 | 0xA8 | 0xA9 => alu::execute_test(cpu, opcode),

        // Data transfer
        0x86 | 0x87 => transfer::execute_xchg(cpu, opcode),
        0x88..=0x8B => transfer::execute_mov(cpu, opcode),
        0x8C | 0x8E => transfer::execute_mov_segment(cpu, opcode),
        0x8D => transfer::execute_lea(cpu, opcode),
        0xA0..=0xA3 => transfer::execute_mov_offset(cpu, opcode),
        0xC4 | 0xC5 => transfer::execute_load_far_pointer(cpu, opcode),
        0xC6 | 0xC7 => transfer::execute_mov_immediate(cpu, opcode),
        0x98 => transfer::execute_cbw(cpu, opcode),
        0x99 => transfer::execute_cwd(cpu, opcode),
        0x9E => transfer::execute_sahf(cpu, opcode),
        0x9F => transfer::execute_lahf(cpu, opcode),
        0xD7 => transfer::execute_xlat(cpu, opcode),

        // Stack
        0x8F => stack::execute_pop_operand(cpu, opcode),
        0x9C => stack::execute_pushf(cpu, opcode),
        0x9D => stack::execute_popf(cpu, opcode),

        // String operations
        0xA4..=0xA7 | 0xAA..=0xAF => string::execute_string(cpu, opcode),

        // Control transfer
        0x9A => control::execute_call_far(cpu, opcode),
        0xC2 | 0xC3 => control::execute_ret(cpu, opcode),
        0xCA | 0xCB => control::execute_retf(cpu, opcode),
        0xE0..=0xE2 => control::execute_loop(cpu, opcode),
        0xE3 => control::execute_jcxz(cpu, opcode),
        0xE8 => control::execute_call(cpu, opcode),
        0xE9 | 0xEB => control::execute_jmp(cpu, opcode),
        0xEA => control::execute_jmp_far(cpu, opcode),
        0xF4 => control::execute_hlt(cpu, opcode),
        0xFF => control::execute_group5(cpu, opcode),

        // Interrupts
        0xCC..=0xCE => interrupts::execute_int(cpu, opcode),
        0xCF => interrupts::execute_iret(cpu, opcode),

        // Groups 2, 3 and 4
        0xD0..=0xD3 => shifts::execute_group2(cpu, opcode),
        0xF6 | 0xF7 => muldiv::execute_group3(cpu, opcode),
        0xFE => inc_dec::execute_group4(cpu, opcode),

        // Port I/O
        0xE4..=0xE7 | 0xEC..=0xEF => io::execute_io(cpu, opcode),

        // Flags
        0xF5 | 0xF8..=0xFD => flags::execute_flag_op(cpu, opcode),

        // WAIT: no coprocessor ever asserts BUSY
        0x9B => Ok(()),

        _ => Err(ExecutionError::IllegalOpcode(opcode)),
    }
}
