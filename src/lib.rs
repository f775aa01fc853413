//! # 8086 CPU Emulator Core
//!
//! An instruction-accurate Intel 8086 real-mode CPU emulator designed for
//! modularity, clarity, and WebAssembly portability.
//!
//! This crate provides the register file and status flags, a trait-based memory
//! bus over the 1 MiB physical space, a separate I/O port space, and the
//! fetch-decode-execute engine for the documented 8086 instruction set.
//!
//! ## Quick Start
//!
//! ```rust
//! use lib8086::{CPU, FlatMemory, Reg16, SegReg};
//!
//! let mut memory = FlatMemory::new();
//!
//! // MOV AX, 0x1234 ; HLT  at 0000:0100
//! memory.load(0x00100, &[0xB8, 0x34, 0x12, 0xF4]);
//!
//! let mut cpu = CPU::new(memory);
//! cpu.set_segment(SegReg::CS, 0x0000);
//! cpu.set_ip(0x0100);
//!
//! cpu.step().unwrap();
//! assert_eq!(cpu.reg16(Reg16::AX), 0x1234);
//! assert_eq!(cpu.ip(), 0x0103);
//!
//! cpu.step().unwrap();
//! assert!(cpu.is_halted());
//! ```
//!
//! ## Architecture
//!
//! - **Modularity**: CPU state is separated from memory via the `MemoryBus` trait
//!   and from I/O devices via the `PortDevice` trait
//! - **WebAssembly Portability**: No OS dependencies in the core, deterministic execution
//! - **Decode once**: ModRM operands are decoded into an [`addressing::Operand`]
//!   descriptor that serves both the read and the write of read-modify-write
//!   instructions, so displacement bytes are consumed exactly once
//! - **Fail stop**: malformed instruction streams halt the processor with an
//!   [`ExecutionError`] instead of corrupting state further
//!
//! ## Modules
//!
//! - `cpu` - CPU state, prefix handling and the execution step
//! - `registers` / `flags` - register file and FLAGS
//! - `memory` - MemoryBus trait and FlatMemory
//! - `devices` - region-mapped memory with permissions
//! - `ports` - I/O port space
//! - `addressing` - ModRM decoding and operand access
//! - `config` - machine descriptor loading
//! - `dump` - register and hex dumps

pub mod addressing;
pub mod bits;
pub mod config;
pub mod cpu;
pub mod devices;
pub mod dump;
pub mod flags;
pub mod memory;
pub mod ports;
pub mod registers;
pub mod wasm;

// Internal instruction implementations (not part of public API)
mod instructions;

use thiserror::Error;

// Re-export public API
pub use addressing::{ModRm, Operand};
pub use bits::Width;
pub use config::{ConfigError, MachineConfig};
pub use cpu::CPU;
pub use devices::{Device, DeviceError, MappedMemory, MemoryFault, Permission, RamDevice};
pub use dump::{hex_dump, RegisterDump};
pub use flags::Flags;
pub use memory::{physical_address, FlatMemory, MemoryBus};
pub use ports::{IoPorts, PortDevice, PortError};
pub use registers::{Reg16, Reg8, Registers, SegReg};

/// Errors that can occur during CPU execution.
///
/// Every variant except [`ExecutionError::Halted`] is fatal: the CPU marks
/// itself halted before returning it. Register and memory writes performed
/// earlier in the failing instruction are not rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    /// The primary opcode byte is not part of the 8086 instruction set.
    #[error("illegal opcode 0x{0:02X}")]
    IllegalOpcode(u8),

    /// The ModRM `reg` field selects an operation the opcode group does not define.
    #[error("illegal sub-opcode {sub} for opcode 0x{opcode:02X}")]
    IllegalSubOpcode {
        /// Group opcode byte
        opcode: u8,
        /// Value of the ModRM `reg` field
        sub: u8,
    },

    /// A register number outside the encodable range.
    #[error("invalid register number {0}")]
    InvalidRegister(u8),

    /// A ModRM descriptor carried a mode outside 0-3.
    #[error("invalid addressing mode {0}")]
    InvalidAddressingMode(u8),

    /// The instruction needs a memory operand but ModRM selected a register.
    #[error("opcode 0x{0:02X} requires a memory operand")]
    MemoryOperandRequired(u8),

    /// An IN or OUT addressed a port without a device.
    #[error(transparent)]
    Port(#[from] PortError),

    /// More prefix bytes than any instruction may carry.
    #[error("more than {0} prefix bytes before an opcode")]
    TooManyPrefixes(usize),

    /// DIV/IDIV/AAM with a zero divisor, or a quotient too wide for its destination.
    #[error("divide error")]
    DivideError,

    /// `step()` was called after the processor halted.
    #[error("processor is halted")]
    Halted,
}
