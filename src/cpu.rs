//! # CPU State and Execution
//!
//! This module contains the CPU struct representing the 8086 processor state and
//! the fetch-decode-execute step.
//!
//! ## CPU State
//!
//! The CPU maintains:
//! - **Registers**: AX, CX, DX, BX, SP, BP, SI, DI (with byte halves for the first four)
//! - **Segment registers**: ES, CS, SS, DS
//! - **Instruction pointer** (IP): offset of the next instruction within CS
//! - **Status flags**: CF, PF, AF, ZF, SF, TF, IF, DF, OF
//! - **Halted**: set by HLT or by a fatal execution error
//! - **Instruction counter**: number of instructions completed
//!
//! ## Execution Model
//!
//! - `step()`: consume the prefix chain, then execute one instruction
//! - `run()`: step until halted, an error, or an instruction limit
//!
//! The core has no timing model. A caller that needs a time budget limits the
//! number of instructions it asks for.

use crate::bits::{get_bits, Width};
use crate::dump::RegisterDump;
use crate::flags::Flags;
use crate::instructions;
use crate::memory::{physical_address, MemoryBus};
use crate::ports::{IoPorts, PortDevice};
use crate::registers::{Reg16, Reg8, Registers, SegReg};
use crate::ExecutionError;

/// Longest prefix chain accepted in front of one opcode.
pub const MAX_PREFIXES: usize = 15;

/// Repeat prefix attached to the current instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RepeatPrefix {
    /// REP / REPE / REPZ (0xF3): repeat while CX != 0 (and ZF set for CMPS/SCAS)
    WhileEqual,
    /// REPNE / REPNZ (0xF2): repeat while CX != 0 (and ZF clear for CMPS/SCAS)
    WhileNotEqual,
}

/// 8086 CPU state and execution context.
///
/// The CPU owns its memory bus and its I/O port space. It is generic over the
/// memory implementation via the `MemoryBus` trait.
///
/// # Examples
///
/// ```
/// use lib8086::{CPU, FlatMemory, Reg16, SegReg};
///
/// let mut cpu = CPU::new(FlatMemory::new());
///
/// // Power-on state: execution starts at FFFF:0000
/// assert_eq!(cpu.segment(SegReg::CS), 0xFFFF);
/// assert_eq!(cpu.ip(), 0x0000);
/// assert_eq!(cpu.reg16(Reg16::AX), 0x0000);
/// assert!(!cpu.is_halted());
/// ```
pub struct CPU<M: MemoryBus> {
    /// General-purpose, segment and instruction-pointer registers
    pub(crate) regs: Registers,

    /// Status flags
    pub(crate) flags: Flags,

    /// Memory bus implementation
    pub(crate) memory: M,

    /// I/O port space
    pub(crate) ports: IoPorts,

    /// Set by HLT or a fatal error
    pub(crate) halted: bool,

    /// Segment override prefix of the instruction being executed
    pub(crate) segment_override: Option<SegReg>,

    /// Repeat prefix of the instruction being executed
    pub(crate) repeat: Option<RepeatPrefix>,

    /// Total instructions completed
    pub(crate) instructions: u64,
}

impl<M: MemoryBus> CPU<M> {
    /// Creates a new CPU with the given memory bus.
    ///
    /// The CPU starts in the 8086 reset state: CS = 0xFFFF, IP = 0x0000, every
    /// other register and flag cleared, no port devices registered.
    pub fn new(memory: M) -> Self {
        let mut regs = Registers::default();
        regs.set_segment(SegReg::CS, 0xFFFF);

        Self {
            regs,
            flags: Flags::default(),
            memory,
            ports: IoPorts::new(),
            halted: false,
            segment_override: None,
            repeat: None,
            instructions: 0,
        }
    }

    /// Returns registers, flags and the halted state to power-on values.
    ///
    /// Memory, port devices and the instruction counter are kept.
    pub fn reset(&mut self) {
        self.regs = Registers::default();
        self.regs.set_segment(SegReg::CS, 0xFFFF);
        self.flags = Flags::default();
        self.halted = false;
        self.segment_override = None;
        self.repeat = None;
    }

    /// Executes one instruction and advances the CPU state.
    ///
    /// Consumes any prefix bytes, the opcode and its operands, then performs the
    /// instruction. On a decode, port or divide error the CPU halts, the error
    /// is logged with a register dump, and the error is returned.
    ///
    /// # Returns
    ///
    /// - `Ok(())` if the instruction completed (including HLT)
    /// - `Err(ExecutionError::Halted)` if the CPU was already halted
    /// - `Err(_)` for any fatal error raised by the instruction
    ///
    /// # Examples
    ///
    /// ```
    /// use lib8086::{CPU, ExecutionError, FlatMemory, SegReg};
    ///
    /// let mut mem = FlatMemory::new();
    /// mem.load(0x00000, &[0x5F, 0xD8]); // POP DI ; ESC (no coprocessor)
    ///
    /// let mut cpu = CPU::new(mem);
    /// cpu.set_segment(SegReg::CS, 0);
    ///
    /// cpu.step().unwrap();
    /// assert_eq!(cpu.step(), Err(ExecutionError::IllegalOpcode(0xD8)));
    /// assert!(cpu.is_halted());
    /// assert_eq!(cpu.step(), Err(ExecutionError::Halted));
    /// ```
    pub fn step(&mut self) -> Result<(), ExecutionError> {
        if self.halted {
            return Err(ExecutionError::Halted);
        }

        let cs = self.regs.segment(SegReg::CS);
        let ip = self.regs.ip();

        match self.execute_next() {
            Ok(()) => {
                self.instructions += 1;
                Ok(())
            }
            Err(err) => {
                self.halted = true;
                log::error!(
                    "{} at {:04X}:{:04X}, execution halted\n{}",
                    err,
                    cs,
                    ip,
                    self.register_dump()
                );
                Err(err)
            }
        }
    }

    /// Runs until the CPU halts or `max_instructions` have completed.
    ///
    /// Returns the number of instructions executed.
    ///
    /// # Examples
    ///
    /// ```
    /// use lib8086::{CPU, FlatMemory, SegReg};
    ///
    /// let mut mem = FlatMemory::new();
    /// mem.load(0x00000, &[0x90, 0x90, 0x90, 0xF4]); // NOP x3, HLT
    ///
    /// let mut cpu = CPU::new(mem);
    /// cpu.set_segment(SegReg::CS, 0);
    ///
    /// assert_eq!(cpu.run(100), Ok(4));
    /// assert!(cpu.is_halted());
    /// ```
    pub fn run(&mut self, max_instructions: u64) -> Result<u64, ExecutionError> {
        let start = self.instructions;

        while !self.halted && self.instructions - start < max_instructions {
            self.step()?;
        }

        Ok(self.instructions - start)
    }

    /// Consumes the prefix chain and dispatches the primary opcode.
    fn execute_next(&mut self) -> Result<(), ExecutionError> {
        self.segment_override = None;
        self.repeat = None;

        let mut opcode = self.fetch8();
        let mut prefixes = 0;
        loop {
            match opcode {
                // 001s s110: ES/CS/SS/DS segment override
                op if op & 0b1110_0111 == 0b0010_0110 => {
                    self.segment_override = Some(SegReg::try_from(get_bits(op, 3, 2))?);
                }
                0xF2 => self.repeat = Some(RepeatPrefix::WhileNotEqual),
                0xF3 => self.repeat = Some(RepeatPrefix::WhileEqual),
                // LOCK: accepted, no bus to lock
                0xF0 => {}
                _ => break,
            }
            log::trace!("prefix 0x{:02X}", opcode);
            prefixes += 1;
            if prefixes > MAX_PREFIXES {
                return Err(ExecutionError::TooManyPrefixes(MAX_PREFIXES));
            }
            opcode = self.fetch8();
        }

        log::trace!(
            "{:04X}:{:04X} opcode 0x{:02X}",
            self.regs.segment(SegReg::CS),
            self.regs.ip().wrapping_sub(1),
            opcode
        );

        instructions::execute(self, opcode)
    }

    // ========== Instruction Stream ==========

    /// Fetches the byte at CS:IP and advances IP.
    pub(crate) fn fetch8(&mut self) -> u8 {
        let value = self.read8(self.regs.segment(SegReg::CS), self.regs.ip());
        self.regs.set_ip(self.regs.ip().wrapping_add(1));
        value
    }

    /// Fetches the little-endian word at CS:IP and advances IP by two.
    pub(crate) fn fetch16(&mut self) -> u16 {
        let low = self.fetch8() as u16;
        let high = self.fetch8() as u16;
        (high << 8) | low
    }

    // ========== Segmented Memory Access ==========

    /// Segment register used for a data access, honoring any override prefix.
    pub(crate) fn data_segment(&self, default: SegReg) -> SegReg {
        self.segment_override.unwrap_or(default)
    }

    pub(crate) fn read8(&self, segment: u16, offset: u16) -> u8 {
        self.memory.read(physical_address(segment, offset))
    }

    pub(crate) fn read16(&self, segment: u16, offset: u16) -> u16 {
        self.memory.read_word(physical_address(segment, offset))
    }

    pub(crate) fn write8(&mut self, segment: u16, offset: u16, value: u8) {
        self.memory.write(physical_address(segment, offset), value);
    }

    pub(crate) fn write16(&mut self, segment: u16, offset: u16, value: u16) {
        self.memory
            .write_word(physical_address(segment, offset), value);
    }

    pub(crate) fn read_width(&self, width: Width, segment: u16, offset: u16) -> u16 {
        match width {
            Width::Byte => self.read8(segment, offset) as u16,
            Width::Word => self.read16(segment, offset),
        }
    }

    pub(crate) fn write_width(&mut self, width: Width, segment: u16, offset: u16, value: u16) {
        match width {
            Width::Byte => self.write8(segment, offset, value as u8),
            Width::Word => self.write16(segment, offset, value),
        }
    }

    // ========== Stack ==========

    /// Decrements SP by two and stores `value` at SS:SP.
    pub(crate) fn push(&mut self, value: u16) {
        let sp = self.regs.get(Reg16::SP).wrapping_sub(2);
        self.regs.set(Reg16::SP, sp);
        self.write16(self.regs.segment(SegReg::SS), sp, value);
    }

    /// Loads the word at SS:SP and increments SP by two.
    pub(crate) fn pop(&mut self) -> u16 {
        let sp = self.regs.get(Reg16::SP);
        let value = self.read16(self.regs.segment(SegReg::SS), sp);
        self.regs.set(Reg16::SP, sp.wrapping_add(2));
        value
    }

    // ========== Public Accessors ==========

    /// Returns true once HLT executed or a fatal error occurred.
    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Sets or clears the halted state, e.g. to resume after HLT.
    pub fn set_halted(&mut self, halted: bool) {
        self.halted = halted;
    }

    /// Number of instructions completed since the CPU was created.
    pub fn instructions(&self) -> u64 {
        self.instructions
    }

    /// Returns a 16-bit general-purpose register.
    pub fn reg16(&self, reg: Reg16) -> u16 {
        self.regs.get(reg)
    }

    /// Sets a 16-bit general-purpose register.
    pub fn set_reg16(&mut self, reg: Reg16, value: u16) {
        self.regs.set(reg, value);
    }

    /// Returns an 8-bit half register.
    pub fn reg8(&self, reg: Reg8) -> u8 {
        self.regs.get8(reg)
    }

    /// Sets an 8-bit half register.
    pub fn set_reg8(&mut self, reg: Reg8, value: u8) {
        self.regs.set8(reg, value);
    }

    /// Returns a segment register.
    pub fn segment(&self, reg: SegReg) -> u16 {
        self.regs.segment(reg)
    }

    /// Sets a segment register.
    pub fn set_segment(&mut self, reg: SegReg, value: u16) {
        self.regs.set_segment(reg, value);
    }

    /// Returns the instruction pointer.
    pub fn ip(&self) -> u16 {
        self.regs.ip()
    }

    /// Sets the instruction pointer.
    pub fn set_ip(&mut self, value: u16) {
        self.regs.set_ip(value);
    }

    /// Returns the register file.
    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    /// Returns the register file for modification.
    pub fn registers_mut(&mut self) -> &mut Registers {
        &mut self.regs
    }

    /// Returns the status flags.
    pub fn flags(&self) -> &Flags {
        &self.flags
    }

    /// Returns the status flags for modification.
    pub fn flags_mut(&mut self) -> &mut Flags {
        &mut self.flags
    }

    /// Returns the memory bus.
    pub fn memory(&self) -> &M {
        &self.memory
    }

    /// Returns the memory bus for modification.
    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }

    /// Returns the I/O port space.
    pub fn ports_mut(&mut self) -> &mut IoPorts {
        &mut self.ports
    }

    /// Registers a byte-wide I/O device on `port`.
    pub fn map_port8(&mut self, port: u16, device: impl PortDevice<u8> + 'static) {
        self.ports.map8(port, device);
    }

    /// Registers a word-wide I/O device on `port`.
    pub fn map_port16(&mut self, port: u16, device: impl PortDevice<u16> + 'static) {
        self.ports.map16(port, device);
    }

    /// Raises software interrupt `vector` as if `INT vector` had executed.
    ///
    /// Pushes FLAGS, CS and IP, clears IF, TF and AF, then loads CS:IP from
    /// the interrupt vector table at 0000:vector*4.
    pub fn interrupt(&mut self, vector: u8) {
        instructions::interrupts::raise(self, vector);
    }

    /// Copies `bytes` into memory at `segment:offset`.
    ///
    /// The offset wraps within the segment.
    pub fn load(&mut self, segment: u16, offset: u16, bytes: &[u8]) {
        for (i, &byte) in bytes.iter().enumerate() {
            self.write8(segment, offset.wrapping_add(i as u16), byte);
        }
    }

    /// Snapshot of the registers for display.
    pub fn register_dump(&self) -> RegisterDump {
        RegisterDump::new(&self.regs, &self.flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FlatMemory;

    fn setup_cpu(program: &[u8]) -> CPU<FlatMemory> {
        let mut cpu = CPU::new(FlatMemory::new());
        cpu.set_segment(SegReg::CS, 0x1000);
        cpu.set_ip(0x0000);
        cpu.load(0x1000, 0x0000, program);
        cpu
    }

    #[test]
    fn test_cpu_initialization() {
        let cpu = CPU::new(FlatMemory::new());

        assert_eq!(cpu.segment(SegReg::CS), 0xFFFF);
        assert_eq!(cpu.segment(SegReg::DS), 0x0000);
        assert_eq!(cpu.ip(), 0x0000);
        assert_eq!(cpu.flags().bits(), 0x0000);
        assert_eq!(cpu.instructions(), 0);
        assert!(!cpu.is_halted());
    }

    #[test]
    fn test_fetch_advances_ip() {
        let mut cpu = setup_cpu(&[0x34, 0x12, 0x78]);

        assert_eq!(cpu.fetch16(), 0x1234);
        assert_eq!(cpu.ip(), 0x0002);
        assert_eq!(cpu.fetch8(), 0x78);
        assert_eq!(cpu.ip(), 0x0003);
    }

    #[test]
    fn test_push_pop() {
        let mut cpu = setup_cpu(&[]);
        cpu.set_segment(SegReg::SS, 0x2000);
        cpu.set_reg16(Reg16::SP, 0x0100);

        cpu.push(0xBEEF);
        assert_eq!(cpu.reg16(Reg16::SP), 0x00FE);
        assert_eq!(cpu.read16(0x2000, 0x00FE), 0xBEEF);

        assert_eq!(cpu.pop(), 0xBEEF);
        assert_eq!(cpu.reg16(Reg16::SP), 0x0100);
    }

    #[test]
    fn test_prefix_chain_is_consumed() {
        // ES: LOCK REP NOP
        let mut cpu = setup_cpu(&[0x26, 0xF0, 0xF3, 0x90]);
        cpu.step().unwrap();

        assert_eq!(cpu.ip(), 0x0004);
        assert_eq!(cpu.segment_override, Some(SegReg::ES));
        assert_eq!(cpu.repeat, Some(RepeatPrefix::WhileEqual));
    }

    #[test]
    fn test_prefix_flood_is_rejected() {
        // A segment full of ES: overrides never reaches an opcode
        let mut cpu = setup_cpu(&[0x26; 64]);

        assert_eq!(
            cpu.step(),
            Err(ExecutionError::TooManyPrefixes(MAX_PREFIXES))
        );
        assert!(cpu.is_halted());
        assert_eq!(cpu.ip() as usize, MAX_PREFIXES + 1);
    }

    #[test]
    fn test_longest_prefix_chain_executes() {
        let mut program = vec![0x2E; MAX_PREFIXES];
        program.push(0x90);
        let mut cpu = setup_cpu(&program);

        cpu.step().unwrap();

        assert_eq!(cpu.ip() as usize, MAX_PREFIXES + 1);
        assert_eq!(cpu.segment_override, Some(SegReg::CS));
    }

    #[test]
    fn test_prefixes_reset_between_instructions() {
        let mut cpu = setup_cpu(&[0x2E, 0x90, 0x90]);
        cpu.step().unwrap();
        cpu.step().unwrap();
        assert_eq!(cpu.segment_override, None);
    }

    #[test]
    fn test_reset_keeps_memory() {
        let mut cpu = setup_cpu(&[0xF4]);
        cpu.set_reg16(Reg16::AX, 0x1234);
        cpu.step().unwrap();
        assert!(cpu.is_halted());

        cpu.reset();
        assert!(!cpu.is_halted());
        assert_eq!(cpu.reg16(Reg16::AX), 0);
        assert_eq!(cpu.segment(SegReg::CS), 0xFFFF);
        assert_eq!(cpu.read8(0x1000, 0x0000), 0xF4);
    }

    #[test]
    fn test_run_stops_at_limit() {
        let mut cpu = setup_cpu(&[0x90; 16]);
        assert_eq!(cpu.run(5), Ok(5));
        assert_eq!(cpu.ip(), 5);
        assert!(!cpu.is_halted());
    }
}
