//! WASM API for the 8086 emulator.
//!
//! Provides JavaScript-callable interfaces for CPU control, state inspection
//! and memory access. Bytes written to the debug console port 0xE9 are handed
//! to a JavaScript callback as one-character strings.

use wasm_bindgen::prelude::*;

use crate::{hex_dump, FlatMemory, MemoryBus, Reg16, SegReg, CPU};

/// Debug console port: OUT 0xE9, AL prints AL.
pub const DEBUG_CONSOLE_PORT: u16 = 0xE9;

/// JavaScript-compatible error wrapper
#[wasm_bindgen]
#[derive(Debug, Clone)]
pub struct JsError {
    message: String,
}

#[wasm_bindgen]
impl JsError {
    #[wasm_bindgen(constructor)]
    pub fn new(message: &str) -> JsError {
        JsError {
            message: message.to_string(),
        }
    }

    #[wasm_bindgen(getter)]
    pub fn message(&self) -> String {
        self.message.clone()
    }
}

impl From<crate::ExecutionError> for JsError {
    fn from(err: crate::ExecutionError) -> Self {
        JsError::new(&err.to_string())
    }
}

/// Main emulator interface for JavaScript
#[wasm_bindgen]
pub struct Emulator8086 {
    cpu: CPU<FlatMemory>,
}

#[wasm_bindgen]
impl Emulator8086 {
    /// Create an emulator with 1 MiB of RAM and a debug console on port 0xE9
    #[wasm_bindgen(constructor)]
    pub fn new(on_output: js_sys::Function) -> Self {
        let mut cpu = CPU::new(FlatMemory::new());

        cpu.map_port8(DEBUG_CONSOLE_PORT, move |value: u8, write: bool| {
            if write {
                let text = char::from(value).to_string();
                let _ = on_output.call1(&JsValue::NULL, &JsValue::from_str(&text));
            }
            value
        });

        Emulator8086 { cpu }
    }

    /// Execute a single instruction
    pub fn step(&mut self) -> Result<(), JsError> {
        Ok(self.cpu.step()?)
    }

    /// Execute up to `max_instructions` and return how many ran
    pub fn run(&mut self, max_instructions: u32) -> Result<u32, JsError> {
        Ok(self.cpu.run(max_instructions as u64)? as u32)
    }

    /// Return registers and flags to the reset state; memory is kept
    pub fn reset(&mut self) {
        self.cpu.reset();
    }

    /// Copy a program to `segment:offset` and point CS:IP at it
    pub fn load_program(&mut self, program: &[u8], segment: u16, offset: u16) {
        self.cpu.load(segment, offset, program);
        self.cpu.set_segment(SegReg::CS, segment);
        self.cpu.set_ip(offset);
        self.cpu.set_halted(false);
    }

    // Register getters
    #[wasm_bindgen(getter)]
    pub fn ax(&self) -> u16 {
        self.cpu.reg16(Reg16::AX)
    }

    #[wasm_bindgen(getter)]
    pub fn bx(&self) -> u16 {
        self.cpu.reg16(Reg16::BX)
    }

    #[wasm_bindgen(getter)]
    pub fn cx(&self) -> u16 {
        self.cpu.reg16(Reg16::CX)
    }

    #[wasm_bindgen(getter)]
    pub fn dx(&self) -> u16 {
        self.cpu.reg16(Reg16::DX)
    }

    #[wasm_bindgen(getter)]
    pub fn sp(&self) -> u16 {
        self.cpu.reg16(Reg16::SP)
    }

    #[wasm_bindgen(getter)]
    pub fn bp(&self) -> u16 {
        self.cpu.reg16(Reg16::BP)
    }

    #[wasm_bindgen(getter)]
    pub fn si(&self) -> u16 {
        self.cpu.reg16(Reg16::SI)
    }

    #[wasm_bindgen(getter)]
    pub fn di(&self) -> u16 {
        self.cpu.reg16(Reg16::DI)
    }

    #[wasm_bindgen(getter)]
    pub fn cs(&self) -> u16 {
        self.cpu.segment(SegReg::CS)
    }

    #[wasm_bindgen(getter)]
    pub fn ds(&self) -> u16 {
        self.cpu.segment(SegReg::DS)
    }

    #[wasm_bindgen(getter)]
    pub fn es(&self) -> u16 {
        self.cpu.segment(SegReg::ES)
    }

    #[wasm_bindgen(getter)]
    pub fn ss(&self) -> u16 {
        self.cpu.segment(SegReg::SS)
    }

    #[wasm_bindgen(getter)]
    pub fn ip(&self) -> u16 {
        self.cpu.ip()
    }

    #[wasm_bindgen(getter)]
    pub fn flags(&self) -> u16 {
        self.cpu.flags().bits()
    }

    #[wasm_bindgen(getter)]
    pub fn halted(&self) -> bool {
        self.cpu.is_halted()
    }

    #[wasm_bindgen(getter)]
    pub fn instructions(&self) -> f64 {
        self.cpu.instructions() as f64 // Convert u64 to f64 for JavaScript
    }

    // Memory access methods

    /// Read a byte at a physical address
    pub fn read_memory(&self, addr: u32) -> u8 {
        self.cpu.memory().read(addr)
    }

    /// Write a byte at a physical address
    pub fn write_memory(&mut self, addr: u32, value: u8) {
        self.cpu.memory_mut().write(addr, value);
    }

    /// Read `len` bytes starting at a physical address (for efficient display)
    pub fn read_memory_range(&self, addr: u32, len: u32) -> Vec<u8> {
        (0..len)
            .map(|i| self.cpu.memory().read(addr.wrapping_add(i)))
            .collect()
    }

    /// Register block in the same layout as the command-line front end
    pub fn register_dump(&self) -> String {
        self.cpu.register_dump().to_string()
    }

    /// Hex dump of `count` bytes at `segment:offset`
    pub fn hex_dump(&self, segment: u16, offset: u16, count: u32) -> String {
        hex_dump(self.cpu.memory(), segment, offset, count as usize)
    }
}
