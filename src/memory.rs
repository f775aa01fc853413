//! # Memory Bus Abstraction
//!
//! This module provides the `MemoryBus` trait that decouples the CPU from specific
//! memory implementations. The 8086 addresses a 1 MiB physical space; the CPU
//! converts every segment:offset pair to a 20-bit physical address before it
//! reaches the bus.
//!
//! ## Design Principles
//!
//! - No bus errors: reads/writes always succeed from the CPU's point of view
//! - Permission checks, region mapping and synthetic devices belong to the
//!   implementation (see [`crate::devices::MappedMemory`])
//! - Words are two byte accesses, low byte first

/// Size of the physical address space (1 MiB).
pub const ADDRESS_SPACE: usize = 0x10_0000;

/// Mask applied to every physical address (20 bits).
pub const ADDRESS_MASK: u32 = 0xF_FFFF;

/// Converts a segment:offset pair to a 20-bit physical address.
///
/// Addresses past the top of the 1 MiB space wrap around to the bottom, as on
/// the original part.
///
/// # Examples
///
/// ```
/// use lib8086::memory::physical_address;
///
/// assert_eq!(physical_address(0x1234, 0x0010), 0x12350);
/// assert_eq!(physical_address(0xFFFF, 0x0010), 0x00000);
/// ```
pub fn physical_address(segment: u16, offset: u16) -> u32 {
    (((segment as u32) << 4) + offset as u32) & ADDRESS_MASK
}

/// Memory bus trait for CPU to read/write bytes.
///
/// # Examples
///
/// ```
/// use lib8086::{MemoryBus, FlatMemory};
///
/// let mut mem = FlatMemory::new();
/// mem.write(0x12345, 0x42);
/// assert_eq!(mem.read(0x12345), 0x42);
///
/// mem.write_word(0x00100, 0xBEEF);
/// assert_eq!(mem.read(0x00100), 0xEF);
/// assert_eq!(mem.read(0x00101), 0xBE);
/// ```
///
/// ## Implementing Custom Memory
///
/// ```
/// use lib8086::MemoryBus;
///
/// struct RomBios {
///     ram: Vec<u8>,
///     rom: Vec<u8>, // mapped at 0xF0000-0xFFFFF
/// }
///
/// impl MemoryBus for RomBios {
///     fn read(&self, addr: u32) -> u8 {
///         if addr >= 0xF0000 {
///             self.rom[(addr - 0xF0000) as usize]
///         } else {
///             self.ram.get(addr as usize).copied().unwrap_or(0)
///         }
///     }
///
///     fn write(&mut self, addr: u32, value: u8) {
///         if let Some(byte) = self.ram.get_mut(addr as usize) {
///             *byte = value;
///         }
///     }
/// }
/// ```
pub trait MemoryBus {
    /// Reads a byte from a 20-bit physical address.
    ///
    /// This method must never panic. Unmapped addresses may return any value.
    fn read(&self, addr: u32) -> u8;

    /// Writes a byte to a 20-bit physical address.
    ///
    /// This method must never panic. Implementations may ignore writes to
    /// read-only or unmapped locations.
    fn write(&mut self, addr: u32, value: u8);

    /// Reads a little-endian word at `addr` and `addr + 1`.
    fn read_word(&self, addr: u32) -> u16 {
        let low = self.read(addr & ADDRESS_MASK) as u16;
        let high = self.read(addr.wrapping_add(1) & ADDRESS_MASK) as u16;
        (high << 8) | low
    }

    /// Writes a little-endian word at `addr` and `addr + 1`.
    fn write_word(&mut self, addr: u32, value: u16) {
        self.write(addr & ADDRESS_MASK, value as u8);
        self.write(addr.wrapping_add(1) & ADDRESS_MASK, (value >> 8) as u8);
    }
}

/// Simple 1 MiB flat memory implementation.
///
/// Every physical address (0x00000-0xFFFFF) is writable RAM initialized to 0x00.
///
/// # Examples
///
/// ```
/// use lib8086::{CPU, FlatMemory, MemoryBus};
///
/// let mut memory = FlatMemory::new();
/// memory.load(0xFFFF0, &[0xF4]); // HLT at the reset address
///
/// let mut cpu = CPU::new(memory);
/// cpu.step().unwrap();
/// assert!(cpu.is_halted());
/// ```
pub struct FlatMemory {
    data: Box<[u8]>,
}

impl FlatMemory {
    /// Creates a new FlatMemory instance with all bytes initialized to zero.
    pub fn new() -> Self {
        Self {
            data: vec![0; ADDRESS_SPACE].into_boxed_slice(),
        }
    }

    /// Copies `bytes` into memory starting at physical address `addr`.
    ///
    /// Bytes past the top of the address space wrap around to 0x00000.
    pub fn load(&mut self, addr: u32, bytes: &[u8]) {
        for (i, &byte) in bytes.iter().enumerate() {
            self.write(addr.wrapping_add(i as u32), byte);
        }
    }
}

impl Default for FlatMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBus for FlatMemory {
    fn read(&self, addr: u32) -> u8 {
        self.data[(addr & ADDRESS_MASK) as usize]
    }

    fn write(&mut self, addr: u32, value: u8) {
        self.data[(addr & ADDRESS_MASK) as usize] = value;
    }
}
