//! Region-mapped memory for the 8086 emulator.
//!
//! This module provides a memory mapping architecture where the 1 MiB physical
//! space is assembled from independent regions, each backed by a device and
//! carrying its own access permission.
//!
//! # Architecture
//!
//! - **Device trait**: Abstract interface for memory-mapped storage
//! - **MappedMemory**: Routes read/write operations to registered regions by address
//! - **Permission**: Read-only regions drop writes and record an access violation
//!
//! Reads from addresses outside every region return 0x00, writes there are
//! dropped. Both are logged at `warn` level.
//!
//! # Example
//!
//! ```rust
//! use lib8086::{CPU, MappedMemory, MemoryBus, Permission, RamDevice};
//!
//! let mut memory = MappedMemory::new();
//!
//! // 640 KiB of conventional memory
//! memory
//!     .add_device(0x00000, Box::new(RamDevice::new(0xA0000)), Permission::ReadWrite)
//!     .unwrap();
//!
//! // 64 KiB BIOS ROM at the top of the address space: HLT at the reset vector
//! let mut bios = RamDevice::new(0x10000);
//! bios.load_bytes(0xFFF0, &[0xF4]);
//! memory
//!     .add_device(0xF0000, Box::new(bios), Permission::ReadOnly)
//!     .unwrap();
//!
//! let mut cpu = CPU::new(memory);
//! cpu.step().unwrap();
//! assert!(cpu.is_halted());
//! ```

use thiserror::Error;

use crate::memory::{ADDRESS_MASK, ADDRESS_SPACE};
use crate::MemoryBus;

pub mod ram;

pub use ram::RamDevice;

/// Abstract interface for memory-mapped hardware devices.
///
/// The memory mapper calls these methods with offset-based addressing
/// (0 to size-1), so a device does not know where it is mapped.
///
/// # Examples
///
/// ```rust
/// use lib8086::Device;
///
/// struct VideoRam {
///     cells: Vec<u8>,
/// }
///
/// impl Device for VideoRam {
///     fn read(&self, offset: u32) -> u8 {
///         self.cells[offset as usize]
///     }
///
///     fn write(&mut self, offset: u32, value: u8) {
///         self.cells[offset as usize] = value;
///     }
///
///     fn size(&self) -> u32 {
///         self.cells.len() as u32
///     }
/// }
/// ```
pub trait Device {
    /// Reads the byte at `offset` (0 to size-1).
    fn read(&self, offset: u32) -> u8;

    /// Writes the byte at `offset` (0 to size-1).
    fn write(&mut self, offset: u32, value: u8);

    /// Number of bytes the device occupies.
    fn size(&self) -> u32;
}

/// Access permission of a mapped region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Writes are dropped and recorded as a [`MemoryFault`]
    ReadOnly,
    /// Reads and writes reach the device
    ReadWrite,
}

/// A memory access the mapper refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MemoryFault {
    /// Write to a read-only region.
    #[error("access violation at physical address 0x{0:05X}")]
    AccessViolation(u32),
}

/// Error returned when region registration fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// Address range overlaps with an existing region.
    #[error(
        "region 0x{new_base:05X}-0x{new_end:05X} overlaps existing region 0x{existing_base:05X}-0x{existing_end:05X}"
    )]
    Overlap {
        /// First address of the new region
        new_base: u32,
        /// Last address of the new region
        new_end: u32,
        /// First address of the conflicting region
        existing_base: u32,
        /// Last address of the conflicting region
        existing_end: u32,
    },

    /// Region extends past the top of the 1 MiB address space, or is empty.
    #[error("region at 0x{base:05X} with size 0x{size:X} does not fit the address space")]
    OutOfRange {
        /// First address of the region
        base: u32,
        /// Size of the region in bytes
        size: u32,
    },
}

struct Region {
    base: u32,
    permission: Permission,
    device: Box<dyn Device>,
}

impl Region {
    fn end(&self) -> u32 {
        self.base + self.device.size() - 1
    }

    fn contains(&self, addr: u32) -> bool {
        addr >= self.base && addr <= self.end()
    }
}

/// Memory mapper that routes read/write operations to registered regions.
///
/// # Examples
///
/// ```rust
/// use lib8086::{MappedMemory, MemoryBus, MemoryFault, Permission, RamDevice};
///
/// let mut memory = MappedMemory::new();
/// memory
///     .add_device(0x10000, Box::new(RamDevice::new(0x100)), Permission::ReadOnly)
///     .unwrap();
///
/// memory.write(0x10010, 0x42);
/// assert_eq!(memory.read(0x10010), 0x00);
/// assert_eq!(memory.take_fault(), Some(MemoryFault::AccessViolation(0x10010)));
/// assert_eq!(memory.take_fault(), None);
/// ```
#[derive(Default)]
pub struct MappedMemory {
    regions: Vec<Region>,
    fault: Option<MemoryFault>,
}

impl std::fmt::Debug for MappedMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MappedMemory")
            .field("region_count", &self.regions.len())
            .field("fault", &self.fault)
            .finish_non_exhaustive()
    }
}

impl MappedMemory {
    /// Creates an empty memory map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a device at physical address `base` with the given permission.
    ///
    /// The device occupies `base` to `base + device.size() - 1`.
    ///
    /// # Errors
    ///
    /// - [`DeviceError::OutOfRange`] if the device is empty or does not fit below 1 MiB
    /// - [`DeviceError::Overlap`] if any address is already mapped
    ///
    /// # Examples
    ///
    /// ```rust
    /// use lib8086::{MappedMemory, Permission, RamDevice};
    ///
    /// let mut memory = MappedMemory::new();
    /// memory
    ///     .add_device(0x00000, Box::new(RamDevice::new(0x4000)), Permission::ReadWrite)
    ///     .unwrap();
    ///
    /// let result = memory.add_device(0x03000, Box::new(RamDevice::new(0x2000)), Permission::ReadWrite);
    /// assert!(result.is_err());
    /// ```
    pub fn add_device(
        &mut self,
        base: u32,
        device: Box<dyn Device>,
        permission: Permission,
    ) -> Result<(), DeviceError> {
        let size = device.size();
        if size == 0 || base as u64 + size as u64 > ADDRESS_SPACE as u64 {
            return Err(DeviceError::OutOfRange { base, size });
        }

        let region = Region {
            base,
            permission,
            device,
        };

        if let Some(existing) = self
            .regions
            .iter()
            .find(|r| region.base <= r.end() && r.base <= region.end())
        {
            return Err(DeviceError::Overlap {
                new_base: region.base,
                new_end: region.end(),
                existing_base: existing.base,
                existing_end: existing.end(),
            });
        }

        log::debug!(
            "mapped 0x{:05X}-0x{:05X} {:?}",
            region.base,
            region.end(),
            region.permission
        );
        self.regions.push(region);
        Ok(())
    }

    /// Returns and clears the most recent refused access.
    pub fn take_fault(&mut self) -> Option<MemoryFault> {
        self.fault.take()
    }

    fn region(&self, addr: u32) -> Option<&Region> {
        self.regions.iter().find(|r| r.contains(addr))
    }

    fn region_mut(&mut self, addr: u32) -> Option<&mut Region> {
        self.regions.iter_mut().find(|r| r.contains(addr))
    }
}

impl MemoryBus for MappedMemory {
    fn read(&self, addr: u32) -> u8 {
        let addr = addr & ADDRESS_MASK;
        match self.region(addr) {
            Some(region) => region.device.read(addr - region.base),
            None => {
                log::warn!("read from unmapped physical address 0x{:05X}", addr);
                0x00
            }
        }
    }

    fn write(&mut self, addr: u32, value: u8) {
        let addr = addr & ADDRESS_MASK;
        match self.region_mut(addr) {
            Some(region) if region.permission == Permission::ReadWrite => {
                region.device.write(addr - region.base, value);
            }
            Some(_) => {
                log::warn!("write to read-only physical address 0x{:05X}", addr);
                self.fault = Some(MemoryFault::AccessViolation(addr));
            }
            None => {
                log::warn!("write to unmapped physical address 0x{:05X}", addr);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ram(size: u32) -> Box<dyn Device> {
        Box::new(RamDevice::new(size))
    }

    #[test]
    fn test_mapped_memory_empty() {
        let mut memory = MappedMemory::new();
        assert_eq!(memory.read(0x00000), 0x00);
        memory.write(0x00000, 0x42);
        assert_eq!(memory.read(0x00000), 0x00);
        assert_eq!(memory.take_fault(), None);
    }

    #[test]
    fn test_offsets_are_region_relative() {
        let mut memory = MappedMemory::new();
        memory
            .add_device(0x20000, ram(0x10), Permission::ReadWrite)
            .unwrap();

        memory.write(0x2000F, 0xAB);
        assert_eq!(memory.read(0x2000F), 0xAB);
        assert_eq!(memory.read(0x20010), 0x00);
    }

    #[test]
    fn test_multiple_regions() {
        let mut memory = MappedMemory::new();
        memory
            .add_device(0x00000, ram(0x1000), Permission::ReadWrite)
            .unwrap();
        memory
            .add_device(0x01000, ram(0x1000), Permission::ReadWrite)
            .unwrap();

        memory.write(0x00FFF, 0x11);
        memory.write(0x01000, 0x22);
        assert_eq!(memory.read_word(0x00FFF), 0x2211);
    }

    #[test]
    fn test_overlap_detection() {
        let mut memory = MappedMemory::new();
        memory
            .add_device(0x10000, ram(0x1000), Permission::ReadWrite)
            .unwrap();

        let err = memory
            .add_device(0x10FFF, ram(0x10), Permission::ReadOnly)
            .unwrap_err();
        assert_eq!(
            err,
            DeviceError::Overlap {
                new_base: 0x10FFF,
                new_end: 0x1100E,
                existing_base: 0x10000,
                existing_end: 0x10FFF,
            }
        );
    }

    #[test]
    fn test_region_must_fit_address_space() {
        let mut memory = MappedMemory::new();
        assert_eq!(
            memory.add_device(0xFFFF0, ram(0x20), Permission::ReadWrite),
            Err(DeviceError::OutOfRange {
                base: 0xFFFF0,
                size: 0x20
            })
        );
        assert!(memory
            .add_device(0xFFFF0, ram(0x10), Permission::ReadWrite)
            .is_ok());
    }

    #[test]
    fn test_read_only_write_records_fault() {
        let mut memory = MappedMemory::new();
        memory
            .add_device(0xF0000, ram(0x10000), Permission::ReadOnly)
            .unwrap();

        memory.write(0xFFFF0, 0xEA);
        assert_eq!(memory.read(0xFFFF0), 0x00);
        assert_eq!(
            memory.take_fault(),
            Some(MemoryFault::AccessViolation(0xFFFF0))
        );
    }
}
