//! # I/O Port Space
//!
//! The 8086 has a 64K I/O space separate from memory, reached only through
//! IN and OUT. Byte and word transfers are routed through two independent
//! tables so a device can answer 8-bit and 16-bit accesses differently.
//!
//! Devices are registered per exact port number. Addressing a port that has
//! no handler is a fatal [`PortError`].

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// A device answering accesses to a single I/O port.
///
/// `access` receives the value being written (or zero for a read) and a
/// write flag, and returns the value read (or echoes the written value).
///
/// Any `FnMut(T, bool) -> T` closure is a port device:
///
/// ```
/// use lib8086::ports::IoPorts;
///
/// let mut ports = IoPorts::new();
/// let mut latch = 0u8;
/// ports.map8(0x60, move |value: u8, write: bool| {
///     if write {
///         latch = value;
///     }
///     latch
/// });
///
/// ports.write8(0x60, 0x5A).unwrap();
/// assert_eq!(ports.read8(0x60).unwrap(), 0x5A);
/// assert!(ports.read8(0x61).is_err());
/// ```
pub trait PortDevice<T> {
    /// Performs a read (`write == false`) or write (`write == true`).
    fn access(&mut self, value: T, write: bool) -> T;
}

impl<T, F> PortDevice<T> for F
where
    F: FnMut(T, bool) -> T,
{
    fn access(&mut self, value: T, write: bool) -> T {
        self(value, write)
    }
}

/// Transfer size of a port access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortWidth {
    /// IN AL / OUT AL
    Byte,
    /// IN AX / OUT AX
    Word,
}

impl fmt::Display for PortWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortWidth::Byte => write!(f, "8-bit"),
            PortWidth::Word => write!(f, "16-bit"),
        }
    }
}

/// Errors raised by the port space.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    /// No device is registered for the port.
    #[error("unknown {width} port 0x{port:04X}")]
    Unmapped {
        /// Port number
        port: u16,
        /// Transfer size that was attempted
        width: PortWidth,
    },
}

/// Byte and word port tables.
#[derive(Default)]
pub struct IoPorts {
    ports8: HashMap<u16, Box<dyn PortDevice<u8>>>,
    ports16: HashMap<u16, Box<dyn PortDevice<u16>>>,
}

impl IoPorts {
    /// Creates an empty port space.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a byte-wide device, replacing any previous one on the port.
    pub fn map8(&mut self, port: u16, device: impl PortDevice<u8> + 'static) {
        self.ports8.insert(port, Box::new(device));
    }

    /// Registers a word-wide device, replacing any previous one on the port.
    pub fn map16(&mut self, port: u16, device: impl PortDevice<u16> + 'static) {
        self.ports16.insert(port, Box::new(device));
    }

    /// Reads a byte from a port.
    pub fn read8(&mut self, port: u16) -> Result<u8, PortError> {
        let device = self.ports8.get_mut(&port).ok_or(PortError::Unmapped {
            port,
            width: PortWidth::Byte,
        })?;
        let value = device.access(0, false);
        log::debug!("IN  port 0x{:04X} -> 0x{:02X}", port, value);
        Ok(value)
    }

    /// Writes a byte to a port.
    pub fn write8(&mut self, port: u16, value: u8) -> Result<u8, PortError> {
        let device = self.ports8.get_mut(&port).ok_or(PortError::Unmapped {
            port,
            width: PortWidth::Byte,
        })?;
        log::debug!("OUT port 0x{:04X} <- 0x{:02X}", port, value);
        Ok(device.access(value, true))
    }

    /// Reads a word from a port.
    pub fn read16(&mut self, port: u16) -> Result<u16, PortError> {
        let device = self.ports16.get_mut(&port).ok_or(PortError::Unmapped {
            port,
            width: PortWidth::Word,
        })?;
        let value = device.access(0, false);
        log::debug!("IN  port 0x{:04X} -> 0x{:04X}", port, value);
        Ok(value)
    }

    /// Writes a word to a port.
    pub fn write16(&mut self, port: u16, value: u16) -> Result<u16, PortError> {
        let device = self.ports16.get_mut(&port).ok_or(PortError::Unmapped {
            port,
            width: PortWidth::Word,
        })?;
        log::debug!("OUT port 0x{:04X} <- 0x{:04X}", port, value);
        Ok(device.access(value, true))
    }
}
