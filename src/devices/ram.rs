//! RAM device implementation.
//!
//! Byte storage for a mapped region. Whether the CPU may write to it is decided
//! by the region's [`Permission`](super::Permission), not by the device, so the
//! same type backs both RAM and ROM images.

use super::Device;

/// Simple byte-array device.
///
/// # Examples
///
/// ```rust
/// use lib8086::{Device, RamDevice};
///
/// let mut ram = RamDevice::new(1024);
///
/// ram.write(0x42, 0xAA);
/// assert_eq!(ram.read(0x42), 0xAA);
/// assert_eq!(ram.size(), 1024);
/// ```
pub struct RamDevice {
    data: Vec<u8>,
}

impl RamDevice {
    /// Creates a zero-filled device of `size` bytes.
    pub fn new(size: u32) -> Self {
        Self {
            data: vec![0; size as usize],
        }
    }

    /// Creates a device holding `bytes`, zero-padded to `size` bytes.
    ///
    /// Bytes past `size` are discarded.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use lib8086::{Device, RamDevice};
    ///
    /// let rom = RamDevice::with_contents(4, &[0xCD, 0x21]);
    /// assert_eq!(rom.read(1), 0x21);
    /// assert_eq!(rom.read(3), 0x00);
    /// ```
    pub fn with_contents(size: u32, bytes: &[u8]) -> Self {
        let mut device = Self::new(size);
        device.load_bytes(0, bytes);
        device
    }

    /// Copies `bytes` into the device starting at `offset`.
    ///
    /// Bytes that would land past the end of the device are discarded.
    pub fn load_bytes(&mut self, offset: u32, bytes: &[u8]) {
        let start = (offset as usize).min(self.data.len());
        let end = (start + bytes.len()).min(self.data.len());
        self.data[start..end].copy_from_slice(&bytes[..end - start]);
    }
}

impl Device for RamDevice {
    fn read(&self, offset: u32) -> u8 {
        self.data.get(offset as usize).copied().unwrap_or(0)
    }

    fn write(&mut self, offset: u32, value: u8) {
        if let Some(byte) = self.data.get_mut(offset as usize) {
            *byte = value;
        }
    }

    fn size(&self) -> u32 {
        self.data.len() as u32
    }
}
