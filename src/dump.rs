//! # Diagnostic Dumps
//!
//! Text renderings of processor state used by the front ends and by the error
//! log when a fault halts the CPU.
//!
//! ```text
//! AX=1234; BX=0000
//! CX=0000; DX=0000
//! CS=f000; DS=0000
//! ES=0000; IP=0103
//! SP=fffe; BP=0000
//! SI=0000; DI=0000
//! SS=0000; FL=0046
//! ```

use std::fmt::{self, Write};

use crate::flags::Flags;
use crate::memory::{physical_address, MemoryBus};
use crate::registers::{Reg16, Registers, SegReg};

/// Bytes shown per hex dump line.
pub const BYTES_PER_LINE: usize = 16;

/// Snapshot of the register file and FLAGS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterDump {
    regs: Registers,
    flags: u16,
}

impl RegisterDump {
    /// Captures the given registers and flags.
    pub fn new(regs: &Registers, flags: &Flags) -> Self {
        Self {
            regs: *regs,
            flags: flags.bits(),
        }
    }
}

impl fmt::Display for RegisterDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = &self.regs;
        let pairs = [
            (("AX", r.get(Reg16::AX)), ("BX", r.get(Reg16::BX))),
            (("CX", r.get(Reg16::CX)), ("DX", r.get(Reg16::DX))),
            (("CS", r.segment(SegReg::CS)), ("DS", r.segment(SegReg::DS))),
            (("ES", r.segment(SegReg::ES)), ("IP", r.ip())),
            (("SP", r.get(Reg16::SP)), ("BP", r.get(Reg16::BP))),
            (("SI", r.get(Reg16::SI)), ("DI", r.get(Reg16::DI))),
            (("SS", r.segment(SegReg::SS)), ("FL", self.flags)),
        ];

        for (i, ((left, a), (right, b))) in pairs.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}={:04x}; {}={:04x}", left, a, right, b)?;
        }
        Ok(())
    }
}

/// Renders `count` bytes starting at `segment:offset` as a hex dump.
///
/// Each line holds 16 bytes prefixed with their `SSSS:OOOO` address and
/// followed by an ASCII gutter in which non-printable bytes show as `.`. The
/// offset wraps within the segment.
///
/// # Examples
///
/// ```
/// use lib8086::{hex_dump, FlatMemory};
///
/// let mut memory = FlatMemory::new();
/// memory.load(0x00100, b"Hello, 8086!\r\n\0\0");
///
/// let dump = hex_dump(&memory, 0x0000, 0x0100, 16);
/// let line = dump.lines().nth(1).unwrap();
/// assert!(line.starts_with("0000:0100 | 48 65 6C 6C 6F"));
/// assert!(line.ends_with("| Hello, 8086!...."));
/// ```
pub fn hex_dump<M: MemoryBus>(memory: &M, segment: u16, offset: u16, count: usize) -> String {
    let mut out = String::new();

    out.push_str("            ");
    for column in 0..BYTES_PER_LINE {
        let _ = write!(out, "{:02X} ", column);
    }
    out.push('\n');

    let byte_at = |i: usize| memory.read(physical_address(segment, offset.wrapping_add(i as u16)));

    for start in (0..count).step_by(BYTES_PER_LINE) {
        let end = (start + BYTES_PER_LINE).min(count);
        let _ = write!(out, "{:04X}:{:04X} | ", segment, offset.wrapping_add(start as u16));

        for i in start..end {
            let _ = write!(out, "{:02X} ", byte_at(i));
        }
        for _ in end..start + BYTES_PER_LINE {
            out.push_str("   ");
        }

        out.push_str("| ");
        for i in start..end {
            let byte = byte_at(i);
            out.push(if byte.is_ascii_graphic() || byte == b' ' {
                byte as char
            } else {
                '.'
            });
        }
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FlatMemory;

    #[test]
    fn test_register_dump_format() {
        let mut regs = Registers::default();
        regs.set(Reg16::AX, 0x1234);
        regs.set(Reg16::SP, 0xFFFE);
        regs.set_segment(SegReg::CS, 0xF000);
        regs.set_ip(0x0103);
        let flags = Flags::from_bits(0x0046);

        let dump = RegisterDump::new(&regs, &flags).to_string();
        let lines: Vec<&str> = dump.lines().collect();

        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], "AX=1234; BX=0000");
        assert_eq!(lines[2], "CS=f000; DS=0000");
        assert_eq!(lines[3], "ES=0000; IP=0103");
        assert_eq!(lines[4], "SP=fffe; BP=0000");
        assert_eq!(lines[6], "SS=0000; FL=0046");
    }

    #[test]
    fn test_hex_dump_partial_line() {
        let mut memory = FlatMemory::new();
        memory.load(0x10000, &[0x41, 0x00, 0x7F]);

        let dump = hex_dump(&memory, 0x1000, 0x0000, 3);
        let lines: Vec<&str> = dump.lines().collect();

        assert_eq!(lines.len(), 2);
        assert!(lines[0].trim_start().starts_with("00 01 02"));
        assert!(lines[1].starts_with("1000:0000 | 41 00 7F "));
        assert!(lines[1].ends_with("| A.."));
    }

    #[test]
    fn test_hex_dump_multiple_lines() {
        let memory = FlatMemory::new();
        let dump = hex_dump(&memory, 0x0000, 0xFFF0, 32);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[2].starts_with("0000:0000 | "));
    }
}
