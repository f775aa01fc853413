//! # Machine Configuration
//!
//! A machine is described by a small line-oriented text file:
//!
//! ```text
//! # registers (hex, case-insensitive names)
//! cs=f000
//! ip=fff0
//! sp=fffe
//!
//! # inclusive physical ranges backed by a file or zeroed RAM
//! 00000-9ffff=empty rw
//! f0000-fffff=bios.bin r
//!
//! # wait for a key press before exiting
//! readkey
//! ```
//!
//! - `reg=hhhh` presets ax bx cx dx sp bp si di cs ds es ss or ip
//! - `sssss-eeeee=<file|empty> <r|rw>` maps a region, read-only or read-write
//! - `readkey` asks the front end to wait for a key before it exits
//!
//! Blank lines and lines starting with `#` or `;` are comments. Anything else is
//! ignored with a warning.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

use crate::devices::{DeviceError, MappedMemory, Permission, RamDevice};
use crate::registers::{Reg16, SegReg};
use crate::{MemoryBus, CPU};

/// Configuration file used when none is named.
pub const DEFAULT_CONFIG: &str = "8086.cfg";

/// Errors raised while loading a configuration or building its memory.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        source: io::Error,
    },

    /// A register or mapping line is malformed.
    #[error("line {line}: {message}")]
    Parse {
        /// 1-based line number
        line: usize,
        /// What was wrong
        message: String,
    },

    /// A mapping names a backing file that does not exist.
    #[error("couldn't find {0}")]
    MissingFile(PathBuf),

    /// Two mappings overlap or a mapping does not fit the address space.
    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// A register a configuration can preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigRegister {
    /// General-purpose register
    General(Reg16),
    /// Segment register
    Segment(SegReg),
    /// Instruction pointer
    Ip,
}

impl FromStr for ConfigRegister {
    type Err = ();

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Ok(match name.to_ascii_lowercase().as_str() {
            "ax" => ConfigRegister::General(Reg16::AX),
            "cx" => ConfigRegister::General(Reg16::CX),
            "dx" => ConfigRegister::General(Reg16::DX),
            "bx" => ConfigRegister::General(Reg16::BX),
            "sp" => ConfigRegister::General(Reg16::SP),
            "bp" => ConfigRegister::General(Reg16::BP),
            "si" => ConfigRegister::General(Reg16::SI),
            "di" => ConfigRegister::General(Reg16::DI),
            "es" => ConfigRegister::Segment(SegReg::ES),
            "cs" => ConfigRegister::Segment(SegReg::CS),
            "ss" => ConfigRegister::Segment(SegReg::SS),
            "ds" => ConfigRegister::Segment(SegReg::DS),
            "ip" => ConfigRegister::Ip,
            _ => return Err(()),
        })
    }
}

/// Contents of a mapped region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingSource {
    /// Zero-filled
    Empty,
    /// Filled from a file, relative paths resolved against the config's directory
    File(PathBuf),
}

/// One `sssss-eeeee=source perm` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapping {
    /// First physical address
    pub start: u32,
    /// Last physical address (inclusive)
    pub end: u32,
    /// Initial contents
    pub source: MappingSource,
    /// Access permission
    pub permission: Permission,
}

impl Mapping {
    /// Number of bytes covered.
    pub fn size(&self) -> u32 {
        self.end - self.start + 1
    }
}

/// A parsed machine descriptor.
///
/// # Examples
///
/// ```
/// use lib8086::{CPU, MachineConfig, Reg16, SegReg};
/// use std::path::Path;
///
/// let config: MachineConfig = "cs=0000\nip=0100\nsp=FFFE\n00000-0ffff=empty rw\nreadkey"
///     .parse()
///     .unwrap();
/// assert!(config.read_key);
///
/// let memory = config.build_memory(Path::new(".")).unwrap();
/// let mut cpu = CPU::new(memory);
/// config.apply_registers(&mut cpu);
///
/// assert_eq!(cpu.segment(SegReg::CS), 0x0000);
/// assert_eq!(cpu.ip(), 0x0100);
/// assert_eq!(cpu.reg16(Reg16::SP), 0xFFFE);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MachineConfig {
    /// Register presets in file order
    pub registers: Vec<(ConfigRegister, u16)>,
    /// Memory regions in file order
    pub mappings: Vec<Mapping>,
    /// Wait for a key press before exiting
    pub read_key: bool,
}

impl MachineConfig {
    /// Reads and parses a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        text.parse()
    }

    /// Builds the memory map, reading backing files relative to `base_dir`.
    ///
    /// A file shorter than its region is zero-padded; a longer one is truncated
    /// with a warning. Every region is placed at its own start address.
    pub fn build_memory(&self, base_dir: &Path) -> Result<MappedMemory, ConfigError> {
        let mut memory = MappedMemory::new();

        for mapping in &self.mappings {
            let device = match &mapping.source {
                MappingSource::Empty => RamDevice::new(mapping.size()),
                MappingSource::File(name) => {
                    let path = base_dir.join(name);
                    let bytes = fs::read(&path).map_err(|source| {
                        if source.kind() == io::ErrorKind::NotFound {
                            ConfigError::MissingFile(path.clone())
                        } else {
                            ConfigError::Io {
                                path: path.clone(),
                                source,
                            }
                        }
                    })?;
                    if bytes.len() > mapping.size() as usize {
                        log::warn!(
                            "{} is {} bytes, truncated to region size {}",
                            path.display(),
                            bytes.len(),
                            mapping.size()
                        );
                    }
                    RamDevice::with_contents(mapping.size(), &bytes)
                }
            };

            memory.add_device(mapping.start, Box::new(device), mapping.permission)?;
        }

        Ok(memory)
    }

    /// Loads the register presets into `cpu`.
    pub fn apply_registers<M: MemoryBus>(&self, cpu: &mut CPU<M>) {
        for &(register, value) in &self.registers {
            match register {
                ConfigRegister::General(reg) => cpu.set_reg16(reg, value),
                ConfigRegister::Segment(reg) => cpu.set_segment(reg, value),
                ConfigRegister::Ip => cpu.set_ip(value),
            }
        }
    }
}

impl FromStr for MachineConfig {
    type Err = ConfigError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        let mut config = MachineConfig::default();

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            let number = index + 1;
            let error = |message: String| ConfigError::Parse {
                line: number,
                message,
            };

            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if line.eq_ignore_ascii_case("readkey") {
                config.read_key = true;
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                log::warn!("line {}: ignoring {:?}", number, line);
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            if let Ok(register) = key.parse::<ConfigRegister>() {
                let parsed = parse_hex(value, 4)
                    .ok_or_else(|| error(format!("invalid value {:?} for {}", value, key)))?;
                config.registers.push((register, parsed as u16));
            } else if let Some((start, end)) = key.split_once('-') {
                config.mappings.push(parse_mapping(start, end, value).map_err(error)?);
            } else {
                log::warn!("line {}: ignoring {:?}", number, line);
            }
        }

        Ok(config)
    }
}

fn parse_hex(text: &str, max_digits: usize) -> Option<u32> {
    if text.is_empty() || text.len() > max_digits {
        return None;
    }
    u32::from_str_radix(text, 16).ok()
}

fn parse_mapping(start: &str, end: &str, value: &str) -> Result<Mapping, String> {
    let start = parse_hex(start.trim(), 5).ok_or_else(|| format!("invalid start address {:?}", start))?;
    let end = parse_hex(end.trim(), 5).ok_or_else(|| format!("invalid end address {:?}", end))?;
    if end < start {
        return Err(format!("range {:05X}-{:05X} ends before it starts", start, end));
    }

    let mut parts = value.split_whitespace();
    let (Some(source), Some(permission), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected `<file|empty> <r|rw>`, found {:?}", value));
    };

    let source = if source.eq_ignore_ascii_case("empty") {
        MappingSource::Empty
    } else {
        MappingSource::File(PathBuf::from(source))
    };

    let permission = match permission.to_ascii_lowercase().as_str() {
        "r" => Permission::ReadOnly,
        "rw" => Permission::ReadWrite,
        other => return Err(format!("unknown permission {:?}", other)),
    };

    Ok(Mapping {
        start,
        end,
        source,
        permission,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_lines() {
        let config: MachineConfig = "AX=1234\nds=ABCD\nIP=0".parse().unwrap();
        assert_eq!(
            config.registers,
            vec![
                (ConfigRegister::General(Reg16::AX), 0x1234),
                (ConfigRegister::Segment(SegReg::DS), 0xABCD),
                (ConfigRegister::Ip, 0x0000),
            ]
        );
    }

    #[test]
    fn test_mapping_lines() {
        let config: MachineConfig = "00000-003ff=empty rw\nF0000-FFFFF=bios.bin r"
            .parse()
            .unwrap();

        assert_eq!(config.mappings.len(), 2);
        assert_eq!(config.mappings[0].size(), 0x400);
        assert_eq!(config.mappings[0].source, MappingSource::Empty);
        assert_eq!(config.mappings[1].start, 0xF0000);
        assert_eq!(
            config.mappings[1].source,
            MappingSource::File(PathBuf::from("bios.bin"))
        );
        assert_eq!(config.mappings[1].permission, Permission::ReadOnly);
    }

    #[test]
    fn test_comments_and_unknown_lines() {
        let config: MachineConfig = "# comment\n; another\n\nfrobnicate\nzz=1\nreadkey\n"
            .parse()
            .unwrap();
        assert!(config.read_key);
        assert!(config.registers.is_empty());
        assert!(config.mappings.is_empty());
    }

    #[test]
    fn test_bad_register_value_reports_line() {
        let err = "ax=1\nbx=12345".parse::<MachineConfig>().unwrap_err();
        assert!(matches!(err, ConfigError::Parse { line: 2, .. }));
    }

    #[test]
    fn test_bad_mapping() {
        assert!("00000-003ff=empty x".parse::<MachineConfig>().is_err());
        assert!("00400-003ff=empty rw".parse::<MachineConfig>().is_err());
        assert!("00000-003ff=empty".parse::<MachineConfig>().is_err());
    }

    #[test]
    fn test_missing_backing_file() {
        let config: MachineConfig = "00000-000ff=does-not-exist.bin r".parse().unwrap();
        let err = config
            .build_memory(Path::new("/nonexistent-lib8086-dir"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingFile(_)));
    }

    #[test]
    fn test_overlapping_mappings() {
        let config: MachineConfig = "00000-00fff=empty rw\n00800-017ff=empty rw".parse().unwrap();
        let err = config.build_memory(Path::new(".")).unwrap_err();
        assert!(matches!(err, ConfigError::Device(DeviceError::Overlap { .. })));
    }
}
