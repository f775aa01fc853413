//! Tests for loading a machine from a configuration file on disk.

use std::fs;
use std::path::PathBuf;

use lib8086::config::{ConfigError, MappingSource};
use lib8086::{MachineConfig, MemoryBus, MemoryFault, Reg16, SegReg, CPU};

/// Creates an empty scratch directory unique to `name`
fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("lib8086-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_boot_machine_from_config() {
    let dir = scratch_dir("boot");
    // MOV AX, 0x1234 ; HLT, at the reset vector
    fs::write(dir.join("bios.bin"), [0xB8, 0x34, 0x12, 0xF4]).unwrap();
    fs::write(
        dir.join("8086.cfg"),
        "# test machine\n\
         ss=0000\n\
         sp=0400\n\
         00000-003ff=empty rw\n\
         ffff0-fffff=bios.bin r\n",
    )
    .unwrap();

    let config = MachineConfig::load(dir.join("8086.cfg")).unwrap();
    assert!(!config.read_key);
    assert_eq!(config.mappings.len(), 2);

    let memory = config.build_memory(&dir).unwrap();
    let mut cpu = CPU::new(memory);
    config.apply_registers(&mut cpu);

    assert_eq!(cpu.reg16(Reg16::SP), 0x0400);
    assert_eq!(cpu.segment(SegReg::CS), 0xFFFF);

    cpu.run(10).unwrap();
    assert_eq!(cpu.reg16(Reg16::AX), 0x1234);
    assert!(cpu.is_halted());

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_each_file_loads_at_its_own_region() {
    let dir = scratch_dir("regions");
    fs::write(dir.join("low.bin"), [0x11, 0x22]).unwrap();
    fs::write(dir.join("high.bin"), [0x33, 0x44]).unwrap();

    let config: MachineConfig = "00000-000ff=low.bin rw\n10000-100ff=high.bin rw"
        .parse()
        .unwrap();
    let memory = config.build_memory(&dir).unwrap();

    assert_eq!(memory.read_word(0x00000), 0x2211);
    assert_eq!(memory.read_word(0x10000), 0x4433);
    assert_eq!(memory.read(0x10002), 0x00);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_oversized_file_is_truncated() {
    let dir = scratch_dir("truncate");
    fs::write(dir.join("big.bin"), [0xAA; 32]).unwrap();

    let config: MachineConfig = "00000-0000f=big.bin rw\n".parse().unwrap();
    let memory = config.build_memory(&dir).unwrap();

    assert_eq!(memory.read(0x0000F), 0xAA);
    assert_eq!(memory.read(0x00010), 0x00);

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_read_only_mapping_reports_violation() {
    let config: MachineConfig = "00000-000ff=empty r\n".parse().unwrap();
    let mut memory = config
        .build_memory(std::path::Path::new("."))
        .unwrap();

    memory.write(0x00010, 0x01);

    assert_eq!(memory.take_fault(), Some(MemoryFault::AccessViolation(0x00010)));
}

#[test]
fn test_missing_config_file() {
    let err = MachineConfig::load("/nonexistent-lib8086/8086.cfg").unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_readkey_and_mixed_case() {
    let config: MachineConfig = "ReadKey\nCS=F000\nIP=FFF0\nF0000-FFFFF=BIOS.BIN R"
        .parse()
        .unwrap();

    assert!(config.read_key);
    assert_eq!(config.registers.len(), 2);
    assert_eq!(
        config.mappings[0].source,
        MappingSource::File(PathBuf::from("BIOS.BIN"))
    );
}
