//! Command-line front end: builds a machine from a configuration file and runs
//! it until it halts.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossterm::event::{self, Event};
use crossterm::terminal;
use log::LevelFilter;

use lib8086::config::DEFAULT_CONFIG;
use lib8086::{hex_dump, MachineConfig, MappedMemory, MemoryFault, CPU};

/// Debug console port; bytes written here go to stdout.
const DEBUG_CONSOLE_PORT: u16 = 0xE9;

/// Intel 8086 real-mode emulator
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Machine configuration file
    #[arg(default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Stop after this many instructions
    #[arg(long, value_name = "N")]
    limit: Option<u64>,

    /// Hex dump a memory range after the run, as SEGMENT:OFFSET:COUNT (hex)
    #[arg(long, value_name = "SEG:OFF:COUNT", value_parser = parse_dump_range)]
    dump: Option<DumpRange>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy)]
struct DumpRange {
    segment: u16,
    offset: u16,
    count: usize,
}

fn parse_dump_range(text: &str) -> Result<DumpRange, String> {
    let fields: Vec<&str> = text.split(':').collect();
    let [segment, offset, count] = fields[..] else {
        return Err(format!("expected SEG:OFF:COUNT, found {:?}", text));
    };
    let hex = |field: &str| u32::from_str_radix(field, 16).map_err(|e| format!("{field:?}: {e}"));
    let segment = u16::try_from(hex(segment)?).map_err(|e| e.to_string())?;
    let offset = u16::try_from(hex(offset)?).map_err(|e| e.to_string())?;
    let count = hex(count)? as usize;
    Ok(DumpRange {
        segment,
        offset,
        count,
    })
}

fn init_logging(verbose: u8) {
    let mut builder = env_logger::Builder::new();
    builder.filter_level(match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    });
    // RUST_LOG, when set, wins over -v
    builder.parse_default_env();
    builder.init();
}

fn load_machine(path: &Path) -> Result<(CPU<MappedMemory>, bool)> {
    let config = MachineConfig::load(path)
        .with_context(|| format!("loading configuration {}", path.display()))?;
    let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let memory = config
        .build_memory(base_dir)
        .with_context(|| format!("building memory map from {}", path.display()))?;

    let mut cpu = CPU::new(memory);
    config.apply_registers(&mut cpu);

    cpu.map_port8(DEBUG_CONSOLE_PORT, |value: u8, write: bool| {
        if write {
            let mut stdout = io::stdout();
            let _ = stdout.write_all(&[value]);
            let _ = stdout.flush();
        }
        value
    });

    Ok((cpu, config.read_key))
}

fn run(cpu: &mut CPU<MappedMemory>, limit: Option<u64>) -> Result<()> {
    loop {
        if limit.is_some_and(|limit| cpu.instructions() >= limit) {
            println!("Instruction limit reached.");
            return Ok(());
        }

        let result = cpu.step();

        if let Some(MemoryFault::AccessViolation(address)) = cpu.memory_mut().take_fault() {
            println!("{}", cpu.register_dump());
            bail!("Access violation at physical address 0x{:05X}", address);
        }

        match result {
            Ok(()) if cpu.is_halted() => {
                println!("{}", cpu.register_dump());
                println!("Execution halted.");
                return Ok(());
            }
            Ok(()) => {}
            Err(err) => {
                println!("{}", cpu.register_dump());
                return Err(err).context("execution failed");
            }
        }
    }
}

fn wait_for_key() -> Result<()> {
    println!("Press any key to exit...");
    terminal::enable_raw_mode().context("enabling raw terminal mode")?;
    let result = loop {
        match event::read() {
            Ok(Event::Key(_)) => break Ok(()),
            Ok(_) => {}
            Err(err) => break Err(err),
        }
    };
    terminal::disable_raw_mode().context("restoring terminal mode")?;
    result.context("reading key press")
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let (mut cpu, read_key) = match load_machine(&args.config) {
        Ok(machine) => machine,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::FAILURE;
        }
    };

    let outcome = run(&mut cpu, args.limit);

    if let Some(range) = args.dump {
        print!(
            "{}",
            hex_dump(cpu.memory(), range.segment, range.offset, range.count)
        );
    }

    if let Err(err) = &outcome {
        eprintln!("error: {err:#}");
    }

    if read_key {
        if let Err(err) = wait_for_key() {
            eprintln!("error: {err:#}");
        }
    }

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_dump_range() {
        let range = parse_dump_range("b800:0000:a0").unwrap();
        assert_eq!(range.segment, 0xB800);
        assert_eq!(range.offset, 0x0000);
        assert_eq!(range.count, 0xA0);

        assert!(parse_dump_range("b800:0000").is_err());
        assert!(parse_dump_range("10000:0:1").is_err());
        assert!(parse_dump_range("zz:0:1").is_err());
    }

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["i8086"]);
        assert_eq!(args.config, PathBuf::from(DEFAULT_CONFIG));
        assert_eq!(args.limit, None);
        assert_eq!(args.verbose, 0);
    }
}
