//! `lc3-vm` runs LC-3 object images on the terminal.
//!
//! ```text
//! lc3-vm [OPTIONS] <IMAGE>...
//! ```
//! Images are loaded in order, e.g. an OS image followed by a program.
use clap::Parser;
use lc3_vm::emulator::{Emulator, RunState};
use lc3_vm::terminal::TerminalIo;
use log::{LevelFilter, error, info};
use std::num::ParseIntError;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "lc3-vm", version, about = "Virtual machine for LC-3 object images")]
struct Cli {
    /// Object images, first word of each is its `.ORIG` address
    #[arg(required = true)]
    images: Vec<PathBuf>,
    /// Start address in hex, defaults to the origin of the last image
    #[arg(long, value_parser = parse_address)]
    pc: Option<u16>,
    /// Stop after this many instructions
    #[arg(long)]
    max_steps: Option<u64>,
    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_address(arg: &str) -> Result<u16, ParseIntError> {
    let digits = arg
        .strip_prefix("0x")
        .or_else(|| arg.strip_prefix('x'))
        .unwrap_or(arg);
    u16::from_str_radix(digits, 16)
}

const fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(log_level(cli.verbose))
        .parse_default_env()
        .init();

    let mut emu = Emulator::new(TerminalIo::stdio());
    let mut start = None;
    for image in &cli.images {
        match emu.load_image_file(image) {
            Ok(origin) => {
                info!("Loaded {} at {origin:#06X}", image.display());
                start = Some(origin);
            }
            Err(e) => {
                drop(emu);
                error!("{}: {e}", image.display());
                return ExitCode::FAILURE;
            }
        }
    }
    if let Some(pc) = cli.pc.or(start) {
        emu.registers_mut().set_pc(pc);
    }

    let result = match cli.max_steps {
        Some(max_steps) => emu.run_for(max_steps),
        None => emu.run(),
    };
    // leave raw mode before printing the summary
    drop(emu.into_io());

    println!();
    println!("{} after {} steps", result.state, result.steps);
    println!("{:?}", result.registers);
    println!("Flags: {}", result.flags);
    if matches!(result.state, RunState::Faulted(_)) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
