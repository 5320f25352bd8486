use crate::emulator::instruction::Opcode;
use displaydoc::Display;
use std::io;
use thiserror::Error;

/// Errors while turning an object image into memory contents.
#[derive(Error, Display, Debug)]
pub enum LoadProgramError {
    /// Program is missing valid .ORIG header
    MissingOrigin,
    /// Program image has an odd number of bytes ({byte_count}), expected big-endian u16 words
    OddByteCount { byte_count: usize },
    /// Program too long, {word_count} words starting at {origin:#06X} run past the end of memory
    ProgramTooLong { origin: u16, word_count: usize },
    /// Error reading program image: {0}
    Io(#[from] io::Error),
}

/// Reason a running program was stopped.
#[derive(Error, Display, Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    /// Illegal opcode {opcode:?} at address {address:#06X}
    IllegalOpcode { opcode: Opcode, address: u16 },
    /// Error during reading input or writing program output: {0}
    IoProvider(String),
}

impl From<io::Error> for Fault {
    fn from(error: io::Error) -> Self {
        Self::IoProvider(error.to_string())
    }
}
