use crate::errors::LoadProgramError;
use crate::hardware::io_provider::IoProvider;
use std::fmt::{Debug, Formatter};
use std::io;

/// Conventional load address of user programs, everything below is reserved for the OS.
pub const PROGRAM_SECTION_START: u16 = 0x3000;
/// Every 16-bit address is backed by a word.
pub const MEMORY_SIZE_U16: usize = 1 << 16;

/// Memory regions mapped to IO functionality.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, enumn::N)]
pub enum MemoryMappedIOLocations {
    /// Keyboard Status Register
    Kbsr = 0xFE00,
    /// Keyboard Data Register
    Kbdr = 0xFE02,
}

/// An abstraction for the LC-3 memory excluding registers.
///
/// Reads of [`MemoryMappedIOLocations`] are answered by the keyboard device instead of
/// the stored word, writes to them are stored but have no device effect.
pub struct Memory {
    /// Index equals memory address
    data: Box<[u16]>,
}

impl Debug for Memory {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let used = self.data.iter().filter(|w| **w != 0).count();
        write!(f, "Memory: {used} non-zero words")
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    const KEYBOARD_STATUS_REGISTER_SET: u16 = 1 << 15;
    const KEYBOARD_STATUS_REGISTER_UNSET: u16 = 0;

    /// Zero-initialized memory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data: vec![0x0u16; MEMORY_SIZE_U16].into_boxed_slice(),
        }
    }

    /// Reads a word, intercepting the keyboard registers.
    ///
    /// - `KBSR` has bit 15 set iff the provider has input, nothing is consumed.
    /// - `KBDR` consumes one character into the low byte, without input it reads 0.
    ///
    /// # Errors
    /// - the provider failed while being asked for input
    pub fn read<P: IoProvider + ?Sized>(&mut self, address: u16, io: &mut P) -> io::Result<u16> {
        match MemoryMappedIOLocations::n(address) {
            None => Ok(self.peek(address)),
            Some(MemoryMappedIOLocations::Kbsr) => Ok(if io.has_input()? {
                Self::KEYBOARD_STATUS_REGISTER_SET
            } else {
                Self::KEYBOARD_STATUS_REGISTER_UNSET
            }),
            Some(MemoryMappedIOLocations::Kbdr) => {
                if io.has_input()? {
                    Ok(u16::from(io.read_input()?))
                } else {
                    Ok(0)
                }
            }
        }
    }

    /// Stored content of `address`, without any device interception.
    #[must_use]
    pub fn peek(&self, address: u16) -> u16 {
        self.data[usize::from(address)]
    }

    pub fn write(&mut self, address: u16, value: u16) {
        self.data[usize::from(address)] = value;
    }

    /// Copies `words` into memory starting at `origin`.
    ///
    /// # Errors
    /// - Program too long, it would run past address `0xFFFF`
    pub fn load(&mut self, origin: u16, words: &[u16]) -> Result<(), LoadProgramError> {
        let start = usize::from(origin);
        let end = start + words.len();
        if end > MEMORY_SIZE_U16 {
            return Err(LoadProgramError::ProgramTooLong {
                origin,
                word_count: words.len(),
            });
        }
        self.data[start..end].copy_from_slice(words);
        Ok(())
    }

    /// Contents of `len` words from `start`, wrapping is not applied.
    #[cfg(test)]
    pub(crate) fn slice(&self, start: u16, len: usize) -> &[u16] {
        let start = usize::from(start);
        &self.data[start..(start + len).min(MEMORY_SIZE_U16)]
    }
}
