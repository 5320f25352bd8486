//! Object images as written by LC-3 assemblers: big-endian `u16` words, the first one
//! being the `.ORIG` address the remaining words are loaded to.
use crate::errors::LoadProgramError;
use crate::hardware::memory::MEMORY_SIZE_U16;
use log::debug;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramImage {
    pub origin: u16,
    pub words: Vec<u16>,
}

impl ProgramImage {
    /// Splits off the `.ORIG` header.
    ///
    /// # Errors
    /// - Program is missing valid .ORIG header (because it is shorter than one `u16` instruction)
    /// - Program too long, it would run past address `0xFFFF`
    pub fn from_words(image: &[u16]) -> Result<Self, LoadProgramError> {
        let Some((&origin, words)) = image.split_first() else {
            return Err(LoadProgramError::MissingOrigin);
        };
        if usize::from(origin) + words.len() > MEMORY_SIZE_U16 {
            return Err(LoadProgramError::ProgramTooLong {
                origin,
                word_count: words.len(),
            });
        }
        Ok(Self {
            origin,
            words: words.to_vec(),
        })
    }

    /// # Errors
    /// - Program image has an odd number of bytes
    /// - see [`ProgramImage::from_words`]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LoadProgramError> {
        if bytes.len() % 2 != 0 {
            return Err(LoadProgramError::OddByteCount {
                byte_count: bytes.len(),
            });
        }
        let words: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        Self::from_words(&words)
    }

    /// # Errors
    /// - Error reading the file
    /// - see [`ProgramImage::from_bytes`]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoadProgramError> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let image = Self::from_bytes(&bytes)?;
        debug!(
            "Read {} words for {:#06X} from {}",
            image.words.len(),
            image.origin,
            path.display()
        );
        Ok(image)
    }

    /// First address after the loaded words.
    #[must_use]
    pub fn end(&self) -> usize {
        usize::from(self.origin) + self.words.len()
    }
}
