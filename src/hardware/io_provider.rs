use std::collections::VecDeque;
use std::io;

/// Providing keyboard input and console output independent of an implementation.
///
/// The emulator calls these synchronously from the keyboard registers and the
/// `GETC`, `OUT`, `PUTS` and `IN` trap services.
pub trait IoProvider {
    /// Checks if input is available, does not block.
    ///
    /// # Errors
    /// - the underlying device failed
    fn has_input(&mut self) -> io::Result<bool>;
    /// Consumes one input character, blocking until one is available.
    ///
    /// # Errors
    /// - the provider was closed or the underlying device failed
    fn read_input(&mut self) -> io::Result<u8>;
    /// Writes one output character.
    ///
    /// # Errors
    /// - the underlying device failed
    fn write_output(&mut self, byte: u8) -> io::Result<()>;
}

impl<P: IoProvider + ?Sized> IoProvider for &mut P {
    fn has_input(&mut self) -> io::Result<bool> {
        (**self).has_input()
    }
    fn read_input(&mut self) -> io::Result<u8> {
        (**self).read_input()
    }
    fn write_output(&mut self, byte: u8) -> io::Result<()> {
        (**self).write_output(byte)
    }
}

/// In-memory provider: input is a queue fed up front or while paused, output is collected.
///
/// Once the queue is drained, `read_input` reports `UnexpectedEof` instead of blocking,
/// which is how a closed input behaves.
#[derive(Debug, Default, Clone)]
pub struct BufferedIo {
    input: VecDeque<u8>,
    output: Vec<u8>,
}

impl BufferedIo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
    #[must_use]
    pub fn with_input(input: &[u8]) -> Self {
        Self {
            input: input.iter().copied().collect(),
            output: Vec::with_capacity(120),
        }
    }
    pub fn push_input(&mut self, input: &[u8]) {
        self.input.extend(input);
    }
    #[must_use]
    pub fn output(&self) -> &[u8] {
        &self.output
    }
    /// Output decoded lossily as UTF-8.
    #[must_use]
    pub fn output_string(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl IoProvider for BufferedIo {
    fn has_input(&mut self) -> io::Result<bool> {
        Ok(!self.input.is_empty())
    }
    fn read_input(&mut self) -> io::Result<u8> {
        self.input
            .pop_front()
            .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "input closed"))
    }
    fn write_output(&mut self, byte: u8) -> io::Result<()> {
        self.output.push(byte);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use googletest::prelude::*;

    #[gtest]
    pub fn test_buffered_input_consumed_once() -> Result<()> {
        let mut io = BufferedIo::with_input(b"ab");
        expect_that!(io.has_input()?, eq(true));
        expect_that!(io.read_input()?, eq(b'a'));
        expect_that!(io.read_input()?, eq(b'b'));
        expect_that!(io.has_input()?, eq(false));
        let err = io.read_input().unwrap_err();
        expect_that!(err.kind(), eq(io::ErrorKind::UnexpectedEof));
        Ok(())
    }

    #[gtest]
    pub fn test_buffered_output_collected() -> Result<()> {
        let mut io = BufferedIo::new();
        io.write_output(b'h')?;
        io.write_output(b'i')?;
        expect_that!(io.output_string(), eq("hi"));
        expect_that!(io.output(), eq(&b"hi"[..]));
        Ok(())
    }
}
