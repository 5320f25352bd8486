//! Console [`IoProvider`] on top of crossterm.
use crate::hardware::io_provider::IoProvider;
use crossterm::event::{Event, KeyCode, KeyModifiers, poll, read};
use crossterm::terminal;
use log::warn;
use std::io;
use std::io::{Stdout, Write, stdout};
use std::time::Duration;

pub struct RawLock {
    enabled: bool,
}

impl Drop for RawLock {
    fn drop(&mut self) {
        if self.enabled
            && let Err(e) = terminal::disable_raw_mode()
        {
            // terminal stays in raw mode but no means to repair
            warn!("Error resetting terminal {e}");
        }
    }
}

/// Set terminal to raw in best-effort mode, only log on failure, since it does not work
/// without a terminal, e.g. for piped output in CI.
#[must_use]
pub fn set_terminal_raw() -> RawLock {
    match terminal::enable_raw_mode() {
        Ok(()) => RawLock { enabled: true },
        Err(e) => {
            warn!("Could not set terminal to raw mode: {e}");
            RawLock { enabled: false }
        }
    }
}

/// Keyboard input and console output of the terminal the emulator runs in.
///
/// Keys are read without echo, CTRL-C closes the input.
pub struct TerminalIo<W: Write> {
    stdout: W,
    available_char: Option<u8>,
    raw: RawLock,
}

impl TerminalIo<Stdout> {
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(stdout())
    }
}

impl<W: Write> TerminalIo<W> {
    pub fn new(stdout: W) -> Self {
        Self {
            stdout,
            available_char: None,
            raw: set_terminal_raw(),
        }
    }

    /// Translates a key press, `Ok(None)` for events without a character.
    fn key_to_byte(event: &Event) -> io::Result<Option<u8>> {
        let Some(key) = event.as_key_press_event() else {
            return Ok(None);
        };
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Err(io::Error::new(
                io::ErrorKind::Interrupted,
                "input interrupted by CTRL-C",
            ));
        }
        Ok(match key.code {
            KeyCode::Enter => Some(b'\n'),
            KeyCode::Tab => Some(b'\t'),
            KeyCode::Backspace => Some(0x08),
            KeyCode::Esc => Some(0x1B),
            code => code
                .as_char()
                .filter(char::is_ascii)
                .and_then(|c| u8::try_from(c).ok()),
        })
    }
}

impl<W: Write> IoProvider for TerminalIo<W> {
    fn has_input(&mut self) -> io::Result<bool> {
        while self.available_char.is_none() && poll(Duration::from_secs(0))? {
            self.available_char = Self::key_to_byte(&read()?)?;
        }
        Ok(self.available_char.is_some())
    }
    fn read_input(&mut self) -> io::Result<u8> {
        loop {
            if let Some(c) = self.available_char.take() {
                return Ok(c);
            }
            self.available_char = Self::key_to_byte(&read()?)?;
        }
    }
    fn write_output(&mut self, byte: u8) -> io::Result<()> {
        if byte == b'\n' && self.raw.enabled {
            // raw mode does not return the carriage
            self.stdout.write_all(b"\r\n")?;
        } else {
            self.stdout.write_all(&[byte])?;
        }
        self.stdout.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEvent, KeyEventKind};
    use googletest::prelude::*;
    use yare::parameterized;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> Event {
        Event::Key(KeyEvent::new_with_kind(code, modifiers, KeyEventKind::Press))
    }

    #[parameterized(
        letter = { KeyCode::Char('a'), Some(b'a') },
        enter = { KeyCode::Enter, Some(b'\n') },
        backspace = { KeyCode::Backspace, Some(0x08) },
        non_ascii = { KeyCode::Char('ä'), None },
        arrow = { KeyCode::Left, None },
    )]
    fn test_key_to_byte(code: KeyCode, expected: Option<u8>) {
        let byte = TerminalIo::<Vec<u8>>::key_to_byte(&press(code, KeyModifiers::NONE));
        assert_that!(byte.ok(), eq(Some(expected)));
    }

    #[gtest]
    pub fn test_ctrl_c_interrupts() {
        let res = TerminalIo::<Vec<u8>>::key_to_byte(&press(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL,
        ));
        expect_that!(
            res.map_err(|e| e.kind()),
            eq(Err(io::ErrorKind::Interrupted))
        );
    }

    #[gtest]
    pub fn test_key_release_ignored() {
        let release = Event::Key(KeyEvent::new_with_kind(
            KeyCode::Char('a'),
            KeyModifiers::NONE,
            KeyEventKind::Release,
        ));
        expect_that!(
            TerminalIo::<Vec<u8>>::key_to_byte(&release).ok(),
            eq(Some(None))
        );
    }
}
