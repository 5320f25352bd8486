use crate::emulator::Emulator;
use crate::hardware::io_provider::BufferedIo;
use crate::hardware::memory::{Memory, PROGRAM_SECTION_START};
use crate::hardware::registers::Registers;

/// `TRAP x25`
pub const HALT: u16 = 0xF025;

/// Emulator with `program_no_header` loaded at `0x3000` and no input.
pub fn emulator_with_program(program_no_header: &[u16]) -> Emulator<BufferedIo> {
    let mut program = Vec::with_capacity(program_no_header.len() + 1);
    program.push(PROGRAM_SECTION_START);
    program.extend_from_slice(program_no_header);

    let mut emu = Emulator::new(BufferedIo::new());
    emu.load_image(program.as_slice())
        .expect("test program does not fit");
    emu
}

pub struct FakeEmulator {
    inner: Emulator<BufferedIo>,
}
impl FakeEmulator {
    pub fn new(program_no_header: &[u16]) -> Self {
        Self {
            inner: emulator_with_program(program_no_header),
        }
    }
    pub fn add_input(&mut self, input: &[u8]) -> &mut Self {
        self.inner.io.push_input(input);
        self
    }
    pub const fn get_parts(&mut self) -> (&mut Registers, &mut Memory, &mut BufferedIo) {
        (
            &mut self.inner.registers,
            &mut self.inner.memory,
            &mut self.inner.io,
        )
    }
}
