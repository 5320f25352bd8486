//! The fetch, decode, execute loop.
pub mod image;
pub mod instruction;
pub mod opcodes;
#[cfg(test)]
pub(crate) mod test_helpers;
pub mod trap_routines;

use crate::errors::{Fault, LoadProgramError};
use crate::hardware::io_provider::IoProvider;
use crate::hardware::memory::Memory;
use crate::hardware::registers::{ConditionFlag, Registers};
use image::ProgramImage;
use instruction::Instruction;
use log::{debug, trace, warn};
use std::fmt::{Display, Formatter};
use std::ops::ControlFlow;
use std::path::Path;

/// Lifecycle of an [`Emulator`], `Halted` and `Faulted` are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    Running,
    Halted,
    Faulted(Fault),
}

impl RunState {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl Display for RunState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => f.write_str("Running"),
            Self::Halted => f.write_str("Halted"),
            Self::Faulted(fault) => write!(f, "Faulted: {fault}"),
        }
    }
}

/// Outcome of a single [`Emulator::step`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub state: RunState,
    /// Address and decoded instruction, `None` if nothing was fetched.
    pub executed: Option<(u16, Instruction)>,
}

/// Final snapshot of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub state: RunState,
    pub registers: Registers,
    pub flags: ConditionFlag,
    pub steps: u64,
}

/// The public facing emulator used to run LC-3 programs.
///
/// Owns memory, registers and the IO provider. Calls are not synchronized,
/// a single owner drives `step`, `run` and memory writes.
pub struct Emulator<P: IoProvider> {
    pub(crate) registers: Registers,
    pub(crate) memory: Memory,
    pub(crate) io: P,
    state: RunState,
}

impl<P: IoProvider> Emulator<P> {
    /// Zeroed memory, PC at `0x3000`, condition flag Z.
    #[must_use]
    pub fn new(io: P) -> Self {
        Self {
            registers: Registers::new(),
            memory: Memory::new(),
            io,
            state: RunState::Running,
        }
    }

    /// Copies an already parsed image into memory and returns its origin.
    ///
    /// # Errors
    /// - Program too long
    pub fn load(&mut self, image: &ProgramImage) -> Result<u16, LoadProgramError> {
        self.memory.load(image.origin, &image.words)?;
        debug!(
            "Loaded {} words at {:#06X}..{:#06X}",
            image.words.len(),
            image.origin,
            image.end()
        );
        Ok(image.origin)
    }

    /// Loads an object image given as words, the first word is the `.ORIG` address.
    ///
    /// # Errors
    /// - Program is missing valid .ORIG header
    /// - Program too long
    pub fn load_image(&mut self, image: &[u16]) -> Result<u16, LoadProgramError> {
        self.load(&ProgramImage::from_words(image)?)
    }

    /// Loads an object image file and returns its origin.
    ///
    /// # Errors
    /// - see [`ProgramImage::from_file`]
    pub fn load_image_file(&mut self, path: impl AsRef<Path>) -> Result<u16, LoadProgramError> {
        self.load(&ProgramImage::from_file(path)?)
    }

    #[must_use]
    pub const fn registers(&self) -> &Registers {
        &self.registers
    }
    pub const fn registers_mut(&mut self) -> &mut Registers {
        &mut self.registers
    }
    #[must_use]
    pub const fn memory(&self) -> &Memory {
        &self.memory
    }
    pub fn write(&mut self, address: u16, value: u16) {
        self.memory.write(address, value);
    }
    #[must_use]
    pub const fn io(&self) -> &P {
        &self.io
    }
    pub const fn io_mut(&mut self) -> &mut P {
        &mut self.io
    }
    #[must_use]
    pub const fn state(&self) -> &RunState {
        &self.state
    }
    pub fn into_io(self) -> P {
        self.io
    }

    /// Resets registers and run state, memory is kept.
    pub fn reset(&mut self) {
        self.registers = Registers::new();
        self.state = RunState::Running;
    }

    /// Executes exactly one fetch, decode, execute cycle.
    ///
    /// PC is incremented before execution. A faulting instruction leaves the registers
    /// as they were before it, so PC addresses the faulting instruction.
    /// On a halted or faulted emulator nothing is executed.
    pub fn step(&mut self) -> StepResult {
        if self.state.is_terminal() {
            return StepResult {
                state: self.state.clone(),
                executed: None,
            };
        }
        let address = self.registers.pc();
        // fetching never touches the keyboard device
        let word = self.memory.peek(address);
        let instruction = Instruction::decode(word);
        trace!("{address:#06X}: {word:#06X} {instruction}");

        let snapshot = self.registers;
        self.registers.set_pc(address.wrapping_add(1));
        match opcodes::execute(
            instruction,
            address,
            &mut self.registers,
            &mut self.memory,
            &mut self.io,
        ) {
            ControlFlow::Continue(()) => {}
            ControlFlow::Break(Ok(())) => self.state = RunState::Halted,
            ControlFlow::Break(Err(fault)) => {
                self.registers = snapshot;
                self.fault(fault);
            }
        }
        StepResult {
            state: self.state.clone(),
            executed: Some((address, instruction)),
        }
    }

    fn fault(&mut self, fault: Fault) {
        warn!("Program faulted: {fault}");
        self.state = RunState::Faulted(fault);
    }

    /// Runs until the program halts or faults.
    pub fn run(&mut self) -> RunResult {
        self.run_for(u64::MAX)
    }

    /// Runs until the program halts, faults or `max_steps` instructions were executed.
    /// In the last case the state is still [`RunState::Running`].
    pub fn run_for(&mut self, max_steps: u64) -> RunResult {
        let mut steps = 0;
        while !self.state.is_terminal() && steps < max_steps {
            if self.step().executed.is_some() {
                steps += 1;
            }
        }
        RunResult {
            state: self.state.clone(),
            registers: self.registers,
            flags: self.registers.flags(),
            steps,
        }
    }
}

#[expect(clippy::unusual_byte_groupings)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::instruction::Opcode;
    use crate::emulator::test_helpers::{HALT, emulator_with_program};
    use crate::hardware::io_provider::BufferedIo;
    use crate::hardware::registers::Reg;
    use googletest::prelude::*;
    use std::io;

    #[gtest]
    pub fn test_single_add_step() {
        // ADD R0, R1, #4
        let mut emu = emulator_with_program(&[0b0001_000_001_1_00100]);
        emu.registers_mut().set(Reg::R1, 1);
        let res = emu.step();
        expect_that!(res.state, eq(&RunState::Running));
        expect_that!(emu.registers().get(Reg::R0), eq(5));
        expect_that!(emu.registers().flags(), eq(ConditionFlag::Pos));
        expect_that!(emu.registers().pc(), eq(0x3001));
    }

    #[gtest]
    pub fn test_step_from_before_program_start() {
        // 0x2FFF holds 0x0000 which is a never taken BR
        let mut emu = emulator_with_program(&[0b0001_000_001_1_00100]);
        emu.registers_mut().set(Reg::R1, 1);
        emu.registers_mut().set_pc(0x2FFF);
        let _ = emu.step();
        expect_that!(emu.registers().pc(), eq(0x3000));
        let _ = emu.step();
        expect_that!(emu.registers().get(Reg::R0), eq(5));
        expect_that!(emu.registers().pc(), eq(0x3001));
    }

    #[gtest]
    pub fn test_halt_stops_fetching() {
        // ADD R0, R0, #1; HALT; ADD R0, R0, #1
        let mut emu = emulator_with_program(&[0x1021, HALT, 0x1021]);
        let res = emu.run();
        expect_that!(res.state, eq(&RunState::Halted));
        expect_that!(res.steps, eq(2));
        expect_that!(res.registers.get(Reg::R0), eq(1));
        expect_that!(res.registers.get(Reg::R7), eq(0x3002));
        expect_that!(res.flags, eq(ConditionFlag::Pos));
        // stepping a halted emulator does nothing
        let step = emu.step();
        expect_that!(step.executed.is_none(), eq(true));
        expect_that!(emu.registers().get(Reg::R0), eq(1));
    }

    #[gtest]
    pub fn test_illegal_opcode_faults_without_side_effects() {
        // ADD R0, R0, #1; RTI
        let mut emu = emulator_with_program(&[0x1021, 0x8000]);
        let res = emu.run();
        expect_that!(
            res.state,
            eq(&RunState::Faulted(Fault::IllegalOpcode {
                opcode: Opcode::Rti,
                address: 0x3001
            }))
        );
        expect_that!(res.registers.pc(), eq(0x3001));
        expect_that!(res.registers.get(Reg::R0), eq(1));
        expect_that!(
            res.state.to_string(),
            eq("Faulted: Illegal opcode Rti at address 0x3001")
        );
    }

    #[gtest]
    pub fn test_reserved_opcode_faults() {
        let mut emu = emulator_with_program(&[0xD000]);
        let res = emu.run();
        expect_that!(
            res.state,
            eq(&RunState::Faulted(Fault::IllegalOpcode {
                opcode: Opcode::Res,
                address: 0x3000
            }))
        );
    }

    #[gtest]
    pub fn test_getc_without_input_faults() {
        // GETC
        let mut emu = emulator_with_program(&[0xF020, HALT]);
        let res = emu.run();
        expect_that!(
            res.state,
            eq(&RunState::Faulted(Fault::IoProvider(String::from(
                "input closed"
            ))))
        );
        expect_that!(res.registers.pc(), eq(0x3000));
        expect_that!(res.registers.get(Reg::R7), eq(0));
    }

    #[gtest]
    pub fn test_hello_world_loop() {
        // LEA R0, #2; PUTS; HALT; "Hi\n"
        let program = [
            0b1110_000_000000010,
            0xF022,
            HALT,
            u16::from(b'H'),
            u16::from(b'i'),
            u16::from(b'\n'),
            0,
        ];
        let mut emu = emulator_with_program(&program);
        let res = emu.run();
        expect_that!(res.state, eq(&RunState::Halted));
        expect_that!(emu.io().output_string(), eq("Hi\n"));
    }

    #[gtest]
    pub fn test_times_ten_subroutine() {
        // R1 = 7, JSR to a subroutine which adds R1 ten times into R3, HALT
        let program = [
            0b0101_011_011_1_00000, // 0x3000 AND R3, R3, #0
            0b0001_001_001_1_00111, // 0x3001 ADD R1, R1, #7
            0b0100_1_00000000001,   // 0x3002 JSR #1
            HALT,                   // 0x3003
            0b0101_010_010_1_00000, // 0x3004 AND R2, R2, #0
            0b0001_010_010_1_01010, // 0x3005 ADD R2, R2, #10
            0b0001_011_011_0_00_001, // 0x3006 ADD R3, R3, R1
            0b0001_010_010_1_11111, // 0x3007 ADD R2, R2, #-1
            0b0000_001_111111101,   // 0x3008 BRp #-3
            0xC1C0,                 // 0x3009 RET
        ];
        let mut emu = emulator_with_program(&program);
        let res = emu.run();
        expect_that!(res.state, eq(&RunState::Halted));
        expect_that!(res.registers.get(Reg::R3), eq(70));
        expect_that!(res.registers.get(Reg::R2), eq(0));
        expect_that!(res.flags, eq(ConditionFlag::Zero));
    }

    #[gtest]
    pub fn test_keyboard_polling_loop() {
        // LDI R0, KBSR; BRzp #-2; LDI R0, KBDR; HALT; .FILL xFE00; .FILL xFE02
        let program = [
            0b1010_000_000000011, // 0x3000
            0b0000_011_111111110, // 0x3001
            0b1010_000_000000010, // 0x3002
            HALT,                 // 0x3003
            0xFE00,               // 0x3004
            0xFE02,               // 0x3005
        ];
        let mut emu = emulator_with_program(&program);
        emu.io_mut().push_input(b"x");
        let res = emu.run();
        expect_that!(res.state, eq(&RunState::Halted));
        expect_that!(res.registers.get(Reg::R0), eq(u16::from(b'x')));
    }

    #[gtest]
    pub fn test_keyboard_status_then_getc() {
        // LDI R1, KBSR; GETC; HALT; .FILL xFE00
        let program = [
            0b1010_001_000000010, // 0x3000
            0xF020,               // 0x3001
            HALT,                 // 0x3002
            0xFE00,               // 0x3003
        ];
        let mut emu = emulator_with_program(&program);
        emu.io_mut().push_input(b"a");
        let res = emu.run();
        expect_that!(res.state, eq(&RunState::Halted));
        expect_that!(res.registers.get(Reg::R1), eq(0x8000));
        expect_that!(res.registers.get(Reg::R0), eq(u16::from(b'a')));
    }

    #[gtest]
    pub fn test_fetch_from_keyboard_data_address_keeps_input() -> Result<()> {
        let mut emu = Emulator::new(BufferedIo::with_input(b"k"));
        emu.write(0xFE02, HALT);
        emu.registers_mut().set_pc(0xFE02);
        let res = emu.run();
        expect_that!(res.state, eq(&RunState::Halted));
        expect_that!(res.registers.get(Reg::R7), eq(0xFE03));
        expect_that!(emu.io_mut().has_input()?, eq(true));
        Ok(())
    }

    #[gtest]
    pub fn test_in_without_input_keeps_prompt() {
        // IN
        let mut emu = emulator_with_program(&[0xF023, HALT]);
        let res = emu.run();
        expect_that!(matches!(res.state, RunState::Faulted(Fault::IoProvider(_))), eq(true));
        expect_that!(res.registers.pc(), eq(0x3000));
        expect_that!(emu.io().output_string(), eq("Input: "));
    }

    #[gtest]
    pub fn test_run_for_budget() {
        // BRnzp #-1 loops forever
        let mut emu = emulator_with_program(&[0b0000_111_111111111]);
        let res = emu.run_for(25);
        expect_that!(res.state, eq(&RunState::Running));
        expect_that!(res.steps, eq(25));
        expect_that!(res.registers.pc(), eq(0x3000));
    }

    #[gtest]
    pub fn test_reset_keeps_memory() {
        let mut emu = emulator_with_program(&[0x1021, HALT]);
        let _ = emu.run();
        emu.reset();
        expect_that!(emu.state(), eq(&RunState::Running));
        expect_that!(emu.registers().get(Reg::R0), eq(0));
        let res = emu.run();
        expect_that!(res.state, eq(&RunState::Halted));
        expect_that!(res.registers.get(Reg::R0), eq(1));
    }

    #[gtest]
    pub fn test_load_image_returns_origin() -> Result<()> {
        let mut emu = Emulator::new(BufferedIo::new());
        let origin = emu.load_image(&[0x4000, 0x1234, 0x5678])?;
        expect_that!(origin, eq(0x4000));
        expect_that!(emu.memory().slice(0x4000, 2), eq(&[0x1234u16, 0x5678][..]));
        Ok(())
    }

    struct BrokenOutput;
    impl IoProvider for BrokenOutput {
        fn has_input(&mut self) -> io::Result<bool> {
            Ok(false)
        }
        fn read_input(&mut self) -> io::Result<u8> {
            Err(io::Error::from(io::ErrorKind::UnexpectedEof))
        }
        fn write_output(&mut self, _byte: u8) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    #[gtest]
    pub fn test_output_failure_faults() -> Result<()> {
        let mut emu = Emulator::new(BrokenOutput);
        // OUT
        emu.load_image(&[0x3000, 0xF021, HALT])?;
        let res = emu.run();
        expect_that!(matches!(res.state, RunState::Faulted(Fault::IoProvider(_))), eq(true));
        expect_that!(res.registers.pc(), eq(0x3000));
        Ok(())
    }
}
