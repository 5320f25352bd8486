//! Trap service routines handled by the emulator instead of LC-3 OS code.
use crate::emulator::opcodes::{ExecutionFlow, read};
use crate::errors::Fault;
use crate::hardware::io_provider::IoProvider;
use crate::hardware::memory::Memory;
use crate::hardware::registers::{Reg, Registers};
use crate::numbers::zero_extend;
use log::{debug, info};
use std::io;
use std::ops::ControlFlow;

/// Trap vectors serviced through the [`IoProvider`].
///
/// `PUTSP` (`0x24`) and every other vector are not serviced, they run the routine
/// whose address is stored in the trap vector table.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, enumn::N)]
pub enum TrapVector {
    GetC = 0x20,
    Out = 0x21,
    PutS = 0x22,
    In = 0x23,
    Halt = 0x25,
}

/// TRAP: saves the return address in R7 and runs the service for `trap_vect8`.
/// ```text
///  15__12__11__8___7_______0_
/// | 1111 | 0000 | trapvect8 |
///  -------------------------
/// ```
/// Serviced vectors return to the instruction after the TRAP.
/// `HALT` loads PC from the vector table and stops execution.
pub fn trap<P: IoProvider + ?Sized>(
    trap_vect8: u8,
    regs: &mut Registers,
    mem: &mut Memory,
    io: &mut P,
) -> ExecutionFlow {
    let return_address = regs.pc();
    let routine_address = read(mem, zero_extend(trap_vect8), io)?;
    let Some(vector) = TrapVector::n(trap_vect8) else {
        debug!("TRAP x{trap_vect8:02X}: jumping to routine at {routine_address:#06X}");
        regs.set(Reg::R7, return_address);
        regs.set_pc(routine_address);
        return ControlFlow::Continue(());
    };
    debug!("TRAP x{trap_vect8:02X}: servicing {vector:?}");
    match vector {
        TrapVector::GetC => get_c(regs, io)?,
        TrapVector::Out => out(regs, io)?,
        TrapVector::PutS => put_s(regs, mem, io)?,
        TrapVector::In => in_trap(regs, io)?,
        TrapVector::Halt => {
            regs.set(Reg::R7, return_address);
            regs.set_pc(routine_address);
            return halt();
        }
    }
    regs.set(Reg::R7, return_address);
    ControlFlow::Continue(())
}

fn read_character<P: IoProvider + ?Sized>(io: &mut P) -> ControlFlow<Result<(), Fault>, u8> {
    match io.read_input() {
        Ok(c) => ControlFlow::Continue(c),
        Err(e) => wrap_io_error_in_cf(&e),
    }
}

/// GETC: Read a single character from the keyboard. The character is not echoed onto the console.
///
/// Its ASCII code is copied into R0. The high eight bits of R0 are cleared.
pub fn get_c<P: IoProvider + ?Sized>(
    regs: &mut Registers,
    io: &mut P,
) -> ControlFlow<Result<(), Fault>> {
    let c = read_character(io)?;
    regs.set(Reg::R0, u16::from(c));
    ControlFlow::Continue(())
}

/// IN: Print a prompt on the screen and read a single character echoed back from the keyboard.
///
/// Otherwise, like 0x20 GETC. The prompt stays on the console if reading fails.
pub fn in_trap<P: IoProvider + ?Sized>(
    regs: &mut Registers,
    io: &mut P,
) -> ControlFlow<Result<(), Fault>> {
    write_str_out(b"Input: ", io)?;
    let c = read_character(io)?;
    write_str_out(&[c], io)?;
    regs.set(Reg::R0, u16::from(c));
    ControlFlow::Continue(())
}

/// OUT: Write a character in R0[7:0] to the console display.
pub fn out<P: IoProvider + ?Sized>(regs: &Registers, io: &mut P) -> ControlFlow<Result<(), Fault>> {
    write_str_out(&[low_byte(regs.get(Reg::R0))], io)
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "Truncation is what is expected here"
)]
const fn low_byte(word: u16) -> u8 {
    word as u8
}

/// PUTS: print null-delimited char* from register 0's address, one character per word.
///
/// Reads stop at the end of memory if no terminating zero word is found.
pub fn put_s<P: IoProvider + ?Sized>(
    regs: &Registers,
    mem: &Memory,
    io: &mut P,
) -> ControlFlow<Result<(), Fault>> {
    let start = regs.get(Reg::R0);
    let s: Vec<u8> = (start..=u16::MAX)
        .map(|address| mem.peek(address))
        .take_while(|word| *word != 0)
        .map(low_byte)
        .collect();
    write_str_out(&s, io)
}

/// HALT: End program.
pub fn halt() -> ControlFlow<Result<(), Fault>> {
    info!("Program halted");
    ControlFlow::Break(Ok(()))
}

fn write_str_out<P: IoProvider + ?Sized>(
    message: &[u8],
    io: &mut P,
) -> ControlFlow<Result<(), Fault>> {
    for byte in message {
        if let Err(e) = io.write_output(*byte) {
            return wrap_io_error_in_cf(&e);
        }
    }
    ControlFlow::Continue(())
}

fn wrap_io_error_in_cf<C>(error: &io::Error) -> ControlFlow<Result<(), Fault>, C> {
    ControlFlow::Break(Err(Fault::IoProvider(error.to_string())))
}
