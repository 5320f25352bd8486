//! # LC-3 Virtual Machine.
//!
//! `lc3-vm` executes LC-3 object images. Programs are loaded into an
//! [`emulator::Emulator`], which owns memory, registers and an [`hardware::IoProvider`]
//! for the console and the keyboard registers.
//!
//!  # Example
//! ```
//! use lc3_vm::emulator::{Emulator, RunState};
//! use lc3_vm::hardware::BufferedIo;
//!
//! let mut emu = Emulator::new(BufferedIo::new());
//! // .ORIG x3000, ADD R0, R0, #4, OUT, HALT
//! emu.load_image(&[0x3000, 0x1024, 0xF021, 0xF025]).unwrap();
//! let result = emu.run();
//! assert_eq!(result.state, RunState::Halted);
//! assert_eq!(emu.io().output(), &[4]);
//! ```
//! # Errors
//! - Loading fails for images missing the `.ORIG` header or running past the end of memory
//! - Execution faults on the reserved opcodes and on IO provider failures

pub mod emulator;
pub mod errors;
pub mod hardware;
pub mod numbers;
pub mod terminal;
