//! Machine state: memory, registers and the devices behind memory-mapped IO.
pub mod io_provider;
pub mod memory;
pub mod registers;

pub use io_provider::{BufferedIo, IoProvider};
pub use memory::{Memory, MemoryMappedIOLocations, PROGRAM_SECTION_START};
pub use registers::{ConditionFlag, Reg, Registers};
