use crate::hardware::memory::PROGRAM_SECTION_START;
use std::fmt::{Debug, Display, Formatter};

/// Index of one of the eight general purpose registers `R0..R7`.
///
/// Constructed from a 3-bit instruction field, so it can never be out of range.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Reg(u8);

impl Reg {
    pub const R0: Self = Self(0);
    pub const R1: Self = Self(1);
    pub const R2: Self = Self(2);
    pub const R3: Self = Self(3);
    pub const R4: Self = Self(4);
    pub const R5: Self = Self(5);
    pub const R6: Self = Self(6);
    /// Link register for `JSR`, `JSRR` and `TRAP`.
    pub const R7: Self = Self(7);

    /// Takes the low three bits of `bits`.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "masked to three bits before the cast"
    )]
    pub const fn from_bits(bits: u16) -> Self {
        Self((bits & 0b111) as u8)
    }
    #[must_use]
    pub const fn index(self) -> u8 {
        self.0
    }
}

impl Display for Reg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// The condition code register, exactly one flag is set at any time.
///
/// Bit values match the `nzp` mask of the `BR` instruction.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionFlag {
    Pos = 1 << 0, // Positive
    Zero = 1 << 1,
    Neg = 1 << 2, // Negative
}

impl ConditionFlag {
    #[must_use]
    pub const fn bits(self) -> u16 {
        self as u16
    }
}

impl From<u16> for ConditionFlag {
    fn from(value: u16) -> Self {
        if value == 0 {
            Self::Zero
        } else if value >> 15 == 1 {
            // leftmost bit is 1 for negative numbers
            Self::Neg
        } else {
            Self::Pos
        }
    }
}

impl Display for ConditionFlag {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Neg => "N",
            Self::Zero => "Z",
            Self::Pos => "P",
        })
    }
}

/// General purpose registers, program counter and condition flag.
///
/// Arithmetic on register values wraps modulo 2^16, nothing signals an overflow.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Registers {
    general_purpose: [u16; 8],
    pc: u16,
    cond: ConditionFlag,
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl Registers {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            general_purpose: [0u16; 8],
            pc: PROGRAM_SECTION_START,
            cond: ConditionFlag::Zero,
        }
    }
    #[must_use]
    pub const fn get(&self, r: Reg) -> u16 {
        self.general_purpose[r.0 as usize]
    }
    pub const fn set(&mut self, r: Reg, value: u16) {
        self.general_purpose[r.0 as usize] = value;
    }
    #[must_use]
    pub const fn pc(&self) -> u16 {
        self.pc
    }
    pub const fn set_pc(&mut self, value: u16) {
        self.pc = value;
    }
    #[must_use]
    pub const fn flags(&self) -> ConditionFlag {
        self.cond
    }
    pub const fn set_flags(&mut self, flag: ConditionFlag) {
        self.cond = flag;
    }
    /// Sets the condition flag from the sign of `value`.
    pub fn update_flags(&mut self, value: u16) {
        self.cond = ConditionFlag::from(value);
    }
    /// Stores `value` in `r` and derives the condition flag from it.
    pub fn set_with_flags(&mut self, r: Reg, value: u16) {
        self.set(r, value);
        self.update_flags(value);
    }
}

impl Debug for Registers {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (idx, value) in self.general_purpose.iter().enumerate() {
            write!(f, "R{idx}: {value:#06X} ")?;
        }
        write!(f, "PC: {:#06X} COND: {}", self.pc, self.cond)
    }
}
