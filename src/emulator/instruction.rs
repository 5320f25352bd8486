//! Decoding of LC-3 instruction words.
//!
//! Bits `[15:12]` are always the opcode, the layout of the remaining twelve bits
//! depends on the opcode. [`Instruction`] carries exactly the fields its opcode defines,
//! offsets and immediates are kept as raw field bits and sign extended on execution.
use crate::hardware::registers::{ConditionFlag, Reg};
use crate::numbers::{as_signed, sign_extend};
use std::fmt::{Display, Formatter};

/// The 16 opcodes, discriminant equals the value of bits `[15:12]`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Br = 0b0000,
    Add = 0b0001,
    Ld = 0b0010,
    St = 0b0011,
    Jsr = 0b0100,
    And = 0b0101,
    Ldr = 0b0110,
    Str = 0b0111,
    Rti = 0b1000,
    Not = 0b1001,
    Ldi = 0b1010,
    Sti = 0b1011,
    Jmp = 0b1100,
    Res = 0b1101,
    Lea = 0b1110,
    Trap = 0b1111,
}

impl Opcode {
    #[must_use]
    pub const fn from_word(word: u16) -> Self {
        match word >> 12 {
            0b0000 => Self::Br,
            0b0001 => Self::Add,
            0b0010 => Self::Ld,
            0b0011 => Self::St,
            0b0100 => Self::Jsr,
            0b0101 => Self::And,
            0b0110 => Self::Ldr,
            0b0111 => Self::Str,
            0b1000 => Self::Rti,
            0b1001 => Self::Not,
            0b1010 => Self::Ldi,
            0b1011 => Self::Sti,
            0b1100 => Self::Jmp,
            0b1101 => Self::Res,
            0b1110 => Self::Lea,
            // the shift leaves four bits, so only 0b1111 is left
            _ => Self::Trap,
        }
    }
    const fn bits(self) -> u16 {
        (self as u16) << 12
    }
}

/// The `nzp` bits of a `BR` instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConditionMask {
    pub n: bool,
    pub z: bool,
    pub p: bool,
}

impl ConditionMask {
    /// Unconditional branch, assembled from plain `BR`.
    pub const ALWAYS: Self = Self {
        n: true,
        z: true,
        p: true,
    };

    const fn from_bits(bits: u16) -> Self {
        Self {
            n: bits & 0b100 != 0,
            z: bits & 0b010 != 0,
            p: bits & 0b001 != 0,
        }
    }
    const fn bits(self) -> u16 {
        ((self.n as u16) << 2) | ((self.z as u16) << 1) | (self.p as u16)
    }
    /// True if the bit for the current condition flag is set, an empty mask never matches.
    #[must_use]
    pub const fn matches(self, flag: ConditionFlag) -> bool {
        self.bits() & flag.bits() != 0
    }
}

/// Second source operand of `ADD` and `AND`, selected by bit 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    /// `SR2` in bits `[2:0]`
    Register(Reg),
    /// `imm5` in bits `[4:0]`, not yet sign extended
    Immediate(u16),
}

/// Jump target of `JSR` (bit 11 set) or `JSRR` (bit 11 clear).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsrTarget {
    /// `PCoffset11` in bits `[10:0]`, not yet sign extended
    PcOffset(u16),
    /// `BaseR` in bits `[8:6]`
    Register(Reg),
}

/// A decoded instruction, one variant per opcode.
///
/// `Rti` and `Reserved` carry no operands, they are rejected on execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    Br { cond: ConditionMask, pc_offset9: u16 },
    Add { dst: Reg, src1: Reg, src2: Operand },
    Ld { dst: Reg, pc_offset9: u16 },
    St { src: Reg, pc_offset9: u16 },
    Jsr { target: JsrTarget },
    And { dst: Reg, src1: Reg, src2: Operand },
    Ldr { dst: Reg, base: Reg, offset6: u16 },
    Str { src: Reg, base: Reg, offset6: u16 },
    Rti,
    Not { dst: Reg, src: Reg },
    Ldi { dst: Reg, pc_offset9: u16 },
    Sti { src: Reg, pc_offset9: u16 },
    Jmp { base: Reg },
    Reserved,
    Lea { dst: Reg, pc_offset9: u16 },
    Trap { trap_vect8: u8 },
}

/// Gives the value of only the specified bit range.
///
/// # Parameters
/// - `from`: starting index
/// - `to`: end index (inclusive), must be greater or equal to `from`
const fn get_bit_range(word: u16, from: u8, to: u8) -> u16 {
    debug_assert!(to >= from, "wrong direction of from and to");
    debug_assert!(to < 16, "index to u16 is greater than maximum value 15");
    (word >> from) & ((1 << (to - from + 1)) - 1)
}
const fn get_bit(word: u16, index: u8) -> bool {
    get_bit_range(word, index, index) == 1
}
const fn reg_at(word: u16, from: u8) -> Reg {
    Reg::from_bits(word >> from)
}
const fn reg_bits(r: Reg, at: u8) -> u16 {
    (r.index() as u16) << at
}
const fn operand_from(word: u16) -> Operand {
    if get_bit(word, 5) {
        Operand::Immediate(get_bit_range(word, 0, 4))
    } else {
        Operand::Register(reg_at(word, 0))
    }
}
const fn operand_bits(operand: Operand) -> u16 {
    match operand {
        Operand::Register(r) => reg_bits(r, 0),
        Operand::Immediate(imm5) => (1 << 5) | (imm5 & 0b1_1111),
    }
}

impl Instruction {
    /// Extracts the fields `word`'s opcode defines, every word decodes.
    #[must_use]
    pub const fn decode(word: u16) -> Self {
        let pc_offset9 = get_bit_range(word, 0, 8);
        let offset6 = get_bit_range(word, 0, 5);
        match Opcode::from_word(word) {
            Opcode::Br => Self::Br {
                cond: ConditionMask::from_bits(get_bit_range(word, 9, 11)),
                pc_offset9,
            },
            Opcode::Add => Self::Add {
                dst: reg_at(word, 9),
                src1: reg_at(word, 6),
                src2: operand_from(word),
            },
            Opcode::Ld => Self::Ld {
                dst: reg_at(word, 9),
                pc_offset9,
            },
            Opcode::St => Self::St {
                src: reg_at(word, 9),
                pc_offset9,
            },
            Opcode::Jsr => Self::Jsr {
                target: if get_bit(word, 11) {
                    JsrTarget::PcOffset(get_bit_range(word, 0, 10))
                } else {
                    JsrTarget::Register(reg_at(word, 6))
                },
            },
            Opcode::And => Self::And {
                dst: reg_at(word, 9),
                src1: reg_at(word, 6),
                src2: operand_from(word),
            },
            Opcode::Ldr => Self::Ldr {
                dst: reg_at(word, 9),
                base: reg_at(word, 6),
                offset6,
            },
            Opcode::Str => Self::Str {
                src: reg_at(word, 9),
                base: reg_at(word, 6),
                offset6,
            },
            Opcode::Rti => Self::Rti,
            Opcode::Not => Self::Not {
                dst: reg_at(word, 9),
                src: reg_at(word, 6),
            },
            Opcode::Ldi => Self::Ldi {
                dst: reg_at(word, 9),
                pc_offset9,
            },
            Opcode::Sti => Self::Sti {
                src: reg_at(word, 9),
                pc_offset9,
            },
            Opcode::Jmp => Self::Jmp {
                base: reg_at(word, 6),
            },
            Opcode::Res => Self::Reserved,
            Opcode::Lea => Self::Lea {
                dst: reg_at(word, 9),
                pc_offset9,
            },
            Opcode::Trap => {
                #[expect(
                    clippy::cast_possible_truncation,
                    reason = "trapvect8 is masked to eight bits"
                )]
                let trap_vect8 = get_bit_range(word, 0, 7) as u8;
                Self::Trap { trap_vect8 }
            }
        }
    }

    /// Builds the instruction word, unused bits are zero except the `11111` of `NOT`.
    #[must_use]
    pub const fn encode(self) -> u16 {
        let opcode = self.opcode().bits();
        let fields = match self {
            Self::Br { cond, pc_offset9 } => (cond.bits() << 9) | (pc_offset9 & 0x1FF),
            Self::Add { dst, src1, src2 } | Self::And { dst, src1, src2 } => {
                reg_bits(dst, 9) | reg_bits(src1, 6) | operand_bits(src2)
            }
            Self::Ld { dst: r, pc_offset9 }
            | Self::St { src: r, pc_offset9 }
            | Self::Ldi { dst: r, pc_offset9 }
            | Self::Sti { src: r, pc_offset9 }
            | Self::Lea { dst: r, pc_offset9 } => reg_bits(r, 9) | (pc_offset9 & 0x1FF),
            Self::Jsr {
                target: JsrTarget::PcOffset(pc_offset11),
            } => (1 << 11) | (pc_offset11 & 0x7FF),
            Self::Jsr {
                target: JsrTarget::Register(base),
            }
            | Self::Jmp { base } => reg_bits(base, 6),
            Self::Ldr {
                dst: r,
                base,
                offset6,
            }
            | Self::Str {
                src: r,
                base,
                offset6,
            } => reg_bits(r, 9) | reg_bits(base, 6) | (offset6 & 0x3F),
            Self::Not { dst, src } => reg_bits(dst, 9) | reg_bits(src, 6) | 0b11_1111,
            Self::Trap { trap_vect8 } => trap_vect8 as u16,
            Self::Rti | Self::Reserved => 0,
        };
        opcode | fields
    }

    #[must_use]
    pub const fn opcode(self) -> Opcode {
        match self {
            Self::Br { .. } => Opcode::Br,
            Self::Add { .. } => Opcode::Add,
            Self::Ld { .. } => Opcode::Ld,
            Self::St { .. } => Opcode::St,
            Self::Jsr { .. } => Opcode::Jsr,
            Self::And { .. } => Opcode::And,
            Self::Ldr { .. } => Opcode::Ldr,
            Self::Str { .. } => Opcode::Str,
            Self::Rti => Opcode::Rti,
            Self::Not { .. } => Opcode::Not,
            Self::Ldi { .. } => Opcode::Ldi,
            Self::Sti { .. } => Opcode::Sti,
            Self::Jmp { .. } => Opcode::Jmp,
            Self::Reserved => Opcode::Res,
            Self::Lea { .. } => Opcode::Lea,
            Self::Trap { .. } => Opcode::Trap,
        }
    }
}

impl From<u16> for Instruction {
    fn from(bits: u16) -> Self {
        Self::decode(bits)
    }
}

struct Offset(u16, u8);
impl Display for Offset {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", as_signed(sign_extend(self.0, self.1)))
    }
}

impl Display for Operand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Register(r) => write!(f, "{r}"),
            Self::Immediate(imm5) => write!(f, "{}", Offset(imm5, 5)),
        }
    }
}

/// Assembly-like rendering, used for tracing.
impl Display for Instruction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match *self {
            Self::Br { cond, pc_offset9 } => {
                if cond == ConditionMask::default() {
                    return f.write_str("NOP");
                }
                f.write_str("BR")?;
                for (set, name) in [(cond.n, "n"), (cond.z, "z"), (cond.p, "p")] {
                    if set {
                        f.write_str(name)?;
                    }
                }
                write!(f, " {}", Offset(pc_offset9, 9))
            }
            Self::Add { dst, src1, src2 } => write!(f, "ADD {dst}, {src1}, {src2}"),
            Self::And { dst, src1, src2 } => write!(f, "AND {dst}, {src1}, {src2}"),
            Self::Ld { dst, pc_offset9 } => write!(f, "LD {dst}, {}", Offset(pc_offset9, 9)),
            Self::Ldi { dst, pc_offset9 } => write!(f, "LDI {dst}, {}", Offset(pc_offset9, 9)),
            Self::Lea { dst, pc_offset9 } => write!(f, "LEA {dst}, {}", Offset(pc_offset9, 9)),
            Self::St { src, pc_offset9 } => write!(f, "ST {src}, {}", Offset(pc_offset9, 9)),
            Self::Sti { src, pc_offset9 } => write!(f, "STI {src}, {}", Offset(pc_offset9, 9)),
            Self::Jsr {
                target: JsrTarget::PcOffset(pc_offset11),
            } => write!(f, "JSR {}", Offset(pc_offset11, 11)),
            Self::Jsr {
                target: JsrTarget::Register(base),
            } => write!(f, "JSRR {base}"),
            Self::Ldr { dst, base, offset6 } => {
                write!(f, "LDR {dst}, {base}, {}", Offset(offset6, 6))
            }
            Self::Str { src, base, offset6 } => {
                write!(f, "STR {src}, {base}, {}", Offset(offset6, 6))
            }
            Self::Not { dst, src } => write!(f, "NOT {dst}, {src}"),
            Self::Jmp { base: Reg::R7 } => f.write_str("RET"),
            Self::Jmp { base } => write!(f, "JMP {base}"),
            Self::Trap { trap_vect8 } => write!(f, "TRAP x{trap_vect8:02X}"),
            Self::Rti => f.write_str("RTI"),
            Self::Reserved => f.write_str("RES"),
        }
    }
}
