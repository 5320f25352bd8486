//! Implemented operations for the LC 3.
//!
//! Every handler sees the program counter already incremented past the executed instruction.
//! Fallible memory reads happen before any register or memory is written.
use crate::emulator::instruction::{ConditionMask, Instruction, JsrTarget, Opcode, Operand};
use crate::emulator::trap_routines;
use crate::errors::Fault;
use crate::hardware::io_provider::IoProvider;
use crate::hardware::memory::Memory;
use crate::hardware::registers::{Reg, Registers};
use crate::numbers::sign_extend;
use std::ops::ControlFlow;

/// `Continue` to fetch the next instruction, `Break(Ok)` on halt, `Break(Err)` on a fault.
pub type ExecutionFlow = ControlFlow<Result<(), Fault>>;

/// Dispatches a decoded instruction fetched from `address` to its handler.
pub fn execute<P: IoProvider + ?Sized>(
    instruction: Instruction,
    address: u16,
    r: &mut Registers,
    memory: &mut Memory,
    io: &mut P,
) -> ExecutionFlow {
    match instruction {
        Instruction::Br { cond, pc_offset9 } => br(cond, pc_offset9, r),
        Instruction::Add { dst, src1, src2 } => add(dst, src1, src2, r),
        Instruction::Ld { dst, pc_offset9 } => ld(dst, pc_offset9, r, memory, io)?,
        Instruction::St { src, pc_offset9 } => st(src, pc_offset9, r, memory),
        Instruction::Jsr { target } => jsr(target, r),
        Instruction::And { dst, src1, src2 } => and(dst, src1, src2, r),
        Instruction::Ldr { dst, base, offset6 } => ldr(dst, base, offset6, r, memory, io)?,
        Instruction::Str { src, base, offset6 } => str(src, base, offset6, r, memory),
        Instruction::Rti => return illegal(Opcode::Rti, address),
        Instruction::Not { dst, src } => not(dst, src, r),
        Instruction::Ldi { dst, pc_offset9 } => ldi(dst, pc_offset9, r, memory, io)?,
        Instruction::Sti { src, pc_offset9 } => sti(src, pc_offset9, r, memory, io)?,
        Instruction::Jmp { base } => jmp_or_ret(base, r),
        Instruction::Reserved => return illegal(Opcode::Res, address),
        Instruction::Lea { dst, pc_offset9 } => lea(dst, pc_offset9, r),
        Instruction::Trap { trap_vect8 } => return trap_routines::trap(trap_vect8, r, memory, io),
    }
    ControlFlow::Continue(())
}

/// RTI and the reserved opcode: RTI needs supervisor mode, which is not modelled.
fn illegal(opcode: Opcode, address: u16) -> ExecutionFlow {
    ControlFlow::Break(Err(Fault::IllegalOpcode { opcode, address }))
}

/// Memory read which turns a provider failure into a fault.
pub(crate) fn read<P: IoProvider + ?Sized>(
    memory: &mut Memory,
    address: u16,
    io: &mut P,
) -> ControlFlow<Result<(), Fault>, u16> {
    match memory.read(address, io) {
        Ok(value) => ControlFlow::Continue(value),
        Err(e) => ControlFlow::Break(Err(Fault::from(e))),
    }
}

fn operand_value(src2: Operand, r: &Registers) -> u16 {
    match src2 {
        Operand::Register(sr2) => r.get(sr2),
        Operand::Immediate(imm5) => sign_extend(imm5, 5),
    }
}

/// ADD: Mathematical addition in 2 variants
/// - DR is set with result of SR 1 + SR 2
/// ```text
///  15__12__11_9__8_6___5___4_3__2_0_
/// | 0001 |  DR | SR1 | 0 | 00 | SR2 |
///  ---------------------------------
/// ```
/// - DR is set with result of SR 1 + sign extended immediate
/// ```text
///  15__12__11_9__8_6___5___4___0_
/// | 0001 |  DR | SR1 | 1 |  IMM5 |
///  ------------------------------
/// ```
pub fn add(dst: Reg, src1: Reg, src2: Operand, r: &mut Registers) {
    let value = r.get(src1).wrapping_add(operand_value(src2, r));
    r.set_with_flags(dst, value);
}
/// AND: bit-wise AND in 2 variants
/// - DR is set with result of SR 1 AND SR 2
/// ```text
///  15__12__11_9__8_6___5___4_3__2_0_
/// | 0101 |  DR | SR1 | 0 | 00 | SR2 |
///  ---------------------------------
/// ```
/// - DR is set with result of SR 1 AND sign extended immediate
/// ```text
///  15__12__11_9__8_6___5___4___0_
/// | 0101 |  DR | SR1 | 1 |  IMM5 |
///  ------------------------------
/// ```
pub fn and(dst: Reg, src1: Reg, src2: Operand, r: &mut Registers) {
    let value = r.get(src1) & operand_value(src2, r);
    r.set_with_flags(dst, value);
}

/// NOT: bit-wise complement of the value in SR
/// ```text
///  15__12__11_9__8_6___5___0_
/// | 1001 |  DR |  SR | 11111 |
///  --------------------------
/// ```
pub fn not(dst: Reg, src: Reg, r: &mut Registers) {
    let value = !r.get(src);
    r.set_with_flags(dst, value);
}
/// BR: Conditional Branch
/// This opcode adds the value of the sign extended offset to PC if the current
/// `ConditionFlag` matches a set bit of `n`, `z` or `p`. With no bit set it never branches.
/// ```text
///  15__12__11_9___8_______0_
/// | 0000 |  nzp | PCoffset9 |
///  -------------------------
/// ```
/// See [`crate::hardware::registers::ConditionFlag`]
pub fn br(cond: ConditionMask, pc_offset9: u16, r: &mut Registers) {
    if cond.matches(r.flags()) {
        r.set_pc(address_by_pc_offset(pc_offset9, r));
    }
}
/// JSR: Jump to Sub-Routine.
/// Two variants:
/// - JSR to `PCOffset11`
/// ```text
///  15__12__11_10_________0
/// | 0100 | 1 | PCOffset11 |
///  -----------------------
/// ```
/// - JSRR: JSR to location in `BaseR`
/// ```text
///  15__12__11_9__8___6___5____0_
/// | 0100 | 000 | BaseR | 000000 |
///  -----------------------------
/// ```
/// The former PC is saved in R7, `JSRR R7` jumps to the old R7.
pub fn jsr(target: JsrTarget, r: &mut Registers) {
    let temp_pc = r.pc();
    r.set_pc(match target {
        JsrTarget::PcOffset(pc_offset11) => temp_pc.wrapping_add(sign_extend(pc_offset11, 11)),
        JsrTarget::Register(base) => r.get(base),
    });
    r.set(Reg::R7, temp_pc);
}
/// JMP or RET operation.
/// - JMP sets the PC to the value of register `BaseR`
/// ```text
///  15__12__11_9___8_6____5____0_
/// | 1100 | 000 | BaseR | 000000 |
///  -----------------------------
/// ```
/// - RET same as JMP, but special case for returning from JSR where former PC is saved in R7.
/// ```text
///  15__12__11_9__8_6___5____0_
/// | 1100 | 000 | 111 | 000000 |
///  ---------------------------
/// ```
pub fn jmp_or_ret(base: Reg, r: &mut Registers) {
    r.set_pc(r.get(base));
}

/// LD: Loads content of memory address of PC + sign extended offset into DR.
/// ```text
///  15__12__11_9___8_______0_
/// | 0010 |  DR  | PCoffset9 |
///  -------------------------
/// ```
pub fn ld<P: IoProvider + ?Sized>(
    dst: Reg,
    pc_offset9: u16,
    r: &mut Registers,
    memory: &mut Memory,
    io: &mut P,
) -> ControlFlow<Result<(), Fault>> {
    let value = read(memory, address_by_pc_offset(pc_offset9, r), io)?;
    r.set_with_flags(dst, value);
    ControlFlow::Continue(())
}

/// LDI: Load indirect.
/// Calculates memory address of PC + sign extended offset and reads another address from there,
/// the content of the memory at that indirectly loaded address is put into DR.
/// ```text
///  15__12__11_9___8_______0_
/// | 1010 |  DR  | PCoffset9 |
///  -------------------------
/// ```
pub fn ldi<P: IoProvider + ?Sized>(
    dst: Reg,
    pc_offset9: u16,
    r: &mut Registers,
    memory: &mut Memory,
    io: &mut P,
) -> ControlFlow<Result<(), Fault>> {
    let value_address = read(memory, address_by_pc_offset(pc_offset9, r), io)?;
    let value = read(memory, value_address, io)?;
    r.set_with_flags(dst, value);
    ControlFlow::Continue(())
}
/// LDR: Load address from base register and adds sign extended offset to load the memory content
/// from there into DR.
/// ```text
///  15__12__11_9__8___6____5____0_
/// | 0110 |  DR | BaseR | offset6 |
///  ------------------------------
/// ```
pub fn ldr<P: IoProvider + ?Sized>(
    dst: Reg,
    base: Reg,
    offset6: u16,
    r: &mut Registers,
    memory: &mut Memory,
    io: &mut P,
) -> ControlFlow<Result<(), Fault>> {
    let value = read(memory, address_by_base_offset(base, offset6, r), io)?;
    r.set_with_flags(dst, value);
    ControlFlow::Continue(())
}

fn address_by_pc_offset(pc_offset9: u16, r: &Registers) -> u16 {
    r.pc().wrapping_add(sign_extend(pc_offset9, 9))
}
fn address_by_base_offset(base: Reg, offset6: u16, r: &Registers) -> u16 {
    r.get(base).wrapping_add(sign_extend(offset6, 6))
}

/// LEA: Load Effective Address loads PC + sign extended offset into DR.
/// ```text
///  15__12__11_9___8_______0_
/// | 1110 |  DR  | PCoffset9 |
///  -------------------------
/// ```
pub fn lea(dst: Reg, pc_offset9: u16, r: &mut Registers) {
    let address = address_by_pc_offset(pc_offset9, r);
    r.set_with_flags(dst, address);
}
/// ST: Store. The contents of the SR are written to memory address PC + sign extended offset.
/// ```text
///  15__12__11_9___8_______0_
/// | 0011 |  SR  | PCoffset9 |
///  -------------------------
/// ```
pub fn st(src: Reg, pc_offset9: u16, r: &Registers, memory: &mut Memory) {
    memory.write(address_by_pc_offset(pc_offset9, r), r.get(src));
}
/// STI: Store Indirect. The contents of the SR are written to the address which is loaded from
/// memory address PC + sign extended offset.
/// ```text
///  15__12__11_9___8_______0_
/// | 1011 |  SR  | PCoffset9 |
///  -------------------------
/// ```
pub fn sti<P: IoProvider + ?Sized>(
    src: Reg,
    pc_offset9: u16,
    r: &Registers,
    memory: &mut Memory,
    io: &mut P,
) -> ControlFlow<Result<(), Fault>> {
    let store_address = read(memory, address_by_pc_offset(pc_offset9, r), io)?;
    memory.write(store_address, r.get(src));
    ControlFlow::Continue(())
}
/// STR: Store contents of SR to memory address of base register plus sign extended offset.
/// ```text
///  15__12__11_9__8___6____5____0_
/// | 0111 |  SR | BaseR | offset6 |
///  ------------------------------
/// ```
pub fn str(src: Reg, base: Reg, offset6: u16, r: &Registers, memory: &mut Memory) {
    memory.write(address_by_base_offset(base, offset6, r), r.get(src));
}
