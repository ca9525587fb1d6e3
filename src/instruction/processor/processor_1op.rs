//! 1OP instructions
use crate::error::RuntimeError;
use crate::instruction::{Instruction, NextAddress};
use crate::object;
use crate::text;
use crate::zmachine::ZMachine;

use super::{branch, call_fn, operand_values, store_result};

pub fn jz(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    branch(zmachine, instruction, operands[0] == 0)
}

pub fn get_sibling(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let sibling = object::sibling(zmachine, operands[0] as usize)?;
    store_result(zmachine, instruction, sibling as u16)?;
    branch(zmachine, instruction, sibling != 0)
}

pub fn get_child(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let child = object::child(zmachine, operands[0] as usize)?;
    store_result(zmachine, instruction, child as u16)?;
    branch(zmachine, instruction, child != 0)
}

pub fn get_parent(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let parent = object::parent(zmachine, operands[0] as usize)?;
    store_result(zmachine, instruction, parent as u16)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn get_prop_len(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let length = object::property_length(zmachine, operands[0] as usize)?;
    store_result(zmachine, instruction, length as u16)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn inc(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let variable = operands[0] as u8;
    let value = zmachine.peek_variable(variable)? as i16;
    let (new_value, _) = value.overflowing_add(1);
    zmachine.set_variable_indirect(variable, new_value as u16)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn dec(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let variable = operands[0] as u8;
    let value = zmachine.peek_variable(variable)? as i16;
    let (new_value, _) = value.overflowing_sub(1);
    zmachine.set_variable_indirect(variable, new_value as u16)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn print_addr(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let text = text::as_text(zmachine, operands[0] as usize, false)?;
    zmachine.print(&text)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn call_1s(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let address = zmachine.packed_routine_address(operands[0])?;
    call_fn(
        zmachine,
        address,
        instruction.next_address(),
        &[],
        instruction.store().copied(),
    )
}

pub fn remove_obj(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    object::remove_object(zmachine, operands[0] as usize)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn print_obj(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let ztext = object::short_name(zmachine, operands[0] as usize)?;
    let text = text::from_vec(zmachine, &ztext, false)?;
    zmachine.print(&text)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn ret(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    zmachine.return_routine(operands[0])
}

pub fn jump(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let address = (instruction.next_address() as isize) + (operands[0] as i16 as isize) - 2;
    Ok(NextAddress::Address(address as usize))
}

pub fn print_paddr(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let address = zmachine.packed_string_address(operands[0])?;
    let text = text::as_text(zmachine, address, false)?;
    zmachine.print(&text)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn load(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let value = zmachine.peek_variable(operands[0] as u8)?;
    store_result(zmachine, instruction, value)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn not(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    store_result(zmachine, instruction, !operands[0])?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn call_1n(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let address = zmachine.packed_routine_address(operands[0])?;
    call_fn(zmachine, address, instruction.next_address(), &[], None)
}
