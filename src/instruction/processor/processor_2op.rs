//! 2OP instructions
use crate::error::{ErrorCode, RuntimeError};
use crate::fatal_error;
use crate::instruction::{Instruction, NextAddress};
use crate::object;
use crate::zmachine::ZMachine;

use super::{branch, call_fn, operand_values, store_result};

pub fn je(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let mut equal = false;
    for o in &operands[1..] {
        if operands[0] as i16 == *o as i16 {
            equal = true;
        }
    }
    branch(zmachine, instruction, equal)
}

pub fn jl(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    branch(
        zmachine,
        instruction,
        (operands[0] as i16) < (operands[1] as i16),
    )
}

pub fn jg(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    branch(
        zmachine,
        instruction,
        (operands[0] as i16) > (operands[1] as i16),
    )
}

pub fn dec_chk(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let variable = operands[0] as u8;
    let value = zmachine.peek_variable(variable)? as i16;
    let (new_value, _) = value.overflowing_sub(1);
    zmachine.set_variable_indirect(variable, new_value as u16)?;
    branch(zmachine, instruction, new_value < operands[1] as i16)
}

pub fn inc_chk(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let variable = operands[0] as u8;
    let value = zmachine.peek_variable(variable)? as i16;
    let (new_value, _) = value.overflowing_add(1);
    zmachine.set_variable_indirect(variable, new_value as u16)?;
    branch(zmachine, instruction, new_value > operands[1] as i16)
}

pub fn jin(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let parent = object::parent(zmachine, operands[0] as usize)?;
    branch(zmachine, instruction, parent == operands[1] as usize)
}

pub fn test(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    branch(
        zmachine,
        instruction,
        operands[0] & operands[1] == operands[1],
    )
}

pub fn or(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let mut result = operands[0];
    for o in &operands[1..] {
        result |= *o;
    }
    store_result(zmachine, instruction, result)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn and(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let mut result = operands[0];
    for o in &operands[1..] {
        result &= *o;
    }
    store_result(zmachine, instruction, result)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn test_attr(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let condition = object::attribute(zmachine, operands[0] as usize, operands[1] as u8)?;
    branch(zmachine, instruction, condition)
}

pub fn set_attr(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    object::set_attribute(zmachine, operands[0] as usize, operands[1] as u8)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn clear_attr(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    object::clear_attribute(zmachine, operands[0] as usize, operands[1] as u8)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn store(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    zmachine.set_variable_indirect(operands[0] as u8, operands[1])?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn insert_obj(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    object::insert_object(zmachine, operands[0] as usize, operands[1] as usize)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn loadw(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let address =
        (operands[0] as isize + ((operands[1] as i16 as isize) * 2)) as usize;
    let value = zmachine.read_word(address)?;
    store_result(zmachine, instruction, value)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn loadb(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let address = (operands[0] as isize + (operands[1] as i16 as isize)) as usize;
    let value = zmachine.read_byte(address)?;
    store_result(zmachine, instruction, value as u16)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn get_prop(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let value = if operands[0] == 0 {
        0
    } else {
        object::property(zmachine, operands[0] as usize, operands[1] as u8)?
    };
    store_result(zmachine, instruction, value)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn get_prop_addr(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let value = if operands[0] == 0 {
        0
    } else {
        object::property_data_address(zmachine, operands[0] as usize, operands[1] as u8)?
    };
    store_result(zmachine, instruction, value as u16)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn get_next_prop(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let value = if operands[0] == 0 {
        0
    } else {
        object::next_property(zmachine, operands[0] as usize, operands[1] as u8)?
    };
    store_result(zmachine, instruction, value as u16)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn add(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let mut value = operands[0] as i16;
    for o in &operands[1..] {
        let (result, _) = value.overflowing_add(*o as i16);
        value = result;
    }
    store_result(zmachine, instruction, value as u16)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn sub(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let mut value = operands[0] as i16;
    for o in &operands[1..] {
        let (result, _) = value.overflowing_sub(*o as i16);
        value = result;
    }
    store_result(zmachine, instruction, value as u16)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn mul(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let mut value = operands[0] as i16;
    for o in &operands[1..] {
        let (result, _) = value.overflowing_mul(*o as i16);
        value = result;
    }
    store_result(zmachine, instruction, value as u16)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn div(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    if operands[1] == 0 {
        return fatal_error!(ErrorCode::DivideByZero, "Division by 0");
    }

    let (value, _) = (operands[0] as i16).overflowing_div(operands[1] as i16);
    store_result(zmachine, instruction, value as u16)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn modulus(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    if operands[1] == 0 {
        return fatal_error!(ErrorCode::DivideByZero, "Modulo by 0");
    }

    let (value, _) = (operands[0] as i16).overflowing_rem(operands[1] as i16);
    store_result(zmachine, instruction, value as u16)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn call_2s(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let address = zmachine.packed_routine_address(operands[0])?;
    call_fn(
        zmachine,
        address,
        instruction.next_address(),
        &operands[1..],
        instruction.store().copied(),
    )
}

pub fn call_2n(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let address = zmachine.packed_routine_address(operands[0])?;
    call_fn(
        zmachine,
        address,
        instruction.next_address(),
        &operands[1..],
        None,
    )
}

pub fn set_colour(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    zmachine.set_colour(operands[0], operands[1])?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn throw(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    zmachine.throw(operands[1], operands[0])
}
