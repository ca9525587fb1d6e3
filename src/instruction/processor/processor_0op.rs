//! 0OP instructions
use crate::error::{ErrorCode, RuntimeError};
use crate::fatal_error;
use crate::instruction::{Instruction, NextAddress};
use crate::text;
use crate::zmachine::header::HeaderField;
use crate::zmachine::ZMachine;

use super::{branch, store_result};

pub fn rtrue(zmachine: &mut ZMachine, _instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    zmachine.return_routine(1)
}

pub fn rfalse(zmachine: &mut ZMachine, _instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    zmachine.return_routine(0)
}

/// Print the string literal that follows the opcode
pub fn print(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    let ztext = zmachine.string_literal(instruction.address() + 1)?;
    let text = text::from_vec(zmachine, &ztext, false)?;
    zmachine.print(&text)?;
    Ok(NextAddress::Address(instruction.next_address() + (ztext.len() * 2)))
}

pub fn print_ret(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let ztext = zmachine.string_literal(instruction.address() + 1)?;
    let text = text::from_vec(zmachine, &ztext, false)?;
    zmachine.print(&text)?;
    zmachine.new_line()?;
    zmachine.return_routine(1)
}

pub fn nop(_zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    Ok(NextAddress::Address(instruction.next_address()))
}

/// SAVE result: a branch in V1-3, a stored 1/0 in V4
fn save_result(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
    success: bool,
) -> Result<NextAddress, RuntimeError> {
    if zmachine.version() < 4 {
        branch(zmachine, instruction, success)
    } else {
        store_result(zmachine, instruction, u16::from(success))?;
        Ok(NextAddress::Address(instruction.next_address()))
    }
}

/// The program counter stored with a save points at the SAVE
/// instruction's branch (V1-3) or store (V4) byte, so a restore can
/// deliver the restore result through the original instruction.
fn save_pc(zmachine: &ZMachine, instruction: &Instruction) -> Result<usize, RuntimeError> {
    if zmachine.version() < 4 {
        match instruction.branch() {
            Some(b) => Ok(b.address()),
            None => fatal_error!(
                ErrorCode::InvalidInstruction,
                "V1-3 SAVE should have a branch target"
            ),
        }
    } else {
        match instruction.store() {
            Some(r) => Ok(r.address()),
            None => fatal_error!(
                ErrorCode::InvalidInstruction,
                "V4 SAVE should have a store target"
            ),
        }
    }
}

pub fn save(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    let pc = save_pc(zmachine, instruction)?;
    match zmachine.save(pc) {
        Ok(_) => save_result(zmachine, instruction, true),
        Err(e) => {
            if e.is_recoverable() {
                save_result(zmachine, instruction, false)
            } else {
                Err(e)
            }
        }
    }
}

/// Resume at a restored V3 SAVE branch descriptor, taking the branch
/// as if the save had just succeeded
pub(super) fn restore_resume_branch(
    zmachine: &mut ZMachine,
    address: usize,
) -> Result<NextAddress, RuntimeError> {
    let b = zmachine.read_byte(address)?;
    let condition = b & 0x80 == 0x80;
    let (offset, length) = if b & 0x40 == 0x40 {
        ((b & 0x3f) as i16, 1)
    } else {
        let b2 = zmachine.read_byte(address + 1)?;
        let mut offset = (((b as u16 & 0x3f) << 8) | b2 as u16) as i16;
        // 14-bit signed offset
        if offset & 0x2000 == 0x2000 {
            offset = (offset as u16 | 0xC000) as i16;
        }
        (offset, 2)
    };

    if condition {
        match offset {
            0 => zmachine.return_routine(0),
            1 => zmachine.return_routine(1),
            _ => Ok(NextAddress::Address(
                ((address + length) as isize + offset as isize - 2) as usize,
            )),
        }
    } else {
        Ok(NextAddress::Address(address + length))
    }
}

/// Resume at a restored V4+ SAVE store byte, storing 2 to mark a
/// successful restore
pub(super) fn restore_resume_store(
    zmachine: &mut ZMachine,
    address: usize,
) -> Result<NextAddress, RuntimeError> {
    let variable = zmachine.read_byte(address)?;
    zmachine.set_variable(variable, 2)?;
    Ok(NextAddress::Address(address + 1))
}

pub fn restore(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    match zmachine.restore() {
        Ok(Some(address)) => {
            if zmachine.version() < 4 {
                restore_resume_branch(zmachine, address)
            } else {
                restore_resume_store(zmachine, address)
            }
        }
        Ok(None) => save_result(zmachine, instruction, false),
        Err(e) => {
            if e.is_recoverable() {
                save_result(zmachine, instruction, false)
            } else {
                Err(e)
            }
        }
    }
}

pub fn restart(zmachine: &mut ZMachine, _instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    Ok(NextAddress::Address(zmachine.restart()?))
}

pub fn ret_popped(
    zmachine: &mut ZMachine,
    _instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let value = zmachine.variable(0)?;
    zmachine.return_routine(value)
}

pub fn pop(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    zmachine.variable(0)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn catch(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    store_result(zmachine, instruction, zmachine.frame_count() as u16)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn quit(_zmachine: &mut ZMachine, _instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    Ok(NextAddress::Quit)
}

pub fn new_line(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    zmachine.new_line()?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn show_status(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    zmachine.show_status()?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn verify(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    let expected = zmachine.header_word(HeaderField::Checksum)?;
    let checksum = zmachine.checksum()?;
    branch(zmachine, instruction, expected == checksum)
}

pub fn piracy(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    branch(zmachine, instruction, true)
}
