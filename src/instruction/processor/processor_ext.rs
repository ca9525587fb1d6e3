//! EXT instructions
use crate::error::{ErrorCode, RuntimeError};
use crate::instruction::{Instruction, NextAddress};
use crate::zmachine::ZMachine;
use crate::{fatal_error, recoverable_error};

use super::processor_0op::restore_resume_store;
use super::{operand_values, store_result};

fn save_pc(instruction: &Instruction) -> Result<usize, RuntimeError> {
    match instruction.store() {
        Some(r) => Ok(r.address()),
        None => fatal_error!(
            ErrorCode::InvalidInstruction,
            "SAVE should have a store target"
        ),
    }
}

pub fn save(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    if !operands.is_empty() {
        // Auxiliary table saves are an optional part of the standard
        return recoverable_error!(
            ErrorCode::UnimplementedInstruction,
            "SAVE with an auxiliary table is not supported"
        );
    }

    let pc = save_pc(instruction)?;
    let success = match zmachine.save(pc) {
        Ok(_) => true,
        Err(e) => {
            if e.is_recoverable() {
                false
            } else {
                return Err(e);
            }
        }
    };
    store_result(zmachine, instruction, u16::from(success))?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn restore(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    if !operands.is_empty() {
        return recoverable_error!(
            ErrorCode::UnimplementedInstruction,
            "RESTORE with an auxiliary table is not supported"
        );
    }

    match zmachine.restore() {
        Ok(Some(address)) => restore_resume_store(zmachine, address),
        Ok(None) => {
            store_result(zmachine, instruction, 0)?;
            Ok(NextAddress::Address(instruction.next_address()))
        }
        Err(e) => {
            if e.is_recoverable() {
                store_result(zmachine, instruction, 0)?;
                Ok(NextAddress::Address(instruction.next_address()))
            } else {
                Err(e)
            }
        }
    }
}

pub fn log_shift(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let value = operands[0];
    let places = operands[1] as i16;
    let result = if places == 0 {
        value
    } else if places < 0 && places > -16 {
        value >> places.unsigned_abs()
    } else if places > 0 && places < 16 {
        value << places
    } else {
        return recoverable_error!(
            ErrorCode::InvalidShift,
            "LOG_SHIFT places {} out of range [-15..15]",
            places
        );
    };

    store_result(zmachine, instruction, result)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn art_shift(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let value = operands[0] as i16;
    let places = operands[1] as i16;
    let result = if places == 0 {
        value
    } else if places < 0 && places > -16 {
        value >> places.unsigned_abs()
    } else if places > 0 && places < 16 {
        value << places
    } else {
        return recoverable_error!(
            ErrorCode::InvalidShift,
            "ART_SHIFT places {} out of range [-15..15]",
            places
        );
    };

    store_result(zmachine, instruction, result as u16)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn set_font(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let previous = zmachine.set_font(operands[0])?;
    store_result(zmachine, instruction, previous)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn save_undo(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let pc = save_pc(instruction)?;
    zmachine.save_undo(pc)?;
    store_result(zmachine, instruction, 1)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn restore_undo(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    match zmachine.restore_undo() {
        Ok(Some(address)) => restore_resume_store(zmachine, address),
        Ok(None) => {
            store_result(zmachine, instruction, 0)?;
            Ok(NextAddress::Address(instruction.next_address()))
        }
        Err(e) => {
            if e.is_recoverable() {
                store_result(zmachine, instruction, 0)?;
                Ok(NextAddress::Address(instruction.next_address()))
            } else {
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::assert_ok_eq;
    use crate::instruction::{OperandCount, OperandType, OpcodeForm};
    use crate::test_util::*;

    use super::*;

    fn ext(instruction: u8) -> crate::instruction::Opcode {
        crate::instruction::Opcode::new(5, 0xBE, instruction, OpcodeForm::Ext, OperandCount::_VAR)
    }

    #[test]
    fn test_save_restore() {
        let mut map = test_map(5);
        set_variable(&mut map, 0x80, 0x1111);
        // The store byte of the SAVE instruction
        map[0x402] = 0x91;
        let mut zmachine = mock_zmachine(map);
        let i = mock_store_instruction(0x400, vec![], ext(0x00), 0x403, store(0x402, 0x91));
        assert_ok_eq!(save(&mut zmachine, &i), NextAddress::Address(0x403));
        assert_ok_eq!(zmachine.variable(0x91), 1);

        assert!(zmachine.set_variable(0x80, 0x2222).is_ok());
        let i = mock_store_instruction(0x410, vec![], ext(0x01), 0x413, store(0x412, 0x92));
        // A successful restore stores 2 through the original SAVE
        assert_ok_eq!(restore(&mut zmachine, &i), NextAddress::Address(0x403));
        assert_ok_eq!(zmachine.variable(0x80), 0x1111);
        assert_ok_eq!(zmachine.variable(0x91), 2);
    }

    #[test]
    fn test_save_with_table() {
        let map = test_map(5);
        let mut zmachine = mock_zmachine(map);
        let i = mock_store_instruction(
            0x400,
            vec![operand(OperandType::LargeConstant, 0x300)],
            ext(0x00),
            0x405,
            store(0x404, 0x91),
        );
        assert!(save(&mut zmachine, &i).is_err());
    }

    #[test]
    fn test_restore_no_save() {
        let map = test_map(5);
        let mut zmachine = mock_zmachine(map);
        let i = mock_store_instruction(0x400, vec![], ext(0x01), 0x403, store(0x402, 0x92));
        assert_ok_eq!(restore(&mut zmachine, &i), NextAddress::Address(0x403));
        assert_ok_eq!(zmachine.variable(0x92), 0);
    }

    #[test]
    fn test_log_shift() {
        let map = test_map(5);
        let mut zmachine = mock_zmachine(map);
        let i = mock_store_instruction(
            0x400,
            vec![
                operand(OperandType::LargeConstant, 0x8000),
                operand(OperandType::LargeConstant, 0xFFFF),
            ],
            ext(0x02),
            0x407,
            store(0x406, 0x80),
        );
        // Logical shift right fills with 0
        assert_ok_eq!(log_shift(&mut zmachine, &i), NextAddress::Address(0x407));
        assert_ok_eq!(zmachine.variable(0x80), 0x4000);

        let i = mock_store_instruction(
            0x400,
            vec![
                operand(OperandType::SmallConstant, 1),
                operand(OperandType::SmallConstant, 15),
            ],
            ext(0x02),
            0x405,
            store(0x404, 0x80),
        );
        assert_ok_eq!(log_shift(&mut zmachine, &i), NextAddress::Address(0x405));
        assert_ok_eq!(zmachine.variable(0x80), 0x8000);
    }

    #[test]
    fn test_art_shift() {
        let map = test_map(5);
        let mut zmachine = mock_zmachine(map);
        let i = mock_store_instruction(
            0x400,
            vec![
                operand(OperandType::LargeConstant, 0x8000),
                operand(OperandType::LargeConstant, 0xFFFF),
            ],
            ext(0x03),
            0x407,
            store(0x406, 0x80),
        );
        // Arithmetic shift right preserves the sign
        assert_ok_eq!(art_shift(&mut zmachine, &i), NextAddress::Address(0x407));
        assert_ok_eq!(zmachine.variable(0x80), 0xC000);
    }

    #[test]
    fn test_shift_out_of_range() {
        let map = test_map(5);
        let mut zmachine = mock_zmachine(map);
        let i = mock_store_instruction(
            0x400,
            vec![
                operand(OperandType::SmallConstant, 1),
                operand(OperandType::SmallConstant, 16),
            ],
            ext(0x02),
            0x405,
            store(0x404, 0x80),
        );
        assert!(log_shift(&mut zmachine, &i).is_err());
        assert!(art_shift(&mut zmachine, &i).is_err());
    }

    #[test]
    fn test_set_font() {
        let map = test_map(5);
        let mut zmachine = mock_zmachine(map);
        let i = mock_store_instruction(
            0x400,
            vec![operand(OperandType::SmallConstant, 4)],
            ext(0x04),
            0x404,
            store(0x403, 0x80),
        );
        assert_ok_eq!(set_font(&mut zmachine, &i), NextAddress::Address(0x404));
        assert_ok_eq!(zmachine.variable(0x80), 1);
    }

    #[test]
    fn test_undo() {
        let mut map = test_map(5);
        set_variable(&mut map, 0x80, 0x1111);
        map[0x402] = 0x91;
        let mut zmachine = mock_zmachine(map);
        let i = mock_store_instruction(0x400, vec![], ext(0x09), 0x403, store(0x402, 0x91));
        assert_ok_eq!(save_undo(&mut zmachine, &i), NextAddress::Address(0x403));
        assert_ok_eq!(zmachine.variable(0x91), 1);

        assert!(zmachine.set_variable(0x80, 0x2222).is_ok());
        let i = mock_store_instruction(0x410, vec![], ext(0x0a), 0x413, store(0x412, 0x92));
        assert_ok_eq!(restore_undo(&mut zmachine, &i), NextAddress::Address(0x403));
        assert_ok_eq!(zmachine.variable(0x80), 0x1111);
        assert_ok_eq!(zmachine.variable(0x91), 2);
    }

    #[test]
    fn test_restore_undo_empty() {
        let map = test_map(5);
        let mut zmachine = mock_zmachine(map);
        let i = mock_store_instruction(0x400, vec![], ext(0x0a), 0x403, store(0x402, 0x92));
        assert_ok_eq!(restore_undo(&mut zmachine, &i), NextAddress::Address(0x403));
        assert_ok_eq!(zmachine.variable(0x92), 0);
    }
}
