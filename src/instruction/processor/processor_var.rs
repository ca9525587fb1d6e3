//! VAR instructions
use crate::error::{ErrorCode, RuntimeError};
use crate::instruction::{Instruction, NextAddress};
use crate::object;
use crate::recoverable_error;
use crate::text;
use crate::zmachine::header::HeaderField;
use crate::zmachine::{RunState, ZMachine};

use super::{branch, call_fn, operand_values, store_result};

pub fn call_vs(
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

pub fn call_vs2(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    call_vs(zmachine, instruction)
}

pub fn storew(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let address = (operands[0] as isize + ((operands[1] as i16 as isize) * 2)) as usize;
    zmachine.write_word(address, operands[2])?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn storeb(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let address = (operands[0] as isize + (operands[1] as i16 as isize)) as usize;
    zmachine.write_byte(address, operands[2] as u8)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn put_prop(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    object::set_property(
        zmachine,
        operands[0] as usize,
        operands[1] as u8,
        operands[2],
    )?;
    Ok(NextAddress::Address(instruction.next_address()))
}

/// ZSCII terminators for a line of input: CR, plus any function keys
/// listed in the terminating character table (V5+)
fn terminators(zmachine: &ZMachine) -> Result<Vec<u16>, RuntimeError> {
    let mut terminators = vec![0xd];
    if zmachine.version() > 4 {
        let table = zmachine.header_word(HeaderField::TerminatorTable)? as usize;
        if table > 0 {
            let mut i = 0;
            loop {
                let c = zmachine.read_byte(table + i)? as u16;
                if c == 0 {
                    break;
                }
                if (129..=154).contains(&c) || c >= 252 {
                    terminators.push(c);
                }
                i += 1;
            }
        }
    }

    Ok(terminators)
}

/// Suspend execution until the embedder delivers a line of input
///
/// Execution resumes with [ZMachine::resume_with_input], which finishes
/// the instruction via [read_post].
pub fn read(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let text_buffer = operands[0] as usize;
    let parse_buffer = if operands.len() > 1 {
        operands[1] as usize
    } else {
        0
    };

    if zmachine.version() < 4 {
        zmachine.show_status()?;
    }

    // V5 buffers start with a length byte; earlier versions reserve a
    // byte for the terminating 0
    let length = if zmachine.version() < 5 {
        zmachine.read_byte(text_buffer)? as usize - 1
    } else {
        zmachine.read_byte(text_buffer)? as usize
    };

    // V5 may carry input over from an earlier, interrupted READ
    let mut preload = Vec::new();
    if zmachine.version() > 4 {
        let existing = zmachine.read_byte(text_buffer + 1)? as usize;
        for i in 0..existing {
            preload.push(zmachine.read_byte(text_buffer + 2 + i)? as u16);
        }
    }

    let terminators = terminators(zmachine)?;
    debug!(target: "app::input", "READ: buffer {} characters, terminators {:?}", length, terminators);
    zmachine.set_run_state(RunState::AwaitingLine {
        text_buffer,
        parse_buffer,
        length,
        terminators,
        preload,
    });
    Ok(NextAddress::Address(instruction.address()))
}

fn to_lower_case(c: u16) -> u8 {
    if (0x41..=0x5A).contains(&c) {
        (c as u8) | 0x20
    } else {
        c as u8
    }
}

/// Finish a READ once input has been delivered
///
/// `input` holds the ZSCII input, including the terminator if input
/// ended with one.
pub fn read_post(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
    text_buffer: usize,
    parse_buffer: usize,
    length: usize,
    terminators: &[u16],
    input: &[u16],
) -> Result<NextAddress, RuntimeError> {
    let terminator = input.last().filter(|c| terminators.contains(c)).copied();
    let end = usize::min(
        match terminator {
            Some(_) => input.len() - 1,
            None => input.len(),
        },
        length,
    );
    debug!(target: "app::input", "READ: {} characters, terminator {:?}", end, terminator);

    if zmachine.version() < 5 {
        for (i, c) in input[..end].iter().enumerate() {
            zmachine.write_byte(text_buffer + 1 + i, to_lower_case(*c))?;
        }
        zmachine.write_byte(text_buffer + 1 + end, 0)?;
    } else {
        zmachine.write_byte(text_buffer + 1, end as u8)?;
        for (i, c) in input[..end].iter().enumerate() {
            zmachine.write_byte(text_buffer + 2 + i, to_lower_case(*c))?;
        }
    }

    if parse_buffer > 0 || zmachine.version() < 5 {
        let dictionary = zmachine.header_word(HeaderField::Dictionary)? as usize;
        text::parse_text(zmachine, text_buffer, parse_buffer, dictionary, false)?;
    }

    if zmachine.version() > 4 {
        store_result(zmachine, instruction, terminator.unwrap_or(0))?;
    }

    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn print_char(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    zmachine.print(&[operands[0]])?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn print_num(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let text = format!("{}", operands[0] as i16);
    zmachine.print_str(&text)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn random(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let range = operands[0] as i16;
    if range < 1 {
        if range == 0 || range.unsigned_abs() >= 1000 {
            zmachine.seed(range.unsigned_abs());
        } else {
            zmachine.predictable(range.unsigned_abs());
        }
        store_result(zmachine, instruction, 0)?;
    } else {
        let value = zmachine.random(range as u16);
        store_result(zmachine, instruction, value)?;
    }

    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn push(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    zmachine.push(operands[0])?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn pull(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let value = zmachine.variable(0)?;
    // Pulling to the stack replaces the (new) top value
    zmachine.set_variable_indirect(operands[0] as u8, value)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn split_window(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    zmachine.split_window(operands[0])?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn set_window(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    zmachine.set_window(operands[0])?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn erase_window(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    zmachine.erase_window(operands[0] as i16)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn erase_line(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    if operands[0] == 1 {
        zmachine.erase_line()?;
    }
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn set_cursor(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    zmachine.set_cursor(operands[0], operands[1])?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn get_cursor(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let (row, column) = zmachine.cursor()?;
    zmachine.write_word(operands[0] as usize, row)?;
    zmachine.write_word(operands[0] as usize + 2, column)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn set_text_style(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    zmachine.set_text_style(operands[0])?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn buffer_mode(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    zmachine.buffer_mode(operands[0])?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn output_stream(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let stream = operands[0] as i16;
    let table = if stream == 3 {
        Some(operands[1] as usize)
    } else {
        None
    };
    zmachine.output_stream(stream, table)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn input_stream(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    zmachine.input_stream(operands[0])?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn sound_effect(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let number = operands[0];
    match number {
        1 | 2 => zmachine.beep()?,
        _ => {
            let effect = operands[1];
            match effect {
                1 => (),
                2 => {
                    let (volume, repeats) = if operands.len() > 2 {
                        ((operands[2] & 0xFF) as u8, (operands[2] >> 8) as u8)
                    } else {
                        (255, 1)
                    };
                    zmachine.play_sound(
                        number,
                        effect,
                        volume,
                        if repeats == 0 { 1 } else { repeats },
                    )?
                }
                3 | 4 => zmachine.stop_sound()?,
                _ => {
                    return recoverable_error!(
                        ErrorCode::InvalidInstruction,
                        "Sound effect {} is not valid: [1..4]",
                        effect
                    )
                }
            }
        }
    }

    Ok(NextAddress::Address(instruction.next_address()))
}

/// Suspend execution until the embedder delivers a keypress
///
/// Execution resumes with [ZMachine::resume_with_char], which finishes
/// the instruction via [read_char_post].
pub fn read_char(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    if !operands.is_empty() && operands[0] != 1 {
        return recoverable_error!(
            ErrorCode::InvalidInstruction,
            "READ_CHAR argument 1 must be 1: {}",
            operands[0]
        );
    }

    zmachine.set_run_state(RunState::AwaitingChar);
    Ok(NextAddress::Address(instruction.address()))
}

/// Finish a READ_CHAR once a keypress has been delivered
pub fn read_char_post(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
    zchar: u16,
) -> Result<NextAddress, RuntimeError> {
    store_result(zmachine, instruction, zchar)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn scan_table(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let value = operands[0];
    let table = operands[1] as usize;
    let length = operands[2] as usize;
    let (word_scan, entry_size) = if operands.len() == 4 {
        (operands[3] & 0x80 == 0x80, (operands[3] & 0x3F) as usize)
    } else {
        (true, 2)
    };

    let mut result = 0;
    for i in 0..length {
        let address = table + (i * entry_size);
        let entry = if word_scan {
            zmachine.read_word(address)?
        } else {
            zmachine.read_byte(address)? as u16
        };
        if entry == value {
            result = address as u16;
            break;
        }
    }

    store_result(zmachine, instruction, result)?;
    branch(zmachine, instruction, result != 0)
}

pub fn not(zmachine: &mut ZMachine, instruction: &Instruction) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    store_result(zmachine, instruction, !operands[0])?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn call_vn(
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

pub fn call_vn2(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    call_vn(zmachine, instruction)
}

pub fn tokenise(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let text_buffer = operands[0] as usize;
    let parse_buffer = operands[1] as usize;
    let dictionary = if operands.len() > 2 && operands[2] > 0 {
        operands[2] as usize
    } else {
        zmachine.header_word(HeaderField::Dictionary)? as usize
    };
    let flag = operands.len() > 3 && operands[3] > 0;
    text::parse_text(zmachine, text_buffer, parse_buffer, dictionary, flag)?;
    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn encode_text(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let text_buffer = operands[0] as usize;
    let length = operands[1] as usize;
    let from = operands[2] as usize;
    let destination = operands[3] as usize;

    let mut zchars = Vec::new();
    for i in 0..length {
        zchars.push(zmachine.read_byte(text_buffer + from + i)? as u16);
    }

    let words = if zmachine.version() < 4 { 2 } else { 3 };
    let encoded = text::encode_text(zmachine.version(), &mut zchars, words);
    for (i, w) in encoded.iter().enumerate() {
        zmachine.write_word(destination + (i * 2), *w)?;
    }

    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn copy_table(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let source = operands[0] as usize;
    let destination = operands[1] as usize;
    let length = operands[2] as i16;

    if destination == 0 {
        for i in 0..length as usize {
            zmachine.write_byte(source + i, 0)?;
        }
    } else if length < 0 {
        // Negative length forces a forward copy, which may corrupt an
        // overlapping source
        for i in 0..length.unsigned_abs() as usize {
            let b = zmachine.read_byte(source + i)?;
            zmachine.write_byte(destination + i, b)?;
        }
    } else if destination > source && destination < source + length as usize {
        for i in (0..length as usize).rev() {
            let b = zmachine.read_byte(source + i)?;
            zmachine.write_byte(destination + i, b)?;
        }
    } else {
        for i in 0..length as usize {
            let b = zmachine.read_byte(source + i)?;
            zmachine.write_byte(destination + i, b)?;
        }
    }

    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn print_table(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let table = operands[0] as usize;
    let width = operands[1] as usize;
    let height = if operands.len() > 2 {
        operands[2] as usize
    } else {
        1
    };
    let skip = if operands.len() > 3 {
        operands[3] as usize
    } else {
        0
    };

    let (origin_row, origin_column) = zmachine.cursor()?;
    for row in 0..height {
        if row > 0 {
            zmachine.set_cursor(origin_row + row as u16, origin_column)?;
        }
        let mut text = Vec::new();
        for column in 0..width {
            text.push(zmachine.read_byte(table + (row * (width + skip)) + column)? as u16);
        }
        zmachine.print(&text)?;
    }

    Ok(NextAddress::Address(instruction.next_address()))
}

pub fn check_arg_count(
    zmachine: &mut ZMachine,
    instruction: &Instruction,
) -> Result<NextAddress, RuntimeError> {
    let operands = operand_values(zmachine, instruction)?;
    let count = zmachine.argument_count()?;
    branch(zmachine, instruction, count >= operands[0] as u8)
}

#[cfg(test)]
mod tests {
    use crate::{
        assert_beep, assert_erase_window, assert_ok_eq, assert_played, assert_print, assert_split,
        assert_style, assert_window,
    };
    use crate::instruction::{OperandCount, OperandType};
    use crate::test_util::branch;
    use crate::test_util::*;

    use super::*;

    fn op(version: u8, instruction: u8) -> crate::instruction::Opcode {
        opcode(version, 0xE0 | instruction, instruction, OperandCount::_VAR)
    }

    #[test]
    fn test_call_vs() {
        let mut map = test_map(3);
        mock_routine(&mut map, 0x600, &[0, 0]);
        let mut zmachine = mock_zmachine(map);
        let i = mock_store_instruction(
            0x400,
            vec![
                operand(OperandType::LargeConstant, 0x300),
                operand(OperandType::LargeConstant, 0x1122),
                operand(OperandType::LargeConstant, 0x3344),
            ],
            op(3, 0x00),
            0x408,
            store(0x407, 0x80),
        );
        assert_ok_eq!(call_vs(&mut zmachine, &i), NextAddress::Address(0x605));
        assert_eq!(zmachine.frame_count(), 2);
        assert_ok_eq!(zmachine.variable(1), 0x1122);
        assert_ok_eq!(zmachine.variable(2), 0x3344);
        assert_ok_eq!(zmachine.argument_count(), 2);
    }

    #[test]
    fn test_storew() {
        let map = test_map(3);
        let mut zmachine = mock_zmachine(map);
        let i = mock_instruction(
            0x400,
            vec![
                operand(OperandType::LargeConstant, 0x300),
                operand(OperandType::SmallConstant, 2),
                operand(OperandType::LargeConstant, 0x1234),
            ],
            op(3, 0x01),
            0x406,
        );
        assert_ok_eq!(storew(&mut zmachine, &i), NextAddress::Address(0x406));
        assert_ok_eq!(zmachine.read_word(0x304), 0x1234);
    }

    #[test]
    fn test_storew_static_memory() {
        let map = test_map(3);
        let mut zmachine = mock_zmachine(map);
        let i = mock_instruction(
            0x400,
            vec![
                operand(OperandType::LargeConstant, 0x500),
                operand(OperandType::SmallConstant, 0),
                operand(OperandType::LargeConstant, 0x1234),
            ],
            op(3, 0x01),
            0x406,
        );
        // Writes above the static mark are rejected
        assert!(storew(&mut zmachine, &i).is_err());
    }

    #[test]
    fn test_storeb() {
        let map = test_map(3);
        let mut zmachine = mock_zmachine(map);
        let i = mock_instruction(
            0x400,
            vec![
                operand(OperandType::LargeConstant, 0x300),
                operand(OperandType::SmallConstant, 3),
                operand(OperandType::SmallConstant, 0x56),
            ],
            op(3, 0x02),
            0x405,
        );
        assert_ok_eq!(storeb(&mut zmachine, &i), NextAddress::Address(0x405));
        assert_ok_eq!(zmachine.read_byte(0x303), 0x56);
    }

    #[test]
    fn test_put_prop() {
        let mut map = test_map(3);
        mock_object(&mut map, 1, vec![], (0, 0, 0));
        mock_properties(&mut map, 1, &[(10, &[0x12, 0x34])]);
        let mut zmachine = mock_zmachine(map);
        let i = mock_instruction(
            0x400,
            vec![
                operand(OperandType::SmallConstant, 1),
                operand(OperandType::SmallConstant, 10),
                operand(OperandType::LargeConstant, 0x5678),
            ],
            op(3, 0x03),
            0x405,
        );
        assert_ok_eq!(put_prop(&mut zmachine, &i), NextAddress::Address(0x405));
        assert_ok_eq!(crate::object::property(&zmachine, 1, 10), 0x5678);
    }

    #[test]
    fn test_read_suspends_v3() {
        let mut map = test_map(3);
        map[0x380] = 21;
        let mut zmachine = mock_zmachine(map);
        let i = mock_instruction(
            0x400,
            vec![
                operand(OperandType::LargeConstant, 0x380),
                operand(OperandType::LargeConstant, 0x3A0),
            ],
            op(3, 0x04),
            0x406,
        );
        assert_ok_eq!(read(&mut zmachine, &i), NextAddress::Address(0x400));
        assert_eq!(
            zmachine.run_state(),
            &RunState::AwaitingLine {
                text_buffer: 0x380,
                parse_buffer: 0x3A0,
                length: 20,
                terminators: vec![0xd],
                preload: vec![],
            }
        );
    }

    #[test]
    fn test_read_preload_v5() {
        let mut map = test_map(5);
        map[0x380] = 20;
        map[0x381] = 2;
        map[0x382] = b'h';
        map[0x383] = b'i';
        let mut zmachine = mock_zmachine(map);
        let i = mock_store_instruction(
            0x400,
            vec![
                operand(OperandType::LargeConstant, 0x380),
                operand(OperandType::LargeConstant, 0x3A0),
            ],
            op(5, 0x04),
            0x407,
            store(0x406, 0x80),
        );
        assert_ok_eq!(read(&mut zmachine, &i), NextAddress::Address(0x400));
        assert_eq!(
            zmachine.run_state(),
            &RunState::AwaitingLine {
                text_buffer: 0x380,
                parse_buffer: 0x3A0,
                length: 20,
                terminators: vec![0xd],
                preload: vec![b'h' as u16, b'i' as u16],
            }
        );
    }

    #[test]
    fn test_read_post_v5() {
        let mut map = test_map(5);
        map[0x380] = 20;
        map[0x3A0] = 5;
        mock_dictionary(&mut map);
        let mut zmachine = mock_zmachine(map);
        let i = mock_store_instruction(
            0x400,
            vec![
                operand(OperandType::LargeConstant, 0x380),
                operand(OperandType::LargeConstant, 0x3A0),
            ],
            op(5, 0x04),
            0x407,
            store(0x406, 0x80),
        );
        let input: Vec<u16> = "LOOK\r".chars().map(|c| c as u16).collect();
        assert_ok_eq!(
            read_post(&mut zmachine, &i, 0x380, 0x3A0, 20, &[0xd], &input),
            NextAddress::Address(0x407)
        );
        // Length byte, then the lower-cased input
        assert_ok_eq!(zmachine.read_byte(0x381), 4);
        assert_ok_eq!(zmachine.read_byte(0x382), b'l');
        assert_ok_eq!(zmachine.read_byte(0x385), b'k');
        // One word parsed, and the terminator stored
        assert_ok_eq!(zmachine.read_byte(0x3A1), 1);
        assert_ok_eq!(zmachine.variable(0x80), 0xd);
    }

    #[test]
    fn test_print_char() {
        let map = test_map(3);
        let mut zmachine = mock_zmachine(map);
        let i = mock_instruction(
            0x400,
            vec![operand(OperandType::SmallConstant, b'Z' as u16)],
            op(3, 0x05),
            0x402,
        );
        assert_ok_eq!(print_char(&mut zmachine, &i), NextAddress::Address(0x402));
        assert_print!("Z");
    }

    #[test]
    fn test_print_num() {
        let map = test_map(3);
        let mut zmachine = mock_zmachine(map);
        let i = mock_instruction(
            0x400,
            vec![operand(OperandType::LargeConstant, 0xFFFE)],
            op(3, 0x06),
            0x403,
        );
        assert_ok_eq!(print_num(&mut zmachine, &i), NextAddress::Address(0x403));
        assert_print!("-2");
    }

    #[test]
    fn test_random() {
        let map = test_map(3);
        let mut zmachine = mock_zmachine(map);
        // Negative range seeds a predictable sequence and stores 0
        let i = mock_store_instruction(
            0x400,
            vec![operand(OperandType::LargeConstant, 0xFFFD)],
            op(3, 0x07),
            0x404,
            store(0x403, 0x80),
        );
        assert_ok_eq!(random(&mut zmachine, &i), NextAddress::Address(0x404));
        assert_ok_eq!(zmachine.variable(0x80), 0);

        let i = mock_store_instruction(
            0x400,
            vec![operand(OperandType::SmallConstant, 10)],
            op(3, 0x07),
            0x403,
            store(0x402, 0x80),
        );
        assert_ok_eq!(random(&mut zmachine, &i), NextAddress::Address(0x403));
        assert_ok_eq!(zmachine.variable(0x80), 1);
        assert_ok_eq!(random(&mut zmachine, &i), NextAddress::Address(0x403));
        assert_ok_eq!(zmachine.variable(0x80), 2);
    }

    #[test]
    fn test_push_pull() {
        let mut map = test_map(3);
        set_variable(&mut map, 0x80, 0);
        let mut zmachine = mock_zmachine(map);
        let i = mock_instruction(
            0x400,
            vec![operand(OperandType::LargeConstant, 0x1234)],
            op(3, 0x08),
            0x403,
        );
        assert_ok_eq!(push(&mut zmachine, &i), NextAddress::Address(0x403));

        let i = mock_instruction(
            0x400,
            vec![operand(OperandType::SmallConstant, 0x80)],
            op(3, 0x09),
            0x402,
        );
        assert_ok_eq!(pull(&mut zmachine, &i), NextAddress::Address(0x402));
        assert_ok_eq!(zmachine.variable(0x80), 0x1234);
        assert!(zmachine.peek_variable(0).is_err());
    }

    #[test]
    fn test_pull_to_stack() {
        let map = test_map(3);
        let mut zmachine = mock_zmachine(map);
        assert!(zmachine.push(0x1111).is_ok());
        assert!(zmachine.push(0x2222).is_ok());
        let i = mock_instruction(
            0x400,
            vec![operand(OperandType::SmallConstant, 0)],
            op(3, 0x09),
            0x402,
        );
        // 0x2222 is popped, then replaces 0x1111 on top of the stack
        assert_ok_eq!(pull(&mut zmachine, &i), NextAddress::Address(0x402));
        assert_ok_eq!(zmachine.variable(0), 0x2222);
        assert!(zmachine.peek_variable(0).is_err());
    }

    #[test]
    fn test_window_ops() {
        let map = test_map(4);
        let mut zmachine = mock_zmachine(map);
        let i = mock_instruction(
            0x400,
            vec![operand(OperandType::SmallConstant, 2)],
            op(4, 0x0a),
            0x402,
        );
        assert_ok_eq!(split_window(&mut zmachine, &i), NextAddress::Address(0x402));
        assert_split!(2);

        let i = mock_instruction(
            0x400,
            vec![operand(OperandType::SmallConstant, 1)],
            op(4, 0x0b),
            0x402,
        );
        assert_ok_eq!(set_window(&mut zmachine, &i), NextAddress::Address(0x402));
        assert_window!(1);

        let i = mock_instruction(
            0x400,
            vec![operand(OperandType::LargeConstant, 0xFFFF)],
            op(4, 0x0d),
            0x403,
        );
        assert_ok_eq!(erase_window(&mut zmachine, &i), NextAddress::Address(0x403));
        assert_erase_window!(-1);
    }

    #[test]
    fn test_cursor_ops() {
        let map = test_map(4);
        let mut zmachine = mock_zmachine(map);
        let i = mock_instruction(
            0x400,
            vec![
                operand(OperandType::SmallConstant, 5),
                operand(OperandType::SmallConstant, 10),
            ],
            op(4, 0x0f),
            0x403,
        );
        assert_ok_eq!(set_cursor(&mut zmachine, &i), NextAddress::Address(0x403));

        let i = mock_instruction(
            0x400,
            vec![operand(OperandType::LargeConstant, 0x300)],
            op(4, 0x10),
            0x403,
        );
        assert_ok_eq!(get_cursor(&mut zmachine, &i), NextAddress::Address(0x403));
        assert_ok_eq!(zmachine.read_word(0x300), 5);
        assert_ok_eq!(zmachine.read_word(0x302), 10);
    }

    #[test]
    fn test_set_text_style() {
        let map = test_map(4);
        let mut zmachine = mock_zmachine(map);
        let i = mock_instruction(
            0x400,
            vec![operand(OperandType::SmallConstant, 2)],
            op(4, 0x11),
            0x402,
        );
        assert_ok_eq!(
            set_text_style(&mut zmachine, &i),
            NextAddress::Address(0x402)
        );
        assert_style!(2);
    }

    #[test]
    fn test_output_stream_3() {
        let map = test_map(5);
        let mut zmachine = mock_zmachine(map);
        let i = mock_instruction(
            0x400,
            vec![
                operand(OperandType::SmallConstant, 3),
                operand(OperandType::LargeConstant, 0x300),
            ],
            op(5, 0x13),
            0x405,
        );
        assert_ok_eq!(
            output_stream(&mut zmachine, &i),
            NextAddress::Address(0x405)
        );
        assert!(zmachine.is_stream_enabled(3));
    }

    #[test]
    fn test_input_stream() {
        let map = test_map(3);
        let mut zmachine = mock_zmachine(map);
        let i = mock_instruction(
            0x400,
            vec![operand(OperandType::SmallConstant, 0)],
            op(3, 0x14),
            0x402,
        );
        assert_ok_eq!(input_stream(&mut zmachine, &i), NextAddress::Address(0x402));

        let i = mock_instruction(
            0x400,
            vec![operand(OperandType::SmallConstant, 1)],
            op(3, 0x14),
            0x402,
        );
        assert!(input_stream(&mut zmachine, &i).is_err());
    }

    #[test]
    fn test_sound_effect_beep() {
        let map = test_map(3);
        let mut zmachine = mock_zmachine(map);
        let i = mock_instruction(
            0x400,
            vec![operand(OperandType::SmallConstant, 1)],
            op(3, 0x15),
            0x402,
        );
        assert_ok_eq!(sound_effect(&mut zmachine, &i), NextAddress::Address(0x402));
        assert_beep!();
    }

    #[test]
    fn test_sound_effect_play() {
        let map = test_map(5);
        let mut zmachine = mock_zmachine(map);
        let i = mock_instruction(
            0x400,
            vec![
                operand(OperandType::SmallConstant, 3),
                operand(OperandType::SmallConstant, 2),
                operand(OperandType::LargeConstant, 0x0240),
            ],
            op(5, 0x15),
            0x406,
        );
        assert_ok_eq!(sound_effect(&mut zmachine, &i), NextAddress::Address(0x406));
        assert_played!(3, 2, 0x40, 2);
    }

    #[test]
    fn test_read_char_suspends() {
        let mut map = test_map(4);
        map[0x600] = 0;
        let mut zmachine = mock_zmachine(map);
        let i = mock_store_instruction(
            0x400,
            vec![operand(OperandType::SmallConstant, 1)],
            op(4, 0x16),
            0x403,
            store(0x402, 0x80),
        );
        assert_ok_eq!(read_char(&mut zmachine, &i), NextAddress::Address(0x400));
        assert_eq!(zmachine.run_state(), &RunState::AwaitingChar);

        assert_ok_eq!(
            read_char_post(&mut zmachine, &i, b'y' as u16),
            NextAddress::Address(0x403)
        );
        assert_ok_eq!(zmachine.variable(0x80), b'y' as u16);
    }

    #[test]
    fn test_read_char_bad_argument() {
        let map = test_map(4);
        let mut zmachine = mock_zmachine(map);
        let i = mock_store_instruction(
            0x400,
            vec![operand(OperandType::SmallConstant, 2)],
            op(4, 0x16),
            0x403,
            store(0x402, 0x80),
        );
        assert!(read_char(&mut zmachine, &i).is_err());
        assert_eq!(zmachine.run_state(), &RunState::Running);
    }

    #[test]
    fn test_scan_table_words() {
        let mut map = test_map(5);
        map[0x300] = 0x11;
        map[0x301] = 0x11;
        map[0x302] = 0x22;
        map[0x303] = 0x22;
        let mut zmachine = mock_zmachine(map);
        let i = mock_branch_store_instruction(
            0x400,
            vec![
                operand(OperandType::LargeConstant, 0x2222),
                operand(OperandType::LargeConstant, 0x300),
                operand(OperandType::SmallConstant, 2),
            ],
            op(5, 0x17),
            0x408,
            branch(0x407, true, 0x410),
            store(0x406, 0x80),
        );
        assert_ok_eq!(scan_table(&mut zmachine, &i), NextAddress::Address(0x410));
        assert_ok_eq!(zmachine.variable(0x80), 0x302);
    }

    #[test]
    fn test_scan_table_bytes_not_found() {
        let mut map = test_map(5);
        map[0x300] = 0x11;
        map[0x303] = 0x22;
        let mut zmachine = mock_zmachine(map);
        // Byte scan of 2 entries, 3 bytes apart
        let i = mock_branch_store_instruction(
            0x400,
            vec![
                operand(OperandType::SmallConstant, 0x33),
                operand(OperandType::LargeConstant, 0x300),
                operand(OperandType::SmallConstant, 2),
                operand(OperandType::SmallConstant, 0x03),
            ],
            op(5, 0x17),
            0x408,
            branch(0x407, true, 0x410),
            store(0x406, 0x80),
        );
        assert_ok_eq!(scan_table(&mut zmachine, &i), NextAddress::Address(0x408));
        assert_ok_eq!(zmachine.variable(0x80), 0);
    }

    #[test]
    fn test_not() {
        let map = test_map(5);
        let mut zmachine = mock_zmachine(map);
        let i = mock_store_instruction(
            0x400,
            vec![operand(OperandType::LargeConstant, 0x00FF)],
            op(5, 0x18),
            0x404,
            store(0x403, 0x80),
        );
        assert_ok_eq!(not(&mut zmachine, &i), NextAddress::Address(0x404));
        assert_ok_eq!(zmachine.variable(0x80), 0xFF00);
    }

    #[test]
    fn test_call_vn() {
        let mut map = test_map(5);
        map[0x600] = 1;
        let mut zmachine = mock_zmachine(map);
        let i = mock_instruction(
            0x400,
            vec![
                operand(OperandType::LargeConstant, 0x180),
                operand(OperandType::LargeConstant, 0x1234),
            ],
            op(5, 0x19),
            0x405,
        );
        assert_ok_eq!(call_vn(&mut zmachine, &i), NextAddress::Address(0x601));
        assert_eq!(zmachine.frame_count(), 2);
        assert_ok_eq!(zmachine.variable(1), 0x1234);
    }

    #[test]
    fn test_tokenise() {
        let mut map = test_map(5);
        mock_dictionary(&mut map);
        // "look" with length byte
        map[0x380] = 20;
        map[0x3A0] = 5;
        map[0x381] = 4;
        map[0x382] = b'l';
        map[0x383] = b'o';
        map[0x384] = b'o';
        map[0x385] = b'k';
        let mut zmachine = mock_zmachine(map);
        let i = mock_instruction(
            0x400,
            vec![
                operand(OperandType::LargeConstant, 0x380),
                operand(OperandType::LargeConstant, 0x3A0),
            ],
            op(5, 0x1b),
            0x406,
        );
        assert_ok_eq!(tokenise(&mut zmachine, &i), NextAddress::Address(0x406));
        assert_ok_eq!(zmachine.read_byte(0x3A1), 1);
    }

    #[test]
    fn test_encode_text() {
        let mut map = test_map(5);
        map[0x380] = b'h';
        map[0x381] = b'e';
        map[0x382] = b'l';
        map[0x383] = b'l';
        map[0x384] = b'o';
        let mut zmachine = mock_zmachine(map);
        let i = mock_instruction(
            0x400,
            vec![
                operand(OperandType::LargeConstant, 0x380),
                operand(OperandType::SmallConstant, 5),
                operand(OperandType::SmallConstant, 0),
                operand(OperandType::LargeConstant, 0x390),
            ],
            op(5, 0x1c),
            0x408,
        );
        assert_ok_eq!(encode_text(&mut zmachine, &i), NextAddress::Address(0x408));
        assert_ok_eq!(zmachine.read_word(0x390), 0x3551);
        assert_ok_eq!(zmachine.read_word(0x392), 0x4685);
        assert_ok_eq!(zmachine.read_word(0x394), 0x94A5);
    }

    #[test]
    fn test_copy_table() {
        let mut map = test_map(5);
        map[0x300] = 1;
        map[0x301] = 2;
        map[0x302] = 3;
        let mut zmachine = mock_zmachine(map);
        let i = mock_instruction(
            0x400,
            vec![
                operand(OperandType::LargeConstant, 0x300),
                operand(OperandType::LargeConstant, 0x310),
                operand(OperandType::SmallConstant, 3),
            ],
            op(5, 0x1d),
            0x406,
        );
        assert_ok_eq!(copy_table(&mut zmachine, &i), NextAddress::Address(0x406));
        assert_ok_eq!(zmachine.read_byte(0x310), 1);
        assert_ok_eq!(zmachine.read_byte(0x312), 3);
    }

    #[test]
    fn test_copy_table_overlap() {
        let mut map = test_map(5);
        map[0x300] = 1;
        map[0x301] = 2;
        map[0x302] = 3;
        let mut zmachine = mock_zmachine(map);
        // Destination inside the source range copies backwards
        let i = mock_instruction(
            0x400,
            vec![
                operand(OperandType::LargeConstant, 0x300),
                operand(OperandType::LargeConstant, 0x301),
                operand(OperandType::SmallConstant, 3),
            ],
            op(5, 0x1d),
            0x406,
        );
        assert_ok_eq!(copy_table(&mut zmachine, &i), NextAddress::Address(0x406));
        assert_ok_eq!(zmachine.read_byte(0x301), 1);
        assert_ok_eq!(zmachine.read_byte(0x302), 2);
        assert_ok_eq!(zmachine.read_byte(0x303), 3);
    }

    #[test]
    fn test_copy_table_zero() {
        let mut map = test_map(5);
        map[0x300] = 1;
        map[0x301] = 2;
        let mut zmachine = mock_zmachine(map);
        let i = mock_instruction(
            0x400,
            vec![
                operand(OperandType::LargeConstant, 0x300),
                operand(OperandType::SmallConstant, 0),
                operand(OperandType::SmallConstant, 2),
            ],
            op(5, 0x1d),
            0x405,
        );
        assert_ok_eq!(copy_table(&mut zmachine, &i), NextAddress::Address(0x405));
        assert_ok_eq!(zmachine.read_byte(0x300), 0);
        assert_ok_eq!(zmachine.read_byte(0x301), 0);
    }

    #[test]
    fn test_print_table() {
        let mut map = test_map(5);
        map[0x300] = b'a';
        map[0x301] = b'b';
        map[0x302] = b'x';
        map[0x303] = b'c';
        map[0x304] = b'd';
        let mut zmachine = mock_zmachine(map);
        // 2 rows of 2 characters, skipping 1 byte between rows
        let i = mock_instruction(
            0x400,
            vec![
                operand(OperandType::LargeConstant, 0x300),
                operand(OperandType::SmallConstant, 2),
                operand(OperandType::SmallConstant, 2),
                operand(OperandType::SmallConstant, 1),
            ],
            op(5, 0x1e),
            0x407,
        );
        assert_ok_eq!(print_table(&mut zmachine, &i), NextAddress::Address(0x407));
        assert_print!("abcd");
    }

    #[test]
    fn test_check_arg_count() {
        let mut map = test_map(5);
        map[0x600] = 2;
        let mut zmachine = mock_zmachine(map);
        assert!(zmachine
            .call_routine(0x600, &[0x1234], None, 0x404)
            .is_ok());
        let i = mock_branch_instruction(
            0x601,
            vec![operand(OperandType::SmallConstant, 1)],
            op(5, 0x1f),
            0x604,
            branch(0x603, true, 0x610),
        );
        assert_ok_eq!(
            check_arg_count(&mut zmachine, &i),
            NextAddress::Address(0x610)
        );

        let i = mock_branch_instruction(
            0x601,
            vec![operand(OperandType::SmallConstant, 2)],
            op(5, 0x1f),
            0x604,
            branch(0x603, true, 0x610),
        );
        assert_ok_eq!(
            check_arg_count(&mut zmachine, &i),
            NextAddress::Address(0x604)
        );
    }
}
