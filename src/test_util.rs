//! Test fixtures: a minimal story file image, recording collaborators,
//! and builders for instructions and object tables.
use std::cell::RefCell;
use std::collections::HashMap;

use crate::{
    config::Config,
    error::{ErrorCode, RuntimeError},
    instruction::{
        Branch, Instruction, Opcode, OpcodeForm, Operand, OperandCount, OperandType, StoreResult,
    },
    recoverable_error,
    zmachine::{
        io::{Persistence, Screen, Sound},
        ZMachine,
    },
};

thread_local! {
    static PRINT: RefCell<String> = RefCell::new(String::new());
    static TRANSCRIPT: RefCell<String> = RefCell::new(String::new());
    static STATUS: RefCell<(String, String)> = RefCell::new((String::new(), String::new()));
    static COLOURS: RefCell<(u16, u16)> = RefCell::new((0, 0));
    static SPLIT: RefCell<u16> = RefCell::new(0);
    static WINDOW: RefCell<u16> = RefCell::new(0);
    static ERASE_WINDOW: RefCell<i16> = RefCell::new(0);
    static ERASE_LINE: RefCell<bool> = RefCell::new(false);
    static STYLE: RefCell<u16> = RefCell::new(0);
    static BUFFER: RefCell<u16> = RefCell::new(0);
    static FONT: RefCell<u16> = RefCell::new(0);
    static CURSOR: RefCell<(u16, u16)> = RefCell::new((1, 1));
    static BEEP: RefCell<bool> = RefCell::new(false);
    static PLAYED: RefCell<(u16, u16, u8, u8)> = RefCell::new((0, 0, 0, 0));
    static SAVES: RefCell<HashMap<String, Vec<u8>>> = RefCell::new(HashMap::new());
}

fn reset() {
    PRINT.with(|x| x.borrow_mut().clear());
    TRANSCRIPT.with(|x| x.borrow_mut().clear());
    STATUS.with(|x| *x.borrow_mut() = (String::new(), String::new()));
    COLOURS.with(|x| *x.borrow_mut() = (0, 0));
    SPLIT.with(|x| *x.borrow_mut() = 0);
    WINDOW.with(|x| *x.borrow_mut() = 0);
    ERASE_WINDOW.with(|x| *x.borrow_mut() = 0);
    ERASE_LINE.with(|x| *x.borrow_mut() = false);
    STYLE.with(|x| *x.borrow_mut() = 0);
    BUFFER.with(|x| *x.borrow_mut() = 0);
    FONT.with(|x| *x.borrow_mut() = 0);
    CURSOR.with(|x| *x.borrow_mut() = (1, 1));
    BEEP.with(|x| *x.borrow_mut() = false);
    PLAYED.with(|x| *x.borrow_mut() = (0, 0, 0, 0));
    SAVES.with(|x| x.borrow_mut().clear());
}

pub fn printed() -> String {
    PRINT.with(|x| x.borrow().to_string())
}

pub fn transcripted() -> String {
    TRANSCRIPT.with(|x| x.borrow().to_string())
}

pub fn status_line() -> (String, String) {
    STATUS.with(|x| x.borrow().to_owned())
}

pub fn colours() -> (u16, u16) {
    COLOURS.with(|x| x.borrow().to_owned())
}

pub fn split() -> u16 {
    SPLIT.with(|x| x.borrow().to_owned())
}

pub fn window() -> u16 {
    WINDOW.with(|x| x.borrow().to_owned())
}

pub fn erased_window() -> i16 {
    ERASE_WINDOW.with(|x| x.borrow().to_owned())
}

pub fn erased_line() -> bool {
    ERASE_LINE.with(|x| x.borrow().to_owned())
}

pub fn style() -> u16 {
    STYLE.with(|x| x.borrow().to_owned())
}

pub fn buffered() -> u16 {
    BUFFER.with(|x| x.borrow().to_owned())
}

pub fn beeped() -> bool {
    BEEP.with(|x| x.borrow().to_owned())
}

pub fn played() -> (u16, u16, u8, u8) {
    PLAYED.with(|x| x.borrow().to_owned())
}

fn zscii_string(text: &[u16]) -> String {
    text.iter().map(|c| (*c as u8) as char).collect()
}

/// Screen that records everything sent to it
struct TestScreen {}

impl Screen for TestScreen {
    fn rows(&self) -> u16 {
        24
    }

    fn columns(&self) -> u16 {
        80
    }

    fn print(&mut self, text: &[u16]) -> Result<(), RuntimeError> {
        PRINT.with(|x| x.borrow_mut().push_str(&zscii_string(text)));
        Ok(())
    }

    fn new_line(&mut self) -> Result<(), RuntimeError> {
        PRINT.with(|x| x.borrow_mut().push('\n'));
        Ok(())
    }

    fn transcript(&mut self, text: &[u16]) -> Result<(), RuntimeError> {
        TRANSCRIPT.with(|x| x.borrow_mut().push_str(&zscii_string(text)));
        Ok(())
    }

    fn split_window(&mut self, lines: u16) -> Result<(), RuntimeError> {
        SPLIT.with(|x| *x.borrow_mut() = lines);
        Ok(())
    }

    fn set_window(&mut self, window: u16) -> Result<(), RuntimeError> {
        WINDOW.with(|x| *x.borrow_mut() = window);
        Ok(())
    }

    fn erase_window(&mut self, window: i16) -> Result<(), RuntimeError> {
        ERASE_WINDOW.with(|x| *x.borrow_mut() = window);
        Ok(())
    }

    fn erase_line(&mut self) -> Result<(), RuntimeError> {
        ERASE_LINE.with(|x| *x.borrow_mut() = true);
        Ok(())
    }

    fn set_cursor(&mut self, row: u16, column: u16) -> Result<(), RuntimeError> {
        CURSOR.with(|x| *x.borrow_mut() = (row, column));
        Ok(())
    }

    fn cursor(&mut self) -> Result<(u16, u16), RuntimeError> {
        Ok(CURSOR.with(|x| x.borrow().to_owned()))
    }

    fn set_text_style(&mut self, style: u16) -> Result<(), RuntimeError> {
        STYLE.with(|x| *x.borrow_mut() = style);
        Ok(())
    }

    fn set_colour(&mut self, foreground: u16, background: u16) -> Result<(), RuntimeError> {
        COLOURS.with(|x| *x.borrow_mut() = (foreground, background));
        Ok(())
    }

    fn buffer_mode(&mut self, mode: u16) -> Result<(), RuntimeError> {
        BUFFER.with(|x| *x.borrow_mut() = mode);
        Ok(())
    }

    fn set_font(&mut self, font: u16) -> Result<u16, RuntimeError> {
        // Font 1 is always current
        FONT.with(|x| *x.borrow_mut() = font);
        Ok(1)
    }

    fn status_line(&mut self, left: &[u16], right: &[u16]) -> Result<(), RuntimeError> {
        STATUS.with(|x| *x.borrow_mut() = (zscii_string(left), zscii_string(right)));
        Ok(())
    }
}

struct TestSound {}

impl Sound for TestSound {
    fn play(
        &mut self,
        number: u16,
        effect: u16,
        volume: u8,
        repeats: u8,
    ) -> Result<(), RuntimeError> {
        PLAYED.with(|x| *x.borrow_mut() = (number, effect, volume, repeats));
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RuntimeError> {
        Ok(())
    }

    fn beep(&mut self) -> Result<(), RuntimeError> {
        BEEP.with(|x| *x.borrow_mut() = true);
        Ok(())
    }
}

struct TestPersistence {}

impl Persistence for TestPersistence {
    fn save(&mut self, name: &str, data: &[u8]) -> Result<(), RuntimeError> {
        SAVES.with(|x| x.borrow_mut().insert(name.to_string(), data.to_vec()));
        Ok(())
    }

    fn restore(&mut self, name: &str) -> Result<Vec<u8>, RuntimeError> {
        match SAVES.with(|x| x.borrow().get(name).cloned()) {
            Some(data) => Ok(data),
            None => recoverable_error!(ErrorCode::Restore, "No save data for {}", name),
        }
    }
}

/// A 2k story file image with a header but no code
pub fn test_map(version: u8) -> Vec<u8> {
    let mut v = vec![0; 0x800];
    v[0] = version;
    // Initial PC at $0400
    v[6] = 0x4;
    // Object table at $0200
    v[0x0A] = 0x02;
    // Global variables at $0100
    v[0x0C] = 0x01;
    // Static mark at $0400
    v[0x0E] = 0x04;

    v
}

pub fn set_variable(map: &mut [u8], variable: u8, value: u16) {
    let address = 0x100 + ((variable as usize - 16) * 2);
    map[address] = (value >> 8) as u8;
    map[address + 1] = value as u8;
}

pub fn mock_zmachine(map: Vec<u8>) -> ZMachine {
    reset();
    let z = ZMachine::new(
        map,
        &Config::default(),
        "test",
        Box::new(TestScreen {}),
        Box::new(TestSound {}),
        Box::new(TestPersistence {}),
    );
    assert!(z.is_ok());
    z.unwrap()
}

pub fn operand(operand_type: OperandType, value: u16) -> Operand {
    Operand::new(operand_type, value)
}

pub fn branch(byte_address: usize, condition: bool, branch_address: usize) -> Branch {
    Branch::new(byte_address, condition, branch_address)
}

pub fn store(byte_address: usize, variable: u8) -> StoreResult {
    StoreResult::new(byte_address, variable)
}

pub fn opcode(version: u8, opcode: u8, instruction: u8, operand_count: OperandCount) -> Opcode {
    let form = if opcode == 0xBE {
        OpcodeForm::Ext
    } else if opcode >= 0xC0 {
        OpcodeForm::Var
    } else if opcode >= 0x80 {
        OpcodeForm::Short
    } else {
        OpcodeForm::Long
    };
    Opcode::new(version, opcode, instruction, form, operand_count)
}

pub fn mock_instruction(
    address: usize,
    operands: Vec<Operand>,
    opcode: Opcode,
    next_address: usize,
) -> Instruction {
    Instruction::new(&[], address, opcode, operands, None, None, next_address)
}

pub fn mock_branch_instruction(
    address: usize,
    operands: Vec<Operand>,
    opcode: Opcode,
    next_address: usize,
    branch: Branch,
) -> Instruction {
    Instruction::new(
        &[],
        address,
        opcode,
        operands,
        None,
        Some(branch),
        next_address,
    )
}

pub fn mock_store_instruction(
    address: usize,
    operands: Vec<Operand>,
    opcode: Opcode,
    next_address: usize,
    result: StoreResult,
) -> Instruction {
    Instruction::new(
        &[],
        address,
        opcode,
        operands,
        Some(result),
        None,
        next_address,
    )
}

pub fn mock_branch_store_instruction(
    address: usize,
    operands: Vec<Operand>,
    opcode: Opcode,
    next_address: usize,
    branch: Branch,
    result: StoreResult,
) -> Instruction {
    Instruction::new(
        &[],
        address,
        opcode,
        operands,
        Some(result),
        Some(branch),
        next_address,
    )
}

/// Push a frame by calling a routine set up with [mock_routine]
pub fn mock_frame(
    zmachine: &mut ZMachine,
    address: usize,
    result: Option<u8>,
    return_address: usize,
) {
    let r = result.map(|x| StoreResult::new(0, x));
    assert!(zmachine
        .call_routine(address, &[], r, return_address)
        .is_ok());
}

pub fn mock_routine(map: &mut [u8], address: usize, local_variables: &[u16]) {
    map[address] = local_variables.len() as u8;
    // V1-4 routine headers carry initial local values
    if map[0] < 5 {
        for (i, w) in local_variables.iter().enumerate() {
            map[address + 1 + (i * 2)] = (*w >> 8) as u8;
            map[address + 2 + (i * 2)] = *w as u8;
        }
    }
}

fn dictionary_words(map: &mut [u8], address: usize, words: &[u16]) {
    for (i, w) in words.iter().enumerate() {
        map[address + (i * 2)] = (*w >> 8) as u8;
        map[address + 1 + (i * 2)] = *w as u8;
    }
}

/// A sorted dictionary at $0300 with "hello", "inventory", "look", and
/// "sailor", wired into the header.
///
/// Also marks the conventional buffers: text at $0380, parse at $03A0
/// with room for 2 entries.
pub fn mock_dictionary(map: &mut [u8]) {
    map[0x08] = 0x03;

    // 3 separators
    map[0x300] = 3;
    map[0x301] = b'.';
    map[0x302] = b',';
    map[0x303] = b'"';
    // Entry length 9, 4 entries
    map[0x304] = 0x9;
    map[0x306] = 4;

    map[0x3A0] = 2;

    if map[0] < 4 {
        map[0x380] = 11;
        // hello
        //   0 01101 01010 10001  1 10001 10100 00101
        dictionary_words(map, 0x307, &[0x3551, 0xC685]);
        // inventory
        //   0 01110 10011 11011  1 01010 10011 11001
        dictionary_words(map, 0x310, &[0x3A7B, 0xAA79]);
        // look
        //   0 10001 10100 10100  1 10000 00101 00101
        dictionary_words(map, 0x319, &[0x4694, 0xC0A5]);
        // sailor
        //   0 11000 00110 01110  1 10001 10100 10111
        dictionary_words(map, 0x322, &[0x60CE, 0xC697]);
    } else {
        map[0x380] = if map[0] == 4 { 11 } else { 10 };
        // The same words at 3 words per entry
        dictionary_words(map, 0x307, &[0x3551, 0x4685, 0x94A5]);
        dictionary_words(map, 0x310, &[0x3A7B, 0x2A79, 0xD2FE]);
        dictionary_words(map, 0x319, &[0x4694, 0x40A5, 0x94A5]);
        dictionary_words(map, 0x322, &[0x60CE, 0x4697, 0x94A5]);
    }
}

/// An unsorted dictionary with "xyzzy", "plover", and "moon"
pub fn mock_custom_dictionary(map: &mut [u8], address: usize) {
    map[address] = 3;
    map[address + 1] = b'.';
    map[address + 2] = b',';
    map[address + 3] = b'"';
    // Entry length 9, 3 entries, unsorted
    map[address + 4] = 0x9;
    map[address + 5] = 0xFF;
    map[address + 6] = 0xFD;

    // xyzzy
    //   0 11101 11110 11111  0 11111 11110 00101  1 00101 00101 00101
    dictionary_words(map, address + 7, &[0x77DF, 0x7FC5, 0x94A5]);
    // plover
    //   0 10101 10001 10100  0 11011 01010 10111  1 00101 00101 00101
    dictionary_words(map, address + 16, &[0x5634, 0x6D57, 0x94A5]);
    // moon
    //   0 10010 10100 10100  0 10011 00101 00101  1 00101 00101 00101
    dictionary_words(map, address + 25, &[0x4A94, 0x4CA5, 0x94A5]);
}

fn object_address(map: &[u8], object: usize) -> usize {
    let object_table = ((map[0x0a] as usize) << 8) + map[0x0b] as usize;
    if map[0] < 4 {
        object_table + 62 + ((object - 1) * 9)
    } else {
        object_table + 126 + ((object - 1) * 14)
    }
}

/// Set up an object entry.  Property tables are placed at $0300 + 20
/// bytes per object.
pub fn mock_object(
    map: &mut [u8],
    object: usize,
    short_name: Vec<u16>,
    (parent, sibling, child): (u16, u16, u16),
) {
    let object_address = object_address(map, object);
    let property_table_address = 0x300 + ((object - 1) * 20);

    if map[0] < 4 {
        map[object_address + 4] = parent as u8;
        map[object_address + 5] = sibling as u8;
        map[object_address + 6] = child as u8;
        map[object_address + 7] = (property_table_address >> 8) as u8;
        map[object_address + 8] = property_table_address as u8;
    } else {
        map[object_address + 6] = (parent >> 8) as u8;
        map[object_address + 7] = parent as u8;
        map[object_address + 8] = (sibling >> 8) as u8;
        map[object_address + 9] = sibling as u8;
        map[object_address + 10] = (child >> 8) as u8;
        map[object_address + 11] = child as u8;
        map[object_address + 12] = (property_table_address >> 8) as u8;
        map[object_address + 13] = property_table_address as u8;
    }

    map[property_table_address] = short_name.len() as u8;
    for (i, w) in short_name.iter().enumerate() {
        let a = property_table_address + 1 + (i * 2);
        map[a] = (*w >> 8) as u8;
        map[a + 1] = *w as u8;
    }
}

pub fn mock_attributes(map: &mut [u8], object: usize, attributes: &[u8]) {
    let object_address = object_address(map, object);
    for (i, b) in attributes.iter().enumerate() {
        map[object_address + i] = *b;
    }
}

/// Default property `n` has value `((n - 1) % 16) << 8 | (n - 1)`
pub fn mock_default_properties(map: &mut [u8]) {
    let words = if map[0] < 4 { 31 } else { 63 };
    let object_table = ((map[0x0a] as usize) << 8) + map[0x0b] as usize;
    for i in 0..words {
        let address = object_table + (i * 2);
        map[address] = (i as u8) % 0x10;
        map[address + 1] = i as u8;
    }
}

/// Write a property table for an object set up with [mock_object].
/// Properties must be in descending order.
pub fn mock_properties(map: &mut [u8], object: usize, properties: &[(u8, &[u8])]) {
    let property_table_address = 0x300 + ((object - 1) * 20);
    let hl = map[property_table_address] as usize;

    let mut address = property_table_address + 1 + (hl * 2);
    for (number, data) in properties {
        match (map[0], data.len()) {
            (1..=3, _) => {
                map[address] = (((data.len() - 1) * 32) as u8) + *number;
                for (i, b) in data.iter().enumerate() {
                    map[address + 1 + i] = *b;
                }
                address = address + 1 + data.len();
            }
            (_, 1) => {
                map[address] = *number;
                map[address + 1] = data[0];
                address += 2;
            }
            (_, 2) => {
                map[address] = 0x40 | *number;
                map[address + 1] = data[0];
                map[address + 2] = data[1];
                address += 3;
            }
            (_, _) => {
                map[address] = 0x80 | *number;
                map[address + 1] = 0x80 | (data.len() as u8 & 0x3F);
                for (i, b) in data.iter().enumerate() {
                    map[address + 2 + i] = *b;
                }
                address = address + 2 + data.len();
            }
        }
    }
}

#[macro_export]
macro_rules! assert_ok {
    ($e:expr) => {{
        let r = $e;
        assert!(r.is_ok(), "{:?}", r.err());
        r.unwrap()
    }};
}

#[macro_export]
macro_rules! assert_ok_eq {
    ($e:expr, $v:expr) => {{
        let r = $e;
        assert!(r.is_ok(), "{:?}", r.err());
        assert_eq!(r.unwrap(), $v);
    }};
}

#[macro_export]
macro_rules! assert_some_eq {
    ($e:expr, $v:expr) => {{
        let o = $e;
        assert!(o.is_some());
        assert_eq!(o.unwrap(), $v);
    }};
}

#[macro_export]
macro_rules! assert_print {
    ($e:expr) => {
        assert_eq!($crate::test_util::printed(), $e);
    };
}

#[macro_export]
macro_rules! assert_status_line {
    ($left:expr, $right:expr) => {
        assert_eq!(
            $crate::test_util::status_line(),
            ($left.to_string(), $right.to_string())
        );
    };
}

#[macro_export]
macro_rules! assert_colours {
    ($foreground:expr, $background:expr) => {
        assert_eq!($crate::test_util::colours(), ($foreground, $background));
    };
}

#[macro_export]
macro_rules! assert_split {
    ($lines:expr) => {
        assert_eq!($crate::test_util::split(), $lines);
    };
}

#[macro_export]
macro_rules! assert_window {
    ($window:expr) => {
        assert_eq!($crate::test_util::window(), $window);
    };
}

#[macro_export]
macro_rules! assert_erase_window {
    ($window:expr) => {
        assert_eq!($crate::test_util::erased_window(), $window);
    };
}

#[macro_export]
macro_rules! assert_style {
    ($style:expr) => {
        assert_eq!($crate::test_util::style(), $style);
    };
}

#[macro_export]
macro_rules! assert_beep {
    () => {
        assert!($crate::test_util::beeped());
    };
}

#[macro_export]
macro_rules! assert_played {
    ($number:expr, $effect:expr, $volume:expr, $repeats:expr) => {
        assert_eq!(
            $crate::test_util::played(),
            ($number, $effect, $volume, $repeats)
        );
    };
}
