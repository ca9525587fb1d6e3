//! Header field access
use crate::error::RuntimeError;

use super::memory::Memory;

/// Header field byte addresses
#[derive(Clone, Copy, Debug)]
pub enum HeaderField {
    Version = 0x00,
    Flags1 = 0x01,
    Release = 0x02,
    HighMark = 0x04,
    InitialPC = 0x06,
    Dictionary = 0x08,
    ObjectTable = 0x0A,
    GlobalTable = 0x0C,
    StaticMark = 0x0E,
    Flags2 = 0x10,
    Serial = 0x12,
    AbbreviationsTable = 0x18,
    FileLength = 0x1A,
    Checksum = 0x1C,
    InterpreterNumber = 0x1E,
    InterpreterVersion = 0x1F,
    ScreenLines = 0x20,
    ScreenColumns = 0x21,
    ScreenHeight = 0x22,
    ScreenWidth = 0x24,
    FontWidth = 0x26,
    FontHeight = 0x27,
    RoutinesOffset = 0x28,
    StringsOffset = 0x2A,
    DefaultBackground = 0x2C,
    DefaultForeground = 0x2D,
    TerminatorTable = 0x2E,
    Stream3Width = 0x30,
    Revision = 0x32,
    AlphabetTable = 0x34,
    ExtensionTable = 0x36,
    InformVersion = 0x3C,
}

/// Flags1 bits, versions 1-3
#[derive(Clone, Copy, Debug)]
pub enum Flags1v3 {
    StatusLineType = 1,
    StatusLineNotAvailable = 4,
    ScreenSplitAvailable = 5,
    VariablePitchDefault = 6,
}

/// Flags1 bits, versions 4+
#[derive(Clone, Copy, Debug)]
pub enum Flags1v4 {
    ColoursAvailable = 0,
    PicturesAvailable = 1,
    BoldfaceAvailable = 2,
    ItalicAvailable = 3,
    FixedSpaceAvailable = 4,
    SoundEffectsAvailable = 5,
    TimedInputAvailable = 7,
}

/// Flags2 bits
#[derive(Clone, Copy, Debug)]
pub enum Flags2 {
    Transcripting = 0,
    ForceFixedPitch = 1,
    RequestRedraw = 2,
    RequestPictures = 3,
    RequestUndo = 4,
    RequestMouse = 5,
    RequestColours = 6,
    RequestSoundEffects = 7,
}

impl From<Flags1v3> for u8 {
    fn from(value: Flags1v3) -> Self {
        value as u8
    }
}

impl From<Flags1v4> for u8 {
    fn from(value: Flags1v4) -> Self {
        value as u8
    }
}

/// Read a header field byte value
pub fn field_byte(memory: &Memory, field: HeaderField) -> Result<u8, RuntimeError> {
    memory.read_byte(field as usize)
}

/// Read a header field word value
pub fn field_word(memory: &Memory, field: HeaderField) -> Result<u16, RuntimeError> {
    memory.read_word(field as usize)
}

/// Set a header field byte value
pub fn set_byte(memory: &mut Memory, field: HeaderField, value: u8) -> Result<(), RuntimeError> {
    memory.write_byte(field as usize, value)
}

/// Set a header field word value
pub fn set_word(memory: &mut Memory, field: HeaderField, value: u16) -> Result<(), RuntimeError> {
    memory.write_word(field as usize, value)
}

/// Read a Flags1 bit
///
/// # Arguments
/// * `flag` - [Flags1v3] or [Flags1v4] bit
///
/// # Returns
/// [Result] with 1 if the flag is set, 0 if it is clear, or a [RuntimeError]
pub fn flag1<F: Into<u8>>(memory: &Memory, flag: F) -> Result<u8, RuntimeError> {
    let flags = field_byte(memory, HeaderField::Flags1)?;
    Ok((flags >> flag.into()) & 1)
}

/// Set a Flags1 bit
pub fn set_flag1<F: Into<u8>>(memory: &mut Memory, flag: F) -> Result<(), RuntimeError> {
    let flags = field_byte(memory, HeaderField::Flags1)?;
    set_byte(memory, HeaderField::Flags1, flags | (1 << flag.into()))
}

/// Clear a Flags1 bit
pub fn clear_flag1<F: Into<u8>>(memory: &mut Memory, flag: F) -> Result<(), RuntimeError> {
    let flags = field_byte(memory, HeaderField::Flags1)?;
    set_byte(memory, HeaderField::Flags1, flags & !(1 << flag.into()))
}

/// Read a Flags2 bit
///
/// # Returns
/// [Result] with 1 if the flag is set, 0 if it is clear, or a [RuntimeError]
pub fn flag2(memory: &Memory, flag: Flags2) -> Result<u16, RuntimeError> {
    let flags = field_word(memory, HeaderField::Flags2)?;
    Ok((flags >> flag as u16) & 1)
}

/// Set a Flags2 bit
pub fn set_flag2(memory: &mut Memory, flag: Flags2) -> Result<(), RuntimeError> {
    let flags = field_word(memory, HeaderField::Flags2)?;
    set_word(memory, HeaderField::Flags2, flags | (1 << flag as u16))
}

/// Clear a Flags2 bit
pub fn clear_flag2(memory: &mut Memory, flag: Flags2) -> Result<(), RuntimeError> {
    let flags = field_word(memory, HeaderField::Flags2)?;
    set_word(memory, HeaderField::Flags2, flags & !(1 << flag as u16))
}

/// Set a header extension table word, if the table exists and is long enough
///
/// # Arguments
/// * `index` - 1-based word index into the extension table
/// * `value` - Word value
pub fn set_extension(memory: &mut Memory, index: usize, value: u16) -> Result<(), RuntimeError> {
    let table = field_word(memory, HeaderField::ExtensionTable)? as usize;
    if table > 0 {
        let count = memory.read_word(table)? as usize;
        if count >= index {
            memory.write_word(table + (index * 2), value)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{assert_ok_eq, test_util::test_map};

    use super::*;

    #[test]
    fn test_field_byte() {
        let map = test_map(3);
        let memory = Memory::new(map);
        assert_ok_eq!(field_byte(&memory, HeaderField::Version), 3);
    }

    #[test]
    fn test_field_word() {
        let map = test_map(3);
        let memory = Memory::new(map);
        assert_ok_eq!(field_word(&memory, HeaderField::InitialPC), 0x400);
        assert_ok_eq!(field_word(&memory, HeaderField::ObjectTable), 0x200);
        assert_ok_eq!(field_word(&memory, HeaderField::StaticMark), 0x400);
    }

    #[test]
    fn test_set_field() {
        let map = test_map(3);
        let mut memory = Memory::new(map);
        assert!(set_byte(&mut memory, HeaderField::InterpreterNumber, 6).is_ok());
        assert_ok_eq!(field_byte(&memory, HeaderField::InterpreterNumber), 6);
        assert!(set_word(&mut memory, HeaderField::ScreenWidth, 80).is_ok());
        assert_ok_eq!(field_word(&memory, HeaderField::ScreenWidth), 80);
    }

    #[test]
    fn test_flag1_v3() {
        let map = test_map(3);
        let mut memory = Memory::new(map);
        assert_ok_eq!(flag1(&memory, Flags1v3::ScreenSplitAvailable), 0);
        assert!(set_flag1(&mut memory, Flags1v3::ScreenSplitAvailable).is_ok());
        assert_ok_eq!(flag1(&memory, Flags1v3::ScreenSplitAvailable), 1);
        assert_ok_eq!(flag1(&memory, Flags1v3::StatusLineNotAvailable), 0);
        assert!(clear_flag1(&mut memory, Flags1v3::ScreenSplitAvailable).is_ok());
        assert_ok_eq!(flag1(&memory, Flags1v3::ScreenSplitAvailable), 0);
    }

    #[test]
    fn test_flag1_v4() {
        let map = test_map(5);
        let mut memory = Memory::new(map);
        assert!(set_flag1(&mut memory, Flags1v4::ColoursAvailable).is_ok());
        assert!(set_flag1(&mut memory, Flags1v4::TimedInputAvailable).is_ok());
        assert_ok_eq!(field_byte(&memory, HeaderField::Flags1), 0x81);
        assert!(clear_flag1(&mut memory, Flags1v4::ColoursAvailable).is_ok());
        assert_ok_eq!(field_byte(&memory, HeaderField::Flags1), 0x80);
    }

    #[test]
    fn test_flag2() {
        let map = test_map(3);
        let mut memory = Memory::new(map);
        assert_ok_eq!(flag2(&memory, Flags2::Transcripting), 0);
        assert!(set_flag2(&mut memory, Flags2::Transcripting).is_ok());
        assert_ok_eq!(flag2(&memory, Flags2::Transcripting), 1);
        assert_ok_eq!(field_word(&memory, HeaderField::Flags2), 1);
        assert!(clear_flag2(&mut memory, Flags2::Transcripting).is_ok());
        assert_ok_eq!(flag2(&memory, Flags2::Transcripting), 0);
    }

    #[test]
    fn test_set_extension() {
        let mut map = test_map(5);
        // Extension table at 0x300 with 2 words
        map[0x36] = 0x03;
        map[0x37] = 0x00;
        map[0x300] = 0x00;
        map[0x301] = 0x02;
        let mut memory = Memory::new(map);
        assert!(set_extension(&mut memory, 1, 0x1234).is_ok());
        assert_ok_eq!(memory.read_word(0x302), 0x1234);
        // Index past the table length is ignored
        assert!(set_extension(&mut memory, 3, 0x5678).is_ok());
        assert_ok_eq!(memory.read_word(0x306), 0);
    }

    #[test]
    fn test_set_extension_no_table() {
        let map = test_map(3);
        let mut memory = Memory::new(map);
        assert!(set_extension(&mut memory, 1, 0x1234).is_ok());
    }
}
