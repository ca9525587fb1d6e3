//! ZSCII text encoding and lexical analysis
use std::cmp::Ordering;

use crate::{
    error::{ErrorCode, RuntimeError},
    fatal_error,
    zmachine::{header::HeaderField, ZMachine},
};

/// Version 3+ alphabets
const ALPHABET_V3: [[char; 26]; 3] = [
    [
        'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r',
        's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
    ],
    [
        'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R',
        'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
    ],
    [
        ' ', '\r', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', '.', ',', '!', '?', '_', '#',
        '\'', '"', '/', '\\', '-', ':', '(', ')',
    ],
];

/// Version 1 alphabets, which have a different A2 row
const ALPHABET_V1: [[char; 26]; 3] = [
    [
        'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r',
        's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
    ],
    [
        'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R',
        'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
    ],
    [
        ' ', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', '.', ',', '!', '?', '_', '#', '\'',
        '"', '/', '\\', '<', '-', ':', '(', ')',
    ],
];

/// Translate an alphabet character to its ZSCII value.
///
/// Versions 5+ may supply a custom alphabet table via the header; row 2
/// character 7 is always newline regardless of the table contents.
///
/// # Arguments
/// * `zmachine` - Reference to the zmachine
/// * `row` - Alphabet row (0-2)
/// * `zchar` - Z-character (6-31)
///
/// # Returns
/// [Result] with the ZSCII value or a [RuntimeError]
fn alphabet_zscii(zmachine: &ZMachine, row: usize, zchar: u8) -> Result<u16, RuntimeError> {
    if zmachine.version() >= 5 {
        let table = zmachine.header_word(HeaderField::AlphabetTable)? as usize;
        if table > 0 {
            if row == 2 && zchar == 7 {
                return Ok(0x0d);
            }
            return Ok(zmachine.read_byte(table + (row * 26) + zchar as usize - 6)? as u16);
        }
    }

    let alphabet = if zmachine.version() == 1 {
        &ALPHABET_V1
    } else {
        &ALPHABET_V3
    };
    Ok(alphabet[row][zchar as usize - 6] as u16)
}

/// Decode an abbreviation
///
/// # Arguments
/// * `zmachine` - Reference to the zmachine
/// * `abbrev_table` - Abbreviation table index (1-3)
/// * `index` - Abbreviation index within the table
///
/// # Returns
/// [Result] containing the abbreviation text or a [RuntimeError]
fn abbreviation(
    zmachine: &ZMachine,
    abbrev_table: u8,
    index: u8,
) -> Result<Vec<u16>, RuntimeError> {
    let abbreviation_table = zmachine.header_word(HeaderField::AbbreviationsTable)? as usize;
    let entry = (64 * (abbrev_table as usize - 1)) + (index as usize * 2);
    let word_addr = zmachine.read_word(abbreviation_table + entry)? as usize;
    as_text(zmachine, word_addr * 2, true)
}

/// Read encoded ztext from an address and decode it to ZSCII
///
/// # Arguments
/// * `zmachine` - Reference to the zmachine
/// * `address` - Byte address of the text
/// * `is_abbreviation` - `true` when decoding an abbreviation, `false` if not
///
/// # Returns
/// [Result] containing the decoded text or a [RuntimeError]
pub fn as_text(
    zmachine: &ZMachine,
    address: usize,
    is_abbreviation: bool,
) -> Result<Vec<u16>, RuntimeError> {
    from_vec(
        zmachine,
        &zmachine.string_literal(address)?,
        is_abbreviation,
    )
}

/// Decode a vector of ztext words to ZSCII.
///
/// Abbreviations may not contain abbreviations; a [RuntimeError] is returned
/// when one does.
///
/// # Arguments:
/// * `zmachine` - Reference to the zmachine
/// * `ztext` - Vector of encoded ztext
/// * `is_abbreviation` - `true` when decoding an abbreviation, `false` if not
///
/// # Returns
/// [Result] containing the decoded text or a [RuntimeError]
pub fn from_vec(
    zmachine: &ZMachine,
    ztext: &[u16],
    is_abbreviation: bool,
) -> Result<Vec<u16>, RuntimeError> {
    if zmachine.version() < 3 {
        decode_shift_lock(zmachine, ztext, is_abbreviation)
    } else {
        decode_standard(zmachine, ztext, is_abbreviation)
    }
}

/// Decode at most `limit` bytes of ztext to ZSCII.
///
/// Truncation can land mid-sequence; an incomplete 10-bit escape produces no
/// output character and a dangling shift resolves to nothing.
///
/// # Arguments:
/// * `zmachine` - Reference to the zmachine
/// * `ztext` - Vector of encoded ztext
/// * `limit` - Maximum number of source bytes to decode
///
/// # Returns
/// [Result] containing the decoded text or a [RuntimeError]
pub fn from_vec_limited(
    zmachine: &ZMachine,
    ztext: &[u16],
    limit: usize,
) -> Result<Vec<u16>, RuntimeError> {
    let words = usize::min(ztext.len(), limit / 2);
    from_vec(zmachine, &ztext[0..words], false)
}

/// Version 1 and 2 decoder.
///
/// Z-characters 2 and 3 shift the alphabet for the next character only, 4 and
/// 5 lock the shift. In version 1 z-character 1 is newline; in version 2 it
/// selects the single abbreviation table.
fn decode_shift_lock(
    zmachine: &ZMachine,
    ztext: &[u16],
    is_abbreviation: bool,
) -> Result<Vec<u16>, RuntimeError> {
    let version = zmachine.version();
    let mut s = Vec::new();

    let mut base = 0;
    let mut shift: Option<usize> = None;
    let mut abbrev = false;
    let mut zscii_read1 = false;
    let mut zscii_read2 = false;
    let mut zscii_b1 = 0;

    for w in ztext {
        let b1 = (w >> 10 & 0x1F) as u8;
        let b2 = (w >> 5 & 0x1F) as u8;
        let b3 = (w & 0x1F) as u8;

        for b in [b1, b2, b3] {
            if abbrev {
                let mut a = abbreviation(zmachine, 1, b)?;
                s.append(&mut a);
                abbrev = false;
                continue;
            } else if zscii_read1 {
                zscii_b1 = b;
                zscii_read2 = true;
                zscii_read1 = false;
                continue;
            } else if zscii_read2 {
                let z = (((zscii_b1 as u16) << 5) & 0x3E0) | b as u16;
                s.push(z);
                zscii_read2 = false;
                continue;
            }

            let current = shift.take().unwrap_or(base);
            match b {
                0 => s.push(0x20),
                1 => {
                    if version == 1 {
                        s.push(0x0d)
                    } else if !is_abbreviation {
                        abbrev = true
                    } else {
                        return fatal_error!(
                            ErrorCode::InvalidAbbreviation,
                            "Abbreviations can't nest",
                        );
                    }
                }
                2 => shift = Some((base + 1) % 3),
                3 => shift = Some((base + 2) % 3),
                4 => base = (base + 1) % 3,
                5 => base = (base + 2) % 3,
                6 if current == 2 => zscii_read1 = true,
                _ => s.push(alphabet_zscii(zmachine, current, b)?),
            }
        }
    }

    Ok(s)
}

/// Version 3+ decoder.
///
/// Z-characters 4 and 5 shift the alphabet for the next character only, and
/// 1-3 select an abbreviation table.
fn decode_standard(
    zmachine: &ZMachine,
    ztext: &[u16],
    is_abbreviation: bool,
) -> Result<Vec<u16>, RuntimeError> {
    let mut alphabet_shift: usize = 0;
    let mut s = Vec::new();

    let mut abbrev = 0;
    let mut zscii_read1 = false;
    let mut zscii_read2 = false;
    let mut zscii_b1 = 0;

    for w in ztext {
        let b1 = (w >> 10 & 0x1F) as u8;
        let b2 = (w >> 5 & 0x1F) as u8;
        let b3 = (w & 0x1F) as u8;

        for b in [b1, b2, b3] {
            if abbrev > 0 {
                let mut a = abbreviation(zmachine, abbrev, b)?;
                s.append(&mut a);
                abbrev = 0;
            } else if zscii_read1 {
                zscii_b1 = b;
                zscii_read2 = true;
                zscii_read1 = false;
            } else if zscii_read2 {
                let z = (((zscii_b1 as u16) << 5) & 0x3E0) | b as u16;
                s.push(z);
                zscii_read2 = false;
            } else {
                match b {
                    0 => s.push(0x20),
                    1..=3 => {
                        if !is_abbreviation {
                            abbrev = b
                        } else {
                            return fatal_error!(
                                ErrorCode::InvalidAbbreviation,
                                "Abbreviations can't nest",
                            );
                        }
                    }
                    4 => alphabet_shift = 1,
                    5 => alphabet_shift = 2,
                    6 if alphabet_shift == 2 => zscii_read1 = true,
                    _ => s.push(alphabet_zscii(zmachine, alphabet_shift, b)?),
                }
            }
            if b != 4 && b != 5 {
                alphabet_shift = 0;
            }
        }
    }

    Ok(s)
}

/// Get the set of word separators from a dictionary
fn separators(zmachine: &ZMachine, dictionary_address: usize) -> Result<Vec<char>, RuntimeError> {
    let separator_count = zmachine.read_byte(dictionary_address)?;
    let mut sep = Vec::new();
    for i in 1..=separator_count as usize {
        let c = zmachine.read_byte(dictionary_address + i)? as char;
        sep.push(c);
    }

    Ok(sep)
}

/// Find the ztext sequence for a character.
///
/// # Arguments
/// * `version` - Story file version
/// * `zchar` - Character to look up
///
/// # Returns
/// Vector containing the ztext sequence for the character with any required
/// alphabet shift. If the character isn't part of the standard alphabet, a
/// four-character 10-bit ZSCII escape sequence is returned.
fn find_char(version: u8, zchar: u16) -> Vec<u16> {
    let c = (zchar as u8) as char;
    if c == ' ' {
        return vec![0];
    }

    // V2 uses the standard alphabet but the early shift characters
    let (alphabet, a1_shift, a2_shift) = match version {
        1 => (&ALPHABET_V1, 2, 3),
        2 => (&ALPHABET_V3, 2, 3),
        _ => (&ALPHABET_V3, 4, 5),
    };

    for i in 0..26 {
        if alphabet[0][i] == c {
            return vec![i as u16 + 6];
        }
    }

    for i in 0..26 {
        if alphabet[1][i] == c {
            return vec![a1_shift, i as u16 + 6];
        }
    }

    for i in 0..26 {
        if alphabet[2][i] == c {
            return vec![a2_shift, i as u16 + 6];
        }
    }

    let z1 = (c as u8 >> 5) & 0x1f;
    let z2 = c as u8 & 0x1f;
    vec![a2_shift, 6, z1 as u16, z2 as u16]
}

/// Encode 3 5-bit ztext characters into a word: 01111122 22233333
fn as_word(z1: u16, z2: u16, z3: u16) -> u16 {
    ((z1 & 0x1F) << 10) | ((z2 & 0x1F) << 5) | z3 & 0x1F
}

/// Encode a word for dictionary lookup.
///
/// A character whose escape sequence doesn't fit in the remaining space is
/// dropped rather than truncated mid-sequence. Unused space is padded with
/// z-character 5 and the final word has its high bit set.
///
/// # Arguments
/// * `version` - Story file version
/// * `word` - Word to encode as a vector of ZSCII characters
/// * `words` - the number of encoded words in the result - 2 for v1-3 (6
///   characters) and 3 for v4+ (9 characters)
///
/// # Returns
/// Vector of encoded ztext words
pub fn encode_text(version: u8, word: &mut Vec<u16>, words: usize) -> Vec<u16> {
    let capacity = words * 3;
    let mut zchars = Vec::new();

    word.truncate(capacity);
    for c in word {
        let mut z = find_char(version, *c);
        if zchars.len() + z.len() > capacity {
            break;
        }
        zchars.append(&mut z);
    }

    // Pad to length
    zchars.resize(capacity, 5);

    debug!(target: "app::text", "Lexical analysis: zchars: {:?}", zchars);

    let mut zwords = Vec::new();
    for i in 0..words {
        let index = i * 3;
        let mut w = as_word(zchars[index], zchars[index + 1], zchars[index + 2]);
        if i == words - 1 {
            w |= 0x8000;
        }
        zwords.push(w);
    }

    zwords
}

/// Perform a binary search for a word in a sorted dictionary
///
/// # Arguments
/// * `zmachine` - Reference to the zmachine
/// * `address` - Address of the first entry in the dictionary
/// * `entry_count` - Number of entries in the dictionary
/// * `entry_size` - Dictionary entry size
/// * `word` - Encoded ztext for the word to find
///
/// # Returns
/// [Result] containing the address of the matching dictionary entry, 0 if not
/// found, or a [RuntimeError]
fn search_entry(
    zmachine: &ZMachine,
    address: usize,
    entry_count: usize,
    entry_size: usize,
    word: &[u16],
) -> Result<usize, RuntimeError> {
    let mut min = 0;
    let mut max = entry_count - 1;
    let mut pivot = max / 2;

    'outer: loop {
        let addr = address + (pivot * entry_size);
        for (i, wrd) in word.iter().enumerate() {
            let w = zmachine.read_word(addr + (i * 2))?;
            match w.cmp(wrd) {
                Ordering::Greater => {
                    if pivot == min {
                        break 'outer;
                    }
                    max = pivot - 1;
                    let new_pivot = min + ((max - min) / 2);
                    if new_pivot == pivot {
                        pivot = new_pivot - 1;
                    } else {
                        pivot = new_pivot;
                    }
                    continue 'outer;
                }
                Ordering::Less => {
                    if pivot == max {
                        break 'outer;
                    }
                    min = pivot + 1;
                    let new_pivot = min + ((max - min) / 2);
                    if new_pivot == pivot {
                        pivot = new_pivot + 1;
                    } else {
                        pivot = new_pivot
                    }
                    if pivot > max {
                        break 'outer;
                    }
                    continue 'outer;
                }
                Ordering::Equal => {}
            }
        }

        return Ok(addr);
    }

    Ok(0)
}

/// Perform a scan for a word in an unsorted dictionary
///
/// # Arguments
/// * `zmachine` - Reference to the zmachine
/// * `address` - Address of the first entry in the dictionary
/// * `entry_count` - Number of entries in the dictionary
/// * `entry_size` - Dictionary entry size
/// * `words` - Encoded ztext for the word to find
///
/// # Returns
/// [Result] containing the address of the matching dictionary entry, 0 if not
/// found, or a [RuntimeError]
fn scan_entry(
    zmachine: &ZMachine,
    address: usize,
    entry_count: usize,
    entry_size: usize,
    words: &[u16],
) -> Result<usize, RuntimeError> {
    'outer: for i in 0..entry_count {
        let entry_address = address + (i * entry_size);
        for (j, w) in words.iter().enumerate() {
            let ew = zmachine.read_word(entry_address + (j * 2))?;
            if ew != *w {
                continue 'outer;
            }
        }

        return Ok(entry_address);
    }

    Ok(0)
}

/// Find the address of the dictionary entry for a word, if any.
///
/// A positive entry count marks a sorted dictionary searched by bisection; a
/// negative count marks an unsorted dictionary scanned linearly.
///
/// # Arguments
/// * `zmachine` - Reference to the zmachine
/// * `dictionary_address` - Address of the dictionary
/// * `word` - Word to find as a vector of characters
///
/// # Returns
/// [Result] containing the address of the matching dictionary entry, 0 if not
/// found, or a [RuntimeError]
fn from_dictionary(
    zmachine: &ZMachine,
    dictionary_address: usize,
    word: &[char],
) -> Result<usize, RuntimeError> {
    let separator_count = zmachine.read_byte(dictionary_address)? as usize;
    let entry_size = zmachine.read_byte(dictionary_address + separator_count + 1)? as usize;
    let entry_count = zmachine.read_word(dictionary_address + separator_count + 2)? as i16;
    let word_count = if zmachine.version() < 4 { 2 } else { 3 };
    debug!(target: "app::text", "Lexical analysis: dictionary @ {:04x}, {} separators, {} entries of size {}", dictionary_address, separator_count, entry_count, entry_size);

    let mut zchars = word.iter().map(|c| *c as u16).collect::<Vec<u16>>();
    let words = encode_text(zmachine.version(), &mut zchars, word_count);
    debug!(target: "app::text", "Lexical analysis: encoded text: {:?}", words);

    if entry_count > 0 {
        search_entry(
            zmachine,
            dictionary_address + separator_count + 4,
            entry_count as usize,
            entry_size,
            &words,
        )
    } else {
        scan_entry(
            zmachine,
            dictionary_address + separator_count + 4,
            i16::abs(entry_count) as usize,
            entry_size,
            &words,
        )
    }
}

/// Find a word in a dictionary and store the result into the parse buffer
///
/// # Arguments
/// * `zmachine` - Reference to the zmachine
/// * `dictionary` - byte address of the dictionary
/// * `parse_buffer` - parse buffer address
/// * `flag` - if `true`, the parse buffer is only updated for words that are
///   in the dictionary
/// * `parse_index` - index to the parse buffer
/// * `(word_count, word_start)` - the number of words parsed and the starting
///   index of the word from the text buffer
/// * `word` - Word to find
///
/// # Returns
/// [Result] with a tuple (new parse_index, new parsed word_count) or a
/// [RuntimeError]
fn find_word(
    zmachine: &mut ZMachine,
    dictionary: usize,
    parse_buffer: usize,
    flag: bool,
    parse_index: usize,
    (word_count, word_start): (usize, usize),
    word: &Vec<char>,
) -> Result<(usize, usize), RuntimeError> {
    let entry = from_dictionary(zmachine, dictionary, word)?;
    let offset = if zmachine.version() < 5 { 1 } else { 2 };

    debug!(target: "app::text", "Lexical analysis: {:?} => {:04x}", word, entry);
    let parse_address = parse_buffer + 2 + (4 * parse_index);
    if !flag {
        store_parsed_entry(
            zmachine,
            word,
            word_start + offset,
            parse_address,
            entry as u16,
        )?;
        Ok((parse_index + 1, word_count + 1))
    } else if entry > 0 {
        let e = zmachine.read_word(parse_address)?;
        if e == 0 {
            store_parsed_entry(
                zmachine,
                word,
                word_start + offset,
                parse_address,
                entry as u16,
            )?;
            Ok((parse_index + 1, word_count + 1))
        } else {
            Ok((parse_index + 1, word_count))
        }
    } else {
        Ok((parse_index + 1, word_count))
    }
}

/// Store a word entry to the parse buffer
fn store_parsed_entry(
    zmachine: &mut ZMachine,
    word: &Vec<char>,
    word_start: usize,
    entry_address: usize,
    entry: u16,
) -> Result<(), RuntimeError> {
    debug!(target: "app::text", "Lexical analysis: dictionary for {:?} => stored to ${:04x}: {:#04x}/{}/{}", word, entry_address, entry, word.len(), word_start);
    zmachine.write_word(entry_address, entry)?;
    zmachine.write_byte(entry_address + 2, word.len() as u8)?;
    zmachine.write_byte(entry_address + 3, word_start as u8)?;
    Ok(())
}

/// Parse a text buffer into a parse buffer.
///
/// # Arguments
/// * `zmachine` - Reference to the zmachine
/// * `text_buffer` - Input text buffer address
/// * `parse_buffer` - Parse buffer address
/// * `dictionary` - Dictionary address
/// * `flag` - If `true`, the parse buffer is not updated for words that
///   aren't found in the dictionary
///
/// # Returns
/// Empty [Result] or a [RuntimeError]
pub fn parse_text(
    zmachine: &mut ZMachine,
    text_buffer: usize,
    parse_buffer: usize,
    dictionary: usize,
    flag: bool,
) -> Result<(), RuntimeError> {
    debug!(target: "app::text", "Lexical analysis: text @ {:04x}, parse @ {:04x}, dictionary @ {:04x}, skip {}", text_buffer, parse_buffer, dictionary, flag);
    let separators = separators(zmachine, dictionary)?;
    let mut word = Vec::new();
    let mut word_start: usize = 0;
    let mut word_count: usize = 0;
    let mut words: usize = 0;
    let mut data = Vec::new();

    if zmachine.version() < 5 {
        // Buffer is 0 terminated
        let mut i = 1;
        loop {
            let b = zmachine.read_byte(text_buffer + i)?;
            if b == 0 {
                break;
            } else {
                data.push(b);
                i += 1;
            }
        }
    } else {
        // Input length is stored in the second byte
        let n = zmachine.read_byte(text_buffer + 1)? as usize;
        for i in 0..n {
            data.push(zmachine.read_byte(text_buffer + 2 + i)?);
        }
    }

    let max_words = zmachine.read_byte(parse_buffer)? as usize;

    for (i, b) in data.iter().enumerate() {
        let c = (*b as char).to_ascii_lowercase();
        if word_count >= max_words {
            break;
        }

        if separators.contains(&c) {
            // Store the word
            if !word.is_empty() && word_count < max_words {
                (word_count, words) = find_word(
                    zmachine,
                    dictionary,
                    parse_buffer,
                    flag,
                    word_count,
                    (words, word_start),
                    &word,
                )?;
            }

            // Separators are words, too
            if word_count < max_words {
                let sep = vec![c];
                (word_count, words) = find_word(
                    zmachine,
                    dictionary,
                    parse_buffer,
                    flag,
                    word_count,
                    (words, word_start + word.len()),
                    &sep,
                )?;
            }
            word.clear();
            word_start = i + 1;
        } else if c == ' ' {
            // Store the word but not the space
            if !word.is_empty() && word_count < max_words {
                (word_count, words) = find_word(
                    zmachine,
                    dictionary,
                    parse_buffer,
                    flag,
                    word_count,
                    (words, word_start),
                    &word,
                )?;
            }
            word.clear();
            word_start = i + 1;
        } else {
            word.push(c)
        }
    }

    // End of input, parse anything collected
    if !word.is_empty() && word_count < max_words {
        (_, words) = find_word(
            zmachine,
            dictionary,
            parse_buffer,
            flag,
            word_count,
            (words, word_start),
            &word,
        )?;
    }

    // If flag is true, then a previous analysis pass has already set the
    // correct parse buffer size
    if !flag {
        zmachine.write_byte(parse_buffer + 1, words as u8)?;
    }

    Ok(())
}
