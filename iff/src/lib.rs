//! Minimal IFF chunk container, sufficient for Quetzal save files.
//!
//! A chunk is either a data chunk (4-byte id, 4-byte big-endian length,
//! payload, padded to an even byte boundary) or a `FORM` group chunk with a
//! 4-byte sub id followed by nested chunks.
use core::fmt;

#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
    id: Vec<u8>,
    length: u32,
    sub_id: Vec<u8>,
    chunks: Vec<Chunk>,
    data: Vec<u8>,
}

/// Translates a chunk id string to its 4-byte form, space-padded or
/// truncated as needed.
fn id_to_vec(id: &str) -> Vec<u8> {
    let mut id = String::from(id);
    id.push_str("    ");
    id.as_bytes()[0..4].to_vec()
}

impl Chunk {
    pub fn new_chunk(id: &str, data: Vec<u8>) -> Chunk {
        Chunk {
            id: id_to_vec(id),
            length: data.len() as u32,
            sub_id: Vec::new(),
            chunks: Vec::new(),
            data,
        }
    }

    pub fn new_form(sub_id: &str, chunks: Vec<Chunk>) -> Chunk {
        // FORM length covers the sub id plus each child's header and
        // (unpadded) payload
        let length = chunks.iter().fold(4, |l, c| l + 8 + c.length);
        Chunk {
            id: id_to_vec("FORM"),
            length,
            sub_id: id_to_vec(sub_id),
            chunks,
            data: Vec::new(),
        }
    }

    pub fn id(&self) -> String {
        self.id.iter().map(|x| *x as char).collect::<String>()
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn sub_id(&self) -> String {
        self.sub_id.iter().map(|x| *x as char).collect::<String>()
    }

    pub fn chunks(&self) -> &Vec<Chunk> {
        &self.chunks
    }

    pub fn data(&self) -> &Vec<u8> {
        &self.data
    }

    /// Finds the first direct child chunk with the matching id.
    pub fn find_chunk(&self, id: &str) -> Option<&Chunk> {
        self.chunks.iter().find(|x| x.id() == id)
    }

    /// Finds the first direct child chunk matching any of the ids, in the
    /// order given.
    pub fn find_first_chunk(&self, ids: &[&str]) -> Option<&Chunk> {
        for id in ids {
            if let Some(c) = self.find_chunk(id) {
                return Some(c);
            }
        }

        None
    }
}

/// Interprets a big-endian byte slice as an unsigned value.
pub fn vec_as_unsigned(v: &[u8]) -> usize {
    let mut u: usize = 0;
    for (i, b) in v.iter().enumerate() {
        u |= (*b as usize) << ((v.len() - 1 - i) * 8);
    }

    u
}

/// Encodes an unsigned value as `length` big-endian bytes.
pub fn unsigned_as_vec(value: usize, length: usize) -> Vec<u8> {
    let mut v = Vec::new();
    for i in (0..length).rev() {
        v.push(((value >> (8 * i)) & 0xFF) as u8);
    }
    v
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.id() == "FORM" {
            write!(
                f,
                "{}/{}, {:06x} bytes with {} chunks",
                self.id(),
                self.sub_id(),
                self.length,
                self.chunks.len()
            )
        } else {
            write!(f, "{}, {:06x} bytes of data", self.id(), self.data.len())
        }
    }
}

impl From<&Chunk> for Vec<u8> {
    fn from(value: &Chunk) -> Self {
        let mut data = Vec::new();
        data.extend(&value.id);
        data.extend(unsigned_as_vec(value.length() as usize, 4));
        if value.sub_id.is_empty() {
            data.extend(value.data());
        } else {
            data.extend(&value.sub_id);
            for c in value.chunks() {
                data.extend(Vec::from(c))
            }
        }
        if data.len() % 2 == 1 {
            data.push(0);
        }

        data
    }
}

impl From<&[u8]> for Chunk {
    fn from(value: &[u8]) -> Self {
        let id = value[0..4].to_vec();
        let length = vec_as_unsigned(&value[4..8]) as u32;
        if id == [b'F', b'O', b'R', b'M'] {
            let sub_id = value[8..12].to_vec();
            let mut chunks = Vec::new();
            let mut offset = 12;
            while offset < 8 + length as usize {
                let chunk = Chunk::from(&value[offset..]);
                offset += 8 + chunk.length() as usize;
                if offset % 2 == 1 {
                    offset += 1;
                }
                chunks.push(chunk);
            }

            Chunk {
                id,
                length,
                sub_id,
                chunks,
                data: Vec::new(),
            }
        } else {
            let data = value[8..8 + length as usize].to_vec();
            Chunk {
                id,
                length,
                sub_id: Vec::new(),
                chunks: Vec::new(),
                data,
            }
        }
    }
}
