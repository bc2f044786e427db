use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{self, Write};

use crate::cursor::ByteCursor;
use crate::error::{FshError, Result};

pub const MAGIC: &[u8; 4] = b"SHPI";
/// Directory id stamped by the writer when the caller does not pick one.
pub const DEFAULT_DIR_ID: [u8; 4] = *b"G264";
pub const HEADER_SIZE: usize = 16;
pub const DIR_ENTRY_SIZE: usize = 8;

/// The 16-byte container header.
///
/// `size` is whatever the file claims; it bounds the last entry's trailing
/// data for the mip-chain check and is never used to bound a read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FshHeader {
    pub magic:   [u8; 4],
    pub size:    u32,
    pub count:   u32,
    pub dir_id:  [u8; 4],
}

impl FshHeader {
    pub fn new(count: u32, dir_id: [u8; 4]) -> Self {
        Self {
            magic: *MAGIC,
            size:  0,
            count,
            dir_id,
        }
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&self.magic)?;
        writer.write_u32::<LittleEndian>(self.size)?;
        writer.write_u32::<LittleEndian>(self.count)?;
        writer.write_all(&self.dir_id)?;
        Ok(())
    }

    pub fn read(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let magic = cursor.read_tag()?;
        if &magic != MAGIC {
            return Err(FshError::format(format!(
                "bad container magic {:?}, expected \"SHPI\"",
                String::from_utf8_lossy(&magic)
            )));
        }
        Ok(Self {
            magic,
            size:   cursor.read_u32_le()?,
            count:  cursor.read_u32_le()?,
            dir_id: cursor.read_tag()?,
        })
    }
}

/// One directory slot: a 4-byte name and the absolute offset of the entry
/// header.  Names need not be unique; position in the directory is identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirEntry {
    pub name:   [u8; 4],
    pub offset: u32,
}

impl DirEntry {
    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_all(&self.name)?;
        writer.write_u32::<LittleEndian>(self.offset)?;
        Ok(())
    }

    pub fn read(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        Ok(Self {
            name:   cursor.read_tag()?,
            offset: cursor.read_u32_le()?,
        })
    }

    /// Name as text when it is printable ASCII, hex otherwise.
    pub fn display_name(&self) -> String {
        display_tag(&self.name)
    }
}

pub fn display_tag(tag: &[u8; 4]) -> String {
    if tag.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
        String::from_utf8_lossy(tag).into_owned()
    } else {
        format!("0x{}", hex::encode(tag))
    }
}

/// Inverse of [`display_tag`]: four characters, or `0x` and eight hex digits.
pub fn parse_tag(s: &str) -> Option<[u8; 4]> {
    let bytes = match s.strip_prefix("0x") {
        Some(digits) if digits.len() == 8 => hex::decode(digits).ok()?,
        _ => s.as_bytes().to_vec(),
    };
    bytes.try_into().ok()
}

/// Bytes from the start of the container to the first entry header.
pub fn directory_end(count: usize) -> usize {
    HEADER_SIZE + DIR_ENTRY_SIZE * count
}

/// Where the trailing data of the entry at `own` stops: the nearest directory
/// offset strictly after it, else the declared container size.
///
/// Only offsets below `declared_size` compete, so a directory that points
/// past the declared end does not shrink earlier entries.
pub fn next_boundary(own: u32, offsets: &[u32], declared_size: u32) -> u32 {
    offsets
        .iter()
        .copied()
        .filter(|&o| o > own && o < declared_size)
        .min()
        .unwrap_or(declared_size)
}
