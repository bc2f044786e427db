//! Per-entry header: format code, dimensions, misc words, and the
//! auxiliary data hanging off it.
//!
//! The 32-bit code word packs two things: the low 7 bits are the bitmap
//! format, bit 7 marks an individually compressed entry, and the upper
//! 24 bits are the byte distance from this header to the next attachment
//! header (0 when there is none).

use byteorder::{LittleEndian, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};

use crate::cursor::ByteCursor;
use crate::error::{FshError, Result};
use crate::texture::BitmapFormat;

pub const ENTRY_HEADER_SIZE: usize = 16;
pub const COMPRESSED_FLAG: u32 = 0x80;
const FORMAT_MASK: u32 = 0x7F;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryHeader {
    pub code:   u32,
    pub width:  u16,
    pub height: u16,
    pub misc:   [u16; 4],
}

impl EntryHeader {
    pub fn new(format: BitmapFormat, width: u16, height: u16) -> Self {
        Self {
            code: format.code() as u32,
            width,
            height,
            misc: [0; 4],
        }
    }

    pub fn write<W: Write>(&self, mut writer: W) -> io::Result<()> {
        writer.write_u32::<LittleEndian>(self.code)?;
        writer.write_u16::<LittleEndian>(self.width)?;
        writer.write_u16::<LittleEndian>(self.height)?;
        for m in self.misc {
            writer.write_u16::<LittleEndian>(m)?;
        }
        Ok(())
    }

    pub fn read(cursor: &mut ByteCursor<'_>) -> Result<Self> {
        let code   = cursor.read_u32_le()?;
        let width  = cursor.read_u16_le()?;
        let height = cursor.read_u16_le()?;
        let mut misc = [0u16; 4];
        for m in misc.iter_mut() {
            *m = cursor.read_u16_le()?;
        }
        Ok(Self { code, width, height, misc })
    }

    pub fn format_code(&self) -> u8 {
        (self.code & FORMAT_MASK) as u8
    }

    pub fn is_compressed(&self) -> bool {
        self.code & COMPRESSED_FLAG != 0
    }

    /// Byte distance to the first attachment (or past the mip chain).
    pub fn aux_len(&self) -> u32 {
        self.code >> 8
    }

    /// Number of extra mip levels announced in the top nibble of `misc[3]`,
    /// whatever the dimensions.
    pub fn mip_depth(&self) -> u32 {
        ((self.misc[3] >> 12) & 0x0F) as u32
    }
}

/// The two byte lengths a well-formed mip chain can have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MipChainLen {
    /// Every level padded to 16 bytes.
    pub per_level: usize,
    /// Levels packed back to back, padded to 16 bytes once at the end.
    pub packed:    usize,
}

/// Expected size of the base image plus `depth` halvings.
///
/// DXT1 levels are rounded up to whole 4×4 blocks and never padded; the
/// other formats get 16-byte alignment as described on [`MipChainLen`].
pub fn mip_chain_len(format: BitmapFormat, width: usize, height: usize, depth: u32) -> MipChainLen {
    let nibbles = format.nibbles_per_pixel();
    let mut per_level = 0usize;
    let mut packed = 0usize;
    for n in 0..=depth {
        let mut w = width >> n;
        let mut h = height >> n;
        if format == BitmapFormat::Dxt1 {
            w = w.next_multiple_of(4);
            h = h.next_multiple_of(4);
        }
        let level = w * h * nibbles / 2;
        per_level += level;
        packed += level;
        if format != BitmapFormat::Dxt1 {
            per_level = per_level.next_multiple_of(16);
            if n == depth {
                packed = packed.next_multiple_of(16);
            }
        }
    }
    MipChainLen { per_level, packed }
}

/// Refuse entries that carry a mip chain.
///
/// The declared aux length (or, when it is 0, the distance to `boundary`)
/// is compared with both candidate chain lengths only to tell a consistent
/// chain from a corrupt one in the error; either way the entry is rejected.
pub fn check_mip_chain(
    header:   &EntryHeader,
    format:   BitmapFormat,
    offset:   usize,
    boundary: usize,
) -> Result<()> {
    let depth = header.mip_depth();
    if depth == 0 {
        return Ok(());
    }

    let chain = mip_chain_len(format, header.width as usize, header.height as usize, depth);
    let aux = header.aux_len() as usize;
    let fits = |len: usize| {
        if aux != 0 {
            aux == len + ENTRY_HEADER_SIZE
        } else {
            offset + ENTRY_HEADER_SIZE + len == boundary
        }
    };

    if fits(chain.per_level) || fits(chain.packed) {
        Err(FshError::format(format!(
            "entry at 0x{offset:x} carries a {depth}-level mip chain; multiscale bitmaps are not supported"
        )))
    } else {
        Err(FshError::format(format!(
            "entry at 0x{offset:x} announces {depth} mip level(s) but its trailing data \
             matches neither {} nor {} bytes",
            chain.per_level, chain.packed
        )))
    }
}

/// An auxiliary block chained after an entry (palette, text, metrics...).
/// Listed for inspection, never decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub offset: u32,
    pub code:   u8,
}

/// Follow the aux-length chain from the entry at `offset` while each
/// attachment header still starts before `boundary`.
pub fn attachments(
    data:     &[u8],
    header:   &EntryHeader,
    offset:   usize,
    boundary: usize,
) -> Result<Vec<Attachment>> {
    let limit = boundary.min(data.len());
    let mut out = Vec::new();
    let mut pos = offset;
    let mut step = header.aux_len() as usize;
    let mut cursor = ByteCursor::new(data);

    while step > 0 {
        pos += step;
        if pos + ENTRY_HEADER_SIZE >= limit {
            break;
        }
        cursor.seek(pos)?;
        let code = cursor.read_u32_le()?;
        out.push(Attachment {
            offset: pos as u32,
            code:   (code & 0xFF) as u8,
        });
        step = (code >> 8) as usize;
    }
    Ok(out)
}
