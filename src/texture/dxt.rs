//! DXT1 / DXT3 block decoding.
//!
//! A block covers 4×4 texels.  The color half is two little-endian 5:6:5
//! endpoints followed by sixteen 2-bit palette indices (four per byte, low
//! bits first, one byte per row).  DXT3 prefixes that with eight bytes of
//! explicit 4-bit alpha, two texels per byte, low nibble first.

use crate::error::{FshError, Result};

pub type Rgba = [u8; 4];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DxtVariant {
    /// Color block only; `c0 <= c1` selects the punch-through palette.
    Dxt1,
    /// Explicit alpha block followed by a color block.
    Dxt3,
}

impl DxtVariant {
    pub fn block_size(self) -> usize {
        match self {
            DxtVariant::Dxt1 => 8,
            DxtVariant::Dxt3 => 16,
        }
    }
}

pub fn blocks_wide(width: usize) -> usize { width.div_ceil(4) }

pub fn blocks_high(height: usize) -> usize { height.div_ceil(4) }

/// Exact byte length of a block-compressed image.
pub fn blocks_len(width: usize, height: usize, variant: DxtVariant) -> usize {
    blocks_wide(width) * blocks_high(height) * variant.block_size()
}

/// Expand a packed 5:6:5 color by bit replication.
pub fn unpack_565(value: u16) -> Rgba {
    let r = ((value >> 11) & 0x1F) as u8;
    let g = ((value >> 5) & 0x3F) as u8;
    let b = (value & 0x1F) as u8;
    [(r << 3) | (r >> 2), (g << 2) | (g >> 4), (b << 3) | (b >> 2), 0xFF]
}

/// The four colors a block's indices select from.
///
/// With `dxt1` set and `c0 <= c1` (compared as raw packed values) the last
/// slot is fully transparent black.  Without `dxt1`, the same ordering
/// degrades to two copies of the midpoint.
pub fn color_palette(c0: u16, c1: u16, dxt1: bool) -> [Rgba; 4] {
    let a = unpack_565(c0);
    let b = unpack_565(c1);
    let mut mid0 = [0u8, 0, 0, 0xFF];
    let mut mid1 = [0u8, 0, 0, 0xFF];

    for i in 0..3 {
        let (x, y) = (a[i] as u32, b[i] as u32);
        if dxt1 && c0 <= c1 {
            mid0[i] = ((x + y) / 2) as u8;
            mid1[i] = 0;
        } else if c0 > c1 {
            mid0[i] = ((2 * x + y) / 3) as u8;
            mid1[i] = ((x + 2 * y) / 3) as u8;
        } else {
            mid0[i] = ((x + y) / 2) as u8;
            mid1[i] = mid0[i];
        }
    }
    if dxt1 && c0 <= c1 {
        mid1[3] = 0;
    }

    [a, b, mid0, mid1]
}

/// Decode an 8-byte color block into sixteen texels in row-major order.
pub fn decode_color_block(block: &[u8], dxt1: bool) -> [Rgba; 16] {
    let c0 = u16::from_le_bytes([block[0], block[1]]);
    let c1 = u16::from_le_bytes([block[2], block[3]]);
    let palette = color_palette(c0, c1, dxt1);

    let mut texels = [[0u8; 4]; 16];
    for (row, &packed) in block[4..8].iter().enumerate() {
        for col in 0..4 {
            let index = (packed >> (2 * col)) & 0x03;
            texels[row * 4 + col] = palette[index as usize];
        }
    }
    texels
}

/// Overwrite the alpha of each texel with the explicit 4-bit values.
pub fn apply_explicit_alpha(block: &[u8], texels: &mut [Rgba; 16]) {
    for (i, &quant) in block[..8].iter().enumerate() {
        let lo = quant & 0x0F;
        let hi = quant >> 4;
        texels[2 * i][3]     = lo | (lo << 4);
        texels[2 * i + 1][3] = hi | (hi << 4);
    }
}

pub fn decode_block(block: &[u8], variant: DxtVariant) -> [Rgba; 16] {
    match variant {
        DxtVariant::Dxt1 => decode_color_block(block, true),
        DxtVariant::Dxt3 => {
            let mut texels = decode_color_block(&block[8..16], false);
            apply_explicit_alpha(&block[..8], &mut texels);
            texels
        }
    }
}

/// Decode a whole block-compressed image into RGBA8.
///
/// `blocks` must be exactly [`blocks_len`] bytes.  Texels of edge blocks
/// that fall outside `width`×`height` are dropped.
pub fn decode(blocks: &[u8], width: usize, height: usize, variant: DxtVariant) -> Result<Vec<u8>> {
    let expected = blocks_len(width, height, variant);
    if blocks.len() != expected {
        return Err(FshError::format(format!(
            "{variant:?} data for {width}x{height} is {} bytes, expected {expected}",
            blocks.len()
        )));
    }

    let mut rgba = vec![0u8; width * height * 4];
    let bw = blocks_wide(width);
    for (n, block) in blocks.chunks_exact(variant.block_size()).enumerate() {
        let bx = (n % bw) * 4;
        let by = (n / bw) * 4;
        let texels = decode_block(block, variant);
        for (t, texel) in texels.iter().enumerate() {
            let x = bx + t % 4;
            let y = by + t / 4;
            if x < width && y < height {
                let at = (y * width + x) * 4;
                rgba[at..at + 4].copy_from_slice(texel);
            }
        }
    }
    Ok(rgba)
}
