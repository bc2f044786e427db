//! Uncompressed 24/32-bit payloads and their channel orders.

use crate::error::{FshError, Result};

fn check_len(data: &[u8], width: usize, height: usize, bpp: usize, what: &str) -> Result<()> {
    let expected = width * height * bpp;
    if data.len() != expected {
        return Err(FshError::format(format!(
            "{what} buffer for {width}x{height} is {} bytes, expected {expected}",
            data.len()
        )));
    }
    Ok(())
}

pub(crate) fn check_rgba_len(rgba: &[u8], width: usize, height: usize) -> Result<()> {
    check_len(rgba, width, height, 4, "RGBA")
}

/// R, G, B triples; alpha is implicitly opaque.
pub fn rgb24_to_rgba(data: &[u8], width: usize, height: usize) -> Result<Vec<u8>> {
    check_len(data, width, height, 3, "24-bit")?;
    let mut out = Vec::with_capacity(width * height * 4);
    for px in data.chunks_exact(3) {
        out.extend_from_slice(&[px[0], px[1], px[2], 0xFF]);
    }
    Ok(out)
}

/// B, G, R, A quads (a little-endian ARGB word per pixel).
pub fn bgra32_to_rgba(data: &[u8], width: usize, height: usize) -> Result<Vec<u8>> {
    check_len(data, width, height, 4, "32-bit")?;
    let mut out = Vec::with_capacity(data.len());
    for px in data.chunks_exact(4) {
        out.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
    }
    Ok(out)
}

/// Drops alpha.
pub fn rgba_to_rgb24(rgba: &[u8], width: usize, height: usize) -> Result<Vec<u8>> {
    check_rgba_len(rgba, width, height)?;
    let mut out = Vec::with_capacity(width * height * 3);
    for px in rgba.chunks_exact(4) {
        out.extend_from_slice(&px[..3]);
    }
    Ok(out)
}

pub fn rgba_to_bgra32(rgba: &[u8], width: usize, height: usize) -> Result<Vec<u8>> {
    check_rgba_len(rgba, width, height)?;
    let mut out = Vec::with_capacity(rgba.len());
    for px in rgba.chunks_exact(4) {
        out.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
    }
    Ok(out)
}
