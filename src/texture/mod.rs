//! Bitmap formats stored in FSH entries and their pixel codecs.
//!
//! Only four entry codes carry pixels this crate can decode.  The 16-bit
//! packed formats (and the 8-bit indexed 0x7B) are recognised by code so
//! they can be refused with a dedicated error instead of a generic one.

pub mod dxt;
pub mod encode;
pub mod raw;

use serde::{Deserialize, Serialize};

use crate::error::{FshError, Result};

pub use dxt::DxtVariant;
pub use encode::{BlockCompressor, Quality, SquishCompressor};

/// Entry codes that are recognised but deliberately not supported.
pub const REJECTED_CODES: [u8; 4] = [0x78, 0x7B, 0x7E, 0x6D];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BitmapFormat {
    /// 24-bit RGB, stored R, G, B.
    Rgb24,
    /// 32-bit ARGB, stored B, G, R, A.
    Argb32,
    /// 4×4 blocks, 5:6:5 endpoints with 1-bit punch-through alpha.
    Dxt1,
    /// 4×4 blocks, 5:6:5 endpoints plus explicit 4-bit alpha.
    Dxt3,
}

impl BitmapFormat {
    pub const ALL: [BitmapFormat; 4] = [
        BitmapFormat::Rgb24,
        BitmapFormat::Argb32,
        BitmapFormat::Dxt1,
        BitmapFormat::Dxt3,
    ];

    /// The 7-bit code stored in the low byte of an entry header.
    pub fn code(self) -> u8 {
        match self {
            BitmapFormat::Rgb24  => 0x7F,
            BitmapFormat::Argb32 => 0x7D,
            BitmapFormat::Dxt1   => 0x60,
            BitmapFormat::Dxt3   => 0x61,
        }
    }

    /// Resolve an entry code (already masked to 7 bits).
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0x7F => Ok(BitmapFormat::Rgb24),
            0x7D => Ok(BitmapFormat::Argb32),
            0x60 => Ok(BitmapFormat::Dxt1),
            0x61 => Ok(BitmapFormat::Dxt3),
            c if REJECTED_CODES.contains(&c) => Err(FshError::UnsupportedFormat(c)),
            c => Err(FshError::format(format!("unknown entry format code 0x{c:02x}"))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BitmapFormat::Rgb24  => "rgb24",
            BitmapFormat::Argb32 => "argb32",
            BitmapFormat::Dxt1   => "dxt1",
            BitmapFormat::Dxt3   => "dxt3",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "rgb24" | "24"  => Some(BitmapFormat::Rgb24),
            "argb32" | "32" => Some(BitmapFormat::Argb32),
            "dxt1" | "bc1"  => Some(BitmapFormat::Dxt1),
            "dxt3" | "bc2"  => Some(BitmapFormat::Dxt3),
            _               => None,
        }
    }

    /// Bytes of pixel data that follow the 16-byte entry header.
    pub fn payload_len(self, width: usize, height: usize) -> usize {
        match self {
            BitmapFormat::Rgb24  => width * height * 3,
            BitmapFormat::Argb32 => width * height * 4,
            BitmapFormat::Dxt1   => dxt::blocks_len(width, height, DxtVariant::Dxt1),
            BitmapFormat::Dxt3   => dxt::blocks_len(width, height, DxtVariant::Dxt3),
        }
    }

    /// Storage cost in nibbles per pixel, as used when sizing a mip chain.
    pub fn nibbles_per_pixel(self) -> usize {
        match self {
            BitmapFormat::Dxt1   => 1,
            BitmapFormat::Dxt3   => 2,
            BitmapFormat::Rgb24  => 6,
            BitmapFormat::Argb32 => 8,
        }
    }
}

impl std::fmt::Display for BitmapFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Decode a stored payload into tightly packed RGBA8.
pub fn decode_payload(
    format:  BitmapFormat,
    payload: &[u8],
    width:   usize,
    height:  usize,
) -> Result<Vec<u8>> {
    match format {
        BitmapFormat::Rgb24  => raw::rgb24_to_rgba(payload, width, height),
        BitmapFormat::Argb32 => raw::bgra32_to_rgba(payload, width, height),
        BitmapFormat::Dxt1   => dxt::decode(payload, width, height, DxtVariant::Dxt1),
        BitmapFormat::Dxt3   => dxt::decode(payload, width, height, DxtVariant::Dxt3),
    }
}

/// Encode RGBA8 pixels into the stored payload for `format`.
///
/// Block formats go through `compressor`; its output must be exactly
/// [`BitmapFormat::payload_len`] bytes or the call fails.
pub fn encode_payload(
    format:     BitmapFormat,
    rgba:       &[u8],
    width:      usize,
    height:     usize,
    compressor: &dyn BlockCompressor,
) -> Result<Vec<u8>> {
    let out = match format {
        BitmapFormat::Rgb24  => raw::rgba_to_rgb24(rgba, width, height)?,
        BitmapFormat::Argb32 => raw::rgba_to_bgra32(rgba, width, height)?,
        BitmapFormat::Dxt1 => {
            raw::check_rgba_len(rgba, width, height)?;
            compressor.compress(rgba, width, height, DxtVariant::Dxt1)?
        }
        BitmapFormat::Dxt3 => {
            raw::check_rgba_len(rgba, width, height)?;
            compressor.compress(rgba, width, height, DxtVariant::Dxt3)?
        }
    };
    let expected = format.payload_len(width, height);
    if out.len() != expected {
        return Err(FshError::format(format!(
            "{format} payload for {width}x{height} is {} bytes, expected {expected}",
            out.len()
        )));
    }
    Ok(out)
}
