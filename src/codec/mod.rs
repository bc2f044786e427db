//! Whole-container compression codecs.
//!
//! An FSH container is either stored verbatim or wrapped in a single QFS
//! frame.  There is no per-entry compression (entries flagged as compressed
//! are rejected by the container parser), so this registry only ever picks
//! between the two.
//!
//! Detection is by signature: a QFS frame starts with `10 FB` (or `11 FB`)
//! either at offset 0 or after a 4-byte length prefix.

pub mod qfs;

use crate::error::Result;

// ── CodecId ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecId {
    None,
    Qfs,
}

impl CodecId {
    /// Human-readable name, for diagnostics and CLI flags.
    pub fn name(self) -> &'static str {
        match self {
            CodecId::None => "none",
            CodecId::Qfs  => "qfs",
        }
    }

    /// Parse from a CLI string.
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" | "fsh" => Some(CodecId::None),
            "qfs"          => Some(CodecId::Qfs),
            _              => None,
        }
    }

    /// Identify how a raw file buffer is wrapped.
    ///
    /// A buffer that already starts with the `SHPI` tag is never searched at
    /// offset 4, so an uncompressed container whose length field happens to
    /// look like a signature is not misread.
    pub fn detect(data: &[u8]) -> Self {
        if data.starts_with(crate::header::MAGIC) {
            return CodecId::None;
        }
        if qfs::find_frame(data).is_some() {
            CodecId::Qfs
        } else {
            CodecId::None
        }
    }
}

// ── Codec trait ──────────────────────────────────────────────────────────────

pub trait Codec: Send + Sync {
    fn codec_id(&self) -> CodecId;
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

pub struct NoneCodec;
impl Codec for NoneCodec {
    fn codec_id(&self) -> CodecId { CodecId::None }
    fn compress(&self, data: &[u8])   -> Result<Vec<u8>> { Ok(data.to_vec()) }
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> { Ok(data.to_vec()) }
}

pub struct QfsCodec;
impl Codec for QfsCodec {
    fn codec_id(&self) -> CodecId { CodecId::Qfs }
    fn compress(&self, data: &[u8])   -> Result<Vec<u8>> { qfs::try_compress(data) }
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> { qfs::decompress(data) }
}

// ── Factory ──────────────────────────────────────────────────────────────────

pub fn get_codec(id: CodecId) -> Box<dyn Codec> {
    match id {
        CodecId::None => Box::new(NoneCodec),
        CodecId::Qfs  => Box::new(QfsCodec),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_plain_and_wrapped() {
        assert_eq!(CodecId::detect(b"SHPI\x10\xfb\0\0"), CodecId::None);
        assert_eq!(CodecId::detect(&[0x10, 0xFB, 0, 0, 1, 0xFC]), CodecId::Qfs);
        assert_eq!(CodecId::detect(&[9, 0, 0, 0, 0x10, 0xFB, 0, 0, 0]), CodecId::Qfs);
        assert_eq!(CodecId::detect(b"junk"), CodecId::None);
    }

    #[test]
    fn names_round_trip() {
        for id in [CodecId::None, CodecId::Qfs] {
            assert_eq!(CodecId::from_name(id.name()), Some(id));
        }
        assert_eq!(CodecId::from_name("QFS"), Some(CodecId::Qfs));
        assert_eq!(CodecId::from_name("zstd"), None);
    }

    #[test]
    fn factory_dispatch() {
        let data = b"abcabcabcabcabcabcabcabcabcabcabcabcabcabc".to_vec();
        let qfs = get_codec(CodecId::Qfs);
        assert_eq!(qfs.codec_id(), CodecId::Qfs);
        let packed = qfs.compress(&data).unwrap();
        assert_eq!(qfs.decompress(&packed).unwrap(), data);
        assert_eq!(get_codec(CodecId::None).compress(&data).unwrap(), data);
    }

    #[test]
    fn incompressible_input_reports_overflow() {
        let noise: Vec<u8> = (0..16u8).map(|i| i.wrapping_mul(37) ^ 0x5A).collect();
        let qfs = get_codec(CodecId::Qfs);
        assert!(matches!(qfs.compress(&noise), Err(crate::error::FshError::CompressionOverflow)));
        assert_eq!(get_codec(CodecId::None).compress(&noise).unwrap(), noise);
    }
}
