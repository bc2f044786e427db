use std::io;
use thiserror::Error;

/// Every failure the codecs and the container can report.
///
/// All variants are terminal for the call that produced them: there are no
/// partial results.  `CompressionOverflow` is the one soft signal: it means
/// "QFS did not help, store the container uncompressed".
#[derive(Error, Debug)]
pub enum FshError {
    #[error("Invalid format: {0}")]
    Format(String),
    #[error("Truncated stream at offset {offset}: needed {needed} byte(s), {available} available")]
    Truncated {
        offset:    usize,
        needed:    usize,
        available: usize,
    },
    #[error("Unsupported bitmap format code 0x{0:02x}")]
    UnsupportedFormat(u8),
    #[error("QFS output would exceed its buffer; data does not compress")]
    CompressionOverflow,
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl FshError {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        FshError::Format(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, FshError>;
