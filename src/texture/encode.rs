//! Block compression for DXT1 / DXT3 entries.
//!
//! The container only needs *some* encoder that produces blocks of the right
//! size; the decoder interprets every block independently.  [`BlockCompressor`]
//! is the seam for plugging one in.  [`SquishCompressor`] is the built-in
//! encoder, backed by the `squish` port of libsquish.

use serde::{Deserialize, Serialize};
use squish::{Algorithm, Format, Params};

use super::dxt::{self, DxtVariant};
use super::raw::check_rgba_len;
use crate::error::{FshError, Result};

pub trait BlockCompressor: Send + Sync {
    /// Compress a tightly packed RGBA8 image.  Must return exactly
    /// `dxt::blocks_len(width, height, variant)` bytes.
    fn compress(&self, rgba: &[u8], width: usize, height: usize, variant: DxtVariant) -> Result<Vec<u8>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Range fit: endpoints from the principal axis extent.
    Fast,
    /// Cluster fit over index orderings.
    Balanced,
    /// Iterated cluster fit.
    #[default]
    Best,
}

impl Quality {
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "fast"     => Some(Quality::Fast),
            "balanced" => Some(Quality::Balanced),
            "best"     => Some(Quality::Best),
            _          => None,
        }
    }

    fn algorithm(self) -> Algorithm {
        match self {
            Quality::Fast     => Algorithm::RangeFit,
            Quality::Balanced => Algorithm::ClusterFit,
            Quality::Best     => Algorithm::IterativeClusterFit,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SquishCompressor {
    pub quality: Quality,
}

impl SquishCompressor {
    pub fn new(quality: Quality) -> Self {
        Self { quality }
    }
}

fn squish_format(variant: DxtVariant) -> Format {
    match variant {
        DxtVariant::Dxt1 => Format::Bc1,
        DxtVariant::Dxt3 => Format::Bc2,
    }
}

impl BlockCompressor for SquishCompressor {
    fn compress(&self, rgba: &[u8], width: usize, height: usize, variant: DxtVariant) -> Result<Vec<u8>> {
        check_rgba_len(rgba, width, height)?;
        let format = squish_format(variant);
        let expected = dxt::blocks_len(width, height, variant);
        if format.compressed_size(width, height) != expected {
            return Err(FshError::format(format!(
                "squish sizes {variant:?} {width}x{height} differently from {expected} bytes"
            )));
        }

        let params = Params {
            algorithm: self.quality.algorithm(),
            ..Params::default()
        };
        let mut out = vec![0u8; expected];
        format.compress(rgba, width, height, params, &mut out);
        Ok(out)
    }
}
