//! Per-entry payload work, optionally fanned out across threads.
//!
//! Entries in a container are independent: each payload decodes (or
//! encodes) without looking at any other.  With the `parallel` feature the
//! jobs run on Rayon's global pool; otherwise they run in order on the
//! calling thread.  Either way results come back in job order and the first
//! error aborts the batch.

use crate::error::Result;
use crate::texture::{self, BitmapFormat, BlockCompressor};

/// One entry's pixels plus the geometry needed to interpret them.
///
/// For decoding `data` is the stored payload; for encoding it is RGBA8.
#[derive(Debug, Clone, Copy)]
pub struct PayloadJob<'a> {
    pub format: BitmapFormat,
    pub data:   &'a [u8],
    pub width:  usize,
    pub height: usize,
}

/// Decode every job's stored payload into RGBA8.
pub fn decode_payloads(jobs: &[PayloadJob<'_>]) -> Result<Vec<Vec<u8>>> {
    let decode = |job: &PayloadJob<'_>| {
        texture::decode_payload(job.format, job.data, job.width, job.height)
    };

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        jobs.par_iter().map(decode).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        jobs.iter().map(decode).collect()
    }
}

/// Encode every job's RGBA8 pixels into its stored payload.
pub fn encode_payloads(
    jobs:       &[PayloadJob<'_>],
    compressor: &dyn BlockCompressor,
) -> Result<Vec<Vec<u8>>> {
    let encode = |job: &PayloadJob<'_>| {
        texture::encode_payload(job.format, job.data, job.width, job.height, compressor)
    };

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        jobs.par_iter().map(encode).collect()
    }

    #[cfg(not(feature = "parallel"))]
    {
        jobs.iter().map(encode).collect()
    }
}
