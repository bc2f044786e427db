//! QFS: the LZ77-family byte-stream compressor that wraps FSH files.
//!
//! # Frame layout
//! ```text
//! [ total length (u32 LE, optional) ]
//! [ flags: 0x10 | 0x11 ] [ 0xFB ]
//! [ compressed length (u24 BE) ]      only when flags & 0x01
//! [ uncompressed length (u24 BE) ]
//! [ token stream ... 0xFC..=0xFF stop token + 0..3 literals ]
//! ```
//!
//! # Tokens
//! Every token is a control byte `c0`, zero to three parameter bytes, then
//! `plain` literal bytes copied to the output, then a back-reference of
//! `copy` bytes taken from `distance` bytes behind the write position.
//!
//! | `c0`          | extra | plain          | copy                     | distance                          |
//! |---------------|-------|----------------|--------------------------|-----------------------------------|
//! | `00..=7F`     | 1     | `c0 & 3`       | `((c0 & 0x1C) >> 2) + 3` | `((c0 >> 5) << 8) + c1 + 1`       |
//! | `80..=BF`     | 2     | `c1 >> 6`      | `(c0 & 0x3F) + 4`        | `((c1 & 0x3F) << 8) + c2 + 1`     |
//! | `C0..=DF`     | 3     | `c0 & 3`       | `((c0 >> 2) & 3) * 256 + c3 + 5` | `((c0 & 0x10) << 12) + (c1 << 8) + c2 + 1` |
//! | `E0..=FB`     | 0     | `((c0 & 0x1F) << 2) + 4` | 0              | —                                 |
//! | `FC..=FF`     | 0     | `c0 & 3`, then end of stream |            |                                   |
//!
//! Back-references may overlap the bytes they produce; the copy is done one
//! byte at a time, front to back, so a distance shorter than the length
//! repeats the pattern.

use log::{debug, warn};

use crate::cursor::ByteCursor;
use crate::error::{FshError, Result};

/// Second signature byte.
pub const SIGNATURE: u8 = 0xFB;
/// First signature byte as written by the compressor.
pub const FLAGS: u8 = 0x10;
/// Set in the flags byte when a compressed length precedes the uncompressed one.
pub const FLAG_COMPRESSED_SIZE: u8 = 0x01;
/// Length of the optional little-endian size prefix in front of the signature.
pub const PREFIX_LEN: usize = 4;
/// Largest input the 24-bit length field can describe.
pub const MAX_INPUT_LEN: usize = 0x00FF_FFFF;

const MAX_ITER_COUNT: usize = 50;
const MAX_MATCH_LEN:  usize = 1028;
const WINDOW_LEN:     usize = 131_072;
const WINDOW_MASK:    usize = WINDOW_LEN - 1;
const MAX_LITERAL_BLOCKS: usize = 0x1B;
const NIL: usize = usize::MAX;

// ── Signature probing ───────────────────────────────────────────────────────

fn has_signature_at(data: &[u8], offset: usize) -> bool {
    match data.get(offset..offset + 2) {
        Some(&[flags, sig]) => flags & !FLAG_COMPRESSED_SIZE == FLAGS && sig == SIGNATURE,
        _ => false,
    }
}

/// Offset of the QFS frame header: 0 when the signature leads the buffer,
/// 4 when it follows a length prefix.
pub fn find_frame(data: &[u8]) -> Option<usize> {
    [0, PREFIX_LEN].into_iter().find(|&off| has_signature_at(data, off))
}

pub fn is_compressed(data: &[u8]) -> bool {
    find_frame(data).is_some()
}

// ── Decompression ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Token {
    plain:    usize,
    copy:     usize,
    distance: usize,
}

/// Decode the parameter bytes of a non-terminal token.
fn read_token(input: &mut ByteCursor<'_>, c0: u8) -> Result<Token> {
    let c0 = c0 as usize;
    let token = match c0 {
        0x00..=0x7F => {
            let c1 = input.read_u8()? as usize;
            Token {
                plain:    c0 & 0x03,
                copy:     ((c0 & 0x1C) >> 2) + 3,
                distance: ((c0 >> 5) << 8) + c1 + 1,
            }
        }
        0x80..=0xBF => {
            let c1 = input.read_u8()? as usize;
            let c2 = input.read_u8()? as usize;
            Token {
                plain:    (c1 >> 6) & 0x03,
                copy:     (c0 & 0x3F) + 4,
                distance: ((c1 & 0x3F) << 8) + c2 + 1,
            }
        }
        0xC0..=0xDF => {
            let c1 = input.read_u8()? as usize;
            let c2 = input.read_u8()? as usize;
            let c3 = input.read_u8()? as usize;
            Token {
                plain:    c0 & 0x03,
                copy:     (((c0 >> 2) & 0x03) << 8) + c3 + 5,
                distance: ((c0 & 0x10) << 12) + (c1 << 8) + c2 + 1,
            }
        }
        _ => Token {
            plain:    ((c0 & 0x1F) << 2) + 4,
            copy:     0,
            distance: 0,
        },
    };
    Ok(token)
}

fn output_overflow(out_pos: usize, needed: usize, out_len: usize) -> FshError {
    FshError::Truncated {
        offset:    out_pos,
        needed,
        available: out_len - out_pos,
    }
}

fn copy_literals(
    input:   &mut ByteCursor<'_>,
    out:     &mut [u8],
    out_pos: &mut usize,
    count:   usize,
) -> Result<()> {
    if count > out.len() - *out_pos {
        return Err(output_overflow(*out_pos, count, out.len()));
    }
    let src = input.take(count)?;
    out[*out_pos..*out_pos + count].copy_from_slice(src);
    *out_pos += count;
    Ok(())
}

/// Decompress a QFS frame found at offset 0 or 4 of `data`.
///
/// The returned buffer always has the declared uncompressed length; a stream
/// that stops early leaves the tail zero-filled.
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let start = find_frame(data)
        .ok_or_else(|| FshError::format("QFS signature not found at offset 0 or 4"))?;

    let mut input = ByteCursor::new(data);
    input.seek(start)?;
    let flags = input.read_u8()?;
    input.read_u8()?;
    if flags & FLAG_COMPRESSED_SIZE != 0 {
        let packed = input.read_u24_be()?;
        debug!("QFS frame declares {packed} compressed byte(s)");
    }
    let out_len = input.read_u24_be()? as usize;
    debug!("QFS frame at offset {start}, {out_len} byte(s) uncompressed");

    let mut out = vec![0u8; out_len];
    let mut out_pos = 0usize;

    while input.remaining() > 0 && out_pos < out_len {
        let c0 = input.read_u8()?;

        if c0 >= 0xFC {
            let mut run = (c0 & 0x03) as usize;
            if run > input.remaining() {
                warn!(
                    "QFS stop token wants {run} literal(s), only {} left; clamping",
                    input.remaining()
                );
                run = input.remaining();
            }
            copy_literals(&mut input, &mut out, &mut out_pos, run)?;
            break;
        }

        let token = read_token(&mut input, c0)?;
        copy_literals(&mut input, &mut out, &mut out_pos, token.plain)?;

        if token.copy == 0 {
            continue;
        }
        if token.distance > out_pos {
            return Err(FshError::format(format!(
                "QFS back-reference of distance {} at output offset {out_pos} reaches before the start",
                token.distance
            )));
        }
        if token.copy > out_len - out_pos {
            return Err(output_overflow(out_pos, token.copy, out_len));
        }
        // Byte-wise on purpose: source and destination may overlap.
        let mut src = out_pos - token.distance;
        for _ in 0..token.copy {
            out[out_pos] = out[src];
            out_pos += 1;
            src += 1;
        }
    }

    Ok(out)
}

// ── Compression ─────────────────────────────────────────────────────────────

/// Append-only buffer that refuses to grow past a fixed capacity.
struct BoundedWriter {
    buf: Vec<u8>,
    cap: usize,
}

impl BoundedWriter {
    fn new(cap: usize) -> Self {
        Self { buf: Vec::with_capacity(cap), cap }
    }

    fn put(&mut self, byte: u8) -> Result<()> {
        if self.buf.len() + 1 > self.cap {
            return Err(FshError::CompressionOverflow);
        }
        self.buf.push(byte);
        Ok(())
    }

    fn put_slice(&mut self, bytes: &[u8]) -> Result<()> {
        if self.buf.len() + bytes.len() > self.cap {
            return Err(FshError::CompressionOverflow);
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }
}

#[inline]
fn pair_key(data: &[u8], i: usize) -> usize {
    ((data[i] as usize) << 8) | data.get(i + 1).copied().unwrap_or(0) as usize
}

/// Emit pending literals in 4-byte-aligned, literal-only tokens until fewer
/// than four remain.
fn flush_literal_blocks(
    out:      &mut BoundedWriter,
    data:     &[u8],
    lastwrot: &mut usize,
    upto:     usize,
) -> Result<()> {
    while upto - *lastwrot >= 4 {
        let blocks = ((upto - *lastwrot) / 4 - 1).min(MAX_LITERAL_BLOCKS);
        out.put(0xE0 + blocks as u8)?;
        let n = blocks * 4 + 4;
        out.put_slice(&data[*lastwrot..*lastwrot + n])?;
        *lastwrot += n;
    }
    Ok(())
}

fn write_match(
    out:   &mut BoundedWriter,
    plain: usize,
    len:   usize,
    dist:  usize,
) -> Result<()> {
    let d = dist - 1;
    if len <= 10 && dist <= 1024 {
        out.put((((d >> 8) << 5) + ((len - 3) << 2) + plain) as u8)?;
        out.put((d & 0xFF) as u8)?;
    } else if len <= 67 && dist <= 16384 {
        out.put((0x80 + (len - 4)) as u8)?;
        out.put(((plain << 6) + (d >> 8)) as u8)?;
        out.put((d & 0xFF) as u8)?;
    } else {
        out.put((0xC0 + ((d >> 16) << 4) + (((len - 5) >> 8) << 2) + plain) as u8)?;
        out.put(((d >> 8) & 0xFF) as u8)?;
        out.put((d & 0xFF) as u8)?;
        out.put(((len - 5) & 0xFF) as u8)?;
    }
    Ok(())
}

/// Compress `data` into a QFS frame preceded by its 4-byte total length.
///
/// The output may not exceed `data.len() + PREFIX_LEN` bytes; when it would,
/// the attempt is abandoned with [`FshError::CompressionOverflow`].
pub fn try_compress(data: &[u8]) -> Result<Vec<u8>> {
    let len = data.len();
    if len > MAX_INPUT_LEN {
        return Err(FshError::format(format!(
            "{len} bytes do not fit the 24-bit QFS length field"
        )));
    }

    let mut out = BoundedWriter::new(len + PREFIX_LEN);
    out.put_slice(&[0u8; PREFIX_LEN])?;
    out.put_slice(&[FLAGS, SIGNATURE, (len >> 16) as u8, (len >> 8) as u8, len as u8])?;

    // last[pair] -> most recent position starting with that byte pair;
    // similar[pos & mask] -> the position before `pos` with the same pair.
    let mut last    = vec![NIL; 0x1_0000];
    let mut similar = vec![NIL; WINDOW_LEN];
    let mut lastwrot = 0usize;

    for index in 0..len {
        let key = pair_key(data, index);
        let mut offs = last[key];
        similar[index & WINDOW_MASK] = offs;
        last[key] = index;

        if index < lastwrot {
            continue;
        }

        let limit = MAX_MATCH_LEN.min(len - index);
        let mut best_len  = 0usize;
        let mut best_dist = 0usize;
        let mut iter = 0usize;
        while offs != NIL && index - offs < WINDOW_LEN && iter < MAX_ITER_COUNT {
            iter += 1;
            let mut l = 2.min(limit);
            while l < limit && data[index + l] == data[offs + l] {
                l += 1;
            }
            if l > best_len {
                best_len  = l;
                best_dist = index - offs;
            }
            offs = similar[offs & WINDOW_MASK];
        }

        if best_len <= 2
            || (best_len == 3 && best_dist > 1024)
            || (best_len == 4 && best_dist > 16384)
        {
            continue;
        }

        flush_literal_blocks(&mut out, data, &mut lastwrot, index)?;
        let plain = index - lastwrot;
        write_match(&mut out, plain, best_len, best_dist)?;
        out.put_slice(&data[lastwrot..index])?;
        lastwrot = index + best_len;
    }

    flush_literal_blocks(&mut out, data, &mut lastwrot, len)?;
    let tail = len - lastwrot;
    out.put(0xFC + tail as u8)?;
    out.put_slice(&data[lastwrot..])?;

    let mut buf = out.buf;
    let total = buf.len() as u32;
    buf[..PREFIX_LEN].copy_from_slice(&total.to_le_bytes());
    debug!("QFS compressed {len} byte(s) into {total}");
    Ok(buf)
}

/// Compress `data`, or `None` when QFS does not make it smaller.
pub fn compress(data: &[u8]) -> Option<Vec<u8>> {
    match try_compress(data) {
        Ok(out) => Some(out),
        Err(e) => {
            debug!("QFS compression skipped: {e}");
            None
        }
    }
}
