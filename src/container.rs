//! FSH container parse and build.
//!
//! # Layout
//! ```text
//! 0x00  "SHPI" | size u32 | count u32 | dir id [4]
//! 0x10  count × (name [4] | offset u32)
//! ....  per entry: 16-byte EntryHeader, then the pixel payload
//! ```
//! All integers little-endian.  The whole buffer may additionally be
//! wrapped in one QFS frame; [`parse`] detects and unwraps it.
//!
//! # Parse order
//! The directory is read first, then every entry's format code is checked
//! before any pixels are touched, so a container holding a refused format
//! fails fast no matter where that entry sits.  Payload decoding runs last
//! (in parallel with the `parallel` feature) once every header is known
//! to be good.

use log::{debug, warn};
use std::borrow::Cow;

use crate::codec::{get_codec, CodecId};
use crate::cursor::ByteCursor;
use crate::entry::{self, Attachment, EntryHeader, ENTRY_HEADER_SIZE};
use crate::error::{FshError, Result};
use crate::header::{directory_end, next_boundary, DirEntry, FshHeader, DIR_ENTRY_SIZE};
use crate::perf::{self, PayloadJob};
use crate::texture::{BitmapFormat, BlockCompressor, REJECTED_CODES};

// ── Types ────────────────────────────────────────────────────────────────────

/// Tightly packed RGBA8 pixels, row-major, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width:  u16,
    pub height: u16,
    pub rgba:   Vec<u8>,
}

impl DecodedImage {
    pub fn new(width: u16, height: u16, rgba: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(FshError::format(format!(
                "{width}x{height} RGBA image needs {expected} bytes, got {}",
                rgba.len()
            )));
        }
        Ok(Self { width, height, rgba })
    }
}

/// One parsed directory entry with its decoded pixels.
#[derive(Debug, Clone)]
pub struct FshEntry {
    pub name:        [u8; 4],
    pub offset:      u32,
    pub header:      EntryHeader,
    pub format:      BitmapFormat,
    pub attachments: Vec<Attachment>,
    pub image:       DecodedImage,
}

#[derive(Debug, Clone)]
pub struct FshImage {
    pub header:      FshHeader,
    /// How the file was wrapped on disk.
    pub compression: CodecId,
    /// In directory order.
    pub entries:     Vec<FshEntry>,
}

/// Input to [`build`].
#[derive(Debug, Clone)]
pub struct BuildEntry {
    pub name:   [u8; 4],
    pub format: BitmapFormat,
    pub image:  DecodedImage,
}

impl From<&FshEntry> for BuildEntry {
    fn from(e: &FshEntry) -> Self {
        BuildEntry {
            name:   e.name,
            format: e.format,
            image:  e.image.clone(),
        }
    }
}

// ── Parse ────────────────────────────────────────────────────────────────────

/// Parse a complete FSH file, QFS-wrapped or not.
pub fn parse(bytes: &[u8]) -> Result<FshImage> {
    let compression = CodecId::detect(bytes);
    let data: Cow<'_, [u8]> = match compression {
        CodecId::None => Cow::Borrowed(bytes),
        CodecId::Qfs  => {
            debug!("container is QFS-compressed ({} byte(s))", bytes.len());
            Cow::Owned(get_codec(CodecId::Qfs).decompress(bytes)?)
        }
    };
    parse_container(&data, compression)
}

struct PendingEntry<'a> {
    dir:         DirEntry,
    header:      EntryHeader,
    format:      BitmapFormat,
    attachments: Vec<Attachment>,
    payload:     &'a [u8],
}

fn parse_container(data: &[u8], compression: CodecId) -> Result<FshImage> {
    let mut cursor = ByteCursor::new(data);
    let header = FshHeader::read(&mut cursor)?;
    if header.size as usize != data.len() {
        warn!(
            "container declares {} byte(s) but holds {}",
            header.size,
            data.len()
        );
    }

    let count = header.count as usize;
    let dir_bytes = count.saturating_mul(DIR_ENTRY_SIZE);
    if dir_bytes > cursor.remaining() {
        return Err(FshError::Truncated {
            offset:    cursor.position(),
            needed:    dir_bytes,
            available: cursor.remaining(),
        });
    }
    let mut directory = Vec::with_capacity(count);
    for _ in 0..count {
        directory.push(DirEntry::read(&mut cursor)?);
    }
    debug!("{count} entr(ies), directory ends at 0x{:x}", directory_end(count));

    for d in &directory {
        cursor.seek(d.offset as usize)?;
        let code = cursor.read_u8()? & 0x7F;
        if REJECTED_CODES.contains(&code) {
            return Err(FshError::UnsupportedFormat(code));
        }
    }

    let offsets: Vec<u32> = directory.iter().map(|d| d.offset).collect();
    let mut pending = Vec::with_capacity(count);
    for d in &directory {
        let offset = d.offset as usize;
        cursor.seek(offset)?;
        let eh = EntryHeader::read(&mut cursor)?;
        if eh.is_compressed() {
            return Err(FshError::format(format!(
                "entry {} at 0x{offset:x} is individually compressed",
                d.display_name()
            )));
        }
        let format = BitmapFormat::from_code(eh.format_code())?;
        let boundary = next_boundary(d.offset, &offsets, header.size) as usize;
        entry::check_mip_chain(&eh, format, offset, boundary)?;
        let attachments = entry::attachments(data, &eh, offset, boundary)?;

        let payload_len = format.payload_len(eh.width as usize, eh.height as usize);
        let payload = cursor.take(payload_len)?;
        debug!(
            "entry {} @0x{offset:x}: {format} {}x{}, {} attachment(s)",
            d.display_name(),
            eh.width,
            eh.height,
            attachments.len()
        );
        pending.push(PendingEntry { dir: *d, header: eh, format, attachments, payload });
    }

    let jobs: Vec<PayloadJob<'_>> = pending
        .iter()
        .map(|p| PayloadJob {
            format: p.format,
            data:   p.payload,
            width:  p.header.width as usize,
            height: p.header.height as usize,
        })
        .collect();
    let pixels = perf::decode_payloads(&jobs)?;

    let entries = pending
        .into_iter()
        .zip(pixels)
        .map(|(p, rgba)| FshEntry {
            name:        p.dir.name,
            offset:      p.dir.offset,
            header:      p.header,
            format:      p.format,
            attachments: p.attachments,
            image:       DecodedImage {
                width:  p.header.width,
                height: p.header.height,
                rgba,
            },
        })
        .collect();

    Ok(FshImage { header, compression, entries })
}

// ── Build ────────────────────────────────────────────────────────────────────

/// Serialise `entries` into an uncompressed container.
///
/// Entry headers are written with zeroed misc words and no attachments.
pub fn build(
    entries:    &[BuildEntry],
    dir_id:     [u8; 4],
    compressor: &dyn BlockCompressor,
) -> Result<Vec<u8>> {
    let jobs: Vec<PayloadJob<'_>> = entries
        .iter()
        .map(|e| PayloadJob {
            format: e.format,
            data:   &e.image.rgba,
            width:  e.image.width as usize,
            height: e.image.height as usize,
        })
        .collect();

    let mut offset = directory_end(entries.len());
    let mut directory = Vec::with_capacity(entries.len());
    for (e, job) in entries.iter().zip(&jobs) {
        directory.push(DirEntry { name: e.name, offset: to_u32(offset)? });
        offset += ENTRY_HEADER_SIZE + e.format.payload_len(job.width, job.height);
    }
    let total = to_u32(offset)?;

    let payloads = perf::encode_payloads(&jobs, compressor)?;

    let mut out = Vec::with_capacity(offset);
    let header = FshHeader::new(to_u32(entries.len())?, dir_id);
    header.write(&mut out)?;
    for d in &directory {
        d.write(&mut out)?;
    }
    for (e, payload) in entries.iter().zip(&payloads) {
        EntryHeader::new(e.format, e.image.width, e.image.height).write(&mut out)?;
        out.extend_from_slice(payload);
    }

    out[4..8].copy_from_slice(&total.to_le_bytes());
    debug!("built {} entr(ies), {} byte(s)", entries.len(), out.len());
    Ok(out)
}

fn to_u32(n: usize) -> Result<u32> {
    u32::try_from(n).map_err(|_| FshError::format(format!("container field {n} exceeds 32 bits")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::SquishCompressor;

    fn gradient(width: u16, height: u16) -> DecodedImage {
        let mut rgba = Vec::new();
        for y in 0..height as usize {
            for x in 0..width as usize {
                rgba.extend_from_slice(&[(x * 40) as u8, (y * 40) as u8, 128, 255]);
            }
        }
        DecodedImage::new(width, height, rgba).unwrap()
    }

    #[test]
    fn build_lays_out_directory_and_size() {
        let entries = vec![
            BuildEntry { name: *b"0000", format: BitmapFormat::Argb32, image: gradient(2, 2) },
            BuildEntry { name: *b"0001", format: BitmapFormat::Rgb24,  image: gradient(3, 1) },
        ];
        let out = build(&entries, *b"G264", &SquishCompressor::default()).unwrap();

        // 16 + 2*8 = 32; entry 0: 16 + 16 = 32 bytes; entry 1: 16 + 9.
        assert_eq!(&out[..4], b"SHPI");
        assert_eq!(u32::from_le_bytes(out[4..8].try_into().unwrap()) as usize, out.len());
        assert_eq!(out.len(), 32 + 32 + 25);
        assert_eq!(&out[12..16], b"G264");
        assert_eq!(u32::from_le_bytes(out[20..24].try_into().unwrap()), 32);
        assert_eq!(u32::from_le_bytes(out[28..32].try_into().unwrap()), 64);
        assert_eq!(out[32], 0x7D);
        assert_eq!(out[64], 0x7F);
    }

    #[test]
    fn raw_formats_round_trip_exactly() {
        let mut opaque = gradient(3, 2);
        let entries = vec![
            BuildEntry { name: *b"argb", format: BitmapFormat::Argb32, image: gradient(3, 2) },
            BuildEntry { name: *b"rgb ", format: BitmapFormat::Rgb24,  image: opaque.clone() },
        ];
        let out = build(&entries, *b"G264", &SquishCompressor::default()).unwrap();
        let img = parse(&out).unwrap();
        assert_eq!(img.compression, CodecId::None);
        assert_eq!(img.entries.len(), 2);
        assert_eq!(img.entries[0].image, entries[0].image);
        opaque.rgba.chunks_exact_mut(4).for_each(|p| p[3] = 255);
        assert_eq!(img.entries[1].image, opaque);
        assert_eq!(&img.entries[1].name, b"rgb ");
    }

    #[test]
    fn unsupported_code_rejected_before_decoding() {
        let entries = vec![
            BuildEntry { name: *b"good", format: BitmapFormat::Dxt1, image: gradient(4, 4) },
            BuildEntry { name: *b"bad ", format: BitmapFormat::Dxt1, image: gradient(4, 4) },
        ];
        let mut out = build(&entries, *b"G264", &SquishCompressor::default()).unwrap();
        let second = u32::from_le_bytes(out[28..32].try_into().unwrap()) as usize;
        for code in REJECTED_CODES {
            out[second] = code;
            match parse(&out) {
                Err(FshError::UnsupportedFormat(c)) => assert_eq!(c, code),
                other => panic!("0x{code:02x}: {other:?}"),
            }
        }
    }

    #[test]
    fn compressed_entry_flag_is_refused() {
        let entries = vec![BuildEntry { name: *b"0000", format: BitmapFormat::Dxt3, image: gradient(4, 4) }];
        let mut out = build(&entries, *b"G264", &SquishCompressor::default()).unwrap();
        out[24] |= 0x80;
        assert!(matches!(parse(&out), Err(FshError::Format(_))));
    }

    #[test]
    fn short_payload_is_truncated() {
        let entries = vec![BuildEntry { name: *b"0000", format: BitmapFormat::Argb32, image: gradient(4, 4) }];
        let out = build(&entries, *b"G264", &SquishCompressor::default()).unwrap();
        let err = parse(&out[..out.len() - 1]).unwrap_err();
        assert!(matches!(err, FshError::Truncated { .. }), "{err}");
    }

    #[test]
    fn directory_larger_than_file_is_truncated() {
        let mut h = FshHeader::new(1000, *b"G264");
        h.size = 16;
        let mut out = Vec::new();
        h.write(&mut out).unwrap();
        assert!(matches!(parse(&out), Err(FshError::Truncated { .. })));
    }

    #[test]
    fn wrong_sized_image_is_refused() {
        assert!(DecodedImage::new(2, 2, vec![0; 15]).is_err());
    }
}
