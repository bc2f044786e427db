//! High-level file API: the primary embedding surface.
//!
//! ```no_run
//! use fshqfs::archive::{self, BuildOptions, FshFile};
//! use fshqfs::container::DecodedImage;
//! use fshqfs::texture::BitmapFormat;
//!
//! // Write
//! let mut fsh = FshFile::new();
//! fsh.add(*b"0000", BitmapFormat::Dxt1, DecodedImage::new(4, 4, vec![255; 64])?);
//! fsh.save("out.qfs", &BuildOptions::default())?;
//!
//! // Read
//! let image = archive::open("out.qfs")?;
//! assert_eq!(image.entries[0].image.width, 4);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::codec::{get_codec, CodecId};
use crate::container::{self, BuildEntry, DecodedImage, FshImage};
use crate::error::{FshError, Result};
use crate::header::{display_tag, DEFAULT_DIR_ID};
use crate::manifest::{Manifest, ManifestEntry, MANIFEST_FILE};
use crate::texture::{BitmapFormat, Quality, SquishCompressor};

/// Target extension that turns compression on under [`Compression::ByExtension`].
pub const QFS_EXTENSION: &str = "qfs";

// ── BuildOptions ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Compression {
    Never,
    Always,
    /// Compress when the target path ends in `.qfs`.
    #[default]
    ByExtension,
}

impl Compression {
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "never" | "off" | "none" => Some(Compression::Never),
            "always" | "on" | "qfs"  => Some(Compression::Always),
            "auto" | "by-extension"  => Some(Compression::ByExtension),
            _                        => None,
        }
    }

    /// Whether a container written to `target` should be QFS-wrapped.
    pub fn applies_to(self, target: Option<&Path>) -> bool {
        match self {
            Compression::Never       => false,
            Compression::Always      => true,
            Compression::ByExtension => target
                .and_then(|p| p.extension())
                .is_some_and(|ext| ext.eq_ignore_ascii_case(QFS_EXTENSION)),
        }
    }
}

/// Configuration for [`FshFile::save`] / [`FshFile::to_bytes`].
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub compression: Compression,
    pub dir_id:      [u8; 4],
    pub quality:     Quality,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            compression: Compression::ByExtension,
            dir_id:      DEFAULT_DIR_ID,
            quality:     Quality::Best,
        }
    }
}

// ── Read ──────────────────────────────────────────────────────────────────────

/// Read and parse an FSH file from disk.
pub fn open<P: AsRef<Path>>(path: P) -> Result<FshImage> {
    let bytes = fs::read(path.as_ref())?;
    debug!("read {} ({} byte(s))", path.as_ref().display(), bytes.len());
    container::parse(&bytes)
}

/// QFS-wrap `container` if asked to, keeping the plain bytes whenever
/// compression fails or would make the file larger.
pub fn wrap(container: Vec<u8>, compress: bool) -> Vec<u8> {
    if !compress {
        return container;
    }
    match get_codec(CodecId::Qfs).compress(&container) {
        Ok(packed) if packed.len() <= container.len() => packed,
        Ok(packed) => {
            debug!(
                "QFS output ({} byte(s)) larger than input ({}); storing uncompressed",
                packed.len(),
                container.len()
            );
            container
        }
        Err(e) => {
            debug!("{e}; storing uncompressed");
            container
        }
    }
}

// ── FshFile ───────────────────────────────────────────────────────────────────

/// An ordered set of entries waiting to be written.
#[derive(Debug, Clone, Default)]
pub struct FshFile {
    pub entries: Vec<BuildEntry>,
}

impl FshFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: [u8; 4], format: BitmapFormat, image: DecodedImage) {
        self.entries.push(BuildEntry { name, format, image });
    }

    /// Start from a parsed container, keeping names, formats and pixels.
    /// Misc words and attachments are not carried over.
    pub fn from_image(image: &FshImage) -> Self {
        Self { entries: image.entries.iter().map(BuildEntry::from).collect() }
    }

    /// Serialise, compressing when `opts` says so for `target`.
    pub fn to_bytes(&self, opts: &BuildOptions, target: Option<&Path>) -> Result<Vec<u8>> {
        let compressor = SquishCompressor::new(opts.quality);
        let plain = container::build(&self.entries, opts.dir_id, &compressor)?;
        Ok(wrap(plain, opts.compression.applies_to(target)))
    }

    pub fn save<P: AsRef<Path>>(&self, path: P, opts: &BuildOptions) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes(opts, Some(path))?;
        fs::write(path, &bytes)?;
        debug!(
            "wrote {} ({} entr(ies), {} byte(s), dir id {})",
            path.display(),
            self.entries.len(),
            bytes.len(),
            display_tag(&opts.dir_id)
        );
        Ok(())
    }

    /// Load entries from a directory written by [`unpack`].
    pub fn from_manifest_dir<P: AsRef<Path>>(dir: P) -> Result<(Self, Manifest)> {
        let dir = dir.as_ref();
        let manifest = Manifest::from_bytes(&fs::read(dir.join(MANIFEST_FILE))?)
            .map_err(|e| FshError::format(format!("bad {MANIFEST_FILE}: {e}")))?;

        let mut file = Self::new();
        for ManifestEntry { name, format, width, height, file: pixels, .. } in &manifest.entries {
            let rgba = fs::read(dir.join(pixels))?;
            file.add(*name, *format, DecodedImage::new(*width, *height, rgba)?);
        }
        Ok((file, manifest))
    }
}

/// Write every entry of `image` as raw RGBA8 plus a manifest into `dir`.
pub fn unpack<P: AsRef<Path>>(image: &FshImage, dir: P) -> Result<Manifest> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let manifest = Manifest::from_image(image);
    for (entry, desc) in image.entries.iter().zip(&manifest.entries) {
        fs::write(dir.join(&desc.file), &entry.image.rgba)?;
    }
    let json = manifest
        .to_bytes()
        .map_err(|e| FshError::format(format!("cannot encode {MANIFEST_FILE}: {e}")))?;
    fs::write(dir.join(MANIFEST_FILE), json)?;
    Ok(manifest)
}
