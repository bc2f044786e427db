//! JSON description of an unpacked container.
//!
//! `fsh unpack` writes one raw RGBA8 file per entry plus this manifest;
//! `fsh pack` reads it back to rebuild the container.  Four-byte tags are
//! stored as text when printable, `0x`-prefixed hex otherwise.

use serde::{Deserialize, Serialize};

use crate::container::FshImage;
use crate::entry::Attachment;
use crate::header::display_tag;
use crate::texture::BitmapFormat;

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(with = "tag_field")]
    pub name:   [u8; 4],
    pub format: BitmapFormat,
    pub width:  u16,
    pub height: u16,
    /// Raw RGBA8 pixel file, relative to the manifest.
    pub file:   String,
    /// Informational; attachments are not rebuilt by `pack`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(with = "tag_field")]
    pub dir_id:  [u8; 4],
    pub entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Describe `image`, naming pixel files `NNN_<name>.rgba`.
    pub fn from_image(image: &FshImage) -> Self {
        let entries = image
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| ManifestEntry {
                name:        e.name,
                format:      e.format,
                width:       e.image.width,
                height:      e.image.height,
                file:        pixel_file_name(i, &e.name),
                attachments: e.attachments.clone(),
            })
            .collect();
        Self { dir_id: image.header.dir_id, entries }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

fn pixel_file_name(index: usize, name: &[u8; 4]) -> String {
    let safe: String = display_tag(name)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("{index:03}_{safe}.rgba")
}

mod tag_field {
    use serde::{de, Deserialize, Deserializer, Serializer};

    use crate::header::{display_tag, parse_tag};

    pub fn serialize<S: Serializer>(tag: &[u8; 4], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&display_tag(tag))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 4], D::Error> {
        let s = String::deserialize(d)?;
        parse_tag(&s).ok_or_else(|| de::Error::custom(format!("{s:?} is not a 4-byte tag")))
    }
}
