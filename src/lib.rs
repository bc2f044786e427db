pub mod error;
pub mod cursor;
pub mod codec;
pub mod texture;
pub mod header;
pub mod entry;
pub mod container;
pub mod archive;
pub mod perf;
pub mod manifest;

pub use error::{FshError, Result};
pub use codec::{CodecId, get_codec};
pub use container::{build, parse, BuildEntry, DecodedImage, FshEntry, FshImage};
pub use header::{DirEntry, FshHeader};
pub use entry::{Attachment, EntryHeader};
pub use texture::{BitmapFormat, BlockCompressor, DxtVariant, Quality, SquishCompressor};
pub use archive::{BuildOptions, Compression, FshFile};
