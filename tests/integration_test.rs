use fshqfs::archive::{self, BuildOptions, Compression, FshFile};
use fshqfs::codec::qfs;
use fshqfs::container::{self, BuildEntry, DecodedImage};
use fshqfs::texture::{BitmapFormat, SquishCompressor, REJECTED_CODES};
use fshqfs::{CodecId, FshError};
use proptest::prelude::*;
use tempfile::{tempdir, NamedTempFile};

fn checker(width: u16, height: u16) -> DecodedImage {
    let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
    for y in 0..height {
        for x in 0..width {
            let on = (x / 4 + y / 4) % 2 == 0;
            rgba.extend_from_slice(if on { &[255, 255, 255, 255] } else { &[0, 0, 0, 255] });
        }
    }
    DecodedImage::new(width, height, rgba).unwrap()
}

fn sample_file() -> FshFile {
    let mut fsh = FshFile::new();
    fsh.add(*b"0000", BitmapFormat::Dxt1,   checker(16, 8));
    fsh.add(*b"0001", BitmapFormat::Dxt3,   checker(8, 8));
    fsh.add(*b"0002", BitmapFormat::Argb32, checker(5, 3));
    fsh.add(*b"0003", BitmapFormat::Rgb24,  checker(3, 5));
    fsh
}

fn plain_bytes(fsh: &FshFile) -> Vec<u8> {
    let opts = BuildOptions { compression: Compression::Never, ..BuildOptions::default() };
    fsh.to_bytes(&opts, None).unwrap()
}

#[test]
fn test_save_and_open_roundtrip() {
    let temp_file = NamedTempFile::new().unwrap();
    let fsh = sample_file();
    fsh.save(temp_file.path(), &BuildOptions::default()).unwrap();

    let image = archive::open(temp_file.path()).unwrap();
    assert_eq!(image.compression, CodecId::None);
    assert_eq!(&image.header.dir_id, b"G264");
    assert_eq!(image.entries.len(), 4);
    for (got, want) in image.entries.iter().zip(&fsh.entries) {
        assert_eq!(got.name, want.name);
        assert_eq!(got.format, want.format);
        assert_eq!(got.image.width, want.image.width);
        assert_eq!(got.image.height, want.image.height);
        assert!(got.attachments.is_empty());
    }
    // Black and white survive block compression exactly; raw formats always do.
    for (got, want) in image.entries.iter().zip(&fsh.entries) {
        assert_eq!(got.image, want.image, "entry {:?}", got.name);
    }
}

#[test]
fn test_qfs_extension_compresses() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("car.qfs");
    let fsh = sample_file();
    fsh.save(&path, &BuildOptions::default()).unwrap();

    let raw = std::fs::read(&path).unwrap();
    assert!(qfs::is_compressed(&raw));
    assert!(raw.len() < plain_bytes(&fsh).len());

    let image = archive::open(&path).unwrap();
    assert_eq!(image.compression, CodecId::Qfs);
    assert_eq!(image.entries[2].image, fsh.entries[2].image);
}

#[test]
fn test_frame_without_length_prefix() {
    let plain = plain_bytes(&sample_file());
    let packed = archive::wrap(plain.clone(), true);
    assert_eq!(qfs::find_frame(&packed), Some(4));

    let bare = container::parse(&packed[4..]).unwrap();
    let reference = container::parse(&plain).unwrap();
    assert_eq!(bare.entries.len(), reference.entries.len());
    for (a, b) in bare.entries.iter().zip(&reference.entries) {
        assert_eq!(a.image, b.image);
    }
}

#[test]
fn test_unpack_pack_roundtrip() {
    let dir = tempdir().unwrap();
    let src = NamedTempFile::new().unwrap();
    sample_file().save(src.path(), &BuildOptions::default()).unwrap();
    let image = archive::open(src.path()).unwrap();

    let manifest = archive::unpack(&image, dir.path()).unwrap();
    assert_eq!(manifest.entries.len(), 4);
    assert!(dir.path().join("manifest.json").exists());
    assert!(dir.path().join(&manifest.entries[0].file).exists());

    let (rebuilt, loaded) = FshFile::from_manifest_dir(dir.path()).unwrap();
    assert_eq!(loaded, manifest);
    let opts = BuildOptions { dir_id: loaded.dir_id, ..BuildOptions::default() };
    let out = NamedTempFile::new().unwrap();
    rebuilt.save(out.path(), &opts).unwrap();
    assert_eq!(std::fs::read(out.path()).unwrap(), std::fs::read(src.path()).unwrap());
}

#[test]
fn test_pack_rejects_wrong_sized_pixels() {
    let dir = tempdir().unwrap();
    let image = container::parse(&plain_bytes(&sample_file())).unwrap();
    let manifest = archive::unpack(&image, dir.path()).unwrap();
    std::fs::write(dir.path().join(&manifest.entries[1].file), [0u8; 10]).unwrap();
    assert!(matches!(FshFile::from_manifest_dir(dir.path()), Err(FshError::Format(_))));
}

#[test]
fn test_rejected_codes_anywhere() {
    let plain = plain_bytes(&sample_file());
    for slot in 0..4 {
        let at = 16 + slot * 8 + 4;
        let offset = u32::from_le_bytes(plain[at..at + 4].try_into().unwrap()) as usize;
        for code in REJECTED_CODES {
            let mut bytes = plain.clone();
            bytes[offset] = code;
            match container::parse(&bytes) {
                Err(FshError::UnsupportedFormat(c)) => assert_eq!(c, code),
                other => panic!("slot {slot} code 0x{code:02x}: {other:?}"),
            }
        }
    }
}

#[test]
fn test_mip_chain_is_refused() {
    let entries = vec![BuildEntry { name: *b"mips", format: BitmapFormat::Dxt1, image: checker(8, 8) }];
    let mut bytes = container::build(&entries, *b"G264", &SquishCompressor::default()).unwrap();
    // misc[3] of the only entry header (at 24); top nibble = 1 extra level.
    bytes[24 + 15] = 0x10;
    assert!(matches!(container::parse(&bytes), Err(FshError::Format(_))));

    // Depth beyond what the dimensions halve to is still a mip count.
    bytes[24 + 15] = 0x40;
    assert!(matches!(container::parse(&bytes), Err(FshError::Format(_))));
}

#[test]
fn test_odd_sized_mip_chain_is_refused() {
    let entries = vec![BuildEntry { name: *b"odd6", format: BitmapFormat::Dxt1, image: checker(6, 6) }];
    let mut bytes = container::build(&entries, *b"G264", &SquishCompressor::default()).unwrap();
    assert!(container::parse(&bytes).is_ok());
    bytes[24 + 15] = 0x20;
    assert!(matches!(container::parse(&bytes), Err(FshError::Format(_))));
}

#[test]
fn test_truncated_container() {
    let plain = plain_bytes(&sample_file());
    for cut in [8, 20, plain.len() - 1] {
        assert!(container::parse(&plain[..cut]).is_err(), "cut at {cut}");
    }
    assert!(matches!(
        container::parse(&plain[..plain.len() - 1]),
        Err(FshError::Truncated { .. })
    ));
}

#[test]
fn test_bad_magic() {
    let mut plain = plain_bytes(&sample_file());
    plain[0] = b'X';
    assert!(matches!(container::parse(&plain), Err(FshError::Format(_))));
}

#[test]
fn test_attachments_are_listed() {
    let entries = vec![
        BuildEntry { name: *b"0000", format: BitmapFormat::Argb32, image: checker(2, 2) },
    ];
    let mut bytes = container::build(&entries, *b"G264", &SquishCompressor::default()).unwrap();
    // Entry header at 24, payload 16 bytes; chain one 16-byte attachment after it.
    let entry = 24usize;
    let code = u32::from_le_bytes(bytes[entry..entry + 4].try_into().unwrap()) | (32 << 8);
    bytes[entry..entry + 4].copy_from_slice(&code.to_le_bytes());
    bytes.extend_from_slice(&[0x6F, 0, 0, 0]);
    bytes.extend_from_slice(b"attachment text body");
    let total = bytes.len() as u32;
    bytes[4..8].copy_from_slice(&total.to_le_bytes());

    let image = container::parse(&bytes).unwrap();
    let attachments = &image.entries[0].attachments;
    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].offset, 56);
    assert_eq!(attachments[0].code, 0x6F);
}

proptest! {
    #[test]
    fn qfs_roundtrip(data in prop::collection::vec(any::<u8>(), 0..4096)) {
        if let Some(packed) = qfs::compress(&data) {
            prop_assert_eq!(qfs::decompress(&packed).unwrap(), data);
        }
    }

    #[test]
    fn qfs_roundtrip_repetitive(seed in prop::collection::vec(any::<u8>(), 1..16), reps in 64usize..200) {
        let data: Vec<u8> = seed.iter().copied().cycle().take(seed.len() * reps).collect();
        let packed = qfs::compress(&data).unwrap();
        prop_assert_eq!(qfs::decompress(&packed).unwrap(), data);
    }

    #[test]
    fn qfs_decompress_never_panics(data in prop::collection::vec(any::<u8>(), 0..256)) {
        let mut framed = vec![0x10, 0xFB, 0x00, 0x01, 0x00];
        framed.extend_from_slice(&data);
        let _ = qfs::decompress(&framed);
    }

    #[test]
    fn dxt_decode_stays_in_bounds(width in 1u16..40, height in 1u16..40, fill in any::<u8>()) {
        for format in [BitmapFormat::Dxt1, BitmapFormat::Dxt3] {
            let payload = vec![fill; format.payload_len(width as usize, height as usize)];
            let rgba = fshqfs::texture::decode_payload(format, &payload, width as usize, height as usize).unwrap();
            prop_assert_eq!(rgba.len(), width as usize * height as usize * 4);
        }
    }

    #[test]
    fn parse_never_panics(data in prop::collection::vec(any::<u8>(), 0..512)) {
        let mut bytes = b"SHPI".to_vec();
        bytes.extend_from_slice(&data);
        let _ = container::parse(&bytes);
    }
}
