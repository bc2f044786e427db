use clap::{Parser, Subcommand};
use fshqfs::archive::{self, BuildOptions, Compression, FshFile};
use fshqfs::codec::{get_codec, CodecId};
use fshqfs::header::{display_tag, parse_tag};
use fshqfs::texture::Quality;
use fshqfs::FshError;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fsh", about = "FSH texture container and QFS compression CLI")]
struct Cli {
    /// Log structural decisions (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show container header, directory and entries
    Info {
        input: PathBuf,
    },
    /// Decode every entry to raw RGBA8 files plus manifest.json
    Unpack {
        input: PathBuf,
        #[arg(short = 'C', long, default_value = ".")]
        output_dir: PathBuf,
    },
    /// Build a container from a directory written by `unpack`
    Pack {
        input_dir: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// QFS-wrap the result: auto (by .qfs extension), always, never
        #[arg(short, long, default_value = "auto")]
        compression: String,
        /// Directory id tag (4 characters or 0x + 8 hex digits); defaults to the manifest's
        #[arg(long)]
        dir_id: Option<String>,
        /// Block encoder quality: fast, balanced, best
        #[arg(short, long, default_value = "best")]
        quality: String,
    },
    /// QFS-compress an arbitrary file
    Compress {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Codec to apply: qfs, none
        #[arg(long, default_value = "qfs")]
        codec: String,
    },
    /// Unwrap a QFS-compressed file
    Decompress {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input } => {
            let image = archive::open(&input)?;
            let h = &image.header;

            println!("── FSH Container ────────────────────────────────────────");
            println!("  Path           {}", input.display());
            println!("  Compression    {}", image.compression.name());
            println!("  Declared size  {} B", h.size);
            println!("  Entries        {}", h.count);
            println!("  Directory id   {}", display_tag(&h.dir_id));
            println!("{:<12} {:>10} {:<8} {:>11}  Attachments",
                     "Name", "Offset", "Format", "Size");
            for e in &image.entries {
                let attachments = if e.attachments.is_empty() {
                    "-".to_string()
                } else {
                    e.attachments
                        .iter()
                        .map(|a| format!("0x{:02x}@0x{:x}", a.code, a.offset))
                        .collect::<Vec<_>>()
                        .join(" ")
                };
                println!("{:<12} {:>#10x} {:<8} {:>11}  {}",
                    display_tag(&e.name), e.offset, e.format.name(),
                    format!("{}x{}", e.image.width, e.image.height), attachments);
            }
        }

        // ── Unpack ───────────────────────────────────────────────────────────
        Commands::Unpack { input, output_dir } => {
            let image = archive::open(&input)?;
            let manifest = archive::unpack(&image, &output_dir)?;
            for e in &manifest.entries {
                println!("  unpacked  {} ({} {}x{})", e.file, e.format, e.width, e.height);
            }
            println!("Unpacked to: {}", output_dir.display());
        }

        // ── Pack ─────────────────────────────────────────────────────────────
        Commands::Pack { input_dir, output, compression, dir_id, quality } => {
            let (fsh, manifest) = FshFile::from_manifest_dir(&input_dir)?;
            let dir_id = match dir_id {
                Some(s) => parse_tag(&s).ok_or_else(|| format!("bad directory id '{s}'"))?,
                None    => manifest.dir_id,
            };
            let opts = BuildOptions {
                compression: parse_compression(&compression),
                dir_id,
                quality:     parse_quality(&quality),
            };
            fsh.save(&output, &opts)?;
            println!("Created: {} ({} entries)", output.display(), fsh.entries.len());
        }

        // ── Compress ─────────────────────────────────────────────────────────
        Commands::Compress { input, output, codec } => {
            let id = CodecId::from_name(&codec).ok_or_else(|| format!("unknown codec '{codec}'"))?;
            let codec = get_codec(id);
            let data = std::fs::read(&input)?;
            let packed = match codec.compress(&data) {
                Ok(packed) => packed,
                Err(FshError::CompressionOverflow) => {
                    println!("{} does not compress with {}; file left unchanged",
                        input.display(), codec.codec_id().name());
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };
            std::fs::write(&output, &packed)?;
            println!("Compressed {} → {} [{}] ({} → {} B)",
                input.display(), output.display(), codec.codec_id().name(), data.len(), packed.len());
        }

        // ── Decompress ───────────────────────────────────────────────────────
        Commands::Decompress { input, output } => {
            let data = std::fs::read(&input)?;
            let id = CodecId::detect(&data);
            if id != CodecId::Qfs {
                return Err(format!("{} is not QFS-compressed", input.display()).into());
            }
            let plain = get_codec(id).decompress(&data)?;
            std::fs::write(&output, &plain)?;
            println!("Decompressed {} → {} ({} → {} B)",
                input.display(), output.display(), data.len(), plain.len());
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn parse_compression(s: &str) -> Compression {
    Compression::from_name(s).unwrap_or_else(|| {
        eprintln!("Unknown compression mode '{}', defaulting to auto", s);
        Compression::ByExtension
    })
}

fn parse_quality(s: &str) -> Quality {
    Quality::from_name(s).unwrap_or_else(|| {
        eprintln!("Unknown quality '{}', defaulting to best", s);
        Quality::Best
    })
}
