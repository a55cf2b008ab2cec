use clap::Parser;
use std::path::PathBuf;

use crate::decoder::Dimension;

#[derive(Parser, Debug)]
#[command(name = "chunkzip")]
#[command(version)]
#[command(about = "Decode a ZIP chunk of numbered frames", long_about = None)]
#[command(after_help = "Examples:\n  \
  chunkzip chunk_0.zip -s 0 -e 35        decode frames 0..=35 and print them\n  \
  chunkzip -l chunk_1.zip -s 36          list entries with their frame indices\n  \
  chunkzip --dimension 3d -d out https://example.com/chunk_2.zip\n                                         \
  write point-cloud frames to ./out")]
pub struct Cli {
    /// Chunk file path or HTTP URL
    #[arg(value_name = "CHUNK")]
    pub chunk: String,

    /// Index of the first frame in the chunk
    #[arg(short = 's', long = "start", default_value_t = 0)]
    pub start: u64,

    /// Last frame index to decode (default: all)
    #[arg(short = 'e', long = "end")]
    pub end: Option<u64>,

    /// Content dimension: 2d images or 3d binary frames
    #[arg(long, value_enum, default_value_t = Dimension::TwoD)]
    pub dimension: Dimension,

    /// List entries with their assigned indices, without decoding
    #[arg(short = 'l')]
    pub list: bool,

    /// Write decoded frames into DIR
    #[arg(short = 'd', value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Report frames in index order instead of completion order
    #[arg(long)]
    pub ordered: bool,

    /// Configuration file (TOML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Quiet mode (-qq => quieter)
    #[arg(short = 'q', action = clap::ArgAction::Count)]
    pub quiet: u8,
}

impl Cli {
    pub fn is_http_url(&self) -> bool {
        self.chunk.starts_with("http://") || self.chunk.starts_with("https://")
    }

    pub fn end_index(&self) -> u64 {
        self.end.unwrap_or(u64::MAX)
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet > 0
    }

    /// Default log filter when `RUST_LOG` is unset.
    pub fn log_level(&self) -> &'static str {
        match self.quiet {
            0 => "info",
            1 => "warn",
            _ => "error",
        }
    }
}
