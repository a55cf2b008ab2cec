//! Command-line front end for decoding frame chunks.
//!
//! Reads a chunk from disk or over HTTP, decodes it, and prints one line
//! per frame, optionally writing the decoded frames to a directory.

use anyhow::{Context, Result};
use bytes::Bytes;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use chunkzip::{
    ChunkDecoder, ChunkRequest, Cli, Config, DecodeEvent, DecodedEntry, HttpChunkFetcher,
    MemoryReader, Payload, Resequencer, ZipExtractor, ZipFileEntry,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level())),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::resolve(cli.config.as_deref())?;

    let archive = if cli.is_http_url() {
        let fetcher = HttpChunkFetcher::new(&config.http)?;
        let archive = fetcher.fetch(&cli.chunk).await?;
        if !cli.is_quiet() {
            eprintln!("Total bytes transferred: {}", format_size(fetcher.transferred_bytes()));
        }
        archive
    } else {
        let data = tokio::fs::read(&cli.chunk)
            .await
            .with_context(|| format!("reading {}", cli.chunk))?;
        Bytes::from(data)
    };

    if cli.list {
        return list_entries(archive, &cli).await;
    }

    let decoder = ChunkDecoder::new(config.decoder);
    decode_chunk(&decoder, archive, &cli).await
}

/// Print every entry with the index it would be assigned.
async fn list_entries(archive: Bytes, cli: &Cli) -> Result<()> {
    let extractor = ZipExtractor::new(Arc::new(MemoryReader::new(archive)));
    let entries = extractor.list_files().await?;

    println!(
        "{:>10}  {:>10}  {:>10}  {:>5}  {:>10}  {:>5}  Name",
        "Index", "Length", "Size", "Cmpr", "Date", "Time"
    );
    println!("{}", "-".repeat(80));

    let mut index = cli.start;
    for entry in entries.iter().filter(|e| !e.is_directory) {
        let (year, month, day) = entry.mod_date();
        let (hour, minute, _second) = entry.mod_time();
        let marker = if index > cli.end_index() { " (skipped)" } else { "" };

        println!(
            "{:>10}  {:>10}  {:>10}  {:>4.0}%  {:04}-{:02}-{:02}  {:02}:{:02}  {}{}",
            index,
            entry.uncompressed_size,
            entry.compressed_size,
            space_saved(entry),
            year,
            month,
            day,
            hour,
            minute,
            entry.file_name,
            marker
        );
        index = index.saturating_add(1);
    }

    Ok(())
}

/// Decode the chunk, reporting frames as they complete (or in index order).
async fn decode_chunk(decoder: &ChunkDecoder, archive: Bytes, cli: &Cli) -> Result<()> {
    if let Some(dir) = &cli.output_dir {
        tokio::fs::create_dir_all(dir).await?;
    }

    let request = ChunkRequest::new(archive, cli.start, cli.end_index(), cli.dimension);
    let mut stream = decoder.decode(request);
    let mut sequencer = cli.ordered.then(|| Resequencer::new(cli.start));

    while let Some(event) = stream.next().await {
        let ready = match event {
            DecodeEvent::Failed(failure) => return Err(failure.into()),
            DecodeEvent::Finished(summary) => {
                if let Some(sequencer) = sequencer.take() {
                    for entry in sequencer.finish() {
                        report_entry(&entry, cli).await?;
                    }
                }
                if !cli.is_quiet() {
                    eprintln!(
                        "{} decoded, {} failed, {} past end index",
                        summary.decoded, summary.failed, summary.skipped
                    );
                }
                break;
            }
            DecodeEvent::EntryFailed(failure) => {
                eprintln!("error: {}", failure);
                match sequencer.as_mut() {
                    Some(sequencer) => sequencer.skip(failure.index),
                    None => Vec::new(),
                }
            }
            DecodeEvent::Entry(entry) => match sequencer.as_mut() {
                Some(sequencer) => sequencer.push(entry),
                None => vec![entry],
            },
        };

        for entry in ready {
            report_entry(&entry, cli).await?;
        }
    }

    Ok(())
}

async fn report_entry(entry: &DecodedEntry, cli: &Cli) -> Result<()> {
    match &entry.payload {
        Payload::Bitmap(bitmap) => println!(
            "{:>10}  {:>5}x{:<5}  {}",
            entry.index, bitmap.width, bitmap.height, entry.name
        ),
        Payload::Blob(blob) => println!(
            "{:>10}  {:>11}  {}",
            entry.index,
            format_size(blob.len() as u64),
            entry.name
        ),
    }

    if let Some(dir) = &cli.output_dir {
        let path = output_path(dir, entry);
        let data = match &entry.payload {
            Payload::Bitmap(bitmap) => bitmap.to_png()?,
            Payload::Blob(blob) => blob.to_vec(),
        };
        tokio::fs::write(&path, data)
            .await
            .with_context(|| format!("writing {}", path.display()))?;
    }

    Ok(())
}

/// Bitmaps are written as `<index>.png`; blobs keep their archive base name,
/// prefixed with the index so entries from different chunks never collide.
fn output_path(dir: &Path, entry: &DecodedEntry) -> PathBuf {
    match entry.payload {
        Payload::Bitmap(_) => dir.join(format!("{:06}.png", entry.index)),
        Payload::Blob(_) => {
            let base = Path::new(&entry.name)
                .file_name()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "frame".to_string());
            dir.join(format!("{:06}_{}", entry.index, base))
        }
    }
}

/// Percentage of space saved by compression. Sizes come from the archive
/// and may be arbitrary, so the ratio is computed in floating point.
fn space_saved(entry: &ZipFileEntry) -> f64 {
    if entry.uncompressed_size == 0 {
        return 0.0;
    }
    100.0 - entry.compressed_size as f64 * 100.0 / entry.uncompressed_size as f64
}

/// Format a byte size into a human-readable string.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} bytes", size)
    }
}
