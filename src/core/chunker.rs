//! Splitting a dump into fixed-maximum-size parts.
//!
//! Parts are named `<file>.partNN` with the sequence number zero-padded
//! so a plain lexicographic sort of the filenames reproduces byte order.
//! Anyone holding just the parts can reassemble the dump with `cat`.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::core::error::PipelineError;
use crate::logging::LogThrottle;

/// Buffer size for file I/O (128KB, matches the fingerprint path)
const BUFFER_SIZE: usize = 128 * 1024;

/// One contiguous fragment of the source file.
///
/// The sequence index is the authoritative ordering; the name is derived
/// from it, never the other way round.
#[derive(Debug, Clone)]
pub struct Part {
    pub index: u32,
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
}

/// Parse a chunk-size argument: bare bytes or a `k`/`m`/`g` suffix
/// (binary units, case-insensitive). Zero and garbage are input errors.
pub fn parse_size(input: &str) -> Result<u64, PipelineError> {
    let trimmed = input.trim();
    let invalid = || PipelineError::InvalidChunkSize(input.to_string());

    let (digits, unit) = match trimmed.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => {
            let mult = match c.to_ascii_lowercase() {
                'k' => 1024u64,
                'm' => 1024 * 1024,
                'g' => 1024 * 1024 * 1024,
                _ => return Err(invalid()),
            };
            (&trimmed[..idx], mult)
        }
        Some(_) => (trimmed, 1),
        None => return Err(invalid()),
    };

    let value: u64 = digits.parse().map_err(|_| invalid())?;
    let bytes = value.checked_mul(unit).ok_or_else(invalid)?;
    if bytes == 0 {
        return Err(invalid());
    }
    Ok(bytes)
}

/// Partition arithmetic: the exact sizes the split will produce, in
/// sequence order. Empty for an empty source.
pub fn part_sizes(total: u64, chunk: u64) -> Vec<u64> {
    assert!(chunk > 0, "chunk size must be validated before splitting");
    let mut sizes = Vec::with_capacity(total.div_ceil(chunk) as usize);
    let mut remaining = total;
    while remaining > 0 {
        let size = remaining.min(chunk);
        sizes.push(size);
        remaining -= size;
    }
    sizes
}

/// Derive a part name from the source filename and sequence index.
///
/// Numbering starts at 01. Pad width grows with the part count (minimum
/// two digits) so lexicographic order always equals index order, even
/// past 99 parts.
fn part_name(source_name: &str, index: u32, total: usize) -> String {
    let width = total.to_string().len().max(2);
    format!("{source_name}.part{:0width$}", index + 1)
}

/// Split `source` into parts of at most `chunk_size` bytes, written next
/// to the source file. Returns the parts in sequence order.
///
/// An empty source produces no parts; the caller still builds a manifest
/// recording `NUMBER_OF_PARTS: 0`.
pub fn split(source: &Path, chunk_size: u64) -> Result<Vec<Part>> {
    let source_name = source
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Source has no usable file name: {}", source.display()))?
        .to_string();
    let dir = source.parent().unwrap_or_else(|| Path::new("."));

    let total_size = source
        .metadata()
        .with_context(|| format!("Failed to stat {}", source.display()))?
        .len();
    let sizes = part_sizes(total_size, chunk_size);

    if sizes.is_empty() {
        info!(file = %source.display(), "Source file is empty, producing no parts");
        return Ok(Vec::new());
    }

    info!(
        file = %source.display(),
        total_bytes = total_size,
        parts = sizes.len(),
        chunk_size = chunk_size,
        "Splitting dump"
    );

    let file =
        File::open(source).with_context(|| format!("Failed to open {}", source.display()))?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
    let throttle = LogThrottle::new(Duration::from_secs(2));

    let mut parts = Vec::with_capacity(sizes.len());
    let mut written_total: u64 = 0;

    for (index, &part_size) in sizes.iter().enumerate() {
        let name = part_name(&source_name, index as u32, sizes.len());
        let path = dir.join(&name);

        write_part(&mut reader, &path, part_size, &mut |copied| {
            if throttle.should_log() {
                debug!(
                    part = %name,
                    copied_bytes = written_total + copied,
                    total_bytes = total_size,
                    "Split progress"
                );
            }
        })
        .with_context(|| format!("Failed to write part {}", path.display()))?;

        written_total += part_size;
        debug!(part = %name, size = part_size, "Part written");

        parts.push(Part {
            index: index as u32,
            name,
            path,
            size: part_size,
        });
    }

    info!(parts = parts.len(), total_bytes = written_total, "Split complete");
    Ok(parts)
}

/// Copy exactly `part_size` bytes from the reader into a new part file.
fn write_part(
    reader: &mut impl Read,
    path: &Path,
    part_size: u64,
    progress: &mut impl FnMut(u64),
) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::with_capacity(BUFFER_SIZE, file);

    let mut buffer = [0u8; BUFFER_SIZE];
    let mut remaining = part_size;
    while remaining > 0 {
        let want = remaining.min(BUFFER_SIZE as u64) as usize;
        let got = reader.read(&mut buffer[..want])?;
        if got == 0 {
            // The source shrank under us between stat and read.
            anyhow::bail!("source file truncated mid-split ({remaining} bytes short)");
        }
        writer.write_all(&buffer[..got])?;
        remaining -= got as u64;
        progress(part_size - remaining);
    }

    writer.flush()?;
    Ok(())
}
