//! MD5 fingerprinting of the dump and its parts.
//!
//! The receiver's verification tooling speaks md5sum, so digests are
//! persisted as sidecar files in md5sum format (`<hex>  <name>`) and the
//! same lines appear in the manifest.

use anyhow::{Context, Result};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Buffer size for streaming reads (128KB, same as the copy path)
const BUFFER_SIZE: usize = 128 * 1024;

/// An MD5 digest bound to exactly one artifact's byte content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest(String);

impl Digest {
    pub fn as_hex(&self) -> &str {
        &self.0
    }

    /// The md5sum-compatible line persisted in sidecars and the manifest.
    pub fn sum_line(&self, name: &str) -> String {
        format!("{}  {}", self.0, name)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Compute the MD5 digest of a file, streaming in chunks so multi-gigabyte
/// dumps never land in memory whole.
pub fn digest_file(path: &Path) -> Result<Digest> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut reader = BufReader::with_capacity(BUFFER_SIZE, file);
    let mut context = md5::Context::new();

    let mut buffer = [0u8; BUFFER_SIZE];
    loop {
        let bytes_read = reader
            .read(&mut buffer)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        if bytes_read == 0 {
            break;
        }
        context.consume(&buffer[..bytes_read]);
    }

    let digest = Digest(format!("{:x}", context.compute()));
    debug!(file = %path.display(), md5 = %digest, "Fingerprinted artifact");
    Ok(digest)
}

/// Persist a digest as `<artifact>.md5` next to the artifact, so the
/// receiver can re-verify without recomputing anything on this side.
pub fn write_sidecar(artifact: &Path, digest: &Digest) -> Result<PathBuf> {
    let name = artifact
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Artifact has no usable file name: {}", artifact.display()))?;

    let sidecar = artifact.with_file_name(format!("{name}.md5"));
    std::fs::write(&sidecar, format!("{}\n", digest.sum_line(name)))
        .with_context(|| format!("Failed to write digest sidecar {}", sidecar.display()))?;
    Ok(sidecar)
}
