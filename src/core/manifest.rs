//! The transfer manifest.
//!
//! A single line-oriented record of part count, sizes and MD5 digests,
//! read by support engineers as often as by scripts. The BEGIN/END
//! markers let a parser pull out either section without counting lines.
//! The manifest is the root of trust for the whole transfer and is never
//! itself split, however large the dump was.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::chunker::Part;
use crate::core::fingerprint::Digest;

/// Name, size and digest for one artifact (the source file or a part).
#[derive(Debug, Clone)]
pub struct ArtifactRecord {
    pub name: String,
    pub size: u64,
    pub digest: Digest,
}

impl ArtifactRecord {
    pub fn for_part(part: &Part, digest: Digest) -> Self {
        Self {
            name: part.name.clone(),
            size: part.size,
            digest,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Manifest {
    source: ArtifactRecord,
    parts: Vec<ArtifactRecord>,
}

impl Manifest {
    /// Assemble the manifest. Call only once every part has been written
    /// and fingerprinted; a partial manifest is worse than none.
    pub fn build(source: ArtifactRecord, parts: Vec<ArtifactRecord>) -> Self {
        Self { source, parts }
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }

    /// The on-disk manifest filename for this source file.
    pub fn file_name(&self) -> String {
        format!("{}.manifest", self.source.name)
    }

    /// Render the manifest text: part count, then the size section, then
    /// the digest section, source first and parts in sequence order.
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("NUMBER_OF_PARTS: {}\n", self.parts.len()));

        out.push_str("### FILESIZE BEGIN ###\n");
        out.push_str(&format!("{} {}\n", self.source.name, self.source.size));
        for part in &self.parts {
            out.push_str(&format!("{} {}\n", part.name, part.size));
        }
        out.push_str("### FILESIZE END ###\n");

        out.push_str("### MD5 FINGERPRINT BEGIN ###\n");
        out.push_str(&format!("{}\n", self.source.digest.sum_line(&self.source.name)));
        for part in &self.parts {
            out.push_str(&format!("{}\n", part.digest.sum_line(&part.name)));
        }
        out.push_str("### MD5 FINGERPRINT END ###\n");

        out
    }

    /// Persist the manifest next to the parts.
    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(self.file_name());
        std::fs::write(&path, self.render())
            .with_context(|| format!("Failed to write manifest {}", path.display()))?;
        info!(
            manifest = %path.display(),
            parts = self.parts.len(),
            "Manifest written"
        );
        Ok(path)
    }
}
