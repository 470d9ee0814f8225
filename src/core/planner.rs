//! Deciding what gets handed to the transport, and in what order.
//!
//! Full uploads ship the manifest and whole-file digest before any part,
//! so the receiver knows the expected part count before parts arrive.
//! Selective re-uploads ship exactly the operator-named parts, routed
//! under a `missing/` sub-path so the audit trail of the original
//! attempt survives.

use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::chunker::Part;
use crate::core::error::PipelineError;

/// The three ways an invocation can drive the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferMode {
    /// Upload manifest, whole-file digest and every part.
    Full,
    /// Re-upload only the named artifacts, under `missing/`.
    Selective(Vec<String>),
    /// Produce everything locally, upload nothing.
    DryRun,
}

/// One artifact scheduled for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferItem {
    pub path: PathBuf,
    /// Remote object name (the local file name).
    pub name: String,
    /// Route under the `missing/` sub-path at the destination.
    pub missing: bool,
}

impl TransferItem {
    fn new(path: PathBuf, missing: bool) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            name,
            missing,
        }
    }
}

/// Plan a full upload: manifest first, then the source digest sidecar,
/// then the parts in sequence order.
pub fn plan_full(manifest: &Path, source_digest: &Path, parts: &[Part]) -> Vec<TransferItem> {
    let mut items = Vec::with_capacity(parts.len() + 2);
    items.push(TransferItem::new(manifest.to_path_buf(), false));
    items.push(TransferItem::new(source_digest.to_path_buf(), false));
    items.extend(
        parts
            .iter()
            .map(|p| TransferItem::new(p.path.clone(), false)),
    );
    items
}

/// Plan a selective re-upload of operator-named artifacts, resolved
/// relative to `dir` (normally the current working directory).
///
/// All-or-nothing: every name must be readable locally before anything
/// is uploaded. A single bad name fails the whole invocation, pointing
/// the operator at the usual cause before bytes move.
pub fn plan_selective(dir: &Path, names: &[String]) -> Result<Vec<TransferItem>, PipelineError> {
    let mut items = Vec::with_capacity(names.len());
    for name in names {
        let path = dir.join(name);
        if let Err(e) = File::open(&path) {
            return Err(PipelineError::PartUnreadable {
                name: name.clone(),
                source: e,
            });
        }
        debug!(part = %name, "Validated part for re-upload");
        items.push(TransferItem::new(path, true));
    }
    Ok(items)
}

/// Plan a dry run: nothing goes to the transport.
pub fn plan_dry_run() -> Vec<TransferItem> {
    Vec::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn part(dir: &Path, name: &str, index: u32) -> Part {
        let path = dir.join(name);
        std::fs::write(&path, b"part bytes").unwrap();
        Part {
            index,
            name: name.to_string(),
            path,
            size: 10,
        }
    }

    #[test]
    fn full_plan_leads_with_manifest_and_digest() {
        let dir = tempdir().unwrap();
        let parts = vec![
            part(dir.path(), "vmcore.part01", 0),
            part(dir.path(), "vmcore.part02", 1),
        ];
        let manifest = dir.path().join("vmcore.manifest");
        let digest = dir.path().join("vmcore.md5");

        let items = plan_full(&manifest, &digest, &parts);
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["vmcore.manifest", "vmcore.md5", "vmcore.part01", "vmcore.part02"]
        );
        assert!(items.iter().all(|i| !i.missing));
    }

    #[test]
    fn selective_returns_exactly_the_named_parts() {
        let dir = tempdir().unwrap();
        part(dir.path(), "dump.part01", 0);
        part(dir.path(), "dump.part02", 1);

        let names = vec!["dump.part01".to_string(), "dump.part02".to_string()];
        let items = plan_selective(dir.path(), &names).unwrap();

        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.missing));
        assert_eq!(items[0].name, "dump.part01");
        assert_eq!(items[1].name, "dump.part02");
    }

    #[test]
    fn selective_is_all_or_nothing() {
        let dir = tempdir().unwrap();
        part(dir.path(), "dump.part01", 0);

        let names = vec!["dump.part01".to_string(), "dump.part07".to_string()];
        let err = plan_selective(dir.path(), &names).unwrap_err();
        match err {
            PipelineError::PartUnreadable { name, .. } => assert_eq!(name, "dump.part07"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn dry_run_plans_nothing() {
        assert!(plan_dry_run().is_empty());
    }
}
