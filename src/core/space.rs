//! Pre-split free-space gate.
//!
//! Splitting a dump roughly doubles its on-disk footprint while the
//! original stays in place, and running out of space mid-split leaves
//! truncated parts behind. The gate proves there is headroom before the
//! chunker writes a single byte.

use anyhow::{Context, Result};
use std::path::Path;
use tracing::debug;

use crate::core::error::PipelineError;

/// Reports available free bytes for the filesystem backing a path.
///
/// A trait so tests can inject a fake provider instead of needing a
/// filesystem in a particular fill state.
pub trait CapacityProvider: Send + Sync {
    fn available_bytes(&self, path: &Path) -> Result<u64>;
}

/// Production provider backed by `statvfs(2)`.
pub struct StatvfsCapacity;

impl CapacityProvider for StatvfsCapacity {
    fn available_bytes(&self, path: &Path) -> Result<u64> {
        let stat = nix::sys::statvfs::statvfs(path)
            .with_context(|| format!("statvfs failed for {}", path.display()))?;
        // f_bavail is what unprivileged users can use; f_bfree includes
        // blocks reserved for root.
        Ok(stat.blocks_available() as u64 * stat.fragment_size() as u64)
    }
}

/// Outcome of the free-space estimate.
#[derive(Debug, Clone, Copy)]
pub struct SpaceCheck {
    pub required: u64,
    pub available: u64,
    pub sufficient: bool,
}

impl SpaceCheck {
    /// `required = source_size * multiplier`; sufficient iff the volume
    /// has at least that much free. The multiplier covers the original
    /// file, the full set of parts, and slack for sidecars and manifest.
    pub fn estimate(source_size: u64, multiplier: u64, available: u64) -> Self {
        let required = source_size.saturating_mul(multiplier);
        Self {
            required,
            available,
            sufficient: available >= required,
        }
    }
}

/// Gate the pipeline on free space in `dir` (where the parts will land).
///
/// A provider failure counts as insufficient: if we cannot prove the
/// headroom exists, we do not split.
pub fn check_space(
    provider: &dyn CapacityProvider,
    dir: &Path,
    source_size: u64,
    multiplier: u64,
) -> Result<SpaceCheck, PipelineError> {
    let available = match provider.available_bytes(dir) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(
                dir = %dir.display(),
                error = %e,
                "Could not determine free space, treating as insufficient"
            );
            0
        }
    };

    let check = SpaceCheck::estimate(source_size, multiplier, available);
    debug!(
        required = check.required,
        available = check.available,
        sufficient = check.sufficient,
        "Free-space check"
    );

    if !check.sufficient {
        return Err(PipelineError::InsufficientSpace {
            required: check.required,
            available: check.available,
            multiplier,
        });
    }
    Ok(check)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    struct FixedCapacity(u64);

    impl CapacityProvider for FixedCapacity {
        fn available_bytes(&self, _path: &Path) -> Result<u64> {
            Ok(self.0)
        }
    }

    struct BrokenCapacity;

    impl CapacityProvider for BrokenCapacity {
        fn available_bytes(&self, _path: &Path) -> Result<u64> {
            Err(anyhow!("no such filesystem"))
        }
    }

    #[test]
    fn estimate_boundary_is_inclusive() {
        assert!(SpaceCheck::estimate(100, 3, 300).sufficient);
        assert!(!SpaceCheck::estimate(100, 3, 299).sufficient);
    }

    #[test]
    fn estimate_saturates_instead_of_overflowing() {
        let check = SpaceCheck::estimate(u64::MAX, 3, u64::MAX);
        assert_eq!(check.required, u64::MAX);
        assert!(check.sufficient);
    }

    #[test]
    fn gate_passes_with_headroom() {
        let check = check_space(&FixedCapacity(1000), Path::new("/tmp"), 100, 3).unwrap();
        assert_eq!(check.required, 300);
    }

    #[test]
    fn gate_rejects_tight_volume() {
        let err = check_space(&FixedCapacity(200), Path::new("/tmp"), 100, 3).unwrap_err();
        assert!(err.is_safe_abort());
        match err {
            PipelineError::InsufficientSpace {
                required,
                available,
                ..
            } => {
                assert_eq!(required, 300);
                assert_eq!(available, 200);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_capacity_fails_safe() {
        let err = check_space(&BrokenCapacity, Path::new("/tmp"), 1, 3).unwrap_err();
        assert!(err.is_safe_abort());
    }

    #[test]
    fn statvfs_reports_something_for_tmp() {
        // Smoke test against the real filesystem; any running system has
        // at least one free byte under the test tmpdir.
        let dir = tempfile::tempdir().unwrap();
        let bytes = StatvfsCapacity.available_bytes(dir.path()).unwrap();
        assert!(bytes > 0);
    }
}
