//! Pipeline sequencing.
//!
//! A split run walks space gate, whole-file fingerprint, split,
//! per-part fingerprints, manifest, plan, upload, strictly in that
//! order; each stage completes before the next starts and nothing is
//! resumable. Selective re-upload is the short path: validate the named
//! parts, plan, upload.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::task;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::core::chunker::{self, parse_size};
use crate::core::error::PipelineError;
use crate::core::fingerprint::{digest_file, write_sidecar};
use crate::core::manifest::{ArtifactRecord, Manifest};
use crate::core::planner::{self, TransferItem, TransferMode};
use crate::core::space::{CapacityProvider, check_space};
use crate::core::transport::{RemoteTarget, Transport};

/// One artifact the transport could not place.
#[derive(Debug)]
pub struct UploadFailure {
    pub name: String,
    pub destination: String,
    pub error: String,
}

/// What a run produced and what happened to it.
#[derive(Debug)]
pub struct RunReport {
    /// Every artifact written locally (manifest, sidecars, parts).
    pub produced: Vec<String>,
    /// What the planner handed to the transport, in upload order.
    pub transfer: Vec<TransferItem>,
    pub uploaded: usize,
    pub failures: Vec<UploadFailure>,
}

pub struct Orchestrator {
    config: AppConfig,
    case_id: String,
    system_uuid: String,
    transport: Box<dyn Transport>,
    capacity: Box<dyn CapacityProvider>,
}

impl Orchestrator {
    pub fn new(
        config: AppConfig,
        case_id: String,
        system_uuid: String,
        transport: Box<dyn Transport>,
        capacity: Box<dyn CapacityProvider>,
    ) -> Self {
        Self {
            config,
            case_id,
            system_uuid,
            transport,
            capacity,
        }
    }

    pub async fn run(&self, mode: TransferMode, source: Option<&Path>) -> Result<RunReport> {
        match mode {
            TransferMode::Selective(ref names) => self.run_selective(names).await,
            _ => {
                let source = source.context("A source file is required for this mode")?;
                self.run_split(source, mode).await
            }
        }
    }

    /// The main pipeline: gate on space, fingerprint, split, fingerprint
    /// parts, build the manifest, then plan and upload.
    async fn run_split(&self, source: &Path, mode: TransferMode) -> Result<RunReport> {
        info!(source = %source.display(), case = %self.case_id, "Starting split run");

        let metadata =
            std::fs::metadata(source).map_err(|e| PipelineError::SourceUnreadable {
                path: source.to_path_buf(),
                source: e,
            })?;
        let source_size = metadata.len();
        let source_name = source
            .file_name()
            .and_then(|n| n.to_str())
            .with_context(|| format!("Source has no usable file name: {}", source.display()))?
            .to_string();

        let chunk_size = parse_size(&self.config.chunk_size)?;
        let dir = source
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."))
            .to_path_buf();

        // Mandatory precondition: prove the headroom exists before any
        // part is written.
        check_space(
            self.capacity.as_ref(),
            &dir,
            source_size,
            self.config.space_multiplier,
        )?;

        info!(bytes = source_size, "Fingerprinting source file");
        let src = source.to_path_buf();
        let (source_digest, source_sidecar) = task::spawn_blocking(move || -> Result<_> {
            let digest = digest_file(&src)?;
            let sidecar = write_sidecar(&src, &digest)?;
            Ok((digest, sidecar))
        })
        .await??;

        let src = source.to_path_buf();
        let parts = task::spawn_blocking(move || chunker::split(&src, chunk_size)).await??;
        if parts.is_empty() {
            warn!("Source file is empty; manifest will declare zero parts");
        }

        let to_fingerprint = parts.clone();
        let part_records = task::spawn_blocking(move || -> Result<Vec<ArtifactRecord>> {
            to_fingerprint
                .iter()
                .map(|part| {
                    let digest = digest_file(&part.path)?;
                    write_sidecar(&part.path, &digest)?;
                    Ok(ArtifactRecord::for_part(part, digest))
                })
                .collect()
        })
        .await??;

        let manifest = Manifest::build(
            ArtifactRecord {
                name: source_name,
                size: source_size,
                digest: source_digest,
            },
            part_records,
        );
        let manifest_path = manifest.write(&dir)?;

        let mut produced = vec![
            file_name_of(&manifest_path),
            file_name_of(&source_sidecar),
        ];
        for part in &parts {
            produced.push(part.name.clone());
            produced.push(format!("{}.md5", part.name));
        }

        let transfer = match mode {
            TransferMode::Full => planner::plan_full(&manifest_path, &source_sidecar, &parts),
            TransferMode::DryRun => {
                info!(
                    artifacts = produced.len(),
                    "Dry run: skipping upload, transfer these manually"
                );
                planner::plan_dry_run()
            }
            TransferMode::Selective(_) => unreachable!("selective mode never splits"),
        };

        let (uploaded, failures) = self.upload_all(&transfer).await;
        Ok(RunReport {
            produced,
            transfer,
            uploaded,
            failures,
        })
    }

    /// Short path: no space check, no split, no manifest. The named
    /// parts are validated locally and re-uploaded under `missing/`.
    async fn run_selective(&self, names: &[String]) -> Result<RunReport> {
        let cwd = std::env::current_dir().context("Cannot determine working directory")?;
        info!(parts = names.len(), "Selective re-upload of named parts");

        let transfer = planner::plan_selective(&cwd, names)?;
        let (uploaded, failures) = self.upload_all(&transfer).await;
        Ok(RunReport {
            produced: Vec::new(),
            transfer,
            uploaded,
            failures,
        })
    }

    /// Sequential upload in planner order. Per-artifact failures are
    /// reported with destination context; whether one failure aborts the
    /// remainder is the `abort_on_upload_error` setting.
    async fn upload_all(&self, items: &[TransferItem]) -> (usize, Vec<UploadFailure>) {
        let mut uploaded = 0;
        let mut failures = Vec::new();

        for item in items {
            let target = RemoteTarget {
                system_uuid: self.system_uuid.clone(),
                case_id: self.case_id.clone(),
                name: item.name.clone(),
                missing: item.missing,
            };

            match self.transport.upload(&item.path, &target).await {
                Ok(()) => uploaded += 1,
                Err(e) => {
                    error!(
                        artifact = %item.name,
                        destination = %target.remote_path(),
                        error = %format!("{e:#}"),
                        "Upload failed"
                    );
                    failures.push(UploadFailure {
                        name: item.name.clone(),
                        destination: target.remote_path(),
                        error: format!("{e:#}"),
                    });
                    if self.config.abort_on_upload_error {
                        warn!(
                            remaining = items.len() - uploaded - failures.len(),
                            "Aborting remaining uploads after failure"
                        );
                        break;
                    }
                }
            }
        }

        (uploaded, failures)
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// Integration coverage for the orchestrator lives in tests/pipeline.rs,
// driven through a recording mock transport and a fixed-capacity provider.
