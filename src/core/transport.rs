//! Upload transport.
//!
//! One PUT per artifact to the support endpoint, namespaced by appliance
//! UUID and case number. Re-uploads land under `missing/` so they never
//! overwrite the audit trail of the original attempt. The server creates
//! directories as needed and treats identical re-uploads as idempotent.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::path::Path;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

/// Where one artifact goes on the support server.
#[derive(Debug, Clone)]
pub struct RemoteTarget {
    pub system_uuid: String,
    pub case_id: String,
    /// Remote object name (the local file name).
    pub name: String,
    /// Route under the `missing/` sub-path (selective re-upload).
    pub missing: bool,
}

impl RemoteTarget {
    /// Path of this artifact relative to the endpoint base URL.
    pub fn remote_path(&self) -> String {
        if self.missing {
            format!("{}/{}/missing/{}", self.system_uuid, self.case_id, self.name)
        } else {
            format!("{}/{}/{}", self.system_uuid, self.case_id, self.name)
        }
    }
}

/// The transport collaborator: places one local artifact at a remote
/// target. A trait so tests can record uploads instead of hitting the
/// network.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn upload(&self, local: &Path, target: &RemoteTarget) -> Result<()>;
}

/// HTTPS transport: a streaming PUT per artifact.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn upload(&self, local: &Path, target: &RemoteTarget) -> Result<()> {
        let url = format!("{}/{}", self.base_url, target.remote_path());
        let file = tokio::fs::File::open(local)
            .await
            .with_context(|| format!("Failed to open {} for upload", local.display()))?;
        let size = file
            .metadata()
            .await
            .with_context(|| format!("Failed to stat {}", local.display()))?
            .len();

        debug!(url = %url, bytes = size, "Uploading artifact");

        let body = reqwest::Body::wrap_stream(ReaderStream::new(file));
        let response = self
            .client
            .put(&url)
            .header(reqwest::header::CONTENT_LENGTH, size)
            .body(body)
            .send()
            .await
            .with_context(|| format!("Upload request failed for {}", target.name))?;

        if !response.status().is_success() {
            bail!(
                "Server rejected upload of {} to {}: HTTP {}",
                target.name,
                url,
                response.status()
            );
        }

        info!(artifact = %target.name, destination = %url, "Upload complete");
        Ok(())
    }
}
