//! Best-effort appliance identity detection.
//!
//! The upload destination is namespaced by the appliance system UUID.
//! When `-u` is not given we scan the local appliance configuration for
//! a `system.uuid` entry; if nothing usable turns up the caller must
//! require an explicit `-u`.

use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::debug;
use uuid::Uuid;

/// Sentinel meaning auto-detection found nothing usable. Treated as
/// "not supplied" everywhere, never sent to the server.
pub const UNKNOWN_UUID: &str = "unknown";

static UUID_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*system\.uuid\s*=\s*"?([0-9a-fA-F-]{36})"?\s*$"#).unwrap()
});

/// Scan the appliance configuration for the system UUID. Falls back to
/// [`UNKNOWN_UUID`] on any failure; this path never errors.
pub fn detect_system_uuid(appliance_conf: &Path) -> String {
    let content = match std::fs::read_to_string(appliance_conf) {
        Ok(content) => content,
        Err(e) => {
            debug!(
                path = %appliance_conf.display(),
                error = %e,
                "Appliance configuration not readable, identity unknown"
            );
            return UNKNOWN_UUID.to_string();
        }
    };

    match UUID_LINE
        .captures(&content)
        .and_then(|c| c.get(1))
        .and_then(|m| Uuid::parse_str(m.as_str()).ok())
    {
        Some(uuid) => {
            let uuid = uuid.to_string();
            debug!(uuid = %uuid, "Auto-detected appliance system UUID");
            uuid
        }
        None => {
            debug!(
                path = %appliance_conf.display(),
                "No valid system.uuid entry found, identity unknown"
            );
            UNKNOWN_UUID.to_string()
        }
    }
}

/// Resolve the identity for this run: explicit `-u` wins, then
/// auto-detection; `None` means the caller must refuse to proceed.
pub fn resolve_system_uuid(explicit: Option<&str>, appliance_conf: &Path) -> Option<String> {
    if let Some(uuid) = explicit {
        return Some(uuid.to_string());
    }
    match detect_system_uuid(appliance_conf) {
        uuid if uuid == UNKNOWN_UUID => None,
        uuid => Some(uuid),
    }
}
