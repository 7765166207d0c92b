//! Save/load of single captured webhooks to disk.
//!
//! One event per file, pretty-printed JSON. Files are created with owner-only
//! permissions: captured bodies may carry credentials or PII from the
//! caller's own integrations.

use crate::{CaptureError, CapturedEvent, Result};
use std::path::Path;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Write one event to `path` as indented JSON, mode 0600.
pub async fn save(event: &CapturedEvent, path: &Path) -> Result<()> {
    let json = serde_json::to_vec_pretty(event).map_err(|e| CaptureError::PersistWrite {
        path: path.to_path_buf(),
        source: std::io::Error::other(e),
    })?;

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options
        .open(path)
        .await
        .map_err(|source| CaptureError::PersistWrite {
            path: path.to_path_buf(),
            source,
        })?;

    file.write_all(&json)
        .await
        .map_err(|source| CaptureError::PersistWrite {
            path: path.to_path_buf(),
            source,
        })?;
    file.flush()
        .await
        .map_err(|source| CaptureError::PersistWrite {
            path: path.to_path_buf(),
            source,
        })?;

    debug!(id = %event.id, path = ?path, "saved webhook");
    Ok(())
}

/// Read one event back from `path`.
///
/// A missing or unreadable file and a file that does not parse are distinct
/// failures (`PersistRead` vs `PersistMalformed`).
pub async fn load(path: &Path) -> Result<CapturedEvent> {
    let bytes = fs::read(path)
        .await
        .map_err(|source| CaptureError::PersistRead {
            path: path.to_path_buf(),
            source,
        })?;

    serde_json::from_slice(&bytes).map_err(|source| CaptureError::PersistMalformed {
        path: path.to_path_buf(),
        source,
    })
}
