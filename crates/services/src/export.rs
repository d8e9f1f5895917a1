//! File export and import of whole snapshots.

use std::path::{Path, PathBuf};

use study_core::Clock;

use crate::error::ExportError;
use crate::study_store::StudyStore;

/// `Study_Tracker_YYYY-MM-DD.json` for the clock's current date.
#[must_use]
pub fn json_file_name(clock: &Clock) -> String {
    format!("Study_Tracker_{}.json", clock.date_stamp())
}

/// `Study_Tracker_YYYY-MM-DD.html` for the clock's current date.
#[must_use]
pub fn report_file_name(clock: &Clock) -> String {
    format!("Study_Tracker_{}.html", clock.date_stamp())
}

/// Writes the store's state as pretty JSON.
///
/// When `target` is a directory the dated default file name is used inside
/// it. Returns the path actually written.
///
/// # Errors
///
/// Returns `ExportError` if encoding or the file write fails.
pub async fn export_json_file(
    store: &StudyStore,
    target: &Path,
    clock: &Clock,
) -> Result<PathBuf, ExportError> {
    let json = store.export_json()?;
    let path = if tokio::fs::metadata(target)
        .await
        .is_ok_and(|meta| meta.is_dir())
    {
        target.join(json_file_name(clock))
    } else {
        target.to_path_buf()
    };
    write_atomic(&path, json.as_bytes()).await?;
    tracing::info!(path = %path.display(), "exported state");
    Ok(path)
}

/// Reads `path` and replaces the store's state with it.
///
/// # Errors
///
/// Returns `ExportError::Io` if the file cannot be read and
/// `ExportError::Import` if its contents are rejected. A rejected file leaves
/// the store untouched.
pub async fn import_file(store: &mut StudyStore, path: &Path) -> Result<(), ExportError> {
    let text = tokio::fs::read_to_string(path).await?;
    store.import_json(&text)?;
    tracing::info!(path = %path.display(), "imported state");
    Ok(())
}

/// Writes `bytes` next to `path` and renames over it, so readers never see
/// a half-written file.
///
/// # Errors
///
/// Returns the underlying I/O error; the temporary file is removed on failure.
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let file_name = path.file_name().map_or_else(
        || "export".to_owned(),
        |name| name.to_string_lossy().into_owned(),
    );
    let tmp = path.with_file_name(format!(".{file_name}.tmp"));

    if let Err(err) = tokio::fs::write(&tmp, bytes).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(err);
    }
    if let Err(err) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(err);
    }
    Ok(())
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
