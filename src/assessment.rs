//! Assessment file I/O.
//!
//! Reads are permissive: a missing, unreadable, or malformed file loads as an empty assessment.
//! Concurrent writers are last-writer-wins; nothing here locks the file.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use anyhow::Context;
use cyber_compliance_core::{FrameworkRegistry, StatusStore};

pub fn load_assessment(path: &Path) -> StatusStore {
    match fs::read(path) {
        Ok(bytes) => {
            let store = StatusStore::load(Some(bytes.as_slice()));
            if store.is_empty() && !bytes.is_empty() {
                tracing::debug!(path = %path.display(), "assessment has no usable frameworks");
            }
            store
        }
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "assessment file not found; starting empty");
            StatusStore::load(None)
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to read assessment; starting empty");
            StatusStore::load(None)
        }
    }
}

/// Writes the assessment as pretty JSON, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn save_assessment(path: &Path, store: &StatusStore) -> anyhow::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    let mut bytes = store.save().context("failed to serialize assessment")?;
    bytes.push(b'\n');
    fs::write(path, bytes)
        .with_context(|| format!("failed to write assessment at {}", path.display()))?;
    tracing::debug!(path = %path.display(), "assessment saved");
    Ok(())
}

/// Assessment with an empty status map for every registry framework.
pub fn starter_assessment(frameworks: &FrameworkRegistry) -> StatusStore {
    let mut store = StatusStore::default();
    for framework in frameworks.iter() {
        store.ensure_framework(framework);
    }
    store
}
