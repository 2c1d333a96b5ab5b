//! CSV export and import of control statuses (`framework,control,status`).

use std::io;
use std::path::Path;

use anyhow::Context;
use cyber_compliance_core::{FrameworkRegistry, Status, StatusStore};
use serde::{Deserialize, Serialize};

const HEADER: [&str; 3] = ["framework", "control", "status"];

#[derive(Debug, Default, Serialize, Deserialize)]
struct CsvRow {
    #[serde(default)]
    framework: String,
    #[serde(default)]
    control: String,
    #[serde(default)]
    status: String,
}

/// Writes registry frameworks, in registry order, to `output`. Returns the number of rows.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn export_csv(
    store: &StatusStore,
    frameworks: &FrameworkRegistry,
    output: &Path,
) -> anyhow::Result<usize> {
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    let file = std::fs::File::create(output)
        .with_context(|| format!("failed to create CSV file at {}", output.display()))?;
    write_csv(store, frameworks, file)
}

pub fn write_csv<W: io::Write>(
    store: &StatusStore,
    frameworks: &FrameworkRegistry,
    writer: W,
) -> anyhow::Result<usize> {
    for framework in store.frameworks() {
        if !frameworks.contains(framework) {
            tracing::warn!(framework, "skipping unsupported framework in CSV export");
        }
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    writer
        .write_record(HEADER)
        .context("failed to write CSV header")?;

    let mut rows = 0usize;
    for framework in frameworks.iter() {
        let Some(statuses) = store.statuses(framework) else {
            continue;
        };
        for (control, status) in statuses {
            writer
                .serialize(CsvRow {
                    framework: framework.to_string(),
                    control: control.clone(),
                    status: status.to_string(),
                })
                .context("failed to write CSV row")?;
            rows += 1;
        }
    }
    writer.flush().context("failed to flush CSV output")?;
    Ok(rows)
}

/// Merges rows from `input` into `store`. Returns the number of rows applied.
///
/// # Errors
///
/// Returns an error if the file cannot be opened or a row cannot be parsed.
pub fn import_csv(store: &mut StatusStore, input: &Path) -> anyhow::Result<usize> {
    let file = std::fs::File::open(input)
        .with_context(|| format!("failed to open CSV file at {}", input.display()))?;
    read_csv(store, file).with_context(|| format!("failed to import {}", input.display()))
}

/// Rows without a framework or control are skipped; unrecognized statuses become `missing`.
pub fn read_csv<R: io::Read>(store: &mut StatusStore, reader: R) -> anyhow::Result<usize> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut applied = 0usize;
    for (index, row) in reader.deserialize::<CsvRow>().enumerate() {
        let row = row.with_context(|| format!("invalid CSV row {}", index + 1))?;
        if row.framework.is_empty() || row.control.is_empty() {
            tracing::debug!(row = index + 1, "skipping CSV row without framework or control");
            continue;
        }
        let status = Status::normalize(&row.status);
        store.set_status(&row.framework, &row.control, status);
        applied += 1;
    }
    Ok(applied)
}

#[cfg(test)]
#[path = "tests/csv_io.rs"]
mod tests;
