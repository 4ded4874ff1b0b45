use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::{AppError, AppResult};
use crate::model::{RankedSnapshot, SnapshotRow};

use super::SnapshotStore;

/// Scratch file removed on drop unless it was promoted to the target.
struct ScratchFile {
    path: PathBuf,
    persisted: bool,
}

impl ScratchFile {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            persisted: false,
        }
    }

    /// Atomically moves the scratch file over the target.
    fn persist(mut self, target: &Path) -> std::io::Result<()> {
        fs::rename(&self.path, target)?;
        self.persisted = true;
        Ok(())
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if self.persisted {
            return;
        }
        if let Err(error) = fs::remove_file(&self.path) {
            if error.kind() != std::io::ErrorKind::NotFound {
                warn!(
                    "⚠️ Could not remove scratch file {}: {}",
                    self.path.display(),
                    error
                );
            }
        }
    }
}

/// Writes the snapshot as CSV next to the target path and renames it
/// into place, so readers only ever see a complete file.
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn scratch_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".temp");
        PathBuf::from(name)
    }

    fn write_snapshot(&self, snapshot: &RankedSnapshot) -> AppResult<()> {
        let scratch = ScratchFile::new(self.scratch_path());

        {
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_path(&scratch.path)?;
            writer.write_record(SnapshotRow::COLUMNS)?;
            for row in snapshot.rows() {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }

        scratch.persist(&self.path).map_err(|error| {
            AppError::Store(format!(
                "could not publish {}: {}",
                self.path.display(),
                error
            ))
        })
    }
}

#[async_trait]
impl SnapshotStore for CsvStore {
    fn name(&self) -> &'static str {
        "csv"
    }

    async fn publish(&self, snapshot: &RankedSnapshot) -> AppResult<()> {
        self.write_snapshot(snapshot)?;
        info!(
            "📄 Published {} rows to {}",
            snapshot.records.len(),
            self.path.display()
        );
        Ok(())
    }
}
