//! On-disk image of a [`MemoryAdapter`](super::MemoryAdapter) collection.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::core::{ModelError, Result, Row};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CollectionSnapshot {
    pub version: u32,
    pub collection: String,
    pub next_id: i64,
    /// Rows in insertion order.
    pub rows: Vec<Row>,
}

pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Writes the snapshot next to its destination and renames it into place.
    pub fn save(&self, snapshot: &CollectionSnapshot) -> Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)
            .map_err(|e| ModelError::IoError(format!("Failed to create snapshot directory: {}", e)))?;

        let serialized = rmp_serde::to_vec(snapshot)
            .map_err(|e| ModelError::IoError(format!("Failed to serialize snapshot: {}", e)))?;

        let mut temp = NamedTempFile::new_in(&parent)
            .map_err(|e| ModelError::IoError(format!("Failed to create temp file: {}", e)))?;
        temp.write_all(&serialized)
            .map_err(|e| ModelError::IoError(format!("Failed to write snapshot: {}", e)))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| ModelError::IoError(format!("Failed to sync snapshot: {}", e)))?;
        temp.persist(&self.path)
            .map_err(|e| ModelError::IoError(format!("Failed to move snapshot into place: {}", e)))?;
        Ok(())
    }

    pub fn load(&self) -> Result<Option<CollectionSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = fs::read(&self.path)
            .map_err(|e| ModelError::IoError(format!("Failed to read snapshot: {}", e)))?;
        let snapshot: CollectionSnapshot = rmp_serde::from_slice(&data)
            .map_err(|e| ModelError::IoError(format!("Failed to deserialize snapshot: {}", e)))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(ModelError::IoError(format!(
                "Unsupported snapshot version {} in {}",
                snapshot.version,
                self.path.display()
            )));
        }
        Ok(Some(snapshot))
    }
}
