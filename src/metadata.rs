//! Store identity and commit-stamp metadata, kept in one small JSON file
//! next to the store directory's payload. All file access goes through
//! [`DurableFile`]; updates write a sidecar and rename over the old file so
//! a torn write can never leave a half-written stamp behind.

use crate::durable::{DurableFile, FileMode};
use crate::error::ChatstoreError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;
use uuid::Uuid;

pub const METADATA_FILE: &str = "chatstore.meta.json";
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreMetadata {
    pub format_version: u32,
    pub instance_id: Uuid,
    pub last_commit_seq: u64,
}

impl StoreMetadata {
    pub fn fresh() -> Self {
        Self {
            format_version: FORMAT_VERSION,
            instance_id: Uuid::new_v4(),
            last_commit_seq: 0,
        }
    }
}

/// Reads the metadata stamp. A missing or undecodable file reads as `None`
/// (the store re-initializes); a stamp from a newer format is refused.
pub fn read(dir: &Path) -> Result<Option<StoreMetadata>, ChatstoreError> {
    let path = dir.join(METADATA_FILE);
    if !path.exists() {
        return Ok(None);
    }
    let mut file = DurableFile::open(&path, FileMode::Read)?;
    let Some(size) = file.size() else {
        return Err(ChatstoreError::Metadata {
            message: "metadata file size unavailable".into(),
        });
    };
    let bytes = file.read_exact(size as usize)?;
    let metadata: StoreMetadata = match serde_json::from_slice(&bytes) {
        Ok(metadata) => metadata,
        Err(err) => {
            warn!(error = %err, "discarding undecodable store metadata");
            return Ok(None);
        }
    };
    if metadata.format_version > FORMAT_VERSION {
        return Err(ChatstoreError::Metadata {
            message: format!(
                "store written by a newer format ({} > {FORMAT_VERSION})",
                metadata.format_version
            ),
        });
    }
    Ok(Some(metadata))
}

pub fn write(dir: &Path, metadata: &StoreMetadata, sync: bool) -> Result<(), ChatstoreError> {
    let tmp = dir.join(format!("{METADATA_FILE}.tmp"));
    {
        let mut file = DurableFile::open(&tmp, FileMode::ReadWrite)?;
        file.truncate(0)?;
        file.seek(0)?;
        let bytes = serde_json::to_vec_pretty(metadata)
            .map_err(|e| ChatstoreError::Encode(e.to_string()))?;
        file.write_all(&bytes)?;
        if sync {
            file.sync()?;
        }
    }
    std::fs::rename(&tmp, dir.join(METADATA_FILE))?;
    Ok(())
}
