use std::path::Path;
use std::time::{Duration, SystemTime};

use serde::de::DeserializeOwned;
use tokio::fs;

use crate::errors::ManifestError;

// Read a JSON manifest (gallery list, carousel items) from disk.
pub async fn read_manifest<T: DeserializeOwned>(path: &Path) -> Result<T, ManifestError> {
    let data = fs::read(path).await.map_err(|source| ManifestError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&data).map_err(|source| ManifestError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Modification time and size of a file, as seen by `fs::metadata`.
///
/// A missing file stamps as `FileStamp::default()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileStamp {
    pub modified: Option<SystemTime>,
    pub len: u64,
}

// Filesystems keep mtime at a coarse granularity (whole seconds on some), so
// a write landing this close to a read can leave the stamp unchanged.
const RACY_WINDOW: Duration = Duration::from_secs(2);

impl FileStamp {
    /// Whether the file was last modified well before `read_at`, so that any
    /// later write is guaranteed to move the stamp.
    pub fn settled_before(&self, read_at: SystemTime) -> bool {
        self.modified.is_none_or(|m| m + RACY_WINDOW <= read_at)
    }
}

pub async fn file_stamp(path: &Path) -> FileStamp {
    match fs::metadata(path).await {
        Ok(md) => FileStamp {
            modified: md.modified().ok(),
            len: md.len(),
        },
        Err(_) => FileStamp::default(),
    }
}
