//! Atomic temp-file-then-rename writes, grounded on
//! `agcodex-persistence::storage::SessionStorage`'s checkpoint write path.

use std::path::Path;

use tokio::fs;

use crate::StorageError;

pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let parent = path.parent().expect("layout paths always have a parent");
    fs::create_dir_all(parent).await.map_err(|e| StorageError::io(parent.display().to_string(), e))?;

    let tmp = parent.join(format!(".{}.tmp-{}", file_name(path), uuid::Uuid::new_v4()));
    fs::write(&tmp, bytes).await.map_err(|e| StorageError::io(tmp.display().to_string(), e))?;
    fs::rename(&tmp, path).await.map_err(|e| StorageError::io(path.display().to_string(), e))?;
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}
