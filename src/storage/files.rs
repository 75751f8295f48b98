//! 上传文件的磁盘存储
//!
//! 文件名为 `<id><ext>`，全部放在配置的上传目录下

use std::io;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{debug, error, warn};

use crate::errors::{Result, StashError};

/// 删除文件的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    /// 文件本来就不存在
    Missing,
}

#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 确保上传目录存在
    pub async fn ensure_root(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|e| {
            StashError::internal(format!(
                "无法创建上传目录 {}: {}",
                self.root.display(),
                e
            ))
        })
    }

    pub fn path_for(&self, id: &str, extension: &str) -> PathBuf {
        self.root.join(format!("{}{}", id, extension))
    }

    /// 写入新文件，目标已存在时失败；写入中途出错会删除残留文件
    pub async fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
            .map_err(|e| {
                error!(path = %path.display(), "Failed to create file: {}", e);
                StashError::internal("failed to save file")
            })?;

        let written = async {
            file.write_all(bytes).await?;
            file.flush().await?;
            file.sync_all().await
        }
        .await;

        if let Err(e) = written {
            error!(path = %path.display(), "Failed to write file: {}", e);
            drop(file);
            if let Err(cleanup_err) = self.remove(path).await {
                warn!(path = %path.display(), "Failed to remove partial file: {}", cleanup_err);
            }
            return Err(StashError::internal("failed to save file"));
        }

        debug!(path = %path.display(), size = bytes.len(), "File written");
        Ok(())
    }

    /// 删除文件；不存在不算错误
    pub async fn remove(&self, path: &Path) -> io::Result<RemoveOutcome> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(RemoveOutcome::Removed),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(RemoveOutcome::Missing),
            Err(e) => Err(e),
        }
    }

    pub async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_and_remove() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path().join("uploads"));
        storage.ensure_root().await.unwrap();

        let path = storage.path_for("abcd1234", ".txt");
        assert!(path.ends_with("abcd1234.txt"));

        storage.write(&path, b"hello").await.unwrap();
        assert!(storage.exists(&path).await);
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"hello");

        assert_eq!(storage.remove(&path).await.unwrap(), RemoveOutcome::Removed);
        assert_eq!(storage.remove(&path).await.unwrap(), RemoveOutcome::Missing);
        assert!(!storage.exists(&path).await);
    }

    #[tokio::test]
    async fn test_write_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::new(dir.path());
        let path = storage.path_for("dup00001", "");

        storage.write(&path, b"first").await.unwrap();
        assert!(storage.write(&path, b"second").await.is_err());
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"first");
    }
}
