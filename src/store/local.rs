use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing as log;

use super::{DynAsyncRead, ObjectMeta, ObjectStore, StoreKind, WalkVisitor};
use crate::error::{Result, VithError};

/// Store backed directly by a mounted local filesystem. `path()` resolves a
/// logical name to a real file with no staging required.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, name: &str) -> PathBuf {
        self.root.join(name.trim_start_matches('/'))
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    async fn stat(&self, name: &str) -> Result<Option<ObjectMeta>> {
        match tokio::fs::metadata(self.resolve(name)).await {
            Ok(meta) => Ok(Some(ObjectMeta {
                is_dir: meta.is_dir(),
                size: meta.len(),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn read(&self, name: &str) -> Result<Bytes> {
        let data = tokio::fs::read(self.resolve(name)).await?;
        Ok(Bytes::from(data))
    }

    async fn write(&self, name: &str, data: Bytes, size_hint: Option<u64>) -> Result<()> {
        if let Some(size) = size_hint {
            if size != data.len() as u64 {
                return Err(VithError::IoError(format!(
                    "write size mismatch for {name}: expected {size}, got {}",
                    data.len()
                )));
            }
        }
        let path = self.resolve(name);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(&path).await?;
        file.write_all(&data).await?;
        file.flush().await?;
        Ok(())
    }

    async fn write_stream(&self, name: &str, reader: &mut DynAsyncRead<'_>, size_hint: Option<u64>) -> Result<()> {
        let path = self.resolve(name);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::File::create(&path).await?;
        let copied = tokio::io::copy(reader, &mut file).await?;
        file.flush().await?;
        if let Some(size) = size_hint {
            if size != copied {
                let _ = tokio::fs::remove_file(&path).await;
                return Err(VithError::IoError(format!(
                    "write size mismatch for {name}: expected {size}, got {copied}"
                )));
            }
        }
        Ok(())
    }

    async fn mkdir(&self, name: &str) -> Result<()> {
        tokio::fs::create_dir_all(self.resolve(name)).await?;
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<()> {
        match tokio::fs::remove_file(self.resolve(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_all(&self, name: &str) -> Result<()> {
        let path = self.resolve(name);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(&path).await.or_else(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Ok(())
                } else {
                    Err(e)
                }
            })?,
            Ok(_) => tokio::fs::remove_file(&path).await.or_else(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    Ok(())
                } else {
                    Err(e)
                }
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    async fn rename(&self, src: &str, dst: &str) -> Result<()> {
        let dst_path = self.resolve(dst);
        if let Some(parent) = dst_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::rename(self.resolve(src), &dst_path).await?;
        Ok(())
    }

    async fn walk(&self, prefix: &str, visit: &mut WalkVisitor<'_>) -> Result<()> {
        let dir = self.resolve(prefix);
        let parent_dir = if dir.is_dir() { dir.clone() } else { dir.parent().unwrap_or(&self.root).to_path_buf() };
        let mut entries = match tokio::fs::read_dir(&parent_dir).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let rel = match pathdiff(&entry.path(), &self.root) {
                Some(r) => r,
                None => continue,
            };
            if let Err(e) = visit(&rel) {
                log::warn!(path = %rel, "walk visitor stopped traversal: {e}");
                return Err(e);
            }
        }
        Ok(())
    }

    fn path(&self, name: &str) -> Option<PathBuf> {
        Some(self.resolve(name))
    }

    fn enabled(&self) -> bool {
        true
    }

    fn kind(&self) -> StoreKind {
        StoreKind::Local
    }
}

fn pathdiff(path: &Path, root: &Path) -> Option<String> {
    path.strip_prefix(root).ok().map(|p| p.to_string_lossy().replace('\\', "/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        store.write("a/b.txt", Bytes::from_static(b"hi"), Some(2)).await.unwrap();
        let data = store.read("a/b.txt").await.unwrap();
        assert_eq!(&data[..], b"hi");
    }

    #[tokio::test]
    async fn write_stream_copies_reader_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let mut reader: &[u8] = b"streamed";
        store.write_stream("a/b.txt", &mut reader, Some(8)).await.unwrap();
        let data = store.read("a/b.txt").await.unwrap();
        assert_eq!(&data[..], b"streamed");
    }

    #[tokio::test]
    async fn write_rejects_size_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let err = store.write("a.txt", Bytes::from_static(b"hi"), Some(99)).await.unwrap_err();
        assert!(matches!(err, VithError::IoError(_)));
    }

    #[tokio::test]
    async fn stat_distinguishes_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        assert!(store.stat("missing").await.unwrap().is_none());
        store.write("present", Bytes::from_static(b"x"), None).await.unwrap();
        assert!(store.stat("present").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn walk_lists_entries_under_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        store.mkdir("v").await.unwrap();
        store.write("v/a.m3u8", Bytes::from_static(b"x"), None).await.unwrap();
        store.write("v/a0.ts", Bytes::from_static(b"y"), None).await.unwrap();

        let mut seen = Vec::new();
        store
            .walk("v", &mut |name| {
                seen.push(name.to_string());
                Ok(())
            })
            .await
            .unwrap();
        assert!(seen.iter().any(|n| n.ends_with("a0.ts")));
    }

    #[tokio::test]
    async fn remove_all_is_idempotent_on_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        store.remove_all("nope").await.unwrap();
    }
}
