use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use opendal::{services::S3, Operator};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tracing as log;

use super::{DynAsyncRead, ObjectMeta, ObjectStore, StoreKind, WalkVisitor};
use crate::error::{Result, VithError};

/// S3-compatible backend built on OpenDAL. Every operation goes through a
/// cloned `Arc<Operator>` handle, mirroring the teacher's `OssStorage` which
/// owns the same cheap-to-clone connection pool.
#[derive(Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
    pub region: Option<String>,
    pub base_path: String,
}

pub struct S3Store {
    operator: Arc<Operator>,
    base_path: String,
}

impl S3Store {
    pub fn new(config: S3Config) -> anyhow::Result<Self> {
        log::info!(bucket = %config.bucket, endpoint = %config.endpoint, "initializing s3 store");

        let mut builder = S3::default()
            .endpoint(&config.endpoint)
            .access_key_id(&config.access_key_id)
            .secret_access_key(&config.secret_access_key)
            .bucket(&config.bucket);
        if let Some(region) = &config.region {
            builder = builder.region(region);
        }

        let operator = Operator::new(builder)?.finish();
        Ok(Self {
            operator: Arc::new(operator),
            base_path: config.base_path,
        })
    }

    fn object_key(&self, name: &str) -> String {
        let name = name.trim_start_matches('/');
        if self.base_path.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.base_path.trim_end_matches('/'), name)
        }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn stat(&self, name: &str) -> Result<Option<ObjectMeta>> {
        match self.operator.stat(&self.object_key(name)).await {
            Ok(meta) => Ok(Some(ObjectMeta {
                is_dir: meta.is_dir(),
                size: meta.content_length(),
            })),
            Err(e) if e.kind() == opendal::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn read(&self, name: &str) -> Result<Bytes> {
        let buf = self.operator.read(&self.object_key(name)).await?;
        Ok(Bytes::from(buf.to_vec()))
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
        self.operator.write(&self.object_key(name), data).await?;
        Ok(())
    }

    /// OpenDAL's write API takes a whole payload; the reader is drained into
    /// a buffer first, so the backpressure a caller relies on comes from
    /// this call not returning until the whole pipe has been read, not from
    /// an incremental upload.
    async fn write_stream(&self, name: &str, reader: &mut DynAsyncRead<'_>, size_hint: Option<u64>) -> Result<()> {
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        if let Some(size) = size_hint {
            if size != buf.len() as u64 {
                return Err(VithError::IoError(format!(
                    "write size mismatch for {name}: expected {size}, got {}",
                    buf.len()
                )));
            }
        }
        self.operator.write(&self.object_key(name), buf).await?;
        Ok(())
    }

    async fn mkdir(&self, _name: &str) -> Result<()> {
        // S3 has no real directories; object keys imply their own prefix.
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<()> {
        self.operator.delete(&self.object_key(name)).await?;
        Ok(())
    }

    async fn remove_all(&self, name: &str) -> Result<()> {
        let key = self.object_key(name);
        self.operator.remove_all(&key).await.or_else(|e| {
            if e.kind() == opendal::ErrorKind::NotFound {
                Ok(())
            } else {
                Err(e)
            }
        })?;
        Ok(())
    }

    async fn rename(&self, src: &str, dst: &str) -> Result<()> {
        self.operator.rename(&self.object_key(src), &self.object_key(dst)).await?;
        Ok(())
    }

    async fn walk(&self, prefix: &str, visit: &mut WalkVisitor<'_>) -> Result<()> {
        let key = self.object_key(prefix);
        let lister = self.operator.lister(&key).await?;
        let mut entries = lister;
        while let Some(entry) = entries.try_next().await? {
            let path = entry.path();
            let rel = path.strip_prefix(&self.base_path).unwrap_or(path);
            if let Err(e) = visit(rel) {
                log::warn!(path = %rel, "walk visitor stopped traversal: {e}");
                return Err(e);
            }
        }
        Ok(())
    }

    fn path(&self, _name: &str) -> Option<PathBuf> {
        None
    }

    fn enabled(&self) -> bool {
        true
    }

    fn kind(&self) -> StoreKind {
        StoreKind::Remote
    }
}
