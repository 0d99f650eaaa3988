//! Object-Store Port.
//!
//! Abstracts over a content-addressed blob space with two concrete flavors:
//! a mounted local filesystem (`path()` resolves directly to a usable local
//! file) and a remote S3-compatible store built on `opendal` (content must be
//! staged through a temporary local directory). Modeled as a trait object
//! rather than an enum so the stage resolver branches on `kind()` instead of
//! runtime type identity, matching the teacher's `Arc<dyn HlsStorage>` split
//! between `FileStorage` and `OssStorage`.

pub mod local;
pub mod s3;

use async_trait::async_trait;
use bytes::Bytes;
use std::path::PathBuf;
use tokio::io::AsyncRead;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Local,
    Remote,
}

/// Callback invoked once per entry during a `walk`. Returning `Err` stops the
/// traversal and propagates.
pub type WalkVisitor<'a> = dyn FnMut(&str) -> Result<()> + Send + 'a;

/// Reader half of an in-memory pipe (or any other streaming source), taken
/// as a trait object so `write_stream` stays object-safe on `dyn ObjectStore`.
pub type DynAsyncRead<'a> = dyn AsyncRead + Send + Unpin + 'a;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn stat(&self, name: &str) -> Result<Option<ObjectMeta>>;
    async fn read(&self, name: &str) -> Result<Bytes>;
    async fn write(&self, name: &str, data: Bytes, size_hint: Option<u64>) -> Result<()>;

    /// Streaming form of `write`: consumes `reader` incrementally instead of
    /// requiring the whole payload buffered up front, so a producer feeding
    /// the other end of a pipe is backpressured by this call's own pace.
    async fn write_stream(&self, name: &str, reader: &mut DynAsyncRead<'_>, size_hint: Option<u64>) -> Result<()>;

    async fn mkdir(&self, name: &str) -> Result<()>;
    async fn remove(&self, name: &str) -> Result<()>;
    async fn remove_all(&self, name: &str) -> Result<()>;
    async fn rename(&self, src: &str, dst: &str) -> Result<()>;
    async fn walk(&self, prefix: &str, visit: &mut WalkVisitor<'_>) -> Result<()>;

    /// Returns a usable local path only when `kind() == Local`.
    fn path(&self, name: &str) -> Option<PathBuf>;

    fn enabled(&self) -> bool;
    fn kind(&self) -> StoreKind;
}

#[derive(Debug, Clone, Copy)]
pub struct ObjectMeta {
    pub is_dir: bool,
    pub size: u64,
}

pub use local::LocalStore;
pub use s3::{S3Config, S3Store};
