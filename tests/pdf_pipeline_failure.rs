//! S3 — PDF pipeline with writer failure: the image service succeeds but the
//! store write fails; the overall error must chain both contexts and leave
//! no partial output behind.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vith::config::AppConfig;
use vith::derive::derive_thumbnail;
use vith::model::{ItemType, Request, Source};
use vith::store::{DynAsyncRead, LocalStore, ObjectMeta, ObjectStore, StoreKind, WalkVisitor};
use vith::{AppState, VithError};

/// Wraps a `LocalStore` but fails every `write`, simulating a store-side
/// IO error partway through the PDF producer/consumer pipeline.
struct FailingWriteStore {
    inner: LocalStore,
}

#[async_trait]
impl ObjectStore for FailingWriteStore {
    async fn stat(&self, name: &str) -> vith::Result<Option<ObjectMeta>> {
        self.inner.stat(name).await
    }

    async fn read(&self, name: &str) -> vith::Result<Bytes> {
        self.inner.read(name).await
    }

    async fn write(&self, _name: &str, _data: Bytes, _size_hint: Option<u64>) -> vith::Result<()> {
        Err(VithError::IoError("simulated disk full".into()))
    }

    async fn write_stream(&self, _name: &str, _reader: &mut DynAsyncRead<'_>, _size_hint: Option<u64>) -> vith::Result<()> {
        Err(VithError::IoError("simulated disk full".into()))
    }

    async fn mkdir(&self, name: &str) -> vith::Result<()> {
        self.inner.mkdir(name).await
    }

    async fn remove(&self, name: &str) -> vith::Result<()> {
        self.inner.remove(name).await
    }

    async fn remove_all(&self, name: &str) -> vith::Result<()> {
        self.inner.remove_all(name).await
    }

    async fn rename(&self, src: &str, dst: &str) -> vith::Result<()> {
        self.inner.rename(src, dst).await
    }

    async fn walk(&self, prefix: &str, visit: &mut WalkVisitor<'_>) -> vith::Result<()> {
        self.inner.walk(prefix, visit).await
    }

    fn path(&self, name: &str) -> Option<std::path::PathBuf> {
        self.inner.path(name)
    }

    fn enabled(&self) -> bool {
        self.inner.enabled()
    }

    fn kind(&self) -> StoreKind {
        self.inner.kind()
    }
}

#[tokio::test]
async fn pdf_thumbnail_chains_write_failure_and_leaves_no_partial_output() {
    let dir = tempfile::tempdir().unwrap();
    let image_service = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/crop"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 10 * 1024]))
        .mount(&image_service)
        .await;

    let mut config = AppConfig::default();
    config.store.local_root = dir.path().to_string_lossy().to_string();
    config.server.tmp_folder = dir.path().join("tmp").to_string_lossy().to_string();
    config.image_service.url = image_service.uri();
    let mut state = AppState::new(config).unwrap();

    // Seed a real 2 MiB pdf input through the underlying local store, then
    // swap the state's store handle for the failing wrapper.
    let inner = LocalStore::new(dir.path());
    inner.write("doc.pdf", Bytes::from(vec![0u8; 2 * 1024 * 1024]), None).await.unwrap();
    state.store = Arc::new(FailingWriteStore { inner: LocalStore::new(dir.path()) });

    let req = Request {
        input: "doc.pdf".into(),
        output: "out/doc.webp".into(),
        item_type: ItemType::Pdf,
        scale: 150,
    };
    let cancel = CancellationToken::new();
    let err = derive_thumbnail(&state, Source::Amqp, &req, &cancel).await.unwrap_err();

    match err {
        VithError::IoError(msg) => assert!(msg.contains("write pdf thumbnail")),
        other => panic!("expected IoError, got {other:?}"),
    }

    assert!(!dir.path().join("out/doc.webp").exists());
}
