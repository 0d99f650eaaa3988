use std::sync::Arc;

use crate::config::AppConfig;
use crate::stage::LocalStage;
use crate::store::{LocalStore, ObjectStore, S3Config, S3Store, StoreKind};
use crate::tools::BufferPool;

/// Shared, cheap-to-clone handle wired through the derivation kernel, the
/// stream worker, and both front-ends.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ObjectStore>,
    pub stage: Arc<LocalStage>,
    pub pool: BufferPool,
    pub http_client: reqwest::Client,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: AppConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn ObjectStore> = match config.store.kind {
            crate::config::StoreKindConfig::Local => Arc::new(LocalStore::new(&config.store.local_root)),
            crate::config::StoreKindConfig::S3 => Arc::new(S3Store::new(S3Config {
                endpoint: config.store.s3_endpoint.clone(),
                access_key_id: config.store.s3_access_key_id.clone(),
                secret_access_key: config.store.s3_secret_access_key.clone(),
                bucket: config.store.s3_bucket.clone(),
                region: config.store.s3_region.clone(),
                base_path: config.store.s3_base_path.clone(),
            })?),
        };

        let stage = Arc::new(LocalStage::new(&config.server.tmp_folder));
        let pool = BufferPool::new();
        let http_client = reqwest::Client::new();

        Ok(Self {
            store,
            stage,
            pool,
            http_client,
            config: Arc::new(config),
        })
    }

    pub fn store_enabled(&self) -> bool {
        self.config.store.enabled && self.store.enabled()
    }

    pub fn store_kind(&self) -> StoreKind {
        self.store.kind()
    }
}
