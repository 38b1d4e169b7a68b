//! Registration of uploaders with the host upload manager.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::{config_schema, ConfigItem};
use crate::errors::{AppError, AppResult};
use crate::host::HostContext;
use crate::models::ImageRecord;
use crate::uploader::{ImageHost, TempFileStore, UploadOrchestrator};

/// Identifier the host uses to select this uploader.
pub const UPLOADER_ID: &str = "imgbox";
pub const UPLOADER_NAME: &str = "Imgbox";

/// An upload handler the host can dispatch image batches to.
#[async_trait]
pub trait Uploader: Send + Sync {
    fn id(&self) -> &str;

    /// Human-readable name shown in the host UI.
    fn name(&self) -> &str;

    fn config_schema(&self) -> Vec<ConfigItem>;

    /// Upload `images`, filling in their URLs.
    async fn handle(&self, ctx: &HostContext, images: &mut [ImageRecord]) -> AppResult<()>;
}

/// Summary of a registered uploader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploaderInfo {
    pub id: String,
    pub name: String,
}

/// Registry of uploaders keyed by id.
#[derive(Clone, Default)]
pub struct UploaderRegistry {
    uploaders: Arc<RwLock<HashMap<String, Arc<dyn Uploader>>>>,
}

impl UploaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an uploader, replacing any previous one with the same id.
    pub async fn register(&self, uploader: Arc<dyn Uploader>) {
        let id = uploader.id().to_string();
        let mut uploaders = self.uploaders.write().await;
        if uploaders.insert(id.clone(), uploader).is_some() {
            log::warn!("Replaced previously registered uploader '{}'", id);
        } else {
            log::info!("Registered uploader '{}'", id);
        }
    }

    pub async fn get(&self, id: &str) -> AppResult<Arc<dyn Uploader>> {
        let uploaders = self.uploaders.read().await;
        uploaders
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::UploaderNotFound { id: id.to_string() })
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.uploaders.read().await.contains_key(id)
    }

    pub async fn list(&self) -> Vec<UploaderInfo> {
        let uploaders = self.uploaders.read().await;
        let mut infos: Vec<UploaderInfo> = uploaders
            .values()
            .map(|uploader| UploaderInfo {
                id: uploader.id().to_string(),
                name: uploader.name().to_string(),
            })
            .collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }
}

/// The Imgbox uploader.
pub struct ImgboxPlugin {
    host: Arc<dyn ImageHost>,
    temp_files: TempFileStore,
}

impl ImgboxPlugin {
    pub fn new(host: Arc<dyn ImageHost>) -> Self {
        Self {
            host,
            temp_files: TempFileStore::system(),
        }
    }

    pub fn with_temp_store(mut self, temp_files: TempFileStore) -> Self {
        self.temp_files = temp_files;
        self
    }
}

#[async_trait]
impl Uploader for ImgboxPlugin {
    fn id(&self) -> &str {
        UPLOADER_ID
    }

    fn name(&self) -> &str {
        UPLOADER_NAME
    }

    fn config_schema(&self) -> Vec<ConfigItem> {
        config_schema()
    }

    async fn handle(&self, ctx: &HostContext, images: &mut [ImageRecord]) -> AppResult<()> {
        UploadOrchestrator::new(ctx.clone(), Arc::clone(&self.host))
            .with_temp_store(self.temp_files.clone())
            .handle(images)
            .await
    }
}

/// Register the Imgbox uploader backed by `host`.
pub async fn register(registry: &UploaderRegistry, host: Arc<dyn ImageHost>) {
    registry.register(Arc::new(ImgboxPlugin::new(host))).await;
}
