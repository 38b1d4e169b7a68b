use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;

use crate::config::{ContentType, ThumbnailSize, UploadOptions};
use crate::host::PluginLogger;

/// Parameters sent along with every file to Imgbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImgboxRequest {
    pub auth_cookie: String,
    pub album_title: String,
    pub content_type: ContentType,
    pub comments_enabled: bool,
    pub thumbnail_size: ThumbnailSize,
}

impl From<&UploadOptions> for ImgboxRequest {
    fn from(options: &UploadOptions) -> Self {
        Self {
            auth_cookie: options.auth_cookie.clone().unwrap_or_default(),
            album_title: options.album_title.clone().unwrap_or_default(),
            content_type: options.content_type,
            comments_enabled: options.comments_enabled,
            thumbnail_size: options.thumbnail_size,
        }
    }
}

impl ImgboxRequest {
    /// JSON form with the cookie replaced by its length, safe for logs.
    pub fn redacted(&self) -> serde_json::Value {
        let mut value = serde_json::json!({
            "auth_cookie": format!("<{} chars>", self.auth_cookie.len()),
            "album_title": self.album_title,
            "content_type": self.content_type,
            "comments_enabled": self.comments_enabled,
            "thumbnail_size": self.thumbnail_size,
        });
        if self.auth_cookie.is_empty() {
            value["auth_cookie"] = serde_json::Value::String(String::new());
        }
        value
    }
}

/// Client that performs the actual upload of one local file.
///
/// Returns the service's response untouched; the caller decides what it
/// means. Retries, sessions and transport belong to the implementation.
#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(
        &self,
        file_path: &Path,
        request: &ImgboxRequest,
        logger: &dyn PluginLogger,
    ) -> anyhow::Result<serde_json::Value>;
}
