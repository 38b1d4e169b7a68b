//! Imgbox uploader for host image-upload managers.
//!
//! Images handed over by the host are staged as temporary files, sent to
//! Imgbox through an [`uploader::ImageHost`] client, and get their public URL
//! written back. Staged files are always removed before the batch returns.

pub mod config;
pub mod errors;
pub mod host;
pub mod models;
pub mod plugin;
pub mod uploader;

pub use config::{ContentType, ThumbnailSize, UploadOptions};
pub use errors::{AppError, AppResult};
pub use host::{ConfigReader, HostContext, LogFacade, Notification, Notifier, PluginLogger};
pub use models::ImageRecord;
pub use plugin::{register, ImgboxPlugin, Uploader, UploaderRegistry, UPLOADER_ID};
pub use uploader::{ImageHost, ImgboxRequest, TempFileStore, UploadOrchestrator, UploadOutcome};
