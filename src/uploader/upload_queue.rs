use futures::stream::{FuturesUnordered, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{self, UploadOptions};
use crate::errors::{AppError, AppResult};
use crate::host::{safe_emit_notification, HostContext, Notification};
use crate::models::ImageRecord;

use super::imgbox_client::{ImageHost, ImgboxRequest};
use super::response::{is_empty_listing, parse_upload_response, UploadOutcome};
use super::temp_files::TempFileStore;

pub const NOTIFICATION_EVENT: &str = "notification";
pub const FAILURE_TITLE: &str = "Imgbox upload failed";
const FAILURE_HINT: &str = "Check the uploader log for more details";

/// Result of one image's upload task.
struct ImageTaskOutcome {
    temp_file: Option<PathBuf>,
    result: AppResult<()>,
}

impl ImageTaskOutcome {
    fn failed(temp_file: Option<PathBuf>, error: AppError) -> Self {
        Self {
            temp_file,
            result: Err(error),
        }
    }
}

/// Uploads a batch of images through an [`ImageHost`].
pub struct UploadOrchestrator {
    ctx: HostContext,
    host: Arc<dyn ImageHost>,
    temp_files: TempFileStore,
}

impl UploadOrchestrator {
    pub fn new(ctx: HostContext, host: Arc<dyn ImageHost>) -> Self {
        Self {
            ctx,
            host,
            temp_files: TempFileStore::system(),
        }
    }

    pub fn with_temp_store(mut self, temp_files: TempFileStore) -> Self {
        self.temp_files = temp_files;
        self
    }

    /// Host entry point: read the stored options, then upload the batch.
    pub async fn handle(&self, images: &mut [ImageRecord]) -> AppResult<()> {
        let options = match config::load_options(self.ctx.config.as_ref(), self.ctx.logger.as_ref())
        {
            Ok(options) => options,
            Err(e) => {
                self.report_failure(&e);
                return Err(e);
            }
        };

        self.upload_batch(images, &options).await
    }

    /// Upload every image concurrently and write the resulting URLs back.
    ///
    /// All tasks settle before staged files are removed. Only the first
    /// failure to occur is returned; later ones are logged.
    pub async fn upload_batch(
        &self,
        images: &mut [ImageRecord],
        options: &UploadOptions,
    ) -> AppResult<()> {
        let logger = self.ctx.logger.as_ref();
        self.log_options(options);

        let request = ImgboxRequest::from(options);
        logger.info(&format!("Uploading {} image(s) to Imgbox", images.len()));

        let mut tasks: FuturesUnordered<_> = images
            .iter_mut()
            .map(|image| self.upload_image(image, &request))
            .collect();

        let mut staged = Vec::new();
        let mut first_error = None;
        while let Some(outcome) = tasks.next().await {
            staged.extend(outcome.temp_file);
            if let Err(e) = outcome.result {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
        drop(tasks);

        let result = match first_error {
            None => {
                logger.info("All images uploaded successfully");
                Ok(())
            }
            Some(e) => {
                self.report_failure(&e);
                Err(e)
            }
        };

        self.temp_files.cleanup(&staged, logger).await;
        result
    }

    async fn upload_image(
        &self,
        image: &mut ImageRecord,
        request: &ImgboxRequest,
    ) -> ImageTaskOutcome {
        let logger = self.ctx.logger.as_ref();
        let name = image.display_name().to_string();

        let content = match image.content() {
            Ok(content) => content,
            Err(e) => {
                logger.error(&format!("Image data is unusable for {}: {}", name, e));
                return ImageTaskOutcome::failed(None, e);
            }
        };

        let temp_path = self.temp_files.path_for(image.file_name.as_deref());
        if let Err(e) = self.temp_files.write(&temp_path, &content).await {
            logger.error(&format!(
                "Failed to write temporary file {}: {}",
                temp_path.display(),
                e
            ));
            // A partial write still leaves a file behind.
            let created = tokio::fs::try_exists(&temp_path).await.unwrap_or(false);
            return ImageTaskOutcome::failed(created.then_some(temp_path), e);
        }
        drop(content);
        logger.info(&format!("Saved temporary file: {}", temp_path.display()));

        let result = self.send(image, &name, &temp_path, request).await;
        ImageTaskOutcome {
            temp_file: Some(temp_path),
            result,
        }
    }

    async fn send(
        &self,
        image: &mut ImageRecord,
        name: &str,
        temp_path: &std::path::Path,
        request: &ImgboxRequest,
    ) -> AppResult<()> {
        let logger = self.ctx.logger.as_ref();
        logger.info(&format!("Uploading image {} to Imgbox...", name));

        let response = self
            .host
            .upload(temp_path, request, logger)
            .await
            .map_err(|e| {
                logger.error(&format!(
                    "Upload client returned an error for {}: {:#}",
                    name, e
                ));
                AppError::upload_capability(name, &e)
            })?;

        if is_empty_listing(&response) {
            logger.warn(&format!("Unexpected empty data array for {}", name));
        }
        logger.debug(&format!(
            "Raw Imgbox response for {}: {}",
            name,
            serde_json::to_string_pretty(&response).unwrap_or_else(|_| response.to_string())
        ));

        match parse_upload_response(&response) {
            UploadOutcome::Success(url) => {
                logger.info(&format!(
                    "Image {} uploaded successfully. URL: {}",
                    name, url
                ));
                image.img_url = Some(url);
                Ok(())
            }
            UploadOutcome::ApiError(message) => {
                let err = AppError::upload_response(name, &message);
                logger.error(&err.to_string());
                Err(err)
            }
            UploadOutcome::Malformed(raw) => {
                let err = AppError::malformed_response(name, &raw);
                logger.error(&err.to_string());
                Err(err)
            }
        }
    }

    fn log_options(&self, options: &UploadOptions) {
        let logger = self.ctx.logger.as_ref();

        match options.auth_cookie.as_deref() {
            Some(cookie) => logger.info(&format!(
                "Auth cookie is set (length: {})",
                cookie.len()
            )),
            None => logger.warn(
                "Auth cookie is not set. Uploads may fail or be unreliable for private albums.",
            ),
        }

        match options.album_title.as_deref() {
            Some(title) => logger.info(&format!("Using album with title: {}", title)),
            None => logger.info("No album title provided. Uploading without a named album."),
        }

        logger.debug(&format!(
            "Upload parameters: {}",
            ImgboxRequest::from(options).redacted()
        ));
    }

    fn report_failure(&self, error: &AppError) {
        let logger = self.ctx.logger.as_ref();
        logger.error(&format!("Upload process failed: {}", error));

        let notification = Notification {
            title: FAILURE_TITLE.to_string(),
            body: error.user_message(),
            text: FAILURE_HINT.to_string(),
        };
        safe_emit_notification(
            self.ctx.notifier.as_ref(),
            logger,
            NOTIFICATION_EVENT,
            &notification,
        );
    }
}
