use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use imgbox_uploader::{
    errors::AppError, ContentType, HostContext, ImageHost, ImageRecord, ImgboxPlugin,
    ImgboxRequest, Notification, Notifier, PluginLogger, TempFileStore, ThumbnailSize,
    UploadOptions, UploadOrchestrator, Uploader, UploaderRegistry,
};

// Integration tests for the Imgbox uploader
// These run whole batches against a scripted image host

#[derive(Debug, Clone)]
struct RecordedCall {
    path: PathBuf,
    bytes: Option<Vec<u8>>,
    request: ImgboxRequest,
}

type Responder = dyn Fn(&Path) -> anyhow::Result<Value> + Send + Sync;

struct ScriptedHost {
    respond: Box<Responder>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedHost {
    fn new(respond: impl Fn(&Path) -> anyhow::Result<Value> + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            respond: Box::new(respond),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageHost for ScriptedHost {
    async fn upload(
        &self,
        file_path: &Path,
        request: &ImgboxRequest,
        logger: &dyn PluginLogger,
    ) -> anyhow::Result<Value> {
        logger.debug(&format!("scripted upload of {}", file_path.display()));
        // Yield so the other images of the batch get polled in between.
        tokio::task::yield_now().await;

        self.calls.lock().unwrap().push(RecordedCall {
            path: file_path.to_path_buf(),
            bytes: std::fs::read(file_path).ok(),
            request: request.clone(),
        });
        (self.respond)(file_path)
    }
}

#[derive(Default)]
struct CapturingLogger {
    lines: Mutex<Vec<(log::Level, String)>>,
}

impl CapturingLogger {
    fn contains(&self, level: log::Level, needle: &str) -> bool {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .any(|(l, line)| *l == level && line.contains(needle))
    }
}

impl PluginLogger for CapturingLogger {
    fn log(&self, level: log::Level, message: &str) {
        log::log!(level, "{}", message);
        self.lines.lock().unwrap().push((level, message.to_string()));
    }
}

#[derive(Default)]
struct CapturingNotifier {
    events: Mutex<Vec<(String, Notification)>>,
}

impl Notifier for CapturingNotifier {
    fn emit(&self, event: &str, notification: &Notification) -> anyhow::Result<()> {
        self.events
            .lock()
            .unwrap()
            .push((event.to_string(), notification.clone()));
        Ok(())
    }
}

struct Harness {
    dir: TempDir,
    logger: Arc<CapturingLogger>,
    notifier: Arc<CapturingNotifier>,
    ctx: HostContext,
}

impl Harness {
    fn new(config: Value) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let logger = Arc::new(CapturingLogger::default());
        let notifier = Arc::new(CapturingNotifier::default());
        let ctx = HostContext::new(Arc::new(config), logger.clone(), notifier.clone());

        Self {
            dir: tempfile::tempdir().unwrap(),
            logger,
            notifier,
            ctx,
        }
    }

    fn orchestrator(&self, host: Arc<ScriptedHost>) -> UploadOrchestrator {
        UploadOrchestrator::new(self.ctx.clone(), host)
            .with_temp_store(TempFileStore::in_dir(self.dir.path()))
    }

    fn remaining_files(&self) -> usize {
        std::fs::read_dir(self.dir.path()).unwrap().count()
    }

    fn notifications(&self) -> Vec<(String, Notification)> {
        self.notifier.events.lock().unwrap().clone()
    }
}

fn success_for(path: &Path) -> anyhow::Result<Value> {
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    Ok(json!({ "data": [{ "original_url": format!("https://host/{}", name) }] }))
}

#[tokio::test]
async fn test_batch_success_populates_urls_and_cleans_up() {
    let harness = Harness::new(json!({}));
    let host = ScriptedHost::new(success_for);
    let orchestrator = harness.orchestrator(host.clone());

    let mut images = vec![
        ImageRecord::from_bytes("first.png", vec![1, 2, 3]),
        ImageRecord::from_bytes("second.jpg", vec![4, 5]),
    ];

    orchestrator
        .upload_batch(&mut images, &UploadOptions::default())
        .await
        .unwrap();

    let calls = host.calls();
    assert_eq!(calls.len(), 2);
    for (image, expected_bytes) in images.iter().zip([vec![1, 2, 3], vec![4, 5]]) {
        let url = image.img_url.as_deref().expect("url should be set");
        let call = calls
            .iter()
            .find(|c| url.ends_with(&*c.path.file_name().unwrap().to_string_lossy()))
            .expect("url should come from the uploaded temp file");
        assert_eq!(call.bytes.as_deref(), Some(expected_bytes.as_slice()));
    }
    assert!(images[0].img_url.as_deref().unwrap().starts_with("https://host/first-"));
    assert!(images[1].img_url.as_deref().unwrap().ends_with(".jpg"));

    assert_eq!(harness.remaining_files(), 0);
    assert!(harness.notifications().is_empty());
}

#[tokio::test]
async fn test_fixed_success_response_for_each_image() {
    let harness = Harness::new(json!({}));
    let host = ScriptedHost::new(|_| Ok(json!({ "data": [{ "original_url": "https://host/x.png" }] })));
    let orchestrator = harness.orchestrator(host.clone());

    let mut images = vec![
        ImageRecord::from_bytes("a.png", vec![1]),
        ImageRecord::from_bytes("b.png", vec![2]),
    ];

    orchestrator
        .upload_batch(&mut images, &UploadOptions::default())
        .await
        .unwrap();

    assert!(images
        .iter()
        .all(|image| image.img_url.as_deref() == Some("https://host/x.png")));
    assert_eq!(harness.remaining_files(), 0);
}

#[tokio::test]
async fn test_api_error_fails_batch_and_notifies() {
    let harness = Harness::new(json!({}));
    let host = ScriptedHost::new(|_| Ok(json!({ "data": [{ "error": "invalid cookie" }] })));
    let orchestrator = harness.orchestrator(host.clone());

    let mut images = vec![ImageRecord::from_bytes("a.png", vec![9, 9])];
    let result = orchestrator
        .upload_batch(&mut images, &UploadOptions::default())
        .await;

    match result {
        Err(AppError::UploadResponseError { message, .. }) => assert_eq!(message, "invalid cookie"),
        other => panic!("expected UploadResponseError, got {:?}", other),
    }
    assert_eq!(images[0].img_url, None);

    let notifications = harness.notifications();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].0, "notification");
    assert_eq!(notifications[0].1.title, "Imgbox upload failed");
    assert!(notifications[0].1.body.contains("invalid cookie"));

    assert_eq!(host.calls().len(), 1);
    assert_eq!(harness.remaining_files(), 0);
}

#[tokio::test]
async fn test_empty_listing_is_malformed() {
    let harness = Harness::new(json!({}));
    let host = ScriptedHost::new(|_| Ok(json!({ "data": [] })));
    let orchestrator = harness.orchestrator(host);

    let mut images = vec![ImageRecord::from_bytes("a.png", vec![1])];
    let result = orchestrator
        .upload_batch(&mut images, &UploadOptions::default())
        .await;

    assert!(matches!(result, Err(AppError::UploadResponseMalformed { .. })));
    assert_eq!(harness.remaining_files(), 0);
    assert!(harness.logger.contains(log::Level::Warn, "empty data array"));

    let notifications = harness.notifications();
    assert_eq!(notifications.len(), 1);
    assert!(!notifications[0].1.body.contains("\"data\""));
}

#[tokio::test]
async fn test_default_options_reach_the_host() {
    let harness = Harness::new(json!({}));
    let host = ScriptedHost::new(success_for);
    let orchestrator = harness.orchestrator(host.clone());

    let mut images = vec![ImageRecord::from_bytes("a.png", vec![1])];
    orchestrator.handle(&mut images).await.unwrap();

    let request = &host.calls()[0].request;
    assert_eq!(request.content_type, ContentType::Safe);
    assert!(request.comments_enabled);
    assert_eq!(request.thumbnail_size, ThumbnailSize::Cropped350);
    assert_eq!(request.auth_cookie, "");
    assert_eq!(request.album_title, "");

    assert!(harness.logger.contains(log::Level::Warn, "Auth cookie is not set"));
}

#[tokio::test]
async fn test_stored_options_reach_the_host() {
    let harness = Harness::new(json!({
        "picgo-plugin-imgbox": {
            "authCookie": "session=abc123",
            "albumTitle": "Screenshots",
            "contentType": "private",
            "commentsEnabled": false,
            "thumbnailSize": "150r"
        }
    }));
    let host = ScriptedHost::new(success_for);
    let orchestrator = harness.orchestrator(host.clone());

    let mut images = vec![ImageRecord::from_bytes("a.png", vec![1])];
    orchestrator.handle(&mut images).await.unwrap();

    let request = &host.calls()[0].request;
    assert_eq!(request.auth_cookie, "session=abc123");
    assert_eq!(request.album_title, "Screenshots");
    assert_eq!(request.content_type, ContentType::Private);
    assert!(!request.comments_enabled);
    assert_eq!(request.thumbnail_size, ThumbnailSize::Rounded150);

    // The cookie itself never reaches the log.
    let lines = harness.logger.lines.lock().unwrap();
    assert!(lines.iter().all(|(_, line)| !line.contains("abc123")));
}

#[tokio::test]
async fn test_invalid_stored_option_fails_before_upload() {
    let harness = Harness::new(json!({
        "picgo-plugin-imgbox": { "thumbnailSize": "9000x" }
    }));
    let host = ScriptedHost::new(success_for);
    let orchestrator = harness.orchestrator(host.clone());

    let mut images = vec![ImageRecord::from_bytes("a.png", vec![1])];
    let result = orchestrator.handle(&mut images).await;

    assert!(matches!(result, Err(AppError::Validation { .. })));
    assert!(host.calls().is_empty());
    assert_eq!(harness.notifications().len(), 1);
    assert_eq!(harness.remaining_files(), 0);
}

#[tokio::test]
async fn test_missing_image_data_never_creates_temp_file() {
    let harness = Harness::new(json!({}));
    let host = ScriptedHost::new(success_for);
    let orchestrator = harness.orchestrator(host.clone());

    let mut images = vec![ImageRecord {
        file_name: Some("ghost.png".to_string()),
        ..ImageRecord::default()
    }];
    let result = orchestrator
        .upload_batch(&mut images, &UploadOptions::default())
        .await;

    match result {
        Err(AppError::MissingImageData { file_name }) => assert_eq!(file_name, "ghost.png"),
        other => panic!("expected MissingImageData, got {:?}", other),
    }
    assert!(host.calls().is_empty());
    assert_eq!(harness.remaining_files(), 0);
}

#[tokio::test]
async fn test_host_error_still_cleans_up_temp_file() {
    let harness = Harness::new(json!({}));
    let host = ScriptedHost::new(|path| {
        assert!(path.exists(), "temp file must exist during upload");
        anyhow::bail!("connection reset by peer")
    });
    let orchestrator = harness.orchestrator(host.clone());

    let mut images = vec![ImageRecord::from_bytes("a.png", vec![1, 2])];
    let result = orchestrator
        .upload_batch(&mut images, &UploadOptions::default())
        .await;

    match result {
        Err(AppError::UploadCapabilityFailure { reason, .. }) => {
            assert!(reason.contains("connection reset by peer"))
        }
        other => panic!("expected UploadCapabilityFailure, got {:?}", other),
    }
    assert_eq!(host.calls().len(), 1);
    assert!(!host.calls()[0].path.exists());
    assert_eq!(harness.remaining_files(), 0);
}

#[tokio::test]
async fn test_partial_failure_keeps_other_urls() {
    let harness = Harness::new(json!({}));
    let host = ScriptedHost::new(|path| {
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        if name.starts_with("bad-") {
            Ok(json!({ "data": [{ "error": "file too large" }] }))
        } else {
            success_for(path)
        }
    });
    let orchestrator = harness.orchestrator(host.clone());

    let mut images = vec![
        ImageRecord::from_bytes("good.png", vec![1]),
        ImageRecord::from_bytes("bad.png", vec![2]),
        ImageRecord::from_bytes("fine.png", vec![3]),
    ];
    let result = orchestrator
        .upload_batch(&mut images, &UploadOptions::default())
        .await;

    assert!(matches!(result, Err(AppError::UploadResponseError { .. })));
    assert!(images[0].img_url.is_some());
    assert!(images[1].img_url.is_none());
    assert!(images[2].img_url.is_some());

    // Every task ran to completion before cleanup.
    assert_eq!(host.calls().len(), 3);
    assert_eq!(harness.remaining_files(), 0);
}

#[tokio::test]
async fn test_only_one_failure_is_reported() {
    let harness = Harness::new(json!({}));
    let host = ScriptedHost::new(|_| Ok(json!({ "data": [{ "error": "rate limited" }] })));
    let orchestrator = harness.orchestrator(host.clone());

    let mut images = vec![
        ImageRecord::from_bytes("a.png", vec![1]),
        ImageRecord::from_bytes("b.png", vec![2]),
        ImageRecord {
            file_name: Some("c.png".to_string()),
            ..ImageRecord::default()
        },
    ];
    let result = orchestrator
        .upload_batch(&mut images, &UploadOptions::default())
        .await;

    assert!(result.is_err());
    assert_eq!(harness.notifications().len(), 1);
    assert!(harness.logger.contains(log::Level::Error, "Image data is unusable for c.png"));
    assert!(harness.logger.contains(log::Level::Error, "rate limited"));
    assert_eq!(harness.remaining_files(), 0);
}

#[tokio::test]
async fn test_base64_image_is_uploaded() {
    let harness = Harness::new(json!({}));
    let host = ScriptedHost::new(success_for);
    let orchestrator = harness.orchestrator(host.clone());

    let mut images = vec![ImageRecord::from_base64("encoded.gif", "R0lGODlh")];
    orchestrator
        .upload_batch(&mut images, &UploadOptions::default())
        .await
        .unwrap();

    let calls = host.calls();
    assert_eq!(calls[0].bytes.as_deref(), Some(&b"GIF89a"[..]));
    assert!(calls[0].path.to_string_lossy().ends_with(".gif"));
    assert!(images[0].img_url.is_some());
    assert_eq!(harness.remaining_files(), 0);
}

#[tokio::test]
async fn test_unwritable_temp_dir_fails_image() {
    let harness = Harness::new(json!({}));
    let host = ScriptedHost::new(success_for);
    let missing_dir = harness.dir.path().join("does-not-exist");
    let orchestrator = UploadOrchestrator::new(harness.ctx.clone(), host.clone())
        .with_temp_store(TempFileStore::in_dir(&missing_dir));

    let mut images = vec![ImageRecord::from_bytes("a.png", vec![1])];
    let result = orchestrator
        .upload_batch(&mut images, &UploadOptions::default())
        .await;

    match result {
        Err(err @ AppError::TempFileWriteFailure { .. }) => {
            assert!(err.to_string().starts_with("Failed to save image to temp file"))
        }
        other => panic!("expected TempFileWriteFailure, got {:?}", other),
    }
    assert!(host.calls().is_empty());
    assert!(!missing_dir.exists());
}

#[tokio::test]
async fn test_registered_plugin_handles_batch() {
    let harness = Harness::new(json!({ "picgo-plugin-imgbox": { "albumTitle": "Trips" } }));
    let host = ScriptedHost::new(success_for);

    let registry = UploaderRegistry::new();
    registry
        .register(Arc::new(
            ImgboxPlugin::new(host.clone()).with_temp_store(TempFileStore::in_dir(harness.dir.path())),
        ))
        .await;

    let uploader = registry.get("imgbox").await.unwrap();
    let mut images = vec![ImageRecord::from_bytes("trip.png", vec![7])];
    uploader.handle(&harness.ctx, &mut images).await.unwrap();

    assert!(images[0].img_url.is_some());
    assert_eq!(host.calls()[0].request.album_title, "Trips");
    assert_eq!(harness.remaining_files(), 0);
}
