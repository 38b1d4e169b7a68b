use chrono::Utc;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use crate::errors::{AppError, AppResult};
use crate::host::PluginLogger;

const FALLBACK_STEM: &str = "temp_image";
const FALLBACK_EXTENSION: &str = "png";
/// Most filesystems cap a single name at 255 bytes.
const MAX_NAME_BYTES: usize = 255;
/// `-` + up to 19 timestamp digits + `.`
const NAME_OVERHEAD_BYTES: usize = 21;
const MAX_EXTENSION_BYTES: usize = 16;

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1f]"#).unwrap());

/// Directory where images are staged before upload.
#[derive(Debug, Clone)]
pub struct TempFileStore {
    dir: PathBuf,
}

impl Default for TempFileStore {
    fn default() -> Self {
        Self::system()
    }
}

impl TempFileStore {
    /// Stage files directly in the platform temp directory.
    pub fn system() -> Self {
        Self {
            dir: std::env::temp_dir(),
        }
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Fresh path for an image, named after it and the current time.
    pub fn path_for(&self, file_name: Option<&str>) -> PathBuf {
        self.dir.join(temp_file_name(file_name, current_timestamp()))
    }

    pub async fn write(&self, path: &Path, bytes: &[u8]) -> AppResult<()> {
        tokio::fs::write(path, bytes)
            .await
            .map_err(|source| AppError::TempFileWriteFailure {
                path: path.to_path_buf(),
                source,
            })
    }

    /// Delete one staged file. Failures are logged, never returned.
    pub async fn remove(&self, path: &Path, logger: &dyn PluginLogger) -> bool {
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                logger.info(&format!("Cleaned up temporary file: {}", path.display()));
                true
            }
            Err(e) => {
                logger.warn(&format!(
                    "Failed to clean up temporary file {}: {}",
                    path.display(),
                    e
                ));
                false
            }
        }
    }

    /// Delete every staged file, returning how many were removed.
    pub async fn cleanup(&self, paths: &[PathBuf], logger: &dyn PluginLogger) -> usize {
        let mut removed = 0;
        for path in paths {
            if self.remove(path, logger).await {
                removed += 1;
            }
        }
        removed
    }
}

fn current_timestamp() -> i64 {
    let now = Utc::now();
    now.timestamp_nanos_opt()
        .unwrap_or_else(|| now.timestamp_micros())
}

/// `<stem>-<timestamp>.<ext>` for the given image name.
///
/// Only the final path component of `file_name` is used.
pub fn temp_file_name(file_name: Option<&str>, timestamp: i64) -> String {
    let base = file_name
        .map(Path::new)
        .and_then(Path::file_name)
        .map(Path::new);

    let extension = base
        .and_then(Path::extension)
        .map(|e| sanitize_component(&e.to_string_lossy(), MAX_EXTENSION_BYTES))
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| FALLBACK_EXTENSION.to_string());

    let stem_budget = MAX_NAME_BYTES - NAME_OVERHEAD_BYTES - extension.len();
    let stem = base
        .and_then(Path::file_stem)
        .map(|s| sanitize_component(&s.to_string_lossy(), stem_budget))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| FALLBACK_STEM.to_string());

    format!("{}-{}.{}", stem, timestamp, extension)
}

/// Replace unsafe characters and cut to `max_bytes` on a char boundary.
fn sanitize_component(component: &str, max_bytes: usize) -> String {
    let sanitized = UNSAFE_CHARS.replace_all(component.trim(), "_");
    let mut end = sanitized.len().min(max_bytes);
    while !sanitized.is_char_boundary(end) {
        end -= 1;
    }
    sanitized[..end].to_string()
}
