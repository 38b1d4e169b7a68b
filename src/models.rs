use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

use crate::errors::{AppError, AppResult};

/// One image handed over by the host for upload.
///
/// The uploader only fills `img_url`; the record stays owned by the host.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    #[serde(skip)]
    pub buffer: Option<Vec<u8>>,
    pub base64_str: Option<String>,
    pub file_name: Option<String>,
    pub img_url: Option<String>,
}

impl ImageRecord {
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            buffer: Some(bytes),
            file_name: Some(file_name.into()),
            ..Self::default()
        }
    }

    pub fn from_base64(file_name: impl Into<String>, encoded: impl Into<String>) -> Self {
        Self {
            base64_str: Some(encoded.into()),
            file_name: Some(file_name.into()),
            ..Self::default()
        }
    }

    /// Name used in log lines and error messages.
    pub fn display_name(&self) -> &str {
        match self.file_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => "unnamed image",
        }
    }

    /// Binary content of the image, decoding the base64 form when no raw
    /// buffer is present. Empty content counts as missing.
    pub fn content(&self) -> AppResult<Cow<'_, [u8]>> {
        if let Some(buffer) = self.buffer.as_deref().filter(|b| !b.is_empty()) {
            return Ok(Cow::Borrowed(buffer));
        }

        let encoded = self
            .base64_str
            .as_deref()
            .map(strip_data_url_prefix)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::missing_image_data(self.display_name()))?;

        let decoded = STANDARD
            .decode(encoded)
            .map_err(|source| AppError::InvalidImageData {
                file_name: self.display_name().to_string(),
                source,
            })?;

        if decoded.is_empty() {
            return Err(AppError::missing_image_data(self.display_name()));
        }
        Ok(Cow::Owned(decoded))
    }
}

fn strip_data_url_prefix(encoded: &str) -> &str {
    if encoded.starts_with("data:") {
        if let Some(pos) = encoded.find(";base64,") {
            return &encoded[pos + ";base64,".len()..];
        }
    }
    encoded
}
