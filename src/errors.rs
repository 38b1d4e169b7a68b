use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Image data is missing for {file_name}.")]
    MissingImageData { file_name: String },

    #[error("Image data for {file_name} is not valid base64: {source}")]
    InvalidImageData {
        file_name: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("Failed to save image to temp file: {source}")]
    TempFileWriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Imgbox upload failed: {reason}")]
    UploadCapabilityFailure { file_name: String, reason: String },

    #[error(
        "Imgbox upload failed for {file_name}: Imgbox API Error: {message}. \
         Check that the auth cookie is correct and the album title is valid."
    )]
    UploadResponseError { file_name: String, message: String },

    #[error("Imgbox upload failed for {file_name}: unexpected response: {raw}")]
    UploadResponseMalformed { file_name: String, raw: String },

    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Uploader not found: {id}")]
    UploaderNotFound { id: String },

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Custom result type
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(field: &str, message: &str) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.to_string(),
        }
    }

    pub fn missing_image_data(file_name: &str) -> Self {
        Self::MissingImageData {
            file_name: file_name.to_string(),
        }
    }

    /// Flattens the collaborator's error chain into the reason text.
    pub fn upload_capability(file_name: &str, error: &anyhow::Error) -> Self {
        Self::UploadCapabilityFailure {
            file_name: file_name.to_string(),
            reason: format!("{:#}", error),
        }
    }

    pub fn upload_response(file_name: &str, message: &str) -> Self {
        Self::UploadResponseError {
            file_name: file_name.to_string(),
            message: message.to_string(),
        }
    }

    pub fn malformed_response(file_name: &str, raw: &serde_json::Value) -> Self {
        Self::UploadResponseMalformed {
            file_name: file_name.to_string(),
            raw: raw.to_string(),
        }
    }

    /// Message suitable for a user-facing notification.
    ///
    /// Raw response payloads stay in the log; everything else is the
    /// `Display` text.
    pub fn user_message(&self) -> String {
        match self {
            AppError::UploadResponseMalformed { file_name, .. } => format!(
                "Imgbox upload failed for {}: unexpected response from Imgbox",
                file_name
            ),
            other => other.to_string(),
        }
    }
}
