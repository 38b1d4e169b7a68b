use serde_json::Value;

/// What an Imgbox response means for one image.
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    Success(String),
    ApiError(String),
    /// Anything else; carries the part of the response worth logging.
    Malformed(Value),
}

/// Classify a raw response.
///
/// Only the first entry of `data` is looked at. A usable `original_url` wins
/// over an `error` field.
pub fn parse_upload_response(response: &Value) -> UploadOutcome {
    let first = match response.get("data").and_then(Value::as_array) {
        Some(entries) if !entries.is_empty() => &entries[0],
        _ => return UploadOutcome::Malformed(response.clone()),
    };

    if let Some(url) = first
        .get("original_url")
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
    {
        return UploadOutcome::Success(url.to_string());
    }

    match first.get("error") {
        Some(Value::String(message)) if !message.is_empty() => {
            UploadOutcome::ApiError(message.clone())
        }
        None | Some(Value::Null) | Some(Value::Bool(false)) | Some(Value::String(_)) => {
            UploadOutcome::Malformed(first.clone())
        }
        Some(other) => UploadOutcome::ApiError(other.to_string()),
    }
}

/// True when the response has no usable `data` entries at all.
pub fn is_empty_listing(response: &Value) -> bool {
    response
        .get("data")
        .and_then(Value::as_array)
        .map_or(true, |entries| entries.is_empty())
}
