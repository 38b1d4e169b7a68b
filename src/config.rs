use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

use crate::errors::{AppError, AppResult};
use crate::host::{ConfigReader, PluginLogger};

/// Key under which the host stores this plugin's settings.
pub const CONFIG_KEY: &str = "picgo-plugin-imgbox";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Safe,
    Private,
}

impl ContentType {
    pub const ALL: [ContentType; 2] = [ContentType::Safe, ContentType::Private];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Safe => "safe",
            ContentType::Private => "private",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "safe" => Ok(ContentType::Safe),
            "private" => Ok(ContentType::Private),
            _ => Err(AppError::validation(
                "contentType",
                "Must be 'safe' or 'private'",
            )),
        }
    }
}

/// Thumbnail rendition offered by Imgbox: `c` is cropped, `r` is rounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ThumbnailSize {
    Original,
    Cropped100,
    Cropped150,
    Cropped250,
    Cropped300,
    #[default]
    Cropped350,
    Cropped500,
    Cropped800,
    Rounded100,
    Rounded150,
    Rounded250,
    Rounded300,
    Rounded350,
    Rounded500,
    Rounded800,
}

impl ThumbnailSize {
    pub const ALL: [ThumbnailSize; 15] = [
        ThumbnailSize::Original,
        ThumbnailSize::Cropped100,
        ThumbnailSize::Cropped150,
        ThumbnailSize::Cropped250,
        ThumbnailSize::Cropped300,
        ThumbnailSize::Cropped350,
        ThumbnailSize::Cropped500,
        ThumbnailSize::Cropped800,
        ThumbnailSize::Rounded100,
        ThumbnailSize::Rounded150,
        ThumbnailSize::Rounded250,
        ThumbnailSize::Rounded300,
        ThumbnailSize::Rounded350,
        ThumbnailSize::Rounded500,
        ThumbnailSize::Rounded800,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThumbnailSize::Original => "original",
            ThumbnailSize::Cropped100 => "100c",
            ThumbnailSize::Cropped150 => "150c",
            ThumbnailSize::Cropped250 => "250c",
            ThumbnailSize::Cropped300 => "300c",
            ThumbnailSize::Cropped350 => "350c",
            ThumbnailSize::Cropped500 => "500c",
            ThumbnailSize::Cropped800 => "800c",
            ThumbnailSize::Rounded100 => "100r",
            ThumbnailSize::Rounded150 => "150r",
            ThumbnailSize::Rounded250 => "250r",
            ThumbnailSize::Rounded300 => "300r",
            ThumbnailSize::Rounded350 => "350r",
            ThumbnailSize::Rounded500 => "500r",
            ThumbnailSize::Rounded800 => "800r",
        }
    }
}

impl fmt::Display for ThumbnailSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThumbnailSize {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ThumbnailSize::ALL
            .iter()
            .copied()
            .find(|size| size.as_str() == s)
            .ok_or_else(|| AppError::validation("thumbnailSize", "Unsupported thumbnail size"))
    }
}

impl Serialize for ThumbnailSize {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Options applied to every image of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    pub auth_cookie: Option<String>,
    pub album_title: Option<String>,
    pub content_type: ContentType,
    pub comments_enabled: bool,
    pub thumbnail_size: ThumbnailSize,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            auth_cookie: None,
            album_title: None,
            content_type: ContentType::Safe,
            comments_enabled: true,
            thumbnail_size: ThumbnailSize::Cropped350,
        }
    }
}

/// Settings as the host stores them.
#[derive(Debug, Default)]
struct StoredOptions {
    auth_cookie: Option<String>,
    album_title: Option<String>,
    content_type: Option<String>,
    comments_enabled: Option<bool>,
    thumbnail_size: Option<String>,
}

impl StoredOptions {
    /// Read each field on its own; a field of the wrong type is dropped
    /// without touching the others.
    fn read(value: &Value, logger: &dyn PluginLogger) -> Self {
        if !value.is_object() {
            logger.warn(&format!(
                "Uploader config is not an object ({}). Using defaults.",
                value
            ));
            return Self::default();
        }

        Self {
            auth_cookie: read_field(value, "authCookie", logger),
            album_title: read_field(value, "albumTitle", logger),
            content_type: read_field(value, "contentType", logger),
            comments_enabled: read_field(value, "commentsEnabled", logger),
            thumbnail_size: read_field(value, "thumbnailSize", logger),
        }
    }
}

fn read_field<T: DeserializeOwned>(value: &Value, key: &str, logger: &dyn PluginLogger) -> Option<T> {
    match value.get(key) {
        None | Some(Value::Null) => None,
        Some(field) => match T::deserialize(field) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                logger.warn(&format!(
                    "Ignoring uploader config field '{}': {}. Using its default.",
                    key, e
                ));
                None
            }
        },
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl TryFrom<StoredOptions> for UploadOptions {
    type Error = AppError;

    fn try_from(stored: StoredOptions) -> AppResult<Self> {
        let content_type = match non_empty(stored.content_type) {
            Some(value) => value.parse()?,
            None => ContentType::default(),
        };
        let thumbnail_size = match non_empty(stored.thumbnail_size) {
            Some(value) => value.parse()?,
            None => ThumbnailSize::default(),
        };

        Ok(Self {
            auth_cookie: non_empty(stored.auth_cookie),
            album_title: non_empty(stored.album_title),
            content_type,
            comments_enabled: stored.comments_enabled.unwrap_or(true),
            thumbnail_size,
        })
    }
}

impl UploadOptions {
    /// Build options from the stored JSON bundle.
    ///
    /// A field whose type cannot be read falls back to its own default;
    /// values outside the allowed choices are rejected.
    pub fn from_value(value: Option<Value>, logger: &dyn PluginLogger) -> AppResult<Self> {
        let stored = match value {
            None | Some(Value::Null) => StoredOptions::default(),
            Some(value) => StoredOptions::read(&value, logger),
        };

        stored.try_into()
    }
}

pub fn load_options(reader: &dyn ConfigReader, logger: &dyn PluginLogger) -> AppResult<UploadOptions> {
    UploadOptions::from_value(reader.get_config(CONFIG_KEY), logger)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Input,
    List,
    Confirm,
}

/// One entry of the settings form the host renders for this uploader.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigItem {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: InputKind,
    pub default: Value,
    pub required: bool,
    pub message: &'static str,
    pub alias: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<&'static str>>,
}

impl ConfigItem {
    /// Check a value entered in the settings form.
    pub fn validate(&self, value: &Value) -> AppResult<()> {
        match self.kind {
            InputKind::Input => {
                if value.is_null() || value.is_string() {
                    Ok(())
                } else {
                    Err(AppError::validation(self.name, "Must be a string"))
                }
            }
            InputKind::List => {
                let choices = self.choices.as_deref().unwrap_or_default();
                match value.as_str() {
                    Some(choice) if choices.iter().any(|c| *c == choice) => Ok(()),
                    _ => Err(AppError::validation(
                        self.name,
                        &format!("Must be one of: {}", choices.join(", ")),
                    )),
                }
            }
            InputKind::Confirm => {
                if value.is_boolean() {
                    Ok(())
                } else {
                    Err(AppError::validation(self.name, "Must be true or false"))
                }
            }
        }
    }
}

pub fn config_schema() -> Vec<ConfigItem> {
    vec![
        ConfigItem {
            name: "authCookie",
            kind: InputKind::Input,
            default: json!(""),
            required: false,
            message: "Imgbox auth cookie (optional, for uploads as a logged-in user)",
            alias: "Auth cookie",
            choices: None,
        },
        ConfigItem {
            name: "albumTitle",
            kind: InputKind::Input,
            default: json!(""),
            required: false,
            message: "Imgbox album title (optional, only used when creating a new album)",
            alias: "Album title",
            choices: None,
        },
        ConfigItem {
            name: "contentType",
            kind: InputKind::List,
            default: json!(ContentType::default().as_str()),
            required: false,
            message: "Content type",
            alias: "Content type",
            choices: Some(ContentType::ALL.iter().map(ContentType::as_str).collect()),
        },
        ConfigItem {
            name: "commentsEnabled",
            kind: InputKind::Confirm,
            default: json!(true),
            required: false,
            message: "Enable comments",
            alias: "Enable comments",
            choices: None,
        },
        ConfigItem {
            name: "thumbnailSize",
            kind: InputKind::List,
            default: json!(ThumbnailSize::default().as_str()),
            required: false,
            message: "Thumbnail size",
            alias: "Thumbnail size",
            choices: Some(ThumbnailSize::ALL.iter().map(ThumbnailSize::as_str).collect()),
        },
    ]
}

/// Schema rendered as JSON for the host settings UI.
pub fn config_schema_json() -> AppResult<String> {
    Ok(serde_json::to_string_pretty(&config_schema())?)
}

/// Validate every field of a stored settings object against the schema.
pub fn validate_config(value: &Value) -> AppResult<()> {
    for item in config_schema() {
        if let Some(field) = value.get(item.name) {
            item.validate(field)?;
        }
    }
    Ok(())
}
