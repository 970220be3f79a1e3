//! Configuration types: how to reach the service, and what a tool is.
//!
//! [`ClientConfig`] controls the HTTP side (base URL, endpoint paths,
//! timeouts, upload limit) and is built via [`ClientConfigBuilder`].
//! [`ToolConfig`] is the static description of one conversion tool: its
//! title, which files it accepts and which output it produces.

use crate::error::ConvertClientError;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default service address; the reference server listens on port 3000.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:3000";

/// Upload limit enforced by the service (50 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

/// Configuration for talking to the conversion service.
///
/// # Example
/// ```rust
/// use anyfile_convert::ClientConfig;
///
/// let config = ClientConfig::builder()
///     .base_url("http://localhost:3000")
///     .request_timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.endpoint("/upload").unwrap().as_str(), "http://localhost:3000/upload");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the service. Default: `http://127.0.0.1:3000`.
    pub base_url: String,

    /// Path of the upload endpoint. Default: `/upload`.
    pub upload_path: String,

    /// Path of the convert endpoint. Default: `/convert`.
    pub convert_path: String,

    /// Whole-request timeout in seconds. Default: 120.
    ///
    /// Conversions of large office documents or videos run inside the convert
    /// request, so this must cover the slowest conversion the server does.
    pub request_timeout_secs: u64,

    /// TCP connect timeout in seconds. Default: 10.
    pub connect_timeout_secs: u64,

    /// Largest file the client will try to upload. Default: 50 MiB.
    pub max_upload_bytes: u64,

    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            upload_path: "/upload".to_string(),
            convert_path: "/convert".to_string(),
            request_timeout_secs: 120,
            connect_timeout_secs: 10,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            user_agent: concat!("anyfile-convert/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    /// Create a new builder for `ClientConfig`.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder {
            config: Self::default(),
        }
    }

    /// Resolve a path or URL against the base URL.
    ///
    /// Absolute URLs are returned unchanged, so a `download_url` pointing at
    /// another host still works.
    pub fn endpoint(&self, path_or_url: &str) -> Result<Url, ConvertClientError> {
        let base = parse_base_url(&self.base_url)?;
        base.join(path_or_url).map_err(|e| {
            ConvertClientError::InvalidConfig(format!(
                "cannot resolve '{path_or_url}' against '{}': {e}",
                self.base_url
            ))
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConvertClientError> {
    let url = Url::parse(raw)
        .map_err(|e| ConvertClientError::InvalidConfig(format!("base URL '{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ConvertClientError::InvalidConfig(format!(
            "base URL must be http or https, got '{other}'"
        ))),
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    pub fn upload_path(mut self, path: impl Into<String>) -> Self {
        self.config.upload_path = path.into();
        self
    }

    pub fn convert_path(mut self, path: impl Into<String>) -> Self {
        self.config.convert_path = path.into();
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = secs;
        self
    }

    pub fn max_upload_bytes(mut self, bytes: u64) -> Self {
        self.config.max_upload_bytes = bytes;
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.config.user_agent = ua.into();
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ClientConfig, ConvertClientError> {
        let c = &self.config;
        parse_base_url(&c.base_url)?;
        if c.request_timeout_secs == 0 || c.connect_timeout_secs == 0 {
            return Err(ConvertClientError::InvalidConfig(
                "Timeouts must be ≥ 1 second".into(),
            ));
        }
        if c.max_upload_bytes == 0 {
            return Err(ConvertClientError::InvalidConfig(
                "Upload limit must be ≥ 1 byte".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Tools ────────────────────────────────────────────────────────────────

/// Static description of a conversion tool.
///
/// Serialised form uses plain strings, matching how tool cards describe
/// themselves: `accept` is `"*"` or a comma list, `output` is `"auto"` or a
/// format id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    pub title: String,
    pub description: String,
    pub accept: AcceptFilter,
    pub output: OutputFormat,
}

impl ToolConfig {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        accept: AcceptFilter,
        output: OutputFormat,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            accept,
            output,
        }
    }

    /// The format the tool forces, if any.
    pub fn forced_format(&self) -> Option<&str> {
        match &self.output {
            OutputFormat::Auto => None,
            OutputFormat::Forced(f) => Some(f),
        }
    }
}

/// Which output format a tool produces.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OutputFormat {
    /// The user chooses from the formats the server offers.
    #[default]
    Auto,
    /// The tool always converts to this format id (lowercase).
    Forced(String),
}

impl OutputFormat {
    pub fn parse(s: &str) -> Self {
        let s = s.trim().to_lowercase();
        if s.is_empty() || s == "auto" {
            OutputFormat::Auto
        } else {
            OutputFormat::Forced(s)
        }
    }
}

impl From<String> for OutputFormat {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<OutputFormat> for String {
    fn from(f: OutputFormat) -> Self {
        f.to_string()
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Auto => f.write_str("auto"),
            OutputFormat::Forced(fmt_id) => f.write_str(fmt_id),
        }
    }
}

/// Which input files a tool accepts.
///
/// Entries follow the HTML `accept` attribute: `.ext`, `type/*` or an exact
/// MIME type. A bare `ext` without the dot is accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AcceptFilter {
    /// `*` matches any file.
    #[default]
    Any,
    /// Lowercased, trimmed entries.
    List(Vec<String>),
}

impl AcceptFilter {
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if s.is_empty() || s == "*" {
            return AcceptFilter::Any;
        }
        let entries: Vec<String> = s
            .split(',')
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        if entries.is_empty() || entries.iter().any(|e| e == "*") {
            AcceptFilter::Any
        } else {
            AcceptFilter::List(entries)
        }
    }

    /// Whether a file with this name passes the filter.
    pub fn accepts(&self, file_name: &str) -> bool {
        let entries = match self {
            AcceptFilter::Any => return true,
            AcceptFilter::List(entries) => entries,
        };
        let Some(ext) = extension_of(file_name) else {
            return false;
        };
        let mime = mime_type_for(&ext);
        entries.iter().any(|entry| {
            if let Some(dotted) = entry.strip_prefix('.') {
                dotted == ext
            } else if let Some(top) = entry.strip_suffix("/*") {
                mime.is_some_and(|m| m.split('/').next() == Some(top))
            } else if entry.contains('/') {
                mime == Some(entry.as_str())
            } else {
                *entry == ext
            }
        })
    }
}

impl From<String> for AcceptFilter {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<AcceptFilter> for String {
    fn from(f: AcceptFilter) -> Self {
        f.to_string()
    }
}

impl fmt::Display for AcceptFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AcceptFilter::Any => f.write_str("*"),
            AcceptFilter::List(entries) => f.write_str(&entries.join(",")),
        }
    }
}

/// Lowercased extension of a file name, without the dot.
pub fn extension_of(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_lowercase())
}

/// MIME type for the extensions the conversion service knows about.
pub fn mime_type_for(ext: &str) -> Option<&'static str> {
    let mime = match ext {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "aac" => "audio/aac",
        "flac" => "audio/flac",
        "ogg" => "audio/ogg",
        "m4a" => "audio/mp4",
        "mp4" => "video/mp4",
        "avi" => "video/x-msvideo",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "wmv" => "video/x-ms-wmv",
        "flv" => "video/x-flv",
        "webm" => "video/webm",
        "pdf" => "application/pdf",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "odt" => "application/vnd.oasis.opendocument.text",
        "rtf" => "application/rtf",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "odp" => "application/vnd.oasis.opendocument.presentation",
        "xls" => "application/vnd.ms-excel",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "ods" => "application/vnd.oasis.opendocument.spreadsheet",
        "json" => "application/json",
        "zip" => "application/zip",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        _ => return None,
    };
    Some(mime)
}
