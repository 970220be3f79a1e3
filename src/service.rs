//! The remote conversion service: wire types, the client trait, and the
//! reqwest-backed implementation.
//!
//! ## Endpoints
//!
//! ```text
//! POST /upload    multipart "file"            → {filename, supported_formats} | {error}
//! POST /convert   {filename, format}          → {download_url}               | {error}
//! GET  <download_url>                         → converted bytes
//! ```
//!
//! Error bodies come back with 4xx/5xx statuses, so the body is decoded
//! before the status is judged.

use crate::config::ClientConfig;
use crate::error::ConvertClientError;
use crate::upload::FileUpload;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

// ── Wire types ───────────────────────────────────────────────────────────

/// Successful upload: the server's token for the file and what it converts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    /// Opaque token naming the stored upload. Sent back on convert.
    #[serde(rename = "filename")]
    pub file_token: String,
    /// Format ids as the server spells them, in the order it lists them.
    #[serde(default)]
    pub supported_formats: Vec<String>,
}

/// Successful conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertReceipt {
    pub download_url: String,
}

/// Body of the convert request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertRequest {
    pub filename: String,
    pub format: String,
}

/// Either response shape. `Failure` is tried first so a body carrying an
/// `error` key is always treated as an error.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ServiceReply<T> {
    Failure { error: String },
    Success(T),
}

/// A fetched converted file.
#[derive(Debug, Clone)]
pub struct Download {
    /// File name from `Content-Disposition` or the URL path, if any.
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

// ── Trait ────────────────────────────────────────────────────────────────

/// The three calls the session needs from a conversion service.
///
/// Implemented over HTTP by [`HttpConversionService`]; tests substitute
/// in-memory fakes.
#[async_trait]
pub trait ConversionService: Send + Sync {
    /// Upload a file and learn which formats it converts to.
    async fn upload(&self, file: FileUpload) -> Result<UploadReceipt, ConvertClientError>;

    /// Convert a previously uploaded file.
    async fn convert(
        &self,
        file_token: &str,
        format: &str,
    ) -> Result<ConvertReceipt, ConvertClientError>;

    /// Fetch the bytes behind a download URL returned by [`Self::convert`].
    async fn download(&self, download_url: &str) -> Result<Download, ConvertClientError>;
}

// ── HTTP implementation ──────────────────────────────────────────────────

/// [`ConversionService`] over HTTP with reqwest.
#[derive(Debug, Clone)]
pub struct HttpConversionService {
    client: Client,
    config: ClientConfig,
}

impl HttpConversionService {
    pub fn new(config: ClientConfig) -> Result<Self, ConvertClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| ConvertClientError::InvalidConfig(format!("HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn request_error(&self, url: &Url, e: reqwest::Error) -> ConvertClientError {
        if e.is_timeout() {
            ConvertClientError::Timeout {
                url: url.to_string(),
                secs: self.config.request_timeout_secs,
            }
        } else {
            ConvertClientError::Transport {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }

    async fn read_reply<T: DeserializeOwned>(
        &self,
        url: &Url,
        response: reqwest::Response,
    ) -> Result<T, ConvertClientError> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.request_error(url, e))?;
        decode_reply(url, status, &body)
    }
}

#[async_trait]
impl ConversionService for HttpConversionService {
    async fn upload(&self, file: FileUpload) -> Result<UploadReceipt, ConvertClientError> {
        let url = self.config.endpoint(&self.config.upload_path)?;
        let file_name = file.file_name().to_string();
        let mime = file.mime_type();

        let mut part = Part::bytes(file.into_bytes()).file_name(file_name);
        if let Some(mime) = mime {
            part = part
                .mime_str(mime)
                .map_err(|e| ConvertClientError::Transport {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;
        }
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(url.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.request_error(&url, e))?;
        self.read_reply(&url, response).await
    }

    async fn convert(
        &self,
        file_token: &str,
        format: &str,
    ) -> Result<ConvertReceipt, ConvertClientError> {
        let url = self.config.endpoint(&self.config.convert_path)?;
        let body = ConvertRequest {
            filename: file_token.to_string(),
            format: format.to_string(),
        };
        let response = self
            .client
            .post(url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.request_error(&url, e))?;
        self.read_reply(&url, response).await
    }

    async fn download(&self, download_url: &str) -> Result<Download, ConvertClientError> {
        let url = self.config.endpoint(download_url)?;
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.request_error(&url, e))?;

        if !response.status().is_success() {
            return Err(ConvertClientError::DownloadFailed {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let file_name = response
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(filename_from_content_disposition)
            .or_else(|| filename_from_url(&url));

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ConvertClientError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        debug!("Downloaded {} bytes from {}", bytes.len(), url);

        Ok(Download {
            file_name,
            bytes: bytes.to_vec(),
        })
    }
}

/// Decode a reply body into `T` or the matching error.
fn decode_reply<T: DeserializeOwned>(
    url: &Url,
    status: StatusCode,
    body: &str,
) -> Result<T, ConvertClientError> {
    let malformed = |detail: String| ConvertClientError::MalformedResponse {
        url: url.to_string(),
        status: status.as_u16(),
        detail,
    };
    match serde_json::from_str::<ServiceReply<T>>(body) {
        Ok(ServiceReply::Failure { error }) if !error.trim().is_empty() => {
            Err(ConvertClientError::Service {
                status: status.as_u16(),
                message: error,
            })
        }
        // An empty `error` counts as no error at all.
        Ok(ServiceReply::Failure { .. }) if status.is_success() => {
            serde_json::from_str::<T>(body).map_err(|e| {
                malformed(format!("{e}; body starts with {:?}", snippet(body)))
            })
        }
        Ok(ServiceReply::Success(value)) if status.is_success() => Ok(value),
        Ok(_) => Err(malformed(
            "error status without an error message".to_string(),
        )),
        Err(e) => Err(malformed(format!(
            "{e}; body starts with {:?}",
            snippet(body)
        ))),
    }
}

fn snippet(body: &str) -> &str {
    match body.char_indices().nth(80) {
        Some((i, _)) => &body[..i],
        None => body,
    }
}

static CONTENT_DISPOSITION_FILENAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:^|;)\s*filename\s*=\s*"?([^";]+)"?"#).expect("valid regex")
});

/// RFC 5987 extended value: `filename*=charset'lang'percent-encoded`.
static CONTENT_DISPOSITION_FILENAME_EXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(?:^|;)\s*filename\*\s*=\s*([^';]*)'[^']*'([^;\s]+)"#).expect("valid regex")
});

/// Extract a safe file name from a `Content-Disposition` header value.
///
/// A UTF-8 `filename*` wins over `filename`; other charsets fall back to
/// the plain parameter.
pub fn filename_from_content_disposition(value: &str) -> Option<String> {
    let extended = CONTENT_DISPOSITION_FILENAME_EXT
        .captures(value)
        .filter(|c| c[1].eq_ignore_ascii_case("utf-8"))
        .and_then(|c| urlencoding::decode(&c[2]).ok().map(|s| s.into_owned()))
        .and_then(|name| sanitize_file_name(&name));
    extended.or_else(|| {
        let raw = CONTENT_DISPOSITION_FILENAME.captures(value)?.get(1)?.as_str();
        sanitize_file_name(raw)
    })
}

/// Last path segment of a URL, if it looks like a file name.
fn filename_from_url(url: &Url) -> Option<String> {
    let last = url.path_segments()?.next_back()?;
    if last.contains('.') {
        sanitize_file_name(last)
    } else {
        None
    }
}

/// Keep only the final component so a hostile name cannot escape the
/// destination directory.
fn sanitize_file_name(raw: &str) -> Option<String> {
    let name = raw.trim().rsplit(['/', '\\']).next()?.trim();
    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name.to_string())
    }
}
