//! Upload payloads: the file bytes plus the name the service will see.

use crate::config::{extension_of, mime_type_for};
use crate::error::ConvertClientError;
use std::fmt;
use std::path::Path;
use tracing::debug;

/// A file ready to be sent to the upload endpoint.
#[derive(Clone)]
pub struct FileUpload {
    file_name: String,
    bytes: Vec<u8>,
}

impl fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("file_name", &self.file_name)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl FileUpload {
    /// Wrap bytes that are already in memory.
    pub fn from_bytes(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Read a local file, refusing anything larger than `max_bytes`.
    ///
    /// The size is checked from metadata before reading so an oversized
    /// video is rejected without loading it into memory.
    pub async fn from_path(
        path: impl AsRef<Path>,
        max_bytes: u64,
    ) -> Result<Self, ConvertClientError> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| io_error(path, e))?;
        if !metadata.is_file() {
            return Err(ConvertClientError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        if metadata.len() > max_bytes {
            return Err(ConvertClientError::FileTooLarge {
                path: path.to_path_buf(),
                size: metadata.len(),
                limit: max_bytes,
            });
        }
        let bytes = tokio::fs::read(path).await.map_err(|e| io_error(path, e))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        debug!("Read {} bytes from {}", bytes.len(), path.display());
        Ok(Self { file_name, bytes })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// MIME type guessed from the file extension.
    pub fn mime_type(&self) -> Option<&'static str> {
        extension_of(&self.file_name).and_then(|ext| mime_type_for(&ext))
    }
}

fn io_error(path: &Path, e: std::io::Error) -> ConvertClientError {
    match e.kind() {
        std::io::ErrorKind::PermissionDenied => ConvertClientError::PermissionDenied {
            path: path.to_path_buf(),
        },
        _ => ConvertClientError::FileNotFound {
            path: path.to_path_buf(),
        },
    }
}
