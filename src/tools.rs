//! Tool catalog: the cards on the home screen.
//!
//! A tool fixes which files are offered for upload and, optionally, the
//! output format. The built-in set mirrors the service's conversion
//! families (office documents, PDF, images, audio, video). Custom catalogs
//! load from JSON with the same shape:
//!
//! ```json
//! [{"slug": "word-to-pdf", "title": "Word to PDF", "description": "…",
//!   "accept": ".doc,.docx", "output": "pdf"}]
//! ```

use crate::config::{AcceptFilter, OutputFormat, ToolConfig};
use crate::error::ConvertClientError;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Slug of the catch-all tool.
pub const UNIVERSAL: &str = "universal";

/// A tool plus the slug used to pick it on the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub slug: String,
    #[serde(flatten)]
    pub config: ToolConfig,
}

fn tool(slug: &str, title: &str, description: &str, accept: &str, output: &str) -> ToolDefinition {
    ToolDefinition {
        slug: slug.to_string(),
        config: ToolConfig::new(
            title,
            description,
            AcceptFilter::parse(accept),
            OutputFormat::parse(output),
        ),
    }
}

static BUILTIN: Lazy<Vec<ToolDefinition>> = Lazy::new(|| {
    vec![
        tool(
            UNIVERSAL,
            "Universal Converter",
            "Upload any file and pick from the formats it can become.",
            "*",
            "auto",
        ),
        tool(
            "word-to-pdf",
            "Word to PDF",
            "Turn DOC, DOCX, ODT and RTF documents into PDF.",
            ".doc,.docx,.odt,.rtf",
            "pdf",
        ),
        tool(
            "pdf-to-word",
            "PDF to Word",
            "Make a PDF editable as a DOCX document.",
            ".pdf",
            "docx",
        ),
        tool(
            "excel-to-pdf",
            "Excel to PDF",
            "Convert XLS, XLSX and ODS spreadsheets to PDF.",
            ".xls,.xlsx,.ods",
            "pdf",
        ),
        tool(
            "ppt-to-pdf",
            "PowerPoint to PDF",
            "Convert PPT, PPTX and ODP presentations to PDF.",
            ".ppt,.pptx,.odp",
            "pdf",
        ),
        tool(
            "image-to-pdf",
            "Image to PDF",
            "Wrap a JPG, PNG or other image in a PDF page.",
            "image/*",
            "pdf",
        ),
        tool(
            "pdf-to-image",
            "PDF to Image",
            "Render PDF pages as PNG images.",
            ".pdf",
            "png",
        ),
        tool(
            "jpg-to-png",
            "JPG to PNG",
            "Convert JPEG photos to lossless PNG.",
            ".jpg,.jpeg",
            "png",
        ),
        tool(
            "png-to-jpg",
            "PNG to JPG",
            "Convert PNG images to compact JPEG.",
            ".png",
            "jpg",
        ),
        tool(
            "video-to-mp3",
            "Video to MP3",
            "Extract the audio track of a video as MP3.",
            "video/*",
            "mp3",
        ),
        tool(
            "audio-converter",
            "Audio Converter",
            "Convert between MP3, WAV, AAC, FLAC, OGG and M4A.",
            "audio/*",
            "auto",
        ),
    ]
});

/// An ordered set of tools with unique slugs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCatalog {
    tools: Vec<ToolDefinition>,
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ToolCatalog {
    /// The built-in catalog.
    pub fn builtin() -> Self {
        Self {
            tools: BUILTIN.clone(),
        }
    }

    /// Build a catalog, rejecting duplicate or empty slugs. Slugs compare
    /// case-insensitively, as in [`ToolCatalog::find`].
    pub fn new(tools: Vec<ToolDefinition>) -> Result<Self, ConvertClientError> {
        let mut seen = std::collections::HashSet::new();
        for t in &tools {
            if t.slug.trim().is_empty() {
                return Err(ConvertClientError::InvalidToolCatalog(format!(
                    "tool \"{}\" has an empty slug",
                    t.config.title
                )));
            }
            if !seen.insert(t.slug.trim().to_ascii_lowercase()) {
                return Err(ConvertClientError::InvalidToolCatalog(format!(
                    "duplicate tool slug '{}'",
                    t.slug
                )));
            }
        }
        Ok(Self { tools })
    }

    /// Parse a JSON array of tool definitions.
    pub fn from_json_str(json: &str) -> Result<Self, ConvertClientError> {
        let tools: Vec<ToolDefinition> = serde_json::from_str(json)
            .map_err(|e| ConvertClientError::InvalidToolCatalog(e.to_string()))?;
        Self::new(tools)
    }

    /// Load a JSON catalog file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ConvertClientError> {
        let path = path.as_ref();
        let catalog_error = |detail: String| ConvertClientError::ToolCatalog {
            path: path.to_path_buf(),
            detail,
        };
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| catalog_error(e.to_string()))?;
        Self::from_json_str(&json).map_err(|e| match e {
            ConvertClientError::InvalidToolCatalog(detail) => catalog_error(detail),
            other => other,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolDefinition> {
        self.tools.iter()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Look a tool up by slug (case-insensitive).
    pub fn find(&self, slug: &str) -> Result<&ToolDefinition, ConvertClientError> {
        self.tools
            .iter()
            .find(|t| t.slug.eq_ignore_ascii_case(slug.trim()))
            .ok_or_else(|| ConvertClientError::UnknownTool {
                slug: slug.to_string(),
                available: self
                    .tools
                    .iter()
                    .map(|t| t.slug.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }
}
