//! # anyfile-convert
//!
//! Client for a remote file-conversion service: pick a tool, upload a
//! file, learn which formats it converts to, choose one, convert, and
//! download the result.
//!
//! ## Why a state machine?
//!
//! Uploads and conversions are slow, can fail, and the user can navigate or
//! upload another file while one is in flight. Every rule about what is
//! allowed when lives in one pure reducer ([`session::transition`]), so
//! the behaviour is testable without a network or a UI, and late responses
//! from superseded requests are dropped by sequence number instead of
//! overwriting newer state.
//!
//! ## Flow
//!
//! ```text
//! Home ──enter_tool──▶ Idle ──submit_file──▶ Uploading ──▶ AwaitingFormatChoice
//!                        ▲                       │                 │
//!                        │                       ▼        request_conversion
//!                 return_home                 Failed ◀──────── Converting
//!                                                │                 │
//!                                         select_format            ▼
//!                                      (upload retained)          Done ──download_to──▶ file
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use anyfile_convert::{
//!     ClientConfig, Controller, FileUpload, HttpConversionService, Phase, ToolCatalog,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder().base_url("http://127.0.0.1:3000").build()?;
//!     let service = Arc::new(HttpConversionService::new(config.clone())?);
//!     let mut controller = Controller::new(service);
//!
//!     let tool = ToolCatalog::builtin().find("word-to-pdf")?.config.clone();
//!     controller.enter_tool(tool);
//!     controller
//!         .submit_file(FileUpload::from_path("report.docx", config.max_upload_bytes).await?)
//!         .await?;
//!     // Step failures land in the session, not in `Err`.
//!     if controller.session().phase() == Phase::Failed {
//!         eprintln!("upload failed: {}", controller.session().error_text().unwrap_or_default());
//!         return Ok(());
//!     }
//!
//!     controller.request_conversion().await?;
//!     if controller.session().phase() == Phase::Failed {
//!         eprintln!("conversion failed: {}", controller.session().error_text().unwrap_or_default());
//!         return Ok(());
//!     }
//!
//!     let saved = controller.download_to(".").await?;
//!     println!("saved {}", saved.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `anyconvert` binary (clap + anyhow + indicatif + tracing-subscriber) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod controller;
pub mod error;
pub mod observer;
pub mod service;
pub mod session;
pub mod tools;
pub mod upload;
pub mod view;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{AcceptFilter, ClientConfig, ClientConfigBuilder, OutputFormat, ToolConfig};
pub use controller::Controller;
pub use error::ConvertClientError;
pub use observer::{NoopObserver, ObserverRef, SessionObserver};
pub use service::{
    ConversionService, ConvertReceipt, Download, HttpConversionService, UploadReceipt,
};
pub use session::{Effect, Event, Mode, Phase, RequestKind, RequestSeq, Session};
pub use tools::{ToolCatalog, ToolDefinition};
pub use upload::FileUpload;
pub use view::{FormatOption, FormatSelector, Screen, View};
