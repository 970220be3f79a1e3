//! Outputs of the session reducer: the network calls it wants made.

use super::event::Event;
use super::state::RequestSeq;
use crate::service::ConversionService;
use crate::upload::FileUpload;
use std::fmt;
use tracing::{info, warn};

/// Which endpoint a request goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Upload,
    Convert,
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestKind::Upload => f.pad("upload"),
            RequestKind::Convert => f.pad("convert"),
        }
    }
}

/// A request the reducer asked for. Its outcome comes back as an [`Event`]
/// carrying the same sequence number.
#[derive(Debug)]
pub enum Effect {
    Upload {
        seq: RequestSeq,
        file: FileUpload,
    },
    Convert {
        seq: RequestSeq,
        file_token: String,
        format: String,
    },
}

impl Effect {
    pub fn seq(&self) -> RequestSeq {
        match self {
            Effect::Upload { seq, .. } | Effect::Convert { seq, .. } => *seq,
        }
    }

    pub fn kind(&self) -> RequestKind {
        match self {
            Effect::Upload { .. } => RequestKind::Upload,
            Effect::Convert { .. } => RequestKind::Convert,
        }
    }
}

/// Run an effect against the service and turn its outcome into an event.
///
/// Takes only the service, not the session, so several effects can be in
/// flight at once; the reducer sorts out which outcome still matters.
pub async fn perform<S>(service: &S, effect: Effect) -> Event
where
    S: ConversionService + ?Sized,
{
    match effect {
        Effect::Upload { seq, file } => {
            info!(seq, file = %file.file_name(), bytes = file.len(), "Uploading");
            let result = service.upload(file).await;
            match &result {
                Ok(receipt) => info!(
                    seq,
                    formats = receipt.supported_formats.len(),
                    "Upload finished"
                ),
                Err(e) => warn!(seq, "Upload failed: {}", e),
            }
            Event::UploadFinished { seq, result }
        }
        Effect::Convert {
            seq,
            file_token,
            format,
        } => {
            info!(seq, file = %file_token, %format, "Converting");
            let result = service.convert(&file_token, &format).await;
            match &result {
                Ok(receipt) => info!(seq, url = %receipt.download_url, "Conversion finished"),
                Err(e) => warn!(seq, "Conversion failed: {}", e),
            }
            Event::ConvertFinished { seq, result }
        }
    }
}
