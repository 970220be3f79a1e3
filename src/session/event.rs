//! Inputs to the session reducer.

use super::state::RequestSeq;
use crate::config::ToolConfig;
use crate::error::ConvertClientError;
use crate::service::{ConvertReceipt, UploadReceipt};
use crate::upload::FileUpload;

/// Everything that can happen to a session: user intents and request outcomes.
#[derive(Debug)]
pub enum Event {
    /// The user opened a tool.
    EnterTool(ToolConfig),
    /// The user went back to the tool list.
    ReturnHome,
    /// The user picked or dropped a file.
    SubmitFile(FileUpload),
    /// The upload request tagged `seq` completed.
    UploadFinished {
        seq: RequestSeq,
        result: Result<UploadReceipt, ConvertClientError>,
    },
    /// The user chose an output format.
    SelectFormat(String),
    /// The user pressed "Convert".
    RequestConversion,
    /// The convert request tagged `seq` completed.
    ConvertFinished {
        seq: RequestSeq,
        result: Result<ConvertReceipt, ConvertClientError>,
    },
}

impl Event {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Event::EnterTool(_) => "EnterTool",
            Event::ReturnHome => "ReturnHome",
            Event::SubmitFile(_) => "SubmitFile",
            Event::UploadFinished { .. } => "UploadFinished",
            Event::SelectFormat(_) => "SelectFormat",
            Event::RequestConversion => "RequestConversion",
            Event::ConvertFinished { .. } => "ConvertFinished",
        }
    }
}
