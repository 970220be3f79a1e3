//! The session value: everything the UI needs to know about one tool run.

use crate::config::ToolConfig;
use serde::Serialize;
use std::fmt;

/// Sequence number attached to every network request.
pub type RequestSeq = u64;

/// Which screen is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Mode {
    #[default]
    Home,
    Tool,
}

/// Where the upload/convert flow currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Phase {
    #[default]
    Idle,
    Uploading,
    AwaitingFormatChoice,
    Converting,
    Done,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Idle => "idle",
            Phase::Uploading => "uploading",
            Phase::AwaitingFormatChoice => "awaiting a format choice",
            Phase::Converting => "converting",
            Phase::Done => "done",
            Phase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One conversion session.
///
/// Only [`crate::session::transition`] produces new sessions, so the
/// invariants checked by [`Session::invariants_hold`] are maintained by
/// construction. Fields are read through accessors.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Session {
    pub(crate) mode: Mode,
    pub(crate) tool: Option<ToolConfig>,
    pub(crate) file_name: Option<String>,
    pub(crate) uploaded_file_token: Option<String>,
    pub(crate) available_formats: Vec<String>,
    pub(crate) selected_format: Option<String>,
    pub(crate) phase: Phase,
    pub(crate) error_text: Option<String>,
    pub(crate) download_url: Option<String>,
    /// Last sequence number handed out. Survives resets so numbers never repeat.
    pub(crate) request_seq: RequestSeq,
    /// The one request whose response is still wanted.
    pub(crate) pending: Option<RequestSeq>,
}

impl Session {
    /// A fresh session: home screen, nothing uploaded.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn tool(&self) -> Option<&ToolConfig> {
        self.tool.as_ref()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn uploaded_file_token(&self) -> Option<&str> {
        self.uploaded_file_token.as_deref()
    }

    pub fn available_formats(&self) -> &[String] {
        &self.available_formats
    }

    pub fn selected_format(&self) -> Option<&str> {
        self.selected_format.as_deref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn error_text(&self) -> Option<&str> {
        self.error_text.as_deref()
    }

    pub fn download_url(&self) -> Option<&str> {
        self.download_url.as_deref()
    }

    /// Sequence number of the in-flight request, if one is outstanding.
    pub fn pending_request(&self) -> Option<RequestSeq> {
        self.pending
    }

    /// The active tool's forced output format.
    pub fn forced_format(&self) -> Option<&str> {
        self.tool.as_ref().and_then(ToolConfig::forced_format)
    }

    /// Whether the format choice is fixed by the tool.
    pub fn is_format_locked(&self) -> bool {
        self.forced_format().is_some()
    }

    /// Whether a new file may be submitted right now.
    pub fn can_submit(&self) -> bool {
        self.mode == Mode::Tool
            && matches!(self.phase, Phase::Idle | Phase::Failed | Phase::Uploading)
    }

    /// Whether `request_conversion` would start a conversion.
    pub fn can_convert(&self) -> bool {
        self.phase == Phase::AwaitingFormatChoice
            && self.uploaded_file_token.is_some()
            && self.selected_format.is_some()
    }

    /// The server's spelling of `format`, if it was offered. Format ids
    /// compare case-insensitively.
    pub fn offered_format(&self, format: &str) -> Option<&str> {
        let format = format.trim();
        self.available_formats
            .iter()
            .find(|f| f.eq_ignore_ascii_case(format))
            .map(String::as_str)
    }

    /// Whether `format` may be selected right now.
    pub fn can_select(&self, format: &str) -> bool {
        if self.uploaded_file_token.is_none()
            || !matches!(self.phase, Phase::AwaitingFormatChoice | Phase::Failed)
        {
            return false;
        }
        if let Some(forced) = self.forced_format() {
            if !forced.eq_ignore_ascii_case(format.trim()) {
                return false;
            }
        }
        self.offered_format(format).is_some()
    }

    /// Check the structural invariants of the session.
    pub fn invariants_hold(&self) -> bool {
        let token_ok = match self.phase {
            Phase::AwaitingFormatChoice | Phase::Converting | Phase::Done => {
                self.uploaded_file_token.is_some()
            }
            Phase::Idle | Phase::Uploading => self.uploaded_file_token.is_none(),
            Phase::Failed => true,
        };
        let url_ok = self.download_url.is_some() == (self.phase == Phase::Done);
        let forced_ok = match (self.forced_format(), self.selected_format.as_deref()) {
            (Some(forced), Some(selected)) => forced.eq_ignore_ascii_case(selected),
            _ => true,
        };
        let tool_ok = (self.mode == Mode::Tool) == self.tool.is_some();
        token_ok && url_ok && forced_ok && tool_ok
    }

    /// Hand out the next request sequence number.
    pub(crate) fn next_seq(&mut self) -> RequestSeq {
        self.request_seq += 1;
        self.request_seq
    }

    /// Clear every upload/convert field, keeping mode, tool and sequencing.
    pub(crate) fn reset_upload(&mut self) {
        self.file_name = None;
        self.uploaded_file_token = None;
        self.available_formats.clear();
        self.selected_format = None;
        self.phase = Phase::Idle;
        self.error_text = None;
        self.download_url = None;
        self.pending = None;
    }
}
