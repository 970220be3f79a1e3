//! What the UI shows for a given session.
//!
//! [`View::from_session`] is the whole rendering contract: any front end
//! (the `anyconvert` terminal client, a web page, a test) draws exactly
//! the affordances listed here and nothing else.

use crate::session::{Mode, Phase, Session};
use serde::Serialize;
use std::fmt;

/// Which screen is up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Screen {
    Home,
    Tool,
}

/// One entry of the format drop-down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatOption {
    /// Format id sent to the service.
    pub value: String,
    /// Uppercased id shown to the user.
    pub label: String,
}

/// The output format drop-down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormatSelector {
    pub options: Vec<FormatOption>,
    pub selected: Option<String>,
    /// The tool forces the format; the drop-down is not interactive.
    pub locked: bool,
}

/// Visible affordances for one session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct View {
    pub screen: Screen,
    pub tool_title: Option<String>,
    pub tool_description: Option<String>,
    pub show_upload_trigger: bool,
    pub file_info: Option<String>,
    pub format_selector: Option<FormatSelector>,
    pub show_convert_button: bool,
    pub show_progress: bool,
    pub download_link: Option<String>,
    pub error_message: Option<String>,
}

impl View {
    pub fn from_session(session: &Session) -> Self {
        let tool = session.tool();
        let in_tool = session.mode() == Mode::Tool;
        let phase = session.phase();

        let show_upload_trigger = in_tool && matches!(phase, Phase::Idle | Phase::Failed);
        let file_info = if phase == Phase::Uploading || session.uploaded_file_token().is_some() {
            session.file_name().map(str::to_string)
        } else {
            None
        };

        Self {
            screen: if in_tool { Screen::Tool } else { Screen::Home },
            tool_title: tool.map(|t| t.title.clone()),
            tool_description: tool.map(|t| t.description.clone()),
            show_upload_trigger,
            file_info,
            format_selector: format_selector(session),
            show_convert_button: session.can_convert(),
            show_progress: matches!(phase, Phase::Uploading | Phase::Converting),
            download_link: session.download_url().map(str::to_string),
            error_message: session.error_text().map(str::to_string),
        }
    }
}

fn format_selector(session: &Session) -> Option<FormatSelector> {
    if session.uploaded_file_token().is_none()
        || !matches!(
            session.phase(),
            Phase::AwaitingFormatChoice | Phase::Failed
        )
    {
        return None;
    }
    let values: Vec<&str> = match session.forced_format() {
        Some(forced) => vec![forced],
        None => session
            .available_formats()
            .iter()
            .map(String::as_str)
            .collect(),
    };
    if values.is_empty() {
        return None;
    }
    Some(FormatSelector {
        options: values
            .into_iter()
            .map(|v| FormatOption {
                value: v.to_string(),
                label: v.to_uppercase(),
            })
            .collect(),
        selected: session.selected_format().map(str::to_string),
        locked: session.is_format_locked(),
    })
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.screen == Screen::Home {
            return writeln!(f, "[home] choose a tool");
        }
        if let Some(ref title) = self.tool_title {
            writeln!(f, "== {title} ==")?;
        }
        if let Some(ref desc) = self.tool_description {
            writeln!(f, "{desc}")?;
        }
        if let Some(ref name) = self.file_info {
            writeln!(f, "file: {name}")?;
        }
        if self.show_progress {
            writeln!(f, "working…")?;
        }
        if let Some(ref sel) = self.format_selector {
            let labels: Vec<String> = sel
                .options
                .iter()
                .map(|o| {
                    if sel.selected.as_deref() == Some(o.value.as_str()) {
                        format!("[{}]", o.label)
                    } else {
                        o.label.clone()
                    }
                })
                .collect();
            let lock = if sel.locked { " (locked)" } else { "" };
            writeln!(f, "format: {}{lock}", labels.join(" "))?;
        }
        if self.show_convert_button {
            writeln!(f, "ready to convert")?;
        }
        if let Some(ref link) = self.download_link {
            writeln!(f, "download: {link}")?;
        }
        if let Some(ref err) = self.error_message {
            writeln!(f, "error: {err}")?;
        }
        if self.show_upload_trigger {
            writeln!(f, "upload a file to begin")?;
        }
        Ok(())
    }
}
