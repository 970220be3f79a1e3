//! The reducer: `(Session, Event) → (Session, Effects)`.
//!
//! Pure and synchronous. Every rule about which action is legal in which
//! phase lives here; the controller only executes the effects it returns.

use super::effect::Effect;
use super::event::Event;
use super::state::{Mode, Phase, RequestSeq, Session};
use crate::error::ConvertClientError;
use crate::service::{ConvertReceipt, UploadReceipt};
use tracing::debug;

/// Message shown when the server offers no output format at all.
pub const NO_SUPPORTED_CONVERSIONS: &str = "No supported conversions for this file.";

/// Result of applying one event.
#[derive(Debug)]
pub struct Transition {
    pub state: Session,
    pub effects: Vec<Effect>,
    /// `false` when the event was ignored or a stale response was discarded.
    pub applied: bool,
}

impl Transition {
    fn applied(state: Session, effects: Vec<Effect>) -> Self {
        Self {
            state,
            effects,
            applied: true,
        }
    }

    fn ignored(state: &Session) -> Self {
        Self {
            state: state.clone(),
            effects: Vec::new(),
            applied: false,
        }
    }
}

/// Message for a forced format the server does not offer.
pub fn unsupported_format_message(format: &str) -> String {
    format!(
        "Conversion to {} not supported for this file.",
        format.to_uppercase()
    )
}

/// Apply `event` to `state`.
pub fn transition(state: &Session, event: Event) -> Transition {
    let name = event.name();
    match event {
        Event::EnterTool(tool) => {
            let mut next = state.clone();
            next.reset_upload();
            next.mode = Mode::Tool;
            next.tool = Some(tool);
            Transition::applied(next, Vec::new())
        }
        Event::ReturnHome => {
            let next = Session {
                request_seq: state.request_seq,
                ..Session::default()
            };
            Transition::applied(next, Vec::new())
        }
        Event::SubmitFile(file) => {
            if !state.can_submit() {
                debug!(event = name, mode = ?state.mode, phase = %state.phase, "Ignoring event");
                return Transition::ignored(state);
            }
            let mut next = state.clone();
            next.reset_upload();
            let seq = next.next_seq();
            next.file_name = Some(file.file_name().to_string());
            next.phase = Phase::Uploading;
            next.pending = Some(seq);
            Transition::applied(next, vec![Effect::Upload { seq, file }])
        }
        Event::UploadFinished { seq, result } => {
            if !is_current(state, seq, Phase::Uploading) {
                debug!(seq, pending = ?state.pending, "Discarding stale upload response");
                return Transition::ignored(state);
            }
            let mut next = state.clone();
            next.pending = None;
            apply_upload_result(&mut next, result);
            Transition::applied(next, Vec::new())
        }
        Event::SelectFormat(format) => {
            if !state.can_select(&format) {
                debug!(event = name, %format, phase = %state.phase, "Ignoring event");
                return Transition::ignored(state);
            }
            let mut next = state.clone();
            next.selected_format = state.offered_format(&format).map(str::to_string);
            if next.phase == Phase::Failed {
                next.phase = Phase::AwaitingFormatChoice;
                next.error_text = None;
            }
            Transition::applied(next, Vec::new())
        }
        Event::RequestConversion => {
            if !state.can_convert() {
                debug!(event = name, phase = %state.phase, "Ignoring event");
                return Transition::ignored(state);
            }
            let (Some(file_token), Some(format)) =
                (state.uploaded_file_token.clone(), state.selected_format.clone())
            else {
                return Transition::ignored(state);
            };
            let mut next = state.clone();
            let seq = next.next_seq();
            next.phase = Phase::Converting;
            next.error_text = None;
            next.pending = Some(seq);
            Transition::applied(
                next,
                vec![Effect::Convert {
                    seq,
                    file_token,
                    format,
                }],
            )
        }
        Event::ConvertFinished { seq, result } => {
            if !is_current(state, seq, Phase::Converting) {
                debug!(seq, pending = ?state.pending, "Discarding stale convert response");
                return Transition::ignored(state);
            }
            let mut next = state.clone();
            next.pending = None;
            apply_convert_result(&mut next, result);
            Transition::applied(next, Vec::new())
        }
    }
}

fn is_current(state: &Session, seq: RequestSeq, phase: Phase) -> bool {
    state.pending == Some(seq) && state.phase == phase
}

fn apply_upload_result(next: &mut Session, result: Result<UploadReceipt, ConvertClientError>) {
    let receipt = match result {
        Ok(receipt) => receipt,
        Err(e) => {
            fail_upload(next, e.upload_message());
            return;
        }
    };
    if receipt.supported_formats.is_empty() {
        fail_upload(next, NO_SUPPORTED_CONVERSIONS.to_string());
        return;
    }
    let selected = match next.forced_format() {
        Some(forced) => match receipt
            .supported_formats
            .iter()
            .find(|f| f.eq_ignore_ascii_case(forced))
        {
            Some(offered) => offered.clone(),
            None => {
                let message = unsupported_format_message(forced);
                fail_upload(next, message);
                return;
            }
        },
        None => receipt.supported_formats[0].clone(),
    };
    next.uploaded_file_token = Some(receipt.file_token);
    next.available_formats = receipt.supported_formats;
    next.selected_format = Some(selected);
    next.phase = Phase::AwaitingFormatChoice;
}

fn fail_upload(next: &mut Session, message: String) {
    next.uploaded_file_token = None;
    next.available_formats.clear();
    next.selected_format = None;
    next.phase = Phase::Failed;
    next.error_text = Some(message);
}

fn apply_convert_result(next: &mut Session, result: Result<ConvertReceipt, ConvertClientError>) {
    match result {
        Ok(receipt) => {
            next.download_url = Some(receipt.download_url);
            next.phase = Phase::Done;
        }
        Err(e) => {
            next.phase = Phase::Failed;
            next.error_text = Some(e.convert_message());
        }
    }
}
