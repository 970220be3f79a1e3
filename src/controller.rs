//! Session controller: owns the [`Session`], feeds events through the
//! reducer, executes the resulting requests, and tells observers.
//!
//! Step failures (the server rejects a file, a conversion fails) do not
//! come back as `Err`; they land in the session as [`Phase::Failed`] with
//! an error text, and the methods return `Ok(())`. `Err` is reserved for
//! calls that never reached the session: a file the tool does not accept,
//! an action the current phase does not allow, or a failed download.

use crate::config::ToolConfig;
use crate::error::ConvertClientError;
use crate::observer::ObserverRef;
use crate::service::ConversionService;
use crate::session::{perform, transition, Effect, Event, Phase, RequestKind, Session};
use crate::upload::FileUpload;
use crate::view::View;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Name used when neither the response nor the URL names the file.
const FALLBACK_DOWNLOAD_NAME: &str = "converted";

/// Drives one [`Session`] against a [`ConversionService`].
pub struct Controller<S: ?Sized> {
    session: Session,
    service: Arc<S>,
    observers: Vec<ObserverRef>,
}

impl<S> Controller<S>
where
    S: ConversionService + ?Sized,
{
    pub fn new(service: Arc<S>) -> Self {
        Self {
            session: Session::new(),
            service,
            observers: Vec::new(),
        }
    }

    /// Register an observer. Observers are called in registration order.
    pub fn with_observer(mut self, observer: ObserverRef) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn view(&self) -> View {
        View::from_session(&self.session)
    }

    /// The service, for running effects outside the controller.
    pub fn service(&self) -> Arc<S> {
        Arc::clone(&self.service)
    }

    /// Apply one event and return the requests it asks for, without
    /// running them.
    ///
    /// Together with [`crate::session::perform`] this lets a caller keep
    /// several requests in flight and feed their outcomes back in any order.
    pub fn dispatch(&mut self, event: Event) -> Vec<Effect> {
        let response = match &event {
            Event::UploadFinished { seq, .. } => Some((RequestKind::Upload, *seq)),
            Event::ConvertFinished { seq, .. } => Some((RequestKind::Convert, *seq)),
            _ => None,
        };
        let t = transition(&self.session, event);
        if !t.applied {
            if let Some((kind, seq)) = response {
                for obs in &self.observers {
                    obs.on_stale_response(kind, seq);
                }
            }
            return t.effects;
        }
        self.session = t.state;
        if !self.observers.is_empty() {
            let view = self.view();
            for obs in &self.observers {
                obs.on_state_change(&self.session, &view);
            }
        }
        t.effects
    }

    /// Run effects one after another, dispatching each outcome.
    async fn run(&mut self, effects: Vec<Effect>) {
        let mut queue: VecDeque<Effect> = effects.into();
        while let Some(effect) = queue.pop_front() {
            let (kind, seq) = (effect.kind(), effect.seq());
            for obs in &self.observers {
                obs.on_request_start(kind, seq);
            }
            let event = perform(self.service.as_ref(), effect).await;
            let ok = matches!(
                &event,
                Event::UploadFinished { result: Ok(_), .. }
                    | Event::ConvertFinished { result: Ok(_), .. }
            );
            for obs in &self.observers {
                obs.on_request_finish(kind, seq, ok);
            }
            queue.extend(self.dispatch(event));
        }
    }

    /// Open a tool. Resets any upload in progress.
    pub fn enter_tool(&mut self, tool: ToolConfig) {
        info!(tool = %tool.title, output = %tool.output, "Entering tool");
        self.dispatch(Event::EnterTool(tool));
    }

    /// Back to the home screen. Resets everything.
    pub fn return_home(&mut self) {
        info!("Returning home");
        self.dispatch(Event::ReturnHome);
    }

    /// Upload a file and wait for the server's answer.
    ///
    /// On return the session is either awaiting a format choice or failed.
    pub async fn submit_file(&mut self, file: FileUpload) -> Result<(), ConvertClientError> {
        let Some(tool) = self.session.tool() else {
            return Err(self.invalid_state("Uploading a file"));
        };
        if !tool.accept.accepts(file.file_name()) {
            return Err(ConvertClientError::FileNotAccepted {
                file_name: file.file_name().to_string(),
                tool: tool.title.clone(),
                accepted: tool.accept.to_string(),
            });
        }
        let effects = self.dispatch(Event::SubmitFile(file));
        if effects.is_empty() {
            return Err(self.invalid_state("Uploading a file"));
        }
        self.run(effects).await;
        Ok(())
    }

    /// Choose the output format.
    pub fn select_format(&mut self, format: &str) -> Result<(), ConvertClientError> {
        let format = format.trim();
        if self.session.uploaded_file_token().is_none()
            || !matches!(
                self.session.phase(),
                Phase::AwaitingFormatChoice | Phase::Failed
            )
        {
            return Err(self.invalid_state("Choosing a format"));
        }
        if !self.session.can_select(format) {
            let available = match self.session.forced_format() {
                Some(forced) => forced.to_string(),
                None => self.session.available_formats().join(", "),
            };
            return Err(ConvertClientError::FormatNotOffered {
                format: format.to_string(),
                available,
            });
        }
        debug!(%format, "Format selected");
        self.dispatch(Event::SelectFormat(format.to_string()));
        Ok(())
    }

    /// Convert the uploaded file to the selected format and wait for it.
    ///
    /// On return the session is either done or failed.
    pub async fn request_conversion(&mut self) -> Result<(), ConvertClientError> {
        let effects = self.dispatch(Event::RequestConversion);
        if effects.is_empty() {
            return Err(self.invalid_state("Converting"));
        }
        self.run(effects).await;
        Ok(())
    }

    /// Fetch the converted file and write it to `destination`.
    ///
    /// If `destination` is an existing directory, or ends with a path
    /// separator, the file keeps the name the server gave it; missing
    /// directories are created. The write is atomic: bytes go to a `.part` file that
    /// is renamed into place. Returns the final path.
    pub async fn download_to(
        &self,
        destination: impl AsRef<Path>,
    ) -> Result<PathBuf, ConvertClientError> {
        let Some(url) = self.session.download_url() else {
            return Err(self.invalid_state("Downloading"));
        };
        let download = self.service.download(url).await?;

        let destination = destination.as_ref();
        let is_dir = names_directory(destination)
            || tokio::fs::metadata(destination)
                .await
                .map(|m| m.is_dir())
                .unwrap_or(false);
        let path = if is_dir {
            destination.join(
                download
                    .file_name
                    .as_deref()
                    .unwrap_or(FALLBACK_DOWNLOAD_NAME),
            )
        } else {
            destination.to_path_buf()
        };

        write_atomically(&path, &download.bytes).await?;
        info!("Saved {} bytes to {}", download.bytes.len(), path.display());
        Ok(path)
    }

    fn invalid_state(&self, operation: &'static str) -> ConvertClientError {
        let phase = if self.session.tool().is_none() {
            "on the home screen".to_string()
        } else {
            self.session.phase().to_string()
        };
        ConvertClientError::InvalidState { operation, phase }
    }
}

/// `out/` names a directory even before it exists.
fn names_directory(path: &Path) -> bool {
    path.as_os_str()
        .to_string_lossy()
        .ends_with(['/', std::path::MAIN_SEPARATOR])
}

/// Write to a sibling `.part` file, then rename over `path`.
async fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), ConvertClientError> {
    let write_err = |source: std::io::Error| ConvertClientError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".part");
    let tmp_path = PathBuf::from(tmp);

    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
    Ok(())
}
