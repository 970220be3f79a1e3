//! Observer trait: the hook a rendering layer uses to follow a session.
//!
//! Register an [`Arc<dyn SessionObserver>`] with
//! [`crate::controller::Controller::with_observer`] to be told about every
//! state change and every request the controller makes.
//!
//! # Example
//!
//! ```rust
//! use anyfile_convert::{Session, SessionObserver, View};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct Redraws(AtomicUsize);
//!
//! impl SessionObserver for Redraws {
//!     fn on_state_change(&self, _session: &Session, view: &View) {
//!         self.0.fetch_add(1, Ordering::SeqCst);
//!         eprint!("{view}");
//!     }
//! }
//! ```

use crate::session::{RequestKind, RequestSeq, Session};
use crate::view::View;
use std::sync::Arc;

/// Called by the controller as the session evolves.
///
/// All methods default to no-ops so implementations override only what
/// they draw.
pub trait SessionObserver: Send + Sync {
    /// Called after every event that changed the session.
    fn on_state_change(&self, session: &Session, view: &View) {
        let _ = (session, view);
    }

    /// Called just before a request is sent.
    fn on_request_start(&self, kind: RequestKind, seq: RequestSeq) {
        let _ = (kind, seq);
    }

    /// Called when a request's response arrives, before it is applied.
    fn on_request_finish(&self, kind: RequestKind, seq: RequestSeq, ok: bool) {
        let _ = (kind, seq, ok);
    }

    /// Called when a response was dropped because a newer request or a
    /// navigation superseded it.
    fn on_stale_response(&self, kind: RequestKind, seq: RequestSeq) {
        let _ = (kind, seq);
    }
}

/// Observer that ignores everything.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {}

/// Shared observer handle as stored by the controller.
pub type ObserverRef = Arc<dyn SessionObserver>;
