//! Upload/convert session state machine.
//!
//! Elm-style: a [`Session`] value, [`Event`]s that describe what happened,
//! a pure [`transition`] function, and [`Effect`]s for the network calls the
//! transition wants made.
//!
//! ```text
//!             ┌──────── Event ────────┐
//!             ▼                       │
//!  Session ─▶ transition ─▶ Session'  │
//!                 │                   │
//!                 └─▶ Effect ─▶ perform(service) ─┘
//! ```
//!
//! Every request carries a sequence number. Only the response to the most
//! recent request is applied; anything older is dropped, including responses
//! that arrive after the user navigated away.

pub mod effect;
pub mod event;
pub mod state;
pub mod transition;

pub use effect::{perform, Effect, RequestKind};
pub use event::Event;
pub use state::{Mode, Phase, RequestSeq, Session};
pub use transition::{transition, unsupported_format_message, Transition, NO_SUPPORTED_CONVERSIONS};
