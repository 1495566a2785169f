//! Telegram side of the felis relay.
//!
//! Receives updates from the Telegram Bot API, routes them per user and mode
//! to the QnA backend, and sends formatted replies back, editing the
//! "working..." acknowledgment in place when possible.

pub mod bot;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod handlers;
pub mod outbound;
pub mod replies;
pub mod service;
pub mod state;
pub mod transport;
pub mod update;

pub use {
    config::{FlowTimeouts, RelaySettings},
    dispatch::Dispatcher,
    error::{Error, Result},
    format::{FormatLimits, format_response},
    handlers::Relay,
    replies::Notice,
    state::{InFlightGuard, UserStateStore},
    transport::{ChatTransport, RenderMode},
    update::{Action, DocumentRef, Inbound},
};
