//! Chat application module for conversing with the companion backend.
//!
//! This module provides the chat view built on top of the confidant
//! client library. It supports:
//!
//! - One WebSocket connection per view, scoped to a conversation thread
//! - An append-only conversation log that survives reconnects
//! - Slash commands for session control
//! - ANSI-styled output for reply metadata
//!
//! # Architecture
//!
//! The module is organized into several components:
//!
//! - [`connection`]: The connection state machine, independent of any I/O
//! - [`transport`]: The WebSocket transport and the seam tests substitute
//! - `session`: Drives a connection over a transport
//! - `config`: CLI argument parsing and configuration
//! - `commands`: Slash command parsing
//! - `render`: Terminal output

mod commands;
mod config;
pub mod connection;
mod render;
mod session;
pub mod transport;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{AuthAction, ChatArgs, ChatConfig, DEFAULT_THREAD_ID};
pub use connection::{ChatConnection, SubmitRejected};
pub use render::{PlainTextRenderer, Renderer};
pub use session::{CLIENT_CLOSE_REASON, ChatEvent, ChatSession, SubmitOutcome};
pub use transport::{Connector, Transport, TransportEvent, WebSocketConnector, WebSocketTransport};
