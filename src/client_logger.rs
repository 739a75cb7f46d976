//! Logging trait for chat traffic.
//!
//! This module provides the [`ClientLogger`] trait that allows users to capture every frame that
//! passes through a [`ChatSession`](crate::chat::ChatSession).

use crate::types::{InboundFrame, OutboundFrame};

/// A trait for logging chat socket traffic.
///
/// Implement this trait to record the conversation as it crosses the wire, including frames
/// that did not change the chat log.
///
/// # Example
///
/// ```rust,ignore
/// use confidant::{ClientLogger, InboundFrame, OutboundFrame};
/// use std::io::Write;
/// use std::sync::Mutex;
///
/// struct FileLogger {
///     file: Mutex<std::fs::File>,
/// }
///
/// impl ClientLogger for FileLogger {
///     fn log_outbound(&self, frame: &OutboundFrame) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "> {}", serde_json::to_string(frame).unwrap()).unwrap();
///     }
///
///     fn log_inbound(&self, frame: &InboundFrame) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "< {}", serde_json::to_string(frame).unwrap()).unwrap();
///     }
///
///     fn log_close(&self, reason: &str) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "closed: {reason}").unwrap();
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log a frame just before it is written to the socket.
    ///
    /// The handshake frame carries the bearer token; implementations that persist frames
    /// should take care with it.
    fn log_outbound(&self, frame: &OutboundFrame);

    /// Log a frame that decoded successfully.
    fn log_inbound(&self, frame: &InboundFrame);

    /// Log the end of a connection.
    fn log_close(&self, reason: &str);
}
