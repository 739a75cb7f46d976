//! The chat connection state machine.
//!
//! [`ChatConnection`] knows nothing about sockets.  The driver reports the three transport events
//! (open, message, close) and user submissions; the state machine updates the chat log and hands
//! back the frames that must be written.  All of the turn-taking rules live here.

use std::fmt;

use crate::observability::{CHAT_APPLICATION_ERRORS, CHAT_REJECTED_SUBMITS};
use crate::types::{
    ConnectionState, FrameKind, Handshake, InboundFrame, InputFrame, Message, OutboundFrame,
};

/// Why a submission was not sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejected {
    /// The input was empty or only whitespace.
    Empty,
    /// The connection is not open.
    NotOpen(ConnectionState),
    /// A previous turn has not been answered yet.
    Pending,
}

impl fmt::Display for SubmitRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitRejected::Empty => write!(f, "nothing to send"),
            SubmitRejected::NotOpen(state) => write!(f, "connection is {state}"),
            SubmitRejected::Pending => write!(f, "still waiting for a response"),
        }
    }
}

/// Connection state, pending indicator, and chat log for one chat view.
///
/// The log outlives individual transports: reconnecting with a new thread keeps what has
/// already been said.
#[derive(Debug, Clone)]
pub struct ChatConnection {
    state: ConnectionState,
    pending: bool,
    handshake: Option<Handshake>,
    log: Vec<Message>,
}

impl ChatConnection {
    /// A closed connection with an empty log.
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Closed,
            pending: false,
            handshake: None,
            log: Vec::new(),
        }
    }

    /// Current transport state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// True while a user turn is awaiting its response.
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// True when [`ChatConnection::submit`] would accept non-empty input.
    pub fn can_submit(&self) -> bool {
        self.state == ConnectionState::Open && !self.pending
    }

    /// The thread the current (or last) transport was opened for.
    pub fn thread_id(&self) -> Option<&str> {
        self.handshake.as_ref().map(|h| h.thread_id.as_str())
    }

    /// The chat log, oldest first.
    pub fn messages(&self) -> &[Message] {
        &self.log
    }

    /// A new transport has been requested for `token` and `thread_id`.
    pub fn connecting(&mut self, token: &str, thread_id: &str) {
        self.state = ConnectionState::Connecting;
        self.pending = false;
        self.handshake = Some(Handshake {
            access_token: token.to_string(),
            thread_id: thread_id.to_string(),
        });
    }

    /// The transport is ready.  Returns the handshake frame, exactly once per transport.
    pub fn on_open(&mut self) -> Option<OutboundFrame> {
        if self.state != ConnectionState::Connecting {
            return None;
        }
        let handshake = self.handshake.clone()?;
        self.state = ConnectionState::Open;
        Some(OutboundFrame::Handshake(handshake))
    }

    /// A text frame arrived.  Returns the log entry it produced, if any.
    pub fn on_message(&mut self, text: &str) -> Option<&Message> {
        self.on_frame(InboundFrame::from_json(text))
    }

    /// A frame arrived and has already been decoded (or failed to decode).
    ///
    /// Application errors and undecodable frames are logged as system entries and leave the
    /// connection open.  Every frame clears the pending indicator.
    pub fn on_frame(&mut self, frame: crate::Result<InboundFrame>) -> Option<&Message> {
        if self.state != ConnectionState::Open {
            return None;
        }
        self.pending = false;
        let entry = match frame {
            Ok(frame) => match frame.kind() {
                FrameKind::Error(error) => {
                    CHAT_APPLICATION_ERRORS.click();
                    Message::system(format!("Error: {error}"))
                }
                FrameKind::Response(response, meta) => Message::assistant(response, meta),
                FrameKind::Empty => return None,
            },
            Err(err) => {
                CHAT_APPLICATION_ERRORS.click();
                Message::system(format!("Error: malformed frame: {err}"))
            }
        };
        self.log.push(entry);
        self.log.last()
    }

    /// The transport is gone.  Returns the close notice, or `None` if already closed.
    pub fn on_close(&mut self, reason: &str) -> Option<&Message> {
        if self.state == ConnectionState::Closed {
            return None;
        }
        self.state = ConnectionState::Closed;
        self.pending = false;
        self.log
            .push(Message::system(format!("Connection closed: {reason}")));
        self.log.last()
    }

    /// Accept a user turn.  On success the message is already in the log, the pending
    /// indicator is set, and the returned frame must be written to the transport.
    pub fn submit(&mut self, input: &str) -> Result<OutboundFrame, SubmitRejected> {
        let rejected = if input.trim().is_empty() {
            Some(SubmitRejected::Empty)
        } else if self.state != ConnectionState::Open {
            Some(SubmitRejected::NotOpen(self.state))
        } else if self.pending {
            Some(SubmitRejected::Pending)
        } else {
            None
        };
        if let Some(rejected) = rejected {
            CHAT_REJECTED_SUBMITS.click();
            return Err(rejected);
        }
        self.log.push(Message::user(input));
        self.pending = true;
        Ok(OutboundFrame::Input(InputFrame {
            input: input.to_string(),
        }))
    }
}

impl Default for ChatConnection {
    fn default() -> Self {
        Self::new()
    }
}
