//! Core chat session management.
//!
//! This module provides the `ChatSession` struct, which binds a [`ChatConnection`] to at most one
//! live [`Transport`] and pumps events between them.

use std::sync::Arc;

use futures::FutureExt;

use crate::chat::connection::{ChatConnection, SubmitRejected};
use crate::chat::transport::{Connector, Transport, TransportEvent};
use crate::client_logger::ClientLogger;
use crate::error::Result;
use crate::observability::{CHAT_CLOSES, CHAT_CONNECTS, CHAT_FRAMES_RECEIVED, CHAT_FRAMES_SENT};
use crate::types::{ConnectionState, InboundFrame, Message, OutboundFrame};

/// The reason recorded when the client tears the transport down itself.
pub const CLIENT_CLOSE_REASON: &str = "closed by client";

/// What happened in response to one transport event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// A log entry was appended.
    Message(Message),
    /// A frame arrived but produced no log entry.
    Ignored,
    /// The transport closed; the close notice has been appended to the log.
    Closed(String),
}

/// Outcome of [`ChatSession::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The turn was logged and its frame written.
    Sent,
    /// Nothing happened.
    Rejected(SubmitRejected),
}

/// A chat view's connection: its log, its state, and its one transport.
pub struct ChatSession<C: Connector> {
    connector: C,
    connection: ChatConnection,
    transport: Option<Box<dyn Transport>>,
    logger: Option<Arc<dyn ClientLogger>>,
}

impl<C: Connector> ChatSession<C> {
    /// Creates a new, closed chat session that will dial through `connector`.
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            connection: ChatConnection::new(),
            transport: None,
            logger: None,
        }
    }

    /// Attach a logger that sees every frame.
    pub fn with_logger(mut self, logger: Arc<dyn ClientLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// The chat log, oldest first.
    pub fn messages(&self) -> &[Message] {
        self.connection.messages()
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// True while a user turn is awaiting its response.
    pub fn is_pending(&self) -> bool {
        self.connection.is_pending()
    }

    /// True when a new turn would be accepted.
    pub fn can_submit(&self) -> bool {
        self.connection.can_submit()
    }

    /// The thread the current (or last) transport was opened for.
    pub fn thread_id(&self) -> Option<&str> {
        self.connection.thread_id()
    }

    /// Open a transport for `token` and `thread_id`, closing any transport that is still live.
    ///
    /// On success the handshake has been written.  On failure the failure is recorded in the log
    /// as a close notice, the session is left closed, and the error is returned.
    pub async fn open(&mut self, token: &str, thread_id: &str) -> Result<()> {
        self.close().await;
        self.connection.connecting(token, thread_id);
        CHAT_CONNECTS.click();
        let transport = match self.connector.connect().await {
            Ok(transport) => transport,
            Err(err) => {
                tracing::warn!(error = %err, "chat connection failed");
                self.record_close(&err.to_string());
                return Err(err);
            }
        };
        self.transport = Some(transport);
        tracing::info!(thread_id, "chat connection open");
        if let Some(handshake) = self.connection.on_open() {
            self.write(handshake).await?;
        }
        Ok(())
    }

    /// Tear down the live transport, if any.
    pub async fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(err) = transport.close().await {
                tracing::debug!(error = %err, "error while closing chat transport");
            }
            self.record_close(CLIENT_CLOSE_REASON);
        }
    }

    /// Submit one user turn.
    ///
    /// A rejected submission changes nothing.  If writing the frame fails the transport is
    /// dropped, the failure is logged as a close notice, and the error is returned.
    pub async fn submit(&mut self, input: &str) -> Result<SubmitOutcome> {
        match self.connection.submit(input) {
            Ok(frame) => {
                self.write(frame).await?;
                Ok(SubmitOutcome::Sent)
            }
            Err(rejected) => {
                tracing::debug!(%rejected, "submission rejected");
                Ok(SubmitOutcome::Rejected(rejected))
            }
        }
    }

    /// Wait for and apply the next transport event.  Returns `None` when there is no transport.
    pub async fn next_event(&mut self) -> Option<ChatEvent> {
        let transport = self.transport.as_mut()?;
        match transport.recv().await {
            TransportEvent::Frame(text) => {
                CHAT_FRAMES_RECEIVED.click();
                tracing::debug!(frame = %text, "chat frame received");
                let decoded = InboundFrame::from_json(&text);
                if let (Some(logger), Ok(frame)) = (&self.logger, &decoded) {
                    logger.log_inbound(frame);
                }
                match self.connection.on_frame(decoded) {
                    Some(message) => Some(ChatEvent::Message(message.clone())),
                    None => Some(ChatEvent::Ignored),
                }
            }
            TransportEvent::Closed(reason) => {
                self.transport = None;
                self.record_close(&reason);
                Some(ChatEvent::Closed(reason))
            }
        }
    }

    /// Apply every transport event that is already available, without waiting.
    ///
    /// Call this before acting on the session while the user was idle, so that a close that
    /// arrived in the meantime is recorded before the next submit.
    pub fn poll_events(&mut self) -> Vec<ChatEvent> {
        let mut events = Vec::new();
        while self.transport.is_some() {
            let Some(Some(event)) = self.next_event().now_or_never() else {
                break;
            };
            let closed = matches!(event, ChatEvent::Closed(_));
            events.push(event);
            if closed {
                break;
            }
        }
        events
    }

    /// Pump events until the pending turn is answered or the transport closes.  Returns the log
    /// entries appended along the way.
    pub async fn wait_for_reply(&mut self) -> Vec<Message> {
        let mut appended = Vec::new();
        while self.connection.is_pending() {
            match self.next_event().await {
                Some(ChatEvent::Message(message)) => appended.push(message),
                Some(ChatEvent::Ignored) => {}
                Some(ChatEvent::Closed(_)) | None => {
                    if let Some(last) = self.connection.messages().last() {
                        appended.push(last.clone());
                    }
                    break;
                }
            }
        }
        appended
    }

    async fn write(&mut self, frame: OutboundFrame) -> Result<()> {
        let Some(transport) = self.transport.as_mut() else {
            return Ok(());
        };
        if let Some(logger) = &self.logger {
            logger.log_outbound(&frame);
        }
        let text = frame.to_json()?;
        match transport.send(text).await {
            Ok(()) => {
                CHAT_FRAMES_SENT.click();
                match &frame {
                    // The handshake carries the bearer token; keep it out of the trace.
                    OutboundFrame::Handshake(handshake) => {
                        tracing::debug!(thread_id = %handshake.thread_id, "chat handshake sent");
                    }
                    OutboundFrame::Input(input) => {
                        tracing::debug!(input = %input.input, "chat frame sent");
                    }
                }
                Ok(())
            }
            Err(err) => {
                tracing::warn!(error = %err, "chat send failed");
                self.transport = None;
                self.record_close(&err.to_string());
                Err(err)
            }
        }
    }

    fn record_close(&mut self, reason: &str) {
        if self.connection.on_close(reason).is_some() {
            CHAT_CLOSES.click();
            tracing::info!(reason, "chat connection closed");
            if let Some(logger) = &self.logger {
                logger.log_close(reason);
            }
        }
    }
}
