use serde::{Deserialize, Serialize};

use crate::types::MessageMeta;

/// The first frame sent once the chat socket is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    /// Bearer token identifying the user.
    pub access_token: String,

    /// Conversation scope on the backend.
    pub thread_id: String,
}

/// One user turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFrame {
    /// The raw text the user submitted.
    pub input: String,
}

/// A frame the client writes to the chat socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutboundFrame {
    /// Credentials and thread scope, sent once per connection.
    Handshake(Handshake),

    /// A user turn.
    Input(InputFrame),
}

impl OutboundFrame {
    /// Serialize this frame to the JSON text written on the wire.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// A frame received from the chat socket.
///
/// The backend sends either `{error}` or `{response, ...metadata}`; both shapes decode into
/// this one struct and [`InboundFrame::kind`] tells them apart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_crisis: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attack: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub journal_entry: Option<String>,
}

/// What an inbound frame means to the chat log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameKind<'a> {
    /// The backend rejected or failed the turn.
    Error(&'a str),

    /// The assistant's reply and its metadata.
    Response(&'a str, MessageMeta),

    /// Neither field was present.
    Empty,
}

impl InboundFrame {
    /// Decode a frame from the JSON text received on the wire.
    pub fn from_json(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Classify the frame.  An `error` field wins over a `response` field.  Empty strings
    /// count as absent.
    pub fn kind(&self) -> FrameKind<'_> {
        if let Some(error) = self.error.as_deref().filter(|e| !e.is_empty()) {
            return FrameKind::Error(error);
        }
        match self.response.as_deref().filter(|r| !r.is_empty()) {
            Some(response) => FrameKind::Response(response, self.meta()),
            None => FrameKind::Empty,
        }
    }

    /// The metadata carried alongside a response, copied verbatim.
    pub fn meta(&self) -> MessageMeta {
        MessageMeta {
            emotion: self.emotion.clone(),
            mode: self.mode.clone(),
            is_crisis: self.is_crisis,
            attack: self.attack.clone(),
            journal_entry: self.journal_entry.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn handshake_wire_format() {
        let frame = OutboundFrame::Handshake(Handshake {
            access_token: "tok".to_string(),
            thread_id: "default".to_string(),
        });
        assert_eq!(
            to_value(&frame).unwrap(),
            json!({"access_token": "tok", "thread_id": "default"})
        );
    }

    #[test]
    fn input_wire_format() {
        let frame = OutboundFrame::Input(InputFrame {
            input: "  hello  ".to_string(),
        });
        assert_eq!(frame.to_json().unwrap(), r#"{"input":"  hello  "}"#);
    }

    #[test]
    fn error_frame_kind() {
        let frame = InboundFrame::from_json(r#"{"error":"rate limited"}"#).unwrap();
        assert_eq!(frame.kind(), FrameKind::Error("rate limited"));
    }

    #[test]
    fn response_frame_carries_metadata() {
        let frame = InboundFrame::from_json(
            r#"{"response":"hi","emotion":"calm","mode":"chat","is_crisis":false,"attack":"safe","journal_entry":null}"#,
        )
        .unwrap();
        match frame.kind() {
            FrameKind::Response(text, meta) => {
                assert_eq!(text, "hi");
                assert_eq!(meta.emotion.as_deref(), Some("calm"));
                assert_eq!(meta.mode.as_deref(), Some("chat"));
                assert_eq!(meta.is_crisis, Some(false));
                assert_eq!(meta.attack.as_deref(), Some("safe"));
                assert!(meta.journal_entry.is_none());
            }
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn error_wins_over_response() {
        let frame = InboundFrame::from_json(r#"{"error":"boom","response":"hi"}"#).unwrap();
        assert_eq!(frame.kind(), FrameKind::Error("boom"));
    }

    #[test]
    fn empty_frame() {
        let frame = InboundFrame::from_json(r#"{"unrelated":1}"#).unwrap();
        assert_eq!(frame.kind(), FrameKind::Empty);
    }

    #[test]
    fn empty_strings_count_as_absent() {
        let frame = InboundFrame::from_json(r#"{"error":"","response":"hi"}"#).unwrap();
        assert!(matches!(frame.kind(), FrameKind::Response("hi", _)));
        let frame = InboundFrame::from_json(r#"{"response":"","emotion":"calm"}"#).unwrap();
        assert_eq!(frame.kind(), FrameKind::Empty);
        let frame = InboundFrame::from_json(r#"{"error":""}"#).unwrap();
        assert_eq!(frame.kind(), FrameKind::Empty);
    }

    #[test]
    fn malformed_frame_is_serialization_error() {
        let err = InboundFrame::from_json("not json").unwrap_err();
        assert!(matches!(err, crate::Error::Serialization { .. }));
    }
}
