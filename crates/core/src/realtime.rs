//! Realtime channel messages and their default notifications.
//!
//! The transport lives in the client crate; this module only knows the
//! wire shape and how a message maps onto a [`Notice`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::notice::{Notice, NoticeLevel};
use crate::types::UserId;

/// Message kind carried in the `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MessageKind {
    NewMessage,
    InterviewReminder,
    ApplicationUpdate,
    SystemNotice,
    /// Anything else. Delivered to handlers, never notified.
    Unknown(String),
}

impl MessageKind {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::NewMessage => "new_message",
            Self::InterviewReminder => "interview_reminder",
            Self::ApplicationUpdate => "application_update",
            Self::SystemNotice => "system_notice",
            Self::Unknown(kind) => kind,
        }
    }
}

impl From<String> for MessageKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "new_message" => Self::NewMessage,
            "interview_reminder" => Self::InterviewReminder,
            "application_update" => Self::ApplicationUpdate,
            "system_notice" => Self::SystemNotice,
            _ => Self::Unknown(kind),
        }
    }
}

impl From<&str> for MessageKind {
    fn from(kind: &str) -> Self {
        Self::from(kind.to_owned())
    }
}

impl From<MessageKind> for String {
    fn from(kind: MessageKind) -> Self {
        match kind {
            MessageKind::Unknown(kind) => kind,
            known => known.as_str().to_owned(),
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscription key: one kind, or every message.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    Kind(MessageKind),
    Wildcard,
}

impl Topic {
    pub const WILDCARD: &'static str = "*";
}

impl From<MessageKind> for Topic {
    fn from(kind: MessageKind) -> Self {
        Self::Kind(kind)
    }
}

impl std::str::FromStr for Topic {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == Self::WILDCARD {
            Ok(Self::Wildcard)
        } else {
            Ok(Self::Kind(MessageKind::from(s)))
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Kind(kind) => kind.fmt(f),
            Self::Wildcard => f.write_str(Self::WILDCARD),
        }
    }
}

/// Inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Envelope {
    /// Parse one text frame.
    ///
    /// # Errors
    ///
    /// Returns the JSON error when the frame is not a valid envelope.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    fn data_str(&self, field: &str) -> Option<&str> {
        self.data
            .get(field)
            .and_then(serde_json::Value::as_str)
            .filter(|value| !value.is_empty())
    }
}

/// Outbound message. There is no `user_id`: the server knows who is sending.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutboundMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub data: serde_json::Value,
}

/// The built-in notification for a message, if its kind has one.
#[must_use]
pub fn notice_for(envelope: &Envelope) -> Option<Notice> {
    let (level, title, message, secs) = match envelope.kind {
        MessageKind::NewMessage => (
            NoticeLevel::Info,
            "New message",
            envelope.data_str("title").unwrap_or("You have a new message"),
            5,
        ),
        MessageKind::InterviewReminder => (
            NoticeLevel::Warning,
            "Interview reminder",
            envelope
                .data_str("message")
                .unwrap_or("You have an interview starting soon"),
            10,
        ),
        MessageKind::ApplicationUpdate => (
            NoticeLevel::Success,
            "Application update",
            envelope
                .data_str("message")
                .unwrap_or("Your application status has changed"),
            5,
        ),
        MessageKind::SystemNotice => (
            NoticeLevel::Info,
            "System notice",
            envelope.data_str("message").unwrap_or_default(),
            8,
        ),
        MessageKind::Unknown(_) => return None,
    };
    Some(Notice::titled(level, title, message, Duration::from_secs(secs)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_kind() {
        let envelope =
            Envelope::parse(r#"{"type":"new_message","user_id":3,"data":{"title":"Hi"}}"#).unwrap();
        assert_eq!(envelope.kind, MessageKind::NewMessage);
        assert_eq!(envelope.user_id, Some(UserId::new(3)));

        let notice = notice_for(&envelope).unwrap();
        assert_eq!(notice.level, NoticeLevel::Info);
        assert_eq!(notice.message, "Hi");
        assert_eq!(notice.duration, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_parse_unknown_kind() {
        let envelope = Envelope::parse(r#"{"type":"typing","data":null}"#).unwrap();
        assert_eq!(envelope.kind, MessageKind::Unknown("typing".into()));
        assert!(notice_for(&envelope).is_none());
    }

    #[test]
    fn test_malformed_frames_are_errors() {
        assert!(Envelope::parse("not json").is_err());
        assert!(Envelope::parse(r#"{"data":{}}"#).is_err());
    }

    #[test]
    fn test_notice_fallback_messages() {
        let reminder = Envelope::parse(r#"{"type":"interview_reminder","data":{}}"#).unwrap();
        let notice = notice_for(&reminder).unwrap();
        assert_eq!(notice.level, NoticeLevel::Warning);
        assert_eq!(notice.message, "You have an interview starting soon");
        assert_eq!(notice.duration, Some(Duration::from_secs(10)));

        let update = Envelope::parse(r#"{"type":"application_update","data":{"message":""}}"#).unwrap();
        let notice = notice_for(&update).unwrap();
        assert_eq!(notice.level, NoticeLevel::Success);
        assert_eq!(notice.message, "Your application status has changed");

        let system = Envelope::parse(r#"{"type":"system_notice","data":{"message":"Maintenance"}}"#).unwrap();
        let notice = notice_for(&system).unwrap();
        assert_eq!(notice.duration, Some(Duration::from_secs(8)));
        assert_eq!(notice.message, "Maintenance");
    }

    #[test]
    fn test_topic_parse() {
        assert_eq!("*".parse::<Topic>().unwrap(), Topic::Wildcard);
        assert_eq!(
            "system_notice".parse::<Topic>().unwrap(),
            Topic::Kind(MessageKind::SystemNotice)
        );
    }

    #[test]
    fn test_outbound_shape() {
        let message = OutboundMessage {
            kind: MessageKind::Unknown("ping".into()),
            data: serde_json::json!({"n": 1}),
        };
        assert_eq!(
            serde_json::to_string(&message).unwrap(),
            r#"{"type":"ping","data":{"n":1}}"#
        );
    }
}
