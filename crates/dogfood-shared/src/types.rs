use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::status::DeliveryStatus;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub Uuid);

impl UserId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a link: the pairing of two users who exchange messages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct LinkId(pub Uuid);

impl LinkId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Feed topic name for this link's change stream.
    pub fn to_topic(&self) -> String {
        format!("messages:{}", self.0)
    }
}

impl Default for LinkId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of payload a message carries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Image,
    Audio,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Audio => "audio",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            "audio" => Some(Self::Audio),
            _ => None,
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Media metadata
// ---------------------------------------------------------------------------

/// Free-form metadata attached to image and audio messages.
///
/// Every field is optional; the struct serialises to the flat JSON object the
/// UI layer expects.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetadata {
    /// Size of the media object in bytes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// MIME type, e.g. `image/webp` or `audio/webm`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// Audio duration in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Image width in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Image height in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl MediaMetadata {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A single message between linked users.
///
/// Rows are created once by the sender with status [`DeliveryStatus::Sent`]
/// and afterwards mutated only by the receiver advancing the status. There is
/// no delete operation; messages are permanent once stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Unique message identifier, assigned by the store at creation.
    pub id: MessageId,
    /// The link (conversation) this message belongs to.
    pub link_id: LinkId,
    /// The user who sent the message.
    pub sender_id: UserId,
    /// The user the message is addressed to.
    pub receiver_id: UserId,
    /// Payload kind.
    pub message_type: MessageType,
    /// Text body. Non-null exactly when `message_type` is `Text`.
    pub content: Option<String>,
    /// Reference to the stored media object (image/audio only).
    pub media_url: Option<String>,
    /// Media metadata (empty object for text messages).
    #[serde(default)]
    pub media_metadata: MediaMetadata,
    /// Current delivery lifecycle stage.
    pub status: DeliveryStatus,
    /// Creation time, immutable after the row is written.
    pub created_at: DateTime<Utc>,
    /// Changes only when a status transition is accepted.
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Link
// ---------------------------------------------------------------------------

/// The pairing of two users. The participant pair is unordered; `user_a` /
/// `user_b` is purely a storage convention.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Link {
    pub id: LinkId,
    pub user_a: UserId,
    pub user_b: UserId,
}

impl Link {
    pub fn new(user_a: UserId, user_b: UserId) -> Self {
        Self {
            id: LinkId::new(),
            user_a,
            user_b,
        }
    }

    /// Whether the given user is one of the two participants.
    pub fn contains(&self, user: UserId) -> bool {
        self.user_a == user || self.user_b == user
    }

    /// The participant that is not `user`, if `user` is a participant.
    pub fn other(&self, user: UserId) -> Option<UserId> {
        if user == self.user_a {
            Some(self.user_b)
        } else if user == self.user_b {
            Some(self.user_a)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_membership() {
        let a = UserId::new();
        let b = UserId::new();
        let link = Link::new(a, b);

        assert!(link.contains(a));
        assert!(link.contains(b));
        assert!(!link.contains(UserId::new()));

        assert_eq!(link.other(a), Some(b));
        assert_eq!(link.other(b), Some(a));
        assert_eq!(link.other(UserId::new()), None);
    }

    #[test]
    fn media_metadata_roundtrip() {
        let meta = MediaMetadata {
            size: Some(1024),
            mime_type: Some("audio/webm".into()),
            duration: Some(3.5),
            ..Default::default()
        };
        let json = serde_json::to_string(&meta).unwrap();
        let back: MediaMetadata = serde_json::from_str(&json).unwrap();
        assert_eq!(meta, back);
        assert!(!meta.is_empty());
        assert!(MediaMetadata::default().is_empty());
    }

    #[test]
    fn message_type_names() {
        assert_eq!(MessageType::from_str_opt("audio"), Some(MessageType::Audio));
        assert_eq!(MessageType::from_str_opt("video"), None);
        assert_eq!(MessageType::Image.as_str(), "image");
    }
}
