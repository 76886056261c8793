//! Delivery lifecycle state machine.
//!
//! A message moves through `sent -> delivered -> read`, strictly forward.
//! The triggers for transitions are loosely ordered environmental events
//! (feed delivery, UI visibility), so a request to move backward or to the
//! current state is silently absorbed rather than treated as an error.

use serde::{Deserialize, Serialize};

/// Delivery lifecycle stage of a message.
///
/// The derived `Ord` defines the transition ordering:
/// `Sent < Delivered < Read`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Delivered,
    Read,
}

impl DeliveryStatus {
    /// Apply a transition request.
    ///
    /// Returns `requested` only when it is strictly later than `self`;
    /// otherwise returns `self` unchanged. A late-arriving `Delivered` can
    /// therefore never revert an already-`Read` message.
    #[must_use]
    pub fn advance(self, requested: DeliveryStatus) -> DeliveryStatus {
        self.max(requested)
    }

    /// Whether a request to move to `requested` would actually change state.
    pub fn can_advance_to(self, requested: DeliveryStatus) -> bool {
        requested > self
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Read => "read",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "sent" => Some(Self::Sent),
            "delivered" => Some(Self::Delivered),
            "read" => Some(Self::Read),
            _ => None,
        }
    }

    /// Integer rank used by the SQL monotonic guard.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Sent => 0,
            Self::Delivered => 1,
            Self::Read => 2,
        }
    }
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
