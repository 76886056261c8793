//! Events emitted to the rendering layer.

use serde::Serialize;

use dogfood_shared::{DeliveryStatus, Message, MessageId};

/// Notifications the conversation view hands to its observers.
#[derive(Debug, Clone, Serialize)]
pub enum ClientEvent {
    /// A message entered the reconciliation cache.
    MessageAdded(Message),

    /// A cached message's delivery status advanced (checkmark update).
    StatusChanged {
        id: MessageId,
        status: DeliveryStatus,
    },

    /// Present this message to the user now. Emitted once per message, either
    /// on realtime arrival or on its turn in the staggered backlog sequence.
    /// The rendering layer must call `presentation_complete` when it is done.
    Present(Message),
}
