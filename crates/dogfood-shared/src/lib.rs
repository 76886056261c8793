//! # dogfood-shared
//!
//! Domain types shared by every Dogfood crate: id newtypes, the message and
//! link models, the delivery status state machine, the error taxonomy, and
//! a handful of protocol constants.

pub mod constants;
pub mod error;
pub mod status;
pub mod types;

pub use error::DogfoodError;
pub use status::DeliveryStatus;
pub use types::{Link, LinkId, MediaMetadata, Message, MessageId, MessageType, UserId};
