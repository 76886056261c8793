//! # dogfood-client
//!
//! The client-side delivery core: the send pipeline, the status
//! synchronizer (including staggered backlog presentation), the per-view
//! reconciliation cache, and the conversation view context that ties them to
//! a change-feed subscription.
//!
//! The crate is UI-agnostic. A rendering layer consumes [`ClientEvent`]s via
//! the observer registry and reports presentation completion back through
//! [`view::ConversationView::presentation_complete`].

pub mod cache;
pub mod events;
pub mod observer;
pub mod optimistic;
pub mod ping;
pub mod send;
pub mod sync;
pub mod view;

pub use cache::ReconciliationCache;
pub use events::ClientEvent;
pub use observer::{ObserverId, ObserverRegistry};
pub use send::{OutboundMessage, SendPipeline};
pub use sync::{BacklogConfig, BacklogHandle, StatusSynchronizer};
pub use view::ConversationView;
