//! Protocol-level constants shared across crates.

use std::time::Duration;

/// Pause between presenting consecutive backlog messages, so a reconnecting
/// receiver sees them arrive one at a time instead of as a single burst.
pub const BACKLOG_STAGGER_DELAY: Duration = Duration::from_millis(800);

/// Default page size for history queries.
pub const DEFAULT_HISTORY_LIMIT: u32 = 50;

/// Upper bound on a single history page.
pub const MAX_HISTORY_LIMIT: u32 = 200;
