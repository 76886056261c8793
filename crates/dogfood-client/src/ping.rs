//! Best-effort "ping" nudges.
//!
//! A ping is a one-tap "thinking of you" notification. It is explicitly
//! non-critical: a failed ping is logged and absorbed, never retried and
//! never surfaced as an error. The transport is abstract; a deployment wires
//! in whatever push mechanism it has.

use std::future::Future;

use tracing::{debug, warn};

use dogfood_shared::{DogfoodError, UserId};

/// Delivery mechanism for pings.
pub trait PingTransport: Send + Sync {
    fn send_ping(
        &self,
        from: UserId,
        to: UserId,
    ) -> impl Future<Output = Result<(), DogfoodError>> + Send;
}

/// Fire-and-forget ping sender for one authenticated user.
pub struct PingSender<T> {
    transport: T,
    user: UserId,
}

impl<T: PingTransport> PingSender<T> {
    pub fn new(transport: T, user: UserId) -> Self {
        Self { transport, user }
    }

    /// Send a ping to the partner. Always succeeds from the caller's point
    /// of view; a transport failure means the ping simply is not delivered.
    pub async fn ping(&self, partner: UserId) {
        match self.transport.send_ping(self.user, partner).await {
            Ok(()) => debug!(from = %self.user, to = %partner, "ping sent"),
            Err(e) => warn!(from = %self.user, to = %partner, error = %e, "ping not delivered"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FlakyTransport {
        attempts: Arc<AtomicUsize>,
    }

    impl PingTransport for FlakyTransport {
        async fn send_ping(&self, _from: UserId, _to: UserId) -> Result<(), DogfoodError> {
            let n = self.attempts.fetch_add(1, Ordering::SeqCst);
            if n % 2 == 0 {
                Err(DogfoodError::Feed("push service down".into()))
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn failures_are_absorbed() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let sender = PingSender::new(
            FlakyTransport {
                attempts: attempts.clone(),
            },
            UserId::new(),
        );

        // Both calls return normally; the failure is invisible to the caller
        // and there is no retry.
        sender.ping(UserId::new()).await;
        sender.ping(UserId::new()).await;
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
