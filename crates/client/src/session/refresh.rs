//! Single-flight token refresh.
//!
//! The first caller to need a refresh creates a shared future and parks a
//! weak handle to it in the slot; later callers upgrade the handle and await
//! the same outcome. The future empties the slot as it settles, so the next
//! refresh starts a new call. Only waiters keep the future alive: if every
//! waiter is dropped the refresh is abandoned and the slot reads as empty.

use std::sync::atomic::{AtomicU64, Ordering};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared, WeakShared};
use parking_lot::Mutex;
use tracing::instrument;

use super::SessionManager;
use crate::error::RefreshFailure;

type RefreshFuture = BoxFuture<'static, Result<(), RefreshFailure>>;

struct InFlight {
    generation: u64,
    outcome: WeakShared<RefreshFuture>,
}

impl InFlight {
    fn join(&self) -> Option<Shared<RefreshFuture>> {
        self.outcome.upgrade()
    }
}

#[derive(Default)]
pub(super) struct RefreshSlot {
    in_flight: Mutex<Option<InFlight>>,
    next_generation: AtomicU64,
}

impl RefreshSlot {
    /// Empty the slot if it still holds `generation`.
    fn settle(&self, generation: u64) {
        let mut in_flight = self.in_flight.lock();
        if in_flight
            .as_ref()
            .is_some_and(|f| f.generation == generation)
        {
            *in_flight = None;
        }
    }

    /// Whether a refresh is currently pending.
    pub(super) fn is_pending(&self) -> bool {
        self.in_flight
            .lock()
            .as_ref()
            .is_some_and(|f| f.join().is_some())
    }
}

impl SessionManager {
    /// Re-establish the access token and profile from the refresh cookie.
    ///
    /// Concurrent callers share one refresh call and all observe its outcome.
    /// On failure the session is cleared.
    ///
    /// # Errors
    ///
    /// Returns `RefreshFailure::Rejected` if the API refuses the credential
    /// and `RefreshFailure::Transport` if the call fails or its response
    /// cannot be decoded.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<(), RefreshFailure> {
        let outcome = {
            let mut slot = self.inner.refresh.in_flight.lock();
            if let Some((generation, outcome)) = slot
                .as_ref()
                .and_then(|f| f.join().map(|outcome| (f.generation, outcome)))
            {
                tracing::debug!(generation, "Joining in-flight refresh");
                outcome
            } else {
                let generation = self
                    .inner
                    .refresh
                    .next_generation
                    .fetch_add(1, Ordering::Relaxed);
                let session = self.clone();
                let outcome = async move {
                    let result = session.exchange_refresh_credential().await;
                    session.inner.refresh.settle(generation);
                    result
                }
                .boxed()
                .shared();
                *slot = outcome.downgrade().map(|outcome| InFlight {
                    generation,
                    outcome,
                });
                outcome
            }
        };

        outcome.await
    }

    /// Whether a refresh is currently in flight.
    #[must_use]
    pub fn refresh_pending(&self) -> bool {
        self.inner.refresh.is_pending()
    }
}
