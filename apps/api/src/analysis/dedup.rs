//! Search de-duplication: at most one analysis per normalized term at a time.
//!
//! The first caller for a term becomes the owner and receives an `InFlightGuard`.
//! Later callers receive a `WaitHandle` and suspend until the owner's guard is
//! dropped. Dropping the guard (on success, error, panic or cancellation)
//! resolves the shared signal once and unregisters the term. Waiters get no
//! payload through the signal; they re-read the result cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
struct InFlightSearch {
    /// Kept so late joiners can subscribe; also keeps the channel open until resolution.
    completion: watch::Receiver<bool>,
    created_at: Instant,
}

type Registry = Mutex<HashMap<String, InFlightSearch>>;

fn lock(registry: &Registry) -> MutexGuard<'_, HashMap<String, InFlightSearch>> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default, Clone)]
pub struct SearchDeduplicator {
    in_flight: Arc<Registry>,
}

pub enum Acquisition {
    Owner(InFlightGuard),
    Waiter(WaitHandle),
}

impl SearchDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `term` and returns ownership, or joins the run already registered for it.
    /// Check and register happen under one lock, so two callers can never both own a term.
    pub fn acquire_or_join(&self, term: &str) -> Acquisition {
        let mut in_flight = lock(&self.in_flight);

        if let Some(existing) = in_flight.get(term) {
            return Acquisition::Waiter(WaitHandle {
                completion: existing.completion.clone(),
            });
        }

        let (sender, completion) = watch::channel(false);
        in_flight.insert(
            term.to_string(),
            InFlightSearch {
                completion,
                created_at: Instant::now(),
            },
        );

        Acquisition::Owner(InFlightGuard {
            registry: self.in_flight.clone(),
            term: term.to_string(),
            sender,
        })
    }

    pub fn in_flight_count(&self) -> usize {
        lock(&self.in_flight).len()
    }
}

/// Ownership of an in-flight term. Releases it when dropped.
pub struct InFlightGuard {
    registry: Arc<Registry>,
    term: String,
    sender: watch::Sender<bool>,
}

impl InFlightGuard {
    pub fn term(&self) -> &str {
        &self.term
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        // Resolve first, then unregister: anyone who joined before removal still wakes.
        self.sender.send_replace(true);

        let mut in_flight = lock(&self.registry);
        if let Some(search) = in_flight.remove(&self.term) {
            debug!(
                term = %self.term,
                held_ms = search.created_at.elapsed().as_millis() as u64,
                "in-flight search released"
            );
        }
    }
}

/// Handle held by callers that joined an existing run.
pub struct WaitHandle {
    completion: watch::Receiver<bool>,
}

impl WaitHandle {
    /// Suspends until the owning run has finished, whatever its outcome.
    pub async fn wait(mut self) {
        // An error means the sender is gone, which also means the owner finished.
        let _ = self.completion.wait_for(|done| *done).await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    impl Acquisition {
        fn is_owner(&self) -> bool {
            matches!(self, Acquisition::Owner(_))
        }
    }

    impl SearchDeduplicator {
        fn is_in_flight(&self, term: &str) -> bool {
            lock(&self.in_flight).contains_key(term)
        }
    }

    #[test]
    fn test_first_caller_owns_second_waits() {
        let dedup = SearchDeduplicator::new();
        let first = dedup.acquire_or_join("data engineer");
        let second = dedup.acquire_or_join("data engineer");
        assert!(first.is_owner());
        assert!(!second.is_owner());
        assert_eq!(dedup.in_flight_count(), 1);
    }

    #[test]
    fn test_distinct_terms_are_independent() {
        let dedup = SearchDeduplicator::new();
        assert!(dedup.acquire_or_join("a").is_owner());
        // The first guard was dropped at the end of the statement above.
        assert!(dedup.acquire_or_join("a").is_owner());

        let _a = dedup.acquire_or_join("a");
        assert!(dedup.acquire_or_join("b").is_owner());
    }

    #[test]
    fn test_dropping_guard_unregisters_term() {
        let dedup = SearchDeduplicator::new();
        let owner = dedup.acquire_or_join("rust");
        assert!(dedup.is_in_flight("rust"));
        drop(owner);
        assert!(!dedup.is_in_flight("rust"));
        assert!(dedup.acquire_or_join("rust").is_owner());
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_waiters_wake_when_owner_finishes() {
        let dedup = SearchDeduplicator::new();
        let Acquisition::Owner(guard) = dedup.acquire_or_join("t") else {
            panic!("first caller must own the term");
        };

        let mut waiters = Vec::new();
        for _ in 0..5 {
            let Acquisition::Waiter(handle) = dedup.acquire_or_join("t") else {
                panic!("later callers must wait");
            };
            waiters.push(tokio::spawn(handle.wait()));
        }

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(waiters.iter().all(|w| !w.is_finished()));

        drop(guard);
        for waiter in waiters {
            tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .expect("waiter must wake")
                .unwrap();
        }
        assert_eq!(dedup.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn test_waiters_wake_when_owner_panics() {
        let dedup = SearchDeduplicator::new();
        let Acquisition::Owner(guard) = dedup.acquire_or_join("t") else {
            panic!("first caller must own the term");
        };
        let Acquisition::Waiter(handle) = dedup.acquire_or_join("t") else {
            panic!("second caller must wait");
        };

        let owner = tokio::spawn(async move {
            let _guard = guard;
            panic!("pipeline blew up");
        });
        assert!(owner.await.is_err());

        tokio::time::timeout(Duration::from_secs(1), handle.wait())
            .await
            .expect("waiter must wake after owner panic");
        assert!(!dedup.is_in_flight("t"));
    }

    #[tokio::test]
    async fn test_waiters_wake_when_owner_is_cancelled() {
        let dedup = SearchDeduplicator::new();
        let Acquisition::Owner(guard) = dedup.acquire_or_join("t") else {
            panic!("first caller must own the term");
        };
        let Acquisition::Waiter(handle) = dedup.acquire_or_join("t") else {
            panic!("second caller must wait");
        };

        let owner = tokio::spawn(async move {
            let _guard = guard;
            std::future::pending::<()>().await;
        });
        owner.abort();
        let _ = owner.await;

        tokio::time::timeout(Duration::from_secs(1), handle.wait())
            .await
            .expect("waiter must wake after owner cancellation");
        assert!(!dedup.is_in_flight("t"));
    }

    #[tokio::test]
    async fn test_concurrent_acquires_yield_exactly_one_owner() {
        let dedup = SearchDeduplicator::new();
        let mut tasks = Vec::new();
        for _ in 0..32 {
            let dedup = dedup.clone();
            tasks.push(tokio::spawn(async move {
                match dedup.acquire_or_join("same") {
                    // Hold ownership so no second owner can appear during the test.
                    Acquisition::Owner(guard) => Some(guard),
                    Acquisition::Waiter(_) => None,
                }
            }));
        }

        let mut owners = Vec::new();
        for task in tasks {
            if let Some(guard) = task.await.unwrap() {
                owners.push(guard);
            }
        }
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].term(), "same");
    }
}
