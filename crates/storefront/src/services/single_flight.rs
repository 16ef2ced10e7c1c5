//! Coalescing of concurrent work per key.
//!
//! The first caller for a key runs the work; callers that arrive while it is
//! in flight wait for the same result. Once the flight lands the key is free
//! again and the next caller starts fresh work.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OnceCell;

/// Per-key single in-flight execution.
pub struct SingleFlight<K, V> {
    flights: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> Default for SingleFlight<K, V> {
    fn default() -> Self {
        Self {
            flights: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `work` for `key`, or join the flight already running for it.
    ///
    /// If the leading caller is cancelled, one of the waiters runs its own
    /// `work` instead. A flight that has landed is never joined.
    pub async fn run<F, Fut>(&self, key: K, work: F) -> V
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = V>,
    {
        let cell = {
            let mut flights = self.flights.lock().unwrap_or_else(PoisonError::into_inner);
            let cell = flights
                .entry(key.clone())
                .or_insert_with(|| Arc::new(OnceCell::new()));
            if cell.initialized() {
                *cell = Arc::new(OnceCell::new());
            }
            Arc::clone(cell)
        };

        let boarding = Boarding {
            flights: &self.flights,
            key,
            cell,
        };
        boarding.cell.get_or_init(work).await.clone()
    }

    /// Number of keys with work in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.flights
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// One caller's hold on a flight. Dropping it, whether the work finished or
/// the caller was cancelled, frees the key once nobody else waits on it.
struct Boarding<'a, K: Eq + Hash, V> {
    flights: &'a Mutex<HashMap<K, Arc<OnceCell<V>>>>,
    key: K,
    cell: Arc<OnceCell<V>>,
}

impl<K: Eq + Hash, V> Drop for Boarding<'_, K, V> {
    fn drop(&mut self) {
        let mut flights = self.flights.lock().unwrap_or_else(PoisonError::into_inner);
        let ours = flights
            .get(&self.key)
            .is_some_and(|current| Arc::ptr_eq(current, &self.cell));
        // the map and this guard are the only holders when no one waits
        let abandoned = Arc::strong_count(&self.cell) == 2;
        if ours && (self.cell.initialized() || abandoned) {
            flights.remove(&self.key);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use tokio::sync::oneshot;

    use super::*;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_run() {
        let flights: Arc<SingleFlight<&'static str, u32>> = Arc::new(SingleFlight::new());
        let runs = Arc::new(AtomicUsize::new(0));
        let (release, gate) = oneshot::channel::<()>();

        let leader = {
            let flights = Arc::clone(&flights);
            let runs = Arc::clone(&runs);
            tokio::spawn(async move {
                flights
                    .run("cart_1", || async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        gate.await.ok();
                        7
                    })
                    .await
            })
        };

        // let the leader take the slot
        while flights.in_flight() == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        let follower = {
            let flights = Arc::clone(&flights);
            let runs = Arc::clone(&runs);
            tokio::spawn(async move {
                flights
                    .run("cart_1", || async move {
                        runs.fetch_add(1, Ordering::SeqCst);
                        99
                    })
                    .await
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        release.send(()).unwrap();

        assert_eq!(leader.await.unwrap(), 7);
        assert_eq!(follower.await.unwrap(), 7);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_later_call_runs_fresh() {
        let flights: SingleFlight<&'static str, u32> = SingleFlight::new();
        assert_eq!(flights.run("cart_1", || async { 1 }).await, 1);
        assert_eq!(flights.run("cart_1", || async { 2 }).await, 2);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let flights: SingleFlight<&'static str, &'static str> = SingleFlight::new();
        let (a, b) = tokio::join!(
            flights.run("cart_a", || async { "a" }),
            flights.run("cart_b", || async { "b" }),
        );
        assert_eq!((a, b), ("a", "b"));
    }

    #[tokio::test]
    async fn test_cancelled_leader_frees_key() {
        let flights: Arc<SingleFlight<&'static str, u32>> = Arc::new(SingleFlight::new());

        let leader = {
            let flights = Arc::clone(&flights);
            tokio::spawn(async move {
                flights
                    .run("cart_1", std::future::pending::<u32>)
                    .await
            })
        };
        while flights.in_flight() == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        leader.abort();
        assert!(leader.await.unwrap_err().is_cancelled());
        assert_eq!(flights.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_landed_flight_is_not_joined() {
        let flights: SingleFlight<&'static str, u32> = SingleFlight::new();
        // a finished flight whose key has not been freed yet
        let landed = Arc::new(OnceCell::new_with(Some(1)));
        flights.flights.lock().unwrap().insert("cart_1", landed);

        assert_eq!(flights.run("cart_1", || async { 2 }).await, 2);
        assert_eq!(flights.in_flight(), 0);
    }
}
