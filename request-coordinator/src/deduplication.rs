use crate::error::{Error, Result};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures::Future;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::oneshot;

/// A caller waiting on the outcome of an in-flight fetch
type Waiter<V> = oneshot::Sender<Result<V>>;

type PendingGroups<K, V> = Arc<DashMap<K, Vec<Waiter<V>>>>;

/// Request deduplication system
/// When multiple identical requests come in, only the first one is executed
/// and the outcome, success or error, is shared with all waiting requests
pub struct RequestDeduplicator<K, V> {
    /// Map of keys to the callers waiting on their in-flight fetch
    pending: PendingGroups<K, V>,
}

impl<K, V> Clone for RequestDeduplicator<K, V> {
    fn clone(&self) -> Self {
        Self {
            pending: self.pending.clone(),
        }
    }
}

impl<K, V> Default for RequestDeduplicator<K, V>
where
    K: Hash + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> RequestDeduplicator<K, V>
where
    K: Hash + Eq,
{
    pub fn new() -> Self {
        Self {
            pending: Arc::new(DashMap::new()),
        }
    }
}

impl<K, V> RequestDeduplicator<K, V>
where
    K: Hash + Eq + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Execute a fetch with deduplication.
    ///
    /// The first caller for `key` starts `fetch_fn` on its own task; callers
    /// arriving while it is in flight wait for the same outcome instead of
    /// starting another fetch. Dropping a caller's future never cancels the
    /// fetch, so the remaining waiters are always settled.
    pub async fn run<F, Fut>(&self, key: K, fetch_fn: F) -> Result<V>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();

        let leader = match self.pending.entry(key.clone()) {
            Entry::Occupied(mut group) => {
                group.get_mut().push(tx);
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(vec![tx]);
                true
            }
        };

        if leader {
            log::debug!("Executing new request for key: {:?}", key);
            let settlement = Settlement {
                pending: self.pending.clone(),
                key: Some(key.clone()),
            };
            tokio::spawn(async move {
                let outcome = fetch_fn().await;
                settlement.settle(outcome);
            });
        } else {
            log::debug!("Request already pending for key: {:?}", key);
        }

        match rx.await {
            Ok(outcome) => outcome,
            Err(_) => {
                log::warn!("Sender dropped for key: {:?}", key);
                Err(Error::FetchAborted)
            }
        }
    }

    /// Get statistics about pending requests
    pub fn stats(&self) -> DeduplicationStats {
        let pending_requests = self.pending.len();
        let total_waiters = self
            .pending
            .iter()
            .map(|entry| entry.value().len())
            .sum();

        DeduplicationStats {
            pending_requests,
            total_waiters,
        }
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    /// Number of keys with a fetch in flight
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Callers waiting on `key` besides the leader
    pub fn waiters(&self, key: &K) -> usize {
        self.pending
            .get(key)
            .map_or(0, |group| group.len().saturating_sub(1))
    }
}

/// Owns the right to settle one pending group. If the fetch task unwinds or
/// is cancelled before settling, the group is settled with
/// [`Error::FetchAborted`] on drop.
struct Settlement<K, V>
where
    K: Hash + Eq,
{
    pending: PendingGroups<K, V>,
    key: Option<K>,
}

impl<K, V> Settlement<K, V>
where
    K: Hash + Eq + Clone + Debug,
    V: Clone,
{
    fn settle(mut self, outcome: Result<V>) {
        if let Some(key) = self.key.take() {
            notify(&self.pending, key, outcome);
        }
    }
}

impl<K, V> Drop for Settlement<K, V>
where
    K: Hash + Eq,
{
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            // Dropping the senders wakes every waiter with a closed channel,
            // which they report as `FetchAborted`.
            self.pending.remove(&key);
        }
    }
}

/// Hand `outcome` to every waiter of `key` and remove the group while still
/// holding the shard lock, so a later caller starts a fresh fetch.
fn notify<K, V>(pending: &DashMap<K, Vec<Waiter<V>>>, key: K, outcome: Result<V>)
where
    K: Hash + Eq + Clone + Debug,
    V: Clone,
{
    match pending.entry(key.clone()) {
        Entry::Occupied(mut group) => {
            let waiters = std::mem::take(group.get_mut());
            log::debug!("Notifying {} waiters for key: {:?}", waiters.len(), key);
            for waiter in waiters {
                let _ = waiter.send(outcome.clone());
            }
            group.remove();
        }
        Entry::Vacant(_) => {
            log::warn!("No pending group left to settle for key: {:?}", key);
        }
    }
}

/// Statistics for request deduplication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeduplicationStats {
    pub pending_requests: usize,
    pub total_waiters: usize,
}

/// Thread-safe wrapper for the deduplicator
pub type SharedRequestDeduplicator<K, V> = Arc<RequestDeduplicator<K, V>>;
