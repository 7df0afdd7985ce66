use crate::backend::{NewUser, User, UserBackend, UserId};
use crate::background::BackgroundTask;
use crate::cache::{CacheConfig, CacheStats, SharedCache, TtlLruCache};
use crate::deduplication::RequestDeduplicator;
use crate::error::{Error, Result};
use crate::queue::RequestQueue;
use getset::Getters;
use std::sync::Arc;

/// Read and write pipelines over a slow user backend.
///
/// Reads go cache → single-flight → FIFO queue → backend; writes go straight
/// to the queue and warm the cache with the created record.
#[derive(Getters)]
pub struct UserService {
    backend: Arc<dyn UserBackend>,
    #[get = "pub"]
    cache: SharedCache<UserId, User>,
    #[get = "pub"]
    deduplicator: RequestDeduplicator<UserId, Option<User>>,
    queue: RequestQueue,
}

impl UserService {
    pub fn new(backend: Arc<dyn UserBackend>, cache_config: CacheConfig) -> Self {
        Self {
            backend,
            cache: Arc::new(TtlLruCache::new(cache_config)),
            deduplicator: RequestDeduplicator::new(),
            queue: RequestQueue::new(),
        }
    }

    /// Look a user up, returning `Ok(None)` when the backend has no record.
    pub async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        if let Some(user) = self.cache.get(&id) {
            return Ok(Some(user));
        }

        let cache = self.cache.clone();
        let queue = self.queue.clone();
        let backend = self.backend.clone();

        self.deduplicator
            .run(id, move || async move {
                // Another fetch may have filled the cache while we waited.
                if let Some(user) = cache.peek(&id) {
                    return Ok(Some(user));
                }

                let user = queue
                    .submit(move || async move { backend.fetch_by_id(id).await })
                    .await?;
                if let Some(user) = &user {
                    cache.set(id, user.clone());
                }
                Ok::<_, Error>(user)
            })
            .await
    }

    /// Create a user through the queue, then warm the cache with it.
    pub async fn create_user(&self, new_user: NewUser) -> Result<User> {
        let backend = self.backend.clone();
        let user = self
            .queue
            .submit(move || async move { backend.create(new_user).await })
            .await?;

        self.cache.set(user.id, user.clone());
        log::info!("Created user {} and cached it", user.id);
        Ok(user)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) -> CacheStats {
        self.cache.clear();
        self.cache.stats()
    }

    pub fn spawn_cache_sweeper(&self) -> BackgroundTask {
        self.cache.spawn_sweeper()
    }
}
