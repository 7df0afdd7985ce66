use getset::Getters;
use log::info;
use request_coordinator::{BackgroundTask, MockBackend, RateLimiter, UserBackend, UserService};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::config::Config;

#[derive(Getters)]
pub struct Context {
    #[get = "pub"]
    users: UserService,
    #[get = "pub"]
    rate_limiter: Arc<RateLimiter>,
    #[get = "pub"]
    config: Config,
    background_tasks: Mutex<Vec<BackgroundTask>>,
}

impl Context {
    pub fn new(config: Config) -> Self {
        let backend = MockBackend::with_latency(config.backend().latency());
        Self::with_backend(config, Arc::new(backend))
    }

    pub fn with_backend(config: Config, backend: Arc<dyn UserBackend>) -> Self {
        let users = UserService::new(backend, config.cache().into());
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit().into()));

        info!(
            "Initialized user cache (TTL: {}s, Max entries: {}) and rate limiter ({} requests/{}ms, burst {})",
            config.cache().ttl_secs(),
            config.cache().capacity(),
            config.rate_limit().max_requests(),
            config.rate_limit().window_ms(),
            config.rate_limit().burst_capacity(),
        );

        Self {
            users,
            rate_limiter,
            config,
            background_tasks: Mutex::new(Vec::new()),
        }
    }

    /// Start the cache sweep and the rate limiter cleanup.
    pub async fn start_background_tasks(&self) {
        let mut tasks = self.background_tasks.lock().await;
        if !tasks.is_empty() {
            return;
        }
        tasks.push(self.users.spawn_cache_sweeper());
        tasks.push(self.rate_limiter.spawn_cleanup());
    }

    /// Stop every background task, waiting for each to exit.
    pub async fn shutdown(&self) {
        let tasks = std::mem::take(&mut *self.background_tasks.lock().await);
        for task in tasks {
            let name = task.name();
            task.shutdown().await;
            info!("Stopped background task '{}'", name);
        }
    }

    pub async fn running_tasks(&self) -> usize {
        self.background_tasks
            .lock()
            .await
            .iter()
            .filter(|task| !task.is_finished())
            .count()
    }
}

pub type ContextPointer = Arc<Context>;
