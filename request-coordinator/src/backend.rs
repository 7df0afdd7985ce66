use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub type UserId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

/// The slow datastore the coordination layer protects
#[async_trait]
pub trait UserBackend: Send + Sync {
    async fn fetch_by_id(&self, id: UserId) -> Result<Option<User>>;

    async fn create(&self, user: NewUser) -> Result<User>;
}

const DEFAULT_LATENCY: Duration = Duration::from_millis(200);

/// In-memory datastore with a fixed simulated latency per call
pub struct MockBackend {
    users: DashMap<UserId, User>,
    next_id: AtomicU64,
    latency: Duration,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Seeded with the three demo users
    pub fn new() -> Self {
        Self::with_latency(DEFAULT_LATENCY)
    }

    pub fn with_latency(latency: Duration) -> Self {
        let users = DashMap::new();
        for (id, name, email) in [
            (1, "John Doe", "john@example.com"),
            (2, "Jane Smith", "jane@example.com"),
            (3, "Alice Johnson", "alice@example.com"),
        ] {
            users.insert(
                id,
                User {
                    id,
                    name: name.to_string(),
                    email: email.to_string(),
                },
            );
        }

        Self {
            users,
            next_id: AtomicU64::new(4),
            latency,
        }
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserBackend for MockBackend {
    async fn fetch_by_id(&self, id: UserId) -> Result<Option<User>> {
        tokio::time::sleep(self.latency).await;
        Ok(self.users.get(&id).map(|user| user.value().clone()))
    }

    async fn create(&self, user: NewUser) -> Result<User> {
        tokio::time::sleep(self.latency).await;
        let user = User {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            name: user.name,
            email: user.email,
        };
        self.users.insert(user.id, user.clone());
        log::debug!("Created user {}", user.id);
        Ok(user)
    }
}
