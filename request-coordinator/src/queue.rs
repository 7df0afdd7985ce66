use crate::error::{Error, Result};
use futures::{Future, FutureExt};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::oneshot;

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

struct Backlog {
    jobs: VecDeque<Job>,
    draining: bool,
}

/// FIFO request serializer.
///
/// Every submitted task runs to completion before the next one starts, in
/// submission order, so a single queue bounds backend concurrency to one.
/// A worker is spawned when work arrives and no worker is active; it exits
/// once the backlog is empty.
#[derive(Clone)]
pub struct RequestQueue {
    backlog: Arc<Mutex<Backlog>>,
}

impl Default for RequestQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestQueue {
    pub fn new() -> Self {
        Self {
            backlog: Arc::new(Mutex::new(Backlog {
                jobs: VecDeque::new(),
                draining: false,
            })),
        }
    }

    /// Queue `task` and wait for its result.
    ///
    /// A failing or panicking task only affects its own caller. Dropping the
    /// returned future does not withdraw the task.
    pub async fn submit<F, Fut, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();

        let job: Job = Box::pin(async move {
            let outcome = match AssertUnwindSafe(async move { task().await })
                .catch_unwind()
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => {
                    log::warn!("Queued task panicked");
                    Err(Error::TaskPanicked)
                }
            };
            if let Err(e) = &outcome {
                log::warn!("Queued task failed: {}", e);
            }
            let _ = tx.send(outcome);
        });
        self.enqueue(job);

        rx.await.unwrap_or(Err(Error::QueueClosed))
    }

    /// Tasks waiting to start
    pub fn backlog(&self) -> usize {
        self.backlog.lock().jobs.len()
    }

    pub fn is_draining(&self) -> bool {
        self.backlog.lock().draining
    }

    fn enqueue(&self, job: Job) {
        let start_worker = {
            let mut backlog = self.backlog.lock();
            backlog.jobs.push_back(job);
            !std::mem::replace(&mut backlog.draining, true)
        };

        if start_worker {
            log::debug!("Starting request queue worker");
            tokio::spawn(drain(self.backlog.clone()));
        }
    }
}

async fn drain(backlog: Arc<Mutex<Backlog>>) {
    loop {
        let job = {
            let mut backlog = backlog.lock();
            match backlog.jobs.pop_front() {
                Some(job) => job,
                None => {
                    backlog.draining = false;
                    break;
                }
            }
        };
        job.await;
    }
    log::debug!("Request queue drained");
}
