use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Handle to a periodic maintenance task (cache sweep, limiter cleanup).
///
/// The task stops when [`BackgroundTask::shutdown`] is awaited, when its tick
/// closure returns `false`, or when the handle is dropped (the task is
/// aborted).
pub struct BackgroundTask {
    name: &'static str,
    stop: Arc<Notify>,
    handle: Option<JoinHandle<()>>,
}

impl BackgroundTask {
    /// Run `tick` every `period`, starting one period after the call.
    pub fn spawn_periodic<F>(name: &'static str, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let period = period.max(Duration::from_millis(1));
        let stop = Arc::new(Notify::new());
        let signal = stop.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of an interval completes immediately.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = signal.notified() => break,
                    _ = interval.tick() => {
                        if !tick() {
                            break;
                        }
                    }
                }
            }
            log::debug!("Background task '{}' stopped", name);
        });

        log::debug!("Started background task '{}' every {:?}", name, period);

        Self {
            name,
            stop,
            handle: Some(handle),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Signal the task to stop and wait until it has exited.
    pub async fn shutdown(mut self) {
        self.stop.notify_one();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                log::warn!("Background task '{}' ended abnormally: {}", self.name, e);
            }
        }
    }
}

impl Drop for BackgroundTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_periodic_task_ticks_until_shutdown() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let task = BackgroundTask::spawn_periodic("ticker", Duration::from_secs(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);

        task.shutdown().await;
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_returning_false_ends_task() {
        let task = BackgroundTask::spawn_periodic("one-shot", Duration::from_secs(1), || false);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        tokio::task::yield_now().await;
        assert!(task.is_finished());
    }
}
