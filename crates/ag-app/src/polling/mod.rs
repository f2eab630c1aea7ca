//! Scheduled refetch of a remote resource.
//!
//! A poller owns exactly one background task and one timer. While enabled it
//! fetches immediately, then again after every `interval + jitter`. The next
//! tick is only scheduled once the previous fetch has finished; overlapping
//! fetches are the fetch function's own concern.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info_span, Instrument};

use ag_core::AppConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    /// Upper bound (inclusive) of the random delay added to every tick.
    pub jitter: Duration,
}

impl PollConfig {
    pub fn new(interval: Duration, jitter: Duration) -> Self {
        Self { interval, jitter }
    }

    pub fn from_app_config(config: &AppConfig) -> Self {
        Self::new(config.poll_interval(), config.poll_jitter())
    }

    fn next_delay(&self) -> Duration {
        let jitter_ms = u64::try_from(self.jitter.as_millis()).unwrap_or(u64::MAX);
        if jitter_ms == 0 {
            return self.interval;
        }
        self.interval + Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_ms))
    }
}

pub struct ResourcePoller;

impl ResourcePoller {
    /// Starts polling on the current tokio runtime.
    pub fn spawn<F, Fut>(
        name: &'static str,
        config: PollConfig,
        enabled: bool,
        fetch: F,
    ) -> PollerHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (enabled_tx, enabled_rx) = watch::channel(enabled);
        let task = tokio::spawn(
            run(enabled_rx, config, fetch).instrument(info_span!("poller", name = name)),
        );
        debug!(poller = name, ?config, enabled, "Poller started");

        PollerHandle {
            name,
            enabled: enabled_tx,
            task: Mutex::new(Some(task)),
        }
    }
}

async fn run<F, Fut>(mut enabled: watch::Receiver<bool>, config: PollConfig, mut fetch: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    loop {
        if enabled.wait_for(|on| *on).await.is_err() {
            return;
        }

        fetch().await;

        let delay = config.next_delay();
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            changed = enabled.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
    }
}

/// Control handle of a running poller. Dropping it stops the poller.
pub struct PollerHandle {
    name: &'static str,
    enabled: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PollerHandle {
    /// Turning polling on triggers an immediate fetch; turning it off stops
    /// scheduling after the fetch in progress, if any.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.send_if_modified(|current| {
            let changed = *current != enabled;
            *current = enabled;
            changed
        });
    }

    pub fn is_enabled(&self) -> bool {
        *self.enabled.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    pub fn stop(&self) {
        if let Some(task) = self
            .task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
        {
            task.abort();
            debug!(poller = self.name, "Poller stopped");
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counting_poller(config: PollConfig, enabled: bool) -> (PollerHandle, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handle = ResourcePoller::spawn("test", config, enabled, move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        (handle, calls)
    }

    fn every(ms: u64) -> PollConfig {
        PollConfig::new(Duration::from_millis(ms), Duration::ZERO)
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetches_immediately_then_every_interval() {
        let (handle, calls) = counting_poller(every(100), true);

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(349)).await;
        // t = 0, 100, 200, 300
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert!(handle.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_poller_never_fetches_until_enabled() {
        let (handle, calls) = counting_poller(every(100), false);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        handle.set_enabled(true);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabling_stops_scheduling() {
        let (handle, calls) = counting_poller(every(100), true);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        handle.set_enabled(false);
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!handle.is_enabled());

        // re-enabling fetches right away instead of waiting for a tick
        handle.set_enabled(true);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_and_drop_release_the_fetch_closure() {
        let resource = Arc::new(());
        let captured = resource.clone();
        let handle = ResourcePoller::spawn("drop", every(100), true, move || {
            let _keep = captured.clone();
            async {}
        });
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(Arc::strong_count(&resource), 2);

        drop(handle);
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(Arc::strong_count(&resource), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_next_tick_waits_for_slow_fetch() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let handle = ResourcePoller::spawn("slow", every(100), true, move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(250)).await;
            }
        });

        // fetches start at t = 0 and t = 350
        tokio::time::sleep(Duration::from_millis(340)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        handle.stop();
        assert!(!handle.is_running());
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let config = PollConfig::new(Duration::from_millis(100), Duration::from_millis(20));
        for _ in 0..100 {
            let delay = config.next_delay();
            assert!(delay >= Duration::from_millis(100));
            assert!(delay <= Duration::from_millis(120));
        }
    }
}
