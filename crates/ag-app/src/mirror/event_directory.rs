use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::warn;

use ag_core::ports::{ApiError, EventQueryPort};
use ag_core::EventSummary;

use super::RefreshOutcome;
use crate::guard::FlagGuard;
use crate::polling::{PollConfig, PollerHandle, ResourcePoller};

/// The events the current user participates in.
pub struct EventDirectory {
    query: Arc<dyn EventQueryPort>,
    events: watch::Sender<Option<Arc<Vec<EventSummary>>>>,
    refreshing: AtomicBool,
}

impl EventDirectory {
    pub fn new(query: Arc<dyn EventQueryPort>) -> Self {
        let (events, _rx) = watch::channel(None);
        Self {
            query,
            events,
            refreshing: AtomicBool::new(false),
        }
    }

    pub async fn refresh(&self) -> Result<RefreshOutcome, ApiError> {
        let Some(_in_flight) = FlagGuard::acquire(&self.refreshing) else {
            return Ok(RefreshOutcome::Skipped);
        };
        let events = self.query.list_events().await?;
        self.events.send_replace(Some(Arc::new(events)));
        Ok(RefreshOutcome::Applied)
    }

    pub fn events(&self) -> Option<Arc<Vec<EventSummary>>> {
        self.events.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Vec<EventSummary>>>> {
        self.events.subscribe()
    }

    /// Keeps the list fresh until the returned handle is dropped.
    pub fn start_polling(self: &Arc<Self>, config: PollConfig) -> PollerHandle {
        let directory = Arc::clone(self);
        ResourcePoller::spawn("event_directory", config, true, move || {
            let directory = Arc::clone(&directory);
            async move {
                if let Err(err) = directory.refresh().await {
                    warn!(error = %err, "Event list refresh failed");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use crate::test_support::{sample_event, FakeEventService};

    #[tokio::test(start_paused = true)]
    async fn test_polling_keeps_list_fresh() {
        let fake = FakeEventService::with_event(sample_event());
        let directory = Arc::new(EventDirectory::new(fake.clone()));
        let poller = directory.start_polling(PollConfig::new(
            Duration::from_millis(100),
            Duration::ZERO,
        ));

        tokio::time::sleep(Duration::from_millis(1)).await;
        let events = directory.events().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].title, "Pick a venue");

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(fake.count("list_events"), 2);

        drop(poller);
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(fake.count("list_events"), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_last_list() {
        let fake = FakeEventService::with_event(sample_event());
        let directory = EventDirectory::new(fake.clone());
        directory.refresh().await.unwrap();

        fake.fail("list_events", ApiError::Network("offline".to_string()));
        assert!(directory.refresh().await.is_err());
        assert_eq!(directory.events().unwrap().len(), 1);
    }
}
