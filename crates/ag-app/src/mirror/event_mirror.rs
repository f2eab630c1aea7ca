use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use ag_core::event::patch_vote_info;
use ag_core::ports::{ApiError, EventQueryPort};
use ag_core::{EventDetail, EventId, Proposal, ProposalId, VoteInfo, VoteTarget};

use super::RefreshOutcome;
use crate::guard::FlagGuard;

/// Snapshot of one decision event.
///
/// `refresh()` always overwrites local patches; the server is authoritative.
pub struct EventMirror {
    event_id: EventId,
    query: Arc<dyn EventQueryPort>,
    snapshot: watch::Sender<Option<Arc<EventDetail>>>,
    refreshing: AtomicBool,
    alive: AtomicBool,
}

impl EventMirror {
    pub fn new(event_id: EventId, query: Arc<dyn EventQueryPort>) -> Self {
        let (snapshot, _rx) = watch::channel(None);
        Self {
            event_id,
            query,
            snapshot,
            refreshing: AtomicBool::new(false),
            alive: AtomicBool::new(true),
        }
    }

    pub fn event_id(&self) -> &EventId {
        &self.event_id
    }

    pub async fn refresh(&self) -> Result<RefreshOutcome, ApiError> {
        let Some(_in_flight) = FlagGuard::acquire(&self.refreshing) else {
            debug!(event_id = %self.event_id, "Refresh already in flight, skipping");
            return Ok(RefreshOutcome::Skipped);
        };

        let result = self.query.event_detail(&self.event_id).await;

        if !self.is_alive() {
            debug!(event_id = %self.event_id, "Mirror torn down, discarding refresh");
            return Ok(RefreshOutcome::Discarded);
        }

        let detail = result.inspect_err(|err| {
            warn!(event_id = %self.event_id, error = %err, "Event refresh failed");
        })?;
        self.snapshot.send_replace(Some(Arc::new(detail)));
        Ok(RefreshOutcome::Applied)
    }

    /// Replaces the vote info of one proposal in the current snapshot.
    ///
    /// Returns `false`, without notifying subscribers, when there is no
    /// snapshot yet or none of `targets` contains the proposal.
    pub fn patch(&self, proposal_id: &ProposalId, next: VoteInfo, targets: &[VoteTarget]) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.snapshot.send_if_modified(|current| {
            let Some(snapshot) = current.as_ref() else {
                return false;
            };
            let patched = patch_vote_info(snapshot, proposal_id, next, targets);
            if Arc::ptr_eq(snapshot, &patched) {
                return false;
            }
            *current = Some(patched);
            true
        })
    }

    pub fn snapshot(&self) -> Option<Arc<EventDetail>> {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<EventDetail>>> {
        self.snapshot.subscribe()
    }

    pub fn proposal(&self, proposal_id: &ProposalId) -> Option<Proposal> {
        self.snapshot
            .borrow()
            .as_ref()
            .and_then(|event| event.find_proposal(proposal_id).cloned())
    }

    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }

    /// Marks the mirror dead; results of requests still in flight are dropped.
    pub fn teardown(&self) {
        self.alive.store(false, Ordering::Release);
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_event, FakeEventService};
    use ag_core::event::{FlatList, NestedList};

    fn mirror(fake: &Arc<FakeEventService>) -> Arc<EventMirror> {
        Arc::new(EventMirror::new(EventId::new("e-1"), fake.clone()))
    }

    #[tokio::test]
    async fn test_refresh_replaces_snapshot() {
        let fake = FakeEventService::with_event(sample_event());
        let mirror = mirror(&fake);
        assert!(mirror.snapshot().is_none());

        assert_eq!(mirror.refresh().await.unwrap(), RefreshOutcome::Applied);
        let first = mirror.snapshot().unwrap();
        assert_eq!(first.title, "Pick a venue");

        mirror.refresh().await.unwrap();
        assert!(!Arc::ptr_eq(&first, &mirror.snapshot().unwrap()));
        assert_eq!(fake.count("event_detail"), 2);
    }

    #[tokio::test]
    async fn test_reentrant_refresh_is_skipped_without_request() {
        let fake = FakeEventService::with_event(sample_event());
        let gate = fake.gate("event_detail");
        let mirror = mirror(&fake);

        let first = tokio::spawn({
            let mirror = mirror.clone();
            async move { mirror.refresh().await }
        });
        tokio::task::yield_now().await;
        assert!(mirror.is_refreshing());

        assert_eq!(mirror.refresh().await.unwrap(), RefreshOutcome::Skipped);
        assert_eq!(fake.count("event_detail"), 1);

        gate.add_permits(1);
        assert_eq!(first.await.unwrap().unwrap(), RefreshOutcome::Applied);
        assert!(!mirror.is_refreshing());
    }

    #[tokio::test]
    async fn test_refresh_after_teardown_is_discarded() {
        let fake = FakeEventService::with_event(sample_event());
        let gate = fake.gate("event_detail");
        let mirror = mirror(&fake);

        let pending = tokio::spawn({
            let mirror = mirror.clone();
            async move { mirror.refresh().await }
        });
        tokio::task::yield_now().await;

        mirror.teardown();
        gate.add_permits(1);

        assert_eq!(pending.await.unwrap().unwrap(), RefreshOutcome::Discarded);
        assert!(mirror.snapshot().is_none());
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let fake = FakeEventService::with_event(sample_event());
        let mirror = mirror(&fake);
        mirror.refresh().await.unwrap();

        fake.fail("event_detail", ApiError::http(503, None));
        assert!(mirror.refresh().await.is_err());
        assert!(mirror.snapshot().is_some());
        assert!(!mirror.is_refreshing());
    }

    #[tokio::test]
    async fn test_patch_notifies_only_on_change() {
        let fake = FakeEventService::with_event(sample_event());
        let mirror = mirror(&fake);
        mirror.refresh().await.unwrap();
        let mut rx = mirror.subscribe();
        rx.borrow_and_update();

        let targets = [
            VoteTarget::Flat(FlatList::AssumptionCreation),
            VoteTarget::Nested(NestedList::AssumptionProposals),
        ];
        assert!(!mirror.patch(&ProposalId::new("nope"), VoteInfo::new(1, true), &targets));
        assert!(!rx.has_changed().unwrap());

        assert!(mirror.patch(&ProposalId::new("ap-1"), VoteInfo::new(3, true), &targets));
        assert!(rx.has_changed().unwrap());
        assert_eq!(
            mirror.proposal(&ProposalId::new("ap-1")).unwrap().vote_info,
            VoteInfo::new(3, true)
        );
    }

    #[test]
    fn test_patch_without_snapshot_is_noop() {
        let fake = FakeEventService::with_event(sample_event());
        let mirror = EventMirror::new(EventId::new("e-1"), fake);
        assert!(!mirror.patch(
            &ProposalId::new("ap-1"),
            VoteInfo::new(1, true),
            &[VoteTarget::Nested(NestedList::AssumptionProposals)]
        ));
    }
}
