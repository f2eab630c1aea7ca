//! Admin review of membership requests.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{info, info_span, warn, Instrument};

use ag_core::ports::{ApiError, MembershipPort};
use ag_core::{
    EventId, IdempotencyKey, Membership, MembershipDecision, MembershipId, MembershipStatus,
};

use crate::guard::FlagGuard;

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("select at least one membership request")]
    NothingSelected,
    #[error("{message}")]
    Failed {
        message: String,
        #[source]
        source: ApiError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOutcome {
    /// Number of memberships the server updated.
    Applied(usize),
    /// Another decision was still in flight.
    Skipped,
}

pub struct MembershipReview {
    event_id: EventId,
    memberships: Arc<dyn MembershipPort>,
    list: Mutex<Vec<Membership>>,
    deciding: AtomicBool,
    fallback_message: String,
}

impl MembershipReview {
    pub fn new(
        event_id: EventId,
        memberships: Arc<dyn MembershipPort>,
        fallback_message: impl Into<String>,
    ) -> Self {
        Self {
            event_id,
            memberships,
            list: Mutex::new(Vec::new()),
            deciding: AtomicBool::new(false),
            fallback_message: fallback_message.into(),
        }
    }

    pub async fn load(&self) -> Result<Vec<Membership>, ApiError> {
        let list = self.memberships.list_memberships(&self.event_id).await?;
        *self.lock_list() = list.clone();
        Ok(list)
    }

    pub fn memberships(&self) -> Vec<Membership> {
        self.lock_list().clone()
    }

    pub fn pending(&self) -> Vec<Membership> {
        self.lock_list()
            .iter()
            .filter(|m| m.status == MembershipStatus::Pending)
            .cloned()
            .collect()
    }

    /// Approves or rejects a batch in one request.
    ///
    /// The new status is shown immediately; on failure every touched
    /// membership gets back exactly the status it had before.
    pub async fn decide(
        &self,
        ids: &[MembershipId],
        decision: MembershipDecision,
    ) -> Result<ReviewOutcome, ReviewError> {
        if ids.is_empty() {
            return Err(ReviewError::NothingSelected);
        }
        let Some(_in_flight) = FlagGuard::acquire(&self.deciding) else {
            return Ok(ReviewOutcome::Skipped);
        };

        let previous = self.apply(ids, decision.resulting_status());
        let key = IdempotencyKey::generate();
        let span = info_span!(
            "membership.decide",
            event_id = %self.event_id,
            ?decision,
            count = ids.len()
        );

        let result = self
            .memberships
            .decide_memberships(&self.event_id, ids, decision, &key)
            .instrument(span)
            .await;

        match result {
            Ok(()) => {
                info!(count = ids.len(), ?decision, "Membership decision applied");
                Ok(ReviewOutcome::Applied(ids.len()))
            }
            Err(err) => {
                self.restore(&previous);
                warn!(error = %err, "Membership decision failed, rolled back");
                Err(ReviewError::Failed {
                    message: err.user_message(&self.fallback_message),
                    source: err,
                })
            }
        }
    }

    pub fn is_deciding(&self) -> bool {
        self.deciding.load(std::sync::atomic::Ordering::Acquire)
    }

    fn apply(
        &self,
        ids: &[MembershipId],
        status: MembershipStatus,
    ) -> HashMap<MembershipId, MembershipStatus> {
        let mut previous = HashMap::new();
        for membership in self
            .lock_list()
            .iter_mut()
            .filter(|m| ids.contains(&m.membership_id))
        {
            previous.insert(membership.membership_id.clone(), membership.status);
            membership.status = status;
        }
        previous
    }

    fn restore(&self, previous: &HashMap<MembershipId, MembershipStatus>) {
        for membership in self.lock_list().iter_mut() {
            if let Some(status) = previous.get(&membership.membership_id) {
                membership.status = *status;
            }
        }
    }

    fn lock_list(&self) -> MutexGuard<'_, Vec<Membership>> {
        self.list
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_event, FakeEventService, FALLBACK};
    use ag_core::UserId;

    fn member(id: &str, status: MembershipStatus) -> Membership {
        Membership {
            membership_id: MembershipId::new(id),
            user_id: UserId::new(format!("user-{id}")),
            user_name: None,
            status,
        }
    }

    async fn review() -> (Arc<FakeEventService>, Arc<MembershipReview>) {
        let fake = FakeEventService::with_event(sample_event());
        *fake.memberships.lock().unwrap() = vec![
            member("m-1", MembershipStatus::Pending),
            member("m-2", MembershipStatus::Pending),
            member("m-3", MembershipStatus::Rejected),
        ];
        let review = Arc::new(MembershipReview::new(
            EventId::new("e-1"),
            fake.clone(),
            FALLBACK,
        ));
        review.load().await.unwrap();
        (fake, review)
    }

    fn statuses(review: &MembershipReview) -> Vec<MembershipStatus> {
        review.memberships().iter().map(|m| m.status).collect()
    }

    #[tokio::test]
    async fn test_bulk_approve_uses_one_request_with_key() {
        let (fake, review) = review().await;
        assert_eq!(review.pending().len(), 2);

        let ids = [MembershipId::new("m-1"), MembershipId::new("m-2")];
        let outcome = review.decide(&ids, MembershipDecision::Approve).await.unwrap();

        assert_eq!(outcome, ReviewOutcome::Applied(2));
        assert_eq!(fake.calls().last().map(String::as_str), Some("decide_memberships:2"));
        assert_eq!(fake.keys.lock().unwrap().len(), 1);
        assert!(review.pending().is_empty());
    }

    #[tokio::test]
    async fn test_failure_restores_previous_statuses() {
        let (fake, review) = review().await;
        fake.fail("decide_memberships", ApiError::http(500, None));
        let before = statuses(&review);

        let ids = [MembershipId::new("m-1"), MembershipId::new("m-3")];
        let err = review
            .decide(&ids, MembershipDecision::Approve)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), FALLBACK);
        assert_eq!(statuses(&review), before);
        assert!(!review.is_deciding());
    }

    #[tokio::test]
    async fn test_decision_is_optimistic_and_exclusive() {
        let (fake, review) = review().await;
        let gate = fake.gate("decide_memberships");

        let pending = tokio::spawn({
            let review = review.clone();
            async move {
                review
                    .decide(&[MembershipId::new("m-1")], MembershipDecision::Reject)
                    .await
            }
        });
        tokio::task::yield_now().await;

        assert_eq!(review.memberships()[0].status, MembershipStatus::Rejected);
        let second = review
            .decide(&[MembershipId::new("m-2")], MembershipDecision::Approve)
            .await
            .unwrap();
        assert_eq!(second, ReviewOutcome::Skipped);

        gate.add_permits(1);
        assert_eq!(pending.await.unwrap().unwrap(), ReviewOutcome::Applied(1));
        assert_eq!(fake.count("decide_memberships"), 1);
    }

    #[tokio::test]
    async fn test_empty_selection_is_rejected_locally() {
        let (fake, review) = review().await;
        assert!(matches!(
            review.decide(&[], MembershipDecision::Approve).await,
            Err(ReviewError::NothingSelected)
        ));
        assert_eq!(fake.count("decide_memberships"), 0);
    }
}
