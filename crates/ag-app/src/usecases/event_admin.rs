//! Admin status requests for an event and its proposals.
//!
//! The server decides the resulting status; the mirror is refreshed after
//! every accepted request instead of being patched locally.

use std::sync::Arc;

use tracing::{info, info_span, warn, Instrument};

use ag_core::ports::{ApiError, EventAdminPort};
use ag_core::{EventStatus, IdempotencyKey, ProposalId, ProposalScope, ProposalStatus};

use crate::mirror::EventMirror;

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("only event admins can do this")]
    NotAdmin,
    #[error("{message}")]
    Failed {
        message: String,
        #[source]
        source: ApiError,
    },
}

pub struct EventAdmin {
    admin: Arc<dyn EventAdminPort>,
    mirror: Arc<EventMirror>,
    fallback_message: String,
}

impl EventAdmin {
    pub fn new(
        admin: Arc<dyn EventAdminPort>,
        mirror: Arc<EventMirror>,
        fallback_message: impl Into<String>,
    ) -> Self {
        Self {
            admin,
            mirror,
            fallback_message: fallback_message.into(),
        }
    }

    pub async fn change_event_status(&self, next: EventStatus) -> Result<(), AdminError> {
        self.ensure_admin()?;
        let event_id = self.mirror.event_id();
        let key = IdempotencyKey::generate();

        let result = self
            .admin
            .change_event_status(event_id, next, &key)
            .instrument(info_span!("admin.event_status", event_id = %event_id, ?next))
            .await;
        self.finish(result).await?;
        info!(event_id = %event_id, ?next, "Event status change requested");
        Ok(())
    }

    pub async fn resolve_proposal(
        &self,
        scope: ProposalScope,
        proposal_id: &ProposalId,
        status: ProposalStatus,
    ) -> Result<(), AdminError> {
        self.ensure_admin()?;
        let event_id = self.mirror.event_id();
        let key = IdempotencyKey::generate();

        let result = self
            .admin
            .change_proposal_status(event_id, scope, proposal_id, status, &key)
            .instrument(info_span!(
                "admin.proposal_status",
                proposal_id = %proposal_id,
                ?status
            ))
            .await;
        self.finish(result).await
    }

    fn ensure_admin(&self) -> Result<(), AdminError> {
        match self.mirror.snapshot() {
            Some(event) if event.is_admin => Ok(()),
            _ => Err(AdminError::NotAdmin),
        }
    }

    async fn finish(&self, result: Result<(), ApiError>) -> Result<(), AdminError> {
        if let Err(err) = result {
            warn!(error = %err, "Admin request failed");
            return Err(AdminError::Failed {
                message: err.user_message(&self.fallback_message),
                source: err,
            });
        }
        if let Err(err) = self.mirror.refresh().await {
            warn!(error = %err, "Refresh after admin request failed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_event, FakeEventService, FALLBACK};
    use ag_core::{EventDetail, EventId};

    async fn admin_for(event: EventDetail) -> (Arc<FakeEventService>, Arc<EventMirror>, EventAdmin) {
        let fake = FakeEventService::with_event(event);
        let mirror = Arc::new(EventMirror::new(EventId::new("e-1"), fake.clone()));
        mirror.refresh().await.unwrap();
        let admin = EventAdmin::new(fake.clone(), mirror.clone(), FALLBACK);
        (fake, mirror, admin)
    }

    #[tokio::test]
    async fn test_non_admin_is_rejected_locally() {
        let (fake, _mirror, admin) = admin_for(sample_event()).await;

        let err = admin
            .change_event_status(EventStatus::Paused)
            .await
            .unwrap_err();

        assert!(matches!(err, AdminError::NotAdmin));
        assert_eq!(fake.count("change_event_status"), 0);
    }

    #[tokio::test]
    async fn test_status_change_refreshes_mirror() {
        let (fake, mirror, admin) = admin_for(EventDetail {
            is_admin: true,
            ..sample_event()
        })
        .await;

        admin.change_event_status(EventStatus::Finished).await.unwrap();

        assert_eq!(mirror.snapshot().unwrap().status, EventStatus::Finished);
        assert_eq!(fake.count("event_detail"), 2);
        assert_eq!(fake.keys.lock().unwrap()[0].0, "change_event_status");
    }

    #[tokio::test]
    async fn test_failed_proposal_resolution_surfaces_message() {
        let (fake, _mirror, admin) = admin_for(EventDetail {
            is_admin: true,
            ..sample_event()
        })
        .await;
        fake.fail(
            "change_proposal_status",
            ApiError::http(400, Some("Proposal already resolved".to_string())),
        );

        let err = admin
            .resolve_proposal(
                ProposalScope::Criteria,
                &ProposalId::new("cp-1"),
                ProposalStatus::Accepted,
            )
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Proposal already resolved");
        assert_eq!(fake.count("event_detail"), 1);
    }
}
