use async_trait::async_trait;

use super::ApiError;
use crate::event::{EventDetail, EventStatus, EventSummary, ProposalScope, ProposalStatus};
use crate::ids::{EventId, IdempotencyKey, ProposalId};

#[async_trait]
pub trait EventQueryPort: Send + Sync {
    async fn list_events(&self) -> Result<Vec<EventSummary>, ApiError>;
    async fn event_detail(&self, event_id: &EventId) -> Result<EventDetail, ApiError>;
}

/// Admin-only status requests. The server decides whether they take effect.
#[async_trait]
pub trait EventAdminPort: Send + Sync {
    async fn change_event_status(
        &self,
        event_id: &EventId,
        status: EventStatus,
        key: &IdempotencyKey,
    ) -> Result<(), ApiError>;

    async fn change_proposal_status(
        &self,
        event_id: &EventId,
        scope: ProposalScope,
        proposal_id: &ProposalId,
        status: ProposalStatus,
        key: &IdempotencyKey,
    ) -> Result<(), ApiError>;
}
