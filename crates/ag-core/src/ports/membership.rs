use async_trait::async_trait;

use super::ApiError;
use crate::ids::{EventId, IdempotencyKey, MembershipId};
use crate::membership::{Membership, MembershipDecision};

#[async_trait]
pub trait MembershipPort: Send + Sync {
    async fn list_memberships(&self, event_id: &EventId) -> Result<Vec<Membership>, ApiError>;

    /// One bulk request for the whole batch.
    async fn decide_memberships(
        &self,
        event_id: &EventId,
        membership_ids: &[MembershipId],
        decision: MembershipDecision,
        key: &IdempotencyKey,
    ) -> Result<(), ApiError>;
}
