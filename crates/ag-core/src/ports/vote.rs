use async_trait::async_trait;

use super::ApiError;
use crate::event::ProposalScope;
use crate::final_vote::{FinalVote, FinalVoteResult};
use crate::ids::{EventId, IdempotencyKey, ProposalId};

/// Per-proposal vote toggles: `POST|DELETE .../{scope}-proposals/{id}/votes`.
#[async_trait]
pub trait VotePort: Send + Sync {
    async fn cast_vote(
        &self,
        event_id: &EventId,
        scope: ProposalScope,
        proposal_id: &ProposalId,
    ) -> Result<(), ApiError>;

    async fn retract_vote(
        &self,
        event_id: &EventId,
        scope: ProposalScope,
        proposal_id: &ProposalId,
    ) -> Result<(), ApiError>;
}

/// Final ranked vote. `my_final_vote` answers 404 when the user has not voted.
#[async_trait]
pub trait FinalVotePort: Send + Sync {
    async fn submit_final_vote(
        &self,
        event_id: &EventId,
        vote: &FinalVote,
        key: &IdempotencyKey,
    ) -> Result<(), ApiError>;

    async fn my_final_vote(&self, event_id: &EventId) -> Result<FinalVote, ApiError>;

    async fn final_vote_result(&self, event_id: &EventId) -> Result<FinalVoteResult, ApiError>;
}
