use async_trait::async_trait;
use serde::Serialize;

use super::ApiError;
use crate::event::ProposalCategory;
use crate::ids::{AssumptionId, CriterionId, EventId, IdempotencyKey};

/// Body of a new assumption or criteria proposal.
///
/// `target_id` is absent for creation proposals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProposal<T> {
    pub target_id: Option<T>,
    pub category: ProposalCategory,
    pub content: Option<String>,
    pub reason: Option<String>,
}

#[async_trait]
pub trait ProposalPort: Send + Sync {
    async fn create_assumption_proposal(
        &self,
        event_id: &EventId,
        proposal: &NewProposal<AssumptionId>,
        key: &IdempotencyKey,
    ) -> Result<(), ApiError>;

    async fn create_criteria_proposal(
        &self,
        event_id: &EventId,
        proposal: &NewProposal<CriterionId>,
        key: &IdempotencyKey,
    ) -> Result<(), ApiError>;

    async fn create_conclusion_proposal(
        &self,
        event_id: &EventId,
        criterion_id: &CriterionId,
        content: &str,
        key: &IdempotencyKey,
    ) -> Result<(), ApiError>;
}
