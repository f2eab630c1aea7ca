//! In-memory Event Service for tests of this crate and its dependents.
//!
//! Every port call is recorded by name. A call can be made to fail with a
//! configured error, or to block on a gate until the test releases it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;

use ag_core::event::{
    Assumption, Criterion, DecisionOption, EventDetail, EventStatus, EventSummary, Proposal,
    ProposalCategory, ProposalScope, ProposalStatus, VoteInfo,
};
use ag_core::ports::{
    ApiError, CommentPort, EventAdminPort, EventQueryPort, FinalVotePort, MembershipPort,
    NewProposal, ProposalPort, VotePort,
};
use ag_core::{
    AssumptionId, Comment, CommentId, CriterionId, EventId, FinalVote, FinalVoteResult,
    IdempotencyKey, Membership, MembershipDecision, MembershipId, OptionId, ProposalId,
    SessionContext,
};

use crate::deps::AppDeps;

pub const FALLBACK: &str = "Something went wrong";

#[derive(Default)]
pub struct FakeEventService {
    pub event: Mutex<Option<EventDetail>>,
    pub comments: Mutex<HashMap<CriterionId, Vec<Comment>>>,
    pub memberships: Mutex<Vec<Membership>>,
    pub my_vote: Mutex<Option<FinalVote>>,
    pub result: Mutex<Option<FinalVoteResult>>,
    /// `(operation, idempotency key)` for every keyed mutation.
    pub keys: Mutex<Vec<(String, IdempotencyKey)>>,
    pub submitted_votes: Mutex<Vec<FinalVote>>,
    pub created_assumption_proposals: Mutex<Vec<NewProposal<AssumptionId>>>,
    pub created_criteria_proposals: Mutex<Vec<NewProposal<CriterionId>>>,
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<&'static str, ApiError>>,
    gates: Mutex<HashMap<&'static str, Arc<Semaphore>>>,
}

impl FakeEventService {
    pub fn with_event(event: EventDetail) -> Arc<Self> {
        let fake = Self::default();
        *fake.event.lock().unwrap() = Some(event);
        Arc::new(fake)
    }

    pub fn deps(self: &Arc<Self>) -> AppDeps {
        AppDeps {
            session: SessionContext::new(),
            events: self.clone(),
            admin: self.clone(),
            proposals: self.clone(),
            votes: self.clone(),
            final_votes: self.clone(),
            comments: self.clone(),
            memberships: self.clone(),
            fallback_error_message: FALLBACK.to_string(),
        }
    }

    pub fn fail(&self, op: &'static str, err: ApiError) {
        self.failures.lock().unwrap().insert(op, err);
    }

    pub fn succeed(&self, op: &'static str) {
        self.failures.lock().unwrap().remove(op);
    }

    /// Subsequent calls of `op` block until [`FakeEventService::release`].
    pub fn gate(&self, op: &'static str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates.lock().unwrap().insert(op, gate.clone());
        gate
    }

    pub fn release(&self, op: &'static str) {
        if let Some(gate) = self.gates.lock().unwrap().get(op) {
            gate.add_permits(1);
        }
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.split(':').next() == Some(op))
            .count()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_vote_info(&self, proposal_id: &str, info: VoteInfo) {
        let mut event = self.event.lock().unwrap();
        let event = event.as_mut().expect("event configured");
        let id = ProposalId::new(proposal_id);
        let lists = std::iter::once(&mut event.assumption_creation_proposals)
            .chain(std::iter::once(&mut event.criteria_creation_proposals))
            .chain(event.assumptions.iter_mut().map(|a| &mut a.proposals))
            .chain(
                event
                    .criteria
                    .iter_mut()
                    .flat_map(|c| [&mut c.proposals, &mut c.conclusion_proposals]),
            );
        for list in lists {
            for p in list.iter_mut().filter(|p| p.id == id) {
                p.vote_info = info;
            }
        }
    }

    async fn enter(&self, op: &'static str, detail: &str) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(format!("{op}:{detail}"));
        let gate = self.gates.lock().unwrap().get(op).cloned();
        if let Some(gate) = gate {
            gate.acquire().await.expect("gate open").forget();
        }
        match self.failures.lock().unwrap().get(op) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    fn record_key(&self, op: &str, key: &IdempotencyKey) {
        self.keys.lock().unwrap().push((op.to_string(), key.clone()));
    }
}

#[async_trait]
impl EventQueryPort for FakeEventService {
    async fn list_events(&self) -> Result<Vec<EventSummary>, ApiError> {
        self.enter("list_events", "").await?;
        Ok(self
            .event
            .lock()
            .unwrap()
            .iter()
            .map(|e| EventSummary {
                id: e.id.clone(),
                title: e.title.clone(),
                status: e.status,
                is_admin: e.is_admin,
                participant_count: e.participant_count,
            })
            .collect())
    }

    async fn event_detail(&self, event_id: &EventId) -> Result<EventDetail, ApiError> {
        self.enter("event_detail", event_id.as_str()).await?;
        self.event
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ApiError::http(404, None))
    }
}

#[async_trait]
impl EventAdminPort for FakeEventService {
    async fn change_event_status(
        &self,
        event_id: &EventId,
        status: EventStatus,
        key: &IdempotencyKey,
    ) -> Result<(), ApiError> {
        self.record_key("change_event_status", key);
        self.enter("change_event_status", event_id.as_str()).await?;
        if let Some(event) = self.event.lock().unwrap().as_mut() {
            event.status = status;
        }
        Ok(())
    }

    async fn change_proposal_status(
        &self,
        _event_id: &EventId,
        _scope: ProposalScope,
        proposal_id: &ProposalId,
        _status: ProposalStatus,
        key: &IdempotencyKey,
    ) -> Result<(), ApiError> {
        self.record_key("change_proposal_status", key);
        self.enter("change_proposal_status", proposal_id.as_str())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ProposalPort for FakeEventService {
    async fn create_assumption_proposal(
        &self,
        _event_id: &EventId,
        proposal: &NewProposal<AssumptionId>,
        key: &IdempotencyKey,
    ) -> Result<(), ApiError> {
        self.record_key("create_assumption_proposal", key);
        self.enter("create_assumption_proposal", "").await?;
        self.created_assumption_proposals
            .lock()
            .unwrap()
            .push(proposal.clone());
        Ok(())
    }

    async fn create_criteria_proposal(
        &self,
        _event_id: &EventId,
        proposal: &NewProposal<CriterionId>,
        key: &IdempotencyKey,
    ) -> Result<(), ApiError> {
        self.record_key("create_criteria_proposal", key);
        self.enter("create_criteria_proposal", "").await?;
        self.created_criteria_proposals
            .lock()
            .unwrap()
            .push(proposal.clone());
        Ok(())
    }

    async fn create_conclusion_proposal(
        &self,
        _event_id: &EventId,
        criterion_id: &CriterionId,
        _content: &str,
        key: &IdempotencyKey,
    ) -> Result<(), ApiError> {
        self.record_key("create_conclusion_proposal", key);
        self.enter("create_conclusion_proposal", criterion_id.as_str())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl VotePort for FakeEventService {
    async fn cast_vote(
        &self,
        _event_id: &EventId,
        scope: ProposalScope,
        proposal_id: &ProposalId,
    ) -> Result<(), ApiError> {
        self.enter("cast_vote", &format!("{}/{}", scope.path_segment(), proposal_id))
            .await
    }

    async fn retract_vote(
        &self,
        _event_id: &EventId,
        scope: ProposalScope,
        proposal_id: &ProposalId,
    ) -> Result<(), ApiError> {
        self.enter(
            "retract_vote",
            &format!("{}/{}", scope.path_segment(), proposal_id),
        )
        .await
    }
}

#[async_trait]
impl FinalVotePort for FakeEventService {
    async fn submit_final_vote(
        &self,
        _event_id: &EventId,
        vote: &FinalVote,
        key: &IdempotencyKey,
    ) -> Result<(), ApiError> {
        self.record_key("submit_final_vote", key);
        self.enter("submit_final_vote", "").await?;
        self.submitted_votes.lock().unwrap().push(vote.clone());
        *self.my_vote.lock().unwrap() = Some(vote.clone());
        Ok(())
    }

    async fn my_final_vote(&self, _event_id: &EventId) -> Result<FinalVote, ApiError> {
        self.enter("my_final_vote", "").await?;
        self.my_vote
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ApiError::http(404, Some("vote not found".to_string())))
    }

    async fn final_vote_result(&self, _event_id: &EventId) -> Result<FinalVoteResult, ApiError> {
        self.enter("final_vote_result", "").await?;
        self.result
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ApiError::http(404, None))
    }
}

#[async_trait]
impl CommentPort for FakeEventService {
    async fn list_comments(
        &self,
        _event_id: &EventId,
        criterion_id: &CriterionId,
    ) -> Result<Vec<Comment>, ApiError> {
        self.enter("list_comments", criterion_id.as_str()).await?;
        Ok(self
            .comments
            .lock()
            .unwrap()
            .get(criterion_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_comment(
        &self,
        _event_id: &EventId,
        criterion_id: &CriterionId,
        content: &str,
    ) -> Result<(), ApiError> {
        self.enter("create_comment", criterion_id.as_str()).await?;
        let mut comments = self.comments.lock().unwrap();
        let list = comments.entry(criterion_id.clone()).or_default();
        let id = CommentId::new(format!("cm-{}", list.len() + 1));
        list.push(Comment {
            id,
            content: content.to_string(),
            created_by: ag_core::UserId::new("u-1"),
            creator: Some("Ada".to_string()),
        });
        Ok(())
    }

    async fn update_comment(
        &self,
        _event_id: &EventId,
        comment_id: &CommentId,
        content: &str,
    ) -> Result<(), ApiError> {
        self.enter("update_comment", comment_id.as_str()).await?;
        for list in self.comments.lock().unwrap().values_mut() {
            for c in list.iter_mut().filter(|c| &c.id == comment_id) {
                c.content = content.to_string();
            }
        }
        Ok(())
    }

    async fn delete_comment(
        &self,
        _event_id: &EventId,
        comment_id: &CommentId,
    ) -> Result<(), ApiError> {
        self.enter("delete_comment", comment_id.as_str()).await?;
        for list in self.comments.lock().unwrap().values_mut() {
            list.retain(|c| &c.id != comment_id);
        }
        Ok(())
    }
}

#[async_trait]
impl MembershipPort for FakeEventService {
    async fn list_memberships(&self, _event_id: &EventId) -> Result<Vec<Membership>, ApiError> {
        self.enter("list_memberships", "").await?;
        Ok(self.memberships.lock().unwrap().clone())
    }

    async fn decide_memberships(
        &self,
        _event_id: &EventId,
        membership_ids: &[MembershipId],
        decision: MembershipDecision,
        key: &IdempotencyKey,
    ) -> Result<(), ApiError> {
        self.record_key("decide_memberships", key);
        self.enter("decide_memberships", &membership_ids.len().to_string())
            .await?;
        for m in self
            .memberships
            .lock()
            .unwrap()
            .iter_mut()
            .filter(|m| membership_ids.contains(&m.membership_id))
        {
            m.status = decision.resulting_status();
        }
        Ok(())
    }
}

pub fn proposal(id: &str, scope: ProposalScope, count: u32, has_voted: bool) -> Proposal {
    Proposal {
        id: ProposalId::new(id),
        scope,
        category: match scope {
            ProposalScope::Conclusion => None,
            _ => Some(ProposalCategory::Modification),
        },
        status: ProposalStatus::Pending,
        content: Some(format!("content of {id}")),
        reason: Some("because".to_string()),
        vote_info: VoteInfo::new(count, has_voted),
    }
}

/// Event with one proposal in every list:
/// `ac-1` (assumption creation), `ap-1` (assumption `a-1`),
/// `ccr-1` (criteria creation), `cp-1` (criterion `c-1`),
/// `cc-1` (conclusion of `c-1`).
pub fn sample_event() -> EventDetail {
    EventDetail {
        id: EventId::new("e-1"),
        title: "Pick a venue".to_string(),
        status: EventStatus::InProgress,
        is_admin: false,
        options: vec![
            DecisionOption {
                id: OptionId::new("o-1"),
                content: "Hall".to_string(),
            },
            DecisionOption {
                id: OptionId::new("o-2"),
                content: "Park".to_string(),
            },
        ],
        assumptions: vec![Assumption {
            id: AssumptionId::new("a-1"),
            content: "Budget is fixed".to_string(),
            proposals: vec![proposal("ap-1", ProposalScope::Assumption, 2, false)],
        }],
        criteria: vec![
            Criterion {
                id: CriterionId::new("c-1"),
                content: "Cost".to_string(),
                proposals: vec![proposal("cp-1", ProposalScope::Criteria, 1, true)],
                conclusion: None,
                conclusion_proposals: vec![proposal("cc-1", ProposalScope::Conclusion, 0, false)],
            },
            Criterion {
                id: CriterionId::new("c-2"),
                content: "Distance".to_string(),
                proposals: Vec::new(),
                conclusion: None,
                conclusion_proposals: Vec::new(),
            },
        ],
        assumption_creation_proposals: vec![Proposal {
            category: Some(ProposalCategory::Creation),
            ..proposal("ac-1", ProposalScope::Assumption, 4, true)
        }],
        criteria_creation_proposals: vec![Proposal {
            category: Some(ProposalCategory::Creation),
            ..proposal("ccr-1", ProposalScope::Criteria, 0, false)
        }],
        participant_count: 5,
    }
}
