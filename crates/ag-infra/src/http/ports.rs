//! Port implementations: one endpoint per method.

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::json;

use ag_core::ports::{
    ApiError, AuthPort, CommentPort, EventAdminPort, EventQueryPort, FinalVotePort,
    MembershipPort, NewProposal, ProposalPort, VotePort,
};
use ag_core::{
    AssumptionId, AuthGrant, Comment, CommentId, CriterionId, EventDetail, EventId, EventStatus,
    EventSummary, FinalVote, FinalVoteResult, IdempotencyKey, Membership, MembershipDecision,
    MembershipId, ProposalId, ProposalScope, ProposalStatus, User,
};

use super::{ApiRequest, HttpEventService};

fn event_path(event_id: &EventId) -> String {
    format!("/v1/events/{}", event_id.as_str())
}

fn proposal_path(event_id: &EventId, scope: ProposalScope, proposal_id: &ProposalId) -> String {
    format!(
        "{}/{}/{}",
        event_path(event_id),
        scope.path_segment(),
        proposal_id.as_str()
    )
}

/// The list endpoint wraps its items; accept a bare array as well.
#[derive(Deserialize)]
#[serde(untagged)]
enum EventList {
    Wrapped { events: Vec<EventSummary> },
    Bare(Vec<EventSummary>),
}

#[async_trait]
impl AuthPort for HttpEventService {
    async fn login(&self, email: &str, password: &str) -> Result<AuthGrant, ApiError> {
        let request = ApiRequest::new(Method::POST, "/auth/login")
            .json(&json!({ "email": email, "password": password }))?
            .without_reauth();
        self.fetch(request).await
    }

    async fn login_with_google(&self, id_token: &str) -> Result<AuthGrant, ApiError> {
        let request = ApiRequest::new(Method::POST, "/auth/google")
            .json(&json!({ "idToken": id_token }))?
            .without_reauth();
        self.fetch(request).await
    }

    async fn signup(&self, email: &str, password: &str) -> Result<AuthGrant, ApiError> {
        let request = ApiRequest::new(Method::POST, "/auth/signup")
            .json(&json!({ "email": email, "password": password }))?
            .without_reauth();
        self.fetch(request).await
    }

    async fn refresh(&self) -> Result<AuthGrant, ApiError> {
        self.fetch(ApiRequest::new(Method::POST, "/auth/refresh").without_reauth())
            .await
    }

    async fn logout(&self) -> Result<(), ApiError> {
        self.send(ApiRequest::new(Method::POST, "/auth/logout").without_reauth())
            .await
    }

    async fn me(&self) -> Result<User, ApiError> {
        self.fetch(ApiRequest::new(Method::GET, "/auth/me").without_reauth())
            .await
    }

    async fn update_name(&self, name: &str) -> Result<(), ApiError> {
        let request = ApiRequest::new(Method::PATCH, "/auth/me/name")
            .json(&json!({ "name": name }))?
            .without_reauth();
        self.send(request).await
    }
}

#[async_trait]
impl EventQueryPort for HttpEventService {
    async fn list_events(&self) -> Result<Vec<EventSummary>, ApiError> {
        let list: EventList = self.fetch(ApiRequest::new(Method::GET, "/v1/events")).await?;
        Ok(match list {
            EventList::Wrapped { events } | EventList::Bare(events) => events,
        })
    }

    async fn event_detail(&self, event_id: &EventId) -> Result<EventDetail, ApiError> {
        self.fetch(ApiRequest::new(Method::GET, event_path(event_id)))
            .await
    }
}

#[async_trait]
impl EventAdminPort for HttpEventService {
    async fn change_event_status(
        &self,
        event_id: &EventId,
        status: EventStatus,
        key: &IdempotencyKey,
    ) -> Result<(), ApiError> {
        let request = ApiRequest::new(Method::PATCH, format!("{}/status", event_path(event_id)))
            .json(&json!({ "status": status }))?
            .idempotency_key(key);
        self.send(request).await
    }

    async fn change_proposal_status(
        &self,
        event_id: &EventId,
        scope: ProposalScope,
        proposal_id: &ProposalId,
        status: ProposalStatus,
        key: &IdempotencyKey,
    ) -> Result<(), ApiError> {
        let path = format!("{}/status", proposal_path(event_id, scope, proposal_id));
        let request = ApiRequest::new(Method::PATCH, path)
            .json(&json!({ "status": status }))?
            .idempotency_key(key);
        self.send(request).await
    }
}

#[async_trait]
impl ProposalPort for HttpEventService {
    async fn create_assumption_proposal(
        &self,
        event_id: &EventId,
        proposal: &NewProposal<AssumptionId>,
        key: &IdempotencyKey,
    ) -> Result<(), ApiError> {
        let path = format!("{}/assumption-proposals", event_path(event_id));
        let request = ApiRequest::new(Method::POST, path)
            .json(proposal)?
            .idempotency_key(key);
        self.send(request).await
    }

    async fn create_criteria_proposal(
        &self,
        event_id: &EventId,
        proposal: &NewProposal<CriterionId>,
        key: &IdempotencyKey,
    ) -> Result<(), ApiError> {
        let path = format!("{}/criteria-proposals", event_path(event_id));
        let request = ApiRequest::new(Method::POST, path)
            .json(proposal)?
            .idempotency_key(key);
        self.send(request).await
    }

    async fn create_conclusion_proposal(
        &self,
        event_id: &EventId,
        criterion_id: &CriterionId,
        content: &str,
        key: &IdempotencyKey,
    ) -> Result<(), ApiError> {
        let path = format!(
            "{}/criteria/{}/conclusion-proposals",
            event_path(event_id),
            criterion_id.as_str()
        );
        let request = ApiRequest::new(Method::POST, path)
            .json(&json!({ "content": content }))?
            .idempotency_key(key);
        self.send(request).await
    }
}

#[async_trait]
impl VotePort for HttpEventService {
    async fn cast_vote(
        &self,
        event_id: &EventId,
        scope: ProposalScope,
        proposal_id: &ProposalId,
    ) -> Result<(), ApiError> {
        let path = format!("{}/votes", proposal_path(event_id, scope, proposal_id));
        self.send(ApiRequest::new(Method::POST, path)).await
    }

    async fn retract_vote(
        &self,
        event_id: &EventId,
        scope: ProposalScope,
        proposal_id: &ProposalId,
    ) -> Result<(), ApiError> {
        let path = format!("{}/votes", proposal_path(event_id, scope, proposal_id));
        self.send(ApiRequest::new(Method::DELETE, path)).await
    }
}

#[async_trait]
impl FinalVotePort for HttpEventService {
    async fn submit_final_vote(
        &self,
        event_id: &EventId,
        vote: &FinalVote,
        key: &IdempotencyKey,
    ) -> Result<(), ApiError> {
        let request = ApiRequest::new(Method::POST, format!("{}/votes", event_path(event_id)))
            .json(vote)?
            .idempotency_key(key);
        self.send(request).await
    }

    async fn my_final_vote(&self, event_id: &EventId) -> Result<FinalVote, ApiError> {
        self.fetch(ApiRequest::new(
            Method::GET,
            format!("{}/votes/me", event_path(event_id)),
        ))
        .await
    }

    async fn final_vote_result(&self, event_id: &EventId) -> Result<FinalVoteResult, ApiError> {
        self.fetch(ApiRequest::new(
            Method::GET,
            format!("{}/votes/result", event_path(event_id)),
        ))
        .await
    }
}

#[async_trait]
impl CommentPort for HttpEventService {
    async fn list_comments(
        &self,
        event_id: &EventId,
        criterion_id: &CriterionId,
    ) -> Result<Vec<Comment>, ApiError> {
        let path = format!(
            "{}/criteria/{}/comments",
            event_path(event_id),
            criterion_id.as_str()
        );
        self.fetch(ApiRequest::new(Method::GET, path)).await
    }

    async fn create_comment(
        &self,
        event_id: &EventId,
        criterion_id: &CriterionId,
        content: &str,
    ) -> Result<(), ApiError> {
        let path = format!(
            "{}/criteria/{}/comments",
            event_path(event_id),
            criterion_id.as_str()
        );
        let request = ApiRequest::new(Method::POST, path).json(&json!({ "content": content }))?;
        self.send(request).await
    }

    async fn update_comment(
        &self,
        event_id: &EventId,
        comment_id: &CommentId,
        content: &str,
    ) -> Result<(), ApiError> {
        let path = format!("{}/comments/{}", event_path(event_id), comment_id.as_str());
        let request = ApiRequest::new(Method::PATCH, path).json(&json!({ "content": content }))?;
        self.send(request).await
    }

    async fn delete_comment(
        &self,
        event_id: &EventId,
        comment_id: &CommentId,
    ) -> Result<(), ApiError> {
        let path = format!("{}/comments/{}", event_path(event_id), comment_id.as_str());
        self.send(ApiRequest::new(Method::DELETE, path)).await
    }
}

#[async_trait]
impl MembershipPort for HttpEventService {
    async fn list_memberships(&self, event_id: &EventId) -> Result<Vec<Membership>, ApiError> {
        self.fetch(ApiRequest::new(
            Method::GET,
            format!("{}/memberships", event_path(event_id)),
        ))
        .await
    }

    async fn decide_memberships(
        &self,
        event_id: &EventId,
        membership_ids: &[MembershipId],
        decision: MembershipDecision,
        key: &IdempotencyKey,
    ) -> Result<(), ApiError> {
        let request =
            ApiRequest::new(Method::PATCH, format!("{}/memberships", event_path(event_id)))
                .json(&json!({ "membershipIds": membership_ids, "decision": decision }))?
                .idempotency_key(key);
        self.send(request).await
    }
}
