//! Decision event domain models.
//!
//! These mirror the Event Service wire format (camelCase JSON). Status values
//! are server-driven; the client only displays them and requests changes.

mod vote_target;

pub use vote_target::{patch_vote_info, FlatList, NestedList, VoteTarget};

use serde::{Deserialize, Serialize};

use crate::ids::{AssumptionId, CriterionId, EventId, OptionId, ProposalId};

/// Lifecycle status of a decision event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventStatus {
    NotStarted,
    InProgress,
    Paused,
    Finished,
}

/// Which part of the event a proposal targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProposalScope {
    Assumption,
    Criteria,
    Conclusion,
}

impl ProposalScope {
    /// Path segment used by the proposal endpoints of this scope.
    pub fn path_segment(self) -> &'static str {
        match self {
            ProposalScope::Assumption => "assumption-proposals",
            ProposalScope::Criteria => "criteria-proposals",
            ProposalScope::Conclusion => "conclusion-proposals",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalCategory {
    Creation,
    Modification,
    Deletion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatus {
    Pending,
    Accepted,
    Rejected,
}

impl ProposalStatus {
    /// `Accepted` and `Rejected` never change again from the client's view.
    pub fn is_terminal(self) -> bool {
        !matches!(self, ProposalStatus::Pending)
    }
}

/// Vote tally of a proposal as seen by the current user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteInfo {
    pub count: u32,
    pub has_voted: bool,
}

impl VoteInfo {
    pub fn new(count: u32, has_voted: bool) -> Self {
        Self { count, has_voted }
    }

    /// The tally after the current user flips their vote.
    ///
    /// The count never drops below zero, even when the base is stale.
    pub fn toggled(self) -> Self {
        let has_voted = !self.has_voted;
        let count = if has_voted {
            self.count.saturating_add(1)
        } else {
            self.count.saturating_sub(1)
        };
        Self { count, has_voted }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: ProposalId,
    pub scope: ProposalScope,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<ProposalCategory>,
    pub status: ProposalStatus,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    pub vote_info: VoteInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionOption {
    pub id: OptionId,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assumption {
    pub id: AssumptionId,
    pub content: String,
    #[serde(default)]
    pub proposals: Vec<Proposal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    pub id: CriterionId,
    pub content: String,
    #[serde(default)]
    pub proposals: Vec<Proposal>,
    #[serde(default)]
    pub conclusion: Option<String>,
    #[serde(default)]
    pub conclusion_proposals: Vec<Proposal>,
}

/// Full detail snapshot of one decision event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetail {
    pub id: EventId,
    #[serde(default)]
    pub title: String,
    pub status: EventStatus,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub options: Vec<DecisionOption>,
    #[serde(default)]
    pub assumptions: Vec<Assumption>,
    #[serde(default)]
    pub criteria: Vec<Criterion>,
    #[serde(default)]
    pub assumption_creation_proposals: Vec<Proposal>,
    #[serde(default)]
    pub criteria_creation_proposals: Vec<Proposal>,
    #[serde(default)]
    pub participant_count: u32,
}

impl EventDetail {
    /// Iterates every proposal in the snapshot, whatever list it lives in.
    pub fn proposals(&self) -> impl Iterator<Item = &Proposal> {
        self.assumption_creation_proposals
            .iter()
            .chain(self.criteria_creation_proposals.iter())
            .chain(self.assumptions.iter().flat_map(|a| a.proposals.iter()))
            .chain(self.criteria.iter().flat_map(|c| c.proposals.iter()))
            .chain(
                self.criteria
                    .iter()
                    .flat_map(|c| c.conclusion_proposals.iter()),
            )
    }

    pub fn find_proposal(&self, id: &ProposalId) -> Option<&Proposal> {
        self.proposals().find(|p| &p.id == id)
    }

    /// Criterion ids in display order; the default ordering of a fresh ballot.
    pub fn criterion_order(&self) -> Vec<CriterionId> {
        self.criteria.iter().map(|c| c.id.clone()).collect()
    }
}

/// Row of the event directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub id: EventId,
    pub title: String,
    pub status: EventStatus,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub participant_count: u32,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_arithmetic() {
        assert_eq!(VoteInfo::new(2, false).toggled(), VoteInfo::new(3, true));
        assert_eq!(VoteInfo::new(3, true).toggled(), VoteInfo::new(2, false));
    }

    #[test]
    fn test_toggle_twice_restores_original() {
        let original = VoteInfo::new(7, false);
        assert_eq!(original.toggled().toggled(), original);
    }

    #[test]
    fn test_toggle_never_goes_negative_from_stale_zero() {
        // stale base: server says voted but count already zero
        let stale = VoteInfo::new(0, true);
        assert_eq!(stale.toggled(), VoteInfo::new(0, false));

        let fresh = VoteInfo::new(0, false);
        assert_eq!(fresh.toggled().toggled(), fresh);
    }

    #[test]
    fn test_proposal_status_terminality() {
        assert!(!ProposalStatus::Pending.is_terminal());
        assert!(ProposalStatus::Accepted.is_terminal());
        assert!(ProposalStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_event_detail_deserializes_server_payload() {
        let json = serde_json::json!({
            "id": "e-1",
            "title": "Offsite",
            "status": "IN_PROGRESS",
            "isAdmin": true,
            "participantCount": 3,
            "criteria": [{
                "id": "c-1",
                "content": "Cost",
                "conclusionProposals": [{
                    "id": "cc-1",
                    "scope": "conclusion",
                    "status": "PENDING",
                    "content": "Cheapest wins",
                    "voteInfo": { "count": 1, "hasVoted": false }
                }]
            }]
        });

        let event: EventDetail = serde_json::from_value(json).unwrap();
        assert_eq!(event.status, EventStatus::InProgress);
        assert!(event.is_admin);
        assert!(event.assumptions.is_empty());
        let conclusion = &event.criteria[0].conclusion_proposals[0];
        assert_eq!(conclusion.category, None);
        assert_eq!(conclusion.vote_info, VoteInfo::new(1, false));
    }

    #[test]
    fn test_find_proposal_searches_every_list() {
        let event = fixtures::event();
        for id in ["ap-1", "cp-1", "cc-1", "ac-1", "ccr-1"] {
            assert!(event.find_proposal(&ProposalId::new(id)).is_some(), "{id}");
        }
        assert!(event.find_proposal(&ProposalId::new("missing")).is_none());
        assert_eq!(
            event.criterion_order(),
            vec![CriterionId::new("c-1"), CriterionId::new("c-2")]
        );
    }
}
