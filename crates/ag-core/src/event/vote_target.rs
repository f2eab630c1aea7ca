//! Locating a proposal across structurally different lists.
//!
//! Proposals live either in a top-level list of the event (creation
//! proposals) or inside a parent entity (assumption/criterion proposals,
//! conclusion proposals). A [`VoteTarget`] names one such list so the same
//! patch routine serves every scope.

use std::sync::Arc;

use super::{EventDetail, Proposal, VoteInfo};
use crate::ids::ProposalId;

/// A top-level proposal list of the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlatList {
    AssumptionCreation,
    CriteriaCreation,
}

/// A proposal list embedded in every parent entity of one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestedList {
    /// `assumptions[*].proposals`
    AssumptionProposals,
    /// `criteria[*].proposals`
    CriterionProposals,
    /// `criteria[*].conclusionProposals`
    CriterionConclusions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTarget {
    Flat(FlatList),
    Nested(NestedList),
}

impl VoteTarget {
    fn contains(self, event: &EventDetail, id: &ProposalId) -> bool {
        let hit = |list: &[Proposal]| list.iter().any(|p| &p.id == id);
        match self {
            VoteTarget::Flat(FlatList::AssumptionCreation) => {
                hit(&event.assumption_creation_proposals)
            }
            VoteTarget::Flat(FlatList::CriteriaCreation) => hit(&event.criteria_creation_proposals),
            VoteTarget::Nested(NestedList::AssumptionProposals) => {
                event.assumptions.iter().any(|a| hit(&a.proposals))
            }
            VoteTarget::Nested(NestedList::CriterionProposals) => {
                event.criteria.iter().any(|c| hit(&c.proposals))
            }
            VoteTarget::Nested(NestedList::CriterionConclusions) => {
                event.criteria.iter().any(|c| hit(&c.conclusion_proposals))
            }
        }
    }

    /// Returns every list this target describes, mutably.
    fn lists_mut(self, event: &mut EventDetail) -> Vec<&mut Vec<Proposal>> {
        match self {
            VoteTarget::Flat(FlatList::AssumptionCreation) => {
                vec![&mut event.assumption_creation_proposals]
            }
            VoteTarget::Flat(FlatList::CriteriaCreation) => {
                vec![&mut event.criteria_creation_proposals]
            }
            VoteTarget::Nested(NestedList::AssumptionProposals) => event
                .assumptions
                .iter_mut()
                .map(|a| &mut a.proposals)
                .collect(),
            VoteTarget::Nested(NestedList::CriterionProposals) => event
                .criteria
                .iter_mut()
                .map(|c| &mut c.proposals)
                .collect(),
            VoteTarget::Nested(NestedList::CriterionConclusions) => event
                .criteria
                .iter_mut()
                .map(|c| &mut c.conclusion_proposals)
                .collect(),
        }
    }
}

/// Replaces the `voteInfo` of `proposal_id` in the first target that holds it.
///
/// Copy-on-write: when no target contains the id the very same `Arc` is
/// returned, so callers can detect "nothing changed" with `Arc::ptr_eq`.
pub fn patch_vote_info(
    snapshot: &Arc<EventDetail>,
    proposal_id: &ProposalId,
    next: VoteInfo,
    targets: &[VoteTarget],
) -> Arc<EventDetail> {
    let Some(target) = targets
        .iter()
        .copied()
        .find(|t| t.contains(snapshot, proposal_id))
    else {
        return Arc::clone(snapshot);
    };

    let mut next_event = EventDetail::clone(snapshot);
    for list in target.lists_mut(&mut next_event) {
        if let Some(proposal) = list.iter_mut().find(|p| &p.id == proposal_id) {
            proposal.vote_info = next;
            break;
        }
    }
    Arc::new(next_event)
}
