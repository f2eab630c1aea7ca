//! Optimistic vote toggle.
//!
//! The mirror is patched before the server answers. On failure the exact
//! previous tally is patched back; no refetch is made. At most one toggle per
//! proposal id is in flight; a second one is rejected, not queued.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::{debug, info_span, warn, Instrument};

use ag_core::event::{FlatList, NestedList};
use ag_core::ports::{ApiError, VotePort};
use ag_core::{EventId, Proposal, ProposalId, ProposalScope, VoteInfo, VoteTarget};

use crate::guard::{self, KeyGuard};
use crate::mirror::EventMirror;

#[derive(Debug, thiserror::Error)]
pub enum ToggleError {
    #[error("proposal {0} no longer accepts votes")]
    ProposalClosed(ProposalId),
    #[error("proposal {id} belongs to {actual:?} proposals, not {expected:?}")]
    ScopeMismatch {
        id: ProposalId,
        expected: ProposalScope,
        actual: ProposalScope,
    },
    #[error("{message}")]
    Failed {
        message: String,
        #[source]
        source: ApiError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// The server accepted the vote change; the mirror shows this tally.
    Applied(VoteInfo),
    /// A toggle for the same proposal was still in flight.
    Skipped,
}

/// Where proposals of a scope live inside an event snapshot.
pub fn targets_for(scope: ProposalScope) -> &'static [VoteTarget] {
    match scope {
        ProposalScope::Assumption => &[
            VoteTarget::Flat(FlatList::AssumptionCreation),
            VoteTarget::Nested(NestedList::AssumptionProposals),
        ],
        ProposalScope::Criteria => &[
            VoteTarget::Flat(FlatList::CriteriaCreation),
            VoteTarget::Nested(NestedList::CriterionProposals),
        ],
        ProposalScope::Conclusion => &[VoteTarget::Nested(NestedList::CriterionConclusions)],
    }
}

pub struct VoteToggleEngine {
    scope: ProposalScope,
    event_id: EventId,
    mirror: Arc<EventMirror>,
    votes: Arc<dyn VotePort>,
    in_flight: Mutex<HashSet<ProposalId>>,
    last_error: Mutex<Option<String>>,
    fallback_message: String,
}

impl VoteToggleEngine {
    pub fn new(
        scope: ProposalScope,
        event_id: EventId,
        mirror: Arc<EventMirror>,
        votes: Arc<dyn VotePort>,
        fallback_message: impl Into<String>,
    ) -> Self {
        Self {
            scope,
            event_id,
            mirror,
            votes,
            in_flight: Mutex::new(HashSet::new()),
            last_error: Mutex::new(None),
            fallback_message: fallback_message.into(),
        }
    }

    pub fn scope(&self) -> ProposalScope {
        self.scope
    }

    /// Flips the current user's vote on `proposal` as it is rendered now.
    pub async fn toggle(&self, proposal: &Proposal) -> Result<ToggleOutcome, ToggleError> {
        if proposal.scope != self.scope {
            return Err(ToggleError::ScopeMismatch {
                id: proposal.id.clone(),
                expected: self.scope,
                actual: proposal.scope,
            });
        }
        if proposal.status.is_terminal() {
            return Err(ToggleError::ProposalClosed(proposal.id.clone()));
        }

        let Some(_in_flight) = KeyGuard::acquire(&self.in_flight, &proposal.id) else {
            debug!(proposal_id = %proposal.id, "Toggle already in flight, skipping");
            return Ok(ToggleOutcome::Skipped);
        };

        let span = info_span!(
            "vote_toggle",
            scope = ?self.scope,
            proposal_id = %proposal.id
        );
        self.toggle_guarded(proposal).instrument(span).await
    }

    async fn toggle_guarded(&self, proposal: &Proposal) -> Result<ToggleOutcome, ToggleError> {
        let targets = targets_for(self.scope);
        let before = proposal.vote_info;
        let after = before.toggled();
        self.mirror.patch(&proposal.id, after, targets);

        let result = if after.has_voted {
            self.votes
                .cast_vote(&self.event_id, self.scope, &proposal.id)
                .await
        } else {
            self.votes
                .retract_vote(&self.event_id, self.scope, &proposal.id)
                .await
        };

        match result {
            Ok(()) => {
                debug!(count = after.count, has_voted = after.has_voted, "Vote applied");
                Ok(ToggleOutcome::Applied(after))
            }
            Err(err) => {
                self.mirror.patch(&proposal.id, before, targets);
                let message = err.user_message(&self.fallback_message);
                warn!(error = %err, "Vote toggle failed, rolled back");
                *self.lock_error() = Some(message.clone());
                Err(ToggleError::Failed {
                    message,
                    source: err,
                })
            }
        }
    }

    pub fn is_pending(&self, proposal_id: &ProposalId) -> bool {
        guard::contains(&self.in_flight, proposal_id)
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock_error().clone()
    }

    pub fn clear_error(&self) {
        self.lock_error().take();
    }

    fn lock_error(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.last_error
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
