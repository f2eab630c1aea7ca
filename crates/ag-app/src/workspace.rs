//! Everything an open event view owns.
//!
//! Opening a workspace starts its poller; closing it stops the poller and
//! marks the mirrors dead so fetches still in flight are dropped.

use std::sync::Arc;

use tracing::{info, warn};

use ag_core::ports::ApiError;
use ag_core::{EventId, ProposalScope};

use crate::deps::AppDeps;
use crate::mirror::{CommentBoard, EventMirror, RefreshOutcome};
use crate::polling::{PollConfig, PollerHandle, ResourcePoller};
use crate::usecases::{
    EventAdmin, FinalVoteBallot, MembershipReview, ProposalComposer, VoteToggleEngine,
};

pub struct EventWorkspace {
    event_id: EventId,
    mirror: Arc<EventMirror>,
    board: Arc<CommentBoard>,
    poller: PollerHandle,
    assumption_votes: VoteToggleEngine,
    criteria_votes: VoteToggleEngine,
    conclusion_votes: VoteToggleEngine,
    composer: ProposalComposer,
    memberships: MembershipReview,
    ballot: FinalVoteBallot,
    admin: EventAdmin,
}

impl EventWorkspace {
    /// Must be called inside a tokio runtime; polling starts immediately.
    pub fn open(deps: &AppDeps, event_id: EventId, poll: PollConfig) -> Self {
        let fallback = deps.fallback_error_message.as_str();
        let mirror = Arc::new(EventMirror::new(event_id.clone(), deps.events.clone()));
        let board = Arc::new(CommentBoard::new(
            event_id.clone(),
            deps.comments.clone(),
            deps.session.clone(),
        ));

        let poller = {
            let mirror = Arc::clone(&mirror);
            ResourcePoller::spawn("event_detail", poll, true, move || {
                let mirror = Arc::clone(&mirror);
                async move {
                    if let Err(err) = mirror.refresh().await {
                        warn!(event_id = %mirror.event_id(), error = %err, "Scheduled refresh failed");
                    }
                }
            })
        };

        let votes = |scope| {
            VoteToggleEngine::new(
                scope,
                event_id.clone(),
                mirror.clone(),
                deps.votes.clone(),
                fallback,
            )
        };
        let assumption_votes = votes(ProposalScope::Assumption);
        let criteria_votes = votes(ProposalScope::Criteria);
        let conclusion_votes = votes(ProposalScope::Conclusion);

        let composer = ProposalComposer::new(
            event_id.clone(),
            deps.proposals.clone(),
            deps.comments.clone(),
            mirror.clone(),
            board.clone(),
            fallback,
        );
        let memberships =
            MembershipReview::new(event_id.clone(), deps.memberships.clone(), fallback);
        let ballot = FinalVoteBallot::new(event_id.clone(), deps.final_votes.clone(), fallback);
        let admin = EventAdmin::new(deps.admin.clone(), mirror.clone(), fallback);

        info!(event_id = %event_id, interval = ?poll.interval, "Event workspace opened");
        Self {
            event_id,
            mirror,
            board,
            poller,
            assumption_votes,
            criteria_votes,
            conclusion_votes,
            composer,
            memberships,
            ballot,
            admin,
        }
    }

    pub fn event_id(&self) -> &EventId {
        &self.event_id
    }

    pub fn mirror(&self) -> &Arc<EventMirror> {
        &self.mirror
    }

    pub fn comments(&self) -> &Arc<CommentBoard> {
        &self.board
    }

    pub fn votes(&self, scope: ProposalScope) -> &VoteToggleEngine {
        match scope {
            ProposalScope::Assumption => &self.assumption_votes,
            ProposalScope::Criteria => &self.criteria_votes,
            ProposalScope::Conclusion => &self.conclusion_votes,
        }
    }

    pub fn composer(&self) -> &ProposalComposer {
        &self.composer
    }

    pub fn memberships(&self) -> &MembershipReview {
        &self.memberships
    }

    pub fn ballot(&self) -> &FinalVoteBallot {
        &self.ballot
    }

    pub fn admin(&self) -> &EventAdmin {
        &self.admin
    }

    pub fn set_polling(&self, enabled: bool) {
        self.poller.set_enabled(enabled);
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_running() && self.poller.is_enabled()
    }

    /// Explicit refresh outside the polling schedule.
    pub async fn refresh(&self) -> Result<RefreshOutcome, ApiError> {
        self.mirror.refresh().await
    }

    pub fn close(&self) {
        self.poller.stop();
        self.mirror.teardown();
        self.board.teardown();
        info!(event_id = %self.event_id, "Event workspace closed");
    }
}

impl Drop for EventWorkspace {
    fn drop(&mut self) {
        if self.mirror.is_alive() {
            self.close();
        }
    }
}
