//! Final ranked vote: one option plus the criteria ordered by importance.

use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, info_span, warn, Instrument};

use ag_core::ports::{ApiError, FinalVotePort};
use ag_core::{CriterionId, EventDetail, EventId, FinalVote, FinalVoteResult, IdempotencyKey, OptionId};

use crate::guard::FlagGuard;

#[derive(Debug, thiserror::Error)]
pub enum BallotError {
    #[error("choose an option first")]
    OptionRequired,
    #[error("{message}")]
    Failed {
        message: String,
        #[source]
        source: ApiError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BallotOutcome {
    Submitted,
    AlreadySubmitting,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ballot {
    pub selected_option: Option<OptionId>,
    pub criterion_order: Vec<CriterionId>,
    /// Whether the server already holds a vote of this user.
    pub submitted: bool,
    pub error: Option<String>,
}

pub struct FinalVoteBallot {
    event_id: EventId,
    final_votes: Arc<dyn FinalVotePort>,
    ballot: Mutex<Ballot>,
    submitting: AtomicBool,
    fallback_message: String,
}

impl FinalVoteBallot {
    pub fn new(
        event_id: EventId,
        final_votes: Arc<dyn FinalVotePort>,
        fallback_message: impl Into<String>,
    ) -> Self {
        Self {
            event_id,
            final_votes,
            ballot: Mutex::new(Ballot::default()),
            submitting: AtomicBool::new(false),
            fallback_message: fallback_message.into(),
        }
    }

    /// Loads the user's previous vote. Having none yet is not an error.
    pub async fn load(&self, event: &EventDetail) -> Result<Ballot, BallotError> {
        let default_order = event.criterion_order();
        let ballot = match self.final_votes.my_final_vote(&self.event_id).await {
            Ok(vote) => Ballot {
                selected_option: Some(vote.option_id),
                criterion_order: reconcile_order(vote.criterion_order, &default_order),
                submitted: true,
                error: None,
            },
            Err(err) if err.is_not_found() => {
                debug!(event_id = %self.event_id, "No final vote yet");
                Ballot {
                    criterion_order: default_order,
                    ..Ballot::default()
                }
            }
            Err(err) => {
                let message = err.user_message(&self.fallback_message);
                self.lock_ballot().error = Some(message.clone());
                return Err(BallotError::Failed {
                    message,
                    source: err,
                });
            }
        };
        *self.lock_ballot() = ballot.clone();
        Ok(ballot)
    }

    pub fn ballot(&self) -> Ballot {
        self.lock_ballot().clone()
    }

    pub fn select_option(&self, option_id: OptionId) {
        self.lock_ballot().selected_option = Some(option_id);
    }

    /// Moves one criterion to another rank. Out-of-range positions are ignored.
    pub fn move_criterion(&self, from: usize, to: usize) -> bool {
        let mut ballot = self.lock_ballot();
        let order = &mut ballot.criterion_order;
        if from >= order.len() || to >= order.len() {
            return false;
        }
        let criterion = order.remove(from);
        order.insert(to, criterion);
        true
    }

    pub async fn submit(&self) -> Result<BallotOutcome, BallotError> {
        let Some(_in_flight) = FlagGuard::acquire(&self.submitting) else {
            return Ok(BallotOutcome::AlreadySubmitting);
        };

        let vote = {
            let ballot = self.lock_ballot();
            let option_id = ballot
                .selected_option
                .clone()
                .ok_or(BallotError::OptionRequired)?;
            FinalVote {
                option_id,
                criterion_order: ballot.criterion_order.clone(),
            }
        };

        let key = IdempotencyKey::generate();
        let span = info_span!("final_vote.submit", event_id = %self.event_id, key = %key);
        let result = self
            .final_votes
            .submit_final_vote(&self.event_id, &vote, &key)
            .instrument(span)
            .await;

        let mut ballot = self.lock_ballot();
        match result {
            Ok(()) => {
                info!(option_id = %vote.option_id, "Final vote submitted");
                ballot.submitted = true;
                ballot.error = None;
                Ok(BallotOutcome::Submitted)
            }
            Err(err) => {
                warn!(error = %err, "Final vote submission failed");
                let message = err.user_message(&self.fallback_message);
                ballot.error = Some(message.clone());
                Err(BallotError::Failed {
                    message,
                    source: err,
                })
            }
        }
    }

    /// Aggregated result; `None` while the server has nothing to show.
    pub async fn load_result(&self) -> Result<Option<FinalVoteResult>, BallotError> {
        match self.final_votes.final_vote_result(&self.event_id).await {
            Ok(result) => Ok(Some(result)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(BallotError::Failed {
                message: err.user_message(&self.fallback_message),
                source: err,
            }),
        }
    }

    fn lock_ballot(&self) -> MutexGuard<'_, Ballot> {
        self.ballot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Keeps the saved ranking for criteria that still exist and appends new
/// ones in event order.
fn reconcile_order(saved: Vec<CriterionId>, current: &[CriterionId]) -> Vec<CriterionId> {
    let mut order: Vec<CriterionId> = saved
        .into_iter()
        .filter(|id| current.contains(id))
        .collect();
    for id in current {
        if !order.contains(id) {
            order.push(id.clone());
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{sample_event, FakeEventService, FALLBACK};
    use ag_core::final_vote::OptionTally;

    fn ballot(fake: &Arc<FakeEventService>) -> FinalVoteBallot {
        FinalVoteBallot::new(EventId::new("e-1"), fake.clone(), FALLBACK)
    }

    fn ids(raw: &[&str]) -> Vec<CriterionId> {
        raw.iter().map(|id| CriterionId::new(*id)).collect()
    }

    #[tokio::test]
    async fn test_missing_vote_initializes_defaults_without_error() {
        let fake = FakeEventService::with_event(sample_event());
        let ballot = ballot(&fake);

        let loaded = ballot.load(&sample_event()).await.unwrap();

        assert_eq!(loaded.selected_option, None);
        assert_eq!(loaded.criterion_order, ids(&["c-1", "c-2"]));
        assert!(loaded.error.is_none());
        assert!(!loaded.submitted);
    }

    #[tokio::test]
    async fn test_other_errors_are_reported() {
        let fake = FakeEventService::with_event(sample_event());
        fake.fail("my_final_vote", ApiError::http(500, None));
        let ballot = ballot(&fake);

        assert!(ballot.load(&sample_event()).await.is_err());
        assert_eq!(ballot.ballot().error.as_deref(), Some(FALLBACK));
    }

    #[tokio::test]
    async fn test_saved_vote_is_reconciled_with_current_criteria() {
        let fake = FakeEventService::with_event(sample_event());
        *fake.my_vote.lock().unwrap() = Some(FinalVote {
            option_id: OptionId::new("o-2"),
            criterion_order: ids(&["c-2", "c-removed"]),
        });
        let ballot = ballot(&fake);

        let loaded = ballot.load(&sample_event()).await.unwrap();

        assert_eq!(loaded.selected_option, Some(OptionId::new("o-2")));
        assert_eq!(loaded.criterion_order, ids(&["c-2", "c-1"]));
        assert!(loaded.submitted);
    }

    #[tokio::test]
    async fn test_submit_requires_option_and_sends_ranking() {
        let fake = FakeEventService::with_event(sample_event());
        let ballot = ballot(&fake);
        ballot.load(&sample_event()).await.unwrap();

        assert!(matches!(
            ballot.submit().await,
            Err(BallotError::OptionRequired)
        ));
        assert_eq!(fake.count("submit_final_vote"), 0);

        ballot.select_option(OptionId::new("o-1"));
        assert!(ballot.move_criterion(1, 0));
        assert!(!ballot.move_criterion(0, 5));
        assert_eq!(ballot.submit().await.unwrap(), BallotOutcome::Submitted);

        let sent = fake.submitted_votes.lock().unwrap().clone();
        assert_eq!(
            sent,
            vec![FinalVote {
                option_id: OptionId::new("o-1"),
                criterion_order: ids(&["c-2", "c-1"]),
            }]
        );
        assert!(ballot.ballot().submitted);
    }

    #[tokio::test]
    async fn test_each_submit_attempt_gets_its_own_key() {
        let fake = FakeEventService::with_event(sample_event());
        fake.fail(
            "submit_final_vote",
            ApiError::http(409, Some("Voting is closed".to_string())),
        );
        let ballot = ballot(&fake);
        ballot.load(&sample_event()).await.unwrap();
        ballot.select_option(OptionId::new("o-1"));

        let err = ballot.submit().await.unwrap_err();
        assert_eq!(err.to_string(), "Voting is closed");
        fake.succeed("submit_final_vote");
        ballot.submit().await.unwrap();

        let keys = fake.keys.lock().unwrap().clone();
        assert_eq!(keys.len(), 2);
        assert_ne!(keys[0].1, keys[1].1);
        assert!(ballot.ballot().error.is_none());
    }

    #[tokio::test]
    async fn test_result_not_ready_is_none() {
        let fake = FakeEventService::with_event(sample_event());
        let ballot = ballot(&fake);
        assert_eq!(ballot.load_result().await.unwrap(), None);

        *fake.result.lock().unwrap() = Some(FinalVoteResult {
            option_ranking: vec![OptionTally {
                option_id: OptionId::new("o-1"),
                vote_count: 3,
            }],
            criterion_ranking: Vec::new(),
            voter_count: 3,
        });
        let result = ballot.load_result().await.unwrap().unwrap();
        assert_eq!(result.voter_count, 3);
    }
}
