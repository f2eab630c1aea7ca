//! Use cases that mutate server state on behalf of the user.

pub mod composer;
pub mod event_admin;
pub mod final_vote;
pub mod membership;
pub mod vote_toggle;

pub use composer::{
    ComposerAction, ComposerConfig, ComposerPhase, Draft, DraftError, DraftTarget,
    ProposalComposer, SubmitOutcome,
};
pub use event_admin::{AdminError, EventAdmin};
pub use final_vote::{Ballot, BallotError, BallotOutcome, FinalVoteBallot};
pub use membership::{MembershipReview, ReviewError, ReviewOutcome};
pub use vote_toggle::{targets_for, ToggleError, ToggleOutcome, VoteToggleEngine};
