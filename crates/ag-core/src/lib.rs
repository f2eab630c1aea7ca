//! # ag-core
//!
//! Core domain models, ports and pure state helpers for Agora.
//!
//! This crate contains no I/O. Network access is expressed as port traits
//! implemented by `ag-infra`.

// Public module exports
pub mod comment;
pub mod config;
pub mod event;
pub mod final_vote;
pub mod ids;
pub mod membership;
pub mod ports;
pub mod session;

// Re-export commonly used types at the crate root
pub use comment::Comment;
pub use config::AppConfig;
pub use event::{
    EventDetail, EventStatus, EventSummary, Proposal, ProposalCategory, ProposalScope,
    ProposalStatus, VoteInfo, VoteTarget,
};
pub use final_vote::{FinalVote, FinalVoteResult};
pub use ids::{
    AssumptionId, CommentId, CriterionId, EventId, IdempotencyKey, MembershipId, OptionId,
    ProposalId, UserId,
};
pub use membership::{Membership, MembershipDecision, MembershipStatus};
pub use session::{AccessToken, AuthGrant, Session, SessionContext, User};
