//! Port interfaces for the application layer
//!
//! Ports describe the Event Service API as the application consumes it. The
//! HTTP adapter in `ag-infra` implements all of them; tests substitute
//! in-memory fakes.

mod auth;
mod comment;
pub mod errors;
mod event;
mod membership;
mod proposal;
mod vote;

pub use auth::{AuthPort, CredentialRefresher};
pub use comment::CommentPort;
pub use errors::ApiError;
pub use event::{EventAdminPort, EventQueryPort};
pub use membership::MembershipPort;
pub use proposal::{NewProposal, ProposalPort};
pub use vote::{FinalVotePort, VotePort};
