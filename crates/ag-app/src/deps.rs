//! # Application Dependencies
//!
//! Groups the ports every event workspace needs.
//!
//! **Note**: This is NOT a Builder pattern.
//! - No build steps
//! - No default values
//! - Just parameter grouping

use std::sync::Arc;

use ag_core::ports::{
    CommentPort, EventAdminPort, EventQueryPort, FinalVotePort, MembershipPort, ProposalPort,
    VotePort,
};
use ag_core::SessionContext;

/// Application dependency grouping (non-Builder, just parameter grouping)
///
/// All dependencies are required - no defaults, no optional fields.
#[derive(Clone)]
pub struct AppDeps {
    // Session
    pub session: SessionContext,

    // Event Service ports
    pub events: Arc<dyn EventQueryPort>,
    pub admin: Arc<dyn EventAdminPort>,
    pub proposals: Arc<dyn ProposalPort>,
    pub votes: Arc<dyn VotePort>,
    pub final_votes: Arc<dyn FinalVotePort>,
    pub comments: Arc<dyn CommentPort>,
    pub memberships: Arc<dyn MembershipPort>,

    /// Shown when a failing call carries no server message.
    pub fallback_error_message: String,
}
