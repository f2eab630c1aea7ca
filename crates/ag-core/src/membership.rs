//! Participation records of an event.

use serde::{Deserialize, Serialize};

use crate::ids::{MembershipId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipStatus {
    Pending,
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Membership {
    pub membership_id: MembershipId,
    pub user_id: UserId,
    #[serde(default)]
    pub user_name: Option<String>,
    pub status: MembershipStatus,
}

/// Admin decision applied to a batch of membership requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MembershipDecision {
    Approve,
    Reject,
}

impl MembershipDecision {
    pub fn resulting_status(self) -> MembershipStatus {
        match self {
            MembershipDecision::Approve => MembershipStatus::Accepted,
            MembershipDecision::Reject => MembershipStatus::Rejected,
        }
    }
}
