//! Comments attached to a criterion.

use serde::{Deserialize, Serialize};

use crate::ids::{CommentId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub content: String,
    pub created_by: UserId,
    /// Display name of the author.
    #[serde(default)]
    pub creator: Option<String>,
}

impl Comment {
    /// Only the author may edit or delete. The server checks again.
    pub fn is_authored_by(&self, user_id: &UserId) -> bool {
        &self.created_by == user_id
    }
}
