use async_trait::async_trait;

use super::ApiError;
use crate::comment::Comment;
use crate::ids::{CommentId, CriterionId, EventId};

#[async_trait]
pub trait CommentPort: Send + Sync {
    async fn list_comments(
        &self,
        event_id: &EventId,
        criterion_id: &CriterionId,
    ) -> Result<Vec<Comment>, ApiError>;

    async fn create_comment(
        &self,
        event_id: &EventId,
        criterion_id: &CriterionId,
        content: &str,
    ) -> Result<(), ApiError>;

    async fn update_comment(
        &self,
        event_id: &EventId,
        comment_id: &CommentId,
        content: &str,
    ) -> Result<(), ApiError>;

    async fn delete_comment(&self, event_id: &EventId, comment_id: &CommentId)
        -> Result<(), ApiError>;
}
