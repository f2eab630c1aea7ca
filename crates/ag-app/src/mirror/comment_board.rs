use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use ag_core::ports::{ApiError, CommentPort};
use ag_core::{Comment, CommentId, CriterionId, EventId, SessionContext};

use super::RefreshOutcome;
use crate::guard::KeyGuard;

#[derive(Debug, thiserror::Error)]
pub enum CommentError {
    #[error("comment content is required")]
    ContentRequired,
    #[error("comment {0} is not on this board")]
    UnknownComment(CommentId),
    #[error("only the author can change this comment")]
    NotAuthor,
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Comment lists of one event, keyed by criterion.
pub struct CommentBoard {
    event_id: EventId,
    comments: Arc<dyn CommentPort>,
    session: SessionContext,
    lists: Mutex<HashMap<CriterionId, Arc<Vec<Comment>>>>,
    in_flight: Mutex<HashSet<CriterionId>>,
    alive: AtomicBool,
}

impl CommentBoard {
    pub fn new(event_id: EventId, comments: Arc<dyn CommentPort>, session: SessionContext) -> Self {
        Self {
            event_id,
            comments,
            session,
            lists: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashSet::new()),
            alive: AtomicBool::new(true),
        }
    }

    /// Refetches one criterion's comments. One request per criterion at a time.
    pub async fn refresh(&self, criterion_id: &CriterionId) -> Result<RefreshOutcome, ApiError> {
        let Some(_in_flight) = KeyGuard::acquire(&self.in_flight, criterion_id) else {
            debug!(criterion_id = %criterion_id, "Comment fetch already in flight, skipping");
            return Ok(RefreshOutcome::Skipped);
        };

        let result = self
            .comments
            .list_comments(&self.event_id, criterion_id)
            .await;
        if !self.alive.load(Ordering::Acquire) {
            return Ok(RefreshOutcome::Discarded);
        }

        let list = result?;
        self.lock_lists()
            .insert(criterion_id.clone(), Arc::new(list));
        Ok(RefreshOutcome::Applied)
    }

    pub fn comments(&self, criterion_id: &CriterionId) -> Option<Arc<Vec<Comment>>> {
        self.lock_lists().get(criterion_id).cloned()
    }

    pub async fn edit_comment(
        &self,
        criterion_id: &CriterionId,
        comment_id: &CommentId,
        content: &str,
    ) -> Result<(), CommentError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(CommentError::ContentRequired);
        }
        self.ensure_author(criterion_id, comment_id)?;

        self.comments
            .update_comment(&self.event_id, comment_id, content)
            .await?;
        info!(comment_id = %comment_id, "Comment updated");
        self.refresh(criterion_id).await?;
        Ok(())
    }

    pub async fn delete_comment(
        &self,
        criterion_id: &CriterionId,
        comment_id: &CommentId,
    ) -> Result<(), CommentError> {
        self.ensure_author(criterion_id, comment_id)?;

        self.comments
            .delete_comment(&self.event_id, comment_id)
            .await?;
        info!(comment_id = %comment_id, "Comment deleted");
        self.refresh(criterion_id).await?;
        Ok(())
    }

    pub fn teardown(&self) {
        self.alive.store(false, Ordering::Release);
    }

    fn ensure_author(
        &self,
        criterion_id: &CriterionId,
        comment_id: &CommentId,
    ) -> Result<(), CommentError> {
        let lists = self.lock_lists();
        let comment = lists
            .get(criterion_id)
            .and_then(|list| list.iter().find(|c| &c.id == comment_id))
            .ok_or_else(|| CommentError::UnknownComment(comment_id.clone()))?;

        match self.session.user() {
            Some(user) if comment.is_authored_by(&user.id) => Ok(()),
            _ => Err(CommentError::NotAuthor),
        }
    }

    fn lock_lists(&self) -> std::sync::MutexGuard<'_, HashMap<CriterionId, Arc<Vec<Comment>>>> {
        self.lists
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
