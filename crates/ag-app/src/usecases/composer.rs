//! Proposal composer.
//!
//! One draft at a time: `Closed -> Drafting -> Submitting -> Closed`, or back
//! to `Drafting` with the server's message when the submission fails. A failed
//! draft is never discarded.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{info, info_span, warn, Instrument};

use ag_core::ports::{ApiError, CommentPort, NewProposal, ProposalPort};
use ag_core::{
    AssumptionId, CriterionId, EventId, IdempotencyKey, ProposalCategory, ProposalScope,
};

use crate::mirror::{CommentBoard, EventMirror};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerAction {
    Create,
    Modify,
    Delete,
    Comment,
    Conclusion,
}

impl ComposerAction {
    /// Proposal category sent to the server; `None` for non-proposal actions.
    pub fn category(self) -> Option<ProposalCategory> {
        match self {
            ComposerAction::Create => Some(ProposalCategory::Creation),
            ComposerAction::Modify => Some(ProposalCategory::Modification),
            ComposerAction::Delete => Some(ProposalCategory::Deletion),
            ComposerAction::Comment | ComposerAction::Conclusion => None,
        }
    }
}

/// Existing item a draft refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftTarget {
    Assumption(AssumptionId),
    Criterion(CriterionId),
}

impl DraftTarget {
    fn as_str(&self) -> &str {
        match self {
            DraftTarget::Assumption(id) => id.as_str(),
            DraftTarget::Criterion(id) => id.as_str(),
        }
    }

    fn assumption(&self) -> Option<&AssumptionId> {
        match self {
            DraftTarget::Assumption(id) => Some(id),
            DraftTarget::Criterion(_) => None,
        }
    }

    fn criterion(&self) -> Option<&CriterionId> {
        match self {
            DraftTarget::Criterion(id) => Some(id),
            DraftTarget::Assumption(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposerConfig {
    pub scope: ProposalScope,
    pub action: ComposerAction,
    /// Absent for creations.
    pub target: Option<DraftTarget>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerPhase {
    Closed,
    Drafting,
    Submitting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    pub config: ComposerConfig,
    pub content: String,
    pub reason: String,
    pub error: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum DraftError {
    #[error("no draft is open")]
    NotOpen,
    #[error("content is required")]
    ContentRequired,
    #[error("a reason is required")]
    ReasonRequired,
    #[error("this action needs a target")]
    TargetRequired,
    #[error("{target:?} cannot be the target of a {scope:?} draft")]
    TargetMismatch {
        scope: ProposalScope,
        target: DraftTarget,
    },
    #[error("{action:?} is not available for {scope:?} drafts")]
    UnsupportedScope {
        scope: ProposalScope,
        action: ComposerAction,
    },
    #[error("{message}")]
    Failed {
        message: String,
        #[source]
        source: ApiError,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted,
    AlreadySubmitting,
}

/// A validated draft, ready for the wire.
#[derive(Debug, Clone)]
enum Submission {
    Assumption(NewProposal<AssumptionId>),
    Criteria(NewProposal<CriterionId>),
    Conclusion {
        criterion_id: CriterionId,
        content: String,
    },
    Comment {
        criterion_id: CriterionId,
        content: String,
    },
}

struct ComposerState {
    phase: ComposerPhase,
    draft: Option<Draft>,
}

pub struct ProposalComposer {
    event_id: EventId,
    proposals: Arc<dyn ProposalPort>,
    comments: Arc<dyn CommentPort>,
    mirror: Arc<EventMirror>,
    board: Arc<CommentBoard>,
    state: Mutex<ComposerState>,
    fallback_message: String,
}

impl ProposalComposer {
    pub fn new(
        event_id: EventId,
        proposals: Arc<dyn ProposalPort>,
        comments: Arc<dyn CommentPort>,
        mirror: Arc<EventMirror>,
        board: Arc<CommentBoard>,
        fallback_message: impl Into<String>,
    ) -> Self {
        Self {
            event_id,
            proposals,
            comments,
            mirror,
            board,
            state: Mutex::new(ComposerState {
                phase: ComposerPhase::Closed,
                draft: None,
            }),
            fallback_message: fallback_message.into(),
        }
    }

    /// Starts a fresh draft, replacing any draft that is not being submitted.
    pub fn open(&self, config: ComposerConfig) -> bool {
        let mut state = self.lock_state();
        if state.phase == ComposerPhase::Submitting {
            return false;
        }
        state.phase = ComposerPhase::Drafting;
        state.draft = Some(Draft {
            config,
            content: String::new(),
            reason: String::new(),
            error: None,
        });
        true
    }

    pub fn close(&self) {
        let mut state = self.lock_state();
        state.phase = ComposerPhase::Closed;
        state.draft = None;
    }

    pub fn set_content(&self, content: impl Into<String>) {
        self.edit(|draft| draft.content = content.into());
    }

    pub fn set_reason(&self, reason: impl Into<String>) {
        self.edit(|draft| draft.reason = reason.into());
    }

    pub fn phase(&self) -> ComposerPhase {
        self.lock_state().phase
    }

    pub fn draft(&self) -> Option<Draft> {
        self.lock_state().draft.clone()
    }

    pub async fn submit(&self) -> Result<SubmitOutcome, DraftError> {
        let submission = {
            let mut state = self.lock_state();
            match state.phase {
                ComposerPhase::Submitting => return Ok(SubmitOutcome::AlreadySubmitting),
                ComposerPhase::Closed => return Err(DraftError::NotOpen),
                ComposerPhase::Drafting => {}
            }
            let Some(draft) = state.draft.as_mut() else {
                return Err(DraftError::NotOpen);
            };
            match validate(draft) {
                Ok(submission) => {
                    draft.error = None;
                    state.phase = ComposerPhase::Submitting;
                    submission
                }
                Err(err) => {
                    draft.error = Some(err.to_string());
                    return Err(err);
                }
            }
        };

        let key = IdempotencyKey::generate();
        let span = info_span!("composer.submit", event_id = %self.event_id, key = %key);
        let result = self.dispatch(&submission, &key).instrument(span).await;

        match result {
            Ok(()) => {
                self.finish_submitting(|state| {
                    state.phase = ComposerPhase::Closed;
                    state.draft = None;
                });
                self.invalidate(&submission).await;
                Ok(SubmitOutcome::Submitted)
            }
            Err(err) => {
                let message = err.user_message(&self.fallback_message);
                warn!(error = %err, "Draft submission failed");
                self.finish_submitting(|state| {
                    state.phase = ComposerPhase::Drafting;
                    if let Some(draft) = state.draft.as_mut() {
                        draft.error = Some(message.clone());
                    }
                });
                Err(DraftError::Failed {
                    message,
                    source: err,
                })
            }
        }
    }

    async fn dispatch(&self, submission: &Submission, key: &IdempotencyKey) -> Result<(), ApiError> {
        let event_id = &self.event_id;
        match submission {
            Submission::Assumption(proposal) => {
                self.proposals
                    .create_assumption_proposal(event_id, proposal, key)
                    .await?
            }
            Submission::Criteria(proposal) => {
                self.proposals
                    .create_criteria_proposal(event_id, proposal, key)
                    .await?
            }
            Submission::Conclusion {
                criterion_id,
                content,
            } => {
                self.proposals
                    .create_conclusion_proposal(event_id, criterion_id, content, key)
                    .await?
            }
            Submission::Comment {
                criterion_id,
                content,
            } => {
                self.comments
                    .create_comment(event_id, criterion_id, content)
                    .await?
            }
        }
        info!("Draft submitted");
        Ok(())
    }

    /// Comments only invalidate their own list; everything else the event.
    async fn invalidate(&self, submission: &Submission) {
        let result = match submission {
            Submission::Comment { criterion_id, .. } => self.board.refresh(criterion_id).await,
            _ => self.mirror.refresh().await,
        };
        if let Err(err) = result {
            warn!(error = %err, "Refresh after submission failed");
        }
    }

    /// Applies `update` only if the submission still owns the composer.
    fn finish_submitting(&self, update: impl FnOnce(&mut ComposerState)) {
        let mut state = self.lock_state();
        if state.phase == ComposerPhase::Submitting {
            update(&mut state);
        }
    }

    fn edit(&self, update: impl FnOnce(&mut Draft)) {
        let mut state = self.lock_state();
        if state.phase == ComposerPhase::Drafting {
            if let Some(draft) = state.draft.as_mut() {
                update(draft);
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ComposerState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn required(value: &str, missing: DraftError) -> Result<String, DraftError> {
    let value = value.trim();
    if value.is_empty() {
        Err(missing)
    } else {
        Ok(value.to_string())
    }
}

fn validate(draft: &Draft) -> Result<Submission, DraftError> {
    let ComposerConfig { scope, action, .. } = draft.config;
    let target = draft
        .config
        .target
        .as_ref()
        .filter(|t| !t.as_str().trim().is_empty());
    let unsupported = DraftError::UnsupportedScope { scope, action };
    let mismatch = |target: &DraftTarget| DraftError::TargetMismatch {
        scope,
        target: target.clone(),
    };
    let criterion = || {
        target
            .map(|t| t.criterion().cloned().ok_or_else(|| mismatch(t)))
            .transpose()
    };

    let Some(category) = action.category() else {
        if scope != ProposalScope::Criteria {
            return Err(unsupported);
        }
        let criterion_id = criterion()?.ok_or(DraftError::TargetRequired)?;
        let content = required(&draft.content, DraftError::ContentRequired)?;
        return Ok(if action == ComposerAction::Comment {
            Submission::Comment {
                criterion_id,
                content,
            }
        } else {
            Submission::Conclusion {
                criterion_id,
                content,
            }
        });
    };

    if category != ProposalCategory::Creation && target.is_none() {
        return Err(DraftError::TargetRequired);
    }
    let content = match category {
        ProposalCategory::Deletion => None,
        _ => Some(required(&draft.content, DraftError::ContentRequired)?),
    };
    let reason = Some(required(&draft.reason, DraftError::ReasonRequired)?);

    match scope {
        ProposalScope::Assumption => Ok(Submission::Assumption(NewProposal {
            target_id: target
                .map(|t| t.assumption().cloned().ok_or_else(|| mismatch(t)))
                .transpose()?,
            category,
            content,
            reason,
        })),
        ProposalScope::Criteria => Ok(Submission::Criteria(NewProposal {
            target_id: criterion()?,
            category,
            content,
            reason,
        })),
        ProposalScope::Conclusion => Err(unsupported),
    }
}
