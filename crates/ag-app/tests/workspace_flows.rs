//! End-to-end flows through an open event workspace, against the in-memory
//! Event Service from `ag_app::test_support`.

use std::sync::{Arc, Once};
use std::time::Duration;

use ag_app::test_support::{sample_event, FakeEventService, FALLBACK};
use ag_app::usecases::{
    ComposerAction, ComposerConfig, ComposerPhase, DraftError, DraftTarget, ToggleOutcome,
};
use ag_app::{EventWorkspace, PollConfig};
use ag_core::ports::ApiError;
use ag_core::{CriterionId, EventId, Proposal, ProposalCategory, ProposalId, ProposalScope, VoteInfo};

static TRACE_INIT: Once = Once::new();

fn init_tracing() {
    TRACE_INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Workspace whose poller stays out of the way once the first snapshot is in.
async fn open(fake: &Arc<FakeEventService>) -> Arc<EventWorkspace> {
    init_tracing();
    let workspace = EventWorkspace::open(
        &fake.deps(),
        EventId::new("e-1"),
        PollConfig::new(Duration::from_secs(3_600), Duration::ZERO),
    );
    let mut rx = workspace.mirror().subscribe();
    rx.wait_for(|snapshot| snapshot.is_some()).await.unwrap();
    Arc::new(workspace)
}

fn rendered(workspace: &EventWorkspace, id: &str) -> Proposal {
    workspace
        .mirror()
        .proposal(&ProposalId::new(id))
        .expect("proposal rendered")
}

async fn vote_request_sent(fake: &FakeEventService) {
    while fake.count("cast_vote") == 0 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn failed_toggle_shows_optimistic_tally_then_reverts() {
    let fake = FakeEventService::with_event(sample_event());
    fake.gate("cast_vote");
    fake.fail("cast_vote", ApiError::Network("connection reset".to_string()));
    let workspace = open(&fake).await;

    let toggle = tokio::spawn({
        let workspace = workspace.clone();
        async move {
            let proposal = rendered(&workspace, "ap-1");
            workspace
                .votes(ProposalScope::Assumption)
                .toggle(&proposal)
                .await
        }
    });
    vote_request_sent(&fake).await;

    assert_eq!(rendered(&workspace, "ap-1").vote_info, VoteInfo::new(3, true));
    assert!(workspace
        .votes(ProposalScope::Assumption)
        .is_pending(&ProposalId::new("ap-1")));

    fake.release("cast_vote");
    let err = toggle.await.unwrap().unwrap_err();

    assert_eq!(err.to_string(), FALLBACK);
    assert_eq!(rendered(&workspace, "ap-1").vote_info, VoteInfo::new(2, false));
    assert_eq!(
        workspace.votes(ProposalScope::Assumption).last_error().as_deref(),
        Some(FALLBACK)
    );
    assert!(!workspace
        .votes(ProposalScope::Assumption)
        .is_pending(&ProposalId::new("ap-1")));
}

#[tokio::test]
async fn back_to_back_toggles_make_one_request() {
    let fake = FakeEventService::with_event(sample_event());
    fake.gate("cast_vote");
    let workspace = open(&fake).await;
    let proposal = rendered(&workspace, "ap-1");

    let first = tokio::spawn({
        let workspace = workspace.clone();
        let proposal = proposal.clone();
        async move {
            workspace
                .votes(ProposalScope::Assumption)
                .toggle(&proposal)
                .await
        }
    });
    vote_request_sent(&fake).await;

    let second = workspace
        .votes(ProposalScope::Assumption)
        .toggle(&proposal)
        .await
        .unwrap();
    assert_eq!(second, ToggleOutcome::Skipped);

    fake.release("cast_vote");
    assert_eq!(
        first.await.unwrap().unwrap(),
        ToggleOutcome::Applied(VoteInfo::new(3, true))
    );
    assert_eq!(fake.count("cast_vote"), 1);
}

#[tokio::test]
async fn delete_draft_needs_reason_then_refreshes_event() {
    let fake = FakeEventService::with_event(sample_event());
    let workspace = open(&fake).await;
    let detail_calls = fake.count("event_detail");
    let composer = workspace.composer();

    composer.open(ComposerConfig {
        scope: ProposalScope::Criteria,
        action: ComposerAction::Delete,
        target: Some(DraftTarget::Criterion(CriterionId::new("c-1"))),
    });
    assert!(matches!(
        composer.submit().await,
        Err(DraftError::ReasonRequired)
    ));
    assert!(fake.created_criteria_proposals.lock().unwrap().is_empty());

    composer.set_reason("outdated");
    composer.submit().await.unwrap();

    assert_eq!(composer.phase(), ComposerPhase::Closed);
    let sent = fake.created_criteria_proposals.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].category, ProposalCategory::Deletion);
    assert_eq!(sent[0].content, None);
    assert_eq!(fake.count("event_detail"), detail_calls + 1);
}

#[tokio::test]
async fn ballot_without_prior_vote_starts_clean() {
    let fake = FakeEventService::with_event(sample_event());
    let workspace = open(&fake).await;
    let snapshot = workspace.mirror().snapshot().unwrap();

    let ballot = workspace.ballot().load(&snapshot).await.unwrap();

    assert_eq!(ballot.selected_option, None);
    assert_eq!(
        ballot.criterion_order,
        vec![CriterionId::new("c-1"), CriterionId::new("c-2")]
    );
    assert!(ballot.error.is_none());
    assert_eq!(workspace.ballot().load_result().await.unwrap(), None);
}

#[tokio::test]
async fn refresh_overwrites_optimistic_patch() {
    let fake = FakeEventService::with_event(sample_event());
    let workspace = open(&fake).await;

    let proposal = rendered(&workspace, "ap-1");
    workspace
        .votes(ProposalScope::Assumption)
        .toggle(&proposal)
        .await
        .unwrap();
    assert_eq!(rendered(&workspace, "ap-1").vote_info, VoteInfo::new(3, true));

    fake.set_vote_info("ap-1", VoteInfo::new(7, false));
    workspace.refresh().await.unwrap();
    assert_eq!(rendered(&workspace, "ap-1").vote_info, VoteInfo::new(7, false));
}
