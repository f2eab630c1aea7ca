//! CLI flows built on the wired runtime.

use std::fmt;
use std::sync::Arc;

use anyhow::{bail, Context};
use tracing::{info, warn};

use ag_app::{BootstrapOutcome, EventDirectory, EventWorkspace};
use ag_core::{EventDetail, EventId, User};

use super::wiring::AppRuntime;

/// Credentials given on the command line, if any.
///
/// `Debug` never prints the password.
#[derive(Clone, Default)]
pub struct Credentials {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct WatchArgs {
    pub event_id: String,
    pub credentials: Credentials,
}

/// Restores the session from the refresh cookie, or logs in with credentials.
///
/// Returns the user and whether this call created the session.
async fn sign_in(
    runtime: &AppRuntime,
    credentials: &Credentials,
) -> anyhow::Result<(User, bool)> {
    if let BootstrapOutcome::Authenticated(user) = runtime.session().bootstrap().await {
        return Ok((user, false));
    }

    let (Some(email), Some(password)) = (&credentials.email, &credentials.password) else {
        bail!("Not signed in: pass --email and --password (or AGORA_PASSWORD)");
    };
    let user = runtime
        .session()
        .login(email, password)
        .await
        .context("Login failed")?;
    Ok((user, true))
}

fn welcome(user: &User) {
    if user.needs_onboarding() {
        warn!(email = %user.email, "Display name not set yet");
    }
    info!(user_id = %user.id, "Signed in");
}

pub async fn run_events(runtime: AppRuntime, credentials: Credentials) -> anyhow::Result<()> {
    let (user, created) = sign_in(&runtime, &credentials).await?;
    welcome(&user);

    let directory = EventDirectory::new(runtime.deps.events.clone());
    directory.refresh().await.context("Failed to list events")?;
    let events = directory.events().unwrap_or_default();
    for event in events.iter() {
        println!(
            "{}\t{:?}\t{}{}",
            event.id,
            event.status,
            event.title,
            if event.is_admin { "\t(admin)" } else { "" }
        );
    }

    if created {
        runtime.session().logout().await;
    }
    Ok(())
}

/// Opens the event workspace and reports every snapshot change until Ctrl-C.
pub async fn run_watch(runtime: AppRuntime, args: WatchArgs) -> anyhow::Result<()> {
    let (user, created) = sign_in(&runtime, &args.credentials).await?;
    welcome(&user);

    let event_id = EventId::new(args.event_id);
    let workspace = EventWorkspace::open(&runtime.deps, event_id, runtime.poll);
    let mut snapshots = workspace.mirror().subscribe();

    loop {
        tokio::select! {
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if let Some(event) = snapshot {
                    report(&event);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted");
                break;
            }
        }
    }

    workspace.close();
    if created {
        runtime.session().logout().await;
    }
    Ok(())
}

fn report(event: &Arc<EventDetail>) {
    let proposals = event.proposals().count();
    let votes: u32 = event.proposals().map(|p| p.vote_info.count).sum();
    let mine = event.proposals().filter(|p| p.vote_info.has_voted).count();
    info!(
        event_id = %event.id,
        status = ?event.status,
        proposals,
        votes,
        mine,
        participants = event.participant_count,
        "{}",
        event.title
    );
}
