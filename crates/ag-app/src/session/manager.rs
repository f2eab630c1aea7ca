//! Session manager.
//!
//! Owns every write to the shared [`SessionContext`]. The initial bootstrap
//! and any later credential refresh share one in-flight future, so any number
//! of concurrent callers cause exactly one refresh request.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use tracing::{debug, info, info_span, warn, Instrument};

use ag_core::ports::{ApiError, AuthPort, CredentialRefresher};
use ag_core::{AccessToken, AuthGrant, Session, SessionContext, User};

use super::SessionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Authenticated(User),
    SignedOut,
}

type PendingRefresh = Shared<BoxFuture<'static, BootstrapOutcome>>;

#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

struct Inner {
    auth: Arc<dyn AuthPort>,
    context: SessionContext,
    pending: Mutex<Option<PendingRefresh>>,
}

/// Clears the bootstrapping flag and the pending slot however the refresh
/// future ends, including cancellation.
struct RefreshGuard<'a> {
    inner: &'a Inner,
}

impl Drop for RefreshGuard<'_> {
    fn drop(&mut self) {
        if self.inner.context.current().bootstrapping {
            self.inner.context.set_bootstrapping(false);
        }
        self.inner
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
    }
}

impl SessionManager {
    pub fn new(auth: Arc<dyn AuthPort>, context: SessionContext) -> Self {
        Self {
            inner: Arc::new(Inner {
                auth,
                context,
                pending: Mutex::new(None),
            }),
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.inner.context
    }

    /// Restores the session from the refresh cookie on application load.
    ///
    /// Concurrent calls join the refresh already in flight.
    pub async fn bootstrap(&self) -> BootstrapOutcome {
        self.shared_refresh(true).await
    }

    /// Explicit refresh requested by the user.
    ///
    /// Shares the single-flight slot with [`SessionManager::bootstrap`].
    pub async fn refresh_manually(&self) -> BootstrapOutcome {
        self.shared_refresh(true).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, SessionError> {
        let span = info_span!("session.login");
        async {
            self.inner.context.advance_generation();
            let grant = self.inner.auth.login(email, password).await?;
            self.inner.establish(grant).await
        }
        .instrument(span)
        .await
    }

    /// Login with an identity token issued by a federated provider.
    pub async fn login_with_federated_token(&self, id_token: &str) -> Result<User, SessionError> {
        let span = info_span!("session.login_federated");
        async {
            self.inner.context.advance_generation();
            let grant = self.inner.auth.login_with_google(id_token).await?;
            self.inner.establish(grant).await
        }
        .instrument(span)
        .await
    }

    pub async fn signup(&self, email: &str, password: &str) -> Result<User, SessionError> {
        let span = info_span!("session.signup");
        async {
            self.inner.context.advance_generation();
            let grant = self.inner.auth.signup(email, password).await?;
            self.inner.establish(grant).await
        }
        .instrument(span)
        .await
    }

    /// Best-effort server logout; the local session is cleared regardless.
    pub async fn logout(&self) {
        // refreshes still in flight must not bring the session back
        self.inner.context.advance_generation();
        if let Err(err) = self.inner.auth.logout().await {
            warn!(error = %err, "Server logout failed, clearing local session anyway");
        }
        self.inner.context.clear();
        info!("Signed out");
    }

    pub async fn set_display_name(&self, name: &str) -> Result<User, SessionError> {
        let token = self
            .inner
            .context
            .access_token()
            .filter(|t| !t.is_empty())
            .ok_or(SessionError::NotAuthenticated)?;

        let name = name.trim();
        if name.is_empty() {
            return Err(SessionError::EmptyName);
        }

        self.inner.auth.update_name(name).await?;
        let user = self.inner.auth.me().await?;
        self.inner
            .context
            .replace(Session::authenticated(token, Some(user.clone())));
        Ok(user)
    }

    /// `mark_bootstrapping` raises the bootstrapping flag for the duration,
    /// also when joining a refresh that started without it.
    fn shared_refresh(&self, mark_bootstrapping: bool) -> PendingRefresh {
        let mut slot = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(pending) = slot.as_ref() {
            debug!("Joining in-flight session refresh");
            if mark_bootstrapping && !self.inner.context.current().bootstrapping {
                self.inner.context.set_bootstrapping(true);
            }
            return pending.clone();
        }

        let inner = Arc::clone(&self.inner);
        let pending = async move { inner.run_refresh(mark_bootstrapping).await }
            .instrument(info_span!("session.refresh"))
            .boxed()
            .shared();
        *slot = Some(pending.clone());
        pending
    }
}

impl Inner {
    async fn run_refresh(&self, mark_bootstrapping: bool) -> BootstrapOutcome {
        let _guard = RefreshGuard { inner: self };
        let generation = self.context.generation();
        if mark_bootstrapping {
            self.context.set_bootstrapping(true);
        }

        match self.try_refresh(generation).await {
            Ok(user) => {
                info!(user_id = %user.id, "Session restored");
                BootstrapOutcome::Authenticated(user)
            }
            Err(RefreshFailure::Superseded) => {
                debug!("Session changed while refreshing, result dropped");
                self.current_outcome()
            }
            Err(RefreshFailure::Api(err)) => {
                // an expired or missing refresh cookie is the normal signed-out path
                debug!(error = %err, "Session refresh failed, signing out");
                let cleared = self.context.update_if_generation(generation, |current| {
                    Session::signed_out().with_bootstrapping(current.bootstrapping)
                });
                if cleared {
                    BootstrapOutcome::SignedOut
                } else {
                    self.current_outcome()
                }
            }
        }
    }

    async fn try_refresh(&self, generation: u64) -> Result<User, RefreshFailure> {
        let grant = self.auth.refresh().await?;
        if grant.access_token.is_empty() {
            return Err(ApiError::Decode("empty access token".to_string()).into());
        }
        let user = self.resolve_user(&grant, Some(generation)).await?;
        let stored = self.context.update_if_generation(generation, |current| {
            Session::authenticated(grant.access_token, Some(user.clone()))
                .with_bootstrapping(current.bootstrapping)
        });
        if stored {
            Ok(user)
        } else {
            Err(RefreshFailure::Superseded)
        }
    }

    /// Whatever the session holds now, for a refresh whose own result was dropped.
    fn current_outcome(&self) -> BootstrapOutcome {
        let session = self.context.current();
        match (&session.user, session.is_authenticated()) {
            (Some(user), true) => BootstrapOutcome::Authenticated(user.clone()),
            _ => BootstrapOutcome::SignedOut,
        }
    }

    /// Stores a freshly issued grant; a failed profile fetch signs out again.
    async fn establish(&self, grant: AuthGrant) -> Result<User, SessionError> {
        match self.resolve_user(&grant, None).await {
            Ok(user) => {
                info!(user_id = %user.id, "Signed in");
                self.context
                    .replace(Session::authenticated(grant.access_token, Some(user.clone())));
                Ok(user)
            }
            Err(failure) => {
                self.context.clear();
                Err(match failure {
                    RefreshFailure::Api(err) => err.into(),
                    // no generation was passed, so nothing can supersede it
                    RefreshFailure::Superseded => SessionError::NotAuthenticated,
                })
            }
        }
    }

    /// The inline user of the grant, otherwise `GET /auth/me` with the new token.
    ///
    /// With a `generation`, the interim token is only stored if that
    /// generation is still current.
    async fn resolve_user(
        &self,
        grant: &AuthGrant,
        generation: Option<u64>,
    ) -> Result<User, RefreshFailure> {
        if let Some(user) = &grant.user {
            return Ok(user.clone());
        }
        let interim = |current: &Session| {
            Session::authenticated(AccessToken::clone(&grant.access_token), None)
                .with_bootstrapping(current.bootstrapping)
        };
        match generation {
            Some(generation) => {
                if !self.context.update_if_generation(generation, interim) {
                    return Err(RefreshFailure::Superseded);
                }
            }
            None => {
                let next = interim(&self.context.current());
                self.context.replace(next);
            }
        }
        Ok(self.auth.me().await?)
    }
}

/// Why a refresh did not store a session.
enum RefreshFailure {
    Api(ApiError),
    /// A login or logout started a new generation while the refresh ran.
    Superseded,
}

impl From<ApiError> for RefreshFailure {
    fn from(err: ApiError) -> Self {
        RefreshFailure::Api(err)
    }
}

#[async_trait]
impl CredentialRefresher for SessionManager {
    /// Background re-authentication; never raises the bootstrapping flag.
    async fn refresh_credentials(&self) -> bool {
        matches!(
            self.shared_refresh(false).await,
            BootstrapOutcome::Authenticated(_)
        )
    }
}
