//! # Dependency Injection
//!
//! The only place that sees `ag-infra` and `ag-app` together. It assembles;
//! it does not decide.

use std::sync::Arc;

use ag_app::{AppDeps, PollConfig, SessionManager};
use ag_core::ports::{ApiError, AuthPort, CredentialRefresher};
use ag_core::{AppConfig, SessionContext};
use ag_infra::HttpEventService;

pub type WiringResult<T> = Result<T, WiringError>;

#[derive(Debug, thiserror::Error)]
pub enum WiringError {
    #[error("HTTP client initialization failed: {0}")]
    HttpClient(#[source] ApiError),
}

/// Everything a CLI flow needs, fully wired.
pub struct AppRuntime {
    pub deps: AppDeps,
    pub poll: PollConfig,
    // the transport only holds a `Weak` to this
    session: Arc<SessionManager>,
}

impl AppRuntime {
    pub fn session(&self) -> &SessionManager {
        &self.session
    }
}

pub fn wire_dependencies(config: &AppConfig) -> WiringResult<AppRuntime> {
    let context = SessionContext::new();
    let service = Arc::new(
        HttpEventService::new(config, context.clone()).map_err(WiringError::HttpClient)?,
    );

    let auth: Arc<dyn AuthPort> = service.clone();
    let session = Arc::new(SessionManager::new(auth, context.clone()));
    let refresher: Arc<dyn CredentialRefresher> = session.clone();
    service.set_refresher(Arc::downgrade(&refresher));

    let deps = AppDeps {
        session: context,
        events: service.clone(),
        admin: service.clone(),
        proposals: service.clone(),
        votes: service.clone(),
        final_votes: service.clone(),
        comments: service.clone(),
        memberships: service.clone(),
        fallback_error_message: config.fallback_error_message.clone(),
    };

    Ok(AppRuntime {
        deps,
        poll: PollConfig::from_app_config(config),
        session,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wiring_shares_one_session_context() {
        let runtime = wire_dependencies(&AppConfig::default()).unwrap();

        runtime.session().context().set_bootstrapping(true);
        assert!(runtime.deps.session.current().bootstrapping);
        assert_eq!(
            runtime.deps.fallback_error_message,
            AppConfig::default().fallback_error_message
        );
    }
}
