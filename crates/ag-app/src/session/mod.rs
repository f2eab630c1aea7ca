//! Session management: credential bootstrap, login flows and logout.

mod manager;

pub use manager::{BootstrapOutcome, SessionManager};

use ag_core::ports::ApiError;

/// Errors surfaced by explicit session operations.
///
/// Bootstrap never fails; it resolves to [`BootstrapOutcome::SignedOut`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("display name must not be empty")]
    EmptyName,
    #[error(transparent)]
    Api(#[from] ApiError),
}
