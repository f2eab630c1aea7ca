//! Session domain: credential, identity and the shared session context.

mod context;

pub use context::SessionContext;

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};

use crate::ids::UserId;

/// Opaque bearer credential.
///
/// `Debug` is redacted so tokens never reach the logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Debug for AccessToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl User {
    /// A user without a display name must finish onboarding first.
    pub fn needs_onboarding(&self) -> bool {
        self.name.as_deref().map_or(true, |n| n.trim().is_empty())
    }
}

/// Result of any credential-issuing auth call.
///
/// `user` is absent when the endpoint only returns the token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthGrant {
    pub access_token: AccessToken,
    #[serde(default)]
    pub user: Option<User>,
}

/// Immutable session snapshot. Replaced wholesale, never edited in place.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    pub access_token: Option<AccessToken>,
    pub user: Option<User>,
    pub bootstrapping: bool,
}

impl Session {
    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn authenticated(access_token: AccessToken, user: Option<User>) -> Self {
        Self {
            access_token: Some(access_token),
            user,
            bootstrapping: false,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.as_ref().is_some_and(|t| !t.is_empty())
    }

    pub fn with_bootstrapping(mut self, bootstrapping: bool) -> Self {
        self.bootstrapping = bootstrapping;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_debug_is_redacted() {
        let token = AccessToken::new("secret-value");
        assert_eq!(format!("{token:?}"), "AccessToken(***)");
    }

    #[test]
    fn test_user_without_name_needs_onboarding() {
        let mut user = User {
            id: UserId::new("u-1"),
            email: "a@example.com".to_string(),
            name: None,
        };
        assert!(user.needs_onboarding());
        user.name = Some("  ".to_string());
        assert!(user.needs_onboarding());
        user.name = Some("Ada".to_string());
        assert!(!user.needs_onboarding());
    }

    #[test]
    fn test_empty_token_is_not_authenticated() {
        let session = Session::authenticated(AccessToken::new(""), None);
        assert!(!session.is_authenticated());
        assert!(!Session::signed_out().is_authenticated());
    }
}
