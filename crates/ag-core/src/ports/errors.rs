use thiserror::Error;

/// Failure of a call to the Event Service.
///
/// Higher layers branch on the status only for the not-found case; everything
/// else is shown through [`ApiError::user_message`].
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    #[error("request failed with status {status}{}", message_suffix(.message))]
    Http {
        status: u16,
        message: Option<String>,
        body: Option<serde_json::Value>,
    },

    #[error("network error: {0}")]
    Network(String),

    #[error("unexpected response body: {0}")]
    Decode(String),
}

fn message_suffix(message: &Option<String>) -> String {
    message
        .as_deref()
        .map(|m| format!(": {m}"))
        .unwrap_or_default()
}

impl ApiError {
    pub fn http(status: u16, message: Option<String>) -> Self {
        ApiError::Http {
            status,
            message,
            body: None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// Server-provided message verbatim, otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Http {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_server_text() {
        let err = ApiError::http(409, Some("Already voted".to_string()));
        assert_eq!(err.user_message("fallback"), "Already voted");
        assert_eq!(err.to_string(), "request failed with status 409: Already voted");
    }

    #[test]
    fn test_user_message_falls_back() {
        assert_eq!(ApiError::http(500, None).user_message("fallback"), "fallback");
        assert_eq!(
            ApiError::Network("reset".into()).user_message("fallback"),
            "fallback"
        );
        assert_eq!(
            ApiError::http(400, Some("  ".to_string())).user_message("fallback"),
            "fallback"
        );
    }

    #[test]
    fn test_status_classification() {
        assert!(ApiError::http(404, None).is_not_found());
        assert!(ApiError::http(401, None).is_unauthorized());
        assert!(!ApiError::Decode("x".into()).is_not_found());
    }
}
