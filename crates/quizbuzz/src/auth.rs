//! Authentication hook for the handshake.
//!
//! quizbuzz does not issue identities. The [`Authenticator`] maps the
//! token a client presents in its handshake to a [`PlayerId`]; plug in
//! JWT validation, an auth API, or anything else behind it.

use std::future::Future;

use quizbuzz_protocol::PlayerId;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("no token presented")]
    MissingToken,

    #[error("invalid token: {0}")]
    InvalidToken(String),
}

/// Validates a client's token and returns their identity.
pub trait Authenticator: Send + Sync + 'static {
    fn authenticate(
        &self,
        token: Option<&str>,
    ) -> impl Future<Output = Result<PlayerId, AuthError>> + Send;
}

/// Uses a numeric token as the player id. Development only.
#[derive(Debug, Clone, Copy, Default)]
pub struct DevAuthenticator;

impl Authenticator for DevAuthenticator {
    async fn authenticate(&self, token: Option<&str>) -> Result<PlayerId, AuthError> {
        let token = token.map(str::trim).filter(|t| !t.is_empty());
        let token = token.ok_or(AuthError::MissingToken)?;
        let id: u64 = token
            .parse()
            .map_err(|_| AuthError::InvalidToken("token must be a number".into()))?;
        Ok(PlayerId(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dev_authenticator_parses_numeric_token() {
        assert_eq!(DevAuthenticator.authenticate(Some("42")).await, Ok(PlayerId(42)));
        assert_eq!(DevAuthenticator.authenticate(Some(" 7 ")).await, Ok(PlayerId(7)));
    }

    #[tokio::test]
    async fn test_dev_authenticator_rejects_missing_and_garbage() {
        assert_eq!(
            DevAuthenticator.authenticate(None).await,
            Err(AuthError::MissingToken)
        );
        assert_eq!(
            DevAuthenticator.authenticate(Some("")).await,
            Err(AuthError::MissingToken)
        );
        assert!(matches!(
            DevAuthenticator.authenticate(Some("alice")).await,
            Err(AuthError::InvalidToken(_))
        ));
    }
}
