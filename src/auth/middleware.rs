//! # Request Authentication
//!
//! Axum middleware that turns a bearer token into a [`Principal`] request
//! extension. Handlers behind it may assume the request is authorized.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use super::errors::{AuthError, AuthResult};
use super::jwt::JwtManager;

/// Subject used when authentication is disabled
pub const ANONYMOUS_SUBJECT: &str = "anonymous";

/// The verified caller of a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub subject: String,
}

impl Principal {
    pub fn anonymous() -> Self {
        Self {
            subject: ANONYMOUS_SUBJECT.to_string(),
        }
    }
}

/// Token verification, or nothing when auth is turned off
#[derive(Debug, Clone)]
pub struct Authenticator {
    jwt: Option<JwtManager>,
}

impl Authenticator {
    pub fn new(jwt: JwtManager) -> Self {
        Self { jwt: Some(jwt) }
    }

    /// Every request is let through as the anonymous principal
    pub fn disabled() -> Self {
        Self { jwt: None }
    }

    /// Resolve the principal from an `Authorization` header value
    pub fn authenticate(&self, authorization: Option<&str>) -> AuthResult<Principal> {
        let Some(jwt) = &self.jwt else {
            return Ok(Principal::anonymous());
        };

        let token = authorization
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::AuthenticationRequired)?;

        let claims = jwt.validate_token(token)?;
        Ok(Principal { subject: claims.sub })
    }
}

/// Reject unauthenticated requests, attach the principal to the rest
pub async fn require_principal(
    State(auth): State<Arc<Authenticator>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let principal = auth.authenticate(header).map_err(|e| {
        tracing::warn!(error = %e, path = %request.uri().path(), "request rejected");
        e
    })?;

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::JwtConfig;

    fn authenticator() -> (Authenticator, JwtManager) {
        let jwt = JwtManager::new(JwtConfig::default());
        (Authenticator::new(jwt.clone()), jwt)
    }

    #[test]
    fn test_valid_bearer_token() {
        let (auth, jwt) = authenticator();
        let token = jwt.issue_token("alice").unwrap();

        let principal = auth.authenticate(Some(&format!("Bearer {}", token))).unwrap();
        assert_eq!(principal.subject, "alice");
    }

    #[test]
    fn test_missing_header_rejected() {
        let (auth, _) = authenticator();

        assert!(matches!(auth.authenticate(None), Err(AuthError::AuthenticationRequired)));
        assert!(matches!(
            auth.authenticate(Some("Basic dXNlcjpwYXNz")),
            Err(AuthError::AuthenticationRequired)
        ));
        assert!(matches!(auth.authenticate(Some("Bearer ")), Err(AuthError::AuthenticationRequired)));
    }

    #[test]
    fn test_disabled_is_anonymous() {
        let principal = Authenticator::disabled().authenticate(None).unwrap();
        assert_eq!(principal, Principal::anonymous());
    }
}
