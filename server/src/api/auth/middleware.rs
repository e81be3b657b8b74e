//! Authentication middleware
//!
//! Bearer token in the `Authorization` header. The validated claims become a
//! `Caller` in request extensions; handlers receive it through the `Caller`
//! extractor.

use axum::extract::{Request, State};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use super::jwt::{validate_session_token, JwtError};
use crate::domain::access::Caller;

/// Authentication error response
#[derive(Debug)]
pub struct AuthError {
    pub status: StatusCode,
    pub error: &'static str,
    pub code: &'static str,
    pub message: String,
}

impl AuthError {
    pub fn required() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            error: "unauthorized",
            code: "AUTH_REQUIRED",
            message: "Authentication required".to_string(),
        }
    }

    pub fn expired() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            error: "unauthorized",
            code: "TOKEN_EXPIRED",
            message: "Session has expired".to_string(),
        }
    }

    pub fn invalid() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            error: "unauthorized",
            code: "TOKEN_INVALID",
            message: "Invalid session token".to_string(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.error,
            "code": self.code,
            "message": self.message,
        });
        (self.status, Json(body)).into_response()
    }
}

/// Shared auth state for middleware
#[derive(Clone)]
pub struct AuthState {
    pub signing_key: Vec<u8>,
}

/// Turn validated claims into a caller identity
pub fn caller_from_token(token: &str, signing_key: &[u8]) -> Result<Caller, AuthError> {
    let claims = validate_session_token(token, signing_key).map_err(|e| match e {
        JwtError::Expired => AuthError::expired(),
        _ => AuthError::invalid(),
    })?;

    Ok(Caller {
        user_id: claims.sub,
        email: claims.email,
        role: claims.role,
    })
}

/// Authentication middleware. Injects `Caller` into request extensions.
pub async fn require_auth(
    State(state): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(AuthError::required)?;

    let caller = caller_from_token(token, &state.signing_key)?;
    request.extensions_mut().insert(caller);

    Ok(next.run(request).await)
}

impl<S> axum::extract::FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Present on every route behind require_auth
        parts
            .extensions
            .get::<Caller>()
            .cloned()
            .ok_or_else(AuthError::required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::auth::jwt::create_session_token;
    use crate::data::types::UserRole;

    #[test]
    fn test_caller_from_token() {
        let key = vec![7u8; 32];
        let token = create_session_token(&key, "u1", "u1@example.com", UserRole::Reviewer).unwrap();

        let caller = caller_from_token(&token, &key).unwrap();
        assert_eq!(caller.user_id, "u1");
        assert!(caller.is_reviewer());

        let err = caller_from_token(&token, &vec![8u8; 32]).unwrap_err();
        assert_eq!(err.code, "TOKEN_INVALID");
    }
}
