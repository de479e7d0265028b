use {
    axum::{
        extract::{Request, State},
        http::header,
        middleware::Next,
        response::{IntoResponse, Response},
    },
    tracing::debug,
};

use crate::{error::ApiError, state::AppState};

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Constant-time string comparison (prevents timing attacks).
fn safe_equal(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    // XOR each byte and accumulate; any difference makes result non-zero.
    let diff = a
        .as_bytes()
        .iter()
        .zip(b.as_bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y));
    diff == 0
}

/// Extract the token from an `Authorization: Bearer <token>` header.
fn bearer_token(request: &Request) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Layer over every `/api` route. Rejects requests without a matching bearer
/// token before any handler runs.
pub async fn require_bearer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !request.headers().contains_key(header::AUTHORIZATION) {
        debug!(path = %request.uri().path(), "request without authorization header");
        return ApiError::Unauthorized("Unauthorized: Missing Authorization header".into())
            .into_response();
    }
    let Some(given) = bearer_token(&request) else {
        return ApiError::Unauthorized("Unauthorized: expected a bearer token".into())
            .into_response();
    };
    if !safe_equal(given, &state.token) {
        debug!(path = %request.uri().path(), "bearer token mismatch");
        return ApiError::Unauthorized("Unauthorized: invalid token".into()).into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_strings_compare_equal() {
        assert!(safe_equal("secret-token", "secret-token"));
        assert!(safe_equal("", ""));
    }

    #[test]
    fn unequal_strings_compare_unequal() {
        assert!(!safe_equal("secret-token", "secret-tokex"));
        assert!(!safe_equal("short", "longer-string"));
        assert!(!safe_equal("a", ""));
    }

    #[test]
    fn bearer_extraction_requires_the_scheme_prefix() {
        let with_bearer = Request::builder()
            .header(header::AUTHORIZATION, "Bearer tok-123")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&with_bearer), Some("tok-123"));

        let basic = Request::builder()
            .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&basic), None);

        let bare = Request::builder().body(axum::body::Body::empty()).unwrap();
        assert_eq!(bearer_token(&bare), None);
    }
}
