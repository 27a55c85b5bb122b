//! Admin authentication.
//!
//! Admin routes are guarded by a pre-shared key compared in constant time. The
//! operator's email travels in its own header and is recorded in the audit log.

use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::errors::AppError;

/// Header name for the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header carrying the email of the operator performing an admin action.
pub const ADMIN_EMAIL_HEADER: &str = "x-admin-email";

/// PSK authentication layer function that takes the expected PSK as a parameter.
pub async fn psk_auth_layer(
    expected_psk: Option<String>,
    request: Request,
    next: Next,
) -> Response {
    // If no PSK is configured, allow all requests (dev mode)
    let Some(expected) = expected_psk else {
        return next.run(request).await;
    };

    match provided_key(request.headers()) {
        Some(key) if constant_time_compare(key, &expected) => next.run(request).await,
        Some(_) => {
            tracing::warn!("Rejected admin request with invalid API key");
            AppError::Unauthorized("Invalid API key".to_string()).into_response()
        }
        None => AppError::Unauthorized("Missing or invalid API key".to_string()).into_response(),
    }
}

/// The key from `x-api-key`, falling back to a bearer token.
fn provided_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            headers
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.strip_prefix("Bearer "))
        })
}

/// Email of the operator performing a mutating admin action.
pub fn admin_email(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get(ADMIN_EMAIL_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|email| !email.is_empty())
        .map(str::to_string)
        .ok_or_else(|| AppError::Validation(format!("Missing {} header", ADMIN_EMAIL_HEADER)))
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
