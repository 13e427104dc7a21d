//! services/api/src/web/middleware.rs
//!
//! Identity middleware for the book routes.

use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};

/// Header carrying the caller's identity, set by the upstream auth layer.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The opaque id of the calling user. It is used verbatim as the storage partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

/// Middleware that reads the `x-user-id` header and inserts a [`UserId`] into the
/// request extensions for handlers to use.
///
/// The value is not validated here; a missing or empty header returns 401 Unauthorized.
pub async fn require_user(mut req: Request, next: Next) -> Result<Response, StatusCode> {
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or(StatusCode::UNAUTHORIZED)?
        .to_string();

    req.extensions_mut().insert(UserId(user_id));

    Ok(next.run(req).await)
}
