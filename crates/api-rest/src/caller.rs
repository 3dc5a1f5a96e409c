//! Caller identity taken from request headers.
//!
//! Authentication happens in front of this service. Whatever authenticates the user forwards
//! the identity as `x-caller-id` and `x-caller-role`.

use crate::error::ApiError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::StatusCode;
use dispensary_types::{Caller, Role};

pub const CALLER_ID_HEADER: &str = "x-caller-id";
pub const CALLER_ROLE_HEADER: &str = "x-caller-role";

/// Extractor yielding the [`Caller`] of the request.
pub struct CallerIdentity(pub Caller);

#[axum::async_trait]
impl<St> FromRequestParts<St> for CallerIdentity
where
    St: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &St) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let (Some(id), Some(role)) = (header(CALLER_ID_HEADER), header(CALLER_ROLE_HEADER)) else {
            return Err(ApiError::new(
                StatusCode::UNAUTHORIZED,
                "unauthenticated",
                format!("missing {CALLER_ID_HEADER} or {CALLER_ROLE_HEADER} header"),
            ));
        };
        let role: Role = role
            .parse()
            .map_err(|e: dispensary_types::RoleParseError| ApiError::bad_request(e.to_string()))?;

        Ok(CallerIdentity(Caller::new(id, role)))
    }
}
