//! Caller identity extraction.
//!
//! The API sits behind a gateway that authenticates callers and forwards
//! the resolved identity as headers. Token validation is out of scope
//! here; missing or malformed identity headers reject the request.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use mdex_core::AccessContext;

use crate::error::ApiError;

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const USER_HEADER: &str = "x-user-id";

/// Authenticated caller scope, extracted from gateway headers.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub AccessContext);

fn header_uuid(parts: &Parts, name: &str) -> Result<Uuid, ApiError> {
    let value = parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {name} header")))?;
    value
        .parse::<Uuid>()
        .map_err(|_| ApiError::Unauthorized(format!("malformed {name} header")))
}

#[async_trait::async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let tenant_id = header_uuid(parts, TENANT_HEADER)?;
        let user_id = header_uuid(parts, USER_HEADER)?;
        Ok(Caller(AccessContext::new(tenant_id, user_id)))
    }
}
