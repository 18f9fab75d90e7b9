// [apps/gateway/src/tenant.rs]
//! The tenant-identity seam. Authentication and role checks are an
//! external collaborator this core exposes a seam for, not an identity
//! provider it implements (SPEC_FULL.md §1, Non-goals) — the teacher's
//! `auth_guard` decodes a Supabase JWT and injects an `OperatorIdentity`
//! extension; this core instead trusts an already-authenticated edge
//! (a gateway or reverse proxy) to assert the caller's tenant via a
//! header, and only extracts it.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::errors::CoreError;

pub const TENANT_HEADER: &str = "x-tenant-id";

/// Extracted once per request; any handler that takes `TenantId` as an
/// argument rejects the request with `CoreError::Forbidden` before its
/// body runs if the header is absent or empty.
#[derive(Debug, Clone)]
pub struct TenantId(pub String);

impl<S> FromRequestParts<S> for TenantId
where
    S: Send + Sync,
{
    type Rejection = CoreError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(TENANT_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or(CoreError::Forbidden)?;

        if raw.trim().is_empty() {
            return Err(CoreError::Forbidden);
        }

        Ok(TenantId(raw.to_string()))
    }
}
