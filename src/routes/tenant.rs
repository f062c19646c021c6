//! Tenant resolution (spec §6 "Tenant").
//!
//! Grounded in the teacher's `auth::AuthUser` extractor shape
//! (`FromRequestParts` returning `impl Future`, reading one header) — here
//! simplified to an infallible extractor since a missing header just falls
//! back to the configured default tenant rather than rejecting the request.

use std::future::Future;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::convert::Infallible;

use crate::state::AppState;

pub const TENANT_HEADER: &str = "Hawkular-Tenant";

pub struct TenantHeader(pub String);

impl FromRequestParts<AppState> for TenantHeader {
    type Rejection = Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let tenant = parts
            .headers
            .get(TENANT_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| state.default_tenant.clone());
        std::future::ready(Ok(TenantHeader(tenant)))
    }
}
