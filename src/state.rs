//! Shared application state (spec §6 "Thin HTTP surface").
//!
//! Mirrors the teacher's `AppState`: one `Clone`-able struct threaded through
//! every handler via axum's `State` extractor, holding the storage engine
//! behind a trait object (spec §9 "storage engine is a trait, not a closed
//! enum") and the alert scheduler's read-mostly handle.

use std::sync::Arc;

use crate::alerts::AlertsHandle;
use crate::config::CoreConfig;
use crate::storage::StorageEngine;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn StorageEngine>,
    pub alerts: AlertsHandle,
    pub default_tenant: String,
    pub default_start_time: String,
    pub bearer_auth: Option<String>,
    pub basic_auth: Option<String>,
}

impl AppState {
    pub fn new(storage: Arc<dyn StorageEngine>, alerts: AlertsHandle, config: &CoreConfig) -> Self {
        Self {
            storage,
            alerts,
            default_tenant: config.default_tenant.clone(),
            default_start_time: config.default_start_time.clone(),
            bearer_auth: config.bearer_auth.clone(),
            basic_auth: config.basic_auth.clone(),
        }
    }

    /// Precomputed expected `Authorization` header value, mirroring
    /// `original_source/src/server/server.go`'s `authorizationKey` (built
    /// once at startup, compared verbatim against the incoming header).
    /// `bearer-auth` wins when both are configured, matching the source's
    /// assignment order. `None` means the route is open.
    pub fn expected_authorization_header(&self) -> Option<String> {
        let mut header = self
            .basic_auth
            .as_deref()
            .map(|pair| {
                use base64::Engine;
                let encoded = base64::engine::general_purpose::STANDARD.encode(pair.as_bytes());
                format!("Basic {encoded}")
            });
        if let Some(token) = &self.bearer_auth {
            header = Some(format!("Bearer {token}"));
        }
        header
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertsHandle;
    use crate::storage::memory::MemoryEngine;
    use std::sync::Arc;

    fn state_with(bearer: Option<&str>, basic: Option<&str>) -> AppState {
        AppState {
            storage: Arc::new(MemoryEngine::new()),
            alerts: AlertsHandle::disabled(),
            default_tenant: "_ops".to_string(),
            default_start_time: "-8h".to_string(),
            bearer_auth: bearer.map(str::to_string),
            basic_auth: basic.map(str::to_string),
        }
    }

    #[test]
    fn no_auth_configured_means_open() {
        assert!(state_with(None, None).expected_authorization_header().is_none());
    }

    #[test]
    fn bearer_only() {
        let header = state_with(Some("secret"), None)
            .expected_authorization_header()
            .unwrap();
        assert_eq!(header, "Bearer secret");
    }

    #[test]
    fn basic_only() {
        let header = state_with(None, Some("user:pass"))
            .expected_authorization_header()
            .unwrap();
        assert_eq!(header, "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn bearer_wins_when_both_configured() {
        let header = state_with(Some("secret"), Some("user:pass"))
            .expected_authorization_header()
            .unwrap();
        assert_eq!(header, "Bearer secret");
    }
}
