//! Notification dispatcher (spec component C8).
//!
//! Grounded in the teacher's `reqwest::Client` usage (`AppState`'s shared
//! `http` client for `QdrantService`) and `db.rs`'s pattern of wrapping
//! fallible setup in `anyhow::Context`; the hard-timeout / insecure-TLS /
//! fire-and-forget shape follows spec §4.8 directly since the teacher has no
//! outbound webhook of its own to imitate.

use std::time::Duration;

use reqwest::Method;
use serde::Serialize;

use super::rule::{AlertRule, ThresholdType};

const DELIVERY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Serialize)]
struct NotificationPayload<'a> {
    id: &'a str,
    tenant: &'a str,
    metrics: &'a [String],
    #[serde(rename = "type")]
    kind: ThresholdType,
    state: bool,
    timestamp: i64,
}

/// POSTs (or configured method) edge-triggered state transitions to a
/// webhook. Fire-and-forget: delivery failures are logged and discarded,
/// never retried (spec §4.8, §7 `NotificationDeliveryError`).
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    client: reqwest::Client,
    url: Option<String>,
    method: Method,
}

impl NotificationDispatcher {
    /// `insecure` suppresses certificate validation (spec §4.8
    /// `alerts_server_insecure`). `method` defaults to `POST` for any value
    /// that doesn't parse as an HTTP method.
    pub fn new(url: Option<String>, method: &str, insecure: bool) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .danger_accept_invalid_certs(insecure)
            .build()
            .unwrap_or_default();
        let method = method.parse().unwrap_or(Method::POST);
        Self { client, url, method }
    }

    /// No-op dispatcher for when `alerts-server` is unset.
    pub fn disabled() -> Self {
        Self::new(None, "POST", false)
    }

    /// Serialize and send one state transition. Always edge-triggered: the
    /// caller (the scheduler) only calls this when `prev != new` (spec
    /// §4.7 "Edge semantics").
    pub async fn notify(&self, rule: &AlertRule, prev: bool, new: bool, now_ms: i64) {
        let Some(url) = self.url.as_deref() else {
            return;
        };

        let payload = NotificationPayload {
            id: &rule.id,
            tenant: &rule.tenant,
            metrics: &rule.metrics,
            kind: rule.kind,
            state: new,
            timestamp: now_ms,
        };

        let result = self
            .client
            .request(self.method.clone(), url)
            .json(&payload)
            .send()
            .await;

        match result {
            Ok(response) if !response.status().is_success() => {
                tracing::warn!(
                    rule = %rule.id,
                    status = %response.status(),
                    prev,
                    new,
                    "alert notification delivery rejected by webhook"
                );
            }
            Ok(_) => {
                tracing::debug!(rule = %rule.id, prev, new, "alert notification delivered");
            }
            Err(err) => {
                tracing::warn!(rule = %rule.id, error = %err, "alert notification delivery failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::rule::{AlertRule, AlertRuleConfig};

    fn rule() -> AlertRule {
        AlertRule::from_config(
            AlertRuleConfig {
                id: "cpu".to_string(),
                tenant: Some("_ops".to_string()),
                metrics: vec!["cpu_usage".to_string()],
                alert_if_lower_than: None,
                alert_if_higher_than: Some(0.9),
            },
            "_ops",
        )
    }

    #[tokio::test]
    async fn disabled_dispatcher_is_a_silent_noop() {
        let dispatcher = NotificationDispatcher::disabled();
        // No URL configured: must return without attempting any request.
        dispatcher.notify(&rule(), false, true, 0).await;
    }
}
