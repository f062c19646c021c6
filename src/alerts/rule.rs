//! Alert rule model (spec component C6).
//!
//! Grounded in the teacher's `services/alarm_engine/types.rs` (classify a
//! rule's discriminant once at init, then branch on it in the hot loop) and
//! `original_source/src/alerts/alert_test.go` for the exact three-way
//! threshold classification being reproduced.

use serde::Deserialize;

/// Threshold classification derived once at init (spec §3 "Alert rule").
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdType {
    LowerThan,
    HigherThan,
    Outside,
    /// Neither threshold present; the rule never violates.
    None,
}

fn classify(lower: Option<f64>, higher: Option<f64>) -> ThresholdType {
    match (lower, higher) {
        (Some(_), Some(_)) => ThresholdType::Outside,
        (Some(_), None) => ThresholdType::LowerThan,
        (None, Some(_)) => ThresholdType::HigherThan,
        (None, None) => ThresholdType::None,
    }
}

/// On-disk / config-file shape for one alert rule (spec §6 `alerts[]`).
#[derive(Debug, Clone, Deserialize)]
pub struct AlertRuleConfig {
    pub id: String,
    #[serde(default)]
    pub tenant: Option<String>,
    pub metrics: Vec<String>,
    #[serde(default)]
    pub alert_if_lower_than: Option<f64>,
    #[serde(default)]
    pub alert_if_higher_than: Option<f64>,
}

/// A runtime alert rule (spec §3 "Alert rule"). `state` is mutated only by
/// the scheduler (spec §5); it is plain `bool` here because the scheduler is
/// this struct's sole writer and the whole `Vec<AlertRule>` lives behind one
/// `tokio::sync::RwLock` (see `alerts::AlertScheduler`) rather than giving
/// each rule its own interior-mutable cell.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AlertRule {
    pub id: String,
    pub tenant: String,
    pub metrics: Vec<String>,
    #[serde(rename = "alertIfLowerThan")]
    pub lower: Option<f64>,
    #[serde(rename = "alertIfHigherThan")]
    pub higher: Option<f64>,
    #[serde(rename = "type")]
    pub kind: ThresholdType,
    pub state: bool,
}

impl AlertRule {
    /// Build a rule from config, classifying its threshold type at init
    /// (spec §3) and defaulting `tenant` to `default_tenant` when absent.
    pub fn from_config(config: AlertRuleConfig, default_tenant: &str) -> Self {
        let kind = classify(config.alert_if_lower_than, config.alert_if_higher_than);
        Self {
            id: config.id,
            tenant: config.tenant.unwrap_or_else(|| default_tenant.to_string()),
            metrics: config.metrics,
            lower: config.alert_if_lower_than,
            higher: config.alert_if_higher_than,
            kind,
            state: false,
        }
    }

    /// Does `value` violate this rule's threshold (spec §4.7 per-tick match)?
    pub fn violates(&self, value: f64) -> bool {
        match self.kind {
            ThresholdType::LowerThan => value < self.lower.unwrap_or(f64::NEG_INFINITY),
            ThresholdType::HigherThan => value > self.higher.unwrap_or(f64::INFINITY),
            ThresholdType::Outside => {
                value < self.lower.unwrap_or(f64::NEG_INFINITY)
                    || value > self.higher.unwrap_or(f64::INFINITY)
            }
            ThresholdType::None => false,
        }
    }
}
