//! Runtime configuration (spec §6 "Configuration").
//!
//! Layered the way the teacher's `config.rs` layers its setup-file overrides
//! on top of environment defaults: an optional JSON file is loaded first,
//! then any explicitly-passed CLI flag overrides the matching field. Bool
//! flags OR together since clap gives no way to distinguish "not passed"
//! from "passed as false" for a plain `bool` field.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::alerts::rule::AlertRuleConfig;
use crate::cli::Args;

fn default_storage() -> String {
    "memory".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_alerts_interval() -> u64 {
    20
}

fn default_tenant() -> String {
    "_ops".to_string()
}

fn default_start_time() -> String {
    "-8h".to_string()
}

fn default_alerts_server_method() -> String {
    "POST".to_string()
}

/// The on-disk config file shape (spec §6). Every field is optional: a
/// missing key simply leaves the built-in default, or the CLI flag, in
/// place.
#[derive(Debug, Clone, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    storage: Option<String>,
    #[serde(default)]
    options: Option<String>,
    #[serde(default)]
    verbose: Option<bool>,
    #[serde(default)]
    media: Option<String>,
    #[serde(default)]
    gzip: Option<bool>,
    #[serde(default, rename = "bearer-auth")]
    bearer_auth: Option<String>,
    #[serde(default, rename = "basic-auth")]
    basic_auth: Option<String>,
    #[serde(default, rename = "alerts-interval")]
    alerts_interval: Option<u64>,
    #[serde(default, rename = "alerts-server")]
    alerts_server: Option<String>,
    #[serde(default, rename = "alerts-server-method")]
    alerts_server_method: Option<String>,
    #[serde(default, rename = "alerts-server-insecure")]
    alerts_server_insecure: Option<bool>,
    #[serde(default, rename = "default-tenant")]
    default_tenant: Option<String>,
    #[serde(default, rename = "default-start-time")]
    default_start_time: Option<String>,
    #[serde(default)]
    port: Option<u16>,
    #[serde(default)]
    tls: Option<bool>,
    #[serde(default)]
    cert: Option<String>,
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    alerts: Vec<AlertRuleConfig>,
}

/// Resolved configuration the rest of the crate runs on (spec §6).
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub host: String,
    pub port: u16,
    pub storage: String,
    pub options: String,
    pub verbose: bool,
    pub media: Option<String>,
    pub gzip: bool,
    pub bearer_auth: Option<String>,
    pub basic_auth: Option<String>,
    pub alerts_interval_secs: u64,
    pub alerts_server: Option<String>,
    pub alerts_server_method: String,
    pub alerts_server_insecure: bool,
    pub default_tenant: String,
    pub default_start_time: String,
    pub tls: bool,
    pub cert: Option<String>,
    pub key: Option<String>,
    pub alerts: Vec<AlertRuleConfig>,
}

impl CoreConfig {
    /// Load `--config`'s JSON overlay (if given) then apply every
    /// explicitly-passed CLI flag on top, falling back to built-in defaults
    /// for anything neither source set (spec §9 "flag > file > default").
    pub fn load(args: &Args) -> Result<Self> {
        let file = match &args.config {
            Some(path) => read_config_file(path)?,
            None => ConfigFile::default(),
        };

        Ok(Self {
            host: args.host.clone(),
            port: args.port.or(file.port).unwrap_or_else(default_port),
            storage: args
                .storage
                .clone()
                .or(file.storage)
                .unwrap_or_else(default_storage),
            options: args.options.clone().or(file.options).unwrap_or_default(),
            verbose: args.verbose || file.verbose.unwrap_or(false),
            media: args.media.clone().or(file.media),
            gzip: args.gzip || file.gzip.unwrap_or(false),
            bearer_auth: args.bearer_auth.clone().or(file.bearer_auth),
            basic_auth: args.basic_auth.clone().or(file.basic_auth),
            alerts_interval_secs: args
                .alerts_interval
                .or(file.alerts_interval)
                .unwrap_or_else(default_alerts_interval),
            alerts_server: args.alerts_server.clone().or(file.alerts_server),
            alerts_server_method: args
                .alerts_server_method
                .clone()
                .or(file.alerts_server_method)
                .unwrap_or_else(default_alerts_server_method),
            alerts_server_insecure: args.alerts_server_insecure
                || file.alerts_server_insecure.unwrap_or(false),
            default_tenant: args
                .default_tenant
                .clone()
                .or(file.default_tenant)
                .unwrap_or_else(default_tenant),
            default_start_time: args
                .default_start_time
                .clone()
                .or(file.default_start_time)
                .unwrap_or_else(default_start_time),
            tls: args.tls || file.tls.unwrap_or(false),
            cert: args.cert.clone().or(file.cert),
            key: args.key.clone().or(file.key),
            alerts: file.alerts,
        })
    }
}

fn read_config_file(path: &Path) -> Result<ConfigFile> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("parsing config file {}", path.display()))
}
