//! CLI flags (spec §6 "Configuration").
//!
//! `clap`'s derive API, the same way the teacher's `cli.rs` does — one flat
//! `Args` struct parsed once in `main`. Most fields are `Option<T>` with no
//! `default_value` so `config::CoreConfig::load` can tell "explicitly passed
//! on the command line" apart from "fall back to the config file, then the
//! built-in default" (spec §9's viper-style flag > file > default layering).

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "mohawk-rs",
    version,
    about = "Hawkular-compatible time-series metrics and alerting service"
)]
pub struct Args {
    /// Optional JSON config file overlay (spec §6 recognized keys, including
    /// the `alerts[]` rule list).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Address to bind the HTTP listener on.
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    /// `port` (spec §6).
    #[arg(long)]
    pub port: Option<u16>,

    /// `storage` — engine name: `memory`, `sqlite`, or `document`.
    #[arg(long)]
    pub storage: Option<String>,

    /// `options` — engine-specific `key=value&key=value` options string.
    #[arg(long)]
    pub options: Option<String>,

    /// `verbose`.
    #[arg(long, default_value_t = false)]
    pub verbose: bool,

    /// `media` — static asset directory (out of core scope, spec §1; the
    /// value is accepted and stored but no file server is wired).
    #[arg(long)]
    pub media: Option<String>,

    /// `gzip` — enable response compression.
    #[arg(long, default_value_t = false)]
    pub gzip: bool,

    /// `bearer-auth` — static bearer token required on every non-public
    /// request.
    #[arg(long = "bearer-auth")]
    pub bearer_auth: Option<String>,

    /// `basic-auth` — `user:pass` pair required on every non-public request.
    #[arg(long = "basic-auth")]
    pub basic_auth: Option<String>,

    /// `alerts-interval` — scheduler tick period in seconds.
    #[arg(long = "alerts-interval")]
    pub alerts_interval: Option<u64>,

    /// `alerts-server` — webhook URL state transitions are POSTed to.
    #[arg(long = "alerts-server")]
    pub alerts_server: Option<String>,

    /// `alerts-server-method` — HTTP method used for delivery.
    #[arg(long = "alerts-server-method")]
    pub alerts_server_method: Option<String>,

    /// `alerts-server-insecure` — suppress certificate validation.
    #[arg(long = "alerts-server-insecure", default_value_t = false)]
    pub alerts_server_insecure: bool,

    /// `default-tenant`.
    #[arg(long = "default-tenant")]
    pub default_tenant: Option<String>,

    /// `default-start-time` — relative duration applied when a query omits
    /// `start` (spec §4.1).
    #[arg(long = "default-start-time")]
    pub default_start_time: Option<String>,

    /// `tls` — accepted for compatibility; TLS termination is not wired (see
    /// DESIGN.md).
    #[arg(long, default_value_t = false)]
    pub tls: bool,

    /// `cert`.
    #[arg(long)]
    pub cert: Option<String>,

    /// `key`.
    #[arg(long)]
    pub key: Option<String>,
}
