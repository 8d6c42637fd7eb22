// src/config.rs

//! Runtime configuration for a `SimServer`: the bind-timeout budget, the
//! default address range nodes without an explicit address are allocated
//! from, and whether the activity log is enabled by default. Loading mirrors
//! the teacher crate's `Config`: a plain `Default` impl for programmatic use,
//! plus an optional `Config::from_file` for loading overrides from a
//! TOML file via the `config`/`toml` crates.

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::Duration;

fn default_bind_timeout_ms() -> u64 {
    10_000
}

fn default_base_port() -> u16 {
    9042
}

fn default_loopback_ip() -> Ipv4Addr {
    Ipv4Addr::LOCALHOST
}

/// Top-level configuration for a `SimServer` instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Total budget `register()` grants a topology to finish binding every
    /// node, in milliseconds (SPEC_FULL.md §4.5). Default 10s, matching the
    /// spec's stated default.
    #[serde(default = "default_bind_timeout_ms")]
    pub bind_timeout_ms: u64,
    /// The loopback IP the default `LoopbackAddressResolver` hands out
    /// addresses on.
    #[serde(default = "default_loopback_ip")]
    pub listen_ip: Ipv4Addr,
    /// The first port the default resolver hands out; successive `next()`
    /// calls walk upward from here.
    #[serde(default = "default_base_port")]
    pub base_port: u16,
    /// Whether newly registered clusters start with activity logging turned
    /// on. Operators can still toggle it per cluster after the fact.
    #[serde(default)]
    pub activity_log_enabled_by_default: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_timeout_ms: default_bind_timeout_ms(),
            listen_ip: default_loopback_ip(),
            base_port: default_base_port(),
            activity_log_enabled_by_default: false,
        }
    }
}

impl Config {
    pub fn bind_timeout(&self) -> Duration {
        Duration::from_millis(self.bind_timeout_ms)
    }

    /// Loads configuration from a TOML file, falling back to `Default` for
    /// any field the file doesn't set. Mirrors the teacher crate's layered
    /// `config`-crate loader, scaled down to this crate's much smaller
    /// surface.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(config::File::with_name(path))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
