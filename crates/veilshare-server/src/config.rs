//! Environment knobs. TOML file plus environment-variable overrides,
//! grounded on the pack's config idiom (`toml` + `dotenvy`, as
//! `agcodex-core`/`agcodex-arg0` use them).

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

fn default_storage_path() -> PathBuf {
    PathBuf::from("./data/sessions")
}

fn default_max_items_per_session() -> usize {
    20
}

fn default_max_items_to_send() -> usize {
    5
}

fn default_cleanup_interval_ms() -> u64 {
    3_600_000
}

fn default_idle_threshold_ms() -> u64 {
    3_600_000
}

fn default_bind_addr() -> String {
    "127.0.0.1:8787".to_string()
}

fn default_out_of_order_buffer() -> usize {
    64
}

/// Server configuration: `bindAddr`/`outOfOrderBuffer` round out the
/// knobs needed for a runnable process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,
    #[serde(default = "default_max_items_per_session")]
    pub max_items_per_session: usize,
    #[serde(default = "default_max_items_to_send")]
    pub max_items_to_send: usize,
    #[serde(default = "default_cleanup_interval_ms")]
    pub cleanup_interval_ms: u64,
    #[serde(default = "default_idle_threshold_ms")]
    pub idle_threshold_ms: u64,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Max chunks buffered against a not-yet-arrived metadata row before
    /// `OutOfOrder`.
    #[serde(default = "default_out_of_order_buffer")]
    pub out_of_order_buffer: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            max_items_per_session: default_max_items_per_session(),
            max_items_to_send: default_max_items_to_send(),
            cleanup_interval_ms: default_cleanup_interval_ms(),
            idle_threshold_ms: default_idle_threshold_ms(),
            bind_addr: default_bind_addr(),
            out_of_order_buffer: default_out_of_order_buffer(),
        }
    }
}

impl Config {
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_millis(self.cleanup_interval_ms)
    }

    pub fn idle_threshold(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.idle_threshold_ms as i64)
    }

    /// Loads `path` if present, then applies `VEILSHARE_*` environment
    /// overrides (`.env` loaded first via `dotenvy`, matching
    /// `agcodex-core`'s layering of file config under env config).
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();
        let mut config = match std::fs::read_to_string(path.as_ref()) {
            Ok(text) => toml::from_str(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Config::default(),
            Err(e) => return Err(e.into()),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("VEILSHARE_STORAGE_PATH") {
            self.storage_path = PathBuf::from(v);
        }
        if let Some(v) = env_usize("VEILSHARE_MAX_ITEMS_PER_SESSION") {
            self.max_items_per_session = v;
        }
        if let Some(v) = env_usize("VEILSHARE_MAX_ITEMS_TO_SEND") {
            self.max_items_to_send = v;
        }
        if let Some(v) = env_u64("VEILSHARE_CLEANUP_INTERVAL_MS") {
            self.cleanup_interval_ms = v;
        }
        if let Some(v) = env_u64("VEILSHARE_IDLE_THRESHOLD_MS") {
            self.idle_threshold_ms = v;
        }
        if let Ok(v) = std::env::var("VEILSHARE_BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(v) = env_usize("VEILSHARE_OUT_OF_ORDER_BUFFER") {
            self.out_of_order_buffer = v;
        }
    }
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
