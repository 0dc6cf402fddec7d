use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub typing_ttl: Duration,
    pub sweep_interval: Duration,
    pub event_buffer: usize,
}

impl Config {
    /// Read configuration from `THREADKIT_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            db_path: std::env::var("THREADKIT_DB_PATH")
                .unwrap_or_else(|_| "threadkit.db".into())
                .into(),
            typing_ttl: Duration::from_millis(env_or("THREADKIT_TYPING_TTL_MS", 5000)?),
            sweep_interval: Duration::from_millis(env_or("THREADKIT_SWEEP_INTERVAL_MS", 2000)?),
            event_buffer: env_or("THREADKIT_EVENT_BUFFER", 1024)? as usize,
        })
    }
}

fn env_or(key: &str, default: u64) -> Result<u64> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{} must be an integer, got '{}'", key, raw)),
        Err(_) => Ok(default),
    }
}
