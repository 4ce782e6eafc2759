use crate::services::streaming::DEFAULT_PACING;
use crate::types::DecodingParams;
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub host: String,
    pub port: u16,

    // Model configuration
    pub model_dir: String,
    pub device: DeviceConfig,

    // Streaming
    /// Pause after each display push; 0 disables pacing
    pub stream_delay_ms: u64,

    // Sessions
    /// Sessions untouched for this long are dropped on the next page load
    pub session_idle_secs: u64,

    pub decoding: DecodingParams,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceConfig {
    Auto,
    Cpu,
    Cuda(usize),
    Metal,
}

impl FromStr for DeviceConfig {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "auto" => Ok(DeviceConfig::Auto),
            "cpu" => Ok(DeviceConfig::Cpu),
            "metal" => Ok(DeviceConfig::Metal),
            "cuda" => Ok(DeviceConfig::Cuda(0)),
            other => match other.strip_prefix("cuda:") {
                Some(idx) => Ok(DeviceConfig::Cuda(
                    idx.parse().with_context(|| format!("invalid CUDA index in {:?}", other))?,
                )),
                None => bail!("unknown device {:?} (expected auto, cpu, cuda[:N] or metal)", other),
            },
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            model_dir: "models/summarizer".to_string(),
            device: DeviceConfig::Auto,
            stream_delay_ms: DEFAULT_PACING.as_millis() as u64,
            session_idle_secs: 3600,
            decoding: DecodingParams::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let decoding = defaults.decoding.clone();

        Ok(Config {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_or(&lookup, "PORT", defaults.port)?,

            model_dir: lookup("MODEL_DIR").unwrap_or(defaults.model_dir),
            device: parse_or(&lookup, "DEVICE", defaults.device)?,

            stream_delay_ms: parse_or(&lookup, "STREAM_DELAY_MS", defaults.stream_delay_ms)?,
            session_idle_secs: parse_or(&lookup, "SESSION_IDLE_SECS", defaults.session_idle_secs)?,

            decoding: DecodingParams {
                min_new_tokens: parse_or(&lookup, "MIN_NEW_TOKENS", decoding.min_new_tokens)?,
                max_new_tokens: parse_or(&lookup, "MAX_NEW_TOKENS", decoding.max_new_tokens)?,
                temperature: parse_or(&lookup, "TEMPERATURE", decoding.temperature)?,
                top_p: parse_or(&lookup, "TOP_P", decoding.top_p)?,
                top_k: match lookup("TOP_K") {
                    Some(v) if v.trim() == "0" || v.trim().is_empty() => None,
                    Some(v) => Some(v.trim().parse().with_context(|| format!("invalid TOP_K {:?}", v))?),
                    None => decoding.top_k,
                },
                seed: parse_or(&lookup, "SEED", decoding.seed)?,
            },
        })
    }

    pub fn stream_delay(&self) -> Duration {
        Duration::from_millis(self.stream_delay_ms)
    }

    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("invalid {} {:?}: {}", key, raw, e)),
        None => Ok(default),
    }
}
