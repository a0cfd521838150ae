//! Application settings resolved from the INI config and the environment.
//!
//! Precedence: environment variable, then config file, then built-in default.

use std::net::SocketAddr;
use std::time::Duration;

use crate::domain::chat::{DEFAULT_HISTORY_INTERVAL, DEFAULT_HISTORY_PERIOD};
use crate::domain::error::StockchatError;
use crate::ports::config_port::ConfigPort;
use crate::ports::language_model_port::{DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE};

pub const DEFAULT_LISTEN: &str = "127.0.0.1:8000";
pub const DEFAULT_LLM_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_LLM_MODEL: &str = "alibaba/tongyi-deepresearch-30b-a3b:free";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 45;
pub const DEFAULT_MARKET_DATA_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_MARKET_DATA_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CACHE_CAPACITY: usize = 128;

pub const ENV_API_KEY: &str = "OPENROUTER_API_KEY";
pub const ENV_MODEL: &str = "OPENROUTER_MODEL";
pub const ENV_BASE_URL: &str = "OPENROUTER_BASE_URL";

#[derive(Debug, Clone, PartialEq)]
pub struct WebSettings {
    pub listen: SocketAddr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout: Duration,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarketDataSettings {
    pub base_url: String,
    pub timeout: Duration,
    pub cache_capacity: usize,
    pub history_period: String,
    pub history_interval: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub web: WebSettings,
    pub llm: LlmSettings,
    pub market_data: MarketDataSettings,
}

impl Settings {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, StockchatError> {
        Ok(Self {
            web: WebSettings {
                listen: parse_listen(config)?,
            },
            llm: LlmSettings {
                base_url: trim_base_url(config.get_string_or("llm", "base_url", DEFAULT_LLM_BASE_URL)),
                model: config.get_string_or("llm", "model", DEFAULT_LLM_MODEL),
                api_key: config.get_string("llm", "api_key"),
                temperature: parse_temperature(config)?,
                max_tokens: parse_max_tokens(config)?,
                timeout: parse_timeout(config, "llm", DEFAULT_LLM_TIMEOUT_SECS)?,
            },
            market_data: MarketDataSettings {
                base_url: trim_base_url(config.get_string_or(
                    "market_data",
                    "base_url",
                    DEFAULT_MARKET_DATA_BASE_URL,
                )),
                timeout: parse_timeout(config, "market_data", DEFAULT_MARKET_DATA_TIMEOUT_SECS)?,
                cache_capacity: parse_cache_capacity(config)?,
                history_period: config.get_string_or(
                    "market_data",
                    "history_period",
                    DEFAULT_HISTORY_PERIOD,
                ),
                history_interval: config.get_string_or(
                    "market_data",
                    "history_interval",
                    DEFAULT_HISTORY_INTERVAL,
                ),
            },
        })
    }

    /// Apply `OPENROUTER_*` overrides. Blank variables are ignored.
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        if let Some(key) = var(ENV_API_KEY) {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = var(ENV_MODEL) {
            self.llm.model = model;
        }
        if let Some(url) = var(ENV_BASE_URL) {
            self.llm.base_url = trim_base_url(url);
        }
        self
    }

    /// Config file plus process environment.
    pub fn load(config: &dyn ConfigPort) -> Result<Self, StockchatError> {
        Ok(Self::from_config(config)?.with_env_overrides(|name| std::env::var(name).ok()))
    }
}

fn invalid(section: &str, key: &str, reason: &str) -> StockchatError {
    StockchatError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn trim_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

fn parse_listen(config: &dyn ConfigPort) -> Result<SocketAddr, StockchatError> {
    config
        .get_string_or("web", "listen", DEFAULT_LISTEN)
        .parse()
        .map_err(|_| invalid("web", "listen", "expected host:port"))
}

fn parse_temperature(config: &dyn ConfigPort) -> Result<f64, StockchatError> {
    let value = config.get_double("llm", "temperature", DEFAULT_TEMPERATURE);
    if !(0.0..=2.0).contains(&value) {
        return Err(invalid("llm", "temperature", "temperature must be between 0 and 2"));
    }
    Ok(value)
}

fn parse_max_tokens(config: &dyn ConfigPort) -> Result<u32, StockchatError> {
    let value = config.get_int("llm", "max_tokens", i64::from(DEFAULT_MAX_TOKENS));
    u32::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| invalid("llm", "max_tokens", "max_tokens must be positive"))
}

fn parse_timeout(
    config: &dyn ConfigPort,
    section: &str,
    default_secs: u64,
) -> Result<Duration, StockchatError> {
    let value = config.get_int(section, "timeout_secs", default_secs as i64);
    u64::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .map(Duration::from_secs)
        .ok_or_else(|| invalid(section, "timeout_secs", "timeout_secs must be positive"))
}

fn parse_cache_capacity(config: &dyn ConfigPort) -> Result<usize, StockchatError> {
    let value = config.get_int("market_data", "cache_capacity", DEFAULT_CACHE_CAPACITY as i64);
    usize::try_from(value)
        .map_err(|_| invalid("market_data", "cache_capacity", "cache_capacity must be non-negative"))
}
