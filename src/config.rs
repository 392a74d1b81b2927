use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::cache::CacheTtl;
use crate::external::llm::LlmConfig;
use crate::models::MacroIndicators;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Redis,
    Memory,
}

impl FromStr for CacheBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "redis" => Ok(CacheBackend::Redis),
            "memory" => Ok(CacheBackend::Memory),
            other => anyhow::bail!("unknown cache backend '{}', expected 'redis' or 'memory'", other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub cache_backend: CacheBackend,
    pub redis_url: String,
    pub cache_ttl: CacheTtl,
    pub cache_op_timeout: Duration,
    pub market_data_base_url: String,
    pub market_data_timeout: Duration,
    pub llm: LlmConfig,
    pub risk_free_rate: f64,
    pub macro_defaults: MacroIndicators,
    pub request_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            cors_allowed_origins: vec!["https://pocketgenius.onrender.com".to_string()],
            cache_backend: CacheBackend::Redis,
            redis_url: "redis://localhost:6379".to_string(),
            cache_ttl: CacheTtl::from_minutes(15),
            cache_op_timeout: Duration::from_millis(500),
            market_data_base_url: "https://query1.finance.yahoo.com".to_string(),
            market_data_timeout: Duration::from_secs(10),
            llm: LlmConfig::default(),
            risk_free_rate: 2.0,
            macro_defaults: MacroIndicators::default(),
            request_timeout: Duration::from_secs(60),
        }
    }
}

impl AppConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`; unset or blank variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let cors_allowed_origins = match get("CORS_ALLOWED_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            None => defaults.cors_allowed_origins,
        };

        let cache_ttl = match get("CACHE_EXPIRATION_MINUTES") {
            Some(raw) => CacheTtl::from_minutes(parse_var("CACHE_EXPIRATION_MINUTES", &raw)?),
            None => defaults.cache_ttl,
        };

        let llm = LlmConfig {
            api_key: get("OPENAI_API_KEY"),
            base_url: get("OPENAI_BASE_URL").unwrap_or(defaults.llm.base_url),
            model: get("OPENAI_MODEL").unwrap_or(defaults.llm.model),
            max_tokens: parsed_or(&get, "LLM_MAX_TOKENS", defaults.llm.max_tokens)?,
            temperature: parsed_or(&get, "LLM_TEMPERATURE", defaults.llm.temperature)?,
            timeout: Duration::from_secs(parsed_or(&get, "LLM_TIMEOUT_SECS", defaults.llm.timeout.as_secs())?),
        };

        let macro_defaults = MacroIndicators {
            interest_rate: parsed_or(&get, "MACRO_INTEREST_RATE", defaults.macro_defaults.interest_rate)?,
            inflation: parsed_or(&get, "MACRO_INFLATION", defaults.macro_defaults.inflation)?,
            gdp_growth: parsed_or(&get, "MACRO_GDP_GROWTH", defaults.macro_defaults.gdp_growth)?,
        };

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: parsed_or(&get, "PORT", defaults.port)?,
            cors_allowed_origins,
            cache_backend: parsed_or(&get, "CACHE_BACKEND", defaults.cache_backend)?,
            redis_url: get("REDIS_URL").unwrap_or(defaults.redis_url),
            cache_ttl,
            cache_op_timeout: Duration::from_millis(parsed_or(
                &get,
                "CACHE_OP_TIMEOUT_MS",
                defaults.cache_op_timeout.as_millis() as u64,
            )?),
            market_data_base_url: get("MARKET_DATA_BASE_URL").unwrap_or(defaults.market_data_base_url),
            market_data_timeout: Duration::from_secs(parsed_or(
                &get,
                "MARKET_DATA_TIMEOUT_SECS",
                defaults.market_data_timeout.as_secs(),
            )?),
            llm,
            risk_free_rate: parsed_or(&get, "RISK_FREE_RATE", defaults.risk_free_rate)?,
            macro_defaults,
            request_timeout: Duration::from_secs(parsed_or(
                &get,
                "REQUEST_TIMEOUT_SECS",
                defaults.request_timeout.as_secs(),
            )?),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| anyhow::anyhow!("{}", e))
        .with_context(|| format!("Invalid value for {}: '{}'", name, raw))
}

fn parsed_or<T, G>(get: &G, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => parse_var(name, &raw),
        None => Ok(default),
    }
}
