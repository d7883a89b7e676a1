//! Service configuration loaded from the environment.
//!
//! A `.env` file in the working directory is loaded first (if present);
//! real environment variables take precedence over it.
//!
//! # Environment Variables
//!
//! - `HOST` / `PORT` — bind address (default `0.0.0.0:8000`)
//! - `OPENAI_API_KEY` — required for every LLM request, not for boot
//! - `OPENAI_MODEL` — chat model (default `gpt-4`)
//! - `OPENAI_TEMPERATURE` — sampling temperature (default `0.7`)
//! - `OPENAI_BASE_URL` — API root (default `https://api.openai.com/v1`)
//! - `OPENAI_ORGANIZATION` — optional organization header
//! - `LLM_TIMEOUT_SECS` / `LLM_MAX_RETRIES` — HTTP behaviour of the client
//! - `AGENT_MAX_ITER` — ReAct iteration cap per task
//! - `CORS_ALLOWED_ORIGINS` — comma-separated origin list

use std::str::FromStr;

use super::errors::ConfigError;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MODEL: &str = "gpt-4";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_AGENT_MAX_ITER: u32 = 15;

/// Origins allowed when `CORS_ALLOWED_ORIGINS` is unset.
pub const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "https://mvpmaker.vercel.app",
    "http://localhost:3000",
    "http://localhost:8000",
    "https://mvpmaker-nicks-projects-2e68032b.vercel.app",
];

/// Typed service settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_temperature: f64,
    pub openai_base_url: String,
    pub openai_organization: Option<String>,
    pub llm_timeout_secs: u64,
    pub llm_max_retries: u32,
    pub agent_max_iter: u32,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            openai_api_key: None,
            openai_model: DEFAULT_MODEL.to_string(),
            openai_temperature: DEFAULT_TEMPERATURE,
            openai_base_url: DEFAULT_BASE_URL.to_string(),
            openai_organization: None,
            llm_timeout_secs: DEFAULT_TIMEOUT_SECS,
            llm_max_retries: DEFAULT_MAX_RETRIES,
            agent_max_iter: DEFAULT_AGENT_MAX_ITER,
            cors_allowed_origins: DEFAULT_CORS_ORIGINS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl Settings {
    /// Load settings from `.env` and the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            log::debug!("Loaded environment overrides from {}", path.display());
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Settings::default();

        let cors_allowed_origins = match get("CORS_ALLOWED_ORIGINS") {
            Some(raw) => {
                let origins: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(str::to_string)
                    .collect();
                // Credentialed CORS needs explicit origins.
                if origins.iter().any(|origin| origin == "*") {
                    return Err(ConfigError::InvalidValue {
                        key: "CORS_ALLOWED_ORIGINS".to_string(),
                        value: raw,
                        reason: "wildcard origin cannot be used with credentials".to_string(),
                    });
                }
                origins
            }
            None => defaults.cors_allowed_origins,
        };

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port: parse_or(get("PORT"), "PORT", defaults.port)?,
            openai_api_key: get("OPENAI_API_KEY"),
            openai_model: get("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            openai_temperature: parse_or(
                get("OPENAI_TEMPERATURE"),
                "OPENAI_TEMPERATURE",
                defaults.openai_temperature,
            )?,
            openai_base_url: get("OPENAI_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or(defaults.openai_base_url),
            openai_organization: get("OPENAI_ORGANIZATION"),
            llm_timeout_secs: parse_or(
                get("LLM_TIMEOUT_SECS"),
                "LLM_TIMEOUT_SECS",
                defaults.llm_timeout_secs,
            )?,
            llm_max_retries: parse_or(
                get("LLM_MAX_RETRIES"),
                "LLM_MAX_RETRIES",
                defaults.llm_max_retries,
            )?,
            agent_max_iter: parse_or(
                get("AGENT_MAX_ITER"),
                "AGENT_MAX_ITER",
                defaults.agent_max_iter,
            )?,
            cors_allowed_origins,
        })
    }

    /// `host:port` string for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse::<T>().map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
            reason: e.to_string(),
        }),
    }
}
