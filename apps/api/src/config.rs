use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:8000";

/// Application configuration loaded from environment variables.
/// Start-up fails if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub llm: LlmConfig,
    pub auth: AuthConfig,
    pub cors_origins: Vec<String>,
    pub cv_source_paths: Vec<PathBuf>,
    pub upload_dir: PathBuf,
    pub job_sources: JobSourceConfig,
    pub port: u16,
    pub rust_log: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub default_model: String,
    pub advanced_model: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub secret_key: String,
    pub access_token_expire_minutes: i64,
}

/// Toggles and credentials for the external job sources.
#[derive(Debug, Clone, Default)]
pub struct JobSourceConfig {
    pub enable_sample: bool,
    pub enable_remoteok: bool,
    pub enable_arbeitsagentur: bool,
    pub enable_adzuna: bool,
    pub adzuna_app_id: Option<String>,
    pub adzuna_app_key: Option<String>,
    pub adzuna_country: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &str| {
            var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
        };

        let api_key = require("OPENROUTER_API_KEY")?;
        if api_key.len() < 10 || api_key == "your_openrouter_key_here" {
            bail!("OPENROUTER_API_KEY must be a real API key");
        }

        let secret_key = require("SECRET_KEY")?;
        if secret_key.len() < 32 || secret_key == "your_secret_key_here" {
            bail!("SECRET_KEY must be at least 32 characters");
        }

        let max_attempts: u32 = parse_or(var("LLM_MAX_ATTEMPTS"), 1, "LLM_MAX_ATTEMPTS")?;
        if max_attempts == 0 {
            bail!("LLM_MAX_ATTEMPTS must be at least 1");
        }

        let cv_source_paths: Vec<PathBuf> = split_list(&var("CV_SOURCE_PATHS").unwrap_or_default())
            .into_iter()
            .map(PathBuf::from)
            .collect();

        Ok(Config {
            database_url: require("DATABASE_URL")?,
            llm: LlmConfig {
                api_key,
                base_url: var("OPENROUTER_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_OPENROUTER_BASE_URL.to_string())
                    .trim_end_matches('/')
                    .to_string(),
                default_model: var("LLM_DEFAULT_MODEL")
                    .unwrap_or_else(|| "anthropic/claude-3-haiku".to_string()),
                advanced_model: var("LLM_ADVANCED_MODEL")
                    .unwrap_or_else(|| "anthropic/claude-3-sonnet".to_string()),
                timeout_secs: parse_or(var("LLM_TIMEOUT_SECS"), 120, "LLM_TIMEOUT_SECS")?,
                max_attempts,
            },
            auth: AuthConfig {
                secret_key,
                access_token_expire_minutes: parse_or(
                    var("ACCESS_TOKEN_EXPIRE_MINUTES"),
                    30,
                    "ACCESS_TOKEN_EXPIRE_MINUTES",
                )?,
            },
            cors_origins: split_list(
                &var("CORS_ORIGINS").unwrap_or_else(|| DEFAULT_CORS_ORIGINS.to_string()),
            ),
            cv_source_paths,
            upload_dir: PathBuf::from(var("UPLOAD_DIR").unwrap_or_else(|| "data/cvs".to_string())),
            job_sources: JobSourceConfig {
                enable_sample: parse_flag(var("ENABLE_SAMPLE_JOBS"), true, "ENABLE_SAMPLE_JOBS")?,
                enable_remoteok: parse_flag(var("ENABLE_REMOTEOK"), false, "ENABLE_REMOTEOK")?,
                enable_arbeitsagentur: parse_flag(
                    var("ENABLE_ARBEITSAGENTUR"),
                    false,
                    "ENABLE_ARBEITSAGENTUR",
                )?,
                enable_adzuna: parse_flag(var("ENABLE_ADZUNA"), false, "ENABLE_ADZUNA")?,
                adzuna_app_id: var("ADZUNA_APP_ID"),
                adzuna_app_key: var("ADZUNA_APP_KEY"),
                adzuna_country: var("ADZUNA_COUNTRY").unwrap_or_else(|| "de".to_string()),
            },
            port: parse_or(var("PORT"), 8000, "PORT")?,
            rust_log: var("RUST_LOG").unwrap_or_else(|| "info".to_string()),
            log_format: match var("LOG_FORMAT").as_deref() {
                None | Some("pretty") => LogFormat::Pretty,
                Some("json") => LogFormat::Json,
                Some(other) => bail!("LOG_FORMAT must be 'pretty' or 'json', got '{other}'"),
            },
        })
    }

    /// Configured CV source paths that are not on disk.
    pub fn missing_cv_source_paths(&self) -> Vec<&Path> {
        self.cv_source_paths
            .iter()
            .filter(|p| !p.exists())
            .map(PathBuf::as_path)
            .collect()
    }
}

fn parse_or<T>(value: Option<String>, default: T, key: &str) -> Result<T>
where
    T: std::str::FromStr,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("{key} has an invalid value: '{raw}'")),
        None => Ok(default),
    }
}

/// Accepts the usual spellings of a boolean flag (`true`, `False`, `1`, `no`, ...).
fn parse_flag(value: Option<String>, default: bool, key: &str) -> Result<bool> {
    let Some(raw) = value else {
        return Ok(default);
    };
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => bail!("{key} must be a boolean, got '{raw}'"),
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
