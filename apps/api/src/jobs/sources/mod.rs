//! Pluggable providers of job postings behind the `JobSource` trait.
//!
//! Each source turns a search query into `NewJob`s whose `external_id` is
//! prefixed with the source id. `AppState` holds a `JobSourceRegistry` built
//! from the `ENABLE_*` flags at start-up.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use scraper::Html;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::config::JobSourceConfig;
use crate::models::job::NewJob;

pub mod adzuna;
pub mod arbeitsagentur;
pub mod remoteok;
pub mod sample;

const USER_AGENT: &str = "jobpilot/0.1 (personal job-search assistant)";
const SOURCE_TIMEOUT_SECS: u64 = 30;
/// Timeout for connectivity probes.
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} returned HTTP {status}")]
    Status { service: &'static str, status: u16 },

    #[error("Unexpected response from {service}: {message}")]
    Payload {
        service: &'static str,
        message: String,
    },
}

/// What a source is asked for.
#[derive(Debug, Clone)]
pub struct SourceQuery<'a> {
    pub query: &'a str,
    pub location: Option<&'a str>,
    pub limit: usize,
}

#[async_trait]
pub trait JobSource: Send + Sync {
    fn id(&self) -> &'static str;

    async fn search(&self, query: &SourceQuery<'_>) -> Result<Vec<NewJob>, SourceError>;

    /// Cheap connectivity check used by the status endpoint.
    async fn probe(&self) -> Result<(), SourceError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Descriptors (settings + status endpoints)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct SourceDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub requires_api_key: bool,
}

pub const KNOWN_SOURCES: [SourceDescriptor; 4] = [
    SourceDescriptor {
        id: sample::SOURCE_ID,
        name: "Sample catalogue",
        description: "Built-in sample postings for trying the app offline",
        requires_api_key: false,
    },
    SourceDescriptor {
        id: remoteok::SOURCE_ID,
        name: "RemoteOK",
        description: "Remote job listings",
        requires_api_key: false,
    },
    SourceDescriptor {
        id: arbeitsagentur::SOURCE_ID,
        name: "Arbeitsagentur",
        description: "German Federal Employment Agency",
        requires_api_key: false,
    },
    SourceDescriptor {
        id: adzuna::SOURCE_ID,
        name: "Adzuna",
        description: "Job search aggregator",
        requires_api_key: true,
    },
];

#[derive(Debug, Clone, Serialize)]
pub struct ServiceSetting {
    pub id: &'static str,
    pub enabled: bool,
    pub name: &'static str,
    pub description: &'static str,
    pub requires_api_key: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_api_key: Option<bool>,
}

// ────────────────────────────────────────────────────────────────────────────
// Registry
// ────────────────────────────────────────────────────────────────────────────

/// The enabled sources, queried in registration order.
pub struct JobSourceRegistry {
    sources: Vec<Arc<dyn JobSource>>,
    config: JobSourceConfig,
}

pub(crate) fn http_client() -> Result<Client, SourceError> {
    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(SOURCE_TIMEOUT_SECS))
        .build()?)
}

impl JobSourceRegistry {
    pub fn from_config(config: &JobSourceConfig) -> Result<Self, SourceError> {
        let mut sources: Vec<Arc<dyn JobSource>> = Vec::new();

        if config.enable_sample {
            sources.push(Arc::new(sample::SampleSource));
        }
        if config.enable_remoteok {
            sources.push(Arc::new(remoteok::RemoteOkSource::new(http_client()?)));
        }
        if config.enable_arbeitsagentur {
            sources.push(Arc::new(arbeitsagentur::ArbeitsagenturSource::new(
                http_client()?,
            )));
        }
        if config.enable_adzuna {
            match (&config.adzuna_app_id, &config.adzuna_app_key) {
                (Some(app_id), Some(app_key)) => {
                    sources.push(Arc::new(adzuna::AdzunaSource::new(
                        http_client()?,
                        app_id.clone(),
                        app_key.clone(),
                        config.adzuna_country.clone(),
                    )));
                }
                _ => warn!("ENABLE_ADZUNA is set but ADZUNA_APP_ID/ADZUNA_APP_KEY are missing; skipping Adzuna"),
            }
        }

        Ok(Self {
            sources,
            config: config.clone(),
        })
    }

    /// Registry with explicit sources, for wiring custom providers.
    pub fn with_sources(sources: Vec<Arc<dyn JobSource>>, config: JobSourceConfig) -> Self {
        Self { sources, config }
    }

    pub fn enabled(&self) -> &[Arc<dyn JobSource>] {
        &self.sources
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn JobSource>> {
        self.sources.iter().find(|s| s.id() == id)
    }

    fn has_adzuna_key(&self) -> bool {
        self.config.adzuna_app_id.is_some() && self.config.adzuna_app_key.is_some()
    }

    fn flag(&self, id: &str) -> bool {
        match id {
            sample::SOURCE_ID => self.config.enable_sample,
            remoteok::SOURCE_ID => self.config.enable_remoteok,
            arbeitsagentur::SOURCE_ID => self.config.enable_arbeitsagentur,
            adzuna::SOURCE_ID => self.config.enable_adzuna,
            _ => false,
        }
    }

    /// Every known source with its configuration state.
    pub fn service_settings(&self) -> Vec<ServiceSetting> {
        KNOWN_SOURCES
            .iter()
            .map(|d| ServiceSetting {
                id: d.id,
                enabled: self.flag(d.id),
                name: d.name,
                description: d.description,
                requires_api_key: d.requires_api_key,
                has_api_key: d.requires_api_key.then(|| self.has_adzuna_key()),
            })
            .collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Shared helpers
// ────────────────────────────────────────────────────────────────────────────

/// Reduces an HTML fragment to its text with whitespace collapsed.
pub fn html_to_text(html: &str) -> String {
    let fragment = Html::parse_fragment(html);
    let text: Vec<&str> = fragment.root_element().text().collect();
    text.join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercased alphanumeric terms of a free-text query.
pub fn query_terms(query: &str) -> Vec<String> {
    let mut terms: Vec<String> = query
        .split(|c: char| !c.is_alphanumeric() && c != '+' && c != '#')
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect();
    let mut seen = std::collections::HashSet::new();
    terms.retain(|t| seen.insert(t.clone()));
    terms
}

pub(crate) fn format_salary(currency: &str, min: Option<f64>, max: Option<f64>) -> Option<String> {
    let fmt = |v: f64| format!("{currency}{}", v.round() as i64);
    match (min.filter(|v| *v > 0.0), max.filter(|v| *v > 0.0)) {
        (Some(lo), Some(hi)) if (lo - hi).abs() > f64::EPSILON => Some(format!("{} - {}", fmt(lo), fmt(hi))),
        (Some(v), _) | (None, Some(v)) => Some(fmt(v)),
        (None, None) => None,
    }
}
