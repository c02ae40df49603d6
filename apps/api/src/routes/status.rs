//! Connectivity report for the LLM provider and every known job source.
//!
//! Enabled services are probed concurrently, each bounded by
//! `PROBE_TIMEOUT`. Disabled sources are reported without a probe.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::future::Future;
use std::time::Instant;

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinSet;
use tracing::warn;

use crate::jobs::sources::{KNOWN_SOURCES, PROBE_TIMEOUT};
use crate::state::AppState;

const LLM_SERVICE: &str = "llm";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Connected,
    Error,
    Timeout,
    Disabled,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub status: ServiceState,
    pub message: String,
    pub response_time_ms: u64,
}

impl ServiceStatus {
    fn disabled(message: &str) -> Self {
        Self {
            status: ServiceState::Disabled,
            message: message.to_string(),
            response_time_ms: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Overall {
    Healthy,
    Partial,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub overall: Overall,
    pub services: BTreeMap<String, ServiceStatus>,
    pub checked_at: DateTime<Utc>,
}

/// Healthy when every enabled service is connected, partial when at least
/// one is, unhealthy otherwise.
pub fn overall_status<'a>(statuses: impl IntoIterator<Item = &'a ServiceStatus>) -> Overall {
    let (enabled, connected) = statuses
        .into_iter()
        .filter(|s| s.status != ServiceState::Disabled)
        .fold((0, 0), |(enabled, connected), s| {
            let up = usize::from(s.status == ServiceState::Connected);
            (enabled + 1, connected + up)
        });
    if connected == enabled {
        Overall::Healthy
    } else if connected > 0 {
        Overall::Partial
    } else {
        Overall::Unhealthy
    }
}

async fn probe<F, E>(check: F) -> ServiceStatus
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    let started = Instant::now();
    let outcome = tokio::time::timeout(PROBE_TIMEOUT, check).await;
    let response_time_ms = started.elapsed().as_millis() as u64;
    let (status, message) = match outcome {
        Ok(Ok(())) => (ServiceState::Connected, "Connected".to_string()),
        Ok(Err(e)) => (ServiceState::Error, e.to_string()),
        Err(_) => (
            ServiceState::Timeout,
            format!("No response within {} s", PROBE_TIMEOUT.as_secs()),
        ),
    };
    ServiceStatus {
        status,
        message,
        response_time_ms,
    }
}

pub async fn system_status(state: &AppState) -> SystemStatus {
    let mut services = BTreeMap::new();
    let mut probes: JoinSet<(String, ServiceStatus)> = JoinSet::new();

    let llm = state.llm.clone();
    probes.spawn(async move { (LLM_SERVICE.to_string(), probe(llm.ping()).await) });

    let settings = state.sources.service_settings();
    for descriptor in KNOWN_SOURCES {
        match state.sources.get(descriptor.id) {
            Some(source) => {
                let source = source.clone();
                probes.spawn(async move { (descriptor.id.to_string(), probe(source.probe()).await) });
            }
            None => {
                let enabled = settings
                    .iter()
                    .any(|s| s.id == descriptor.id && s.enabled);
                let status = if enabled {
                    ServiceStatus {
                        status: ServiceState::Error,
                        message: "Enabled but missing API credentials".to_string(),
                        response_time_ms: 0,
                    }
                } else {
                    ServiceStatus::disabled("Disabled in configuration")
                };
                services.insert(descriptor.id.to_string(), status);
            }
        }
    }

    while let Some(joined) = probes.join_next().await {
        match joined {
            Ok((name, status)) => {
                services.insert(name, status);
            }
            Err(e) => warn!("Status probe task failed: {e}"),
        }
    }

    SystemStatus {
        overall: overall_status(services.values()),
        services,
        checked_at: Utc::now(),
    }
}

/// GET /api/status/health
pub async fn handle_system_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(system_status(&state).await)
}
