use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::jobs::sources::{
    format_salary, html_to_text, query_terms, JobSource, SourceError, SourceQuery, PROBE_TIMEOUT,
};
use crate::models::job::NewJob;

pub const SOURCE_ID: &str = "remoteok";
const API_URL: &str = "https://remoteok.com/api";

/// RemoteOK public feed. The feed is not searchable server-side, so postings
/// are filtered locally by the query terms.
pub struct RemoteOkSource {
    client: Client,
}

impl RemoteOkSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct RemoteOkPosting {
    id: Value,
    position: String,
    #[serde(default)]
    company: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tags: Vec<String>,
    salary_min: Option<f64>,
    salary_max: Option<f64>,
    url: Option<String>,
    date: Option<DateTime<Utc>>,
}

impl RemoteOkPosting {
    fn matches(&self, terms: &[String]) -> bool {
        let text = format!("{} {} {}", self.position, self.tags.join(" "), self.description)
            .to_lowercase();
        terms.iter().any(|t| text.contains(t.as_str()))
    }

    fn into_new_job(self) -> NewJob {
        let id = match &self.id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let description = html_to_text(&self.description);
        NewJob {
            external_id: format!("{SOURCE_ID}_{id}"),
            title: self.position,
            company: self.company,
            location: if self.location.is_empty() {
                "Remote".to_string()
            } else {
                self.location
            },
            requirements: String::new(),
            description,
            salary_range: format_salary("$", self.salary_min, self.salary_max),
            job_type: "Full-time".to_string(),
            remote_option: true,
            posted_date: self.date,
            deadline: None,
            source: SOURCE_ID.to_string(),
            url: self
                .url
                .unwrap_or_else(|| format!("https://remoteok.com/remote-jobs/{id}")),
            skills_required: self.tags,
            experience_level: String::new(),
        }
    }
}

/// The feed's first element is a legal notice, not a posting; anything that
/// does not deserialize as a posting is dropped.
fn parse_feed(feed: Vec<Value>, terms: &[String], limit: usize) -> Vec<NewJob> {
    feed.into_iter()
        .filter_map(|item| serde_json::from_value::<RemoteOkPosting>(item).ok())
        .filter(|p| p.matches(terms))
        .take(limit)
        .map(RemoteOkPosting::into_new_job)
        .collect()
}

#[async_trait]
impl JobSource for RemoteOkSource {
    fn id(&self) -> &'static str {
        SOURCE_ID
    }

    async fn search(&self, query: &SourceQuery<'_>) -> Result<Vec<NewJob>, SourceError> {
        let response = self.client.get(API_URL).send().await?;
        if !response.status().is_success() {
            return Err(SourceError::Status {
                service: SOURCE_ID,
                status: response.status().as_u16(),
            });
        }
        let feed: Vec<Value> = response.json().await?;
        let jobs = parse_feed(feed, &query_terms(query.query), query.limit);
        info!("RemoteOK returned {} matching postings", jobs.len());
        Ok(jobs)
    }

    async fn probe(&self) -> Result<(), SourceError> {
        let response = self.client.get(API_URL).timeout(PROBE_TIMEOUT).send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(SourceError::Status {
                service: SOURCE_ID,
                status: response.status().as_u16(),
            })
        }
    }
}
