use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use crate::jobs::sources::{
    format_salary, html_to_text, JobSource, SourceError, SourceQuery, PROBE_TIMEOUT,
};
use crate::models::job::NewJob;

pub const SOURCE_ID: &str = "adzuna";
const API_BASE: &str = "https://api.adzuna.com/v1/api/jobs";

/// Adzuna search API. Requires an app id and key.
pub struct AdzunaSource {
    client: Client,
    app_id: String,
    app_key: String,
    country: String,
}

impl AdzunaSource {
    pub fn new(client: Client, app_id: String, app_key: String, country: String) -> Self {
        Self {
            client,
            app_id,
            app_key,
            country,
        }
    }

    async fn fetch(
        &self,
        what: &str,
        location: Option<&str>,
        per_page: usize,
        probe: bool,
    ) -> Result<SearchResponse, SourceError> {
        let url = format!("{API_BASE}/{}/search/1", self.country);
        let mut params: Vec<(&str, String)> = vec![
            ("app_id", self.app_id.clone()),
            ("app_key", self.app_key.clone()),
            ("what", what.to_string()),
            ("results_per_page", per_page.clamp(1, 50).to_string()),
            ("content-type", "application/json".to_string()),
        ];
        if let Some(location) = location.filter(|l| !l.trim().is_empty()) {
            params.push(("where", location.to_string()));
        }

        let mut request = self.client.get(&url).query(&params);
        if probe {
            request = request.timeout(PROBE_TIMEOUT);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SourceError::Status {
                service: SOURCE_ID,
                status: response.status().as_u16(),
            });
        }
        Ok(response.json().await?)
    }

    fn currency(&self) -> &'static str {
        match self.country.as_str() {
            "gb" => "£",
            "us" | "ca" | "au" | "nz" | "sg" => "$",
            "in" => "₹",
            "ch" => "CHF ",
            "pl" => "PLN ",
            "br" => "R$",
            _ => "€",
        }
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Posting>,
}

#[derive(Debug, Deserialize)]
struct Named {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Category {
    label: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Posting {
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    created: Option<DateTime<Utc>>,
    redirect_url: Option<String>,
    company: Option<Named>,
    location: Option<Named>,
    category: Option<Category>,
    salary_min: Option<f64>,
    salary_max: Option<f64>,
    contract_time: Option<String>,
}

fn contract_label(raw: &str) -> String {
    match raw {
        "full_time" => "Full-time".to_string(),
        "part_time" => "Part-time".to_string(),
        other => other.replace('_', " "),
    }
}

impl Posting {
    fn into_new_job(self, currency: &str) -> NewJob {
        let title = html_to_text(&self.title);
        let description = html_to_text(&self.description);
        let remote_option = format!("{title} {description}")
            .to_lowercase()
            .contains("remote");

        NewJob {
            external_id: format!("{SOURCE_ID}_{}", self.id),
            title,
            company: self.company.and_then(|c| c.display_name).unwrap_or_default(),
            location: self.location.and_then(|l| l.display_name).unwrap_or_default(),
            description,
            requirements: String::new(),
            salary_range: format_salary(currency, self.salary_min, self.salary_max),
            job_type: self.contract_time.as_deref().map(contract_label).unwrap_or_default(),
            remote_option,
            posted_date: self.created,
            deadline: None,
            source: SOURCE_ID.to_string(),
            url: self.redirect_url.unwrap_or_default(),
            skills_required: self
                .category
                .and_then(|c| c.label)
                .into_iter()
                .collect(),
            experience_level: String::new(),
        }
    }
}

#[async_trait]
impl JobSource for AdzunaSource {
    fn id(&self) -> &'static str {
        SOURCE_ID
    }

    async fn search(&self, query: &SourceQuery<'_>) -> Result<Vec<NewJob>, SourceError> {
        let response = self
            .fetch(query.query, query.location, query.limit, false)
            .await?;
        let currency = self.currency();
        let jobs: Vec<NewJob> = response
            .results
            .into_iter()
            .map(|p| p.into_new_job(currency))
            .collect();
        info!("Adzuna returned {} postings", jobs.len());
        Ok(jobs)
    }

    async fn probe(&self) -> Result<(), SourceError> {
        self.fetch("developer", None, 1, true).await.map(|_| ())
    }
}
