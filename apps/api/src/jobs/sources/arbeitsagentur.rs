use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use crate::jobs::sources::{JobSource, SourceError, SourceQuery, PROBE_TIMEOUT};
use crate::models::job::NewJob;

pub const SOURCE_ID: &str = "arbeitsagentur";
const API_URL: &str = "https://rest.arbeitsagentur.de/jobboerse/jobsuche-service/pc/v4/jobs";
/// Public client id of the job board's own web frontend.
const API_KEY: &str = "jobboerse-jobsuche";
const DETAIL_URL: &str = "https://www.arbeitsagentur.de/jobsuche/jobdetail";

/// Job search REST API of the German Federal Employment Agency.
pub struct ArbeitsagenturSource {
    client: Client,
}

impl ArbeitsagenturSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn fetch(
        &self,
        was: &str,
        wo: Option<&str>,
        size: usize,
        probe: bool,
    ) -> Result<SearchResponse, SourceError> {
        let mut params: Vec<(&str, String)> = vec![
            ("was", was.to_string()),
            ("size", size.clamp(1, 100).to_string()),
            ("page", "1".to_string()),
        ];
        if let Some(wo) = wo.filter(|w| !w.trim().is_empty()) {
            params.push(("wo", wo.to_string()));
        }

        let mut request = self
            .client
            .get(API_URL)
            .header("X-API-Key", API_KEY)
            .query(&params);
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
}

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    stellenangebote: Vec<Posting>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Posting {
    refnr: String,
    titel: Option<String>,
    beruf: Option<String>,
    arbeitgeber: Option<String>,
    arbeitsort: Option<Workplace>,
    aktuelle_veroeffentlichungsdatum: Option<String>,
    externe_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Workplace {
    ort: Option<String>,
    region: Option<String>,
    land: Option<String>,
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

impl Posting {
    fn into_new_job(self) -> NewJob {
        let location = self
            .arbeitsort
            .map(|w| {
                [w.ort, w.region, w.land]
                    .into_iter()
                    .flatten()
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        let title = self
            .titel
            .clone()
            .or_else(|| self.beruf.clone())
            .unwrap_or_else(|| "Untitled position".to_string());
        let description = match &self.beruf {
            Some(beruf) if *beruf != title => format!("{title} ({beruf})"),
            _ => title.clone(),
        };

        NewJob {
            external_id: format!("{SOURCE_ID}_{}", self.refnr),
            title,
            company: self.arbeitgeber.unwrap_or_default(),
            location,
            description,
            requirements: String::new(),
            salary_range: None,
            job_type: String::new(),
            remote_option: false,
            posted_date: self
                .aktuelle_veroeffentlichungsdatum
                .as_deref()
                .and_then(parse_date),
            deadline: None,
            source: SOURCE_ID.to_string(),
            url: self
                .externe_url
                .unwrap_or_else(|| format!("{DETAIL_URL}/{}", self.refnr)),
            skills_required: self.beruf.into_iter().collect(),
            experience_level: String::new(),
        }
    }
}

#[async_trait]
impl JobSource for ArbeitsagenturSource {
    fn id(&self) -> &'static str {
        SOURCE_ID
    }

    async fn search(&self, query: &SourceQuery<'_>) -> Result<Vec<NewJob>, SourceError> {
        let response = self
            .fetch(query.query, query.location, query.limit, false)
            .await?;
        let jobs: Vec<NewJob> = response
            .stellenangebote
            .into_iter()
            .map(Posting::into_new_job)
            .collect();
        info!("Arbeitsagentur returned {} postings", jobs.len());
        Ok(jobs)
    }

    async fn probe(&self) -> Result<(), SourceError> {
        self.fetch("Entwickler", None, 1, true).await.map(|_| ())
    }
}
