use async_trait::async_trait;
use chrono::{Duration, Utc};

use crate::jobs::sources::{query_terms, JobSource, SourceError, SourceQuery};
use crate::models::job::NewJob;

pub const SOURCE_ID: &str = "sample";

/// Built-in catalogue of postings. Needs no network, so the app is usable
/// before any real source is configured.
pub struct SampleSource;

struct SamplePosting {
    key: &'static str,
    title: &'static str,
    company: &'static str,
    location: &'static str,
    description: &'static str,
    requirements: &'static str,
    job_type: &'static str,
    remote: bool,
    days_ago: i64,
    skills: &'static [&'static str],
    experience_level: &'static str,
    salary_range: &'static str,
}

const CATALOGUE: &[SamplePosting] = &[
    SamplePosting {
        key: "1",
        title: "Senior CFD Engineer",
        company: "Siemens Energy",
        location: "Hamburg, Germany",
        description: "We are looking for a Senior CFD Engineer to join our wind energy division. \
            The ideal candidate has extensive experience with OpenFOAM and computational fluid dynamics.",
        requirements: "PhD in Engineering, 5+ years CFD experience, OpenFOAM expertise, wind energy background",
        job_type: "Full-time",
        remote: true,
        days_ago: 2,
        skills: &["CFD", "OpenFOAM", "Wind Energy", "Python", "C++", "HPC"],
        experience_level: "Senior",
        salary_range: "€80,000 - €120,000",
    },
    SamplePosting {
        key: "2",
        title: "Computational Fluid Dynamics Specialist",
        company: "Airbus",
        location: "Hamburg, Germany",
        description: "Join our aerodynamics team working on next-generation aircraft. \
            We need a CFD specialist with a strong background in high-performance computing.",
        requirements: "Master's degree in Aerospace Engineering, CFD experience, HPC knowledge, programming skills",
        job_type: "Full-time",
        remote: false,
        days_ago: 1,
        skills: &["CFD", "Aerodynamics", "HPC", "ANSYS", "Python", "Fortran"],
        experience_level: "Mid-level",
        salary_range: "€70,000 - €100,000",
    },
    SamplePosting {
        key: "3",
        title: "Research Scientist - Wind Energy",
        company: "Fraunhofer Institute",
        location: "Oldenburg, Germany",
        description: "Research position focusing on wind turbine aerodynamics and computational modeling. \
            Experience with Lattice Boltzmann Methods preferred.",
        requirements: "PhD in relevant field, research experience, wind energy background, LBM knowledge",
        job_type: "Full-time",
        remote: true,
        days_ago: 5,
        skills: &["Wind Energy", "LBM", "Research", "OpenFOAM", "Python", "Supercomputing"],
        experience_level: "Senior",
        salary_range: "€60,000 - €90,000",
    },
    SamplePosting {
        key: "4",
        title: "Backend Engineer (Rust)",
        company: "Northwind Logistics",
        location: "Berlin, Germany",
        description: "Design and operate the services behind our routing platform. \
            You will write Rust services on top of PostgreSQL and Kafka.",
        requirements: "3+ years backend development, Rust or C++, SQL databases, distributed systems",
        job_type: "Full-time",
        remote: true,
        days_ago: 3,
        skills: &["Rust", "PostgreSQL", "Kafka", "Docker", "Kubernetes"],
        experience_level: "Mid-level",
        salary_range: "€75,000 - €95,000",
    },
    SamplePosting {
        key: "5",
        title: "Data Engineer",
        company: "Helios Analytics",
        location: "Munich, Germany",
        description: "Build batch and streaming pipelines for energy market data. \
            Python, SQL and a cloud data warehouse are your daily tools.",
        requirements: "Experience with Python, SQL, Airflow and a cloud provider",
        job_type: "Full-time",
        remote: false,
        days_ago: 7,
        skills: &["Python", "SQL", "Airflow", "AWS", "Spark"],
        experience_level: "Junior",
        salary_range: "€55,000 - €70,000",
    },
    SamplePosting {
        key: "6",
        title: "Simulation Software Developer (Part-time)",
        company: "Aerolab GmbH",
        location: "Stuttgart, Germany",
        description: "Maintain our in-house solver written in C++ and Fortran and \
            add Python bindings for our simulation engineers.",
        requirements: "C++, numerical methods, Python bindings, CMake",
        job_type: "Part-time",
        remote: true,
        days_ago: 10,
        skills: &["C++", "Fortran", "Python", "CMake", "Numerical Methods"],
        experience_level: "Mid-level",
        salary_range: "€40,000 - €50,000",
    },
];

impl SamplePosting {
    fn searchable_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.title,
            self.description,
            self.requirements,
            self.skills.join(" ")
        )
        .to_lowercase()
    }

    fn to_new_job(&self) -> NewJob {
        NewJob {
            external_id: format!("{SOURCE_ID}_{}", self.key),
            title: self.title.to_string(),
            company: self.company.to_string(),
            location: self.location.to_string(),
            description: self.description.to_string(),
            requirements: self.requirements.to_string(),
            salary_range: Some(self.salary_range.to_string()),
            job_type: self.job_type.to_string(),
            remote_option: self.remote,
            posted_date: Some(Utc::now() - Duration::days(self.days_ago)),
            deadline: None,
            source: SOURCE_ID.to_string(),
            url: format!("https://jobs.example.com/sample/{}", self.key),
            skills_required: self.skills.iter().map(|s| s.to_string()).collect(),
            experience_level: self.experience_level.to_string(),
        }
    }
}

#[async_trait]
impl JobSource for SampleSource {
    fn id(&self) -> &'static str {
        SOURCE_ID
    }

    /// Postings mentioning at least one query term.
    async fn search(&self, query: &SourceQuery<'_>) -> Result<Vec<NewJob>, SourceError> {
        let terms = query_terms(query.query);
        Ok(CATALOGUE
            .iter()
            .filter(|p| {
                let text = p.searchable_text();
                terms.iter().any(|t| text.contains(t.as_str()))
            })
            .take(query.limit)
            .map(SamplePosting::to_new_job)
            .collect())
    }

    async fn probe(&self) -> Result<(), SourceError> {
        Ok(())
    }
}
