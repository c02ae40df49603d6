//! In-memory `Store` used by the test suite. Mirrors the Postgres semantics
//! (owner scoping, unique keys, RESTRICT on referenced rows).

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::application::{
    ApplicationFilter, ApplicationRow, ApplicationUpdate, NewApplication,
};
use crate::models::cv::{CvRow, CvUpdate, NewCv};
use crate::models::job::{JobFilter, JobRow, JobUpdate, NewJob, NewJobSearch};
use crate::models::user::User;
use crate::models::Page;
use crate::store::Store;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    cvs: Vec<CvRow>,
    jobs: Vec<JobRow>,
    applications: Vec<ApplicationRow>,
    searches: Vec<(Uuid, NewJobSearch)>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search_count(&self, user_id: Uuid) -> usize {
        self.lock().searches.iter().filter(|(u, _)| *u == user_id).count()
    }

    pub fn cv_count(&self) -> usize {
        self.lock().cvs.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }
}

fn paginate<T>(rows: Vec<T>, page: Page) -> Vec<T> {
    rows.into_iter()
        .skip(page.skip as usize)
        .take(page.limit as usize)
        .collect()
}

fn job_row(job: NewJob) -> JobRow {
    JobRow {
        id: Uuid::new_v4(),
        external_id: job.external_id,
        title: job.title,
        company: job.company,
        location: job.location,
        description: job.description,
        requirements: job.requirements,
        salary_range: job.salary_range,
        job_type: job.job_type,
        remote_option: job.remote_option,
        posted_date: job.posted_date,
        deadline: job.deadline,
        source: job.source,
        url: job.url,
        skills_required: job.skills_required,
        experience_level: job.experience_level,
        match_score: None,
        created_at: Utc::now(),
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, AppError> {
        let mut tables = self.lock();
        if tables.users.iter().any(|u| u.email == email) {
            return Err(AppError::Conflict(
                "A user with this email already exists".to_string(),
            ));
        }
        let user = User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            is_active: true,
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.lock().users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.lock().users.iter().find(|u| u.id == id).cloned())
    }

    async fn list_cvs(&self, owner_id: Uuid, page: Page) -> Result<Vec<CvRow>, AppError> {
        let mut cvs: Vec<CvRow> = self
            .lock()
            .cvs
            .iter()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect();
        cvs.reverse();
        Ok(paginate(cvs, page))
    }

    async fn list_base_cvs(&self, owner_id: Uuid) -> Result<Vec<CvRow>, AppError> {
        Ok(self
            .lock()
            .cvs
            .iter()
            .filter(|c| c.owner_id == owner_id && c.is_base_cv)
            .cloned()
            .collect())
    }

    async fn get_cv(&self, owner_id: Uuid, id: Uuid) -> Result<Option<CvRow>, AppError> {
        Ok(self
            .lock()
            .cvs
            .iter()
            .find(|c| c.id == id && c.owner_id == owner_id)
            .cloned())
    }

    async fn create_cv(&self, owner_id: Uuid, cv: NewCv) -> Result<CvRow, AppError> {
        let row = CvRow {
            id: Uuid::new_v4(),
            owner_id,
            title: cv.title,
            language: cv.language,
            content: cv.content,
            skills: cv.sections.skills,
            experience: Value::Array(cv.sections.experience),
            education: Value::Array(cv.sections.education),
            personal_info: Value::Object(cv.sections.personal_info),
            original_pdf_path: cv.original_pdf_path,
            is_base_cv: cv.is_base_cv,
            base_cv_id: cv.base_cv_id,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.lock().cvs.push(row.clone());
        Ok(row)
    }

    async fn update_cv(
        &self,
        owner_id: Uuid,
        id: Uuid,
        update: CvUpdate,
    ) -> Result<Option<CvRow>, AppError> {
        let mut tables = self.lock();
        let Some(cv) = tables
            .cvs
            .iter_mut()
            .find(|c| c.id == id && c.owner_id == owner_id)
        else {
            return Ok(None);
        };
        if let Some(title) = update.title {
            cv.title = title;
        }
        if let Some(language) = update.language {
            cv.language = language;
        }
        if let Some(content) = update.content {
            cv.content = Value::Object(content);
        }
        if let Some(skills) = update.skills {
            cv.skills = skills;
        }
        if let Some(experience) = update.experience {
            cv.experience = Value::Array(experience);
        }
        if let Some(education) = update.education {
            cv.education = Value::Array(education);
        }
        if let Some(personal_info) = update.personal_info {
            cv.personal_info = Value::Object(personal_info);
        }
        cv.updated_at = Some(Utc::now());
        Ok(Some(cv.clone()))
    }

    async fn delete_cv(&self, owner_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.lock();
        let owned = tables.cvs.iter().any(|c| c.id == id && c.owner_id == owner_id);
        if owned && tables.applications.iter().any(|a| a.cv_id == id) {
            return Err(AppError::Conflict(format!(
                "CV {id} is referenced by an application and cannot be deleted"
            )));
        }
        let before = tables.cvs.len();
        tables
            .cvs
            .retain(|c| !(c.id == id && c.owner_id == owner_id));
        let deleted = tables.cvs.len() < before;
        if deleted {
            for cv in tables.cvs.iter_mut().filter(|c| c.base_cv_id == Some(id)) {
                cv.base_cv_id = None;
            }
        }
        Ok(deleted)
    }

    async fn list_jobs(&self, filter: JobFilter) -> Result<Vec<JobRow>, AppError> {
        let location = filter.location.map(|l| l.to_lowercase());
        let company = filter.company.map(|c| c.to_lowercase());
        let mut jobs: Vec<JobRow> = self
            .lock()
            .jobs
            .iter()
            .filter(|j| {
                location
                    .as_ref()
                    .map_or(true, |l| j.location.to_lowercase().contains(l))
                    && company
                        .as_ref()
                        .map_or(true, |c| j.company.to_lowercase().contains(c))
            })
            .cloned()
            .collect();
        jobs.sort_by(|a, b| b.posted_date.cmp(&a.posted_date));
        Ok(paginate(jobs, filter.page))
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<JobRow>, AppError> {
        Ok(self.lock().jobs.iter().find(|j| j.id == id).cloned())
    }

    async fn create_job(&self, job: NewJob) -> Result<JobRow, AppError> {
        let mut tables = self.lock();
        if tables.jobs.iter().any(|j| j.external_id == job.external_id) {
            return Err(AppError::Conflict(format!(
                "Job '{}' already exists",
                job.external_id
            )));
        }
        let row = job_row(job);
        tables.jobs.push(row.clone());
        Ok(row)
    }

    async fn upsert_jobs(&self, jobs: Vec<NewJob>) -> Result<Vec<JobRow>, AppError> {
        let mut tables = self.lock();
        let mut rows = Vec::with_capacity(jobs.len());
        for job in jobs {
            match tables.jobs.iter().find(|j| j.external_id == job.external_id) {
                Some(existing) => rows.push(existing.clone()),
                None => {
                    let row = job_row(job);
                    tables.jobs.push(row.clone());
                    rows.push(row);
                }
            }
        }
        Ok(rows)
    }

    async fn update_job(&self, id: Uuid, update: JobUpdate) -> Result<Option<JobRow>, AppError> {
        let mut tables = self.lock();
        let Some(job) = tables.jobs.iter_mut().find(|j| j.id == id) else {
            return Ok(None);
        };
        if let Some(title) = update.title {
            job.title = title;
        }
        if let Some(company) = update.company {
            job.company = company;
        }
        if let Some(location) = update.location {
            job.location = location;
        }
        if let Some(description) = update.description {
            job.description = description;
        }
        if let Some(requirements) = update.requirements {
            job.requirements = requirements;
        }
        if let Some(skills) = update.skills_required {
            job.skills_required = skills;
        }
        if let Some(score) = update.match_score {
            job.match_score = Some(score);
        }
        Ok(Some(job.clone()))
    }

    async fn delete_job(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.lock();
        if tables.applications.iter().any(|a| a.job_id == id) {
            return Err(AppError::Conflict(
                "Job is referenced by an application and cannot be deleted".to_string(),
            ));
        }
        let before = tables.jobs.len();
        tables.jobs.retain(|j| j.id != id);
        Ok(tables.jobs.len() < before)
    }

    async fn record_search(&self, user_id: Uuid, search: NewJobSearch) -> Result<(), AppError> {
        self.lock().searches.push((user_id, search));
        Ok(())
    }

    async fn list_applications(
        &self,
        user_id: Uuid,
        filter: ApplicationFilter,
    ) -> Result<Vec<ApplicationRow>, AppError> {
        let mut rows: Vec<ApplicationRow> = self
            .lock()
            .applications
            .iter()
            .filter(|a| a.user_id == user_id)
            .filter(|a| filter.status.as_ref().map_or(true, |s| &a.status == s))
            .cloned()
            .collect();
        rows.reverse();
        Ok(paginate(rows, filter.page))
    }

    async fn all_applications(&self, user_id: Uuid) -> Result<Vec<ApplicationRow>, AppError> {
        Ok(self
            .lock()
            .applications
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_application(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<ApplicationRow>, AppError> {
        Ok(self
            .lock()
            .applications
            .iter()
            .find(|a| a.id == id && a.user_id == user_id)
            .cloned())
    }

    async fn create_application(
        &self,
        user_id: Uuid,
        application: NewApplication,
    ) -> Result<ApplicationRow, AppError> {
        let row = ApplicationRow {
            id: Uuid::new_v4(),
            user_id,
            job_id: application.job_id,
            cv_id: application.cv_id,
            status: application.status,
            cover_letter: application.cover_letter,
            adapted_cv_content: application.adapted_cv_content,
            notes: application.notes,
            applied_date: None,
            response_date: None,
            interview_date: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.lock().applications.push(row.clone());
        Ok(row)
    }

    async fn update_application(
        &self,
        user_id: Uuid,
        id: Uuid,
        update: ApplicationUpdate,
    ) -> Result<Option<ApplicationRow>, AppError> {
        let mut tables = self.lock();
        let Some(app) = tables
            .applications
            .iter_mut()
            .find(|a| a.id == id && a.user_id == user_id)
        else {
            return Ok(None);
        };
        if let Some(status) = update.status {
            app.status = status;
        }
        if let Some(cover_letter) = update.cover_letter {
            app.cover_letter = Some(cover_letter);
        }
        if let Some(notes) = update.notes {
            app.notes = Some(notes);
        }
        if update.applied_date.is_some() {
            app.applied_date = update.applied_date;
        }
        if update.response_date.is_some() {
            app.response_date = update.response_date;
        }
        if update.interview_date.is_some() {
            app.interview_date = update.interview_date;
        }
        app.updated_at = Some(Utc::now());
        Ok(Some(app.clone()))
    }

    async fn delete_application(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let mut tables = self.lock();
        let before = tables.applications.len();
        tables
            .applications
            .retain(|a| !(a.id == id && a.user_id == user_id));
        Ok(tables.applications.len() < before)
    }
}
