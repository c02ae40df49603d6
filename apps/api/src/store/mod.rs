//! Persistence seam. Handlers and services only see `dyn Store`;
//! `PgStore` is the production backend.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::application::{
    ApplicationFilter, ApplicationRow, ApplicationUpdate, NewApplication,
};
use crate::models::cv::{CvRow, CvUpdate, NewCv};
use crate::models::job::{JobFilter, JobRow, JobUpdate, NewJob, NewJobSearch};
use crate::models::user::User;
use crate::models::Page;

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgStore;

/// All row access used by the API.
///
/// CV and application methods are scoped by owner: a row owned by someone
/// else behaves exactly like a missing row. Jobs are shared.
#[async_trait]
pub trait Store: Send + Sync {
    // Users
    /// Fails with `Conflict` when the email is taken.
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, AppError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError>;

    // CVs
    async fn list_cvs(&self, owner_id: Uuid, page: Page) -> Result<Vec<CvRow>, AppError>;
    async fn list_base_cvs(&self, owner_id: Uuid) -> Result<Vec<CvRow>, AppError>;
    async fn get_cv(&self, owner_id: Uuid, id: Uuid) -> Result<Option<CvRow>, AppError>;
    async fn create_cv(&self, owner_id: Uuid, cv: NewCv) -> Result<CvRow, AppError>;
    async fn update_cv(
        &self,
        owner_id: Uuid,
        id: Uuid,
        update: CvUpdate,
    ) -> Result<Option<CvRow>, AppError>;
    /// Returns `false` when no such CV exists. Fails with `Conflict` while an
    /// application references the CV.
    async fn delete_cv(&self, owner_id: Uuid, id: Uuid) -> Result<bool, AppError>;

    // Jobs
    async fn list_jobs(&self, filter: JobFilter) -> Result<Vec<JobRow>, AppError>;
    async fn get_job(&self, id: Uuid) -> Result<Option<JobRow>, AppError>;
    /// Fails with `Conflict` on a duplicate `external_id`.
    async fn create_job(&self, job: NewJob) -> Result<JobRow, AppError>;
    /// Inserts postings that are new by `external_id` and returns the stored
    /// row for every input, keeping existing rows as they are.
    async fn upsert_jobs(&self, jobs: Vec<NewJob>) -> Result<Vec<JobRow>, AppError>;
    async fn update_job(&self, id: Uuid, update: JobUpdate) -> Result<Option<JobRow>, AppError>;
    /// Returns `false` when no such job exists. Fails with `Conflict` while an
    /// application references the job.
    async fn delete_job(&self, id: Uuid) -> Result<bool, AppError>;
    async fn record_search(&self, user_id: Uuid, search: NewJobSearch) -> Result<(), AppError>;

    // Applications
    async fn list_applications(
        &self,
        user_id: Uuid,
        filter: ApplicationFilter,
    ) -> Result<Vec<ApplicationRow>, AppError>;
    /// Every application of the user, unpaginated (analytics, recommendations).
    async fn all_applications(&self, user_id: Uuid) -> Result<Vec<ApplicationRow>, AppError>;
    async fn get_application(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<ApplicationRow>, AppError>;
    async fn create_application(
        &self,
        user_id: Uuid,
        application: NewApplication,
    ) -> Result<ApplicationRow, AppError>;
    async fn update_application(
        &self,
        user_id: Uuid,
        id: Uuid,
        update: ApplicationUpdate,
    ) -> Result<Option<ApplicationRow>, AppError>;
    async fn delete_application(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError>;
}
