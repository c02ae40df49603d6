use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
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

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps unique-constraint violations to `Conflict`, everything else to `Database`.
fn map_unique_violation(err: sqlx::Error, what: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict(format!("{what} already exists"))
        }
        _ => AppError::Database(err),
    }
}

/// Maps foreign-key violations on delete to `Conflict`.
fn map_fk_violation(err: sqlx::Error, what: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => AppError::Conflict(
            format!("{what} is referenced by an application and cannot be deleted"),
        ),
        _ => AppError::Database(err),
    }
}

/// Escapes `%`/`_` so user input is matched literally inside ILIKE.
fn like_pattern(raw: &str) -> String {
    let escaped = raw
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, email: &str, password_hash: &str) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (id, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, "A user with this email"))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn list_cvs(&self, owner_id: Uuid, page: Page) -> Result<Vec<CvRow>, AppError> {
        let cvs = sqlx::query_as::<_, CvRow>(
            "SELECT * FROM cvs WHERE owner_id = $1 ORDER BY created_at DESC OFFSET $2 LIMIT $3",
        )
        .bind(owner_id)
        .bind(page.skip)
        .bind(page.limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(cvs)
    }

    async fn list_base_cvs(&self, owner_id: Uuid) -> Result<Vec<CvRow>, AppError> {
        let cvs = sqlx::query_as::<_, CvRow>(
            "SELECT * FROM cvs WHERE owner_id = $1 AND is_base_cv ORDER BY created_at",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(cvs)
    }

    async fn get_cv(&self, owner_id: Uuid, id: Uuid) -> Result<Option<CvRow>, AppError> {
        let cv = sqlx::query_as::<_, CvRow>("SELECT * FROM cvs WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(cv)
    }

    async fn create_cv(&self, owner_id: Uuid, cv: NewCv) -> Result<CvRow, AppError> {
        let row = sqlx::query_as::<_, CvRow>(
            r#"
            INSERT INTO cvs
                (id, owner_id, title, language, content, skills, experience, education,
                 personal_info, original_pdf_path, is_base_cv, base_cv_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(&cv.title)
        .bind(&cv.language)
        .bind(&cv.content)
        .bind(&cv.sections.skills)
        .bind(Value::Array(cv.sections.experience))
        .bind(Value::Array(cv.sections.education))
        .bind(Value::Object(cv.sections.personal_info))
        .bind(&cv.original_pdf_path)
        .bind(cv.is_base_cv)
        .bind(cv.base_cv_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_cv(
        &self,
        owner_id: Uuid,
        id: Uuid,
        update: CvUpdate,
    ) -> Result<Option<CvRow>, AppError> {
        let row = sqlx::query_as::<_, CvRow>(
            r#"
            UPDATE cvs SET
                title = COALESCE($3, title),
                language = COALESCE($4, language),
                content = COALESCE($5, content),
                skills = COALESCE($6, skills),
                experience = COALESCE($7, experience),
                education = COALESCE($8, education),
                personal_info = COALESCE($9, personal_info),
                updated_at = now()
            WHERE id = $1 AND owner_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .bind(update.title)
        .bind(update.language)
        .bind(update.content.map(Value::Object))
        .bind(update.skills)
        .bind(update.experience.map(Value::Array))
        .bind(update.education.map(Value::Array))
        .bind(update.personal_info.map(Value::Object))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_cv(&self, owner_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let referenced: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM applications a
                JOIN cvs c ON c.id = a.cv_id
                WHERE a.cv_id = $1 AND c.owner_id = $2
            )
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;
        if referenced {
            return Err(AppError::Conflict(format!(
                "CV {id} is referenced by an application and cannot be deleted"
            )));
        }

        let result = sqlx::query("DELETE FROM cvs WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_fk_violation(e, "CV"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_jobs(&self, filter: JobFilter) -> Result<Vec<JobRow>, AppError> {
        let jobs = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT * FROM jobs
            WHERE ($1::TEXT IS NULL OR location ILIKE $1)
              AND ($2::TEXT IS NULL OR company ILIKE $2)
            ORDER BY posted_date DESC NULLS LAST, created_at DESC
            OFFSET $3 LIMIT $4
            "#,
        )
        .bind(filter.location.as_deref().map(like_pattern))
        .bind(filter.company.as_deref().map(like_pattern))
        .bind(filter.page.skip)
        .bind(filter.page.limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(jobs)
    }

    async fn get_job(&self, id: Uuid) -> Result<Option<JobRow>, AppError> {
        let job = sqlx::query_as::<_, JobRow>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(job)
    }

    async fn create_job(&self, job: NewJob) -> Result<JobRow, AppError> {
        sqlx::query_as::<_, JobRow>(
            r#"
            INSERT INTO jobs
                (id, external_id, title, company, location, description, requirements,
                 salary_range, job_type, remote_option, posted_date, deadline, source, url,
                 skills_required, experience_level)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&job.external_id)
        .bind(&job.title)
        .bind(&job.company)
        .bind(&job.location)
        .bind(&job.description)
        .bind(&job.requirements)
        .bind(&job.salary_range)
        .bind(&job.job_type)
        .bind(job.remote_option)
        .bind(job.posted_date)
        .bind(job.deadline)
        .bind(&job.source)
        .bind(&job.url)
        .bind(&job.skills_required)
        .bind(&job.experience_level)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, &format!("Job '{}'", job.external_id)))
    }

    async fn upsert_jobs(&self, jobs: Vec<NewJob>) -> Result<Vec<JobRow>, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut rows = Vec::with_capacity(jobs.len());

        for job in &jobs {
            // The no-op DO UPDATE makes RETURNING yield the existing row too.
            let row = sqlx::query_as::<_, JobRow>(
                r#"
                INSERT INTO jobs
                    (id, external_id, title, company, location, description, requirements,
                     salary_range, job_type, remote_option, posted_date, deadline, source, url,
                     skills_required, experience_level)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
                ON CONFLICT (external_id) DO UPDATE SET external_id = EXCLUDED.external_id
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&job.external_id)
            .bind(&job.title)
            .bind(&job.company)
            .bind(&job.location)
            .bind(&job.description)
            .bind(&job.requirements)
            .bind(&job.salary_range)
            .bind(&job.job_type)
            .bind(job.remote_option)
            .bind(job.posted_date)
            .bind(job.deadline)
            .bind(&job.source)
            .bind(&job.url)
            .bind(&job.skills_required)
            .bind(&job.experience_level)
            .fetch_one(&mut *tx)
            .await?;
            rows.push(row);
        }

        tx.commit().await?;
        Ok(rows)
    }

    async fn update_job(&self, id: Uuid, update: JobUpdate) -> Result<Option<JobRow>, AppError> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            UPDATE jobs SET
                title = COALESCE($2, title),
                company = COALESCE($3, company),
                location = COALESCE($4, location),
                description = COALESCE($5, description),
                requirements = COALESCE($6, requirements),
                skills_required = COALESCE($7, skills_required),
                match_score = COALESCE($8, match_score)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(update.title)
        .bind(update.company)
        .bind(update.location)
        .bind(update.description)
        .bind(update.requirements)
        .bind(update.skills_required)
        .bind(update.match_score)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_job(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| map_fk_violation(e, "Job"))?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_search(&self, user_id: Uuid, search: NewJobSearch) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO job_searches (id, user_id, query, location, filters, results_count)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&search.query)
        .bind(&search.location)
        .bind(&search.filters)
        .bind(search.results_count)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_applications(
        &self,
        user_id: Uuid,
        filter: ApplicationFilter,
    ) -> Result<Vec<ApplicationRow>, AppError> {
        let rows = sqlx::query_as::<_, ApplicationRow>(
            r#"
            SELECT * FROM applications
            WHERE user_id = $1 AND ($2::TEXT IS NULL OR status = $2)
            ORDER BY created_at DESC
            OFFSET $3 LIMIT $4
            "#,
        )
        .bind(user_id)
        .bind(filter.status)
        .bind(filter.page.skip)
        .bind(filter.page.limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn all_applications(&self, user_id: Uuid) -> Result<Vec<ApplicationRow>, AppError> {
        let rows = sqlx::query_as::<_, ApplicationRow>(
            "SELECT * FROM applications WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn get_application(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<ApplicationRow>, AppError> {
        let row = sqlx::query_as::<_, ApplicationRow>(
            "SELECT * FROM applications WHERE id = $1 AND user_id = $2",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn create_application(
        &self,
        user_id: Uuid,
        application: NewApplication,
    ) -> Result<ApplicationRow, AppError> {
        let row = sqlx::query_as::<_, ApplicationRow>(
            r#"
            INSERT INTO applications
                (id, user_id, job_id, cv_id, status, cover_letter, adapted_cv_content, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(application.job_id)
        .bind(application.cv_id)
        .bind(&application.status)
        .bind(&application.cover_letter)
        .bind(&application.adapted_cv_content)
        .bind(&application.notes)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_application(
        &self,
        user_id: Uuid,
        id: Uuid,
        update: ApplicationUpdate,
    ) -> Result<Option<ApplicationRow>, AppError> {
        let row = sqlx::query_as::<_, ApplicationRow>(
            r#"
            UPDATE applications SET
                status = COALESCE($3, status),
                cover_letter = COALESCE($4, cover_letter),
                notes = COALESCE($5, notes),
                applied_date = COALESCE($6, applied_date),
                response_date = COALESCE($7, response_date),
                interview_date = COALESCE($8, interview_date),
                updated_at = now()
            WHERE id = $1 AND user_id = $2
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(update.status)
        .bind(update.cover_letter)
        .bind(update.notes)
        .bind(update.applied_date)
        .bind(update.response_date)
        .bind(update.interview_date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn delete_application(&self, user_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM applications WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
