use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;

use crate::models::job::JobPosting;
use crate::models::profile::CandidateProfile;
use crate::store::{CandidateStore, StoreError};

/// `CandidateStore` on PostgreSQL. Vectors live in `REAL[]` columns.
#[derive(Clone)]
pub struct PgCandidateStore {
    pool: PgPool,
}

impl PgCandidateStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CandidateStore for PgCandidateStore {
    async fn list_jobs_with_vectors(&self) -> Result<Vec<JobPosting>, StoreError> {
        Ok(sqlx::query_as::<_, JobPosting>(
            r#"
            SELECT id, title, description, vector, owner_id, created_at
            FROM job_postings
            WHERE vector IS NOT NULL AND cardinality(vector) > 0
            ORDER BY created_at, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<CandidateProfile>, StoreError> {
        Ok(sqlx::query_as::<_, CandidateProfile>(
            r#"
            SELECT user_id, email, full_name, headline, resume_text, vector, updated_at
            FROM user_profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn upsert_job_posting(&self, job: &JobPosting) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO job_postings (id, title, description, vector, owner_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                vector = EXCLUDED.vector,
                owner_id = EXCLUDED.owner_id
            "#,
        )
        .bind(&job.id)
        .bind(&job.title)
        .bind(&job.description)
        .bind(&job.embedding)
        .bind(&job.owner_id)
        .bind(job.created_at)
        .execute(&self.pool)
        .await?;

        info!("Upserted job posting {} ({} dims)", job.id, job.embedding.len());
        Ok(())
    }

    async fn upsert_profile(
        &self,
        profile: &CandidateProfile,
    ) -> Result<CandidateProfile, StoreError> {
        let saved = sqlx::query_as::<_, CandidateProfile>(
            r#"
            INSERT INTO user_profiles
                (user_id, email, full_name, headline, resume_text, vector, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id) DO UPDATE SET
                email = COALESCE(EXCLUDED.email, user_profiles.email),
                full_name = COALESCE(EXCLUDED.full_name, user_profiles.full_name),
                headline = COALESCE(EXCLUDED.headline, user_profiles.headline),
                resume_text = COALESCE(EXCLUDED.resume_text, user_profiles.resume_text),
                vector = COALESCE(EXCLUDED.vector, user_profiles.vector),
                updated_at = EXCLUDED.updated_at
            RETURNING user_id, email, full_name, headline, resume_text, vector, updated_at
            "#,
        )
        .bind(&profile.user_id)
        .bind(&profile.email)
        .bind(&profile.full_name)
        .bind(&profile.headline)
        .bind(&profile.resume_text)
        .bind(&profile.embedding)
        .bind(profile.updated_at)
        .fetch_one(&self.pool)
        .await?;

        info!("Upserted profile for user {}", profile.user_id);
        Ok(saved)
    }
}
