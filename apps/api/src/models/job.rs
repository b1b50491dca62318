use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A stored job posting with its precomputed embedding.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct JobPosting {
    pub id: String,
    pub title: String,
    pub description: String,
    #[sqlx(rename = "vector")]
    #[serde(skip_serializing)]
    pub embedding: Vec<f32>,
    pub owner_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Client-facing view of a posting. Vectors never leave the service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobSummary {
    pub id: String,
    pub title: String,
    pub description: String,
    pub owner_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&JobPosting> for JobSummary {
    fn from(job: &JobPosting) -> Self {
        Self {
            id: job.id.clone(),
            title: job.title.clone(),
            description: job.description.clone(),
            owner_id: job.owner_id.clone(),
            created_at: job.created_at,
        }
    }
}

/// Request body for creating a posting. `id` is generated when absent.
#[derive(Debug, Clone, Deserialize)]
pub struct NewJobPosting {
    pub id: Option<String>,
    pub title: String,
    pub description: String,
    pub owner_id: Option<String>,
}
