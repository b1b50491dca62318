use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user's saved profile: résumé text plus its embedding.
///
/// Optional fields left as `None` on upsert keep whatever the store already holds.
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct CandidateProfile {
    pub user_id: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub headline: Option<String>,
    pub resume_text: Option<String>,
    #[sqlx(rename = "vector")]
    #[serde(skip_serializing)]
    pub embedding: Option<Vec<f32>>,
    pub updated_at: DateTime<Utc>,
}

impl CandidateProfile {
    /// Résumé text if the profile has a non-blank one.
    pub fn resume(&self) -> Option<&str> {
        self.resume_text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }

    /// Applies `update` on top of `self`: every `Some` in `update` wins, `None` keeps the
    /// old value.
    pub fn merged_with(&self, update: &CandidateProfile) -> CandidateProfile {
        CandidateProfile {
            user_id: self.user_id.clone(),
            email: update.email.clone().or_else(|| self.email.clone()),
            full_name: update.full_name.clone().or_else(|| self.full_name.clone()),
            headline: update.headline.clone().or_else(|| self.headline.clone()),
            resume_text: update.resume_text.clone().or_else(|| self.resume_text.clone()),
            embedding: update.embedding.clone().or_else(|| self.embedding.clone()),
            updated_at: update.updated_at,
        }
    }
}

/// Request body for saving a profile.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileUpdateRequest {
    pub resume_text: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub headline: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(user_id: &str) -> CandidateProfile {
        CandidateProfile {
            user_id: user_id.to_string(),
            email: Some("a@example.com".to_string()),
            full_name: Some("Ada".to_string()),
            headline: None,
            resume_text: Some("old résumé".to_string()),
            embedding: Some(vec![1.0, 0.0]),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_merge_keeps_existing_values_for_none() {
        let existing = profile("u1");
        let update = CandidateProfile {
            user_id: "u1".to_string(),
            email: None,
            full_name: None,
            headline: Some("Backend engineer".to_string()),
            resume_text: Some("new résumé".to_string()),
            embedding: Some(vec![0.0, 1.0]),
            updated_at: Utc::now(),
        };

        let merged = existing.merged_with(&update);
        assert_eq!(merged.email.as_deref(), Some("a@example.com"));
        assert_eq!(merged.full_name.as_deref(), Some("Ada"));
        assert_eq!(merged.headline.as_deref(), Some("Backend engineer"));
        assert_eq!(merged.resume_text.as_deref(), Some("new résumé"));
        assert_eq!(merged.embedding, Some(vec![0.0, 1.0]));
    }

    #[test]
    fn test_blank_resume_counts_as_missing() {
        let mut p = profile("u1");
        p.resume_text = Some("   \n".to_string());
        assert!(p.resume().is_none());
    }

    #[test]
    fn test_embedding_is_not_serialized() {
        let json = serde_json::to_value(profile("u1")).unwrap();
        assert!(json.get("embedding").is_none());
        assert_eq!(json["user_id"], "u1");
    }
}
