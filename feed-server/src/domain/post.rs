use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::{DomainError, FieldViolation};

const MIN_TEXT_CHARS: usize = 5;
const MAX_TITLE_CHARS: usize = 255;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct Post {
    pub(crate) id: i64,
    pub(crate) title: String,
    pub(crate) content: String,
    pub(crate) image_url: String,
    pub(crate) creator_id: i64,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CreatePostRequest {
    pub(crate) title: String,
    pub(crate) content: String,
    pub(crate) image_url: String,
}

impl CreatePostRequest {
    pub(crate) fn validate(self) -> Result<Self, DomainError> {
        let mut violations = Vec::new();
        let title = normalize_title(&self.title, &mut violations);
        let content = normalize_content(&self.content, &mut violations);
        let image_url = normalize_image_url(&self.image_url, &mut violations);
        if !violations.is_empty() {
            return Err(DomainError::Validation(violations));
        }
        Ok(Self {
            title,
            content,
            image_url,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct UpdatePostRequest {
    pub(crate) title: String,
    pub(crate) content: String,
    pub(crate) image_url: String,
}

impl UpdatePostRequest {
    pub(crate) fn validate(self) -> Result<Self, DomainError> {
        let mut violations = Vec::new();
        let title = normalize_title(&self.title, &mut violations);
        let content = normalize_content(&self.content, &mut violations);
        let image_url = normalize_image_url(&self.image_url, &mut violations);
        if !violations.is_empty() {
            return Err(DomainError::Validation(violations));
        }
        Ok(Self {
            title,
            content,
            image_url,
        })
    }
}

impl Post {
    pub(crate) fn new(
        id: i64,
        title: impl Into<String>,
        content: impl Into<String>,
        image_url: impl Into<String>,
        creator_id: i64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if id <= 0 {
            return Err(DomainError::violation("id", "must be > 0"));
        }
        if creator_id <= 0 {
            return Err(DomainError::violation("creator_id", "must be > 0"));
        }
        if updated_at < created_at {
            return Err(DomainError::violation("updated_at", "must be >= created_at"));
        }

        let mut violations = Vec::new();
        let title = normalize_title(&title.into(), &mut violations);
        let content = normalize_content(&content.into(), &mut violations);
        let image_url = normalize_image_url(&image_url.into(), &mut violations);
        if !violations.is_empty() {
            return Err(DomainError::Validation(violations));
        }

        Ok(Self {
            id,
            title,
            content,
            image_url,
            creator_id,
            created_at,
            updated_at,
        })
    }
}

fn normalize_title(title: &str, violations: &mut Vec<FieldViolation>) -> String {
    let title = title.trim();
    if title.chars().count() < MIN_TEXT_CHARS {
        violations.push(FieldViolation {
            field: "title",
            message: "must be at least 5 chars",
        });
    } else if title.chars().count() > MAX_TITLE_CHARS {
        violations.push(FieldViolation {
            field: "title",
            message: "must be at most 255 chars",
        });
    }
    title.to_string()
}

fn normalize_content(content: &str, violations: &mut Vec<FieldViolation>) -> String {
    let content = content.trim();
    if content.chars().count() < MIN_TEXT_CHARS {
        violations.push(FieldViolation {
            field: "content",
            message: "must be at least 5 chars",
        });
    }
    content.to_string()
}

fn normalize_image_url(image_url: &str, violations: &mut Vec<FieldViolation>) -> String {
    let image_url = image_url.trim();
    if image_url.is_empty() {
        violations.push(FieldViolation {
            field: "image_url",
            message: "image reference is required",
        });
    }
    image_url.to_string()
}
