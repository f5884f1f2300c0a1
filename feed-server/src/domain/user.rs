use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::ValidateEmail;

use super::error::{DomainError, FieldViolation};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SignupRequest {
    pub(crate) email: String,
    pub(crate) name: String,
    pub(crate) password: String,
}

impl SignupRequest {
    pub(crate) fn validate(self) -> Result<Self, DomainError> {
        let mut violations = Vec::new();

        let email = self.email.trim().to_lowercase();
        if !email.validate_email() {
            violations.push(FieldViolation {
                field: "email",
                message: "must be a valid email",
            });
        }

        let name = self.name.trim().to_string();
        if name.is_empty() || name.chars().count() > 64 {
            violations.push(FieldViolation {
                field: "name",
                message: "must be 1..64 chars",
            });
        }

        let password_len = self.password.chars().count();
        if password_len < 5 || password_len > 128 {
            violations.push(FieldViolation {
                field: "password",
                message: "must be 5..128 chars",
            });
        }

        if !violations.is_empty() {
            return Err(DomainError::Validation(violations));
        }
        Ok(Self {
            email,
            name,
            password: self.password,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct LoginRequest {
    pub(crate) email: String,
    pub(crate) password: String,
}

impl LoginRequest {
    pub(crate) fn validate(self) -> Result<Self, DomainError> {
        let email = self.email.trim().to_lowercase();
        if email.is_empty() {
            return Err(DomainError::violation("email", "must not be empty"));
        }
        if self.password.is_empty() {
            return Err(DomainError::violation("password", "must not be empty"));
        }
        Ok(Self {
            email,
            password: self.password,
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct User {
    pub(crate) id: i64,
    pub(crate) email: String,
    pub(crate) name: String,
    pub(crate) post_ids: Vec<i64>,
    pub(crate) created_at: DateTime<Utc>,
}

/// Minimal projection of a post's owner, returned alongside a created post
/// and embedded in the matching feed event.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreatorRef {
    pub(crate) id: i64,
    pub(crate) name: String,
}

impl User {
    pub(crate) fn new(
        id: i64,
        email: impl Into<String>,
        name: impl Into<String>,
        post_ids: Vec<i64>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if id <= 0 {
            return Err(DomainError::violation("id", "must be > 0"));
        }
        let email = email.into().trim().to_lowercase();
        if !email.validate_email() {
            return Err(DomainError::violation("email", "must be a valid email"));
        }
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(DomainError::violation("name", "must not be empty"));
        }

        Ok(Self {
            id,
            email,
            name,
            post_ids,
            created_at,
        })
    }

    pub(crate) fn creator_ref(&self) -> CreatorRef {
        CreatorRef {
            id: self.id,
            name: self.name.clone(),
        }
    }
}
