use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub(crate) struct FieldViolation {
    pub(crate) field: &'static str,
    pub(crate) message: &'static str,
}

#[derive(Debug, Error)]
pub(crate) enum DomainError {
    #[error("validation failed: {}", format_violations(.0))]
    Validation(Vec<FieldViolation>),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("resource already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid credentials")]
    Unauthenticated,

    #[error("forbidden")]
    Forbidden,

    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub(crate) fn violation(field: &'static str, message: &'static str) -> Self {
        DomainError::Validation(vec![FieldViolation { field, message }])
    }
}

fn format_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("'{}' {}", v.field, v.message))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::{DomainError, FieldViolation};

    #[test]
    fn validation_display_lists_every_violation() {
        let err = DomainError::Validation(vec![
            FieldViolation {
                field: "title",
                message: "must be at least 5 chars",
            },
            FieldViolation {
                field: "content",
                message: "must be at least 5 chars",
            },
        ]);

        let rendered = err.to_string();
        assert!(rendered.contains("'title'"));
        assert!(rendered.contains("'content'"));
    }
}
