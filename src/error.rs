use std::collections::BTreeMap;
use std::fmt;
use std::io;

use thiserror::Error;

/// Severity of a remote API failure.
///
/// `Warning` covers 4xx responses the user can correct (bad input, missing
/// permission); `Error` covers everything environmental (5xx, timeouts,
/// connectivity).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    Warning,
    Error,
}

/// Validation messages keyed by the wire name of the failing field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    fields: BTreeMap<String, String>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.fields.insert(field.into(), message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (field, message) in &self.fields {
            write!(f, "\n  {field}: {message}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("authentication required: {0}")]
    Authentication(String),
    #[error("validation failed:{0}")]
    Validation(FieldErrors),
    #[error("{message}")]
    Api { kind: ApiErrorKind, message: String },
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl AppError {
    pub fn warning(message: impl Into<String>) -> Self {
        AppError::Api {
            kind: ApiErrorKind::Warning,
            message: message.into(),
        }
    }

    pub fn remote(message: impl Into<String>) -> Self {
        AppError::Api {
            kind: ApiErrorKind::Error,
            message: message.into(),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_errors_render_one_line_per_field() {
        let mut errors = FieldErrors::new();
        errors.insert("subject", "too short");
        errors.insert("project_id", "missing");
        let rendered = AppError::Validation(errors).to_string();
        assert_eq!(
            rendered,
            "validation failed:\n  project_id: missing\n  subject: too short"
        );
    }

    #[test]
    fn field_errors_report_emptiness() {
        let mut errors = FieldErrors::new();
        assert!(errors.is_empty());
        errors.insert("description", "too short");
        assert!(!errors.is_empty());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("description"), Some("too short"));
        assert_eq!(errors.get("subject"), None);
    }
}
