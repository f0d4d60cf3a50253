use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self { field: field.into(), code: code.into(), message: message.into() }
    }
}

/// Every violated invariant of a record, collected in one pass so callers can
/// re-prompt for all of them at once.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    pub violations: Vec<FieldViolation>,
}

impl ValidationErrors {
    pub fn push(&mut self, violation: FieldViolation) {
        self.violations.push(violation);
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.violations.iter().any(|violation| violation.field == field)
    }

    pub fn fields(&self) -> Vec<&str> {
        self.violations.iter().map(|violation| violation.field.as_str()).collect()
    }

    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self
            .violations
            .iter()
            .map(|violation| format!("{}: {}", violation.field, violation.message))
            .collect::<Vec<_>>()
            .join("; ");
        write!(f, "{rendered}")
    }
}

impl std::error::Error for ValidationErrors {}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),
    #[error("unknown {kind} code `{code}`")]
    UnknownCode { kind: &'static str, code: i64 },
    #[error("invalid email address `{0}`")]
    InvalidEmail(String),
    #[error("{field} exceeds the supported amount range")]
    AmountOverflow { field: &'static str },
}

impl From<ValidationErrors> for DomainError {
    fn from(value: ValidationErrors) -> Self {
        Self::Validation(value)
    }
}

/// Deployment or seeding defects. These abort the triggering operation and are
/// never retried.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error(
        "missing user with role `{role}` for tenant `{tenant}` -- did you run `procure migrate` and `procure seed`?"
    )]
    MissingRoleUser { role: String, tenant: String },
    #[error("field `{field}` of `{record_type}` is marked special but has no registered formatter")]
    MissingFormatter { record_type: &'static str, field: String },
    #[error("field `{field}` of `{record_type}` has more than one registered formatter")]
    DuplicateFormatter { record_type: &'static str, field: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error("{record_type} `{id}` was not found")]
    NotFound { record_type: &'static str, id: String },
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl From<ValidationErrors> for ApplicationError {
    fn from(value: ValidationErrors) -> Self {
        Self::Domain(DomainError::Validation(value))
    }
}

impl ApplicationError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }

    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            Self::Domain(DomainError::Validation(errors)) => Some(errors),
            _ => None,
        }
    }
}
