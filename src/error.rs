// src/error.rs
//! Error taxonomy.
//!
//! Only [`ScrapeError`] escapes a `scrape` call. Pattern, parameter and
//! transport failures are folded into a `Failed` response at the branch that
//! hit them; missing tags are not errors at all.

use thiserror::Error;

/// Hard failures. These abort the whole evaluation.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("invalid instruction: {0}")]
    InvalidInstruction(String),

    #[error("cannot cross from '{from}' to '{to}'")]
    SchemeSecurity { from: String, to: String },

    #[error(transparent)]
    Template(#[from] TemplateError),
}

impl ScrapeError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        ScrapeError::InvalidInstruction(msg.into())
    }
}

/// Bad regex syntax, or a replacement referencing a group the regex lacks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct PatternError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("substitutions can only be made on strings, numbers, booleans and maps, not {0}")]
    Unsupported(String),
}

/// Raised when the result of a substitution with unresolved tags is read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("template result unavailable, missing tags: {}", missing.join(", "))]
pub struct TemplateResultError {
    pub missing: Vec<String>,
}

/// Transport-level failure from the fetch collaborator. HTTP error statuses
/// are not reported through this type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct FetchError(pub String);
