//! Error types for policy evaluation

use std::fmt;
use thiserror::Error;

/// Which template list of a policy a pattern came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateField {
    Subject,
    Action,
    Resource,
}

impl fmt::Display for TemplateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateField::Subject => f.write_str("subject"),
            TemplateField::Action => f.write_str("action"),
            TemplateField::Resource => f.write_str("resource"),
        }
    }
}

/// Template compilation errors
#[derive(Error, Debug)]
pub enum PatternError {
    /// Start and end delimiters do not pair up
    #[error("Unbalanced delimiters '{start}' '{end}' in template {template:?}")]
    Unbalanced {
        template: String,
        start: char,
        end: char,
    },

    /// A bound segment (or the assembled pattern) is not a valid regex
    #[error("Invalid expression in template {template:?}: {source}")]
    InvalidExpression {
        template: String,
        #[source]
        source: regex::Error,
    },
}

impl PatternError {
    /// The template that failed to compile
    pub fn template(&self) -> &str {
        match self {
            PatternError::Unbalanced { template, .. } => template,
            PatternError::InvalidExpression { template, .. } => template,
        }
    }
}

/// Failures reported by a policy repository
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Backend could not be reached
    #[error("Policy repository unavailable: {0}")]
    Unavailable(String),

    /// Any other backend failure
    #[error("Policy repository error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// A decision could not be computed
#[derive(Error, Debug)]
pub enum EvaluationError {
    /// A template of a candidate policy failed to compile
    #[error("Policy {policy_id}: cannot compile {field} template: {source}")]
    Pattern {
        policy_id: String,
        field: TemplateField,
        #[source]
        source: PatternError,
    },

    /// Candidate policies could not be retrieved
    #[error("Cannot retrieve policies for subject {subject:?}: {source}")]
    Repository {
        subject: String,
        #[source]
        source: RepositoryError,
    },
}

/// Outcome of [`DecisionEngine::is_allowed`](crate::iam::DecisionEngine::is_allowed)
/// when access is not granted
#[derive(Error, Debug)]
pub enum AuthzError {
    /// Explicit or implicit deny
    #[error("Request forbidden")]
    Forbidden,

    /// The request could not be evaluated
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
}

impl AuthzError {
    pub fn is_forbidden(&self) -> bool {
        matches!(self, AuthzError::Forbidden)
    }

    pub fn is_evaluation_error(&self) -> bool {
        matches!(self, AuthzError::Evaluation(_))
    }
}

/// Errors raised while loading or building policies
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Unknown condition type: {0}")]
    UnknownCondition(String),

    #[error("Invalid options for condition {name}: {reason}")]
    InvalidConditionOptions { name: String, reason: String },

    #[error("Policy {policy_id}: start and end delimiter must differ (both '{delimiter}')")]
    InvalidDelimiters { policy_id: String, delimiter: char },

    #[error("Policy validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while loading engine configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Start and end delimiter must differ (both '{0}')")]
    InvalidDelimiters(char),
}

pub type Result<T> = std::result::Result<T, EvaluationError>;
