//! # Warden - Policy Decision Point
//!
//! `warden` decides whether a request `{subject, action, resource, context}`
//! is authorized by a set of access-control policies.
//!
//! ## Features
//!
//! - **Templates**: literal strings with regex segments between delimiters
//!   (`users:<.*>`), always matched against the whole candidate
//! - **Multiple identities**: a subject such as `alice,bob` matches a policy
//!   if any identity does
//! - **Conditions**: named, pluggable predicates over request context,
//!   all of which must hold
//! - **Deny overrides**: any applicable deny wins; no applicable allow is an
//!   implicit deny
//! - **Fail closed**: malformed templates and repository failures are
//!   reported as errors, distinct from denials
//!
//! ## Quick Start
//!
//! ```rust
//! use warden::iam::{DecisionEngine, DefaultPolicy, MemoryRepository, Request};
//!
//! let repository = MemoryRepository::new();
//! repository.insert(
//!     DefaultPolicy::allow("readers")
//!         .with_subjects(["users:<.*>"])
//!         .with_actions(["read"])
//!         .with_resources(["articles:<[0-9]+>"]),
//! );
//! repository.insert(
//!     DefaultPolicy::deny("banned")
//!         .with_subjects(["users:mallory"])
//!         .with_actions(["<.*>"])
//!         .with_resources(["<.*>"]),
//! );
//!
//! let engine = DecisionEngine::new(repository);
//!
//! assert!(engine.is_allowed(&Request::new("users:alice", "read", "articles:1")).is_ok());
//!
//! let err = engine
//!     .is_allowed(&Request::new("users:mallory", "read", "articles:1"))
//!     .unwrap_err();
//! assert!(err.is_forbidden());
//! ```

pub mod config;
pub mod error;
pub mod iam;

pub use config::EngineConfig;
pub use error::{
    AuthzError, ConfigError, EvaluationError, PatternError, PolicyError, RepositoryError,
    TemplateField,
};
pub use iam::{
    Condition, ConditionRegistry, Decision, DecisionEngine, DefaultPolicy, Effect, Policy,
    PolicyRepository, Request,
};
