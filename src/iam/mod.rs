//! Policy-based access decisions
//!
//! Provides:
//! - Template matching with regex segments between configurable delimiters
//! - Pluggable, conjunctive conditions over request context
//! - Deny-overrides combination with implicit deny
//! - LRU caching of compiled templates

mod cache;
mod condition;
mod decision;
mod engine;
mod pattern;
mod policy;
mod repository;
mod request;

pub use cache::PatternCache;
pub use condition::{Condition, ConditionFactory, ConditionRegistry, ConditionSpec, Conditions};
pub use decision::{Decision, Denial, Verdict};
pub use engine::DecisionEngine;
pub use pattern::{compile, PatternMatcher};
pub use policy::{load_policies, DefaultPolicy, Delimiters, Effect, Policy, PolicyDocument};
pub use repository::{MemoryRepository, PolicyRepository};
pub use request::{Context, ContextValue, Request};
