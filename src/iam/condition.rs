//! Pluggable conditions for policies
//!
//! A condition is a named predicate over one context attribute:
//! - [`Condition`] is the capability every predicate implements
//! - [`Conditions`] holds a policy's predicates keyed by context attribute
//!   and evaluates them conjunctively
//! - [`ConditionRegistry`] builds predicates from serialized specs
//!
//! No predicate ships with the crate; applications register their own.

use super::request::{ContextValue, Request};
use crate::error::PolicyError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// A predicate over one context attribute
pub trait Condition: Send + Sync + fmt::Debug {
    /// Name the condition is registered under
    fn name(&self) -> &str;

    /// Decide whether `value` satisfies this condition
    ///
    /// `value` is `None` when the request context lacks the attribute. Unless
    /// an implementation documents otherwise, a missing value should not
    /// fulfill the condition.
    fn fulfills(&self, value: Option<&ContextValue>, request: &Request) -> bool;

    /// Options needed to rebuild this condition through a registry
    fn options(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}

/// Conditions attached to a policy, keyed by context attribute
///
/// Keys iterate in sorted order so evaluation order is stable.
#[derive(Debug, Clone, Default)]
pub struct Conditions {
    entries: BTreeMap<String, Arc<dyn Condition>>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `condition` to context attribute `key`, replacing any previous one
    pub fn insert(&mut self, key: impl Into<String>, condition: Arc<dyn Condition>) {
        self.entries.insert(key.into(), condition);
    }

    pub fn get(&self, key: &str) -> Option<&Arc<dyn Condition>> {
        self.entries.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Condition>)> {
        self.entries.iter().map(|(key, condition)| (key.as_str(), condition))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Key of the first condition the request does not fulfill
    pub fn first_unfulfilled(&self, request: &Request) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, condition)| !condition.fulfills(request.context.get(key.as_str()), request))
            .map(|(key, _)| key.as_str())
    }

    /// Check that every condition is fulfilled (true when there are none)
    pub fn evaluate(&self, request: &Request) -> bool {
        self.first_unfulfilled(request).is_none()
    }
}

/// Serialized form of a condition: registry name plus options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSpec {
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub options: serde_json::Value,
}

impl ConditionSpec {
    pub fn new(kind: impl Into<String>, options: serde_json::Value) -> Self {
        ConditionSpec {
            kind: kind.into(),
            options,
        }
    }

    /// Describe an existing condition
    pub fn of(condition: &dyn Condition) -> Self {
        ConditionSpec::new(condition.name(), condition.options())
    }
}

/// Builds a condition from its options
pub type ConditionFactory =
    Arc<dyn Fn(&serde_json::Value) -> Result<Arc<dyn Condition>, PolicyError> + Send + Sync>;

/// Named condition factories
#[derive(Clone, Default)]
pub struct ConditionRegistry {
    factories: HashMap<String, ConditionFactory>,
}

impl ConditionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `name`, replacing any previous one
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use warden::iam::{Condition, ConditionRegistry, ConditionSpec, ContextValue, Request};
    ///
    /// #[derive(Debug)]
    /// struct IsTrue;
    ///
    /// impl Condition for IsTrue {
    ///     fn name(&self) -> &str {
    ///         "IsTrue"
    ///     }
    ///
    ///     fn fulfills(&self, value: Option<&ContextValue>, _request: &Request) -> bool {
    ///         value.and_then(ContextValue::as_bool).unwrap_or(false)
    ///     }
    /// }
    ///
    /// let mut registry = ConditionRegistry::new();
    /// registry.register("IsTrue", |_| Ok(Arc::new(IsTrue)));
    ///
    /// let condition = registry.build(&ConditionSpec::new("IsTrue", serde_json::Value::Null)).unwrap();
    /// let request = Request::new("alice", "read", "articles:1").with_context("mfa", true);
    /// assert!(condition.fulfills(request.context_value("mfa"), &request));
    /// ```
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&serde_json::Value) -> Result<Arc<dyn Condition>, PolicyError> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build a condition from its serialized form
    pub fn build(&self, spec: &ConditionSpec) -> Result<Arc<dyn Condition>, PolicyError> {
        let factory = self
            .factories
            .get(&spec.kind)
            .ok_or_else(|| PolicyError::UnknownCondition(spec.kind.clone()))?;
        factory(&spec.options)
    }
}

impl fmt::Debug for ConditionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionRegistry")
            .field("factories", &self.names())
            .finish()
    }
}
