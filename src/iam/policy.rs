//! Policy model and JSON policy documents
//!
//! A policy binds subject/action/resource templates and optional conditions
//! to an effect. [`Policy`] is the read-only view the engine consumes,
//! [`DefaultPolicy`] the in-memory implementation, and [`PolicyDocument`]
//! its serialized form.

use super::condition::{Condition, ConditionRegistry, ConditionSpec, Conditions};
use crate::error::PolicyError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use validator::Validate;

/// Effect of a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effect {
    /// Allow the request
    Allow,
    /// Deny the request (takes precedence over Allow)
    Deny,
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Allow => f.write_str("allow"),
            Effect::Deny => f.write_str("deny"),
        }
    }
}

/// Delimiters enclosing bound segments in templates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Delimiters {
    pub start: char,
    pub end: char,
}

impl Delimiters {
    pub const fn new(start: char, end: char) -> Self {
        Delimiters { start, end }
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Delimiters::new('<', '>')
    }
}

/// Read-only view of a policy, as consumed by the decision engine
pub trait Policy: Send + Sync + fmt::Debug {
    fn id(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    fn effect(&self) -> Effect;

    fn subjects(&self) -> &[String];

    fn actions(&self) -> &[String];

    fn resources(&self) -> &[String];

    fn conditions(&self) -> &Conditions;

    fn start_delimiter(&self) -> char;

    fn end_delimiter(&self) -> char;

    fn allows_access(&self) -> bool {
        self.effect() == Effect::Allow
    }
}

/// In-memory policy
#[derive(Debug, Clone)]
pub struct DefaultPolicy {
    id: String,
    description: String,
    effect: Effect,
    subjects: Vec<String>,
    actions: Vec<String>,
    resources: Vec<String>,
    conditions: Conditions,
    delimiters: Delimiters,
}

impl DefaultPolicy {
    /// Create a policy with no templates, no conditions and `<` `>` delimiters
    pub fn new(id: impl Into<String>, effect: Effect) -> Self {
        DefaultPolicy {
            id: id.into(),
            description: String::new(),
            effect,
            subjects: Vec::new(),
            actions: Vec::new(),
            resources: Vec::new(),
            conditions: Conditions::new(),
            delimiters: Delimiters::default(),
        }
    }

    pub fn allow(id: impl Into<String>) -> Self {
        Self::new(id, Effect::Allow)
    }

    pub fn deny(id: impl Into<String>) -> Self {
        Self::new(id, Effect::Deny)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_subjects<I, S>(mut self, subjects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subjects = subjects.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions = actions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_resources<I, S>(mut self, resources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resources = resources.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_condition(
        mut self,
        key: impl Into<String>,
        condition: Arc<dyn Condition>,
    ) -> Self {
        self.conditions.insert(key, condition);
        self
    }

    /// Set the bound-segment delimiters; they must differ
    pub fn with_delimiters(mut self, start: char, end: char) -> Result<Self, PolicyError> {
        if start == end {
            return Err(PolicyError::InvalidDelimiters {
                policy_id: self.id,
                delimiter: start,
            });
        }
        self.delimiters = Delimiters::new(start, end);
        Ok(self)
    }

    pub fn delimiters(&self) -> Delimiters {
        self.delimiters
    }

    /// Serialize back into a document
    pub fn to_document(&self) -> PolicyDocument {
        PolicyDocument {
            id: self.id.clone(),
            description: self.description.clone(),
            effect: self.effect,
            subjects: self.subjects.clone(),
            actions: self.actions.clone(),
            resources: self.resources.clone(),
            conditions: self
                .conditions
                .iter()
                .map(|(key, condition)| (key.to_string(), ConditionSpec::of(condition.as_ref())))
                .collect(),
            start_delimiter: Some(self.delimiters.start),
            end_delimiter: Some(self.delimiters.end),
        }
    }
}

impl Policy for DefaultPolicy {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn effect(&self) -> Effect {
        self.effect
    }

    fn subjects(&self) -> &[String] {
        &self.subjects
    }

    fn actions(&self) -> &[String] {
        &self.actions
    }

    fn resources(&self) -> &[String] {
        &self.resources
    }

    fn conditions(&self) -> &Conditions {
        &self.conditions
    }

    fn start_delimiter(&self) -> char {
        self.delimiters.start
    }

    fn end_delimiter(&self) -> char {
        self.delimiters.end
    }
}

/// Serialized policy
///
/// ```json
/// {
///   "id": "articles-read",
///   "effect": "allow",
///   "subjects": ["users:<.*>"],
///   "actions": ["read"],
///   "resources": ["articles:<[0-9]+>"],
///   "conditions": { "owner": { "type": "EqualsSubject" } }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDocument {
    #[validate(length(min = 1))]
    pub id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    pub effect: Effect,

    #[serde(default)]
    pub subjects: Vec<String>,

    #[serde(default)]
    pub actions: Vec<String>,

    #[serde(default)]
    pub resources: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub conditions: BTreeMap<String, ConditionSpec>,

    /// Falls back to the configured default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_delimiter: Option<char>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_delimiter: Option<char>,
}

impl PolicyDocument {
    /// Parse a single document from JSON
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse either a JSON array of documents or a single document
    pub fn list_from_json(json: &str) -> Result<Vec<Self>, PolicyError> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            Many(Vec<PolicyDocument>),
            One(Box<PolicyDocument>),
        }

        let parsed: OneOrMany = serde_json::from_str(json)?;
        Ok(match parsed {
            OneOrMany::Many(documents) => documents,
            OneOrMany::One(document) => vec![*document],
        })
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String, PolicyError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate and build a policy, resolving conditions through `registry`
    pub fn build(
        &self,
        registry: &ConditionRegistry,
        defaults: Delimiters,
    ) -> Result<DefaultPolicy, PolicyError> {
        self.validate()?;

        let delimiters = Delimiters::new(
            self.start_delimiter.unwrap_or(defaults.start),
            self.end_delimiter.unwrap_or(defaults.end),
        );
        if delimiters.start == delimiters.end {
            return Err(PolicyError::InvalidDelimiters {
                policy_id: self.id.clone(),
                delimiter: delimiters.start,
            });
        }

        let mut conditions = Conditions::new();
        for (key, spec) in &self.conditions {
            conditions.insert(key.clone(), registry.build(spec)?);
        }

        Ok(DefaultPolicy {
            id: self.id.clone(),
            description: self.description.clone(),
            effect: self.effect,
            subjects: self.subjects.clone(),
            actions: self.actions.clone(),
            resources: self.resources.clone(),
            conditions,
            delimiters,
        })
    }
}

/// Parse and build every policy in a JSON array (or single object)
pub fn load_policies(
    json: &str,
    registry: &ConditionRegistry,
    defaults: Delimiters,
) -> Result<Vec<DefaultPolicy>, PolicyError> {
    PolicyDocument::list_from_json(json)?
        .iter()
        .map(|document| document.build(registry, defaults))
        .collect()
}
