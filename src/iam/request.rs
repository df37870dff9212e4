//! Access requests and their context attributes

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Context attribute value, mirroring the JSON value model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<ContextValue>),
    Object(BTreeMap<String, ContextValue>),
}

impl ContextValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ContextValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ContextValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ContextValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ContextValue]> {
        match self {
            ContextValue::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&BTreeMap<String, ContextValue>> {
        match self {
            ContextValue::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// An explicit `null`, as opposed to a missing key
    pub fn is_null(&self) -> bool {
        matches!(self, ContextValue::Null)
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        ContextValue::String(value.to_string())
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        ContextValue::String(value)
    }
}

impl From<f64> for ContextValue {
    fn from(value: f64) -> Self {
        ContextValue::Number(value)
    }
}

impl From<i64> for ContextValue {
    fn from(value: i64) -> Self {
        ContextValue::Number(value as f64)
    }
}

impl From<bool> for ContextValue {
    fn from(value: bool) -> Self {
        ContextValue::Bool(value)
    }
}

impl<T: Into<ContextValue>> From<Vec<T>> for ContextValue {
    fn from(values: Vec<T>) -> Self {
        ContextValue::Array(values.into_iter().map(Into::into).collect())
    }
}

/// Request context, keyed by attribute name
pub type Context = HashMap<String, ContextValue>;

/// An access request: who wants to do what on which resource, and in what context
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Requesting identity; several identities may be joined by a separator
    pub subject: String,

    /// Requested operation
    pub action: String,

    /// Target of the operation
    pub resource: String,

    /// Attributes consulted by policy conditions
    #[serde(default)]
    pub context: Context,
}

impl Request {
    /// Create a request with an empty context
    pub fn new(
        subject: impl Into<String>,
        action: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        Request {
            subject: subject.into(),
            action: action.into(),
            resource: resource.into(),
            context: Context::new(),
        }
    }

    /// Add a context attribute
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Look up a context attribute
    pub fn context_value(&self, key: &str) -> Option<&ContextValue> {
        self.context.get(key)
    }

    /// Identities encoded in the subject, split on `separator`
    ///
    /// Always yields at least one (possibly empty) identity.
    pub fn subjects(&self, separator: char) -> impl Iterator<Item = &str> {
        self.subject.split(separator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_split() {
        let request = Request::new("alice,bob", "read", "articles:1");
        let subjects: Vec<&str> = request.subjects(',').collect();
        assert_eq!(subjects, vec!["alice", "bob"]);

        let request = Request::new("alice", "read", "articles:1");
        assert_eq!(request.subjects(',').count(), 1);

        let request = Request::new("", "read", "articles:1");
        let subjects: Vec<&str> = request.subjects(',').collect();
        assert_eq!(subjects, vec![""]);

        let request = Request::new("alice|bob", "read", "articles:1");
        assert_eq!(request.subjects('|').count(), 2);
        assert_eq!(request.subjects(',').count(), 1);
    }

    #[test]
    fn test_context_builder() {
        let request = Request::new("alice", "read", "articles:1")
            .with_context("owner", "alice")
            .with_context("age", 42_i64)
            .with_context("mfa", true);

        assert_eq!(request.context_value("owner").and_then(ContextValue::as_str), Some("alice"));
        assert_eq!(request.context_value("age").and_then(ContextValue::as_number), Some(42.0));
        assert_eq!(request.context_value("mfa").and_then(ContextValue::as_bool), Some(true));
        assert!(request.context_value("missing").is_none());
    }

    #[test]
    fn test_request_from_json() {
        let request: Request = serde_json::from_str(
            r#"{
                "subject": "users:alice",
                "action": "read",
                "resource": "articles:1",
                "context": { "owner": "alice", "level": 3, "mfa": false }
            }"#,
        )
        .unwrap();

        assert_eq!(request.subject, "users:alice");
        assert_eq!(request.context["owner"], ContextValue::from("alice"));
        assert_eq!(request.context["level"], ContextValue::Number(3.0));
        assert_eq!(request.context["mfa"], ContextValue::Bool(false));

        // Context is optional
        let request: Request =
            serde_json::from_str(r#"{"subject":"a","action":"b","resource":"c"}"#).unwrap();
        assert!(request.context.is_empty());
    }

    #[test]
    fn test_structured_context() {
        let json = r#"{
            "subject": "users:alice",
            "action": "read",
            "resource": "articles:1",
            "context": {
                "groups": ["admins", "ops"],
                "owner": null,
                "origin": { "ip": "10.0.0.1", "port": 443 }
            }
        }"#;
        let request: Request = serde_json::from_str(json).unwrap();

        let groups = request.context["groups"].as_array().unwrap();
        assert_eq!(groups, [ContextValue::from("admins"), ContextValue::from("ops")]);

        // Present but null is not the same as absent
        assert!(request.context_value("owner").unwrap().is_null());
        assert!(request.context_value("missing").is_none());

        let origin = request.context["origin"].as_object().unwrap();
        assert_eq!(origin["ip"].as_str(), Some("10.0.0.1"));
        assert_eq!(origin["port"].as_number(), Some(443.0));

        let reparsed: Request =
            serde_json::from_str(&serde_json::to_string(&request).unwrap()).unwrap();
        assert_eq!(reparsed, request);
    }

    #[test]
    fn test_list_context_builder() {
        let request = Request::new("alice", "read", "articles:1")
            .with_context("groups", vec!["admins", "ops"]);

        let value = serde_json::to_value(&request.context["groups"]).unwrap();
        assert_eq!(value, serde_json::json!(["admins", "ops"]));
        assert!(request.context["groups"].as_str().is_none());
    }
}
