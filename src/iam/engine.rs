//! Decision engine with deny precedence
//!
//! Answers whether a request is authorized by the policies a repository
//! returns for its subject. Key features:
//! - One repository lookup per decision, scanned in repository order
//! - Explicit deny takes precedence over allow and ends the scan
//! - No applicable allow means implicit deny
//! - Compile or retrieval failures are errors, never denials
//! - Compiled templates are cached across decisions

use super::decision::{Decision, Verdict};
use super::pattern::PatternMatcher;
use super::policy::Policy;
use super::repository::PolicyRepository;
use super::request::Request;
use crate::config::EngineConfig;
use crate::error::{AuthzError, EvaluationError, PatternError, Result, TemplateField};
use std::sync::Arc;
use tracing::{debug, warn};

/// Policy decision point
pub struct DecisionEngine<R> {
    repository: R,
    matcher: PatternMatcher,
    subject_separator: char,
}

impl<R: PolicyRepository> DecisionEngine<R> {
    /// Create an engine with default settings
    pub fn new(repository: R) -> Self {
        Self::with_config(repository, &EngineConfig::default())
    }

    /// Create an engine from configuration
    pub fn with_config(repository: R, config: &EngineConfig) -> Self {
        DecisionEngine {
            repository,
            matcher: PatternMatcher::new(config.pattern_cache_capacity),
            subject_separator: config.subject_separator,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Check whether a request is authorized
    ///
    /// Explicit and implicit denials both yield [`AuthzError::Forbidden`];
    /// [`AuthzError::Evaluation`] means no decision could be made.
    ///
    /// # Examples
    ///
    /// ```
    /// use warden::iam::{DecisionEngine, DefaultPolicy, MemoryRepository, Request};
    ///
    /// let repository = MemoryRepository::from_policies([DefaultPolicy::allow("readers")
    ///     .with_subjects(["users:<.*>"])
    ///     .with_actions(["read"])
    ///     .with_resources(["articles:1"])]);
    /// let engine = DecisionEngine::new(repository);
    ///
    /// assert!(engine.is_allowed(&Request::new("users:alice", "read", "articles:1")).is_ok());
    /// assert!(engine
    ///     .is_allowed(&Request::new("users:alice", "write", "articles:1"))
    ///     .unwrap_err()
    ///     .is_forbidden());
    /// ```
    pub fn is_allowed(&self, request: &Request) -> std::result::Result<(), AuthzError> {
        if self.decide(request)?.is_granted() {
            Ok(())
        } else {
            Err(AuthzError::Forbidden)
        }
    }

    /// Decide a request against the policies stored for its subject
    pub fn decide(&self, request: &Request) -> Result<Decision> {
        let policies = self
            .repository
            .find_policies_for_subject(&request.subject)
            .map_err(|source| {
                warn!(subject = %request.subject, error = %source, "Policy retrieval failed");
                EvaluationError::Repository {
                    subject: request.subject.clone(),
                    source,
                }
            })?;

        self.evaluate_policies(request, &policies)
    }

    /// Decide a request against an explicit snapshot of policies
    pub fn evaluate_policies(
        &self,
        request: &Request,
        policies: &[Arc<dyn Policy>],
    ) -> Result<Decision> {
        let mut verdict = Verdict::Unset;

        for policy in policies {
            if !self.applies(policy.as_ref(), request)? {
                continue;
            }

            verdict = verdict.combine(policy.effect(), policy.id());

            // Explicit deny - nothing after it can change the outcome
            if verdict.is_final() {
                break;
            }
        }

        let decision = verdict.into_decision();
        debug!(
            subject = %request.subject,
            action = %request.action,
            resource = %request.resource,
            candidates = policies.len(),
            ?decision,
            "Request evaluated"
        );
        Ok(decision)
    }

    /// Check action, subject, resource and conditions of one policy
    fn applies(&self, policy: &dyn Policy, request: &Request) -> Result<bool> {
        if !self.match_field(policy, TemplateField::Action, &request.action)? {
            debug!(policy = policy.id(), "Skipped: action does not match");
            return Ok(false);
        }

        let mut subject_matches = false;
        for subject in request.subjects(self.subject_separator) {
            if self.match_field(policy, TemplateField::Subject, subject)? {
                subject_matches = true;
                break;
            }
        }
        if !subject_matches {
            debug!(policy = policy.id(), "Skipped: subject does not match");
            return Ok(false);
        }

        if !self.match_field(policy, TemplateField::Resource, &request.resource)? {
            debug!(policy = policy.id(), "Skipped: resource does not match");
            return Ok(false);
        }

        if let Some(key) = policy.conditions().first_unfulfilled(request) {
            debug!(policy = policy.id(), condition = key, "Skipped: condition not fulfilled");
            return Ok(false);
        }

        Ok(true)
    }

    fn match_field(&self, policy: &dyn Policy, field: TemplateField, candidate: &str) -> Result<bool> {
        let templates = match field {
            TemplateField::Subject => policy.subjects(),
            TemplateField::Action => policy.actions(),
            TemplateField::Resource => policy.resources(),
        };

        self.matcher
            .match_any(
                templates,
                candidate,
                policy.start_delimiter(),
                policy.end_delimiter(),
            )
            .map_err(|source: PatternError| {
                warn!(
                    policy = policy.id(),
                    %field,
                    template = source.template(),
                    "Template compilation failed"
                );
                EvaluationError::Pattern {
                    policy_id: policy.id().to_string(),
                    field,
                    source,
                }
            })
    }

    /// Clear the compiled-template cache
    pub fn clear_cache(&self) {
        self.matcher.clear_cache();
    }

    /// Number of cached compiled templates
    pub fn cache_size(&self) -> usize {
        self.matcher.cache_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RepositoryError;
    use crate::iam::{Condition, ContextValue, DefaultPolicy, Denial, MemoryRepository};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Fixed(bool);

    impl Condition for Fixed {
        fn name(&self) -> &str {
            "Fixed"
        }

        fn fulfills(&self, _value: Option<&ContextValue>, _request: &Request) -> bool {
            self.0
        }
    }

    /// Always fails, counting lookups
    #[derive(Default)]
    struct Failing(AtomicUsize);

    impl PolicyRepository for Failing {
        fn find_policies_for_subject(
            &self,
            _subject: &str,
        ) -> std::result::Result<Vec<Arc<dyn Policy>>, RepositoryError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Err(RepositoryError::Unavailable("connection refused".to_string()))
        }
    }

    fn readers() -> DefaultPolicy {
        DefaultPolicy::allow("readers")
            .with_subjects(["users:<.*>"])
            .with_actions(["read"])
            .with_resources(["articles:1"])
    }

    fn engine(policies: Vec<DefaultPolicy>) -> DecisionEngine<MemoryRepository> {
        DecisionEngine::new(MemoryRepository::from_policies(policies))
    }

    #[test]
    fn test_simple_allow() {
        let engine = engine(vec![readers()]);

        let decision = engine
            .decide(&Request::new("users:alice", "read", "articles:1"))
            .unwrap();
        assert_eq!(
            decision,
            Decision::Granted {
                policy_id: "readers".to_string()
            }
        );
    }

    #[test]
    fn test_deny_precedence() {
        let engine = engine(vec![
            readers(),
            DefaultPolicy::deny("block-alice")
                .with_subjects(["users:alice"])
                .with_actions(["read"])
                .with_resources(["articles:1"]),
        ]);

        let decision = engine
            .decide(&Request::new("users:alice", "read", "articles:1"))
            .unwrap();
        assert_eq!(
            decision,
            Decision::Denied(Denial::Explicit {
                policy_id: "block-alice".to_string()
            })
        );

        // Bob is only matched by the allow
        assert!(engine
            .decide(&Request::new("users:bob", "read", "articles:1"))
            .unwrap()
            .is_granted());
    }

    #[test]
    fn test_no_matching_policy() {
        let engine = engine(vec![readers()]);

        for request in [
            Request::new("users:bob", "write", "articles:1"),
            Request::new("groups:bob", "read", "articles:1"),
            Request::new("users:bob", "read", "articles:2"),
        ] {
            assert_eq!(
                engine.decide(&request).unwrap(),
                Decision::Denied(Denial::Implicit)
            );
        }
    }

    #[test]
    fn test_empty_repository() {
        let engine = engine(Vec::new());
        let err = engine
            .is_allowed(&Request::new("users:alice", "read", "articles:1"))
            .unwrap_err();
        assert!(err.is_forbidden());
    }

    #[test]
    fn test_subject_split() {
        let engine = engine(vec![DefaultPolicy::allow("bob-only")
            .with_subjects(["bob"])
            .with_actions(["read"])
            .with_resources(["articles:1"])]);

        assert!(engine
            .is_allowed(&Request::new("alice,bob", "read", "articles:1"))
            .is_ok());
        assert!(engine
            .is_allowed(&Request::new("alice", "read", "articles:1"))
            .is_err());
        // Separator is not part of the identity
        assert!(engine
            .is_allowed(&Request::new("alice|bob", "read", "articles:1"))
            .is_err());
    }

    #[test]
    fn test_custom_subject_separator() {
        let config = EngineConfig {
            subject_separator: '|',
            ..EngineConfig::default()
        };
        let engine = DecisionEngine::with_config(
            MemoryRepository::from_policies([DefaultPolicy::allow("bob-only")
                .with_subjects(["bob"])
                .with_actions(["read"])
                .with_resources(["articles:1"])]),
            &config,
        );

        assert!(engine
            .is_allowed(&Request::new("alice|bob", "read", "articles:1"))
            .is_ok());
        assert!(engine
            .is_allowed(&Request::new("alice,bob", "read", "articles:1"))
            .is_err());
    }

    #[test]
    fn test_conditions_gate_policy() {
        let engine = engine(vec![readers()
            .with_condition("a", Arc::new(Fixed(true)))
            .with_condition("b", Arc::new(Fixed(false)))]);

        assert_eq!(
            engine
                .decide(&Request::new("users:alice", "read", "articles:1"))
                .unwrap(),
            Decision::Denied(Denial::Implicit)
        );
    }

    #[test]
    fn test_unfulfilled_deny_does_not_override() {
        let engine = engine(vec![
            readers(),
            DefaultPolicy::deny("conditional-deny")
                .with_subjects(["users:<.*>"])
                .with_actions(["read"])
                .with_resources(["articles:1"])
                .with_condition("never", Arc::new(Fixed(false))),
        ]);

        assert!(engine
            .is_allowed(&Request::new("users:alice", "read", "articles:1"))
            .is_ok());
    }

    #[test]
    fn test_malformed_template_is_evaluation_error() {
        let engine = engine(vec![DefaultPolicy::allow("broken")
            .with_subjects(["users:<.*"])
            .with_actions(["read"])
            .with_resources(["articles:1"])]);

        let err = engine
            .decide(&Request::new("users:alice", "read", "articles:1"))
            .unwrap_err();
        match err {
            EvaluationError::Pattern {
                policy_id, field, ..
            } => {
                assert_eq!(policy_id, "broken");
                assert_eq!(field, TemplateField::Subject);
            }
            other => panic!("unexpected error: {}", other),
        }

        let err = engine
            .is_allowed(&Request::new("users:alice", "read", "articles:1"))
            .unwrap_err();
        assert!(err.is_evaluation_error());
        assert!(!err.is_forbidden());
    }

    #[test]
    fn test_malformed_template_after_deny_is_not_reached() {
        // Deny ends the scan before the broken policy is compiled
        let engine = engine(vec![
            DefaultPolicy::deny("deny-all")
                .with_subjects(["<.*>"])
                .with_actions(["<.*>"])
                .with_resources(["<.*>"]),
            DefaultPolicy::allow("broken")
                .with_subjects(["<"])
                .with_actions(["read"])
                .with_resources(["articles:1"]),
        ]);

        let err = engine
            .is_allowed(&Request::new("users:alice", "read", "articles:1"))
            .unwrap_err();
        assert!(err.is_forbidden());
    }

    #[test]
    fn test_malformed_template_in_skipped_policy() {
        // Action mismatch skips the policy before its subject is compiled
        let engine = engine(vec![DefaultPolicy::allow("broken")
            .with_subjects(["<"])
            .with_actions(["write"])
            .with_resources(["articles:1"])]);

        assert!(engine
            .is_allowed(&Request::new("users:alice", "read", "articles:1"))
            .unwrap_err()
            .is_forbidden());
    }

    #[test]
    fn test_repository_failure() {
        let engine = DecisionEngine::new(Failing::default());

        let err = engine
            .decide(&Request::new("users:alice", "read", "articles:1"))
            .unwrap_err();
        assert!(matches!(
            err,
            EvaluationError::Repository { ref subject, .. } if subject == "users:alice"
        ));

        let err = engine
            .is_allowed(&Request::new("users:alice", "read", "articles:1"))
            .unwrap_err();
        assert!(err.is_evaluation_error());

        // One lookup per decision, no retries
        assert_eq!(engine.repository().0.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_policy_delimiters() {
        let engine = engine(vec![DefaultPolicy::allow("braces")
            .with_delimiters('{', '}')
            .unwrap()
            .with_subjects(["users:{.*}"])
            .with_actions(["<read>"])
            .with_resources(["articles:{[0-9]+}"])]);

        // `<read>` is literal under braces
        assert!(engine
            .is_allowed(&Request::new("users:alice", "<read>", "articles:7"))
            .is_ok());
        assert!(engine
            .is_allowed(&Request::new("users:alice", "read", "articles:7"))
            .is_err());
    }

    #[test]
    fn test_cache_usage() {
        let engine = engine(vec![readers()]);
        assert_eq!(engine.cache_size(), 0);

        engine
            .is_allowed(&Request::new("users:alice", "read", "articles:1"))
            .unwrap();
        // Only `users:<.*>` needs a regex
        assert_eq!(engine.cache_size(), 1);

        engine
            .is_allowed(&Request::new("users:bob", "read", "articles:1"))
            .unwrap();
        assert_eq!(engine.cache_size(), 1);

        engine.clear_cache();
        assert_eq!(engine.cache_size(), 0);
    }

    #[test]
    fn test_evaluate_snapshot() {
        let engine = engine(Vec::new());
        let policies: Vec<Arc<dyn Policy>> = vec![Arc::new(readers())];

        assert!(engine
            .evaluate_policies(&Request::new("users:alice", "read", "articles:1"), &policies)
            .unwrap()
            .is_granted());
    }
}
