//! Policy retrieval
//!
//! The engine asks a [`PolicyRepository`] for the candidate policies of a
//! subject once per decision. Storage is up to the implementation;
//! [`MemoryRepository`] keeps policies in a vector and returns all of them.

use super::policy::Policy;
use crate::error::RepositoryError;
use parking_lot::RwLock;
use std::sync::Arc;

/// Source of candidate policies for a subject
pub trait PolicyRepository: Send + Sync {
    /// Candidate policies for `subject`, in evaluation order
    ///
    /// Implementations may return a superset of the applicable policies;
    /// the engine matches subjects itself.
    fn find_policies_for_subject(&self, subject: &str)
        -> Result<Vec<Arc<dyn Policy>>, RepositoryError>;
}

impl<R: PolicyRepository + ?Sized> PolicyRepository for Arc<R> {
    fn find_policies_for_subject(
        &self,
        subject: &str,
    ) -> Result<Vec<Arc<dyn Policy>>, RepositoryError> {
        (**self).find_policies_for_subject(subject)
    }
}

impl<R: PolicyRepository + ?Sized> PolicyRepository for Box<R> {
    fn find_policies_for_subject(
        &self,
        subject: &str,
    ) -> Result<Vec<Arc<dyn Policy>>, RepositoryError> {
        (**self).find_policies_for_subject(subject)
    }
}

/// In-memory repository preserving insertion order
#[derive(Debug, Default)]
pub struct MemoryRepository {
    policies: RwLock<Vec<Arc<dyn Policy>>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository from policies, keeping their order
    pub fn from_policies<I, P>(policies: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Policy + 'static,
    {
        let repository = Self::new();
        for policy in policies {
            repository.insert(policy);
        }
        repository
    }

    /// Add a policy, replacing (in place) any policy with the same id
    pub fn insert<P: Policy + 'static>(&self, policy: P) {
        self.insert_shared(Arc::new(policy));
    }

    /// Add an already shared policy, replacing any policy with the same id
    pub fn insert_shared(&self, policy: Arc<dyn Policy>) {
        let mut policies = self.policies.write();
        match policies.iter().position(|p| p.id() == policy.id()) {
            Some(idx) => policies[idx] = policy,
            None => policies.push(policy),
        }
    }

    /// Remove a policy by id
    pub fn remove(&self, id: &str) -> Option<Arc<dyn Policy>> {
        let mut policies = self.policies.write();
        let idx = policies.iter().position(|p| p.id() == id)?;
        Some(policies.remove(idx))
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Policy>> {
        self.policies.read().iter().find(|p| p.id() == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.policies.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.read().is_empty()
    }
}

impl PolicyRepository for MemoryRepository {
    fn find_policies_for_subject(
        &self,
        _subject: &str,
    ) -> Result<Vec<Arc<dyn Policy>>, RepositoryError> {
        Ok(self.policies.read().clone())
    }
}
