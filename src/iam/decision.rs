//! Deny-overrides combination of policy outcomes
//!
//! Each applicable policy folds its effect into a [`Verdict`]:
//! `Unset -> Allow -> Deny`, with `Deny` absorbing. The final verdict turns
//! into a [`Decision`]; an `Unset` verdict is an implicit deny.

use super::policy::Effect;

/// Running result of a deny-overrides scan
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Verdict {
    /// No applicable policy seen yet
    #[default]
    Unset,
    /// At least one applicable allow, no applicable deny
    Allow { policy_id: String },
    /// An applicable deny was seen
    Deny { policy_id: String },
}

impl Verdict {
    /// Fold in the effect of an applicable policy
    ///
    /// `Allow` keeps the first allowing policy; `Deny` is never replaced.
    pub fn combine(self, effect: Effect, policy_id: &str) -> Verdict {
        match (self, effect) {
            (deny @ Verdict::Deny { .. }, _) => deny,
            (_, Effect::Deny) => Verdict::Deny {
                policy_id: policy_id.to_string(),
            },
            (allow @ Verdict::Allow { .. }, Effect::Allow) => allow,
            (Verdict::Unset, Effect::Allow) => Verdict::Allow {
                policy_id: policy_id.to_string(),
            },
        }
    }

    /// Whether further policies can no longer change the outcome
    pub fn is_final(&self) -> bool {
        matches!(self, Verdict::Deny { .. })
    }

    pub fn into_decision(self) -> Decision {
        match self {
            Verdict::Unset => Decision::Denied(Denial::Implicit),
            Verdict::Allow { policy_id } => Decision::Granted { policy_id },
            Verdict::Deny { policy_id } => Decision::Denied(Denial::Explicit { policy_id }),
        }
    }
}

/// Why a request was denied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    /// An applicable deny policy matched
    Explicit { policy_id: String },
    /// No applicable allow policy
    Implicit,
}

/// Final outcome of evaluating a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Granted by at least one allow policy (the first one is reported)
    Granted { policy_id: String },
    Denied(Denial),
}

impl Decision {
    pub fn is_granted(&self) -> bool {
        matches!(self, Decision::Granted { .. })
    }

    /// Policy that decided the outcome, if any
    pub fn policy_id(&self) -> Option<&str> {
        match self {
            Decision::Granted { policy_id } => Some(policy_id),
            Decision::Denied(Denial::Explicit { policy_id }) => Some(policy_id),
            Decision::Denied(Denial::Implicit) => None,
        }
    }
}
