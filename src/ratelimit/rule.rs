//! Rate rule representation and storage.

use std::time::Duration;

use parking_lot::RwLock;

use crate::error::{Result, SlidegateError};

/// A rate rule: at most `max_requests` admitted per `unit` of time.
///
/// For 10 requests per second, `max_requests = 10` and `unit` is one second.
/// For 100 requests per minute, `max_requests = 100` and `unit` is one minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rule {
    max_requests: u64,
    unit: Duration,
}

impl Rule {
    /// Create a rule, validating that both fields are positive.
    pub fn new(max_requests: u64, unit: Duration) -> Result<Self> {
        if max_requests == 0 {
            return Err(SlidegateError::InvalidRule(
                "max_requests must be positive".to_string(),
            ));
        }
        if unit.is_zero() {
            return Err(SlidegateError::InvalidRule(
                "unit must be a positive duration".to_string(),
            ));
        }
        Ok(Self { max_requests, unit })
    }

    /// Maximum requests admitted per unit.
    pub fn max_requests(&self) -> u64 {
        self.max_requests
    }

    /// Length of one window.
    pub fn unit(&self) -> Duration {
        self.unit
    }
}

/// Holds the single currently active rule.
///
/// The rule is replaced as a whole value. Readers receive a consistent copy
/// or `None` when no rule has been configured; a decision in progress may see
/// either the old or the new rule, never a partially updated one.
pub struct RuleStore {
    rule: RwLock<Option<Rule>>,
}

impl RuleStore {
    /// Create a store with no active rule.
    pub fn new() -> Self {
        Self {
            rule: RwLock::new(None),
        }
    }

    /// Install a new active rule, replacing any prior one.
    pub fn set(&self, rule: Rule) {
        *self.rule.write() = Some(rule);
    }

    /// The active rule, or `None` if none has been set.
    pub fn current(&self) -> Option<Rule> {
        *self.rule.read()
    }
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new()
    }
}
