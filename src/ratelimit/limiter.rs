//! Admission controller facade.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tracing::{debug, info, trace};

use crate::error::Result;

use super::registry::ClientRegistry;
use super::rule::{Rule, RuleStore};

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Whether the request may proceed.
    pub admitted: bool,
    /// Time until the current window expires; present only on rejection.
    /// Advisory: the caller enforces any retry delay, not this core.
    pub retry_after: Option<Duration>,
}

impl Decision {
    fn admit() -> Self {
        Self {
            admitted: true,
            retry_after: None,
        }
    }

    fn reject(retry_after: Duration) -> Self {
        Self {
            admitted: false,
            retry_after: Some(retry_after),
        }
    }
}

/// Decides request admission per client key under the active rate rule.
///
/// Composes the rule store and the client registry. This struct is
/// thread-safe and can be shared across tasks.
pub struct AdmissionController {
    rules: RuleStore,
    clients: ClientRegistry,
}

impl AdmissionController {
    /// Create a controller with no active rule and no tracked clients.
    pub fn new() -> Self {
        Self {
            rules: RuleStore::new(),
            clients: ClientRegistry::new(),
        }
    }

    /// Install a new active rule, replacing any prior one.
    ///
    /// Fails with `InvalidRule` if either argument is non-positive; a prior
    /// rule stays active in that case.
    pub fn set_rule(&self, max_requests: u64, unit: Duration) -> Result<()> {
        let rule = Rule::new(max_requests, unit)?;
        self.rules.set(rule);
        info!(max_requests, unit = ?unit, "Rate rule installed");
        Ok(())
    }

    /// Decide admission for `client_key` at the current wall-clock time.
    pub fn decide(&self, client_key: &str) -> Decision {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        self.decide_at(client_key, now)
    }

    /// Decide admission for `client_key` at time `now` (since the UNIX epoch).
    ///
    /// With no active rule this fails open: an unconfigured limiter must
    /// never make the service unavailable.
    pub fn decide_at(&self, client_key: &str, now: Duration) -> Decision {
        let Some(rule) = self.rules.current() else {
            return Decision::admit();
        };

        let window = self.clients.get_or_create(client_key);
        let (estimate, remaining) = window.advance(now, &rule);

        // The request just counted is included in its own estimate, so a
        // request that pushes the estimate to exactly the maximum is
        // rejected.
        let admitted = estimate < rule.max_requests();

        trace!(
            client = %client_key,
            estimate,
            admitted,
            "Admission decision"
        );

        if admitted {
            Decision::admit()
        } else {
            debug!(
                client = %client_key,
                retry_after = ?remaining,
                "Request rejected"
            );
            Decision::reject(remaining)
        }
    }

    /// Drop window state for clients idle longer than `stale_windows` full
    /// windows of the active rule. Returns the number of entries removed.
    pub fn evict_stale(&self, stale_windows: u32) -> usize {
        let Some(rule) = self.rules.current() else {
            return 0;
        };
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        self.clients.evict_stale(now, rule.unit() * stale_windows)
    }

    /// Number of clients with tracked window state.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// Drop all client state.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.clients.clear();
    }
}

impl Default for AdmissionController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    const SECOND: Duration = Duration::from_secs(1);

    fn at(secs: u64, millis: u64) -> Duration {
        Duration::from_secs(secs) + Duration::from_millis(millis)
    }

    #[test]
    fn test_no_rule_fails_open() {
        let controller = AdmissionController::new();

        let decision = controller.decide_at("client-a", at(100, 0));

        assert!(decision.admitted);
        assert_eq!(decision.retry_after, None);
        // Fail-open decisions do not create window state.
        assert_eq!(controller.client_count(), 0);
    }

    #[test]
    fn test_burst_within_one_window() {
        let controller = AdmissionController::new();
        controller.set_rule(5, SECOND).unwrap();

        // Estimates run 1..=4, all below the maximum of 5.
        for ii in 0..4 {
            let decision = controller.decide_at("client-a", at(100, ii * 100));
            assert!(decision.admitted, "request {} should be admitted", ii + 1);
        }

        // The fifth request pushes the estimate to exactly 5.
        let decision = controller.decide_at("client-a", at(100, 400));
        assert!(!decision.admitted);
        assert_eq!(decision.retry_after, Some(Duration::from_millis(600)));

        let decision = controller.decide_at("client-a", at(100, 500));
        assert!(!decision.admitted);
        assert_eq!(decision.retry_after, Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_interpolation_rejects_in_fresh_window() {
        let controller = AdmissionController::new();
        controller.set_rule(5, SECOND).unwrap();

        // Five arrivals counted in the window starting at t=100s.
        for ii in 0..5 {
            controller.decide_at("client-a", at(100, ii * 100));
        }

        // First arrival of the next window at t=101.2s: weighted previous
        // contribution is floor(5 * 0.8) = 4, estimate 4 + 1 = 5, rejected
        // even though the window is fresh.
        let decision = controller.decide_at("client-a", at(101, 200));
        assert!(!decision.admitted);
        assert_eq!(decision.retry_after, Some(Duration::from_millis(800)));

        // Near the end of that window the previous weight has decayed:
        // floor(5 * 0.1) = 0, estimate 2, admitted.
        let decision = controller.decide_at("client-a", at(101, 900));
        assert!(decision.admitted);
    }

    #[test]
    fn test_idle_client_gets_fresh_start() {
        let controller = AdmissionController::new();
        controller.set_rule(5, SECOND).unwrap();

        for ii in 0..5 {
            controller.decide_at("client-a", at(100, ii * 100));
        }

        // Idle for more than one full window: previous contribution is gone.
        let decision = controller.decide_at("client-a", at(103, 500));
        assert!(decision.admitted);
    }

    #[test]
    fn test_invalid_rule_keeps_prior_rule_active() {
        let controller = AdmissionController::new();
        controller.set_rule(2, SECOND).unwrap();

        assert!(controller.set_rule(0, SECOND).is_err());
        assert!(controller.set_rule(5, Duration::ZERO).is_err());

        // The original rule still applies.
        assert!(controller.decide_at("client-a", at(100, 0)).admitted);
        assert!(!controller.decide_at("client-a", at(100, 100)).admitted);
    }

    #[test]
    fn test_rule_replacement_applies_to_next_decision() {
        let controller = AdmissionController::new();
        controller.set_rule(2, SECOND).unwrap();

        assert!(controller.decide_at("client-a", at(100, 0)).admitted);
        assert!(!controller.decide_at("client-a", at(100, 100)).admitted);

        // Raising the limit takes effect immediately; existing window counts
        // are kept as-is.
        controller.set_rule(100, SECOND).unwrap();
        assert!(controller.decide_at("client-a", at(100, 200)).admitted);
    }

    #[test]
    fn test_clients_are_isolated() {
        let controller = AdmissionController::new();
        controller.set_rule(2, SECOND).unwrap();

        assert!(controller.decide_at("client-a", at(100, 0)).admitted);
        assert!(!controller.decide_at("client-a", at(100, 100)).admitted);

        // Client B is unaffected by client A's burst.
        assert!(controller.decide_at("client-b", at(100, 200)).admitted);
        assert_eq!(controller.client_count(), 2);
    }

    #[test]
    fn test_concurrent_decisions_lose_no_updates() {
        let threads = 64;
        let controller = Arc::new(AdmissionController::new());
        controller.set_rule(threads as u64, SECOND).unwrap();

        let barrier = Arc::new(std::sync::Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let controller = Arc::clone(&controller);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    controller.decide_at("client-a", at(100, 0)).admitted
                })
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&admitted| admitted)
            .count();

        // Estimates are linearized per client: values 1..=64 each occur
        // exactly once, and only the final one reaches the maximum.
        assert_eq!(admitted, threads - 1);
        assert_eq!(controller.client_count(), 1);
    }

    #[test]
    fn test_evict_stale_drops_idle_clients() {
        let controller = AdmissionController::new();
        controller.set_rule(5, SECOND).unwrap();

        // A window far in the past relative to the wall clock.
        controller.decide_at("client-a", at(100, 0));
        assert_eq!(controller.client_count(), 1);

        let evicted = controller.evict_stale(3);
        assert_eq!(evicted, 1);
        assert_eq!(controller.client_count(), 0);
    }

    #[test]
    fn test_evict_stale_without_rule_is_noop() {
        let controller = AdmissionController::new();
        assert_eq!(controller.evict_stale(3), 0);
    }
}
