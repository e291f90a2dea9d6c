//! Sliding window counter state, one instance per client key.

use std::time::Duration;

use parking_lot::Mutex;

use super::rule::Rule;

/// Nanoseconds since the UNIX epoch.
type Nanos = u128;

/// Sliding window counters owned by a single client key.
///
/// Tracks the request count of the current unit-aligned window and the count
/// of the window immediately before it. The four fields are read and written
/// only inside [`advance`](ClientWindow::advance), under this state's own
/// lock; the critical section never touches the rule store or the registry,
/// so decisions for distinct clients never contend.
pub struct ClientWindow {
    state: Mutex<WindowState>,
}

#[derive(Debug, Default, Clone, Copy)]
struct WindowState {
    /// Start of the previous window, if one is being tracked.
    prev_window: Option<Nanos>,
    /// Requests observed in the previous window.
    prev_count: u64,
    /// Start of the current window. Unset until the client's first request.
    curr_window: Option<Nanos>,
    /// Requests observed so far in the current window.
    curr_count: u64,
}

impl ClientWindow {
    /// Create zeroed state with both windows unset.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(WindowState::default()),
        }
    }

    /// Record a request arriving at `now` (time since the UNIX epoch) and
    /// evaluate the sliding window estimate under `rule`.
    ///
    /// Returns the active request estimate, with this request already
    /// counted, and the time remaining in the current window. The caller
    /// admits the request iff the estimate is below the rule's maximum; the
    /// remaining time doubles as the retry hint on rejection.
    pub fn advance(&self, now: Duration, rule: &Rule) -> (u64, Duration) {
        let now_ns = now.as_nanos();
        let unit_ns = rule.unit().as_nanos();
        let new_curr = now_ns - now_ns % unit_ns;
        // None only within the first unit after the epoch.
        let new_prev = new_curr.checked_sub(unit_ns);

        // Window counters are reused across logical windows rather than
        // allocated fresh, which is why the whole read-modify-write must
        // happen under the lock.
        let (prev_count, curr_count) = {
            let mut state = self.state.lock();

            if state.curr_window == Some(new_curr) {
                // Still inside the tracked current window.
                state.curr_count += 1;
            } else {
                if state.curr_window.is_some() && state.curr_window == new_prev {
                    // Exactly one window elapsed: the old current window
                    // becomes the previous window.
                    state.prev_window = state.curr_window;
                    state.prev_count = state.curr_count;
                } else {
                    // First request ever, or idle for more than one window.
                    state.prev_window = None;
                    state.prev_count = 0;
                }
                state.curr_window = Some(new_curr);
                state.curr_count = 1;
            }

            (state.prev_count, state.curr_count)
        };

        let remaining_ns = unit_ns - (now_ns - new_curr);
        // Weighted share of the previous window, truncated toward zero.
        let weighted_prev = (prev_count as Nanos * remaining_ns / unit_ns) as u64;
        let estimate = weighted_prev + curr_count;

        (estimate, Duration::from_nanos(remaining_ns as u64))
    }

    /// Start of the window this client last advanced into, if any.
    ///
    /// Used by the registry's staleness sweep.
    pub fn window_start(&self) -> Option<Duration> {
        self.state
            .lock()
            .curr_window
            .map(|ns| Duration::from_nanos(ns as u64))
    }
}

impl Default for ClientWindow {
    fn default() -> Self {
        Self::new()
    }
}
