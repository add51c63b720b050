//! Lockout and timing policy.
//!
//! Both nodes share the same numbers but enforce different parts of them: the
//! HMI node is the only one that knows how many tries the user has had, so it
//! owns the [`AttemptCounter`]; the control node enforces the alarm cooldown
//! and the motor dwell times.

/// The policy constants. Durations are in whole seconds, as counted by the
/// [`Ticker`](crate::timing::Ticker).
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Policy {
    /// Consecutive mismatches allowed before lockout.
    pub max_attempts: u8,
    /// How long the system stays locked (and the alarm sounds) after the
    /// attempts are exhausted.
    pub lockout_seconds: u32,
    /// How long the motor is driven to open, and again to close, the door.
    pub door_motion_seconds: u32,
    /// How long a status message stays on the display.
    pub message_seconds: u32,
}

impl Default for Policy {
    fn default() -> Self {
        Policy {
            max_attempts: 3,
            lockout_seconds: 60,
            door_motion_seconds: 15,
            message_seconds: 1,
        }
    }
}

/// What to do after a mismatch was recorded.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Verdict {
    Retry,
    Lockout,
}

/// Consecutive mismatches within one verification session.
///
/// Created fresh when a flow is entered and discarded when it exits, by match
/// or by lockout.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AttemptCounter {
    failures: u8,
    limit: u8,
}

impl AttemptCounter {
    pub fn new(policy: &Policy) -> Self {
        AttemptCounter {
            failures: 0,
            limit: policy.max_attempts,
        }
    }

    pub fn failures(&self) -> u8 {
        self.failures
    }

    pub fn remaining(&self) -> u8 {
        self.limit.saturating_sub(self.failures)
    }

    /// Count one mismatch. Returns [`Verdict::Lockout`] once the limit is
    /// reached.
    pub fn record_failure(&mut self) -> Verdict {
        self.failures = self.failures.saturating_add(1);
        if self.failures >= self.limit {
            Verdict::Lockout
        } else {
            Verdict::Retry
        }
    }

    pub fn reset(&mut self) {
        self.failures = 0;
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[test]
fn two_failures_never_lock_out() {
    let mut counter = AttemptCounter::new(&Policy::default());
    assert_eq!(counter.record_failure(), Verdict::Retry);
    assert_eq!(counter.record_failure(), Verdict::Retry);
    assert_eq!(counter.remaining(), 1);
}

#[test]
fn third_failure_locks_out() {
    let mut counter = AttemptCounter::new(&Policy::default());
    counter.record_failure();
    counter.record_failure();
    assert_eq!(counter.record_failure(), Verdict::Lockout);
    assert_eq!(counter.failures(), 3);
}

#[test]
fn reset_starts_over() {
    let mut counter = AttemptCounter::new(&Policy::default());
    counter.record_failure();
    counter.record_failure();
    counter.reset();
    assert_eq!(counter.failures(), 0);
    assert_eq!(counter.record_failure(), Verdict::Retry);
}

#[test]
fn custom_limit_is_honoured() {
    let policy = Policy {
        max_attempts: 1,
        ..Policy::default()
    };
    let mut counter = AttemptCounter::new(&policy);
    assert_eq!(counter.record_failure(), Verdict::Lockout);
}
