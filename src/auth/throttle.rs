//! Failed-login throttling.
//!
//! Fixed-window lockout guard over an injected, process-lifetime counter
//! map. State lives only in this instance: under horizontal scaling each
//! instance throttles independently, which is accepted as best effort.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::storage::ThrottleSettings;

struct AttemptWindow {
    failures: u32,
    window_start: Instant,
}

/// Per-identifier failed-login counter with fixed-window lockout.
pub struct LoginThrottle {
    max_attempts: u32,
    window: Duration,
    attempts: Mutex<HashMap<String, AttemptWindow>>,
}

impl LoginThrottle {
    /// Create a throttle from settings.
    pub fn new(settings: &ThrottleSettings) -> Self {
        Self {
            max_attempts: settings.max_attempts,
            window: Duration::from_secs(settings.window_secs),
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Record a failed login for the identifier. Returns true when the
    /// identifier is now locked out. A failure arriving after the window
    /// expired starts a fresh window.
    pub fn register_failure(&self, identifier: &str) -> bool {
        let mut attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        let entry = attempts
            .entry(identifier.to_string())
            .or_insert(AttemptWindow {
                failures: 0,
                window_start: now,
            });

        if now.duration_since(entry.window_start) >= self.window {
            entry.failures = 0;
            entry.window_start = now;
        }

        entry.failures += 1;

        if entry.failures >= self.max_attempts {
            tracing::warn!(identifier, failures = entry.failures, "login locked out");
            true
        } else {
            false
        }
    }

    /// Whether the identifier is currently locked out.
    pub fn is_locked_out(&self, identifier: &str) -> bool {
        let attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());

        match attempts.get(identifier) {
            Some(entry) => {
                entry.failures >= self.max_attempts
                    && Instant::now().duration_since(entry.window_start) < self.window
            }
            None => false,
        }
    }

    /// Clear the identifier's counter, called on successful login.
    pub fn clear(&self, identifier: &str) {
        let mut attempts = self.attempts.lock().unwrap_or_else(|e| e.into_inner());
        attempts.remove(identifier);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn throttle(max_attempts: u32, window_secs: u64) -> LoginThrottle {
        LoginThrottle::new(&ThrottleSettings {
            max_attempts,
            window_secs,
        })
    }

    #[test]
    fn test_locks_out_after_max_failures() {
        let throttle = throttle(3, 900);

        assert!(!throttle.register_failure("ana"));
        assert!(!throttle.register_failure("ana"));
        assert!(throttle.register_failure("ana"));
        assert!(throttle.is_locked_out("ana"));
    }

    #[test]
    fn test_identifiers_are_independent() {
        let throttle = throttle(2, 900);

        throttle.register_failure("ana");
        assert!(!throttle.is_locked_out("ana"));
        assert!(!throttle.is_locked_out("ben"));

        throttle.register_failure("ben");
        throttle.register_failure("ben");
        assert!(throttle.is_locked_out("ben"));
        assert!(!throttle.is_locked_out("ana"));
    }

    #[test]
    fn test_clear_resets_counter() {
        let throttle = throttle(2, 900);

        throttle.register_failure("ana");
        throttle.register_failure("ana");
        assert!(throttle.is_locked_out("ana"));

        throttle.clear("ana");
        assert!(!throttle.is_locked_out("ana"));
        assert!(!throttle.register_failure("ana"));
    }

    #[test]
    fn test_expired_window_starts_fresh() {
        let throttle = throttle(2, 0);

        throttle.register_failure("ana");
        // Zero-length window: every failure lands in a fresh window
        assert!(!throttle.register_failure("ana"));
        assert!(!throttle.is_locked_out("ana"));
    }
}
