//! Failed-login counting and temporary lockouts.
//!
//! State is process-local and resets on restart. Both maps are concurrent;
//! racing `register_failed_attempt` and `is_blocked` calls for the same
//! username may over- or undercount by one, which is acceptable for a
//! throttle (no linearizability requirement).

use dashmap::DashMap;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::ThrottleConfig;

pub struct LoginThrottle {
    failed_attempts: DashMap<String, u32>,
    lockouts: DashMap<String, Instant>,
    max_attempts: u32,
    lockout_duration: Duration,
}

impl LoginThrottle {
    pub fn new(config: &ThrottleConfig) -> Self {
        Self {
            failed_attempts: DashMap::new(),
            lockouts: DashMap::new(),
            max_attempts: config.max_attempts,
            lockout_duration: config.lockout_duration,
        }
    }

    /// Record a failed login. Reaching the configured maximum starts (or
    /// restarts) the lockout window for the username.
    pub fn register_failed_attempt(&self, username: &str) {
        let attempts = {
            let mut entry = self.failed_attempts.entry(username.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };

        if attempts >= self.max_attempts {
            debug!(username, attempts, "locking out after repeated failures");
            self.lockouts.insert(username.to_string(), Instant::now());
        }
    }

    /// Whether the username is currently locked out. An expired lockout is
    /// cleared (both the lockout and the failure counter) before returning
    /// false, so calling this twice after expiry is side-effect free the
    /// second time.
    pub fn is_blocked(&self, username: &str) -> bool {
        let started = match self.lockouts.get(username) {
            Some(entry) => *entry.value(),
            None => return false,
        };

        if started.elapsed() < self.lockout_duration {
            return true;
        }

        self.lockouts.remove(username);
        self.failed_attempts.remove(username);
        false
    }

    /// Clear all throttle state for the username (after a successful login).
    pub fn reset_attempts(&self, username: &str) {
        self.failed_attempts.remove(username);
        self.lockouts.remove(username);
    }

    #[cfg(test)]
    fn attempts(&self, username: &str) -> u32 {
        self.failed_attempts
            .get(username)
            .map(|e| *e.value())
            .unwrap_or(0)
    }
}
