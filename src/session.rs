// src/session.rs

//! Session safety timers.
//!
//! Each timer is a plain state machine driven by the caller's `Instant`, so
//! front ends poll them from their own event loop and tests step them
//! deterministically.

use std::time::{Duration, Instant};

use crate::models::SessionConfig;

/// Signs the session out after a period without activity.
#[derive(Debug, Clone)]
pub struct IdleTimer {
    timeout: Duration,
    last_activity: Instant,
}

impl IdleTimer {
    pub fn new(timeout: Duration, now: Instant) -> Self {
        Self {
            timeout,
            last_activity: now,
        }
    }

    pub fn from_config(config: &SessionConfig, now: Instant) -> Self {
        Self::new(Duration::from_secs(config.idle_timeout_secs), now)
    }

    /// Any user input resets the countdown.
    pub fn touch(&mut self, now: Instant) {
        self.last_activity = now;
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_activity) >= self.timeout
    }

    pub fn remaining(&self, now: Instant) -> Duration {
        self.timeout
            .saturating_sub(now.saturating_duration_since(self.last_activity))
    }
}

/// Outcome of a sign-in attempt as seen by the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginCheck {
    /// Sign-in may be attempted
    Allowed { attempts_left: u32 },
    /// Too many failures; retry after the given wait
    LockedOut { retry_after: Duration },
}

/// Locks sign-in after repeated failures.
#[derive(Debug, Clone)]
pub struct LoginGuard {
    max_attempts: u32,
    lockout: Duration,
    failures: u32,
    locked_until: Option<Instant>,
}

impl LoginGuard {
    pub fn new(max_attempts: u32, lockout: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            lockout,
            failures: 0,
            locked_until: None,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            config.max_login_attempts,
            Duration::from_secs(config.lockout_secs),
        )
    }

    pub fn check(&mut self, now: Instant) -> LoginCheck {
        if let Some(until) = self.locked_until {
            if now < until {
                return LoginCheck::LockedOut {
                    retry_after: until - now,
                };
            }
            // Lockout over; start counting afresh
            self.locked_until = None;
            self.failures = 0;
        }
        LoginCheck::Allowed {
            attempts_left: self.max_attempts - self.failures,
        }
    }

    /// Record a failed attempt. Returns the resulting state.
    pub fn record_failure(&mut self, now: Instant) -> LoginCheck {
        if let LoginCheck::LockedOut { retry_after } = self.check(now) {
            return LoginCheck::LockedOut { retry_after };
        }

        self.failures += 1;
        if self.failures >= self.max_attempts {
            log::warn!(
                "Sign-in locked for {}s after {} failed attempts",
                self.lockout.as_secs(),
                self.failures
            );
            self.locked_until = Some(now + self.lockout);
            return LoginCheck::LockedOut {
                retry_after: self.lockout,
            };
        }
        LoginCheck::Allowed {
            attempts_left: self.max_attempts - self.failures,
        }
    }

    pub fn record_success(&mut self) {
        self.failures = 0;
        self.locked_until = None;
    }
}

/// Holds back a typed value until input settles.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(Duration::from_millis(config.search_debounce_ms))
    }

    /// Replace the pending value and restart the delay.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    /// Take the pending value once the delay has elapsed since the last push.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, at)) if now.saturating_duration_since(*at) >= self.delay => {
                self.pending.take().map(|(value, _)| value)
            }
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_timer_resets_on_activity() {
        let start = Instant::now();
        let mut timer = IdleTimer::from_config(&SessionConfig::default(), start);

        let at = |secs| start + Duration::from_secs(secs);
        assert!(!timer.is_expired(at(14 * 60)));
        timer.touch(at(14 * 60));
        assert!(!timer.is_expired(at(28 * 60)));
        assert_eq!(timer.remaining(at(28 * 60)), Duration::from_secs(60));
        assert!(timer.is_expired(at(29 * 60)));
    }

    #[test]
    fn test_login_lockout() {
        let start = Instant::now();
        let mut guard = LoginGuard::from_config(&SessionConfig::default());

        for left in (1..5).rev() {
            assert_eq!(
                guard.record_failure(start),
                LoginCheck::Allowed { attempts_left: left }
            );
        }
        assert_eq!(
            guard.record_failure(start),
            LoginCheck::LockedOut {
                retry_after: Duration::from_secs(300)
            }
        );
        assert!(matches!(
            guard.check(start + Duration::from_secs(299)),
            LoginCheck::LockedOut { .. }
        ));
        assert_eq!(
            guard.check(start + Duration::from_secs(300)),
            LoginCheck::Allowed { attempts_left: 5 }
        );
    }

    #[test]
    fn test_success_clears_failures() {
        let now = Instant::now();
        let mut guard = LoginGuard::new(3, Duration::from_secs(60));
        guard.record_failure(now);
        guard.record_failure(now);
        guard.record_success();
        assert_eq!(guard.check(now), LoginCheck::Allowed { attempts_left: 3 });
    }

    #[test]
    fn test_debouncer_keeps_last_value() {
        let start = Instant::now();
        let ms = |n| start + Duration::from_millis(n);
        let mut search = Debouncer::from_config(&SessionConfig::default());

        search.push("r", ms(0));
        search.push("ru", ms(100));
        search.push("rust", ms(200));
        assert_eq!(search.poll(ms(400)), None);
        assert_eq!(search.poll(ms(500)), Some("rust"));
        assert!(!search.is_pending());
        assert_eq!(search.poll(ms(900)), None);
    }
}
