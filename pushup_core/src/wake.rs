//! One-shot resume wake.
//!
//! At most one wake is outstanding. Arming a new wake replaces the previous
//! one, and every wake carries a token so a callback delivered late by a host
//! timer can be recognised as stale and dropped.

use chrono::{DateTime, Utc};

/// Identifies one armed wake
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WakeToken(u64);

#[derive(Debug, Clone, Copy)]
struct PendingWake {
    token: WakeToken,
    due: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct WakeScheduler {
    generation: u64,
    pending: Option<PendingWake>,
}

impl WakeScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm a wake for `due`, invalidating any outstanding one.
    pub fn arm(&mut self, due: DateTime<Utc>) -> WakeToken {
        self.generation += 1;
        let token = WakeToken(self.generation);
        if let Some(previous) = self.pending.replace(PendingWake { token, due }) {
            tracing::debug!("Replaced resume wake due {}", previous.due);
        }
        token
    }

    pub fn cancel(&mut self) {
        if self.pending.take().is_some() {
            tracing::debug!("Cancelled resume wake");
        }
    }

    /// When the outstanding wake is due, if any
    pub fn pending(&self) -> Option<DateTime<Utc>> {
        self.pending.map(|p| p.due)
    }

    pub fn token(&self) -> Option<WakeToken> {
        self.pending.map(|p| p.token)
    }

    /// Take the outstanding wake if it is due at `now`.
    pub fn take_due(&mut self, now: DateTime<Utc>) -> Option<WakeToken> {
        match self.pending {
            Some(p) if p.due <= now => {
                self.pending = None;
                Some(p.token)
            }
            _ => None,
        }
    }

    /// Consume the outstanding wake if `token` is the current one.
    pub fn claim(&mut self, token: WakeToken) -> bool {
        match self.pending {
            Some(p) if p.token == token => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 3, 4, 0, 0).unwrap()
    }

    #[test]
    fn test_take_due_only_after_deadline() {
        let mut wakes = WakeScheduler::new();
        let token = wakes.arm(base() + Duration::hours(4));

        assert!(wakes.take_due(base()).is_none());
        assert_eq!(wakes.take_due(base() + Duration::hours(4)), Some(token));
        // Fires exactly once
        assert!(wakes.take_due(base() + Duration::hours(5)).is_none());
        assert!(wakes.pending().is_none());
    }

    #[test]
    fn test_arming_replaces_previous() {
        let mut wakes = WakeScheduler::new();
        let first = wakes.arm(base() + Duration::hours(1));
        let second = wakes.arm(base() + Duration::hours(2));

        assert_ne!(first, second);
        assert!(!wakes.claim(first));
        assert_eq!(wakes.pending(), Some(base() + Duration::hours(2)));
        assert!(wakes.claim(second));
        assert!(wakes.pending().is_none());
    }

    #[test]
    fn test_cancel_invalidates_token() {
        let mut wakes = WakeScheduler::new();
        let token = wakes.arm(base());
        wakes.cancel();
        assert!(!wakes.claim(token));
        assert!(wakes.take_due(base() + Duration::days(1)).is_none());
    }
}
