//! Timed locks: boolean-plus-deadline records (jail, action cooldowns)
//! whose authority lives on the backend.
//!
//! A lock is only ever constructed through an observation at a point in
//! time, which enforces the invariant that `active` holds if and only if the
//! release time is known and still in the future when the lock was observed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client-side mirror of a server-owned timed lock.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimedLock {
    active: bool,
    release_at: Option<DateTime<Utc>>,
}

impl TimedLock {
    pub const INACTIVE: Self = Self {
        active: false,
        release_at: None,
    };

    /// Normalizes a raw `(active, release)` pair observed at `now`.
    ///
    /// Both fields must agree: a lock without a release time, or with a
    /// release time that already passed, is inactive whatever `active` says.
    pub fn observe(active: bool, release_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Self {
        match release_at {
            Some(release_at) if active && release_at > now => Self {
                active: true,
                release_at: Some(release_at),
            },
            _ => Self::INACTIVE,
        }
    }

    /// Lock released `remaining` after `now` (cooldowns are reported as a
    /// remaining duration rather than a deadline).
    pub fn for_remaining(remaining: Duration, now: DateTime<Utc>) -> Self {
        let Ok(remaining) = chrono::Duration::from_std(remaining) else {
            return Self::INACTIVE;
        };
        let release_at = now.checked_add_signed(remaining);
        Self::observe(release_at.is_some(), release_at, now)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn release_at(&self) -> Option<DateTime<Utc>> {
        self.release_at
    }

    /// Time left until release, `None` when inactive.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        if !self.active {
            return None;
        }
        let release_at = self.release_at?;
        Some((release_at - now).to_std().unwrap_or(Duration::ZERO))
    }
}

/// Jail status as returned by `GET /jail-status/{wallet}` and embedded in
/// player and inmate records.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JailStatus {
    #[serde(default)]
    pub is_in_jail: bool,
    #[serde(default)]
    pub jail_release_time: Option<DateTime<Utc>>,
}

impl JailStatus {
    pub fn lock_at(&self, now: DateTime<Utc>) -> TimedLock {
        TimedLock::observe(self.is_in_jail, self.jail_release_time, now)
    }
}

/// Formats a remaining duration the way the game displays timers:
/// `"{minutes}m {seconds}s"`, with `"0m 0s"` when nothing remains.
pub fn format_remaining(remaining: Option<Duration>) -> String {
    let millis = remaining.map(|d| d.as_millis()).unwrap_or(0);
    let minutes = millis / 60_000;
    let seconds = (millis % 60_000) / 1_000;
    format!("{minutes}m {seconds}s")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_observe_requires_both_fields() {
        let release = now() + chrono::Duration::seconds(120);
        assert!(TimedLock::observe(true, Some(release), now()).is_active());
        assert!(!TimedLock::observe(true, None, now()).is_active());
        assert!(!TimedLock::observe(false, Some(release), now()).is_active());
    }

    #[test]
    fn test_observe_past_release_is_inactive() {
        let release = now() - chrono::Duration::seconds(1);
        let lock = TimedLock::observe(true, Some(release), now());
        assert_eq!(lock, TimedLock::INACTIVE);
        assert_eq!(lock.release_at(), None);
    }

    #[test]
    fn test_remaining() {
        let release = now() + chrono::Duration::milliseconds(120_000);
        let lock = TimedLock::observe(true, Some(release), now());
        assert_eq!(lock.remaining(now()), Some(Duration::from_millis(120_000)));
        // Clamped once the deadline has passed but no one has observed it yet.
        assert_eq!(
            lock.remaining(release + chrono::Duration::seconds(5)),
            Some(Duration::ZERO)
        );
        assert_eq!(TimedLock::INACTIVE.remaining(now()), None);
    }

    #[test]
    fn test_for_remaining() {
        let lock = TimedLock::for_remaining(Duration::from_millis(3_000), now());
        assert!(lock.is_active());
        assert_eq!(lock.remaining(now()), Some(Duration::from_millis(3_000)));
        assert!(!TimedLock::for_remaining(Duration::ZERO, now()).is_active());
    }

    #[test]
    fn test_jail_status_null_release_is_inactive() {
        let status: JailStatus =
            serde_json::from_str(r#"{"isInJail":true,"jailReleaseTime":null}"#).unwrap();
        assert!(!status.lock_at(now()).is_active());

        let status: JailStatus = serde_json::from_str(
            r#"{"isInJail":true,"jailReleaseTime":"2024-11-01T12:05:00.000Z"}"#,
        )
        .unwrap();
        let lock = status.lock_at(now());
        assert!(lock.is_active());
        assert_eq!(lock.remaining(now()), Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(None), "0m 0s");
        assert_eq!(format_remaining(Some(Duration::from_millis(999))), "0m 0s");
        assert_eq!(format_remaining(Some(Duration::from_millis(125_400))), "2m 5s");
    }
}
