use super::{
    countdown::{Countdown, Tick},
    Expiring, Scope,
};
use chrono::{DateTime, Utc};
use maffisol_types::Identity;
use std::time::Duration;

/// Tags polls with the tracking epoch they were issued in. A result from an
/// earlier epoch belongs to an identity that is no longer tracked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Generation(u64);

/// Local copy of a server-owned value for the tracked identity.
///
/// Polls and pushes overwrite the value in the order they are applied.
/// There is no sequence number to compare: the last one applied wins.
#[derive(Clone, Debug)]
pub struct Mirror<V> {
    identity: Option<Identity>,
    generation: Generation,
    fallback: V,
    value: V,
    countdown: Countdown,
}

impl<V: Expiring> Mirror<V> {
    pub fn new(fallback: V) -> Self {
        Self {
            identity: None,
            generation: Generation(0),
            value: fallback.clone(),
            fallback,
            countdown: Countdown::IDLE,
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    /// Starts tracking `identity`. The value resets to the fallback until
    /// the first poll or push for it lands.
    pub fn track(&mut self, identity: Identity) -> Generation {
        self.identity = Some(identity);
        self.reset()
    }

    pub fn clear(&mut self) {
        self.identity = None;
        self.reset();
    }

    fn reset(&mut self) -> Generation {
        self.generation = Generation(self.generation.0 + 1);
        self.value = self.fallback.clone();
        self.countdown = Countdown::IDLE;
        self.generation
    }

    /// Applies a poll result issued in `generation`. `None` stands for a
    /// failed poll and installs the fallback. Returns whether state changed.
    pub fn apply_poll(&mut self, generation: Generation, value: Option<V>, now: DateTime<Utc>) -> bool {
        if generation != self.generation || self.identity.is_none() {
            return false;
        }
        let value = value.unwrap_or_else(|| self.fallback.clone());
        self.overwrite(value, now);
        true
    }

    /// Applies a pushed value. Identity-scoped pushes must name the tracked
    /// identity; room-scoped and unscoped ones apply to whatever is tracked.
    pub fn apply_push(&mut self, scope: &Scope, value: V, now: DateTime<Utc>) -> bool {
        let Some(identity) = &self.identity else {
            return false;
        };
        if let Scope::Identity(raw) = scope {
            if !identity.matches(raw) {
                return false;
            }
        }
        self.overwrite(value, now);
        true
    }

    fn overwrite(&mut self, value: V, now: DateTime<Utc>) {
        let remaining = value.remaining(now);
        self.countdown = Countdown::start(remaining.unwrap_or(Duration::ZERO));
        self.value = match remaining {
            Some(remaining) if remaining.is_zero() => value.expired(),
            _ => value,
        };
    }

    pub fn counting(&self) -> bool {
        self.countdown.is_running()
    }

    /// Remaining time shown to the user, `None` when nothing counts down.
    pub fn remaining(&self) -> Option<Duration> {
        self.countdown
            .is_running()
            .then(|| self.countdown.remaining())
    }

    pub fn tick(&mut self) -> Tick {
        let tick = self.countdown.tick();
        if tick == Tick::Released {
            self.value = self.value.expired();
        }
        tick
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use maffisol_types::{api::Leaderboard, TimedLock};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 1, 12, 0, 0).unwrap()
    }

    fn locked_for(ms: i64) -> TimedLock {
        TimedLock::observe(true, Some(now() + chrono::Duration::milliseconds(ms)), now())
    }

    fn tracking(raw: &str) -> (Mirror<TimedLock>, Generation) {
        let mut mirror = Mirror::new(TimedLock::INACTIVE);
        let generation = mirror.track(Identity::new(raw).unwrap());
        (mirror, generation)
    }

    #[test]
    fn test_push_for_other_identity_ignored() {
        let (mut mirror, generation) = tracking("w1");
        assert!(mirror.apply_poll(generation, Some(locked_for(60_000)), now()));

        let before = mirror.clone();
        assert!(!mirror.apply_push(&Scope::Identity("w2".to_string()), TimedLock::INACTIVE, now()));
        assert_eq!(mirror.value(), before.value());
        assert_eq!(mirror.remaining(), before.remaining());
    }

    #[test]
    fn test_null_release_is_inactive() {
        let (mut mirror, _) = tracking("w1");
        let pushed = TimedLock::observe(true, None, now());
        assert!(mirror.apply_push(&Scope::Identity("w1".to_string()), pushed, now()));
        assert!(!mirror.value().is_active());
        assert!(!mirror.counting());
        assert_eq!(mirror.remaining(), None);
    }

    #[test]
    fn test_countdown_releases_once() {
        let (mut mirror, generation) = tracking("w1");
        mirror.apply_poll(generation, Some(locked_for(5_000)), now());
        assert_eq!(mirror.remaining(), Some(Duration::from_millis(5_000)));

        let released = (0..5)
            .map(|_| mirror.tick())
            .filter(|tick| *tick == Tick::Released)
            .count();
        assert_eq!(released, 1);
        assert!(!mirror.value().is_active());
        assert_eq!(mirror.remaining(), None);
        assert_eq!(mirror.tick(), Tick::Idle);
    }

    #[test]
    fn test_poll_then_push_last_applied_wins() {
        let (mut mirror, generation) = tracking("w1");
        assert!(mirror.apply_poll(generation, Some(locked_for(120_000)), now()));
        assert!(mirror.value().is_active());

        let pushed = TimedLock::observe(false, None, now());
        assert!(mirror.apply_push(&Scope::Identity("w1".to_string()), pushed, now()));
        assert!(!mirror.value().is_active());
        assert!(!mirror.counting());
    }

    #[test]
    fn test_stale_poll_after_identity_change_discarded() {
        let (mut mirror, generation_a) = tracking("A");
        let generation_b = mirror.track(Identity::new("B").unwrap());
        assert!(mirror.apply_poll(generation_b, Some(TimedLock::INACTIVE), now()));

        assert!(!mirror.apply_poll(generation_a, Some(locked_for(120_000)), now()));
        assert_eq!(mirror.identity().map(Identity::as_str), Some("B"));
        assert!(!mirror.value().is_active());
    }

    #[test]
    fn test_failed_poll_falls_back() {
        let (mut mirror, generation) = tracking("w1");
        mirror.apply_push(&Scope::Identity("w1".to_string()), locked_for(30_000), now());
        assert!(mirror.apply_poll(generation, None, now()));
        assert_eq!(*mirror.value(), TimedLock::INACTIVE);
    }

    #[test]
    fn test_joined_scope_requires_tracking() {
        let mut mirror = Mirror::new(TimedLock::INACTIVE);
        assert!(!mirror.apply_push(&Scope::Joined, locked_for(10_000), now()));

        mirror.track(Identity::new("family-1").unwrap());
        assert!(mirror.apply_push(&Scope::Joined, locked_for(10_000), now()));
        assert!(mirror.counting());

        mirror.clear();
        assert!(mirror.identity().is_none());
        assert!(!mirror.counting());
        assert_eq!(*mirror.value(), TimedLock::INACTIVE);
    }

    #[test]
    fn test_values_without_deadline_never_count() {
        let mut mirror = Mirror::new(Leaderboard::Players(Vec::new()));
        let generation = mirror.track(Identity::new("viewer").unwrap());
        assert!(mirror.apply_poll(generation, Some(Leaderboard::Families(Vec::new())), now()));
        assert!(!mirror.counting());
        assert_eq!(mirror.tick(), Tick::Idle);
    }
}
