use rand::{Rng, RngCore};
use std::time::Duration;

/// "Equal jitter": the delay is drawn from `[backoff/2, backoff]`.
pub(crate) fn jittered_backoff(rng: &mut impl RngCore, backoff: Duration) -> Duration {
    let backoff_ms = backoff.as_millis() as u64;
    if backoff_ms <= 1 {
        return backoff;
    }

    let half_ms = backoff_ms / 2;
    let jitter_ms = rng.gen_range(0..=half_ms);
    Duration::from_millis(half_ms.saturating_add(jitter_ms))
}

/// Doubles `backoff`, capped at `max`.
pub(crate) fn next_backoff(backoff: Duration, max: Duration) -> Duration {
    backoff.saturating_mul(2).min(max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_jitter_stays_within_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let delay = jittered_backoff(&mut rng, Duration::from_millis(400));
            assert!(delay >= Duration::from_millis(200));
            assert!(delay <= Duration::from_millis(400));
        }
    }

    #[test]
    fn test_tiny_backoff_is_untouched() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(jittered_backoff(&mut rng, Duration::ZERO), Duration::ZERO);
        assert_eq!(
            jittered_backoff(&mut rng, Duration::from_millis(1)),
            Duration::from_millis(1)
        );
    }

    #[test]
    fn test_next_backoff_caps() {
        let max = Duration::from_secs(2);
        assert_eq!(
            next_backoff(Duration::from_millis(250), max),
            Duration::from_millis(500)
        );
        assert_eq!(next_backoff(Duration::from_millis(1500), max), max);
    }
}
