//! Decay and bump functions for decaying tags.
//!
//! A decay function runs once per tag interval for every peer holding a
//! value and returns the next value, or `None` to drop the peer's entry.
//! A bump function folds a delta into the current value.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use libp2p::PeerId;
use web_time::Instant;

/// Value of a decaying tag for a single peer, as seen by decay and bump functions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecayingValue {
    pub tag: String,
    pub peer: PeerId,
    pub value: i64,
    /// When the peer first received a value for this tag.
    pub added: Instant,
    /// Last time the value was bumped or decayed.
    pub last_visit: Instant,
}

impl DecayingValue {
    /// Fresh zero value, the starting point for a first bump.
    pub fn new(tag: impl Into<String>, peer: PeerId) -> Self {
        let now = Instant::now();
        Self {
            tag: tag.into(),
            peer,
            value: 0,
            added: now,
            last_visit: now,
        }
    }
}

impl fmt::Display for DecayingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.tag, self.value, self.peer)
    }
}

/// Returns the decayed value, or `None` to remove the entry.
pub type DecayFn = Arc<dyn Fn(&DecayingValue) -> Option<i64> + Send + Sync>;

/// Returns the value after applying `delta`.
pub type BumpFn = Arc<dyn Fn(&DecayingValue, i64) -> i64 + Send + Sync>;

/// Never decays.
pub fn decay_none() -> DecayFn {
    Arc::new(|value| Some(value.value))
}

/// Subtracts `amount` each interval, removing the entry once it reaches zero.
pub fn decay_fixed(amount: i64) -> DecayFn {
    Arc::new(move |value| {
        let next = value.value.saturating_sub(amount);
        (next > 0).then_some(next)
    })
}

/// Multiplies by `coef` each interval (rounded down), removing the entry once it reaches zero.
pub fn decay_linear(coef: f64) -> DecayFn {
    Arc::new(move |value| {
        let next = (value.value as f64 * coef).floor() as i64;
        (next > 0).then_some(next)
    })
}

/// Keeps the value unchanged but removes it once it has not been visited
/// (bumped or decayed) for `after`.
pub fn decay_expire_when_inactive(after: Duration) -> DecayFn {
    Arc::new(move |value| (value.last_visit.elapsed() < after).then_some(value.value))
}

/// Adds the delta without bounds.
pub fn bump_sum_unbounded() -> BumpFn {
    Arc::new(|value, delta| value.value.saturating_add(delta))
}

/// Adds the delta, clamping the result to `[min, max]`.
pub fn bump_sum_bounded(min: i64, max: i64) -> BumpFn {
    Arc::new(move |value, delta| value.value.saturating_add(delta).clamp(min, max))
}

/// Adds the delta, capping the result at `max`.
pub fn bump_sum_capped(max: i64) -> BumpFn {
    Arc::new(move |value, delta| value.value.saturating_add(delta).min(max))
}

/// Replaces the value with the delta.
pub fn bump_overwrite() -> BumpFn {
    Arc::new(|_, delta| delta)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn test_peer_id(n: u8) -> PeerId {
        let key = libp2p::identity::ed25519::SecretKey::try_from_bytes([n; 32]).unwrap();
        let keypair =
            libp2p::identity::Keypair::from(libp2p::identity::ed25519::Keypair::from(key));
        keypair.public().to_peer_id()
    }

    fn value(v: i64) -> DecayingValue {
        DecayingValue {
            value: v,
            ..DecayingValue::new("test", test_peer_id(1))
        }
    }

    #[test]
    fn test_decay_fixed_removes_at_zero() {
        let decay = decay_fixed(1);
        assert_eq!(decay(&value(15)), Some(14));
        assert_eq!(decay(&value(2)), Some(1));
        assert_eq!(decay(&value(1)), None);
        assert_eq!(decay(&value(0)), None);
    }

    #[test]
    fn test_decay_none() {
        let decay = decay_none();
        assert_eq!(decay(&value(7)), Some(7));
    }

    #[test]
    fn test_decay_linear() {
        let decay = decay_linear(0.5);
        assert_eq!(decay(&value(10)), Some(5));
        assert_eq!(decay(&value(3)), Some(1));
        assert_eq!(decay(&value(1)), None);
    }

    #[test]
    fn test_decay_expire_when_inactive() {
        let fresh = value(4);
        assert_eq!(decay_expire_when_inactive(Duration::from_secs(60))(&fresh), Some(4));
        assert_eq!(decay_expire_when_inactive(Duration::ZERO)(&fresh), None);
    }

    #[test]
    fn test_bump_functions() {
        assert_eq!(bump_sum_unbounded()(&value(10), 5), 15);
        assert_eq!(bump_sum_bounded(0, 12)(&value(10), 5), 12);
        assert_eq!(bump_sum_bounded(0, 12)(&value(1), -5), 0);
        assert_eq!(bump_sum_capped(15)(&value(14), 1), 15);
        assert_eq!(bump_sum_capped(15)(&value(15), 3), 15);
        assert_eq!(bump_sum_capped(15)(&value(3), -5), -2);
        assert_eq!(bump_overwrite()(&value(10), 3), 3);
    }

    #[test]
    fn test_bump_from_fresh_value_starts_at_zero() {
        let fresh = DecayingValue::new("pubsub-deliveries:chat", test_peer_id(2));
        assert_eq!(bump_sum_capped(15)(&fresh, 1), 1);
    }

    proptest! {
        #[test]
        fn bump_capped_never_exceeds_cap(current in 0i64..=15, delta in 1i64..1_000) {
            let bumped = bump_sum_capped(15)(&value(current), delta);
            prop_assert!(bumped <= 15);
            prop_assert_eq!(bumped, (current + delta).min(15));
        }

        #[test]
        fn decay_fixed_never_keeps_non_positive(current in -100i64..100, amount in 1i64..10) {
            match decay_fixed(amount)(&value(current)) {
                Some(next) => {
                    prop_assert!(next > 0);
                    prop_assert_eq!(next, current - amount);
                }
                None => prop_assert!(current - amount <= 0),
            }
        }
    }
}
