//! Tag values and decay parameters.

use std::time::Duration;

use thiserror::Error;

/// Tag value for direct peers. High, so these connections outrank all others.
pub const DEFAULT_DIRECT_PEER_VALUE: i64 = 1000;

/// Tag value for a mesh peer, applied separately for each topic mesh the peer is in.
pub const DEFAULT_MESH_PEER_VALUE: i64 = 20;

/// Amount added to a peer's delivery tag each time it delivers a message first.
pub const DEFAULT_DELIVERY_BUMP: i64 = 1;

/// Maximum value of a delivery tag.
pub const DEFAULT_DELIVERY_CAP: i64 = 15;

/// Interval between decay steps of delivery tags.
pub const DEFAULT_DECAY_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Amount subtracted from delivery tags at each decay step.
pub const DEFAULT_DECAY_AMOUNT: i64 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("decay interval must be non-zero")]
    ZeroDecayInterval,
    #[error("{field} must be at least 1, got {value}")]
    NotPositive { field: &'static str, value: i64 },
    #[error("invalid peer id {0:?}")]
    InvalidPeerId(String),
}

/// Tag tracer configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagTracerConfig {
    pub direct_peer_value: i64,
    pub mesh_peer_value: i64,
    pub delivery_bump: i64,
    pub delivery_cap: i64,
    pub decay_interval: Duration,
    pub decay_amount: i64,
}

impl Default for TagTracerConfig {
    fn default() -> Self {
        Self {
            direct_peer_value: DEFAULT_DIRECT_PEER_VALUE,
            mesh_peer_value: DEFAULT_MESH_PEER_VALUE,
            delivery_bump: DEFAULT_DELIVERY_BUMP,
            delivery_cap: DEFAULT_DELIVERY_CAP,
            decay_interval: DEFAULT_DECAY_INTERVAL,
            decay_amount: DEFAULT_DECAY_AMOUNT,
        }
    }
}

impl TagTracerConfig {
    pub fn with_direct_peer_value(mut self, value: i64) -> Self {
        self.direct_peer_value = value;
        self
    }

    pub fn with_mesh_peer_value(mut self, value: i64) -> Self {
        self.mesh_peer_value = value;
        self
    }

    pub fn with_delivery_bump(mut self, bump: i64) -> Self {
        self.delivery_bump = bump;
        self
    }

    pub fn with_delivery_cap(mut self, cap: i64) -> Self {
        self.delivery_cap = cap;
        self
    }

    pub fn with_decay_interval(mut self, interval: Duration) -> Self {
        self.decay_interval = interval;
        self
    }

    pub fn with_decay_amount(mut self, amount: i64) -> Self {
        self.decay_amount = amount;
        self
    }

    /// Check the delivery tag parameters.
    ///
    /// Static tag values are not constrained; a zero or negative value is a
    /// legitimate way to deprioritise a class of peers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.decay_interval.is_zero() {
            return Err(ConfigError::ZeroDecayInterval);
        }
        for (field, value) in [
            ("delivery_bump", self.delivery_bump),
            ("delivery_cap", self.delivery_cap),
            ("decay_amount", self.decay_amount),
        ] {
            if value < 1 {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TagTracerConfig::default();
        assert_eq!(config.direct_peer_value, 1000);
        assert_eq!(config.mesh_peer_value, 20);
        assert_eq!(config.delivery_bump, 1);
        assert_eq!(config.delivery_cap, 15);
        assert_eq!(config.decay_interval, Duration::from_secs(600));
        assert_eq!(config.decay_amount, 1);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_builder() {
        let config = TagTracerConfig::default()
            .with_direct_peer_value(500)
            .with_mesh_peer_value(10)
            .with_delivery_bump(2)
            .with_delivery_cap(30)
            .with_decay_interval(Duration::from_secs(60))
            .with_decay_amount(3);

        assert_eq!(config.direct_peer_value, 500);
        assert_eq!(config.mesh_peer_value, 10);
        assert_eq!(config.delivery_bump, 2);
        assert_eq!(config.delivery_cap, 30);
        assert_eq!(config.decay_interval, Duration::from_secs(60));
        assert_eq!(config.decay_amount, 3);
    }

    #[test]
    fn test_validate() {
        let zero_interval = TagTracerConfig::default().with_decay_interval(Duration::ZERO);
        assert_eq!(zero_interval.validate(), Err(ConfigError::ZeroDecayInterval));

        let zero_cap = TagTracerConfig::default().with_delivery_cap(0);
        assert_eq!(
            zero_cap.validate(),
            Err(ConfigError::NotPositive {
                field: "delivery_cap",
                value: 0
            })
        );

        let negative_decay = TagTracerConfig::default().with_decay_amount(-1);
        assert!(negative_decay.validate().is_err());

        let negative_mesh = TagTracerConfig::default().with_mesh_peer_value(-5);
        assert_eq!(negative_mesh.validate(), Ok(()));
    }
}
