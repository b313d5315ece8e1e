//! Pubsub connection tagging CLI arguments.

use std::collections::HashSet;
use std::time::Duration;

use clap::Args;
use libp2p::PeerId;
use serde::{Deserialize, Serialize};

use crate::config::{
    ConfigError, DEFAULT_DECAY_AMOUNT, DEFAULT_DECAY_INTERVAL, DEFAULT_DELIVERY_BUMP,
    DEFAULT_DELIVERY_CAP, DEFAULT_DIRECT_PEER_VALUE, DEFAULT_MESH_PEER_VALUE, TagTracerConfig,
};

/// Pubsub connection tagging configuration.
#[derive(Debug, Args, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[command(next_help_heading = "Pubsub connection tags")]
#[serde(default)]
pub struct TagTracerArgs {
    /// Connection manager tag value for direct peers.
    #[arg(long = "pubsub.tag.direct-value", default_value_t = DEFAULT_DIRECT_PEER_VALUE)]
    pub direct_peer_value: i64,

    /// Connection manager tag value for each topic mesh a peer is in.
    #[arg(long = "pubsub.tag.mesh-value", default_value_t = DEFAULT_MESH_PEER_VALUE)]
    pub mesh_peer_value: i64,

    /// Amount added to a peer's delivery tag per first delivery.
    #[arg(long = "pubsub.tag.delivery-bump", default_value_t = DEFAULT_DELIVERY_BUMP)]
    pub delivery_bump: i64,

    /// Maximum value of a delivery tag.
    #[arg(long = "pubsub.tag.delivery-cap", default_value_t = DEFAULT_DELIVERY_CAP)]
    pub delivery_cap: i64,

    /// Delivery tag decay interval in seconds.
    #[arg(
        long = "pubsub.tag.decay-interval",
        value_name = "SECONDS",
        default_value_t = DEFAULT_DECAY_INTERVAL.as_secs()
    )]
    pub decay_interval_secs: u64,

    /// Amount subtracted from delivery tags each decay interval.
    #[arg(long = "pubsub.tag.decay-amount", default_value_t = DEFAULT_DECAY_AMOUNT)]
    pub decay_amount: i64,

    /// Comma-separated list of direct peer IDs whose connections are always prioritised.
    #[arg(long = "pubsub.direct-peers", value_delimiter = ',')]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direct_peers: Option<Vec<String>>,
}

impl Default for TagTracerArgs {
    fn default() -> Self {
        Self {
            direct_peer_value: DEFAULT_DIRECT_PEER_VALUE,
            mesh_peer_value: DEFAULT_MESH_PEER_VALUE,
            delivery_bump: DEFAULT_DELIVERY_BUMP,
            delivery_cap: DEFAULT_DELIVERY_CAP,
            decay_interval_secs: DEFAULT_DECAY_INTERVAL.as_secs(),
            decay_amount: DEFAULT_DECAY_AMOUNT,
            direct_peers: None,
        }
    }
}

impl TagTracerArgs {
    /// Build a validated tracer configuration.
    pub fn config(&self) -> Result<TagTracerConfig, ConfigError> {
        let config = TagTracerConfig {
            direct_peer_value: self.direct_peer_value,
            mesh_peer_value: self.mesh_peer_value,
            delivery_bump: self.delivery_bump,
            delivery_cap: self.delivery_cap,
            decay_interval: Duration::from_secs(self.decay_interval_secs),
            decay_amount: self.decay_amount,
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse the configured direct peers.
    pub fn direct_peers(&self) -> Result<HashSet<PeerId>, ConfigError> {
        self.direct_peers
            .iter()
            .flatten()
            .map(|peer| {
                peer.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidPeerId(peer.clone()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[derive(Debug, Parser)]
    struct Cli {
        #[command(flatten)]
        tags: TagTracerArgs,
    }

    fn test_peer_id(n: u8) -> PeerId {
        let key = libp2p::identity::ed25519::SecretKey::try_from_bytes([n; 32]).unwrap();
        let keypair =
            libp2p::identity::Keypair::from(libp2p::identity::ed25519::Keypair::from(key));
        keypair.public().to_peer_id()
    }

    #[test]
    fn test_defaults_match_config() {
        let cli = Cli::parse_from(["vertex"]);
        assert_eq!(cli.tags, TagTracerArgs::default());
        assert_eq!(cli.tags.config().unwrap(), TagTracerConfig::default());
        assert!(cli.tags.direct_peers().unwrap().is_empty());
    }

    #[test]
    fn test_overrides() {
        let a = test_peer_id(1);
        let b = test_peer_id(2);
        let peers = format!("{a},{b}");
        let cli = Cli::parse_from([
            "vertex",
            "--pubsub.tag.direct-value",
            "500",
            "--pubsub.tag.delivery-cap",
            "30",
            "--pubsub.tag.decay-interval",
            "60",
            "--pubsub.direct-peers",
            &peers,
        ]);

        let config = cli.tags.config().unwrap();
        assert_eq!(config.direct_peer_value, 500);
        assert_eq!(config.delivery_cap, 30);
        assert_eq!(config.decay_interval, Duration::from_secs(60));
        assert_eq!(config.mesh_peer_value, DEFAULT_MESH_PEER_VALUE);

        let direct = cli.tags.direct_peers().unwrap();
        assert_eq!(direct, HashSet::from([a, b]));
    }

    #[test]
    fn test_invalid_values() {
        let cli = Cli::parse_from(["vertex", "--pubsub.tag.decay-interval", "0"]);
        assert_eq!(cli.tags.config(), Err(ConfigError::ZeroDecayInterval));

        let cli = Cli::parse_from(["vertex", "--pubsub.direct-peers", "not-a-peer"]);
        assert_eq!(
            cli.tags.direct_peers(),
            Err(ConfigError::InvalidPeerId("not-a-peer".into()))
        );
    }

    #[test]
    fn test_serde_defaults() {
        let args: TagTracerArgs =
            serde_json::from_str(r#"{"mesh_peer_value": 40}"#).unwrap();
        assert_eq!(args.mesh_peer_value, 40);
        assert_eq!(args.delivery_cap, DEFAULT_DELIVERY_CAP);
        assert!(args.direct_peers.is_none());

        let json = serde_json::to_string(&TagTracerArgs::default()).unwrap();
        assert!(!json.contains("direct_peers"));
    }
}
