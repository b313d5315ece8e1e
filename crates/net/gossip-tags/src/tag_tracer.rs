//! Connection manager tagging driven by pubsub events.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use libp2p::{PeerId, StreamProtocol};
use parking_lot::RwLock;
use tracing::{debug, trace, warn};
use vertex_net_connmgr::decay::{bump_sum_capped, decay_fixed};
use vertex_net_connmgr::{ConnMgrError, ConnectionManager, Decayer, DecayingTag};

use crate::config::{ConfigError, TagTracerConfig};
use crate::error::TagTracerError;
use crate::message::{PubsubMessage, RejectReason};
use crate::metrics::TagTracerMetrics;
use crate::tracer::PubsubTracer;

/// Tag applied to direct peers on connect.
pub const DIRECT_PEER_TAG: &str = "pubsub:direct";

/// Tag applied to a mesh peer of `topic`.
pub fn mesh_tag(topic: &str) -> String {
    format!("pubsub:{topic}")
}

/// Name of the decaying delivery tag registered for `topic`.
pub fn delivery_tag(topic: &str) -> String {
    format!("pubsub-deliveries:{topic}")
}

type DeliveryTags = HashMap<String, Arc<dyn DecayingTag>>;

/// Applies connection manager tags to peers based on their pubsub behaviour.
///
/// - Direct peers get [`TagTracerConfig::direct_peer_value`] under
///   [`DIRECT_PEER_TAG`] when they connect. The tag is never removed here.
/// - Mesh peers get [`TagTracerConfig::mesh_peer_value`] for each topic mesh
///   they are grafted into, removed again on prune. Mesh tags are not cleared
///   on disconnect; the connection manager drops them with the connection.
/// - A peer that is first to deliver a message bumps its decaying delivery
///   tag for every topic of the message, up to
///   [`TagTracerConfig::delivery_cap`]. The connection manager decays these
///   by [`TagTracerConfig::decay_amount`] every
///   [`TagTracerConfig::decay_interval`].
///
/// Failures are logged and never propagated into the calling event.
pub struct TagTracer<C> {
    conn_mgr: C,
    config: TagTracerConfig,
    /// Resolved once at construction; `None` disables delivery tags.
    decayer: Option<Arc<dyn Decayer>>,
    /// Written on join/leave, read on every delivery.
    decaying: RwLock<DeliveryTags>,
    direct: HashSet<PeerId>,
    metrics: TagTracerMetrics,
}

impl<C> fmt::Debug for TagTracer<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TagTracer")
            .field("config", &self.config)
            .field("supports_decay", &self.supports_decay())
            .field("tracked_topics", &self.tracked_topics())
            .field("direct", &self.direct)
            .finish_non_exhaustive()
    }
}

impl<C> TagTracer<C> {
    pub fn config(&self) -> &TagTracerConfig {
        &self.config
    }

    pub fn supports_decay(&self) -> bool {
        self.decayer.is_some()
    }

    pub fn is_direct(&self, peer: &PeerId) -> bool {
        self.direct.contains(peer)
    }

    /// Topics with a registered delivery tag, sorted.
    pub fn tracked_topics(&self) -> Vec<String> {
        let mut topics: Vec<_> = self.decaying.read().keys().cloned().collect();
        topics.sort();
        topics
    }

    pub fn is_tracking(&self, topic: &str) -> bool {
        self.decaying.read().contains_key(topic)
    }
}

impl<C: ConnectionManager> TagTracer<C> {
    /// Create a tag tracer without direct peers.
    pub fn new(conn_mgr: C, config: TagTracerConfig) -> Result<Self, ConfigError> {
        Self::with_direct_peers(conn_mgr, config, std::iter::empty())
    }

    /// Create a tag tracer that prioritises `direct` peers.
    pub fn with_direct_peers(
        conn_mgr: C,
        config: TagTracerConfig,
        direct: impl IntoIterator<Item = PeerId>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let decayer = conn_mgr.decayer();
        if decayer.is_none() {
            warn!("connection manager does not support decaying tags, delivery tags will not be applied");
        }

        Ok(Self {
            conn_mgr,
            config,
            decayer,
            decaying: RwLock::new(HashMap::new()),
            direct: direct.into_iter().collect(),
            metrics: TagTracerMetrics::default(),
        })
    }

    /// Bump `peer`'s delivery tag for `topic` by the configured amount.
    pub fn bump_delivery_tag(&self, peer: &PeerId, topic: &str) -> Result<(), TagTracerError> {
        let decaying = self.decaying.read();
        let tag = decaying
            .get(topic)
            .ok_or_else(|| TagTracerError::NoDecayingTag {
                topic: topic.to_owned(),
            })?;
        tag.bump(peer, self.config.delivery_bump)?;
        Ok(())
    }

    fn tag_peer_if_direct(&self, peer: &PeerId) {
        if !self.is_direct(peer) {
            return;
        }
        match self
            .conn_mgr
            .tag_peer(peer, DIRECT_PEER_TAG, self.config.direct_peer_value)
        {
            Ok(()) => {
                debug!(%peer, "tagged direct peer");
                self.metrics.inc_direct_tagged();
            }
            Err(err) => self.tag_failed(peer, DIRECT_PEER_TAG, err),
        }
    }

    fn tag_mesh_peer(&self, peer: &PeerId, topic: &str) {
        let tag = mesh_tag(topic);
        match self
            .conn_mgr
            .tag_peer(peer, &tag, self.config.mesh_peer_value)
        {
            Ok(()) => {
                debug!(%peer, topic, "tagged mesh peer");
                self.metrics.inc_mesh_tagged();
            }
            Err(err) => self.tag_failed(peer, &tag, err),
        }
    }

    fn untag_mesh_peer(&self, peer: &PeerId, topic: &str) {
        let tag = mesh_tag(topic);
        match self.conn_mgr.untag_peer(peer, &tag) {
            Ok(()) => {
                debug!(%peer, topic, "untagged mesh peer");
                self.metrics.inc_mesh_untagged();
            }
            Err(err) => self.tag_failed(peer, &tag, err),
        }
    }

    fn tag_failed(&self, peer: &PeerId, tag: &str, err: ConnMgrError) {
        warn!(%peer, tag, %err, "connection manager rejected tag update");
        self.metrics.inc_tag_failures();
    }

    fn add_delivery_tag(&self, topic: &str) {
        let Some(decayer) = &self.decayer else {
            return;
        };

        let mut decaying = self.decaying.write();
        let name = delivery_tag(topic);
        let registered = decayer.register_decaying_tag(
            &name,
            self.config.decay_interval,
            decay_fixed(self.config.decay_amount),
            bump_sum_capped(self.config.delivery_cap),
        );
        match registered {
            Ok(tag) => {
                debug!(topic, tag = %name, "registered delivery tag");
                if decaying.insert(topic.to_owned(), tag).is_none() {
                    self.metrics.inc_tracked_topics();
                }
            }
            Err(err) => {
                warn!(topic, %err, "unable to create decaying delivery tag");
                self.metrics.inc_registration_failures();
            }
        }
    }

    fn remove_delivery_tag(&self, topic: &str) {
        let mut decaying = self.decaying.write();
        if decaying.remove(topic).is_some() {
            debug!(topic, "stopped tracking delivery tag");
            self.metrics.dec_tracked_topics();
        }
    }

    fn bump_tags_for_message(&self, peer: &PeerId, msg: &PubsubMessage) {
        for topic in &msg.topics {
            match self.bump_delivery_tag(peer, topic) {
                Ok(()) => {
                    trace!(%peer, topic, "bumped delivery tag");
                    self.metrics.inc_delivery_bumps();
                }
                Err(err) => {
                    warn!(%peer, topic, %err, "error bumping delivery tag");
                    self.metrics.inc_delivery_bump_failures();
                }
            }
        }
    }
}

impl<C: ConnectionManager> PubsubTracer for TagTracer<C> {
    fn on_peer_connected(&self, peer: &PeerId, _protocol: &StreamProtocol) {
        self.tag_peer_if_direct(peer);
    }

    fn on_peer_disconnected(&self, _peer: &PeerId) {}

    fn on_topic_join(&self, topic: &str) {
        self.add_delivery_tag(topic);
    }

    fn on_topic_leave(&self, topic: &str) {
        self.remove_delivery_tag(topic);
    }

    fn on_mesh_graft(&self, peer: &PeerId, topic: &str) {
        self.tag_mesh_peer(peer, topic);
    }

    fn on_mesh_prune(&self, peer: &PeerId, topic: &str) {
        self.untag_mesh_peer(peer, topic);
    }

    fn on_message_delivered(&self, msg: &PubsubMessage) {
        // TODO: also bump peers that deliver shortly after the first, once
        // the router reports near-first deliveries.
        self.bump_tags_for_message(&msg.received_from, msg);
    }

    fn on_message_validated(&self, _msg: &PubsubMessage) {}

    fn on_message_rejected(&self, _msg: &PubsubMessage, _reason: RejectReason) {}

    fn on_duplicate_message(&self, _msg: &PubsubMessage) {}
}

#[cfg(test)]
mod tests {
    use vertex_net_connmgr::{MemoryConnManager, TagCall};

    use super::*;

    fn test_peer_id(n: u8) -> PeerId {
        let key = libp2p::identity::ed25519::SecretKey::try_from_bytes([n; 32]).unwrap();
        let keypair =
            libp2p::identity::Keypair::from(libp2p::identity::ed25519::Keypair::from(key));
        keypair.public().to_peer_id()
    }

    #[test]
    fn test_tag_names() {
        assert_eq!(DIRECT_PEER_TAG, "pubsub:direct");
        assert_eq!(mesh_tag("chat"), "pubsub:chat");
        assert_eq!(delivery_tag("chat"), "pubsub-deliveries:chat");
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = TagTracerConfig::default().with_delivery_cap(0);
        assert!(TagTracer::new(MemoryConnManager::new(), config).is_err());
    }

    #[test]
    fn test_decay_support_checked_once() {
        let tracer =
            TagTracer::new(MemoryConnManager::without_decay(), TagTracerConfig::default()).unwrap();
        assert!(!tracer.supports_decay());

        tracer.on_topic_join("chat");
        assert!(!tracer.is_tracking("chat"));
        assert!(tracer.tracked_topics().is_empty());
    }

    #[test]
    fn test_bump_uses_configured_amount() {
        let cm = MemoryConnManager::new();
        let config = TagTracerConfig::default().with_delivery_bump(3);
        let tracer = TagTracer::new(cm.clone(), config).unwrap();
        let peer = test_peer_id(1);

        tracer.on_topic_join("chat");
        cm.clear_calls();
        tracer.bump_delivery_tag(&peer, "chat").unwrap();

        assert_eq!(
            cm.calls(),
            vec![TagCall::Bump {
                peer,
                tag: delivery_tag("chat"),
                delta: 3,
            }]
        );
    }

    #[test]
    fn test_bump_unknown_topic() {
        let tracer = TagTracer::new(MemoryConnManager::new(), TagTracerConfig::default()).unwrap();
        assert_eq!(
            tracer.bump_delivery_tag(&test_peer_id(1), "nope"),
            Err(TagTracerError::NoDecayingTag {
                topic: "nope".into()
            })
        );
    }

    #[test]
    fn test_debug_output() {
        let tracer = TagTracer::with_direct_peers(
            MemoryConnManager::new(),
            TagTracerConfig::default(),
            [test_peer_id(1)],
        )
        .unwrap();
        tracer.on_topic_join("chat");

        let debug = format!("{tracer:?}");
        assert!(debug.contains("supports_decay: true"));
        assert!(debug.contains("chat"));
    }
}
