//! Pubsub event callbacks.

use auto_impl::auto_impl;
use libp2p::{PeerId, StreamProtocol};

use crate::message::{PubsubMessage, RejectReason};

/// Receiver of pubsub lifecycle events.
///
/// The router invokes these synchronously from whichever task observed the
/// event, so implementations must be cheap and must not block. Every method
/// defaults to doing nothing.
#[auto_impl(&, Box, Arc)]
pub trait PubsubTracer: Send + Sync {
    /// A peer speaking `protocol` connected.
    fn on_peer_connected(&self, _peer: &PeerId, _protocol: &StreamProtocol) {}

    fn on_peer_disconnected(&self, _peer: &PeerId) {}

    /// The local node joined `topic`.
    fn on_topic_join(&self, _topic: &str) {}

    /// The local node left `topic`.
    fn on_topic_leave(&self, _topic: &str) {}

    /// `peer` was added to the mesh of `topic`.
    fn on_mesh_graft(&self, _peer: &PeerId, _topic: &str) {}

    /// `peer` was removed from the mesh of `topic`.
    fn on_mesh_prune(&self, _peer: &PeerId, _topic: &str) {}

    /// First delivery of a message that passed validation.
    fn on_message_delivered(&self, _msg: &PubsubMessage) {}

    fn on_message_validated(&self, _msg: &PubsubMessage) {}

    fn on_message_rejected(&self, _msg: &PubsubMessage, _reason: RejectReason) {}

    fn on_duplicate_message(&self, _msg: &PubsubMessage) {}
}

/// Fans every event out to each tracer in order.
impl<T: PubsubTracer> PubsubTracer for [T] {
    fn on_peer_connected(&self, peer: &PeerId, protocol: &StreamProtocol) {
        self.iter().for_each(|t| t.on_peer_connected(peer, protocol));
    }

    fn on_peer_disconnected(&self, peer: &PeerId) {
        self.iter().for_each(|t| t.on_peer_disconnected(peer));
    }

    fn on_topic_join(&self, topic: &str) {
        self.iter().for_each(|t| t.on_topic_join(topic));
    }

    fn on_topic_leave(&self, topic: &str) {
        self.iter().for_each(|t| t.on_topic_leave(topic));
    }

    fn on_mesh_graft(&self, peer: &PeerId, topic: &str) {
        self.iter().for_each(|t| t.on_mesh_graft(peer, topic));
    }

    fn on_mesh_prune(&self, peer: &PeerId, topic: &str) {
        self.iter().for_each(|t| t.on_mesh_prune(peer, topic));
    }

    fn on_message_delivered(&self, msg: &PubsubMessage) {
        self.iter().for_each(|t| t.on_message_delivered(msg));
    }

    fn on_message_validated(&self, msg: &PubsubMessage) {
        self.iter().for_each(|t| t.on_message_validated(msg));
    }

    fn on_message_rejected(&self, msg: &PubsubMessage, reason: RejectReason) {
        self.iter().for_each(|t| t.on_message_rejected(msg, reason));
    }

    fn on_duplicate_message(&self, msg: &PubsubMessage) {
        self.iter().for_each(|t| t.on_duplicate_message(msg));
    }
}
