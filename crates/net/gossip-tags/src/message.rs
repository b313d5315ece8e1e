//! The parts of a pubsub message the tag tracer reads.

use bytes::Bytes;
use libp2p::PeerId;
use strum::{Display, IntoStaticStr};

/// A message as seen by pubsub tracers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubsubMessage {
    /// Peer that forwarded the message to us.
    pub received_from: PeerId,
    /// Original author, if the message is signed.
    pub source: Option<PeerId>,
    /// Topics the message was published to, in publish order.
    pub topics: Vec<String>,
    pub data: Bytes,
}

impl PubsubMessage {
    pub fn new(received_from: PeerId, topics: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            received_from,
            source: None,
            topics: topics.into_iter().map(Into::into).collect(),
            data: Bytes::new(),
        }
    }

    pub fn with_source(mut self, source: PeerId) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_data(mut self, data: impl Into<Bytes>) -> Self {
        self.data = data.into();
        self
    }
}

/// Why a message was rejected before delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum RejectReason {
    MissingSignature,
    UnexpectedSignature,
    UnexpectedAuthInfo,
    InvalidSignature,
    SelfOrigin,
    BlacklistedPeer,
    BlacklistedSource,
    ValidationFailed,
    ValidationIgnored,
    ValidationThrottled,
    ValidationQueueFull,
}
