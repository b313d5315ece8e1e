//! Connection manager tagging for gossipsub peers.
//!
//! [`TagTracer`] listens to pubsub lifecycle events and turns them into
//! connection manager tags:
//!
//! - Direct peers are tagged with a high fixed value on connect.
//! - Mesh peers are tagged per topic while they are grafted.
//! - Peers delivering messages first bump a per-topic decaying tag, capped
//!   and decaying at a fixed rate.
//!
//! Without decaying tag support in the connection manager, delivery tagging
//! is skipped and the rest works unchanged.

#[cfg(feature = "cli")]
mod args;
mod config;
mod error;
mod message;
mod metrics;
mod tag_tracer;
mod tracer;

#[cfg(feature = "cli")]
pub use args::TagTracerArgs;
pub use config::{
    ConfigError, DEFAULT_DECAY_AMOUNT, DEFAULT_DECAY_INTERVAL, DEFAULT_DELIVERY_BUMP,
    DEFAULT_DELIVERY_CAP, DEFAULT_DIRECT_PEER_VALUE, DEFAULT_MESH_PEER_VALUE, TagTracerConfig,
};
pub use error::TagTracerError;
pub use message::{PubsubMessage, RejectReason};
pub use tag_tracer::{DIRECT_PEER_TAG, TagTracer, delivery_tag, mesh_tag};
pub use tracer::PubsubTracer;
