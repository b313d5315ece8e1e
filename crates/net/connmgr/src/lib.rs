//! Connection manager tagging capabilities for libp2p peers.
//!
//! - [`ConnectionManager`] - attach and detach named integer tags on a peer
//! - [`Decayer`] - optional registry of tags whose values decay over time
//! - [`DecayingTag`] - handle to a registered decaying tag
//! - [`decay`] - decay/bump function types and stock constructors

pub mod decay;
mod error;
#[cfg(any(test, feature = "test-utils"))]
pub mod memory;
mod traits;

pub use decay::{BumpFn, DecayFn, DecayingValue};
pub use error::ConnMgrError;
pub use traits::{ConnectionManager, Decayer, DecayingTag};

#[cfg(any(test, feature = "test-utils"))]
pub use memory::{MemoryConnManager, TagCall};
