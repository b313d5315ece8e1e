//! Capability traits consumed by connection-tagging components.

use std::sync::Arc;
use std::time::Duration;

use auto_impl::auto_impl;
use libp2p::PeerId;

use crate::decay::{BumpFn, DecayFn};
use crate::error::ConnMgrError;

/// Named integer tags on peer connections.
///
/// The connection manager sums a peer's tag values when choosing which
/// connections to trim. Implementations are expected to be internally
/// synchronised per peer/tag pair.
#[auto_impl(&, Box, Arc)]
pub trait ConnectionManager: Send + Sync {
    /// Attach `tag` with `value` to `peer`, overwriting any previous value.
    fn tag_peer(&self, peer: &PeerId, tag: &str, value: i64) -> Result<(), ConnMgrError>;

    /// Remove `tag` from `peer`. Removing an absent tag is not an error.
    fn untag_peer(&self, peer: &PeerId, tag: &str) -> Result<(), ConnMgrError>;

    /// Decaying tag support, if this connection manager has any.
    fn decayer(&self) -> Option<Arc<dyn Decayer>> {
        None
    }
}

/// Registry of decaying tags.
///
/// The registry owns the decay timer: every `interval` it applies the tag's
/// decay function to each peer value and drops entries the function removes.
#[auto_impl(&, Box, Arc)]
pub trait Decayer: Send + Sync {
    fn register_decaying_tag(
        &self,
        name: &str,
        interval: Duration,
        decay: DecayFn,
        bump: BumpFn,
    ) -> Result<Arc<dyn DecayingTag>, ConnMgrError>;
}

/// Handle to a registered decaying tag.
#[auto_impl(&, Box, Arc)]
pub trait DecayingTag: Send + Sync {
    fn name(&self) -> &str;

    fn interval(&self) -> Duration;

    /// Apply the bump function to `peer`'s value. A peer without a value
    /// is bumped from zero.
    fn bump(&self, peer: &PeerId, delta: i64) -> Result<(), ConnMgrError>;

    /// Drop `peer`'s value for this tag.
    fn remove(&self, peer: &PeerId) -> Result<(), ConnMgrError>;

    /// Unregister the tag and drop all its values. Later calls fail with
    /// [`ConnMgrError::TagClosed`].
    fn close(&self) -> Result<(), ConnMgrError>;
}
